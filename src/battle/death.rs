//! Death Resolution
//!
//! Entities whose hitpoints reached zero during the tick are marked dead
//! exactly once, their death mechanics run, and their removal is queued for
//! the tick boundary. Death effects that kill further entities are resolved
//! in follow-up rounds within the same pass until nothing is left dying.
//! Spawns requested by deaths always resolve after that round's area damage.
//! Survivors hear about each round's deaths before its effects resolve.

use bevy::prelude::*;

use crate::combat::events::BattleEvent;

use super::components::*;
use super::effects::{BattleAccess, EffectRequest};
use super::mechanics::DeathNotice;
use super::player::Players;

pub fn resolve_deaths(mut access: BattleAccess, mut players: ResMut<Players>) {
    loop {
        let dying: Vec<Entity> = access
            .live
            .entities()
            .filter(|&entity| {
                access
                    .units
                    .get(entity)
                    .ok()
                    .and_then(|unit| unit.health.map(|h| h.awaiting_death()))
                    .unwrap_or(false)
            })
            .collect();
        if dying.is_empty() {
            break;
        }

        let mut requests = Vec::new();
        let mut notices = Vec::new();
        for entity in dying {
            let Ok(unit) = access.units.get_mut(entity) else {
                continue;
            };
            let Some(mut health) = unit.health else {
                continue;
            };
            if !health.mark_dead() {
                continue;
            }
            let id = *unit.id;
            let owner = unit.owner.0;
            notices.push(DeathNotice {
                id,
                owner,
                position: unit.position.0,
            });
            let archetype = unit.archetype.map(|a| a.name().to_string()).unwrap_or_default();
            let tower = unit.tower.map(|t| *t);

            debug!("{} {} {} died", owner, archetype, id);
            access.events.push(BattleEvent::Death {
                id,
                owner,
                archetype,
            });
            if let Some(tower) = tower {
                tower_destroyed(&mut access, &mut players, id, owner, tower.role);
            }
            if let Some((_, mut on_death)) =
                access.dispatch(entity, |mechanics, ctx| mechanics.dispatch_death(ctx))
            {
                requests.append(&mut on_death);
            }
            access.commands.entity(entity).despawn();
        }
        notify_survivors(&mut access, &notices, &mut requests);
        access.resolve(requests);
    }
}

/// Offer this round's deaths to every surviving entity's mechanics.
fn notify_survivors(
    access: &mut BattleAccess,
    notices: &[DeathNotice],
    requests: &mut Vec<EffectRequest>,
) {
    if notices.is_empty() {
        return;
    }
    for entity in access.live_entities() {
        if !access.is_alive(entity) {
            continue;
        }
        if let Some((_, mut requested)) = access.dispatch(entity, |mechanics, ctx| {
            mechanics.dispatch_nearby_deaths(ctx, notices)
        }) {
            requests.append(&mut requested);
        }
    }
}

/// Award crowns for a fallen tower and wake the owner's king.
fn tower_destroyed(
    access: &mut BattleAccess,
    players: &mut Players,
    id: EntityId,
    owner: Player,
    role: TowerRole,
) {
    access.events.push(BattleEvent::TowerDestroyed { id, owner, role });
    let attacker = players.get_mut(owner.opponent());
    match role {
        TowerRole::King => {
            attacker.crowns = 3;
            players.get_mut(owner).king_fallen = true;
            info!("{} king tower destroyed", owner);
            return;
        }
        TowerRole::LeftPrincess | TowerRole::RightPrincess => {
            attacker.crowns = (attacker.crowns + 1).min(3);
        }
    }
    let lane = usize::from(role == TowerRole::RightPrincess);
    players.get_mut(owner).fallen_princesses[lane] = true;
    info!("{} {:?} tower destroyed", owner, role);

    for entity in access.live_entities() {
        let Ok(unit) = access.units.get_mut(entity) else {
            continue;
        };
        if unit.owner.0 != owner {
            continue;
        }
        if let Some(mut tower) = unit.tower {
            if tower.role == TowerRole::King && !tower.active {
                tower.active = true;
                info!("{} king tower activated", owner);
            }
        }
    }
}
