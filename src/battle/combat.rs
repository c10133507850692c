//! Combat Resolution
//!
//! Gates attacks on the attack timer and resolves them. Melee hits are
//! collected during the pass and applied together afterwards, so two units
//! that strike on the same tick both land their blows. Ranged attackers
//! launch a projectile instead; its on-hit effects wait for the impact.

use std::sync::Arc;

use super::components::*;
use super::effects::{BattleAccess, DamageRequest, EffectRequest};
use super::projectiles::ProjectileMotion;

/// Result of advancing one attacker's timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Waiting,
    Ready,
}

/// Advance an attack timer by one tick.
///
/// The first engagement applies the archetype's one-time wind-up. Out of
/// range the timer keeps counting down but never banks time below zero.
pub fn advance_timer(
    timer: &mut AttackTimer,
    engaged: bool,
    elapsed_ms: f32,
    load_time_ms: u32,
    hit_speed_ms: u32,
) -> TimerState {
    if engaged && timer.wind_up_pending {
        timer.delay_at_least(load_time_ms as f32);
        timer.wind_up_pending = false;
    }
    let state = if engaged && timer.cooldown_ms <= 0.0 {
        timer.cooldown_ms += hit_speed_ms as f32;
        TimerState::Ready
    } else {
        TimerState::Waiting
    };
    timer.cooldown_ms -= elapsed_ms;
    if !engaged {
        timer.cooldown_ms = timer.cooldown_ms.max(0.0);
    }
    state
}

pub fn resolve_attacks(mut access: BattleAccess) {
    let dt_ms = access.clock.dt_ms as f32;
    let mut requests: Vec<EffectRequest> = Vec::new();

    for entity in access.live_entities() {
        let Ok(unit) = access.units.get(entity) else {
            continue;
        };
        let (Some(archetype), Some(_)) = (unit.archetype, unit.timer) else {
            continue;
        };
        let archetype = Arc::clone(&archetype.0);
        if !archetype.can_attack() || !unit.health.is_some_and(|h| h.is_alive()) {
            continue;
        }
        if unit.deploy.is_some_and(|d| !d.is_deployed()) || unit.tower.is_some_and(|t| !t.active) {
            continue;
        }
        let (hit_speed, disabled) = unit
            .statuses
            .map_or((1.0, false), |s| (s.modifiers.hit_speed, s.is_disabled()));
        if disabled {
            continue;
        }
        let id = *unit.id;
        let owner = unit.owner.0;
        let position = unit.position.0;
        let target = unit
            .targeting
            .and_then(|t| t.target)
            .and_then(|t| access.target_info(t));
        let engaged = target.is_some_and(|t| access.within_reach(entity, t.entity));

        let state = match access.units.get_mut(entity) {
            Ok(unit) => match unit.timer {
                Some(mut timer) => advance_timer(
                    &mut timer,
                    engaged,
                    dt_ms * hit_speed,
                    archetype.load_time_ms,
                    archetype.hit_speed_ms,
                ),
                None => TimerState::Waiting,
            },
            Err(_) => TimerState::Waiting,
        };
        let (TimerState::Ready, Some(target)) = (state, target) else {
            continue;
        };

        let damage = match access.dispatch(entity, |mechanics, ctx| {
            mechanics.dispatch_attack_start(ctx, &target, archetype.damage)
        }) {
            Some((damage, mut started)) => {
                requests.append(&mut started);
                damage
            }
            None => archetype.damage,
        };

        match &archetype.projectile {
            None => {
                requests.push(EffectRequest::Damage(DamageRequest {
                    source: Some(id),
                    target: target.entity,
                    amount: damage,
                    crown_tower_multiplier: archetype.crown_tower_damage_multiplier,
                }));
                if let Some((_, mut landed)) = access.dispatch(entity, |mechanics, ctx| {
                    mechanics.dispatch_attack_hit(ctx, &target)
                }) {
                    requests.append(&mut landed);
                }
            }
            Some(projectile) => {
                let motion = ProjectileMotion::fired(
                    entity, id, &archetype, projectile, damage, position, &target,
                );
                let projectile_id = access.ids.allocate();
                access.commands.spawn((
                    projectile_id,
                    Owner(owner),
                    EntityKind::Projectile,
                    Position(position),
                    motion,
                ));
            }
        }
    }

    access.resolve(requests);
}
