//! Entity Construction
//!
//! Builds battle entities from archetype definitions. The same builders
//! serve direct world access (match setup, deployments between ticks) and
//! deferred `Commands` (spawns requested during a tick).

use std::sync::Arc;

use bevy::prelude::*;

use super::area::AreaEffectState;
use super::components::*;
use super::mechanics::Mechanics;
use super::projectiles::ProjectileMotion;
use super::status::StatusEffects;
use super::unit_config::{UnitDefinition, UnitKind};

/// Something entities can be spawned into.
pub trait EntitySpawner {
    fn spawn_bundle<B: Bundle>(&mut self, bundle: B) -> Entity;
}

impl EntitySpawner for World {
    fn spawn_bundle<B: Bundle>(&mut self, bundle: B) -> Entity {
        self.spawn(bundle).id()
    }
}

impl EntitySpawner for Commands<'_, '_> {
    fn spawn_bundle<B: Bundle>(&mut self, bundle: B) -> Entity {
        self.spawn(bundle).id()
    }
}

/// Where and how an archetype instance enters the battle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPlacement {
    pub position: Vec2,
    /// Delay before the entity starts acting
    pub deploy_ms: u32,
    /// Launch point for projectile spells
    pub launch_from: Option<Vec2>,
}

impl SpawnPlacement {
    /// Immediately active, as for death spawns and periodic spawns.
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            deploy_ms: 0,
            launch_from: None,
        }
    }

    pub fn deployed(position: Vec2, deploy_ms: u32) -> Self {
        Self {
            position,
            deploy_ms,
            launch_from: None,
        }
    }

    pub fn launched(from: Vec2, to: Vec2) -> Self {
        Self {
            position: to,
            deploy_ms: 0,
            launch_from: Some(from),
        }
    }
}

/// Components shared by troops and buildings.
#[derive(Bundle)]
pub struct UnitBundle {
    pub id: EntityId,
    pub owner: Owner,
    pub kind: EntityKind,
    pub position: Position,
    pub archetype: Archetype,
    pub health: Health,
    pub body: Body,
    pub targeting: Targeting,
    pub timer: AttackTimer,
    pub deploy: DeployTimer,
    pub lifetime: Lifetime,
    pub statuses: StatusEffects,
    pub mechanics: Mechanics,
}

pub fn unit_bundle(
    definition: &Arc<UnitDefinition>,
    id: EntityId,
    owner: Player,
    position: Vec2,
    deploy_ms: u32,
) -> UnitBundle {
    let kind = match definition.kind {
        UnitKind::Building => EntityKind::Building,
        _ => EntityKind::Troop,
    };
    UnitBundle {
        id,
        owner: Owner(owner),
        kind,
        position: Position(position),
        archetype: Archetype(Arc::clone(definition)),
        health: Health::new(definition.hitpoints),
        body: Body {
            is_air: definition.is_air,
            collision_radius: definition.collision_radius,
        },
        targeting: Targeting::default(),
        timer: AttackTimer::default(),
        deploy: DeployTimer {
            remaining_ms: deploy_ms,
        },
        lifetime: Lifetime {
            total_ms: definition.lifetime_ms,
            elapsed_ms: 0,
        },
        statuses: StatusEffects::default(),
        mechanics: Mechanics::attach(definition),
    }
}

/// Build one instance of an archetype.
///
/// Troops and buildings become units. Area spells become a pulsing region at
/// the placement point. Projectile spells are launched from `launch_from`
/// toward it.
pub fn spawn_archetype<S: EntitySpawner>(
    spawner: &mut S,
    definition: &Arc<UnitDefinition>,
    id: EntityId,
    owner: Player,
    placement: SpawnPlacement,
) -> Entity {
    if !definition.is_spell() {
        return spawner.spawn_bundle(unit_bundle(
            definition,
            id,
            owner,
            placement.position,
            placement.deploy_ms,
        ));
    }

    let shell = (
        id,
        Owner(owner),
        Archetype(Arc::clone(definition)),
    );
    match &definition.projectile {
        Some(projectile) => {
            let from = placement.launch_from.unwrap_or(placement.position);
            spawner.spawn_bundle((
                shell,
                EntityKind::Projectile,
                Position(from),
                ProjectileMotion::spell(definition, projectile, from, placement.position),
            ))
        }
        None => spawner.spawn_bundle((
            shell,
            EntityKind::AreaEffect,
            Position(placement.position),
            AreaEffectState::default(),
        )),
    }
}

/// Build a crown tower. Only the king starts inactive.
pub fn spawn_tower<S: EntitySpawner>(
    spawner: &mut S,
    definition: &Arc<UnitDefinition>,
    id: EntityId,
    owner: Player,
    role: TowerRole,
    position: Vec2,
) -> Entity {
    spawner.spawn_bundle((
        unit_bundle(definition, id, owner, position, 0),
        CrownTower {
            role,
            active: role != TowerRole::King,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(kind: UnitKind) -> Arc<UnitDefinition> {
        Arc::new(UnitDefinition {
            name: "Dummy".to_string(),
            kind,
            hitpoints: 300.0,
            lifetime_ms: 30_000,
            ..default()
        })
    }

    #[test]
    fn test_building_spawns_with_full_health() {
        let mut world = World::new();
        let entity = spawn_archetype(
            &mut world,
            &definition(UnitKind::Building),
            EntityId(3),
            Player::Two,
            SpawnPlacement::deployed(Vec2::new(9.0, 20.0), 1000),
        );

        let unit = world.entity(entity);
        assert_eq!(unit.get::<EntityKind>(), Some(&EntityKind::Building));
        assert_eq!(unit.get::<Health>().map(|h| h.current), Some(300.0));
        assert_eq!(unit.get::<DeployTimer>().map(|d| d.remaining_ms), Some(1000));
        assert_eq!(unit.get::<Lifetime>().map(|l| l.total_ms), Some(30_000));
    }

    #[test]
    fn test_king_tower_starts_inactive() {
        let mut world = World::new();
        let king = spawn_tower(
            &mut world,
            &definition(UnitKind::Building),
            EntityId(1),
            Player::One,
            TowerRole::King,
            Vec2::new(9.0, 2.5),
        );
        let princess = spawn_tower(
            &mut world,
            &definition(UnitKind::Building),
            EntityId(2),
            Player::One,
            TowerRole::LeftPrincess,
            Vec2::new(3.5, 6.5),
        );
        assert_eq!(world.entity(king).get::<CrownTower>().map(|t| t.active), Some(false));
        assert_eq!(world.entity(princess).get::<CrownTower>().map(|t| t.active), Some(true));
    }
}
