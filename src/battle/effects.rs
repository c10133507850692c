//! Effect Resolution
//!
//! Every change one entity makes to another goes through `BattleAccess`:
//! damage, healing, status effects, knockback and spawns. Damage has a single
//! entry point, `apply_damage`, which applies crown-tower scaling, the target's
//! damage reduction and absorbing mechanics, in that order, before hitpoints
//! are touched.
//!
//! Spawns go through `Commands`, so entities created during a tick only
//! appear once the tick's changeset is committed.

use std::f32::consts::TAU;
use std::sync::Arc;

use bevy::ecs::query::QueryData;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::combat::events::{BattleEvent, BattleEvents};

use super::area::AreaEffectState;
use super::arena::clamp_to_arena;
use super::components::*;
use super::mechanics::{HostInfo, MechanicContext, Mechanics, TargetInfo};
use super::projectiles::ProjectileMotion;
use super::rules::MatchRules;
use super::spawn::{spawn_archetype, SpawnPlacement};
use super::status::{StatusEffect, StatusEffects};
use super::targeting::in_attack_range;
use super::unit_config::{TargetClass, UnitCatalog, UnitDefinition};

// ============================================================================
// Requests
// ============================================================================

/// One hit of damage, before mitigation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRequest {
    pub source: Option<EntityId>,
    pub target: Entity,
    pub amount: f32,
    /// Applied only when the target is a crown tower
    pub crown_tower_multiplier: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnLayout {
    /// Evenly spaced on a circle, first unit on the +x axis
    Ring,
    /// Random points within the radius, drawn from the match RNG
    Scatter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub owner: Player,
    pub unit: String,
    pub count: u32,
    pub center: Vec2,
    pub radius: f32,
    pub layout: SpawnLayout,
}

/// An effect requested by a mechanic or resolver, applied after dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectRequest {
    Damage(DamageRequest),
    Heal {
        target: Entity,
        amount: f32,
    },
    ApplyStatus {
        target: Entity,
        effect: StatusEffect,
    },
    /// Damage every enemy of `owner` within `radius`
    AreaDamage {
        source: Option<EntityId>,
        owner: Player,
        center: Vec2,
        radius: f32,
        damage: f32,
        crown_tower_multiplier: f32,
        status: Option<StatusEffect>,
    },
    Knockback {
        target: Entity,
        origin: Vec2,
        distance: f32,
    },
    Spawn(SpawnRequest),
}

impl EffectRequest {
    /// Resolution order within one batch. Spawns resolve last so that area
    /// damage from the same death never hits the units the death creates.
    fn rank(&self) -> u8 {
        match self {
            EffectRequest::Spawn(_) => 1,
            _ => 0,
        }
    }
}

/// Result of a damage application.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DamageOutcome {
    pub hp_lost: f32,
    pub absorbed: f32,
}

// ============================================================================
// World access
// ============================================================================

/// Everything a resolver may read or write on an entity.
#[derive(QueryData)]
#[query_data(mutable)]
pub struct UnitData {
    pub entity: Entity,
    pub id: &'static EntityId,
    pub owner: &'static Owner,
    pub kind: &'static EntityKind,
    pub position: &'static mut Position,
    pub archetype: Option<&'static Archetype>,
    pub health: Option<&'static mut Health>,
    pub body: Option<&'static Body>,
    pub targeting: Option<&'static mut Targeting>,
    pub timer: Option<&'static mut AttackTimer>,
    pub deploy: Option<&'static mut DeployTimer>,
    pub lifetime: Option<&'static mut Lifetime>,
    pub statuses: Option<&'static mut StatusEffects>,
    pub mechanics: Option<&'static mut Mechanics>,
    pub tower: Option<&'static mut CrownTower>,
    pub projectile: Option<&'static mut ProjectileMotion>,
    pub area: Option<&'static mut AreaEffectState>,
}

/// Shared system parameter for the battle systems.
#[derive(SystemParam)]
pub struct BattleAccess<'w, 's> {
    pub units: Query<'w, 's, UnitData>,
    pub commands: Commands<'w, 's>,
    pub live: Res<'w, LiveSet>,
    pub clock: Res<'w, SimClock>,
    pub rules: Res<'w, MatchRules>,
    pub catalog: Res<'w, UnitCatalog>,
    pub ids: ResMut<'w, IdAllocator>,
    pub rng: ResMut<'w, GameRng>,
    pub events: ResMut<'w, BattleEvents>,
}

impl BattleAccess<'_, '_> {
    /// Entities live at the start of this tick, by ascending id.
    pub fn live_entities(&self) -> Vec<Entity> {
        self.live.entities().collect()
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.units
            .get(entity)
            .ok()
            .and_then(|unit| unit.health.map(|h| h.is_alive()))
            .unwrap_or(false)
    }

    pub fn is_deployed(&self, entity: Entity) -> bool {
        self.units
            .get(entity)
            .map(|unit| unit.deploy.map_or(true, |d| d.is_deployed()))
            .unwrap_or(false)
    }

    pub fn stable_id(&self, entity: Entity) -> Option<EntityId> {
        self.units.get(entity).ok().map(|unit| *unit.id)
    }

    /// Targetable view of a live entity.
    pub fn target_info(&self, entity: Entity) -> Option<TargetInfo> {
        let unit = self.units.get(entity).ok()?;
        if !unit.health.is_some_and(|h| h.is_alive()) {
            return None;
        }
        Some(TargetInfo {
            entity,
            id: *unit.id,
            position: unit.position.0,
            is_building: *unit.kind == EntityKind::Building,
            is_air: unit.body.is_some_and(|b| b.is_air),
        })
    }

    /// Whether `attacker` can hit `target` from where both stand.
    pub fn within_reach(&self, attacker: Entity, target: Entity) -> bool {
        let (Ok(a), Ok(t)) = (self.units.get(attacker), self.units.get(target)) else {
            return false;
        };
        let Some(archetype) = a.archetype else {
            return false;
        };
        in_attack_range(
            a.position.0,
            a.body.map_or(0.0, |b| b.collision_radius),
            archetype.0.range,
            t.position.0,
            t.body.map_or(0.0, |b| b.collision_radius),
        )
    }

    /// Snapshot of an entity for mechanic dispatch.
    pub fn host_info(&self, entity: Entity) -> Option<HostInfo> {
        let unit = self.units.get(entity).ok()?;
        let mut host = HostInfo::detached(entity, *unit.id, unit.owner.0, unit.position.0);
        if let Some(statuses) = unit.statuses {
            host.disabled = statuses.is_disabled();
            host.spawn_speed = statuses.table.modifiers().spawn_speed;
        }
        host.target = unit
            .targeting
            .and_then(|t| t.target)
            .and_then(|t| self.target_info(t));
        host.engaged = host
            .target
            .is_some_and(|t| self.within_reach(entity, t.entity));
        Some(host)
    }

    /// Live damageable enemies of `owner` whose body overlaps the circle.
    pub fn enemies_within(
        &self,
        owner: Player,
        center: Vec2,
        radius: f32,
        reach: TargetClass,
    ) -> Vec<Entity> {
        self.damageable_within(center, radius, |unit_owner, is_air| {
            unit_owner != owner && reach.can_hit(is_air)
        })
    }

    /// Live damageable allies of `owner` whose body overlaps the circle.
    pub fn allies_within(&self, owner: Player, center: Vec2, radius: f32) -> Vec<Entity> {
        self.damageable_within(center, radius, |unit_owner, _| unit_owner == owner)
    }

    fn damageable_within(
        &self,
        center: Vec2,
        radius: f32,
        accept: impl Fn(Player, bool) -> bool,
    ) -> Vec<Entity> {
        self.live
            .entities()
            .filter(|&entity| {
                let Ok(unit) = self.units.get(entity) else {
                    return false;
                };
                let Some(body) = unit.body else {
                    return false;
                };
                unit.kind.is_damageable()
                    && unit.health.is_some_and(|h| h.is_alive())
                    && accept(unit.owner.0, body.is_air)
                    && unit.position.0.distance(center) <= radius + body.collision_radius
            })
            .collect()
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Run `f` against an entity's mechanics with a fresh context. Returns
    /// its result and the requested effects, which the caller resolves.
    pub fn dispatch<R>(
        &mut self,
        entity: Entity,
        f: impl FnOnce(&mut Mechanics, &mut MechanicContext) -> R,
    ) -> Option<(R, Vec<EffectRequest>)> {
        let host = self.host_info(entity)?;
        let (tick, dt_ms) = (self.clock.tick, self.clock.dt_ms);
        let unit = self.units.get_mut(entity).ok()?;
        let mut mechanics = unit.mechanics?;
        let mut outbox = Vec::new();
        let mut ctx = MechanicContext::new(&host, tick, dt_ms, &mut outbox).with_rng(&mut self.rng);
        let result = f(&mut *mechanics, &mut ctx);
        Some((result, outbox))
    }

    /// The single damage funnel.
    pub fn apply_damage(&mut self, request: DamageRequest) -> DamageOutcome {
        debug_assert!(
            request.amount >= 0.0,
            "apply_damage: damage cannot be negative, got {}",
            request.amount
        );
        let Ok(unit) = self.units.get_mut(request.target) else {
            return DamageOutcome::default();
        };
        let Some(mut health) = unit.health else {
            return DamageOutcome::default();
        };
        if !health.is_alive() {
            return DamageOutcome::default();
        }

        let mut amount = request.amount.max(0.0);
        if let Some(mut tower) = unit.tower {
            amount *= request.crown_tower_multiplier;
            if tower.role == TowerRole::King && !tower.active && self.rules.king_activates_on_damage {
                tower.active = true;
                info!("{} king tower activated by damage", unit.owner.0);
            }
        }
        if let Some(statuses) = unit.statuses.as_ref() {
            amount *= statuses.table.modifiers().damage_taken;
        }

        let mut absorbed = 0.0;
        let mut shield_broken = false;
        if let Some(mut mechanics) = unit.mechanics {
            let absorption = mechanics.absorb(amount);
            amount = absorption.remaining;
            absorbed = absorption.absorbed;
            shield_broken = absorption.depleted;
        }

        let hp_lost = health.lose(amount);
        debug_assert!(health.current >= 0.0 && health.current <= health.max);

        let target_id = *unit.id;
        self.events.push(BattleEvent::Damage {
            source: request.source,
            target: target_id,
            amount: hp_lost,
            absorbed,
        });
        if shield_broken {
            self.events.push(BattleEvent::ShieldBroken { id: target_id });
        }
        DamageOutcome { hp_lost, absorbed }
    }

    pub fn heal(&mut self, target: Entity, amount: f32) -> f32 {
        let Ok(unit) = self.units.get_mut(target) else {
            return 0.0;
        };
        unit.health.map_or(0.0, |mut health| health.heal(amount))
    }

    /// Apply a status effect. Stun and freeze also reset the attack timer to
    /// a full hit interval and interrupt charging mechanics.
    pub fn apply_status(&mut self, target: Entity, effect: StatusEffect) {
        let Ok(unit) = self.units.get_mut(target) else {
            return;
        };
        if !unit.health.as_ref().is_some_and(|h| h.is_alive()) {
            return;
        }
        let Some(mut statuses) = unit.statuses else {
            return;
        };
        statuses.table.apply(effect);
        if effect.kind.is_disabling() {
            if let (Some(mut timer), Some(archetype)) = (unit.timer, unit.archetype) {
                timer.cooldown_ms = archetype.0.hit_speed_ms as f32;
            }
            if let Some(mut mechanics) = unit.mechanics {
                mechanics.interrupt();
            }
        }
    }

    /// Push a troop away from `origin`. Buildings do not move.
    pub fn knockback(&mut self, target: Entity, origin: Vec2, distance: f32) {
        let reset_ms = self.rules.knockback_attack_reset_ms;
        let Ok(mut unit) = self.units.get_mut(target) else {
            return;
        };
        if *unit.kind != EntityKind::Troop || !unit.health.as_ref().is_some_and(|h| h.is_alive()) {
            return;
        }
        let position = unit.position.0;
        let mut direction = (position - origin).normalize_or_zero();
        if direction == Vec2::ZERO {
            // Pushed straight back toward its own side.
            direction = match unit.owner.0 {
                Player::One => Vec2::NEG_Y,
                Player::Two => Vec2::Y,
            };
        }
        unit.position.0 = clamp_to_arena(position + direction * distance);
        if let Some(mut timer) = unit.timer {
            timer.delay_at_least(reset_ms);
        }
        if let Some(mut mechanics) = unit.mechanics {
            mechanics.interrupt();
        }
    }

    pub fn area_damage(
        &mut self,
        source: Option<EntityId>,
        owner: Player,
        center: Vec2,
        radius: f32,
        damage: f32,
        crown_tower_multiplier: f32,
        status: Option<StatusEffect>,
    ) {
        for victim in self.enemies_within(owner, center, radius, TargetClass::AirAndGround) {
            if damage > 0.0 {
                self.apply_damage(DamageRequest {
                    source,
                    target: victim,
                    amount: damage,
                    crown_tower_multiplier,
                });
            }
            if let Some(status) = status {
                self.apply_status(victim, status);
            }
        }
    }

    /// Build an archetype instance. It joins the battle when the tick commits.
    pub fn spawn(
        &mut self,
        definition: &Arc<UnitDefinition>,
        owner: Player,
        placement: SpawnPlacement,
    ) -> EntityId {
        let id = self.ids.allocate();
        spawn_archetype(&mut self.commands, definition, id, owner, placement);
        self.events.push(BattleEvent::Spawn {
            id,
            owner,
            archetype: definition.name.clone(),
            x: placement.position.x,
            y: placement.position.y,
        });
        id
    }

    pub fn spawn_batch(&mut self, request: &SpawnRequest) -> Vec<EntityId> {
        let Some(definition) = self.catalog.get(&request.unit).cloned() else {
            warn!("Spawn of unknown archetype '{}' ignored", request.unit);
            return Vec::new();
        };
        let offsets = match request.layout {
            SpawnLayout::Ring => ring_offsets(request.count, request.radius),
            SpawnLayout::Scatter => (0..request.count)
                .map(|_| {
                    let angle = self.rng.random_range(0.0, TAU);
                    let distance = request.radius * self.rng.random_f32().sqrt();
                    Vec2::from_angle(angle) * distance
                })
                .collect(),
        };
        offsets
            .into_iter()
            .map(|offset| {
                let position = clamp_to_arena(request.center + offset);
                self.spawn(&definition, request.owner, SpawnPlacement::at(position))
            })
            .collect()
    }

    /// Resolve a batch of requests: everything else first, spawns last.
    pub fn resolve(&mut self, mut requests: Vec<EffectRequest>) {
        requests.sort_by_key(EffectRequest::rank);
        for request in requests {
            match request {
                EffectRequest::Damage(damage) => {
                    self.apply_damage(damage);
                }
                EffectRequest::Heal { target, amount } => {
                    self.heal(target, amount);
                }
                EffectRequest::ApplyStatus { target, effect } => self.apply_status(target, effect),
                EffectRequest::AreaDamage {
                    source,
                    owner,
                    center,
                    radius,
                    damage,
                    crown_tower_multiplier,
                    status,
                } => self.area_damage(
                    source,
                    owner,
                    center,
                    radius,
                    damage,
                    crown_tower_multiplier,
                    status,
                ),
                EffectRequest::Knockback {
                    target,
                    origin,
                    distance,
                } => self.knockback(target, origin, distance),
                EffectRequest::Spawn(spawn) => {
                    self.spawn_batch(&spawn);
                }
            }
        }
    }
}

/// Offsets for `count` units evenly spaced on a circle.
pub fn ring_offsets(count: u32, radius: f32) -> Vec<Vec2> {
    if count <= 1 || radius <= 0.0 {
        return vec![Vec2::ZERO; count as usize];
    }
    (0..count)
        .map(|i| Vec2::from_angle(TAU * i as f32 / count as f32) * radius)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_offsets_are_evenly_spaced() {
        let offsets = ring_offsets(4, 1.0);
        assert_eq!(offsets.len(), 4);
        assert!((offsets[0] - Vec2::new(1.0, 0.0)).length() < 1e-6);
        assert!((offsets[2] - Vec2::new(-1.0, 0.0)).length() < 1e-6);
        for offset in offsets {
            assert!((offset.length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_single_spawn_sits_on_center() {
        assert_eq!(ring_offsets(1, 2.0), vec![Vec2::ZERO]);
    }

    #[test]
    fn test_spawns_resolve_after_damage() {
        let spawn = EffectRequest::Spawn(SpawnRequest {
            owner: Player::One,
            unit: "Golemite".to_string(),
            count: 2,
            center: Vec2::ZERO,
            radius: 0.5,
            layout: SpawnLayout::Ring,
        });
        let splash = EffectRequest::AreaDamage {
            source: None,
            owner: Player::One,
            center: Vec2::ZERO,
            radius: 2.0,
            damage: 10.0,
            crown_tower_multiplier: 1.0,
            status: None,
        };
        let mut batch = vec![spawn.clone(), splash.clone()];
        batch.sort_by_key(EffectRequest::rank);
        assert_eq!(batch, vec![splash, spawn]);
    }
}
