//! Projectile System
//!
//! Projectiles are entities carrying a `ProjectileMotion`. Each tick they
//! advance by `speed * dt`; when a flight reaches its destination the impact
//! policy decides who gets hit. Piercing and rolling carriers hit along their
//! path instead. A carrier that runs out of range budget or leaves the arena
//! is removed without effect.
//!
//! Every entity a projectile hits is reported to the launcher's mechanics
//! as an attack hit, provided the launcher still exists.

use bevy::prelude::*;
use smallvec::SmallVec;

use super::arena::in_bounds;
use super::components::*;
use super::effects::{BattleAccess, DamageRequest, EffectRequest};
use super::mechanics::TargetInfo;
use super::status::StatusEffect;
use super::unit_config::{ImpactPolicy, ProjectileDefinition, TargetClass, UnitDefinition};

/// Which leg of its trip a projectile is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightStage {
    Flight,
    /// Second leg of a two-phase roll: a wide, slow carrier
    Rolling,
}

#[derive(Component, Debug, Clone)]
pub struct ProjectileMotion {
    /// Launching entity, for on-hit mechanics
    pub source: Option<Entity>,
    pub source_id: Option<EntityId>,
    pub damage: f32,
    pub crown_tower_multiplier: f32,
    /// Tiles per second
    pub speed: f32,
    pub policy: ImpactPolicy,
    pub hit_radius: f32,
    pub status: Option<StatusEffect>,
    pub reach: TargetClass,
    pub homing_target: Option<Entity>,
    pub destination: Vec2,
    pub direction: Vec2,
    pub remaining_range: f32,
    pub stage: FlightStage,
    /// Entities already hit by this carrier
    pub visited: SmallVec<[Entity; 8]>,
}

impl ProjectileMotion {
    /// Projectile fired by an attacker at a target.
    pub fn fired(
        source: Entity,
        source_id: EntityId,
        archetype: &UnitDefinition,
        projectile: &ProjectileDefinition,
        damage: f32,
        from: Vec2,
        target: &TargetInfo,
    ) -> Self {
        let direction = (target.position - from).normalize_or_zero();
        let budget = archetype.projectile_budget();
        let piercing = matches!(projectile.policy, ImpactPolicy::Pierce { .. });
        let destination = if piercing {
            from + direction * budget
        } else {
            target.position
        };
        Self {
            source: Some(source),
            source_id: Some(source_id),
            damage,
            crown_tower_multiplier: archetype.crown_tower_damage_multiplier,
            speed: projectile.speed,
            policy: projectile.policy.clone(),
            hit_radius: projectile.hit_radius,
            status: projectile.status,
            reach: archetype.targets,
            homing_target: (projectile.homing && !piercing).then_some(target.entity),
            destination,
            direction,
            remaining_range: budget,
            stage: FlightStage::Flight,
            visited: SmallVec::new(),
        }
    }

    /// Projectile spell flying from `from` to a fixed point.
    pub fn spell(
        archetype: &UnitDefinition,
        projectile: &ProjectileDefinition,
        from: Vec2,
        to: Vec2,
    ) -> Self {
        let travel = from.distance(to);
        let budget = if projectile.range_budget > 0.0 {
            projectile.range_budget.max(travel)
        } else {
            travel + projectile.hit_radius
        };
        Self {
            source: None,
            source_id: None,
            damage: archetype.damage,
            crown_tower_multiplier: archetype.crown_tower_damage_multiplier,
            speed: projectile.speed,
            policy: projectile.policy.clone(),
            hit_radius: projectile.hit_radius,
            status: projectile.status,
            reach: archetype.targets,
            homing_target: None,
            destination: to,
            direction: (to - from).normalize_or_zero(),
            remaining_range: budget,
            stage: FlightStage::Flight,
            visited: SmallVec::new(),
        }
    }

    /// The rolling carrier a two-phase projectile turns into on landing.
    fn rolling(&self, owner: Player, width: f32, speed: f32, distance: f32) -> Self {
        // Rolls straight up the arena toward the enemy side.
        let direction = match owner {
            Player::One => Vec2::Y,
            Player::Two => Vec2::NEG_Y,
        };
        Self {
            speed,
            hit_radius: width / 2.0,
            homing_target: None,
            destination: self.destination + direction * distance,
            direction,
            remaining_range: distance,
            stage: FlightStage::Rolling,
            visited: SmallVec::new(),
            ..self.clone()
        }
    }
}

/// A hit to deliver once the pass is done.
#[derive(Debug, Clone, Copy)]
struct Hit {
    target: Entity,
    damage: f32,
}

/// What happened to a projectile this tick.
enum Outcome {
    InFlight(Vec2),
    Impact(Vec2),
    Hits { position: Vec2, hits: Vec<Hit>, spent: bool },
    Expired,
}

pub fn advance_projectiles(mut access: BattleAccess) {
    let dt = access.clock.dt_secs();
    for entity in access.live_entities() {
        let Ok(unit) = access.units.get(entity) else {
            continue;
        };
        let Some(motion) = unit.projectile else {
            continue;
        };
        let owner = unit.owner.0;
        let position = unit.position.0;
        let mut motion = motion.clone();

        // Homing carriers chase the target's last known position.
        if let Some(target) = motion.homing_target {
            match access.target_info(target) {
                Some(info) => motion.destination = info.position,
                None => motion.homing_target = None,
            }
            motion.direction = (motion.destination - position).normalize_or_zero();
        }

        let step = motion.speed * dt;
        let outcome = match (&motion.policy, motion.stage) {
            (ImpactPolicy::Pierce { count, width }, FlightStage::Flight) => {
                let next = position + motion.direction * step;
                let hits = swept_hits(&access, &motion, owner, position, next, width / 2.0, *count);
                motion.remaining_range -= step;
                let spent = motion.visited.len() + hits.len() >= *count as usize;
                Outcome::Hits { position: next, hits, spent }
            }
            (ImpactPolicy::Roll { width, depth, .. }, FlightStage::Rolling) => {
                let next = position + motion.direction * step;
                let hits = rolling_hits(&access, &motion, owner, next, width / 2.0, depth / 2.0);
                motion.remaining_range -= step;
                Outcome::Hits { position: next, hits, spent: false }
            }
            _ => {
                let distance = position.distance(motion.destination);
                if step >= distance {
                    motion.remaining_range -= distance;
                    Outcome::Impact(motion.destination)
                } else {
                    motion.remaining_range -= step;
                    Outcome::InFlight(position + motion.direction * step)
                }
            }
        };
        let outcome = match outcome {
            Outcome::InFlight(next) if motion.remaining_range < 0.0 || !in_bounds(next) => {
                Outcome::Expired
            }
            Outcome::Hits { position, hits, spent } => Outcome::Hits {
                position,
                hits,
                spent: spent || motion.remaining_range <= 0.0 || !in_bounds(position),
            },
            other => other,
        };

        match outcome {
            Outcome::InFlight(next) => store(&mut access, entity, next, motion),
            Outcome::Expired => {
                access.commands.entity(entity).despawn();
            }
            Outcome::Impact(point) => {
                access.commands.entity(entity).despawn();
                impact(&mut access, &motion, owner, point);
            }
            Outcome::Hits { position: next, hits, spent } => {
                let knockback = match motion.policy {
                    ImpactPolicy::Roll { knockback, .. } => Some(knockback),
                    _ => None,
                };
                motion.visited.extend(hits.iter().map(|h| h.target));
                if spent {
                    access.commands.entity(entity).despawn();
                } else {
                    store(&mut access, entity, next, motion.clone());
                }
                for hit in hits {
                    deliver(&mut access, &motion, hit);
                    if let Some(distance) = knockback {
                        access.knockback(hit.target, next, distance);
                    }
                }
            }
        }
    }
}

fn store(access: &mut BattleAccess, entity: Entity, position: Vec2, motion: ProjectileMotion) {
    if let Ok(mut unit) = access.units.get_mut(entity) {
        unit.position.0 = position;
        if let Some(mut current) = unit.projectile {
            *current = motion;
        }
    }
}

/// Enemies whose body overlaps the swept segment, nearest along the path first.
fn swept_hits(
    access: &BattleAccess,
    motion: &ProjectileMotion,
    owner: Player,
    from: Vec2,
    to: Vec2,
    half_width: f32,
    limit: u32,
) -> Vec<Hit> {
    let remaining = (limit as usize).saturating_sub(motion.visited.len());
    let segment = to - from;
    let length_sq = segment.length_squared();
    let mut found: Vec<(f32, EntityId, Entity)> = access
        .enemies_within(owner, (from + to) / 2.0, segment.length() / 2.0 + half_width, motion.reach)
        .into_iter()
        .filter(|e| !motion.visited.contains(e))
        .filter_map(|e| {
            let unit = access.units.get(e).ok()?;
            let radius = unit.body.map_or(0.0, |b| b.collision_radius);
            let point = unit.position.0;
            let t = if length_sq > 0.0 {
                ((point - from).dot(segment) / length_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let closest = from + segment * t;
            (closest.distance(point) <= half_width + radius).then_some((t, *unit.id, e))
        })
        .collect();
    found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    found
        .into_iter()
        .take(remaining)
        .map(|(_, _, target)| Hit {
            target,
            damage: motion.damage,
        })
        .collect()
}

/// Enemies overlapping the rolling carrier's rectangle, by id.
fn rolling_hits(
    access: &BattleAccess,
    motion: &ProjectileMotion,
    owner: Player,
    center: Vec2,
    half_width: f32,
    half_depth: f32,
) -> Vec<Hit> {
    let forward = motion.direction;
    let lateral = forward.perp();
    access
        .enemies_within(owner, center, half_width.max(half_depth) * 2.0, motion.reach)
        .into_iter()
        .filter(|e| !motion.visited.contains(e))
        .filter(|&e| {
            let Ok(unit) = access.units.get(e) else {
                return false;
            };
            let radius = unit.body.map_or(0.0, |b| b.collision_radius);
            let offset = unit.position.0 - center;
            offset.dot(forward).abs() <= half_depth + radius
                && offset.dot(lateral).abs() <= half_width + radius
        })
        .map(|target| Hit {
            target,
            damage: motion.damage,
        })
        .collect()
}

/// Resolve a flight that reached its destination.
fn impact(access: &mut BattleAccess, motion: &ProjectileMotion, owner: Player, point: Vec2) {
    let hits = match &motion.policy {
        ImpactPolicy::Direct => first_hit(access, motion, owner, point)
            .map(|target| Hit {
                target,
                damage: motion.damage,
            })
            .into_iter()
            .collect(),
        ImpactPolicy::Splash { radius } => access
            .enemies_within(owner, point, *radius, motion.reach)
            .into_iter()
            .map(|target| Hit {
                target,
                damage: motion.damage,
            })
            .collect(),
        ImpactPolicy::Chain {
            count,
            radius,
            damage_decay,
        } => chain_hits(access, motion, owner, point, *count, *radius, *damage_decay),
        ImpactPolicy::Roll {
            width,
            speed,
            distance,
            ..
        } => {
            let carrier = motion.rolling(owner, *width, *speed, *distance);
            let id = access.ids.allocate();
            access.commands.spawn((
                id,
                Owner(owner),
                EntityKind::Projectile,
                Position(point),
                carrier,
            ));
            Vec::new()
        }
        // Piercing carriers resolve along their path.
        ImpactPolicy::Pierce { .. } => Vec::new(),
    };
    for hit in hits {
        deliver(access, motion, hit);
    }
}

/// The homing target if it is close enough, otherwise the nearest enemy
/// within the hit radius of the landing point.
fn first_hit(
    access: &BattleAccess,
    motion: &ProjectileMotion,
    owner: Player,
    point: Vec2,
) -> Option<Entity> {
    let candidates = access.enemies_within(owner, point, motion.hit_radius, motion.reach);
    if let Some(target) = motion.homing_target.filter(|t| candidates.contains(t)) {
        return Some(target);
    }
    nearest(access, &candidates, point)
}

fn nearest(access: &BattleAccess, candidates: &[Entity], point: Vec2) -> Option<Entity> {
    candidates
        .iter()
        .filter_map(|&e| {
            let unit = access.units.get(e).ok()?;
            Some((unit.position.0.distance(point), *unit.id, e))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
        .map(|(_, _, e)| e)
}

/// First hit plus up to `count` hops, each to the nearest unvisited enemy
/// within `radius` of the previous hit.
fn chain_hits(
    access: &BattleAccess,
    motion: &ProjectileMotion,
    owner: Player,
    point: Vec2,
    count: u32,
    radius: f32,
    decay: f32,
) -> Vec<Hit> {
    let Some(first) = first_hit(access, motion, owner, point) else {
        return Vec::new();
    };
    let mut hits = vec![Hit {
        target: first,
        damage: motion.damage,
    }];
    let mut visited: SmallVec<[Entity; 8]> = SmallVec::new();
    visited.push(first);
    let mut damage = motion.damage;
    let mut from = first;
    for _ in 0..count {
        let Some(origin) = access.units.get(from).ok().map(|u| u.position.0) else {
            break;
        };
        let candidates: Vec<Entity> = access
            .enemies_within(owner, origin, radius, motion.reach)
            .into_iter()
            .filter(|e| !visited.contains(e))
            .collect();
        let Some(next) = nearest(access, &candidates, origin) else {
            break;
        };
        damage *= decay;
        visited.push(next);
        hits.push(Hit {
            target: next,
            damage,
        });
        from = next;
    }
    hits
}

/// Damage and status for one hit, then the launcher's on-hit mechanics.
fn deliver(access: &mut BattleAccess, motion: &ProjectileMotion, hit: Hit) {
    let Some(target) = access.target_info(hit.target) else {
        return;
    };
    if hit.damage > 0.0 {
        access.apply_damage(DamageRequest {
            source: motion.source_id,
            target: hit.target,
            amount: hit.damage,
            crown_tower_multiplier: motion.crown_tower_multiplier,
        });
    }
    if let Some(status) = motion.status {
        access.apply_status(hit.target, status);
    }
    if let Some(source) = motion.source {
        let requests: Vec<EffectRequest> = access
            .dispatch(source, |mechanics, ctx| mechanics.dispatch_attack_hit(ctx, &target))
            .map(|(_, requests)| requests)
            .unwrap_or_default();
        access.resolve(requests);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archer() -> UnitDefinition {
        UnitDefinition {
            name: "Archer".to_string(),
            damage: 40.0,
            range: 5.0,
            sight_range: 5.5,
            ..default()
        }
    }

    fn bolt(policy: ImpactPolicy) -> ProjectileDefinition {
        ProjectileDefinition {
            speed: 10.0,
            policy,
            hit_radius: 0.5,
            status: None,
            range_budget: 0.0,
            homing: true,
        }
    }

    fn target_at(position: Vec2) -> TargetInfo {
        TargetInfo {
            entity: Entity::from_raw(9),
            id: EntityId(9),
            position,
            is_building: false,
            is_air: false,
        }
    }

    #[test]
    fn test_fired_projectile_homes_on_its_target() {
        let motion = ProjectileMotion::fired(
            Entity::from_raw(1),
            EntityId(1),
            &archer(),
            &bolt(ImpactPolicy::Direct),
            40.0,
            Vec2::new(9.0, 10.0),
            &target_at(Vec2::new(9.0, 14.0)),
        );
        assert_eq!(motion.destination, Vec2::new(9.0, 14.0));
        assert_eq!(motion.direction, Vec2::Y);
        assert_eq!(motion.homing_target, Some(Entity::from_raw(9)));
        assert_eq!(motion.source_id, Some(EntityId(1)));
    }

    #[test]
    fn test_piercing_projectile_flies_its_full_budget() {
        let archetype = archer();
        let motion = ProjectileMotion::fired(
            Entity::from_raw(1),
            EntityId(1),
            &archetype,
            &bolt(ImpactPolicy::Pierce {
                count: 3,
                width: 1.0,
            }),
            40.0,
            Vec2::new(9.0, 10.0),
            &target_at(Vec2::new(9.0, 12.0)),
        );
        let budget = archetype.projectile_budget();
        assert!(motion.homing_target.is_none());
        assert!((motion.destination.y - (10.0 + budget)).abs() < 1e-4);
        assert_eq!(motion.remaining_range, budget);
    }

    #[test]
    fn test_spell_budget_covers_the_whole_flight() {
        let motion = ProjectileMotion::spell(
            &archer(),
            &bolt(ImpactPolicy::Splash { radius: 2.5 }),
            Vec2::new(9.0, 2.5),
            Vec2::new(9.0, 22.5),
        );
        assert!(motion.source.is_none());
        assert_eq!(motion.destination, Vec2::new(9.0, 22.5));
        assert!(motion.remaining_range >= 20.0);
    }

    #[test]
    fn test_rolling_carrier_heads_for_the_enemy_side() {
        let flight = ProjectileMotion::spell(
            &archer(),
            &bolt(ImpactPolicy::Roll {
                width: 3.9,
                depth: 1.0,
                speed: 4.0,
                distance: 10.0,
                knockback: 0.7,
            }),
            Vec2::new(9.0, 29.5),
            Vec2::new(9.0, 20.0),
        );
        let carrier = flight.rolling(Player::Two, 3.9, 4.0, 10.0);
        assert_eq!(carrier.stage, FlightStage::Rolling);
        assert_eq!(carrier.direction, Vec2::NEG_Y);
        assert_eq!(carrier.destination, Vec2::new(9.0, 10.0));
        assert!((carrier.hit_radius - 1.95).abs() < 1e-6);
        assert!(carrier.visited.is_empty());
    }
}
