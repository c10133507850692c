//! Movement
//!
//! Troops walk toward their target, or without one toward the enemy princess
//! tower on their lane, then the enemy king tower. Ground troops cross the
//! river only on a bridge; air troops and river jumpers fly straight.
//! A troop with its target inside attack range stays put.
//!
//! Every new position is computed from the positions at the start of the
//! pass and written back afterwards.

use bevy::prelude::*;

use super::arena::{clamp_to_arena, enemy_baseline, ground_waypoint, is_walkable, Lane};
use super::components::*;
use super::effects::BattleAccess;
use super::targeting::in_attack_range;

/// A crown tower as movement sees it.
#[derive(Debug, Clone, Copy)]
struct TowerMark {
    owner: Player,
    role: TowerRole,
    position: Vec2,
}

/// Where a troop without a target heads.
fn default_goal(owner: Player, position: Vec2, towers: &[TowerMark]) -> Vec2 {
    let lane = Lane::of(position);
    let enemy = owner.opponent();
    let find = |role: TowerRole| {
        towers
            .iter()
            .find(|t| t.owner == enemy && t.role == role)
            .map(|t| t.position)
    };
    find(lane.princess_role())
        .or_else(|| find(TowerRole::King))
        .unwrap_or_else(|| enemy_baseline(owner, lane))
}

/// Move `from` toward `waypoint` by at most `step`, never past `limit`
/// tiles when the waypoint is the final goal.
fn advance(from: Vec2, waypoint: Vec2, step: f32, limit: Option<f32>) -> Vec2 {
    let offset = waypoint - from;
    let distance = offset.length();
    if distance <= f32::EPSILON {
        return from;
    }
    let travel = match limit {
        Some(limit) => step.min(limit.max(0.0)),
        None => step.min(distance),
    };
    from + offset / distance * travel
}

/// Keep ground movement out of the river and off blocked tiles. Tries the
/// horizontal then the vertical component before giving up for the tick.
fn constrain_ground(from: Vec2, to: Vec2) -> Vec2 {
    if is_walkable(to) || !is_walkable(from) {
        return to;
    }
    let sideways = Vec2::new(to.x, from.y);
    if is_walkable(sideways) {
        return sideways;
    }
    let forward = Vec2::new(from.x, to.y);
    if is_walkable(forward) {
        return forward;
    }
    from
}

pub fn move_troops(mut access: BattleAccess) {
    let dt = access.clock.dt_secs();

    let towers: Vec<TowerMark> = access
        .live
        .entities()
        .filter_map(|entity| {
            let unit = access.units.get(entity).ok()?;
            let tower = unit.tower?;
            unit.health.filter(|h| h.is_alive())?;
            Some(TowerMark {
                owner: unit.owner.0,
                role: tower.role,
                position: unit.position.0,
            })
        })
        .collect();

    let mut moves = Vec::new();
    for entity in access.live.entities() {
        let Ok(unit) = access.units.get(entity) else {
            continue;
        };
        if *unit.kind != EntityKind::Troop || !unit.health.is_some_and(|h| h.is_alive()) {
            continue;
        }
        if unit.deploy.is_some_and(|d| !d.is_deployed()) {
            continue;
        }
        let Some(archetype) = unit.archetype else {
            continue;
        };
        let (move_speed, disabled) = unit
            .statuses
            .map_or((1.0, false), |s| (s.modifiers.move_speed, s.is_disabled()));
        if disabled || archetype.0.speed <= 0.0 {
            continue;
        }

        let position = unit.position.0;
        let radius = unit.body.map_or(0.0, |b| b.collision_radius);
        let is_air = unit.body.is_some_and(|b| b.is_air);
        let (speed_multiplier, jumps_river) = unit
            .mechanics
            .map_or((1.0, false), |m| (m.speed_multiplier(), m.crosses_river()));

        let target = unit
            .targeting
            .and_then(|t| t.target)
            .and_then(|t| access.target_info(t).map(|info| (t, info)));
        let (goal, stop_distance) = match target {
            Some((target_entity, info)) => {
                let target_radius = access
                    .units
                    .get(target_entity)
                    .ok()
                    .and_then(|t| t.body.map(|b| b.collision_radius))
                    .unwrap_or(0.0);
                if in_attack_range(position, radius, archetype.0.range, info.position, target_radius) {
                    continue;
                }
                (info.position, archetype.0.range + radius + target_radius)
            }
            None => (default_goal(unit.owner.0, position, &towers), 0.0),
        };

        let step = archetype.0.speed * move_speed * speed_multiplier * dt;
        let free_flight = is_air || jumps_river;
        let waypoint = if free_flight {
            goal
        } else {
            ground_waypoint(position, goal)
        };
        let limit = (waypoint == goal).then(|| position.distance(goal) - stop_distance);
        let mut next = advance(position, waypoint, step, limit);
        if !free_flight {
            next = constrain_ground(position, next);
        }
        let next = clamp_to_arena(next);
        if next != position {
            moves.push((entity, next));
        }
    }

    for (entity, next) in moves {
        if let Ok(mut unit) = access.units.get_mut(entity) {
            unit.position.0 = next;
        }
    }
}
