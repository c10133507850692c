//! Target Acquisition
//!
//! Once per tick every deployed attacker re-evaluates its target:
//!
//! 1. Candidates must be alive, hostile and visible
//! 2. within sight range (measured to the candidate's edge)
//! 3. hittable by the attacker's target class (ground / air / both)
//! 4. buildings only, for building-restricted attackers
//!
//! The nearest candidate wins, ties go to the lowest stable id. Troops are
//! preferred over buildings unless the building is closer by more than the
//! priority margin. An attacker keeps a valid target unless a same-class
//! candidate is closer by more than the retarget margin, or a troop shows up
//! while it is hitting a building.

use bevy::prelude::*;

use super::components::*;
use super::effects::BattleAccess;
use super::rules::MatchRules;
use super::unit_config::TargetClass;

/// The attacker's side of a targeting decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seeker {
    pub owner: Player,
    pub position: Vec2,
    pub sight_range: f32,
    pub targets: TargetClass,
    pub buildings_only: bool,
}

/// A potential target as seen at the start of the targeting pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub entity: Entity,
    pub id: EntityId,
    pub owner: Player,
    pub position: Vec2,
    pub radius: f32,
    pub is_air: bool,
    pub is_building: bool,
    pub alive: bool,
    pub invisible: bool,
}

impl Seeker {
    pub fn qualifies(&self, candidate: &Candidate) -> bool {
        candidate.alive
            && candidate.owner != self.owner
            && !candidate.invisible
            && self.position.distance(candidate.position) <= self.sight_range + candidate.radius
            && self.targets.can_hit(candidate.is_air)
            && (!self.buildings_only || candidate.is_building)
    }

    fn distance(&self, candidate: &Candidate) -> f32 {
        self.position.distance(candidate.position)
    }

    /// Nearest qualifying candidate of one class, lowest id on ties.
    fn nearest<'a>(&self, candidates: &'a [Candidate], buildings: bool) -> Option<&'a Candidate> {
        candidates
            .iter()
            .filter(|c| c.is_building == buildings && self.qualifies(c))
            .min_by(|a, b| {
                self.distance(a)
                    .total_cmp(&self.distance(b))
                    .then(a.id.cmp(&b.id))
            })
    }
}

/// Best target ignoring the current one.
pub fn preferred_target<'a>(
    seeker: &Seeker,
    candidates: &'a [Candidate],
    rules: &MatchRules,
) -> Option<&'a Candidate> {
    let building = seeker.nearest(candidates, true);
    if seeker.buildings_only {
        return building;
    }
    match (seeker.nearest(candidates, false), building) {
        (Some(troop), Some(building)) => {
            if seeker.distance(troop) <= seeker.distance(building) + rules.troop_priority_margin {
                Some(troop)
            } else {
                Some(building)
            }
        }
        (troop, building) => troop.or(building),
    }
}

/// Decide the seeker's target for this tick.
pub fn select_target(
    seeker: &Seeker,
    current: Option<&Candidate>,
    candidates: &[Candidate],
    rules: &MatchRules,
) -> Option<Entity> {
    let preferred = preferred_target(seeker, candidates, rules);
    let Some(current) = current.filter(|c| seeker.qualifies(c)) else {
        return preferred.map(|c| c.entity);
    };
    let Some(preferred) = preferred else {
        return Some(current.entity);
    };
    if preferred.entity == current.entity {
        return Some(current.entity);
    }

    let d_current = seeker.distance(current);
    let d_preferred = seeker.distance(preferred);
    let switch = match (current.is_building, preferred.is_building) {
        // A troop stepping up pulls focus off a building.
        (true, false) => d_preferred <= d_current + rules.troop_priority_margin,
        (false, true) => false,
        _ => d_preferred + rules.retarget_margin < d_current,
    };
    Some(if switch { preferred.entity } else { current.entity })
}

/// Edge-to-edge attack reach check.
pub fn in_attack_range(
    position: Vec2,
    radius: f32,
    range: f32,
    target_position: Vec2,
    target_radius: f32,
) -> bool {
    position.distance(target_position) <= range + radius + target_radius
}

/// Refresh every attacker's target.
pub fn acquire_targets(mut access: BattleAccess) {
    let candidates: Vec<Candidate> = access
        .live
        .entities()
        .filter_map(|entity| {
            let unit = access.units.get(entity).ok()?;
            if !unit.kind.is_damageable() {
                return None;
            }
            let body = unit.body?;
            Some(Candidate {
                entity,
                id: *unit.id,
                owner: unit.owner.0,
                position: unit.position.0,
                radius: body.collision_radius,
                is_air: body.is_air,
                is_building: *unit.kind == EntityKind::Building,
                alive: unit.health.is_some_and(|h| h.is_alive()),
                invisible: unit.statuses.is_some_and(|s| s.is_invisible()),
            })
        })
        .collect();

    let mut decisions = Vec::new();
    for entity in access.live.entities() {
        let Ok(unit) = access.units.get(entity) else {
            continue;
        };
        let (Some(archetype), Some(targeting)) = (unit.archetype, unit.targeting) else {
            continue;
        };
        if !archetype.0.can_attack() || !unit.health.is_some_and(|h| h.is_alive()) {
            continue;
        }
        if unit.deploy.is_some_and(|d| !d.is_deployed()) {
            continue;
        }
        if unit.tower.is_some_and(|t| !t.active) {
            decisions.push((entity, None));
            continue;
        }
        if unit.statuses.is_some_and(|s| s.is_disabled()) {
            continue;
        }

        let seeker = Seeker {
            owner: unit.owner.0,
            position: unit.position.0,
            sight_range: archetype.0.sight_range,
            targets: archetype.0.targets,
            buildings_only: archetype.0.targets_buildings_only,
        };
        let current = targeting
            .target
            .and_then(|t| candidates.iter().find(|c| c.entity == t));
        let chosen = select_target(&seeker, current, &candidates, &access.rules);
        if chosen != targeting.target {
            decisions.push((entity, chosen));
        }
    }

    for (entity, target) in decisions {
        if let Ok(unit) = access.units.get_mut(entity) {
            if let Some(mut targeting) = unit.targeting {
                targeting.target = target;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeker() -> Seeker {
        Seeker {
            owner: Player::One,
            position: Vec2::new(9.0, 10.0),
            sight_range: 5.5,
            targets: TargetClass::Ground,
            buildings_only: false,
        }
    }

    fn candidate(id: u32, x: f32, y: f32) -> Candidate {
        Candidate {
            entity: Entity::from_raw(id),
            id: EntityId(id),
            owner: Player::Two,
            position: Vec2::new(x, y),
            radius: 0.5,
            is_air: false,
            is_building: false,
            alive: true,
            invisible: false,
        }
    }

    fn pick(candidates: &[Candidate], current: Option<u32>) -> Option<u32> {
        let current = current.and_then(|id| candidates.iter().find(|c| c.id.0 == id));
        select_target(&seeker(), current, candidates, &MatchRules::default()).map(|e| e.index())
    }

    #[test]
    fn test_nearest_wins_and_ties_go_to_lowest_id() {
        let candidates = [candidate(5, 9.0, 13.0), candidate(3, 9.0, 12.0), candidate(2, 9.0, 7.5)];
        assert_eq!(pick(&candidates, None), Some(3));

        let tied = [candidate(7, 11.0, 10.0), candidate(4, 7.0, 10.0)];
        assert_eq!(pick(&tied, None), Some(4));
    }

    #[test]
    fn test_filters_apply_in_order() {
        let mut friendly = candidate(1, 9.0, 11.0);
        friendly.owner = Player::One;
        let mut dead = candidate(2, 9.0, 11.0);
        dead.alive = false;
        let mut flying = candidate(3, 9.0, 11.0);
        flying.is_air = true;
        let mut hidden = candidate(4, 9.0, 11.0);
        hidden.invisible = true;
        let far = candidate(5, 9.0, 16.5);
        assert_eq!(pick(&[friendly, dead, flying, hidden, far], None), None);

        // Sight is measured to the candidate's edge.
        let edge = candidate(6, 9.0, 15.9);
        assert_eq!(pick(&[edge], None), Some(6));
    }

    #[test]
    fn test_troops_beat_slightly_closer_buildings() {
        let mut building = candidate(1, 9.0, 12.0);
        building.is_building = true;
        let troop = candidate(2, 9.0, 12.8);
        assert_eq!(pick(&[building, troop], None), Some(2));

        let far_troop = candidate(3, 9.0, 14.0);
        assert_eq!(pick(&[building, far_troop], None), Some(1));
    }

    #[test]
    fn test_building_restricted_seeker_ignores_troops() {
        let mut restricted = seeker();
        restricted.buildings_only = true;
        let mut building = candidate(1, 9.0, 14.0);
        building.is_building = true;
        let troop = candidate(2, 9.0, 11.0);
        let chosen = select_target(&restricted, None, &[troop, building], &MatchRules::default());
        assert_eq!(chosen, Some(building.entity));
    }

    #[test]
    fn test_retargeting_needs_a_clear_margin() {
        let current = candidate(1, 9.0, 12.0);
        let slightly_closer = candidate(2, 9.0, 11.8);
        assert_eq!(pick(&[current, slightly_closer], Some(1)), Some(1));

        let much_closer = candidate(3, 9.0, 11.0);
        assert_eq!(pick(&[current, much_closer], Some(1)), Some(3));
    }

    #[test]
    fn test_invalid_current_target_is_replaced() {
        let mut current = candidate(1, 9.0, 12.0);
        current.alive = false;
        let other = candidate(2, 9.0, 13.0);
        assert_eq!(pick(&[current, other], Some(1)), Some(2));
    }

    #[test]
    fn test_attack_range_is_edge_to_edge() {
        let a = Vec2::new(0.0, 0.0);
        assert!(in_attack_range(a, 0.5, 1.0, Vec2::new(2.0, 0.0), 0.5));
        assert!(!in_attack_range(a, 0.5, 1.0, Vec2::new(2.1, 0.0), 0.5));
    }
}
