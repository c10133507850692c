//! Battle Systems API
//!
//! One call to the schedule built here is one tick. Systems run single
//! threaded in eight ordered phases:
//!
//! 1. **Clock** - advance time, capture the live set, deploy timers, building
//!    decay, elixir regeneration
//! 2. **Mechanics** - scripted inputs, then `tick` dispatch to every mechanic
//! 3. **Targeting** - recompute status modifiers, refresh targets
//! 4. **Movement** - troops walk or fly toward their goal
//! 5. **Combat** - attacks, projectiles, area effects
//! 6. **StatusDecay** - status timers count down and expire
//! 7. **Death** - death dispatch and spawn chains
//! 8. **Outcome** - combat log, win condition
//!
//! No sync points are inserted between phases. Every `Commands` buffer is
//! applied once after the last system, so spawns and removals requested
//! during a tick land together at the tick boundary.

use bevy::ecs::schedule::{ExecutorKind, ScheduleBuildSettings, ScheduleLabel};
use bevy::prelude::*;

use crate::combat::events::BattleEvents;
use crate::combat::systems::record_combat_log;

use super::area::pulse_area_effects;
use super::combat::resolve_attacks;
use super::components::*;
use super::death::resolve_deaths;
use super::effects::{BattleAccess, EffectRequest};
use super::match_flow::{evaluate_outcome, regenerate_elixir};
use super::movement::move_troops;
use super::projectiles::advance_projectiles;
use super::status::StatusEffects;
use super::targeting::acquire_targets;

/// Label of the per-tick schedule.
#[derive(ScheduleLabel, Debug, Clone, PartialEq, Eq, Hash)]
pub struct BattleTick;

/// System set labels for the tick phases, in run order.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum BattlePhase {
    Clock,
    Mechanics,
    Targeting,
    Movement,
    Combat,
    StatusDecay,
    Death,
    Outcome,
}

/// Effects queued from outside the schedule (scripted damage, ability
/// activations). Resolved at the start of the next tick's mechanics phase.
#[derive(Resource, Debug, Default)]
pub struct PendingInputs(pub Vec<EffectRequest>);

/// Build the tick schedule.
pub fn build_schedule() -> Schedule {
    let mut schedule = Schedule::new(BattleTick);
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.set_build_settings(ScheduleBuildSettings {
        auto_insert_apply_deferred: false,
        ..default()
    });

    schedule.configure_sets(
        (
            BattlePhase::Clock,
            BattlePhase::Mechanics,
            BattlePhase::Targeting,
            BattlePhase::Movement,
            BattlePhase::Combat,
            BattlePhase::StatusDecay,
            BattlePhase::Death,
            BattlePhase::Outcome,
        )
            .chain(),
    );

    schedule.add_systems(
        (
            advance_clock,
            capture_live_set,
            tick_deploy_timers,
            decay_buildings,
            regenerate_elixir,
        )
            .chain()
            .in_set(BattlePhase::Clock),
    );
    schedule.add_systems(
        (apply_pending_inputs, tick_mechanics)
            .chain()
            .in_set(BattlePhase::Mechanics),
    );
    schedule.add_systems(
        (refresh_modifiers, acquire_targets)
            .chain()
            .in_set(BattlePhase::Targeting),
    );
    schedule.add_systems(move_troops.in_set(BattlePhase::Movement));
    schedule.add_systems(
        (resolve_attacks, advance_projectiles, pulse_area_effects)
            .chain()
            .in_set(BattlePhase::Combat),
    );
    schedule.add_systems(decay_statuses.in_set(BattlePhase::StatusDecay));
    schedule.add_systems(resolve_deaths.in_set(BattlePhase::Death));
    schedule.add_systems(
        (record_combat_log, evaluate_outcome)
            .chain()
            .in_set(BattlePhase::Outcome),
    );
    schedule
}

// ============================================================================
// Clock phase
// ============================================================================

pub fn advance_clock(mut clock: ResMut<SimClock>, mut events: ResMut<BattleEvents>) {
    clock.advance();
    events.begin_tick();
}

/// Snapshot the live entities for this tick, ordered by stable id.
pub fn capture_live_set(
    mut live: ResMut<LiveSet>,
    entities: Query<(Entity, &EntityId, Option<&Health>)>,
) {
    live.entries = entities
        .iter()
        .filter(|(_, _, health)| health.map_or(true, |h| !h.is_dead()))
        .map(|(entity, id, _)| (*id, entity))
        .collect();
    live.entries.sort_unstable_by_key(|(id, _)| *id);
}

pub fn tick_deploy_timers(clock: Res<SimClock>, mut timers: Query<&mut DeployTimer>) {
    for mut timer in timers.iter_mut() {
        if !timer.is_deployed() {
            timer.remaining_ms = timer.remaining_ms.saturating_sub(clock.dt_ms);
        }
    }
}

/// Buildings with a lifetime lose their hitpoints evenly over it.
pub fn decay_buildings(clock: Res<SimClock>, mut buildings: Query<(&mut Lifetime, &mut Health)>) {
    for (mut lifetime, mut health) in buildings.iter_mut() {
        if lifetime.total_ms == 0 || !health.is_alive() {
            continue;
        }
        lifetime.elapsed_ms += clock.dt_ms;
        if lifetime.elapsed_ms >= lifetime.total_ms {
            let remaining = health.current;
            health.lose(remaining);
        } else {
            let decay = health.max * clock.dt_ms as f32 / lifetime.total_ms as f32;
            health.lose(decay);
        }
    }
}

// ============================================================================
// Mechanics phase
// ============================================================================

pub fn apply_pending_inputs(mut access: BattleAccess, mut pending: ResMut<PendingInputs>) {
    let requests = std::mem::take(&mut pending.0);
    if !requests.is_empty() {
        access.resolve(requests);
    }
}

/// Dispatch `tick` (and the first-time `spawn`) to every deployed, live
/// entity's mechanics, then resolve what they asked for.
pub fn tick_mechanics(mut access: BattleAccess) {
    let mut requests = Vec::new();
    for entity in access.live_entities() {
        if !access.is_alive(entity) || !access.is_deployed(entity) {
            continue;
        }
        if let Some((_, mut requested)) =
            access.dispatch(entity, |mechanics, ctx| mechanics.dispatch_tick(ctx))
        {
            requests.append(&mut requested);
        }
    }
    access.resolve(requests);
}

// ============================================================================
// Status phases
// ============================================================================

/// Recompute status multipliers before movement and combat use them.
pub fn refresh_modifiers(mut statuses: Query<&mut StatusEffects>) {
    for mut status in statuses.iter_mut() {
        status.refresh();
    }
}

pub fn decay_statuses(clock: Res<SimClock>, mut statuses: Query<&mut StatusEffects>) {
    for mut status in statuses.iter_mut() {
        status.table.tick(clock.dt_ms);
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::system::RunSystemOnce;

    use super::*;

    #[test]
    fn test_live_set_is_sorted_by_id() {
        let mut world = World::new();
        world.insert_resource(LiveSet::default());
        let late = world.spawn(EntityId(7)).id();
        let early = world.spawn(EntityId(2)).id();
        let mut dead = Health::new(10.0);
        dead.lose(10.0);
        dead.mark_dead();
        world.spawn((EntityId(4), dead));

        world.run_system_once(capture_live_set).unwrap();
        let live = world.resource::<LiveSet>();
        assert_eq!(live.entries, vec![(EntityId(2), early), (EntityId(7), late)]);
    }

    #[test]
    fn test_building_decays_to_zero_over_lifetime() {
        let mut world = World::new();
        world.insert_resource(SimClock::new(100));
        let building = world
            .spawn((
                Lifetime {
                    total_ms: 1000,
                    elapsed_ms: 0,
                },
                Health::new(500.0),
            ))
            .id();

        for _ in 0..5 {
            world.run_system_once(decay_buildings).unwrap();
        }
        let health = world.entity(building).get::<Health>().copied().unwrap();
        assert!((health.current - 250.0).abs() < 1e-3);

        for _ in 0..5 {
            world.run_system_once(decay_buildings).unwrap();
        }
        let health = world.entity(building).get::<Health>().copied().unwrap();
        assert_eq!(health.current, 0.0);
        assert!(health.awaiting_death());
    }
}
