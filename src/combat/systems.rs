//! Combat systems
//!
//! ECS systems that feed the combat log from the battle event stream.

use bevy::prelude::*;

use crate::battle::components::SimClock;

use super::events::BattleEvents;
use super::log::CombatLog;

/// Record this tick's events to the combat log
pub fn record_combat_log(
    clock: Res<SimClock>,
    events: Res<BattleEvents>,
    mut combat_log: ResMut<CombatLog>,
) {
    combat_log.match_time = clock.elapsed_secs();
    for event in events.current() {
        combat_log.record(event);
    }
}
