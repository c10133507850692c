//! Battle events
//!
//! Discrete events emitted by the simulation in deterministic order, for
//! replay, telemetry and the combat log. The simulation never reads them back.

use bevy::prelude::*;
use serde::Serialize;

use crate::battle::components::{EntityId, Player, TowerRole};

/// Something observable that happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BattleEvent {
    /// An entity entered the battle
    Spawn {
        /// Stable id of the new entity
        id: EntityId,
        /// Owning player
        owner: Player,
        /// Archetype the entity was built from
        archetype: String,
        /// Spawn position
        x: f32,
        y: f32,
    },
    /// Hitpoints were removed
    Damage {
        /// Attacker, spell or death effect responsible (None for scripted damage)
        source: Option<EntityId>,
        /// Entity that took the damage
        target: EntityId,
        /// Hitpoints actually lost
        amount: f32,
        /// Damage soaked up by shields before reaching hitpoints
        absorbed: f32,
    },
    /// An entity died. Emitted exactly once per entity.
    Death {
        id: EntityId,
        owner: Player,
        archetype: String,
    },
    /// A manual ability was activated
    AbilityActivated {
        id: EntityId,
        owner: Player,
        /// Name of the ability
        ability: String,
        /// Elixir paid
        elixir_cost: u32,
    },
    /// A shield pool ran out
    ShieldBroken { id: EntityId },
    /// A crown tower fell
    TowerDestroyed {
        id: EntityId,
        /// Player who lost the tower
        owner: Player,
        role: TowerRole,
    },
}

/// Events of the tick that just ran, plus events raised between ticks
/// (deployments, ability activations) waiting for the next one.
#[derive(Resource, Debug, Default)]
pub struct BattleEvents {
    current: Vec<BattleEvent>,
    staged: Vec<BattleEvent>,
}

impl BattleEvents {
    /// Record an event raised during the running tick.
    pub fn push(&mut self, event: BattleEvent) {
        self.current.push(event);
    }

    /// Record an event raised between ticks. It is reported with the next tick.
    pub fn stage(&mut self, event: BattleEvent) {
        self.staged.push(event);
    }

    /// Start a new tick: drop the previous tick's events and take the staged ones.
    pub fn begin_tick(&mut self) {
        self.current.clear();
        self.current.append(&mut self.staged);
    }

    pub fn current(&self) -> &[BattleEvent] {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staged_events_move_into_next_tick() {
        let mut events = BattleEvents::default();
        events.push(BattleEvent::ShieldBroken { id: EntityId(1) });
        events.stage(BattleEvent::ShieldBroken { id: EntityId(2) });
        assert_eq!(events.current().len(), 1);

        events.begin_tick();
        assert_eq!(
            events.current(),
            &[BattleEvent::ShieldBroken { id: EntityId(2) }]
        );

        events.begin_tick();
        assert!(events.current().is_empty());
    }
}
