//! Combat logging
//!
//! Records battle events as timestamped, human-readable entries for
//! post-match analysis, and keeps running damage totals per source.

use std::collections::BTreeMap;
use std::path::Path;

use bevy::prelude::*;
use serde::Serialize;

use crate::battle::components::EntityId;

use super::events::BattleEvent;

/// A single entry in the combat log
#[derive(Debug, Clone, Serialize)]
pub struct CombatLogEntry {
    /// Timestamp in match time (seconds since match start)
    pub timestamp: f32,
    /// The type of event
    pub event_type: CombatLogEventType,
    /// Human-readable description of the event
    pub message: String,
}

/// Types of combat log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CombatLogEventType {
    /// Unit, building or spell entered the battle
    Spawn,
    /// Damage dealt
    Damage,
    /// Entity died
    Death,
    /// Manual ability activated
    AbilityUsed,
    /// Shield pool depleted
    ShieldBroken,
    /// Crown tower destroyed
    TowerDestroyed,
    /// Match event (start, elixir phases, end)
    MatchEvent,
}

/// Match summary written next to the log entries.
#[derive(Debug, Clone, Serialize)]
pub struct MatchMetadata {
    pub random_seed: u64,
    /// Winning player (1 or 2), or None for a draw
    pub winner: Option<u8>,
    pub crowns: [u32; 2],
    pub duration_secs: f32,
}

#[derive(Serialize)]
struct SavedLog<'a> {
    metadata: &'a MatchMetadata,
    damage_by_source: Vec<(String, f32)>,
    entries: &'a [CombatLogEntry],
}

/// The combat log resource storing all events
#[derive(Resource, Debug, Default)]
pub struct CombatLog {
    /// All log entries in chronological order
    pub entries: Vec<CombatLogEntry>,
    /// Current match time
    pub match_time: f32,
    names: BTreeMap<EntityId, String>,
    damage_by_source: BTreeMap<EntityId, f32>,
}

impl CombatLog {
    /// Clear the log for a new match
    pub fn clear(&mut self) {
        self.entries.clear();
        self.names.clear();
        self.damage_by_source.clear();
        self.match_time = 0.0;
    }

    /// Add a new entry to the log
    pub fn log(&mut self, event_type: CombatLogEventType, message: String) {
        self.entries.push(CombatLogEntry {
            timestamp: self.match_time,
            event_type,
            message,
        });
    }

    /// Display name of an entity, e.g. `P1 Knight #7`.
    pub fn name_of(&self, id: EntityId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Unknown {}", id))
    }

    /// Turn a battle event into a log entry.
    pub fn record(&mut self, event: &BattleEvent) {
        match event {
            BattleEvent::Spawn {
                id,
                owner,
                archetype,
                x,
                y,
            } => {
                let name = format!("P{} {} {}", owner.number(), archetype, id);
                let message = format!("{} enters at ({:.1}, {:.1})", name, x, y);
                self.names.insert(*id, name);
                self.log(CombatLogEventType::Spawn, message);
            }
            BattleEvent::Damage {
                source,
                target,
                amount,
                absorbed,
            } => {
                let source_name = match source {
                    Some(source) => {
                        *self.damage_by_source.entry(*source).or_insert(0.0) += amount;
                        self.name_of(*source)
                    }
                    None => "Script".to_string(),
                };
                let shielded = if *absorbed > 0.0 {
                    format!(" ({:.0} absorbed)", absorbed)
                } else {
                    String::new()
                };
                let message = format!(
                    "{} hits {} for {:.0} damage{}",
                    source_name,
                    self.name_of(*target),
                    amount,
                    shielded
                );
                self.log(CombatLogEventType::Damage, message);
            }
            BattleEvent::Death { id, .. } => {
                let message = format!("{} has died", self.name_of(*id));
                self.log(CombatLogEventType::Death, message);
            }
            BattleEvent::AbilityActivated {
                id,
                ability,
                elixir_cost,
                ..
            } => {
                let message = format!(
                    "{} activates {} ({} elixir)",
                    self.name_of(*id),
                    ability,
                    elixir_cost
                );
                self.log(CombatLogEventType::AbilityUsed, message);
            }
            BattleEvent::ShieldBroken { id } => {
                let message = format!("{}'s shield breaks", self.name_of(*id));
                self.log(CombatLogEventType::ShieldBroken, message);
            }
            BattleEvent::TowerDestroyed { owner, role, .. } => {
                let message = format!("{}'s {:?} tower destroyed", owner, role);
                self.log(CombatLogEventType::TowerDestroyed, message);
            }
        }
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: CombatLogEventType) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Total hitpoints removed by one source so far
    pub fn damage_dealt_by(&self, source: EntityId) -> f32 {
        self.damage_by_source.get(&source).copied().unwrap_or(0.0)
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&CombatLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    /// Write the log and match summary as pretty JSON. Returns the path written.
    pub fn save_to_file(&self, metadata: &MatchMetadata, path: &Path) -> Result<String, String> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
        let saved = SavedLog {
            metadata,
            damage_by_source: self
                .damage_by_source
                .iter()
                .map(|(id, total)| (self.name_of(*id), *total))
                .collect(),
            entries: &self.entries,
        };
        let json = serde_json::to_string_pretty(&saved)
            .map_err(|e| format!("Failed to serialize combat log: {}", e))?;
        std::fs::write(path, json)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
        Ok(path.display().to_string())
    }
}
