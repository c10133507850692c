//! Match Rules
//!
//! Tunable match-wide values: tick length, elixir economy, phase timings
//! and targeting margins. Loaded from `assets/config/rules.ron` or taken
//! from `MatchRules::default()`.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::constants::*;
use super::error::ConfigurationError;

/// Match-wide settings shared by every system.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRules {
    /// Length of one simulation tick in milliseconds
    pub tick_ms: u32,

    // === Elixir ===
    pub starting_elixir: f32,
    pub elixir_cap: f32,
    /// Milliseconds per elixir point in normal time
    pub elixir_regen_ms: f32,
    pub double_elixir_regen_ms: f32,
    pub triple_elixir_regen_ms: f32,

    // === Phases (milliseconds since match start) ===
    pub double_elixir_at_ms: u64,
    pub triple_elixir_at_ms: u64,
    pub sudden_death_at_ms: u64,
    pub match_end_ms: u64,

    // === Targeting ===
    /// Troops are preferred over buildings within this extra distance
    pub troop_priority_margin: f32,
    /// Distance a same-class candidate must win by to steal focus
    pub retarget_margin: f32,

    // === Combat ===
    pub knockback_attack_reset_ms: f32,
    /// Whether damaging the king tower wakes it up
    pub king_activates_on_damage: bool,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            starting_elixir: STARTING_ELIXIR,
            elixir_cap: ELIXIR_CAP,
            elixir_regen_ms: ELIXIR_REGEN_MS,
            double_elixir_regen_ms: DOUBLE_ELIXIR_REGEN_MS,
            triple_elixir_regen_ms: TRIPLE_ELIXIR_REGEN_MS,
            double_elixir_at_ms: DOUBLE_ELIXIR_MS,
            triple_elixir_at_ms: TRIPLE_ELIXIR_MS,
            sudden_death_at_ms: SUDDEN_DEATH_MS,
            match_end_ms: MATCH_END_MS,
            troop_priority_margin: TROOP_PRIORITY_MARGIN,
            retarget_margin: RETARGET_MARGIN,
            knockback_attack_reset_ms: KNOCKBACK_ATTACK_RESET_MS,
            king_activates_on_damage: true,
        }
    }
}

impl MatchRules {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |reason: &str| Err(ConfigurationError::InvalidRules(reason.to_string()));

        if self.tick_ms == 0 {
            return invalid("tick_ms must be positive");
        }
        if self.elixir_cap <= 0.0 || self.starting_elixir < 0.0 || self.starting_elixir > self.elixir_cap {
            return invalid("starting_elixir must lie within [0, elixir_cap]");
        }
        if self.elixir_regen_ms <= 0.0
            || self.double_elixir_regen_ms <= 0.0
            || self.triple_elixir_regen_ms <= 0.0
        {
            return invalid("elixir regen intervals must be positive");
        }
        if !(self.double_elixir_at_ms <= self.triple_elixir_at_ms
            && self.triple_elixir_at_ms <= self.sudden_death_at_ms
            && self.sudden_death_at_ms <= self.match_end_ms)
        {
            return invalid("phase times must be ordered: double <= triple <= sudden death <= end");
        }
        if self.troop_priority_margin < 0.0 || self.retarget_margin < 0.0 {
            return invalid("targeting margins cannot be negative");
        }
        Ok(())
    }

    pub fn from_ron_str(text: &str, origin: &str) -> Result<Self, ConfigurationError> {
        let rules: MatchRules = ron::from_str(text).map_err(|e| ConfigurationError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load rules from a RON file.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let rules = Self::from_ron_str(&contents, &path.display().to_string())?;
        info!("Loaded match rules from {}", path.display());
        Ok(rules)
    }

    pub fn dt_secs(&self) -> f32 {
        self.tick_ms as f32 / 1000.0
    }
}
