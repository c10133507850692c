//! JSON configuration parsing for headless mode
//!
//! Parses JSON match scripts: seed, optional decks, and the timed
//! deployments and ability activations to replay.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::battle::components::Player;
use crate::battle::constants::DECK_SIZE;

/// A card played at a fixed match time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedDeployment {
    /// Match time in seconds at which the card is played
    pub time_secs: f32,
    /// Player number (1 or 2)
    pub player: u8,
    /// Archetype name
    pub card: String,
    pub x: f32,
    pub y: f32,
}

/// Ability activation on the unit placed by an earlier deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedAbility {
    pub time_secs: f32,
    /// 0-based index into `deployments`
    pub deployment: usize,
}

/// Headless match configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessMatchConfig {
    /// Random seed for deterministic match reproduction
    /// If omitted, a seed is drawn at start-up and reported in the result
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Maximum match duration in seconds (default: 360)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f32,
    /// Player 1's eight cards (optional; without a deck any card can be played)
    #[serde(default)]
    pub player1_deck: Option<Vec<String>>,
    /// Player 2's eight cards
    #[serde(default)]
    pub player2_deck: Option<Vec<String>>,
    #[serde(default)]
    pub deployments: Vec<ScriptedDeployment>,
    #[serde(default)]
    pub abilities: Vec<ScriptedAbility>,
    /// Unit catalog to load instead of the built-in one
    #[serde(default)]
    pub units_path: Option<String>,
    /// Match rules to load instead of the defaults
    #[serde(default)]
    pub rules_path: Option<String>,
    /// Where to write the combat log as JSON (optional)
    #[serde(default)]
    pub output_path: Option<String>,
}

fn default_max_duration() -> f32 {
    360.0
}

impl Default for HeadlessMatchConfig {
    fn default() -> Self {
        Self {
            random_seed: None,
            max_duration_secs: default_max_duration(),
            player1_deck: None,
            player2_deck: None,
            deployments: Vec::new(),
            abilities: Vec::new(),
            units_path: None,
            rules_path: None,
            output_path: None,
        }
    }
}

impl HeadlessMatchConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_json(&contents)
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        let config: HeadlessMatchConfig =
            serde_json::from_str(text).map_err(|e| format!("Failed to parse JSON: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_duration_secs <= 0.0 {
            return Err("max_duration_secs must be positive".to_string());
        }

        for (label, deck) in [("player1_deck", &self.player1_deck), ("player2_deck", &self.player2_deck)] {
            if let Some(deck) = deck {
                if deck.len() != DECK_SIZE {
                    return Err(format!(
                        "{} must have exactly {} cards, got {}",
                        label,
                        DECK_SIZE,
                        deck.len()
                    ));
                }
            }
        }

        for (i, deployment) in self.deployments.iter().enumerate() {
            if Player::from_number(deployment.player).is_none() {
                return Err(format!(
                    "deployment {}: player must be 1 or 2, got {}",
                    i, deployment.player
                ));
            }
            if deployment.time_secs < 0.0 {
                return Err(format!("deployment {}: time_secs cannot be negative", i));
            }
        }

        for (i, ability) in self.abilities.iter().enumerate() {
            let Some(deployment) = self.deployments.get(ability.deployment) else {
                return Err(format!(
                    "ability {}: deployment {} is out of range ({} deployments)",
                    i,
                    ability.deployment,
                    self.deployments.len()
                ));
            };
            if ability.time_secs < deployment.time_secs {
                return Err(format!(
                    "ability {}: activates before its deployment is played",
                    i
                ));
            }
        }

        Ok(())
    }
}
