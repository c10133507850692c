//! LaneSim - Deterministic Lane Battle Simulator
//!
//! A tick-based simulator for a competitive two-player lane battle: units
//! are deployed, move, target, attack, apply status effects, spawn on death
//! and fight over crown towers until one side wins.
//!
//! This library exposes the simulation core, the combat log and the
//! headless match runner for testing and reuse.

pub mod battle;
pub mod cli;
pub mod combat;
pub mod headless;

// Re-export commonly used types
pub use battle::components::{EntityId, Player};
pub use battle::error::{AbilityError, ConfigurationError, DeploymentError};
pub use battle::match_flow::{MatchOutcome, VictoryReason};
pub use battle::rules::MatchRules;
pub use battle::unit_config::UnitCatalog;
pub use battle::{create_match, BattleSnapshot, BattleState};
pub use combat::log::{CombatLog, CombatLogEventType};
pub use headless::HeadlessMatchConfig;
