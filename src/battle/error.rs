//! Typed errors surfaced by the battle API.

use thiserror::Error;

/// Why a deployment was rejected. Never fatal: the match continues unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeploymentError {
    #[error("the match is already over")]
    MatchOver,
    #[error("unknown archetype '{0}'")]
    UnknownArchetype(String),
    #[error("'{0}' is not in the player's hand")]
    NotInHand(String),
    #[error("not enough elixir: have {available:.1}, need {cost}")]
    InsufficientElixir { available: f32, cost: u32 },
    #[error("cannot deploy at ({x:.1}, {y:.1})")]
    InvalidPosition { x: f32, y: f32 },
    #[error("position ({x:.1}, {y:.1}) is occupied by a building")]
    Occupied { x: f32, y: f32 },
}

/// Why a manual ability activation was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AbilityError {
    #[error("the match is already over")]
    MatchOver,
    #[error("no live entity with id {0}")]
    UnknownEntity(u32),
    #[error("entity has no activatable ability")]
    NoAbility,
    #[error("ability is on cooldown for another {remaining_ms} ms")]
    OnCooldown { remaining_ms: u32 },
    #[error("ability is already active")]
    AlreadyActive,
    #[error("not enough elixir: have {available:.1}, need {cost}")]
    InsufficientElixir { available: f32, cost: u32 },
    #[error("not enough souls: have {collected}, need {required}")]
    NotEnoughSouls { collected: u32, required: u32 },
}

/// Invalid static data. Raised while loading, before any match exists.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {origin}: {message}")]
    Parse { origin: String, message: String },
    #[error("{unit}: invalid {field}: {reason}")]
    InvalidStat {
        unit: String,
        field: &'static str,
        reason: String,
    },
    #[error("{unit} references unknown archetype '{reference}'")]
    UnknownReference { unit: String, reference: String },
    /// Spawning `cycle[0]` eventually spawns `cycle[0]` again.
    #[error("spawn cycle: {}", .cycle.join(" -> "))]
    SpawnCycle { cycle: Vec<String> },
    #[error("required archetype '{0}' is missing")]
    MissingArchetype(String),
    #[error("invalid match rules: {0}")]
    InvalidRules(String),
    #[error("invalid deck: {0}")]
    InvalidDeck(String),
}
