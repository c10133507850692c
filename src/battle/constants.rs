//! Battle Constants
//!
//! Arena geometry and the default values behind `MatchRules`.
//! Distances are in tiles, times in milliseconds unless noted otherwise.

// ============================================================================
// Arena
// ============================================================================

/// Arena width in tiles.
pub const ARENA_WIDTH: f32 = 18.0;

/// Arena length in tiles. Player one holds `y < 16`, player two `y >= 16`.
pub const ARENA_HEIGHT: f32 = 32.0;

/// First river row. Ground units may only stand in `[RIVER_START, RIVER_END)`
/// on a bridge.
pub const RIVER_START: f32 = 15.0;

/// First row past the river.
pub const RIVER_END: f32 = 17.0;

/// Centre line between the two halves.
pub const RIVER_CENTER: f32 = 16.0;

/// Bridge centre x coordinates, left lane first.
pub const BRIDGE_CENTERS: [f32; 2] = [3.5, 14.5];

/// Half the bridge width. Bridges are three tiles wide.
pub const BRIDGE_HALF_WIDTH: f32 = 1.5;

/// x coordinate splitting the left lane from the right lane.
pub const LANE_SPLIT_X: f32 = 9.0;

/// Rows of enemy territory opened up for deployment once the enemy
/// princess tower of that lane falls.
pub const POCKET_DEPTH: f32 = 4.0;

// ============================================================================
// Crown tower sites (player one; player two is mirrored across the river)
// ============================================================================

pub const KING_TOWER_SITE: (f32, f32) = (9.0, 2.5);
pub const LEFT_PRINCESS_SITE: (f32, f32) = (3.5, 6.5);
pub const RIGHT_PRINCESS_SITE: (f32, f32) = (14.5, 6.5);

/// Archetype names the catalog must provide for a full match.
pub const KING_TOWER_ARCHETYPE: &str = "KingTower";
pub const PRINCESS_TOWER_ARCHETYPE: &str = "PrincessTower";

// ============================================================================
// Timing
// ============================================================================

/// Simulation tick length (~30 Hz).
pub const TICK_MS: u32 = 33;

/// Double elixir starts two minutes in.
pub const DOUBLE_ELIXIR_MS: u64 = 120_000;

/// Triple elixir starts four minutes in.
pub const TRIPLE_ELIXIR_MS: u64 = 240_000;

/// From here the first player to lead on crowns wins.
pub const SUDDEN_DEATH_MS: u64 = 300_000;

/// Hard end of the match. Ties go to tower damage, then a draw.
pub const MATCH_END_MS: u64 = 360_000;

// ============================================================================
// Elixir
// ============================================================================

pub const STARTING_ELIXIR: f32 = 5.0;
pub const ELIXIR_CAP: f32 = 10.0;

/// Milliseconds per elixir point in normal time.
pub const ELIXIR_REGEN_MS: f32 = 2800.0;

/// Milliseconds per elixir point in double elixir.
pub const DOUBLE_ELIXIR_REGEN_MS: f32 = 1400.0;

/// Milliseconds per elixir point in triple elixir.
pub const TRIPLE_ELIXIR_REGEN_MS: f32 = 900.0;

/// Cards in a deck and in the hand.
pub const DECK_SIZE: usize = 8;
pub const HAND_SIZE: usize = 4;

/// Level the stats in `units.ron` are listed at.
pub const TOURNAMENT_LEVEL: u32 = 11;
pub const MAX_LEVEL: u32 = 15;

/// Hitpoints and damage grow by this factor per card level.
pub const LEVEL_STAT_GROWTH: f32 = 1.1;

// ============================================================================
// Targeting and combat
// ============================================================================

/// A troop wins over a building unless it is further away than the
/// building plus this margin.
pub const TROOP_PRIORITY_MARGIN: f32 = 1.0;

/// A same-class candidate must be closer than the current target by at
/// least this much to steal focus.
pub const RETARGET_MARGIN: f32 = 0.5;

/// Minimum attack delay forced on a knocked-back unit.
pub const KNOCKBACK_ATTACK_RESET_MS: f32 = 500.0;

/// Projectiles without an explicit budget may fly this far past their range.
pub const PROJECTILE_RANGE_SLACK: f32 = 4.0;
