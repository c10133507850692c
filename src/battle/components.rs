//! Battle Components
//!
//! Per-entity components and the small shared resources every phase reads.
//! Stats are never copied onto entities: the `Archetype` component keeps a
//! shared handle to the catalog's `UnitDefinition`.

use std::fmt;
use std::sync::Arc;

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::unit_config::UnitDefinition;

// ============================================================================
// Identity
// ============================================================================

/// Stable entity id. Assigned monotonically, never reused within a match.
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the two players. Player one defends the bottom half of the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub const BOTH: [Player; 2] = [Player::One, Player::Two];

    pub fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn opponent(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Parse a 1-based player number as used by scripts and the CLI.
    pub fn from_number(number: u8) -> Option<Player> {
        match number {
            1 => Some(Player::One),
            2 => Some(Player::Two),
            _ => None,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {}", self.number())
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner(pub Player);

/// Position in tile units. x grows left to right, y from player one's
/// baseline toward player two's.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Position(pub Vec2);

/// Entity variant.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Troop,
    Building,
    Projectile,
    AreaEffect,
}

impl EntityKind {
    pub fn is_damageable(self) -> bool {
        matches!(self, EntityKind::Troop | EntityKind::Building)
    }
}

/// Shared, read-only reference to the archetype this entity was built from.
#[derive(Component, Debug, Clone)]
pub struct Archetype(pub Arc<UnitDefinition>);

impl Archetype {
    pub fn name(&self) -> &str {
        &self.0.name
    }
}

// ============================================================================
// Vitals
// ============================================================================

/// Hitpoints plus the alive flag.
///
/// Hitpoints are clamped to `[0, max]`. The alive flag stays set while
/// hitpoints sit at zero until the death phase calls [`Health::mark_dead`];
/// an entity in that state is already untargetable.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    alive: bool,
}

impl Health {
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self {
            current: max,
            max,
            alive: true,
        }
    }

    /// Alive and above zero hitpoints.
    pub fn is_alive(&self) -> bool {
        self.alive && self.current > 0.0
    }

    /// Hitpoints are depleted but death has not been dispatched yet.
    pub fn awaiting_death(&self) -> bool {
        self.alive && self.current <= 0.0
    }

    /// Whether death has been dispatched for this entity.
    pub fn is_dead(&self) -> bool {
        !self.alive
    }

    /// Flip the alive flag. Returns true only for the first call.
    pub fn mark_dead(&mut self) -> bool {
        debug_assert!(self.alive, "mark_dead called twice for the same entity");
        let was_alive = self.alive;
        self.alive = false;
        self.current = 0.0;
        was_alive
    }

    /// Remove hitpoints, clamping at zero. Returns the hitpoints actually lost.
    pub fn lose(&mut self, amount: f32) -> f32 {
        debug_assert!(amount >= 0.0, "Health::lose: negative amount {}", amount);
        let amount = amount.max(0.0);
        let lost = amount.min(self.current);
        self.current = (self.current - amount).max(0.0);
        lost
    }

    /// Restore hitpoints up to max. Dead entities cannot be healed.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if !self.is_alive() {
            return 0.0;
        }
        let before = self.current;
        self.current = (self.current + amount.max(0.0)).min(self.max);
        self.current - before
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }
}

/// Physical footprint used by targeting, splash checks and placement.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub is_air: bool,
    pub collision_radius: f32,
}

// ============================================================================
// Behaviour state
// ============================================================================

/// The entity's current target, if any.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Targeting {
    pub target: Option<Entity>,
}

/// Attack timer. `cooldown_ms` counts down toward the next attack.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct AttackTimer {
    pub cooldown_ms: f32,
    /// The one-time wind-up before the first attack has not been applied.
    pub wind_up_pending: bool,
}

impl Default for AttackTimer {
    fn default() -> Self {
        Self {
            cooldown_ms: 0.0,
            wind_up_pending: true,
        }
    }
}

impl AttackTimer {
    /// Push the next attack back to at least `ms` from now.
    pub fn delay_at_least(&mut self, ms: f32) {
        self.cooldown_ms = self.cooldown_ms.max(ms);
    }
}

/// Remaining deploy delay. Entities do nothing but exist until it reaches zero.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct DeployTimer {
    pub remaining_ms: u32,
}

impl DeployTimer {
    pub fn is_deployed(&self) -> bool {
        self.remaining_ms == 0
    }
}

/// Building decay. A zero `total_ms` means the entity does not decay.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Lifetime {
    pub total_ms: u32,
    pub elapsed_ms: u32,
}

/// Which crown tower an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerRole {
    King,
    LeftPrincess,
    RightPrincess,
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct CrownTower {
    pub role: TowerRole,
    /// Inactive towers do not acquire targets. Only the king starts inactive.
    pub active: bool,
}

// ============================================================================
// Shared resources
// ============================================================================

/// Simulated clock. All timers derive from whole ticks of `dt_ms`.
#[derive(Resource, Debug, Clone, Copy)]
pub struct SimClock {
    pub tick: u64,
    pub dt_ms: u32,
    pub elapsed_ms: u64,
}

impl SimClock {
    pub fn new(dt_ms: u32) -> Self {
        Self {
            tick: 0,
            dt_ms,
            elapsed_ms: 0,
        }
    }

    pub fn advance(&mut self) {
        self.tick += 1;
        self.elapsed_ms += u64::from(self.dt_ms);
    }

    pub fn dt_secs(&self) -> f32 {
        self.dt_ms as f32 / 1000.0
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed_ms as f32 / 1000.0
    }
}

/// Hands out stable entity ids.
#[derive(Resource, Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        self.next += 1;
        EntityId(self.next)
    }
}

/// Live entities at the start of the current tick, sorted by stable id.
///
/// Every per-entity pass walks this list, so entities inserted during the
/// tick are not updated until the next one.
#[derive(Resource, Debug, Default)]
pub struct LiveSet {
    pub entries: Vec<(EntityId, Entity)>,
}

impl LiveSet {
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entries.iter().map(|(_, entity)| *entity)
    }
}

/// Seeded random number generator, one per match.
#[derive(Resource)]
pub struct GameRng {
    rng: StdRng,
    /// The seed used to initialize this RNG
    pub seed: u64,
}

impl GameRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Generate a random f32 in the range [0.0, 1.0)
    pub fn random_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Generate a random f32 in the given range
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.random_f32() * (max - min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_clamps_at_zero() {
        let mut health = Health::new(100.0);
        let lost = health.lose(150.0);
        assert_eq!(lost, 100.0);
        assert_eq!(health.current, 0.0);
        assert!(!health.is_alive());
        assert!(health.awaiting_death());
    }

    #[test]
    fn test_mark_dead_only_transitions_once() {
        let mut health = Health::new(10.0);
        health.lose(10.0);
        assert!(health.mark_dead());
        assert!(health.is_dead());
        assert!(!health.awaiting_death());
    }

    #[test]
    fn test_heal_does_not_exceed_max() {
        let mut health = Health::new(100.0);
        health.lose(30.0);
        assert_eq!(health.heal(50.0), 30.0);
        assert_eq!(health.current, 100.0);
    }

    #[test]
    fn test_player_opponent_and_numbers() {
        assert_eq!(Player::One.opponent(), Player::Two);
        assert_eq!(Player::Two.number(), 2);
        assert_eq!(Player::from_number(1), Some(Player::One));
        assert_eq!(Player::from_number(3), None);
    }

    #[test]
    fn test_id_allocator_is_monotonic() {
        let mut ids = IdAllocator::default();
        let a = ids.allocate();
        let b = ids.allocate();
        assert!(b > a);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut a = GameRng::from_seed(7);
        let mut b = GameRng::from_seed(7);
        for _ in 0..10 {
            assert_eq!(a.random_f32(), b.random_f32());
        }
    }
}
