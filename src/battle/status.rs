//! Status Effects
//!
//! Timed modifiers carried by an entity. Two stacking rules apply:
//!
//! - **Refreshing** kinds (stun, freeze, slow, rage, invisibility) keep a
//!   single instance per kind. Re-applying extends the timer to the longer of
//!   the two durations and keeps the stronger magnitude; magnitudes never add.
//! - **Multiplier** kinds (damage reduction, hit/move/spawn speed) keep every
//!   instance and compose multiplicatively.
//!
//! Modifiers are recomputed from the table once per tick, so expiry restores
//! the baseline exactly.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Kinds of timed modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    /// No movement or attack progress.
    Stun,
    /// Same as stun. The longer of the two decides when the entity recovers.
    Freeze,
    /// Magnitude is the fraction of speed removed (0.35 = 35% slower).
    Slow,
    /// Magnitude is the fraction of speed added (0.35 = 35% faster).
    Rage,
    /// Magnitude is the fraction of incoming damage removed.
    DamageReduction,
    /// Magnitude multiplies attack progress.
    HitSpeed,
    /// Magnitude multiplies movement speed.
    MoveSpeed,
    /// Magnitude multiplies periodic spawn progress.
    SpawnSpeed,
    /// Entity cannot be targeted.
    Invisible,
}

impl StatusKind {
    pub fn is_refreshing(self) -> bool {
        matches!(
            self,
            StatusKind::Stun
                | StatusKind::Freeze
                | StatusKind::Slow
                | StatusKind::Rage
                | StatusKind::Invisible
        )
    }

    /// Stops movement and attack progress while active.
    pub fn is_disabling(self) -> bool {
        matches!(self, StatusKind::Stun | StatusKind::Freeze)
    }
}

/// A status effect as described in data: what to apply and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub duration_ms: u32,
    #[serde(default)]
    pub magnitude: f32,
}

impl StatusEffect {
    pub fn new(kind: StatusKind, duration_ms: u32, magnitude: f32) -> Self {
        Self {
            kind,
            duration_ms,
            magnitude,
        }
    }

    pub fn stun(duration_ms: u32) -> Self {
        Self::new(StatusKind::Stun, duration_ms, 0.0)
    }
}

/// A running instance of a status effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveStatus {
    pub kind: StatusKind,
    pub magnitude: f32,
    pub remaining_ms: u32,
}

/// Per-entity set of running status effects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusEffectTable {
    active: Vec<ActiveStatus>,
}

impl StatusEffectTable {
    pub fn apply(&mut self, effect: StatusEffect) {
        if effect.duration_ms == 0 {
            return;
        }
        if effect.kind.is_refreshing() {
            if let Some(existing) = self.active.iter_mut().find(|s| s.kind == effect.kind) {
                existing.remaining_ms = existing.remaining_ms.max(effect.duration_ms);
                existing.magnitude = existing.magnitude.max(effect.magnitude);
                return;
            }
        }
        self.active.push(ActiveStatus {
            kind: effect.kind,
            magnitude: effect.magnitude,
            remaining_ms: effect.duration_ms,
        });
    }

    /// Count down every timer and drop the expired ones.
    pub fn tick(&mut self, dt_ms: u32) {
        for status in &mut self.active {
            status.remaining_ms = status.remaining_ms.saturating_sub(dt_ms);
        }
        self.active.retain(|s| s.remaining_ms > 0);
    }

    pub fn has(&self, kind: StatusKind) -> bool {
        self.active.iter().any(|s| s.kind == kind)
    }

    pub fn remaining_ms(&self, kind: StatusKind) -> u32 {
        self.active
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.remaining_ms)
            .max()
            .unwrap_or(0)
    }

    /// Remaining stun or freeze time, whichever is longer.
    pub fn disabled_ms(&self) -> u32 {
        self.remaining_ms(StatusKind::Stun)
            .max(self.remaining_ms(StatusKind::Freeze))
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_ms() > 0
    }

    pub fn kinds(&self) -> Vec<StatusKind> {
        let mut kinds: Vec<StatusKind> = Vec::new();
        for status in &self.active {
            if !kinds.contains(&status.kind) {
                kinds.push(status.kind);
            }
        }
        kinds
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Compose every running effect into one set of multipliers.
    pub fn modifiers(&self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        for status in &self.active {
            match status.kind {
                StatusKind::Stun | StatusKind::Freeze => modifiers.disabled = true,
                StatusKind::Invisible => modifiers.invisible = true,
                StatusKind::Slow => {
                    let factor = (1.0 - status.magnitude).max(0.0);
                    modifiers.move_speed *= factor;
                    modifiers.hit_speed *= factor;
                    modifiers.spawn_speed *= factor;
                }
                StatusKind::Rage => {
                    let factor = 1.0 + status.magnitude.max(0.0);
                    modifiers.move_speed *= factor;
                    modifiers.hit_speed *= factor;
                    modifiers.spawn_speed *= factor;
                }
                StatusKind::DamageReduction => {
                    modifiers.damage_taken *= (1.0 - status.magnitude).clamp(0.0, 1.0);
                }
                StatusKind::HitSpeed => modifiers.hit_speed *= status.magnitude.max(0.0),
                StatusKind::MoveSpeed => modifiers.move_speed *= status.magnitude.max(0.0),
                StatusKind::SpawnSpeed => modifiers.spawn_speed *= status.magnitude.max(0.0),
            }
        }
        modifiers
    }
}

/// Effective multipliers for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modifiers {
    pub move_speed: f32,
    pub hit_speed: f32,
    pub spawn_speed: f32,
    pub damage_taken: f32,
    pub disabled: bool,
    pub invisible: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            move_speed: 1.0,
            hit_speed: 1.0,
            spawn_speed: 1.0,
            damage_taken: 1.0,
            disabled: false,
            invisible: false,
        }
    }
}

/// Status table plus the modifiers cached for the current tick.
#[derive(Component, Debug, Clone, Default)]
pub struct StatusEffects {
    pub table: StatusEffectTable,
    pub modifiers: Modifiers,
}

impl StatusEffects {
    pub fn refresh(&mut self) {
        self.modifiers = self.table.modifiers();
    }

    /// Live check, so a stun landing mid-tick takes effect immediately.
    pub fn is_disabled(&self) -> bool {
        self.table.is_disabled()
    }

    pub fn is_invisible(&self) -> bool {
        self.table.has(StatusKind::Invisible)
    }
}
