//! Charging mechanics: charge-up attacks, dashing charges and river jumps.

use super::{AttackModifiers, Mechanic, MechanicContext, TargetInfo};

/// Accumulates time while the host is engaged, that is while its target is
/// within attack range. Walking toward a target does not count. The next attack
/// after reaching the threshold is multiplied and the charge restarts.
/// Stun, freeze and knockback drop the charge to zero.
#[derive(Debug, Clone)]
pub struct ChargeUp {
    pub charge_ms: u32,
    pub damage_multiplier: f32,
    accumulated_ms: u32,
}

impl ChargeUp {
    pub fn new(charge_ms: u32, damage_multiplier: f32) -> Self {
        Self {
            charge_ms,
            damage_multiplier,
            accumulated_ms: 0,
        }
    }

    /// Charge progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.charge_ms == 0 {
            1.0
        } else {
            (self.accumulated_ms as f32 / self.charge_ms as f32).min(1.0)
        }
    }

    pub fn is_charged(&self) -> bool {
        self.accumulated_ms >= self.charge_ms
    }
}

impl Mechanic for ChargeUp {
    fn name(&self) -> &'static str {
        "ChargeUp"
    }

    fn on_tick(&mut self, ctx: &mut MechanicContext) {
        let host = ctx.host;
        if host.disabled || !host.engaged {
            return;
        }
        self.accumulated_ms = (self.accumulated_ms + ctx.dt_ms).min(self.charge_ms);
    }

    fn on_attack_start(
        &mut self,
        _ctx: &mut MechanicContext,
        _target: &TargetInfo,
        attack: &mut AttackModifiers,
    ) {
        if self.is_charged() {
            attack.damage *= self.damage_multiplier;
            self.accumulated_ms = 0;
        }
    }

    fn on_interrupted(&mut self) {
        self.accumulated_ms = 0;
    }
}

/// After moving uninterrupted for `build_up_ms` the host dashes at
/// `speed_multiplier` and its next attack is multiplied.
#[derive(Debug, Clone)]
pub struct Charge {
    pub build_up_ms: u32,
    pub speed_multiplier: f32,
    pub damage_multiplier: f32,
    moving_ms: u32,
    charging: bool,
}

impl Charge {
    pub fn new(build_up_ms: u32, speed_multiplier: f32, damage_multiplier: f32) -> Self {
        Self {
            build_up_ms,
            speed_multiplier,
            damage_multiplier,
            moving_ms: 0,
            charging: false,
        }
    }

    pub fn is_charging(&self) -> bool {
        self.charging
    }

    fn reset(&mut self) {
        self.moving_ms = 0;
        self.charging = false;
    }
}

impl Mechanic for Charge {
    fn name(&self) -> &'static str {
        "Charge"
    }

    fn on_tick(&mut self, ctx: &mut MechanicContext) {
        let host = ctx.host;
        if host.disabled {
            self.reset();
            return;
        }
        if host.engaged || self.charging {
            return;
        }
        self.moving_ms += ctx.dt_ms;
        if self.moving_ms >= self.build_up_ms {
            self.charging = true;
        }
    }

    fn on_attack_start(
        &mut self,
        _ctx: &mut MechanicContext,
        _target: &TargetInfo,
        attack: &mut AttackModifiers,
    ) {
        if self.charging {
            attack.damage *= self.damage_multiplier;
        }
        self.reset();
    }

    fn on_interrupted(&mut self) {
        self.reset();
    }

    fn speed_multiplier(&self) -> f32 {
        if self.charging {
            self.speed_multiplier
        } else {
            1.0
        }
    }
}

/// Ground unit that hops over the river instead of using a bridge.
#[derive(Debug, Clone, Copy)]
pub struct RiverJump;

impl Mechanic for RiverJump {
    fn name(&self) -> &'static str {
        "RiverJump"
    }

    fn crosses_river(&self) -> bool {
        true
    }
}
