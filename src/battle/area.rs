//! Area Effects
//!
//! A spell region pulses on the first tick it is processed and then every
//! `pulse_interval_ms` until its duration runs out. A zero duration means a
//! single pulse (zap, arrows).

use bevy::prelude::*;

use super::effects::{BattleAccess, DamageRequest};

#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct AreaEffectState {
    pub elapsed_ms: u32,
    pub next_pulse_ms: u32,
    pub pulses: u32,
}

impl AreaEffectState {
    /// Advance by one tick. Returns whether this tick pulses and whether the
    /// region is finished afterwards.
    pub fn advance(&mut self, dt_ms: u32, duration_ms: u32, interval_ms: u32) -> (bool, bool) {
        let pulse = self.elapsed_ms >= self.next_pulse_ms;
        if pulse {
            self.pulses += 1;
            self.next_pulse_ms += interval_ms.max(1);
        }
        self.elapsed_ms += dt_ms;
        let finished = duration_ms == 0 || self.elapsed_ms >= duration_ms;
        (pulse, finished)
    }
}

pub fn pulse_area_effects(mut access: BattleAccess) {
    let dt_ms = access.clock.dt_ms;
    for entity in access.live_entities() {
        let Ok(unit) = access.units.get_mut(entity) else {
            continue;
        };
        let (Some(mut state), Some(archetype)) = (unit.area, unit.archetype) else {
            continue;
        };
        let Some(effect) = archetype.0.area_effect.clone() else {
            continue;
        };
        let owner = unit.owner.0;
        let center = unit.position.0;
        let source = *unit.id;
        let reach = archetype.0.targets;
        let crown_tower_multiplier = archetype.0.crown_tower_damage_multiplier;
        let (pulse, finished) = state.advance(dt_ms, effect.duration_ms, effect.pulse_interval_ms);

        if pulse {
            let enemies = access.enemies_within(owner, center, effect.radius, reach);
            let allies = access.allies_within(owner, center, effect.radius);
            if effect.damage_per_pulse > 0.0 {
                for &target in &enemies {
                    access.apply_damage(DamageRequest {
                        source: Some(source),
                        target,
                        amount: effect.damage_per_pulse,
                        crown_tower_multiplier,
                    });
                }
            }
            if let Some(status) = effect.status {
                let affected = if effect.status_on_allies { &allies } else { &enemies };
                for &target in affected {
                    access.apply_status(target, status);
                }
            }
            if effect.heal_per_pulse > 0.0 {
                for &target in &allies {
                    access.heal(target, effect.heal_per_pulse);
                }
            }
        }
        if finished {
            access.commands.entity(entity).despawn();
        }
    }
}
