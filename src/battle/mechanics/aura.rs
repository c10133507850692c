//! Passive auras applied around the host every tick.

use crate::battle::effects::EffectRequest;
use crate::battle::status::{StatusEffect, StatusKind};

use super::{Mechanic, MechanicContext};

/// Slows every enemy whose body overlaps `radius` around the host.
///
/// The slow is reapplied each tick for two ticks' worth of time, so it
/// stays visible between ticks and lapses one tick after a victim leaves.
#[derive(Debug, Clone)]
pub struct SlowAura {
    pub radius: f32,
    pub magnitude: f32,
}

impl Mechanic for SlowAura {
    fn name(&self) -> &'static str {
        "SlowAura"
    }

    fn on_tick(&mut self, ctx: &mut MechanicContext) {
        let host = ctx.host;
        let effect = StatusEffect::new(StatusKind::Slow, ctx.dt_ms * 2, self.magnitude);
        ctx.request(EffectRequest::AreaDamage {
            source: Some(host.id),
            owner: host.owner,
            center: host.position,
            radius: self.radius,
            damage: 0.0,
            crown_tower_multiplier: 1.0,
            status: Some(effect),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::host;
    use super::*;

    #[test]
    fn test_aura_pulses_a_slow_every_tick() {
        let host = host(5);
        let mut aura = SlowAura {
            radius: 2.5,
            magnitude: 0.5,
        };
        let mut outbox = Vec::new();
        for tick in 0..3 {
            let mut ctx = MechanicContext::new(&host, tick, 33, &mut outbox);
            aura.on_tick(&mut ctx);
        }
        assert_eq!(outbox.len(), 3);
        assert!(outbox.iter().all(|request| matches!(
            request,
            EffectRequest::AreaDamage { damage, radius, status: Some(status), owner, .. }
                if *damage == 0.0
                    && *radius == 2.5
                    && *owner == host.owner
                    && status.kind == StatusKind::Slow
                    && status.magnitude == 0.5
                    && status.duration_ms == 66
        )));
    }
}
