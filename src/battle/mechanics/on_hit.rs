//! On-hit riders: effects applied to whatever an attack lands on.

use crate::battle::effects::EffectRequest;
use crate::battle::status::{StatusEffect, StatusKind};

use super::{Mechanic, MechanicContext, TargetInfo};

/// Stuns the hit entity with probability `chance`.
#[derive(Debug, Clone)]
pub struct StunOnHit {
    pub duration_ms: u32,
    pub chance: f32,
}

impl Mechanic for StunOnHit {
    fn name(&self) -> &'static str {
        "StunOnHit"
    }

    fn on_attack_hit(&mut self, ctx: &mut MechanicContext, target: &TargetInfo) {
        if !ctx.roll(self.chance) {
            return;
        }
        ctx.request(EffectRequest::ApplyStatus {
            target: target.entity,
            effect: StatusEffect::stun(self.duration_ms),
        });
    }
}

#[derive(Debug, Clone)]
pub struct SlowOnHit {
    pub duration_ms: u32,
    pub magnitude: f32,
}

impl Mechanic for SlowOnHit {
    fn name(&self) -> &'static str {
        "SlowOnHit"
    }

    fn on_attack_hit(&mut self, ctx: &mut MechanicContext, target: &TargetInfo) {
        ctx.request(EffectRequest::ApplyStatus {
            target: target.entity,
            effect: StatusEffect::new(StatusKind::Slow, self.duration_ms, self.magnitude),
        });
    }
}

/// Pushes the target directly away from the attacker.
#[derive(Debug, Clone)]
pub struct KnockbackOnHit {
    pub distance: f32,
}

impl Mechanic for KnockbackOnHit {
    fn name(&self) -> &'static str {
        "KnockbackOnHit"
    }

    fn on_attack_hit(&mut self, ctx: &mut MechanicContext, target: &TargetInfo) {
        if target.is_building {
            return;
        }
        let origin = ctx.host.position;
        ctx.request(EffectRequest::Knockback {
            target: target.entity,
            origin,
            distance: self.distance,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{host, target};
    use super::*;
    use crate::battle::components::GameRng;

    #[test]
    fn test_stun_on_hit_targets_the_hit_entity() {
        let host = host(1);
        let mut outbox = Vec::new();
        let mut ctx = MechanicContext::new(&host, 0, 33, &mut outbox);
        StunOnHit {
            duration_ms: 500,
            chance: 1.0,
        }
        .on_attack_hit(&mut ctx, &target(9));

        assert_eq!(
            outbox,
            vec![EffectRequest::ApplyStatus {
                target: target(9).entity,
                effect: StatusEffect::stun(500),
            }]
        );
    }

    #[test]
    fn test_stun_chance_is_rolled_on_the_match_rng() {
        let host = host(1);
        let mut stun = StunOnHit {
            duration_ms: 500,
            chance: 0.5,
        };
        let mut rng = GameRng::from_seed(3);
        let mut outbox = Vec::new();
        for _ in 0..40 {
            let mut ctx = MechanicContext::new(&host, 0, 33, &mut outbox).with_rng(&mut rng);
            stun.on_attack_hit(&mut ctx, &target(9));
        }
        assert!(outbox.len() > 5 && outbox.len() < 35, "{} stuns", outbox.len());

        // Same seed, same rolls.
        let mut replay = GameRng::from_seed(3);
        let mut replayed = Vec::new();
        for _ in 0..40 {
            let mut ctx = MechanicContext::new(&host, 0, 33, &mut replayed).with_rng(&mut replay);
            stun.on_attack_hit(&mut ctx, &target(9));
        }
        assert_eq!(outbox, replayed);
    }

    #[test]
    fn test_zero_chance_never_stuns() {
        let host = host(1);
        let mut rng = GameRng::from_seed(3);
        let mut outbox = Vec::new();
        let mut ctx = MechanicContext::new(&host, 0, 33, &mut outbox).with_rng(&mut rng);
        StunOnHit {
            duration_ms: 500,
            chance: 0.0,
        }
        .on_attack_hit(&mut ctx, &target(9));
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_buildings_ignore_knockback() {
        let host = host(1);
        let mut outbox = Vec::new();
        let mut ctx = MechanicContext::new(&host, 0, 33, &mut outbox);
        let mut tower = target(9);
        tower.is_building = true;
        KnockbackOnHit { distance: 1.0 }.on_attack_hit(&mut ctx, &tower);
        assert!(outbox.is_empty());
    }
}
