//! DamageRamp: damage grows with continuous engagement on one target.

use bevy::prelude::*;

use crate::battle::unit_config::{RampStage, UnitDefinition};

use super::{AttackModifiers, Mechanic, MechanicContext, TargetInfo};

#[derive(Debug, Clone)]
pub struct DamageRamp {
    stages: Vec<RampStage>,
    tracked: Option<Entity>,
    engaged_ms: u32,
}

impl DamageRamp {
    pub fn new(stages: Vec<RampStage>) -> Self {
        debug_assert!(
            stages.windows(2).all(|w| w[0].after_ms < w[1].after_ms),
            "DamageRamp stages must be strictly increasing"
        );
        Self {
            stages,
            tracked: None,
            engaged_ms: 0,
        }
    }

    pub fn engaged_ms(&self) -> u32 {
        self.engaged_ms
    }

    /// Damage of the stage reached by the current engagement time.
    pub fn current_damage(&self) -> f32 {
        self.stages
            .iter()
            .take_while(|stage| stage.after_ms <= self.engaged_ms)
            .last()
            .or(self.stages.first())
            .map_or(0.0, |stage| stage.damage)
    }

    fn reset(&mut self) {
        self.tracked = None;
        self.engaged_ms = 0;
    }
}

impl Mechanic for DamageRamp {
    fn name(&self) -> &'static str {
        "DamageRamp"
    }

    fn on_attach(&mut self, archetype: &UnitDefinition) {
        if self.stages.is_empty() {
            self.stages.push(RampStage {
                after_ms: 0,
                damage: archetype.damage,
            });
        }
    }

    fn on_tick(&mut self, ctx: &mut MechanicContext) {
        let host = ctx.host;
        match host.target {
            Some(target) if host.engaged && !host.disabled => {
                if self.tracked != Some(target.entity) {
                    self.tracked = Some(target.entity);
                    self.engaged_ms = 0;
                }
                self.engaged_ms = self.engaged_ms.saturating_add(ctx.dt_ms);
            }
            _ => self.reset(),
        }
    }

    fn on_attack_start(
        &mut self,
        _ctx: &mut MechanicContext,
        target: &TargetInfo,
        attack: &mut AttackModifiers,
    ) {
        if self.tracked != Some(target.entity) {
            self.reset();
        }
        attack.damage = self.current_damage();
    }

    fn on_interrupted(&mut self) {
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{host, target};
    use super::*;

    fn inferno() -> DamageRamp {
        DamageRamp::new(vec![
            RampStage { after_ms: 0, damage: 20.0 },
            RampStage { after_ms: 2000, damage: 75.0 },
            RampStage { after_ms: 4000, damage: 400.0 },
        ])
    }

    fn tick_engaged(ramp: &mut DamageRamp, target_id: u32, ticks: u32) {
        let mut host = host(1);
        host.target = Some(target(target_id));
        host.engaged = true;
        let mut outbox = Vec::new();
        for tick in 0..ticks {
            let mut ctx = MechanicContext::new(&host, u64::from(tick), 100, &mut outbox);
            ramp.on_tick(&mut ctx);
        }
    }

    #[test]
    fn test_damage_increases_on_same_target() {
        let mut ramp = inferno();
        assert_eq!(ramp.current_damage(), 20.0);

        tick_engaged(&mut ramp, 2, 20);
        assert_eq!(ramp.current_damage(), 75.0);

        tick_engaged(&mut ramp, 2, 20);
        assert_eq!(ramp.current_damage(), 400.0);
    }

    #[test]
    fn test_switching_target_resets_to_first_stage() {
        let mut ramp = inferno();
        tick_engaged(&mut ramp, 2, 45);
        assert_eq!(ramp.current_damage(), 400.0);

        tick_engaged(&mut ramp, 3, 1);
        assert_eq!(ramp.engaged_ms(), 100);
        assert_eq!(ramp.current_damage(), 20.0);
    }

    #[test]
    fn test_losing_target_resets() {
        let mut ramp = inferno();
        tick_engaged(&mut ramp, 2, 30);

        let idle = host(1);
        let mut outbox = Vec::new();
        let mut ctx = MechanicContext::new(&idle, 31, 100, &mut outbox);
        ramp.on_tick(&mut ctx);
        assert_eq!(ramp.engaged_ms(), 0);
        assert_eq!(ramp.current_damage(), 20.0);
    }

    #[test]
    fn test_attack_uses_stage_damage() {
        let mut ramp = inferno();
        tick_engaged(&mut ramp, 2, 25);

        let host = host(1);
        let mut outbox = Vec::new();
        let mut ctx = MechanicContext::new(&host, 0, 100, &mut outbox);
        let mut attack = AttackModifiers { damage: 1.0 };
        ramp.on_attack_start(&mut ctx, &target(2), &mut attack);
        assert_eq!(attack.damage, 75.0);
    }
}
