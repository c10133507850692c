//! SoulCollector: an ability gated on enemy deaths around the host.

use crate::battle::effects::{EffectRequest, SpawnLayout, SpawnRequest};
use crate::battle::error::AbilityError;

use super::{AbilityActivation, ActiveAbility, DeathNotice, Mechanic, MechanicContext};

/// Souls come back as units on this ring when the host dies.
const DROP_RING_RADIUS: f32 = 1.5;

/// Counts enemy deaths within `radius`, up to `max_souls`.
///
/// The wrapped ability only activates with `souls_required` souls in store
/// and consumes that many. Every `souls_per_discount` souls held take one
/// elixir off its listed cost, never below one. On death half the souls,
/// at most `max_drop`, come back as `drop_unit`s.
#[derive(Debug, Clone)]
pub struct SoulCollector {
    pub radius: f32,
    pub souls_required: u32,
    pub max_souls: u32,
    pub souls_per_discount: u32,
    pub drop_unit: Option<String>,
    pub max_drop: u32,
    ability: ActiveAbility,
    base_cost: u32,
    souls: u32,
}

impl SoulCollector {
    pub fn new(
        radius: f32,
        souls_required: u32,
        max_souls: u32,
        souls_per_discount: u32,
        drop_unit: Option<String>,
        max_drop: u32,
        ability: ActiveAbility,
    ) -> Self {
        Self {
            radius,
            souls_required,
            max_souls,
            souls_per_discount: souls_per_discount.max(1),
            drop_unit,
            max_drop,
            base_cost: ability.elixir_cost,
            ability,
            souls: 0,
        }
    }

    pub fn souls_collected(&self) -> u32 {
        self.souls
    }

    /// Elixir the ability costs right now.
    pub fn current_cost(&self) -> u32 {
        if self.souls < self.souls_required {
            return self.base_cost;
        }
        let discount = self.souls / self.souls_per_discount;
        self.base_cost.saturating_sub(discount).max(self.base_cost.min(1))
    }

    pub fn ability(&self) -> &ActiveAbility {
        &self.ability
    }
}

impl Mechanic for SoulCollector {
    fn name(&self) -> &'static str {
        "SoulCollector"
    }

    fn on_tick(&mut self, ctx: &mut MechanicContext) {
        self.ability.on_tick(ctx);
    }

    fn on_nearby_death(&mut self, ctx: &mut MechanicContext, death: &DeathNotice) {
        let host = ctx.host;
        if death.owner == host.owner || death.id == host.id {
            return;
        }
        if death.position.distance(host.position) <= self.radius {
            self.souls = (self.souls + 1).min(self.max_souls);
        }
    }

    fn on_death(&mut self, ctx: &mut MechanicContext) {
        let Some(unit) = &self.drop_unit else {
            return;
        };
        let count = (self.souls / 2).min(self.max_drop);
        if count == 0 {
            return;
        }
        let host = ctx.host;
        ctx.request(EffectRequest::Spawn(SpawnRequest {
            owner: host.owner,
            unit: unit.clone(),
            count,
            center: host.position,
            radius: DROP_RING_RADIUS,
            layout: SpawnLayout::Ring,
        }));
    }

    fn souls(&self) -> Option<u32> {
        Some(self.souls)
    }

    fn try_activate(
        &mut self,
        ctx: &mut MechanicContext,
        available_elixir: f32,
    ) -> Option<Result<AbilityActivation, AbilityError>> {
        if self.souls < self.souls_required {
            return Some(Err(AbilityError::NotEnoughSouls {
                collected: self.souls,
                required: self.souls_required,
            }));
        }
        self.ability.elixir_cost = self.current_cost();
        let result = self.ability.try_activate(ctx, available_elixir);
        self.ability.elixir_cost = self.base_cost;
        if let Some(Ok(_)) = &result {
            self.souls -= self.souls_required;
        }
        result
    }
}
