//! ActiveAbility: a manually activated, elixir-gated effect bundle.
//!
//! Self statuses live on the owner and end with it. Summoned units are
//! ordinary troops of the owner's side: once spawned they no longer depend
//! on the ability and outlive an owner that dies while the ability is active.

use crate::battle::effects::{EffectRequest, SpawnLayout, SpawnRequest};
use crate::battle::error::AbilityError;
use crate::battle::status::StatusEffect;
use crate::battle::unit_config::{AbilityDefinition, AbilityEffect};

use super::{AbilityActivation, Mechanic, MechanicContext};

#[derive(Debug, Clone)]
pub struct ActiveAbility {
    pub ability_name: String,
    pub elixir_cost: u32,
    pub cooldown_ms: u32,
    pub duration_ms: u32,
    pub effects: Vec<AbilityEffect>,
    cooldown_remaining_ms: u32,
    active_remaining_ms: u32,
}

impl ActiveAbility {
    pub fn new(
        ability_name: String,
        elixir_cost: u32,
        cooldown_ms: u32,
        duration_ms: u32,
        effects: Vec<AbilityEffect>,
    ) -> Self {
        Self {
            ability_name,
            elixir_cost,
            cooldown_ms,
            duration_ms,
            effects,
            cooldown_remaining_ms: 0,
            active_remaining_ms: 0,
        }
    }

    pub fn from_definition(definition: &AbilityDefinition) -> Self {
        Self::new(
            definition.name.clone(),
            definition.elixir_cost,
            definition.cooldown_ms,
            definition.duration_ms,
            definition.effects.clone(),
        )
    }

    pub fn is_active(&self) -> bool {
        self.active_remaining_ms > 0
    }

    pub fn cooldown_remaining_ms(&self) -> u32 {
        self.cooldown_remaining_ms
    }
}

impl Mechanic for ActiveAbility {
    fn name(&self) -> &'static str {
        "ActiveAbility"
    }

    fn on_tick(&mut self, ctx: &mut MechanicContext) {
        self.active_remaining_ms = self.active_remaining_ms.saturating_sub(ctx.dt_ms);
        self.cooldown_remaining_ms = self.cooldown_remaining_ms.saturating_sub(ctx.dt_ms);
    }

    fn try_activate(
        &mut self,
        ctx: &mut MechanicContext,
        available_elixir: f32,
    ) -> Option<Result<AbilityActivation, AbilityError>> {
        if self.is_active() {
            return Some(Err(AbilityError::AlreadyActive));
        }
        if self.cooldown_remaining_ms > 0 {
            return Some(Err(AbilityError::OnCooldown {
                remaining_ms: self.cooldown_remaining_ms,
            }));
        }
        if available_elixir < self.elixir_cost as f32 {
            return Some(Err(AbilityError::InsufficientElixir {
                available: available_elixir,
                cost: self.elixir_cost,
            }));
        }

        self.active_remaining_ms = self.duration_ms;
        // Cooldown starts once the effect ends.
        self.cooldown_remaining_ms = self.duration_ms + self.cooldown_ms;

        let host = ctx.host;
        for effect in &self.effects {
            match effect {
                AbilityEffect::SelfStatus(status) => {
                    let duration_ms = if status.duration_ms == 0 {
                        self.duration_ms
                    } else {
                        status.duration_ms
                    };
                    ctx.request(EffectRequest::ApplyStatus {
                        target: host.entity,
                        effect: StatusEffect::new(status.kind, duration_ms, status.magnitude),
                    });
                }
                AbilityEffect::Spawn { unit, count, radius } => {
                    ctx.request(EffectRequest::Spawn(SpawnRequest {
                        owner: host.owner,
                        unit: unit.clone(),
                        count: *count,
                        center: host.position,
                        radius: *radius,
                        layout: SpawnLayout::Ring,
                    }));
                }
            }
        }

        Some(Ok(AbilityActivation {
            name: self.ability_name.clone(),
            elixir_cost: self.elixir_cost,
        }))
    }
}
