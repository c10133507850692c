//! Death mechanics: spawn chains and death splash.

use crate::battle::effects::{EffectRequest, SpawnLayout, SpawnRequest};
use crate::battle::status::StatusEffect;

use super::{Mechanic, MechanicContext};

/// On death, summon `count` units of `unit` on a ring around the death position.
#[derive(Debug, Clone)]
pub struct DeathSpawn {
    pub unit: String,
    pub count: u32,
    pub radius: f32,
}

impl DeathSpawn {
    pub fn new(unit: String, count: u32, radius: f32) -> Self {
        Self { unit, count, radius }
    }
}

impl Mechanic for DeathSpawn {
    fn name(&self) -> &'static str {
        "DeathSpawn"
    }

    fn on_death(&mut self, ctx: &mut MechanicContext) {
        let host = ctx.host;
        ctx.request(EffectRequest::Spawn(SpawnRequest {
            owner: host.owner,
            unit: self.unit.clone(),
            count: self.count,
            center: host.position,
            radius: self.radius,
            layout: SpawnLayout::Ring,
        }));
    }
}

/// On death, damage enemies around the death position.
#[derive(Debug, Clone)]
pub struct DeathAreaDamage {
    pub radius: f32,
    pub damage: f32,
    pub crown_tower_multiplier: f32,
    pub status: Option<StatusEffect>,
}

impl Mechanic for DeathAreaDamage {
    fn name(&self) -> &'static str {
        "DeathAreaDamage"
    }

    fn on_death(&mut self, ctx: &mut MechanicContext) {
        let host = ctx.host;
        ctx.request(EffectRequest::AreaDamage {
            source: Some(host.id),
            owner: host.owner,
            center: host.position,
            radius: self.radius,
            damage: self.damage,
            crown_tower_multiplier: self.crown_tower_multiplier,
            status: self.status,
        });
    }
}
