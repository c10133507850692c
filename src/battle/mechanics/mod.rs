//! Mechanic Framework
//!
//! Archetype-specific behaviour is composed from small `Mechanic` objects
//! attached to an entity when it spawns. Each mechanic overrides only the
//! lifecycle events it cares about; the resolvers never branch on archetype.
//!
//! ## Lifecycle
//!
//! 1. `on_attach` when the entity is built, in attachment order
//! 2. `on_spawn` on the first tick the entity is processed
//! 3. `on_tick` every tick while alive and deployed
//! 4. `on_attack_start` / `on_attack_hit` around each attack
//! 5. `on_death` exactly once, from the death phase
//! 6. `on_nearby_death` for each death of the tick while the host survives
//!
//! Mechanics never mutate the world directly. They push `EffectRequest`s
//! into the context outbox, and the caller resolves the batch after every
//! mechanic has seen the event. A mechanic that kills its own host mid-dispatch
//! therefore cannot cut the dispatch short.

use std::fmt;

use bevy::prelude::*;

use super::components::{EntityId, GameRng, Player};
use super::effects::EffectRequest;
use super::error::AbilityError;
use super::unit_config::{MechanicDescriptor, UnitDefinition};

pub mod ability;
pub mod aura;
pub mod charge;
pub mod damage_ramp;
pub mod death;
pub mod on_hit;
pub mod shield;
pub mod souls;
pub mod spawner;

pub use ability::ActiveAbility;
pub use aura::SlowAura;
pub use charge::{Charge, ChargeUp, RiverJump};
pub use damage_ramp::DamageRamp;
pub use death::{DeathAreaDamage, DeathSpawn};
pub use on_hit::{KnockbackOnHit, SlowOnHit, StunOnHit};
pub use shield::Shield;
pub use souls::SoulCollector;
pub use spawner::PeriodicSpawner;

// ============================================================================
// Context
// ============================================================================

/// What a mechanic may know about its host's current target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetInfo {
    pub entity: Entity,
    pub id: EntityId,
    pub position: Vec2,
    pub is_building: bool,
    pub is_air: bool,
}

/// Snapshot of the host taken before dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostInfo {
    pub entity: Entity,
    pub id: EntityId,
    pub owner: Player,
    pub position: Vec2,
    pub target: Option<TargetInfo>,
    /// Target is within attack range
    pub engaged: bool,
    /// Stunned or frozen
    pub disabled: bool,
    pub spawn_speed: f32,
}

impl HostInfo {
    /// Host with no target and no modifiers.
    pub fn detached(entity: Entity, id: EntityId, owner: Player, position: Vec2) -> Self {
        Self {
            entity,
            id,
            owner,
            position,
            target: None,
            engaged: false,
            disabled: false,
            spawn_speed: 1.0,
        }
    }

    pub fn target_entity(&self) -> Option<Entity> {
        self.target.map(|t| t.entity)
    }
}

/// An entity that died this tick, as seen by its neighbours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeathNotice {
    pub id: EntityId,
    pub owner: Player,
    pub position: Vec2,
}

/// Per-dispatch view handed to every mechanic.
///
/// Holds a non-owning handle to the host, an outbox of requested effects
/// and, inside a match, the match RNG.
pub struct MechanicContext<'a> {
    pub host: &'a HostInfo,
    pub tick: u64,
    pub dt_ms: u32,
    outbox: &'a mut Vec<EffectRequest>,
    rng: Option<&'a mut GameRng>,
}

impl<'a> MechanicContext<'a> {
    pub fn new(host: &'a HostInfo, tick: u64, dt_ms: u32, outbox: &'a mut Vec<EffectRequest>) -> Self {
        Self {
            host,
            tick,
            dt_ms,
            outbox,
            rng: None,
        }
    }

    pub fn with_rng(mut self, rng: &'a mut GameRng) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn request(&mut self, effect: EffectRequest) {
        self.outbox.push(effect);
    }

    /// Roll an event of probability `chance`. Certain and impossible events
    /// never consume a random number. Without an RNG only certain events pass.
    pub fn roll(&mut self, chance: f32) -> bool {
        if chance >= 1.0 {
            return true;
        }
        if chance <= 0.0 {
            return false;
        }
        match self.rng.as_deref_mut() {
            Some(rng) => rng.random_f32() < chance,
            None => false,
        }
    }
}

/// Damage of the attack being started. Mechanics adjust it in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackModifiers {
    pub damage: f32,
}

/// Result of offering incoming damage to a mechanic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Absorption {
    /// Damage left for hitpoints
    pub remaining: f32,
    pub absorbed: f32,
    /// The absorbing pool ran out during this hit
    pub depleted: bool,
}

impl Absorption {
    pub fn passthrough(amount: f32) -> Self {
        Self {
            remaining: amount,
            absorbed: 0.0,
            depleted: false,
        }
    }
}

/// A successful manual activation.
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityActivation {
    pub name: String,
    pub elixir_cost: u32,
}

// ============================================================================
// Mechanic trait
// ============================================================================

/// A stateful behaviour exclusively owned by one entity.
pub trait Mechanic: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn on_attach(&mut self, _archetype: &UnitDefinition) {}

    fn on_spawn(&mut self, _ctx: &mut MechanicContext) {}

    fn on_tick(&mut self, _ctx: &mut MechanicContext) {}

    fn on_attack_start(
        &mut self,
        _ctx: &mut MechanicContext,
        _target: &TargetInfo,
        _attack: &mut AttackModifiers,
    ) {
    }

    fn on_attack_hit(&mut self, _ctx: &mut MechanicContext, _target: &TargetInfo) {}

    fn on_death(&mut self, _ctx: &mut MechanicContext) {}

    /// Another entity died this tick. Called on every survivor, nearby or not.
    fn on_nearby_death(&mut self, _ctx: &mut MechanicContext, _death: &DeathNotice) {}

    /// Offered every hit before hitpoints are touched.
    fn absorb_damage(&mut self, amount: f32) -> Absorption {
        Absorption::passthrough(amount)
    }

    /// Stun, freeze or knockback landed on the host.
    fn on_interrupted(&mut self) {}

    fn speed_multiplier(&self) -> f32 {
        1.0
    }

    /// Lets a ground host ignore the river.
    fn crosses_river(&self) -> bool {
        false
    }

    fn shield_remaining(&self) -> Option<f32> {
        None
    }

    fn souls(&self) -> Option<u32> {
        None
    }

    /// Manual activation. `None` means this mechanic is not activatable.
    fn try_activate(
        &mut self,
        _ctx: &mut MechanicContext,
        _available_elixir: f32,
    ) -> Option<Result<AbilityActivation, AbilityError>> {
        None
    }
}

/// Build the mechanic a descriptor names.
pub fn instantiate(descriptor: &MechanicDescriptor) -> Box<dyn Mechanic> {
    match descriptor {
        MechanicDescriptor::Shield { pool } => Box::new(Shield::new(*pool)),
        MechanicDescriptor::DeathSpawn { unit, count, radius } => {
            Box::new(DeathSpawn::new(unit.clone(), *count, *radius))
        }
        MechanicDescriptor::DeathAreaDamage {
            radius,
            damage,
            crown_tower_damage_multiplier,
            status,
        } => Box::new(DeathAreaDamage {
            radius: *radius,
            damage: *damage,
            crown_tower_multiplier: *crown_tower_damage_multiplier,
            status: *status,
        }),
        MechanicDescriptor::DamageRamp { stages } => Box::new(DamageRamp::new(stages.clone())),
        MechanicDescriptor::PeriodicSpawner {
            unit,
            count,
            interval_ms,
            initial_pause_ms,
            radius,
            scatter,
        } => Box::new(PeriodicSpawner::new(
            unit.clone(),
            *count,
            *interval_ms,
            *initial_pause_ms,
            *radius,
            *scatter,
        )),
        MechanicDescriptor::ChargeUp {
            charge_ms,
            damage_multiplier,
        } => Box::new(ChargeUp::new(*charge_ms, *damage_multiplier)),
        MechanicDescriptor::Charge {
            build_up_ms,
            speed_multiplier,
            damage_multiplier,
        } => Box::new(Charge::new(*build_up_ms, *speed_multiplier, *damage_multiplier)),
        MechanicDescriptor::RiverJump => Box::new(RiverJump),
        MechanicDescriptor::ActiveAbility {
            name,
            elixir_cost,
            cooldown_ms,
            duration_ms,
            effects,
        } => Box::new(ActiveAbility::new(
            name.clone(),
            *elixir_cost,
            *cooldown_ms,
            *duration_ms,
            effects.clone(),
        )),
        MechanicDescriptor::StunOnHit { duration_ms, chance } => Box::new(StunOnHit {
            duration_ms: *duration_ms,
            chance: *chance,
        }),
        MechanicDescriptor::SlowOnHit {
            duration_ms,
            magnitude,
        } => Box::new(SlowOnHit {
            duration_ms: *duration_ms,
            magnitude: *magnitude,
        }),
        MechanicDescriptor::KnockbackOnHit { distance } => Box::new(KnockbackOnHit {
            distance: *distance,
        }),
        MechanicDescriptor::SlowAura { radius, magnitude } => Box::new(SlowAura {
            radius: *radius,
            magnitude: *magnitude,
        }),
        MechanicDescriptor::SoulCollector {
            radius,
            souls_required,
            max_souls,
            souls_per_discount,
            drop_unit,
            max_drop,
            ability,
        } => Box::new(SoulCollector::new(
            *radius,
            *souls_required,
            *max_souls,
            *souls_per_discount,
            drop_unit.clone(),
            *max_drop,
            ActiveAbility::from_definition(ability),
        )),
    }
}

// ============================================================================
// Host
// ============================================================================

/// The mechanics attached to one entity, in attachment order.
///
/// The list is fixed once built; composition only changes by spawning a
/// new entity.
#[derive(Component, Debug)]
pub struct Mechanics {
    list: Vec<Box<dyn Mechanic>>,
    spawned: bool,
}

impl Mechanics {
    /// Instantiate an archetype's descriptors and run `on_attach` on each.
    pub fn attach(archetype: &UnitDefinition) -> Self {
        Self::from_list(archetype.mechanics.iter().map(instantiate).collect(), archetype)
    }

    pub fn from_list(mut list: Vec<Box<dyn Mechanic>>, archetype: &UnitDefinition) -> Self {
        for mechanic in &mut list {
            mechanic.on_attach(archetype);
        }
        Self {
            list,
            spawned: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.list.iter().map(|m| m.name()).collect()
    }

    /// `on_spawn` the first time, then `on_tick`.
    pub fn dispatch_tick(&mut self, ctx: &mut MechanicContext) {
        if !self.spawned {
            self.spawned = true;
            for mechanic in &mut self.list {
                mechanic.on_spawn(ctx);
            }
        }
        for mechanic in &mut self.list {
            mechanic.on_tick(ctx);
        }
    }

    /// Returns the attack damage after every mechanic had its say.
    pub fn dispatch_attack_start(
        &mut self,
        ctx: &mut MechanicContext,
        target: &TargetInfo,
        base_damage: f32,
    ) -> f32 {
        let mut attack = AttackModifiers {
            damage: base_damage,
        };
        for mechanic in &mut self.list {
            mechanic.on_attack_start(ctx, target, &mut attack);
        }
        attack.damage.max(0.0)
    }

    pub fn dispatch_attack_hit(&mut self, ctx: &mut MechanicContext, target: &TargetInfo) {
        for mechanic in &mut self.list {
            mechanic.on_attack_hit(ctx, target);
        }
    }

    pub fn dispatch_death(&mut self, ctx: &mut MechanicContext) {
        for mechanic in &mut self.list {
            mechanic.on_death(ctx);
        }
    }

    pub fn dispatch_nearby_deaths(&mut self, ctx: &mut MechanicContext, deaths: &[DeathNotice]) {
        for death in deaths {
            for mechanic in &mut self.list {
                mechanic.on_nearby_death(ctx, death);
            }
        }
    }

    /// Pass incoming damage through every absorbing mechanic in order.
    pub fn absorb(&mut self, amount: f32) -> Absorption {
        let mut total = Absorption::passthrough(amount);
        for mechanic in &mut self.list {
            if total.remaining <= 0.0 {
                break;
            }
            let step = mechanic.absorb_damage(total.remaining);
            total.remaining = step.remaining;
            total.absorbed += step.absorbed;
            total.depleted |= step.depleted;
        }
        total
    }

    pub fn interrupt(&mut self) {
        for mechanic in &mut self.list {
            mechanic.on_interrupted();
        }
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.list.iter().map(|m| m.speed_multiplier()).product()
    }

    pub fn crosses_river(&self) -> bool {
        self.list.iter().any(|m| m.crosses_river())
    }

    pub fn shield_remaining(&self) -> Option<f32> {
        self.list
            .iter()
            .filter_map(|m| m.shield_remaining())
            .reduce(|a, b| a + b)
    }

    pub fn souls(&self) -> Option<u32> {
        self.list.iter().find_map(|m| m.souls())
    }

    /// Activate the first activatable mechanic.
    pub fn activate(
        &mut self,
        ctx: &mut MechanicContext,
        available_elixir: f32,
    ) -> Result<AbilityActivation, AbilityError> {
        for mechanic in &mut self.list {
            if let Some(result) = mechanic.try_activate(ctx, available_elixir) {
                return result;
            }
        }
        Err(AbilityError::NoAbility)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn host(id: u32) -> HostInfo {
        HostInfo::detached(
            Entity::from_raw(id),
            EntityId(id),
            Player::One,
            Vec2::new(9.0, 8.0),
        )
    }

    pub fn target(id: u32) -> TargetInfo {
        TargetInfo {
            entity: Entity::from_raw(id),
            id: EntityId(id),
            position: Vec2::new(9.0, 10.0),
            is_building: false,
            is_air: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[derive(Debug, Default)]
    struct Recorder {
        events: Vec<&'static str>,
    }

    impl Mechanic for Recorder {
        fn name(&self) -> &'static str {
            "Recorder"
        }
        fn on_attach(&mut self, _archetype: &UnitDefinition) {
            self.events.push("attach");
        }
        fn on_spawn(&mut self, _ctx: &mut MechanicContext) {
            self.events.push("spawn");
        }
        fn on_tick(&mut self, _ctx: &mut MechanicContext) {
            self.events.push("tick");
        }
    }

    #[derive(Debug)]
    struct Doubler;

    impl Mechanic for Doubler {
        fn name(&self) -> &'static str {
            "Doubler"
        }
        fn on_attack_start(
            &mut self,
            _ctx: &mut MechanicContext,
            _target: &TargetInfo,
            attack: &mut AttackModifiers,
        ) {
            attack.damage *= 2.0;
        }
    }

    #[test]
    fn test_spawn_dispatches_once_before_first_tick() {
        let mut mechanics = Mechanics::from_list(
            vec![Box::new(Recorder::default())],
            &UnitDefinition::default(),
        );
        let host = host(1);
        let mut outbox = Vec::new();
        for tick in 0..2 {
            let mut ctx = MechanicContext::new(&host, tick, 33, &mut outbox);
            mechanics.dispatch_tick(&mut ctx);
        }
        let recorded = format!("{:?}", mechanics.list[0]);
        assert!(recorded.contains(r#"["attach", "spawn", "tick", "tick"]"#));
    }

    #[test]
    fn test_attack_modifiers_apply_in_order() {
        let mut mechanics = Mechanics::from_list(
            vec![Box::new(Doubler), Box::new(Doubler)],
            &UnitDefinition::default(),
        );
        let host = host(1);
        let mut outbox = Vec::new();
        let mut ctx = MechanicContext::new(&host, 0, 33, &mut outbox);
        let damage = mechanics.dispatch_attack_start(&mut ctx, &target(2), 10.0);
        assert_eq!(damage, 40.0);
    }

    #[test]
    fn test_no_activatable_mechanic_reports_no_ability() {
        let mut mechanics = Mechanics::from_list(vec![Box::new(Doubler)], &UnitDefinition::default());
        let host = host(1);
        let mut outbox = Vec::new();
        let mut ctx = MechanicContext::new(&host, 0, 33, &mut outbox);
        assert_eq!(
            mechanics.activate(&mut ctx, 10.0),
            Err(AbilityError::NoAbility)
        );
    }

    #[test]
    fn test_roll_without_rng_only_passes_certain_events() {
        let host = host(1);
        let mut outbox = Vec::new();
        let mut ctx = MechanicContext::new(&host, 0, 33, &mut outbox);
        assert!(ctx.roll(1.0));
        assert!(!ctx.roll(0.5));
        assert!(!ctx.roll(0.0));
    }

    #[test]
    fn test_roll_follows_the_seeded_rng() {
        let host = host(1);
        let mut outbox = Vec::new();
        let mut rng = GameRng::from_seed(11);
        let mut expected = GameRng::from_seed(11);
        let mut ctx = MechanicContext::new(&host, 0, 33, &mut outbox).with_rng(&mut rng);
        for _ in 0..20 {
            assert_eq!(ctx.roll(0.3), expected.random_f32() < 0.3);
        }
    }

    #[test]
    fn test_attach_builds_descriptors_in_order() {
        let archetype = UnitDefinition {
            name: "Guard".to_string(),
            mechanics: vec![
                MechanicDescriptor::Shield { pool: 100.0 },
                MechanicDescriptor::RiverJump,
            ],
            ..UnitDefinition::default()
        };
        let mechanics = Mechanics::attach(&archetype);
        assert_eq!(mechanics.names(), vec!["Shield", "RiverJump"]);
        assert!(mechanics.crosses_river());
        assert_eq!(mechanics.shield_remaining(), Some(100.0));
    }
}
