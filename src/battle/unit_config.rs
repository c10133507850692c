//! Data-Driven Unit Definitions
//!
//! Archetype stats live in `assets/config/units.ron` instead of Rust code.
//! The file is embedded as the built-in catalog and can also be loaded from
//! any path. Loading validates the whole catalog up front: a match never
//! starts from a definition that references a missing archetype or carries a
//! malformed stat.
//!
//! ## Usage
//! ```ignore
//! let catalog = UnitCatalog::builtin()?;
//! let knight = catalog.get("Knight").unwrap();
//! println!("Knight hits for {}", knight.damage);
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::constants::{
    KING_TOWER_ARCHETYPE, LEVEL_STAT_GROWTH, MAX_LEVEL, PRINCESS_TOWER_ARCHETYPE,
    PROJECTILE_RANGE_SLACK, TOURNAMENT_LEVEL,
};
use super::error::ConfigurationError;
use super::status::StatusEffect;

const BUILTIN_UNITS: &str = include_str!("../../assets/config/units.ron");

/// What a deployed card turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Troop,
    Building,
    Spell,
}

/// Which movement layers an attacker can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetClass {
    Ground,
    Air,
    AirAndGround,
}

impl TargetClass {
    pub fn can_hit(self, is_air: bool) -> bool {
        match self {
            TargetClass::Ground => !is_air,
            TargetClass::Air => is_air,
            TargetClass::AirAndGround => true,
        }
    }
}

/// How a projectile resolves when it lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImpactPolicy {
    /// First qualifying entity within the hit radius of the endpoint.
    Direct,
    /// Everything qualifying within `radius` of the endpoint.
    Splash { radius: f32 },
    /// First hit, then up to `count` more hops to the nearest unvisited
    /// entity within `radius` of the previous hit.
    Chain {
        count: u32,
        radius: f32,
        #[serde(default = "default_one")]
        damage_decay: f32,
    },
    /// Flies its full range in a straight line, hitting up to `count`
    /// entities whose body overlaps a `width`-wide path.
    Pierce { count: u32, width: f32 },
    /// Flies to the target point, then rolls on as a slower, wide carrier
    /// that knocks back everything it touches.
    Roll {
        width: f32,
        depth: f32,
        speed: f32,
        distance: f32,
        knockback: f32,
    },
}

/// Projectile launched by a ranged attack or a projectile spell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileDefinition {
    /// Tiles per second
    pub speed: f32,
    #[serde(default = "default_policy")]
    pub policy: ImpactPolicy,
    #[serde(default = "default_hit_radius")]
    pub hit_radius: f32,
    #[serde(default)]
    pub status: Option<StatusEffect>,
    /// Maximum travel distance. Zero derives one from the attack range.
    #[serde(default)]
    pub range_budget: f32,
    /// Follows its target instead of flying to where it was.
    #[serde(default = "default_true")]
    pub homing: bool,
}

/// Region that pulses an effect at a fixed interval for a fixed duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaEffectDefinition {
    pub radius: f32,
    /// Total lifetime. Zero means a single pulse.
    #[serde(default)]
    pub duration_ms: u32,
    #[serde(default = "default_pulse_interval")]
    pub pulse_interval_ms: u32,
    #[serde(default)]
    pub damage_per_pulse: f32,
    /// Healing per pulse for allies
    #[serde(default)]
    pub heal_per_pulse: f32,
    #[serde(default)]
    pub status: Option<StatusEffect>,
    /// The status goes to allies instead of enemies (rage).
    #[serde(default)]
    pub status_on_allies: bool,
}

/// One step of a damage ramp: from `after_ms` of continuous engagement on,
/// attacks deal `damage`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampStage {
    pub after_ms: u32,
    pub damage: f32,
}

/// What an activated ability does for its duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AbilityEffect {
    /// Apply a status to the ability's owner. Its duration defaults to the
    /// ability duration when zero.
    SelfStatus(StatusEffect),
    /// Summon units around the owner once.
    Spawn { unit: String, count: u32, radius: f32 },
}

/// A named ability bundle owned by a composite mechanic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub name: String,
    pub elixir_cost: u32,
    pub cooldown_ms: u32,
    #[serde(default)]
    pub duration_ms: u32,
    pub effects: Vec<AbilityEffect>,
}

fn spawned_units(effects: &[AbilityEffect]) -> impl Iterator<Item = &str> {
    effects.iter().filter_map(|effect| match effect {
        AbilityEffect::Spawn { unit, .. } => Some(unit.as_str()),
        AbilityEffect::SelfStatus(_) => None,
    })
}

/// Mechanic to attach to every instance of an archetype, in list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MechanicDescriptor {
    Shield {
        pool: f32,
    },
    DeathSpawn {
        unit: String,
        count: u32,
        #[serde(default)]
        radius: f32,
    },
    DeathAreaDamage {
        radius: f32,
        damage: f32,
        #[serde(default = "default_one")]
        crown_tower_damage_multiplier: f32,
        #[serde(default)]
        status: Option<StatusEffect>,
    },
    DamageRamp {
        stages: Vec<RampStage>,
    },
    PeriodicSpawner {
        unit: String,
        count: u32,
        interval_ms: u32,
        #[serde(default)]
        initial_pause_ms: u32,
        #[serde(default = "default_spawn_radius")]
        radius: f32,
        /// Spread spawns randomly instead of on a ring
        #[serde(default)]
        scatter: bool,
    },
    ChargeUp {
        charge_ms: u32,
        damage_multiplier: f32,
    },
    Charge {
        build_up_ms: u32,
        speed_multiplier: f32,
        damage_multiplier: f32,
    },
    RiverJump,
    ActiveAbility {
        name: String,
        elixir_cost: u32,
        cooldown_ms: u32,
        duration_ms: u32,
        effects: Vec<AbilityEffect>,
    },
    StunOnHit {
        duration_ms: u32,
        /// Probability that a hit stuns, rolled on the match RNG.
        #[serde(default = "default_one")]
        chance: f32,
    },
    SlowOnHit {
        duration_ms: u32,
        magnitude: f32,
    },
    KnockbackOnHit {
        distance: f32,
    },
    /// Slows every enemy within `radius` while the host is alive.
    SlowAura {
        radius: f32,
        #[serde(default = "default_aura_slow")]
        magnitude: f32,
    },
    /// Collects souls from enemy deaths within `radius`. Souls gate and
    /// discount `ability`, and part of them come back as `drop_unit`s when
    /// the host dies.
    SoulCollector {
        #[serde(default = "default_soul_radius")]
        radius: f32,
        souls_required: u32,
        max_souls: u32,
        /// Souls held per elixir taken off the cost once unlocked
        #[serde(default = "default_souls_per_discount")]
        souls_per_discount: u32,
        #[serde(default)]
        drop_unit: Option<String>,
        #[serde(default = "default_max_drop")]
        max_drop: u32,
        ability: AbilityDefinition,
    },
}

impl MechanicDescriptor {
    /// Archetype names this descriptor will spawn.
    fn references(&self) -> Vec<&str> {
        match self {
            MechanicDescriptor::DeathSpawn { unit, .. }
            | MechanicDescriptor::PeriodicSpawner { unit, .. } => vec![unit.as_str()],
            MechanicDescriptor::ActiveAbility { effects, .. } => spawned_units(effects).collect(),
            MechanicDescriptor::SoulCollector {
                ability, drop_unit, ..
            } => spawned_units(&ability.effects)
                .chain(drop_unit.as_deref())
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn default_one() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_policy() -> ImpactPolicy {
    ImpactPolicy::Direct
}

fn default_hit_radius() -> f32 {
    0.4
}

fn default_pulse_interval() -> u32 {
    1000
}

fn default_spawn_radius() -> f32 {
    1.0
}

fn default_aura_slow() -> f32 {
    0.5
}

fn default_soul_radius() -> f32 {
    5.0
}

fn default_souls_per_discount() -> u32 {
    10
}

fn default_max_drop() -> u32 {
    10
}

/// Stat multiplier of a card level relative to level 1.
pub fn level_multiplier(level: u32) -> f32 {
    LEVEL_STAT_GROWTH.powi(level.saturating_sub(1) as i32)
}

/// Read-only archetype blueprint. Entities hold it behind an `Arc` and
/// never copy or mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitDefinition {
    pub name: String,
    pub kind: UnitKind,
    pub elixir_cost: u32,
    /// Card level. Listed stats are the tournament-level values and are
    /// rescaled when the catalog is built.
    pub level: u32,

    // === Vitals ===
    pub hitpoints: f32,
    pub collision_radius: f32,
    pub is_air: bool,

    // === Attack ===
    pub damage: f32,
    /// Attack reach beyond both collision radii
    pub range: f32,
    pub sight_range: f32,
    pub hit_speed_ms: u32,
    /// One-time wind-up before the first attack
    pub load_time_ms: u32,
    pub targets: TargetClass,
    pub targets_buildings_only: bool,
    pub crown_tower_damage_multiplier: f32,
    pub projectile: Option<ProjectileDefinition>,

    // === Movement ===
    /// Tiles per second
    pub speed: f32,

    // === Deployment ===
    pub deploy_time_ms: u32,
    pub summon_count: u32,
    pub summon_radius: f32,
    /// Ignores deploy zones (spells, miners)
    pub deploy_anywhere: bool,
    /// Buildings lose their hitpoints evenly over this time. Zero never decays.
    pub lifetime_ms: u32,

    // === Spells ===
    pub area_effect: Option<AreaEffectDefinition>,

    pub mechanics: Vec<MechanicDescriptor>,
}

impl Default for UnitDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: UnitKind::Troop,
            elixir_cost: 0,
            level: TOURNAMENT_LEVEL,
            hitpoints: 0.0,
            collision_radius: 0.5,
            is_air: false,
            damage: 0.0,
            range: 0.0,
            sight_range: 5.5,
            hit_speed_ms: 1000,
            load_time_ms: 0,
            targets: TargetClass::Ground,
            targets_buildings_only: false,
            crown_tower_damage_multiplier: 1.0,
            projectile: None,
            speed: 0.0,
            deploy_time_ms: 1000,
            summon_count: 1,
            summon_radius: 0.0,
            deploy_anywhere: false,
            lifetime_ms: 0,
            area_effect: None,
            mechanics: Vec::new(),
        }
    }
}

impl UnitDefinition {
    /// Deals damage, directly or through a projectile.
    pub fn can_attack(&self) -> bool {
        self.kind != UnitKind::Spell && self.damage > 0.0
    }

    pub fn is_spell(&self) -> bool {
        self.kind == UnitKind::Spell
    }

    /// Travel budget for projectiles launched by this archetype.
    pub fn projectile_budget(&self) -> f32 {
        match &self.projectile {
            Some(projectile) if projectile.range_budget > 0.0 => projectile.range_budget,
            _ => self.range.max(self.sight_range) + PROJECTILE_RANGE_SLACK,
        }
    }

    /// Multiplier from the listed stats to this definition's level.
    pub fn level_scale(&self) -> f32 {
        level_multiplier(self.level) / level_multiplier(TOURNAMENT_LEVEL)
    }

    /// Rescale hitpoints and every damage figure to `level`.
    fn apply_level(&mut self) {
        let scale = self.level_scale();
        if scale == 1.0 {
            return;
        }
        self.hitpoints *= scale;
        self.damage *= scale;
        if let Some(area) = &mut self.area_effect {
            area.damage_per_pulse *= scale;
            area.heal_per_pulse *= scale;
        }
        for descriptor in &mut self.mechanics {
            match descriptor {
                MechanicDescriptor::Shield { pool } => *pool *= scale,
                MechanicDescriptor::DeathAreaDamage { damage, .. } => *damage *= scale,
                MechanicDescriptor::DamageRamp { stages } => {
                    for stage in stages {
                        stage.damage *= scale;
                    }
                }
                _ => {}
            }
        }
    }

    /// Check one definition in isolation.
    fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |field: &'static str, reason: &str| {
            Err(ConfigurationError::InvalidStat {
                unit: self.name.clone(),
                field,
                reason: reason.to_string(),
            })
        };

        if self.name.trim().is_empty() {
            return invalid("name", "must not be empty");
        }
        if !(1..=MAX_LEVEL).contains(&self.level) {
            return invalid("level", "must be between 1 and the maximum card level");
        }
        let non_negative = [
            ("hitpoints", self.hitpoints),
            ("damage", self.damage),
            ("range", self.range),
            ("sight_range", self.sight_range),
            ("speed", self.speed),
            ("collision_radius", self.collision_radius),
            ("summon_radius", self.summon_radius),
            ("crown_tower_damage_multiplier", self.crown_tower_damage_multiplier),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return invalid(field, "must be a finite, non-negative number");
            }
        }
        if self.kind != UnitKind::Spell && self.hitpoints <= 0.0 {
            return invalid("hitpoints", "troops and buildings need hitpoints");
        }
        if self.can_attack() && self.hit_speed_ms == 0 {
            return invalid("hit_speed_ms", "attackers need a positive hit speed");
        }
        if self.summon_count == 0 {
            return invalid("summon_count", "must be at least 1");
        }
        if let Some(projectile) = &self.projectile {
            if projectile.speed <= 0.0 {
                return invalid("projectile.speed", "must be positive");
            }
            match projectile.policy {
                ImpactPolicy::Splash { radius } if radius <= 0.0 => {
                    return invalid("projectile.policy", "splash radius must be positive")
                }
                ImpactPolicy::Chain { radius, .. } if radius <= 0.0 => {
                    return invalid("projectile.policy", "chain radius must be positive")
                }
                ImpactPolicy::Pierce { count, .. } if count == 0 => {
                    return invalid("projectile.policy", "pierce count must be positive")
                }
                ImpactPolicy::Roll { speed, distance, .. } if speed <= 0.0 || distance <= 0.0 => {
                    return invalid("projectile.policy", "roll speed and distance must be positive")
                }
                _ => {}
            }
        }
        if let Some(area) = &self.area_effect {
            if area.radius <= 0.0 {
                return invalid("area_effect.radius", "must be positive");
            }
            if area.duration_ms > 0 && area.pulse_interval_ms == 0 {
                return invalid("area_effect.pulse_interval_ms", "lasting effects need an interval");
            }
        }
        if self.kind == UnitKind::Spell && self.projectile.is_none() && self.area_effect.is_none() {
            return invalid("kind", "spells need a projectile or an area effect");
        }
        for descriptor in &self.mechanics {
            match descriptor {
                MechanicDescriptor::DamageRamp { stages } => {
                    if stages.is_empty() {
                        return invalid("DamageRamp.stages", "must not be empty");
                    }
                    if stages.windows(2).any(|w| w[1].after_ms <= w[0].after_ms) {
                        return invalid("DamageRamp.stages", "must be strictly increasing in time");
                    }
                }
                MechanicDescriptor::PeriodicSpawner { interval_ms, count, .. } => {
                    if *interval_ms == 0 || *count == 0 {
                        return invalid("PeriodicSpawner", "interval and count must be positive");
                    }
                }
                MechanicDescriptor::Shield { pool } if *pool <= 0.0 => {
                    return invalid("Shield.pool", "must be positive");
                }
                MechanicDescriptor::ChargeUp { charge_ms, .. } if *charge_ms == 0 => {
                    return invalid("ChargeUp.charge_ms", "must be positive");
                }
                MechanicDescriptor::StunOnHit { chance, .. } if !(0.0..=1.0).contains(chance) => {
                    return invalid("StunOnHit.chance", "must be within [0, 1]");
                }
                MechanicDescriptor::SlowAura { radius, magnitude } => {
                    if *radius <= 0.0 {
                        return invalid("SlowAura.radius", "must be positive");
                    }
                    if !(0.0..=1.0).contains(magnitude) {
                        return invalid("SlowAura.magnitude", "must be within [0, 1]");
                    }
                }
                MechanicDescriptor::SoulCollector {
                    radius,
                    souls_required,
                    max_souls,
                    souls_per_discount,
                    ..
                } => {
                    if *radius <= 0.0 {
                        return invalid("SoulCollector.radius", "must be positive");
                    }
                    if souls_required > max_souls {
                        return invalid("SoulCollector.max_souls", "must hold at least souls_required");
                    }
                    if *souls_per_discount == 0 {
                        return invalid("SoulCollector.souls_per_discount", "must be positive");
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Root of `units.ron`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnitsConfig {
    pub units: Vec<UnitDefinition>,
}

/// Validated archetype catalog keyed by name.
#[derive(Resource, Debug, Clone, Default)]
pub struct UnitCatalog {
    units: BTreeMap<String, Arc<UnitDefinition>>,
}

impl UnitCatalog {
    /// Build and validate a catalog from parsed definitions.
    pub fn new(config: UnitsConfig) -> Result<Self, ConfigurationError> {
        let mut units = BTreeMap::new();
        for mut definition in config.units {
            definition.validate()?;
            definition.apply_level();
            if units.contains_key(&definition.name) {
                return Err(ConfigurationError::InvalidStat {
                    unit: definition.name.clone(),
                    field: "name",
                    reason: "defined twice".to_string(),
                });
            }
            units.insert(definition.name.clone(), Arc::new(definition));
        }
        let catalog = Self { units };
        catalog.validate_references()?;
        Ok(catalog)
    }

    pub fn from_ron_str(text: &str, origin: &str) -> Result<Self, ConfigurationError> {
        let config: UnitsConfig = ron::from_str(text).map_err(|e| ConfigurationError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        Self::new(config)
    }

    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, ConfigurationError> {
        Self::from_ron_str(BUILTIN_UNITS, "built-in units.ron")
    }

    /// Load a catalog from a RON file.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_ron_str(&contents, &path.display().to_string())?;
        info!("Loaded {} unit definitions from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    fn validate_references(&self) -> Result<(), ConfigurationError> {
        for definition in self.units.values() {
            for descriptor in &definition.mechanics {
                for reference in descriptor.references() {
                    if !self.units.contains_key(reference) {
                        return Err(ConfigurationError::UnknownReference {
                            unit: definition.name.clone(),
                            reference: reference.to_string(),
                        });
                    }
                }
            }
        }
        self.reject_spawn_cycles()
    }

    /// Archetypes one instance of `name` can bring into play.
    fn spawn_edges<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
        self.units
            .get(name)
            .into_iter()
            .flat_map(|definition| definition.mechanics.iter())
            .flat_map(|descriptor| descriptor.references())
    }

    /// Depth-first search over spawn edges for an archetype that can spawn
    /// itself, directly or through others.
    fn reject_spawn_cycles(&self) -> Result<(), ConfigurationError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
        for root in self.units.keys() {
            if marks.contains_key(root.as_str()) {
                continue;
            }
            // Each frame is a unit and the edges still to explore from it.
            let mut path: Vec<&str> = vec![root.as_str()];
            let mut stack: Vec<std::vec::IntoIter<&str>> =
                vec![self.spawn_edges(root).collect::<Vec<_>>().into_iter()];
            marks.insert(root.as_str(), Mark::Visiting);

            while let Some(edges) = stack.last_mut() {
                match edges.next() {
                    Some(next) => match marks.get(next) {
                        Some(Mark::Done) => {}
                        Some(Mark::Visiting) => {
                            let start = path.iter().position(|name| *name == next).unwrap_or(0);
                            let mut cycle: Vec<String> =
                                path[start..].iter().map(|name| name.to_string()).collect();
                            cycle.push(next.to_string());
                            return Err(ConfigurationError::SpawnCycle { cycle });
                        }
                        None => {
                            marks.insert(next, Mark::Visiting);
                            path.push(next);
                            stack.push(self.spawn_edges(next).collect::<Vec<_>>().into_iter());
                        }
                    },
                    None => {
                        if let Some(done) = path.pop() {
                            marks.insert(done, Mark::Done);
                        }
                        stack.pop();
                    }
                }
            }
        }
        Ok(())
    }

    /// Ensure the archetypes a full match needs are present.
    pub fn require_towers(&self) -> Result<(), ConfigurationError> {
        for name in [KING_TOWER_ARCHETYPE, PRINCESS_TOWER_ARCHETYPE] {
            if !self.units.contains_key(name) {
                return Err(ConfigurationError::MissingArchetype(name.to_string()));
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<UnitDefinition>> {
        self.units.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = UnitCatalog::builtin().unwrap();
        assert!(catalog.require_towers().is_ok());
        assert!(catalog.contains("Knight"));
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let catalog =
            UnitCatalog::from_ron_str(r#"(units: [(name: "Dummy", hitpoints: 100.0)])"#, "test")
                .unwrap();
        let dummy = catalog.get("Dummy").unwrap();
        assert_eq!(dummy.kind, UnitKind::Troop);
        assert_eq!(dummy.summon_count, 1);
        assert!(!dummy.can_attack());
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let text = r#"(units: [
            (name: "Golem", hitpoints: 100.0, mechanics: [DeathSpawn(unit: "Nobody", count: 2)]),
        ])"#;
        let err = UnitCatalog::from_ron_str(text, "test").unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownReference { .. }));
    }

    #[test]
    fn test_ramp_stages_must_increase() {
        let text = r#"(units: [
            (name: "Inferno", kind: Building, hitpoints: 100.0, damage: 10.0, mechanics: [
                DamageRamp(stages: [(after_ms: 0, damage: 10.0), (after_ms: 0, damage: 20.0)]),
            ]),
        ])"#;
        let err = UnitCatalog::from_ron_str(text, "test").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidStat { field: "DamageRamp.stages", .. }));
    }

    #[test]
    fn test_negative_stat_is_rejected() {
        let text = r#"(units: [(name: "Bad", hitpoints: 100.0, speed: -1.0)])"#;
        let err = UnitCatalog::from_ron_str(text, "test").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidStat { field: "speed", .. }));
    }

    #[test]
    fn test_self_spawning_unit_is_rejected() {
        let text = r#"(units: [
            (name: "Hydra", hitpoints: 100.0, mechanics: [DeathSpawn(unit: "Hydra", count: 2)]),
        ])"#;
        let err = UnitCatalog::from_ron_str(text, "test").unwrap_err();
        match err {
            ConfigurationError::SpawnCycle { cycle } => assert_eq!(cycle, vec!["Hydra", "Hydra"]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_spawn_cycle_through_other_mechanics_is_rejected() {
        let text = r#"(units: [
            (name: "Nest", kind: Building, hitpoints: 100.0, mechanics: [
                PeriodicSpawner(unit: "Hatchling", count: 1, interval_ms: 1000),
            ]),
            (name: "Hatchling", hitpoints: 10.0, mechanics: [
                ActiveAbility(name: "Burrow", elixir_cost: 1, cooldown_ms: 1000, duration_ms: 0,
                    effects: [Spawn(unit: "Nest", count: 1, radius: 0.0)]),
            ]),
        ])"#;
        let err = UnitCatalog::from_ron_str(text, "test").unwrap_err();
        assert!(err.to_string().contains("Hatchling -> Nest -> Hatchling"), "{}", err);
    }

    #[test]
    fn test_shared_spawn_targets_are_not_cycles() {
        let text = r#"(units: [
            (name: "Golem", hitpoints: 100.0, mechanics: [DeathSpawn(unit: "Golemite", count: 2)]),
            (name: "Giant", hitpoints: 100.0, mechanics: [DeathSpawn(unit: "Golemite", count: 1)]),
            (name: "Golemite", hitpoints: 10.0),
        ])"#;
        assert!(UnitCatalog::from_ron_str(text, "test").is_ok());
    }

    #[test]
    fn test_level_rescales_hitpoints_and_damage() {
        let text = r#"(units: [
            (name: "Veteran", hitpoints: 1000.0, damage: 100.0, mechanics: [Shield(pool: 200.0)]),
            (name: "Rookie", level: 9, hitpoints: 1000.0, damage: 100.0, mechanics: [Shield(pool: 200.0)]),
        ])"#;
        let catalog = UnitCatalog::from_ron_str(text, "test").unwrap();

        let veteran = catalog.get("Veteran").unwrap();
        assert_eq!(veteran.level, TOURNAMENT_LEVEL);
        assert_eq!(veteran.hitpoints, 1000.0);

        let rookie = catalog.get("Rookie").unwrap();
        let scale = 1.1f32.powi(8) / 1.1f32.powi(10);
        assert!((rookie.hitpoints - 1000.0 * scale).abs() < 0.01);
        assert!((rookie.damage - 100.0 * scale).abs() < 0.01);
        assert!(matches!(
            rookie.mechanics[0],
            MechanicDescriptor::Shield { pool } if (pool - 200.0 * scale).abs() < 0.01
        ));
    }

    #[test]
    fn test_level_multiplier_compounds_from_level_one() {
        assert_eq!(level_multiplier(1), 1.0);
        assert!((level_multiplier(2) - 1.1).abs() < 1e-6);
        assert!((level_multiplier(11) - 1.1f32.powi(10)).abs() < 1e-4);
    }

    #[test]
    fn test_level_out_of_range_is_rejected() {
        let text = r#"(units: [(name: "Legend", level: 16, hitpoints: 100.0)])"#;
        let err = UnitCatalog::from_ron_str(text, "test").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidStat { field: "level", .. }));
    }

    #[test]
    fn test_stun_chance_must_be_a_probability() {
        let text = r#"(units: [
            (name: "Zap", hitpoints: 100.0, mechanics: [StunOnHit(duration_ms: 500, chance: 1.5)]),
        ])"#;
        let err = UnitCatalog::from_ron_str(text, "test").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidStat { field: "StunOnHit.chance", .. }));
    }

    #[test]
    fn test_soul_collector_references_its_drops() {
        let text = r#"(units: [
            (name: "Lich", hitpoints: 100.0, mechanics: [
                SoulCollector(souls_required: 20, max_souls: 30, drop_unit: Some("Bones"),
                    ability: (name: "Raise", elixir_cost: 3, cooldown_ms: 1000,
                        effects: [Spawn(unit: "Skeleton", count: 3, radius: 1.0)])),
            ]),
            (name: "Skeleton", hitpoints: 10.0),
        ])"#;
        let err = UnitCatalog::from_ron_str(text, "test").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnknownReference { ref reference, .. } if reference == "Bones"
        ));
    }

    #[test]
    fn test_missing_towers_are_reported() {
        let catalog =
            UnitCatalog::from_ron_str(r#"(units: [(name: "Knight", hitpoints: 100.0)])"#, "test")
                .unwrap();
        assert!(matches!(
            catalog.require_towers(),
            Err(ConfigurationError::MissingArchetype(_))
        ));
    }
}
