//! Tests for the unit catalog and match rules shipped in assets/
//!
//! These tests verify that:
//! - The built-in catalog loads and matches the file on disk
//! - Every archetype carries sane stats for its kind
//! - Mechanic descriptors only reference archetypes that exist
//! - Spawn references never loop back on themselves
//! - The shipped rules file matches the defaults

use std::path::Path;

use lanesim::battle::unit_config::{ImpactPolicy, MechanicDescriptor, UnitKind};
use lanesim::{ConfigurationError, MatchRules, UnitCatalog};

fn catalog() -> UnitCatalog {
    UnitCatalog::builtin().expect("built-in catalog must load")
}

#[test]
fn test_file_and_builtin_catalog_agree() {
    let from_file = UnitCatalog::load(Path::new("assets/config/units.ron")).unwrap();
    let builtin = catalog();
    assert_eq!(from_file.len(), builtin.len());
    for name in builtin.names() {
        assert_eq!(from_file.get(name), builtin.get(name), "{} differs", name);
    }
}

#[test]
fn test_towers_and_core_cards_are_present() {
    let catalog = catalog();
    assert!(catalog.require_towers().is_ok());
    for name in ["Knight", "Archers", "Giant", "Golem", "Fireball", "Log", "Zap", "Tombstone"] {
        assert!(catalog.contains(name), "{} missing", name);
    }
}

#[test]
fn test_every_archetype_fits_its_kind() {
    let catalog = catalog();
    for name in catalog.names() {
        let unit = catalog.get(name).unwrap();
        match unit.kind {
            UnitKind::Spell => {
                assert!(
                    unit.projectile.is_some() || unit.area_effect.is_some(),
                    "{} has no way to take effect",
                    name
                );
                assert!(unit.elixir_cost > 0, "{} is free", name);
            }
            UnitKind::Troop | UnitKind::Building => {
                assert!(unit.hitpoints > 0.0, "{} has no hitpoints", name);
                if unit.can_attack() {
                    assert!(unit.hit_speed_ms > 0, "{} never attacks", name);
                }
            }
        }
        if unit.kind == UnitKind::Troop && unit.can_attack() {
            assert!(unit.speed > 0.0, "{} cannot move", name);
        }
    }
}

#[test]
fn test_references_resolve() {
    let catalog = catalog();
    for name in catalog.names() {
        for descriptor in &catalog.get(name).unwrap().mechanics {
            let reference = match descriptor {
                MechanicDescriptor::DeathSpawn { unit, .. }
                | MechanicDescriptor::PeriodicSpawner { unit, .. } => Some(unit),
                _ => None,
            };
            if let Some(reference) = reference {
                assert!(catalog.contains(reference), "{} -> {}", name, reference);
            }
        }
    }
}

#[test]
fn test_death_chains_terminate() {
    let catalog = catalog();
    for name in catalog.names() {
        let mut current = name.to_string();
        let mut depth = 0;
        while let Some(next) = catalog.get(&current).and_then(|unit| {
            unit.mechanics.iter().find_map(|m| match m {
                MechanicDescriptor::DeathSpawn { unit, .. } => Some(unit.clone()),
                _ => None,
            })
        }) {
            current = next;
            depth += 1;
            assert!(depth < 10, "{} death-spawns forever", name);
        }
    }
}

#[test]
fn test_self_spawning_archetype_is_rejected() {
    let text = r#"(units: [
        (name: "Hydra", hitpoints: 300.0, mechanics: [DeathSpawn(unit: "Hydra", count: 2)]),
    ])"#;
    let err = UnitCatalog::from_ron_str(text, "hydra.ron").unwrap_err();
    assert!(matches!(err, ConfigurationError::SpawnCycle { .. }));
    assert_eq!(err.to_string(), "spawn cycle: Hydra -> Hydra");
}

#[test]
fn test_skeleton_king_collects_souls() {
    let catalog = catalog();
    let king = catalog.get("SkeletonKing").unwrap();
    assert!(king.mechanics.iter().any(|m| matches!(
        m,
        MechanicDescriptor::SoulCollector { souls_required: 20, max_souls: 30, ability, .. }
            if ability.elixir_cost == 3
    )));
}

#[test]
fn test_builtin_units_are_tournament_level() {
    let catalog = catalog();
    for name in catalog.names() {
        assert_eq!(catalog.get(name).unwrap().level, 11, "{}", name);
    }
    assert_eq!(catalog.get("Knight").unwrap().hitpoints, 1766.0);
}

#[test]
fn test_projectile_policies_are_used() {
    let catalog = catalog();
    let policies: Vec<&ImpactPolicy> = catalog
        .names()
        .filter_map(|name| catalog.get(name).unwrap().projectile.as_ref())
        .map(|p| &p.policy)
        .collect();
    assert!(policies.iter().any(|p| matches!(p, ImpactPolicy::Splash { .. })));
    assert!(policies.iter().any(|p| matches!(p, ImpactPolicy::Chain { .. })));
    assert!(policies.iter().any(|p| matches!(p, ImpactPolicy::Pierce { .. })));
    assert!(policies.iter().any(|p| matches!(p, ImpactPolicy::Roll { .. })));
}

#[test]
fn test_duplicate_names_are_rejected() {
    let text = r#"(units: [
        (name: "Knight", hitpoints: 100.0),
        (name: "Knight", hitpoints: 200.0),
    ])"#;
    assert!(matches!(
        UnitCatalog::from_ron_str(text, "test"),
        Err(ConfigurationError::InvalidStat { field: "name", .. })
    ));
}

#[test]
fn test_malformed_ron_is_a_parse_error() {
    let err = UnitCatalog::from_ron_str("(units: [(name: ", "broken.ron").unwrap_err();
    assert!(matches!(err, ConfigurationError::Parse { .. }));
    assert!(err.to_string().contains("broken.ron"));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let err = UnitCatalog::load(Path::new("assets/config/missing.ron")).unwrap_err();
    assert!(matches!(err, ConfigurationError::Io { .. }));
}

#[test]
fn test_shipped_rules_match_defaults() {
    let rules = MatchRules::load(Path::new("assets/config/rules.ron")).unwrap();
    assert_eq!(rules, MatchRules::default());
}
