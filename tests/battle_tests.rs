//! Integration tests for the battle API
//!
//! These tests verify that:
//! - A new match places six crown towers and starts both players at the
//!   starting elixir
//! - Deployments are validated (cost, zone, hand, occupancy, match over)
//!   and a rejected deployment leaves the match untouched
//! - Elixir regenerates toward the cap and decks cycle through the hand

use bevy::prelude::Vec2;

use lanesim::battle::components::{EntityKind, TowerRole};
use lanesim::battle::match_flow::{ElixirPhase, MatchOutcome};
use lanesim::combat::events::BattleEvent;
use lanesim::{
    create_match, BattleState, DeploymentError, MatchRules, Player, UnitCatalog,
};

fn cards(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

const DECK: [&str; 8] = [
    "Knight", "Archers", "Giant", "Fireball", "HogRider", "Zap", "Tombstone", "Log",
];

// =============================================================================
// Match setup
// =============================================================================

#[test]
fn test_new_match_has_six_towers() {
    let battle = create_match(1).unwrap();
    let towers: Vec<_> = battle.entities().into_iter().filter(|e| e.tower.is_some()).collect();
    assert_eq!(towers.len(), 6);

    for player in Player::BOTH {
        let owned: Vec<_> = towers.iter().filter(|t| t.owner == player).collect();
        assert_eq!(owned.len(), 3);
        assert!(owned.iter().all(|t| t.kind == EntityKind::Building));
        assert_eq!(
            owned.iter().filter(|t| t.tower == Some(TowerRole::King)).count(),
            1
        );
    }
    assert_eq!(battle.player(Player::One).elixir, 5.0);
    assert_eq!(battle.player(Player::Two).elixir, 5.0);
    assert_eq!(battle.tick(), 0);
    assert!(!battle.is_over());
}

#[test]
fn test_tower_spawns_are_reported_on_the_first_tick() {
    let mut battle = create_match(1).unwrap();
    battle.step();
    let spawns = battle
        .events()
        .iter()
        .filter(|e| matches!(e, BattleEvent::Spawn { .. }))
        .count();
    assert_eq!(spawns, 6);

    battle.step();
    assert!(battle.events().is_empty());
}

#[test]
fn test_sandbox_has_no_towers_and_runs_on_the_clock() {
    let rules = MatchRules {
        double_elixir_at_ms: 500,
        triple_elixir_at_ms: 500,
        sudden_death_at_ms: 500,
        match_end_ms: 1000,
        ..MatchRules::default()
    };
    let mut battle = BattleState::sandbox(3, UnitCatalog::builtin().unwrap(), rules).unwrap();
    assert!(battle.entities().is_empty());

    battle.step();
    assert!(!battle.is_over(), "a sandbox must not end without towers falling");

    assert_eq!(battle.run_until_over(100), Some(MatchOutcome::Draw));
    assert!(battle.elapsed_secs() >= 1.0);
}

#[test]
fn test_invalid_rules_are_rejected() {
    let rules = MatchRules {
        tick_ms: 0,
        ..MatchRules::default()
    };
    assert!(BattleState::new(1, UnitCatalog::builtin().unwrap(), rules).is_err());
}

#[test]
fn test_catalog_without_towers_cannot_start_a_match() {
    let catalog =
        UnitCatalog::from_ron_str(r#"(units: [(name: "Knight", hitpoints: 100.0)])"#, "test").unwrap();
    assert!(BattleState::new(1, catalog, MatchRules::default()).is_err());
}

// =============================================================================
// Deployment
// =============================================================================

#[test]
fn test_deploy_spends_elixir_and_delays_activity() {
    let mut battle = create_match(2).unwrap();
    let id = battle.deploy(Player::One, "Knight", Vec2::new(9.0, 10.0)).unwrap();
    assert!((battle.player(Player::One).elixir - 2.0).abs() < 1e-4);

    let knight = battle.entity(id).unwrap();
    assert_eq!(knight.archetype.as_deref(), Some("Knight"));
    assert!(!knight.deployed);

    // One second deploy time at 33 ms per tick.
    battle.advance(1.1);
    assert!(battle.entity(id).unwrap().deployed);
}

#[test]
fn test_summon_count_places_several_units() {
    let mut battle = create_match(2).unwrap();
    battle.deploy(Player::One, "Archers", Vec2::new(9.0, 10.0)).unwrap();
    assert_eq!(battle.count_alive(Player::One, "Archers"), 2);
}

#[test]
fn test_insufficient_elixir_is_rejected_without_side_effects() {
    let mut battle = create_match(3).unwrap();
    let before = battle.snapshot();
    let err = battle.deploy(Player::One, "Golem", Vec2::new(9.0, 10.0)).unwrap_err();
    assert!(matches!(err, DeploymentError::InsufficientElixir { cost: 8, .. }));
    assert_eq!(battle.snapshot(), before);
}

#[test]
fn test_troops_cannot_be_placed_in_enemy_territory() {
    let mut battle = create_match(4).unwrap();
    let err = battle.deploy(Player::One, "Knight", Vec2::new(9.0, 20.0)).unwrap_err();
    assert!(matches!(err, DeploymentError::InvalidPosition { .. }));

    let err = battle.deploy(Player::Two, "Knight", Vec2::new(9.0, 10.0)).unwrap_err();
    assert!(matches!(err, DeploymentError::InvalidPosition { .. }));

    // The river is nobody's territory.
    let err = battle.deploy(Player::One, "Knight", Vec2::new(9.0, 16.0)).unwrap_err();
    assert!(matches!(err, DeploymentError::InvalidPosition { .. }));

    assert!(battle.deploy(Player::Two, "Knight", Vec2::new(9.0, 20.0)).is_ok());
}

#[test]
fn test_spells_can_target_the_enemy_side() {
    let mut battle = create_match(5).unwrap();
    let id = battle.deploy(Player::One, "Fireball", Vec2::new(9.0, 25.0)).unwrap();
    let fireball = battle.entity(id).unwrap();
    assert_eq!(fireball.kind, EntityKind::Projectile);
    // Launched from the king tower.
    assert_eq!((fireball.x, fireball.y), (9.0, 2.5));
}

#[test]
fn test_buildings_block_placement() {
    let mut battle = create_match(6).unwrap();
    // Left princess tower.
    let err = battle.deploy(Player::One, "Knight", Vec2::new(3.5, 6.5)).unwrap_err();
    assert!(matches!(err, DeploymentError::Occupied { .. }));
}

#[test]
fn test_unknown_archetype_is_rejected() {
    let mut battle = create_match(7).unwrap();
    let err = battle.deploy(Player::One, "Dragonzilla", Vec2::new(9.0, 10.0)).unwrap_err();
    assert_eq!(err, DeploymentError::UnknownArchetype("Dragonzilla".to_string()));
}

#[test]
fn test_deployment_after_the_match_is_rejected() {
    let rules = MatchRules {
        double_elixir_at_ms: 100,
        triple_elixir_at_ms: 100,
        sudden_death_at_ms: 100,
        match_end_ms: 200,
        ..MatchRules::default()
    };
    let mut battle = BattleState::new(8, UnitCatalog::builtin().unwrap(), rules).unwrap();
    assert_eq!(battle.run_until_over(50), Some(MatchOutcome::Draw));

    let err = battle.deploy(Player::One, "Knight", Vec2::new(9.0, 10.0)).unwrap_err();
    assert_eq!(err, DeploymentError::MatchOver);

    // Stepping a finished match changes nothing.
    let tick = battle.tick();
    battle.step();
    assert_eq!(battle.tick(), tick);
}

#[test]
fn test_ids_are_never_reused() {
    let mut battle = create_match(9).unwrap();
    battle.set_elixir(Player::One, 10.0);
    let first = battle.deploy(Player::One, "Knight", Vec2::new(9.0, 10.0)).unwrap();
    assert!(battle.inflict_damage(first, 10_000.0));
    battle.step();
    assert!(battle.entity(first).is_none());

    let second = battle.deploy(Player::One, "Knight", Vec2::new(9.0, 10.0)).unwrap();
    assert!(second > first);
}

// =============================================================================
// Elixir and decks
// =============================================================================

#[test]
fn test_elixir_regenerates_and_caps() {
    let mut battle = create_match(10).unwrap();
    // 2.8 s per point in normal time.
    battle.advance(2.8);
    let elixir = battle.player(Player::One).elixir;
    assert!((elixir - 6.0).abs() < 0.05, "elixir was {}", elixir);

    battle.advance(30.0);
    assert_eq!(battle.player(Player::One).elixir, 10.0);
    assert_eq!(battle.player(Player::Two).elixir, 10.0);
    assert_eq!(battle.snapshot().elixir_phase, ElixirPhase::Normal);
}

#[test]
fn test_set_elixir_clamps_to_cap() {
    let mut battle = create_match(11).unwrap();
    battle.set_elixir(Player::Two, 25.0);
    assert_eq!(battle.player(Player::Two).elixir, 10.0);
    battle.set_elixir(Player::Two, -3.0);
    assert_eq!(battle.player(Player::Two).elixir, 0.0);
}

#[test]
fn test_deck_limits_plays_to_the_hand() {
    let mut battle = create_match(12).unwrap();
    battle.set_elixir(Player::One, 10.0);
    battle.set_deck(Player::One, cards(&DECK)).unwrap();
    assert_eq!(
        battle.snapshot().players[0].hand,
        cards(&["Knight", "Archers", "Giant", "Fireball"])
    );

    let err = battle.deploy(Player::One, "HogRider", Vec2::new(9.0, 10.0)).unwrap_err();
    assert_eq!(err, DeploymentError::NotInHand("HogRider".to_string()));

    battle.deploy(Player::One, "Knight", Vec2::new(9.0, 10.0)).unwrap();
    assert_eq!(
        battle.snapshot().players[0].hand,
        cards(&["HogRider", "Archers", "Giant", "Fireball"])
    );
    assert!(battle.deploy(Player::One, "HogRider", Vec2::new(14.5, 12.0)).is_ok());
}

#[test]
fn test_deck_with_unknown_card_is_rejected() {
    let mut battle = create_match(13).unwrap();
    let mut deck = cards(&DECK);
    deck[7] = "NotACard".to_string();
    assert!(battle.set_deck(Player::One, deck).is_err());
    assert!(battle.set_deck(Player::One, cards(&DECK[..7])).is_err());
}

// =============================================================================
// Time
// =============================================================================

#[test]
fn test_advance_carries_partial_ticks() {
    let mut battle = create_match(14).unwrap();
    assert_eq!(battle.advance(0.02), 0);
    assert_eq!(battle.advance(0.02), 1);
    assert_eq!(battle.tick(), 1);
    assert_eq!(battle.snapshot().elapsed_ms, 33);
}
