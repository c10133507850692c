//! Integration tests for headless match execution
//!
//! These tests verify that:
//! - Headless matches run to completion
//! - Match results are accessible programmatically
//! - Seeded RNG produces deterministic results
//! - Bad scripted plays are skipped without stopping the match

use lanesim::headless::config::{ScriptedAbility, ScriptedDeployment};
use lanesim::headless::{run_headless_match, HeadlessMatchConfig};

/// Helper to create a basic match config
fn create_config(seed: Option<u64>, deployments: Vec<ScriptedDeployment>) -> HeadlessMatchConfig {
    HeadlessMatchConfig {
        random_seed: seed,
        max_duration_secs: 20.0, // Short duration for tests
        deployments,
        ..HeadlessMatchConfig::default()
    }
}

fn play(time_secs: f32, player: u8, card: &str, x: f32, y: f32) -> ScriptedDeployment {
    ScriptedDeployment {
        time_secs,
        player,
        card: card.to_string(),
        x,
        y,
    }
}

#[test]
fn test_empty_match_times_out_with_towers_intact() {
    let result = run_headless_match(create_config(Some(1), vec![])).unwrap();

    assert_eq!(result.winner, None);
    assert_eq!(result.outcome, None);
    assert_eq!(result.random_seed, 1);
    assert_eq!(result.crowns, [0, 0]);
    assert_eq!(result.towers.len(), 6);
    assert!(result.towers.iter().all(|t| !t.destroyed && t.final_hitpoints == t.max_hitpoints));
    assert!(result.match_time >= 20.0 && result.match_time < 20.1);
}

#[test]
fn test_seeded_matches_are_deterministic() {
    let deployments = vec![
        play(1.0, 1, "Knight", 3.5, 12.0),
        play(2.0, 2, "GoblinHut", 9.0, 24.0),
        play(6.0, 1, "Archers", 14.5, 10.0),
        play(9.0, 2, "SkeletonArmy", 3.5, 20.0),
    ];
    let first = run_headless_match(create_config(Some(777), deployments.clone())).unwrap();
    let second = run_headless_match(create_config(Some(777), deployments)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unseeded_match_reports_its_seed() {
    let result = run_headless_match(create_config(None, vec![])).unwrap();
    let replay = run_headless_match(create_config(Some(result.random_seed), vec![])).unwrap();
    assert_eq!(result.ticks, replay.ticks);
}

#[test]
fn test_rejected_plays_are_counted_and_skipped() {
    let deployments = vec![
        // Enemy territory.
        play(1.0, 1, "Knight", 9.0, 24.0),
        // Not a card.
        play(1.0, 2, "Dragonzilla", 9.0, 24.0),
        // Eight elixir with five in the bank.
        play(1.5, 2, "Golem", 9.0, 24.0),
        play(2.0, 1, "Knight", 9.0, 10.0),
    ];
    let result = run_headless_match(create_config(Some(5), deployments)).unwrap();
    assert_eq!(result.rejected_deployments, 3);
}

#[test]
fn test_invalid_config_is_an_error() {
    let config = HeadlessMatchConfig {
        max_duration_secs: 0.0,
        ..HeadlessMatchConfig::default()
    };
    assert!(run_headless_match(config).is_err());

    let mut config = create_config(Some(1), vec![play(1.0, 1, "Knight", 9.0, 10.0)]);
    config.abilities.push(ScriptedAbility {
        time_secs: 2.0,
        deployment: 4,
    });
    assert!(run_headless_match(config).is_err());
}

#[test]
fn test_deck_with_wrong_size_is_rejected() {
    let config = HeadlessMatchConfig {
        player1_deck: Some(vec!["Knight".to_string(); 3]),
        ..HeadlessMatchConfig::default()
    };
    let err = run_headless_match(config).unwrap_err();
    assert!(err.contains("exactly 8 cards"));
}

/// The king has no souls yet, so the activation is refused and logged
/// while the match carries on.
#[test]
fn test_refused_scripted_ability_does_not_abort_match() {
    let mut config = create_config(Some(3), vec![play(1.0, 1, "SkeletonKing", 9.0, 10.0)]);
    config.abilities.push(ScriptedAbility {
        time_secs: 3.0,
        deployment: 0,
    });
    config.max_duration_secs = 4.0;
    let result = run_headless_match(config).unwrap();
    assert_eq!(result.rejected_deployments, 0);
}

#[test]
fn test_sample_script_parses_and_runs() {
    let config =
        HeadlessMatchConfig::load_from_file(std::path::Path::new("assets/scripts/sample_match.json"))
            .unwrap();
    assert_eq!(config.random_seed, Some(42));
    let config = HeadlessMatchConfig {
        max_duration_secs: 50.0,
        ..config
    };
    let result = run_headless_match(config).unwrap();
    assert_eq!(result.rejected_deployments, 0);
    assert!(result.towers.iter().any(|t| t.final_hitpoints < t.max_hitpoints));
}
