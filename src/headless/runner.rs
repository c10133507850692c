//! Headless match execution
//!
//! Replays a match script against a fresh `BattleState` and reports the
//! result. Rejected deployments are logged and skipped; the match goes on.

use std::path::Path;

use bevy::prelude::*;
use serde::Serialize;

use crate::battle::components::{EntityId, Player, TowerRole};
use crate::battle::match_flow::MatchOutcome;
use crate::battle::rules::MatchRules;
use crate::battle::unit_config::UnitCatalog;
use crate::battle::BattleState;
use crate::combat::log::MatchMetadata;

use super::config::{HeadlessMatchConfig, ScriptedAbility, ScriptedDeployment};

/// Result of a completed headless match
///
/// This struct provides programmatic access to match results for testing and analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// The winning player (1 or 2), or None for a draw or timeout
    pub winner: Option<u8>,
    /// How the match was decided, None if it ran into `max_duration_secs`
    pub outcome: Option<MatchOutcome>,
    /// Match duration in seconds of simulated time
    pub match_time: f32,
    pub ticks: u64,
    /// Crowns taken by player 1 and player 2
    pub crowns: [u32; 2],
    pub towers: Vec<TowerResult>,
    /// Scripted deployments the battle refused
    pub rejected_deployments: usize,
    /// Random seed used
    pub random_seed: u64,
}

/// State of one crown tower at match end
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TowerResult {
    pub owner: u8,
    pub role: TowerRole,
    pub max_hitpoints: f32,
    /// 0 once destroyed
    pub final_hitpoints: f32,
    pub destroyed: bool,
}

/// Run a headless match with the given configuration
pub fn run_headless_match(config: HeadlessMatchConfig) -> Result<MatchResult, String> {
    config.validate()?;

    let catalog = match &config.units_path {
        Some(path) => UnitCatalog::load(Path::new(path)),
        None => UnitCatalog::builtin(),
    }
    .map_err(|e| e.to_string())?;
    let rules = match &config.rules_path {
        Some(path) => MatchRules::load(Path::new(path)).map_err(|e| e.to_string())?,
        None => MatchRules::default(),
    };
    let seed = match config.random_seed {
        Some(seed) => {
            info!("Using deterministic RNG with seed: {}", seed);
            seed
        }
        None => {
            let seed = rand::random::<u64>();
            info!("No seed provided, drew seed {}", seed);
            seed
        }
    };

    let mut battle = BattleState::new(seed, catalog, rules).map_err(|e| e.to_string())?;
    for (player, deck) in [(Player::One, &config.player1_deck), (Player::Two, &config.player2_deck)] {
        if let Some(cards) = deck {
            battle
                .set_deck(player, cards.clone())
                .map_err(|e| e.to_string())?;
        }
    }

    let towers: Vec<(EntityId, Player, TowerRole, f32)> = battle
        .entities()
        .into_iter()
        .filter_map(|e| Some((e.id, e.owner, e.tower?, e.max_hitpoints?)))
        .collect();

    // Stable sort keeps script order for simultaneous plays.
    let mut deployments: Vec<(usize, &ScriptedDeployment)> = config.deployments.iter().enumerate().collect();
    deployments.sort_by(|a, b| a.1.time_secs.total_cmp(&b.1.time_secs));
    let mut abilities: Vec<&ScriptedAbility> = config.abilities.iter().collect();
    abilities.sort_by(|a, b| a.time_secs.total_cmp(&b.time_secs));

    let mut placed: Vec<Option<EntityId>> = vec![None; config.deployments.len()];
    let mut next_deployment = 0;
    let mut next_ability = 0;
    let mut rejected = 0;
    let max_ticks = (config.max_duration_secs * 1000.0 / battle.rules().tick_ms as f32).ceil() as u64;

    while battle.tick() < max_ticks && !battle.is_over() {
        let now = battle.elapsed_secs();
        while let Some((index, deployment)) = deployments.get(next_deployment) {
            if deployment.time_secs > now {
                break;
            }
            next_deployment += 1;
            let Some(player) = Player::from_number(deployment.player) else {
                continue;
            };
            let position = Vec2::new(deployment.x, deployment.y);
            match battle.deploy(player, &deployment.card, position) {
                Ok(id) => placed[*index] = Some(id),
                Err(e) => {
                    warn!("{} could not deploy {}: {}", player, deployment.card, e);
                    rejected += 1;
                }
            }
        }
        while let Some(ability) = abilities.get(next_ability) {
            if ability.time_secs > now {
                break;
            }
            next_ability += 1;
            match placed.get(ability.deployment).copied().flatten() {
                Some(id) => {
                    if let Err(e) = battle.activate_ability(id) {
                        warn!("Ability on {} failed: {}", id, e);
                    }
                }
                None => warn!(
                    "Ability skipped: deployment {} placed nothing",
                    ability.deployment
                ),
            }
        }
        battle.step();
    }

    let outcome = battle.outcome();
    match outcome {
        Some(MatchOutcome::Victory { winner, reason }) => {
            info!("Match ended! {} wins ({:?})", winner, reason)
        }
        Some(MatchOutcome::Draw) => info!("Match ended in a DRAW"),
        None => info!(
            "Match timed out after {:.1}s - declaring DRAW",
            battle.elapsed_secs()
        ),
    }

    let towers = towers
        .into_iter()
        .map(|(id, owner, role, max_hitpoints)| {
            let final_hitpoints = battle
                .entity(id)
                .filter(|e| e.alive)
                .and_then(|e| e.hitpoints)
                .unwrap_or(0.0);
            TowerResult {
                owner: owner.number(),
                role,
                max_hitpoints,
                final_hitpoints,
                destroyed: final_hitpoints <= 0.0,
            }
        })
        .collect();

    let result = MatchResult {
        winner: outcome.and_then(|o| o.winner()).map(Player::number),
        outcome,
        match_time: battle.elapsed_secs(),
        ticks: battle.tick(),
        crowns: Player::BOTH.map(|p| battle.player(p).crowns),
        towers,
        rejected_deployments: rejected,
        random_seed: seed,
    };

    if let Some(path) = &config.output_path {
        let metadata = MatchMetadata {
            random_seed: seed,
            winner: result.winner,
            crowns: result.crowns,
            duration_secs: result.match_time,
        };
        match battle.combat_log().save_to_file(&metadata, Path::new(path)) {
            Ok(filename) => println!("Match complete. Log saved to: {}", filename),
            Err(e) => eprintln!("Failed to save combat log: {}", e),
        }
    }

    Ok(result)
}
