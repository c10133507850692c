//! Match Flow Systems
//!
//! Handles the overall flow of a match:
//! - Elixir regeneration and the double / triple elixir phases
//! - Sudden death after regulation time
//! - Win condition evaluation after death resolution

use std::cmp::Ordering;

use bevy::prelude::*;
use serde::Serialize;

use crate::combat::log::{CombatLog, CombatLogEventType};

use super::components::*;
use super::player::Players;
use super::rules::MatchRules;

/// Elixir regeneration rate in effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ElixirPhase {
    #[default]
    Normal,
    Double,
    Triple,
}

impl ElixirPhase {
    pub fn at(elapsed_ms: u64, rules: &MatchRules) -> Self {
        if elapsed_ms >= rules.triple_elixir_at_ms {
            ElixirPhase::Triple
        } else if elapsed_ms >= rules.double_elixir_at_ms {
            ElixirPhase::Double
        } else {
            ElixirPhase::Normal
        }
    }

    /// Milliseconds per elixir point.
    pub fn regen_ms(self, rules: &MatchRules) -> f32 {
        match self {
            ElixirPhase::Normal => rules.elixir_regen_ms,
            ElixirPhase::Double => rules.double_elixir_regen_ms,
            ElixirPhase::Triple => rules.triple_elixir_regen_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VictoryReason {
    KingTowerDestroyed,
    /// More crowns when regulation time ran out
    Crowns,
    /// First crown taken during sudden death
    SuddenDeath,
    /// Healthier weakest tower at the hard time limit
    TowerDamage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchOutcome {
    Victory { winner: Player, reason: VictoryReason },
    Draw,
}

impl MatchOutcome {
    pub fn winner(&self) -> Option<Player> {
        match self {
            MatchOutcome::Victory { winner, .. } => Some(*winner),
            MatchOutcome::Draw => None,
        }
    }
}

/// Match-level progress.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct MatchStatus {
    pub outcome: Option<MatchOutcome>,
    pub elixir_phase: ElixirPhase,
    pub sudden_death: bool,
}

impl MatchStatus {
    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }
}

/// One player's position for outcome purposes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standing {
    pub crowns: u32,
    pub king_alive: bool,
    /// Lowest hitpoints fraction among the player's standing towers
    pub weakest_tower: f32,
}

/// Decide the match, if it is decided.
pub fn judge(
    elapsed_ms: u64,
    rules: &MatchRules,
    standings: [Standing; 2],
    in_sudden_death: bool,
) -> Option<MatchOutcome> {
    let [one, two] = standings;
    let victory = |winner, reason| Some(MatchOutcome::Victory { winner, reason });
    match (one.king_alive, two.king_alive) {
        (false, false) => return Some(MatchOutcome::Draw),
        (false, true) => return victory(Player::Two, VictoryReason::KingTowerDestroyed),
        (true, false) => return victory(Player::One, VictoryReason::KingTowerDestroyed),
        (true, true) => {}
    }
    if elapsed_ms < rules.sudden_death_at_ms {
        return None;
    }

    let reason = if in_sudden_death {
        VictoryReason::SuddenDeath
    } else {
        VictoryReason::Crowns
    };
    match one.crowns.cmp(&two.crowns) {
        Ordering::Greater => return victory(Player::One, reason),
        Ordering::Less => return victory(Player::Two, reason),
        Ordering::Equal => {}
    }
    if elapsed_ms < rules.match_end_ms {
        return None;
    }

    match one.weakest_tower.total_cmp(&two.weakest_tower) {
        Ordering::Greater => victory(Player::One, VictoryReason::TowerDamage),
        Ordering::Less => victory(Player::Two, VictoryReason::TowerDamage),
        Ordering::Equal => Some(MatchOutcome::Draw),
    }
}

/// Update the elixir phase and regenerate both players' elixir.
pub fn regenerate_elixir(
    clock: Res<SimClock>,
    rules: Res<MatchRules>,
    mut status: ResMut<MatchStatus>,
    mut players: ResMut<Players>,
    mut combat_log: ResMut<CombatLog>,
) {
    let phase = ElixirPhase::at(clock.elapsed_ms, &rules);
    if phase != status.elixir_phase {
        status.elixir_phase = phase;
        let message = match phase {
            ElixirPhase::Normal => "Elixir back to normal",
            ElixirPhase::Double => "Double elixir!",
            ElixirPhase::Triple => "Triple elixir!",
        };
        info!("{} ({:.0}s)", message, clock.elapsed_secs());
        combat_log.match_time = clock.elapsed_secs();
        combat_log.log(CombatLogEventType::MatchEvent, message.to_string());
    }

    let amount = clock.dt_ms as f32 / phase.regen_ms(&rules);
    for player in Player::BOTH {
        players.get_mut(player).regenerate(amount, rules.elixir_cap);
    }
}

/// Check the win condition once deaths have been resolved.
pub fn evaluate_outcome(
    clock: Res<SimClock>,
    rules: Res<MatchRules>,
    players: Res<Players>,
    mut status: ResMut<MatchStatus>,
    mut combat_log: ResMut<CombatLog>,
    towers: Query<(&Owner, &CrownTower, &Health)>,
) {
    if status.is_over() {
        return;
    }

    let standings = Player::BOTH.map(|player| {
        let state = players.get(player);
        Standing {
            crowns: state.crowns,
            king_alive: !state.king_fallen,
            weakest_tower: towers
                .iter()
                .filter(|(owner, _, health)| owner.0 == player && health.is_alive())
                .map(|(_, _, health)| health.fraction())
                .fold(1.0, f32::min),
        }
    });

    combat_log.match_time = clock.elapsed_secs();
    match judge(clock.elapsed_ms, &rules, standings, status.sudden_death) {
        Some(outcome) => {
            status.outcome = Some(outcome);
            let message = match outcome {
                MatchOutcome::Victory { winner, reason } => format!("{} wins ({:?})", winner, reason),
                MatchOutcome::Draw => "Match ended in a draw".to_string(),
            };
            info!("{} after {:.1}s", message, clock.elapsed_secs());
            combat_log.log(CombatLogEventType::MatchEvent, message);
        }
        None if !status.sudden_death && clock.elapsed_ms >= rules.sudden_death_at_ms => {
            status.sudden_death = true;
            info!("Sudden death! Next crown wins");
            combat_log.log(
                CombatLogEventType::MatchEvent,
                "Sudden death! Next crown wins".to_string(),
            );
        }
        None => {}
    }
}
