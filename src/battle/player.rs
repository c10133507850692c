//! Per-player match state: elixir, crowns, fallen towers and the card cycle.

use std::collections::VecDeque;

use bevy::prelude::*;

use super::components::Player;
use super::constants::{DECK_SIZE, HAND_SIZE};
use super::error::ConfigurationError;

/// An eight-card deck cycling through a four-card hand.
#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    hand: Vec<String>,
    queue: VecDeque<String>,
}

impl Deck {
    pub fn new(cards: Vec<String>) -> Result<Self, ConfigurationError> {
        if cards.len() != DECK_SIZE {
            return Err(ConfigurationError::InvalidDeck(format!(
                "a deck needs exactly {} cards, got {}",
                DECK_SIZE,
                cards.len()
            )));
        }
        let mut queue: VecDeque<String> = cards.into();
        let hand = queue.drain(..HAND_SIZE).collect();
        Ok(Self { hand, queue })
    }

    pub fn hand(&self) -> &[String] {
        &self.hand
    }

    /// The card that enters the hand after the next play.
    pub fn next_card(&self) -> Option<&str> {
        self.queue.front().map(String::as_str)
    }

    pub fn in_hand(&self, card: &str) -> bool {
        self.hand.iter().any(|c| c == card)
    }

    /// Play a card from the hand. It goes to the back of the queue and the
    /// queue head takes its slot. Returns false if the card is not in hand.
    pub fn play(&mut self, card: &str) -> bool {
        let Some(slot) = self.hand.iter().position(|c| c == card) else {
            return false;
        };
        let played = self.hand.remove(slot);
        self.queue.push_back(played);
        if let Some(next) = self.queue.pop_front() {
            self.hand.insert(slot, next);
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub elixir: f32,
    pub crowns: u32,
    /// This player's princess towers that have fallen, by lane
    pub fallen_princesses: [bool; 2],
    pub king_fallen: bool,
    pub deck: Option<Deck>,
}

impl PlayerState {
    pub fn new(starting_elixir: f32) -> Self {
        Self {
            elixir: starting_elixir,
            crowns: 0,
            fallen_princesses: [false; 2],
            king_fallen: false,
            deck: None,
        }
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        self.elixir >= cost as f32
    }

    pub fn spend(&mut self, cost: u32) {
        debug_assert!(self.can_afford(cost), "spending elixir the player does not have");
        self.elixir = (self.elixir - cost as f32).max(0.0);
    }

    pub fn regenerate(&mut self, amount: f32, cap: f32) {
        self.elixir = (self.elixir + amount).clamp(0.0, cap);
    }
}

/// Both players' state, indexed by `Player`.
#[derive(Resource, Debug, Clone)]
pub struct Players {
    states: [PlayerState; 2],
}

impl Players {
    pub fn new(starting_elixir: f32) -> Self {
        Self {
            states: [PlayerState::new(starting_elixir), PlayerState::new(starting_elixir)],
        }
    }

    pub fn get(&self, player: Player) -> &PlayerState {
        &self.states[player.index()]
    }

    pub fn get_mut(&mut self, player: Player) -> &mut PlayerState {
        &mut self.states[player.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards() -> Vec<String> {
        (1..=8).map(|i| format!("Card{}", i)).collect()
    }

    #[test]
    fn test_deck_requires_eight_cards() {
        assert!(matches!(
            Deck::new(vec!["Knight".to_string()]),
            Err(ConfigurationError::InvalidDeck(_))
        ));
    }

    #[test]
    fn test_played_card_cycles_to_back() {
        let mut deck = Deck::new(cards()).unwrap();
        assert_eq!(deck.hand(), &["Card1", "Card2", "Card3", "Card4"]);
        assert_eq!(deck.next_card(), Some("Card5"));

        assert!(deck.play("Card2"));
        assert_eq!(deck.hand(), &["Card1", "Card5", "Card3", "Card4"]);
        assert!(!deck.in_hand("Card2"));
        assert!(!deck.play("Card2"));

        for card in ["Card1", "Card5", "Card3", "Card4"] {
            assert!(deck.play(card));
        }
        // Card2 has come back around after four more plays.
        assert!(deck.in_hand("Card2"));
    }

    #[test]
    fn test_elixir_is_capped() {
        let mut state = PlayerState::new(5.0);
        state.regenerate(7.5, 10.0);
        assert_eq!(state.elixir, 10.0);
        state.spend(3);
        assert_eq!(state.elixir, 7.0);
        assert!(!state.can_afford(8));
    }
}
