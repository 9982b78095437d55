//! The searchable unit: selected cards, board, discard pile and settings.
//!
//! Transitions are functional: [`GameState::apply_action`] returns a new
//! state and leaves the receiver untouched, so sibling branches of a search
//! never share mutable data.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::actions::{legal_actions, Action};
use crate::board::{Board, Hand, Line};
use crate::cards::{Card, FULL_DECK};
use crate::config::GameSettings;
use crate::error::{OfcError, OfcResult};
use crate::royalty::{self, Royalties};

/// Cards dealt on the first street.
pub const INITIAL_DEAL: usize = 5;
/// Cards dealt on every later street.
pub const STREET_DEAL: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub selected: Hand,
    pub board: Board,
    pub discarded: Vec<Card>,
    pub settings: GameSettings,
}

impl GameState {
    pub fn new(settings: GameSettings) -> Self {
        GameState {
            settings,
            ..GameState::default()
        }
    }

    pub fn with_selected(settings: GameSettings, cards: Vec<Card>) -> Self {
        GameState {
            selected: Hand::new(cards),
            settings,
            ..GameState::default()
        }
    }

    /// Self-play has a single decision maker.
    pub fn current_player(&self) -> usize {
        0
    }

    pub fn is_terminal(&self) -> bool {
        self.board.is_full()
    }

    pub fn legal_actions(&self) -> Vec<Action> {
        legal_actions(self)
    }

    /// Every card on the board, in the discard pile or selected.
    pub fn seen_cards(&self) -> impl Iterator<Item = &Card> {
        self.board
            .cards()
            .chain(self.discarded.iter())
            .chain(self.selected.iter())
    }

    /// Cards of the canonical deck not yet seen in this state.
    pub fn available_cards(&self) -> Vec<Card> {
        let used: HashSet<&Card> = self.seen_cards().collect();
        FULL_DECK.iter().filter(|c| !used.contains(c)).copied().collect()
    }

    /// Checks that no card appears twice across board, discards and selection.
    pub fn validate(&self) -> OfcResult<()> {
        let mut seen = HashSet::new();
        for card in self.seen_cards() {
            if !seen.insert(*card) {
                return Err(OfcError::DuplicateCard(*card));
            }
        }
        Ok(())
    }

    /// Applies `action` and returns the successor; the selection is emptied.
    pub fn apply_action(&self, action: &Action) -> OfcResult<GameState> {
        let mut board = self.board.clone();
        board.place_cards(Line::Top, &action.top)?;
        board.place_cards(Line::Middle, &action.middle)?;
        board.place_cards(Line::Bottom, &action.bottom)?;

        let mut discarded = self.discarded.clone();
        discarded.extend_from_slice(&action.discarded);

        Ok(GameState {
            selected: Hand::default(),
            board,
            discarded,
            settings: self.settings,
        })
    }

    /// Returns a copy holding `cards` as the new selection.
    pub fn deal(&self, cards: &[Card]) -> GameState {
        let mut next = self.clone();
        for &card in cards {
            next.selected.add_card(card);
        }
        next
    }

    /// Canonical observable-state key. The unseen deck is not part of it.
    pub fn information_set(&self) -> String {
        fn part(cards: &[Card]) -> String {
            let mut sorted = cards.to_vec();
            sorted.sort();
            sorted
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(",")
        }

        format!(
            "T:{}|M:{}|B:{}|D:{}|S:{}",
            part(&self.board.top),
            part(&self.board.middle),
            part(&self.board.bottom),
            part(&self.discarded),
            part(self.selected.cards()),
        )
    }

    pub fn is_dead_hand(&self) -> bool {
        royalty::is_dead_hand(&self.board)
    }

    pub fn royalties(&self) -> Royalties {
        royalty::royalties(&self.board)
    }

    /// Terminal score; fails on a board with free slots.
    pub fn payoff(&self) -> OfcResult<f64> {
        royalty::payoff(&self.board)
    }

    /// Cards to deal for the fantasy hand this finished hand earns, if any.
    /// A hand played in fantasy must meet the repeat rule, any other hand the
    /// entry rule.
    pub fn next_fantasy_deal(&self) -> Option<usize> {
        if !self.is_terminal() {
            return None;
        }
        let earned = if self.settings.fantasy_mode {
            royalty::qualifies_fantasy_repeat(&self.board)
        } else {
            royalty::qualifies_fantasy_entry(&self.board)
        };
        earned.then(|| self.settings.fantasy_type.cards_dealt(&self.board.top))
    }

    pub fn action_royalty(&self, action: &Action) -> i32 {
        crate::actions::action_royalty(&self.board, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_cards;
    use crate::config::FantasyType;

    #[test]
    fn apply_action_is_functional() {
        let cards = parse_cards("AhKhQh").unwrap();
        let state = GameState::with_selected(GameSettings::default(), cards.clone());
        let action = Action {
            top: vec![cards[0]],
            middle: vec![cards[1]],
            bottom: vec![],
            discarded: vec![cards[2]],
        };
        let next = state.apply_action(&action).unwrap();
        assert_eq!(state.selected.len(), 3);
        assert!(state.board.top.is_empty());
        assert!(next.selected.is_empty());
        assert_eq!(next.board.top, vec![cards[0]]);
        assert_eq!(next.discarded, vec![cards[2]]);
    }

    #[test]
    fn apply_action_over_capacity_fails() {
        let cards = parse_cards("2h3h4h5h").unwrap();
        let state = GameState::with_selected(GameSettings::default(), cards.clone());
        let action = Action {
            top: cards.clone(),
            ..Action::default()
        };
        assert!(matches!(
            state.apply_action(&action),
            Err(OfcError::LineFull { .. })
        ));
    }

    #[test]
    fn information_set_ignores_order() {
        let a = GameState::with_selected(GameSettings::default(), parse_cards("AhKd2c").unwrap());
        let b = GameState::with_selected(GameSettings::default(), parse_cards("2cAhKd").unwrap());
        assert_eq!(a.information_set(), b.information_set());
        assert_eq!(a.information_set(), "T:|M:|B:|D:|S:2\u{2663},K\u{2666},A\u{2665}");
    }

    #[test]
    fn available_cards_excludes_seen() {
        let mut state = GameState::with_selected(GameSettings::default(), parse_cards("AhKd").unwrap());
        state.discarded.push(parse_cards("2c").unwrap()[0]);
        assert_eq!(state.available_cards().len(), 49);
    }

    #[test]
    fn validate_rejects_duplicates() {
        let mut state = GameState::with_selected(GameSettings::default(), parse_cards("AhKd").unwrap());
        state.discarded.push(parse_cards("Ah").unwrap()[0]);
        assert!(matches!(state.validate(), Err(OfcError::DuplicateCard(_))));
    }

    fn finished(top: &str, settings: GameSettings) -> GameState {
        GameState {
            board: Board {
                top: parse_cards(top).unwrap(),
                middle: parse_cards("5c5d9sJcAd").unwrap(),
                bottom: parse_cards("2h4d7s8cTh").unwrap(),
            },
            ..GameState::new(settings)
        }
    }

    #[test]
    fn fantasy_entry_deals_by_type() {
        let progressive = GameSettings {
            fantasy_type: FantasyType::Progressive,
            ..GameSettings::default()
        };
        assert_eq!(finished("KhKdAc", GameSettings::default()).next_fantasy_deal(), Some(14));
        assert_eq!(finished("KhKdAc", progressive).next_fantasy_deal(), Some(15));
        assert_eq!(finished("JhJdAc", progressive).next_fantasy_deal(), None);
    }

    #[test]
    fn fantasy_hand_must_repeat() {
        let in_fantasy = GameSettings {
            fantasy_mode: true,
            fantasy_type: FantasyType::Progressive,
            ..GameSettings::default()
        };
        assert_eq!(finished("KhKdAc", in_fantasy).next_fantasy_deal(), None);
        assert_eq!(finished("QhQdQc", in_fantasy).next_fantasy_deal(), Some(17));
    }

    #[test]
    fn unfinished_hand_earns_nothing() {
        let state = GameState::with_selected(GameSettings::default(), parse_cards("QhQdQc").unwrap());
        assert_eq!(state.next_fantasy_deal(), None);
    }
}
