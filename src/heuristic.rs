//! Hand-crafted positional scorer used when the trained table has no entry
//! for a state.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::actions::Action;
use crate::board::{Line, ALL_LINES};
use crate::cards::Card;
use crate::game_state::GameState;
use crate::hand_evaluator::{
    evaluate, HIGH_CARD, INVALID_CATEGORY, TOP_ONE_PAIR, TOP_THREE_OF_A_KIND,
};
use crate::royalty::line_order_violated;

pub const DEAD_HAND_SCORE: f64 = -1000.0;
pub const ORDER_PENALTY: f64 = 100.0;

/// Candidate lists at least this long are scored on the rayon pool.
const PARALLEL_THRESHOLD: usize = 256;

/// Base points by 5-card rank class (index = class).
const MIDDLE_POINTS: [f64; 11] = [0.0, 150.0, 100.0, 80.0, 60.0, 40.0, 20.0, 10.0, 5.0, 2.0, 0.0];
const BOTTOM_POINTS: [f64; 11] = [0.0, 120.0, 80.0, 60.0, 40.0, 30.0, 15.0, 8.0, 4.0, 1.0, 0.0];

fn line_score(line: Line, cards: &[Card]) -> f64 {
    let value = evaluate(cards);
    if !value.is_valid() {
        return 0.0;
    }
    let rank = value.primary_rank() as f64;
    let category = value.category as usize;
    match line {
        Line::Top => match value.category {
            TOP_THREE_OF_A_KIND => 15.0 + rank * 0.1,
            TOP_ONE_PAIR => 5.0 + (rank - 4.0).max(0.0),
            _ => 1.0,
        },
        Line::Middle | Line::Bottom if value.category == HIGH_CARD => rank * 0.001,
        Line::Middle => MIDDLE_POINTS[category] + rank * 0.1,
        Line::Bottom => BOTTOM_POINTS[category] + rank * 0.1,
    }
}

/// True when the completed lines of a possibly partial board break the
/// ordering rule.
fn partial_order_violated(state: &GameState) -> bool {
    let class = |line: Line| {
        let cards = state.board.line(line);
        if cards.len() == line.capacity() {
            evaluate(cards).category
        } else {
            INVALID_CATEGORY
        }
    };
    let (top, middle, bottom) = (class(Line::Top), class(Line::Middle), class(Line::Bottom));
    let complete = |c: u8| c != INVALID_CATEGORY;

    match (complete(top), complete(middle), complete(bottom)) {
        (true, true, true) => line_order_violated(top, middle, bottom),
        (true, true, false) => top > middle,
        (false, true, true) => middle > bottom,
        (true, false, true) => top > bottom,
        _ => false,
    }
}

/// Scores a state: heavier weight for stronger lines, a large penalty for a
/// dead board, a smaller one for misordered complete lines.
pub fn evaluate_state(state: &GameState) -> f64 {
    if state.is_dead_hand() {
        return DEAD_HAND_SCORE;
    }
    let mut score: f64 = ALL_LINES
        .iter()
        .map(|&line| line_score(line, state.board.line(line)))
        .sum();
    if partial_order_violated(state) {
        score -= ORDER_PENALTY;
    }
    score
}

/// Applies each candidate and keeps the best-scoring one. Returns `None` if
/// `actions` is empty or `cancel` was raised before scoring finished.
pub fn best_by_heuristic(
    state: &GameState,
    actions: &[Action],
    cancel: &AtomicBool,
) -> Option<Action> {
    let score = |action: &Action| -> Option<f64> {
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        state.apply_action(action).ok().map(|next| evaluate_state(&next))
    };

    let scored: Vec<Option<f64>> = if actions.len() >= PARALLEL_THRESHOLD {
        actions.par_iter().map(score).collect()
    } else {
        actions.iter().map(score).collect()
    };

    if cancel.load(Ordering::Relaxed) {
        return None;
    }

    let mut best: Option<(f64, &Action)> = None;
    for (action, s) in actions.iter().zip(scored) {
        if let Some(s) = s {
            if best.map_or(true, |(b, _)| s > b) {
                best = Some((s, action));
            }
        }
    }
    best.map(|(_, a)| a.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::cards::parse_cards;
    use crate::config::GameSettings;

    fn state(top: &str, middle: &str, bottom: &str) -> GameState {
        GameState {
            board: Board {
                top: parse_cards(top).unwrap(),
                middle: parse_cards(middle).unwrap(),
                bottom: parse_cards(bottom).unwrap(),
            },
            ..GameState::new(GameSettings::default())
        }
    }

    #[test]
    fn dead_hand_scores_floor() {
        let s = state("2c3d4s", "5c7d9sJcKd", "2h5h8hJhKh");
        assert_eq!(evaluate_state(&s), DEAD_HAND_SCORE);
    }

    #[test]
    fn stronger_bottom_scores_higher() {
        let flush = state("", "", "2h5h8hJhKh");
        let pair = state("", "", "2h2d8hJhKh");
        assert!(evaluate_state(&flush) > evaluate_state(&pair));
    }

    #[test]
    fn misordered_partial_board_is_penalised() {
        // middle class must not exceed bottom class; a pair (9) over a flush (5) does
        let s = state("", "3c3dTsQcAd", "2h5h8hJhKh");
        assert!(partial_order_violated(&s));
        let unpenalised = line_score(Line::Middle, &s.board.middle)
            + line_score(Line::Bottom, &s.board.bottom);
        assert!(evaluate_state(&s) < unpenalised);
        let ok = state("", "2h5h8hJhKh", "3c3dTsQcAd");
        assert!(!partial_order_violated(&ok));
    }

    #[test]
    fn picks_trips_on_top() {
        let cards = parse_cards("QhQdQc").unwrap();
        let s = GameState::with_selected(GameSettings::default(), cards.clone());
        let trips_top = Action {
            top: cards.clone(),
            ..Action::default()
        };
        let spread = Action {
            top: vec![cards[0]],
            middle: vec![cards[1]],
            bottom: vec![cards[2]],
            discarded: vec![],
        };
        let cancel = AtomicBool::new(false);
        let best = best_by_heuristic(&s, &[spread, trips_top.clone()], &cancel);
        assert_eq!(best, Some(trips_top));
    }

    #[test]
    fn cancelled_search_returns_none() {
        let cards = parse_cards("QhQdQc").unwrap();
        let s = GameState::with_selected(GameSettings::default(), cards.clone());
        let a = Action {
            top: cards,
            ..Action::default()
        };
        let cancel = AtomicBool::new(true);
        assert_eq!(best_by_heuristic(&s, &[a], &cancel), None);
    }
}
