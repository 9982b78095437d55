//! Per-line royalties, dead-hand detection and fantasy qualification.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Line};
use crate::cards::{Card, Rank};
use crate::error::{OfcError, OfcResult};
use crate::hand_evaluator::{
    evaluate, FLUSH, FOUR_OF_A_KIND, FULL_HOUSE, ROYAL_FLUSH, STRAIGHT, STRAIGHT_FLUSH,
    THREE_OF_A_KIND, TOP_ONE_PAIR, TOP_THREE_OF_A_KIND,
};

/// Pairs below this rank index (sixes) earn nothing on top.
const TOP_PAIR_THRESHOLD: u8 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Royalties {
    pub top: i32,
    pub middle: i32,
    pub bottom: i32,
}

impl Royalties {
    pub fn total(&self) -> i32 {
        self.top + self.middle + self.bottom
    }

    pub fn get(&self, line: Line) -> i32 {
        match line {
            Line::Top => self.top,
            Line::Middle => self.middle,
            Line::Bottom => self.bottom,
        }
    }
}

fn five_card_base(category: u8) -> i32 {
    match category {
        ROYAL_FLUSH => 50,
        STRAIGHT_FLUSH => 30,
        FOUR_OF_A_KIND => 20,
        FULL_HOUSE => 12,
        FLUSH => 8,
        STRAIGHT => 4,
        THREE_OF_A_KIND => 2,
        _ => 0,
    }
}

/// Royalty for one line, ignoring whether the board as a whole is dead.
pub fn line_royalty(line: Line, cards: &[Card]) -> i32 {
    if cards.len() != line.capacity() {
        return 0;
    }
    let value = evaluate(cards);
    match line {
        Line::Top => match value.category {
            TOP_THREE_OF_A_KIND => 10 + value.primary_rank() as i32,
            TOP_ONE_PAIR if value.primary_rank() >= TOP_PAIR_THRESHOLD => {
                (value.primary_rank() - TOP_PAIR_THRESHOLD) as i32
            }
            _ => 0,
        },
        Line::Middle => {
            let base = five_card_base(value.category);
            if value.category <= THREE_OF_A_KIND {
                base * 2
            } else {
                base
            }
        }
        Line::Bottom => five_card_base(value.category),
    }
}

/// Per-line royalties as if the board were not dead.
pub fn raw_royalties(board: &Board) -> Royalties {
    Royalties {
        top: line_royalty(Line::Top, &board.top),
        middle: line_royalty(Line::Middle, &board.middle),
        bottom: line_royalty(Line::Bottom, &board.bottom),
    }
}

/// Per-line royalties; a dead board scores zero everywhere.
pub fn royalties(board: &Board) -> Royalties {
    if is_dead_hand(board) {
        return Royalties::default();
    }
    raw_royalties(board)
}

/// The line-ordering rule on rank classes (lower class = stronger hand).
pub fn line_order_violated(top: u8, middle: u8, bottom: u8) -> bool {
    top > middle || middle > bottom
}

/// A full board whose line classes break the ordering rule. Never true for a
/// board that still has free slots.
pub fn is_dead_hand(board: &Board) -> bool {
    if !board.is_full() {
        return false;
    }
    let top = evaluate(&board.top).category;
    let middle = evaluate(&board.middle).category;
    let bottom = evaluate(&board.bottom).category;
    line_order_violated(top, middle, bottom)
}

/// Top is pair-or-better with its lowest card a queen or higher, and the board
/// is not dead.
pub fn qualifies_fantasy_entry(board: &Board) -> bool {
    if is_dead_hand(board) || board.top.len() != Line::Top.capacity() {
        return false;
    }
    let top = evaluate(&board.top);
    let lowest = board.top.iter().map(|c| c.rank).min();
    top.category <= TOP_ONE_PAIR && matches!(lowest, Some(r) if r >= Rank::Queen)
}

/// Trips on top or quads-or-better on bottom, and the board is not dead.
pub fn qualifies_fantasy_repeat(board: &Board) -> bool {
    if is_dead_hand(board) {
        return false;
    }
    let top = evaluate(&board.top).category;
    let bottom = evaluate(&board.bottom).category;
    top == TOP_THREE_OF_A_KIND || bottom <= FOUR_OF_A_KIND
}

/// Final score of a completed board. A dead board pays the negation of what
/// its lines would have earned.
pub fn payoff(board: &Board) -> OfcResult<f64> {
    if !board.is_full() {
        return Err(OfcError::NotTerminal);
    }
    let raw = raw_royalties(board).total() as f64;
    if is_dead_hand(board) {
        Ok(-raw)
    } else {
        Ok(raw)
    }
}
