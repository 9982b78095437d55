//! Legal-move generation.
//!
//! An [`Action`] says which selected cards go to each line and which are
//! discarded. Generation dispatches on the shape of the turn:
//!
//! 1. **Fantasy**: every split of the selection into the free top / middle /
//!    bottom slots plus a discard remainder, preferring splits that repeat
//!    fantasy, sorted by royalty.
//! 2. **Three cards**: discard one, place the other two.
//! 3. **Overflow**: keep only as many cards as there are free slots.
//! 4. **Standard**: place every selected card.
//!
//! Placement is a backtracking search over lines bounded by each line's free
//! slots. Rank validity is a second pass that drops actions completing a dead
//! board, unless every candidate does.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Line, ALL_LINES};
use crate::cards::{format_cards, Card};
use crate::game_state::GameState;
use crate::royalty::{is_dead_hand, qualifies_fantasy_repeat, royalties};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub top: Vec<Card>,
    pub middle: Vec<Card>,
    pub bottom: Vec<Card>,
    #[serde(default)]
    pub discarded: Vec<Card>,
}

impl Action {
    pub fn placed(&self, line: Line) -> &[Card] {
        match line {
            Line::Top => &self.top,
            Line::Middle => &self.middle,
            Line::Bottom => &self.bottom,
        }
    }

    /// Cards placed plus cards discarded.
    pub fn card_count(&self) -> usize {
        self.top.len() + self.middle.len() + self.bottom.len() + self.discarded.len()
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.top
            .iter()
            .chain(self.middle.iter())
            .chain(self.bottom.iter())
            .chain(self.discarded.iter())
    }

    fn from_placement(placement: Placement, discarded: Vec<Card>) -> Self {
        let [top, middle, bottom] = placement;
        Action {
            top,
            middle,
            bottom,
            discarded,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "top [{}] middle [{}] bottom [{}] discard [{}]",
            format_cards(&self.top),
            format_cards(&self.middle),
            format_cards(&self.bottom),
            format_cards(&self.discarded),
        )
    }
}

/// Cards per line, in `ALL_LINES` order.
pub type Placement = [Vec<Card>; 3];

/// Free slots per line, in `ALL_LINES` order.
pub fn free_slots(board: &Board) -> [usize; 3] {
    [
        board.free_slots(Line::Top),
        board.free_slots(Line::Middle),
        board.free_slots(Line::Bottom),
    ]
}

/// The board that results from placing `action`'s cards. Does not check capacity.
pub fn board_after(board: &Board, action: &Action) -> Board {
    let mut next = board.clone();
    next.top.extend_from_slice(&action.top);
    next.middle.extend_from_slice(&action.middle);
    next.bottom.extend_from_slice(&action.bottom);
    next
}

/// Total royalty of the board `action` would produce.
pub fn action_royalty(board: &Board, action: &Action) -> i32 {
    royalties(&board_after(board, action)).total()
}

/// Every assignment of `cards` to lines that fits within `free`, ignoring
/// hand strength. No cards yields a single empty placement.
pub fn generate_placements(cards: &[Card], free: [usize; 3]) -> Vec<Placement> {
    fn backtrack(
        cards: &[Card],
        index: usize,
        free: &[usize; 3],
        current: &mut Placement,
        out: &mut Vec<Placement>,
    ) {
        if index == cards.len() {
            out.push(current.clone());
            return;
        }
        for slot in 0..ALL_LINES.len() {
            if current[slot].len() < free[slot] {
                current[slot].push(cards[index]);
                backtrack(cards, index + 1, free, current, out);
                current[slot].pop();
            }
        }
    }

    let mut out = Vec::new();
    let mut current: Placement = Default::default();
    backtrack(cards, 0, &free, &mut current, &mut out);
    out
}

fn placements_to_actions(board: &Board, cards: &[Card], discarded: &[Card]) -> Vec<Action> {
    generate_placements(cards, free_slots(board))
        .into_iter()
        .map(|p| Action::from_placement(p, discarded.to_vec()))
        .collect()
}

/// Drops actions that complete a dead board. A hand where every action is
/// dead still needs a move, so then nothing is dropped.
fn without_dead_hands(board: &Board, actions: Vec<Action>) -> Vec<Action> {
    let (alive, dead): (Vec<Action>, Vec<Action>) = actions
        .into_iter()
        .partition(|a| !is_dead_hand(&board_after(board, a)));
    if alive.is_empty() {
        dead
    } else {
        alive
    }
}

fn standard_actions(board: &Board, cards: &[Card]) -> Vec<Action> {
    placements_to_actions(board, cards, &[])
}

fn three_card_actions(board: &Board, cards: &[Card]) -> Vec<Action> {
    let mut actions = Vec::new();
    for discard_idx in 0..cards.len() {
        let remaining: Vec<Card> = cards
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != discard_idx)
            .map(|(_, c)| *c)
            .collect();
        actions.extend(placements_to_actions(board, &remaining, &[cards[discard_idx]]));
    }
    actions
}

fn overflow_actions(board: &Board, cards: &[Card], total_free: usize) -> Vec<Action> {
    let mut actions = Vec::new();
    for keep in (0..cards.len()).combinations(total_free) {
        let kept: Vec<Card> = keep.iter().map(|&i| cards[i]).collect();
        let discarded: Vec<Card> = (0..cards.len())
            .filter(|i| !keep.contains(i))
            .map(|i| cards[i])
            .collect();
        actions.extend(placements_to_actions(board, &kept, &discarded));
    }
    actions
}

/// A fantasy split with what ranking it needs.
struct FantasySplit {
    action: Action,
    royalty: i32,
    repeats: bool,
    dead: bool,
}

/// Every split of `cards` into the free slots of each line with the rest
/// discarded. Equivalent to the permutation search up to order within a line.
/// `cancel` is checked once per top/middle choice; `None` if it was raised.
fn fantasy_splits(board: &Board, cards: &[Card], cancel: &AtomicBool) -> Option<Vec<FantasySplit>> {
    let [top_free, middle_free, bottom_free] = free_slots(board);
    let pick = |idx: &[usize]| idx.iter().map(|&i| cards[i]).collect::<Vec<Card>>();
    let mut splits = Vec::new();

    let all: Vec<usize> = (0..cards.len()).collect();
    for top in all.iter().copied().combinations(top_free) {
        let after_top: Vec<usize> = all.iter().copied().filter(|i| !top.contains(i)).collect();
        for middle in after_top.iter().copied().combinations(middle_free) {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            let after_middle: Vec<usize> = after_top
                .iter()
                .copied()
                .filter(|i| !middle.contains(i))
                .collect();
            for bottom in after_middle.iter().copied().combinations(bottom_free) {
                let discarded: Vec<usize> = after_middle
                    .iter()
                    .copied()
                    .filter(|i| !bottom.contains(i))
                    .collect();
                let action = Action {
                    top: pick(&top),
                    middle: pick(&middle),
                    bottom: pick(&bottom),
                    discarded: pick(&discarded),
                };
                let next = board_after(board, &action);
                splits.push(FantasySplit {
                    royalty: royalties(&next).total(),
                    repeats: qualifies_fantasy_repeat(&next),
                    dead: is_dead_hand(&next),
                    action,
                });
            }
        }
    }
    Some(splits)
}

fn fantasy_actions(board: &Board, cards: &[Card], cancel: &AtomicBool) -> Vec<Action> {
    let Some(splits) = fantasy_splits(board, cards, cancel) else {
        log::debug!("fantasy enumeration of {} cards cancelled", cards.len());
        return Vec::new();
    };

    let (repeats, others): (Vec<FantasySplit>, Vec<FantasySplit>) =
        splits.into_iter().partition(|s| s.repeats);

    let mut pool = if !repeats.is_empty() {
        repeats
    } else if others.iter().any(|s| !s.dead) {
        others.into_iter().filter(|s| !s.dead).collect()
    } else {
        others
    };

    pool.sort_by(|a, b| b.royalty.cmp(&a.royalty));
    pool.into_iter().map(|s| s.action).collect()
}

/// Legal actions for `state`, avoiding a dead board whenever some action
/// does. Empty when the board is full or nothing is selected.
pub fn legal_actions(state: &GameState) -> Vec<Action> {
    legal_actions_cancellable(state, &AtomicBool::new(false))
}

/// Like [`legal_actions`], but a fantasy enumeration stops early and yields
/// nothing once `cancel` is raised.
pub fn legal_actions_cancellable(state: &GameState, cancel: &AtomicBool) -> Vec<Action> {
    if state.is_terminal() || state.selected.is_empty() {
        return Vec::new();
    }

    let board = &state.board;
    let cards = state.selected.cards();
    let total_free = board.total_free_slots();

    let actions = if state.settings.fantasy_mode && cards.len() >= total_free {
        fantasy_actions(board, cards, cancel)
    } else if cards.len() == 3 && total_free >= 2 {
        without_dead_hands(board, three_card_actions(board, cards))
    } else if cards.len() > total_free {
        without_dead_hands(board, overflow_actions(board, cards, total_free))
    } else {
        without_dead_hands(board, standard_actions(board, cards))
    };

    log::debug!(
        "generated {} actions for {} selected cards ({} free slots)",
        actions.len(),
        cards.len(),
        total_free
    );
    actions
}
