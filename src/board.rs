//! Line-capacity-enforced card containers: the selected hand and the
//! three-line board.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cards::{format_cards, Card};
use crate::error::{OfcError, OfcResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Line {
    Top,
    Middle,
    Bottom,
}

pub const ALL_LINES: [Line; 3] = [Line::Top, Line::Middle, Line::Bottom];

pub const TOP_CAPACITY: usize = 3;
pub const MIDDLE_CAPACITY: usize = 5;
pub const BOTTOM_CAPACITY: usize = 5;
pub const BOARD_CAPACITY: usize = TOP_CAPACITY + MIDDLE_CAPACITY + BOTTOM_CAPACITY;

impl Line {
    pub fn capacity(self) -> usize {
        match self {
            Line::Top => TOP_CAPACITY,
            Line::Middle => MIDDLE_CAPACITY,
            Line::Bottom => BOTTOM_CAPACITY,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Line::Top => "top",
            Line::Middle => "middle",
            Line::Bottom => "bottom",
        }
    }

    pub fn from_str(s: &str) -> Option<Line> {
        match s.trim().to_lowercase().as_str() {
            "top" => Some(Line::Top),
            "middle" => Some(Line::Middle),
            "bottom" => Some(Line::Bottom),
            _ => None,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cards dealt to the player but not yet placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new(cards: Vec<Card>) -> Self {
        Hand { cards }
    }

    pub fn add_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Removes the first occurrence of `card`. Returns false if it was not held.
    pub fn remove_card(&mut self, card: &Card) -> bool {
        match self.cards.iter().position(|c| c == card) {
            Some(idx) => {
                self.cards.remove(idx);
                true
            }
            None => {
                log::warn!("card {} not found in hand [{}]", card, format_cards(&self.cards));
                false
            }
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Card> {
        self.cards.iter()
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_cards(&self.cards))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub top: Vec<Card>,
    pub middle: Vec<Card>,
    pub bottom: Vec<Card>,
}

impl Board {
    pub fn new() -> Self {
        Board::default()
    }

    /// Appends `card` to `line`; fails if the line is already at capacity.
    pub fn place_card(&mut self, line: Line, card: Card) -> OfcResult<()> {
        let capacity = line.capacity();
        let cards = self.line_mut(line);
        if cards.len() >= capacity {
            return Err(OfcError::LineFull { line, capacity });
        }
        cards.push(card);
        Ok(())
    }

    pub fn place_cards(&mut self, line: Line, cards: &[Card]) -> OfcResult<()> {
        for &card in cards {
            self.place_card(line, card)?;
        }
        Ok(())
    }

    pub fn line(&self, line: Line) -> &[Card] {
        match line {
            Line::Top => &self.top,
            Line::Middle => &self.middle,
            Line::Bottom => &self.bottom,
        }
    }

    fn line_mut(&mut self, line: Line) -> &mut Vec<Card> {
        match line {
            Line::Top => &mut self.top,
            Line::Middle => &mut self.middle,
            Line::Bottom => &mut self.bottom,
        }
    }

    pub fn free_slots(&self, line: Line) -> usize {
        line.capacity().saturating_sub(self.line(line).len())
    }

    pub fn total_free_slots(&self) -> usize {
        ALL_LINES.iter().map(|&l| self.free_slots(l)).sum()
    }

    pub fn is_line_full(&self, line: Line) -> bool {
        self.line(line).len() == line.capacity()
    }

    pub fn is_full(&self) -> bool {
        ALL_LINES.iter().all(|&l| self.is_line_full(l))
    }

    pub fn card_count(&self) -> usize {
        self.top.len() + self.middle.len() + self.bottom.len()
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.top.iter().chain(self.middle.iter()).chain(self.bottom.iter())
    }

    pub fn clear(&mut self) {
        self.top.clear();
        self.middle.clear();
        self.bottom.clear();
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Top: {}", format_cards(&self.top))?;
        writeln!(f, "Middle: {}", format_cards(&self.middle))?;
        write!(f, "Bottom: {}", format_cards(&self.bottom))
    }
}
