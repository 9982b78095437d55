use thiserror::Error;

use crate::board::Line;
use crate::cards::Card;

#[derive(Error, Debug)]
pub enum OfcError {
    #[error("Invalid rank: {0}")]
    InvalidRank(String),

    #[error("Invalid suit: {0}")]
    InvalidSuit(String),

    #[error("Invalid card notation: {0}")]
    InvalidCardNotation(String),

    #[error("Invalid card index: rank {rank}, suit {suit}")]
    InvalidCardIndex { rank: usize, suit: usize },

    #[error("{line} line is full (capacity {capacity})")]
    LineFull { line: Line, capacity: usize },

    #[error("Card {0} appears more than once")]
    DuplicateCard(Card),

    #[error("Game is not in a terminal state")]
    NotTerminal,

    #[error("Cannot deal {requested} cards, only {available} remaining")]
    NotEnoughDeck { requested: usize, available: usize },

    #[error("AI move timed out after {timeout_ms} ms")]
    MoveTimeout { timeout_ms: u128 },

    #[error("Checkpoint is unreadable: {0}")]
    CheckpointDecode(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type OfcResult<T> = Result<T, OfcError>;
