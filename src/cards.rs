use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{OfcError, OfcResult};

/// Rank symbols in ascending order, as the front-end spells them.
pub const RANK_SYMBOLS: [&str; 13] = [
    "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K", "A",
];
/// Suit symbols in index order.
pub const SUIT_SYMBOLS: [&str; 4] = ["\u{2665}", "\u{2666}", "\u{2663}", "\u{2660}"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Two = 0,
    Three = 1,
    Four = 2,
    Five = 3,
    Six = 4,
    Seven = 5,
    Eight = 6,
    Nine = 7,
    Ten = 8,
    Jack = 9,
    Queen = 10,
    King = 11,
    Ace = 12,
}

impl Rank {
    pub fn from_index(index: usize) -> Option<Rank> {
        ALL_RANKS.get(index).copied()
    }

    /// Accepts the front-end symbols ("10", "J", ...) and the one-char form ("T").
    pub fn from_symbol(s: &str) -> OfcResult<Rank> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("t") {
            return Ok(Rank::Ten);
        }
        RANK_SYMBOLS
            .iter()
            .position(|sym| sym.eq_ignore_ascii_case(s))
            .and_then(Rank::from_index)
            .ok_or_else(|| OfcError::InvalidRank(s.to_string()))
    }

    pub fn from_char(c: char) -> OfcResult<Rank> {
        match c.to_ascii_uppercase() {
            '2' => Ok(Rank::Two),
            '3' => Ok(Rank::Three),
            '4' => Ok(Rank::Four),
            '5' => Ok(Rank::Five),
            '6' => Ok(Rank::Six),
            '7' => Ok(Rank::Seven),
            '8' => Ok(Rank::Eight),
            '9' => Ok(Rank::Nine),
            'T' => Ok(Rank::Ten),
            'J' => Ok(Rank::Jack),
            'Q' => Ok(Rank::Queen),
            'K' => Ok(Rank::King),
            'A' => Ok(Rank::Ace),
            _ => Err(OfcError::InvalidRank(c.to_string())),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }

    pub fn symbol(self) -> &'static str {
        RANK_SYMBOLS[self.index()]
    }

    /// Position in the ascending rank order (2 = 0, A = 12).
    pub fn index(self) -> usize {
        self as usize
    }
}

pub const ALL_RANKS: [Rank; 13] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
    Rank::Ace,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Hearts = 0,
    Diamonds = 1,
    Clubs = 2,
    Spades = 3,
}

impl Suit {
    pub fn from_index(index: usize) -> Option<Suit> {
        ALL_SUITS.get(index).copied()
    }

    /// Accepts the symbol form ("♥") and the letter form ("h").
    pub fn from_symbol(s: &str) -> OfcResult<Suit> {
        let s = s.trim();
        if let Some(idx) = SUIT_SYMBOLS.iter().position(|sym| *sym == s) {
            return Ok(ALL_SUITS[idx]);
        }
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Suit::from_char(c),
            _ => Err(OfcError::InvalidSuit(s.to_string())),
        }
    }

    pub fn from_char(c: char) -> OfcResult<Suit> {
        match c.to_ascii_lowercase() {
            'h' | '\u{2665}' => Ok(Suit::Hearts),
            'd' | '\u{2666}' => Ok(Suit::Diamonds),
            'c' | '\u{2663}' => Ok(Suit::Clubs),
            's' | '\u{2660}' => Ok(Suit::Spades),
            _ => Err(OfcError::InvalidSuit(c.to_string())),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Suit::Hearts => 'h',
            Suit::Diamonds => 'd',
            Suit::Clubs => 'c',
            Suit::Spades => 's',
        }
    }

    pub fn symbol(self) -> &'static str {
        SUIT_SYMBOLS[self.index()]
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

pub const ALL_SUITS: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

/// Wire form of a card: `{"rank": "10", "suit": "♥"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDto {
    pub rank: String,
    pub suit: String,
}

impl CardDto {
    pub fn to_card(&self) -> OfcResult<Card> {
        Card::from_symbols(&self.rank, &self.suit)
    }
}

/// Ordered rank-then-suit, which is the order used for canonical keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "CardDto", into = "CardDto")]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }

    pub fn from_symbols(rank: &str, suit: &str) -> OfcResult<Card> {
        Ok(Card::new(Rank::from_symbol(rank)?, Suit::from_symbol(suit)?))
    }

    pub fn from_numeric(rank: usize, suit: usize) -> OfcResult<Card> {
        match (Rank::from_index(rank), Suit::from_index(suit)) {
            (Some(r), Some(s)) => Ok(Card::new(r, s)),
            _ => Err(OfcError::InvalidCardIndex { rank, suit }),
        }
    }

    pub fn to_numeric(self) -> (usize, usize) {
        (self.rank.index(), self.suit.index())
    }

    pub fn to_dto(self) -> CardDto {
        CardDto {
            rank: self.rank.symbol().to_string(),
            suit: self.suit.symbol().to_string(),
        }
    }

    /// Two-character ASCII form, e.g. `Th`.
    pub fn short(&self) -> String {
        format!("{}{}", self.rank.to_char(), self.suit.to_char())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.symbol(), self.suit.symbol())
    }
}

impl From<Card> for CardDto {
    fn from(card: Card) -> CardDto {
        card.to_dto()
    }
}

impl TryFrom<CardDto> for Card {
    type Error = OfcError;

    fn try_from(dto: CardDto) -> OfcResult<Card> {
        dto.to_card()
    }
}

/// The canonical 52-card deck, rank-major then suit.
pub static FULL_DECK: Lazy<Vec<Card>> = Lazy::new(|| {
    ALL_RANKS
        .iter()
        .flat_map(|&r| ALL_SUITS.iter().map(move |&s| Card::new(r, s)))
        .collect()
});

pub struct Deck {
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn new(exclude: Option<&[Card]>) -> Deck {
        let excluded: HashSet<Card> = exclude
            .map(|e| e.iter().copied().collect())
            .unwrap_or_default();
        let cards = FULL_DECK
            .iter()
            .filter(|c| !excluded.contains(c))
            .copied()
            .collect();
        Deck { cards }
    }

    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Deck {
        let mut deck = Deck::new(None);
        deck.cards.shuffle(rng);
        deck
    }

    pub fn deal(&mut self, n: usize) -> OfcResult<Vec<Card>> {
        if n > self.cards.len() {
            return Err(OfcError::NotEnoughDeck {
                requested: n,
                available: self.cards.len(),
            });
        }
        let dealt: Vec<Card> = self.cards.drain(..n).collect();
        Ok(dealt)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Parses a single card in either ASCII (`Th`, `10h`) or symbol (`10♥`) form.
pub fn parse_card(notation: &str) -> OfcResult<Card> {
    let notation = notation.trim();
    let mut chars: Vec<char> = notation.chars().collect();
    if chars.len() < 2 || chars.len() > 3 {
        return Err(OfcError::InvalidCardNotation(notation.to_string()));
    }
    let suit = match chars.pop() {
        Some(c) => Suit::from_char(c)?,
        None => return Err(OfcError::InvalidCardNotation(notation.to_string())),
    };
    let rank_str: String = chars.into_iter().collect();
    let rank = Rank::from_symbol(&rank_str)
        .map_err(|_| OfcError::InvalidCardNotation(notation.to_string()))?;
    Ok(Card::new(rank, suit))
}

/// Parses a run of cards such as `"AsKd Qh,10c"`.
pub fn parse_cards(notation: &str) -> OfcResult<Vec<Card>> {
    let compact: Vec<char> = notation
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    let mut cards = Vec::new();
    let mut start = 0;
    while start < compact.len() {
        // "10x" is the only three-character card
        let len = if compact[start] == '1' { 3 } else { 2 };
        if start + len > compact.len() {
            let rest: String = compact[start..].iter().collect();
            return Err(OfcError::InvalidCardNotation(rest));
        }
        let s: String = compact[start..start + len].iter().collect();
        cards.push(parse_card(&s)?);
        start += len;
    }
    Ok(cards)
}

pub fn format_cards(cards: &[Card]) -> String {
    cards
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
