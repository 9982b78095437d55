use std::cmp::Ordering;
use std::fmt;

use crate::cards::Card;

/// Descriptive hand class. The numeric rank class used for line comparisons
/// lives on [`HandValue::category`], because 3-card and 5-card hands number
/// their classes differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandKind {
    RoyalFlush,
    StraightFlush,
    FourOfAKind,
    FullHouse,
    Flush,
    Straight,
    ThreeOfAKind,
    TwoPair,
    OnePair,
    HighCard,
    Invalid,
}

impl fmt::Display for HandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandKind::RoyalFlush => write!(f, "Royal Flush"),
            HandKind::StraightFlush => write!(f, "Straight Flush"),
            HandKind::FourOfAKind => write!(f, "Four of a Kind"),
            HandKind::FullHouse => write!(f, "Full House"),
            HandKind::Flush => write!(f, "Flush"),
            HandKind::Straight => write!(f, "Straight"),
            HandKind::ThreeOfAKind => write!(f, "Three of a Kind"),
            HandKind::TwoPair => write!(f, "Two Pair"),
            HandKind::OnePair => write!(f, "One Pair"),
            HandKind::HighCard => write!(f, "High Card"),
            HandKind::Invalid => write!(f, "Incomplete"),
        }
    }
}

// 5-card rank classes (lower = stronger)
pub const ROYAL_FLUSH: u8 = 1;
pub const STRAIGHT_FLUSH: u8 = 2;
pub const FOUR_OF_A_KIND: u8 = 3;
pub const FULL_HOUSE: u8 = 4;
pub const FLUSH: u8 = 5;
pub const STRAIGHT: u8 = 6;
pub const THREE_OF_A_KIND: u8 = 7;
pub const TWO_PAIR: u8 = 8;
pub const ONE_PAIR: u8 = 9;
pub const HIGH_CARD: u8 = 10;

// 3-card rank classes
pub const TOP_THREE_OF_A_KIND: u8 = 7;
pub const TOP_ONE_PAIR: u8 = 8;
pub const TOP_HIGH_CARD: u8 = 9;

/// Returned for empty or wrong-length input.
pub const INVALID_CATEGORY: u8 = 11;

#[derive(Debug, Clone)]
pub struct HandValue {
    /// Rank class, lower is stronger.
    pub category: u8,
    pub kind: HandKind,
    /// Orders hands within one category only; higher is stronger.
    pub tiebreak: f64,
    /// Rank indices that decide ties, most significant first.
    pub kickers: Vec<u8>,
}

impl HandValue {
    fn new(category: u8, kind: HandKind, kickers: Vec<u8>) -> Self {
        let tiebreak = kickers.iter().fold(0.0, |acc, &k| acc * 13.0 + k as f64);
        HandValue {
            category,
            kind,
            tiebreak,
            kickers,
        }
    }

    pub fn invalid() -> Self {
        HandValue {
            category: INVALID_CATEGORY,
            kind: HandKind::Invalid,
            tiebreak: 0.0,
            kickers: Vec::new(),
        }
    }

    /// Rank index of the defining card (the trips, the pair, the top card...).
    pub fn primary_rank(&self) -> u8 {
        self.kickers.first().copied().unwrap_or(0)
    }

    pub fn is_valid(&self) -> bool {
        self.category != INVALID_CATEGORY
    }
}

impl fmt::Display for HandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl PartialEq for HandValue {
    fn eq(&self, other: &Self) -> bool {
        self.category == other.category && self.tiebreak == other.tiebreak
    }
}

impl Eq for HandValue {}

impl PartialOrd for HandValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// `Greater` means stronger.
impl Ord for HandValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.category.cmp(&self.category) {
            Ordering::Equal => self.tiebreak.total_cmp(&other.tiebreak),
            ord => ord,
        }
    }
}

fn is_flush(cards: &[Card]) -> bool {
    cards.windows(2).all(|w| w[0].suit == w[1].suit)
}

/// High-card rank index of a 5-card straight. The wheel plays five-high.
fn straight_high(sorted_asc: &[u8]) -> Option<u8> {
    if sorted_asc == [0, 1, 2, 3, 12] {
        return Some(3);
    }
    if sorted_asc.windows(2).all(|w| w[1] == w[0] + 1) {
        return sorted_asc.last().copied();
    }
    None
}

fn rank_counts(cards: &[Card]) -> [u8; 13] {
    let mut counts = [0u8; 13];
    for c in cards {
        counts[c.rank.index()] += 1;
    }
    counts
}

/// (count, rank) groups, largest group first, then highest rank.
fn groups(counts: &[u8; 13]) -> Vec<(u8, u8)> {
    let mut freq: Vec<(u8, u8)> = (0..13u8)
        .rev()
        .filter(|&r| counts[r as usize] > 0)
        .map(|r| (counts[r as usize], r))
        .collect();
    freq.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
    freq
}

fn evaluate_five(cards: &[Card]) -> HandValue {
    let mut values: Vec<u8> = cards.iter().map(|c| c.rank.index() as u8).collect();
    values.sort_unstable();
    let flush = is_flush(cards);
    let straight = straight_high(&values);
    values.reverse();

    if flush {
        if let Some(high) = straight {
            if high == 12 {
                return HandValue::new(ROYAL_FLUSH, HandKind::RoyalFlush, vec![high]);
            }
            return HandValue::new(STRAIGHT_FLUSH, HandKind::StraightFlush, vec![high]);
        }
    }

    let freq = groups(&rank_counts(cards));
    let kickers: Vec<u8> = freq.iter().map(|&(_, r)| r).collect();

    match (freq[0].0, freq.get(1).map(|g| g.0)) {
        (4, _) => HandValue::new(FOUR_OF_A_KIND, HandKind::FourOfAKind, kickers),
        (3, Some(2)) => HandValue::new(FULL_HOUSE, HandKind::FullHouse, kickers),
        _ if flush => HandValue::new(FLUSH, HandKind::Flush, values),
        _ if straight.is_some() => {
            let high = straight.unwrap_or_default();
            HandValue::new(STRAIGHT, HandKind::Straight, vec![high])
        }
        (3, _) => HandValue::new(THREE_OF_A_KIND, HandKind::ThreeOfAKind, kickers),
        (2, Some(2)) => HandValue::new(TWO_PAIR, HandKind::TwoPair, kickers),
        (2, _) => HandValue::new(ONE_PAIR, HandKind::OnePair, kickers),
        _ => HandValue::new(HIGH_CARD, HandKind::HighCard, values),
    }
}

fn evaluate_three(cards: &[Card]) -> HandValue {
    let freq = groups(&rank_counts(cards));
    let kickers: Vec<u8> = freq.iter().map(|&(_, r)| r).collect();
    match freq[0].0 {
        3 => HandValue::new(TOP_THREE_OF_A_KIND, HandKind::ThreeOfAKind, kickers),
        2 => HandValue::new(TOP_ONE_PAIR, HandKind::OnePair, kickers),
        _ => HandValue::new(TOP_HIGH_CARD, HandKind::HighCard, kickers),
    }
}

/// Evaluates an exactly-3 or exactly-5 card hand. Any other length yields
/// the invalid category with a zero tiebreak.
pub fn evaluate(cards: &[Card]) -> HandValue {
    match cards.len() {
        5 => evaluate_five(cards),
        3 => evaluate_three(cards),
        _ => HandValue::invalid(),
    }
}

/// Shortcut for callers that only need the rank class.
pub fn category(cards: &[Card]) -> u8 {
    evaluate(cards).category
}
