use ofc_solver::cards::*;
use ofc_solver::hand_evaluator::*;

fn hand(notation: &str) -> Vec<Card> {
    parse_cards(notation).unwrap()
}

#[test]
fn test_royal_flush() {
    let v = evaluate(&hand("AsKsQsJsTs"));
    assert_eq!(v.category, ROYAL_FLUSH);
    assert_eq!(v.kind, HandKind::RoyalFlush);
}

#[test]
fn test_wheel_straight_flush() {
    for suit in ["h", "d", "c", "s"] {
        let cards = hand(&format!("A{s}2{s}3{s}4{s}5{s}", s = suit));
        assert_eq!(category(&cards), STRAIGHT_FLUSH);
    }
}

#[test]
fn test_wheel_is_lowest_straight() {
    let wheel = evaluate(&hand("Ah2d3c4s5h"));
    let six_high = evaluate(&hand("2d3c4s5h6d"));
    assert_eq!(wheel.category, STRAIGHT);
    assert!(six_high > wheel);
}

#[test]
fn test_five_card_categories() {
    let cases = [
        ("9h8h7h6h5h", STRAIGHT_FLUSH),
        ("KsKhKdKc5s", FOUR_OF_A_KIND),
        ("AsAhAdKsKh", FULL_HOUSE),
        ("Ah9h7h4h2h", FLUSH),
        ("9c8d7h6s5c", STRAIGHT),
        ("QsQhQd7c2s", THREE_OF_A_KIND),
        ("JsJh4d4c9s", TWO_PAIR),
        ("TsTh8d4c2s", ONE_PAIR),
        ("AsJh8d4c2s", HIGH_CARD),
    ];
    for (cards, expected) in cases {
        assert_eq!(category(&hand(cards)), expected, "{}", cards);
    }
}

#[test]
fn test_three_card_categories() {
    assert_eq!(category(&hand("7h7d7c")), TOP_THREE_OF_A_KIND);
    assert_eq!(category(&hand("QhQd2c")), TOP_ONE_PAIR);
    assert_eq!(category(&hand("AhKd2c")), TOP_HIGH_CARD);
    // no straights or flushes on three cards
    assert_eq!(category(&hand("QhKhAh")), TOP_HIGH_CARD);
}

#[test]
fn test_invalid_lengths() {
    for cards in [hand(""), hand("Ah"), hand("AhKh"), hand("AhKhQhJh")] {
        let v = evaluate(&cards);
        assert_eq!(v.category, INVALID_CATEGORY);
        assert_eq!(v.tiebreak, 0.0);
    }
}

#[test]
fn test_category_is_order_invariant() {
    let hands = ["AsAhAdKsKh", "9c8d7h6s5c", "Ah2d3c4s5h", "JsJh4d4c9s", "Ah9h7h4h2h"];
    for h in hands {
        let cards = hand(h);
        let base = evaluate(&cards);
        let mut rotated = cards.clone();
        for _ in 0..cards.len() {
            rotated.rotate_left(1);
            let v = evaluate(&rotated);
            assert_eq!(v.category, base.category);
            assert_eq!(v.tiebreak, base.tiebreak);
        }
        let mut reversed = cards.clone();
        reversed.reverse();
        assert_eq!(evaluate(&reversed), base);
    }
}

// ---------------------------------------------------------------------------
// Tie-breaks within a category
// ---------------------------------------------------------------------------

#[test]
fn test_pair_kicker_ordering() {
    let aces_king = evaluate(&hand("AsAh Kd 4c 2s"));
    let aces_queen = evaluate(&hand("AdAc Qd 4h 2h"));
    let kings = evaluate(&hand("KsKh Ad Qc Js"));
    assert!(aces_king > aces_queen);
    assert!(aces_queen > kings);
}

#[test]
fn test_two_pair_ordering() {
    let high = evaluate(&hand("KsKh2d2c3s"));
    let low = evaluate(&hand("QsQhJdJc3h"));
    assert!(high > low);
}

#[test]
fn test_full_house_trips_dominate() {
    let threes_full = evaluate(&hand("3s3h3dAcAs"));
    let twos_full = evaluate(&hand("2s2h2dKcKs"));
    assert!(threes_full > twos_full);
}

#[test]
fn test_lower_category_is_stronger() {
    let flush = evaluate(&hand("2h5h8hJhKh"));
    let straight = evaluate(&hand("TcJdQhKsAc"));
    assert!(flush > straight);
}
