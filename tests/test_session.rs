use std::io::Cursor;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};

use ofc_solver::cards::{parse_cards, Deck};
use ofc_solver::checkpoint::MemoryStore;
use ofc_solver::config::{AgentKind, GameSettings};
use ofc_solver::session::{MoveReply, Session, StateDelta};

fn random_settings() -> GameSettings {
    GameSettings {
        ai_type: AgentKind::Random,
        ai_time: 30,
        ..GameSettings::default()
    }
}

fn session(settings: GameSettings) -> Session {
    Session::new(settings, Box::new(MemoryStore::new())).unwrap()
}

/// Feeds `lines` through `serve` and returns the parsed replies.
fn exchange(session: &mut Session, lines: &[Value]) -> Vec<Value> {
    let input: String = lines.iter().map(|l| format!("{}\n", l)).collect();
    let mut reader = Cursor::new(input.into_bytes());
    let mut output: Vec<u8> = Vec::new();
    session.serve(&mut reader, &mut output).unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

#[test]
fn test_update_then_snapshot() {
    let mut s = session(random_settings());
    let replies = exchange(
        &mut s,
        &[
            json!({
                "command": "update_state",
                "board": {
                    "top": [{"rank": "A", "suit": "♥"}, null, null],
                    "middle": [null, null, null, null, null],
                    "bottom": [{"rank": "10", "suit": "♠"}, null, null, null, null]
                },
                "selected_cards": [{"rank": "K", "suit": "♦"}]
            }),
            json!({ "command": "game_state" }),
        ],
    );

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["status"], "success");
    let view = &replies[1];
    assert_eq!(view["board"]["top"][0], json!({"rank": "A", "suit": "♥"}));
    assert_eq!(view["board"]["bottom"][0], json!({"rank": "10", "suit": "♠"}));
    assert_eq!(view["selected_cards"][0], json!({"rank": "K", "suit": "♦"}));
    assert_eq!(view["ai_settings"]["aiType"], "random");
}

#[test]
fn test_duplicate_update_reports_error() {
    let mut s = session(random_settings());
    let card = json!({"rank": "Q", "suit": "♣"});
    let replies = exchange(
        &mut s,
        &[json!({
            "command": "update_state",
            "selected_cards": [card.clone()],
            "discarded_cards": [card]
        })],
    );
    assert_eq!(replies[0]["status"], "error");
    assert!(s.state.selected.is_empty());
}

#[test]
fn test_malformed_line_does_not_end_session() {
    let mut s = session(random_settings());
    let input = "not json\n{\"command\":\"training_progress\"}\n";
    let mut reader = Cursor::new(input.as_bytes().to_vec());
    let mut output: Vec<u8> = Vec::new();
    s.serve(&mut reader, &mut output).unwrap();

    let replies: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["status"], "error");
    assert_eq!(replies[1]["progress"], 0.0);
}

#[test]
fn test_reset_training_needs_mccfr() {
    let mut s = session(random_settings());
    let replies = exchange(&mut s, &[json!({ "command": "reset_training" })]);
    assert_eq!(replies[0]["status"], "error");

    let mut s = session(GameSettings::default());
    let replies = exchange(&mut s, &[json!({ "command": "reset_training" })]);
    assert_eq!(replies[0]["status"], "success");
}

#[test]
fn test_ai_move_over_the_wire() {
    let mut s = session(random_settings());
    let replies = exchange(
        &mut s,
        &[
            json!({
                "command": "update_state",
                "selected_cards": [
                    {"rank": "A", "suit": "♥"},
                    {"rank": "K", "suit": "♥"},
                    {"rank": "Q", "suit": "♥"},
                    {"rank": "J", "suit": "♥"},
                    {"rank": "10", "suit": "♥"}
                ]
            }),
            json!({ "command": "ai_move" }),
        ],
    );
    let reply = &replies[1];
    assert_eq!(reply["status"], "move");
    assert_eq!(reply["game_over"], false);
    let mv = &reply["move"];
    let placed = ["top", "middle", "bottom"]
        .iter()
        .map(|line| mv[*line].as_array().map_or(0, |a| a.len()))
        .sum::<usize>();
    assert_eq!(placed, 5);
    assert_eq!(s.state.board.card_count(), 5);
}

#[test]
fn test_reset_game_clears_board() {
    let mut s = session(random_settings());
    s.apply_delta(StateDelta {
        selected_cards: Some(parse_cards("AhKh").unwrap()),
        ..StateDelta::default()
    })
    .unwrap();
    let replies = exchange(&mut s, &[json!({ "command": "reset_game" })]);
    assert_eq!(replies[0]["status"], "success");
    assert!(s.state.selected.is_empty());
    assert_eq!(s.state.board.card_count(), 0);
}

// ---------------------------------------------------------------------------
// Full hand
// ---------------------------------------------------------------------------

#[test]
fn test_random_agent_plays_a_hand() {
    let mut s = session(random_settings());
    let mut rng = StdRng::seed_from_u64(77);
    let deck = Deck::shuffled(&mut rng);
    let mut cursor = 0;
    let mut deal = 5;

    let mut finished = false;
    for _ in 0..5 {
        let cards = deck.cards[cursor..cursor + deal].to_vec();
        cursor += deal;
        deal = 3;
        s.apply_delta(StateDelta {
            selected_cards: Some(cards),
            ..StateDelta::default()
        })
        .unwrap();

        match s.request_move() {
            MoveReply::Move {
                royalties,
                total_royalty,
                game_over,
                ..
            } => {
                if game_over {
                    let royalties = royalties.unwrap();
                    assert_eq!(total_royalty, royalties.total());
                    finished = true;
                    break;
                }
                assert!(royalties.is_none());
            }
            // A street with only dead placements is still playable, but a
            // state without any action ends the hand early.
            MoveReply::NoMove => break,
            MoveReply::Error { error, .. } => panic!("unexpected error: {}", error),
        }
    }

    if finished {
        assert!(s.state.is_terminal());
        assert_eq!(s.state.board.card_count(), 13);
        assert_eq!(s.state.discarded.len(), 4);
    }
    s.state.validate().unwrap();
}
