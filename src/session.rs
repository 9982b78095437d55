//! Front-end session: the live game state, its settings and the agent,
//! owned by one value and passed to every request.
//!
//! The wire protocol is line-delimited JSON. Each request line carries a
//! `command` tag; each reply is one JSON object on its own line.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::actions::Action;
use crate::agent::{select_move_within, Agent, MoveOutcome};
use crate::board::{Board, Hand, Line};
use crate::cards::Card;
use crate::checkpoint::CheckpointStore;
use crate::config::GameSettings;
use crate::error::{OfcError, OfcResult};
use crate::game_state::GameState;
use crate::royalty::Royalties;

/// Board lines as sent by the front-end. Empty slots arrive as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardDelta {
    pub top: Vec<Option<Card>>,
    pub middle: Vec<Option<Card>>,
    pub bottom: Vec<Option<Card>>,
}

/// Partial update of the live state. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateDelta {
    pub board: Option<BoardDelta>,
    pub selected_cards: Option<Vec<Card>>,
    pub discarded_cards: Option<Vec<Card>>,
    /// Moved from the selection to the discard pile.
    pub removed_cards: Option<Vec<Card>>,
    pub ai_settings: Option<GameSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    pub selected_cards: Vec<Card>,
    pub board: Board,
    pub discarded_cards: Vec<Card>,
    pub ai_settings: GameSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MoveReply {
    Move {
        #[serde(rename = "move")]
        action: Action,
        /// Present once the move fills the board.
        royalties: Option<Royalties>,
        total_royalty: i32,
        game_over: bool,
    },
    NoMove,
    Error {
        error: String,
        timeout: bool,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    UpdateState {
        #[serde(flatten)]
        delta: StateDelta,
    },
    AiMove,
    TrainingProgress,
    ResetTraining,
    ResetGame,
    GameState,
}

pub struct Session {
    pub state: GameState,
    pub settings: GameSettings,
    pub agent: Agent,
    store: Box<dyn CheckpointStore>,
}

impl Session {
    /// Builds a session, restoring trained progress from `store` when the
    /// agent is MCCFR.
    pub fn new(settings: GameSettings, store: Box<dyn CheckpointStore>) -> OfcResult<Self> {
        let agent = Agent::load(&settings, store.as_ref())?;
        Ok(Session {
            state: GameState::new(settings),
            settings,
            agent,
            store,
        })
    }

    /// Applies a front-end delta. Nothing changes if the result would hold
    /// a card twice or overfill a line.
    pub fn apply_delta(&mut self, delta: StateDelta) -> OfcResult<()> {
        let mut next = self.state.clone();
        let settings = delta.ai_settings.filter(|s| *s != self.settings);
        if let Some(settings) = settings {
            next.settings = settings;
        }

        if let Some(board) = delta.board {
            let mut fresh = Board::new();
            for (line, cards) in [
                (Line::Top, board.top),
                (Line::Middle, board.middle),
                (Line::Bottom, board.bottom),
            ] {
                for card in cards.into_iter().flatten() {
                    fresh.place_card(line, card)?;
                }
            }
            next.board = fresh;
        }

        if let Some(selected) = delta.selected_cards {
            next.selected = Hand::new(selected);
        }

        if let Some(discarded) = delta.discarded_cards {
            next.discarded = discarded;
        }

        if let Some(removed) = delta.removed_cards {
            for card in &removed {
                if !next.discarded.contains(card) {
                    next.discarded.push(*card);
                }
                next.selected.remove_card(card);
            }
        }

        next.validate()?;

        if let Some(settings) = settings {
            log::info!("agent settings changed, re-initialising {}", settings.ai_type.as_str());
            self.agent = Agent::load(&settings, self.store.as_ref())?;
            self.settings = settings;
        }
        self.state = next;
        Ok(())
    }

    /// Asks the agent for a move within the configured deadline and applies
    /// it. A filled board reports its royalties.
    pub fn request_move(&mut self) -> MoveReply {
        let timeout = self.settings.move_timeout();
        let action = match select_move_within(&self.agent, &self.state, timeout) {
            MoveOutcome::Move(action) => action,
            MoveOutcome::NoMove => return MoveReply::NoMove,
            MoveOutcome::Timeout => {
                let err = OfcError::MoveTimeout {
                    timeout_ms: timeout.as_millis(),
                };
                return MoveReply::Error {
                    error: err.to_string(),
                    timeout: true,
                };
            }
        };

        let next = match self.state.apply_action(&action) {
            Ok(next) => next,
            Err(e) => {
                log::error!("agent move does not apply: {}", e);
                return MoveReply::Error {
                    error: e.to_string(),
                    timeout: false,
                };
            }
        };
        self.state = next;

        if !self.state.is_terminal() {
            return MoveReply::Move {
                action,
                royalties: None,
                total_royalty: 0,
                game_over: false,
            };
        }

        let royalties = self.state.royalties();
        log::info!("hand complete, royalties {:?} total {}", royalties, royalties.total());
        MoveReply::Move {
            action,
            royalties: Some(royalties),
            total_royalty: royalties.total(),
            game_over: true,
        }
    }

    /// Training progress in [0, 1]; 0 for an agent that does not train.
    pub fn training_progress(&self) -> f64 {
        self.agent.trainer().map_or(0.0, |t| t.progress())
    }

    /// Clears the node table and starts a fresh game.
    pub fn reset_training(&mut self) -> OfcResult<()> {
        match self.agent.trainer_mut() {
            Some(trainer) => trainer.reset(),
            None => {
                return Err(OfcError::InvalidValue(
                    "cannot reset training: agent is not mccfr".to_string(),
                ))
            }
        }
        self.reset_game();
        Ok(())
    }

    pub fn reset_game(&mut self) {
        self.state = GameState::new(self.settings);
        log::info!("game state reset");
    }

    pub fn snapshot(&self) -> GameView {
        GameView {
            selected_cards: self.state.selected.cards().to_vec(),
            board: self.state.board.clone(),
            discarded_cards: self.state.discarded.clone(),
            ai_settings: self.settings,
        }
    }

    // -----------------------------------------------------------------------
    // Protocol
    // -----------------------------------------------------------------------

    pub fn handle_request(&mut self, request: Request) -> Value {
        match request {
            Request::UpdateState { delta } => match self.apply_delta(delta) {
                Ok(()) => json!({ "status": "success" }),
                Err(e) => json!({ "status": "error", "error": e.to_string() }),
            },
            Request::AiMove => {
                serde_json::to_value(self.request_move()).unwrap_or_else(|e| error_value(&e.to_string()))
            }
            Request::TrainingProgress => json!({ "progress": self.training_progress() }),
            Request::ResetTraining => match self.reset_training() {
                Ok(()) => json!({ "status": "success" }),
                Err(e) => error_value(&e.to_string()),
            },
            Request::ResetGame => {
                self.reset_game();
                json!({ "status": "success" })
            }
            Request::GameState => {
                serde_json::to_value(self.snapshot()).unwrap_or_else(|e| error_value(&e.to_string()))
            }
        }
    }

    /// Serves requests line by line until `reader` is exhausted. Malformed
    /// lines get an error reply and do not end the session.
    pub fn serve(&mut self, reader: &mut dyn BufRead, writer: &mut dyn Write) -> OfcResult<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let reply = match serde_json::from_str::<Request>(trimmed) {
                Ok(request) => self.handle_request(request),
                Err(e) => {
                    log::warn!("bad request: {}", e);
                    error_value(&format!("bad request: {}", e))
                }
            };
            writeln!(writer, "{}", reply)?;
            writer.flush()?;
        }
    }
}

fn error_value(message: &str) -> Value {
    json!({ "status": "error", "error": message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_cards;
    use crate::checkpoint::MemoryStore;
    use crate::config::AgentKind;

    fn session() -> Session {
        Session::new(GameSettings::default(), Box::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn removed_cards_move_to_discard() {
        let mut s = session();
        let cards = parse_cards("AhKdQc").unwrap();
        s.apply_delta(StateDelta {
            selected_cards: Some(cards.clone()),
            ..StateDelta::default()
        })
        .unwrap();
        s.apply_delta(StateDelta {
            removed_cards: Some(vec![cards[1]]),
            ..StateDelta::default()
        })
        .unwrap();
        assert_eq!(s.state.selected.cards(), &[cards[0], cards[2]]);
        assert_eq!(s.state.discarded, vec![cards[1]]);
    }

    #[test]
    fn duplicate_delta_is_rejected_whole() {
        let mut s = session();
        let cards = parse_cards("AhKd").unwrap();
        let result = s.apply_delta(StateDelta {
            selected_cards: Some(cards.clone()),
            discarded_cards: Some(vec![cards[0]]),
            ..StateDelta::default()
        });
        assert!(matches!(result, Err(OfcError::DuplicateCard(_))));
        assert!(s.state.selected.is_empty());
    }

    #[test]
    fn changed_settings_swap_agent() {
        let mut s = session();
        let settings = GameSettings {
            ai_type: AgentKind::Random,
            ..GameSettings::default()
        };
        s.apply_delta(StateDelta {
            ai_settings: Some(settings),
            ..StateDelta::default()
        })
        .unwrap();
        assert_eq!(s.agent.kind(), AgentKind::Random);
        assert!(s.reset_training().is_err());
    }

    #[test]
    fn rejected_delta_keeps_settings_and_agent() {
        let mut s = session();
        let settings = GameSettings {
            ai_type: AgentKind::Random,
            fantasy_mode: true,
            ..GameSettings::default()
        };
        let slots = |text: &str| -> Vec<Option<Card>> {
            parse_cards(text).unwrap().into_iter().map(Some).collect()
        };
        let result = s.apply_delta(StateDelta {
            board: Some(BoardDelta {
                top: slots("AhKdQcJs"),
                ..BoardDelta::default()
            }),
            ai_settings: Some(settings),
            ..StateDelta::default()
        });

        assert!(matches!(result, Err(OfcError::LineFull { .. })));
        assert_eq!(s.agent.kind(), AgentKind::Mccfr);
        assert_eq!(s.settings, GameSettings::default());
        assert!(!s.state.settings.fantasy_mode);
        assert_eq!(s.state.board.card_count(), 0);
    }

    #[test]
    fn finished_hand_leaves_checkpoint_untouched() {
        let mut s = session();
        s.apply_delta(StateDelta {
            board: Some(BoardDelta {
                top: parse_cards("QhQdKc").unwrap().into_iter().map(Some).collect(),
                middle: parse_cards("5c5d9sJcAd").unwrap().into_iter().map(Some).collect(),
                bottom: parse_cards("2h4d7s8c").unwrap().into_iter().map(Some).collect(),
            }),
            selected_cards: Some(parse_cards("Th").unwrap()),
            ..StateDelta::default()
        })
        .unwrap();

        match s.request_move() {
            MoveReply::Move { game_over, .. } => assert!(game_over),
            other => panic!("expected a move, got {:?}", other),
        }
        assert!(s.store.read().unwrap().is_none());
    }
}
