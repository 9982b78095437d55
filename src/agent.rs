//! Move selection: the trained agent, the random baseline and the
//! deadline-bounded wrapper both run behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::actions::{legal_actions_cancellable, Action};
use crate::checkpoint::CheckpointStore;
use crate::config::{AgentKind, GameSettings};
use crate::error::OfcResult;
use crate::game_state::GameState;
use crate::heuristic::best_by_heuristic;
use crate::trainer::Trainer;

#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    Move(Action),
    NoMove,
    Timeout,
}

/// Uniform choice among legal actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomAgent;

impl RandomAgent {
    pub fn choose<R: Rng + ?Sized>(&self, actions: &[Action], rng: &mut R) -> Option<Action> {
        actions.choose(rng).cloned()
    }
}

pub enum Agent {
    Mccfr(Trainer),
    Random(RandomAgent),
}

impl Agent {
    /// A fresh, untrained agent of the kind named in `settings`.
    pub fn from_settings(settings: &GameSettings) -> Self {
        match settings.ai_type {
            AgentKind::Mccfr => Agent::Mccfr(Trainer::with_settings(settings.trainer_config(), *settings)),
            AgentKind::Random => Agent::Random(RandomAgent),
        }
    }

    /// Like [`Agent::from_settings`], restoring trained progress from
    /// `store` for the MCCFR agent.
    pub fn load(settings: &GameSettings, store: &dyn CheckpointStore) -> OfcResult<Self> {
        let mut agent = Agent::from_settings(settings);
        if let Some(trainer) = agent.trainer_mut() {
            trainer.load(store)?;
        }
        Ok(agent)
    }

    pub fn kind(&self) -> AgentKind {
        match self {
            Agent::Mccfr(_) => AgentKind::Mccfr,
            Agent::Random(_) => AgentKind::Random,
        }
    }

    pub fn trainer(&self) -> Option<&Trainer> {
        match self {
            Agent::Mccfr(t) => Some(t),
            Agent::Random(_) => None,
        }
    }

    pub fn trainer_mut(&mut self) -> Option<&mut Trainer> {
        match self {
            Agent::Mccfr(t) => Some(t),
            Agent::Random(_) => None,
        }
    }

    /// Picks a move for `state`. The trained agent plays its most probable
    /// average-strategy action and falls back to the heuristic scorer for
    /// information sets it has never visited. `cancel` is checked while
    /// enumerating fantasy splits and between scored candidates; a cancelled
    /// search reports [`MoveOutcome::Timeout`].
    pub fn select_move(&self, state: &GameState, cancel: &AtomicBool) -> MoveOutcome {
        let actions = legal_actions_cancellable(state, cancel);
        if cancel.load(Ordering::Relaxed) {
            return MoveOutcome::Timeout;
        }
        if actions.is_empty() {
            log::debug!("no legal actions for {}", state.information_set());
            return MoveOutcome::NoMove;
        }

        let chosen = match self {
            Agent::Random(agent) => agent.choose(&actions, &mut rand::thread_rng()),
            Agent::Mccfr(trainer) => match trainer.best_action(state) {
                Some(action) => Some(action),
                None => {
                    log::debug!(
                        "unseen information set, scoring {} actions heuristically",
                        actions.len()
                    );
                    best_by_heuristic(state, &actions, cancel)
                }
            },
        };

        match chosen {
            Some(action) => MoveOutcome::Move(action),
            None if cancel.load(Ordering::Relaxed) => MoveOutcome::Timeout,
            None => MoveOutcome::NoMove,
        }
    }
}

/// Runs [`Agent::select_move`] on a worker thread and waits at most
/// `timeout`. Past the deadline the worker is told to stop, joined, and the
/// call reports a timeout; a late result is discarded.
pub fn select_move_within(agent: &Agent, state: &GameState, timeout: Duration) -> MoveOutcome {
    let cancel = AtomicBool::new(false);

    thread::scope(|scope| {
        let (tx, rx) = mpsc::channel();
        let cancel = &cancel;
        let worker = scope.spawn(move || {
            let outcome = agent.select_move(state, cancel);
            // The receiver is gone if the deadline already passed.
            let _ = tx.send(outcome);
        });

        let outcome = match rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("move computation exceeded {} ms, cancelling", timeout.as_millis());
                cancel.store(true, Ordering::Relaxed);
                MoveOutcome::Timeout
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::error!("move worker exited without a result");
                MoveOutcome::NoMove
            }
        };

        if worker.join().is_err() {
            log::error!("move worker panicked");
        }
        outcome
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::cards::parse_cards;
    use crate::config::TrainerConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn terminal_state_has_no_move() {
        let state = GameState {
            board: Board {
                top: parse_cards("2c3d4s").unwrap(),
                middle: parse_cards("5c5d9sJcKd").unwrap(),
                bottom: parse_cards("AhAdAc7h8h").unwrap(),
            },
            ..GameState::default()
        };
        let agent = Agent::Random(RandomAgent);
        let cancel = AtomicBool::new(false);
        assert_eq!(agent.select_move(&state, &cancel), MoveOutcome::NoMove);
    }

    #[test]
    fn random_choice_is_legal() {
        let state = GameState::with_selected(GameSettings::default(), parse_cards("AhKhQh").unwrap());
        let actions = state.legal_actions();
        let mut rng = StdRng::seed_from_u64(11);
        let chosen = RandomAgent.choose(&actions, &mut rng).unwrap();
        assert!(actions.contains(&chosen));
    }

    #[test]
    fn untrained_agent_falls_back_to_heuristic() {
        let state = GameState::with_selected(GameSettings::default(), parse_cards("AhKhQh").unwrap());
        let agent = Agent::Mccfr(Trainer::new(TrainerConfig::default()));
        let outcome = select_move_within(&agent, &state, Duration::from_secs(30));
        match outcome {
            MoveOutcome::Move(action) => assert!(state.legal_actions().contains(&action)),
            other => panic!("expected a move, got {:?}", other),
        }
    }

    #[test]
    fn fantasy_enumeration_respects_deadline() {
        let settings = GameSettings {
            fantasy_mode: true,
            ..GameSettings::default()
        };
        let cards = parse_cards("2h3h4h5h6h7h8h9hThJhQhKhAh2d").unwrap();
        let state = GameState::with_selected(settings, cards);
        let agent = Agent::Mccfr(Trainer::new(TrainerConfig::default()));

        let started = std::time::Instant::now();
        let outcome = select_move_within(&agent, &state, Duration::from_millis(50));
        assert!(matches!(outcome, MoveOutcome::Timeout | MoveOutcome::Move(_)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn raised_flag_reports_timeout() {
        let state = GameState::with_selected(GameSettings::default(), parse_cards("AhKhQh").unwrap());
        let cancel = AtomicBool::new(true);
        assert_eq!(Agent::Random(RandomAgent).select_move(&state, &cancel), MoveOutcome::Timeout);
    }

    #[test]
    fn zero_deadline_times_out_or_finishes() {
        let state = GameState::with_selected(GameSettings::default(), parse_cards("AhKhQh").unwrap());
        let agent = Agent::Random(RandomAgent);
        let outcome = select_move_within(&agent, &state, Duration::ZERO);
        assert!(matches!(outcome, MoveOutcome::Move(_) | MoveOutcome::Timeout));
    }
}
