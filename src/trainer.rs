//! Monte-Carlo CFR self-play trainer.
//!
//! Each iteration samples a full shuffle and walks the decision tree from a
//! five-card root. Streets are dealt from the same shuffle in Pineapple order
//! (5, then 3 per street) whenever an applied action leaves a non-terminal
//! board with nothing selected.
//!
//! The walk follows vanilla CFR: regret matching at every information set,
//! negated child utilities, regrets weighted by the opposing reach. With
//! `branch_limit = Some(k)` a node with more than `k` actions traverses a
//! uniform sample of `k` of them; node utility is then the strategy-weighted
//! mean over the sample and only sampled actions receive regret.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::seq::index::sample;
use rand::Rng;

use crate::actions::Action;
use crate::cards::{Card, Deck};
use crate::cfr::CfrNode;
use crate::checkpoint::{Checkpoint, CheckpointStore, CHECKPOINT_VERSION};
use crate::config::{GameSettings, TrainerConfig};
use crate::error::OfcResult;
use crate::game_state::{GameState, INITIAL_DEAL, STREET_DEAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerStatus {
    Untrained,
    Training,
    Converged,
    Exhausted,
    Interrupted,
}

impl fmt::Display for TrainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrainerStatus::Untrained => "untrained",
            TrainerStatus::Training => "training",
            TrainerStatus::Converged => "converged",
            TrainerStatus::Exhausted => "exhausted",
            TrainerStatus::Interrupted => "interrupted",
        };
        write!(f, "{}", s)
    }
}

pub struct Trainer {
    config: TrainerConfig,
    settings: GameSettings,
    nodes: HashMap<String, CfrNode>,
    current_iteration: usize,
    status: TrainerStatus,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Trainer {
            config,
            settings: GameSettings::default(),
            nodes: HashMap::new(),
            current_iteration: 0,
            status: TrainerStatus::Untrained,
        }
    }

    /// Trainer whose root states carry `settings`.
    pub fn with_settings(config: TrainerConfig, settings: GameSettings) -> Self {
        Trainer {
            settings,
            ..Trainer::new(config)
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn set_iterations(&mut self, iterations: usize) {
        self.config.iterations = iterations;
    }

    pub fn status(&self) -> TrainerStatus {
        self.status
    }

    pub fn current_iteration(&self) -> usize {
        self.current_iteration
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, key: &str) -> Option<&CfrNode> {
        self.nodes.get(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&String, &CfrNode)> {
        self.nodes.iter()
    }

    /// Average strategy at `key`, if the information set has been visited.
    pub fn average_strategy(&self, key: &str) -> Option<Vec<f64>> {
        self.nodes.get(key).map(|n| n.average_strategy())
    }

    /// Fraction of the iteration budget completed, in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.config.iterations == 0 {
            return 1.0;
        }
        (self.current_iteration as f64 / self.config.iterations as f64).min(1.0)
    }

    /// Drops every node and zeroes the iteration counter.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.current_iteration = 0;
        self.status = TrainerStatus::Untrained;
        log::info!("training state reset");
    }

    // -----------------------------------------------------------------------
    // Training loop
    // -----------------------------------------------------------------------

    /// Runs iterations until the budget is spent, the strategy converges or
    /// `cancel` is raised. Cancellation is checked once per iteration.
    /// Progress is saved to `store` every `save_interval` iterations; a failed
    /// save is logged and training continues.
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        cancel: &AtomicBool,
        store: &dyn CheckpointStore,
    ) -> TrainerStatus {
        self.status = TrainerStatus::Training;
        log::info!(
            "training from iteration {} of {} ({} nodes)",
            self.current_iteration,
            self.config.iterations,
            self.nodes.len()
        );

        while self.current_iteration < self.config.iterations {
            if cancel.load(Ordering::Relaxed) {
                log::info!(
                    "training interrupted after {} iterations",
                    self.current_iteration
                );
                self.status = TrainerStatus::Interrupted;
                self.save_logged(store);
                return self.status;
            }

            self.iterate(rng);

            if self.config.save_interval > 0
                && self.current_iteration % self.config.save_interval == 0
            {
                log::info!(
                    "iteration {} of {} complete, {} nodes, saving",
                    self.current_iteration,
                    self.config.iterations,
                    self.nodes.len()
                );
                self.save_logged(store);
                if self.check_convergence() {
                    log::info!("converged after {} iterations", self.current_iteration);
                    self.status = TrainerStatus::Converged;
                    return self.status;
                }
            }
        }

        self.status = TrainerStatus::Exhausted;
        self.save_logged(store);
        self.status
    }

    /// One self-play iteration over a freshly shuffled deck. Returns the root
    /// utility.
    pub fn iterate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        let deal = Deck::shuffled(rng).cards;
        let root = GameState::with_selected(self.settings, deal[..INITIAL_DEAL].to_vec());
        self.current_iteration += 1;
        self.cfr(&root, &deal, 1.0, 1.0, rng)
    }

    /// CFR recursion from `state`. `deal` is the shuffle later streets are
    /// drawn from; cards already on the board or discarded mark how much of it
    /// has been consumed.
    pub fn cfr<R: Rng + ?Sized>(
        &mut self,
        state: &GameState,
        deal: &[Card],
        p0: f64,
        p1: f64,
        rng: &mut R,
    ) -> f64 {
        if state.is_terminal() {
            return state.payoff().unwrap_or(0.0);
        }

        if state.selected.is_empty() {
            return match next_street(state, deal) {
                Some(dealt) => self.cfr(&dealt, deal, p0, p1, rng),
                None => 0.0,
            };
        }

        let player = state.current_player();
        let key = state.information_set();

        if !self.nodes.contains_key(&key) {
            let actions = state.legal_actions();
            if actions.is_empty() {
                return 0.0;
            }
            self.nodes.insert(key.clone(), CfrNode::new(actions));
        }

        let reach = if player == 0 { p0 } else { p1 };
        let branch_limit = self.config.branch_limit;
        let (strategy, sampled): (Vec<f64>, Vec<(usize, Action)>) = match self.nodes.get_mut(&key) {
            Some(node) => {
                let strategy = node.accumulate_strategy(reach);
                let picked = sample_actions(node.num_actions(), branch_limit, rng);
                let sampled = picked
                    .into_iter()
                    .map(|i| (i, node.actions[i].clone()))
                    .collect();
                (strategy, sampled)
            }
            None => return 0.0,
        };

        let weight_total: f64 = sampled.iter().map(|(i, _)| strategy[*i]).sum();
        let uniform = 1.0 / sampled.len() as f64;

        let mut utils = Vec::with_capacity(sampled.len());
        let mut node_util = 0.0;
        for (i, action) in &sampled {
            let prob = strategy[*i];
            let util = match state.apply_action(action) {
                Ok(next) => {
                    if player == 0 {
                        -self.cfr(&next, deal, p0 * prob, p1, rng)
                    } else {
                        -self.cfr(&next, deal, p0, p1 * prob, rng)
                    }
                }
                Err(e) => {
                    log::error!("stored action no longer applies at {}: {}", key, e);
                    0.0
                }
            };
            let weight = if weight_total > 0.0 {
                prob / weight_total
            } else {
                uniform
            };
            node_util += weight * util;
            utils.push(util);
        }

        let opponent_reach = if player == 0 { p1 } else { p0 };
        if let Some(node) = self.nodes.get_mut(&key) {
            for ((i, _), util) in sampled.iter().zip(&utils) {
                node.add_regret(*i, *util, node_util, opponent_reach);
            }
        }

        node_util
    }

    /// True when every node's average strategy lies within the stop threshold
    /// of uniform.
    pub fn check_convergence(&self) -> bool {
        !self.nodes.is_empty()
            && self
                .nodes
                .values()
                .all(|n| n.is_near_uniform(self.config.stop_threshold))
    }

    // -----------------------------------------------------------------------
    // Inference
    // -----------------------------------------------------------------------

    /// Most probable action under the average strategy, if `state` has a
    /// trained node.
    pub fn best_action(&self, state: &GameState) -> Option<Action> {
        let node = self.nodes.get(&state.information_set())?;
        if node.num_actions() == 0 {
            return None;
        }
        let idx = node.best_action_index()?;
        node.actions.get(idx).cloned()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn to_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            iterations: self.config.iterations,
            current_iteration: self.current_iteration,
            stop_threshold: self.config.stop_threshold,
            nodes: self.nodes.clone(),
        }
    }

    /// Restores the node table and counters. The save interval and branch
    /// limit are left as configured.
    pub fn from_checkpoint(&mut self, checkpoint: Checkpoint) {
        self.config.iterations = checkpoint.iterations;
        self.config.stop_threshold = checkpoint.stop_threshold;
        self.current_iteration = checkpoint.current_iteration;
        self.nodes = checkpoint.nodes;
        self.status = if self.nodes.is_empty() {
            TrainerStatus::Untrained
        } else if self.current_iteration >= self.config.iterations {
            TrainerStatus::Exhausted
        } else {
            TrainerStatus::Interrupted
        };
    }

    pub fn save(&self, store: &dyn CheckpointStore) -> OfcResult<()> {
        let bytes = self.to_checkpoint().to_bytes()?;
        store.write(&bytes)?;
        log::info!(
            "saved checkpoint: {} nodes, iteration {}",
            self.nodes.len(),
            self.current_iteration
        );
        Ok(())
    }

    fn save_logged(&self, store: &dyn CheckpointStore) {
        if let Err(e) = self.save(store) {
            log::error!("failed to save checkpoint: {}", e);
        }
    }

    /// Loads from `store`. Returns `Ok(false)` and leaves the trainer fresh
    /// when nothing usable was saved; undecodable bytes are an error.
    pub fn load(&mut self, store: &dyn CheckpointStore) -> OfcResult<bool> {
        let bytes = match store.read()? {
            Some(bytes) => bytes,
            None => {
                log::info!("no checkpoint found, starting fresh");
                return Ok(false);
            }
        };
        match Checkpoint::from_bytes(&bytes)? {
            Some(checkpoint) => {
                self.from_checkpoint(checkpoint);
                log::info!(
                    "loaded checkpoint: {} nodes, iteration {} of {}",
                    self.nodes.len(),
                    self.current_iteration,
                    self.config.iterations
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Indices of the actions to traverse at a node with `n` actions.
fn sample_actions<R: Rng + ?Sized>(n: usize, branch_limit: Option<usize>, rng: &mut R) -> Vec<usize> {
    match branch_limit {
        Some(k) if k > 0 && n > k => {
            let mut picked = sample(rng, n, k).into_vec();
            picked.sort_unstable();
            picked
        }
        _ => (0..n).collect(),
    }
}

/// The state with the next street dealt from `deal`, or `None` once the
/// shuffle is exhausted.
fn next_street(state: &GameState, deal: &[Card]) -> Option<GameState> {
    let cursor = state.board.card_count() + state.discarded.len();
    if cursor >= deal.len() {
        return None;
    }
    let end = (cursor + STREET_DEAL).min(deal.len());
    Some(state.deal(&deal[cursor..end]))
}
