//! Per-information-set regret and strategy accumulators.
//!
//! Each [`CfrNode`] fixes its action list when it is created and stores the
//! cumulative regret and cumulative reach-weighted strategy in parallel
//! vectors indexed by that list:
//!
//!   regret_sum[a], strategy_sum[a]   for a in 0..actions.len()
//!
//! Both sums only grow across iterations; they are cleared by dropping the
//! node (a training reset), never in place.

use serde::{Deserialize, Serialize};

use crate::actions::Action;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfrNode {
    pub actions: Vec<Action>,
    regret_sum: Vec<f64>,
    strategy_sum: Vec<f64>,
}

impl CfrNode {
    pub fn new(actions: Vec<Action>) -> Self {
        let n = actions.len();
        CfrNode {
            actions,
            regret_sum: vec![0.0; n],
            strategy_sum: vec![0.0; n],
        }
    }

    #[inline]
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    pub fn regret_sum(&self) -> &[f64] {
        &self.regret_sum
    }

    pub fn strategy_sum(&self) -> &[f64] {
        &self.strategy_sum
    }

    // -----------------------------------------------------------------------
    // Strategy computation
    // -----------------------------------------------------------------------

    /// Regret matching: proportional to positive cumulative regret, uniform
    /// if no action has positive regret.
    pub fn current_strategy(&self) -> Vec<f64> {
        let na = self.num_actions();
        let positive_sum: f64 = self.regret_sum.iter().map(|r| r.max(0.0)).sum();

        if positive_sum > 0.0 {
            self.regret_sum
                .iter()
                .map(|r| r.max(0.0) / positive_sum)
                .collect()
        } else {
            vec![1.0 / na as f64; na]
        }
    }

    /// Current strategy, with each probability added to the strategy sum
    /// scaled by `reach` (the acting player's reach probability).
    pub fn accumulate_strategy(&mut self, reach: f64) -> Vec<f64> {
        let strategy = self.current_strategy();
        for (sum, p) in self.strategy_sum.iter_mut().zip(&strategy) {
            *sum += reach * p;
        }
        strategy
    }

    /// Normalised strategy sum; uniform before any accumulation.
    pub fn average_strategy(&self) -> Vec<f64> {
        let na = self.num_actions();
        let total: f64 = self.strategy_sum.iter().sum();
        if total > 0.0 {
            self.strategy_sum.iter().map(|s| s / total).collect()
        } else {
            vec![1.0 / na as f64; na]
        }
    }

    // -----------------------------------------------------------------------
    // Regret update
    // -----------------------------------------------------------------------

    /// Adds `weight * (action_value - node_value)` to the regret of `action`.
    #[inline]
    pub fn add_regret(&mut self, action: usize, action_value: f64, node_value: f64, weight: f64) {
        self.regret_sum[action] += weight * (action_value - node_value);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Index of the most probable action under the average strategy.
    pub fn best_action_index(&self) -> Option<usize> {
        self.average_strategy()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }

    /// True when every average-strategy probability is within `tolerance` of
    /// `1 / num_actions`.
    pub fn is_near_uniform(&self, tolerance: f64) -> bool {
        let uniform = 1.0 / self.num_actions() as f64;
        self.average_strategy()
            .iter()
            .all(|p| (p - uniform).abs() <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_cards;

    fn node(n: usize) -> CfrNode {
        let cards = parse_cards("2h3h4h5h6h7h").unwrap();
        let actions = (0..n)
            .map(|i| Action {
                top: vec![cards[i]],
                ..Action::default()
            })
            .collect();
        CfrNode::new(actions)
    }

    #[test]
    fn initial_strategy_is_uniform() {
        let n = node(3);
        for p in n.current_strategy() {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn negative_regrets_give_uniform() {
        let mut n = node(2);
        n.add_regret(0, -5.0, 0.0, 1.0);
        n.add_regret(1, -1.0, 0.0, 1.0);
        assert_eq!(n.current_strategy(), vec![0.5, 0.5]);
    }

    #[test]
    fn regret_matching_is_proportional() {
        let mut n = node(3);
        n.add_regret(0, 3.0, 0.0, 1.0);
        n.add_regret(1, 1.0, 0.0, 1.0);
        n.add_regret(2, -4.0, 0.0, 1.0);
        let s = n.current_strategy();
        assert!((s[0] - 0.75).abs() < 1e-12);
        assert!((s[1] - 0.25).abs() < 1e-12);
        assert_eq!(s[2], 0.0);
    }

    #[test]
    fn strategy_accumulates_reach_weighted() {
        let mut n = node(2);
        n.accumulate_strategy(0.5);
        n.accumulate_strategy(1.5);
        assert_eq!(n.strategy_sum(), &[1.0, 1.0]);
        assert_eq!(n.average_strategy(), vec![0.5, 0.5]);
    }

    #[test]
    fn best_action_follows_average() {
        let mut n = node(3);
        n.add_regret(2, 10.0, 0.0, 1.0);
        n.accumulate_strategy(1.0);
        assert_eq!(n.best_action_index(), Some(2));
        assert!(!n.is_near_uniform(0.01));
    }
}
