//! Game settings, trainer configuration and on-disk locations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cards::{Card, Rank};
use crate::error::OfcResult;
use crate::hand_evaluator::{evaluate, TOP_ONE_PAIR, TOP_THREE_OF_A_KIND};

pub const DEFAULT_ITERATIONS: usize = 500_000;
pub const DEFAULT_STOP_THRESHOLD: f64 = 0.0001;
pub const DEFAULT_SAVE_INTERVAL: usize = 100;
pub const DEFAULT_BRANCH_LIMIT: usize = 4;
pub const DEFAULT_AI_TIME_SECS: u64 = 60;
pub const CHECKPOINT_FILENAME: &str = "cfr_data.bin";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FantasyType {
    #[default]
    Normal,
    Progressive,
}

impl FantasyType {
    /// Cards dealt on entering fantasy with `top` as the qualifying top line.
    pub fn cards_dealt(self, top: &[Card]) -> usize {
        match self {
            FantasyType::Normal => 14,
            FantasyType::Progressive => {
                let value = evaluate(top);
                match value.category {
                    TOP_THREE_OF_A_KIND => 17,
                    TOP_ONE_PAIR if value.primary_rank() == Rank::Ace as u8 => 16,
                    TOP_ONE_PAIR if value.primary_rank() == Rank::King as u8 => 15,
                    _ => 14,
                }
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FantasyType::Normal => "normal",
            FantasyType::Progressive => "progressive",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    #[default]
    Mccfr,
    Random,
}

impl AgentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Mccfr => "mccfr",
            AgentKind::Random => "random",
        }
    }
}

/// Settings carried by every game state and sent by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    pub fantasy_mode: bool,
    pub fantasy_type: FantasyType,
    /// Move deadline in seconds.
    pub ai_time: u64,
    pub iterations: usize,
    pub stop_threshold: f64,
    pub ai_type: AgentKind,
}

impl Default for GameSettings {
    fn default() -> Self {
        GameSettings {
            fantasy_mode: false,
            fantasy_type: FantasyType::Normal,
            ai_time: DEFAULT_AI_TIME_SECS,
            iterations: DEFAULT_ITERATIONS,
            stop_threshold: DEFAULT_STOP_THRESHOLD,
            ai_type: AgentKind::Mccfr,
        }
    }
}

impl GameSettings {
    pub fn move_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ai_time)
    }

    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            iterations: self.iterations,
            stop_threshold: self.stop_threshold,
            ..TrainerConfig::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Iteration budget.
    pub iterations: usize,
    /// Convergence tolerance around the uniform strategy.
    pub stop_threshold: f64,
    /// Iterations between checkpoint saves and convergence checks.
    pub save_interval: usize,
    /// Actions traversed per node; `None` traverses every legal action.
    pub branch_limit: Option<usize>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            iterations: DEFAULT_ITERATIONS,
            stop_threshold: DEFAULT_STOP_THRESHOLD,
            save_interval: DEFAULT_SAVE_INTERVAL,
            branch_limit: Some(DEFAULT_BRANCH_LIMIT),
        }
    }
}

/// `$HOME/.ofc-solver`
pub fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".ofc-solver")
}

pub fn default_checkpoint_path() -> PathBuf {
    data_dir().join(CHECKPOINT_FILENAME)
}

/// Reads settings from a JSON file; keys absent from the file keep their defaults.
pub fn load_settings(path: &Path) -> OfcResult<GameSettings> {
    let json = std::fs::read_to_string(path)?;
    let settings = serde_json::from_str(&json)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_cards;

    #[test]
    fn settings_accept_partial_camel_case() {
        let s: GameSettings =
            serde_json::from_str(r#"{"fantasyMode": true, "aiType": "random"}"#).unwrap();
        assert!(s.fantasy_mode);
        assert_eq!(s.ai_type, AgentKind::Random);
        assert_eq!(s.iterations, DEFAULT_ITERATIONS);
        assert_eq!(s.ai_time, DEFAULT_AI_TIME_SECS);
    }

    #[test]
    fn progressive_deal_sizes() {
        let kk = parse_cards("KhKd2c").unwrap();
        let trips = parse_cards("5h5d5c").unwrap();
        assert_eq!(FantasyType::Progressive.cards_dealt(&kk), 15);
        assert_eq!(FantasyType::Progressive.cards_dealt(&trips), 17);
        assert_eq!(FantasyType::Normal.cards_dealt(&trips), 14);
    }
}
