pub mod actions;
pub mod agent;
pub mod board;
pub mod cards;
pub mod cfr;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod game_state;
pub mod hand_evaluator;
pub mod heuristic;
pub mod royalty;
pub mod session;
pub mod trainer;
