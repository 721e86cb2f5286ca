//! Option Contract Ranker
//!
//! Scores every contract of an option chain under a strategy and picks the best.

pub mod ranker;
pub mod strategy;

pub use ranker::{breakeven, liquidity_score, smoothed_premium, OptionContractRanker, RankedContract, RankerConfig};
pub use strategy::{ScoreWeights, Strategy, StrategyPolicy};
