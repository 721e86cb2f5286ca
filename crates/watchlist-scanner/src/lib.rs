//! Watchlist Scanner
//!
//! Walks a fixed watchlist one symbol at a time, classifies the latest bar of
//! each symbol and ranks the survivors by score.

pub mod models;
pub mod ranker;
pub mod scanner;

pub use models::{ScanFailure, ScanReport};
pub use ranker::rank_results;
pub use scanner::{default_watchlist, ScanConfig, WatchlistScanner, DEFAULT_WATCHLIST};
