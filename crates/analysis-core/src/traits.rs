use async_trait::async_trait;
use crate::{AnalysisError, Bar, OptionChain};

/// Source of price history and option chains.
///
/// An `Err` means the fetch itself failed. An `Ok` with an empty payload means
/// the provider answered but has nothing for the request; callers treat the
/// two differently (skip vs. report no chain).
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars covering the last `period_days` calendar days, oldest first.
    async fn fetch_history(&self, symbol: &str, period_days: i64) -> Result<Vec<Bar>, AnalysisError>;

    /// Listed option expiries (`YYYY-MM-DD`), nearest first.
    async fn fetch_expiries(&self, symbol: &str) -> Result<Vec<String>, AnalysisError>;

    /// Calls and puts for one expiry.
    async fn fetch_option_chain(&self, symbol: &str, expiry: &str) -> Result<OptionChain, AnalysisError>;
}
