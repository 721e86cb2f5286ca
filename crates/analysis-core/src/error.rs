use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Empty or too-short price history for a symbol.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// An indicator lacks the lookback it needs at the bars being classified.
    #[error("Indicator computation error: {0}")]
    IndicatorComputation(String),

    /// No expiries, or an empty chain, for the underlying.
    #[error("Option chain unavailable: {0}")]
    ChainUnavailable(String),

    #[error("No valid contracts for strategy: {0}")]
    NoMatchingContracts(String),

    #[error("No symbol produced a scan result")]
    EmptyScanResult,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("API error: {0}")]
    ApiError(String),
}
