//! Scan report models

use analysis_core::{AnalysisError, ScanResult};
use serde::{Deserialize, Serialize};

/// A symbol that was skipped during a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanFailure {
    pub symbol: String,
    pub reason: String,
}

/// Outcome of one pass over the watchlist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// Ranked by descending score, ties in watchlist order
    pub results: Vec<ScanResult>,
    /// Skipped symbols in watchlist order
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Highest-ranked result, or `EmptyScanResult` when every symbol was skipped.
    pub fn top_pick(&self) -> Result<&ScanResult, AnalysisError> {
        self.results.first().ok_or(AnalysisError::EmptyScanResult)
    }

    /// Results with a non-zero score
    pub fn signals(&self) -> impl Iterator<Item = &ScanResult> {
        self.results.iter().filter(|r| r.score > 0.0)
    }
}
