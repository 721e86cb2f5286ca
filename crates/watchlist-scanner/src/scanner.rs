//! Watchlist Scanner Module
//!
//! Fetches history for each watchlist symbol, annotates it with indicators and
//! classifies the latest bar. A symbol that fails at any step is logged and
//! skipped; it never aborts the scan.

use analysis_core::{
    display_symbol, stats, AnalysisError, Bar, MarketDataProvider, ScanResult, ScanSignal,
};
use technical_analysis::{IndicatorEngine, SignalClassifier};

use crate::models::{ScanFailure, ScanReport};
use crate::ranker::rank_results;

/// Built-in watchlist of exchange-qualified NSE symbols
pub const DEFAULT_WATCHLIST: &[&str] = &[
    "RELIANCE.NS", "TCS.NS", "HDFCBANK.NS", "INFY.NS", "ITC.NS",
    "TATAMOTORS.NS", "MARUTI.NS", "SBIN.NS", "BHARTIARTL.NS", "LT.NS",
];

pub fn default_watchlist() -> Vec<String> {
    DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect()
}

/// Configuration for scanning
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Calendar days of daily history to request
    pub period_days: i64,
    /// Series shorter than this are skipped as unavailable
    pub min_bars: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            period_days: 90,
            min_bars: 50,
        }
    }
}

/// Scans a fixed watchlist sequentially
pub struct WatchlistScanner {
    watchlist: Vec<String>,
    config: ScanConfig,
    engine: IndicatorEngine,
    classifier: SignalClassifier,
}

impl WatchlistScanner {
    /// Create a scanner over the default watchlist
    pub fn new() -> Self {
        Self::with_watchlist(default_watchlist())
    }

    /// Create scanner with custom watchlist
    pub fn with_watchlist(watchlist: Vec<String>) -> Self {
        Self {
            watchlist,
            config: ScanConfig::default(),
            engine: IndicatorEngine::new(),
            classifier: SignalClassifier::new(),
        }
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_engine(mut self, engine: IndicatorEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_classifier(mut self, classifier: SignalClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn watchlist(&self) -> &[String] {
        &self.watchlist
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan every symbol in order and rank the results.
    pub async fn scan<P>(&self, provider: &P) -> ScanReport
    where
        P: MarketDataProvider + ?Sized,
    {
        let mut results = Vec::new();
        let mut failures = Vec::new();

        for symbol in &self.watchlist {
            match self.scan_symbol(provider, symbol).await {
                Ok(result) => {
                    tracing::debug!(
                        "{}: {} (score {:.1})",
                        symbol,
                        result.signal.to_label(),
                        result.score
                    );
                    results.push(result);
                }
                Err(e) => {
                    tracing::warn!("Failed {}: {}", symbol, e);
                    failures.push(ScanFailure {
                        symbol: symbol.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        rank_results(&mut results);

        tracing::info!(
            "Scanned {} symbols: {} results, {} skipped",
            self.watchlist.len(),
            results.len(),
            failures.len()
        );

        ScanReport { results, failures }
    }

    /// Fetch and evaluate a single symbol
    pub async fn scan_symbol<P>(&self, provider: &P, symbol: &str) -> Result<ScanResult, AnalysisError>
    where
        P: MarketDataProvider + ?Sized,
    {
        let bars = provider.fetch_history(symbol, self.config.period_days).await?;
        self.evaluate(symbol, &bars)
    }

    /// Classify the latest bar of an already-fetched series
    pub fn evaluate(&self, symbol: &str, bars: &[Bar]) -> Result<ScanResult, AnalysisError> {
        if bars.is_empty() {
            return Err(AnalysisError::DataUnavailable(format!("no price history for {}", symbol)));
        }
        if bars.len() < self.config.min_bars {
            return Err(AnalysisError::DataUnavailable(format!(
                "{} has {} bars, need at least {}",
                symbol,
                bars.len(),
                self.config.min_bars
            )));
        }

        let series = self.engine.annotate(bars)?;
        let classification = self.classifier.classify_series(&series)?;

        let latest = series.last().ok_or_else(|| {
            AnalysisError::DataUnavailable(format!("no price history for {}", symbol))
        })?;
        let missing = |name: &str| {
            AnalysisError::IndicatorComputation(format!("{} undefined on latest bar of {}", name, symbol))
        };
        let indicators = &latest.indicators;
        let rsi = indicators.rsi.ok_or_else(|| missing("RSI"))?;
        let trend_direction = indicators.supertrend_direction.ok_or_else(|| missing("Supertrend"))?;
        // a zero average volume past warm-up is "no surge", not a failure
        indicators.volume_ma20.ok_or_else(|| missing("volume average"))?;
        let volume_surge_ratio = indicators.volume_surge;

        let score = stats::round_to(classification.score, 1);
        let (signal, score) = if score > 0.0 {
            (classification.signal, score)
        } else {
            (ScanSignal::Hold, 0.0)
        };

        Ok(ScanResult {
            symbol: symbol.to_string(),
            display_symbol: display_symbol(symbol).to_string(),
            close_price: latest.bar.close,
            rsi,
            trend_direction,
            signal,
            score,
            volume_surge_ratio,
        })
    }
}

impl Default for WatchlistScanner {
    fn default() -> Self {
        Self::new()
    }
}
