//! End-to-end scan: rank the watchlist, then pick an option contract for the top symbol.

use analysis_core::{AnalysisError, MarketDataProvider, ScanSignal};
use options_ranker::{OptionContractRanker, RankedContract, Strategy};
use serde::{Deserialize, Serialize};
use watchlist_scanner::{ScanReport, WatchlistScanner};

pub mod cache;
pub use cache::{CacheConfig, CachedProvider};

/// Read-only hand-off of the selected contract to the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionRecommendation {
    /// Exchange-qualified symbol of the top pick
    pub underlying: String,
    pub display_symbol: String,
    pub signal: ScanSignal,
    /// Latest close of the underlying
    pub spot_price: f64,
    pub expiry: String,
    pub strategy: Strategy,
    pub best: RankedContract,
    pub breakeven: f64,
    /// Next best contracts, best first
    pub alternatives: Vec<RankedContract>,
}

/// Output of one pipeline run. A failed options stage leaves the scan table intact.
#[derive(Debug)]
pub struct PipelineReport {
    pub scan: ScanReport,
    pub recommendation: Result<OptionRecommendation, AnalysisError>,
}

pub struct ScanPipeline<P> {
    provider: P,
    scanner: WatchlistScanner,
    ranker: OptionContractRanker,
    /// How many runner-up contracts to keep on the recommendation
    alternatives: usize,
}

impl<P: MarketDataProvider> ScanPipeline<P> {
    pub fn new(provider: P, scanner: WatchlistScanner) -> Self {
        Self {
            provider,
            scanner,
            ranker: OptionContractRanker::new(),
            alternatives: 4,
        }
    }

    pub fn with_ranker(mut self, ranker: OptionContractRanker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_alternatives(mut self, alternatives: usize) -> Self {
        self.alternatives = alternatives;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn scanner(&self) -> &WatchlistScanner {
        &self.scanner
    }

    /// Scan the watchlist and rank contracts of the top pick.
    ///
    /// Returns `EmptyScanResult` when no symbol survived the scan; the options
    /// stage is not attempted in that case.
    pub async fn run(&self, strategy: Strategy, expiry: Option<&str>) -> Result<PipelineReport, AnalysisError> {
        tracing::info!("Scanning {} symbols", self.scanner.watchlist().len());
        let scan = self.scanner.scan(&self.provider).await;
        if scan.is_empty() {
            tracing::warn!("No symbol produced a scan result");
            return Err(AnalysisError::EmptyScanResult);
        }

        let recommendation = self.recommend(&scan, strategy, expiry).await;
        match &recommendation {
            Ok(rec) => tracing::info!(
                "{} {}: best {} strike {} ({} expiry)",
                rec.display_symbol,
                strategy,
                rec.best.contract.option_type.to_label(),
                rec.best.contract.strike,
                rec.expiry
            ),
            Err(e) => tracing::warn!("Option ranking stopped: {}", e),
        }

        Ok(PipelineReport { scan, recommendation })
    }

    /// Options stage for an existing scan
    pub async fn recommend(
        &self,
        scan: &ScanReport,
        strategy: Strategy,
        expiry: Option<&str>,
    ) -> Result<OptionRecommendation, AnalysisError> {
        let top = scan.top_pick()?;

        let expiries = self
            .provider
            .fetch_expiries(&top.symbol)
            .await
            .map_err(|e| AnalysisError::ChainUnavailable(format!("{}: {}", top.display_symbol, e)))?;
        let expiry = select_expiry(&expiries, expiry)
            .map_err(|e| AnalysisError::ChainUnavailable(format!("{}: {}", top.display_symbol, e)))?;

        let chain = self
            .provider
            .fetch_option_chain(&top.symbol, &expiry)
            .await
            .map_err(|e| AnalysisError::ChainUnavailable(format!("{} {}: {}", top.display_symbol, expiry, e)))?;
        if chain.is_empty() {
            return Err(AnalysisError::ChainUnavailable(format!(
                "option chain for {} {} is empty",
                top.display_symbol, expiry
            )));
        }

        let mut ranked = self.ranker.rank(&chain, strategy)?.into_iter();
        let best = ranked
            .next()
            .ok_or_else(|| AnalysisError::NoMatchingContracts(strategy.to_string()))?;
        let alternatives: Vec<RankedContract> = ranked.take(self.alternatives).collect();

        Ok(OptionRecommendation {
            underlying: top.symbol.clone(),
            display_symbol: top.display_symbol.clone(),
            signal: top.signal,
            spot_price: top.close_price,
            expiry,
            strategy,
            breakeven: best.breakeven(),
            best,
            alternatives,
        })
    }
}

/// The requested expiry if it is listed, otherwise the nearest one.
fn select_expiry(expiries: &[String], requested: Option<&str>) -> Result<String, String> {
    if expiries.is_empty() {
        return Err("no option expiries listed".to_string());
    }
    match requested {
        Some(wanted) => expiries
            .iter()
            .find(|e| e.as_str() == wanted)
            .cloned()
            .ok_or_else(|| format!("expiry {} is not listed", wanted)),
        None => expiries
            .iter()
            .min()
            .cloned()
            .ok_or_else(|| "no option expiries listed".to_string()),
    }
}
