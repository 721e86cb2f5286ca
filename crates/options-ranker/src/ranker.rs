//! Option contract scoring and selection

use analysis_core::{stats, AnalysisError, OptionChain, OptionContract, OptionType};
use serde::{Deserialize, Serialize};

use crate::strategy::Strategy;

/// Guards the premium/IV ratio against zero implied volatility
pub const IV_EPSILON: f64 = 1e-6;

/// Chain preprocessing parameters
#[derive(Debug, Clone)]
pub struct RankerConfig {
    /// Open interest counts this much per contract toward liquidity
    pub open_interest_weight: f64,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            open_interest_weight: 0.1,
        }
    }
}

/// A contract with the metrics used to rank it under one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedContract {
    pub contract: OptionContract,
    /// Mean of the available last price, bid and ask
    pub smoothed_premium: f64,
    pub liquidity_score: f64,
    pub premium_to_iv_ratio: f64,
    pub strategy_score: f64,
}

impl RankedContract {
    pub fn breakeven(&self) -> f64 {
        breakeven(self.contract.option_type, self.contract.strike, self.smoothed_premium)
    }
}

/// Mean of the last price and whichever of bid/ask are quoted.
pub fn smoothed_premium(contract: &OptionContract) -> f64 {
    let prices: Vec<f64> = [Some(contract.last_price), contract.bid, contract.ask]
        .into_iter()
        .flatten()
        .collect();
    stats::mean(&prices)
}

pub fn liquidity_score(contract: &OptionContract, open_interest_weight: f64) -> f64 {
    contract.volume + contract.open_interest * open_interest_weight
}

/// Underlying price at expiry where the position breaks even
pub fn breakeven(option_type: OptionType, strike: f64, premium: f64) -> f64 {
    match option_type {
        OptionType::Call => strike + premium,
        OptionType::Put => strike - premium,
    }
}

/// Scores option contracts per strategy
pub struct OptionContractRanker {
    config: RankerConfig,
}

impl OptionContractRanker {
    pub fn new() -> Self {
        Self::with_config(RankerConfig::default())
    }

    pub fn with_config(config: RankerConfig) -> Self {
        Self { config }
    }

    /// Drop contracts that have not traded and attach liquidity and premium/IV.
    /// `strategy_score` is left at zero.
    pub fn prepare_chain(&self, chain: &OptionChain) -> Result<Vec<RankedContract>, AnalysisError> {
        let prepared: Vec<RankedContract> = chain
            .contracts()
            .filter(|c| c.volume > 0.0)
            .map(|c| {
                let premium = smoothed_premium(c);
                RankedContract {
                    contract: c.clone(),
                    smoothed_premium: premium,
                    liquidity_score: liquidity_score(c, self.config.open_interest_weight),
                    premium_to_iv_ratio: premium / (c.implied_volatility + IV_EPSILON),
                    strategy_score: 0.0,
                }
            })
            .collect();

        if prepared.is_empty() {
            return Err(AnalysisError::ChainUnavailable(format!(
                "none of {} contracts traded",
                chain.len()
            )));
        }
        Ok(prepared)
    }

    /// All contracts the strategy considers, best first. Equal scores keep chain order.
    pub fn rank(&self, chain: &OptionChain, strategy: Strategy) -> Result<Vec<RankedContract>, AnalysisError> {
        let policy = strategy.policy();

        let mut candidates: Vec<RankedContract> = self
            .prepare_chain(chain)?
            .into_iter()
            .filter(|c| c.contract.option_type == policy.option_type)
            .map(|mut c| {
                c.strategy_score = policy.weights.score(
                    c.contract.implied_volatility,
                    c.liquidity_score,
                    c.premium_to_iv_ratio,
                );
                c
            })
            .collect();

        if candidates.is_empty() {
            return Err(AnalysisError::NoMatchingContracts(format!(
                "{} needs traded {} contracts",
                strategy,
                policy.option_type.to_label()
            )));
        }

        candidates.sort_by(|a, b| b.strategy_score.total_cmp(&a.strategy_score));
        tracing::debug!("Ranked {} {} candidates", candidates.len(), strategy);
        Ok(candidates)
    }

    /// Highest-scoring contract for the strategy
    pub fn select_best(&self, chain: &OptionChain, strategy: Strategy) -> Result<RankedContract, AnalysisError> {
        self.rank(chain, strategy)?
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::NoMatchingContracts(strategy.to_string()))
    }
}

impl Default for OptionContractRanker {
    fn default() -> Self {
        Self::new()
    }
}
