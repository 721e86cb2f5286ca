//! Strategy policy table

use std::fmt;
use std::str::FromStr;

use analysis_core::{AnalysisError, OptionType};
use serde::{Deserialize, Serialize};

/// Weights applied to a contract's derived metrics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub implied_volatility: f64,
    pub liquidity: f64,
    pub premium_to_iv: f64,
}

impl ScoreWeights {
    pub fn score(&self, implied_volatility: f64, liquidity: f64, premium_to_iv: f64) -> f64 {
        self.implied_volatility * implied_volatility
            + self.liquidity * liquidity
            + self.premium_to_iv * premium_to_iv
    }
}

/// Which contracts a strategy considers and how it weighs them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyPolicy {
    pub option_type: OptionType,
    pub weights: ScoreWeights,
}

const BUYER_WEIGHTS: ScoreWeights = ScoreWeights {
    implied_volatility: 0.35,
    liquidity: 0.30,
    premium_to_iv: 0.20,
};

// sellers are penalised for high IV
const PUT_SELLER_WEIGHTS: ScoreWeights = ScoreWeights {
    implied_volatility: -0.40,
    liquidity: 0.20,
    premium_to_iv: 0.40,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    LongCall,
    LongPut,
    CashSecuredPut,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::LongCall, Strategy::LongPut, Strategy::CashSecuredPut];

    pub fn policy(&self) -> StrategyPolicy {
        match self {
            Strategy::LongCall => StrategyPolicy {
                option_type: OptionType::Call,
                weights: BUYER_WEIGHTS,
            },
            Strategy::LongPut => StrategyPolicy {
                option_type: OptionType::Put,
                weights: BUYER_WEIGHTS,
            },
            Strategy::CashSecuredPut => StrategyPolicy {
                option_type: OptionType::Put,
                weights: PUT_SELLER_WEIGHTS,
            },
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            Strategy::LongCall => "Long Call",
            Strategy::LongPut => "Long Put",
            Strategy::CashSecuredPut => "Cash-Secured Put",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_label())
    }
}

impl FromStr for Strategy {
    type Err = AnalysisError;

    /// Accepts `long-call`, `long_call`, `Long Call` and the like.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '_' { '-' } else { c })
            .collect();
        match normalized.as_str() {
            "long-call" | "call" => Ok(Strategy::LongCall),
            "long-put" | "put" => Ok(Strategy::LongPut),
            "cash-secured-put" | "csp" => Ok(Strategy::CashSecuredPut),
            _ => Err(AnalysisError::InvalidData(format!("unknown strategy '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        assert_eq!(Strategy::LongCall.policy().option_type, OptionType::Call);
        assert_eq!(Strategy::LongPut.policy().option_type, OptionType::Put);
        assert_eq!(Strategy::CashSecuredPut.policy().option_type, OptionType::Put);
        assert_eq!(Strategy::LongCall.policy().weights, Strategy::LongPut.policy().weights);
        assert!(Strategy::CashSecuredPut.policy().weights.implied_volatility < 0.0);
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("long-call".parse::<Strategy>().unwrap(), Strategy::LongCall);
        assert_eq!("Long Put".parse::<Strategy>().unwrap(), Strategy::LongPut);
        assert_eq!("cash_secured_put".parse::<Strategy>().unwrap(), Strategy::CashSecuredPut);
        assert_eq!("Cash-Secured Put".parse::<Strategy>().unwrap(), Strategy::CashSecuredPut);
        assert!(matches!(
            "straddle".parse::<Strategy>(),
            Err(AnalysisError::InvalidData(_))
        ));
    }

    #[test]
    fn test_labels_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_label().parse::<Strategy>().unwrap(), strategy);
        }
    }
}
