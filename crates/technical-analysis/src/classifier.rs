use analysis_core::{AnalysisError, AnnotatedBar, IndicatorSnapshot, ScanSignal, TrendDirection};
use serde::{Deserialize, Serialize};

use crate::engine::median_atr;

/// Thresholds and fixed scores for the scan rule table
#[derive(Debug, Clone)]
pub struct SignalThresholds {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub volume_surge: f64,
    /// STRONG BUY scores `strong_buy_base + (rsi_oversold - rsi)`
    pub strong_buy_base: f64,
    pub buy_score: f64,
    pub sell_score: f64,
    pub weak_buy_score: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            rsi_oversold: 35.0,
            rsi_overbought: 65.0,
            volume_surge: 1.3,
            strong_buy_base: 90.0,
            buy_score: 75.0,
            sell_score: 80.0,
            weak_buy_score: 60.0,
        }
    }
}

/// Classifier output for the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub signal: ScanSignal,
    pub score: f64,
}

impl Classification {
    fn hold() -> Self {
        Self { signal: ScanSignal::Hold, score: 0.0 }
    }
}

/// First-match rule table over the current and previous indicator snapshots.
///
/// Rules are checked in this order and the first one that holds wins:
///
/// 1. bullish flip, RSI oversold, volume surge, ATR above its median: STRONG BUY
/// 2. bullish flip, volume surge: BUY
/// 3. bearish flip, RSI overbought, volume surge: SELL
/// 4. RSI oversold, volume surge: WEAK BUY
/// 5. otherwise HOLD with score 0
///
/// The predicates overlap, so the order is part of the contract. An undefined
/// indicator fails every predicate that reads it.
pub struct SignalClassifier {
    thresholds: SignalThresholds,
}

impl SignalClassifier {
    pub fn new() -> Self {
        Self::with_thresholds(SignalThresholds::default())
    }

    pub fn with_thresholds(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SignalThresholds {
        &self.thresholds
    }

    pub fn classify(
        &self,
        current: &IndicatorSnapshot,
        previous: &IndicatorSnapshot,
        median_atr: f64,
    ) -> Classification {
        let t = &self.thresholds;

        let bullish_flip = previous.supertrend_direction == Some(TrendDirection::Down)
            && current.supertrend_direction == Some(TrendDirection::Up);
        let bearish_flip = previous.supertrend_direction == Some(TrendDirection::Up)
            && current.supertrend_direction == Some(TrendDirection::Down);
        let rsi_oversold = current.rsi.is_some_and(|r| r < t.rsi_oversold);
        let rsi_overbought = current.rsi.is_some_and(|r| r > t.rsi_overbought);
        let volume_ok = current.volume_surge.is_some_and(|v| v > t.volume_surge);
        let atr_ok = current.atr.is_some_and(|a| a > median_atr);

        if bullish_flip && rsi_oversold && volume_ok && atr_ok {
            let rsi = current.rsi.unwrap_or(t.rsi_oversold);
            Classification {
                signal: ScanSignal::StrongBuy,
                score: t.strong_buy_base + (t.rsi_oversold - rsi),
            }
        } else if bullish_flip && volume_ok {
            Classification { signal: ScanSignal::Buy, score: t.buy_score }
        } else if bearish_flip && rsi_overbought && volume_ok {
            Classification { signal: ScanSignal::Sell, score: t.sell_score }
        } else if rsi_oversold && volume_ok {
            Classification { signal: ScanSignal::WeakBuy, score: t.weak_buy_score }
        } else {
            Classification::hold()
        }
    }

    /// Classify the last bar of an annotated series against its previous bar,
    /// using the median ATR of the whole series.
    pub fn classify_series(&self, series: &[AnnotatedBar]) -> Result<Classification, AnalysisError> {
        let [.., previous, current] = series else {
            return Err(AnalysisError::IndicatorComputation(
                "need at least two annotated bars to classify".to_string(),
            ));
        };
        let median = median_atr(series).ok_or_else(|| {
            AnalysisError::IndicatorComputation("no ATR values in series".to_string())
        })?;

        Ok(self.classify(&current.indicators, &previous.indicators, median))
    }
}

impl Default for SignalClassifier {
    fn default() -> Self {
        Self::new()
    }
}
