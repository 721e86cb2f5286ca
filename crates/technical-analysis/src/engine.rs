use analysis_core::{stats, AnalysisError, AnnotatedBar, Bar, IndicatorSnapshot};

use crate::indicators::*;

/// Indicator lengths used by the scanner
#[derive(Debug, Clone)]
pub struct IndicatorConfig {
    pub supertrend_period: usize,
    pub supertrend_multiplier: f64,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub volume_ma_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            supertrend_period: 10,
            supertrend_multiplier: 3.0,
            rsi_period: 14,
            atr_period: 14,
            volume_ma_period: 20,
        }
    }
}

/// Annotates a price series with Supertrend, RSI, ATR and volume surge
pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::with_config(IndicatorConfig::default())
    }

    pub fn with_config(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// Fewest bars for which every indicator is defined on the last two bars.
    pub fn min_bars(&self) -> usize {
        let c = &self.config;
        // RSI, ATR and Supertrend need one extra bar for the first price change
        [c.rsi_period + 1, c.atr_period + 1, c.supertrend_period + 1, c.volume_ma_period]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Attach an `IndicatorSnapshot` to every bar.
    pub fn annotate(&self, bars: &[Bar]) -> Result<Vec<AnnotatedBar>, AnalysisError> {
        let c = &self.config;
        let lookbacks = [
            ("Supertrend", c.supertrend_period + 1),
            ("RSI", c.rsi_period + 1),
            ("ATR", c.atr_period + 1),
            ("Volume MA", c.volume_ma_period),
        ];
        for (name, needed) in lookbacks {
            // the classifier reads the previous bar too
            if bars.len() < needed + 1 {
                return Err(AnalysisError::IndicatorComputation(format!(
                    "{} needs {} bars, got {}",
                    name,
                    needed + 1,
                    bars.len()
                )));
            }
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let trend = supertrend(bars, c.supertrend_period, c.supertrend_multiplier);
        let rsi_values = align(rsi(&closes, c.rsi_period), bars.len());
        let atr_values = align(atr(bars, c.atr_period), bars.len());
        let (volume_ma, surge) = volume_surge(&volumes, c.volume_ma_period);

        let annotated = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| AnnotatedBar {
                bar: bar.clone(),
                indicators: IndicatorSnapshot {
                    supertrend: trend[i].map(|p| p.value),
                    supertrend_direction: trend[i].map(|p| p.direction),
                    rsi: rsi_values[i],
                    atr: atr_values[i],
                    volume_ma20: volume_ma[i],
                    volume_surge: surge[i],
                },
            })
            .collect();

        Ok(annotated)
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Median of the defined ATR values across an annotated series
pub fn median_atr(series: &[AnnotatedBar]) -> Option<f64> {
    let values: Vec<f64> = series.iter().filter_map(|b| b.indicators.atr).collect();
    stats::median(&values)
}
