use analysis_core::{Bar, TrendDirection};

/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

/// Relative Strength Index with Wilder smoothing.
///
/// The first value is the plain average of the first `period` gains/losses and
/// corresponds to `data[period]`; output length is `data.len() - period`.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period + 1 {
        return vec![];
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);

    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    let mut rsi_values = Vec::with_capacity(data.len() - period);
    rsi_values.push(rsi_from_averages(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        rsi_values.push(rsi_from_averages(avg_gain, avg_loss));
    }

    rsi_values
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        // flat window reads as neutral, all-gain window as fully overbought
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    (100.0 - (100.0 / (1.0 + rs))).clamp(0.0, 100.0)
}

/// True range of each bar after the first
pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| {
            let high_low = w[1].high - w[1].low;
            let high_close = (w[1].high - w[0].close).abs();
            let low_close = (w[1].low - w[0].close).abs();
            high_low.max(high_close).max(low_close)
        })
        .collect()
}

/// Average True Range (Wilder). First value corresponds to `bars[period]`.
pub fn atr(bars: &[Bar], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < period + 1 {
        return vec![];
    }

    let true_ranges = true_ranges(bars);

    let mut atr_values = Vec::with_capacity(true_ranges.len() - period + 1);
    let mut atr = true_ranges[..period].iter().sum::<f64>() / period as f64;
    atr_values.push(atr);

    for tr in &true_ranges[period..] {
        atr = (atr * (period - 1) as f64 + tr) / period as f64;
        atr_values.push(atr);
    }

    atr_values
}

/// One Supertrend reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupertrendPoint {
    /// The active band: final lower band in an uptrend, final upper band in a downtrend
    pub value: f64,
    pub direction: TrendDirection,
    pub final_upper: f64,
    pub final_lower: f64,
}

/// Left-to-right Supertrend state.
///
/// Each step depends on the previous final bands and direction: the direction
/// flips up when the close clears the previous final upper band, flips down
/// when it breaks the previous final lower band, and otherwise persists. While
/// it persists the active band may only tighten toward price.
#[derive(Debug, Clone)]
pub struct SupertrendState {
    multiplier: f64,
    prev: Option<SupertrendPoint>,
}

impl SupertrendState {
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier, prev: None }
    }

    /// Feed the next bar with its ATR. The first call seeds the state in an uptrend.
    pub fn update(&mut self, high: f64, low: f64, close: f64, atr: f64) -> SupertrendPoint {
        let hl2 = (high + low) / 2.0;
        let mut upper = hl2 + self.multiplier * atr;
        let mut lower = hl2 - self.multiplier * atr;

        let direction = match self.prev {
            None => TrendDirection::Up,
            Some(prev) => {
                if close > prev.final_upper {
                    TrendDirection::Up
                } else if close < prev.final_lower {
                    TrendDirection::Down
                } else {
                    if prev.direction == TrendDirection::Up && lower < prev.final_lower {
                        lower = prev.final_lower;
                    }
                    if prev.direction == TrendDirection::Down && upper > prev.final_upper {
                        upper = prev.final_upper;
                    }
                    prev.direction
                }
            }
        };

        let point = SupertrendPoint {
            value: match direction {
                TrendDirection::Up => lower,
                TrendDirection::Down => upper,
            },
            direction,
            final_upper: upper,
            final_lower: lower,
        };
        self.prev = Some(point);
        point
    }

    pub fn direction(&self) -> Option<TrendDirection> {
        self.prev.map(|p| p.direction)
    }
}

/// Supertrend over Wilder ATR(`period`), aligned to `bars`. Bars inside the
/// ATR warm-up are `None`.
pub fn supertrend(bars: &[Bar], period: usize, multiplier: f64) -> Vec<Option<SupertrendPoint>> {
    let atr_values = align(atr(bars, period), bars.len());
    let mut state = SupertrendState::new(multiplier);

    bars.iter()
        .zip(atr_values)
        .map(|(bar, atr)| atr.map(|atr| state.update(bar.high, bar.low, bar.close, atr)))
        .collect()
}

/// Volume divided by its trailing `period`-bar SMA, aligned to `volumes`.
/// Returns `(moving_average, surge_ratio)`. The ratio is `None` during warm-up
/// and wherever the average is zero.
pub fn volume_surge(volumes: &[f64], period: usize) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let ma = align(sma(volumes, period), volumes.len());
    let surge = volumes
        .iter()
        .zip(&ma)
        .map(|(&v, avg)| match avg {
            Some(avg) if *avg > 0.0 => Some(v / avg),
            _ => None,
        })
        .collect();
    (ma, surge)
}

/// Right-align an indicator output with its input series, padding the warm-up with `None`.
pub fn align(values: Vec<f64>, len: usize) -> Vec<Option<f64>> {
    let pad = len.saturating_sub(values.len());
    std::iter::repeat(None)
        .take(pad)
        .chain(values.into_iter().map(Some))
        .take(len)
        .collect()
}
