use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Supertrend direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Up,
    Down,
}

impl TrendDirection {
    /// +1 for an uptrend, -1 for a downtrend
    pub fn sign(&self) -> i8 {
        match self {
            TrendDirection::Up => 1,
            TrendDirection::Down => -1,
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            TrendDirection::Up => "UP",
            TrendDirection::Down => "DOWN",
        }
    }
}

/// Indicator values attached to one bar. `None` while an indicator is still
/// inside its warm-up window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub supertrend: Option<f64>,
    pub supertrend_direction: Option<TrendDirection>,
    /// 0-100
    pub rsi: Option<f64>,
    pub atr: Option<f64>,
    pub volume_ma20: Option<f64>,
    /// Bar volume divided by its trailing 20-bar average
    pub volume_surge: Option<f64>,
}

/// A bar together with its indicator snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedBar {
    pub bar: Bar,
    pub indicators: IndicatorSnapshot,
}

/// Scanner signal, ordered as the classifier evaluates them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanSignal {
    StrongBuy,
    Buy,
    Sell,
    WeakBuy,
    Hold,
}

impl ScanSignal {
    /// Human-readable label for the signal
    pub fn to_label(&self) -> &'static str {
        match self {
            ScanSignal::StrongBuy => "STRONG BUY",
            ScanSignal::Buy => "BUY",
            ScanSignal::Sell => "SELL",
            ScanSignal::WeakBuy => "WEAK BUY",
            ScanSignal::Hold => "Hold",
        }
    }
}

/// One row of the scan table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Exchange-qualified symbol, e.g. `RELIANCE.NS`
    pub symbol: String,
    /// Symbol without its exchange suffix
    pub display_symbol: String,
    pub close_price: f64,
    pub rsi: f64,
    pub trend_direction: TrendDirection,
    pub signal: ScanSignal,
    /// Non-negative, one decimal place. Zero only for `Hold`.
    pub score: f64,
    /// `None` when the 20-bar average volume is zero
    pub volume_surge_ratio: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn to_label(&self) -> &'static str {
        match self {
            OptionType::Call => "CALL",
            OptionType::Put => "PUT",
        }
    }
}

/// A single listed option contract for one expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    #[serde(default)]
    pub contract_symbol: Option<String>,
    pub strike: f64,
    pub last_price: f64,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    pub volume: f64,
    pub open_interest: f64,
    pub implied_volatility: f64,
    pub option_type: OptionType,
}

/// Calls and puts for one underlying and expiry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionChain {
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

impl OptionChain {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len() + self.puts.len()
    }

    /// All contracts, calls first
    pub fn contracts(&self) -> impl Iterator<Item = &OptionContract> {
        self.calls.iter().chain(self.puts.iter())
    }
}

/// Strip a two or three letter exchange suffix (`RELIANCE.NS` -> `RELIANCE`).
/// Share-class suffixes such as `BRK.B` are left alone.
pub fn display_symbol(symbol: &str) -> &str {
    match symbol.rsplit_once('.') {
        Some((base, suffix)) if !base.is_empty() && (2..=3).contains(&suffix.len()) => base,
        _ => symbol,
    }
}
