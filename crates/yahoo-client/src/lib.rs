//! Yahoo Finance market data: daily chart history and listed option chains.
//!
//! Unlike Polygon this covers exchange-qualified symbols such as `RELIANCE.NS`.
//! Yahoo lists no options for most non-US underlyings; those come back as an
//! empty expiry list rather than an error.

use analysis_core::{AnalysisError, Bar, MarketDataProvider, OptionChain, OptionContract, OptionType};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const OPTIONS_URL: &str = "https://query2.finance.yahoo.com/v7/finance/options";

#[derive(Clone)]
pub struct YahooClient {
    client: Client,
}

impl YahooClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Historical bars between two unix timestamps. Rows with a missing field are skipped.
    pub async fn get_historical_data(
        &self,
        symbol: &str,
        period1: i64,
        period2: i64,
        interval: &str,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let url = format!(
            "{}/{}?period1={}&period2={}&interval={}",
            CHART_URL, symbol, period1, period2, interval
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        // Unknown symbols come back as 404 with a chart error body
        if response.status() == StatusCode::NOT_FOUND {
            return Err(AnalysisError::DataUnavailable(format!("no chart data for {}", symbol)));
        }
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;
        body.into_bars(symbol)
    }

    /// Listed expiries as `YYYY-MM-DD`, nearest first
    pub async fn get_option_expirations(&self, symbol: &str) -> Result<Vec<String>, AnalysisError> {
        let Some(body) = self.get_options(symbol, None).await? else {
            return Ok(Vec::new());
        };
        Ok(body.expirations())
    }

    /// Calls and puts for one expiry
    pub async fn get_option_chain(&self, symbol: &str, expiry: &str) -> Result<OptionChain, AnalysisError> {
        let date = expiry_timestamp(expiry)?;
        let Some(body) = self.get_options(symbol, Some(date)).await? else {
            return Ok(OptionChain::default());
        };
        Ok(body.into_chain())
    }

    /// `None` when Yahoo has no options listing for the symbol
    async fn get_options(&self, symbol: &str, date: Option<i64>) -> Result<Option<OptionsResponse>, AnalysisError> {
        let mut builder = self.client.get(format!("{}/{}", OPTIONS_URL, symbol));
        if let Some(date) = date {
            builder = builder.query(&[("date", date)]);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("No options listing for {}", symbol);
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        let body: OptionsResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;
        Ok(Some(body))
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn fetch_history(&self, symbol: &str, period_days: i64) -> Result<Vec<Bar>, AnalysisError> {
        let to = Utc::now();
        let from = to - Duration::days(period_days);
        self.get_historical_data(symbol, from.timestamp(), to.timestamp(), "1d").await
    }

    async fn fetch_expiries(&self, symbol: &str) -> Result<Vec<String>, AnalysisError> {
        self.get_option_expirations(symbol).await
    }

    async fn fetch_option_chain(&self, symbol: &str, expiry: &str) -> Result<OptionChain, AnalysisError> {
        self.get_option_chain(symbol, expiry).await
    }
}

/// Midnight UTC of a `YYYY-MM-DD` expiry, the form Yahoo's `date` parameter takes
fn expiry_timestamp(expiry: &str) -> Result<i64, AnalysisError> {
    NaiveDate::parse_from_str(expiry, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| AnalysisError::InvalidData(format!("invalid expiry '{}'", expiry)))
}

fn expiry_label(timestamp: i64) -> Option<String> {
    DateTime::from_timestamp(timestamp, 0).map(|d| d.format("%Y-%m-%d").to_string())
}

// --- Chart response ---

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartBody,
}

#[derive(Debug, Deserialize)]
pub struct ChartBody {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
pub struct YahooError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

impl ChartResponse {
    pub fn into_bars(self, symbol: &str) -> Result<Vec<Bar>, AnalysisError> {
        if let Some(err) = self.chart.error {
            return Err(AnalysisError::DataUnavailable(format!(
                "{}: {}",
                symbol,
                err.description.or(err.code).unwrap_or_default()
            )));
        }

        let Some(result) = self.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(Vec::new());
        };
        let Some(quote) = result.indicators.quote.into_iter().next() else {
            return Ok(Vec::new());
        };

        let field = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();
        let bars = result
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                Some(Bar {
                    timestamp: DateTime::from_timestamp(ts, 0)?,
                    open: field(&quote.open, i)?,
                    high: field(&quote.high, i)?,
                    low: field(&quote.low, i)?,
                    close: field(&quote.close, i)?,
                    volume: field(&quote.volume, i)?,
                })
            })
            .collect();
        Ok(bars)
    }
}

// --- Options response ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsResponse {
    pub option_chain: OptionsBody,
}

#[derive(Debug, Deserialize)]
pub struct OptionsBody {
    #[serde(default)]
    pub result: Vec<OptionsResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsResult {
    #[serde(default)]
    pub expiration_dates: Vec<i64>,
    #[serde(default)]
    pub options: Vec<OptionsExpiry>,
}

#[derive(Debug, Deserialize)]
pub struct OptionsExpiry {
    #[serde(default)]
    pub calls: Vec<YahooContract>,
    #[serde(default)]
    pub puts: Vec<YahooContract>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooContract {
    pub contract_symbol: Option<String>,
    pub strike: Option<f64>,
    pub last_price: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub volume: Option<f64>,
    pub open_interest: Option<f64>,
    pub implied_volatility: Option<f64>,
}

impl YahooContract {
    /// Contracts without a strike are dropped
    fn into_contract(self, option_type: OptionType) -> Option<OptionContract> {
        Some(OptionContract {
            contract_symbol: self.contract_symbol,
            strike: self.strike?,
            last_price: self.last_price.unwrap_or(0.0),
            bid: self.bid,
            ask: self.ask,
            volume: self.volume.unwrap_or(0.0),
            open_interest: self.open_interest.unwrap_or(0.0),
            implied_volatility: self.implied_volatility.unwrap_or(0.0),
            option_type,
        })
    }
}

impl OptionsResponse {
    pub fn expirations(&self) -> Vec<String> {
        let mut dates: Vec<i64> = self
            .option_chain
            .result
            .first()
            .map(|r| r.expiration_dates.clone())
            .unwrap_or_default();
        dates.sort_unstable();
        dates.dedup();
        dates.into_iter().filter_map(expiry_label).collect()
    }

    pub fn into_chain(self) -> OptionChain {
        let Some(expiry) = self
            .option_chain
            .result
            .into_iter()
            .next()
            .and_then(|r| r.options.into_iter().next())
        else {
            return OptionChain::default();
        };

        OptionChain {
            calls: expiry
                .calls
                .into_iter()
                .filter_map(|c| c.into_contract(OptionType::Call))
                .collect(),
            puts: expiry
                .puts
                .into_iter()
                .filter_map(|c| c.into_contract(OptionType::Put))
                .collect(),
        }
    }
}
