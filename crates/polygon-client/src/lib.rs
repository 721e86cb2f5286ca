use analysis_core::{AnalysisError, Bar, MarketDataProvider, OptionChain, OptionContract, OptionType};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.polygon.io";

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: std::time::Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: std::time::Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).saturating_duration_since(now),
                None => std::time::Duration::ZERO,
            } + std::time::Duration::from_millis(50);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Polygon API slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl PolygonClient {
    pub fn new(api_key: String) -> Self {
        // Default 500 req/min for Starter plan. Free tier users should set POLYGON_RATE_LIMIT=5.
        let rate_limit: usize = std::env::var("POLYGON_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);
        Self::with_rate_limit(api_key, rate_limit)
    }

    /// Client allowing at most `requests_per_minute` calls in any 60 s window
    pub fn with_rate_limit(api_key: String, requests_per_minute: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            rate_limiter: RateLimiter::new(requests_per_minute, Duration::from_secs(60)),
        }
    }

    pub fn rate_limit(&self) -> usize {
        self.rate_limiter.max_requests
    }

    /// Build a client from `POLYGON_API_KEY`.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let api_key = std::env::var("POLYGON_API_KEY")
            .map_err(|_| AnalysisError::InvalidData("POLYGON_API_KEY must be set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Send a rate-limited request. A failed request is not retried.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AnalysisError> {
        self.rate_limiter.acquire().await;
        let response = builder
            .send()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::ApiError(format!("HTTP {}: {}", status, body)));
        }
        Ok(response)
    }

    /// Get aggregates (bars) for a symbol
    pub async fn get_aggregates(
        &self,
        symbol: &str,
        multiplier: u32,
        timespan: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            BASE_URL,
            symbol,
            multiplier,
            timespan,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self.send_request(
            self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", "50000"),
            ])
        ).await?;

        let agg_response: AggregateResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        Ok(agg_response.into_bars())
    }

    /// Unexpired option expiration dates for an underlying, nearest first.
    /// Paginates through the contracts reference endpoint.
    pub async fn list_option_expirations(&self, underlying: &str) -> Result<Vec<String>, AnalysisError> {
        let mut expirations = BTreeSet::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut builder = self.client.get(format!("{}/v3/reference/options/contracts", BASE_URL))
                .query(&[
                    ("apiKey", self.api_key.as_str()),
                    ("underlying_ticker", underlying),
                    ("expired", "false"),
                    ("limit", "1000"),
                    ("order", "asc"),
                    ("sort", "expiration_date"),
                ]);
            if let Some(ref c) = cursor {
                builder = builder.query(&[("cursor", c.as_str())]);
            }

            let body: ContractListResponse = self
                .send_request(builder)
                .await?
                .json()
                .await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            expirations.extend(body.results.into_iter().filter_map(|c| c.expiration_date));

            cursor = body.next_url.as_deref().and_then(cursor_from_next_url);
            if cursor.is_none() {
                break;
            }
        }

        Ok(expirations.into_iter().collect())
    }

    /// Snapshot of every contract for one expiry. Paginates automatically.
    pub async fn get_options_snapshot(
        &self,
        underlying: &str,
        expiration_date: &str,
    ) -> Result<Vec<OptionsContractSnapshot>, AnalysisError> {
        let url = format!("{}/v3/snapshot/options/{}", BASE_URL, underlying);
        let mut contracts = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut builder = self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("expiration_date", expiration_date),
                ("limit", "250"),
            ]);
            if let Some(ref c) = cursor {
                builder = builder.query(&[("cursor", c.as_str())]);
            }

            let body: OptionsSnapshotResponse = self
                .send_request(builder)
                .await?
                .json()
                .await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            contracts.extend(body.results.unwrap_or_default());

            cursor = body.next_url.as_deref().and_then(cursor_from_next_url);
            if cursor.is_none() {
                break;
            }
        }

        Ok(contracts)
    }
}

#[async_trait]
impl MarketDataProvider for PolygonClient {
    async fn fetch_history(&self, symbol: &str, period_days: i64) -> Result<Vec<Bar>, AnalysisError> {
        let to = Utc::now();
        let from = to - ChronoDuration::days(period_days);
        self.get_aggregates(symbol, 1, "day", from, to).await
    }

    async fn fetch_expiries(&self, symbol: &str) -> Result<Vec<String>, AnalysisError> {
        self.list_option_expirations(symbol).await
    }

    async fn fetch_option_chain(&self, symbol: &str, expiry: &str) -> Result<OptionChain, AnalysisError> {
        let snapshots = self.get_options_snapshot(symbol, expiry).await?;
        Ok(snapshots_to_chain(snapshots))
    }
}

/// Extract the `cursor` query parameter from a Polygon `next_url`.
fn cursor_from_next_url(next_url: &str) -> Option<String> {
    next_url
        .split("cursor=")
        .nth(1)
        .map(|s| s.split('&').next().unwrap_or(s).to_string())
        .filter(|c| !c.is_empty())
}

/// Split snapshots into calls and puts. Contracts without a type or strike are dropped.
pub fn snapshots_to_chain(snapshots: Vec<OptionsContractSnapshot>) -> OptionChain {
    let mut chain = OptionChain::default();

    for snapshot in snapshots {
        let Some(contract) = snapshot.into_contract() else {
            continue;
        };
        match contract.option_type {
            OptionType::Call => chain.calls.push(contract),
            OptionType::Put => chain.puts.push(contract),
        }
    }

    chain
}

// Response structures
#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

impl AggregateResponse {
    fn into_bars(self) -> Vec<Bar> {
        self.results
            .into_iter()
            .filter_map(|r| {
                Some(Bar {
                    timestamp: DateTime::from_timestamp_millis(r.t)?,
                    open: r.o,
                    high: r.h,
                    low: r.l,
                    close: r.c,
                    volume: r.v,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp
    o: f64, // open
    h: f64, // high
    l: f64, // low
    c: f64, // close
    v: f64, // volume
}

#[derive(Debug, Deserialize)]
struct ContractListResponse {
    #[serde(default)]
    results: Vec<ContractListEntry>,
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContractListEntry {
    #[serde(default)]
    expiration_date: Option<String>,
}

// Options types
#[derive(Debug, Deserialize)]
struct OptionsSnapshotResponse {
    results: Option<Vec<OptionsContractSnapshot>>,
    next_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsContractSnapshot {
    #[serde(default)]
    pub details: Option<OptionsDetails>,
    pub implied_volatility: Option<f64>,
    pub open_interest: Option<f64>,
    #[serde(default)]
    pub day: Option<OptionsDay>,
    #[serde(default)]
    pub last_quote: Option<OptionsQuote>,
    #[serde(default)]
    pub last_trade: Option<OptionsTrade>,
}

impl OptionsContractSnapshot {
    fn into_contract(self) -> Option<OptionContract> {
        let details = self.details?;
        let option_type = match details.contract_type.as_deref()? {
            "call" => OptionType::Call,
            "put" => OptionType::Put,
            other => {
                tracing::debug!("Skipping contract with type {}", other);
                return None;
            }
        };
        let strike = details.strike_price?;

        let day_close = self.day.as_ref().and_then(|d| d.close);
        let last_trade = self.last_trade.as_ref().and_then(|t| t.price);

        Some(OptionContract {
            contract_symbol: details.ticker,
            strike,
            last_price: day_close.or(last_trade).unwrap_or(0.0),
            bid: self.last_quote.as_ref().and_then(|q| q.bid),
            ask: self.last_quote.as_ref().and_then(|q| q.ask),
            volume: self.day.as_ref().and_then(|d| d.volume).unwrap_or(0.0),
            open_interest: self.open_interest.unwrap_or(0.0),
            implied_volatility: self.implied_volatility.unwrap_or(0.0),
            option_type,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsDetails {
    pub contract_type: Option<String>,
    pub strike_price: Option<f64>,
    pub expiration_date: Option<String>,
    pub ticker: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsDay {
    pub volume: Option<f64>,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsQuote {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsTrade {
    pub price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_from_next_url() {
        let url = "https://api.polygon.io/v3/snapshot/options/AAPL?cursor=YWJj&limit=250";
        assert_eq!(cursor_from_next_url(url), Some("YWJj".to_string()));
        assert_eq!(cursor_from_next_url("https://api.polygon.io/v3/x?limit=1"), None);
        assert_eq!(cursor_from_next_url("https://api.polygon.io/v3/x?cursor="), None);
    }

    #[test]
    fn test_aggregates_to_bars() {
        let body = r#"{"results":[
            {"t":1704153600000,"o":10.0,"h":11.0,"l":9.5,"c":10.5,"v":12000},
            {"t":1704240000000,"o":10.5,"h":12.0,"l":10.0,"c":11.5,"v":15000}
        ]}"#;
        let response: AggregateResponse = serde_json::from_str(body).unwrap();
        let bars = response.into_bars();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 11.5);
        assert_eq!(bars[1].volume, 15000.0);
        assert!(bars[0].timestamp < bars[1].timestamp);
    }

    #[test]
    fn test_empty_aggregates() {
        let response: AggregateResponse = serde_json::from_str(r#"{"status":"OK"}"#).unwrap();
        assert!(response.into_bars().is_empty());
    }

    #[test]
    fn test_snapshots_to_chain() {
        let body = r#"{"results":[
            {"details":{"contract_type":"call","strike_price":100.0,"expiration_date":"2025-01-17","ticker":"O:X250117C00100000"},
             "implied_volatility":0.32,"open_interest":1200,
             "day":{"volume":340,"close":4.1},
             "last_quote":{"bid":4.0,"ask":4.3}},
            {"details":{"contract_type":"put","strike_price":95.0,"expiration_date":"2025-01-17","ticker":"O:X250117P00095000"},
             "implied_volatility":0.35,"open_interest":800,
             "last_trade":{"price":2.2}},
            {"details":{"contract_type":"put","expiration_date":"2025-01-17"}},
            {"implied_volatility":0.3}
        ],"next_url":null}"#;
        let response: OptionsSnapshotResponse = serde_json::from_str(body).unwrap();
        let chain = snapshots_to_chain(response.results.unwrap());

        assert_eq!(chain.calls.len(), 1);
        assert_eq!(chain.puts.len(), 1);

        let call = &chain.calls[0];
        assert_eq!(call.strike, 100.0);
        assert_eq!(call.last_price, 4.1);
        assert_eq!(call.bid, Some(4.0));
        assert_eq!(call.ask, Some(4.3));
        assert_eq!(call.volume, 340.0);
        assert_eq!(call.open_interest, 1200.0);

        let put = &chain.puts[0];
        assert_eq!(put.last_price, 2.2);
        assert_eq!(put.volume, 0.0);
        assert_eq!(put.bid, None);
    }

    #[test]
    fn test_contract_list_expirations() {
        let body = r#"{"results":[
            {"expiration_date":"2025-02-21"},{"expiration_date":"2025-01-17"},
            {"expiration_date":"2025-01-17"},{}
        ],"next_url":"https://api.polygon.io/v3/reference/options/contracts?cursor=abc"}"#;
        let response: ContractListResponse = serde_json::from_str(body).unwrap();
        let expirations: BTreeSet<String> = response.results.into_iter().filter_map(|c| c.expiration_date).collect();

        assert_eq!(
            expirations.into_iter().collect::<Vec<_>>(),
            vec!["2025-01-17".to_string(), "2025-02-21".to_string()]
        );
        assert_eq!(response.next_url.as_deref().and_then(cursor_from_next_url), Some("abc".to_string()));
    }

    #[test]
    fn test_explicit_rate_limit() {
        let client = PolygonClient::with_rate_limit("key".to_string(), 5);
        assert_eq!(client.rate_limit(), 5);

        // zero would never admit a request
        let client = PolygonClient::with_rate_limit("key".to_string(), 0);
        assert_eq!(client.rate_limit(), 1);
    }

    #[tokio::test]
    #[ignore] // Only run with a valid POLYGON_API_KEY
    async fn test_fetch_history_live() {
        let client = PolygonClient::from_env().unwrap();
        let bars = client.fetch_history("AAPL", 90).await.unwrap();
        assert!(bars.len() >= 50);
    }
}
