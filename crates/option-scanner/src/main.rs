//! option-scanner: scan a watchlist for Supertrend/RSI/volume signals and pick an
//! option contract on the top-ranked symbol.
//!
//! Usage:
//!   cargo run -p option-scanner
//!   cargo run -p option-scanner -- --strategy cash-secured-put --expiry 2025-01-30
//!   cargo run -p option-scanner -- --symbols RELIANCE.NS TCS.NS --top 3 --json

use analysis_core::{display_symbol, AnalysisError, MarketDataProvider};
use analysis_orchestrator::{CachedProvider, OptionRecommendation, PipelineReport, ScanPipeline};
use options_ranker::Strategy;
use polygon_client::PolygonClient;
use watchlist_scanner::{default_watchlist, ScanConfig, WatchlistScanner};
use yahoo_client::YahooClient;

const DEFAULT_TOP: usize = 5;
const DEFAULT_HISTORY_DAYS: i64 = 90;
const DEFAULT_POLYGON_RATE_LIMIT: usize = 5;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "option_scanner=info,watchlist_scanner=info,analysis_orchestrator=info,polygon_client=warn,yahoo_client=warn".into()
            }),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let json = args.iter().any(|a| a == "--json");

    let strategy: Strategy = match flag_value(&args, "--strategy") {
        Some(s) => s.parse()?,
        None => Strategy::LongCall,
    };
    let expiry = flag_value(&args, "--expiry");
    let top: usize = match flag_value(&args, "--top") {
        Some(v) => v
            .parse()
            .map_err(|_| anyhow::anyhow!("--top expects a number, got '{}'", v))?,
        None => DEFAULT_TOP,
    };

    let symbols = if let Some(idx) = args.iter().position(|a| a == "--symbols") {
        split_symbols(args[idx + 1..].iter().take_while(|a| !a.starts_with("--")))
    } else if let Ok(list) = std::env::var("WATCHLIST") {
        split_symbols(std::iter::once(&list))
    } else {
        default_watchlist()
    };
    if symbols.is_empty() {
        anyhow::bail!("watchlist is empty");
    }

    let period_days: i64 = std::env::var("HISTORY_DAYS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_HISTORY_DAYS);

    let source = choose_source(std::env::var("POLYGON_API_KEY").ok(), &symbols);
    tracing::info!(
        "option-scanner: {} symbols via {}, strategy={}, expiry={}, history={}d",
        symbols.len(),
        source.name(),
        strategy,
        expiry.unwrap_or("nearest"),
        period_days
    );

    let scanner = WatchlistScanner::with_watchlist(symbols).with_config(ScanConfig {
        period_days,
        ..ScanConfig::default()
    });
    let alternatives = top.saturating_sub(1);

    match source {
        DataSource::Polygon(api_key) => {
            // Free-tier Polygon keys allow 5 requests per minute.
            let rate_limit: usize = std::env::var("POLYGON_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_POLYGON_RATE_LIMIT);
            let provider = CachedProvider::new(PolygonClient::with_rate_limit(api_key, rate_limit));
            execute(ScanPipeline::new(provider, scanner).with_alternatives(alternatives), strategy, expiry, json).await
        }
        DataSource::Yahoo => {
            let provider = CachedProvider::new(YahooClient::new());
            execute(ScanPipeline::new(provider, scanner).with_alternatives(alternatives), strategy, expiry, json).await
        }
    }
}

/// Where market data comes from
#[derive(Debug, PartialEq)]
enum DataSource {
    Polygon(String),
    Yahoo,
}

impl DataSource {
    fn name(&self) -> &'static str {
        match self {
            DataSource::Polygon(_) => "Polygon",
            DataSource::Yahoo => "Yahoo Finance",
        }
    }
}

/// Polygon only serves US tickers, so any exchange-qualified symbol or a
/// missing API key falls back to Yahoo.
fn choose_source(api_key: Option<String>, symbols: &[String]) -> DataSource {
    let all_us = symbols.iter().all(|s| display_symbol(s) == s.as_str());
    match api_key.filter(|k| !k.trim().is_empty()) {
        Some(key) if all_us => DataSource::Polygon(key),
        _ => DataSource::Yahoo,
    }
}

async fn execute<P: MarketDataProvider>(
    pipeline: ScanPipeline<P>,
    strategy: Strategy,
    expiry: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let report = match pipeline.run(strategy, expiry).await {
        Ok(report) => report,
        Err(AnalysisError::EmptyScanResult) => {
            println!("No signals: every symbol was skipped");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&to_json(&report))?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Value following a `--flag`
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .filter(|v| !v.starts_with("--"))
        .map(|s| s.as_str())
}

/// Accepts both `A B C` and `A,B,C`
fn split_symbols<'a>(raw: impl Iterator<Item = &'a String>) -> Vec<String> {
    raw.flat_map(|s| s.split(','))
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn to_json(report: &PipelineReport) -> serde_json::Value {
    let (recommendation, error) = match &report.recommendation {
        Ok(rec) => (serde_json::to_value(rec).ok(), None),
        Err(e) => (None, Some(e.to_string())),
    };
    serde_json::json!({
        "signal_count": report.scan.signals().count(),
        "results": report.scan.results,
        "failures": report.scan.failures,
        "recommendation": recommendation,
        "recommendation_error": error,
    })
}

fn print_report(report: &PipelineReport) {
    println!(
        "{:<14} {:>10} {:>7} {:>6} {:>8} {:<11} {:>6}",
        "SYMBOL", "CLOSE", "RSI", "TREND", "VOL x", "SIGNAL", "SCORE"
    );
    for r in &report.scan.results {
        println!(
            "{:<14} {:>10.2} {:>7.1} {:>6} {:>8.2} {:<11} {:>6.1}",
            r.display_symbol,
            r.close_price,
            r.rsi,
            r.trend_direction.to_label(),
            r.volume_surge_ratio.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v)),
            r.signal.to_label(),
            r.score
        );
    }
    println!(
        "{} of {} symbols signalled",
        report.scan.signals().count(),
        report.scan.results.len()
    );
    for f in &report.scan.failures {
        println!("  skipped {}: {}", f.symbol, f.reason);
    }
    println!();

    match &report.recommendation {
        Ok(rec) => print_recommendation(rec),
        Err(e) => println!("No option recommendation: {}", e),
    }
}

fn print_recommendation(rec: &OptionRecommendation) {
    let best = &rec.best;
    println!(
        "Top pick {} ({}) at {:.2}: {} {} expiring {}",
        rec.display_symbol,
        rec.signal.to_label(),
        rec.spot_price,
        rec.strategy,
        best.contract.option_type.to_label(),
        rec.expiry
    );
    if let Some(symbol) = &best.contract.contract_symbol {
        println!("  contract   {}", symbol);
    }
    println!("  strike     {:.2}", best.contract.strike);
    println!("  premium    {:.2}", best.smoothed_premium);
    println!("  IV         {:.1}%", best.contract.implied_volatility * 100.0);
    println!("  volume     {:.0} (OI {:.0})", best.contract.volume, best.contract.open_interest);
    println!("  breakeven  {:.2}", rec.breakeven);
    println!("  score      {:.2}", best.strategy_score);

    if !rec.alternatives.is_empty() {
        println!("  alternatives:");
        for alt in &rec.alternatives {
            println!(
                "    strike {:>10.2}  premium {:>8.2}  IV {:>5.1}%  score {:.2}",
                alt.contract.strike,
                alt.smoothed_premium,
                alt.contract.implied_volatility * 100.0,
                alt.strategy_score
            );
        }
    }
}

fn print_usage() {
    println!("Usage:");
    println!("  option-scanner [--strategy S] [--expiry YYYY-MM-DD] [--symbols A B ...] [--top N] [--json]");
    println!();
    println!("Options:");
    println!("  --strategy S     long-call (default), long-put or cash-secured-put");
    println!("  --expiry DATE    Option expiry to rank (default: nearest listed)");
    println!("  --symbols ...    Symbols to scan (default: WATCHLIST or built-in NSE list)");
    println!("  --top N          Ranked contracts to show (default: {})", DEFAULT_TOP);
    println!("  --json           Print JSON instead of a table");
    println!();
    println!("Environment:");
    println!("  POLYGON_API_KEY     use Polygon for US tickers (otherwise Yahoo Finance)");
    println!("  POLYGON_RATE_LIMIT  requests per minute (default: 5)");
    println!("  WATCHLIST           comma-separated symbols");
    println!("  HISTORY_DAYS        calendar days of history (default: {})", DEFAULT_HISTORY_DAYS);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flag_value() {
        let a = args(&["option-scanner", "--strategy", "csp", "--json", "--top"]);
        assert_eq!(flag_value(&a, "--strategy"), Some("csp"));
        assert_eq!(flag_value(&a, "--expiry"), None);
        assert_eq!(flag_value(&a, "--top"), None);
    }

    #[test]
    fn test_split_symbols() {
        let a = args(&["tcs.ns,ITC.NS", "SBIN.NS", ""]);
        assert_eq!(split_symbols(a.iter()), vec!["TCS.NS", "ITC.NS", "SBIN.NS"]);
    }

    #[test]
    fn test_choose_source() {
        let us = args(&["AAPL", "BRK.B"]);
        let nse = default_watchlist();
        let mixed = args(&["AAPL", "TCS.NS"]);
        let key = || Some("key".to_string());

        assert_eq!(choose_source(key(), &us), DataSource::Polygon("key".to_string()));
        assert_eq!(choose_source(key(), &nse), DataSource::Yahoo);
        assert_eq!(choose_source(key(), &mixed), DataSource::Yahoo);
        assert_eq!(choose_source(None, &us), DataSource::Yahoo);
        assert_eq!(choose_source(Some(" ".to_string()), &us), DataSource::Yahoo);
    }
}
