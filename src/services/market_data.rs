use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::external::price_provider::PriceProvider;
use crate::models::{DataProvenance, PriceMatrix};

/// Minimum aligned rows required for downstream statistics to be meaningful.
/// Fewer observations make the covariance estimate degenerate.
pub const MIN_PRICE_ROWS: usize = 20;

/// Fixed seed for the synthetic fallback generator. Not symbol-dependent:
/// fallback series are reproducible for any run with the same symbol count.
const SYNTHETIC_SEED: u64 = 42;
const SYNTHETIC_ROWS: usize = 252;
const SYNTHETIC_BASE_PRICE: f64 = 100.0;
const SYNTHETIC_DAILY_MEAN: f64 = 0.001;
const SYNTHETIC_DAILY_STD: f64 = 0.02;

/// Map a lookback period string to a trading-day count.
pub fn period_to_trading_days(period: &str) -> Result<u32, EngineError> {
    match period {
        "1mo" => Ok(21),
        "3mo" => Ok(63),
        "6mo" => Ok(126),
        "1y" => Ok(252),
        "2y" => Ok(504),
        other => Err(EngineError::InvalidRequest(format!(
            "Unsupported period '{}'. Expected one of: 1mo, 3mo, 6mo, 1y, 2y",
            other
        ))),
    }
}

pub fn validate_symbols(symbols: &[String], max_symbols: usize) -> Result<(), EngineError> {
    if symbols.is_empty() {
        return Err(EngineError::InvalidRequest(
            "At least one symbol is required".to_string(),
        ));
    }
    if symbols.len() > max_symbols {
        return Err(EngineError::InvalidRequest(format!(
            "Too many symbols: {} (maximum {})",
            symbols.len(),
            max_symbols
        )));
    }
    let mut seen = HashSet::new();
    for symbol in symbols {
        if symbol.trim().is_empty() {
            return Err(EngineError::InvalidRequest(
                "Symbols must be non-empty".to_string(),
            ));
        }
        if !seen.insert(symbol.as_str()) {
            return Err(EngineError::InvalidRequest(format!(
                "Duplicate symbol: {}",
                symbol
            )));
        }
    }
    Ok(())
}

/// Fetch an aligned daily close matrix for the requested symbols.
///
/// Requests the external provider first; on any failure (network error,
/// unknown symbol, empty or insufficient data) falls back to the seeded
/// synthetic generator so the rest of the pipeline always receives a usable
/// matrix. The fallback is logged and tagged via `DataProvenance`.
pub async fn fetch_price_matrix(
    provider: &dyn PriceProvider,
    symbols: &[String],
    period: &str,
    config: &EngineConfig,
) -> Result<PriceMatrix, EngineError> {
    validate_symbols(symbols, config.max_symbols)?;
    let trading_days = period_to_trading_days(period)?;

    match fetch_live(provider, symbols, trading_days).await {
        Ok(matrix) => {
            info!(
                "Fetched {} aligned price rows for {} symbols over {}",
                matrix.num_rows(),
                matrix.num_symbols(),
                period
            );
            Ok(matrix)
        }
        Err(e) => {
            warn!(
                "Market data provider failed ({}); falling back to synthetic price data",
                e
            );
            let matrix = synthetic_matrix(symbols)?;
            if matrix.num_rows() < MIN_PRICE_ROWS {
                return Err(EngineError::DataUnavailable(format!(
                    "Only {} usable price rows after fallback (need at least {})",
                    matrix.num_rows(),
                    MIN_PRICE_ROWS
                )));
            }
            Ok(matrix)
        }
    }
}

async fn fetch_live(
    provider: &dyn PriceProvider,
    symbols: &[String],
    trading_days: u32,
) -> Result<PriceMatrix, EngineError> {
    let mut per_symbol: Vec<BTreeMap<NaiveDate, f64>> = Vec::with_capacity(symbols.len());

    for symbol in symbols {
        let closes = provider.fetch_daily_closes(symbol, trading_days).await?;
        if closes.is_empty() {
            return Err(EngineError::DataUnavailable(format!(
                "Provider returned no data for {}",
                symbol
            )));
        }
        // Last write wins on duplicate dates
        let series: BTreeMap<NaiveDate, f64> =
            closes.into_iter().map(|p| (p.date, p.close)).collect();
        per_symbol.push(series);
    }

    // Inner join on dates: keep only rows present for every symbol
    let dates: Vec<NaiveDate> = per_symbol[0]
        .keys()
        .filter(|date| per_symbol[1..].iter().all(|s| s.contains_key(*date)))
        .copied()
        .collect();

    if dates.len() < MIN_PRICE_ROWS {
        return Err(EngineError::DataUnavailable(format!(
            "Only {} aligned price rows across {} symbols (need at least {})",
            dates.len(),
            symbols.len(),
            MIN_PRICE_ROWS
        )));
    }

    let mut closes = Array2::zeros((dates.len(), symbols.len()));
    for (row, date) in dates.iter().enumerate() {
        for (col, series) in per_symbol.iter().enumerate() {
            // Present by construction of the inner join
            if let Some(&price) = series.get(date) {
                closes[[row, col]] = price;
            }
        }
    }

    Ok(PriceMatrix {
        symbols: symbols.to_vec(),
        dates,
        closes,
        provenance: DataProvenance::Live,
    })
}

/// Deterministic synthetic fallback: seeded normal daily log-returns
/// compounded from a fixed base price, one independent series per symbol.
pub fn synthetic_matrix(symbols: &[String]) -> Result<PriceMatrix, EngineError> {
    let normal = Normal::new(SYNTHETIC_DAILY_MEAN, SYNTHETIC_DAILY_STD)
        .map_err(|e| EngineError::DataUnavailable(format!("synthetic generator: {}", e)))?;
    let mut rng = StdRng::seed_from_u64(SYNTHETIC_SEED);

    let mut closes = Array2::zeros((SYNTHETIC_ROWS, symbols.len()));
    for col in 0..symbols.len() {
        let mut price = SYNTHETIC_BASE_PRICE;
        for row in 0..SYNTHETIC_ROWS {
            let log_return: f64 = normal.sample(&mut rng);
            price *= log_return.exp();
            closes[[row, col]] = price;
        }
    }

    Ok(PriceMatrix {
        symbols: symbols.to_vec(),
        dates: trailing_weekdays(SYNTHETIC_ROWS),
        closes,
        provenance: DataProvenance::Synthetic,
    })
}

/// The most recent `count` weekdays, ascending.
fn trailing_weekdays(count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut day = Utc::now().date_naive();
    while dates.len() < count {
        if day.weekday() != Weekday::Sat && day.weekday() != Weekday::Sun {
            dates.push(day);
        }
        day -= Duration::days(1);
    }
    dates.reverse();
    dates
}
