use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use crate::external::price_provider::{DailyClose, PriceProvider, PriceProviderError};

pub struct YahooProvider {
    client: reqwest::Client,
}

impl YahooProvider {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

// Minimal response structs (only what we need)
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    #[allow(dead_code)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    close: Vec<Option<f64>>,
}

#[async_trait]
impl PriceProvider for YahooProvider {
    async fn fetch_daily_closes(
        &self,
        symbol: &str,
        trading_days: u32,
    ) -> Result<Vec<DailyClose>, PriceProviderError> {
        // Yahoo supports ranges like "6mo", "1y". Map trading days roughly.
        let range = if trading_days <= 21 { "1mo" }
        else if trading_days <= 63 { "3mo" }
        else if trading_days <= 126 { "6mo" }
        else if trading_days <= 252 { "1y" }
        else { "2y" };

        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{symbol}?range={range}&interval=1d"
        );

        let resp = self.client
            .get(url)
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceProviderError::RateLimited);
        }

        let body = resp
            .json::<YahooChartResponse>()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        let result = body.chart.result
            .and_then(|mut r| r.pop())
            .ok_or_else(|| PriceProviderError::BadResponse("missing result".into()))?;

        // timestamp aligns with close list by index
        let closes = result.indicators.quote
            .first()
            .ok_or_else(|| PriceProviderError::BadResponse("missing quote".into()))?
            .close
            .clone();

        let mut out = Vec::new();

        for (i, ts) in result.timestamp.iter().enumerate() {
            let close = closes.get(i).and_then(|v| *v);

            // skip missing closes
            let Some(close) = close else { continue };

            let dt = DateTime::from_timestamp(*ts, 0)
                .ok_or_else(|| PriceProviderError::Parse("bad timestamp".into()))?;

            out.push(DailyClose {
                date: dt.date_naive(),
                close,
            });
        }

        // Ensure ascending by date
        out.sort_by_key(|p| p.date);

        Ok(out)
    }
}
