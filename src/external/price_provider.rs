use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,
}

/// Historical-price collaborator consumed by the data adapter.
///
/// Implementations return daily adjusted closes in ascending date order.
/// Failures are recovered locally by the adapter's synthetic fallback,
/// never surfaced to the caller.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_daily_closes(
        &self,
        symbol: &str,
        trading_days: u32,
    ) -> Result<Vec<DailyClose>, PriceProviderError>;
}
