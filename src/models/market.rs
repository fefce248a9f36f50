use chrono::NaiveDate;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Whether a price matrix came from the live provider or from the seeded
/// synthetic generator used when the provider fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataProvenance {
    Live,
    Synthetic,
}

/// Aligned table of daily closes across all requested symbols.
///
/// Rows are dates (ascending), columns follow request order. Alignment is an
/// inner join on dates, so there are no missing cells.
#[derive(Debug, Clone)]
pub struct PriceMatrix {
    pub symbols: Vec<String>,
    pub dates: Vec<NaiveDate>,
    /// rows = dates, cols = symbols
    pub closes: Array2<f64>,
    pub provenance: DataProvenance,
}

impl PriceMatrix {
    pub fn num_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }
}
