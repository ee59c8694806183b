//! Price file (prices.json) loading.
//!
//! ```json
//! {
//!   "dates": ["2024-01-02", "2024-01-03"],
//!   "prices": { "AAPL": [185.2, null], "MSFT": [370.9, 372.1] }
//! }
//! ```
//!
//! `null` marks a missing quote. Columns are read in ticker order.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use log::warn;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use nanofolio::{PriceHistory, Symbol, Timestamp};

use crate::error::{Error, Result};

/// Aligned daily closes as supplied by the data collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceFile {
    pub dates: Vec<NaiveDate>,
    pub prices: BTreeMap<String, Vec<Option<f64>>>,
}

impl PriceFile {
    /// Load and validate a price file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::PricesRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: PriceFile = serde_json::from_str(json)?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> Result<()> {
        if self.dates.is_empty() || self.prices.is_empty() {
            return Err(nanofolio::Error::DataUnavailable("price file is empty".into()).into());
        }
        for (ticker, column) in &self.prices {
            if column.len() != self.dates.len() {
                return Err(Error::Prices(format!(
                    "{ticker} has {} prices for {} dates",
                    column.len(),
                    self.dates.len()
                )));
            }
        }
        Ok(())
    }

    /// Build a [`PriceHistory`], keeping only `tickers` when given.
    ///
    /// Requested tickers missing from the file, and columns with no prices
    /// at all, are dropped with a warning. Rows are sorted by date.
    pub fn into_history(self, tickers: Option<&[Symbol]>) -> Result<PriceHistory> {
        let mut columns: Vec<(Symbol, Vec<Option<f64>>)> = self
            .prices
            .into_iter()
            .map(|(ticker, column)| (Symbol::new(&ticker), column))
            .collect();

        if let Some(wanted) = tickers {
            let available: FxHashSet<&Symbol> = columns.iter().map(|(s, _)| s).collect();
            for sym in wanted.iter().filter(|s| !available.contains(s)) {
                warn!("{sym} not found in price file; skipping");
            }
            let mut picked = Vec::with_capacity(wanted.len());
            for sym in wanted {
                if let Some(pos) = columns.iter().position(|(s, _)| s == sym) {
                    picked.push(columns.swap_remove(pos));
                }
            }
            columns = picked;
        }

        columns.retain(|(sym, column)| {
            let any = column.iter().any(Option::is_some);
            if !any {
                warn!("{sym} has no prices; skipping");
            }
            any
        });

        if columns.is_empty() {
            return Err(nanofolio::Error::DataUnavailable(
                "no requested ticker has price data".into(),
            )
            .into());
        }

        let mut order: Vec<usize> = (0..self.dates.len()).collect();
        order.sort_by_key(|&i| self.dates[i]);

        let timestamps: Vec<Timestamp> = order.iter().map(|&i| to_timestamp(self.dates[i])).collect();
        let columns = columns
            .into_iter()
            .map(|(sym, column)| (sym, order.iter().map(|&i| column[i]).collect()))
            .collect();

        Ok(PriceHistory::from_columns(timestamps, columns)?)
    }
}

/// Days since 0001-01-01.
fn to_timestamp(date: NaiveDate) -> Timestamp {
    Timestamp::from(date.num_days_from_ce())
}
