//! Price history: the rectangular table every optimization starts from.

use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::types::{Symbol, Timestamp};

/// Per-asset prices aligned on a common, strictly ascending time axis.
///
/// Cells are `None` where an asset has no quote. Rows missing for *every*
/// asset are dropped on construction; partial gaps are kept and handled by
/// return estimation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriceHistory {
    timestamps: Vec<Timestamp>,
    symbols: Vec<Symbol>,
    rows: Vec<Vec<Option<f64>>>,
}

impl PriceHistory {
    /// Build a history from row-major data (`rows[t][asset]`).
    ///
    /// Fails with [`Error::InsufficientData`] when fewer than two rows or no
    /// assets remain after trimming.
    pub fn new(
        timestamps: Vec<Timestamp>,
        symbols: Vec<Symbol>,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        if symbols.is_empty() {
            return Err(Error::InsufficientData("price history has no assets".into()));
        }

        let mut seen = FxHashSet::default();
        for sym in &symbols {
            if sym.is_empty() {
                return Err(Error::InvalidParameter("empty asset symbol".into()));
            }
            if !seen.insert(sym) {
                return Err(Error::InvalidParameter(format!("duplicate asset: {sym}")));
            }
        }

        if timestamps.len() != rows.len() {
            return Err(Error::InvalidParameter(format!(
                "{} timestamps for {} rows",
                timestamps.len(),
                rows.len()
            )));
        }
        if timestamps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidParameter(
                "timestamps must be strictly ascending".into(),
            ));
        }

        for row in &rows {
            if row.len() != symbols.len() {
                return Err(Error::InvalidParameter(format!(
                    "row has {} cells, expected {}",
                    row.len(),
                    symbols.len()
                )));
            }
            for (sym, cell) in symbols.iter().zip(row) {
                if let Some(price) = *cell {
                    if !price.is_finite() || price <= 0.0 {
                        return Err(Error::InvalidPrice {
                            symbol: sym.clone(),
                            price,
                        });
                    }
                }
            }
        }

        let (timestamps, rows): (Vec<_>, Vec<_>) = timestamps
            .into_iter()
            .zip(rows)
            .filter(|(_, row)| row.iter().any(Option::is_some))
            .unzip();

        if rows.len() < 2 {
            return Err(Error::InsufficientData(format!(
                "need at least 2 priced rows, got {}",
                rows.len()
            )));
        }

        Ok(Self {
            timestamps,
            symbols,
            rows,
        })
    }

    /// Build a history from per-asset columns sharing one time axis.
    pub fn from_columns(
        timestamps: Vec<Timestamp>,
        columns: Vec<(Symbol, Vec<Option<f64>>)>,
    ) -> Result<Self> {
        let n_rows = timestamps.len();
        if let Some((sym, col)) = columns.iter().find(|(_, c)| c.len() != n_rows) {
            return Err(Error::InvalidParameter(format!(
                "column {sym} has {} values, expected {n_rows}",
                col.len()
            )));
        }

        let mut rows = vec![Vec::with_capacity(columns.len()); n_rows];
        for (_, col) in &columns {
            for (row, cell) in rows.iter_mut().zip(col) {
                row.push(*cell);
            }
        }
        let symbols = columns.into_iter().map(|(sym, _)| sym).collect();
        Self::new(timestamps, symbols, rows)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.rows
    }

    /// Number of time points.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false: construction rejects histories with fewer than two rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_assets(&self) -> usize {
        self.symbols.len()
    }

    /// Prices of one asset over time.
    pub fn column(&self, asset: usize) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(move |row| row[asset])
    }

    /// Last quoted price per asset (forward-filled to the final row).
    ///
    /// Assets that were never quoted are omitted.
    pub fn latest_prices(&self) -> Vec<(Symbol, f64)> {
        self.symbols
            .iter()
            .enumerate()
            .filter_map(|(j, sym)| {
                self.rows
                    .iter()
                    .rev()
                    .find_map(|row| row[j])
                    .map(|p| (sym.clone(), p))
            })
            .collect()
    }

    /// Restrict to the given assets, in the order requested.
    ///
    /// Unknown symbols are skipped; an empty selection is an error.
    pub fn select(&self, wanted: &[Symbol]) -> Result<Self> {
        let picks: Vec<usize> = wanted
            .iter()
            .filter_map(|w| self.symbols.iter().position(|s| s == w))
            .collect();

        if picks.is_empty() {
            return Err(Error::DataUnavailable(
                "none of the requested assets are in the price history".into(),
            ));
        }

        let symbols = picks.iter().map(|&j| self.symbols[j].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| picks.iter().map(|&j| row[j]).collect())
            .collect();
        Self::new(self.timestamps.clone(), symbols, rows)
    }
}
