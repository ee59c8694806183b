//! Weight vectors and the weight-cleaning policy.

use std::fmt;

use nalgebra::DVector;

use crate::error::{Error, Result};
use crate::types::Symbol;

/// Tolerance on `sum(weights) == 1` for a feasible portfolio.
pub const SUM_TOLERANCE: f64 = 1e-6;

/// Ordered (symbol, weight) pairs, in the asset order of the statistics that produced them.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightVector {
    entries: Vec<(Symbol, f64)>,
}

impl WeightVector {
    /// Wrap weights without checking feasibility.
    pub fn new(entries: Vec<(Symbol, f64)>) -> Self {
        Self { entries }
    }

    /// Pair symbols with a raw weight vector.
    pub fn from_vector(symbols: &[Symbol], weights: &DVector<f64>) -> Self {
        Self {
            entries: symbols.iter().cloned().zip(weights.iter().copied()).collect(),
        }
    }

    /// Check the long-only, fully-invested invariant.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::InvalidParameter("weight vector is empty".into()));
        }
        if let Some((sym, w)) = self
            .entries
            .iter()
            .find(|(_, w)| !w.is_finite() || *w < -SUM_TOLERANCE)
        {
            return Err(Error::InvalidParameter(format!(
                "weight for {sym} is {w}; long-only weights must be >= 0"
            )));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(Error::InvalidParameter(format!(
                "weights sum to {sum:.8}, expected 1"
            )));
        }
        Ok(())
    }

    pub fn entries(&self) -> &[(Symbol, f64)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, f64)> {
        self.entries.iter().map(|(s, w)| (s, *w))
    }

    pub fn get(&self, symbol: &Symbol) -> Option<f64> {
        self.entries.iter().find(|(s, _)| s == symbol).map(|(_, w)| *w)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    /// Raw weights in entry order.
    pub fn to_vector(&self) -> DVector<f64> {
        DVector::from_iterator(self.entries.len(), self.entries.iter().map(|(_, w)| *w))
    }

    /// Entries sorted by weight, largest first (ties keep entry order).
    pub fn sorted_desc(&self) -> Vec<(Symbol, f64)> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        sorted
    }
}

impl fmt::Display for WeightVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  {:<10} {:>8}", "Ticker", "Weight")?;
        for (sym, w) in self.sorted_desc() {
            writeln!(f, "  {:<10} {:>7.2}%", sym.as_str(), w * 100.0)?;
        }
        Ok(())
    }
}

/// Parameters of [`clean_weights`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CleanPolicy {
    /// Weights with magnitude below this are zeroed.
    pub cutoff: f64,
    /// Decimal places kept.
    pub rounding: u32,
}

impl Default for CleanPolicy {
    fn default() -> Self {
        Self {
            cutoff: 1e-4,
            rounding: 4,
        }
    }
}

/// Remove dust from optimizer output.
///
/// Zeroes weights below `cutoff`, rounds to `rounding` decimals, then
/// renormalizes so the result sums to 1. Negative dust from the solver is
/// clamped to zero. If everything would be zeroed, the input is returned
/// renormalized instead.
pub fn clean_weights(weights: &WeightVector, policy: CleanPolicy) -> WeightVector {
    let scale = 10_f64.powi(policy.rounding as i32);
    let cleaned: Vec<(Symbol, f64)> = weights
        .entries
        .iter()
        .map(|(s, w)| {
            let w = if !w.is_finite() || w.abs() < policy.cutoff {
                0.0
            } else {
                (w * scale).round() / scale
            };
            (s.clone(), w.max(0.0))
        })
        .collect();

    let sum: f64 = cleaned.iter().map(|(_, w)| w).sum();
    if sum <= 0.0 {
        let raw_sum: f64 = weights.entries.iter().map(|(_, w)| w.max(0.0)).sum();
        if raw_sum <= 0.0 {
            return weights.clone();
        }
        return WeightVector::new(
            weights
                .entries
                .iter()
                .map(|(s, w)| (s.clone(), w.max(0.0) / raw_sum))
                .collect(),
        );
    }

    WeightVector::new(cleaned.into_iter().map(|(s, w)| (s, w / sum)).collect())
}
