//! Expected-return and covariance estimation from a price history.
//!
//! Periodic returns are simple (`p[t] / p[t-1] - 1`) and defined only where
//! both prices are quoted. Covariance is pairwise over the rows where both
//! assets have a return, so partial gaps never discard a whole row.

use log::warn;
use nalgebra::{Cholesky, DMatrix, DVector};

use crate::error::{Error, Result};
use crate::prices::PriceHistory;
use crate::types::{Frequency, Symbol};

/// How expected returns are estimated from historical returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ReturnEstimator {
    /// Geometric: `(prod(1 + r))^(periods_per_year / count) - 1`.
    #[default]
    CompoundedMean,
    /// Arithmetic: `mean(r) * periods_per_year`.
    ArithmeticMean,
}

/// Annualized return statistics for a fixed, ordered set of assets.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReturnStatistics {
    pub symbols: Vec<Symbol>,
    pub expected_returns: DVector<f64>,
    pub covariance: DMatrix<f64>,
    pub periods_per_year: f64,
    /// Rows of periodic returns with at least one valid value.
    pub observations: usize,
}

impl ReturnStatistics {
    /// Estimate statistics from a price history.
    pub fn derive(
        prices: &PriceHistory,
        estimator: ReturnEstimator,
        frequency: Frequency,
    ) -> Result<Self> {
        let periods_per_year = frequency.periods_per_year();
        let returns = periodic_returns(prices);
        let n = prices.num_assets();

        let mut expected = DVector::zeros(n);
        for (j, sym) in prices.symbols().iter().enumerate() {
            let col: Vec<f64> = returns.iter().filter_map(|row| row[j]).collect();
            if col.len() < 2 {
                return Err(Error::InsufficientData(format!(
                    "{sym} has {} periodic returns, need at least 2",
                    col.len()
                )));
            }
            expected[j] = match estimator {
                ReturnEstimator::CompoundedMean => {
                    let growth = col.iter().fold(1.0_f64, |acc, r| acc * (1.0 + r));
                    growth.powf(periods_per_year / col.len() as f64) - 1.0
                }
                ReturnEstimator::ArithmeticMean => {
                    col.iter().sum::<f64>() / col.len() as f64 * periods_per_year
                }
            };
        }

        let mut cov = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in i..n {
                let v = pairwise_covariance(&returns, i, j).ok_or_else(|| {
                    Error::InsufficientData(format!(
                        "{} and {} share fewer than 2 returns",
                        prices.symbols()[i],
                        prices.symbols()[j]
                    ))
                })? * periods_per_year;
                cov[(i, j)] = v;
                cov[(j, i)] = v;
            }
        }

        if expected.iter().chain(cov.iter()).any(|x| !x.is_finite()) {
            return Err(Error::InsufficientData(
                "return statistics are not finite".into(),
            ));
        }

        let observations = returns
            .iter()
            .filter(|row| row.iter().any(Option::is_some))
            .count();

        // m return rows give a sample covariance of rank at most m - 1.
        if n > 1 && observations <= n {
            return Err(Error::InsufficientData(format!(
                "{observations} return observations for {n} assets; covariance is rank-deficient"
            )));
        }

        let mut zero_variance = false;
        for (j, sym) in prices.symbols().iter().enumerate() {
            if cov[(j, j)] <= 0.0 {
                warn!("{sym} has zero return variance; covariance matrix is singular");
                zero_variance = true;
            }
        }
        if !zero_variance && n > 1 && Cholesky::new(cov.clone()).is_none() {
            warn!("covariance matrix is not positive definite; some assets are collinear");
        }

        Ok(Self {
            symbols: prices.symbols().to_vec(),
            expected_returns: expected,
            covariance: cov,
            periods_per_year,
            observations,
        })
    }

    /// Build statistics directly from annualized estimates.
    ///
    /// The covariance must be square, symmetric, and match the return vector.
    pub fn from_parts(
        symbols: Vec<Symbol>,
        expected_returns: DVector<f64>,
        covariance: DMatrix<f64>,
        periods_per_year: f64,
    ) -> Result<Self> {
        let stats = Self {
            symbols,
            expected_returns,
            covariance,
            periods_per_year,
            observations: 0,
        };
        stats.validate()?;
        Ok(stats)
    }

    /// Check that the fields describe one consistent set of assets.
    ///
    /// The fields are public, so the optimizer and the sampler re-run this
    /// before touching the matrices.
    pub fn validate(&self) -> Result<()> {
        let n = self.symbols.len();
        if n == 0 {
            return Err(Error::InsufficientData("no assets".into()));
        }
        if self.expected_returns.len() != n || self.covariance.shape() != (n, n) {
            return Err(Error::InvalidParameter(format!(
                "dimension mismatch: {n} symbols, {} returns, {:?} covariance",
                self.expected_returns.len(),
                self.covariance.shape()
            )));
        }
        if self
            .expected_returns
            .iter()
            .chain(self.covariance.iter())
            .any(|x| !x.is_finite())
        {
            return Err(Error::InvalidParameter("statistics must be finite".into()));
        }
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (self.covariance[(i, j)], self.covariance[(j, i)]);
                if (a - b).abs() > 1e-12 * a.abs().max(b.abs()).max(1.0) {
                    return Err(Error::InvalidParameter("covariance is not symmetric".into()));
                }
            }
        }
        Ok(())
    }

    pub fn num_assets(&self) -> usize {
        self.symbols.len()
    }

    /// Annualized volatility of each asset.
    pub fn volatilities(&self) -> DVector<f64> {
        self.covariance.diagonal().map(|v| v.max(0.0).sqrt())
    }
}

/// Simple returns, row-aligned with `prices.rows()[1..]`.
fn periodic_returns(prices: &PriceHistory) -> Vec<Vec<Option<f64>>> {
    prices
        .rows()
        .windows(2)
        .map(|w| {
            w[0].iter()
                .zip(&w[1])
                .map(|(prev, cur)| match (prev, cur) {
                    (Some(p0), Some(p1)) => Some(p1 / p0 - 1.0),
                    _ => None,
                })
                .collect()
        })
        .collect()
}

/// Sample covariance (n - 1 denominator) over rows where both columns are present.
fn pairwise_covariance(returns: &[Vec<Option<f64>>], i: usize, j: usize) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = returns
        .iter()
        .filter_map(|row| Some((row[i]?, row[j]?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let sum: f64 = pairs
        .iter()
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    Some(sum / (n - 1.0))
}
