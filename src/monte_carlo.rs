//! Monte Carlo search over random long-only portfolios.
//!
//! Each trial draws one uniform [0, 1) value per asset from a seeded
//! [`StdRng`] and divides by their sum. The resulting points are *not*
//! uniform on the simplex (they cluster towards equal weight); this matches
//! the classic random-portfolio frontier plot and is kept deliberately.
//!
//! Draws always happen sequentially in trial order, so the same seed, asset
//! count, and trial count reproduce the same result bit for bit. With the
//! `parallel` feature only the scoring step runs on rayon.

use log::debug;
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::performance::PortfolioPerformance;
use crate::returns::ReturnStatistics;
use crate::types::Symbol;
use crate::weights::WeightVector;

/// One sampled portfolio.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationRecord {
    /// Weights in the asset order of [`SimulationResult::symbols`].
    pub weights: Vec<f64>,
    pub performance: PortfolioPerformance,
}

/// All sampled portfolios plus the distinguished best points.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationResult {
    symbols: Vec<Symbol>,
    records: Vec<SimulationRecord>,
    max_sharpe: usize,
    min_volatility: usize,
}

impl SimulationResult {
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn records(&self) -> &[SimulationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false: at least one trial is required.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Trial index of the highest Sharpe ratio (first occurrence on ties).
    pub fn max_sharpe_index(&self) -> usize {
        self.max_sharpe
    }

    /// Trial index of the lowest volatility (first occurrence on ties).
    pub fn min_volatility_index(&self) -> usize {
        self.min_volatility
    }

    pub fn max_sharpe(&self) -> &SimulationRecord {
        &self.records[self.max_sharpe]
    }

    pub fn min_volatility(&self) -> &SimulationRecord {
        &self.records[self.min_volatility]
    }

    /// Weights of trial `index` keyed by symbol.
    pub fn weight_vector(&self, index: usize) -> Option<WeightVector> {
        self.records.get(index).map(|r| {
            WeightVector::new(self.symbols.iter().cloned().zip(r.weights.iter().copied()).collect())
        })
    }

    /// Sampled points on the upper-left envelope: no other record has both
    /// lower volatility and higher return. Sorted by volatility.
    pub fn frontier(&self) -> Vec<&SimulationRecord> {
        let mut order: Vec<usize> = (0..self.records.len()).collect();
        order.sort_by(|&a, &b| {
            let (pa, pb) = (&self.records[a].performance, &self.records[b].performance);
            pa.volatility
                .partial_cmp(&pb.volatility)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    pb.expected_return
                        .partial_cmp(&pa.expected_return)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });

        let mut best_return = f64::NEG_INFINITY;
        let mut frontier = Vec::new();
        for i in order {
            let r = &self.records[i];
            if r.performance.expected_return > best_return {
                best_return = r.performance.expected_return;
                frontier.push(r);
            }
        }
        frontier
    }
}

/// Sample `num_portfolios` random long-only portfolios and score them.
pub fn simulate(
    stats: &ReturnStatistics,
    num_portfolios: usize,
    risk_free_rate: f64,
    seed: u64,
) -> Result<SimulationResult> {
    let n = stats.num_assets();
    if num_portfolios < 1 {
        return Err(Error::InvalidParameter(
            "num_portfolios must be at least 1".into(),
        ));
    }
    if n == 0 {
        return Err(Error::InvalidParameter("no assets to simulate".into()));
    }
    stats.validate()?;
    if !risk_free_rate.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "risk-free rate must be finite, got {risk_free_rate}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let draws: Vec<Vec<f64>> = (0..num_portfolios)
        .map(|_| random_weights(n, &mut rng))
        .collect();

    let records = score_all(draws, stats, risk_free_rate);

    // Strict comparisons keep the first occurrence on ties.
    let mut max_sharpe = 0;
    let mut min_volatility = 0;
    for (i, r) in records.iter().enumerate().skip(1) {
        if r.performance.sharpe > records[max_sharpe].performance.sharpe {
            max_sharpe = i;
        }
        if r.performance.volatility < records[min_volatility].performance.volatility {
            min_volatility = i;
        }
    }

    debug!(
        "simulated {num_portfolios} portfolios over {n} assets (seed {seed}); \
         best sharpe {:.4} at trial {max_sharpe}",
        records[max_sharpe].performance.sharpe
    );

    Ok(SimulationResult {
        symbols: stats.symbols.clone(),
        records,
        max_sharpe,
        min_volatility,
    })
}

/// Uniform draws normalized by their sum.
fn random_weights<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<f64> {
    let mut w: Vec<f64> = (0..n).map(|_| rng.r#gen::<f64>()).collect();
    let sum: f64 = w.iter().sum();
    if sum > 0.0 {
        for x in &mut w {
            *x /= sum;
        }
    } else {
        w.fill(1.0 / n as f64);
    }
    w
}

fn score(weights: Vec<f64>, stats: &ReturnStatistics, risk_free_rate: f64) -> SimulationRecord {
    let performance =
        PortfolioPerformance::evaluate(&DVector::from_column_slice(&weights), stats, risk_free_rate);
    SimulationRecord {
        weights,
        performance,
    }
}

#[cfg(feature = "parallel")]
fn score_all(
    draws: Vec<Vec<f64>>,
    stats: &ReturnStatistics,
    risk_free_rate: f64,
) -> Vec<SimulationRecord> {
    use rayon::prelude::*;

    draws
        .into_par_iter()
        .map(|w| score(w, stats, risk_free_rate))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn score_all(
    draws: Vec<Vec<f64>>,
    stats: &ReturnStatistics,
    risk_free_rate: f64,
) -> Vec<SimulationRecord> {
    draws
        .into_iter()
        .map(|w| score(w, stats, risk_free_rate))
        .collect()
}
