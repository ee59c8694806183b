//! Command results: rendered as text tables or serialized with `--json`.

use std::fmt;

use serde::Serialize;

use nanofolio::{Allocation, PortfolioPerformance, SimulationResult, Symbol, WeightVector};

use crate::weights_file::TargetWeight;

/// Result of `optimize`.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizeReport {
    pub solver: String,
    pub objective: String,
    pub risk_free_rate: f64,
    /// Sorted by weight, largest first.
    pub weights: Vec<TargetWeight>,
    pub performance: PortfolioPerformance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<AllocationReport>,
}

/// One distinguished Monte Carlo portfolio.
#[derive(Debug, Clone, Serialize)]
pub struct SampledPortfolio {
    pub trial: usize,
    pub weights: Vec<TargetWeight>,
    pub performance: PortfolioPerformance,
}

/// Result of `simulate`.
#[derive(Debug, Clone, Serialize)]
pub struct SimulateReport {
    pub num_portfolios: usize,
    pub seed: u64,
    pub risk_free_rate: f64,
    pub max_sharpe: SampledPortfolio,
    pub min_volatility: SampledPortfolio,
    /// Sampled upper envelope, by increasing volatility.
    pub frontier: Vec<PortfolioPerformance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<AllocationReport>,
}

/// Whole-share buy list.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationReport {
    pub budget: f64,
    pub holdings: Vec<Holding>,
    pub invested: f64,
    pub leftover: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Holding {
    pub symbol: String,
    pub shares: u64,
    pub price: f64,
    pub value: f64,
}

/// Weights sorted by weight descending.
pub fn weight_rows(weights: &WeightVector) -> Vec<TargetWeight> {
    weights
        .sorted_desc()
        .into_iter()
        .map(|(symbol, weight)| TargetWeight {
            symbol: symbol.to_string(),
            weight,
        })
        .collect()
}

impl SampledPortfolio {
    /// `trial` must index into `result`.
    pub fn new(result: &SimulationResult, trial: usize) -> Self {
        let weights = result.weight_vector(trial).unwrap_or_default();
        Self {
            trial,
            weights: weight_rows(&weights),
            performance: result.records()[trial].performance,
        }
    }
}

impl AllocationReport {
    pub fn new(allocation: &Allocation, prices: &[(Symbol, f64)], budget: f64) -> Self {
        let holdings: Vec<Holding> = allocation
            .shares
            .iter()
            .map(|(sym, shares)| {
                let price = prices
                    .iter()
                    .find(|(s, _)| s == sym)
                    .map_or(0.0, |(_, p)| *p);
                Holding {
                    symbol: sym.to_string(),
                    shares: *shares,
                    price,
                    value: *shares as f64 * price,
                }
            })
            .collect();
        Self {
            budget,
            invested: holdings.iter().map(|h| h.value).sum(),
            holdings,
            leftover: allocation.leftover,
        }
    }
}

fn write_weights(f: &mut fmt::Formatter<'_>, weights: &[TargetWeight]) -> fmt::Result {
    writeln!(f, "  {:8} {:>8}", "Symbol", "Weight")?;
    for w in weights {
        writeln!(f, "  {:8} {:>7.2}%", w.symbol, w.weight * 100.0)?;
    }
    Ok(())
}

impl fmt::Display for OptimizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "OPTIMAL PORTFOLIO ({}, {} solver, r_f = {:.2}%):",
            self.objective,
            self.solver,
            self.risk_free_rate * 100.0
        )?;
        write_weights(f, &self.weights)?;
        writeln!(f)?;
        writeln!(f, "{}", self.performance)?;
        if let Some(alloc) = &self.allocation {
            writeln!(f)?;
            write!(f, "{alloc}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SimulateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "MONTE CARLO: {} portfolios (seed {}), {} on the sampled frontier",
            self.num_portfolios,
            self.seed,
            self.frontier.len()
        )?;
        for (label, p) in [("MAX SHARPE", &self.max_sharpe), ("MIN VOLATILITY", &self.min_volatility)] {
            writeln!(f, "\n{label} (trial {}):", p.trial)?;
            write_weights(f, &p.weights)?;
            writeln!(f, "{}", p.performance)?;
        }
        if let Some(alloc) = &self.allocation {
            writeln!(f)?;
            write!(f, "{alloc}")?;
        }
        Ok(())
    }
}

impl fmt::Display for AllocationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ALLOCATION OF ${:.2}:", self.budget)?;
        if self.holdings.is_empty() {
            writeln!(f, "  (no shares affordable)")?;
        } else {
            writeln!(
                f,
                "  {:8} {:>8} {:>10} {:>12}",
                "Symbol", "Shares", "Price", "Value"
            )?;
            for h in &self.holdings {
                writeln!(
                    f,
                    "  {:8} {:>8} ${:>9.2} ${:>11.2}",
                    h.symbol, h.shares, h.price, h.value
                )?;
            }
        }
        writeln!(f, "  Invested:      ${:.2}", self.invested)?;
        writeln!(f, "  Leftover cash: ${:.2}", self.leftover)
    }
}
