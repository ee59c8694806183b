//! Command runners: price history in, report out.

use std::fmt::Display;

use log::info;
use serde::Serialize;

use nanofolio::{PriceHistory, ReturnEstimator, ReturnStatistics, WeightVector};

use crate::config::{Config, ObjectiveKind};
use crate::error::Result;
use crate::report::{AllocationReport, OptimizeReport, SampledPortfolio, SimulateReport, weight_rows};

fn statistics(
    config: &Config,
    history: &PriceHistory,
    estimator: ReturnEstimator,
) -> Result<ReturnStatistics> {
    let stats = ReturnStatistics::derive(history, estimator, config.data.frequency)?;
    info!(
        "Estimated {:?} statistics for {} assets over {} return rows",
        estimator,
        stats.num_assets(),
        stats.observations
    );
    Ok(stats)
}

/// Mean-variance optimization, optionally followed by discrete allocation.
pub fn optimize(config: &Config, history: &PriceHistory, with_allocation: bool) -> Result<OptimizeReport> {
    let stats = statistics(config, history, config.data.estimator)?;
    let optimizer = config.optimizer();
    let rf = config.optimizer.risk_free_rate;

    let (weights, performance, objective) = match config.optimizer.objective {
        ObjectiveKind::MaxSharpe => {
            let (w, p) = optimizer.optimize(&stats, rf)?;
            (w, p, "max Sharpe")
        }
        ObjectiveKind::MinVolatility => {
            let (w, p) = optimizer.min_volatility(&stats, rf)?;
            (w, p, "min volatility")
        }
    };
    info!(
        "{} solver: sharpe {:.4}, volatility {:.4}",
        optimizer.solver_name(),
        performance.sharpe,
        performance.volatility
    );

    let allocation = if with_allocation {
        Some(allocate(config, history, &weights)?)
    } else {
        None
    };

    Ok(OptimizeReport {
        solver: optimizer.solver_name().to_string(),
        objective: objective.to_string(),
        risk_free_rate: rf,
        weights: weight_rows(&weights),
        performance,
        allocation,
    })
}

/// Monte Carlo search; allocates the best-Sharpe sample when asked.
pub fn simulate(config: &Config, history: &PriceHistory, with_allocation: bool) -> Result<SimulateReport> {
    let stats = statistics(config, history, config.simulation.estimator)?;
    let sim = &config.simulation;
    let rf = config.optimizer.risk_free_rate;

    let result = nanofolio::simulate(&stats, sim.num_portfolios, rf, sim.seed)?;
    info!(
        "Simulated {} portfolios; best sharpe {:.4} at trial {}",
        result.len(),
        result.max_sharpe().performance.sharpe,
        result.max_sharpe_index()
    );

    let allocation = match result.weight_vector(result.max_sharpe_index()) {
        Some(best) if with_allocation => Some(allocate(config, history, &best)?),
        _ => None,
    };

    Ok(SimulateReport {
        num_portfolios: sim.num_portfolios,
        seed: sim.seed,
        risk_free_rate: rf,
        max_sharpe: SampledPortfolio::new(&result, result.max_sharpe_index()),
        min_volatility: SampledPortfolio::new(&result, result.min_volatility_index()),
        frontier: result.frontier().into_iter().map(|r| r.performance).collect(),
        allocation,
    })
}

/// Whole shares of `weights` at the history's latest prices.
pub fn allocate(config: &Config, history: &PriceHistory, weights: &WeightVector) -> Result<AllocationReport> {
    let latest = history.latest_prices();
    let budget = config.allocation.budget;
    let allocation = config.allocator().allocate(&latest, weights, budget)?;
    info!(
        "Allocated {} holdings, ${:.2} left over",
        allocation.shares.len(),
        allocation.leftover
    );
    Ok(AllocationReport::new(&allocation, &latest, budget))
}

/// Text table, or pretty JSON with `json`.
pub fn render<T: Serialize + Display>(report: &T, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(report)?)
    } else {
        Ok(report.to_string())
    }
}
