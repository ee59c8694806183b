//! Errors raised by the portfolio construction pipeline.

use crate::types::Symbol;

/// Every failure the core can surface. Nothing is retried internally.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// Too few prices or returns to estimate statistics.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// No long-only, fully-invested portfolio satisfies the objective.
    #[error("optimization infeasible: {0}")]
    OptimizationInfeasible(String),

    /// The solver stopped before reaching its tolerance.
    #[error("optimization did not converge after {iterations} iterations")]
    OptimizationDidNotConverge { iterations: usize },

    /// A caller-supplied parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A price is zero, negative, or not finite.
    #[error("invalid price for {symbol}: {price}")]
    InvalidPrice { symbol: Symbol, price: f64 },

    /// No share allocation satisfies the budget.
    #[error("allocation infeasible: {0}")]
    AllocationInfeasible(String),

    /// The data collaborator returned nothing usable.
    #[error("no price data available: {0}")]
    DataUnavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;
