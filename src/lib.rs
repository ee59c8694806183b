//! # nanofolio
//!
//! Long-only portfolio construction: from a price history to whole-share buy
//! orders.
//!
//! ## Pipeline
//!
//! - **Statistics**: annualized expected returns and covariance from a
//!   [`PriceHistory`] with gaps
//! - **Mean-variance**: maximum Sharpe ratio (or minimum volatility) on the
//!   simplex via a pluggable [`Solver`]
//! - **Monte Carlo**: seeded random portfolios, best-Sharpe and
//!   min-volatility points, sampled frontier
//! - **Discrete allocation**: integer share counts under a budget, solved
//!   exactly rather than by rounding
//!
//! ## Quick Start
//!
//! ```
//! use nanofolio::{Frequency, PriceHistory, ReturnEstimator, ReturnStatistics, Symbol};
//!
//! let prices = PriceHistory::from_columns(
//!     vec![1, 2, 3, 4, 5],
//!     vec![
//!         (Symbol::new("A"), vec![Some(100.0), Some(101.0), Some(100.5), Some(102.0), Some(103.0)]),
//!         (Symbol::new("B"), vec![Some(50.0), Some(49.0), None, Some(51.0), Some(50.5)]),
//!     ],
//! )?;
//!
//! let stats = ReturnStatistics::derive(&prices, ReturnEstimator::ArithmeticMean, Frequency::Daily)?;
//! assert_eq!(stats.num_assets(), 2);
//! assert_eq!(prices.latest_prices()[1], (Symbol::new("B"), 50.5));
//! # Ok::<(), nanofolio::Error>(())
//! ```
//!
//! ## Maximum Sharpe Ratio
//!
//! ```
//! use nalgebra::{DMatrix, DVector};
//! use nanofolio::{optimize, ReturnStatistics, Symbol};
//!
//! // Uncorrelated assets: the optimum is proportional to (μ - r_f) / σ²
//! let stats = ReturnStatistics::from_parts(
//!     vec![Symbol::new("A"), Symbol::new("B")],
//!     DVector::from_vec(vec![0.10, 0.10]),
//!     DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.02]),
//!     252.0,
//! )?;
//!
//! let (weights, perf) = optimize(&stats, 0.0)?;
//! assert!((weights.get(&Symbol::new("A")).unwrap() - 1.0 / 3.0).abs() < 1e-3);
//! assert!((weights.sum() - 1.0).abs() < 1e-6);
//! assert!((perf.sharpe - (perf.expected_return / perf.volatility)).abs() < 1e-12);
//! # Ok::<(), nanofolio::Error>(())
//! ```
//!
//! ## Monte Carlo
//!
//! Same seed, same result:
//!
//! ```
//! use nalgebra::{DMatrix, DVector};
//! use nanofolio::{simulate, ReturnStatistics, Symbol};
//!
//! let stats = ReturnStatistics::from_parts(
//!     vec![Symbol::new("A"), Symbol::new("B")],
//!     DVector::from_vec(vec![0.12, 0.06]),
//!     DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.01, 0.16]),
//!     252.0,
//! )?;
//!
//! let a = simulate(&stats, 1_000, 0.02, 42)?;
//! let b = simulate(&stats, 1_000, 0.02, 42)?;
//! assert_eq!(a.max_sharpe_index(), b.max_sharpe_index());
//! assert!(a.max_sharpe().weights[0] > a.max_sharpe().weights[1]);
//! # Ok::<(), nanofolio::Error>(())
//! ```
//!
//! ## Discrete Allocation
//!
//! ```
//! use nanofolio::{allocate, Symbol, WeightVector};
//!
//! let prices = vec![(Symbol::new("A"), 100.0), (Symbol::new("B"), 200.0)];
//! let weights = WeightVector::new(vec![(Symbol::new("A"), 0.5), (Symbol::new("B"), 0.5)]);
//!
//! let alloc = allocate(&prices, &weights, 10_000.0)?;
//! assert_eq!(alloc.get(&Symbol::new("A")), Some(50));
//! assert_eq!(alloc.get(&Symbol::new("B")), Some(25));
//! assert_eq!(alloc.leftover, 0.0);
//! # Ok::<(), nanofolio::Error>(())
//! ```
//!
//! ## Features
//!
//! | Feature | Effect |
//! |---------|--------|
//! | `serde` | `Serialize`/`Deserialize` on value types |
//! | `parallel` | Monte Carlo scoring on rayon (draws stay sequential) |

pub mod allocation;
mod error;
pub mod monte_carlo;
pub mod optimize;
mod performance;
mod prices;
mod returns;
mod types;
pub mod weights;

// Re-export public API
pub use allocation::{Allocation, AllocationMethod, DiscreteAllocator, MAX_SHARES, allocate};
pub use error::{Error, Result};
pub use monte_carlo::{SimulationRecord, SimulationResult, simulate};
pub use optimize::{
    ActiveSetSolver, MeanVarianceOptimizer, Objective, ProjectedGradientSolver, Solver, optimize,
};
pub use performance::{PortfolioPerformance, sharpe_ratio};
pub use prices::PriceHistory;
pub use returns::{ReturnEstimator, ReturnStatistics};
pub use types::{Frequency, Symbol, Timestamp};
pub use weights::{CleanPolicy, SUM_TOLERANCE, WeightVector, clean_weights};
