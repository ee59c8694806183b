//! Long-only mean-variance optimization on the unit simplex.
//!
//! Maximum Sharpe is solved through the usual change of variables: minimize
//! `½ yᵀΣy` subject to `(μ - r_f)ᵀy = 1, y >= 0`, then `w = y / sum(y)`.
//! Minimum volatility is the same quadratic program with a vector of ones in
//! place of the excess returns.
//!
//! Solvers are pluggable through [`Solver`]:
//! - [`ActiveSetSolver`] (default) solves the QP exactly,
//! - [`ProjectedGradientSolver`] runs gradient steps projected back onto the simplex.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::performance::PortfolioPerformance;
use crate::returns::ReturnStatistics;
use crate::weights::{CleanPolicy, WeightVector, clean_weights};

/// What the optimizer is asked to find.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", tag = "kind"))]
pub enum Objective {
    /// Maximize `(wᵀμ - r_f) / sqrt(wᵀΣw)`.
    MaxSharpe { risk_free_rate: f64 },
    /// Minimize `wᵀΣw`.
    MinVolatility,
}

/// A backend that maps an objective and statistics to long-only weights summing to 1.
///
/// Implementations may assume at least two assets and, for
/// [`Objective::MaxSharpe`], at least one asset whose expected return exceeds
/// the risk-free rate.
pub trait Solver: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, objective: &Objective, stats: &ReturnStatistics) -> Result<DVector<f64>>;
}

/// Mean-variance optimizer: solver + weight-cleaning policy.
pub struct MeanVarianceOptimizer {
    solver: Box<dyn Solver>,
    clean: CleanPolicy,
}

impl Default for MeanVarianceOptimizer {
    fn default() -> Self {
        Self::new(Box::new(ActiveSetSolver::default()))
    }
}

impl MeanVarianceOptimizer {
    pub fn new(solver: Box<dyn Solver>) -> Self {
        Self {
            solver,
            clean: CleanPolicy::default(),
        }
    }

    pub fn with_clean_policy(mut self, clean: CleanPolicy) -> Self {
        self.clean = clean;
        self
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    /// Weights maximizing the Sharpe ratio, cleaned, with their performance.
    pub fn optimize(
        &self,
        stats: &ReturnStatistics,
        risk_free_rate: f64,
    ) -> Result<(WeightVector, PortfolioPerformance)> {
        if !risk_free_rate.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "risk-free rate must be finite, got {risk_free_rate}"
            )));
        }
        self.run(&Objective::MaxSharpe { risk_free_rate }, stats, risk_free_rate)
    }

    /// Weights minimizing volatility, cleaned, with their performance.
    pub fn min_volatility(
        &self,
        stats: &ReturnStatistics,
        risk_free_rate: f64,
    ) -> Result<(WeightVector, PortfolioPerformance)> {
        self.run(&Objective::MinVolatility, stats, risk_free_rate)
    }

    fn run(
        &self,
        objective: &Objective,
        stats: &ReturnStatistics,
        risk_free_rate: f64,
    ) -> Result<(WeightVector, PortfolioPerformance)> {
        let n = stats.num_assets();
        if n == 0 {
            return Err(Error::InsufficientData("cannot optimize over zero assets".into()));
        }
        stats.validate()?;

        let raw = if n == 1 {
            DVector::from_element(1, 1.0)
        } else {
            if let Objective::MaxSharpe { risk_free_rate } = objective {
                if stats.expected_returns.iter().all(|m| *m <= *risk_free_rate) {
                    return Err(Error::OptimizationInfeasible(format!(
                        "no asset has an expected return above the risk-free rate {risk_free_rate}"
                    )));
                }
            }
            self.solver.solve(objective, stats)?
        };

        if raw.iter().any(|w| !w.is_finite()) {
            return Err(Error::OptimizationInfeasible(format!(
                "{} solver returned non-finite weights",
                self.solver.name()
            )));
        }

        let weights = clean_weights(&WeightVector::from_vector(&stats.symbols, &raw), self.clean);
        let performance =
            PortfolioPerformance::evaluate(&weights.to_vector(), stats, risk_free_rate);
        Ok((weights, performance))
    }
}

/// Maximum-Sharpe weights using the default optimizer.
pub fn optimize(
    stats: &ReturnStatistics,
    risk_free_rate: f64,
) -> Result<(WeightVector, PortfolioPerformance)> {
    MeanVarianceOptimizer::default().optimize(stats, risk_free_rate)
}

// ---------------------------------------------------------------------------
// Active-set QP
// ---------------------------------------------------------------------------

/// Primal active-set method for `min ½ yᵀΣy  s.t.  aᵀy = 1, y >= 0`.
#[derive(Clone, Copy, Debug)]
pub struct ActiveSetSolver {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ActiveSetSolver {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-10,
        }
    }
}

impl Solver for ActiveSetSolver {
    fn name(&self) -> &'static str {
        "active-set"
    }

    fn solve(&self, objective: &Objective, stats: &ReturnStatistics) -> Result<DVector<f64>> {
        let n = stats.num_assets();
        let a = match objective {
            Objective::MaxSharpe { risk_free_rate } => {
                stats.expected_returns.map(|m| m - risk_free_rate)
            }
            Objective::MinVolatility => DVector::from_element(n, 1.0),
        };

        let y = self.solve_qp(&stats.covariance, &a)?;
        let total = y.sum();
        if total <= 0.0 {
            return Err(Error::OptimizationInfeasible(
                "quadratic program returned an empty portfolio".into(),
            ));
        }
        Ok(normalize_long_only(y / total))
    }
}

impl ActiveSetSolver {
    fn solve_qp(&self, sigma: &DMatrix<f64>, a: &DVector<f64>) -> Result<DVector<f64>> {
        let n = a.len();

        // Feasible start: everything in the coordinate with the largest a_i.
        let (start, a_max) = a
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best });
        if a_max <= 0.0 {
            return Err(Error::OptimizationInfeasible(
                "equality constraint cannot be met with non-negative weights".into(),
            ));
        }

        let mut y = DVector::zeros(n);
        y[start] = 1.0 / a_max;
        let mut free = vec![false; n];
        free[start] = true;

        for iter in 0..self.max_iterations {
            let idx: Vec<usize> = (0..n).filter(|&i| free[i]).collect();
            let (z, nu) = equality_qp(sigma, a, &idx)
                .ok_or(Error::OptimizationDidNotConverge { iterations: iter })?;

            let p: Vec<f64> = idx.iter().zip(z.iter()).map(|(&i, zi)| zi - y[i]).collect();
            let step = p.iter().map(|x| x * x).sum::<f64>().sqrt();

            if step <= self.tolerance * (1.0 + y.norm()) {
                // At the subspace optimum: release the bound with the most negative multiplier.
                let g = sigma * &y;
                let release = (0..n)
                    .filter(|&i| !free[i])
                    .map(|i| (i, g[i] + nu * a[i]))
                    .filter(|&(_, mu)| mu < -self.tolerance)
                    .min_by(|l, r| l.1.partial_cmp(&r.1).unwrap_or(std::cmp::Ordering::Equal));

                match release {
                    Some((i, mu)) => {
                        debug!("active-set iter {iter}: release asset {i} (multiplier {mu:.3e})");
                        free[i] = true;
                    }
                    None => {
                        debug!("active-set converged in {iter} iterations");
                        return Ok(y);
                    }
                }
                continue;
            }

            // Ratio test against the non-negativity bounds.
            let mut alpha = 1.0_f64;
            let mut blocking = None;
            for (k, &i) in idx.iter().enumerate() {
                if p[k] < 0.0 {
                    let ratio = -y[i] / p[k];
                    if ratio < alpha {
                        alpha = ratio;
                        blocking = Some(i);
                    }
                }
            }

            for (k, &i) in idx.iter().enumerate() {
                y[i] += alpha * p[k];
            }
            if let Some(i) = blocking {
                y[i] = 0.0;
                free[i] = false;
            }
        }

        Err(Error::OptimizationDidNotConverge {
            iterations: self.max_iterations,
        })
    }
}

/// Solve `min ½ zᵀΣ_FF z  s.t.  a_Fᵀz = 1` over the index set `idx`.
///
/// Returns the minimizer and the equality multiplier, or `None` if the KKT
/// system is singular even after a small ridge.
fn equality_qp(
    sigma: &DMatrix<f64>,
    a: &DVector<f64>,
    idx: &[usize],
) -> Option<(DVector<f64>, f64)> {
    let m = idx.len();
    let mut kkt = DMatrix::zeros(m + 1, m + 1);
    for (r, &i) in idx.iter().enumerate() {
        for (c, &j) in idx.iter().enumerate() {
            kkt[(r, c)] = sigma[(i, j)];
        }
        kkt[(r, m)] = a[i];
        kkt[(m, r)] = a[i];
    }
    let mut rhs = DVector::zeros(m + 1);
    rhs[m] = 1.0;

    let solve = |k: DMatrix<f64>| {
        k.lu()
            .solve(&rhs)
            .filter(|x| x.iter().all(|v| v.is_finite()))
    };

    let x = solve(kkt.clone()).or_else(|| {
        let scale = (0..m).map(|r| kkt[(r, r)].abs()).fold(0.0_f64, f64::max).max(1e-12);
        let mut ridged = kkt;
        for r in 0..m {
            ridged[(r, r)] += 1e-10 * scale;
        }
        solve(ridged)
    })?;

    Some((x.rows(0, m).into_owned(), x[m]))
}

// ---------------------------------------------------------------------------
// Projected gradient
// ---------------------------------------------------------------------------

/// Gradient steps on the objective, each projected back onto the simplex.
#[derive(Clone, Copy, Debug)]
pub struct ProjectedGradientSolver {
    pub max_iterations: usize,
    pub learning_rate: f64,
    pub decay: f64,
}

impl Default for ProjectedGradientSolver {
    fn default() -> Self {
        Self {
            max_iterations: 20_000,
            learning_rate: 0.10,
            decay: 0.999,
        }
    }
}

impl Solver for ProjectedGradientSolver {
    fn name(&self) -> &'static str {
        "projected-gradient"
    }

    fn solve(&self, objective: &Objective, stats: &ReturnStatistics) -> Result<DVector<f64>> {
        let cov = &stats.covariance;
        let n = stats.num_assets();
        let mut w = DVector::from_element(n, 1.0 / n as f64);
        let mut lr = self.learning_rate;

        for iter in 0..self.max_iterations {
            let sigma_w = cov * &w;
            let candidate = match objective {
                Objective::MaxSharpe { risk_free_rate } => {
                    let excess = stats.expected_returns.map(|m| m - risk_free_rate);
                    let var = w.dot(&sigma_w).max(1e-12);
                    let vol = var.sqrt();
                    let num = w.dot(&excess);
                    // Gradient ascent on Sharpe
                    let grad = &excess / vol - &sigma_w * (num / (var * vol));
                    &w + grad * lr
                }
                Objective::MinVolatility => &w - &sigma_w * (2.0 * lr),
            };
            let projected = project_simplex(&candidate);

            if (&projected - &w).norm_squared() < 1e-20 {
                debug!("{} converged in {iter} iterations", self.name());
                return Ok(projected);
            }

            w = projected;
            lr *= self.decay;
        }

        Err(Error::OptimizationDidNotConverge {
            iterations: self.max_iterations,
        })
    }
}

fn equal_weights(n: usize) -> DVector<f64> {
    DVector::from_element(n, 1.0 / n as f64)
}

fn normalize_long_only(mut w: DVector<f64>) -> DVector<f64> {
    if w.is_empty() {
        return w;
    }

    for x in w.iter_mut() {
        if !x.is_finite() || *x < 0.0 {
            *x = 0.0;
        }
    }

    let sum = w.sum();
    if sum <= 1e-12 {
        return equal_weights(w.len());
    }
    w / sum
}

/// Euclidean projection onto `{w : w >= 0, sum(w) = 1}`.
fn project_simplex(v: &DVector<f64>) -> DVector<f64> {
    if v.is_empty() {
        return v.clone();
    }

    let mut u: Vec<f64> = v.iter().copied().collect();
    u.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let mut cssv = 0.0;
    let mut rho = 0_usize;

    for (i, ui) in u.iter().enumerate() {
        cssv += *ui;
        let theta = (cssv - 1.0) / (i as f64 + 1.0);
        if *ui - theta > 0.0 {
            rho = i + 1;
        }
    }

    if rho == 0 {
        return equal_weights(v.len());
    }

    let theta = (u[..rho].iter().sum::<f64>() - 1.0) / rho as f64;
    normalize_long_only(v.map(|x| (x - theta).max(0.0)))
}
