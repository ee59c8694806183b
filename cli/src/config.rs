//! TOML configuration loading and validation.
//!
//! Every section and key is optional; a missing file section falls back to
//! the defaults below.

use std::path::Path;

use serde::Deserialize;

use nanofolio::{
    ActiveSetSolver, AllocationMethod, CleanPolicy, DiscreteAllocator, Frequency,
    MeanVarianceOptimizer, ProjectedGradientSolver, ReturnEstimator, Solver,
};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub clean: CleanConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub estimator: ReturnEstimator,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            frequency: Frequency::Daily,
            estimator: ReturnEstimator::CompoundedMean,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    #[default]
    MaxSharpe,
    MinVolatility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    #[default]
    ActiveSet,
    ProjectedGradient,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    #[serde(default)]
    pub objective: ObjectiveKind,
    #[serde(default)]
    pub solver: SolverKind,
    /// Overrides the solver's own iteration cap.
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

fn default_risk_free_rate() -> f64 {
    0.02
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            objective: ObjectiveKind::default(),
            solver: SolverKind::default(),
            max_iterations: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanConfig {
    #[serde(default = "default_cutoff")]
    pub cutoff: f64,
    #[serde(default = "default_rounding")]
    pub rounding: u32,
}

fn default_cutoff() -> f64 {
    1e-4
}
fn default_rounding() -> u32 {
    4
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            cutoff: default_cutoff(),
            rounding: default_rounding(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_num_portfolios")]
    pub num_portfolios: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Monte Carlo scores against arithmetic mean returns unless told otherwise.
    #[serde(default = "default_simulation_estimator")]
    pub estimator: ReturnEstimator,
}

fn default_num_portfolios() -> usize {
    5_000
}
fn default_seed() -> u64 {
    42
}
fn default_simulation_estimator() -> ReturnEstimator {
    ReturnEstimator::ArithmeticMean
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_portfolios: default_num_portfolios(),
            seed: default_seed(),
            estimator: default_simulation_estimator(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllocationConfig {
    #[serde(default = "default_budget")]
    pub budget: f64,
    #[serde(default)]
    pub method: AllocationMethod,
    #[serde(default = "default_node_limit")]
    pub node_limit: usize,
}

fn default_budget() -> f64 {
    10_000.0
}
fn default_node_limit() -> usize {
    1_000_000
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            method: AllocationMethod::default(),
            node_limit: default_node_limit(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        let rf = self.optimizer.risk_free_rate;
        if !rf.is_finite() || rf.abs() >= 1.0 {
            return Err(Error::Config(
                "risk_free_rate must be a finite annual rate in (-1.0, 1.0)".into(),
            ));
        }
        if self.optimizer.max_iterations == Some(0) {
            return Err(Error::Config("max_iterations must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.clean.cutoff) {
            return Err(Error::Config("clean cutoff must be in [0.0, 1.0)".into()));
        }
        if self.clean.rounding > 15 {
            return Err(Error::Config("clean rounding must be <= 15 decimals".into()));
        }
        if self.simulation.num_portfolios == 0 {
            return Err(Error::Config("num_portfolios must be >= 1".into()));
        }
        if !self.allocation.budget.is_finite() || self.allocation.budget < 0.0 {
            return Err(Error::Config("budget must be >= 0".into()));
        }
        if self.allocation.node_limit == 0 {
            return Err(Error::Config("node_limit must be > 0".into()));
        }
        Ok(())
    }

    pub fn clean_policy(&self) -> CleanPolicy {
        CleanPolicy {
            cutoff: self.clean.cutoff,
            rounding: self.clean.rounding,
        }
    }

    /// Mean-variance optimizer with the configured solver and cleaning.
    pub fn optimizer(&self) -> MeanVarianceOptimizer {
        let solver: Box<dyn Solver> = match self.optimizer.solver {
            SolverKind::ActiveSet => {
                let mut s = ActiveSetSolver::default();
                if let Some(n) = self.optimizer.max_iterations {
                    s.max_iterations = n;
                }
                Box::new(s)
            }
            SolverKind::ProjectedGradient => {
                let mut s = ProjectedGradientSolver::default();
                if let Some(n) = self.optimizer.max_iterations {
                    s.max_iterations = n;
                }
                Box::new(s)
            }
        };
        MeanVarianceOptimizer::new(solver).with_clean_policy(self.clean_policy())
    }

    pub fn allocator(&self) -> DiscreteAllocator {
        DiscreteAllocator {
            method: self.allocation.method,
            node_limit: self.allocation.node_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_toml() -> &'static str {
        r#"
[data]
frequency = "weekly"
estimator = "arithmetic_mean"

[optimizer]
risk_free_rate = 0.03
objective = "min_volatility"
solver = "projected_gradient"
max_iterations = 5000

[clean]
cutoff = 0.001
rounding = 3

[simulation]
num_portfolios = 2000
seed = 7

[allocation]
budget = 25000.0
method = "greedy"
node_limit = 5000
"#
    }

    #[test]
    fn parse_example_config() {
        let config = Config::from_toml(example_toml()).unwrap();
        assert_eq!(config.data.frequency, Frequency::Weekly);
        assert_eq!(config.data.estimator, ReturnEstimator::ArithmeticMean);
        assert_eq!(config.optimizer.risk_free_rate, 0.03);
        assert_eq!(config.optimizer.objective, ObjectiveKind::MinVolatility);
        assert_eq!(config.optimizer.solver, SolverKind::ProjectedGradient);
        assert_eq!(config.clean.rounding, 3);
        assert_eq!(config.simulation.num_portfolios, 2000);
        assert_eq!(config.allocation.method, AllocationMethod::Greedy);
        assert_eq!(config.allocation.node_limit, 5000);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.optimizer.risk_free_rate, 0.02);
        assert_eq!(config.optimizer.objective, ObjectiveKind::MaxSharpe);
        assert_eq!(config.simulation.num_portfolios, 5000);
        assert_eq!(config.simulation.seed, 42);
        assert_eq!(config.simulation.estimator, ReturnEstimator::ArithmeticMean);
        assert_eq!(config.data.estimator, ReturnEstimator::CompoundedMean);
        assert_eq!(config.allocation.budget, 10_000.0);
        assert_eq!(config.allocation.method, AllocationMethod::Exact);
    }

    #[test]
    fn partial_section_fills_defaults() {
        let config = Config::from_toml("[allocation]\nbudget = 500.0\n").unwrap();
        assert_eq!(config.allocation.budget, 500.0);
        assert_eq!(config.allocation.node_limit, 1_000_000);
    }

    #[test]
    fn optimizer_uses_configured_solver() {
        let config = Config::from_toml(example_toml()).unwrap();
        assert_eq!(config.optimizer().solver_name(), "projected-gradient");
        assert_eq!(Config::default().optimizer().solver_name(), "active-set");
    }

    #[test]
    fn validate_catches_bad_risk_free_rate() {
        let mut config = Config::default();
        config.optimizer.risk_free_rate = 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_zero_portfolios() {
        let mut config = Config::default();
        config.simulation.num_portfolios = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_negative_budget() {
        let mut config = Config::default();
        config.allocation.budget = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_bad_cutoff() {
        let mut config = Config::default();
        config.clean.cutoff = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_method_rejected() {
        assert!(Config::from_toml("[allocation]\nmethod = \"lp\"\n").is_err());
    }
}
