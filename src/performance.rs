//! Expected return, volatility, and Sharpe ratio of a weight vector.

use std::fmt;

use nalgebra::DVector;

use crate::returns::ReturnStatistics;

/// Annualized performance of a portfolio.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioPerformance {
    /// Expected annual return (e.g., 0.12 = 12%)
    pub expected_return: f64,
    /// Annual volatility (standard deviation)
    pub volatility: f64,
    /// (expected_return - risk_free) / volatility, or 0 when volatility is exactly 0
    pub sharpe: f64,
}

impl PortfolioPerformance {
    /// Assemble from return and volatility.
    pub fn new(expected_return: f64, volatility: f64, risk_free_rate: f64) -> Self {
        Self {
            expected_return,
            volatility,
            sharpe: sharpe_ratio(expected_return, volatility, risk_free_rate),
        }
    }

    /// Score raw weights (in `stats` asset order) against return statistics.
    pub fn evaluate(weights: &DVector<f64>, stats: &ReturnStatistics, risk_free_rate: f64) -> Self {
        let ret = weights.dot(&stats.expected_returns);
        let var = (&stats.covariance * weights).dot(weights);
        Self::new(ret, var.max(0.0).sqrt(), risk_free_rate)
    }
}

/// Sharpe ratio with the zero-volatility convention.
pub fn sharpe_ratio(expected_return: f64, volatility: f64, risk_free_rate: f64) -> f64 {
    if volatility == 0.0 {
        0.0
    } else {
        (expected_return - risk_free_rate) / volatility
    }
}

impl fmt::Display for PortfolioPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Expected return: {:>8.2}%", self.expected_return * 100.0)?;
        writeln!(f, "  Volatility:      {:>8.2}%", self.volatility * 100.0)?;
        write!(f, "  Sharpe ratio:    {:>8.2}", self.sharpe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;
    use nalgebra::DMatrix;

    #[test]
    fn sharpe_exact() {
        let p = PortfolioPerformance::new(0.10, 0.20, 0.0);
        assert_eq!(p.sharpe, 0.5);
    }

    #[test]
    fn sharpe_zero_volatility() {
        assert_eq!(sharpe_ratio(0.10, 0.0, 0.02), 0.0);
    }

    #[test]
    fn evaluate_two_assets() {
        let stats = ReturnStatistics::from_parts(
            vec![Symbol::new("A"), Symbol::new("B")],
            DVector::from_vec(vec![0.10, 0.20]),
            DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.16]),
            252.0,
        )
        .unwrap();
        let w = DVector::from_vec(vec![0.5, 0.5]);
        let p = PortfolioPerformance::evaluate(&w, &stats, 0.02);

        assert!((p.expected_return - 0.15).abs() < 1e-12);
        // var = 0.25 * 0.04 + 0.25 * 0.16 = 0.05
        assert!((p.volatility - 0.05_f64.sqrt()).abs() < 1e-12);
        assert!((p.sharpe - (0.13 / 0.05_f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn display_percentages() {
        let text = PortfolioPerformance::new(0.1234, 0.2, 0.0).to_string();
        assert!(text.contains("12.34%"));
        assert!(text.contains("20.00%"));
        assert!(text.contains("0.62"));
    }
}
