//! Edge-case tests: adversarial inputs to every public API.

use nalgebra::{DMatrix, DVector};
use nanofolio::{
    AllocationMethod, DiscreteAllocator, Error, Frequency, MeanVarianceOptimizer, PriceHistory,
    ReturnEstimator, ReturnStatistics, Symbol, WeightVector, allocate, optimize, simulate,
};

fn sym(s: &str) -> Symbol {
    Symbol::new(s)
}

fn two_assets(mu: [f64; 2]) -> ReturnStatistics {
    ReturnStatistics::from_parts(
        vec![sym("A"), sym("B")],
        DVector::from_vec(mu.to_vec()),
        DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.09]),
        252.0,
    )
    .unwrap()
}

// ============================================================================
// Price history construction
// ============================================================================

#[test]
fn history_without_assets() {
    let err = PriceHistory::new(vec![1, 2], vec![], vec![vec![], vec![]]).unwrap_err();
    assert!(matches!(err, Error::InsufficientData(_)));
}

#[test]
fn history_single_row() {
    let err = PriceHistory::from_columns(vec![1], vec![(sym("A"), vec![Some(10.0)])]).unwrap_err();
    assert!(matches!(err, Error::InsufficientData(_)));
}

#[test]
fn history_nan_price() {
    let err = PriceHistory::from_columns(vec![1, 2], vec![(sym("A"), vec![Some(10.0), Some(f64::NAN)])])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPrice { .. }));
}

#[test]
fn history_zero_price() {
    let err = PriceHistory::from_columns(vec![1, 2], vec![(sym("A"), vec![Some(0.0), Some(1.0)])])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPrice { .. }));
}

#[test]
fn history_unsorted_timestamps() {
    let err = PriceHistory::from_columns(vec![2, 1], vec![(sym("A"), vec![Some(1.0), Some(2.0)])])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

#[test]
fn history_duplicate_symbol() {
    let err = PriceHistory::from_columns(
        vec![1, 2],
        vec![
            (sym("A"), vec![Some(1.0), Some(2.0)]),
            (sym("a"), vec![Some(1.0), Some(2.0)]),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

#[test]
fn history_all_gaps_collapse() {
    // Only one row has any price once empty rows are dropped
    let err = PriceHistory::from_columns(
        vec![1, 2, 3],
        vec![(sym("A"), vec![None, Some(1.0), None])],
    )
    .unwrap_err();
    assert!(matches!(err, Error::InsufficientData(_)));
}

#[test]
fn select_unknown_tickers() {
    let h = PriceHistory::from_columns(vec![1, 2, 3], vec![(sym("A"), vec![Some(1.0), Some(1.1), Some(1.2)])])
        .unwrap();
    assert!(matches!(h.select(&[sym("Z")]), Err(Error::DataUnavailable(_))));
}

// ============================================================================
// Statistics
// ============================================================================

#[test]
fn statistics_need_two_returns() {
    let h = PriceHistory::from_columns(vec![1, 2], vec![(sym("A"), vec![Some(1.0), Some(1.1)])]).unwrap();
    let err = ReturnStatistics::derive(&h, ReturnEstimator::default(), Frequency::Daily).unwrap_err();
    assert!(matches!(err, Error::InsufficientData(_)));
}

#[test]
fn statistics_non_overlapping_assets() {
    // A and B are never quoted on consecutive days together
    let h = PriceHistory::from_columns(
        vec![1, 2, 3, 4, 5, 6],
        vec![
            (sym("A"), vec![Some(1.0), Some(1.1), Some(1.2), None, None, None]),
            (sym("B"), vec![None, None, None, Some(2.0), Some(2.1), Some(2.2)]),
        ],
    )
    .unwrap();
    let err = ReturnStatistics::derive(&h, ReturnEstimator::ArithmeticMean, Frequency::Daily).unwrap_err();
    assert!(matches!(err, Error::InsufficientData(_)));
}

#[test]
fn statistics_constant_prices() {
    let h = PriceHistory::from_columns(vec![1, 2, 3], vec![(sym("A"), vec![Some(5.0); 3])]).unwrap();
    let s = ReturnStatistics::derive(&h, ReturnEstimator::CompoundedMean, Frequency::Monthly).unwrap();
    assert_eq!(s.expected_returns[0], 0.0);
    assert_eq!(s.covariance[(0, 0)], 0.0);
    assert_eq!(s.periods_per_year, 12.0);
}

#[test]
fn from_parts_rejects_asymmetric() {
    let err = ReturnStatistics::from_parts(
        vec![sym("A"), sym("B")],
        DVector::from_vec(vec![0.1, 0.1]),
        DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.02, 0.09]),
        252.0,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

// ============================================================================
// Optimizer
// ============================================================================

#[test]
fn optimize_nan_risk_free_rate() {
    let err = optimize(&two_assets([0.1, 0.1]), f64::NAN).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

#[test]
fn optimize_all_below_risk_free() {
    let err = optimize(&two_assets([0.01, 0.015]), 0.02).unwrap_err();
    assert!(matches!(err, Error::OptimizationInfeasible(_)));
}

#[test]
fn optimize_risk_free_equal_to_best_return() {
    // Zero excess return is not positive
    let err = optimize(&two_assets([0.02, 0.01]), 0.02).unwrap_err();
    assert!(matches!(err, Error::OptimizationInfeasible(_)));
}

#[test]
fn min_volatility_ignores_returns() {
    // Still feasible when nothing beats the risk-free rate
    let (w, _) = MeanVarianceOptimizer::default()
        .min_volatility(&two_assets([-0.5, -0.5]), 0.02)
        .unwrap();
    assert!((w.sum() - 1.0).abs() < 1e-6);
}

// ============================================================================
// Monte Carlo
// ============================================================================

#[test]
fn simulate_single_trial() {
    let r = simulate(&two_assets([0.1, 0.05]), 1, 0.0, 0).unwrap();
    assert_eq!(r.len(), 1);
    assert_eq!(r.max_sharpe_index(), 0);
    assert_eq!(r.min_volatility_index(), 0);
}

#[test]
fn simulate_infinite_risk_free_rate() {
    let err = simulate(&two_assets([0.1, 0.05]), 10, f64::INFINITY, 0).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

// ============================================================================
// Allocation
// ============================================================================

fn half_half() -> WeightVector {
    WeightVector::new(vec![(sym("A"), 0.5), (sym("B"), 0.5)])
}

fn prices() -> Vec<(Symbol, f64)> {
    vec![(sym("A"), 100.0), (sym("B"), 200.0)]
}

#[test]
fn allocate_zero_budget() {
    let alloc = allocate(&prices(), &half_half(), 0.0).unwrap();
    assert!(alloc.is_empty());
    assert_eq!(alloc.leftover, 0.0);
}

#[test]
fn allocate_nan_budget() {
    let err = allocate(&prices(), &half_half(), f64::NAN).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

#[test]
fn allocate_without_prices() {
    let err = allocate(&[], &half_half(), 1_000.0).unwrap_err();
    assert!(matches!(err, Error::AllocationInfeasible(_)));
}

#[test]
fn allocate_infinite_price() {
    let p = vec![(sym("A"), f64::INFINITY), (sym("B"), 200.0)];
    let err = allocate(&p, &half_half(), 1_000.0).unwrap_err();
    assert!(matches!(err, Error::InvalidPrice { .. }));
}

#[test]
fn allocate_weights_not_summing_to_one() {
    let w = WeightVector::new(vec![(sym("A"), 0.5), (sym("B"), 0.2)]);
    let err = allocate(&prices(), &w, 1_000.0).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

#[test]
fn allocate_huge_budget_stays_exact() {
    let alloc = allocate(&prices(), &half_half(), 1e9).unwrap();
    assert_eq!(alloc.get(&sym("A")), Some(5_000_000));
    assert_eq!(alloc.get(&sym("B")), Some(2_500_000));
    assert_eq!(alloc.leftover, 0.0);
}

#[test]
fn allocate_budget_beyond_share_limit() {
    let w = WeightVector::new(vec![(sym("A"), 1.0)]);
    let err = allocate(&[(sym("A"), 0.5)], &w, 1e20).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

#[test]
fn statistics_more_assets_than_rows() {
    // 12 assets quoted on 6 days
    let columns = (0..12)
        .map(|i| {
            let col = (0..6)
                .map(|t| Some(50.0 + (i * 7 + t * 3) as f64 % 11.0))
                .collect();
            (sym(&format!("S{i:02}")), col)
        })
        .collect();
    let h = PriceHistory::from_columns((0..6).collect(), columns).unwrap();
    let err = ReturnStatistics::derive(&h, ReturnEstimator::default(), Frequency::Daily).unwrap_err();
    assert!(matches!(err, Error::InsufficientData(_)));
}

#[test]
fn greedy_with_single_asset() {
    let w = WeightVector::new(vec![(sym("A"), 1.0)]);
    let alloc = DiscreteAllocator::new(AllocationMethod::Greedy)
        .allocate(&prices(), &w, 950.0)
        .unwrap();
    assert_eq!(alloc.get(&sym("A")), Some(9));
    assert_eq!(alloc.get(&sym("B")), None);
    assert_eq!(alloc.leftover, 50.0);
}
