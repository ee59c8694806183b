//! Integration tests for the command runners, driven through files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use tempfile::TempDir;

use nanofolio::Symbol;
use nanofolio_cli::commands;
use nanofolio_cli::config::{Config, ObjectiveKind};
use nanofolio_cli::error::Error;
use nanofolio_cli::price_file::PriceFile;
use nanofolio_cli::weights_file::WeightsFile;

/// 300 closes for A (steady) and B (twice as volatile, half the drift).
fn price_json(days: u64) -> String {
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    let mut dates = Vec::new();
    let (mut a, mut b) = (100.0_f64, 50.0_f64);
    let (mut col_a, mut col_b) = (Vec::new(), Vec::new());
    for t in 0..days {
        dates.push(format!("\"{}\"", start.checked_add_days(Days::new(t)).unwrap()));
        col_a.push(format!("{a:.6}"));
        col_b.push(format!("{b:.6}"));
        let x = t as f64;
        a *= 1.0 + 0.0010 + 0.010 * (1.3 * x).sin();
        b *= 1.0 + 0.0005 + 0.020 * (0.7 * x + 1.0).sin();
    }
    format!(
        r#"{{"dates": [{}], "prices": {{"A": [{}], "B": [{}]}}}}"#,
        dates.join(","),
        col_a.join(","),
        col_b.join(",")
    )
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn history(dir: &Path) -> nanofolio::PriceHistory {
    let path = write(dir, "prices.json", &price_json(300));
    PriceFile::load(&path).unwrap().into_history(None).unwrap()
}

fn weight_of(weights: &[nanofolio_cli::weights_file::TargetWeight], symbol: &str) -> f64 {
    weights
        .iter()
        .find(|w| w.symbol == symbol)
        .map_or(0.0, |w| w.weight)
}

// ============================================================================
// optimize
// ============================================================================

#[test]
fn optimize_prefers_steadier_asset() {
    let dir = TempDir::new().unwrap();
    let config = Config::default();
    let report = commands::optimize(&config, &history(dir.path()), true).unwrap();

    let sum: f64 = report.weights.iter().map(|w| w.weight).sum();
    assert!((sum - 1.0).abs() < 1e-6);
    assert!(weight_of(&report.weights, "A") > weight_of(&report.weights, "B"));

    let alloc = report.allocation.unwrap();
    assert!(alloc.invested <= config.allocation.budget);
    assert!(alloc.leftover >= 0.0);
    assert!((alloc.invested + alloc.leftover - config.allocation.budget).abs() < 1e-6);
}

#[test]
fn optimize_min_volatility() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.optimizer.objective = ObjectiveKind::MinVolatility;
    let report = commands::optimize(&config, &history(dir.path()), false).unwrap();

    assert_eq!(report.objective, "min volatility");
    assert!(report.allocation.is_none());
    assert!(weight_of(&report.weights, "A") > weight_of(&report.weights, "B"));
}

#[test]
fn optimize_single_ticker_gets_everything() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "prices.json", &price_json(60));
    let history = PriceFile::load(&path)
        .unwrap()
        .into_history(Some(&[Symbol::new("b")]))
        .unwrap();
    let report = commands::optimize(&Config::default(), &history, false).unwrap();
    assert_eq!(report.weights.len(), 1);
    assert_eq!(report.weights[0].weight, 1.0);
}

#[test]
fn optimize_json_feeds_allocate() {
    let dir = TempDir::new().unwrap();
    let config = Config::default();
    let history = history(dir.path());

    let report = commands::optimize(&config, &history, true).unwrap();
    let json = commands::render(&report, true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["performance"]["sharpe"].is_number());
    assert!(value["allocation"]["holdings"].is_array());

    let weights_path = write(dir.path(), "weights.json", &json);
    let weights = WeightsFile::load(&weights_path).unwrap();
    let alloc = commands::allocate(&config, &history, &weights.to_weight_vector()).unwrap();
    assert!((alloc.leftover - report.allocation.unwrap().leftover).abs() < 1e-6);
}

// ============================================================================
// simulate
// ============================================================================

#[test]
fn simulate_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let history = history(dir.path());
    let mut config = Config::default();
    config.simulation.num_portfolios = 500;

    let a = commands::simulate(&config, &history, true).unwrap();
    let b = commands::simulate(&config, &history, true).unwrap();
    assert_eq!(a.max_sharpe.trial, b.max_sharpe.trial);
    assert_eq!(a.min_volatility.trial, b.min_volatility.trial);
    assert_eq!(
        commands::render(&a, true).unwrap(),
        commands::render(&b, true).unwrap()
    );

    assert!(!a.frontier.is_empty());
    assert!(a.allocation.unwrap().invested <= config.allocation.budget);
}

#[test]
fn simulate_text_report() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.simulation.num_portfolios = 100;
    let report = commands::simulate(&config, &history(dir.path()), false).unwrap();
    let text = commands::render(&report, false).unwrap();
    assert!(text.contains("MAX SHARPE"));
    assert!(text.contains("MIN VOLATILITY"));
    assert!(!text.contains("ALLOCATION"));
}

// ============================================================================
// allocate
// ============================================================================

#[test]
fn allocate_small_budget_is_empty() {
    let dir = TempDir::new().unwrap();
    let history = history(dir.path());
    let weights = WeightsFile::from_json(
        r#"{"weights": [{"symbol": "A", "weight": 0.5}, {"symbol": "B", "weight": 0.5}]}"#,
    )
    .unwrap();

    let mut config = Config::default();
    config.allocation.budget = 1.0;
    let report = commands::allocate(&config, &history, &weights.to_weight_vector()).unwrap();
    assert!(report.holdings.is_empty());
    assert_eq!(report.leftover, 1.0);
}

#[test]
fn allocate_unknown_symbol_fails() {
    let dir = TempDir::new().unwrap();
    let history = history(dir.path());
    let weights = WeightsFile::from_json(r#"{"weights": [{"symbol": "ZZZ", "weight": 1.0}]}"#).unwrap();
    let err = commands::allocate(&Config::default(), &history, &weights.to_weight_vector()).unwrap_err();
    assert!(matches!(err, Error::Core(nanofolio::Error::InvalidParameter(_))));
}

// ============================================================================
// files
// ============================================================================

#[test]
fn config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "config.toml",
        "[simulation]\nnum_portfolios = 250\nseed = 9\n\n[allocation]\nmethod = \"greedy\"\n",
    );
    let config = Config::load(&path).unwrap();
    assert_eq!(config.simulation.num_portfolios, 250);
    assert_eq!(config.simulation.seed, 9);
    assert_eq!(config.allocation.method, nanofolio::AllocationMethod::Greedy);
}

#[test]
fn missing_files_report_path() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.json");
    assert!(matches!(PriceFile::load(&missing), Err(Error::PricesRead { .. })));
    assert!(matches!(WeightsFile::load(&missing), Err(Error::WeightsRead { .. })));
    assert!(matches!(Config::load(&missing), Err(Error::ConfigRead { .. })));
}

#[test]
fn invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "config.toml", "[simulation]\nnum_portfolios = 0\n");
    assert!(matches!(Config::load(&path), Err(Error::Config(_))));
}
