//! nanofolio-cli: command-line front end for nanofolio.
//!
//! Reads aligned closing prices from a JSON file, then optimizes (maximum
//! Sharpe or minimum volatility), runs a Monte Carlo search, or converts a
//! weights file into whole-share buy orders under a budget.

pub mod commands;
pub mod config;
pub mod error;
pub mod price_file;
pub mod report;
pub mod weights_file;
