//! Target weights file (weights.json) loading and validation.
//!
//! The layout matches the `weights` array of `optimize --json`, so one
//! command's output can be fed to `allocate`. Extra keys are ignored.

use std::path::Path;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use nanofolio::{Symbol, WeightVector};

use crate::error::{Error, Result};

/// Long-only target weights summing to 1.
#[derive(Debug, Clone, Deserialize)]
pub struct WeightsFile {
    pub weights: Vec<TargetWeight>,
}

/// A single target: symbol + weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetWeight {
    pub symbol: String,
    pub weight: f64,
}

impl WeightsFile {
    /// Load and validate a weights file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::WeightsRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let file: WeightsFile = serde_json::from_str(json)?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> Result<()> {
        if self.weights.is_empty() {
            return Err(Error::Weights("weights list is empty".into()));
        }

        let mut seen = FxHashSet::default();
        for t in &self.weights {
            let sym = Symbol::new(&t.symbol);
            if sym.is_empty() {
                return Err(Error::Weights("empty symbol".into()));
            }
            if !seen.insert(sym) {
                return Err(Error::Weights(format!("duplicate symbol: {}", t.symbol)));
            }
        }

        self.to_weight_vector().validate()?;
        Ok(())
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.weights.iter().map(|t| Symbol::new(&t.symbol)).collect()
    }

    pub fn to_weight_vector(&self) -> WeightVector {
        WeightVector::new(
            self.weights
                .iter()
                .map(|t| (Symbol::new(&t.symbol), t.weight))
                .collect(),
        )
    }
}
