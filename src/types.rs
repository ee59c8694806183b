//! Core types: Symbol, Timestamp, Frequency

use std::fmt;

/// Asset identifier (ticker), stored trimmed and upper-cased.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Symbol(String);

impl Symbol {
    pub fn new(ticker: &str) -> Self {
        Symbol(ticker.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

/// Point on a price history's time axis (caller-defined unit, e.g. days since epoch).
///
/// Only the ordering matters to the core.
pub type Timestamp = i64;

/// Sampling interval of a price history, which fixes the annualization factor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Trading periods per year.
    pub fn periods_per_year(self) -> f64 {
        match self {
            Frequency::Daily => 252.0,
            Frequency::Weekly => 52.0,
            Frequency::Monthly => 12.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_normalizes() {
        assert_eq!(Symbol::new(" aapl ").as_str(), "AAPL");
        assert_eq!(Symbol::from("brk-b"), Symbol::new("BRK-B"));
        assert!(Symbol::new("  ").is_empty());
    }

    #[test]
    fn symbol_display() {
        assert_eq!(format!("{}", Symbol::new("msft")), "MSFT");
    }

    #[test]
    fn periods_per_year() {
        assert_eq!(Frequency::Daily.periods_per_year(), 252.0);
        assert_eq!(Frequency::Weekly.periods_per_year(), 52.0);
        assert_eq!(Frequency::Monthly.periods_per_year(), 12.0);
        assert_eq!(Frequency::default(), Frequency::Daily);
    }
}
