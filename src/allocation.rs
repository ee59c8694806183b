//! Discrete allocation: whole-share buy orders from target weights and a budget.
//!
//! The exact method solves the integer program
//!
//! ```text
//! minimize   Σ |wᵢ·B − nᵢ·pᵢ| + leftover
//! subject to Σ nᵢ·pᵢ ≤ B,  nᵢ ∈ ℕ
//! ```
//!
//! Expanding the absolute value shows the objective equals
//! `2·(B − Σ min(nᵢ·pᵢ, wᵢ·B))`, so the program maximizes the target dollars
//! actually covered. That is a bounded knapsack: each asset offers
//! `floor(tᵢ/pᵢ)` shares worth their full price and one last share worth
//! only the residual `tᵢ mod pᵢ`. It is solved by depth-first
//! branch-and-bound with a fractional-knapsack bound, seeded with the greedy
//! allocation.

use std::fmt;

use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::types::Symbol;
use crate::weights::WeightVector;

/// How fractional weights become share counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AllocationMethod {
    /// Integer program, solved exactly.
    #[default]
    Exact,
    /// Floor pass, then one share at a time to the largest weight deficit.
    Greedy,
}

/// Whole-share holdings plus unspent cash.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Allocation {
    /// Non-zero share counts, in weight-vector order.
    pub shares: Vec<(Symbol, u64)>,
    /// Budget minus the cost of all shares (never negative).
    pub leftover: f64,
}

impl Allocation {
    pub fn get(&self, symbol: &Symbol) -> Option<u64> {
        self.shares.iter().find(|(s, _)| s == symbol).map(|(_, n)| *n)
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    /// Total cost of the holdings at the given prices.
    pub fn invested(&self, prices: &[(Symbol, f64)]) -> f64 {
        let price_map: FxHashMap<&Symbol, f64> = prices.iter().map(|(s, p)| (s, *p)).collect();
        self.shares
            .iter()
            .map(|(s, n)| *n as f64 * price_map.get(s).copied().unwrap_or(0.0))
            .sum()
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  {:<10} {:>8}", "Ticker", "Shares")?;
        for (sym, n) in &self.shares {
            writeln!(f, "  {:<10} {:>8}", sym.as_str(), n)?;
        }
        write!(f, "  Leftover cash: ${:.2}", self.leftover)
    }
}

/// Converts weights into share counts.
#[derive(Clone, Copy, Debug)]
pub struct DiscreteAllocator {
    pub method: AllocationMethod,
    /// Branch-and-bound nodes explored before settling for the incumbent.
    pub node_limit: usize,
}

impl Default for DiscreteAllocator {
    fn default() -> Self {
        Self {
            method: AllocationMethod::Exact,
            node_limit: 1_000_000,
        }
    }
}

/// Exact allocation with default settings.
pub fn allocate(
    latest_prices: &[(Symbol, f64)],
    weights: &WeightVector,
    budget: f64,
) -> Result<Allocation> {
    DiscreteAllocator::default().allocate(latest_prices, weights, budget)
}

/// Largest per-asset share count the allocator accepts (2^53). Above it,
/// share counts and their dollar cost are no longer exact in `f64`.
pub const MAX_SHARES: u64 = 1 << 53;

/// One weighted asset, ready for allocation.
#[derive(Clone, Debug)]
struct Target {
    symbol: Symbol,
    weight: f64,
    price: f64,
    /// Target dollars `weight * budget`.
    dollars: f64,
    /// Shares bought in full below target.
    floor: u64,
    /// Most shares worth considering (floor, plus one if a residual remains).
    cap: u64,
}

impl Target {
    /// Covered target dollars for `n` shares.
    fn value(&self, n: u64) -> f64 {
        (n as f64 * self.price).min(self.dollars)
    }

    fn residual(&self) -> f64 {
        self.dollars - self.floor as f64 * self.price
    }
}

impl DiscreteAllocator {
    pub fn new(method: AllocationMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    pub fn allocate(
        &self,
        latest_prices: &[(Symbol, f64)],
        weights: &WeightVector,
        budget: f64,
    ) -> Result<Allocation> {
        let targets = prepare(latest_prices, weights, budget)?;

        let counts = match self.method {
            AllocationMethod::Greedy => greedy(&targets, budget),
            AllocationMethod::Exact => self.exact(&targets, budget),
        };

        let cost: f64 = targets
            .iter()
            .zip(&counts)
            .map(|(t, &n)| n as f64 * t.price)
            .sum();

        Ok(Allocation {
            shares: targets
                .iter()
                .zip(counts)
                .filter(|(_, n)| *n > 0)
                .map(|(t, n)| (t.symbol.clone(), n))
                .collect(),
            leftover: (budget - cost).max(0.0),
        })
    }

    fn exact(&self, targets: &[Target], budget: f64) -> Vec<u64> {
        let incumbent = greedy(targets, budget);
        let mut search = Search::new(targets, budget, incumbent, self.node_limit);
        let mut counts = vec![0; targets.len()];
        search.dfs(0, 0.0, 0.0, &mut counts);

        if search.nodes > self.node_limit {
            warn!(
                "discrete allocation stopped after {} nodes; returning best allocation found",
                self.node_limit
            );
        } else {
            debug!("discrete allocation explored {} nodes", search.nodes);
        }
        search.best
    }
}

/// Validate inputs and build per-asset targets in weight-vector order.
fn prepare(latest_prices: &[(Symbol, f64)], weights: &WeightVector, budget: f64) -> Result<Vec<Target>> {
    if !budget.is_finite() || budget < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "budget must be a non-negative amount, got {budget}"
        )));
    }
    if latest_prices.is_empty() {
        return Err(Error::AllocationInfeasible("no latest prices supplied".into()));
    }
    if let Some((symbol, price)) = latest_prices
        .iter()
        .find(|(_, p)| !p.is_finite() || *p <= 0.0)
    {
        return Err(Error::InvalidPrice {
            symbol: symbol.clone(),
            price: *price,
        });
    }
    weights.validate()?;

    let price_map: FxHashMap<&Symbol, f64> = latest_prices.iter().map(|(s, p)| (s, *p)).collect();

    let mut targets = Vec::with_capacity(weights.len());
    for (symbol, weight) in weights.iter() {
        let weight = weight.max(0.0);
        if weight == 0.0 {
            continue;
        }
        let price = *price_map.get(symbol).ok_or_else(|| {
            Error::InvalidParameter(format!("no latest price for {symbol}"))
        })?;
        let dollars = weight * budget;
        let shares = (dollars / price).floor();
        if shares >= MAX_SHARES as f64 {
            return Err(Error::InvalidParameter(format!(
                "{symbol}: ${dollars} at ${price} is {shares} shares, above the {MAX_SHARES} share limit"
            )));
        }
        let floor = shares as u64;
        let residual = dollars - floor as f64 * price;
        let cap = if residual > 0.0 { floor + 1 } else { floor };
        targets.push(Target {
            symbol: symbol.clone(),
            weight,
            price,
            dollars,
            floor,
            cap,
        });
    }
    Ok(targets)
}

/// Floor every target, then repeatedly buy one share of the affordable asset
/// whose current weight lags its target the most. Assets are visited in
/// descending weight order; equal deficits go to the earlier one.
fn greedy(targets: &[Target], budget: f64) -> Vec<u64> {
    let mut order: Vec<usize> = (0..targets.len()).collect();
    order.sort_by(|&a, &b| {
        targets[b]
            .weight
            .partial_cmp(&targets[a].weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut counts: Vec<u64> = targets.iter().map(|t| t.floor).collect();
    let spent = |counts: &[u64]| -> f64 {
        targets
            .iter()
            .zip(counts)
            .map(|(t, &n)| n as f64 * t.price)
            .sum()
    };

    // Floors can overshoot by float error; trim the smallest weights first.
    while spent(&counts) > budget {
        match order.iter().rev().find(|&&i| counts[i] > 0) {
            Some(&i) => counts[i] -= 1,
            None => break,
        }
    }

    loop {
        let invested = spent(&counts);
        let mut pick: Option<(usize, f64)> = None;
        for &i in &order {
            let t = &targets[i];
            if invested + t.price > budget {
                continue;
            }
            let current = if invested > 0.0 {
                counts[i] as f64 * t.price / invested
            } else {
                0.0
            };
            let deficit = t.weight - current;
            if deficit > 0.0 && pick.is_none_or(|(_, d)| deficit > d) {
                pick = Some((i, deficit));
            }
        }

        match pick {
            Some((i, _)) => counts[i] += 1,
            None => break,
        }
    }

    counts
}

/// Depth-first branch-and-bound state.
struct Search<'a> {
    targets: &'a [Target],
    budget: f64,
    eps: f64,
    /// Residual shares sorted by value per dollar, best first.
    partials: Vec<usize>,
    /// Full-share dollars still available from targets at index >= k.
    suffix_full: Vec<f64>,
    best: Vec<u64>,
    best_value: f64,
    nodes: usize,
    node_limit: usize,
}

impl<'a> Search<'a> {
    fn new(targets: &'a [Target], budget: f64, incumbent: Vec<u64>, node_limit: usize) -> Self {
        let mut partials: Vec<usize> = (0..targets.len())
            .filter(|&i| targets[i].cap > targets[i].floor)
            .collect();
        partials.sort_by(|&a, &b| {
            let ra = targets[a].residual() / targets[a].price;
            let rb = targets[b].residual() / targets[b].price;
            rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut suffix_full = vec![0.0; targets.len() + 1];
        for k in (0..targets.len()).rev() {
            suffix_full[k] = suffix_full[k + 1] + targets[k].floor as f64 * targets[k].price;
        }

        let best_value = targets.iter().zip(&incumbent).map(|(t, &n)| t.value(n)).sum();

        Self {
            targets,
            budget,
            eps: 1e-9 * budget.max(1.0),
            partials,
            suffix_full,
            best: incumbent,
            best_value,
            nodes: 0,
            node_limit,
        }
    }

    /// Fractional-knapsack upper bound on value obtainable from targets `depth..`.
    fn bound(&self, depth: usize, remaining: f64) -> f64 {
        let full = self.suffix_full[depth].min(remaining);
        let mut value = full;
        let mut left = remaining - full;
        for &i in &self.partials {
            if left <= 0.0 {
                break;
            }
            if i < depth {
                continue;
            }
            let t = &self.targets[i];
            let take = left.min(t.price);
            value += t.residual() * take / t.price;
            left -= take;
        }
        value
    }

    /// Visit share counts for target `depth`, largest first. Ties with the
    /// incumbent never replace it, so the greedy seed wins ties, then the
    /// first solution found in this order.
    fn dfs(&mut self, depth: usize, cost: f64, value: f64, counts: &mut [u64]) {
        self.nodes += 1;
        if self.nodes > self.node_limit {
            return;
        }

        if depth == self.targets.len() {
            if value > self.best_value + self.eps {
                self.best_value = value;
                self.best.copy_from_slice(counts);
            }
            return;
        }

        let targets = self.targets;
        let t = &targets[depth];
        let affordable = ((self.budget - cost) / t.price).floor().max(0.0) as u64;
        let hi = t.cap.min(affordable);

        for n in (0..=hi).rev() {
            let c = cost + n as f64 * t.price;
            if c > self.budget {
                continue;
            }
            let v = value + t.value(n);
            if v + self.bound(depth + 1, self.budget - c) <= self.best_value + self.eps {
                // Below the floor each dropped share loses its full price and
                // frees at most that much bound, so fewer shares cannot help.
                if n <= t.floor {
                    break;
                }
                continue;
            }
            counts[depth] = n;
            self.dfs(depth + 1, c, v, counts);
            if self.nodes > self.node_limit {
                break;
            }
        }
        counts[depth] = 0;
    }
}
