//! Weight drift and periodic rebalancing simulation.
//!
//! Both policies track a value per asset, grow it by `(1 + r)` each date and
//! record the normalized weights. Buy-and-hold never trades; the periodic
//! policy resets values to the target at the end of every calendar period
//! and records the turnover of that trade.

pub mod frequency;

pub use frequency::{Frequency, FrequencyUnit};

use chrono::NaiveDate;

use crate::error::{AllocError, Result};
use crate::returns::ReturnsMatrix;
use crate::weights::WeightVector;

// ============================================================================
// Output types
// ============================================================================

/// Portfolio weights on every date, one row per input date.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightPath {
    assets: Vec<String>,
    rows: Vec<(NaiveDate, Vec<f64>)>,
}

impl WeightPath {
    fn with_capacity(assets: &[String], capacity: usize) -> Self {
        Self {
            assets: assets.to_vec(),
            rows: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, date: NaiveDate, weights: Vec<f64>) {
        debug_assert_eq!(weights.len(), self.assets.len());
        self.rows.push((date, weights));
    }

    /// Column order of every row.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn rows(&self) -> &[(NaiveDate, Vec<f64>)] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Weights recorded on `date`.
    pub fn weights_on(&self, date: NaiveDate) -> Option<WeightVector> {
        self.rows
            .binary_search_by_key(&date, |(d, _)| *d)
            .ok()
            .map(|i| WeightVector::from_parts(&self.assets, &self.rows[i].1))
    }

    /// Weights on the final date.
    pub fn last(&self) -> Option<WeightVector> {
        self.rows
            .last()
            .map(|(_, w)| WeightVector::from_parts(&self.assets, w))
    }
}

/// Turnover of each rebalance, keyed by the period's last date.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TurnoverRecord {
    entries: Vec<(NaiveDate, f64)>,
}

impl TurnoverRecord {
    pub fn entries(&self) -> &[(NaiveDate, f64)] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all turnovers.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, t)| t).sum()
    }

    /// Average turnover per rebalance; NaN when empty.
    pub fn mean(&self) -> f64 {
        if self.entries.is_empty() {
            return f64::NAN;
        }
        self.total() / self.entries.len() as f64
    }
}

/// Result of [`simulate_rebalancing`].
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalanceOutcome {
    pub weights: WeightPath,
    pub turnover: TurnoverRecord,
}

// ============================================================================
// Simulations
// ============================================================================

/// Weight drift of a portfolio that is never traded.
///
/// Each asset's value is its initial weight times the cumulative product of
/// `(1 + r)`; the recorded weight is value over total. Assets absent from
/// `init_weights` hold zero.
///
/// ```
/// use chrono::NaiveDate;
/// use nanoalloc::{ReturnsMatrix, WeightVector, weights_over_time_buy_and_hold};
///
/// let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
/// let returns = ReturnsMatrix::from_columns(
///     vec![d(2), d(3)],
///     vec![("A", vec![0.10, 0.0]), ("B", vec![0.0, 0.0])],
/// )
/// .unwrap();
/// let start = WeightVector::from_pairs([("A", 0.5), ("B", 0.5)]);
///
/// let path = weights_over_time_buy_and_hold(&returns, &start).unwrap();
/// let w = path.last().unwrap();
/// assert!((w.get("A").unwrap() - 0.55 / 1.05).abs() < 1e-12);
/// ```
pub fn weights_over_time_buy_and_hold(
    returns: &ReturnsMatrix,
    init_weights: &WeightVector,
) -> Result<WeightPath> {
    let mut values = starting_values(returns, init_weights)?;
    let mut path = WeightPath::with_capacity(returns.assets(), returns.num_dates());

    for (date, row) in returns.dates().iter().zip(returns.rows()) {
        grow(&mut values, row);
        path.push(*date, normalized(&values));
    }

    log::debug!(
        "buy-and-hold over {} dates, {} assets",
        path.len(),
        returns.num_assets()
    );
    Ok(path)
}

/// Periodic rebalancing back to `target` at the end of each period.
///
/// Values start at `target`. On the last date of every non-empty period the
/// turnover `0.5 × Σ|target - drifted|` is recorded and values are reset to
/// `total × target`. The weight row for that date shows the drifted
/// (pre-rebalance) weights.
pub fn simulate_rebalancing(
    returns: &ReturnsMatrix,
    target: &WeightVector,
    frequency: Frequency,
) -> Result<RebalanceOutcome> {
    let target_w = starting_values(returns, target)?;
    let mut values = target_w.clone();
    let mut path = WeightPath::with_capacity(returns.assets(), returns.num_dates());
    let mut turnover = TurnoverRecord::default();

    let dates = returns.dates();
    let rows = returns.rows();
    let mut start = 0;

    for end in frequency.period_ends(dates) {
        for i in start..=end {
            grow(&mut values, &rows[i]);
            path.push(dates[i], normalized(&values));
        }

        let drifted = normalized(&values);
        let t = 0.5
            * target_w
                .iter()
                .zip(&drifted)
                .map(|(a, b)| (a - b).abs())
                .sum::<f64>();
        turnover.entries.push((dates[end], t));

        let total: f64 = values.iter().sum();
        for (v, w) in values.iter_mut().zip(&target_w) {
            *v = total * w;
        }
        start = end + 1;
    }

    log::debug!(
        "rebalanced {} times at {frequency}, mean turnover {:.4}",
        turnover.len(),
        turnover.mean()
    );

    Ok(RebalanceOutcome {
        weights: path,
        turnover,
    })
}

fn starting_values(returns: &ReturnsMatrix, weights: &WeightVector) -> Result<Vec<f64>> {
    let w = returns.aligned_weights(weights)?;
    let sum: f64 = w.iter().sum();
    if sum.is_nan() || sum <= 0.0 || w.iter().any(|x| !x.is_finite()) {
        return Err(AllocError::NonPositiveWeights(sum));
    }
    Ok(w)
}

fn grow(values: &mut [f64], row: &[f64]) {
    for (v, r) in values.iter_mut().zip(row) {
        *v *= 1.0 + r;
    }
}

fn normalized(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    values.iter().map(|v| v / total).collect()
}
