//! The shared input: a validated date × asset table of daily returns.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use crate::error::{AllocError, Result};
use crate::weights::WeightVector;

/// Daily simple returns for a fixed set of assets.
///
/// Invariants, checked by [`ReturnsMatrix::new`]:
/// - at least one date and one asset,
/// - every row has one value per asset (rectangular),
/// - dates strictly increasing,
/// - asset names unique,
/// - every value finite.
///
/// The matrix is immutable once built; every engine only borrows it.
#[derive(Clone, Debug)]
pub struct ReturnsMatrix {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    /// One row per date, one column per asset
    rows: Vec<Vec<f64>>,
    index: FxHashMap<String, usize>,
}

impl ReturnsMatrix {
    /// Build a matrix from row-major data (`rows[date][asset]`).
    pub fn new<S: Into<String>>(
        dates: Vec<NaiveDate>,
        assets: Vec<S>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let assets: Vec<String> = assets.into_iter().map(Into::into).collect();

        if dates.is_empty() {
            return Err(AllocError::NoDates);
        }
        if assets.is_empty() {
            return Err(AllocError::NoAssets);
        }
        if rows.len() != dates.len() {
            return Err(AllocError::RowCount {
                dates: dates.len(),
                rows: rows.len(),
            });
        }

        let mut index = FxHashMap::default();
        for (i, asset) in assets.iter().enumerate() {
            if index.insert(asset.clone(), i).is_some() {
                return Err(AllocError::DuplicateAsset(asset.clone()));
            }
        }

        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(AllocError::UnorderedDates {
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }

        for (r, row) in rows.iter().enumerate() {
            if row.len() != assets.len() {
                return Err(AllocError::RaggedRow {
                    row: r,
                    expected: assets.len(),
                    found: row.len(),
                });
            }
            if let Some(c) = row.iter().position(|v| !v.is_finite()) {
                return Err(AllocError::NonFiniteReturn {
                    asset: assets[c].clone(),
                    date: dates[r],
                });
            }
        }

        Ok(Self {
            dates,
            assets,
            rows,
            index,
        })
    }

    /// Build a matrix from one `(asset, returns)` column per asset.
    pub fn from_columns<S: Into<String>>(
        dates: Vec<NaiveDate>,
        columns: Vec<(S, Vec<f64>)>,
    ) -> Result<Self> {
        let mut assets = Vec::with_capacity(columns.len());
        let mut rows = vec![Vec::with_capacity(columns.len()); dates.len()];

        for (asset, values) in columns {
            let asset: String = asset.into();
            if values.len() != dates.len() {
                return Err(AllocError::ColumnLength {
                    asset,
                    expected: dates.len(),
                    found: values.len(),
                });
            }
            for (row, v) in rows.iter_mut().zip(values) {
                row.push(v);
            }
            assets.push(asset);
        }

        Self::new(dates, assets, rows)
    }

    // === Queries ===

    #[inline]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    #[inline]
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Row-major values, `rows()[date][asset]`.
    #[inline]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    #[inline]
    pub fn num_dates(&self) -> usize {
        self.dates.len()
    }

    #[inline]
    pub fn num_assets(&self) -> usize {
        self.assets.len()
    }

    /// Column position of `asset`.
    pub fn asset_index(&self, asset: &str) -> Option<usize> {
        self.index.get(asset).copied()
    }

    /// The return series of a single asset.
    pub fn column(&self, asset: &str) -> Option<Vec<f64>> {
        let j = self.asset_index(asset)?;
        Some(self.rows.iter().map(|row| row[j]).collect())
    }

    /// Weights laid out in column order.
    ///
    /// Assets missing from `weights` get 0. A weight for an asset the
    /// matrix does not contain is an error.
    pub fn aligned_weights(&self, weights: &WeightVector) -> Result<Vec<f64>> {
        let mut out = vec![0.0; self.assets.len()];
        for (asset, w) in weights.iter() {
            let j = self
                .asset_index(asset)
                .ok_or_else(|| AllocError::UnknownAsset(asset.to_string()))?;
            out[j] = w;
        }
        Ok(out)
    }

    /// Daily portfolio returns: each row dotted with `weights`.
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use nanoalloc::{ReturnsMatrix, WeightVector};
    ///
    /// let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
    /// let returns = ReturnsMatrix::from_columns(
    ///     vec![d(2), d(3)],
    ///     vec![("A", vec![0.01, -0.01]), ("B", vec![0.00, 0.01])],
    /// )
    /// .unwrap();
    /// let weights = WeightVector::from_pairs([("A", 0.6), ("B", 0.4)]);
    /// let port = returns.portfolio_returns(&weights).unwrap();
    /// assert!((port[0] - 0.006).abs() < 1e-12);
    /// assert!((port[1] + 0.002).abs() < 1e-12);
    /// ```
    pub fn portfolio_returns(&self, weights: &WeightVector) -> Result<Vec<f64>> {
        let w = self.aligned_weights(weights)?;
        Ok(self.project(&w))
    }

    /// Row-wise dot product with column-ordered weights.
    pub(crate) fn project(&self, weights: &[f64]) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.iter().zip(weights).map(|(r, w)| r * w).sum())
            .collect()
    }

    // === Extension ===

    /// Append a cash column earning `rate`, compounded daily.
    ///
    /// The daily return for an annual rate `a` is `(1 + a)^(1/trading_days) - 1`.
    pub fn with_cash(
        self,
        name: impl Into<String>,
        rate: &CashRate,
        trading_days: f64,
    ) -> Result<Self> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(AllocError::DuplicateAsset(name));
        }

        let Self {
            dates,
            mut assets,
            mut rows,
            ..
        } = self;

        for (row, date) in rows.iter_mut().zip(&dates) {
            let annual = rate.annual_rate(*date);
            row.push((1.0 + annual).powf(1.0 / trading_days) - 1.0);
        }
        assets.push(name);

        Self::new(dates, assets, rows)
    }
}

/// Bank margin added to the policy rate by [`CashRate::policy_rate`].
pub const DEFAULT_BANK_MARGIN: f64 = 0.0075;

/// Annual rate used when neither a constant rate nor policy rates are wanted.
pub const FALLBACK_CASH_RATE: f64 = 0.02;

/// Swedish Riksbank repo-rate changes, 2007 onwards.
const RIKSBANK_REPO_STEPS: [((i32, u32, u32), f64); 9] = [
    ((2007, 1, 1), 0.035),
    ((2009, 1, 1), 0.005),
    ((2010, 7, 1), 0.0),
    ((2022, 4, 1), 0.0075),
    ((2022, 9, 1), 0.015),
    ((2022, 11, 1), 0.02),
    ((2023, 2, 1), 0.025),
    ((2023, 9, 1), 0.0275),
    ((2024, 1, 1), 0.035),
];

/// Annual interest earned by a cash allocation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CashRate {
    /// The same annual rate on every date.
    Constant(f64),
    /// A policy-rate step function plus a fixed bank margin.
    ///
    /// Each `(effective_from, rate)` step applies from its date until the
    /// next step. Dates before the first step use the first step's rate.
    Schedule {
        steps: Vec<(NaiveDate, f64)>,
        margin: f64,
    },
}

impl Default for CashRate {
    fn default() -> Self {
        Self::policy_rate(DEFAULT_BANK_MARGIN)
    }
}

impl CashRate {
    /// Historical Riksbank repo rate plus `margin`.
    ///
    /// Dates before 2007 use the first step (3.5%); dates after the last
    /// change keep 3.5%.
    pub fn policy_rate(margin: f64) -> Self {
        let steps = RIKSBANK_REPO_STEPS
            .iter()
            .filter_map(|&((y, m, d), rate)| {
                NaiveDate::from_ymd_opt(y, m, d).map(|from| (from, rate))
            })
            .collect();
        CashRate::Schedule { steps, margin }
    }

    /// The annual rate in effect on `date`.
    pub fn annual_rate(&self, date: NaiveDate) -> f64 {
        match self {
            CashRate::Constant(rate) => *rate,
            CashRate::Schedule { steps, margin } => {
                let base = steps
                    .iter()
                    .take_while(|(from, _)| *from <= date)
                    .last()
                    .or_else(|| steps.first())
                    .map(|(_, rate)| *rate)
                    .unwrap_or(0.0);
                base + margin
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn two_assets() -> ReturnsMatrix {
        ReturnsMatrix::from_columns(
            vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4), d(2024, 1, 5)],
            vec![
                ("A", vec![0.01, -0.01, 0.02, 0.00]),
                ("B", vec![0.00, 0.01, -0.01, 0.02]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn constant_rate_ignores_date() {
        let rate = CashRate::Constant(0.01);
        assert_eq!(rate.annual_rate(d(2008, 6, 1)), 0.01);
        assert_eq!(rate.annual_rate(d(2024, 6, 1)), 0.01);
    }

    #[test]
    fn policy_rate_follows_repo_steps() {
        let rate = CashRate::default();
        let close = |date, want: f64| (rate.annual_rate(date) - want).abs() < 1e-12;
        assert!(close(d(2005, 3, 1), 0.035 + 0.0075));
        assert!(close(d(2009, 6, 1), 0.005 + 0.0075));
        assert!(close(d(2015, 6, 1), 0.0075));
        assert!(close(d(2022, 10, 3), 0.015 + 0.0075));
        assert!(close(d(2023, 8, 31), 0.025 + 0.0075));
        assert!(close(d(2023, 9, 1), 0.0275 + 0.0075));
        assert!(close(d(2030, 1, 1), 0.035 + 0.0075));

        let bare = CashRate::policy_rate(0.0);
        assert_eq!(bare.annual_rate(d(2015, 6, 1)), 0.0);
    }

    #[test]
    fn shape_and_lookup() {
        let m = two_assets();
        assert_eq!(m.num_dates(), 4);
        assert_eq!(m.num_assets(), 2);
        assert_eq!(m.asset_index("B"), Some(1));
        assert_eq!(m.column("A").unwrap(), vec![0.01, -0.01, 0.02, 0.00]);
        assert!(m.column("C").is_none());
    }

    #[test]
    fn portfolio_projection() {
        let m = two_assets();
        let w = WeightVector::from_pairs([("A", 0.6), ("B", 0.4)]);
        let port = m.portfolio_returns(&w).unwrap();
        let expected = [0.006, -0.002, 0.008, 0.008];
        for (p, e) in port.iter().zip(expected) {
            assert!((p - e).abs() < 1e-12, "got {p}, expected {e}");
        }
    }

    #[test]
    fn missing_weight_is_zero() {
        let m = two_assets();
        let w = WeightVector::from_pairs([("B", 1.0)]);
        assert_eq!(m.aligned_weights(&w).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn unknown_weight_is_rejected() {
        let m = two_assets();
        let w = WeightVector::from_pairs([("GOLD", 1.0)]);
        assert!(matches!(
            m.portfolio_returns(&w),
            Err(AllocError::UnknownAsset(a)) if a == "GOLD"
        ));
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = ReturnsMatrix::new(
            vec![d(2024, 1, 2), d(2024, 1, 3)],
            vec!["A", "B"],
            vec![vec![0.0, 0.0], vec![0.0]],
        )
        .unwrap_err();
        assert!(matches!(err, AllocError::RaggedRow { row: 1, .. }));
    }

    #[test]
    fn rejects_unordered_dates() {
        let err = ReturnsMatrix::new(
            vec![d(2024, 1, 3), d(2024, 1, 2)],
            vec!["A"],
            vec![vec![0.0], vec![0.0]],
        )
        .unwrap_err();
        assert!(matches!(err, AllocError::UnorderedDates { .. }));
    }

    #[test]
    fn rejects_duplicate_dates() {
        let err = ReturnsMatrix::new(
            vec![d(2024, 1, 2), d(2024, 1, 2)],
            vec!["A"],
            vec![vec![0.0], vec![0.0]],
        )
        .unwrap_err();
        assert!(matches!(err, AllocError::UnorderedDates { .. }));
    }

    #[test]
    fn rejects_nan() {
        let err = ReturnsMatrix::new(vec![d(2024, 1, 2)], vec!["A"], vec![vec![f64::NAN]])
            .unwrap_err();
        assert!(matches!(err, AllocError::NonFiniteReturn { .. }));
    }

    #[test]
    fn rejects_duplicate_assets() {
        let err = ReturnsMatrix::new(vec![d(2024, 1, 2)], vec!["A", "A"], vec![vec![0.0, 0.0]])
            .unwrap_err();
        assert!(matches!(err, AllocError::DuplicateAsset(_)));
    }

    #[test]
    fn rejects_empty() {
        let no_assets: Vec<&str> = vec![];
        assert!(matches!(
            ReturnsMatrix::new(vec![], vec!["A"], vec![]),
            Err(AllocError::NoDates)
        ));
        assert!(matches!(
            ReturnsMatrix::new(vec![d(2024, 1, 2)], no_assets, vec![vec![]]),
            Err(AllocError::NoAssets)
        ));
    }

    #[test]
    fn constant_cash_column() {
        let m = two_assets()
            .with_cash("Cash", &CashRate::Constant(0.02), 252.0)
            .unwrap();
        assert_eq!(m.num_assets(), 3);
        let cash = m.column("Cash").unwrap();
        let daily = 1.02_f64.powf(1.0 / 252.0) - 1.0;
        assert!(cash.iter().all(|r| (r - daily).abs() < 1e-15));

        // Compounding a full year of trading days recovers the annual rate
        let annual = (1.0 + daily).powi(252) - 1.0;
        assert!((annual - 0.02).abs() < 1e-12);
    }

    #[test]
    fn scheduled_cash_rate() {
        let rate = CashRate::Schedule {
            steps: vec![(d(2009, 1, 1), 0.005), (d(2022, 4, 1), 0.0075)],
            margin: 0.0075,
        };
        assert!((rate.annual_rate(d(2008, 6, 1)) - 0.0125).abs() < 1e-15);
        assert!((rate.annual_rate(d(2015, 6, 1)) - 0.0125).abs() < 1e-15);
        assert!((rate.annual_rate(d(2022, 4, 1)) - 0.015).abs() < 1e-15);
    }

    #[test]
    fn cash_name_must_be_new() {
        let err = two_assets()
            .with_cash("A", &CashRate::Constant(0.01), 252.0)
            .unwrap_err();
        assert!(matches!(err, AllocError::DuplicateAsset(_)));
    }
}
