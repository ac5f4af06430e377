//! Financial performance metrics.
//!
//! All return-based metrics assume simple (not log) daily returns.
//! Annualization uses a `trading_days` factor (252 by default).
//! Undefined results are reported as `f64::NAN`, never as a panic.

use chrono::NaiveDate;

use crate::returns::ReturnsMatrix;

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Calendar days per year used by [`cagr`].
const DAYS_PER_YEAR: f64 = 365.25;

/// Annualization and risk-free settings shared by the metric functions.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsParams {
    /// Trading days per year (252 for daily data)
    pub trading_days: f64,
    /// Annual risk-free rate as a decimal (0.02 = 2%)
    pub risk_free: f64,
}

impl Default for MetricsParams {
    fn default() -> Self {
        Self {
            trading_days: TRADING_DAYS,
            risk_free: 0.0,
        }
    }
}

/// The four headline metrics of a portfolio path.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioMetrics {
    /// Compound annual growth rate
    pub cagr: f64,
    /// Annualized volatility (sample standard deviation)
    pub annual_vol: f64,
    /// Annualized Sharpe ratio, NaN when volatility is zero
    pub sharpe: f64,
    /// Maximum drawdown as a non-positive fraction (-0.25 = 25% peak-to-trough)
    pub max_drawdown: f64,
}

impl std::fmt::Display for PortfolioMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Portfolio Metrics")?;
        writeln!(f, "  CAGR:            {:>8.2}%", self.cagr * 100.0)?;
        writeln!(f, "  Volatility:      {:>8.2}%", self.annual_vol * 100.0)?;
        writeln!(f, "  Sharpe:          {:>8.2}", self.sharpe)?;
        writeln!(f, "  Max drawdown:    {:>8.2}%", self.max_drawdown * 100.0)
    }
}

/// Per-asset mean daily return × `trading_days`.
pub fn annualized_mean(returns: &ReturnsMatrix, trading_days: f64) -> Vec<f64> {
    column_means(returns.rows())
        .into_iter()
        .map(|m| m * trading_days)
        .collect()
}

/// Sample covariance matrix (n − 1 denominator) × `trading_days`.
///
/// With a single date every entry is NaN.
pub fn annualized_covariance(returns: &ReturnsMatrix, trading_days: f64) -> Vec<Vec<f64>> {
    let rows = returns.rows();
    let cols = returns.num_assets();
    let means = column_means(rows);

    let mut cov = vec![vec![0.0; cols]; cols];
    for row in rows {
        for i in 0..cols {
            let di = row[i] - means[i];
            for j in i..cols {
                cov[i][j] += di * (row[j] - means[j]);
            }
        }
    }

    let denom = rows.len() as f64 - 1.0;
    for i in 0..cols {
        for j in i..cols {
            let v = if denom > 0.0 {
                cov[i][j] / denom * trading_days
            } else {
                f64::NAN
            };
            cov[i][j] = v;
            cov[j][i] = v;
        }
    }

    cov
}

/// Cumulative value path: `start * Π(1 + r)`, one entry per return.
pub fn value_series(returns: &[f64], start_value: f64) -> Vec<f64> {
    returns
        .iter()
        .scan(start_value, |value, &r| {
            *value *= 1.0 + r;
            Some(*value)
        })
        .collect()
}

/// Compound annual growth rate of a dated value series.
///
/// `(last / first)^(365.25 / days) - 1`, where `days` is the calendar
/// distance between the first and last dates. NaN with fewer than two
/// points or when no calendar time elapses.
pub fn cagr(dates: &[NaiveDate], values: &[f64]) -> f64 {
    let (Some(first_date), Some(last_date)) = (dates.first(), dates.last()) else {
        return f64::NAN;
    };
    if values.len() < 2 || dates.len() != values.len() {
        return f64::NAN;
    }

    let days = (*last_date - *first_date).num_days();
    if days <= 0 {
        return f64::NAN;
    }

    let years = days as f64 / DAYS_PER_YEAR;
    (values[values.len() - 1] / values[0]).powf(1.0 / years) - 1.0
}

/// Sample standard deviation of daily returns × √`trading_days`.
///
/// NaN with fewer than two observations.
pub fn annualized_volatility(returns: &[f64], trading_days: f64) -> f64 {
    sample_std(returns) * trading_days.sqrt()
}

/// `(mean × trading_days − risk_free) / annualized_volatility`.
///
/// Returns NaN when the volatility is exactly zero (or undefined).
pub fn sharpe_ratio(returns: &[f64], risk_free: f64, trading_days: f64) -> f64 {
    let vol = annualized_volatility(returns, trading_days);
    if vol == 0.0 || vol.is_nan() {
        return f64::NAN;
    }
    let annual_mean = mean(returns) * trading_days;
    (annual_mean - risk_free) / vol
}

/// Most negative `value / running_max - 1` over the series.
///
/// Always ≤ 0; 0 for a non-decreasing or empty series.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for &v in values {
        if v > peak {
            peak = v;
        }
        let dd = v / peak - 1.0;
        if dd < max_dd {
            max_dd = dd;
        }
    }

    max_dd
}

/// CAGR, volatility, Sharpe and drawdown of a dated daily-return series.
///
/// The value path starts at 1.0 and already includes the first return.
pub fn portfolio_metrics(
    dates: &[NaiveDate],
    returns: &[f64],
    params: &MetricsParams,
) -> PortfolioMetrics {
    let values = value_series(returns, 1.0);
    PortfolioMetrics {
        cagr: cagr(dates, &values),
        annual_vol: annualized_volatility(returns, params.trading_days),
        sharpe: sharpe_ratio(returns, params.risk_free, params.trading_days),
        max_drawdown: max_drawdown(&values),
    }
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn sample_std(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return f64::NAN;
    }
    let m = mean(xs);
    let ss = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>();
    (ss / (xs.len() - 1) as f64).sqrt()
}

fn column_means(rows: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };

    let mut sums = vec![0.0; first.len()];
    for row in rows {
        for (s, v) in sums.iter_mut().zip(row) {
            *s += *v;
        }
    }

    sums.into_iter().map(|s| s / rows.len() as f64).collect()
}
