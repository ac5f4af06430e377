//! Monte Carlo exploration of the long-only weight simplex.
//!
//! Weights are drawn from a symmetric Dirichlet(1) distribution, i.e.
//! uniformly over `{ w >= 0, Σw = 1 }`, and each draw is scored on the
//! historical portfolio return series it implies.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Dirichlet, Distribution};

use crate::error::{AllocError, Result};
use crate::metrics::{MetricsParams, portfolio_metrics};
use crate::returns::ReturnsMatrix;
use crate::weights::WeightVector;

/// One random portfolio and its historical performance.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioSampleRecord {
    pub weights: WeightVector,
    pub cagr: f64,
    pub annual_vol: f64,
    /// NaN when the portfolio's return series has zero volatility
    pub sharpe: f64,
    pub max_drawdown: f64,
}

/// Scored draws, in draw order.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortfolioSamples {
    records: Vec<PortfolioSampleRecord>,
}

impl PortfolioSamples {
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PortfolioSampleRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PortfolioSampleRecord> {
        self.records.iter()
    }

    pub fn into_vec(self) -> Vec<PortfolioSampleRecord> {
        self.records
    }

    /// Draw with the highest Sharpe ratio. NaN ratios never win.
    pub fn max_sharpe(&self) -> Option<&PortfolioSampleRecord> {
        self.records
            .iter()
            .filter(|r| !r.sharpe.is_nan())
            .max_by(|a, b| a.sharpe.total_cmp(&b.sharpe))
    }

    /// Draw with the lowest annualized volatility.
    pub fn min_volatility(&self) -> Option<&PortfolioSampleRecord> {
        self.records
            .iter()
            .filter(|r| !r.annual_vol.is_nan())
            .min_by(|a, b| a.annual_vol.total_cmp(&b.annual_vol))
    }
}

impl IntoIterator for PortfolioSamples {
    type Item = PortfolioSampleRecord;
    type IntoIter = std::vec::IntoIter<PortfolioSampleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a PortfolioSamples {
    type Item = &'a PortfolioSampleRecord;
    type IntoIter = std::slice::Iter<'a, PortfolioSampleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Draw `num_portfolios` random long-only portfolios and score each.
///
/// Uses 252 trading days and a zero risk-free rate. The same
/// `(returns, num_portfolios, seed)` always yields identical output.
///
/// ```
/// use chrono::NaiveDate;
/// use nanoalloc::{ReturnsMatrix, generate_random_portfolios};
///
/// let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
/// let returns = ReturnsMatrix::from_columns(
///     vec![d(2), d(3), d(4)],
///     vec![("A", vec![0.01, -0.02, 0.01]), ("B", vec![0.0, 0.01, 0.02])],
/// )
/// .unwrap();
///
/// let samples = generate_random_portfolios(&returns, 100, 42).unwrap();
/// assert_eq!(samples.len(), 100);
/// assert!(samples.max_sharpe().is_some());
/// ```
pub fn generate_random_portfolios(
    returns: &ReturnsMatrix,
    num_portfolios: usize,
    seed: u64,
) -> Result<PortfolioSamples> {
    generate_random_portfolios_with(returns, num_portfolios, seed, &MetricsParams::default())
}

/// [`generate_random_portfolios`] with explicit annualization settings.
pub fn generate_random_portfolios_with(
    returns: &ReturnsMatrix,
    num_portfolios: usize,
    seed: u64,
    params: &MetricsParams,
) -> Result<PortfolioSamples> {
    let draws = draw_weights(returns.num_assets(), num_portfolios, seed)?;
    let score = |w: &Vec<f64>| score_draw(returns, w, params);

    #[cfg(feature = "parallel")]
    let records: Vec<PortfolioSampleRecord> = {
        use rayon::prelude::*;
        draws.par_iter().map(score).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let records: Vec<PortfolioSampleRecord> = draws.iter().map(score).collect();

    log::debug!(
        "sampled {} portfolios over {} assets (seed {seed})",
        records.len(),
        returns.num_assets()
    );

    Ok(PortfolioSamples { records })
}

/// All draws are taken up front on one generator, so scoring order cannot
/// affect the random stream.
fn draw_weights(n: usize, num_portfolios: usize, seed: u64) -> Result<Vec<Vec<f64>>> {
    if n == 1 {
        return Ok(vec![vec![1.0]; num_portfolios]);
    }

    let dirichlet =
        Dirichlet::new_with_size(1.0_f64, n).map_err(|e| AllocError::Sampler(e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(seed);

    Ok((0..num_portfolios)
        .map(|_| dirichlet.sample(&mut rng))
        .collect())
}

fn score_draw(returns: &ReturnsMatrix, w: &[f64], params: &MetricsParams) -> PortfolioSampleRecord {
    let series = returns.project(w);
    let m = portfolio_metrics(returns.dates(), &series, params);
    PortfolioSampleRecord {
        weights: WeightVector::from_parts(returns.assets(), w),
        cagr: m.cagr,
        annual_vol: m.annual_vol,
        sharpe: m.sharpe,
        max_drawdown: m.max_drawdown,
    }
}
