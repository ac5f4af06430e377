//! Constrained portfolio optimizer.
//!
//! [`Optimizer`] precomputes the annualized mean vector and covariance matrix
//! of a [`ReturnsMatrix`] once, then answers three allocation problems:
//!
//! | Method | Minimizes | Extra constraint |
//! |---|---|---|
//! | [`minimize_variance_for_target_return`](Optimizer::minimize_variance_for_target_return) | `wᵀΣw` | `w·μ >= target` |
//! | [`maximize_return_for_vol_cap`](Optimizer::maximize_return_for_vol_cap) | `-w·μ` | `√(wᵀΣw) <= cap` |
//! | [`maximize_sharpe`](Optimizer::maximize_sharpe) | `-(w·μ - rf)/√(wᵀΣw)` | none |
//!
//! All three also enforce `Σw = 1` and the per-asset [`WeightBounds`],
//! start from equal weights, and never fail: a solve that does not converge
//! still returns its best iterate with [`OptimizationResult::warning`] set.

pub mod problem;
pub mod solver;

use rustc_hash::FxHashSet;

use crate::error::{AllocError, Result};
use crate::metrics::{TRADING_DAYS, annualized_covariance, annualized_mean};
use crate::returns::ReturnsMatrix;
use crate::weights::{WeightBounds, WeightVector};

use problem::{MaxReturn, MaxSharpe, MinVariance, Moments, NonlinearProgram};
use solver::{BoundedSimplex, SolverSettings, SolverStatus};

/// Optimizer settings.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizerOptions {
    /// Per-asset weight bounds (default `[0, 1]` for every asset)
    pub bounds: WeightBounds,
    /// Annualization factor for the moments
    pub trading_days: f64,
    /// Convergence tolerance
    pub ftol: f64,
    /// Iteration budget, applied to each inner subproblem and to the
    /// outer multiplier loop separately. A constrained solve may therefore
    /// report up to `max_iter²` inner iterations.
    pub max_iter: usize,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        let settings = SolverSettings::default();
        Self {
            bounds: WeightBounds::default(),
            trading_days: TRADING_DAYS,
            ftol: settings.ftol,
            max_iter: settings.max_iter,
        }
    }
}

/// Outcome of one optimization.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizationResult {
    /// Post-processed weights, summing to one
    pub weights: WeightVector,
    pub converged: bool,
    /// Solver termination message
    pub message: String,
    /// `Some(message)` whenever the solve did not converge
    pub warning: Option<String>,
    /// Inner solver iterations summed over all subproblems
    pub iterations: usize,
    /// Annualized `w·μ` of the returned weights
    pub expected_return: f64,
    /// Annualized `√(wᵀΣw)` of the returned weights
    pub volatility: f64,
    /// `(expected_return - rf) / volatility`; `rf` is the risk-free rate
    /// of [`Optimizer::maximize_sharpe`] and zero otherwise. NaN at zero
    /// volatility.
    pub sharpe: f64,
}

/// Mean-variance optimizer over a fixed asset universe.
#[derive(Clone, Debug)]
pub struct Optimizer {
    assets: Vec<String>,
    moments: Moments,
    set: BoundedSimplex,
    settings: SolverSettings,
}

impl Optimizer {
    /// Optimizer with default options.
    pub fn new(returns: &ReturnsMatrix) -> Result<Self> {
        Self::with_options(returns, &OptimizerOptions::default())
    }

    /// Estimate the moments from `returns` (at least two dates).
    pub fn with_options(returns: &ReturnsMatrix, options: &OptimizerOptions) -> Result<Self> {
        if returns.num_dates() < 2 {
            return Err(AllocError::InsufficientData {
                required: 2,
                actual: returns.num_dates(),
            });
        }

        let mean = annualized_mean(returns, options.trading_days);
        let cov = annualized_covariance(returns, options.trading_days);
        Self::from_moments(returns.assets().to_vec(), mean, cov, options)
    }

    /// Build from externally estimated annualized moments.
    ///
    /// `cov` must be `n × n` for `n = assets.len()`; all entries finite.
    pub fn from_moments(
        assets: Vec<String>,
        mean: Vec<f64>,
        cov: Vec<Vec<f64>>,
        options: &OptimizerOptions,
    ) -> Result<Self> {
        let n = assets.len();
        if n == 0 {
            return Err(AllocError::NoAssets);
        }

        let mut seen = FxHashSet::default();
        for asset in &assets {
            if !seen.insert(asset.as_str()) {
                return Err(AllocError::DuplicateAsset(asset.clone()));
            }
        }

        if mean.len() != n {
            return Err(AllocError::Moments(format!(
                "mean has {} entries for {n} assets",
                mean.len()
            )));
        }
        if cov.len() != n || cov.iter().any(|row| row.len() != n) {
            return Err(AllocError::Moments(format!(
                "covariance must be {n}x{n}"
            )));
        }
        if mean.iter().chain(cov.iter().flatten()).any(|x| !x.is_finite()) {
            return Err(AllocError::Moments("non-finite moment".to_string()));
        }

        let bounds = options.bounds.resolve(&assets)?;

        Ok(Self {
            assets,
            moments: Moments {
                mean,
                covariance: cov,
            },
            set: BoundedSimplex::new(&bounds),
            settings: SolverSettings {
                ftol: options.ftol,
                max_iter: options.max_iter,
            },
        })
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Annualized mean returns, in asset order.
    pub fn mean(&self) -> &[f64] {
        &self.moments.mean
    }

    /// Annualized covariance matrix.
    pub fn covariance(&self) -> &[Vec<f64>] {
        &self.moments.covariance
    }

    /// Minimum-variance weights with expected return at least `target_return`.
    pub fn minimize_variance_for_target_return(&self, target_return: f64) -> OptimizationResult {
        let program = MinVariance {
            moments: &self.moments,
            target_return,
        };
        self.run(&program, target_return, 0.0, "min-variance")
    }

    /// Maximum-return weights with volatility at most `max_vol`.
    pub fn maximize_return_for_vol_cap(&self, max_vol: f64) -> OptimizationResult {
        let program = MaxReturn {
            moments: &self.moments,
            max_vol,
        };
        self.run(&program, max_vol, 0.0, "max-return")
    }

    /// Maximum-Sharpe (tangency) weights for the given annual risk-free rate.
    pub fn maximize_sharpe(&self, risk_free: f64) -> OptimizationResult {
        let program = MaxSharpe {
            moments: &self.moments,
            risk_free,
        };
        self.run(&program, risk_free, risk_free, "max-sharpe")
    }

    fn run<P: NonlinearProgram>(
        &self,
        program: &P,
        parameter: f64,
        risk_free: f64,
        label: &str,
    ) -> OptimizationResult {
        let n = self.assets.len();
        let x0 = equal_weights(n);

        let solution = if parameter.is_finite() {
            solver::solve(program, &self.set, &x0, &self.settings)
        } else {
            solver::Solution {
                x: x0,
                status: SolverStatus::NonFiniteParameter,
                iterations: 0,
            }
        };

        let w = clip_and_renormalize(solution.x);
        let converged = solution.status.is_success();
        let message = solution.status.to_string();

        if converged {
            log::debug!("{label}: {message} after {} iterations", solution.iterations);
        } else {
            log::warn!("{label}: {message} after {} iterations", solution.iterations);
        }

        let expected_return = self.moments.expected_return(&w);
        let volatility = self.moments.volatility(&w);
        let sharpe = if volatility == 0.0 {
            f64::NAN
        } else {
            (expected_return - risk_free) / volatility
        };

        OptimizationResult {
            weights: WeightVector::from_parts(&self.assets, &w),
            converged,
            warning: (!converged).then(|| message.clone()),
            message,
            iterations: solution.iterations,
            expected_return,
            volatility,
            sharpe,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn equal_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Clip every weight to `[0, 1]` and rescale to sum one.
///
/// Falls back to equal weights when nothing positive survives the clip.
/// Configured bounds are not re-applied, so the rescale may push a weight
/// slightly past its bound.
fn clip_and_renormalize(mut w: Vec<f64>) -> Vec<f64> {
    for x in &mut w {
        *x = if x.is_finite() { x.max(0.0).min(1.0) } else { 0.0 };
    }

    let sum = w.iter().sum::<f64>();
    if sum <= 1e-12 {
        return equal_weights(w.len());
    }

    for x in &mut w {
        *x /= sum;
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn diag_optimizer(options: &OptimizerOptions) -> Optimizer {
        Optimizer::from_moments(
            names(&["A", "B", "C"]),
            vec![0.05, 0.10, 0.15],
            vec![
                vec![0.01, 0.0, 0.0],
                vec![0.0, 0.04, 0.0],
                vec![0.0, 0.0, 0.09],
            ],
            options,
        )
        .unwrap()
    }

    fn assert_valid(result: &OptimizationResult, n: usize) {
        assert_eq!(result.weights.len(), n);
        assert!(result.weights.iter().all(|(_, w)| w.is_finite() && w >= 0.0));
        assert!((result.weights.sum() - 1.0).abs() < 1e-6);
    }

    fn w(result: &OptimizationResult) -> Vec<f64> {
        result.weights.values()
    }

    #[test]
    fn clip_and_renormalize_cases() {
        assert_eq!(clip_and_renormalize(vec![0.5, 0.5]), vec![0.5, 0.5]);
        let w = clip_and_renormalize(vec![-0.1, 0.6, 0.6]);
        assert!((w[0]).abs() < 1e-15);
        assert!((w[1] - 0.5).abs() < 1e-15);
        assert_eq!(clip_and_renormalize(vec![-1.0, 0.0]), vec![0.5, 0.5]);
        assert_eq!(clip_and_renormalize(vec![f64::NAN, 2.0]), vec![0.0, 1.0]);
    }

    #[test]
    fn min_variance_non_binding() {
        let opt = diag_optimizer(&OptimizerOptions::default());
        let r = opt.minimize_variance_for_target_return(0.0);
        assert!(r.converged, "{}", r.message);
        assert!(r.warning.is_none());
        assert_valid(&r, 3);
        let v = w(&r);
        assert!((v[0] - 0.734694).abs() < 1e-4);
        assert!((v[1] - 0.183673).abs() < 1e-4);
        assert!((v[2] - 0.081633).abs() < 1e-4);
    }

    #[test]
    fn min_variance_binding_target() {
        let opt = diag_optimizer(&OptimizerOptions::default());
        let r = opt.minimize_variance_for_target_return(0.10);
        assert!(r.converged);
        assert!((r.expected_return - 0.10).abs() < 1e-6);
        assert!((r.volatility - 0.12403473).abs() < 1e-5);
    }

    #[test]
    fn infeasible_target_warns_but_returns_weights() {
        let opt = diag_optimizer(&OptimizerOptions::default());
        let r = opt.minimize_variance_for_target_return(0.5);
        assert!(!r.converged);
        assert_eq!(r.warning.as_deref(), Some(r.message.as_str()));
        assert_valid(&r, 3);
        assert!(r.weights.get("C").unwrap() > 0.99);
    }

    #[test]
    fn generous_vol_cap_picks_best_asset() {
        let opt = diag_optimizer(&OptimizerOptions::default());
        let r = opt.maximize_return_for_vol_cap(10.0);
        assert!(r.converged);
        assert!((r.weights.get("C").unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn vol_cap_binds() {
        let opt = diag_optimizer(&OptimizerOptions::default());
        let r = opt.maximize_return_for_vol_cap(0.15);
        assert!(r.converged);
        assert!((r.volatility - 0.15).abs() < 1e-6);
    }

    #[test]
    fn vol_cap_below_minimum_risk_is_not_converged() {
        let opt = diag_optimizer(&OptimizerOptions::default());
        let r = opt.maximize_return_for_vol_cap(0.05);
        assert!(!r.converged);
        assert!(r.warning.is_some());
        assert_valid(&r, 3);
    }

    #[test]
    fn sharpe_with_risk_free() {
        let opt = diag_optimizer(&OptimizerOptions::default());
        let r = opt.maximize_sharpe(0.02);
        assert!(r.converged);
        let v = w(&r);
        assert!((v[0] - 0.465517).abs() < 1e-4);
        assert!((v[1] - 0.310345).abs() < 1e-4);
        assert!((v[2] - 0.224138).abs() < 1e-4);
        assert!((r.sharpe - (r.expected_return - 0.02) / r.volatility).abs() < 1e-12);
    }

    #[test]
    fn upper_bounds_respected() {
        let options = OptimizerOptions {
            bounds: WeightBounds::new(0.0, 0.6),
            ..Default::default()
        };
        let opt = diag_optimizer(&options);
        let r = opt.maximize_return_for_vol_cap(10.0);
        assert!(r.converged);
        let v = w(&r);
        assert!(v[0].abs() < 1e-6);
        assert!((v[1] - 0.4).abs() < 1e-6);
        assert!((v[2] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn lower_bounds_respected() {
        let options = OptimizerOptions {
            bounds: WeightBounds::new(0.1, 0.6),
            ..Default::default()
        };
        let opt = diag_optimizer(&options);
        let r = opt.minimize_variance_for_target_return(0.0);
        assert!(r.converged);
        let v = w(&r);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!(v.iter().all(|x| *x >= 0.1 - 1e-9));
    }

    #[test]
    fn infeasible_bounds_fall_back_to_equal_weights() {
        let options = OptimizerOptions {
            bounds: WeightBounds::new(0.0, 0.2),
            ..Default::default()
        };
        let opt = diag_optimizer(&options);
        let r = opt.maximize_sharpe(0.0);
        assert!(!r.converged);
        assert_eq!(r.message, "bounds admit no weights summing to one");
        for (_, x) in r.weights.iter() {
            assert!((x - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn non_finite_target_is_reported() {
        let opt = diag_optimizer(&OptimizerOptions::default());
        let r = opt.minimize_variance_for_target_return(f64::NAN);
        assert!(!r.converged);
        assert_eq!(r.iterations, 0);
        assert_valid(&r, 3);
    }

    #[test]
    fn single_asset_always_full_weight() {
        let opt = Optimizer::from_moments(
            names(&["Only"]),
            vec![0.1],
            vec![vec![0.04]],
            &OptimizerOptions::default(),
        )
        .unwrap();

        for r in [
            opt.minimize_variance_for_target_return(0.5),
            opt.maximize_return_for_vol_cap(0.1),
            opt.maximize_sharpe(0.0),
        ] {
            assert_eq!(r.weights.get("Only"), Some(1.0));
        }
    }

    #[test]
    fn moments_shape_is_validated() {
        let bad_mean = Optimizer::from_moments(
            names(&["A", "B"]),
            vec![0.1],
            vec![vec![0.01, 0.0], vec![0.0, 0.01]],
            &OptimizerOptions::default(),
        );
        assert!(matches!(bad_mean, Err(AllocError::Moments(_))));

        let bad_cov = Optimizer::from_moments(
            names(&["A", "B"]),
            vec![0.1, 0.2],
            vec![vec![0.01, 0.0]],
            &OptimizerOptions::default(),
        );
        assert!(matches!(bad_cov, Err(AllocError::Moments(_))));

        let dup = Optimizer::from_moments(
            names(&["A", "A"]),
            vec![0.1, 0.2],
            vec![vec![0.01, 0.0], vec![0.0, 0.01]],
            &OptimizerOptions::default(),
        );
        assert!(matches!(dup, Err(AllocError::DuplicateAsset(_))));
    }

    #[test]
    fn unknown_bound_override_is_rejected() {
        let options = OptimizerOptions {
            bounds: WeightBounds::default().with_asset("GOLD", 0.0, 0.1),
            ..Default::default()
        };
        let r = Optimizer::from_moments(
            names(&["A"]),
            vec![0.1],
            vec![vec![0.01]],
            &options,
        );
        assert!(matches!(r, Err(AllocError::UnknownAsset(_))));
    }

    #[test]
    fn needs_two_dates() {
        let d = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let m = ReturnsMatrix::new(vec![d], vec!["A"], vec![vec![0.01]]).unwrap();
        assert!(matches!(
            Optimizer::new(&m),
            Err(AllocError::InsufficientData {
                required: 2,
                actual: 1
            })
        ));
    }
}
