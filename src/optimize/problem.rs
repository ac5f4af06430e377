//! Objective and constraint definitions for the three allocation problems.
//!
//! Every problem is a [`NonlinearProgram`]: a smooth objective to minimize
//! over the bounded simplex, plus at most one inequality `g(w) >= 0`.
//! The problem context (μ, Σ, and the target) is carried by reference in
//! the program value itself.

/// Objective value used by the Sharpe program when volatility vanishes.
pub const ZERO_VOL_PENALTY: f64 = 1e6;

/// A smooth program over the bounded simplex.
///
/// Sum-to-one and box constraints are enforced by the solver's projection;
/// implementors only describe the objective and an optional inequality.
pub trait NonlinearProgram {
    /// Objective to minimize.
    fn objective(&self, w: &[f64]) -> f64;

    /// Gradient of [`objective`](Self::objective).
    fn gradient(&self, w: &[f64]) -> Vec<f64>;

    /// Inequality constraint value `g(w)`, feasible when `>= 0`.
    ///
    /// `None` means the program is only bound- and budget-constrained.
    fn constraint(&self, _w: &[f64]) -> Option<f64> {
        None
    }

    /// Gradient of [`constraint`](Self::constraint).
    fn constraint_gradient(&self, w: &[f64]) -> Vec<f64> {
        vec![0.0; w.len()]
    }
}

/// Annualized mean vector and covariance matrix.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Moments {
    pub mean: Vec<f64>,
    pub covariance: Vec<Vec<f64>>,
}

impl Moments {
    /// `w · μ`
    pub fn expected_return(&self, w: &[f64]) -> f64 {
        dot(w, &self.mean)
    }

    /// `Σ w`
    pub fn cov_times(&self, w: &[f64]) -> Vec<f64> {
        mat_vec_mul(&self.covariance, w)
    }

    /// `wᵀ Σ w`
    pub fn variance(&self, w: &[f64]) -> f64 {
        dot(w, &self.cov_times(w))
    }

    /// `√(wᵀ Σ w)`, with round-off negatives treated as zero.
    pub fn volatility(&self, w: &[f64]) -> f64 {
        self.variance(w).max(0.0).sqrt()
    }
}

// ============================================================================
// Programs
// ============================================================================

/// Minimize `wᵀΣw` subject to `w·μ >= target_return`.
#[derive(Clone, Copy, Debug)]
pub struct MinVariance<'a> {
    pub moments: &'a Moments,
    pub target_return: f64,
}

impl NonlinearProgram for MinVariance<'_> {
    fn objective(&self, w: &[f64]) -> f64 {
        self.moments.variance(w)
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        self.moments.cov_times(w).into_iter().map(|x| 2.0 * x).collect()
    }

    fn constraint(&self, w: &[f64]) -> Option<f64> {
        Some(self.moments.expected_return(w) - self.target_return)
    }

    fn constraint_gradient(&self, _w: &[f64]) -> Vec<f64> {
        self.moments.mean.clone()
    }
}

/// Minimize `-w·μ` subject to `√(wᵀΣw) <= max_vol`.
#[derive(Clone, Copy, Debug)]
pub struct MaxReturn<'a> {
    pub moments: &'a Moments,
    pub max_vol: f64,
}

impl NonlinearProgram for MaxReturn<'_> {
    fn objective(&self, w: &[f64]) -> f64 {
        -self.moments.expected_return(w)
    }

    fn gradient(&self, _w: &[f64]) -> Vec<f64> {
        self.moments.mean.iter().map(|m| -m).collect()
    }

    fn constraint(&self, w: &[f64]) -> Option<f64> {
        Some(self.max_vol - self.moments.volatility(w))
    }

    fn constraint_gradient(&self, w: &[f64]) -> Vec<f64> {
        let sigma_w = self.moments.cov_times(w);
        let vol = dot(w, &sigma_w).max(0.0).sqrt();
        if vol == 0.0 {
            return vec![0.0; w.len()];
        }
        sigma_w.into_iter().map(|x| -x / vol).collect()
    }
}

/// Minimize `-(w·μ - rf) / √(wᵀΣw)`.
///
/// A point with zero volatility scores [`ZERO_VOL_PENALTY`] with a zero
/// gradient.
#[derive(Clone, Copy, Debug)]
pub struct MaxSharpe<'a> {
    pub moments: &'a Moments,
    pub risk_free: f64,
}

impl NonlinearProgram for MaxSharpe<'_> {
    fn objective(&self, w: &[f64]) -> f64 {
        let vol = self.moments.volatility(w);
        if vol == 0.0 {
            return ZERO_VOL_PENALTY;
        }
        -(self.moments.expected_return(w) - self.risk_free) / vol
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let sigma_w = self.moments.cov_times(w);
        let var = dot(w, &sigma_w).max(0.0);
        let vol = var.sqrt();
        if vol == 0.0 {
            return vec![0.0; w.len()];
        }

        let excess = self.moments.expected_return(w) - self.risk_free;
        let vol3 = var * vol;
        self.moments
            .mean
            .iter()
            .zip(&sigma_w)
            .map(|(m, sw)| -m / vol + excess * sw / vol3)
            .collect()
    }
}

// ============================================================================
// Linear algebra helpers
// ============================================================================

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn mat_vec_mul(matrix: &[Vec<f64>], vec: &[f64]) -> Vec<f64> {
    matrix
        .iter()
        .map(|row| row.iter().zip(vec).map(|(a, b)| a * b).sum::<f64>())
        .collect()
}
