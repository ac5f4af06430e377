//! Augmented-Lagrangian solver over the bounded simplex.
//!
//! The feasible set `{ Σw = 1, lᵢ <= wᵢ <= uᵢ }` is handled exactly by
//! Euclidean projection, so every iterate satisfies the budget and box
//! constraints. A single inequality `g(w) >= 0` is folded into the
//! objective with a Powell–Hestenes–Rockafellar augmented Lagrangian:
//!
//! ```text
//! L(w; λ, ρ) = f(w) + (max(λ - ρ g(w), 0)² - λ²) / (2ρ)
//! ```
//!
//! Each subproblem is minimized by spectral projected gradient (SPG) with a
//! nonmonotone Armijo line search and Barzilai–Borwein step lengths.

use std::fmt;

use super::problem::{NonlinearProgram, dot};

// === Tuning constants ===

/// Initial penalty parameter.
const RHO_INIT: f64 = 10.0;
/// Penalty parameter ceiling; reaching it without progress means the
/// constraint cannot be satisfied inside the bounds.
const RHO_MAX: f64 = 1e10;
/// Penalty growth factor when the constraint violation stalls.
const RHO_GROWTH: f64 = 10.0;
/// Required shrink ratio of the violation between outer iterations.
const VIOLATION_DECREASE: f64 = 0.25;
/// Nonmonotone line-search memory.
const NONMONOTONE_MEMORY: usize = 10;
/// Armijo sufficient-decrease constant.
const ARMIJO: f64 = 1e-4;
const STEP_MIN: f64 = 1e-30;
const STEP_MAX: f64 = 1e30;
/// Largest coordinate displacement a trial step may take before projection.
const DISPLACEMENT_CAP: f64 = 1e3;
const MIN_LINE_STEP: f64 = 1e-16;
const BISECTION_ROUNDS: usize = 200;
const FEASIBILITY_SLACK: f64 = 1e-12;

// ============================================================================
// Feasible set
// ============================================================================

/// The bounded simplex `{ Σw = 1, lᵢ <= wᵢ <= uᵢ }`.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundedSimplex {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl BoundedSimplex {
    /// Build from one `(min, max)` pair per coordinate.
    pub fn new(bounds: &[(f64, f64)]) -> Self {
        Self {
            lower: bounds.iter().map(|(l, _)| *l).collect(),
            upper: bounds.iter().map(|(_, u)| *u).collect(),
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    /// Whether any point of the box sums to one.
    pub fn is_feasible(&self) -> bool {
        let lo: f64 = self.lower.iter().sum();
        let hi: f64 = self.upper.iter().sum();
        !self.lower.is_empty() && lo <= 1.0 + FEASIBILITY_SLACK && hi >= 1.0 - FEASIBILITY_SLACK
    }

    /// Euclidean projection of `v` onto the set.
    ///
    /// The projection is `wᵢ = min(max(vᵢ - θ, lᵢ), uᵢ)` for the unique
    /// shift `θ` making the weights sum to one; `θ` is found by bisection.
    /// Only meaningful when [`is_feasible`](Self::is_feasible) holds.
    pub fn project(&self, v: &[f64]) -> Vec<f64> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for ((x, l), u) in v.iter().zip(&self.lower).zip(&self.upper) {
            lo = lo.min(x - u);
            hi = hi.max(x - l);
        }

        for _ in 0..BISECTION_ROUNDS {
            let mid = 0.5 * (lo + hi);
            if mid <= lo || mid >= hi {
                break;
            }
            if self.shifted_sum(v, mid) > 1.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        self.shift(v, 0.5 * (lo + hi))
    }

    fn shift(&self, v: &[f64], theta: f64) -> Vec<f64> {
        v.iter()
            .zip(&self.lower)
            .zip(&self.upper)
            .map(|((x, l), u)| (x - theta).max(*l).min(*u))
            .collect()
    }

    fn shifted_sum(&self, v: &[f64], theta: f64) -> f64 {
        v.iter()
            .zip(&self.lower)
            .zip(&self.upper)
            .map(|((x, l), u)| (x - theta).max(*l).min(*u))
            .sum()
    }
}

// ============================================================================
// Settings and outcome
// ============================================================================

/// Stopping rules.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverSettings {
    /// Tolerance on the projected gradient and on the constraint violation
    pub ftol: f64,
    /// Iteration budget per subproblem and for the outer loop
    pub max_iter: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            ftol: 1e-9,
            max_iter: 1000,
        }
    }
}

/// How a solve ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverStatus {
    Converged,
    IterationLimit,
    LineSearchFailed,
    /// The inequality could not be met within the bounds.
    IncompatibleConstraint,
    /// No point of the box sums to one.
    InfeasibleBounds,
    /// The target or cap handed to the program was NaN or infinite.
    NonFiniteParameter,
}

impl SolverStatus {
    #[inline]
    pub fn is_success(self) -> bool {
        self == SolverStatus::Converged
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SolverStatus::Converged => "optimization terminated successfully",
            SolverStatus::IterationLimit => "iteration limit reached",
            SolverStatus::LineSearchFailed => "line search could not make progress",
            SolverStatus::IncompatibleConstraint => {
                "inequality constraint incompatible with the weight bounds"
            }
            SolverStatus::InfeasibleBounds => "bounds admit no weights summing to one",
            SolverStatus::NonFiniteParameter => "constraint parameter is not finite",
        };
        f.write_str(msg)
    }
}

/// Best iterate found plus how the solve ended.
#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    pub x: Vec<f64>,
    pub status: SolverStatus,
    /// Total inner (SPG) iterations across all subproblems
    pub iterations: usize,
}

// ============================================================================
// Driver
// ============================================================================

/// Minimize `program` over `set`, starting from `x0`.
///
/// `x0` is projected onto the set first. When the set is empty `x0` is
/// returned unchanged with [`SolverStatus::InfeasibleBounds`].
pub fn solve<P: NonlinearProgram>(
    program: &P,
    set: &BoundedSimplex,
    x0: &[f64],
    settings: &SolverSettings,
) -> Solution {
    if !set.is_feasible() {
        return Solution {
            x: x0.to_vec(),
            status: SolverStatus::InfeasibleBounds,
            iterations: 0,
        };
    }

    let mut x = set.project(x0);

    if program.constraint(&x).is_none() {
        let lagrangian = Lagrangian {
            program,
            lambda: 0.0,
            rho: RHO_INIT,
        };
        let inner = spg(&lagrangian, set, x, settings);
        return Solution {
            x: inner.x,
            status: inner.status,
            iterations: inner.iterations,
        };
    }

    let mut lambda = 0.0_f64;
    let mut rho = RHO_INIT;
    let mut prev_violation = f64::INFINITY;
    let mut iterations = 0;

    for outer in 0..settings.max_iter {
        let lagrangian = Lagrangian {
            program,
            lambda,
            rho,
        };
        let inner = spg(&lagrangian, set, x, settings);
        iterations += inner.iterations;
        x = inner.x;

        let g = program.constraint(&x).unwrap_or(0.0);
        let violation = g.min(lambda / rho).abs();
        lambda = (lambda - rho * g).max(0.0);

        log::debug!(
            "outer {outer}: g={g:.3e} violation={violation:.3e} lambda={lambda:.3e} rho={rho:.1e}"
        );

        if violation <= settings.ftol {
            return Solution {
                x,
                status: inner.status,
                iterations,
            };
        }

        if violation > VIOLATION_DECREASE * prev_violation {
            if rho >= RHO_MAX {
                return Solution {
                    x,
                    status: SolverStatus::IncompatibleConstraint,
                    iterations,
                };
            }
            rho = (rho * RHO_GROWTH).min(RHO_MAX);
        }
        prev_violation = violation;
    }

    Solution {
        x,
        status: SolverStatus::IterationLimit,
        iterations,
    }
}

/// Augmented Lagrangian of a program at fixed `(λ, ρ)`.
struct Lagrangian<'a, P> {
    program: &'a P,
    lambda: f64,
    rho: f64,
}

impl<P: NonlinearProgram> Lagrangian<'_, P> {
    fn value(&self, w: &[f64]) -> f64 {
        let f = self.program.objective(w);
        match self.program.constraint(w) {
            Some(g) => {
                let s = (self.lambda - self.rho * g).max(0.0);
                f + (s * s - self.lambda * self.lambda) / (2.0 * self.rho)
            }
            None => f,
        }
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let mut grad = self.program.gradient(w);
        if let Some(g) = self.program.constraint(w) {
            let s = (self.lambda - self.rho * g).max(0.0);
            if s > 0.0 {
                let cg = self.program.constraint_gradient(w);
                for (gi, ci) in grad.iter_mut().zip(&cg) {
                    *gi -= s * ci;
                }
            }
        }
        grad
    }
}

// ============================================================================
// Spectral projected gradient
// ============================================================================

struct InnerOutcome {
    x: Vec<f64>,
    status: SolverStatus,
    iterations: usize,
}

fn spg<P: NonlinearProgram>(
    lagrangian: &Lagrangian<'_, P>,
    set: &BoundedSimplex,
    mut x: Vec<f64>,
    settings: &SolverSettings,
) -> InnerOutcome {
    let mut fx = lagrangian.value(&x);
    let mut grad = lagrangian.gradient(&x);
    let mut history = vec![fx];

    let pg_norm = projected_gradient_norm(set, &x, &grad);
    let mut step = if pg_norm > 0.0 {
        (1.0 / pg_norm).clamp(STEP_MIN, STEP_MAX)
    } else {
        1.0
    };

    // A stalled search still counts as converged near a stationary point.
    let stalled = |pg: f64| {
        if pg <= settings.ftol.sqrt() {
            SolverStatus::Converged
        } else {
            SolverStatus::LineSearchFailed
        }
    };

    for it in 0..settings.max_iter {
        let pg_norm = projected_gradient_norm(set, &x, &grad);
        if pg_norm <= settings.ftol {
            return InnerOutcome {
                x,
                status: SolverStatus::Converged,
                iterations: it,
            };
        }

        let grad_inf = inf_norm(&grad);
        let trial_step = if grad_inf > 0.0 {
            step.min(DISPLACEMENT_CAP / grad_inf)
        } else {
            step
        };
        let target: Vec<f64> = x
            .iter()
            .zip(&grad)
            .map(|(xi, gi)| xi - trial_step * gi)
            .collect();
        let direction: Vec<f64> = set
            .project(&target)
            .iter()
            .zip(&x)
            .map(|(p, xi)| p - xi)
            .collect();

        let gtd = dot(&grad, &direction);
        if gtd >= 0.0 {
            return InnerOutcome {
                x,
                status: stalled(pg_norm),
                iterations: it,
            };
        }

        let start = history.len().saturating_sub(NONMONOTONE_MEMORY);
        let f_ref = history[start..]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        let mut alpha = 1.0_f64;
        let (x_new, f_new) = loop {
            let trial: Vec<f64> = x
                .iter()
                .zip(&direction)
                .map(|(xi, di)| xi + alpha * di)
                .collect();
            let f_trial = lagrangian.value(&trial);

            if f_trial.is_finite() && f_trial <= f_ref + ARMIJO * alpha * gtd {
                break (trial, f_trial);
            }

            alpha = if f_trial.is_finite() {
                // Safeguarded quadratic interpolation
                let denom = f_trial - fx - alpha * gtd;
                let candidate = if denom > 0.0 {
                    -0.5 * alpha * alpha * gtd / denom
                } else {
                    -1.0
                };
                if candidate >= 0.1 * alpha && candidate <= 0.9 * alpha {
                    candidate
                } else {
                    0.5 * alpha
                }
            } else {
                0.5 * alpha
            };

            if alpha < MIN_LINE_STEP {
                return InnerOutcome {
                    x,
                    status: stalled(pg_norm),
                    iterations: it,
                };
            }
        };

        let grad_new = lagrangian.gradient(&x_new);
        let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = grad_new.iter().zip(&grad).map(|(a, b)| a - b).collect();
        let sts = dot(&s, &s);
        let sty = dot(&s, &y);
        step = if sty <= 0.0 {
            STEP_MAX
        } else {
            (sts / sty).clamp(STEP_MIN, STEP_MAX)
        };

        x = x_new;
        fx = f_new;
        grad = grad_new;
        history.push(fx);
    }

    InnerOutcome {
        x,
        status: SolverStatus::IterationLimit,
        iterations: settings.max_iter,
    }
}

/// `‖P(x - ∇) - x‖∞`
fn projected_gradient_norm(set: &BoundedSimplex, x: &[f64], grad: &[f64]) -> f64 {
    let target: Vec<f64> = x.iter().zip(grad).map(|(xi, gi)| xi - gi).collect();
    let projected = set.project(&target);
    projected
        .iter()
        .zip(x)
        .map(|(p, xi)| (p - xi).abs())
        .fold(0.0, f64::max)
}

fn inf_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x.abs()).fold(0.0, f64::max)
}
