//! # nanoalloc
//!
//! Deterministic capital allocation across a fixed set of assets, driven by
//! historical daily returns.
//!
//! ## Features
//!
//! - **Constrained optimizer**: minimum variance for a target return, maximum
//!   return under a volatility cap, maximum Sharpe ratio
//! - **Per-asset bounds**: box constraints with per-asset overrides
//! - **Monte Carlo sampler**: seeded Dirichlet draws over the long-only simplex
//! - **Rebalancing simulator**: buy-and-hold drift and calendar rebalancing
//!   with turnover
//! - **Metrics**: CAGR, annualized volatility, Sharpe ratio, maximum drawdown
//!
//! ## Quick Start
//!
//! ```
//! use chrono::NaiveDate;
//! use nanoalloc::{Optimizer, ReturnsMatrix};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let dates: Vec<NaiveDate> = (0..6).map(|i| start + chrono::Days::new(i)).collect();
//!
//! let returns = ReturnsMatrix::from_columns(
//!     dates,
//!     vec![
//!         ("Bonds", vec![0.001, 0.002, -0.001, 0.001, 0.000, 0.002]),
//!         ("Stocks", vec![0.010, -0.008, 0.012, -0.004, 0.009, 0.003]),
//!     ],
//! )
//! .unwrap();
//!
//! let optimizer = Optimizer::new(&returns).unwrap();
//! let result = optimizer.maximize_sharpe(0.0);
//!
//! assert!((result.weights.sum() - 1.0).abs() < 1e-6);
//! println!("{}", result.weights);
//! ```
//!
//! ## Non-convergence
//!
//! Optimizer calls never fail once the [`Optimizer`] exists. An infeasible
//! target still returns the best weights found, with `converged == false`
//! and the solver message in [`OptimizationResult::warning`]:
//!
//! ```
//! use nanoalloc::{Optimizer, OptimizerOptions};
//!
//! let optimizer = Optimizer::from_moments(
//!     vec!["A".to_string(), "B".to_string()],
//!     vec![0.05, 0.10],
//!     vec![vec![0.01, 0.0], vec![0.0, 0.04]],
//!     &OptimizerOptions::default(),
//! )
//! .unwrap();
//!
//! let result = optimizer.minimize_variance_for_target_return(0.50);
//! assert!(!result.converged);
//! assert!(result.warning.is_some());
//! ```
//!
//! ## Rebalancing
//!
//! ```
//! use chrono::NaiveDate;
//! use nanoalloc::{Frequency, ReturnsMatrix, WeightVector, simulate_rebalancing};
//!
//! let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
//! let returns = ReturnsMatrix::from_columns(
//!     vec![d(1, 31), d(2, 29)],
//!     vec![("A", vec![0.5, 0.0]), ("B", vec![0.0, 0.0])],
//! )
//! .unwrap();
//! let target = WeightVector::from_pairs([("A", 0.5), ("B", 0.5)]);
//!
//! let outcome = simulate_rebalancing(&returns, &target, Frequency::monthly()).unwrap();
//! assert_eq!(outcome.turnover.len(), 2);
//! assert!((outcome.turnover.entries()[0].1 - 0.1).abs() < 1e-12);
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `config` | yes | TOML configuration via [`AllocConfig`] (implies `serde`) |
//! | `serde` | no | `Serialize`/`Deserialize` on all value types |
//! | `parallel` | no | Monte Carlo scoring on the rayon pool |

#[cfg(feature = "config")]
pub mod config;
mod error;
pub mod metrics;
pub mod optimize;
pub mod rebalance;
mod returns;
pub mod sampler;
mod weights;

// Re-export public API
#[cfg(feature = "config")]
pub use config::AllocConfig;
pub use error::{AllocError, Result};
pub use metrics::{MetricsParams, PortfolioMetrics, TRADING_DAYS, portfolio_metrics};
pub use optimize::solver::SolverStatus;
pub use optimize::{OptimizationResult, Optimizer, OptimizerOptions};
pub use rebalance::{
    Frequency, FrequencyUnit, RebalanceOutcome, TurnoverRecord, WeightPath, simulate_rebalancing,
    weights_over_time_buy_and_hold,
};
pub use returns::{CashRate, DEFAULT_BANK_MARGIN, FALLBACK_CASH_RATE, ReturnsMatrix};
pub use sampler::{
    PortfolioSampleRecord, PortfolioSamples, generate_random_portfolios,
    generate_random_portfolios_with,
};
pub use weights::{WeightBounds, WeightVector};
