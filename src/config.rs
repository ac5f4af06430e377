//! TOML configuration loading and validation.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! [optimizer]
//! min_weight = 0.0
//! max_weight = 1.0
//! risk_free = 0.0
//! trading_days = 252.0
//!
//! [optimizer.bounds]
//! Cash = [0.0, 0.1]
//!
//! [sampler]
//! num_portfolios = 2000
//! seed = 42
//!
//! [rebalance]
//! frequency = "6M"
//!
//! # Optional; without `rate` or `schedule` the policy-rate table is used
//! [cash]
//! name = "Cash"
//! margin = 0.0075
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{AllocError, Result};
use crate::metrics::{MetricsParams, TRADING_DAYS};
use crate::optimize::OptimizerOptions;
use crate::rebalance::Frequency;
use crate::returns::{CashRate, DEFAULT_BANK_MARGIN, FALLBACK_CASH_RATE};
use crate::weights::WeightBounds;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllocConfig {
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
    #[serde(default)]
    pub rebalance: RebalanceConfig,
    /// Optional cash column appended to the returns
    pub cash: Option<CashConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default)]
    pub min_weight: f64,
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,
    /// Per-asset `[min, max]` overrides
    #[serde(default)]
    pub bounds: BTreeMap<String, [f64; 2]>,
    #[serde(default)]
    pub risk_free: f64,
    #[serde(default = "default_trading_days")]
    pub trading_days: f64,
    #[serde(default = "default_ftol")]
    pub ftol: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    pub target_return: Option<f64>,
    pub max_vol: Option<f64>,
}

fn default_max_weight() -> f64 {
    1.0
}
fn default_trading_days() -> f64 {
    TRADING_DAYS
}
fn default_ftol() -> f64 {
    1e-9
}
fn default_max_iter() -> usize {
    1000
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            min_weight: 0.0,
            max_weight: default_max_weight(),
            bounds: BTreeMap::new(),
            risk_free: 0.0,
            trading_days: default_trading_days(),
            ftol: default_ftol(),
            max_iter: default_max_iter(),
            target_return: None,
            max_vol: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplerConfig {
    #[serde(default = "default_num_portfolios")]
    pub num_portfolios: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_num_portfolios() -> usize {
    2000
}
fn default_seed() -> u64 {
    42
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            num_portfolios: default_num_portfolios(),
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RebalanceConfig {
    #[serde(default)]
    pub frequency: Frequency,
}

/// Cash column.
///
/// A constant `rate` is used as given. Otherwise the rate is the dated
/// `schedule`, or the built-in policy-rate table when the schedule is empty,
/// plus `margin`. With `policy_rates = false` and no rate the column earns
/// [`FALLBACK_CASH_RATE`].
#[derive(Debug, Clone, Deserialize)]
pub struct CashConfig {
    #[serde(default = "default_cash_name")]
    pub name: String,
    pub rate: Option<f64>,
    #[serde(default)]
    pub schedule: Vec<CashStep>,
    /// Added to scheduled or policy rates only
    #[serde(default = "default_margin")]
    pub margin: f64,
    #[serde(default = "default_true")]
    pub policy_rates: bool,
}

fn default_cash_name() -> String {
    "Cash".into()
}

fn default_margin() -> f64 {
    DEFAULT_BANK_MARGIN
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CashStep {
    pub from: NaiveDate,
    pub rate: f64,
}

impl AllocConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AllocError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: AllocConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        let opt = &self.optimizer;
        check_pair("default", opt.min_weight, opt.max_weight)?;
        for (asset, [lo, hi]) in &opt.bounds {
            check_pair(asset, *lo, *hi)?;
        }
        if !opt.risk_free.is_finite() {
            return Err(AllocError::Config("risk_free must be finite".into()));
        }
        if !(opt.trading_days.is_finite() && opt.trading_days > 0.0) {
            return Err(AllocError::Config("trading_days must be > 0".into()));
        }
        if !(opt.ftol.is_finite() && opt.ftol > 0.0) {
            return Err(AllocError::Config("ftol must be > 0".into()));
        }
        if opt.max_iter == 0 {
            return Err(AllocError::Config("max_iter must be > 0".into()));
        }
        if opt.target_return.is_some_and(|t| !t.is_finite()) {
            return Err(AllocError::Config("target_return must be finite".into()));
        }
        if opt.max_vol.is_some_and(|v| !(v.is_finite() && v > 0.0)) {
            return Err(AllocError::Config("max_vol must be > 0".into()));
        }
        if self.sampler.num_portfolios == 0 {
            return Err(AllocError::Config("num_portfolios must be > 0".into()));
        }

        if let Some(cash) = &self.cash {
            if cash.name.is_empty() {
                return Err(AllocError::Config("cash name must not be empty".into()));
            }
            if cash.rate.is_some() && !cash.schedule.is_empty() {
                return Err(AllocError::Config(
                    "cash takes either rate or schedule, not both".into(),
                ));
            }
            if cash.rate.is_some_and(|r| !r.is_finite())
                || cash.schedule.iter().any(|s| !s.rate.is_finite())
            {
                return Err(AllocError::Config("cash rates must be finite".into()));
            }
            if !cash.margin.is_finite() {
                return Err(AllocError::Config("cash margin must be finite".into()));
            }
            if cash.schedule.windows(2).any(|w| w[0].from >= w[1].from) {
                return Err(AllocError::Config(
                    "cash schedule dates must be increasing".into(),
                ));
            }
        }
        Ok(())
    }

    /// Weight bounds including per-asset overrides.
    pub fn weight_bounds(&self) -> WeightBounds {
        let opt = &self.optimizer;
        opt.bounds.iter().fold(
            WeightBounds::new(opt.min_weight, opt.max_weight),
            |bounds, (asset, [lo, hi])| bounds.with_asset(asset.clone(), *lo, *hi),
        )
    }

    pub fn optimizer_options(&self) -> OptimizerOptions {
        OptimizerOptions {
            bounds: self.weight_bounds(),
            trading_days: self.optimizer.trading_days,
            ftol: self.optimizer.ftol,
            max_iter: self.optimizer.max_iter,
        }
    }

    pub fn metrics_params(&self) -> MetricsParams {
        MetricsParams {
            trading_days: self.optimizer.trading_days,
            risk_free: self.optimizer.risk_free,
        }
    }

    /// Name and rate of the configured cash column, if any.
    pub fn cash_rate(&self) -> Option<(String, CashRate)> {
        let cash = self.cash.as_ref()?;
        let rate = match cash.rate {
            Some(r) => CashRate::Constant(r),
            None if !cash.schedule.is_empty() => CashRate::Schedule {
                steps: cash.schedule.iter().map(|s| (s.from, s.rate)).collect(),
                margin: cash.margin,
            },
            None if cash.policy_rates => CashRate::policy_rate(cash.margin),
            None => CashRate::Constant(FALLBACK_CASH_RATE),
        };
        Some((cash.name.clone(), rate))
    }
}

fn check_pair(label: &str, lo: f64, hi: f64) -> Result<()> {
    if !lo.is_finite() || !hi.is_finite() || lo > hi {
        return Err(AllocError::Config(format!(
            "{label} weight bounds must satisfy min <= max, got [{lo}, {hi}]"
        )));
    }
    if hi < 0.0 || lo > 1.0 {
        return Err(AllocError::Config(format!(
            "{label} weight bounds [{lo}, {hi}] lie outside [0, 1]"
        )));
    }
    Ok(())
}
