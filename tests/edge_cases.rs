//! Edge cases: malformed input, degenerate series, undefined metrics.

use chrono::NaiveDate;
use nanoalloc::metrics::{annualized_volatility, cagr, sharpe_ratio};
use nanoalloc::{
    AllocError, Frequency, MetricsParams, Optimizer, OptimizerOptions, ReturnsMatrix,
    WeightBounds, WeightVector, generate_random_portfolios, portfolio_metrics,
    simulate_rebalancing, weights_over_time_buy_and_hold,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// === Construction ===

#[test]
fn empty_matrix_is_rejected() {
    let err = ReturnsMatrix::new(Vec::new(), vec!["A"], Vec::new()).unwrap_err();
    assert!(matches!(err, AllocError::NoDates));

    let err = ReturnsMatrix::new(vec![d(2024, 1, 2)], Vec::<String>::new(), vec![vec![]])
        .unwrap_err();
    assert!(matches!(err, AllocError::NoAssets));
}

#[test]
fn ragged_columns_are_rejected() {
    let err = ReturnsMatrix::from_columns(
        vec![d(2024, 1, 2), d(2024, 1, 3)],
        vec![("A", vec![0.01, 0.02]), ("B", vec![0.01])],
    )
    .unwrap_err();
    assert!(matches!(err, AllocError::ColumnLength { .. }));
}

#[test]
fn out_of_order_dates_are_rejected() {
    let err = ReturnsMatrix::from_columns(
        vec![d(2024, 1, 3), d(2024, 1, 2)],
        vec![("A", vec![0.01, 0.02])],
    )
    .unwrap_err();
    assert!(matches!(err, AllocError::UnorderedDates { .. }));
}

#[test]
fn infinite_return_is_rejected() {
    let err = ReturnsMatrix::from_columns(
        vec![d(2024, 1, 2), d(2024, 1, 3)],
        vec![("A", vec![0.01, f64::INFINITY])],
    )
    .unwrap_err();
    assert!(matches!(err, AllocError::NonFiniteReturn { .. }));
}

// === Degenerate series ===

#[test]
fn single_date_metrics_are_undefined() {
    let m = ReturnsMatrix::from_columns(vec![d(2024, 1, 2)], vec![("A", vec![0.01])]).unwrap();
    let r = portfolio_metrics(m.dates(), &[0.01], &MetricsParams::default());
    assert!(r.cagr.is_nan());
    assert!(r.annual_vol.is_nan());
    assert!(r.sharpe.is_nan());
    assert_eq!(r.max_drawdown, 0.0);

    // The sampler still works, it just reports undefined metrics
    let samples = generate_random_portfolios(&m, 3, 42).unwrap();
    assert_eq!(samples.len(), 3);
    assert!(samples.max_sharpe().is_none());
}

#[test]
fn constant_returns_have_nan_sharpe() {
    let r = [0.001; 20];
    assert!(annualized_volatility(&r, 252.0).abs() < 1e-15);
    // Rounding can leave a tiny non-zero std; only an exact zero is NaN
    let flat = [0.0; 20];
    assert!(sharpe_ratio(&flat, 0.0, 252.0).is_nan());
}

#[test]
fn cagr_same_day_is_nan() {
    assert!(cagr(&[d(2024, 1, 2), d(2024, 1, 2)], &[1.0, 1.1]).is_nan());
}

#[test]
fn optimizer_needs_two_dates() {
    let m = ReturnsMatrix::from_columns(vec![d(2024, 1, 2)], vec![("A", vec![0.01])]).unwrap();
    assert!(matches!(
        Optimizer::new(&m),
        Err(AllocError::InsufficientData { .. })
    ));
}

#[test]
fn zero_variance_assets_do_not_break_sharpe() {
    // Both assets flat: every candidate has zero volatility
    let m = ReturnsMatrix::from_columns(
        vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4)],
        vec![("A", vec![0.0; 3]), ("B", vec![0.0; 3])],
    )
    .unwrap();
    let optimizer = Optimizer::new(&m).unwrap();
    let r = optimizer.maximize_sharpe(0.0);
    assert!((r.weights.sum() - 1.0).abs() < 1e-12);
    assert!(r.sharpe.is_nan());
    assert_eq!(r.volatility, 0.0);
}

#[test]
fn inverted_bounds_are_rejected() {
    let m = ReturnsMatrix::from_columns(
        vec![d(2024, 1, 2), d(2024, 1, 3)],
        vec![("A", vec![0.01, 0.02]), ("B", vec![0.0, 0.01])],
    )
    .unwrap();
    let options = OptimizerOptions {
        bounds: WeightBounds::new(0.0, 1.0).with_asset("B", 0.5, 0.2),
        ..Default::default()
    };
    assert!(matches!(
        Optimizer::with_options(&m, &options),
        Err(AllocError::InvalidBounds { .. })
    ));
}

// === Rebalancing ===

#[test]
fn unknown_weight_asset_is_an_error() {
    let m = ReturnsMatrix::from_columns(vec![d(2024, 1, 2)], vec![("A", vec![0.01])]).unwrap();
    let w = WeightVector::from_pairs([("A", 0.5), ("Gold", 0.5)]);
    assert!(matches!(
        weights_over_time_buy_and_hold(&m, &w),
        Err(AllocError::UnknownAsset(name)) if name == "Gold"
    ));
}

#[test]
fn single_date_rebalance() {
    let m = ReturnsMatrix::from_columns(
        vec![d(2024, 1, 2)],
        vec![("A", vec![0.1]), ("B", vec![0.0])],
    )
    .unwrap();
    let w = WeightVector::from_pairs([("A", 0.5), ("B", 0.5)]);
    let out = simulate_rebalancing(&m, &w, Frequency::default()).unwrap();
    assert_eq!(out.weights.len(), 1);
    assert_eq!(out.turnover.len(), 1);
    assert!(out.turnover.entries()[0].1 > 0.0);
}

#[test]
fn sparse_dates_skip_empty_periods() {
    // Nothing between February and November
    let m = ReturnsMatrix::from_columns(
        vec![d(2024, 1, 10), d(2024, 2, 10), d(2024, 11, 10)],
        vec![("A", vec![0.01, 0.01, 0.01]), ("B", vec![0.0, 0.0, 0.0])],
    )
    .unwrap();
    let w = WeightVector::from_pairs([("A", 0.5), ("B", 0.5)]);
    let out = simulate_rebalancing(&m, &w, Frequency::monthly()).unwrap();
    let dates: Vec<NaiveDate> = out.turnover.entries().iter().map(|(d, _)| *d).collect();
    assert_eq!(dates, vec![d(2024, 1, 10), d(2024, 2, 10), d(2024, 11, 10)]);
}

#[test]
fn malformed_frequency_token() {
    assert!(matches!(
        "every tuesday".parse::<Frequency>(),
        Err(AllocError::InvalidFrequency(_))
    ));
}

// === Serialization ===

#[cfg(feature = "serde")]
#[test]
fn results_serialize_to_json() {
    let optimizer = Optimizer::from_moments(
        vec!["A".into(), "B".into()],
        vec![0.05, 0.10],
        vec![vec![0.01, 0.0], vec![0.0, 0.04]],
        &OptimizerOptions::default(),
    )
    .unwrap();
    let result = optimizer.maximize_sharpe(0.0);
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"converged\":true"));

    let freq: Frequency = serde_json::from_str("\"2Q\"").unwrap();
    assert_eq!(freq.multiple(), 2);
    assert!(serde_json::from_str::<Frequency>("\"2X\"").is_err());
}
