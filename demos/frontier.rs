//! Frontier example: random sampling, the three optimizers, then rebalancing.
//!
//! Run with: cargo run --example frontier

use chrono::{Datelike, NaiveDate, Weekday};
use nanoalloc::{
    CashRate, Frequency, MetricsParams, Optimizer, OptimizerOptions, ReturnsMatrix, WeightBounds,
    generate_random_portfolios, portfolio_metrics, simulate_rebalancing,
};

fn main() -> nanoalloc::Result<()> {
    // Three years of business days, 2021 through 2023
    let mut dates = Vec::new();
    let mut day = NaiveDate::from_ymd_opt(2021, 1, 4).expect("valid date");
    let end = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
    while day < end {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(day);
        }
        day = day.succ_opt().expect("date in range");
    }

    // Deterministic cycles with different drift and amplitude per asset
    let wave = |i: usize, period: usize, amp: f64, drift: f64| {
        let phase = (i % period) as f64 / period as f64 * std::f64::consts::TAU;
        drift + amp * phase.sin()
    };
    let n = dates.len();
    let bonds: Vec<f64> = (0..n).map(|i| wave(i, 7, 0.002, 0.0001)).collect();
    let stocks: Vec<f64> = (0..n).map(|i| wave(i, 11, 0.012, 0.0004)).collect();
    let gold: Vec<f64> = (0..n).map(|i| wave(i, 13, 0.008, 0.0002)).collect();

    let returns = ReturnsMatrix::from_columns(
        dates,
        vec![("Bonds", bonds), ("Stocks", stocks), ("Gold", gold)],
    )?
    .with_cash("Cash", &CashRate::default(), 252.0)?;

    println!("=== Frontier ===\n");
    println!(
        "{} dates, assets: {}\n",
        returns.num_dates(),
        returns.assets().join(", ")
    );

    // Monte Carlo frontier
    let samples = generate_random_portfolios(&returns, 2000, 42)?;
    if let Some(best) = samples.max_sharpe() {
        println!("Best sampled Sharpe:  {:.3}  {}", best.sharpe, best.weights);
    }
    if let Some(safe) = samples.min_volatility() {
        println!("Lowest sampled vol:   {:.2}%  {}", safe.annual_vol * 100.0, safe.weights);
    }

    // Optimizers, with cash capped at 20%
    let options = OptimizerOptions {
        bounds: WeightBounds::default().with_asset("Cash", 0.0, 0.2),
        ..Default::default()
    };
    let optimizer = Optimizer::with_options(&returns, &options)?;

    println!("\n=== Optimized ===\n");
    let runs = [
        ("max Sharpe", optimizer.maximize_sharpe(0.02)),
        ("min var @ 5%", optimizer.minimize_variance_for_target_return(0.05)),
        ("max ret @ 10% vol", optimizer.maximize_return_for_vol_cap(0.10)),
    ];
    for (label, r) in &runs {
        let flag = if r.converged { "" } else { "  (not converged)" };
        println!(
            "  {label:<18} ret {:>6.2}%  vol {:>6.2}%  {}{flag}",
            r.expected_return * 100.0,
            r.volatility * 100.0,
            r.weights,
        );
    }

    // Rebalance the tangency portfolio twice a year
    let tangency = &runs[0].1.weights;
    let outcome = simulate_rebalancing(&returns, tangency, Frequency::semiannual())?;
    let series = returns.portfolio_returns(tangency)?;
    let metrics = portfolio_metrics(returns.dates(), &series, &MetricsParams::default());

    println!("\n=== Rebalanced every {} ===\n", Frequency::semiannual());
    for (date, t) in outcome.turnover.entries() {
        println!("  {date}: turnover {:.2}%", t * 100.0);
    }
    println!("\n{metrics}");

    Ok(())
}
