use stratbt::prelude::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let series = PriceSeries::new(synthetic_bars(750, 2024, 100.0))?;
    let config = BacktestConfig::new(100_000.0)?.with_commission_rate(0.0003)?;
    let strategies = StrategyRegistry::default().build_all()?;

    let comparisons = compare_strategies(&series, config, strategies);

    println!(
        "{:<10} {:>12} {:>9} {:>9} {:>7} {:>7}",
        "strategy", "equity", "return", "max dd", "sharpe", "trades"
    );
    for comparison in &comparisons {
        match comparison.metrics() {
            Some(metrics) => println!(
                "{:<10} {:>12.2} {:>8.2}% {:>8.2}% {:>7.2} {:>7}",
                comparison.strategy,
                metrics.final_equity(),
                metrics.total_return(),
                metrics.max_drawdown(),
                metrics.sharpe_ratio(0.03),
                metrics.total_trades(),
            ),
            None => println!("{:<10} failed: {:?}", comparison.strategy, comparison.outcome.as_ref().err()),
        }
    }

    if let Some(best) = best_by_equity(&comparisons) {
        println!("\nbest: {} ({})", best.strategy, best.parameters);
    }

    Ok(())
}
