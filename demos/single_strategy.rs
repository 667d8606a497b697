use stratbt::prelude::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let series = PriceSeries::new(synthetic_bars(500, 42, 100.0))?;
    let config = BacktestConfig::new(100_000.0)?
        .with_commission_rate(0.0003)?
        .with_lot_size(100)?;

    let strategy = DoubleMa::new(5, 20)?;
    let mut backtest = Backtest::new(series, strategy, config);
    let result = backtest.run()?;

    for trade in result.trades() {
        println!(
            "{} -> {}: {} shares, {:.2} -> {:.2}, pnl {:.2}",
            trade.entry_timestamp().date_naive(),
            trade.exit_timestamp().date_naive(),
            trade.quantity(),
            trade.entry_price(),
            trade.exit_price(),
            trade.realized_pnl(),
        );
    }
    if let Some(position) = result.final_position() {
        println!("still holding {} shares", position.quantity());
    }

    #[cfg(not(feature = "metrics"))]
    {
        println!("final equity: {:.2}", result.final_equity());
        println!("total return: {:.2}%", result.total_return() * 100.0);
    }

    #[cfg(feature = "metrics")]
    {
        let metrics = Metrics::from(&result);
        println!("{metrics}");
    }

    Ok(())
}
