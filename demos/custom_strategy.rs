use stratbt::prelude::*;
use ta::{Next, indicators::RateOfChange};

/// Buys when the rate of change turns positive, sells when it turns negative.
struct Momentum {
    period: usize,
}

impl Strategy for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn parameters(&self) -> Parameters {
        Parameters::from([("period", self.period as f64)])
    }

    fn warmup_period(&self) -> usize {
        self.period + 1
    }

    fn prepare_indicators(&self, series: &PriceSeries) -> Result<Indicators> {
        let mut roc = RateOfChange::new(self.period).map_err(|_| Error::ShortWindow {
            param: "period",
            value: self.period,
            min: 1,
        })?;
        let values = series.iter().map(|bar| roc.next(bar.close())).collect();
        Ok(Indicators::new().with("roc", values))
    }

    fn generate_signal(&self, view: &SeriesView<'_>) -> Signal {
        match view.pair("roc") {
            Some((prev, roc)) if prev <= 0.0 && roc > 0.0 => Signal::Buy,
            Some((prev, roc)) if prev >= 0.0 && roc < 0.0 => Signal::Sell,
            _ => Signal::Hold,
        }
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let series = PriceSeries::new(synthetic_bars(365, 7, 50.0))?;

    let mut registry = StrategyRegistry::default();
    registry.register(
        "momentum",
        "rate of change crossing zero",
        "short swings",
        Parameters::from([("period", 10.0)]),
        |p| Ok(Box::new(Momentum { period: p.window("period")? })),
    );

    for name in registry.names() {
        println!("{}", registry.describe(name)?);
    }

    let strategy = registry.build("momentum", &Parameters::from([("period", 14.0)]))?;
    let mut backtest = Backtest::new(series, strategy, BacktestConfig::default());
    let result = backtest.run()?;

    println!(
        "{} trades, final equity {:.2}, fees {:.2}",
        result.trades().len(),
        result.final_equity(),
        result.fees_paid()
    );

    Ok(())
}
