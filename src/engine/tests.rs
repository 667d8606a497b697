use super::*;
use crate::strategy::testing::{assert_approx, series};
use crate::strategy::{DoubleMa, Indicators};

/// Replays a fixed signal per bar index.
struct Script {
    signals: Vec<Signal>,
    warmup: usize,
}

impl Script {
    fn new(len: usize, events: &[(usize, Signal)]) -> Self {
        let mut signals = vec![Signal::Hold; len];
        for &(index, signal) in events {
            signals[index] = signal;
        }
        Self { signals, warmup: 0 }
    }
}

impl Strategy for Script {
    fn name(&self) -> &str {
        "script"
    }

    fn warmup_period(&self) -> usize {
        self.warmup
    }

    fn prepare_indicators(&self, _series: &PriceSeries) -> Result<Indicators> {
        Ok(Indicators::new())
    }

    fn generate_signal(&self, view: &SeriesView<'_>) -> Signal {
        self.signals.get(view.index()).copied().unwrap_or_default()
    }
}

/// Fails while preparing, the way a strategy with a bad window does.
struct Broken;

impl Strategy for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn prepare_indicators(&self, _series: &PriceSeries) -> Result<Indicators> {
        Err(Error::ShortWindow {
            param: "window",
            value: 0,
            min: 1,
        })
    }

    fn generate_signal(&self, _view: &SeriesView<'_>) -> Signal {
        Signal::Hold
    }
}

/// Returns a column one value short.
struct ShortColumn;

impl Strategy for ShortColumn {
    fn name(&self) -> &str {
        "short_column"
    }

    fn prepare_indicators(&self, series: &PriceSeries) -> Result<Indicators> {
        Ok(Indicators::new().with("x", vec![0.0; series.len() - 1]))
    }

    fn generate_signal(&self, _view: &SeriesView<'_>) -> Signal {
        Signal::Hold
    }
}

/// Flat at 100 until bar 15, then 110 up to bar 20.
fn step_series() -> PriceSeries {
    let closes = (0..21).map(|i| if i < 15 { 100.0 } else { 110.0 }).collect::<Vec<_>>();
    series(&closes)
}

fn step_script() -> Script {
    Script::new(21, &[(5, Signal::Buy), (20, Signal::Sell)])
}

fn config(cash: f64, rate: f64) -> BacktestConfig {
    BacktestConfig::new(cash).unwrap().with_commission_rate(rate).unwrap()
}

fn check_invariants(result: &BacktestResult, series: &PriceSeries) {
    assert_eq!(result.equity_curve().len(), series.len());
    assert_eq!(result.signals().len(), series.len());
    for trade in result.trades() {
        assert!(trade.exit_timestamp() > trade.entry_timestamp());
        assert!(trade.quantity() > 0);
    }
    assert!(result.equity_curve().iter().all(|p| p.cash() >= 0.0));

    let last = series.last().unwrap().close();
    let held = result.final_position().map_or(0, Position::quantity) as f64;
    let last_point = result.equity_curve().last().unwrap();
    assert_approx(result.final_cash() + held * last, last_point.equity());
    assert_eq!(result.final_equity(), last_point.equity());
}

#[test]
fn scenario_no_commission() {
    let series = step_series();
    let mut backtest = Backtest::new(series.clone(), step_script(), config(100_000.0, 0.0));
    let result = backtest.run().unwrap();

    assert_eq!(result.trades().len(), 1);
    let trade = result.trades()[0];
    assert_eq!(trade.quantity(), 1000);
    assert_eq!(trade.entry_price(), 100.0);
    assert_eq!(trade.exit_price(), 110.0);
    assert_eq!(trade.realized_pnl(), 10_000.0);
    assert_eq!(trade.holding_bars(), 15);
    assert_eq!(result.final_cash(), 110_000.0);
    assert!(result.final_position().is_none());

    let curve = result.equity_curve();
    assert_eq!(curve[4].equity(), 100_000.0);
    assert_eq!(curve[5].cash(), 0.0);
    assert_eq!(curve[5].quantity(), 1000);
    assert_eq!(curve[15].equity(), 110_000.0);
    assert_approx(result.total_return(), 0.1);
    check_invariants(&result, &series);
}

#[test]
fn scenario_with_commission() {
    let series = step_series();
    let result = Backtest::new(series.clone(), step_script(), config(100_000.0, 0.001))
        .run()
        .unwrap();

    let trade = result.trades()[0];
    // floor(100000 / 100.1)
    assert_eq!(trade.quantity(), 999);
    let entry_cost = 999.0 * 100.0 * 1.001;
    let proceeds = 999.0 * 110.0 * 0.999;
    assert_approx(trade.realized_pnl(), proceeds - entry_cost);
    assert_approx(trade.commission_paid(), 999.0 * 100.0 * 0.001 + 999.0 * 110.0 * 0.001);
    assert!(trade.realized_pnl() < 10_000.0);
    assert_approx(result.final_cash(), 100_000.0 - entry_cost + proceeds);
    assert_approx(result.fees_paid(), trade.commission_paid());
    check_invariants(&result, &series);
}

#[test]
fn scenario_insufficient_cash() {
    let series = series(&[100.0, 100.0]);
    let script = Script::new(2, &[(0, Signal::Buy)]);
    let result = Backtest::new(series, script, config(50.0, 0.0)).run().unwrap();

    assert!(result.trades().is_empty());
    assert!(result.final_position().is_none());
    assert_eq!(result.final_cash(), 50.0);
    assert_eq!(result.equity_curve()[0].equity(), 50.0);
    assert_eq!(result.signals()[0], Signal::Buy);
}

#[test]
fn redundant_signals_are_noops() {
    let series = series(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
    let script = Script::new(
        6,
        &[
            (0, Signal::Sell),
            (1, Signal::Buy),
            (2, Signal::Buy),
            (3, Signal::Sell),
            (4, Signal::Sell),
            (5, Signal::Buy),
        ],
    );
    let result = Backtest::new(series.clone(), script, config(1_000.0, 0.0)).run().unwrap();

    assert_eq!(result.trades().len(), 1);
    assert_eq!(result.trades()[0].entry_price(), 11.0);
    assert_eq!(result.trades()[0].exit_price(), 13.0);
    // bought again at 15 and still held
    let position = result.final_position().unwrap();
    assert_eq!(position.entry_price(), 15.0);
    assert_eq!(position.entry_index(), 5);
    check_invariants(&result, &series);
}

#[test]
fn warmup_bars_hold() {
    let series = series(&[10.0; 6]);
    let mut script = Script::new(6, &[(0, Signal::Buy), (1, Signal::Buy), (3, Signal::Buy)]);
    script.warmup = 3;
    let result = Backtest::new(series, script, config(1_000.0, 0.0)).run().unwrap();

    assert_eq!(&result.signals()[..4], &[Signal::Hold, Signal::Hold, Signal::Hold, Signal::Buy]);
    assert_eq!(result.final_position().unwrap().entry_index(), 3);
    // warm-up bars stay in the curve
    assert_eq!(result.equity_curve().len(), 6);
}

#[test]
fn lot_size_rounds_down() {
    let config = config(100_000.0, 0.0003).with_lot_size(100).unwrap();
    let result = Backtest::new(step_series(), step_script(), config).run().unwrap();

    // floor(100000 / 100.03) = 999, rounded down to 900
    assert_eq!(result.trades()[0].quantity(), 900);
}

#[test]
fn sell_tax_only_on_exit() {
    let config = config(100_000.0, 0.0).with_sell_tax_rate(0.001).unwrap();
    let result = Backtest::new(step_series(), step_script(), config).run().unwrap();

    let trade = result.trades()[0];
    assert_eq!(trade.quantity(), 1000);
    assert_approx(trade.commission_paid(), 110.0);
    assert_approx(result.final_cash(), 109_890.0);
}

#[test]
fn run_twice_needs_reset() {
    let mut backtest = Backtest::new(step_series(), step_script(), config(100_000.0, 0.001));
    let first = backtest.run().unwrap();
    assert_eq!(backtest.state(), EngineState::Completed);
    assert_eq!(backtest.index(), 21);

    assert!(matches!(backtest.run(), Err(Error::InvalidState(EngineState::Completed))));

    backtest.reset();
    assert_eq!(backtest.state(), EngineState::Configured);
    assert_eq!(backtest.cash(), 100_000.0);
    assert!(backtest.trades().is_empty());
    let second = backtest.run().unwrap();
    assert_eq!(first, second);
}

#[test]
fn deterministic_runs() {
    let series = PriceSeries::new(crate::utils::synthetic_bars(250, 42, 50.0)).unwrap();
    let run = || {
        Backtest::new(series.clone(), DoubleMa::new(5, 20).unwrap(), BacktestConfig::default())
            .run()
            .unwrap()
    };
    let (first, second) = (run(), run());
    assert_eq!(first, second);
    check_invariants(&first, &series);

    #[cfg(feature = "serde")]
    {
        let (a, b) = (serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
        assert_eq!(a, b);
    }
}

#[test]
fn result_records_configuration() {
    let strategy = DoubleMa::new(3, 7).unwrap();
    let config = config(5_000.0, 0.002);
    let result = Backtest::new(step_series(), strategy, config).run().unwrap();

    let run = result.run_config();
    assert_eq!(run.config, config);
    assert_eq!(run.strategy, "double_ma");
    assert_eq!(run.parameters, strategy.parameters());
    assert_eq!(result.initial_cash(), 5_000.0);
}

#[test]
fn commission_monotonicity() {
    // three winning round trips
    let closes = [100.0, 120.0, 110.0, 130.0, 105.0, 125.0];
    let events = [
        (0, Signal::Buy),
        (1, Signal::Sell),
        (2, Signal::Buy),
        (3, Signal::Sell),
        (4, Signal::Buy),
        (5, Signal::Sell),
    ];
    let pnl = |rate: f64| {
        Backtest::new(series(&closes), Script::new(6, &events), config(10_000.0, rate))
            .run()
            .unwrap()
            .realized_pnl()
    };

    let rates = [0.0, 0.0003, 0.001, 0.003, 0.01];
    let pnls = rates.iter().map(|&r| pnl(r)).collect::<Vec<_>>();
    for pair in pnls.windows(2) {
        assert!(pair[1] <= pair[0], "{pnls:?}");
    }
}

/// One round trip, bought at bar 0 and sold at bar 1.
fn round_trip(entry: f64, exit: f64, config: BacktestConfig) -> Trade {
    let result = Backtest::new(
        series(&[entry, exit]),
        Script::new(2, &[(0, Signal::Buy), (1, Signal::Sell)]),
        config,
    )
    .run()
    .unwrap();
    result.trades()[0]
}

#[test]
fn commission_monotonicity_at_fixed_quantity() {
    // 10500 cash in lots of 100 buys 100 shares at every rate up to 1%
    let rates = [0.0, 0.0003, 0.001, 0.003, 0.01];
    for (entry, exit) in [(100.0, 120.0), (100.0, 50.0)] {
        let trades = rates
            .iter()
            .map(|&r| round_trip(entry, exit, config(10_500.0, r).with_lot_size(100).unwrap()))
            .collect::<Vec<_>>();
        assert!(trades.iter().all(|t| t.quantity() == 100));
        for pair in trades.windows(2) {
            assert!(pair[1].realized_pnl() < pair[0].realized_pnl());
        }
    }
}

#[test]
fn commission_shrinks_a_losing_position() {
    let free = round_trip(100.0, 50.0, config(1_000.0, 0.0));
    let charged = round_trip(100.0, 50.0, config(1_000.0, 0.001));

    assert_eq!(free.quantity(), 10);
    assert_eq!(charged.quantity(), 9);
    assert_approx(free.realized_pnl(), -500.0);
    // 9 × 50 × 0.999 - 9 × 100 × 1.001
    assert_approx(charged.realized_pnl(), -451.35);
    // fewer shares lose less in total, but more per share
    assert!(charged.realized_pnl() > free.realized_pnl());
    assert!(charged.realized_pnl() / 9.0 < free.realized_pnl() / 10.0);
}

#[test]
fn oversized_windows_hold_throughout() {
    let registry = crate::strategy::StrategyRegistry::default();
    let params = crate::strategy::Parameters::from([("entry_window", crate::strategy::MAX_WINDOW as f64)]);
    let strategy = registry.build("turtle", &params).unwrap();
    let series = step_series();

    let result = Backtest::new(series.clone(), strategy, config(10_000.0, 0.0)).run().unwrap();
    assert!(result.signals().iter().all(|s| *s == Signal::Hold));
    assert!(result.trades().is_empty());
    check_invariants(&result, &series);
}

#[test]
fn data_error_fails_the_run() {
    let mut bars = step_series().bars().to_vec();
    let t = bars[3].timestamp();
    bars[3] = Bar::from((t, 100.0, 101.0, 99.0, f64::NAN, 1.0));

    let mut backtest = Backtest::new(PriceSeries::from(bars), step_script(), config(100_000.0, 0.0));
    let error = backtest.run().unwrap_err();
    assert!(error.is_data());
    assert!(matches!(error, Error::InvalidPrice { index: 3, field: "close", .. }));
    assert_eq!(backtest.state(), EngineState::Failed);
    assert_eq!(backtest.index(), 0);
    assert!(matches!(backtest.run(), Err(Error::InvalidState(EngineState::Failed))));
}

#[test]
fn unordered_series_fails_the_run() {
    let mut bars = step_series().bars().to_vec();
    bars.swap(7, 8);
    let error = Backtest::new(PriceSeries::from(bars), step_script(), config(100_000.0, 0.0))
        .run()
        .unwrap_err();
    assert!(matches!(error, Error::UnorderedTimestamp { index: 8 }));
}

#[test]
fn empty_series_fails_the_run() {
    let error = Backtest::new(PriceSeries::from(Vec::<Bar>::new()), step_script(), config(100_000.0, 0.0))
        .run()
        .unwrap_err();
    assert!(matches!(error, Error::EmptySeries));
}

#[test]
fn configuration_error_fails_the_run() {
    let mut backtest = Backtest::new(step_series(), Broken, config(100_000.0, 0.0));
    let error = backtest.run().unwrap_err();
    assert!(error.is_configuration());
    assert_eq!(backtest.state(), EngineState::Failed);

    let mut backtest = Backtest::new(step_series(), ShortColumn, config(100_000.0, 0.0));
    assert!(matches!(
        backtest.run(),
        Err(Error::IndicatorLength { expected: 21, got: 20, .. })
    ));
    assert_eq!(backtest.state(), EngineState::Failed);
}

#[test]
fn boxed_strategy_runs() {
    let strategy: Box<dyn Strategy> = Box::new(step_script());
    let result = Backtest::new(step_series(), strategy, config(100_000.0, 0.0)).run().unwrap();
    assert_eq!(result.final_cash(), 110_000.0);
}

mod properties {
    use proptest::prelude::*;

    use super::{Script, check_invariants, config};
    use crate::engine::{Backtest, PriceSeries};
    use crate::strategy::testing::series;
    use crate::strategy::Strategy as _;
    use crate::strategy::{BollingerBands, DoubleMa, Macd, Rsi, Signal, Turtle};

    fn strategies() -> Vec<Box<dyn crate::strategy::Strategy>> {
        vec![
            Box::new(DoubleMa::new(2, 5).unwrap()),
            Box::new(Macd::new(3, 6, 3).unwrap()),
            Box::new(Turtle::new(4, 2, 3).unwrap()),
            Box::new(Rsi::new(3, 30.0, 70.0).unwrap()),
            Box::new(BollingerBands::new(4, 1.0).unwrap()),
        ]
    }

    fn to_signal(code: u8) -> Signal {
        match code % 3 {
            0 => Signal::Buy,
            1 => Signal::Sell,
            _ => Signal::Hold,
        }
    }

    proptest! {
        /// Accounting invariants hold for any signal sequence and any cost.
        #[test]
        fn invariants_hold(
            closes in prop::collection::vec(1.0..500.0_f64, 1..60),
            codes in prop::collection::vec(0u8..3, 60),
            rate in 0.0..0.01_f64,
            cash in 10.0..100_000.0_f64,
        ) {
            let series = series(&closes);
            let events = codes
                .iter()
                .take(closes.len())
                .enumerate()
                .map(|(i, &c)| (i, to_signal(c)))
                .collect::<Vec<_>>();
            let script = Script::new(closes.len(), &events);

            let result = Backtest::new(series.clone(), script, config(cash, rate)).run().unwrap();
            check_invariants(&result, &series);
            for trade in result.trades() {
                prop_assert!(trade.commission_paid() >= 0.0);
            }
        }

        /// Two series equal up to bar k give the same signals and the same
        /// account state up to bar k.
        #[test]
        fn no_lookahead(
            closes in prop::collection::vec(50.0..150.0_f64, 40),
            tail in prop::collection::vec(50.0..150.0_f64, 40),
            k in 0usize..39,
        ) {
            let full = series(&closes);
            let mut diverging = closes[..=k].to_vec();
            diverging.extend_from_slice(&tail[k + 1..]);
            let forked = series(&diverging);
            let prefix = PriceSeries::from(full.bars()[..=k].to_vec());

            for ((a, b), c) in strategies().into_iter().zip(strategies()).zip(strategies()) {
                let name = a.name().to_string();
                let left = Backtest::new(full.clone(), a, config(10_000.0, 0.001)).run().unwrap();
                let right = Backtest::new(forked.clone(), b, config(10_000.0, 0.001)).run().unwrap();
                let short = Backtest::new(prefix.clone(), c, config(10_000.0, 0.001)).run().unwrap();

                prop_assert_eq!(&left.signals()[..=k], &right.signals()[..=k], "{}", name);
                prop_assert_eq!(&left.equity_curve()[..=k], &right.equity_curve()[..=k], "{}", name);
                prop_assert_eq!(&left.signals()[..=k], short.signals(), "{}", name);
                prop_assert_eq!(&left.equity_curve()[..=k], short.equity_curve(), "{}", name);
            }
        }
    }
}
