use crate::engine::{PriceSeries, SeriesView};
use crate::errors::Result;
use crate::strategy::indicators::{atr, rolling_max, rolling_min, shift};
use crate::strategy::{Cross, Indicators, Parameters, Signal, Strategy, check_window, crossover};

const ENTRY_HIGH: &str = "entry_high";
const EXIT_LOW: &str = "exit_low";

/// Simplified turtle breakout on Donchian channels.
///
/// Channels are taken over the bars *before* the current one, so a close can
/// break out of them. Buys when the close crosses above the `entry_window`
/// high and sells when it crosses below the `exit_window` low. The ATR column
/// is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turtle {
    entry_window: usize,
    exit_window: usize,
    atr_period: usize,
}

impl Default for Turtle {
    fn default() -> Self {
        Self {
            entry_window: 20,
            exit_window: 10,
            atr_period: 20,
        }
    }
}

impl Turtle {
    /// Creates the strategy.
    ///
    /// ### Arguments
    /// * `entry_window` - Lookback of the breakout high.
    /// * `exit_window` - Lookback of the exit low.
    /// * `atr_period` - Averaging period of the true range.
    pub fn new(entry_window: usize, exit_window: usize, atr_period: usize) -> Result<Self> {
        check_window("entry_window", entry_window, 1)?;
        check_window("exit_window", exit_window, 1)?;
        check_window("atr_period", atr_period, 1)?;
        Ok(Self {
            entry_window,
            exit_window,
            atr_period,
        })
    }

    /// Creates the strategy from `entry_window`, `exit_window` and `atr_period` parameters.
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Self::new(
            params.window("entry_window")?,
            params.window("exit_window")?,
            params.window("atr_period")?,
        )
    }
}

impl Strategy for Turtle {
    fn name(&self) -> &str {
        "turtle"
    }

    fn parameters(&self) -> Parameters {
        Parameters::from([
            ("entry_window", self.entry_window as f64),
            ("exit_window", self.exit_window as f64),
            ("atr_period", self.atr_period as f64),
        ])
    }

    fn warmup_period(&self) -> usize {
        self.entry_window.max(self.exit_window).saturating_add(1)
    }

    fn prepare_indicators(&self, series: &PriceSeries) -> Result<Indicators> {
        let (highs, lows, closes) = (series.highs(), series.lows(), series.closes());
        Ok(Indicators::new()
            .with(ENTRY_HIGH, shift(&rolling_max(&highs, self.entry_window), 1))
            .with("entry_low", shift(&rolling_min(&lows, self.entry_window), 1))
            .with("exit_high", shift(&rolling_max(&highs, self.exit_window), 1))
            .with(EXIT_LOW, shift(&rolling_min(&lows, self.exit_window), 1))
            .with("atr", atr(&highs, &lows, &closes, self.atr_period)))
    }

    fn generate_signal(&self, view: &SeriesView<'_>) -> Signal {
        let Some((prev_close, close)) = view.close_pair() else {
            return Signal::Hold;
        };

        let breakout = view
            .pair(ENTRY_HIGH)
            .and_then(|(prev_high, high)| crossover((prev_close, prev_high), (close, high)));
        let breakdown = view
            .pair(EXIT_LOW)
            .and_then(|(prev_low, low)| crossover((prev_close, prev_low), (close, low)));

        if breakout == Some(Cross::Above) {
            return Signal::Buy;
        }
        if breakdown == Some(Cross::Below) {
            return Signal::Sell;
        }
        Signal::Hold
    }
}
