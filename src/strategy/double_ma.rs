use crate::engine::{PriceSeries, SeriesView};
use crate::errors::Result;
use crate::strategy::indicators::sma;
use crate::strategy::{Cross, Indicators, Parameters, Signal, Strategy, check_order, check_window, crossover};

const SHORT: &str = "sma_short";
const LONG: &str = "sma_long";

/// Dual moving-average crossover.
///
/// Buys when the short simple moving average crosses above the long one and
/// sells when it crosses back below.
///
/// ### Example
/// ```rust
/// use stratbt::strategy::{DoubleMa, Strategy};
///
/// let strategy = DoubleMa::new(5, 20).unwrap();
/// assert_eq!(strategy.warmup_period(), 20);
/// assert!(DoubleMa::new(20, 5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleMa {
    short_window: usize,
    long_window: usize,
}

impl Default for DoubleMa {
    fn default() -> Self {
        Self {
            short_window: 5,
            long_window: 20,
        }
    }
}

impl DoubleMa {
    /// Creates the strategy.
    ///
    /// ### Arguments
    /// * `short_window` - Length of the fast average, at least 1.
    /// * `long_window` - Length of the slow average, longer than `short_window`.
    pub fn new(short_window: usize, long_window: usize) -> Result<Self> {
        check_window("short_window", short_window, 1)?;
        check_window("long_window", long_window, 1)?;
        check_order(short_window, long_window)?;
        Ok(Self {
            short_window,
            long_window,
        })
    }

    /// Creates the strategy from `short_window` and `long_window` parameters.
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Self::new(params.window("short_window")?, params.window("long_window")?)
    }

    /// Returns the fast window.
    pub fn short_window(&self) -> usize {
        self.short_window
    }

    /// Returns the slow window.
    pub fn long_window(&self) -> usize {
        self.long_window
    }
}

impl Strategy for DoubleMa {
    fn name(&self) -> &str {
        "double_ma"
    }

    fn parameters(&self) -> Parameters {
        Parameters::from([
            ("short_window", self.short_window as f64),
            ("long_window", self.long_window as f64),
        ])
    }

    fn warmup_period(&self) -> usize {
        self.long_window
    }

    fn prepare_indicators(&self, series: &PriceSeries) -> Result<Indicators> {
        let closes = series.closes();
        Ok(Indicators::new()
            .with(SHORT, sma(&closes, self.short_window))
            .with(LONG, sma(&closes, self.long_window)))
    }

    fn generate_signal(&self, view: &SeriesView<'_>) -> Signal {
        let (Some((prev_short, short)), Some((prev_long, long))) = (view.pair(SHORT), view.pair(LONG))
        else {
            return Signal::Hold;
        };
        match crossover((prev_short, prev_long), (short, long)) {
            Some(Cross::Above) => Signal::Buy,
            Some(Cross::Below) => Signal::Sell,
            None => Signal::Hold,
        }
    }
}
