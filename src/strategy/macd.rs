use crate::engine::{PriceSeries, SeriesView};
use crate::errors::Result;
use crate::strategy::indicators::ema;
use crate::strategy::{Cross, Indicators, Parameters, Signal, Strategy, check_order, check_window, crossover};

const MACD: &str = "macd";
const SIGNAL: &str = "macd_signal";

/// Moving Average Convergence Divergence.
///
/// The MACD line is `EMA(fast) - EMA(slow)` of the close and the signal line
/// is `EMA(signal)` of the MACD line. Buys when the MACD line crosses above
/// the signal line, sells when it crosses below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

impl Macd {
    /// Creates the strategy.
    ///
    /// ### Arguments
    /// * `fast` - Span of the fast EMA.
    /// * `slow` - Span of the slow EMA, longer than `fast`.
    /// * `signal` - Span of the signal-line EMA.
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self> {
        check_window("fast", fast, 1)?;
        check_window("slow", slow, 1)?;
        check_window("signal", signal, 1)?;
        check_order(fast, slow)?;
        Ok(Self { fast, slow, signal })
    }

    /// Creates the strategy from `fast`, `slow` and `signal` parameters.
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Self::new(params.window("fast")?, params.window("slow")?, params.window("signal")?)
    }
}

impl Strategy for Macd {
    fn name(&self) -> &str {
        "macd"
    }

    fn parameters(&self) -> Parameters {
        Parameters::from([
            ("fast", self.fast as f64),
            ("slow", self.slow as f64),
            ("signal", self.signal as f64),
        ])
    }

    fn warmup_period(&self) -> usize {
        self.slow.saturating_add(self.signal)
    }

    fn prepare_indicators(&self, series: &PriceSeries) -> Result<Indicators> {
        let closes = series.closes();
        let fast = ema(&closes, self.fast);
        let slow = ema(&closes, self.slow);
        let macd = fast.iter().zip(&slow).map(|(f, s)| f - s).collect::<Vec<_>>();
        let signal = ema(&macd, self.signal);
        let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

        Ok(Indicators::new()
            .with("ema_fast", fast)
            .with("ema_slow", slow)
            .with(MACD, macd)
            .with(SIGNAL, signal)
            .with("macd_hist", histogram))
    }

    fn generate_signal(&self, view: &SeriesView<'_>) -> Signal {
        let (Some((prev_macd, macd)), Some((prev_signal, signal))) = (view.pair(MACD), view.pair(SIGNAL))
        else {
            return Signal::Hold;
        };
        match crossover((prev_macd, prev_signal), (macd, signal)) {
            Some(Cross::Above) => Signal::Buy,
            Some(Cross::Below) => Signal::Sell,
            None => Signal::Hold,
        }
    }
}
