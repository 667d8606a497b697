#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::{PriceSeries, SeriesView};
use crate::errors::{Error, Result};
use crate::strategy::{Cross, Indicators, Parameters, Signal, Strategy, check_window, crossover, indicators};

const RSI: &str = "rsi";

/// Which threshold crossing triggers a trade.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RsiEntry {
    /// Buy when RSI drops below oversold, sell when it rises above overbought.
    #[default]
    Extreme,
    /// Buy when RSI climbs back above oversold, sell when it falls back below
    /// overbought.
    Reversal,
}

/// Overbought/oversold oscillator strategy on the Relative Strength Index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rsi {
    period: usize,
    oversold: f64,
    overbought: f64,
    entry: RsiEntry,
}

impl Default for Rsi {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
            entry: RsiEntry::Extreme,
        }
    }
}

impl Rsi {
    /// Creates the strategy with [`RsiEntry::Extreme`] triggers.
    ///
    /// ### Arguments
    /// * `period` - RSI lookback.
    /// * `oversold` - Lower threshold.
    /// * `overbought` - Upper threshold, above `oversold`.
    ///
    /// ### Returns
    /// An error unless `0 <= oversold < overbought <= 100`.
    pub fn new(period: usize, oversold: f64, overbought: f64) -> Result<Self> {
        check_window("period", period, 1)?;
        if !(0.0..=100.0).contains(&oversold) || !(0.0..=100.0).contains(&overbought) || oversold >= overbought {
            return Err(Error::Threshold { oversold, overbought });
        }
        Ok(Self {
            period,
            oversold,
            overbought,
            entry: RsiEntry::Extreme,
        })
    }

    /// Sets the trigger mode.
    pub fn with_entry(mut self, entry: RsiEntry) -> Self {
        self.entry = entry;
        self
    }

    /// Creates the strategy from `period`, `oversold` and `overbought`
    /// parameters. A non-zero `reversal` parameter selects
    /// [`RsiEntry::Reversal`].
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        let rsi = Self::new(
            params.window("period")?,
            params.real("oversold")?,
            params.real("overbought")?,
        )?;
        Ok(match params.get("reversal") {
            Some(v) if v != 0.0 => rsi.with_entry(RsiEntry::Reversal),
            _ => rsi,
        })
    }

    /// Returns the trigger mode.
    pub fn entry(&self) -> RsiEntry {
        self.entry
    }
}

impl Strategy for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn parameters(&self) -> Parameters {
        Parameters::from([
            ("period", self.period as f64),
            ("oversold", self.oversold),
            ("overbought", self.overbought),
            ("reversal", (self.entry == RsiEntry::Reversal) as u8 as f64),
        ])
    }

    fn warmup_period(&self) -> usize {
        self.period.saturating_add(1)
    }

    fn prepare_indicators(&self, series: &PriceSeries) -> Result<Indicators> {
        Ok(Indicators::new().with(RSI, indicators::rsi(&series.closes(), self.period)))
    }

    fn generate_signal(&self, view: &SeriesView<'_>) -> Signal {
        let Some((prev, rsi)) = view.pair(RSI) else {
            return Signal::Hold;
        };
        let oversold = crossover((prev, self.oversold), (rsi, self.oversold));
        let overbought = crossover((prev, self.overbought), (rsi, self.overbought));

        let (buy, sell) = match self.entry {
            RsiEntry::Extreme => (Cross::Below, Cross::Above),
            RsiEntry::Reversal => (Cross::Above, Cross::Below),
        };
        if oversold == Some(buy) {
            Signal::Buy
        } else if overbought == Some(sell) {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testing::{positions, series, signals};

    // RSI(2): 50 over two flat bars, 0 with only drops, 100 with only rises
    const CLOSES: [f64; 12] = [10.0, 10.0, 10.0, 9.0, 8.0, 8.0, 8.0, 9.0, 10.0, 10.0, 10.0, 9.0];

    #[test]
    fn rejects_bad_thresholds() {
        assert!(matches!(Rsi::new(14, 70.0, 30.0), Err(Error::Threshold { .. })));
        assert!(matches!(Rsi::new(14, 30.0, 30.0), Err(Error::Threshold { .. })));
        assert!(matches!(Rsi::new(14, -1.0, 70.0), Err(Error::Threshold { .. })));
        assert!(matches!(Rsi::new(14, 30.0, f64::NAN), Err(Error::Threshold { .. })));
        assert!(matches!(Rsi::new(0, 30.0, 70.0), Err(Error::ShortWindow { .. })));
        assert_eq!(Rsi::default(), Rsi::new(14, 30.0, 70.0).unwrap());
        assert_eq!(Rsi::new(usize::MAX, 30.0, 70.0).unwrap().warmup_period(), usize::MAX);
    }

    #[test]
    fn extreme_triggers() {
        let strategy = Rsi::new(2, 30.0, 70.0).unwrap();
        let signals = signals(&strategy, &series(&CLOSES));

        // RSI: -, -, 50, 0, 0, 0, 50, 100, 100, 100, 50, 0
        assert_eq!(positions(&signals, Signal::Buy), vec![3, 11]);
        assert_eq!(positions(&signals, Signal::Sell), vec![7]);
    }

    #[test]
    fn reversal_triggers() {
        let strategy = Rsi::new(2, 30.0, 70.0).unwrap().with_entry(RsiEntry::Reversal);
        let signals = signals(&strategy, &series(&CLOSES));

        assert_eq!(positions(&signals, Signal::Buy), vec![6]);
        assert_eq!(positions(&signals, Signal::Sell), vec![10]);
    }

    #[test]
    fn reversal_parameter() {
        let params = Rsi::default().with_entry(RsiEntry::Reversal).parameters();
        assert_eq!(params.get("reversal"), Some(1.0));
        let rebuilt = Rsi::from_parameters(&params).unwrap();
        assert_eq!(rebuilt.entry(), RsiEntry::Reversal);
        assert_eq!(Rsi::from_parameters(&Rsi::default().parameters()).unwrap(), Rsi::default());
    }
}
