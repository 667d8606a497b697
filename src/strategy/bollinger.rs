use crate::engine::{PriceSeries, SeriesView};
use crate::errors::{Error, Result};
use crate::strategy::indicators::{rolling_std, sma};
use crate::strategy::{Indicators, Parameters, Signal, Strategy, check_window};

const UPPER: &str = "bb_upper";
const LOWER: &str = "bb_lower";

/// Mean reversion on Bollinger Bands.
///
/// Bands are `SMA(period) ± multiplier × σ` with the sample standard
/// deviation of the close. Buys on the bar where the close moves from above
/// the lower band to on-or-below it, sells on the bar where the close moves
/// from below the upper band to on-or-above it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    period: usize,
    multiplier: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            period: 20,
            multiplier: 2.0,
        }
    }
}

impl BollingerBands {
    /// Creates the strategy.
    ///
    /// ### Arguments
    /// * `period` - Averaging window, at least 2 for a sample deviation.
    /// * `multiplier` - Band width in standard deviations, positive.
    pub fn new(period: usize, multiplier: f64) -> Result<Self> {
        check_window("period", period, 2)?;
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(Error::Multiplier(multiplier));
        }
        Ok(Self { period, multiplier })
    }

    /// Creates the strategy from `period` and `multiplier` parameters.
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        Self::new(params.window("period")?, params.real("multiplier")?)
    }
}

impl Strategy for BollingerBands {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn parameters(&self) -> Parameters {
        Parameters::from([("period", self.period as f64), ("multiplier", self.multiplier)])
    }

    fn warmup_period(&self) -> usize {
        self.period
    }

    fn prepare_indicators(&self, series: &PriceSeries) -> Result<Indicators> {
        let closes = series.closes();
        let middle = sma(&closes, self.period);
        let std = rolling_std(&closes, self.period);

        let upper = middle.iter().zip(&std).map(|(m, s)| m + self.multiplier * s).collect::<Vec<_>>();
        let lower = middle.iter().zip(&std).map(|(m, s)| m - self.multiplier * s).collect::<Vec<_>>();
        let width = (0..closes.len()).map(|i| (upper[i] - lower[i]) / middle[i]).collect();

        Ok(Indicators::new()
            .with("bb_middle", middle)
            .with(UPPER, upper)
            .with(LOWER, lower)
            .with("bb_width", width))
    }

    fn generate_signal(&self, view: &SeriesView<'_>) -> Signal {
        let (Some((prev_close, close)), Some((prev_lower, lower)), Some((prev_upper, upper))) =
            (view.close_pair(), view.pair(LOWER), view.pair(UPPER))
        else {
            return Signal::Hold;
        };

        if prev_close > prev_lower && close <= lower {
            Signal::Buy
        } else if prev_close < prev_upper && close >= upper {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testing::{assert_approx, positions, series, signals};

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(BollingerBands::new(1, 2.0), Err(Error::ShortWindow { value: 1, min: 2, .. })));
        assert!(matches!(BollingerBands::new(20, 0.0), Err(Error::Multiplier(_))));
        assert!(matches!(BollingerBands::new(20, f64::INFINITY), Err(Error::Multiplier(_))));
        let params = Parameters::from([("period", 10.0), ("multiplier", 1.5)]);
        assert_eq!(
            BollingerBands::from_parameters(&params).unwrap(),
            BollingerBands::new(10, 1.5).unwrap()
        );
    }

    #[test]
    fn bands_use_sample_deviation() {
        let series = series(&[11.0, 10.0, 6.0]);
        let indicators = BollingerBands::new(3, 1.0).unwrap().prepare_indicators(&series).unwrap();
        // mean 9, squared deviations 4 + 1 + 9 over n - 1 = 2
        assert_approx(indicators.column(UPPER).unwrap()[2], 9.0 + 7.0_f64.sqrt());
        assert_approx(indicators.column(LOWER).unwrap()[2], 9.0 - 7.0_f64.sqrt());
    }

    #[test]
    fn band_touches() {
        let strategy = BollingerBands::new(3, 1.0).unwrap();
        let closes = [10.0, 11.0, 10.0, 11.0, 10.0, 6.0, 8.0, 9.0, 14.0];
        let signals = signals(&strategy, &series(&closes));

        assert_eq!(positions(&signals, Signal::Buy), vec![5]);
        assert_eq!(positions(&signals, Signal::Sell), vec![8]);
    }

    #[test]
    fn flat_series_never_fires() {
        let strategy = BollingerBands::new(3, 2.0).unwrap();
        let signals = signals(&strategy, &series(&[10.0; 8]));
        assert!(signals.iter().all(|s| *s == Signal::Hold));
    }
}
