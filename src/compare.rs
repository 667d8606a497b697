//! Side-by-side comparison of several strategies.
//!
//! Every strategy gets its own [`Backtest`] over the same shared
//! [`PriceSeries`], and the runs are spread over the rayon thread pool. A
//! failing strategy does not stop the others.

use rayon::prelude::*;
use tracing::info;

use crate::engine::{Backtest, BacktestConfig, BacktestResult, PriceSeries};
use crate::errors::Result;
use crate::strategy::{Parameters, Strategy};

/// The outcome of one strategy in a comparison.
#[derive(Debug)]
pub struct Comparison {
    /// Strategy name.
    pub strategy: String,
    /// Strategy parameters.
    pub parameters: Parameters,
    /// The run result, or the error that failed it.
    pub outcome: Result<BacktestResult>,
}

impl Comparison {
    /// Returns the final equity, if the run completed.
    pub fn final_equity(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(BacktestResult::final_equity)
    }

    /// Computes the metrics of a completed run.
    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> Option<crate::metrics::Metrics> {
        self.outcome.as_ref().ok().map(crate::metrics::Metrics::from)
    }
}

/// Runs every strategy over `series` with the same account settings.
///
/// ### Arguments
/// * `series` - Bars shared by every run.
/// * `config` - Cash and trading costs, copied into every run.
/// * `strategies` - Strategies to compare.
///
/// ### Returns
/// One [`Comparison`] per strategy, in input order.
///
/// ### Example
/// ```rust
/// use stratbt::prelude::*;
///
/// let series = PriceSeries::new(synthetic_bars(300, 11, 50.0)).unwrap();
/// let strategies = StrategyRegistry::default().build_all().unwrap();
/// let comparisons = compare_strategies(&series, BacktestConfig::default(), strategies);
///
/// assert_eq!(comparisons.len(), 5);
/// assert!(comparisons.iter().all(|c| c.outcome.is_ok()));
/// ```
pub fn compare_strategies<S>(series: &PriceSeries, config: BacktestConfig, strategies: Vec<S>) -> Vec<Comparison>
where
    S: Strategy,
{
    info!(strategies = strategies.len(), bars = series.len(), "comparing strategies");

    strategies
        .into_par_iter()
        .map(|strategy| {
            let name = strategy.name().to_string();
            let parameters = strategy.parameters();
            let mut backtest = Backtest::new(series.clone(), strategy, config);
            Comparison {
                strategy: name,
                parameters,
                outcome: backtest.run(),
            }
        })
        .collect()
}

/// Returns the completed comparison with the highest final equity.
pub fn best_by_equity(comparisons: &[Comparison]) -> Option<&Comparison> {
    comparisons
        .iter()
        .filter_map(|c| c.final_equity().map(|equity| (c, equity)))
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PriceSeries;
    use crate::errors::Error;
    use crate::strategy::{DoubleMa, StrategyRegistry};
    use crate::utils::synthetic_bars;

    #[test]
    fn compare_matches_single_runs() {
        let series = PriceSeries::new(synthetic_bars(400, 5, 30.0)).unwrap();
        let config = BacktestConfig::default();
        let strategies = StrategyRegistry::default().build_all().unwrap();
        let names = strategies.iter().map(|s| s.name().to_string()).collect::<Vec<_>>();

        let comparisons = compare_strategies(&series, config, strategies);
        assert_eq!(comparisons.iter().map(|c| c.strategy.clone()).collect::<Vec<_>>(), names);

        for comparison in &comparisons {
            let strategy = StrategyRegistry::default()
                .build(&comparison.strategy, &Parameters::new())
                .unwrap();
            let expected = Backtest::new(series.clone(), strategy, config).run().unwrap();
            assert_eq!(comparison.outcome.as_ref().unwrap(), &expected);
            assert_eq!(comparison.parameters, expected.run_config().parameters);
        }

        let best = best_by_equity(&comparisons).unwrap();
        let top = comparisons.iter().filter_map(Comparison::final_equity).fold(f64::MIN, f64::max);
        assert_eq!(best.final_equity(), Some(top));
    }

    #[test]
    fn failures_stay_isolated() {
        let mut bars = synthetic_bars(60, 2, 30.0);
        let series = PriceSeries::from(bars.clone());
        let strategies = vec![DoubleMa::new(3, 5).unwrap(), DoubleMa::new(5, 10).unwrap()];

        let comparisons = compare_strategies(&series, BacktestConfig::default(), strategies.clone());
        assert!(comparisons.iter().all(|c| c.outcome.is_ok()));

        bars.clear();
        let empty = PriceSeries::from(bars);
        let comparisons = compare_strategies(&empty, BacktestConfig::default(), strategies);
        assert!(comparisons.iter().all(|c| matches!(c.outcome, Err(Error::EmptySeries))));
        assert!(best_by_equity(&comparisons).is_none());
    }
}
