//! Performance metrics for backtesting.
//!
//! This module provides tools to calculate, from a finished
//! [`BacktestResult`]:
//! - Total and annualized return
//! - Max drawdown and volatility
//! - Sharpe, Sortino and Calmar ratios
//! - Win rate, profit factor and holding time
//!
//! It needs to enable `metrics` feature to use it.

use std::fmt;

use chrono::TimeDelta;

use crate::PercentCalculus;
use crate::engine::*;

/// Trading days per year, used to annualize daily figures.
pub const TRADING_DAYS: f64 = 252.0;

/// A collection of trading metrics calculated from an equity curve and a
/// trade ledger.
///
/// It is typically constructed from a [`BacktestResult`]. Percentages are
/// returned in percent (`25.0` is 25%), ratios as plain numbers.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    initial_cash: f64,
    fees: f64,
    equity: Vec<f64>,
    trades: Vec<Trade>,
    days: i64,
}

impl From<&BacktestResult> for Metrics {
    fn from(value: &BacktestResult) -> Self {
        let curve = value.equity_curve();
        let period = match (curve.first(), curve.last()) {
            (Some(first), Some(last)) => last.timestamp() - first.timestamp(),
            _ => TimeDelta::zero(),
        };
        Self::new(
            value.initial_cash(),
            curve.iter().map(EquityPoint::equity).collect(),
            value.trades().to_vec(),
            value.fees_paid(),
            period,
        )
    }
}

impl Metrics {
    /// Creates a new `Metrics` instance.
    ///
    /// ### Arguments
    /// * `initial_cash` - Starting cash.
    /// * `equity` - Equity at each bar.
    /// * `trades` - Completed round trips.
    /// * `fees` - Commissions and taxes paid.
    /// * `period` - Time between the first and the last bar.
    pub fn new(initial_cash: f64, equity: Vec<f64>, trades: Vec<Trade>, fees: f64, period: TimeDelta) -> Self {
        Self {
            initial_cash,
            fees,
            equity,
            trades,
            days: period.num_days(),
        }
    }

    /// Returns the initial cash.
    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    /// Returns the equity at the last bar.
    pub fn final_equity(&self) -> f64 {
        self.equity.last().copied().unwrap_or(self.initial_cash)
    }

    /// Returns the cumulative fees paid.
    pub fn fees(&self) -> f64 {
        self.fees
    }

    /// Returns the number of completed trades.
    pub fn total_trades(&self) -> usize {
        self.trades.len()
    }

    /// Computes the total return as a percentage.
    pub fn total_return(&self) -> f64 {
        self.initial_cash.change(self.final_equity())
    }

    /// Computes the compound annual return as a percentage, over calendar
    /// days.
    pub fn annualized_return(&self) -> f64 {
        if self.days <= 0 {
            return 0.0;
        }
        let growth = self.final_equity() / self.initial_cash;
        (growth.powf(365.0 / self.days as f64) - 1.0) * 100.0
    }

    /// Returns the bar-to-bar returns of the equity curve.
    pub fn returns(&self) -> Vec<f64> {
        self.equity.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
    }

    /// Computes the maximum drawdown as a percentage.
    pub fn max_drawdown(&self) -> f64 {
        let mut max_peak = self.initial_cash;
        let mut max_drawdown = 0.0;

        for &equity in &self.equity {
            if equity > max_peak {
                max_peak = equity;
            }
            let drawdown = (max_peak - equity) / max_peak;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }

        max_drawdown * 100.0
    }

    /// Computes the annualized volatility of the returns, as a fraction.
    pub fn volatility(&self) -> f64 {
        sample_std(&self.returns()) * TRADING_DAYS.sqrt()
    }

    /// Computes the Sharpe ratio, a measure of risk-adjusted return.
    ///
    /// `risk_free_rate` is the annualized risk-free return (e.g. `0.03`).
    /// Returns 0 when the returns do not vary.
    pub fn sharpe_ratio(&self, risk_free_rate: f64) -> f64 {
        let returns = self.returns();
        let std_dev = sample_std(&returns) * TRADING_DAYS.sqrt();
        if !(std_dev > 0.0) {
            return 0.0;
        }
        (mean(&returns) * TRADING_DAYS - risk_free_rate) / std_dev
    }

    /// Computes the Sortino ratio: like the Sharpe ratio, but only downside
    /// returns count as risk.
    pub fn sortino_ratio(&self, risk_free_rate: f64) -> f64 {
        let returns = self.returns();
        let downside = returns.iter().copied().filter(|r| *r < 0.0).collect::<Vec<_>>();
        let downside_std = sample_std(&downside) * TRADING_DAYS.sqrt();
        if !(downside_std > 0.0) {
            return 0.0;
        }
        (mean(&returns) * TRADING_DAYS - risk_free_rate) / downside_std
    }

    /// Computes the Calmar ratio: annualized return over max drawdown.
    pub fn calmar_ratio(&self) -> f64 {
        let drawdown = self.max_drawdown();
        if drawdown == 0.0 {
            return 0.0;
        }
        self.annualized_return() / drawdown
    }

    /// Computes the profit factor.
    pub fn profit_factor(&self) -> f64 {
        let mut total_gains = 0.0;
        let mut total_losses = 0.0;

        for trade in &self.trades {
            let pnl = trade.realized_pnl();
            if pnl > 0.0 {
                total_gains += pnl;
            } else {
                total_losses += pnl.abs();
            }
        }

        if total_losses == 0.0 {
            return f64::INFINITY;
        }

        total_gains / total_losses
    }

    /// Computes the win rate as a percentage of winning trades.
    pub fn win_rate(&self) -> f64 {
        if self.trades.is_empty() {
            return 0.0;
        }
        let winning_trades = self.trades.iter().filter(|t| t.is_win()).count();
        (winning_trades as f64 / self.trades.len() as f64) * 100.0
    }

    /// Computes the average number of bars a trade was held.
    pub fn average_holding_bars(&self) -> f64 {
        if self.trades.is_empty() {
            return 0.0;
        }
        self.trades.iter().map(|t| t.holding_bars() as f64).sum::<f64>() / self.trades.len() as f64
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// `NaN` with fewer than two values.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let mean = mean(values);
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64).sqrt()
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Metrics ===")?;
        writeln!(f, "Initial Cash: {:.2}", self.initial_cash)?;
        writeln!(f, "Final Equity: {:.2}", self.final_equity())?;
        writeln!(f, "Total Return: {:.2}%", self.total_return())?;
        writeln!(f, "Annualized Return: {:.2}%", self.annualized_return())?;
        writeln!(f, "Fees paid: {:.2}", self.fees)?;
        writeln!(f)?;
        writeln!(f, "Max Drawdown: {:.2}%", self.max_drawdown())?;
        writeln!(f, "Volatility: {:.2}%", self.volatility() * 100.0)?;
        writeln!(f, "Sharpe Ratio (risk-free rate = 0.0): {:.2}", self.sharpe_ratio(0.0))?;
        writeln!(f, "Sortino Ratio (risk-free rate = 0.0): {:.2}", self.sortino_ratio(0.0))?;
        writeln!(f, "Calmar Ratio: {:.2}", self.calmar_ratio())?;
        writeln!(f)?;
        writeln!(f, "Trades: {}", self.total_trades())?;
        writeln!(f, "Profit Factor: {:.2}", self.profit_factor())?;
        writeln!(f, "Win Rate: {:.2}%", self.win_rate())?;
        write!(f, "Average Holding: {:.1} bars", self.average_holding_bars())
    }
}

#[cfg(test)]
// Helper function to create a closed trade with the given P&L
fn create_trade(pnl: f64, holding_bars: usize) -> Trade {
    use chrono::DateTime;

    let entry = DateTime::from_timestamp_secs(1515151515).unwrap();
    let position = Position::open(1, 100.0, entry, 0, 0.0);
    let exit = entry + TimeDelta::days(holding_bars as i64);
    Trade::close(&position, exit, holding_bars, 100.0 + pnl, 0.0, 100.0 + pnl)
}

#[cfg(test)]
#[test]
fn max_drawdown() {
    let equity = vec![10000.0, 12000.0, 9000.0, 11000.0];
    let metrics = Metrics::new(10000.0, equity, vec![], 0.0, TimeDelta::days(3));
    assert_eq!(metrics.max_drawdown(), 25.0); // (12000 - 9000) / 12000 = 25%
}

#[cfg(test)]
#[test]
fn max_drawdown_no_equity() {
    let metrics = Metrics::new(10000.0, vec![], vec![], 0.0, TimeDelta::zero());
    assert_eq!(metrics.max_drawdown(), 0.0);
    assert_eq!(metrics.final_equity(), 10000.0);
    assert_eq!(metrics.total_return(), 0.0);
}

#[cfg(test)]
#[test]
fn profit_factor() {
    let trades = vec![create_trade(20.0, 2), create_trade(-10.0, 4)];
    let metrics = Metrics::new(10000.0, vec![], trades, 0.0, TimeDelta::zero());
    assert_eq!(metrics.profit_factor(), 2.0); // 20 / 10 = 2.0
    assert_eq!(metrics.win_rate(), 50.0);
    assert_eq!(metrics.average_holding_bars(), 3.0);
}

#[cfg(test)]
#[test]
fn profit_factor_no_losses() {
    let metrics = Metrics::new(10000.0, vec![], vec![create_trade(20.0, 1)], 0.0, TimeDelta::zero());
    assert_eq!(metrics.profit_factor(), f64::INFINITY);
    assert_eq!(metrics.win_rate(), 100.0);
}

#[cfg(test)]
#[test]
fn no_trades() {
    let metrics = Metrics::new(10000.0, vec![], vec![], 0.0, TimeDelta::zero());
    assert_eq!(metrics.profit_factor(), f64::INFINITY);
    assert_eq!(metrics.win_rate(), 0.0);
    assert_eq!(metrics.average_holding_bars(), 0.0);
}

#[cfg(test)]
#[test]
fn returns_and_ratios() {
    let equity = vec![10000.0, 10500.0, 10300.0, 10700.0];
    let metrics = Metrics::new(10000.0, equity, vec![], 0.0, TimeDelta::days(3));

    let returns = metrics.returns();
    assert_eq!(returns.len(), 3);
    assert!((returns[0] - 0.05).abs() < 1e-12);
    assert!((metrics.total_return() - 7.0).abs() < 1e-9);
    assert!(metrics.sharpe_ratio(0.0) > 0.0);
    assert!(metrics.sortino_ratio(0.0) == 0.0); // a single down day has no sample deviation
    assert!(metrics.volatility() > 0.0);
}

#[cfg(test)]
#[test]
fn flat_equity_ratios() {
    let metrics = Metrics::new(10000.0, vec![10000.0; 5], vec![], 0.0, TimeDelta::days(4));
    assert_eq!(metrics.sharpe_ratio(0.0), 0.0);
    assert_eq!(metrics.sortino_ratio(0.0), 0.0);
    assert_eq!(metrics.calmar_ratio(), 0.0);
    assert_eq!(metrics.annualized_return(), 0.0);
}

#[cfg(test)]
#[test]
fn annualized_over_one_year() {
    let metrics = Metrics::new(10000.0, vec![10000.0, 11000.0], vec![], 0.0, TimeDelta::days(365));
    assert!((metrics.annualized_return() - 10.0).abs() < 1e-9);

    // 21% over two years is 10% a year
    let metrics = Metrics::new(10000.0, vec![10000.0, 12100.0], vec![], 0.0, TimeDelta::days(730));
    assert!((metrics.annualized_return() - 10.0).abs() < 1e-9);
}

#[cfg(test)]
#[test]
fn from_result() {
    use crate::strategy::Signal;

    let start = chrono::DateTime::from_timestamp_secs(1515151515).unwrap();
    let curve = (0..3)
        .map(|i| EquityPoint::new(start + TimeDelta::days(i), 1000.0 + i as f64 * 100.0, 0, 10.0))
        .collect::<Vec<_>>();
    let run = RunConfig {
        config: BacktestConfig::new(1000.0).unwrap(),
        strategy: "test".to_string(),
        parameters: Default::default(),
    };
    let result = BacktestResult::new(run, curve, vec![create_trade(5.0, 1)], vec![Signal::Hold; 3], 1200.0, None, 1.5);

    let metrics = Metrics::from(&result);
    assert_eq!(metrics.final_equity(), 1200.0);
    assert_eq!(metrics.fees(), 1.5);
    assert_eq!(metrics.total_trades(), 1);
    assert!((metrics.total_return() - 20.0).abs() < 1e-9);
    assert!(metrics.to_string().starts_with("=== Backtest Metrics ==="));
}
