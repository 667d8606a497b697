//! Backtest engine and the data it works on.
//!
//! This module provides the fundamental types for backtesting:
//! - `Bar` / `PriceSeries`: the immutable OHLCV input.
//! - `BacktestConfig`: cash, commission, lot size and sell tax.
//! - `Portfolio` / `Position`: cash and the single open long position.
//! - `Trade` / `EquityPoint` / `BacktestResult`: what a run produces.
//! - `Backtest`: the state machine that walks the series bar by bar.

mod bar;
mod config;
mod portfolio;
mod position;
mod result;
mod series;
mod trade;

use std::fmt;

use tracing::{debug, info, warn};

use crate::errors::{Error, Result};
use crate::strategy::{Signal, Strategy};

pub use bar::*;
pub use config::*;
pub use portfolio::*;
pub use position::*;
pub use result::*;
pub use series::*;
pub use trade::*;

/// Lifecycle of a [`Backtest`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Built and ready to run.
    Configured,
    /// Walking the series.
    Running,
    /// The walk reached the last bar and produced a result.
    Completed,
    /// Setup or data validation failed; no result was produced.
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configured => write!(f, "configured"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Backtesting engine for one strategy over one price series.
///
/// Each engine owns its portfolio and ledgers, so independent engines can run
/// on different threads while sharing the same [`PriceSeries`].
///
/// ### Example
/// ```rust
/// use stratbt::prelude::*;
///
/// let series = PriceSeries::new(synthetic_bars(120, 7, 100.0)).unwrap();
/// let config = BacktestConfig::new(100_000.0).unwrap();
/// let mut backtest = Backtest::new(series, DoubleMa::new(5, 20).unwrap(), config);
///
/// let result = backtest.run().unwrap();
/// assert_eq!(backtest.state(), EngineState::Completed);
/// assert_eq!(result.equity_curve().len(), 120);
/// ```
#[derive(Debug)]
pub struct Backtest<S> {
    series: PriceSeries,
    strategy: S,
    config: BacktestConfig,
    state: EngineState,
    index: usize,
    portfolio: Portfolio,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
    signals: Vec<Signal>,
}

impl<S> std::ops::Deref for Backtest<S> {
    type Target = Portfolio;

    fn deref(&self) -> &Self::Target {
        &self.portfolio
    }
}

impl<S: Strategy> Backtest<S> {
    /// Creates a new backtest in the [`EngineState::Configured`] state.
    ///
    /// ### Arguments
    /// * `series` - Bars to walk, oldest first.
    /// * `strategy` - Strategy asked for a signal at every bar past its warm-up.
    /// * `config` - Cash and trading costs.
    ///
    /// Nothing is validated here: [`Backtest::run`] checks the configuration,
    /// the series and the strategy parameters before touching any bar.
    pub fn new(series: PriceSeries, strategy: S, config: BacktestConfig) -> Self {
        Self {
            portfolio: Portfolio::new(config.initial_cash()),
            trades: Vec::new(),
            equity_curve: Vec::with_capacity(series.len()),
            signals: Vec::with_capacity(series.len()),
            index: 0,
            state: EngineState::Configured,
            series,
            strategy,
            config,
        }
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Returns the account settings.
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Returns the price series.
    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    /// Returns the strategy.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Returns the index of the next bar to process.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the trades closed so far.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Runs the backtest over every bar.
    ///
    /// ### Returns
    /// The complete result, or the first configuration or data error. On
    /// error the engine moves to [`EngineState::Failed`] and no partial result
    /// is returned. Calling `run` again without [`Backtest::reset`] gives
    /// [`Error::InvalidState`].
    pub fn run(&mut self) -> Result<BacktestResult> {
        if self.state != EngineState::Configured {
            return Err(Error::InvalidState(self.state));
        }

        self.state = EngineState::Running;
        match self.walk() {
            Ok(result) => {
                self.state = EngineState::Completed;
                info!(
                    strategy = self.strategy.name(),
                    trades = result.trades().len(),
                    final_equity = result.final_equity(),
                    "backtest completed"
                );
                Ok(result)
            }
            Err(error) => {
                self.state = EngineState::Failed;
                warn!(strategy = self.strategy.name(), %error, "backtest failed");
                Err(error)
            }
        }
    }

    /// Resets the backtest to its initial state.
    pub fn reset(&mut self) {
        self.index = 0;
        self.state = EngineState::Configured;
        self.portfolio.reset();
        self.trades = Vec::new();
        self.equity_curve = Vec::with_capacity(self.series.len());
        self.signals = Vec::with_capacity(self.series.len());
    }

    fn walk(&mut self) -> Result<BacktestResult> {
        self.config.validate()?;
        self.series.validate()?;
        let indicators = self.strategy.prepare_indicators(&self.series)?;
        indicators.check_len(self.series.len())?;

        let warmup = self.strategy.warmup_period();
        info!(
            strategy = self.strategy.name(),
            parameters = %self.strategy.parameters(),
            bars = self.series.len(),
            warmup,
            "backtest started"
        );

        // cheap: the bars are behind an Arc
        let series = self.series.clone();
        while let Some(view) = series.view(&indicators, self.index) {
            let signal = if self.index < warmup {
                Signal::Hold
            } else {
                self.strategy.generate_signal(&view)
            };
            let bar = view.current();
            self.execute(signal, bar);
            self.signals.push(signal);
            self.equity_curve.push(EquityPoint::new(
                bar.timestamp(),
                self.portfolio.cash(),
                self.portfolio.quantity(),
                bar.close(),
            ));
            self.index += 1;
        }

        Ok(BacktestResult::new(
            RunConfig {
                config: self.config,
                strategy: self.strategy.name().to_string(),
                parameters: self.strategy.parameters(),
            },
            std::mem::take(&mut self.equity_curve),
            std::mem::take(&mut self.trades),
            std::mem::take(&mut self.signals),
            self.portfolio.cash(),
            self.portfolio.position().copied(),
            self.portfolio.fees_paid(),
        ))
    }

    fn execute(&mut self, signal: Signal, bar: &Bar) {
        match (signal, self.portfolio.position()) {
            (Signal::Buy, None) => self.buy(bar),
            (Signal::Sell, Some(_)) => self.sell(bar),
            _ => {}
        }
    }

    /// Opens the largest whole-lot position the cash can pay for, costs
    /// included. Not enough cash for one lot is a no-op.
    fn buy(&mut self, bar: &Bar) {
        let cash = self.portfolio.cash();
        if cash <= 0.0 {
            return;
        }

        let rate = self.config.commission_rate();
        let lot = self.config.lot_size();
        let unit_cost = bar.close() * (1.0 + rate);
        let mut quantity = (cash / unit_cost).floor() as u64 / lot * lot;

        // quantity × price + commission can exceed cash by a rounding error
        while quantity > 0 {
            let position = Position::open(quantity, bar.close(), bar.timestamp(), self.index, rate);
            if position.cost() <= cash {
                debug!(index = self.index, quantity, price = bar.close(), "position opened");
                self.portfolio.open(position);
                return;
            }
            quantity -= lot;
        }

        debug!(index = self.index, cash, price = bar.close(), "buy skipped: insufficient cash");
    }

    /// Sells the whole position at the close.
    fn sell(&mut self, bar: &Bar) {
        let Some(position) = self.portfolio.position().copied() else {
            return;
        };

        let cost_rate = self.config.commission_rate() + self.config.sell_tax_rate();
        let gross = position.quantity() as f64 * bar.close();
        let proceeds = gross * (1.0 - cost_rate);
        let exit_costs = gross * cost_rate;

        let trade = Trade::close(&position, bar.timestamp(), self.index, bar.close(), exit_costs, proceeds);
        self.portfolio.close(proceeds, exit_costs);
        debug!(
            index = self.index,
            quantity = trade.quantity(),
            price = bar.close(),
            pnl = trade.realized_pnl(),
            "position closed"
        );
        self.trades.push(trade);
    }
}

#[cfg(test)]
mod tests;
