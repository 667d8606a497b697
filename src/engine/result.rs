use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::{BacktestConfig, Position, Trade};
use crate::strategy::{Parameters, Signal};

/// Account value at the close of one bar.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    timestamp: DateTime<Utc>,
    cash: f64,
    quantity: u64,
    close: f64,
}

impl EquityPoint {
    pub(crate) fn new(timestamp: DateTime<Utc>, cash: f64, quantity: u64, close: f64) -> Self {
        Self {
            timestamp,
            cash,
            quantity,
            close,
        }
    }

    /// Returns the bar timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the cash after the bar's execution step.
    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Returns the shares held after the bar's execution step.
    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Returns the close used to mark the position.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Returns `cash + quantity × close`.
    pub fn equity(&self) -> f64 {
        self.cash + self.quantity as f64 * self.close
    }
}

/// The settings a result was produced with.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Account settings.
    pub config: BacktestConfig,
    /// Strategy name.
    pub strategy: String,
    /// Strategy parameters.
    pub parameters: Parameters,
}

/// Everything a finished run produced.
///
/// The result is self-contained: downstream consumers need neither the
/// engine nor the price series, though timestamps allow joining back.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    run: RunConfig,
    equity_curve: Vec<EquityPoint>,
    trades: Vec<Trade>,
    signals: Vec<Signal>,
    final_cash: f64,
    final_position: Option<Position>,
    fees_paid: f64,
}

impl BacktestResult {
    pub(crate) fn new(
        run: RunConfig,
        equity_curve: Vec<EquityPoint>,
        trades: Vec<Trade>,
        signals: Vec<Signal>,
        final_cash: f64,
        final_position: Option<Position>,
        fees_paid: f64,
    ) -> Self {
        Self {
            run,
            equity_curve,
            trades,
            signals,
            final_cash,
            final_position,
            fees_paid,
        }
    }

    /// Returns the configuration used.
    pub fn run_config(&self) -> &RunConfig {
        &self.run
    }

    /// Returns the starting cash.
    pub fn initial_cash(&self) -> f64 {
        self.run.config.initial_cash()
    }

    /// Returns one equity point per bar.
    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Returns the completed round trips, in exit order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Returns the signal recorded at each bar.
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Returns the cash at the end of the run.
    pub fn final_cash(&self) -> f64 {
        self.final_cash
    }

    /// Returns the position still open at the end of the run, if any.
    pub fn final_position(&self) -> Option<&Position> {
        self.final_position.as_ref()
    }

    /// Returns all commissions and taxes paid, open position included.
    pub fn fees_paid(&self) -> f64 {
        self.fees_paid
    }

    /// Returns the equity at the last bar.
    pub fn final_equity(&self) -> f64 {
        self.equity_curve.last().map_or(self.final_cash, EquityPoint::equity)
    }

    /// Returns the total return as a fraction of the initial cash.
    pub fn total_return(&self) -> f64 {
        self.final_equity() / self.initial_cash() - 1.0
    }

    /// Returns the sum of realized P&L over all trades.
    pub fn realized_pnl(&self) -> f64 {
        self.trades.iter().map(Trade::realized_pnl).sum()
    }
}
