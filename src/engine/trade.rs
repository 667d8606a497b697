use chrono::{DateTime, TimeDelta, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::Position;

/// A completed round trip: one buy followed by the sell that closed it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    entry_timestamp: DateTime<Utc>,
    entry_price: f64,
    exit_timestamp: DateTime<Utc>,
    exit_price: f64,
    quantity: u64,
    commission_paid: f64,
    realized_pnl: f64,
    holding_bars: usize,
}

impl Trade {
    /// Books the exit of `position`.
    ///
    /// `exit_costs` are the commission and taxes taken from the sale and
    /// `proceeds` is the cash actually received.
    pub(crate) fn close(
        position: &Position,
        exit_timestamp: DateTime<Utc>,
        exit_index: usize,
        exit_price: f64,
        exit_costs: f64,
        proceeds: f64,
    ) -> Self {
        Self {
            entry_timestamp: position.entry_timestamp(),
            entry_price: position.entry_price(),
            exit_timestamp,
            exit_price,
            quantity: position.quantity(),
            commission_paid: position.entry_commission() + exit_costs,
            realized_pnl: proceeds - position.cost(),
            holding_bars: exit_index - position.entry_index(),
        }
    }

    /// Returns the entry timestamp.
    pub fn entry_timestamp(&self) -> DateTime<Utc> {
        self.entry_timestamp
    }

    /// Returns the entry price.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns the exit timestamp.
    pub fn exit_timestamp(&self) -> DateTime<Utc> {
        self.exit_timestamp
    }

    /// Returns the exit price.
    pub fn exit_price(&self) -> f64 {
        self.exit_price
    }

    /// Returns the traded quantity.
    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Returns the costs paid on both legs.
    pub fn commission_paid(&self) -> f64 {
        self.commission_paid
    }

    /// Returns the realized profit or loss, net of all costs.
    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    /// Returns the number of bars between entry and exit.
    pub fn holding_bars(&self) -> usize {
        self.holding_bars
    }

    /// Returns the wall-clock time between entry and exit.
    pub fn holding_period(&self) -> TimeDelta {
        self.exit_timestamp - self.entry_timestamp
    }

    /// Returns the realized P&L relative to the gross entry value.
    pub fn return_pct(&self) -> f64 {
        self.realized_pnl / (self.entry_price * self.quantity as f64)
    }

    /// Returns true when the trade made money after costs.
    pub fn is_win(&self) -> bool {
        self.realized_pnl > 0.0
    }
}

#[cfg(test)]
#[test]
fn close_trade() {
    use chrono::Duration;

    let entry = DateTime::from_timestamp_secs(1515151515).unwrap();
    let exit = entry + Duration::days(15);
    let position = Position::open(1000, 100.0, entry, 5, 0.0);
    let trade = Trade::close(&position, exit, 20, 110.0, 0.0, 110_000.0);

    assert_eq!(trade.quantity(), 1000);
    assert_eq!(trade.realized_pnl(), 10_000.0);
    assert_eq!(trade.commission_paid(), 0.0);
    assert_eq!(trade.holding_bars(), 15);
    assert_eq!(trade.holding_period(), Duration::days(15));
    assert!((trade.return_pct() - 0.1).abs() < 1e-12);
    assert!(trade.is_win());
}

#[cfg(test)]
#[test]
fn close_trade_with_costs() {
    let entry = DateTime::from_timestamp_secs(1515151515).unwrap();
    let position = Position::open(10, 100.0, entry, 0, 0.01);
    // 10 * 100 * 0.99
    let trade = Trade::close(&position, entry + TimeDelta::days(1), 1, 100.0, 10.0, 990.0);

    assert!((trade.commission_paid() - 20.0).abs() < 1e-9);
    assert!((trade.realized_pnl() + 20.0).abs() < 1e-9);
    assert!(!trade.is_win());
}
