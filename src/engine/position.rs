use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The single open long position.
///
/// A position only exists while it is open; the portfolio holds it as an
/// `Option`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    quantity: u64,
    entry_price: f64,
    entry_timestamp: DateTime<Utc>,
    entry_index: usize,
    // Commission paid when the position was opened
    entry_commission: f64,
}

impl Position {
    pub(crate) fn open(
        quantity: u64,
        entry_price: f64,
        entry_timestamp: DateTime<Utc>,
        entry_index: usize,
        commission_rate: f64,
    ) -> Self {
        Self {
            quantity,
            entry_price,
            entry_timestamp,
            entry_index,
            entry_commission: quantity as f64 * entry_price * commission_rate,
        }
    }

    /// Returns the number of shares held.
    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Returns the fill price of the entry.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns the timestamp of the entry bar.
    pub fn entry_timestamp(&self) -> DateTime<Utc> {
        self.entry_timestamp
    }

    /// Returns the index of the entry bar.
    pub fn entry_index(&self) -> usize {
        self.entry_index
    }

    /// Returns the commission paid on entry.
    pub fn entry_commission(&self) -> f64 {
        self.entry_commission
    }

    /// Returns the cash spent to open the position, commission included.
    pub fn cost(&self) -> f64 {
        self.quantity as f64 * self.entry_price + self.entry_commission
    }

    /// Returns the market value at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    /// Estimates the P&L if the position were sold at `price` with no exit costs.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.market_value(price) - self.cost()
    }
}

#[cfg(test)]
#[test]
fn position_cost() {
    let position = Position::open(10, 100.0, DateTime::default(), 3, 0.001);
    assert_eq!(position.quantity(), 10);
    assert_eq!(position.entry_index(), 3);
    assert!((position.entry_commission() - 1.0).abs() < 1e-9);
    assert!((position.cost() - 1_001.0).abs() < 1e-9);
    assert_eq!(position.market_value(110.0), 1_100.0);
    assert!((position.unrealized_pnl(110.0) - 99.0).abs() < 1e-9);
}

#[cfg(test)]
#[test]
fn position_without_commission() {
    let position = Position::open(1000, 100.0, DateTime::default(), 0, 0.0);
    assert_eq!(position.cost(), 100_000.0);
    assert_eq!(position.unrealized_pnl(100.0), 0.0);
}
