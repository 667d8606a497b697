#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::Position;

/// Cash and the (at most one) open position.
///
/// Only the engine's execution step mutates a portfolio. Cash can never go
/// negative and shares are whole numbers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    // Initial cash used for reset
    initial_cash: f64,
    // Uninvested cash
    cash: f64,
    position: Option<Position>,
    // Cumulative commissions and taxes paid
    fees: f64,
}

impl Portfolio {
    /// Creates a portfolio holding only cash.
    pub(crate) fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            position: None,
            fees: 0.0,
        }
    }

    /// Returns the initial cash.
    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    /// Returns the uninvested cash.
    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Returns the open position, if any.
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Returns the number of shares held.
    pub fn quantity(&self) -> u64 {
        self.position.as_ref().map_or(0, Position::quantity)
    }

    /// Returns the commissions and taxes paid so far.
    pub fn fees_paid(&self) -> f64 {
        self.fees
    }

    /// Returns cash plus the market value of the position at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.quantity() as f64 * price
    }

    /// Pays for `position` and holds it.
    ///
    /// # Panics
    /// If a position is already open or the cost exceeds the cash. Both mean
    /// the execution step is wrong, not that the input is.
    pub(crate) fn open(&mut self, position: Position) {
        assert!(self.position.is_none(), "a position is already open");
        let cost = position.cost();
        assert!(cost <= self.cash, "position cost {cost} exceeds cash {}", self.cash);
        self.cash -= cost;
        self.fees += position.entry_commission();
        self.position = Some(position);
    }

    /// Releases the open position, crediting the sale `proceeds` and
    /// recording `exit_costs` as fees.
    pub(crate) fn close(&mut self, proceeds: f64, exit_costs: f64) -> Option<Position> {
        let position = self.position.take()?;
        self.cash += proceeds;
        self.fees += exit_costs;
        assert!(self.cash >= 0.0, "cash went negative: {}", self.cash);
        Some(position)
    }

    /// Resets the portfolio to its initial cash.
    pub(crate) fn reset(&mut self) {
        self.fees = 0.0;
        self.position = None;
        self.cash = self.initial_cash;
    }
}
