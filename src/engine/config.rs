#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Account settings for a backtest run.
///
/// Rates are fractions (`0.001` is 0.1%). The commission is charged on both
/// legs; the sell tax only on exits.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    initial_cash: f64,
    commission_rate: f64,
    lot_size: u64,
    sell_tax_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            commission_rate: 0.0003,
            lot_size: 1,
            sell_tax_rate: 0.0,
        }
    }
}

impl BacktestConfig {
    /// Creates a configuration with the given cash and no commission.
    ///
    /// ### Example
    /// ```rust
    /// use stratbt::prelude::*;
    ///
    /// let config = BacktestConfig::new(10_000.0).unwrap().with_commission_rate(0.001).unwrap();
    /// assert_eq!(config.commission_rate(), 0.001);
    /// assert!(BacktestConfig::new(0.0).is_err());
    /// ```
    pub fn new(initial_cash: f64) -> Result<Self> {
        let config = Self {
            initial_cash,
            commission_rate: 0.0,
            lot_size: 1,
            sell_tax_rate: 0.0,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the commission rate charged on each leg.
    pub fn with_commission_rate(mut self, rate: f64) -> Result<Self> {
        self.commission_rate = rate;
        self.validate()?;
        Ok(self)
    }

    /// Sets the board lot: buys are rounded down to a multiple of it.
    pub fn with_lot_size(mut self, lot_size: u64) -> Result<Self> {
        self.lot_size = lot_size;
        self.validate()?;
        Ok(self)
    }

    /// Sets a tax charged on sell proceeds only (e.g. stamp duty).
    pub fn with_sell_tax_rate(mut self, rate: f64) -> Result<Self> {
        self.sell_tax_rate = rate;
        self.validate()?;
        Ok(self)
    }

    /// Checks every setting.
    ///
    /// Deserialized configurations bypass the setters, so the engine calls
    /// this again before a run.
    pub fn validate(&self) -> Result<()> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(Error::NegZeroCash(self.initial_cash));
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            return Err(Error::CommissionRate(self.commission_rate));
        }
        if !(0.0..1.0).contains(&self.sell_tax_rate) || self.commission_rate + self.sell_tax_rate >= 1.0 {
            return Err(Error::SellTaxRate(self.sell_tax_rate));
        }
        if self.lot_size == 0 {
            return Err(Error::ZeroLotSize);
        }
        Ok(())
    }

    /// Returns the starting cash.
    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    /// Returns the per-leg commission rate.
    pub fn commission_rate(&self) -> f64 {
        self.commission_rate
    }

    /// Returns the board lot size.
    pub fn lot_size(&self) -> u64 {
        self.lot_size
    }

    /// Returns the sell-side tax rate.
    pub fn sell_tax_rate(&self) -> f64 {
        self.sell_tax_rate
    }
}

#[cfg(test)]
#[test]
fn default_config_is_valid() {
    let config = BacktestConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.initial_cash(), 100_000.0);
    assert_eq!(config.lot_size(), 1);
}

#[cfg(test)]
#[test]
fn invalid_cash() {
    assert!(matches!(BacktestConfig::new(0.0), Err(Error::NegZeroCash(_))));
    assert!(matches!(BacktestConfig::new(-10.0), Err(Error::NegZeroCash(_))));
    assert!(matches!(BacktestConfig::new(f64::NAN), Err(Error::NegZeroCash(_))));
}

#[cfg(test)]
#[test]
fn invalid_rates() {
    let config = BacktestConfig::new(1_000.0).unwrap();
    assert!(matches!(config.with_commission_rate(-0.1), Err(Error::CommissionRate(_))));
    assert!(matches!(config.with_commission_rate(1.0), Err(Error::CommissionRate(_))));
    assert!(matches!(config.with_commission_rate(f64::NAN), Err(Error::CommissionRate(_))));
    assert!(matches!(config.with_sell_tax_rate(-0.1), Err(Error::SellTaxRate(_))));
    assert!(matches!(config.with_lot_size(0), Err(Error::ZeroLotSize)));

    let config = config.with_commission_rate(0.6).unwrap();
    assert!(matches!(config.with_sell_tax_rate(0.5), Err(Error::SellTaxRate(_))));
}

#[cfg(test)]
#[test]
fn zero_commission_is_valid() {
    let config = BacktestConfig::new(1_000.0).unwrap().with_commission_rate(0.0).unwrap();
    assert_eq!(config.commission_rate(), 0.0);
    let config = config.with_lot_size(100).unwrap().with_sell_tax_rate(0.001).unwrap();
    assert_eq!(config.lot_size(), 100);
    assert_eq!(config.sell_tax_rate(), 0.001);
}
