//! Strategy contract and the built-in strategies.
//!
//! A strategy does two things:
//! - `prepare_indicators`: compute every derived column once, before the walk.
//! - `generate_signal`: read a [`SeriesView`] bounded to the current bar and
//!   answer [`Signal::Buy`], [`Signal::Hold`] or [`Signal::Sell`].
//!
//! New strategies are added by implementing [`Strategy`]; the engine never
//! inspects which strategy it drives.

mod bollinger;
mod double_ma;
pub mod indicators;
mod macd;
mod registry;
mod rsi;
mod turtle;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::{PriceSeries, SeriesView};
use crate::errors::{Error, Result};

pub use bollinger::*;
pub use double_ma::*;
pub use macd::*;
pub use registry::*;
pub use rsi::*;
pub use turtle::*;

/// A trading decision for one bar.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Open a position if none is open.
    Buy,
    /// Do nothing.
    #[default]
    Hold,
    /// Close the open position, if any.
    Sell,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Hold => write!(f, "hold"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Direction of a crossover between two series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cross {
    /// `a` moved from at-or-below `b` to strictly above it.
    Above,
    /// `a` moved from at-or-above `b` to strictly below it.
    Below,
}

/// Compares the relation of `(a, b)` at the previous bar with the relation at
/// the current bar.
///
/// Only the bar where the relation changes fires, so a condition that
/// persists does not fire again.
///
/// ```rust
/// use stratbt::strategy::{crossover, Cross};
///
/// assert_eq!(crossover((1.0, 2.0), (3.0, 2.0)), Some(Cross::Above));
/// assert_eq!(crossover((3.0, 2.0), (4.0, 2.0)), None);
/// ```
pub fn crossover((prev_a, prev_b): (f64, f64), (a, b): (f64, f64)) -> Option<Cross> {
    if prev_a <= prev_b && a > b {
        Some(Cross::Above)
    } else if prev_a >= prev_b && a < b {
        Some(Cross::Below)
    } else {
        None
    }
}

/// Named indicator columns derived from a price series.
///
/// Every column has one value per bar; `NaN` marks a bar where the
/// indicator is not defined yet. Built once per run and never mutated
/// during the walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Indicators {
    columns: BTreeMap<String, Vec<f64>>,
}

impl Indicators {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a column.
    pub fn with(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.columns.insert(name.into(), values);
        self
    }

    /// Returns a whole column.
    ///
    /// Strategies read columns through [`SeriesView`] instead, which hides
    /// values past the current bar.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Returns the column names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true when there is no column.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Checks that every column matches the series length.
    pub(crate) fn check_len(&self, expected: usize) -> Result<()> {
        match self.columns.iter().find(|(_, c)| c.len() != expected) {
            Some((column, c)) => Err(Error::IndicatorLength {
                column: column.clone(),
                expected,
                got: c.len(),
            }),
            None => Ok(()),
        }
    }
}

/// Largest window accepted from a [`Parameters`] set.
pub const MAX_WINDOW: usize = u32::MAX as usize;

/// A strategy's parameter set, by name.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters(BTreeMap<String, f64>);

impl<const N: usize> From<[(&str, f64); N]> for Parameters {
    fn from(values: [(&str, f64); N]) -> Self {
        Self(values.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

impl Parameters {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a parameter.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Returns a parameter value.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Returns a parameter as a window length.
    ///
    /// The value must be a whole number in `0..=MAX_WINDOW`.
    pub fn window(&self, name: &str) -> Result<usize> {
        match self.get(name) {
            Some(v) if (0.0..=MAX_WINDOW as f64).contains(&v) && v.fract() == 0.0 => Ok(v as usize),
            _ => Err(Error::Parameter(name.to_string())),
        }
    }

    /// Returns a parameter as a real number.
    pub fn real(&self, name: &str) -> Result<f64> {
        self.get(name)
            .filter(|v| v.is_finite())
            .ok_or_else(|| Error::Parameter(name.to_string()))
    }

    /// Returns these parameters with `overrides` applied on top.
    pub fn merged(&self, overrides: &Parameters) -> Self {
        let mut merged = self.clone();
        merged.0.extend(overrides.0.iter().map(|(k, v)| (k.clone(), *v)));
        merged
    }

    /// Returns an iterator over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// A trading strategy driven by the backtest engine.
///
/// Implementations must be deterministic: the same series gives the same
/// indicators, and the same view gives the same signal.
///
/// ### Example
/// ```rust
/// use stratbt::prelude::*;
///
/// /// Buys on the first bar that closes above 100, sells below 90.
/// struct Threshold;
///
/// impl Strategy for Threshold {
///     fn name(&self) -> &str {
///         "threshold"
///     }
///
///     fn prepare_indicators(&self, _series: &PriceSeries) -> Result<Indicators> {
///         Ok(Indicators::new())
///     }
///
///     fn generate_signal(&self, view: &SeriesView<'_>) -> Signal {
///         match view.current().close() {
///             c if c > 100.0 => Signal::Buy,
///             c if c < 90.0 => Signal::Sell,
///             _ => Signal::Hold,
///         }
///     }
/// }
/// ```
pub trait Strategy: Send + Sync {
    /// Returns a short identifier.
    fn name(&self) -> &str;

    /// Returns the parameter set, recorded in the result.
    fn parameters(&self) -> Parameters {
        Parameters::default()
    }

    /// Returns how many leading bars are needed before signals are valid.
    ///
    /// The engine records Hold for these bars without calling
    /// [`Strategy::generate_signal`].
    fn warmup_period(&self) -> usize {
        0
    }

    /// Computes the derived columns once, before the walk.
    ///
    /// Every column must only use backward-looking windows and have one value
    /// per bar.
    fn prepare_indicators(&self, series: &PriceSeries) -> Result<Indicators>;

    /// Decides what to do at `view.index()`.
    fn generate_signal(&self, view: &SeriesView<'_>) -> Signal;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn parameters(&self) -> Parameters {
        (**self).parameters()
    }

    fn warmup_period(&self) -> usize {
        (**self).warmup_period()
    }

    fn prepare_indicators(&self, series: &PriceSeries) -> Result<Indicators> {
        (**self).prepare_indicators(series)
    }

    fn generate_signal(&self, view: &SeriesView<'_>) -> Signal {
        (**self).generate_signal(view)
    }
}

impl<S: Strategy + ?Sized> Strategy for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn parameters(&self) -> Parameters {
        (**self).parameters()
    }

    fn warmup_period(&self) -> usize {
        (**self).warmup_period()
    }

    fn prepare_indicators(&self, series: &PriceSeries) -> Result<Indicators> {
        (**self).prepare_indicators(series)
    }

    fn generate_signal(&self, view: &SeriesView<'_>) -> Signal {
        (**self).generate_signal(view)
    }
}

/// Rejects a window shorter than `min`.
pub(crate) fn check_window(param: &'static str, value: usize, min: usize) -> Result<()> {
    if value < min {
        return Err(Error::ShortWindow { param, value, min });
    }
    Ok(())
}

/// Rejects `fast >= slow`.
pub(crate) fn check_order(fast: usize, slow: usize) -> Result<()> {
    if fast >= slow {
        return Err(Error::WindowOrder { fast, slow });
    }
    Ok(())
}
