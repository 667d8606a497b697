use std::sync::Arc;

use crate::engine::Bar;
use crate::errors::{Error, Result};
use crate::strategy::Indicators;

/// An immutable, chronologically ordered sequence of bars.
///
/// The bars live behind an `Arc`, so cloning a series is cheap and several
/// backtests can share one series across threads. Nothing in the crate
/// mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    bars: Arc<[Bar]>,
}

impl From<Vec<Bar>> for PriceSeries {
    fn from(bars: Vec<Bar>) -> Self {
        Self { bars: Arc::from(bars) }
    }
}

impl From<Arc<[Bar]>> for PriceSeries {
    fn from(bars: Arc<[Bar]>) -> Self {
        Self { bars }
    }
}

impl FromIterator<Bar> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = Bar>>(iter: I) -> Self {
        Self {
            bars: Arc::from_iter(iter),
        }
    }
}

impl PriceSeries {
    /// Wraps the bars and checks the input contract.
    ///
    /// ### Returns
    /// The series, or the first [`Error::is_data`] violation found.
    pub fn new(bars: Vec<Bar>) -> Result<Self> {
        let series = Self::from(bars);
        series.validate()?;
        Ok(series)
    }

    /// Checks the input contract: at least one bar, strictly increasing
    /// timestamps, finite prices and a positive close on every bar.
    pub fn validate(&self) -> Result<()> {
        if self.bars.is_empty() {
            return Err(Error::EmptySeries);
        }

        for (index, bar) in self.bars.iter().enumerate() {
            let prices = [
                ("open", bar.open()),
                ("high", bar.high()),
                ("low", bar.low()),
                ("close", bar.close()),
            ];
            if let Some((field, value)) = prices.into_iter().find(|(_, v)| !v.is_finite()) {
                return Err(Error::InvalidPrice { index, field, value });
            }
            if bar.close() <= 0.0 {
                return Err(Error::InvalidPrice {
                    index,
                    field: "close",
                    value: bar.close(),
                });
            }
            if index > 0 && bar.timestamp() <= self.bars[index - 1].timestamp() {
                return Err(Error::UnorderedTimestamp { index });
            }
        }

        Ok(())
    }

    /// Returns the number of bars.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Returns true when there is no bar.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Returns the bars as a slice.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Returns the bar at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Returns the last bar, if any.
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Returns an iterator over the bars.
    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    /// Returns the close prices.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(Bar::close).collect()
    }

    /// Returns the high prices.
    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(Bar::high).collect()
    }

    /// Returns the low prices.
    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(Bar::low).collect()
    }

    /// Returns a new series holding the first `len` bars.
    pub fn truncated(&self, len: usize) -> Self {
        self.bars[..len.min(self.bars.len())].iter().copied().collect()
    }

    /// Returns the view a strategy sees at `index`, or `None` past the end.
    pub fn view<'a>(&'a self, indicators: &'a Indicators, index: usize) -> Option<SeriesView<'a>> {
        if index >= self.bars.len() {
            return None;
        }
        Some(SeriesView {
            bars: &self.bars[..=index],
            indicators,
        })
    }
}

/// What a strategy is allowed to see at one step of the walk.
///
/// Bars and indicator values are bounded to positions `0..=index`; there is
/// no accessor that reaches past the current bar.
#[derive(Debug, Clone, Copy)]
pub struct SeriesView<'a> {
    bars: &'a [Bar],
    indicators: &'a Indicators,
}

impl<'a> SeriesView<'a> {
    /// Returns the current bar index.
    pub fn index(&self) -> usize {
        self.bars.len() - 1
    }

    /// Returns the visible bars, oldest first.
    pub fn bars(&self) -> &'a [Bar] {
        self.bars
    }

    /// Returns the current bar.
    pub fn current(&self) -> &'a Bar {
        &self.bars[self.bars.len() - 1]
    }

    /// Returns the previous bar, if any.
    pub fn previous(&self) -> Option<&'a Bar> {
        self.bars.len().checked_sub(2).map(|i| &self.bars[i])
    }

    /// Returns the visible part of an indicator column.
    pub fn column(&self, name: &str) -> Option<&'a [f64]> {
        self.indicators.column(name).map(|c| &c[..self.bars.len().min(c.len())])
    }

    /// Returns a defined indicator value at `index`, if visible.
    pub fn value(&self, name: &str, index: usize) -> Option<f64> {
        self.column(name)?.get(index).copied().filter(|v| v.is_finite())
    }

    /// Returns `(previous, current)` values of an indicator when both are defined.
    pub fn pair(&self, name: &str) -> Option<(f64, f64)> {
        let index = self.index().checked_sub(1)?;
        Some((self.value(name, index)?, self.value(name, index + 1)?))
    }

    /// Returns `(previous, current)` close prices.
    pub fn close_pair(&self) -> Option<(f64, f64)> {
        Some((self.previous()?.close(), self.current().close()))
    }
}
