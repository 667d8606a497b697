use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// One OHLCV price bar.
///
/// Bars are immutable once built. Build them with [`BarBuilder`] or from a
/// `(timestamp, open, high, low, close, volume)` tuple.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    #[cfg_attr(feature = "serde", serde(alias = "date", alias = "open_time"))]
    timestamp: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(alias = "open_price"))]
    open: f64,
    #[cfg_attr(feature = "serde", serde(alias = "high_price"))]
    high: f64,
    #[cfg_attr(feature = "serde", serde(alias = "low_price"))]
    low: f64,
    #[cfg_attr(feature = "serde", serde(alias = "close_price"))]
    close: f64,
    volume: f64,
}

type B = (DateTime<Utc>, f64, f64, f64, f64, f64);
impl From<B> for Bar {
    fn from((timestamp, open, high, low, close, volume): B) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl Bar {
    /// Returns the bar timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the open price.
    pub fn open(&self) -> f64 {
        self.open
    }

    /// Returns the high price.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns the low price.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Returns the close price.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Returns the traded volume.
    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// Builder for [`Bar`]. Every field is required.
///
/// ### Example
/// ```rust
/// use stratbt::prelude::*;
/// use chrono::DateTime;
///
/// let bar = BarBuilder::builder()
///     .timestamp(DateTime::from_timestamp_secs(1_700_000_000).unwrap())
///     .open(100.0)
///     .high(110.0)
///     .low(95.0)
///     .close(105.0)
///     .volume(1_000.0)
///     .build()
///     .unwrap();
/// assert_eq!(bar.close(), 105.0);
/// ```
#[derive(Debug, Default)]
pub struct BarBuilder {
    timestamp: Option<DateTime<Utc>>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

impl BarBuilder {
    /// Starts an empty builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the timestamp.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the open price.
    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    /// Sets the high price.
    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    /// Sets the low price.
    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    /// Sets the close price.
    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    /// Sets the volume.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Builds the bar, failing on the first missing field.
    ///
    /// Price sanity is checked later, when the series is validated.
    pub fn build(self) -> Result<Bar> {
        Ok(Bar {
            timestamp: self.timestamp.ok_or(Error::MissingField("timestamp"))?,
            open: self.open.ok_or(Error::MissingField("open"))?,
            high: self.high.ok_or(Error::MissingField("high"))?,
            low: self.low.ok_or(Error::MissingField("low"))?,
            close: self.close.ok_or(Error::MissingField("close"))?,
            volume: self.volume.ok_or(Error::MissingField("volume"))?,
        })
    }
}

#[cfg(test)]
#[test]
fn build_bar() {
    let timestamp = DateTime::from_timestamp_secs(1515151515).unwrap();
    let bar = BarBuilder::builder()
        .timestamp(timestamp)
        .open(90.0)
        .high(110.0)
        .low(80.0)
        .close(100.0)
        .volume(1.0)
        .build()
        .unwrap();

    assert_eq!(bar.timestamp(), timestamp);
    assert_eq!(bar.open(), 90.0);
    assert_eq!(bar.high(), 110.0);
    assert_eq!(bar.low(), 80.0);
    assert_eq!(bar.close(), 100.0);
    assert_eq!(bar.volume(), 1.0);
    assert_eq!(bar, Bar::from((timestamp, 90.0, 110.0, 80.0, 100.0, 1.0)));
}

#[cfg(test)]
#[test]
fn build_bar_missing_field() {
    let result = BarBuilder::builder().open(1.0).high(1.0).low(1.0).close(1.0).volume(1.0).build();
    assert!(matches!(result, Err(Error::MissingField("timestamp"))));

    let result = BarBuilder::builder()
        .timestamp(DateTime::default())
        .open(1.0)
        .high(1.0)
        .low(1.0)
        .volume(1.0)
        .build();
    assert!(matches!(result, Err(Error::MissingField("close"))));
}
