//! # stratbt: bar-by-bar strategy backtesting
//!
//! **stratbt** replays a historical OHLCV price series one bar at a time,
//! asks a trading strategy for a signal at each bar, simulates long-only
//! market orders filled at the close with proportional commission, and
//! records a trade ledger and an equity curve.
//!
//! ## Why stratbt?
//! - **No look-ahead by construction**: strategies only ever see a view of the
//!   series bounded to the current bar.
//! - **Indicators computed once**: every derived column is prepared before the
//!   walk, so each step is O(1).
//! - **Reproducible**: the same series, strategy and configuration always give
//!   the same result.
//! - **Extensible**: implement [`strategy::Strategy`] or register a factory in
//!   [`strategy::StrategyRegistry`].
//!
//! ## Core Components
//! | Component   | Description                                                                 |
//! |-------------|-----------------------------------------------------------------------------|
//! | **`Bar`** / **`PriceSeries`** | Immutable OHLCV input, validated before a run.            |
//! | **`BacktestConfig`** | Initial cash, commission rate, lot size and sell tax.              |
//! | **`Strategy`** | Indicator preparation and per-bar signal generation.                     |
//! | **`Backtest`** | The engine that walks the series and executes signals.                   |
//! | **`BacktestResult`** | Equity curve, trades, signals and final account state.             |
//! | **`Metrics`** | Return, drawdown, Sharpe, Sortino, Calmar, win rate and more.             |
//!
//! ## Built-in strategies
//! | Name          | Rule                                                 |
//! |---------------|------------------------------------------------------|
//! | `double_ma`   | Short SMA crossing the long SMA.                     |
//! | `macd`        | MACD line crossing its signal line.                  |
//! | `turtle`      | Donchian channel breakout with a shorter exit channel. |
//! | `rsi`         | RSI crossing the oversold and overbought thresholds. |
//! | `bollinger`   | Close touching the lower or upper band.              |
//!
//! ## Getting Started
//! ```rust
//! use stratbt::prelude::*;
//!
//! let series = PriceSeries::new(synthetic_bars(250, 42, 100.0)).unwrap();
//! let config = BacktestConfig::new(100_000.0)
//!     .and_then(|c| c.with_commission_rate(0.0003))
//!     .unwrap();
//!
//! let mut backtest = Backtest::new(series, Macd::default(), config);
//! let result = backtest.run().unwrap();
//! println!("final equity: {:.2}", result.final_equity());
//!
//! // Print performance metrics
//! #[cfg(feature = "metrics")]
//! {
//!     let metrics = Metrics::from(&result);
//!     println!("{}", metrics);
//! }
//! ```
//!
//! ## Integrations
//! | Crate          | Purpose                                                          |
//! |----------------|------------------------------------------------------------------|
//! | [`rayon`](https://crates.io/crates/rayon) | Parallel strategy comparison (`parallel` feature). |
//! | [`serde`](https://crates.io/crates/serde) | Serialize/deserialize bars, configs and results (`serde` feature). |
//! | [`tracing`](https://crates.io/crates/tracing) | Run lifecycle and fill events; install any subscriber. |
//!
//! ## Error Handling
//! Every fallible operation returns [`errors::Result`]. Invalid settings and
//! bad data are reported before the first bar is processed; the engine then
//! moves to [`engine::EngineState::Failed`] and returns no partial result.
//! Insufficient cash for a buy and a sell without a position are silent
//! no-ops.
//!
//! ## License
//! MIT
#![warn(missing_docs)]

/// Backtest engine, price data, portfolio and results.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Strategy contract, indicators and the built-in strategies.
pub mod strategy;

/// Data loading and synthetic bar generation.
pub mod utils;

/// Performance metrics: drawdown, Sharpe ratio, win rate, etc.
#[cfg(feature = "metrics")]
pub mod metrics;

/// Parallel comparison of several strategies.
#[cfg(feature = "parallel")]
pub mod compare;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::PercentCalculus;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::strategy::*;
    pub use crate::utils::*;

    #[cfg(feature = "metrics")]
    pub use crate::metrics::*;

    #[cfg(feature = "parallel")]
    pub use crate::compare::*;
}

use std::ops::{Div, Mul, Sub};

/// Trait for performing percentage-based calculations.
pub trait PercentCalculus {
    /// Calculates the percentage change between two values.
    ///
    /// ### Arguments
    /// * `new` - The new value to compare with.
    ///
    /// ### Returns
    /// The percentage change from the original value to the new value.
    fn change(self, new: Self) -> Self;
}

impl PercentCalculus for f64 {
    fn change(self, new: Self) -> Self {
        new.sub(self).div(self).mul(100.0)
    }
}
