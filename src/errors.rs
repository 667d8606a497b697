use crate::engine::EngineState;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or running a backtest.
#[derive(thiserror::Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    /// The price series is empty. Backtesting requires at least one bar.
    #[error("Price series is empty: backtesting requires at least one bar")]
    EmptySeries,

    /// Timestamps must be strictly increasing and unique.
    #[error("Bar {index} is not after the previous bar (timestamps must be strictly increasing)")]
    UnorderedTimestamp { index: usize },

    /// A price field is NaN, infinite or (for the close) not positive.
    #[error("Invalid {field} price at bar {index} (got: {value})")]
    InvalidPrice {
        index: usize,
        field: &'static str,
        value: f64,
    },

    /// A strategy produced an indicator column whose length differs from the series.
    #[error("Indicator column `{column}` has {got} values, expected {expected}")]
    IndicatorLength {
        column: String,
        expected: usize,
        got: usize,
    },

    /// A required bar field was not set on the builder.
    #[error("Missing bar field: {0}")]
    MissingField(&'static str),

    /// The initial cash is not positive.
    #[error("Initial cash must be positive (got: {0})")]
    NegZeroCash(f64),

    /// The commission rate must be in `[0, 1)`.
    #[error("Commission rate must be in [0, 1) (got: {0})")]
    CommissionRate(f64),

    /// The sell tax rate must be in `[0, 1)` and leave positive proceeds with the commission.
    #[error("Sell tax rate must be in [0, 1) (got: {0})")]
    SellTaxRate(f64),

    /// Shares are bought in lots of at least one.
    #[error("Lot size must be at least 1")]
    ZeroLotSize,

    /// A lookback window shorter than the indicator needs to be defined.
    #[error("Window `{param}` is too short (got: {value}, minimum: {min})")]
    ShortWindow {
        param: &'static str,
        value: usize,
        min: usize,
    },

    /// The fast window must be strictly shorter than the slow window.
    #[error("Fast window ({fast}) must be shorter than slow window ({slow})")]
    WindowOrder { fast: usize, slow: usize },

    /// Oscillator thresholds must satisfy `0 <= oversold < overbought <= 100`.
    #[error("Invalid thresholds: oversold {oversold}, overbought {overbought}")]
    Threshold { oversold: f64, overbought: f64 },

    /// A band multiplier must be positive and finite.
    #[error("Band multiplier must be positive (got: {0})")]
    Multiplier(f64),

    /// No strategy is registered under that name.
    #[error("Unknown strategy `{0}`")]
    UnknownStrategy(String),

    /// A strategy parameter is missing or not representable.
    #[error("Invalid parameter `{0}`")]
    Parameter(String),

    /// The engine cannot run from its current state.
    #[error("Backtest cannot run from state {0:?}")]
    InvalidState(EngineState),

    /// I/O error occurred.
    // utils.rs
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Error {
    /// Returns true for invalid strategy parameters or backtest settings.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NegZeroCash(_)
                | Self::CommissionRate(_)
                | Self::SellTaxRate(_)
                | Self::ZeroLotSize
                | Self::ShortWindow { .. }
                | Self::WindowOrder { .. }
                | Self::Threshold { .. }
                | Self::Multiplier(_)
                | Self::UnknownStrategy(_)
                | Self::Parameter(_)
        )
    }

    /// Returns true for a price series that breaks the input contract.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            Self::EmptySeries
                | Self::UnorderedTimestamp { .. }
                | Self::InvalidPrice { .. }
                | Self::IndicatorLength { .. }
                | Self::MissingField(_)
        )
    }
}

#[cfg(test)]
#[test]
fn error_kinds() {
    assert!(
        Error::ShortWindow {
            param: "period",
            value: 0,
            min: 1
        }
        .is_configuration()
    );
    assert!(Error::WindowOrder { fast: 26, slow: 12 }.is_configuration());
    assert!(!Error::EmptySeries.is_configuration());
    assert!(Error::UnorderedTimestamp { index: 3 }.is_data());
    assert!(!Error::NegZeroCash(0.0).is_data());
    assert!(!Error::InvalidState(EngineState::Completed).is_data());
}

#[cfg(test)]
#[test]
fn error_messages_name_the_offender() {
    let err = Error::InvalidPrice {
        index: 7,
        field: "close",
        value: f64::NAN,
    };
    assert_eq!(err.to_string(), "Invalid close price at bar 7 (got: NaN)");
    let err = Error::ShortWindow {
        param: "period",
        value: 1,
        min: 2,
    };
    assert_eq!(err.to_string(), "Window `period` is too short (got: 1, minimum: 2)");
}
