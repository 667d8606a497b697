use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{Error, Result};
use crate::strategy::{BollingerBands, DoubleMa, Macd, Parameters, Rsi, Strategy, Turtle};

type Factory = Box<dyn Fn(&Parameters) -> Result<Box<dyn Strategy>> + Send + Sync>;

/// What the registry knows about one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyInfo {
    /// Registry key.
    pub name: String,
    /// One-line summary of the trading rule.
    pub description: String,
    /// Market conditions the rule is meant for.
    pub suited_for: String,
    /// Parameters used when the caller does not override them.
    pub defaults: Parameters,
}

impl fmt::Display for StrategyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (suited for {}; defaults: {})",
            self.name, self.description, self.suited_for, self.defaults
        )
    }
}

struct Entry {
    info: StrategyInfo,
    factory: Factory,
}

/// Builds strategies by name.
///
/// [`StrategyRegistry::default`] knows the five built-in strategies
/// (`double_ma`, `macd`, `turtle`, `rsi`, `bollinger`). Names are case
/// insensitive.
///
/// ### Example
/// ```rust
/// use stratbt::strategy::{Parameters, StrategyRegistry};
///
/// let registry = StrategyRegistry::default();
/// let strategy = registry
///     .build("double_ma", &Parameters::from([("short_window", 10.0)]))
///     .unwrap();
/// assert_eq!(strategy.parameters().get("short_window"), Some(10.0));
/// assert_eq!(strategy.parameters().get("long_window"), Some(20.0));
/// ```
pub struct StrategyRegistry {
    entries: BTreeMap<String, Entry>,
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.values().map(|e| &e.info)).finish()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(
            "double_ma",
            "short moving average crossing the long one",
            "clearly trending markets",
            DoubleMa::default().parameters(),
            |p| Ok(Box::new(DoubleMa::from_parameters(p)?)),
        );
        registry.register(
            "macd",
            "MACD line crossing its signal line",
            "medium to long trends",
            Macd::default().parameters(),
            |p| Ok(Box::new(Macd::from_parameters(p)?)),
        );
        registry.register(
            "turtle",
            "Donchian channel breakout",
            "trend following",
            Turtle::default().parameters(),
            |p| Ok(Box::new(Turtle::from_parameters(p)?)),
        );
        registry.register(
            "rsi",
            "RSI overbought and oversold thresholds",
            "ranging markets",
            Rsi::default().parameters(),
            |p| Ok(Box::new(Rsi::from_parameters(p)?)),
        );
        registry.register(
            "bollinger",
            "close touching the Bollinger Bands",
            "mean reversion",
            BollingerBands::default().parameters(),
            |p| Ok(Box::new(BollingerBands::from_parameters(p)?)),
        );
        registry
    }
}

impl StrategyRegistry {
    /// Creates a registry without any strategy.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) a strategy.
    ///
    /// ### Arguments
    /// * `name` - Registry key, stored lowercase.
    /// * `description` - One-line summary of the trading rule.
    /// * `suited_for` - Market conditions the rule is meant for.
    /// * `defaults` - Complete parameter set; [`StrategyRegistry::build`] only
    ///   accepts overrides of these names.
    /// * `factory` - Builds the strategy from a complete parameter set.
    pub fn register<F>(
        &mut self,
        name: &str,
        description: &str,
        suited_for: &str,
        defaults: Parameters,
        factory: F,
    ) where
        F: Fn(&Parameters) -> Result<Box<dyn Strategy>> + Send + Sync + 'static,
    {
        let name = name.to_lowercase();
        let info = StrategyInfo {
            name: name.clone(),
            description: description.to_string(),
            suited_for: suited_for.to_string(),
            defaults,
        };
        self.entries.insert(
            name,
            Entry {
                info,
                factory: Box::new(factory),
            },
        );
    }

    /// Builds a strategy, filling parameters absent from `overrides` with the
    /// registered defaults.
    ///
    /// ### Returns
    /// [`Error::UnknownStrategy`] for an unregistered name,
    /// [`Error::Parameter`] for an override the strategy does not take, or
    /// the strategy's own validation error.
    pub fn build(&self, name: &str, overrides: &Parameters) -> Result<Box<dyn Strategy>> {
        let entry = self.entry(name)?;
        if let Some((unknown, _)) = overrides.iter().find(|(k, _)| entry.info.defaults.get(k).is_none()) {
            return Err(Error::Parameter(unknown.to_string()));
        }
        (entry.factory)(&entry.info.defaults.merged(overrides))
    }

    /// Builds every registered strategy with its defaults, in name order.
    pub fn build_all(&self) -> Result<Vec<Box<dyn Strategy>>> {
        self.entries
            .values()
            .map(|entry| (entry.factory)(&entry.info.defaults))
            .collect()
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns what the registry knows about `name`.
    pub fn describe(&self, name: &str) -> Result<&StrategyInfo> {
        self.entry(name).map(|e| &e.info)
    }

    fn entry(&self, name: &str) -> Result<&Entry> {
        self.entries
            .get(&name.to_lowercase())
            .ok_or_else(|| Error::UnknownStrategy(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{PriceSeries, SeriesView};
    use crate::strategy::{Indicators, Signal};

    struct AlwaysBuy;

    impl Strategy for AlwaysBuy {
        fn name(&self) -> &str {
            "always_buy"
        }

        fn prepare_indicators(&self, _series: &PriceSeries) -> Result<Indicators> {
            Ok(Indicators::new())
        }

        fn generate_signal(&self, _view: &SeriesView<'_>) -> Signal {
            Signal::Buy
        }
    }

    #[test]
    fn builtin_names() {
        let registry = StrategyRegistry::default();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["bollinger", "double_ma", "macd", "rsi", "turtle"]
        );
        let all = registry.build_all().unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[1].name(), "double_ma");
    }

    #[test]
    fn build_with_overrides() {
        let registry = StrategyRegistry::default();
        let macd = registry
            .build("MACD", &Parameters::from([("fast", 10.0), ("slow", 20.0), ("signal", 5.0)]))
            .unwrap();
        assert_eq!(macd.warmup_period(), 25);

        let rsi = registry.build("rsi", &Parameters::new()).unwrap();
        assert_eq!(rsi.parameters(), Rsi::default().parameters());
    }

    #[test]
    fn build_errors() {
        let registry = StrategyRegistry::default();
        assert!(matches!(
            registry.build("momentum", &Parameters::new()),
            Err(Error::UnknownStrategy(name)) if name == "momentum"
        ));
        assert!(matches!(
            registry.build("double_ma", &Parameters::from([("window", 3.0)])),
            Err(Error::Parameter(name)) if name == "window"
        ));
        assert!(matches!(
            registry.build("double_ma", &Parameters::from([("short_window", 30.0)])),
            Err(Error::WindowOrder { fast: 30, slow: 20 })
        ));
        assert!(matches!(
            registry.build("turtle", &Parameters::from([("entry_window", 1e20)])),
            Err(Error::Parameter(name)) if name == "entry_window"
        ));
    }

    #[test]
    fn register_custom() {
        let mut registry = StrategyRegistry::empty();
        registry.register("Always_Buy", "buys every bar", "testing", Parameters::new(), |_| {
            Ok(Box::new(AlwaysBuy))
        });

        assert_eq!(registry.build("always_buy", &Parameters::new()).unwrap().name(), "always_buy");
        let info = registry.describe("always_buy").unwrap();
        assert_eq!(info.to_string(), "always_buy: buys every bar (suited for testing; defaults: )");
    }
}
