use chrono::{DateTime, TimeDelta};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::Bar;

// [
//   {
//     "timestamp": "2024-01-02T00:00:00Z",
//     "open": 100.0,
//     "high": 101.5,
//     "low": 99.2,
//     "close": 101.1,
//     "volume": 1520000.0
//   },
//   ...
// ]
// `date`/`open_time` and `*_price` names are accepted as aliases.

#[cfg(feature = "serde")]
/// Reads bars from the JSON array in `filepath`.
///
/// The bars are not validated: wrap them in a [`crate::engine::PriceSeries`]
/// (or let [`crate::engine::Backtest::run`] do it) to check prices and order.
pub fn load_bars_from_file(filepath: impl AsRef<std::path::Path>) -> crate::errors::Result<Vec<Bar>> {
    use crate::errors::Error;
    use std::{fs::File, io::BufReader};

    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(Error::from)
}

/// Generates `n` daily bars following a seeded random walk.
///
/// The same `seed` always gives the same bars. Closes move by at most 2% a
/// day and stay positive; each bar opens at the previous close and its
/// high/low wrap the open and close.
///
/// ### Arguments
/// * `n` - Number of bars.
/// * `seed` - Random generator seed.
/// * `start_price` - Open of the first bar.
pub fn synthetic_bars(n: usize, seed: u64, start_price: f64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = DateTime::from_timestamp_secs(1_704_153_600).unwrap_or_default(); // 2024-01-02
    let mut open = start_price;

    (0..n)
        .map(|i| {
            let change = rng.random_range(-0.02..0.02);
            let close = (open * (1.0 + change)).max(0.01);
            let high = open.max(close) * (1.0 + rng.random_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.random_range(0.0..0.01));
            let volume = rng.random_range(100_000.0..1_000_000.0_f64).round();
            let bar = Bar::from((start + TimeDelta::days(i as i64), open, high, low, close, volume));
            open = close;
            bar
        })
        .collect()
}
