//! Backward-looking indicator computations.
//!
//! Every function returns one value per input value. Positions where the
//! indicator is not defined yet hold `NaN`. The value at index `i` only
//! depends on inputs at indices `<= i`.

/// Simple moving average over `window` values.
pub fn sma(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Exponential moving average with `alpha = 2 / (span + 1)`, seeded with the
/// first value.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut current = None;
    values
        .iter()
        .map(|&v| {
            let next = match current {
                None => v,
                Some(prev) => alpha * v + (1.0 - alpha) * prev,
            };
            current = Some(next);
            next
        })
        .collect()
}

/// Highest value over `window` values.
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Lowest value over `window` values.
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Sample standard deviation over `window` values (`n - 1` denominator).
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    if window < 2 {
        return vec![f64::NAN; values.len()];
    }
    rolling(values, window, |w| {
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let var = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (w.len() - 1) as f64;
        var.sqrt()
    })
}

/// Moves values `n` positions later, filling the head with `NaN`.
///
/// `shift(&highest, 1)[i]` is the channel of the bars before `i`.
pub fn shift(values: &[f64], n: usize) -> Vec<f64> {
    let n = n.min(values.len());
    let mut shifted = vec![f64::NAN; n];
    shifted.extend_from_slice(&values[..values.len() - n]);
    shifted
}

/// Relative Strength Index from the rolling mean of gains and losses.
///
/// Defined from index `period`. A window without losses gives 100, a window
/// without any movement gives 50.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; closes.len()];
    if period == 0 || closes.len() <= period {
        return result;
    }

    let changes = closes.windows(2).map(|w| w[1] - w[0]).collect::<Vec<_>>();
    for (i, window) in changes.windows(period).enumerate() {
        let gain = window.iter().filter(|c| **c > 0.0).sum::<f64>() / period as f64;
        let loss = -window.iter().filter(|c| **c < 0.0).sum::<f64>() / period as f64;
        result[i + period] = if gain == 0.0 && loss == 0.0 {
            50.0
        } else if loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + gain / loss)
        };
    }
    result
}

/// True range: the widest of high − low and the gaps to the previous close.
pub fn true_range(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    (0..highs.len())
        .map(|i| {
            let range = highs[i] - lows[i];
            match i.checked_sub(1).map(|p| closes[p]) {
                Some(prev) => range.max((highs[i] - prev).abs()).max((lows[i] - prev).abs()),
                None => range,
            }
        })
        .collect()
}

/// Average true range: simple average of the true range over `period` bars.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    sma(&true_range(highs, lows, closes), period)
}

fn rolling<F>(values: &[f64], window: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut result = vec![f64::NAN; values.len()];
    if window == 0 || window > values.len() {
        return result;
    }
    for (i, w) in values.windows(window).enumerate() {
        result[i + window - 1] = if w.iter().all(|v| v.is_finite()) { f(w) } else { f64::NAN };
    }
    result
}
