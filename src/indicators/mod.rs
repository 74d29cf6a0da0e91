//! Technical indicators over close prices
//!
//! All functions operate on plain `f64` slices ordered oldest → newest and
//! return the indicator value at the newest element.

#[cfg(test)]
mod tests;

/// RSI value used when the indicator is undefined
pub const NEUTRAL_RSI: f64 = 50.0;

/// Exponentially weighted mean with span-derived smoothing.
///
/// Uses adjusted weights: each observation `i` steps back from the newest is
/// weighted `(1 - alpha)^i` and the sum is normalized, so early values are not
/// over-weighted by a seed.
pub fn ewm_mean(values: &[f64], span: usize) -> Option<f64> {
    if values.is_empty() || span == 0 {
        return None;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for &value in values {
        numerator = numerator * decay + value;
        denominator = denominator * decay + 1.0;
    }

    let mean = numerator / denominator;
    mean.is_finite().then_some(mean)
}

/// Relative Strength Index with simple rolling averages of gains and losses.
///
/// Returns `None` when there are fewer than `period + 1` closes or when the
/// window is perfectly flat.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let window = &closes[closes.len() - (period + 1)..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(g, l), delta| {
            if delta > 0.0 {
                (g + delta, l)
            } else {
                (g, l - delta)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        // gain / 0 is +inf, which saturates at 100; 0 / 0 is undefined
        return (avg_gain > 0.0).then_some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Simple moving average of the last `period` values
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Bollinger envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub lower: f64,
    pub middle: f64,
    pub upper: f64,
}

impl Bands {
    /// Position of `price` inside the envelope: 0 at the lower band, 1 at the upper
    pub fn percent_b(&self, price: f64) -> Option<f64> {
        let width = self.upper - self.lower;
        (width > 0.0).then(|| (price - self.lower) / width)
    }
}

/// Bollinger bands: SMA ± `k` sample standard deviations over `period` values
pub fn bollinger(values: &[f64], period: usize, k: f64) -> Option<Bands> {
    if period < 2 {
        return None;
    }
    let middle = sma(values, period)?;
    let window = &values[values.len() - period..];
    let variance = window
        .iter()
        .map(|v| (v - middle).powi(2))
        .sum::<f64>()
        / (period as f64 - 1.0);
    let deviation = variance.sqrt();

    Some(Bands {
        lower: middle - k * deviation,
        middle,
        upper: middle + k * deviation,
    })
}
