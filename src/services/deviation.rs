//! Price dispersion statistics

/// Population standard deviation (divisor N, not N-1)
///
/// Returns `None` for an empty slice.
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some(variance.sqrt())
}

/// Largest number of fractional digits an f64 can have
const MAX_FRACTION_DIGITS: usize = 1074;

/// Round to `decimals` places, halves away from zero.
///
/// The decision is made on the exact decimal expansion of `value`, so a
/// value stored just below a `.xx5` boundary rounds down even though
/// `value * 100.0` may land on the half.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let digits = decimals as usize;
    if digits >= MAX_FRACTION_DIGITS {
        return value;
    }

    let exact = format!("{:.*}", MAX_FRACTION_DIGITS, value.abs());
    let (int_part, fraction) = exact.split_once('.').unwrap_or((exact.as_str(), ""));

    let round_up = fraction.as_bytes().get(digits).is_some_and(|d| *d >= b'5');
    let scaled = match format!("{}{}", int_part, &fraction[..digits]).parse::<u128>() {
        Ok(n) if round_up => n + 1,
        Ok(n) => n,
        // Too large for any fractional digit to matter
        Err(_) => return value,
    };

    let rounded = scaled as f64 / 10f64.powi(decimals as i32);
    if value.is_sign_negative() {
        -rounded
    } else {
        rounded
    }
}

/// Deviation of `prices` as reported by the API (2 decimal places)
pub fn price_deviation(prices: &[f64]) -> Option<f64> {
    population_std_dev(prices).map(|d| round_to(d, 2))
}
