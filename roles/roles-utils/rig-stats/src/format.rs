//! Rounding and unit conversion shared by every display value.
//!
//! Every rate or ratio that reaches a report goes through exactly one of
//! [`round2`] or [`to_mhz`].

const HZ_PER_MHZ: f64 = 1_000_000.0;

/// Round to two decimal places, halves rounded up.
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Convert a hashrate in H/s to MH/s, rounded to two decimals.
pub fn to_mhz(hashrate: f64) -> f64 {
    round2(hashrate / HZ_PER_MHZ)
}

/// `numerator / denominator * 100`, rounded. `None` when the denominator is 0.
pub fn percent_of(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(round2(numerator / denominator * 100.0))
    }
}
