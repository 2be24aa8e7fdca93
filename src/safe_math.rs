//! Numeric guards shared by every calculator.
//!
//! The engine never raises on degenerate arithmetic.  Instead, non-finite
//! values collapse to zero and divisions by a zero or non-finite
//! denominator yield zero, so a bad input can never leak `NaN` or
//! `Infinity` into a displayed currency figure.

use tracing::debug;

/// Returns `value` when it is finite, otherwise `0.0`.
pub fn safe_number(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Like [`safe_number`] but also floors negative values at zero.
pub fn non_negative(value: f64) -> f64 {
    safe_number(value).max(0.0)
}

/// Divides `numerator` by `denominator`, falling back to `0.0` when the
/// denominator is zero or either operand (or the quotient) is not finite.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        debug!(numerator, denominator, "degenerate division, using 0");
        return 0.0;
    }
    let quotient = numerator / denominator;
    if quotient.is_finite() {
        quotient
    } else {
        debug!(numerator, denominator, "non-finite quotient, using 0");
        0.0
    }
}
