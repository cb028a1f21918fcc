//! Comparison against recorded reference traces
//!
//! Reference values are printed with 15 significant digits, so the tolerance
//! for a value scales with its magnitude: `10^-(15 - d)` where `d` is the
//! number of digits before the decimal point, and `1e-15` below one.

use std::error::Error;
use std::fmt;

/// Significant digits of a recorded reference value
const SIGNIFICANT_DIGITS: i32 = 15;

/// Absolute tolerance for comparing against the recorded value `expected`
pub fn reference_tolerance(expected: f64) -> f64 {
    let magnitude = expected.abs();
    if magnitude < 1.0 {
        return 10f64.powi(-SIGNIFICANT_DIGITS);
    }
    let digits = magnitude.log10().floor() as i32 + 1;
    10f64.powi(digits - SIGNIFICANT_DIGITS)
}

/// A computed value outside the tolerance of its reference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceMismatch {
    /// Position in the trace
    pub index: usize,
    pub expected: f64,
    pub actual: f64,
    pub tolerance: f64,
}

impl fmt::Display for ReferenceMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reference mismatch at index {}: expected {:.15e}, got {:.15e} (off by {:.3e}, tolerance {:.1e})",
            self.index,
            self.expected,
            self.actual,
            (self.actual - self.expected).abs(),
            self.tolerance
        )
    }
}

impl Error for ReferenceMismatch {}

/// Compare `actual` against `expected` element by element.
///
/// `tolerance` maps each expected value to its allowed absolute deviation;
/// pass [`reference_tolerance`] for the recorded-digit rule. Extra trailing
/// values in `actual` are ignored.
///
/// # Errors
/// The first element outside tolerance, or the first missing element
/// (reported with a NaN `actual`).
pub fn compare_trace<F>(expected: &[f64], actual: &[f64], tolerance: F) -> Result<(), ReferenceMismatch>
where
    F: Fn(f64) -> f64,
{
    for (index, &reference) in expected.iter().enumerate() {
        let allowed = tolerance(reference);
        let value = actual.get(index).copied().unwrap_or(f64::NAN);
        // NaN compares false, so it lands outside tolerance
        let within = (value - reference).abs() <= allowed;
        if !within {
            return Err(ReferenceMismatch {
                index,
                expected: reference,
                actual: value,
                tolerance: allowed,
            });
        }
    }
    Ok(())
}
