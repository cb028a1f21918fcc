//! Semantic unit types for the quantities that cross the public API
//!
//! The physical models work on plain `f64` internally (the finite-difference
//! stencils are written against the legacy equations), but the values that
//! callers hand in - site temperatures, pressures, heights - are wrapped so a
//! Celsius reading cannot be passed where Kelvin is expected.
//!
//! # Design Philosophy
//! - All types use f64: the reference traces are compared near machine precision
//! - `Deref` to the inner value for arithmetic-heavy call sites
//! - Explicit conversion methods between related types
//! - Serde support for configuration files
//! - Total ordering via `Ord` (NaN handled as greater than all values)
//!
//! # Usage
//! ```
//! use uwg_core::core_types::units::{Celsius, Kelvin};
//!
//! let temp = Celsius::new(24.7);
//! let kelvin: Kelvin = temp.into();
//! assert!((*kelvin - 297.85).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Deref, Sub};

/// Compare f64 values with total ordering using Rust's built-in `total_cmp`
#[inline]
fn f64_total_cmp(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

macro_rules! total_order {
    ($name:ident) => {
        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                f64_total_cmp(self.0, other.0)
            }
        }

        impl Deref for $name {
            type Target = f64;
            #[inline]
            fn deref(&self) -> &f64 {
                &self.0
            }
        }

        impl From<$name> for f64 {
            fn from(v: $name) -> f64 {
                v.0
            }
        }
    };
}

// ============================================================================
// TEMPERATURE TYPES
// ============================================================================

/// Temperature in degrees Celsius
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Celsius(f64);

total_order!(Celsius);

impl Celsius {
    /// Celsius to Kelvin conversion offset (0°C = 273.15 K)
    const CELSIUS_KELVIN_OFFSET: f64 = 273.15;

    /// Create a new Celsius temperature. Asserts value >= absolute zero (-273.15°C).
    #[inline]
    #[must_use]
    #[track_caller]
    pub const fn new(value: f64) -> Self {
        assert!(
            value >= -Self::CELSIUS_KELVIN_OFFSET,
            "Celsius::new: value is below absolute zero (-273.15°C)"
        );
        Celsius(value)
    }

    /// Convert to Kelvin
    #[inline]
    #[must_use]
    pub fn to_kelvin(self) -> Kelvin {
        Kelvin(self.0 + Self::CELSIUS_KELVIN_OFFSET)
    }
}

impl From<Celsius> for Kelvin {
    fn from(c: Celsius) -> Kelvin {
        c.to_kelvin()
    }
}

impl fmt::Display for Celsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}°C", self.0)
    }
}

/// Absolute temperature in Kelvin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kelvin(f64);

total_order!(Kelvin);

impl Kelvin {
    /// Create a new Kelvin temperature. Asserts value >= 0.
    #[inline]
    #[must_use]
    #[track_caller]
    pub const fn new(value: f64) -> Self {
        assert!(value >= 0.0, "Kelvin::new: value is below absolute zero");
        Kelvin(value)
    }

    /// Convert to Celsius
    #[inline]
    #[must_use]
    pub fn to_celsius(self) -> Celsius {
        Celsius(self.0 - Celsius::CELSIUS_KELVIN_OFFSET)
    }
}

impl From<Kelvin> for Celsius {
    fn from(k: Kelvin) -> Celsius {
        k.to_celsius()
    }
}

// Kelvin - Kelvin = KelvinDelta (difference between two absolute temperatures)
impl Sub for Kelvin {
    type Output = KelvinDelta;
    fn sub(self, rhs: Kelvin) -> KelvinDelta {
        KelvinDelta(self.0 - rhs.0)
    }
}

// Kelvin + KelvinDelta = Kelvin
impl Add<KelvinDelta> for Kelvin {
    type Output = Kelvin;
    fn add(self, rhs: KelvinDelta) -> Kelvin {
        let result = self.0 + rhs.0;
        assert!(result >= 0.0, "Temperature below absolute zero: {result:.2}K");
        Kelvin(result)
    }
}

impl fmt::Display for Kelvin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}K", self.0)
    }
}

/// Temperature difference in Kelvin (any sign)
///
/// Used for the urban heat-island excess over the rural reference.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct KelvinDelta(f64);

total_order!(KelvinDelta);

impl KelvinDelta {
    /// Create a temperature delta
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        KelvinDelta(value)
    }

    /// Get the raw f64 value
    #[inline]
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for KelvinDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.3}K", self.0)
    }
}

// ============================================================================
// PRESSURE AND LENGTH
// ============================================================================

/// Pressure in Pascals
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Pascals(f64);

total_order!(Pascals);

impl Pascals {
    /// Create a new pressure. Asserts value > 0.
    #[inline]
    #[must_use]
    #[track_caller]
    pub const fn new(value: f64) -> Self {
        assert!(value > 0.0, "Pascals::new: pressure must be positive");
        Pascals(value)
    }

    /// Convert to hectopascals
    #[inline]
    #[must_use]
    pub fn to_hectopascals(self) -> f64 {
        self.0 / 100.0
    }
}

impl fmt::Display for Pascals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}Pa", self.0)
    }
}

/// Length or height in meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Meters(f64);

total_order!(Meters);

impl Meters {
    /// Create a new length (any sign; validation happens where a length must be positive)
    #[inline]
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Meters(value)
    }
}

impl fmt::Display for Meters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}m", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_celsius_kelvin_roundtrip() {
        let c = Celsius::new(24.7);
        let k = c.to_kelvin();
        assert!((*k - 297.85).abs() < 1e-12);
        assert!((*k.to_celsius() - 24.7).abs() < 1e-12);
    }

    #[test]
    fn test_kelvin_difference_is_delta() {
        let urban = Kelvin::new(299.1);
        let rural = Kelvin::new(297.6);
        let excess = urban - rural;
        assert!((excess.value() - 1.5).abs() < 1e-12);
        assert!((*(rural + excess) - *urban).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "below absolute zero")]
    fn test_kelvin_rejects_negative() {
        let _ = Kelvin::new(-1.0);
    }

    #[test]
    fn test_total_ordering_handles_nan() {
        let mut heights = [Meters::new(10.0), Meters::new(f64::NAN), Meters::new(2.0)];
        heights.sort();
        assert_eq!(*heights[0], 2.0);
        assert!(heights[2].is_nan());
    }

    #[test]
    fn test_pressure_conversion() {
        assert!((Pascals::new(100_900.0).to_hectopascals() - 1009.0).abs() < 1e-12);
    }
}
