//! Footprint geometry of the urban area
//!
//! The urban area is idealized as a rectangle known only by its area and
//! perimeter. Solving
//! ```text
//! a · b = A
//! 2(a + b) = P
//! ```
//! gives `a, b = (P/2 ± √((P/2)² − 4A)) / 2`. The `+` root is always taken as
//! the long side, so the solve is deterministic; a square has a zero
//! discriminant and both roots coincide.

use crate::config::positive;
use crate::error::{Result, UwgError};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Horizontal vector (east, north)
pub type Vec2 = Vector2<f64>;

/// Static description of the urban area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrbanFootprint {
    /// Horizontal area (m²)
    pub area: f64,
    /// Perimeter (m)
    pub perimeter: f64,
    /// Azimuth of the long side (degrees clockwise from north)
    pub long_axis_azimuth: f64,
}

impl UrbanFootprint {
    /// Square footprint with side `side` (m)
    pub fn square(side: f64) -> Self {
        Self {
            area: side * side,
            perimeter: 4.0 * side,
            long_axis_azimuth: 0.0,
        }
    }

    /// Long and short sides of the rectangle with this area and perimeter.
    ///
    /// # Errors
    /// `ConfigurationError` when no rectangle has this area and perimeter
    /// (the perimeter is shorter than that of the square of equal area).
    pub fn sides(&self) -> Result<(f64, f64)> {
        let area = positive("footprint.area", self.area)?;
        let semi = positive("footprint.perimeter", self.perimeter)? / 2.0;
        let discriminant = semi * semi - 4.0 * area;
        // Rounding can push a square slightly negative
        let discriminant = if discriminant < 0.0 && discriminant > -1e-9 * semi * semi {
            0.0
        } else {
            discriminant
        };
        if discriminant < 0.0 {
            return Err(UwgError::configuration(
                "footprint.perimeter",
                format!(
                    "perimeter {} is too short to enclose an area of {}",
                    self.perimeter, self.area
                ),
            ));
        }
        let long = (semi + discriminant.sqrt()) / 2.0;
        Ok((long, area / long))
    }

    /// # Errors
    /// `ConfigurationError` for a non-positive area or perimeter, or an
    /// impossible area/perimeter pair.
    pub fn validate(&self) -> Result<()> {
        if !self.long_axis_azimuth.is_finite() {
            return Err(UwgError::configuration(
                "footprint.long_axis_azimuth",
                "must be finite",
            ));
        }
        self.sides().map(|_| ())
    }
}

impl Default for UrbanFootprint {
    fn default() -> Self {
        Self::square(1000.0)
    }
}

/// Unit vector pointing toward `azimuth` (degrees clockwise from north)
fn heading(azimuth: f64) -> Vec2 {
    let rad = azimuth.to_radians();
    Vec2::new(rad.sin(), rad.cos())
}

/// Footprint projected onto the prevailing wind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FootprintGeometry {
    /// Side length of the square of equal area (m)
    pub characteristic_length: f64,
    pub perimeter: f64,
    pub area: f64,
    /// Side facing the wind (m)
    pub orthogonal_length: f64,
    /// Fetch along the wind (m)
    pub parallel_length: f64,
    /// Number of along-wind segments
    pub segment_count: usize,
    /// Length of one along-wind segment (m)
    pub segment_length: f64,
}

impl FootprintGeometry {
    /// Project `footprint` onto a wind blowing from `wind_direction` (degrees)
    /// and split the fetch into segments no longer than `max_dx`.
    ///
    /// The wind counts as blowing along the long side when it is within 45°
    /// of it.
    ///
    /// # Errors
    /// `ConfigurationError` for an invalid footprint or segment width.
    pub fn solve(footprint: &UrbanFootprint, wind_direction: f64, max_dx: f64) -> Result<Self> {
        footprint.validate()?;
        let max_dx = positive("geo.max_dx", max_dx)?;
        let (long, short) = footprint.sides()?;

        let alignment = heading(footprint.long_axis_azimuth).dot(&heading(wind_direction)).abs();
        let (parallel, orthogonal) = if alignment >= std::f64::consts::FRAC_1_SQRT_2 {
            (long, short)
        } else {
            (short, long)
        };

        let segment_count = ((parallel / parallel.min(max_dx)).round() as usize).max(1);
        Ok(Self {
            characteristic_length: footprint.area.sqrt(),
            perimeter: footprint.perimeter,
            area: footprint.area,
            orthogonal_length: orthogonal,
            parallel_length: parallel,
            segment_count,
            segment_length: parallel / segment_count as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_square_footprint() {
        let geometry = FootprintGeometry::solve(&UrbanFootprint::square(1000.0), 0.0, 250.0).unwrap();
        assert_relative_eq!(geometry.characteristic_length, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(geometry.orthogonal_length, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(geometry.parallel_length, 1000.0, epsilon = 1e-9);
        assert_eq!(geometry.segment_count, 4);
        assert_relative_eq!(geometry.segment_length, 250.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rectangle_roots_reproduce_area_and_perimeter() {
        let footprint = UrbanFootprint {
            area: 2.0e6,
            perimeter: 6000.0,
            long_axis_azimuth: 90.0,
        };
        let (long, short) = footprint.sides().unwrap();
        assert_relative_eq!(long, 2000.0, epsilon = 1e-9);
        assert_relative_eq!(short, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(long * short, footprint.area, max_relative = 1e-12);
        assert_relative_eq!(2.0 * (long + short), footprint.perimeter, max_relative = 1e-12);
    }

    #[test]
    fn test_wind_selects_parallel_side() {
        let footprint = UrbanFootprint {
            area: 2.0e6,
            perimeter: 6000.0,
            long_axis_azimuth: 90.0,
        };
        // Westerly wind runs along an east-west long side
        let along = FootprintGeometry::solve(&footprint, 270.0, 250.0).unwrap();
        assert_relative_eq!(along.parallel_length, 2000.0, epsilon = 1e-9);
        assert_eq!(along.segment_count, 8);
        let across = FootprintGeometry::solve(&footprint, 0.0, 250.0).unwrap();
        assert_relative_eq!(across.parallel_length, 1000.0, epsilon = 1e-9);
        assert_relative_eq!(across.orthogonal_length, 2000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_impossible_perimeter_rejected() {
        let footprint = UrbanFootprint {
            area: 1.0e6,
            perimeter: 3000.0,
            long_axis_azimuth: 0.0,
        };
        assert!(footprint.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_small_city_is_one_segment() {
        let geometry = FootprintGeometry::solve(&UrbanFootprint::square(100.0), 45.0, 250.0).unwrap();
        assert_eq!(geometry.segment_count, 1);
        assert_relative_eq!(geometry.segment_length, 100.0, epsilon = 1e-9);
    }
}
