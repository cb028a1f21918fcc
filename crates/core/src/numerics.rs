//! Shared numeric utilities
//!
//! Tridiagonal solve, hydrostatic integration, ideal-gas density and the
//! interpolation helpers used by the column, surface and boundary-layer models.

use crate::core_types::PhysicalConstants;
use crate::error::{ensure_all_finite, Result, UwgError};

/// Coefficients of a tridiagonal system `lower[i]·x[i-1] + diag[i]·x[i] + upper[i]·x[i+1] = rhs[i]`.
///
/// `lower[0]` and `upper[n-1]` are ignored.
#[derive(Debug, Clone, Default)]
pub struct Tridiagonal {
    pub lower: Vec<f64>,
    pub diag: Vec<f64>,
    pub upper: Vec<f64>,
    pub rhs: Vec<f64>,
}

impl Tridiagonal {
    /// Zeroed system of size `n`
    pub fn zeros(n: usize) -> Self {
        Self {
            lower: vec![0.0; n],
            diag: vec![0.0; n],
            upper: vec![0.0; n],
            rhs: vec![0.0; n],
        }
    }

    /// Number of unknowns
    pub fn len(&self) -> usize {
        self.diag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diag.is_empty()
    }

    /// Solve the system, consuming the coefficients.
    ///
    /// Eliminates the super-diagonal from the bottom row upwards, then
    /// substitutes downwards. This is the elimination order the reference
    /// traces were produced with, so it is kept instead of the textbook
    /// forward-sweep Thomas algorithm.
    ///
    /// # Errors
    /// Returns `NumericalError` on a zero pivot or a non-finite solution.
    pub fn solve(mut self) -> Result<Vec<f64>> {
        let n = self.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        for i in (0..n - 1).rev() {
            let pivot = self.diag[i + 1];
            if pivot == 0.0 {
                return Err(UwgError::numerical("tridiagonal pivot", pivot));
            }
            self.rhs[i] -= self.upper[i] * self.rhs[i + 1] / pivot;
            self.diag[i] -= self.upper[i] * self.lower[i + 1] / pivot;
        }

        for i in 1..n {
            self.rhs[i] -= self.lower[i] * self.rhs[i - 1] / self.diag[i - 1];
        }

        let solution: Vec<f64> = self
            .rhs
            .iter()
            .zip(&self.diag)
            .map(|(c, d)| c / d)
            .collect();
        ensure_all_finite("tridiagonal solution", &solution)?;
        Ok(solution)
    }
}

/// Integrate the hydrostatic relation upwards from a surface pressure.
///
/// Works in the Poisson form so that potential temperature `theta` can be
/// used directly:
/// ```text
/// P_i^κ = P_{i-1}^κ - (g/cp) · P0^κ · ½(1/θ_i + 1/θ_{i-1}) · dz_i
/// ```
/// `theta` and the result have the same length; `dz[i]` is the spacing used
/// for the step into level `i`.
pub fn hydrostatic_pressure(
    surface_pressure: f64,
    theta: &[f64],
    dz: &[f64],
    constants: &PhysicalConstants,
) -> Vec<f64> {
    let kappa = constants.kappa();
    let reference = surface_pressure.powf(kappa);
    let mut pressure = vec![surface_pressure; theta.len()];
    for i in 1..theta.len() {
        pressure[i] = (pressure[i - 1].powf(kappa)
            - constants.g / constants.cp
                * reference
                * (1.0 / theta[i] + 1.0 / theta[i - 1])
                * 0.5
                * dz[i])
            .powf(1.0 / kappa);
    }
    pressure
}

/// Real (sensible) temperature from potential temperature referenced to `reference_pressure`
#[inline]
pub fn real_temperature(theta: f64, pressure: f64, reference_pressure: f64, kappa: f64) -> f64 {
    theta * (pressure / reference_pressure).powf(kappa)
}

/// Ideal-gas density
#[inline]
pub fn ideal_gas_density(pressure: f64, temperature: f64, gas_constant: f64) -> f64 {
    pressure / gas_constant / temperature
}

/// Density at cell faces from cell-centre density.
///
/// Interior faces are thickness-weighted between the two neighbouring cells;
/// the bottom and top faces repeat the adjacent cell value, so the result has
/// one more entry than `cell`.
pub fn staggered_density(cell: &[f64], dz: &[f64]) -> Vec<f64> {
    let n = cell.len();
    let mut faces = vec![cell.first().copied().unwrap_or_default(); n + 1];
    for i in 1..n {
        faces[i] = (cell[i] * dz[i - 1] + cell[i - 1] * dz[i]) / (dz[i - 1] + dz[i]);
    }
    if n > 0 {
        faces[n] = cell[n - 1];
    }
    faces
}

/// Thickness-weighted mean of `values` over the first `n` cells, normalised by
/// the height of the top face of cell `n - 1`.
pub fn layer_mean(values: &[f64], dz: &[f64], heights: &[f64], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let depth = heights[n - 1] + dz[n - 1] / 2.0;
    (0..n).fold(0.0, |acc, i| acc + values[i] * dz[i] / depth)
}

/// Raised-cosine ramp: 0 for `x <= 0`, 1 for `x >= 1`, smooth and monotonic between.
#[inline]
pub fn raised_cosine(x: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    0.5 * (1.0 - (std::f64::consts::PI * x).cos())
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Absolute value below which a number is treated as zero
pub const NEAR_ZERO: f64 = 1e-14;

#[inline]
pub fn is_near_zero(value: f64) -> bool {
    value.abs() < NEAR_ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tridiagonal_matches_direct_solution() {
        // [2 -1 0; -1 2 -1; 0 -1 2] x = [1 0 1] -> x = [1 1 1]
        let system = Tridiagonal {
            lower: vec![0.0, -1.0, -1.0],
            diag: vec![2.0, 2.0, 2.0],
            upper: vec![-1.0, -1.0, 0.0],
            rhs: vec![1.0, 0.0, 1.0],
        };
        let x = system.solve().unwrap();
        for v in x {
            assert_relative_eq!(v, 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_tridiagonal_dirichlet_rows() {
        // Identity rows pass values straight through
        let mut system = Tridiagonal::zeros(4);
        for i in 0..4 {
            system.diag[i] = 1.0;
            system.rhs[i] = i as f64 * 3.0;
        }
        assert_eq!(system.solve().unwrap(), vec![0.0, 3.0, 6.0, 9.0]);
    }

    #[test]
    fn test_tridiagonal_zero_pivot_is_error() {
        let mut system = Tridiagonal::zeros(2);
        system.upper[0] = 1.0;
        assert!(system.solve().is_err());
    }

    #[test]
    fn test_hydrostatic_pressure_decreases() {
        let constants = PhysicalConstants::default();
        let theta = vec![290.0; 10];
        let dz = vec![10.0; 10];
        let p = hydrostatic_pressure(100_000.0, &theta, &dz, &constants);
        assert_eq!(p[0], 100_000.0);
        for w in p.windows(2) {
            assert!(w[1] < w[0]);
        }
        // ~ rho g dz per 10 m step
        assert_relative_eq!(p[0] - p[1], 1.2 * 9.81 * 10.0, max_relative = 0.02);
    }

    #[test]
    fn test_staggered_density_lengths_and_bounds() {
        let cell = [1.2, 1.1, 1.0];
        let dz = [1.0, 2.0, 4.0];
        let faces = staggered_density(&cell, &dz);
        assert_eq!(faces.len(), 4);
        assert_eq!(faces[0], 1.2);
        assert_eq!(faces[3], 1.0);
        assert!(faces[1] < 1.2 && faces[1] > 1.1);
    }

    #[test]
    fn test_layer_mean_of_constant() {
        let dz = [1.0, 2.0, 3.0];
        let heights = [0.5, 2.0, 4.5];
        assert_relative_eq!(layer_mean(&[5.0; 3], &dz, &heights, 3), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_raised_cosine_endpoints() {
        assert_eq!(raised_cosine(-1.0), 0.0);
        assert_eq!(raised_cosine(0.0), 0.0);
        assert_relative_eq!(raised_cosine(0.5), 0.5, epsilon = 1e-15);
        assert_eq!(raised_cosine(1.0), 1.0);
        assert_eq!(raised_cosine(3.0), 1.0);
    }
}
