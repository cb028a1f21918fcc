//! One-dimensional conduction through a layered slab
//!
//! Crank-Nicolson in time (implicit and explicit weights of one half),
//! harmonic-mean conductance between layer centres. The top layer receives
//! the external surface flux; the bottom layer either receives an interior
//! flux or is pinned to a fixed temperature.

use super::MaterialLayer;
use crate::error::Result;
use crate::numerics::Tridiagonal;
use serde::{Deserialize, Serialize};

const IMPLICIT_WEIGHT: f64 = 0.5;
const EXPLICIT_WEIGHT: f64 = 0.5;

/// Lower boundary of the slab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryCondition {
    /// Prescribed heat flux into the bottom layer (W/m²)
    Flux,
    /// Bottom layer held at a fixed temperature
    Temperature,
}

/// Advance layer temperatures by one timestep.
///
/// `top_flux` is the net external flux into the top layer (W/m²).
/// `bottom_value` is the interior flux for [`BoundaryCondition::Flux`] and
/// the pinned temperature (K) for [`BoundaryCondition::Temperature`].
///
/// # Errors
/// `NumericalError` when the linear solve breaks down.
pub(crate) fn conduct(
    layers: &[MaterialLayer],
    temperatures: &[f64],
    dt: f64,
    top_flux: f64,
    boundary: BoundaryCondition,
    bottom_value: f64,
) -> Result<Vec<f64>> {
    let n = temperatures.len();
    debug_assert_eq!(n, layers.len());
    if n == 1 {
        // A single layer has no interior conduction; both fluxes act directly
        let capacity = layers[0].heat_capacity_per_area();
        return Ok(match boundary {
            BoundaryCondition::Flux => vec![temperatures[0] + dt * (top_flux + bottom_value) / capacity],
            BoundaryCondition::Temperature => vec![bottom_value],
        });
    }

    let capacity: Vec<f64> = layers.iter().map(MaterialLayer::heat_capacity_per_area).collect();
    let mut conductance = vec![0.0; n];
    for j in 1..n {
        conductance[j] = 2.0 / (layers[j - 1].resistance() + layers[j].resistance());
    }

    let t = temperatures;
    let mut system = Tridiagonal::zeros(n);

    system.diag[0] = capacity[0] / dt + IMPLICIT_WEIGHT * conductance[1];
    system.upper[0] = -IMPLICIT_WEIGHT * conductance[1];
    system.rhs[0] =
        capacity[0] / dt * t[0] - EXPLICIT_WEIGHT * conductance[1] * (t[0] - t[1]) + top_flux;

    for j in 1..n - 1 {
        system.lower[j] = -IMPLICIT_WEIGHT * conductance[j];
        system.diag[j] = capacity[j] / dt + IMPLICIT_WEIGHT * (conductance[j] + conductance[j + 1]);
        system.upper[j] = -IMPLICIT_WEIGHT * conductance[j + 1];
        system.rhs[j] = capacity[j] / dt * t[j]
            + EXPLICIT_WEIGHT
                * (conductance[j] * (t[j - 1] - t[j]) + conductance[j + 1] * (t[j + 1] - t[j]));
    }

    let last = n - 1;
    match boundary {
        BoundaryCondition::Flux => {
            system.lower[last] = -IMPLICIT_WEIGHT * conductance[last];
            system.diag[last] = capacity[last] / dt + IMPLICIT_WEIGHT * conductance[last];
            system.rhs[last] = capacity[last] / dt * t[last]
                + EXPLICIT_WEIGHT * conductance[last] * (t[last - 1] - t[last])
                + bottom_value;
        }
        BoundaryCondition::Temperature => {
            system.diag[last] = 1.0;
            system.rhs[last] = bottom_value;
        }
    }

    system.solve()
}
