//! Urban heat released into the boundary layer
//!
//! The urban canyon and building energy models sit outside this crate. The
//! boundary layer only needs the heat they release each timestep, so they are
//! represented by the [`UrbanHeatSource`] trait. [`BuildingLoads`] is the
//! built-in source: the urban ground sensible flux plus a diurnal traffic and
//! equipment load and the waste heat rejected by air conditioning.

use crate::config::positive;
use crate::core_types::{ClockSnapshot, Forcing, Kelvin};
use crate::error::{ensure_finite, Result, UwgError};
use crate::surface::SurfaceState;
use crate::ubl::UrbanSurfaceFluxes;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Supplier of the urban heat release for one timestep
pub trait UrbanHeatSource: Send + Sync {
    /// Heat handed to the boundary layer, given this timestep's urban ground
    /// surface state.
    ///
    /// # Errors
    /// `NumericalError` when the resulting fluxes are not finite.
    fn fluxes(&self, clock: &ClockSnapshot, forcing: &Forcing, ground: &SurfaceState) -> Result<UrbanSurfaceFluxes>;
}

/// Diurnal anthropogenic and HVAC waste heat over the urban ground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingLoads {
    /// Nighttime minimum of traffic and equipment heat (W/m²)
    pub anthropogenic_base: f64,
    /// Daily maximum of traffic and equipment heat (W/m²)
    pub anthropogenic_peak: f64,
    /// Local clock hour of the maximum
    pub peak_hour: f64,
    /// Outdoor temperature above which cooling runs
    pub cooling_setpoint: Kelvin,
    /// Waste heat rejected per kelvin above the setpoint (W/m²K)
    pub waste_heat_per_kelvin: f64,
    /// Share of the sensible release that reaches the boundary layer
    pub ubl_fraction: f64,
}

impl Default for BuildingLoads {
    fn default() -> Self {
        Self {
            anthropogenic_base: 4.0,
            anthropogenic_peak: 12.0,
            peak_hour: 17.0,
            cooling_setpoint: Kelvin::new(297.15),
            waste_heat_per_kelvin: 1.5,
            ubl_fraction: 1.0,
        }
    }
}

impl BuildingLoads {
    /// Traffic and equipment heat (W/m²) at local clock `hour`
    pub fn anthropogenic_heat(&self, hour: f64) -> f64 {
        let phase = 0.5 * (1.0 + (TAU * (hour - self.peak_hour) / 24.0).cos());
        self.anthropogenic_base + (self.anthropogenic_peak - self.anthropogenic_base) * phase
    }

    /// Air-conditioning waste heat (W/m²) at outdoor temperature `outdoor`
    pub fn waste_heat(&self, outdoor: Kelvin) -> f64 {
        self.waste_heat_per_kelvin * (*outdoor - *self.cooling_setpoint).max(0.0)
    }

    /// # Errors
    /// `ConfigurationError` for negative loads, a peak below the base or a
    /// boundary-layer share outside `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !(self.anthropogenic_base.is_finite() && self.anthropogenic_base >= 0.0) {
            return Err(UwgError::configuration(
                "buildings.anthropogenic_base",
                "must be finite and non-negative",
            ));
        }
        if !(self.anthropogenic_peak.is_finite() && self.anthropogenic_peak >= self.anthropogenic_base) {
            return Err(UwgError::configuration(
                "buildings.anthropogenic_peak",
                format!(
                    "{} is below the base load {}",
                    self.anthropogenic_peak, self.anthropogenic_base
                ),
            ));
        }
        if !(0.0..24.0).contains(&self.peak_hour) {
            return Err(UwgError::configuration("buildings.peak_hour", "must be within 0-24"));
        }
        positive("buildings.cooling_setpoint", *self.cooling_setpoint)?;
        if !(self.waste_heat_per_kelvin.is_finite() && self.waste_heat_per_kelvin >= 0.0) {
            return Err(UwgError::configuration(
                "buildings.waste_heat_per_kelvin",
                "must be finite and non-negative",
            ));
        }
        let fraction = positive("buildings.ubl_fraction", self.ubl_fraction)?;
        if fraction > 1.0 {
            return Err(UwgError::configuration("buildings.ubl_fraction", "must not exceed 1"));
        }
        Ok(())
    }
}

impl UrbanHeatSource for BuildingLoads {
    fn fluxes(&self, clock: &ClockSnapshot, forcing: &Forcing, ground: &SurfaceState) -> Result<UrbanSurfaceFluxes> {
        let sensible_heat =
            ground.sensible + self.anthropogenic_heat(clock.hour()) + self.waste_heat(forcing.temperature);
        ensure_finite("urban sensible heat", sensible_heat)?;
        Ok(UrbanSurfaceFluxes {
            sensible_heat,
            ubl_heat: sensible_heat * self.ubl_fraction,
        })
    }
}
