//! Physical constants shared by the column, surface and boundary-layer models
//!
//! The values are the ones the reference traces were generated with; the dry-air
//! gas constant in particular is 287.0 (not 287.04) because the recorded
//! pressure and density profiles only close with that value.

use serde::{Deserialize, Serialize};

/// Stefan-Boltzmann constant (W/m²K⁴)
pub const STEFAN_BOLTZMANN: f64 = 5.67e-8;

/// Physical constants used by every model component.
///
/// Kept as a value type rather than module constants so a run can be
/// configured (and serialized) with an alternative set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalConstants {
    /// Gravitational acceleration (m/s²)
    pub g: f64,
    /// Specific heat of dry air at constant pressure (J/kg·K)
    pub cp: f64,
    /// Von Kármán constant
    pub vk: f64,
    /// Gas constant of dry air (J/kg·K)
    pub r: f64,
    /// Gas constant of water vapor (J/kg·K)
    pub rv: f64,
    /// Latent heat of evaporation (J/kg)
    pub lv: f64,
    /// Stefan-Boltzmann constant (W/m²K⁴)
    pub sigma: f64,
    /// Water density (kg/m³)
    pub water_density: f64,
    /// Latent heat of vaporization at the triple point (J/kg)
    pub lvtt: f64,
    /// Triple-point temperature (K)
    pub tt: f64,
    /// Saturation vapor pressure at the triple point (Pa)
    pub estt: f64,
    /// Heat capacity of liquid water (J/kg·K)
    pub cl: f64,
    /// Heat capacity of water vapor at constant pressure (J/kg·K)
    pub cpv: f64,
    /// Colburn analogy factor between heat and mass transfer
    pub colburn: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            g: 9.81,
            cp: 1004.0,
            vk: 0.4,
            r: 287.0,
            rv: 461.5,
            lv: 2.26e6,
            sigma: STEFAN_BOLTZMANN,
            water_density: 1000.0,
            lvtt: 2.5008e6,
            tt: 273.16,
            estt: 611.14,
            cl: 4.218e3,
            cpv: 1846.1,
            colburn: (0.713_f64 / 0.621).powf(2.0 / 3.0),
        }
    }
}

impl PhysicalConstants {
    /// Poisson exponent R/cp used by the potential-temperature relations
    #[inline]
    pub fn kappa(&self) -> f64 {
        self.r / self.cp
    }

    /// Saturation vapor pressure over water (Pa) at `temperature` (K).
    ///
    /// Integrated Clausius-Clapeyron form with temperature-dependent latent heat:
    /// ```text
    /// e_s = exp(α - β/T - γ ln T)
    /// ```
    pub fn saturation_vapor_pressure(&self, temperature: f64) -> f64 {
        let gamw = (self.cl - self.cpv) / self.rv;
        let betaw = self.lvtt / self.rv + gamw * self.tt;
        let alpw = self.estt.ln() + betaw / self.tt + gamw * self.tt.ln();
        (alpw - betaw / temperature - gamw * temperature.ln()).exp()
    }

    /// Saturation specific humidity (kg/kg) over water at `temperature` (K) and `pressure` (Pa)
    pub fn saturation_specific_humidity(&self, temperature: f64, pressure: f64) -> f64 {
        self.specific_humidity(self.saturation_vapor_pressure(temperature), pressure)
    }

    /// Specific humidity (kg/kg) for a vapor pressure `vapor_pressure` at `pressure` (both Pa)
    pub fn specific_humidity(&self, vapor_pressure: f64, pressure: f64) -> f64 {
        let epsilon = self.r / self.rv;
        let work = vapor_pressure / pressure;
        epsilon * work / (1.0 + (epsilon - 1.0) * work)
    }
}
