//! Aerodynamic (convective) conductance between a surface and the reference air
//!
//! # Scientific References
//!
//! - Jürges, W. (1924). "Der Wärmeübergang an einer ebenen Wand."
//! - Louis, J.F., Tiedtke, M., Geleyn, J.F. (1982). "A short history of the
//!   PBL parameterization at ECMWF."

use crate::core_types::PhysicalConstants;
use crate::error::{Result, UwgError};
use serde::{Deserialize, Serialize};

/// How the convective heat transfer coefficient is obtained
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ConductanceModel {
    /// Linear wind relation `h = 5.8 + 3.7 u` (W/m²K)
    #[default]
    Jurges,
    /// Neutral log-law exchange coefficient with a bulk-Richardson stability
    /// correction. `stability` scales the correction strength.
    LogLaw { stability: f64 },
}

/// Everything the conductance relations need for one evaluation
#[derive(Debug, Clone, Copy)]
pub struct ExchangeConditions {
    /// Reference wind speed (m/s)
    pub wind_speed: f64,
    /// Reference air temperature (K)
    pub air_temperature: f64,
    /// Surface temperature (K)
    pub surface_temperature: f64,
    /// Air density (kg/m³)
    pub air_density: f64,
    /// Roughness length for momentum (m)
    pub roughness: f64,
    /// Height of the wind reading (m)
    pub wind_height: f64,
    /// Height of the temperature reading (m)
    pub temperature_height: f64,
}

impl ConductanceModel {
    /// Convective heat transfer coefficient (W/m²K).
    ///
    /// # Errors
    /// `NumericalError` for a negative or non-finite wind speed, or when the
    /// resulting conductance is not finite and positive.
    pub fn conductance(
        &self,
        conditions: &ExchangeConditions,
        constants: &PhysicalConstants,
    ) -> Result<f64> {
        let u = conditions.wind_speed;
        if !u.is_finite() || u < 0.0 {
            return Err(UwgError::numerical("reference wind speed", u));
        }

        let h = match *self {
            ConductanceModel::Jurges => 5.8 + 3.7 * u,
            ConductanceModel::LogLaw { stability } => {
                let ch = exchange_coefficient(conditions, stability, constants);
                conditions.air_density * constants.cp * ch * u
            }
        };

        if h.is_finite() && h > 0.0 {
            Ok(h)
        } else {
            Err(UwgError::numerical("aerodynamic conductance", h))
        }
    }
}

/// Stability-corrected bulk exchange coefficient for heat
fn exchange_coefficient(
    conditions: &ExchangeConditions,
    stability: f64,
    constants: &PhysicalConstants,
) -> f64 {
    let z0 = conditions.roughness;
    let z0h = 0.1 * z0;
    let zu = conditions.wind_height;
    let zt = conditions.temperature_height;
    let ta = conditions.air_temperature;
    let u = conditions.wind_speed;

    let cd = (constants.vk / (zu / z0).ln()).powi(2);
    let ch = constants.vk.powi(2) / ((zu / z0).ln() * (zt / z0h).ln());

    // Calm air: no meaningful Richardson number, keep the neutral value
    if u <= 0.0 {
        return ch;
    }

    let rib = constants.g * (ta - conditions.surface_temperature) * zu.powi(2) / (zt * ta * u.powi(2));
    let correction = if rib > 0.0 {
        1.0 / (1.0 + 3.0 * stability * rib * (1.0 + stability * rib).sqrt())
    } else {
        1.0 - 3.0 * stability * rib / (1.0 + 3.0 * stability.powi(2) * cd * (-rib * zu / z0).sqrt())
    };
    ch * correction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions(wind_speed: f64, surface_temperature: f64) -> ExchangeConditions {
        ExchangeConditions {
            wind_speed,
            air_temperature: 298.0,
            surface_temperature,
            air_density: 1.18,
            roughness: 0.01,
            wind_height: 10.0,
            temperature_height: 2.0,
        }
    }

    #[test]
    fn test_jurges_relation() {
        let c = PhysicalConstants::default();
        let h = ConductanceModel::Jurges
            .conductance(&conditions(2.0, 300.0), &c)
            .unwrap();
        assert!((h - 13.2).abs() < 1e-12);
    }

    #[test]
    fn test_negative_wind_is_error() {
        let c = PhysicalConstants::default();
        let err = ConductanceModel::Jurges
            .conductance(&conditions(-1.0, 300.0), &c)
            .unwrap_err();
        assert!(!err.is_configuration());
        assert!(err.to_string().contains("wind"));
    }

    #[test]
    fn test_log_law_stability_ordering() {
        let c = PhysicalConstants::default();
        let model = ConductanceModel::LogLaw { stability: 5.0 };
        let unstable = model.conductance(&conditions(3.0, 310.0), &c).unwrap();
        let neutral = model.conductance(&conditions(3.0, 298.0), &c).unwrap();
        let stable = model.conductance(&conditions(3.0, 290.0), &c).unwrap();
        assert!(unstable > neutral);
        assert!(neutral > stable);
    }

    #[test]
    fn test_log_law_calm_air_is_error() {
        let c = PhysicalConstants::default();
        let model = ConductanceModel::LogLaw { stability: 5.0 };
        assert!(model.conductance(&conditions(0.0, 298.0), &c).is_err());
    }
}
