//! Per-timestep meteorological forcing
//!
//! The weather-file reader is an external collaborator; the models only see a
//! [`Forcing`] record per timestep, obtained through a [`ForcingSource`].
//! Two sources ship with the crate: [`ForcingSeries`] replays recorded
//! records and [`DiurnalForcing`] synthesizes a clear-sky diurnal cycle.

use crate::config::SiteConfig;
use crate::core_types::clock::ClockSnapshot;
use crate::core_types::constants::PhysicalConstants;
use crate::core_types::units::{Kelvin, Pascals};
use crate::error::{ensure_finite, Result, UwgError};
use crate::solar::SolarGeometry;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Meteorological forcing for one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forcing {
    /// Dry-bulb air temperature
    pub temperature: Kelvin,
    /// Station pressure
    pub pressure: Pascals,
    /// Specific humidity (kg/kg)
    pub specific_humidity: f64,
    /// Wind speed at the measurement height (m/s)
    pub wind_speed: f64,
    /// Direction the wind blows from (degrees clockwise from north)
    pub wind_direction: f64,
    /// Direct normal irradiance (W/m²)
    pub direct_normal: f64,
    /// Diffuse horizontal irradiance (W/m²)
    pub diffuse_horizontal: f64,
    /// Downwelling longwave radiation (W/m²)
    pub infrared: f64,
    /// Precipitation rate (m/s of liquid water)
    pub precipitation: f64,
    /// Deep soil temperature used as the lower conduction boundary
    pub deep_temperature: Kelvin,
}

impl Forcing {
    /// Specific humidity from a relative humidity reading (percent).
    pub fn specific_humidity_from_relative(
        temperature: Kelvin,
        pressure: Pascals,
        relative_humidity: f64,
        constants: &PhysicalConstants,
    ) -> f64 {
        let vapor = relative_humidity / 100.0 * constants.saturation_vapor_pressure(*temperature);
        constants.specific_humidity(vapor, *pressure)
    }

    /// Total sunlight on a horizontal plane without the zenith projection
    /// (direct normal + diffuse), as used by the day/night test.
    #[inline]
    pub fn sunlight(&self) -> f64 {
        self.direct_normal + self.diffuse_horizontal
    }

    /// Reject records that would poison the time integration.
    ///
    /// # Errors
    /// `NumericalError` for non-finite values, a negative wind speed,
    /// negative radiation or a negative precipitation rate.
    pub fn check(&self) -> Result<()> {
        ensure_finite("forcing temperature", *self.temperature)?;
        ensure_finite("forcing pressure", *self.pressure)?;
        ensure_finite("forcing specific humidity", self.specific_humidity)?;
        ensure_finite("forcing wind direction", self.wind_direction)?;
        ensure_finite("forcing deep temperature", *self.deep_temperature)?;
        for (quantity, value) in [
            ("forcing wind speed", self.wind_speed),
            ("forcing direct normal irradiance", self.direct_normal),
            ("forcing diffuse irradiance", self.diffuse_horizontal),
            ("forcing infrared radiation", self.infrared),
            ("forcing precipitation", self.precipitation),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(UwgError::numerical(quantity, value));
            }
        }
        Ok(())
    }
}

/// Supplier of forcing records, one per timestep.
pub trait ForcingSource {
    /// Forcing for the timestep described by `clock`.
    ///
    /// # Errors
    /// Implementations return `ConfigurationError` when they cannot cover the
    /// requested timestep.
    fn forcing_at(&self, clock: &ClockSnapshot) -> Result<Forcing>;
}

/// Recorded forcing indexed by timestep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForcingSeries {
    records: Vec<Forcing>,
}

impl ForcingSeries {
    pub fn new(records: Vec<Forcing>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ForcingSource for ForcingSeries {
    fn forcing_at(&self, clock: &ClockSnapshot) -> Result<Forcing> {
        self.records.get(clock.timestep).copied().ok_or_else(|| {
            UwgError::configuration(
                "forcing",
                format!(
                    "series has {} records, timestep {} requested",
                    self.records.len(),
                    clock.timestep
                ),
            )
        })
    }
}

/// Synthetic clear-sky forcing with a sinusoidal temperature cycle.
///
/// Temperature peaks at `peak_hour` local clock time; irradiance follows the
/// solar zenith of the site. Everything else is held constant.
#[derive(Debug, Clone)]
pub struct DiurnalForcing {
    /// Daily mean air temperature
    pub mean_temperature: Kelvin,
    /// Half of the daily temperature range (K)
    pub amplitude: f64,
    /// Local clock hour of the temperature maximum
    pub peak_hour: f64,
    pub pressure: Pascals,
    /// Relative humidity (percent)
    pub relative_humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    /// Direct normal irradiance with the sun at zenith (W/m²)
    pub peak_direct_normal: f64,
    /// Diffuse horizontal irradiance with the sun at zenith (W/m²)
    pub peak_diffuse: f64,
    /// Effective emissivity of the clear sky
    pub sky_emissivity: f64,
    /// Precipitation rate (m/s)
    pub precipitation: f64,
    solar: SolarGeometry,
    constants: PhysicalConstants,
}

impl DiurnalForcing {
    /// Tropical maritime defaults for `site`
    pub fn new(site: &SiteConfig) -> Self {
        Self {
            mean_temperature: Kelvin::new(300.15),
            amplitude: 3.0,
            peak_hour: 15.0,
            pressure: Pascals::new(100_900.0),
            relative_humidity: 80.0,
            wind_speed: 2.5,
            wind_direction: 180.0,
            peak_direct_normal: 700.0,
            peak_diffuse: 150.0,
            sky_emissivity: 0.85,
            precipitation: 0.0,
            solar: SolarGeometry::from(site),
            constants: PhysicalConstants::default(),
        }
    }

    /// Air temperature at a local clock hour
    pub fn temperature_at_hour(&self, hour: f64) -> Kelvin {
        let phase = 2.0 * PI * (hour - self.peak_hour) / 24.0;
        Kelvin::new(*self.mean_temperature + self.amplitude * phase.cos())
    }
}

impl ForcingSource for DiurnalForcing {
    fn forcing_at(&self, clock: &ClockSnapshot) -> Result<Forcing> {
        let temperature = self.temperature_at_hour(clock.hour());
        let sun = self.solar.position(clock);
        let elevation_factor = sun.cos_zenith.max(0.0);

        Ok(Forcing {
            temperature,
            pressure: self.pressure,
            specific_humidity: Forcing::specific_humidity_from_relative(
                temperature,
                self.pressure,
                self.relative_humidity,
                &self.constants,
            ),
            wind_speed: self.wind_speed,
            wind_direction: self.wind_direction,
            direct_normal: self.peak_direct_normal * elevation_factor,
            diffuse_horizontal: self.peak_diffuse * elevation_factor,
            infrared: self.sky_emissivity * self.constants.sigma * temperature.powi(4),
            precipitation: self.precipitation,
            deep_temperature: self.mean_temperature,
        })
    }
}
