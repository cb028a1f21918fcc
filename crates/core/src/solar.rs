//! Solar geometry for a site
//!
//! Local solar time, solar zenith and the daylight window (sunrise/sunset in
//! solar hours). Used for the radiation received by horizontal surfaces and to
//! key the diurnal mixing-height schedule.
//!
//! # Scientific References
//!
//! - Cooper, P.I. (1969). "The absorption of radiation in solar stills."
//!   Solar Energy, 12(3), 333-346. (declination)
//! - Spencer, J.W. (1971). "Fourier series representation of the position of
//!   the sun." Search, 2(5), 172. (equation of time)

use crate::config::SiteConfig;
use crate::core_types::ClockSnapshot;
use std::f64::consts::PI;

/// Sun position at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunPosition {
    /// Local apparent solar time (hours, 0-24)
    pub solar_hour: f64,
    /// Cosine of the solar zenith angle (negative when the sun is down)
    pub cos_zenith: f64,
}

impl SunPosition {
    /// Solar elevation above the horizon (radians)
    pub fn elevation(&self) -> f64 {
        self.cos_zenith.clamp(-1.0, 1.0).asin()
    }

    pub fn is_up(&self) -> bool {
        self.cos_zenith > 0.0
    }
}

/// Sunrise and sunset in local solar hours
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaylightWindow {
    pub sunrise: f64,
    pub sunset: f64,
}

impl DaylightWindow {
    /// Day length in hours
    pub fn length(&self) -> f64 {
        self.sunset - self.sunrise
    }
}

/// Solar declination (radians), Cooper's formula
pub fn declination(day_of_year: u32) -> f64 {
    (23.45 * (2.0 * PI * (284.0 + f64::from(day_of_year)) / 365.0).sin()).to_radians()
}

/// Equation of time (minutes), Spencer's Fourier series
pub fn equation_of_time(day_of_year: u32) -> f64 {
    let b = 2.0 * PI * (f64::from(day_of_year) - 1.0) / 365.0;
    229.18
        * (0.000075 + 0.001868 * b.cos()
            - 0.032077 * b.sin()
            - 0.014615 * (2.0 * b).cos()
            - 0.04089 * (2.0 * b).sin())
}

/// Solar geometry calculator bound to one site
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarGeometry {
    latitude: f64,
    longitude: f64,
    gmt_offset: f64,
}

impl SolarGeometry {
    /// Latitude and longitude in degrees (east positive), GMT offset in hours
    pub fn new(latitude: f64, longitude: f64, gmt_offset: f64) -> Self {
        Self {
            latitude,
            longitude,
            gmt_offset,
        }
    }

    /// Local apparent solar time for a clock time (hours, wrapped to 0-24)
    pub fn solar_hour(&self, clock_hour: f64, day_of_year: u32) -> f64 {
        let longitude_correction = (self.longitude - 15.0 * self.gmt_offset) / 15.0;
        (clock_hour + longitude_correction + equation_of_time(day_of_year) / 60.0).rem_euclid(24.0)
    }

    /// Sun position for the given timestep
    pub fn position(&self, clock: &ClockSnapshot) -> SunPosition {
        let doy = clock.day_of_year();
        let solar_hour = self.solar_hour(clock.hour(), doy);
        let decl = declination(doy);
        let lat = self.latitude.to_radians();
        let hour_angle = (15.0 * (solar_hour - 12.0)).to_radians();
        let cos_zenith = lat.sin() * decl.sin() + lat.cos() * decl.cos() * hour_angle.cos();
        SunPosition {
            solar_hour,
            cos_zenith,
        }
    }

    /// Sunrise/sunset for the day of the timestep.
    ///
    /// Polar night collapses the window to solar noon; polar day spans the
    /// whole 24 hours.
    pub fn daylight(&self, day_of_year: u32) -> DaylightWindow {
        let lat = self.latitude.to_radians();
        let cos_omega = (-lat.tan() * declination(day_of_year).tan()).clamp(-1.0, 1.0);
        let half_day = cos_omega.acos().to_degrees() / 15.0;
        DaylightWindow {
            sunrise: 12.0 - half_day,
            sunset: 12.0 + half_day,
        }
    }
}

impl From<&SiteConfig> for SolarGeometry {
    fn from(site: &SiteConfig) -> Self {
        Self::new(site.latitude, site.longitude, site.gmt_offset)
    }
}
