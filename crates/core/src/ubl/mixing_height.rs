//! Diurnal mixing-height schedule
//!
//! The mixing height sits at its nighttime value until sunrise, rises along a
//! raised-cosine ramp of width `transition_hours` to the daytime value, and
//! falls back along the mirrored ramp ending at sunset. Both ramps have zero
//! slope at their ends, so the height is continuous and smooth, and it never
//! leaves `[night, day]`.

use crate::config::GeoParams;
use crate::numerics::{lerp, raised_cosine};
use crate::solar::DaylightWindow;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixingHeightSchedule {
    /// Daytime mixing height (m)
    pub day: f64,
    /// Nighttime mixing height (m)
    pub night: f64,
    /// Width of the sunrise and sunset ramps (hours)
    pub transition_hours: f64,
}

impl MixingHeightSchedule {
    pub fn from_geo(geo: &GeoParams) -> Self {
        Self {
            day: geo.day_bl_height,
            night: geo.night_bl_height,
            transition_hours: geo.transition_hours,
        }
    }

    /// Fraction of the way from night to day height at `solar_hour`
    pub fn daytime_fraction(&self, solar_hour: f64, window: &DaylightWindow) -> f64 {
        let rise = raised_cosine((solar_hour - window.sunrise) / self.transition_hours);
        let set = raised_cosine((window.sunset - solar_hour) / self.transition_hours);
        rise.min(set)
    }

    /// Mixing height (m) at `solar_hour`
    pub fn height(&self, solar_hour: f64, window: &DaylightWindow) -> f64 {
        lerp(self.night, self.day, self.daytime_fraction(solar_hour, window))
    }
}
