//! Run configuration
//!
//! Explicit, serializable structs for everything the models read at
//! construction. Defaults reproduce the reference Singapore setup
//! (`initialize.uwg` of the legacy model).

use crate::column::{check_obstacle_height, VerticalGrid};
use crate::core_types::PhysicalConstants;
use crate::error::{Result, UwgError};
use crate::simulation::BuildingLoads;
use crate::surface::SurfaceConfig;
use crate::ubl::UrbanFootprint;
use serde::{Deserialize, Serialize};

/// Geographic location of the site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Latitude (degrees, north positive)
    pub latitude: f64,
    /// Longitude (degrees, east positive)
    pub longitude: f64,
    /// Offset of local clock time from GMT (hours)
    pub gmt_offset: f64,
}

impl Default for SiteConfig {
    /// Singapore Changi (IWEC 486980)
    fn default() -> Self {
        Self {
            latitude: 1.37,
            longitude: 103.98,
            gmt_offset: 8.0,
        }
    }
}

/// Vertical discretization of the atmospheric column.
///
/// Cell thicknesses grow geometrically from the ground: `dz_0 = first_thickness`,
/// `dz_i = dz_{i-1} · growth_ratio`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    /// Thickness of the lowest cell (m)
    pub first_thickness: f64,
    /// Ratio between consecutive cell thicknesses
    pub growth_ratio: f64,
    /// Number of cell faces, including the ground
    pub faces: usize,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            first_thickness: 4.0,
            growth_ratio: 1.1,
            faces: 56,
        }
    }
}

/// Boundary-layer and surface parameters shared by all components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoParams {
    /// Daytime urban mixing height (m)
    pub day_bl_height: f64,
    /// Nighttime urban mixing height (m)
    pub night_bl_height: f64,
    /// Reference (inversion) height of the rural column (m)
    pub ref_height: f64,
    /// Temperature measurement height (m)
    pub temp_height: f64,
    /// Wind measurement height (m)
    pub wind_height: f64,
    /// Circulation coefficient `k_w` for the convective urban circulation
    pub circ_coeff: f64,
    /// Sunlight above which the morning counts as day (W/m²)
    pub day_threshold: f64,
    /// Sunlight above which the afternoon still counts as day (W/m²)
    pub night_threshold: f64,
    /// Urban sensible heat above which the boundary layer is treated as daytime (W/m²)
    pub urban_heat_day_threshold: f64,
    /// Fraction of absorbed solar released as latent heat by trees
    pub tree_latent_fraction: f64,
    /// Fraction of absorbed solar released as latent heat by grass
    pub grass_latent_fraction: f64,
    /// Vegetation albedo
    pub veg_albedo: f64,
    /// First month of the growing season (1-12)
    pub veg_start: u32,
    /// Last month of the growing season (1-12)
    pub veg_end: u32,
    /// Minimum wind speed used by the boundary-layer model (m/s)
    pub wind_min: f64,
    /// Maximum water film thickness on horizontal surfaces (m)
    pub wg_max: f64,
    /// Maximum along-wind segment length of the urban boundary layer (m)
    pub max_dx: f64,
    /// Width of the sunrise/sunset mixing-height transition (hours)
    pub transition_hours: f64,
    pub constants: PhysicalConstants,
}

impl Default for GeoParams {
    fn default() -> Self {
        Self {
            day_bl_height: 1000.0,
            night_bl_height: 80.0,
            ref_height: 150.0,
            temp_height: 2.0,
            wind_height: 10.0,
            circ_coeff: 1.2,
            day_threshold: 150.0,
            night_threshold: 20.0,
            urban_heat_day_threshold: 150.0,
            tree_latent_fraction: 0.7,
            grass_latent_fraction: 0.5,
            veg_albedo: 0.25,
            veg_start: 4,
            veg_end: 10,
            wind_min: 1.0,
            wg_max: 0.005,
            max_dx: 250.0,
            transition_hours: 2.0,
            constants: PhysicalConstants::default(),
        }
    }
}

impl GeoParams {
    /// Whether `month` falls in the vegetation growing season
    pub fn is_growing_season(&self, month: u32) -> bool {
        if self.veg_start <= self.veg_end {
            (self.veg_start..=self.veg_end).contains(&month)
        } else {
            // Season wraps the new year (southern hemisphere)
            month >= self.veg_start || month <= self.veg_end
        }
    }

    /// # Errors
    /// Returns `ConfigurationError` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        positive("geo.day_bl_height", self.day_bl_height)?;
        positive("geo.night_bl_height", self.night_bl_height)?;
        if self.night_bl_height > self.day_bl_height {
            return Err(UwgError::configuration(
                "geo.night_bl_height",
                format!(
                    "nighttime mixing height {} exceeds daytime height {}",
                    self.night_bl_height, self.day_bl_height
                ),
            ));
        }
        positive("geo.ref_height", self.ref_height)?;
        positive("geo.wind_height", self.wind_height)?;
        positive("geo.max_dx", self.max_dx)?;
        positive("geo.wind_min", self.wind_min)?;
        positive("geo.transition_hours", self.transition_hours)?;
        if self.wg_max.is_nan() || self.wg_max < 0.0 {
            return Err(UwgError::configuration("geo.wg_max", "must be non-negative"));
        }
        if !(1..=12).contains(&self.veg_start) || !(1..=12).contains(&self.veg_end) {
            return Err(UwgError::configuration(
                "geo.veg_start",
                "growing season months must be within 1-12",
            ));
        }
        Ok(())
    }
}

/// Complete configuration of one coupled run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub site: SiteConfig,
    pub grid: GridSpec,
    pub geo: GeoParams,
    /// Average obstacle height around the rural station (m)
    pub rural_obstacle_height: f64,
    /// Effective obstacle height of the urban site (m)
    pub urban_obstacle_height: f64,
    pub rural_surface: SurfaceConfig,
    pub urban_surface: SurfaceConfig,
    pub footprint: UrbanFootprint,
    pub buildings: BuildingLoads,
    /// Start month (1-12)
    pub start_month: u32,
    /// Start day of month
    pub start_day: u32,
    /// Simulated days
    pub n_days: u32,
    /// Timestep (s)
    pub dt: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            grid: GridSpec::default(),
            geo: GeoParams::default(),
            rural_obstacle_height: 0.1,
            urban_obstacle_height: 1.0,
            rural_surface: SurfaceConfig::rural(),
            urban_surface: SurfaceConfig::urban_road(),
            footprint: UrbanFootprint::square(1000.0),
            buildings: BuildingLoads::default(),
            start_month: 1,
            start_day: 1,
            n_days: 1,
            dt: 300.0,
        }
    }
}

impl ModelConfig {
    /// Check every static parameter before any component is built.
    ///
    /// # Errors
    /// Returns `ConfigurationError` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.site.latitude) {
            return Err(UwgError::configuration(
                "site.latitude",
                format!("{} is outside -90..90", self.site.latitude),
            ));
        }
        if !(-180.0..=180.0).contains(&self.site.longitude) {
            return Err(UwgError::configuration(
                "site.longitude",
                format!("{} is outside -180..180", self.site.longitude),
            ));
        }
        self.geo.validate()?;
        let grid = VerticalGrid::geometric(&self.grid)?;
        check_obstacle_height("rural_obstacle_height", self.rural_obstacle_height, &grid, &self.geo)?;
        check_obstacle_height("urban_obstacle_height", self.urban_obstacle_height, &grid, &self.geo)?;
        self.rural_surface.validate("rural_surface")?;
        self.urban_surface.validate("urban_surface")?;
        self.footprint.validate()?;
        self.buildings.validate()?;
        if !(1..=12).contains(&self.start_month) {
            return Err(UwgError::configuration("start_month", "must be within 1-12"));
        }
        if !(1..=31).contains(&self.start_day) {
            return Err(UwgError::configuration("start_day", "must be within 1-31"));
        }
        if self.n_days == 0 {
            return Err(UwgError::configuration("n_days", "must be at least one day"));
        }
        positive("dt", self.dt)?;
        Ok(())
    }
}

/// Require a finite, strictly positive value
pub(crate) fn positive(parameter: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(UwgError::configuration(
            parameter,
            format!("must be positive, got {value}"),
        ))
    }
}
