//! Vertical atmospheric column over a site
//!
//! [`VerticalColumn`] owns a stretched vertical grid, the hydrostatic
//! pressure, temperature and density profiles up to the reference height,
//! and the [`SurfaceElement`] of the site below it. The rural instance is
//! additionally advanced by turbulent diffusion every timestep and supplies
//! the reference temperature and wind profiles read by the urban boundary
//! layer.

pub mod diffusion;
pub mod grid;

pub use grid::{ColumnIndices, VerticalGrid};

use crate::config::{positive, GeoParams, GridSpec, SiteConfig};
use crate::core_types::{ClockSnapshot, Forcing, Kelvin, Meters, Pascals};
use crate::error::{ensure_all_finite, Result, UwgError};
use crate::numerics::{
    hydrostatic_pressure, ideal_gas_density, layer_mean, real_temperature, staggered_density,
};
use crate::solar::SolarGeometry;
use crate::surface::{
    BoundaryCondition, FluxDrivers, ReferenceAir, SurfaceConfig, SurfaceElement, SurfaceState,
};
use diffusion::SurfaceLayer;
use tracing::{debug, info};

/// Vertical column with its surface
#[derive(Debug, Clone)]
pub struct VerticalColumn {
    solar: SolarGeometry,
    grid: VerticalGrid,
    indices: ColumnIndices,
    /// Roughness length (m)
    roughness: f64,
    /// Displacement height (m)
    displacement: f64,
    /// Potential temperature (K)
    temperature: Vec<f64>,
    /// Sensible temperature (K)
    temperature_real: Vec<f64>,
    pressure: Vec<f64>,
    density_cell: Vec<f64>,
    density_face: Vec<f64>,
    wind: Vec<f64>,
    friction_velocity: f64,
    ubl_pressure: f64,
    surface: SurfaceElement,
}

impl VerticalColumn {
    /// Build the grid and the initial isothermal profiles.
    ///
    /// The roughness length is a tenth of `obstacle_height` and the
    /// displacement height half of it.
    ///
    /// # Errors
    /// `ConfigurationError` for an obstacle height that is not positive or
    /// whose roughness top reaches the lowest cell centre or the wind
    /// measurement height, a degenerate grid or marker heights the grid does
    /// not reach.
    pub fn new(
        site: &SiteConfig,
        obstacle_height: Meters,
        temperature: Kelvin,
        pressure: Pascals,
        geo: &GeoParams,
        grid: &GridSpec,
        surface: SurfaceConfig,
    ) -> Result<Self> {
        let grid = VerticalGrid::geometric(grid)?;
        let h = check_obstacle_height("obstacle_height", *obstacle_height, &grid, geo)?;
        let roughness = 0.1 * h;
        let displacement = 0.5 * h;
        let indices = ColumnIndices::locate(&grid, geo, roughness + displacement)?;
        let levels = indices.nzref + 1;
        if grid.len() <= levels {
            return Err(UwgError::configuration(
                "geo.ref_height",
                "reference height must lie below the top cell of the grid",
            ));
        }

        let mut column = Self {
            solar: SolarGeometry::from(site),
            grid,
            indices,
            roughness,
            displacement,
            temperature: vec![*temperature; levels],
            temperature_real: Vec::new(),
            pressure: Vec::new(),
            density_cell: Vec::new(),
            density_face: Vec::new(),
            wind: vec![1.0; levels],
            friction_velocity: 0.0,
            ubl_pressure: *pressure,
            surface: SurfaceElement::new(surface, temperature),
        };
        column.rebuild_profiles(*pressure, geo);

        info!(
            "Vertical column built: obstacle {}, nzref={}, nzfor={}, top {:.1}m",
            obstacle_height,
            column.indices.nzref,
            column.indices.nzfor,
            column.grid.top()
        );
        Ok(column)
    }

    /// Hydrostatic pressure, sensible temperature and densities from the
    /// current potential temperature and a surface pressure
    fn rebuild_profiles(&mut self, surface_pressure: f64, geo: &GeoParams) {
        let c = &geo.constants;
        let kappa = c.kappa();
        let levels = self.temperature.len();
        let dz = &self.grid.thickness()[..levels];

        self.pressure = hydrostatic_pressure(surface_pressure, &self.temperature, dz, c);
        self.temperature_real = self
            .temperature
            .iter()
            .zip(&self.pressure)
            .map(|(&theta, &p)| real_temperature(theta, p, surface_pressure, kappa))
            .collect();
        self.density_cell = self
            .pressure
            .iter()
            .zip(&self.temperature_real)
            .map(|(&p, &t)| ideal_gas_density(p, t, c.r))
            .collect();
        self.density_face = staggered_density(&self.density_cell, dz);
    }

    /// Advance the surface energy balance of this site by one timestep.
    ///
    /// Must run once per timestep, after the forcing is final and before the
    /// boundary layer reads the fluxes.
    ///
    /// # Errors
    /// `NumericalError` for a non-physical reference wind or non-finite fluxes.
    pub fn surface_flux(
        &mut self,
        forcing: &Forcing,
        geo: &GeoParams,
        clock: &ClockSnapshot,
        reference: &ReferenceAir,
        boundary: BoundaryCondition,
        internal_flux: f64,
    ) -> Result<&SurfaceState> {
        let sun = self.solar.position(clock);
        let received_solar = forcing.direct_normal * sun.cos_zenith.max(0.0) + forcing.diffuse_horizontal;
        let drivers = FluxDrivers {
            forcing,
            geo,
            month: clock.month,
            dt: clock.dt,
            received_solar,
            roughness: self.roughness,
            boundary,
            internal_flux,
        };
        self.surface.update(reference, &drivers)
    }

    /// Vertical diffusion step of the rural column.
    ///
    /// The lowest cell takes the forcing temperature, the profiles are rebuilt
    /// from the forcing pressure, potential temperature diffuses with a
    /// stability-dependent diffusivity driven by this site's sensible heat,
    /// and the log-law wind profile follows from the friction velocity.
    ///
    /// # Errors
    /// `NumericalError` when a profile becomes non-finite.
    pub fn diffuse(&mut self, forcing: &Forcing, geo: &GeoParams, clock: &ClockSnapshot) -> Result<()> {
        let c = &geo.constants;
        let nz = self.indices.nzref;
        let surface_pressure = *forcing.pressure;

        self.temperature[0] = *forcing.temperature;
        self.rebuild_profiles(surface_pressure, geo);

        let layer = SurfaceLayer {
            density: self.density_cell[0],
            theta: self.temperature[0],
            sensible_heat: self.surface.state().sensible,
            wind_speed: forcing.wind_speed,
            displacement: self.displacement,
            roughness: self.roughness,
        };
        let k = diffusion::diffusivity(
            &layer,
            self.grid.heights(),
            self.grid.thickness(),
            &self.temperature,
            nz,
            geo,
        )?;

        let mut theta = diffusion::implicit_diffusion(
            nz,
            clock.dt,
            &self.temperature,
            &self.density_cell,
            &self.density_face,
            &k.faces,
            self.grid.thickness(),
        )?;
        theta.push(theta[nz - 1]);
        ensure_all_finite("potential temperature profile", &theta)?;
        self.temperature = theta;

        self.friction_velocity = k.friction_velocity;
        self.wind = self.grid.heights()[..=nz]
            .iter()
            .map(|&z| self.friction_velocity / c.vk * ((z - self.displacement) / self.roughness).ln())
            .collect();
        ensure_all_finite("wind profile", &self.wind)?;

        self.ubl_pressure = layer_mean(
            &self.pressure,
            self.grid.thickness(),
            self.grid.heights(),
            self.indices.nzfor,
        );

        debug!(
            "Column diffused: u*={:.3}m/s, theta[nzref-1]={:.3}K, wind[nzref-1]={:.2}m/s",
            self.friction_velocity,
            self.temperature[nz - 1],
            self.wind[nz - 1]
        );
        Ok(())
    }

    /// Cell-centre heights of the whole grid (m)
    pub fn heights(&self) -> &[f64] {
        self.grid.heights()
    }

    /// Cell-centre heights covered by the profiles (`nzref + 1` levels)
    pub fn profile_heights(&self) -> &[f64] {
        &self.grid.heights()[..self.temperature.len()]
    }

    /// Cell thicknesses of the whole grid (m)
    pub fn thickness(&self) -> &[f64] {
        self.grid.thickness()
    }

    pub fn grid(&self) -> &VerticalGrid {
        &self.grid
    }

    pub fn indices(&self) -> ColumnIndices {
        self.indices
    }

    /// Pressure profile (Pa)
    pub fn pressure(&self) -> &[f64] {
        &self.pressure
    }

    /// Cell-centre density (kg/m³), `nzref + 1` entries
    pub fn density_cell(&self) -> &[f64] {
        &self.density_cell
    }

    /// Face density (kg/m³), `nzref + 2` entries
    pub fn density_face(&self) -> &[f64] {
        &self.density_face
    }

    /// Potential temperature profile (K)
    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    /// Sensible temperature profile (K)
    pub fn temperature_real(&self) -> &[f64] {
        &self.temperature_real
    }

    /// Wind speed profile (m/s)
    pub fn wind(&self) -> &[f64] {
        &self.wind
    }

    pub fn friction_velocity(&self) -> f64 {
        self.friction_velocity
    }

    /// Mean pressure of the nocturnal forcing layer (Pa)
    pub fn ubl_pressure(&self) -> f64 {
        self.ubl_pressure
    }

    pub fn roughness(&self) -> f64 {
        self.roughness
    }

    pub fn displacement(&self) -> f64 {
        self.displacement
    }

    pub fn surface(&self) -> &SurfaceElement {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut SurfaceElement {
        &mut self.surface
    }
}

/// Obstacle height whose displacement plus roughness length stays below
/// both the lowest cell centre and the wind measurement height, so the log
/// wind law is positive wherever the column evaluates it.
///
/// # Errors
/// `ConfigurationError` naming `parameter` otherwise.
pub(crate) fn check_obstacle_height(
    parameter: &'static str,
    height: f64,
    grid: &VerticalGrid,
    geo: &GeoParams,
) -> Result<f64> {
    let h = positive(parameter, height)?;
    let roughness_top = 0.6 * h;
    let lowest = grid.heights().first().copied().unwrap_or(0.0);
    if roughness_top >= lowest || roughness_top >= geo.wind_height {
        return Err(UwgError::configuration(
            parameter,
            format!(
                "{h}m puts displacement plus roughness at {roughness_top:.2}m, \
                 not below the lowest level ({lowest:.2}m) and wind height ({:.2}m)",
                geo.wind_height
            ),
        ));
    }
    Ok(h)
}
