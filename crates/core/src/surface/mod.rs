//! Surface energy balance of a site
//!
//! A [`SurfaceElement`] is a layered slab exposed to the atmosphere. Each
//! timestep it balances absorbed solar, net longwave, sensible and latent
//! exchange with the reference air, then conducts the net flux into the slab.
//! Horizontal surfaces additionally carry a water film and a vegetated
//! fraction that partitions part of the absorbed solar into latent and
//! sensible heat during the growing season.

pub mod conductance;
pub mod conduction;

pub use conductance::{ConductanceModel, ExchangeConditions};
pub use conduction::BoundaryCondition;

use crate::config::{positive, GeoParams};
use crate::core_types::{Forcing, Kelvin};
use crate::error::{ensure_finite, Result, UwgError};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One homogeneous layer of a slab
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialLayer {
    /// Layer thickness (m)
    pub thickness: f64,
    /// Thermal conductivity (W/m·K)
    pub conductivity: f64,
    /// Volumetric heat capacity (J/m³·K)
    pub volumetric_heat_capacity: f64,
}

impl MaterialLayer {
    /// Heat capacity per unit surface area (J/m²·K)
    #[inline]
    pub fn heat_capacity_per_area(&self) -> f64 {
        self.volumetric_heat_capacity * self.thickness
    }

    /// Thermal resistance of the layer (m²K/W)
    #[inline]
    pub fn resistance(&self) -> f64 {
        self.thickness / self.conductivity
    }
}

/// Vegetation type covering part of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VegetationKind {
    #[default]
    Grass,
    Tree,
}

/// Static description of a surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub albedo: f64,
    pub emissivity: f64,
    /// Fraction of the surface covered by vegetation
    pub vegetation_coverage: f64,
    pub vegetation: VegetationKind,
    /// Layers from the exposed face downwards
    pub layers: Vec<MaterialLayer>,
    /// Initial slab temperature; the column's initial air temperature when absent
    pub initial_temperature: Option<Kelvin>,
    /// Horizontal surfaces hold a water film and vegetation
    pub horizontal: bool,
    pub conductance: ConductanceModel,
}

impl SurfaceConfig {
    /// Ten 5 cm asphalt layers
    fn road_layers() -> Vec<MaterialLayer> {
        vec![
            MaterialLayer {
                thickness: 0.05,
                conductivity: 1.0,
                volumetric_heat_capacity: 1.6e6,
            };
            10
        ]
    }

    /// Mostly vegetated ground around a weather station
    pub fn rural() -> Self {
        Self {
            albedo: 0.1,
            emissivity: 0.95,
            vegetation_coverage: 0.9,
            vegetation: VegetationKind::Grass,
            layers: Self::road_layers(),
            initial_temperature: None,
            horizontal: true,
            conductance: ConductanceModel::Jurges,
        }
    }

    /// Urban road with sparse vegetation
    pub fn urban_road() -> Self {
        Self {
            vegetation_coverage: 0.2,
            ..Self::rural()
        }
    }

    /// # Errors
    /// `ConfigurationError` naming `prefix` for out-of-range optical
    /// properties or an empty or non-physical layer stack.
    pub fn validate(&self, prefix: &'static str) -> Result<()> {
        for value in [self.albedo, self.emissivity, self.vegetation_coverage] {
            if !(0.0..=1.0).contains(&value) {
                return Err(UwgError::configuration(
                    prefix,
                    format!("albedo, emissivity and vegetation coverage must lie in 0-1, got {value}"),
                ));
            }
        }
        if self.layers.is_empty() {
            return Err(UwgError::configuration(prefix, "surface needs at least one layer"));
        }
        for layer in &self.layers {
            positive(prefix, layer.thickness)?;
            positive(prefix, layer.conductivity)?;
            positive(prefix, layer.volumetric_heat_capacity)?;
        }
        if let ConductanceModel::LogLaw { stability } = self.conductance {
            if !stability.is_finite() || stability < 0.0 {
                return Err(UwgError::configuration(prefix, "log-law stability factor must be non-negative"));
            }
        }
        Ok(())
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self::rural()
    }
}

/// Air the surface exchanges heat and moisture with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceAir {
    /// Specific humidity (kg/kg)
    pub humidity: f64,
    pub temperature: Kelvin,
    /// Wind speed (m/s)
    pub wind_speed: f64,
}

/// Published surface state, rewritten by every flux update
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceState {
    /// Convective heat transfer coefficient (W/m²K)
    pub aero_conductance: f64,
    /// Water film thickness (m)
    pub water_storage: f64,
    /// Absorbed solar (W/m²)
    pub solar_absorbed: f64,
    /// Latent heat flux (W/m²)
    pub latent: f64,
    /// Sensible heat flux (W/m²)
    pub sensible: f64,
    /// Net longwave (W/m²)
    pub infrared: f64,
    /// Net flux into the slab at the exposed face (W/m²)
    pub net_flux: f64,
    /// Exposed-face temperature (K)
    pub surface_temperature: f64,
    /// Bottom-layer temperature (K)
    pub interior_temperature: f64,
}

/// Inputs of one flux update besides the reference air
#[derive(Debug, Clone, Copy)]
pub struct FluxDrivers<'a> {
    pub forcing: &'a Forcing,
    pub geo: &'a GeoParams,
    pub month: u32,
    pub dt: f64,
    /// Solar received by the surface (W/m²)
    pub received_solar: f64,
    /// Roughness length of the site (m)
    pub roughness: f64,
    pub boundary: BoundaryCondition,
    /// Interior heat flux into the bottom layer (W/m²), used with [`BoundaryCondition::Flux`]
    pub internal_flux: f64,
}

/// Layered slab with its energy-balance state
#[derive(Debug, Clone)]
pub struct SurfaceElement {
    config: SurfaceConfig,
    layer_temperatures: Vec<f64>,
    state: SurfaceState,
}

impl SurfaceElement {
    pub fn new(config: SurfaceConfig, air_temperature: Kelvin) -> Self {
        let initial = *config.initial_temperature.unwrap_or(air_temperature);
        let layer_temperatures = vec![initial; config.layers.len()];
        let state = SurfaceState {
            surface_temperature: initial,
            interior_temperature: initial,
            ..SurfaceState::default()
        };
        Self {
            config,
            layer_temperatures,
            state,
        }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn state(&self) -> &SurfaceState {
        &self.state
    }

    pub fn layer_temperatures(&self) -> &[f64] {
        &self.layer_temperatures
    }

    /// Seed the water film, clamped to what the surface can hold
    pub fn set_water_storage(&mut self, depth: f64, geo: &GeoParams) {
        self.state.water_storage = depth.clamp(0.0, geo.wg_max);
    }

    /// Advance the energy balance and the slab by one timestep.
    ///
    /// # Errors
    /// `NumericalError` for a non-physical wind or any non-finite flux or
    /// layer temperature.
    pub fn update(&mut self, air: &ReferenceAir, drivers: &FluxDrivers<'_>) -> Result<&SurfaceState> {
        let geo = drivers.geo;
        let constants = &geo.constants;
        let forcing = drivers.forcing;
        let ts = self.layer_temperatures[0];
        let tref = *air.temperature;

        // Moist-air density (kg/m³)
        let density = *forcing.pressure / (1000.0 * 0.287_042 * tref * (1.0 + 1.607_858 * air.humidity));
        ensure_finite("air density", density)?;

        let h = self.config.conductance.conductance(
            &ExchangeConditions {
                wind_speed: air.wind_speed,
                air_temperature: tref,
                surface_temperature: ts,
                air_density: density,
                roughness: drivers.roughness,
                wind_height: geo.wind_height,
                temperature_height: geo.temp_height,
            },
            constants,
        )?;

        let solar = drivers.received_solar;
        let infrared = self.config.emissivity * (forcing.infrared - constants.sigma * ts.powi(4));
        let albedo = self.config.albedo;

        let (solar_absorbed, latent, vegetation_sensible, water_storage) = if self.config.horizontal {
            let storage = self.water_film(air, drivers, h, density)?;
            let film_latent = storage.evaporation * constants.water_density * constants.lv;

            if geo.is_growing_season(drivers.month) {
                let veg = self.config.vegetation_coverage;
                let latent_fraction = match self.config.vegetation {
                    VegetationKind::Grass => geo.grass_latent_fraction,
                    VegetationKind::Tree => geo.tree_latent_fraction,
                };
                let veg_absorbed = veg * (1.0 - geo.veg_albedo) * solar;
                (
                    (1.0 - veg) * (1.0 - albedo) * solar + veg_absorbed,
                    film_latent + latent_fraction * veg_absorbed,
                    (1.0 - latent_fraction) * veg_absorbed,
                    storage.depth,
                )
            } else {
                ((1.0 - albedo) * solar, film_latent, 0.0, storage.depth)
            }
        } else {
            ((1.0 - albedo) * solar, 0.0, 0.0, 0.0)
        };

        let sensible = vegetation_sensible + h * (ts - tref);
        let net_flux = -sensible + solar_absorbed + infrared - latent;
        ensure_finite("surface net flux", net_flux)?;

        let bottom_value = match drivers.boundary {
            BoundaryCondition::Flux => drivers.internal_flux,
            BoundaryCondition::Temperature => *forcing.deep_temperature,
        };
        let layers = conduction::conduct(
            &self.config.layers,
            &self.layer_temperatures,
            drivers.dt,
            net_flux,
            drivers.boundary,
            bottom_value,
        )?;

        self.layer_temperatures = layers;
        self.state = SurfaceState {
            aero_conductance: h,
            water_storage,
            solar_absorbed,
            latent,
            sensible,
            infrared,
            net_flux,
            surface_temperature: self.layer_temperatures[0],
            interior_temperature: self.layer_temperatures[self.layer_temperatures.len() - 1],
        };
        Ok(&self.state)
    }

    /// Evaporate from the water film and collect precipitation
    fn water_film(
        &self,
        air: &ReferenceAir,
        drivers: &FluxDrivers<'_>,
        conductance: f64,
        density: f64,
    ) -> Result<WaterFilm> {
        let geo = drivers.geo;
        let constants = &geo.constants;
        let dt = drivers.dt;
        let available = self.state.water_storage + dt * drivers.forcing.precipitation;
        if available <= 0.0 {
            return Ok(WaterFilm {
                evaporation: 0.0,
                depth: 0.0,
            });
        }

        let qsat = constants
            .saturation_specific_humidity(self.layer_temperatures[0], *drivers.forcing.pressure);
        let potential = conductance * constants.colburn * density * (qsat - air.humidity)
            / constants.water_density
            / constants.cp;
        let evaporation = ensure_finite("film evaporation", potential)?.min(available / dt);

        let unclamped = available - dt * evaporation;
        let depth = unclamped.clamp(0.0, geo.wg_max);
        if unclamped > geo.wg_max {
            warn!(
                "Water film {:.5}m exceeds capacity, {:.5}m runs off",
                unclamped,
                unclamped - geo.wg_max
            );
        }
        Ok(WaterFilm { evaporation, depth })
    }
}

/// Film evaporation rate (m/s) and the film depth left afterwards (m)
struct WaterFilm {
    evaporation: f64,
    depth: f64,
}
