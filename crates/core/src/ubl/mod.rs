//! Urban boundary layer
//!
//! A well-mixed layer over the city, split into segments along the wind.
//! During the day the whole layer is one box heated by the urban surface and
//! ventilated either by the wind (forced) or by the thermally driven urban
//! circulation (convective). At night the shallow layer is advected segment
//! by segment, each segment relaxing toward the one upwind of it.
//!
//! # Scientific References
//!
//! - Bueno, B., Norford, L., Hidalgo, J., Pigeon, G. (2013). "The urban weather
//!   generator." Journal of Building Performance Simulation, 6(4), 269-281.

pub mod geometry;
pub mod mixing_height;

pub use geometry::{FootprintGeometry, UrbanFootprint, Vec2};
pub use mixing_height::MixingHeightSchedule;

use crate::column::VerticalColumn;
use crate::config::{GeoParams, SiteConfig};
use crate::core_types::{ClockSnapshot, Forcing, Kelvin, KelvinDelta};
use crate::error::{ensure_all_finite, ensure_finite, Result, UwgError};
use crate::numerics::{is_near_zero, layer_mean};
use crate::solar::SolarGeometry;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Advection enhancement applied to every ventilation coefficient
const ADVECTION_FACTOR: f64 = 1.4;

/// Heat the urban surface hands to the boundary layer for one timestep
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UrbanSurfaceFluxes {
    /// Urban sensible heat flux at canopy level (W/m²)
    pub sensible_heat: f64,
    /// Heat flux released into the boundary layer (W/m²)
    pub ubl_heat: f64,
}

/// Which balance advanced the layer on the last timestep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    /// Daytime, ventilated by the ambient wind
    Forced,
    /// Daytime, ventilated by the urban circulation
    Convective,
    /// Nighttime segment-by-segment advection
    Night,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Regime::Forced => "forced",
            Regime::Convective => "convective",
            Regime::Night => "night",
        })
    }
}

#[derive(Debug, Clone)]
pub struct UrbanBoundaryLayer {
    geometry: FootprintGeometry,
    schedule: MixingHeightSchedule,
    solar: SolarGeometry,
    /// Bulk temperature (K)
    temperature: f64,
    /// Absolute temperature of each along-wind segment (K), upwind first
    segment_temperatures: Vec<f64>,
    /// Mixing height used on the last timestep (m)
    mixing_height: f64,
    regime: Regime,
    /// Urban sensible heat of the last timestep (W/m²)
    sensible_heat: f64,
}

impl UrbanBoundaryLayer {
    /// Solve the footprint geometry and seed every segment with `initial_temperature`.
    ///
    /// # Errors
    /// `ConfigurationError` for an impossible footprint or segment width.
    pub fn new(
        footprint: &UrbanFootprint,
        wind_direction: f64,
        initial_temperature: Kelvin,
        geo: &GeoParams,
        site: &SiteConfig,
    ) -> Result<Self> {
        let geometry = FootprintGeometry::solve(footprint, wind_direction, geo.max_dx)?;
        let schedule = MixingHeightSchedule::from_geo(geo);

        info!(
            "Urban boundary layer: {:.0}m x {:.0}m, {} segments of {:.1}m",
            geometry.orthogonal_length,
            geometry.parallel_length,
            geometry.segment_count,
            geometry.segment_length
        );

        Ok(Self {
            segment_temperatures: vec![*initial_temperature; geometry.segment_count],
            geometry,
            schedule,
            solar: SolarGeometry::from(site),
            temperature: *initial_temperature,
            mixing_height: schedule.night,
            regime: Regime::Night,
            sensible_heat: 0.0,
        })
    }

    /// Advance the layer by one timestep.
    ///
    /// Reads this timestep's rural column (profiles and surface fluxes) and
    /// urban heat release; both must already be updated for the timestep.
    ///
    /// # Errors
    /// `NumericalError` when an updated temperature is not finite or not
    /// above absolute zero. The layer then keeps its previous temperatures.
    pub fn advance(
        &mut self,
        clock: &ClockSnapshot,
        rural: &VerticalColumn,
        urban: &UrbanSurfaceFluxes,
        forcing: &Forcing,
        geo: &GeoParams,
    ) -> Result<()> {
        let c = &geo.constants;
        let nzref = rural.indices().nzref;
        let dz = rural.thickness();

        self.sensible_heat = urban.sensible_heat;
        let heat_excess = (urban.sensible_heat - rural.surface().state().sensible).max(0.0);
        let wind = forcing.wind_speed.max(geo.wind_min);
        let reference_density = layer_mean(rural.density_cell(), dz, rural.heights(), nzref);

        let sun = self.solar.position(clock);
        let window = self.solar.daylight(clock.day_of_year());
        self.mixing_height = self.schedule.height(sun.solar_hour, &window);
        let h = self.mixing_height;

        let surface_heating = urban.ubl_heat * clock.dt / (h * reference_density * c.cp);
        let previous = (self.temperature, self.segment_temperatures.clone());

        if Self::is_day(sun.solar_hour, forcing, urban, geo) {
            let eq_temperature = rural.temperature()[nzref - 1];
            let eq_wind = rural.wind()[nzref - 1];
            let circulation = geo.circ_coeff
                * (c.g * heat_excess / c.cp / reference_density / eq_temperature * h).cbrt();

            let ventilation = if wind > circulation {
                self.regime = Regime::Forced;
                self.geometry.orthogonal_length * eq_wind * clock.dt / self.geometry.area * ADVECTION_FACTOR
            } else {
                self.regime = Regime::Convective;
                self.geometry.perimeter * circulation * clock.dt / self.geometry.area * ADVECTION_FACTOR
            };

            self.temperature =
                (surface_heating + ventilation * eq_temperature + self.temperature) / (1.0 + ventilation);
            self.segment_temperatures.fill(self.temperature);
        } else {
            self.regime = Regime::Night;
            self.advect_night(rural, clock.dt, h, surface_heating);
        }

        if let Err(e) = self.check_physical() {
            (self.temperature, self.segment_temperatures) = previous;
            return Err(e);
        }

        debug!(
            "UBL {:?}: T={:.3}K, h={:.0}m, excess heat {:.1}W/m²",
            self.regime, self.temperature, h, heat_excess
        );
        Ok(())
    }

    /// Daytime when the sun is strong enough for the time of day, or the city
    /// itself releases enough heat.
    ///
    /// Morning and afternoon split at solar noon, on the same solar hour that
    /// drives the mixing-height schedule.
    fn is_day(solar_hour: f64, forcing: &Forcing, urban: &UrbanSurfaceFluxes, geo: &GeoParams) -> bool {
        const NOON: f64 = 12.0;
        let hour = solar_hour;
        let sunlight = forcing.sunlight();
        let morning = hour < NOON || is_near_zero(hour - NOON);
        (sunlight > geo.day_threshold && morning)
            || (sunlight > geo.night_threshold && hour > NOON)
            || urban.sensible_heat > geo.urban_heat_day_threshold
    }

    fn check_physical(&self) -> Result<()> {
        ensure_finite("urban boundary layer temperature", self.temperature)?;
        ensure_all_finite("urban boundary layer segment temperature", &self.segment_temperatures)?;
        match std::iter::once(&self.temperature)
            .chain(&self.segment_temperatures)
            .find(|&&t| t <= 0.0)
        {
            Some(&t) => Err(UwgError::numerical("urban boundary layer temperature", t)),
            None => Ok(()),
        }
    }

    /// Upwind implicit advection through the nocturnal forcing layer
    fn advect_night(&mut self, rural: &VerticalColumn, dt: f64, h: f64, surface_heating: f64) {
        let nzfor = rural.indices().nzfor;
        let dz = rural.thickness();
        let wind = rural.wind();
        let theta = rural.temperature();

        let (heat_flux, mass_flux) = (0..nzfor).fold((0.0, 0.0), |(heat, mass), iz| {
            (heat + wind[iz] * theta[iz] * dz[iz], mass + wind[iz] * dz[iz])
        });
        let scale = ADVECTION_FACTOR * dt / self.geometry.segment_length / h;
        let inflow = scale * heat_flux;
        let ventilation = scale * mass_flux;

        let segments = &mut self.segment_temperatures;
        segments[0] = (surface_heating + inflow + segments[0]) / (1.0 + ventilation);
        for i in 1..segments.len() {
            segments[i] = (surface_heating + ventilation * segments[i - 1] + segments[i]) / (1.0 + ventilation);
        }
        self.temperature = self.segment_sum() / self.geometry.parallel_length * self.geometry.segment_length;
    }

    /// Bulk temperature (K)
    pub fn temperature(&self) -> Kelvin {
        Kelvin::new(self.temperature)
    }

    /// Segment temperatures (K), upwind first
    pub fn segment_temperatures(&self) -> &[f64] {
        &self.segment_temperatures
    }

    /// Sum of the segment temperatures
    pub fn segment_sum(&self) -> f64 {
        self.segment_temperatures.iter().sum()
    }

    /// Bulk temperature minus `reference`
    pub fn urban_excess(&self, reference: Kelvin) -> KelvinDelta {
        KelvinDelta::new(self.temperature - *reference)
    }

    pub fn geometry(&self) -> &FootprintGeometry {
        &self.geometry
    }

    /// Configured daytime mixing height (m)
    pub fn day_height(&self) -> f64 {
        self.schedule.day
    }

    /// Configured nighttime mixing height (m)
    pub fn night_height(&self) -> f64 {
        self.schedule.night
    }

    /// Mixing height used on the last timestep (m)
    pub fn mixing_height(&self) -> f64 {
        self.mixing_height
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    /// Urban sensible heat of the last timestep (W/m²)
    pub fn sensible_heat(&self) -> f64 {
        self.sensible_heat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridSpec;
    use crate::core_types::{DiurnalForcing, ForcingSource, Meters, Pascals};
    use crate::surface::SurfaceConfig;
    use approx::assert_relative_eq;

    fn rural() -> VerticalColumn {
        VerticalColumn::new(
            &SiteConfig::default(),
            Meters::new(0.1),
            Kelvin::new(297.85),
            Pascals::new(100_900.0),
            &GeoParams::default(),
            &GridSpec::default(),
            SurfaceConfig::rural(),
        )
        .unwrap()
    }

    fn ubl() -> UrbanBoundaryLayer {
        UrbanBoundaryLayer::new(
            &UrbanFootprint::square(1000.0),
            0.0,
            Kelvin::new(297.85),
            &GeoParams::default(),
            &SiteConfig::default(),
        )
        .unwrap()
    }

    fn clock_at(hour: f64) -> ClockSnapshot {
        ClockSnapshot {
            month: 1,
            day: 1,
            sec_day: hour * 3600.0,
            timestep: 0,
            dt: 300.0,
            elapsed: 0.0,
        }
    }

    #[test]
    fn test_initial_state() {
        let layer = ubl();
        assert_eq!(*layer.temperature(), 297.85);
        assert_eq!(layer.segment_temperatures().len(), 4);
        assert_relative_eq!(layer.segment_sum(), 1191.4, epsilon = 1e-9);
        assert_eq!(layer.day_height(), 1000.0);
        assert_eq!(layer.night_height(), 80.0);
    }

    #[test]
    fn test_night_heating_warms_downwind_segments_most() {
        let geo = GeoParams::default();
        let column = rural();
        let clock = clock_at(1.0);
        let forcing = DiurnalForcing::new(&SiteConfig::default())
            .forcing_at(&clock)
            .unwrap();
        let urban = UrbanSurfaceFluxes {
            sensible_heat: 20.0,
            ubl_heat: 20.0,
        };
        let mut layer = ubl();
        for _ in 0..50 {
            layer.advance(&clock, &column, &urban, &forcing, &geo).unwrap();
        }
        assert_eq!(layer.regime(), Regime::Night);
        assert_eq!(layer.mixing_height(), 80.0);
        let seg = layer.segment_temperatures();
        for w in seg.windows(2) {
            assert!(w[1] > w[0]);
        }
        // Isothermal rural column: the excess over it is positive
        assert!(layer.urban_excess(Kelvin::new(297.85)).value() > 0.0);
        assert_relative_eq!(*layer.temperature(), layer.segment_sum() / 4.0, max_relative = 1e-12);
    }

    #[test]
    fn test_no_heat_relaxes_to_rural_reference() {
        let geo = GeoParams::default();
        let column = rural();
        let clock = clock_at(1.0);
        let forcing = DiurnalForcing::new(&SiteConfig::default())
            .forcing_at(&clock)
            .unwrap();
        let mut layer = UrbanBoundaryLayer::new(
            &UrbanFootprint::square(1000.0),
            0.0,
            Kelvin::new(300.0),
            &geo,
            &SiteConfig::default(),
        )
        .unwrap();
        for _ in 0..500 {
            layer
                .advance(&clock, &column, &UrbanSurfaceFluxes::default(), &forcing, &geo)
                .unwrap();
        }
        assert_relative_eq!(*layer.temperature(), 297.85, epsilon = 1e-6);
    }

    #[test]
    fn test_cooling_below_absolute_zero_is_rejected() {
        let geo = GeoParams::default();
        let column = rural();
        let clock = clock_at(1.0);
        let forcing = DiurnalForcing::new(&SiteConfig::default())
            .forcing_at(&clock)
            .unwrap();
        let sink = UrbanSurfaceFluxes {
            sensible_heat: 0.0,
            ubl_heat: -1.0e9,
        };
        let mut layer = ubl();
        let err = layer.advance(&clock, &column, &sink, &forcing, &geo).unwrap_err();
        assert!(matches!(err, UwgError::Numerical { .. }));
        // The last valid state survives the failed step
        assert_eq!(*layer.temperature(), 297.85);
        assert!(layer.segment_temperatures().iter().all(|&t| t == 297.85));
    }

    #[test]
    fn test_morning_and_afternoon_split_at_solar_noon() {
        // Solar time runs about 1.1 h behind the clock at the default site
        let geo = GeoParams::default();
        let column = rural();
        let source = DiurnalForcing::new(&SiteConfig::default());
        let hazy = |clock: &ClockSnapshot| {
            let mut forcing = source.forcing_at(clock).unwrap();
            forcing.direct_normal = 0.0;
            forcing.diffuse_horizontal = 100.0;
            forcing
        };
        let cases = [(12.5, Regime::Night), (13.5, Regime::Forced)];
        for (hour, regime) in cases {
            let clock = clock_at(hour);
            let forcing = hazy(&clock);
            let mut layer = ubl();
            layer
                .advance(&clock, &column, &UrbanSurfaceFluxes::default(), &forcing, &geo)
                .unwrap();
            assert_eq!(layer.regime(), regime, "clock hour {hour}");
        }
    }

    #[test]
    fn test_strong_urban_heat_forces_daytime_regime() {
        let geo = GeoParams::default();
        let column = rural();
        let clock = clock_at(1.0);
        let forcing = DiurnalForcing::new(&SiteConfig::default())
            .forcing_at(&clock)
            .unwrap();
        let urban = UrbanSurfaceFluxes {
            sensible_heat: 200.0,
            ubl_heat: 200.0,
        };
        let mut layer = ubl();
        layer.advance(&clock, &column, &urban, &forcing, &geo).unwrap();
        assert_ne!(layer.regime(), Regime::Night);
        let seg = layer.segment_temperatures();
        assert!(seg.iter().all(|&t| t == seg[0]));
        assert!(*layer.temperature() > 297.85);
    }
}
