//! Coupled rural/urban simulation
//!
//! `UrbanClimateModel` drives the rural column, the urban column and the
//! urban boundary layer in lockstep from one forcing record per timestep.
//! The rural site is the reference: its surface fluxes and diffused profiles
//! are final before the urban side reads them, and the clock only advances
//! once every component has finished the timestep.

pub mod ensemble;
pub mod heat;

pub use ensemble::run_ensemble;
pub use heat::{BuildingLoads, UrbanHeatSource};

use crate::column::VerticalColumn;
use crate::config::ModelConfig;
use crate::core_types::{ClockSnapshot, Forcing, ForcingSource, Kelvin, KelvinDelta, Meters, SimulationClock};
use crate::error::{Result, UwgError};
use crate::surface::{BoundaryCondition, ReferenceAir};
use crate::ubl::{Regime, UrbanBoundaryLayer, UrbanSurfaceFluxes};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What one timestep produced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Time of the completed timestep
    pub clock: ClockSnapshot,
    pub ubl_temperature: Kelvin,
    /// Urban boundary layer temperature minus the forcing air temperature
    pub urban_excess: KelvinDelta,
    /// Mixing height (m)
    pub mixing_height: f64,
    pub regime: Regime,
    /// Rural sensible heat flux (W/m²)
    pub rural_sensible: f64,
    /// Rural latent heat flux (W/m²)
    pub rural_latent: f64,
    pub urban: UrbanSurfaceFluxes,
}

/// Aggregates over a completed run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub steps: usize,
    /// Mean urban boundary layer temperature (K)
    pub mean_ubl_temperature: f64,
    /// Mean heat-island intensity (K)
    pub mean_excess: f64,
    /// Strongest heat-island intensity (K)
    pub max_excess: f64,
    /// Final urban boundary layer temperature
    pub final_temperature: Kelvin,
}

/// Coupled rural column, urban column and urban boundary layer
pub struct UrbanClimateModel {
    config: ModelConfig,
    clock: SimulationClock,
    rural: VerticalColumn,
    urban: VerticalColumn,
    ubl: UrbanBoundaryLayer,
    heat_source: Box<dyn UrbanHeatSource>,
}

impl UrbanClimateModel {
    /// Validate `config` and build every component from the first forcing record.
    ///
    /// Both columns start isothermal at the forcing temperature and pressure;
    /// the boundary layer is laid out across the forcing wind direction.
    ///
    /// # Errors
    /// `ConfigurationError` for any invalid static input, before a timestep runs.
    pub fn new(config: ModelConfig, initial: &Forcing) -> Result<Self> {
        config.validate()?;
        initial.check()?;

        let rural = VerticalColumn::new(
            &config.site,
            Meters::new(config.rural_obstacle_height),
            initial.temperature,
            initial.pressure,
            &config.geo,
            &config.grid,
            config.rural_surface.clone(),
        )?;
        let urban = VerticalColumn::new(
            &config.site,
            Meters::new(config.urban_obstacle_height),
            initial.temperature,
            initial.pressure,
            &config.geo,
            &config.grid,
            config.urban_surface.clone(),
        )?;
        let ubl = UrbanBoundaryLayer::new(
            &config.footprint,
            initial.wind_direction,
            initial.temperature,
            &config.geo,
            &config.site,
        )?;
        let clock = SimulationClock::new(config.start_month, config.start_day, config.n_days, config.dt);

        info!(
            "Urban climate model initialized: {} steps of {:.0}s from {:02}/{:02}, T0={}",
            clock.total_steps(),
            config.dt,
            config.start_month,
            config.start_day,
            initial.temperature
        );

        Ok(Self {
            heat_source: Box::new(config.buildings.clone()),
            config,
            clock,
            rural,
            urban,
            ubl,
        })
    }

    /// Build the model from the record `source` supplies for the first timestep
    ///
    /// # Errors
    /// Any error of [`Self::new`] or of the forcing source.
    pub fn from_source<S: ForcingSource + ?Sized>(config: ModelConfig, source: &S) -> Result<Self> {
        let start = SimulationClock::new(config.start_month, config.start_day, config.n_days, config.dt);
        let initial = source.forcing_at(&start.snapshot())?;
        Self::new(config, &initial)
    }

    /// Replace the built-in building loads with another heat source
    #[must_use]
    pub fn with_heat_source(mut self, source: impl UrbanHeatSource + 'static) -> Self {
        self.heat_source = Box::new(source);
        self
    }

    /// Advance every component by one timestep with `forcing`.
    ///
    /// # Errors
    /// `ConfigurationError` when the run is already finished; any
    /// `NumericalError` carries the failing timestep.
    pub fn step(&mut self, forcing: &Forcing) -> Result<StepReport> {
        if self.clock.is_finished() {
            return Err(UwgError::configuration(
                "clock",
                format!("all {} timesteps already ran", self.clock.total_steps()),
            ));
        }
        let clock = self.clock.snapshot();
        let report = self
            .advance_components(&clock, forcing)
            .map_err(|e| e.at_timestep(clock.timestep))?;

        // Clock moves only after every component finished
        self.clock.advance();
        Ok(report)
    }

    /// Run to the end of the clock, pulling one forcing record per timestep.
    ///
    /// # Errors
    /// The first error any timestep raises; the run stops there.
    pub fn run<S: ForcingSource + ?Sized>(&mut self, source: &S) -> Result<RunSummary> {
        info!("Starting run: {} timesteps remaining", self.clock.remaining());

        let mut steps = 0usize;
        let mut temperature_sum = 0.0;
        let mut excess_sum = 0.0;
        let mut max_excess = f64::NEG_INFINITY;

        while !self.clock.is_finished() {
            let snapshot = self.clock.snapshot();
            let forcing = source
                .forcing_at(&snapshot)
                .map_err(|e| e.at_timestep(snapshot.timestep))?;
            let report = self.step(&forcing)?;

            steps += 1;
            temperature_sum += *report.ubl_temperature;
            excess_sum += report.urban_excess.value();
            max_excess = max_excess.max(report.urban_excess.value());
        }

        let summary = if steps == 0 {
            RunSummary {
                steps,
                mean_ubl_temperature: *self.ubl.temperature(),
                mean_excess: 0.0,
                max_excess: 0.0,
                final_temperature: self.ubl.temperature(),
            }
        } else {
            let n = steps as f64;
            RunSummary {
                steps,
                mean_ubl_temperature: temperature_sum / n,
                mean_excess: excess_sum / n,
                max_excess,
                final_temperature: self.ubl.temperature(),
            }
        };

        info!(
            "Run complete: {} steps, mean UBL {:.2}K, mean excess {:.2}K, max excess {:.2}K",
            summary.steps, summary.mean_ubl_temperature, summary.mean_excess, summary.max_excess
        );
        Ok(summary)
    }

    /// Stop the run after `remaining` more timesteps
    pub fn truncate(&mut self, remaining: usize) {
        self.clock.truncate(remaining);
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn rural(&self) -> &VerticalColumn {
        &self.rural
    }

    pub fn urban(&self) -> &VerticalColumn {
        &self.urban
    }

    pub fn ubl(&self) -> &UrbanBoundaryLayer {
        &self.ubl
    }

    // ====== Private Methods ======

    fn advance_components(&mut self, clock: &ClockSnapshot, forcing: &Forcing) -> Result<StepReport> {
        forcing.check()?;
        let geo = &self.config.geo;

        if forcing.wind_speed < geo.wind_min {
            warn!(
                "Forcing wind {:.2}m/s below minimum {:.2}m/s at step {}",
                forcing.wind_speed, geo.wind_min, clock.timestep
            );
        }
        let wind_speed = forcing.wind_speed.max(geo.wind_min);

        // 1. Rural surface energy balance against the measured air
        let rural_air = ReferenceAir {
            humidity: forcing.specific_humidity,
            temperature: forcing.temperature,
            wind_speed,
        };
        let rural_state = *self
            .rural
            .surface_flux(forcing, geo, clock, &rural_air, BoundaryCondition::Temperature, 0.0)?;

        // 2. Rural vertical diffusion
        self.rural.diffuse(forcing, geo, clock)?;

        // 3. Urban surface energy balance against the boundary layer air
        let urban_air = ReferenceAir {
            humidity: forcing.specific_humidity,
            temperature: self.ubl.temperature(),
            wind_speed,
        };
        let urban_state = *self
            .urban
            .surface_flux(forcing, geo, clock, &urban_air, BoundaryCondition::Temperature, 0.0)?;

        // 4. Urban heat release
        let urban = self.heat_source.fluxes(clock, forcing, &urban_state)?;

        // 5. Boundary layer
        self.ubl.advance(clock, &self.rural, &urban, forcing, geo)?;

        let report = StepReport {
            clock: *clock,
            ubl_temperature: self.ubl.temperature(),
            urban_excess: self.ubl.urban_excess(forcing.temperature),
            mixing_height: self.ubl.mixing_height(),
            regime: self.ubl.regime(),
            rural_sensible: rural_state.sensible,
            rural_latent: rural_state.latent,
            urban,
        };

        debug!(
            "Step {}: {:02}/{:02} {:.2}h, UBL {}, excess {:.3}K, rural H={:.1}W/m², urban H={:.1}W/m²",
            clock.timestep,
            clock.month,
            clock.day,
            clock.hour(),
            report.ubl_temperature,
            report.urban_excess.value(),
            report.rural_sensible,
            report.urban.sensible_heat
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{DiurnalForcing, ForcingSeries};

    fn forcing_for(config: &ModelConfig) -> DiurnalForcing {
        DiurnalForcing::new(&config.site)
    }

    #[test]
    fn test_step_advances_clock_once() {
        let config = ModelConfig::default();
        let source = forcing_for(&config);
        let mut model = UrbanClimateModel::from_source(config, &source).unwrap();

        let forcing = source.forcing_at(&model.clock().snapshot()).unwrap();
        let report = model.step(&forcing).unwrap();

        assert_eq!(report.clock.timestep, 0);
        assert_eq!(model.clock().snapshot().timestep, 1);
        assert_eq!(model.clock().sec_day(), 300.0);
    }

    #[test]
    fn test_truncated_run_stops_early() {
        let config = ModelConfig::default();
        let source = forcing_for(&config);
        let mut model = UrbanClimateModel::from_source(config, &source).unwrap();
        model.truncate(6);

        let summary = model.run(&source).unwrap();
        assert_eq!(summary.steps, 6);
        assert!(model.clock().is_finished());
        assert!(summary.final_temperature.is_finite());
    }

    #[test]
    fn test_step_after_finish_rejected() {
        let config = ModelConfig::default();
        let source = forcing_for(&config);
        let mut model = UrbanClimateModel::from_source(config, &source).unwrap();
        model.truncate(0);

        let forcing = source.forcing_at(&model.clock().snapshot()).unwrap();
        assert!(model.step(&forcing).unwrap_err().is_configuration());
    }

    #[test]
    fn test_invalid_config_fails_before_first_step() {
        let config = ModelConfig {
            dt: -1.0,
            ..ModelConfig::default()
        };
        let source = forcing_for(&ModelConfig::default());
        let err = UrbanClimateModel::from_source(config, &source).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_short_forcing_series_reports_timestep() {
        let config = ModelConfig::default();
        let diurnal = forcing_for(&config);
        let mut clock = SimulationClock::new(1, 1, 1, 300.0);
        let records = (0..3)
            .map(|_| {
                let record = diurnal.forcing_at(&clock.snapshot());
                clock.advance();
                record
            })
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let series = ForcingSeries::new(records);

        let mut model = UrbanClimateModel::from_source(config, &series).unwrap();
        let err = model.run(&series).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(model.clock().snapshot().timestep, 3);
    }

    #[test]
    fn test_custom_heat_source_drives_daytime_regime() {
        struct Furnace;
        impl UrbanHeatSource for Furnace {
            fn fluxes(&self, _: &ClockSnapshot, _: &Forcing, _: &crate::surface::SurfaceState) -> Result<UrbanSurfaceFluxes> {
                Ok(UrbanSurfaceFluxes {
                    sensible_heat: 400.0,
                    ubl_heat: 400.0,
                })
            }
        }

        let config = ModelConfig::default();
        let source = forcing_for(&config);
        let mut model = UrbanClimateModel::from_source(config, &source).unwrap().with_heat_source(Furnace);
        let forcing = source.forcing_at(&model.clock().snapshot()).unwrap();
        let report = model.step(&forcing).unwrap();

        assert_ne!(report.regime, Regime::Night);
        assert!(report.urban_excess.value() > 0.0);
    }
}
