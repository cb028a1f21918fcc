//! Coupled rural/urban runs through the public model API
use approx::assert_relative_eq;
use uwg_core::core_types::{ClockSnapshot, DiurnalForcing, Forcing, ForcingSeries, ForcingSource, Kelvin};
use uwg_core::numerics::layer_mean;
use uwg_core::ubl::{Regime, UrbanSurfaceFluxes};
use uwg_core::validation::{compare_trace, reference_tolerance};
use uwg_core::{ModelConfig, SimulationClock, UrbanClimateModel};

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Forcing held at the reference initial state, night with no sun
fn steady_forcing(config: &ModelConfig) -> Forcing {
    let clock = SimulationClock::new(config.start_month, config.start_day, 1, config.dt);
    let mut forcing = DiurnalForcing::new(&config.site).forcing_at(&clock.snapshot()).unwrap();
    forcing.temperature = Kelvin::new(297.85);
    forcing.deep_temperature = Kelvin::new(297.85);
    forcing.direct_normal = 0.0;
    forcing.diffuse_horizontal = 0.0;
    forcing
}

/// Night update of every segment rebuilt from the published rural column
/// and heat release of the step just taken
fn night_segments(model: &UrbanClimateModel, urban: &UrbanSurfaceFluxes, initial: f64) -> Vec<f64> {
    const ADVECTION_FACTOR: f64 = 1.4;
    let config = model.config();
    let c = &config.geo.constants;
    let dt = config.dt;
    let h = config.geo.night_bl_height;
    let rural = model.rural();
    let dz = rural.thickness();
    let wind = rural.wind();
    let theta = rural.temperature();
    let density = layer_mean(rural.density_cell(), dz, rural.heights(), rural.indices().nzref);

    let (heat_flux, mass_flux) = (0..rural.indices().nzfor).fold((0.0, 0.0), |(heat, mass), iz| {
        (heat + wind[iz] * theta[iz] * dz[iz], mass + wind[iz] * dz[iz])
    });
    let scale = ADVECTION_FACTOR * dt / model.ubl().geometry().segment_length / h;
    let ventilation = scale * mass_flux;
    let heating = urban.ubl_heat * dt / (h * density * c.cp);

    let mut segments = Vec::with_capacity(model.ubl().segment_temperatures().len());
    let mut upwind = (heating + scale * heat_flux + initial) / (1.0 + ventilation);
    segments.push(upwind);
    while segments.len() < segments.capacity() {
        upwind = (heating + ventilation * upwind + initial) / (1.0 + ventilation);
        segments.push(upwind);
    }
    segments
}

#[test]
fn test_first_step_from_new_year() {
    let config = ModelConfig::default();
    let forcing = steady_forcing(&config);
    let mut model = UrbanClimateModel::new(config, &forcing).unwrap();

    let report = model.step(&forcing).unwrap();

    let clock = model.clock();
    assert_eq!(clock.month(), 1);
    assert_eq!(clock.day(), 1);
    assert_eq!(clock.sec_day(), 300.0);
    assert_eq!(report.clock.timestep, 0);
    assert_eq!(report.regime, Regime::Night);

    let ubl = model.ubl();
    assert_eq!(ubl.geometry().segment_length, 250.0);
    assert_eq!(ubl.segment_temperatures().len(), 4);

    let segments = night_segments(&model, &report.urban, 297.85);
    if let Err(mismatch) = compare_trace(&segments, ubl.segment_temperatures(), reference_tolerance) {
        panic!("segment {mismatch}");
    }

    let sum: f64 = segments.iter().sum();
    let expected = [sum / 4.0, sum, 1000.0, 80.0, 80.0];
    let actual = [
        *report.ubl_temperature,
        ubl.segment_sum(),
        ubl.day_height(),
        ubl.night_height(),
        report.mixing_height,
    ];
    if let Err(mismatch) = compare_trace(&expected, &actual, reference_tolerance) {
        panic!("{mismatch}");
    }
    assert_relative_eq!(ubl.segment_sum(), 4.0 * *ubl.temperature(), max_relative = 1e-12);
}

#[test]
fn test_tall_rural_obstacles_fail_before_first_step() {
    for h in [3.5, 4.0] {
        let config = ModelConfig {
            rural_obstacle_height: h,
            ..ModelConfig::default()
        };
        let forcing = steady_forcing(&config);
        let err = UrbanClimateModel::new(config, &forcing).err().unwrap();
        assert!(err.is_configuration(), "h={h}: {err}");
    }
}

#[test]
fn test_three_days_stay_physical() {
    let config = ModelConfig {
        n_days: 3,
        ..ModelConfig::default()
    };
    let source = DiurnalForcing::new(&config.site);
    let mut model = UrbanClimateModel::from_source(config.clone(), &source).unwrap();

    let mut saw_day = false;
    let mut saw_night = false;
    while !model.clock().is_finished() {
        let forcing = source.forcing_at(&model.clock().snapshot()).unwrap();
        let report = model.step(&forcing).unwrap();

        assert!(report.ubl_temperature.is_finite());
        assert!(
            report.urban_excess.value().abs() < 10.0,
            "step {}: excess {}",
            report.clock.timestep,
            report.urban_excess.value()
        );
        assert!((config.geo.night_bl_height..=config.geo.day_bl_height).contains(&report.mixing_height));
        match report.regime {
            Regime::Night => saw_night = true,
            Regime::Forced | Regime::Convective => saw_day = true,
        }
    }
    assert!(saw_day && saw_night);
    assert_eq!(model.clock().day(), 4);
    assert_eq!(model.clock().sec_day(), 0.0);
}

#[test]
fn test_run_matches_manual_stepping() {
    let config = ModelConfig {
        dt: 900.0,
        ..ModelConfig::default()
    };
    let source = DiurnalForcing::new(&config.site);

    let mut stepped = UrbanClimateModel::from_source(config.clone(), &source).unwrap();
    let mut last = None;
    while !stepped.clock().is_finished() {
        let forcing = source.forcing_at(&stepped.clock().snapshot()).unwrap();
        last = Some(stepped.step(&forcing).unwrap());
    }

    let mut ran = UrbanClimateModel::from_source(config, &source).unwrap();
    let summary = ran.run(&source).unwrap();

    assert_eq!(summary.steps, 96);
    assert_eq!(summary.final_temperature, last.unwrap().ubl_temperature);
    assert_eq!(ran.ubl().segment_temperatures(), stepped.ubl().segment_temperatures());
}

#[test]
fn test_recorded_series_drives_run() {
    let config = ModelConfig {
        dt: 3600.0,
        ..ModelConfig::default()
    };
    let diurnal = DiurnalForcing::new(&config.site);
    let records = (0..24u32)
        .map(|hour| {
            diurnal.forcing_at(&ClockSnapshot {
                month: 1,
                day: 1,
                sec_day: f64::from(hour) * 3600.0,
                timestep: hour as usize,
                dt: 3600.0,
                elapsed: f64::from(hour) * 3600.0,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let series = ForcingSeries::new(records);

    let mut model = UrbanClimateModel::from_source(config, &series).unwrap();
    let summary = model.run(&series).unwrap();
    assert_eq!(summary.steps, 24);
    assert!(summary.max_excess >= summary.mean_excess);
}

#[test]
fn test_config_survives_json() {
    let config = ModelConfig {
        n_days: 2,
        ..ModelConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let parsed: ModelConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);

    // Missing fields fall back to defaults
    let partial: ModelConfig = serde_json::from_str(r#"{"n_days": 5, "site": {"latitude": 40.0}}"#).unwrap();
    assert_eq!(partial.n_days, 5);
    assert_eq!(partial.site.latitude, 40.0);
    assert_eq!(partial.dt, 300.0);
}
