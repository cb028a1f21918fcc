//! Urban Weather Generator Core Library
//!
//! Estimates the air temperature inside a city from weather measured at a
//! rural station. A vertical column over the rural site carries the measured
//! conditions up through the surface layer; an urban boundary layer model
//! heats that reference air with the heat the city releases and ventilates
//! it with the wind or the urban circulation.
//!
//! ## Components
//!
//! - [`column::VerticalColumn`]: stretched vertical grid, hydrostatic
//!   profiles, surface energy balance and turbulent diffusion
//! - [`ubl::UrbanBoundaryLayer`]: footprint geometry, diurnal mixing height
//!   and the day/night boundary-layer energy balance
//! - [`simulation::UrbanClimateModel`]: couples both sites and the boundary
//!   layer under one simulation clock

// Core types and utilities
pub mod config;
pub mod core_types;
pub mod error;
pub mod numerics;
pub mod solar;
pub mod validation;

// Model components
pub mod column;
pub mod simulation;
pub mod surface;
pub mod ubl;

// Re-export core types
pub use core_types::{
    ClockSnapshot, DiurnalForcing, Forcing, ForcingSeries, ForcingSource, Kelvin, KelvinDelta, Meters,
    Pascals, PhysicalConstants, SimulationClock,
};
pub use config::{GeoParams, GridSpec, ModelConfig, SiteConfig};
pub use error::{Result, UwgError};

// Re-export model types
pub use column::{ColumnIndices, VerticalColumn, VerticalGrid};
pub use simulation::{run_ensemble, BuildingLoads, RunSummary, StepReport, UrbanClimateModel, UrbanHeatSource};
pub use surface::{BoundaryCondition, SurfaceConfig, SurfaceElement, SurfaceState};
pub use ubl::{FootprintGeometry, MixingHeightSchedule, Regime, UrbanBoundaryLayer, UrbanFootprint, UrbanSurfaceFluxes};
pub use validation::{compare_trace, reference_tolerance, ReferenceMismatch};

#[cfg(test)]
#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
