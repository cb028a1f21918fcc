//! Core types and utilities

pub mod clock;
pub mod constants;
pub mod forcing;
pub mod units;

pub use clock::{ClockSnapshot, SimulationClock, SECONDS_PER_DAY};
pub use constants::{PhysicalConstants, STEFAN_BOLTZMANN};
pub use forcing::{DiurnalForcing, Forcing, ForcingSeries, ForcingSource};
pub use units::*;
