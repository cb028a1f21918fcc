//! Simulation time bookkeeping
//!
//! `SimulationClock` is the single owner of model time. Components never read
//! it directly; each advance call receives an immutable [`ClockSnapshot`] and
//! the orchestrator advances the clock once every component has finished the
//! timestep.

use serde::{Deserialize, Serialize};

/// Seconds in one day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Days per month in a non-leap year (weather files are typical-year data)
const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Immutable view of the model time for one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockSnapshot {
    /// Month (1-12)
    pub month: u32,
    /// Day of month (1-31)
    pub day: u32,
    /// Seconds since local midnight
    pub sec_day: f64,
    /// Index of this timestep (0-based)
    pub timestep: usize,
    /// Timestep length (s)
    pub dt: f64,
    /// Seconds since the start of the run
    pub elapsed: f64,
}

impl ClockSnapshot {
    /// Local clock time in hours (0-24)
    #[inline]
    pub fn hour(&self) -> f64 {
        self.sec_day / 3600.0
    }

    /// Day of the year (1-365)
    pub fn day_of_year(&self) -> u32 {
        day_of_year(self.month, self.day)
    }
}

/// Day of year for a month/day pair in a non-leap year
pub fn day_of_year(month: u32, day: u32) -> u32 {
    let month = month.clamp(1, 12) as usize;
    DAYS_IN_MONTH[..month - 1].iter().sum::<u32>() + day
}

/// Owner of the simulation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationClock {
    month: u32,
    day: u32,
    sec_day: f64,
    timestep: usize,
    dt: f64,
    /// Total number of timesteps in the run
    total_steps: usize,
}

impl SimulationClock {
    /// Create a clock starting at midnight of `month`/`day`, running `n_days` days
    /// with timestep `dt` seconds.
    pub fn new(month: u32, day: u32, n_days: u32, dt: f64) -> Self {
        let total_steps = (f64::from(n_days) * SECONDS_PER_DAY / dt).round() as usize;
        Self {
            month: month.clamp(1, 12),
            day: day.max(1),
            sec_day: 0.0,
            timestep: 0,
            dt,
            total_steps,
        }
    }

    /// Snapshot of the current time
    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            month: self.month,
            day: self.day,
            sec_day: self.sec_day,
            timestep: self.timestep,
            dt: self.dt,
            elapsed: self.timestep as f64 * self.dt,
        }
    }

    /// Advance by one timestep, rolling over day, month and year boundaries.
    pub fn advance(&mut self) {
        self.timestep += 1;
        self.sec_day += self.dt;
        if self.sec_day >= SECONDS_PER_DAY {
            self.sec_day -= SECONDS_PER_DAY;
            self.day += 1;
            if self.day > DAYS_IN_MONTH[self.month as usize - 1] {
                self.day = 1;
                self.month = if self.month == 12 { 1 } else { self.month + 1 };
            }
        }
    }

    /// Timesteps left before the run is complete
    pub fn remaining(&self) -> usize {
        self.total_steps.saturating_sub(self.timestep)
    }

    /// Whether the configured number of timesteps has been executed
    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    /// Shorten the run so that only `remaining` more timesteps execute.
    ///
    /// Used by drivers and tests to stop a run early at a chosen time.
    pub fn truncate(&mut self, remaining: usize) {
        self.total_steps = self.timestep + remaining.min(self.remaining());
    }

    /// Total timestep count of the run
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn sec_day(&self) -> f64 {
        self.sec_day
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }
}
