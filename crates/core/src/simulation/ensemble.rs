//! Parallel independent runs
//!
//! A single run is strictly sequential in time, so the parallelism lives one
//! level up: each ensemble member is a whole run on its own thread.

use super::{RunSummary, UrbanClimateModel};
use crate::config::ModelConfig;
use crate::core_types::ForcingSource;
use crate::error::Result;
use rayon::prelude::*;
use tracing::info;

/// Run every configuration against the same forcing, in parallel.
///
/// Results come back in the order of `configs`; one member failing does not
/// stop the others.
pub fn run_ensemble<S>(configs: &[ModelConfig], source: &S) -> Vec<Result<RunSummary>>
where
    S: ForcingSource + Sync + ?Sized,
{
    info!("Running ensemble of {} members", configs.len());

    configs
        .par_iter()
        .map(|config| {
            let mut model = UrbanClimateModel::from_source(config.clone(), source)?;
            model.run(source)
        })
        .collect()
}
