//! Scenario runner for crypt vaults.
//!
//! A scenario is a TOML file naming the accounts, the deployment roles, the
//! vault and strategy parameters, and a list of steps. [`run_file`] deploys a
//! vault and strategy against the in-memory asset and venue from
//! `crypt_runtime::sim`, plays the steps and returns a serializable [`Report`].

pub mod error;
pub mod runner;
pub mod scenario;

use std::path::Path;

pub use error::{SimError, SimResult};
pub use runner::{Report, Simulation, StepOutcome, run_scenario};
pub use scenario::{Scenario, Step};

/// Load the scenario at `path` and run it.
pub fn run_file(path: impl AsRef<Path>) -> SimResult<Report> {
    let scenario = Scenario::load(path)?;
    tracing::info!(scenario = %scenario.name, steps = scenario.steps.len(), "loaded scenario");
    run_scenario(scenario)
}

/// Pretty JSON rendering of a report.
pub fn render(report: &Report) -> SimResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
