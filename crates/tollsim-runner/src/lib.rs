//! # tollsim runner
//!
//! Drives the toll-pricing study end to end:
//!
//! - [`scenario`]: relabeled route files and simulator configs per toll price
//! - [`simulator`]: the external simulator behind [`simulator::SimulationEngine`]
//! - [`pipeline`]: generate → simulate → analyze over all configured scenarios
//! - [`sensitivity_report`]: parameter sweeps, ranking and tornado bars on disk

pub mod pipeline;
pub mod scenario;
pub mod sensitivity_report;
pub mod simulator;

pub use pipeline::{write_results, ScenarioRun, Study};
pub use scenario::{GeneratedScenario, ScenarioGenerator};
pub use sensitivity_report::SensitivityReport;
pub use simulator::{SimulationEngine, SimulationRun, SumoEngine};
