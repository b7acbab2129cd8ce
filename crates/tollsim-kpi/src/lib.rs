//! # tollsim KPI
//!
//! Turns simulator trip logs into per-scenario indicators:
//!
//! - [`record`]: one vehicle's trip summary and its EV / ICE classification
//! - [`tripinfo`]: streaming reader for the simulator's XML trip-info output
//! - [`aggregator`]: EV share, CO2, grid cost and toll revenue per scenario
//! - [`report`]: the study's results table (CSV and Markdown)

pub mod aggregator;
pub mod record;
pub mod report;
pub mod tripinfo;

pub use aggregator::{aggregate, KpiAggregator, ScenarioKpis};
pub use record::TripRecord;
pub use report::ResultsTable;
pub use tripinfo::{aggregate_file, aggregate_reader, ParsedTrip, TripInfoReader};
