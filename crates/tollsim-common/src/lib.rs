//! # tollsim common
//!
//! Shared types, errors, and configuration for the toll-pricing / EV-adoption study.
//!
//! ## Core Types
//!
//! - [`AdoptionModelParameters`]: validated sigmoid parameters (baseline, max share, midpoint, steepness)
//! - [`AdoptionPreset`]: the study's named parameter sets
//! - [`TollScenario`]: one toll price and its canonical scenario name
//! - [`VehicleClass`]: EV / ICE powertrain label
//!
//! ## Configuration
//!
//! - [`config::StudyConfig`]: defaults, JSON file and `TOLLSIM_*` environment overrides

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{AdoptionSettings, KpiConfig, ScenarioSettings, SimulatorSettings, StudyConfig};
pub use error::{ModelError, Result, SimulationError, TollsimError, TripRecordError};
pub use types::{
    adoption::{AdoptionModelParameters, AdoptionPreset, SweepTarget},
    scenario::TollScenario,
    vehicle::{LabelingPolicy, VehicleClass},
};

/// tollsim version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Grid electricity price (EUR per kWh)
pub const DEFAULT_GRID_COST_PER_KWH: f64 = 0.20;

/// Milligrams per kilogram (simulator CO2 is reported in mg)
pub const MG_PER_KG: f64 = 1_000_000.0;

/// Watt-hours per kilowatt-hour (simulator energy is reported in Wh)
pub const WH_PER_KWH: f64 = 1_000.0;

/// Toll prices evaluated by a default study run (EUR)
pub const DEFAULT_TOLL_PRICES: [f64; 7] = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0];

/// Toll range used by the sensitivity analysis (EUR)
pub const SENSITIVITY_TOLL_PRICES: [f64; 11] =
    [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0];

/// Simulation window start, 09:00 (seconds of day)
pub const DEFAULT_SIM_BEGIN: u32 = 32_400;

/// Simulation window end, 11:00 (seconds of day)
pub const DEFAULT_SIM_END: u32 = 39_600;

/// Fleet size used for analytic revenue projections
pub const DEFAULT_FLEET_SIZE: u64 = 2505;

/// Default study seed
pub const DEFAULT_SEED: u64 = 42;
