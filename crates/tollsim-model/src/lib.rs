//! # tollsim model
//!
//! Toll price → EV adoption model and the analyses built on it.
//!
//! ## Adoption Formula
//!
//! ```text
//! share = baseline + (max_share - baseline) × σ(k × (toll - midpoint))
//! ```
//!
//! Where:
//! - baseline: EV share without toll pressure
//! - max_share: saturation share at high tolls
//! - midpoint: toll at which the share is halfway between the two
//! - k: steepness of the transition
//!
//! ## Modules
//!
//! - [`adoption`]: the curve itself
//! - [`labeling`]: seeded per-vehicle EV / ICE assignment
//! - [`sensitivity`]: one-at-a-time sweeps, impact ranking, tornado bars
//! - [`projection`]: simulator-free CO2 / revenue estimates

pub mod adoption;
pub mod labeling;
pub mod projection;
pub mod sensitivity;

pub use adoption::{ev_share, sigmoid, AdoptionModel, AdoptionResult};
pub use labeling::{label_fleet, label_scenario, scenario_rng, FleetLabels};
pub use projection::{project, revenue_maximizing_toll, ProjectedOutcome};
pub use sensitivity::{
    rank_impacts, sensitivity_score, sweep, sweep_named, tornado, ImpactSummary, Perturbation,
    SensitivitySweepPoint, SweepPlan, TornadoBar, TornadoInput,
};
