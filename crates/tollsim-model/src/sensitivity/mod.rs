//! One-at-a-time sensitivity analysis
//!
//! Each model parameter is varied on its own while the others stay at their
//! base values. The resulting share curves are compared against the base
//! curve and condensed into a single score per parameter:
//!
//! ```text
//! score(p) = max over perturbations  max over tolls  |share_perturbed - share_base|
//! ```
//!
//! Ranking parameters by that score gives the tornado ordering.
//! Everything here is deterministic.

pub mod impact;
pub mod sweep;
pub mod tornado;

pub use impact::{rank_impacts, sensitivity_score, ImpactSummary, SweepPlan};
pub use sweep::{sweep, sweep_named, Perturbation, SensitivitySweepPoint};
pub use tornado::{tornado, TornadoBar, TornadoInput};
