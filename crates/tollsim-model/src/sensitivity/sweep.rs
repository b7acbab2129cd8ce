//! Parameter sweeps over a toll range

use crate::adoption::{AdoptionModel, AdoptionResult};
use serde::Serialize;
use tollsim_common::{AdoptionModelParameters, ModelError, SweepTarget};

/// Share curve for one perturbed parameter value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivitySweepPoint {
    pub parameter: SweepTarget,
    pub perturbed_value: f64,
    /// One result per toll, in the order the tolls were given
    pub share_curve: Vec<AdoptionResult>,
}

/// Builds perturbation values around a base value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Perturbation {
    /// `value ± delta`
    Absolute(f64),
    /// `value × (1 ± fraction)`
    Relative(f64),
}

impl Perturbation {
    /// `[low, high]` around `value`
    pub fn around(&self, value: f64) -> [f64; 2] {
        match *self {
            Perturbation::Absolute(delta) => [value - delta, value + delta],
            Perturbation::Relative(fraction) => [value * (1.0 - fraction), value * (1.0 + fraction)],
        }
    }

    /// `[low, high]` around the current value of `target` in `params`
    pub fn values_for(&self, params: &AdoptionModelParameters, target: SweepTarget) -> Vec<f64> {
        self.around(params.get(target)).to_vec()
    }
}

/// Recompute the share curve for every perturbed value of `target`
///
/// Output order follows `perturbations`; each curve follows `tolls`.
/// A perturbation that breaks a parameter invariant fails the whole sweep.
pub fn sweep(
    base: &AdoptionModelParameters,
    target: SweepTarget,
    perturbations: &[f64],
    tolls: &[f64],
) -> Result<Vec<SensitivitySweepPoint>, ModelError> {
    perturbations
        .iter()
        .map(|&value| {
            let model = AdoptionModel::new(base.with_value(target, value)?);
            Ok(SensitivitySweepPoint {
                parameter: target,
                perturbed_value: value,
                share_curve: model.curve(tolls),
            })
        })
        .collect()
}

/// [`sweep`] addressed by parameter name
pub fn sweep_named(
    base: &AdoptionModelParameters,
    parameter: &str,
    perturbations: &[f64],
    tolls: &[f64],
) -> Result<Vec<SensitivitySweepPoint>, ModelError> {
    let target: SweepTarget = parameter.parse()?;
    sweep(base, target, perturbations, tolls)
}
