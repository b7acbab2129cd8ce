//! Adoption curve: toll price → expected EV share
//!
//! ```text
//! share(toll) = baseline + (max_share - baseline) × σ(k × (toll - midpoint))
//! σ(x)        = 1 / (1 + e^-x)
//! ```
//!
//! The curve is bounded by `[baseline, max_share]`, non-decreasing in the toll
//! for `k > 0`, and passes exactly through the middle of that range at the
//! midpoint toll.

use serde::{Deserialize, Serialize};
use tollsim_common::{AdoptionModelParameters, TollScenario};

/// EV share at one toll price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdoptionResult {
    /// Toll price (EUR)
    pub toll_price: f64,
    /// Expected EV share (0.0 - 1.0)
    pub ev_share: f64,
}

/// Logistic function that never exponentiates a positive argument
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Expected EV share at `toll`
pub fn ev_share(toll: f64, params: &AdoptionModelParameters) -> f64 {
    let steepness = params.steepness();
    let weight = if steepness == 0.0 {
        0.5
    } else {
        sigmoid(steepness * (toll - params.midpoint()))
    };

    let share = params.baseline() + params.span() * weight;
    share.clamp(params.baseline(), params.max_share())
}

/// Adoption model bound to one parameter set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdoptionModel {
    params: AdoptionModelParameters,
}

impl AdoptionModel {
    pub fn new(params: AdoptionModelParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AdoptionModelParameters {
        &self.params
    }

    #[inline]
    pub fn ev_share(&self, toll: f64) -> f64 {
        ev_share(toll, &self.params)
    }

    pub fn evaluate(&self, toll: f64) -> AdoptionResult {
        AdoptionResult {
            toll_price: toll,
            ev_share: self.ev_share(toll),
        }
    }

    pub fn evaluate_scenario(&self, scenario: &TollScenario) -> AdoptionResult {
        self.evaluate(scenario.toll_price())
    }

    /// Share curve over `tolls`, in input order
    pub fn curve(&self, tolls: &[f64]) -> Vec<AdoptionResult> {
        tolls.iter().map(|&t| self.evaluate(t)).collect()
    }

    /// Slope of the curve at the midpoint (share per EUR)
    ///
    /// σ'(0) = 1/4, so the slope is `k / 4 × (max_share - baseline)`.
    pub fn transition_rate(&self) -> f64 {
        self.params.steepness() / 4.0 * self.params.span()
    }
}

impl Default for AdoptionModel {
    fn default() -> Self {
        Self::new(AdoptionModelParameters::default())
    }
}

impl From<AdoptionModelParameters> for AdoptionModel {
    fn from(params: AdoptionModelParameters) -> Self {
        Self::new(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(b: f64, m: f64, mid: f64, k: f64) -> AdoptionModelParameters {
        AdoptionModelParameters::new(b, m, mid, k).unwrap()
    }

    #[test]
    fn test_sigmoid_symmetry() {
        assert_eq!(sigmoid(0.0), 0.5);
        for x in [0.1, 1.0, 5.0, 30.0] {
            assert!((sigmoid(x) + sigmoid(-x) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_sigmoid_extremes_do_not_overflow() {
        assert_eq!(sigmoid(1e6), 1.0);
        assert_eq!(sigmoid(-1e6), 0.0);
        assert!(sigmoid(f64::MAX).is_finite());
        assert!(sigmoid(f64::MIN).is_finite());
    }

    #[test]
    fn test_default_curve_values() {
        let model = AdoptionModel::default();

        // 0.15 + 0.75 × σ(-1.25)
        assert!((model.ev_share(0.0) - 0.317_025).abs() < 1e-5);
        assert!((model.ev_share(2.5) - 0.525).abs() < 1e-12);
        // 0.15 + 0.75 × σ(3.75)
        assert!((model.ev_share(10.0) - 0.882_767).abs() < 1e-5);
    }

    #[test]
    fn test_midpoint_is_middle_of_range() {
        let p = params(0.05, 0.65, 1.75, 2.0);
        assert!((ev_share(1.75, &p) - (0.05 + 0.65) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_steepness_is_flat() {
        let p = params(0.2, 0.6, 2.5, 0.0);
        for toll in [0.0, 2.5, 100.0, 1e9] {
            assert!((ev_share(toll, &p) - 0.4).abs() < 1e-12);
        }
    }

    #[test]
    fn test_huge_argument_saturates_without_overflow() {
        let p = params(0.15, 0.9, 2.5, 1000.0);
        assert_eq!(ev_share(1e9, &p), 0.9);
        assert_eq!(ev_share(0.0, &p), 0.15);
    }

    #[test]
    fn test_degenerate_range() {
        let p = params(0.3, 0.3, 2.5, 0.5);
        assert_eq!(ev_share(0.0, &p), 0.3);
        assert_eq!(ev_share(7.0, &p), 0.3);
    }

    #[test]
    fn test_curve_preserves_toll_order() {
        let model = AdoptionModel::default();
        let tolls = [3.0, 0.0, 1.5];
        let curve = model.curve(&tolls);
        let order: Vec<f64> = curve.iter().map(|r| r.toll_price).collect();
        assert_eq!(order, tolls.to_vec());
        assert!(curve[1].ev_share < curve[2].ev_share);
        assert!(curve[2].ev_share < curve[0].ev_share);
    }

    #[test]
    fn test_transition_rate() {
        let model = AdoptionModel::default();
        // 0.5 / 4 × 0.75
        assert!((model.transition_rate() - 0.09375).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_scenario() {
        let model = AdoptionModel::default();
        let scenario = TollScenario::new(2.5).unwrap();
        let result = model.evaluate_scenario(&scenario);
        assert_eq!(result.toll_price, 2.5);
        assert!((result.ev_share - 0.525).abs() < 1e-12);
    }
}
