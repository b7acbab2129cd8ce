//! Per-vehicle EV / ICE labeling
//!
//! Labels are drawn from an explicit random source so a scenario's vehicle set
//! can be regenerated exactly from its seed. Two policies are available:
//!
//! - [`LabelingPolicy::Bernoulli`]: one independent draw per vehicle; the EV
//!   count only converges to `n × share` for large fleets.
//! - [`LabelingPolicy::Exact`]: exactly `round(n × share)` EVs, placed at
//!   seeded random positions.
//!
//! Both are reproducible for a fixed seed.

use crate::adoption::ev_share;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tollsim_common::{
    AdoptionModelParameters, LabelingPolicy, ModelError, TollScenario, VehicleClass,
};
use tracing::debug;

/// Labels for one scenario's vehicle set, in vehicle order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetLabels {
    /// Toll price the share was computed for (EUR)
    pub toll_price: f64,
    /// Target EV share used for labeling
    pub ev_share: f64,
    /// Policy that produced the labels
    pub policy: LabelingPolicy,
    /// One label per vehicle
    pub labels: Vec<VehicleClass>,
}

impl FleetLabels {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn ev_count(&self) -> usize {
        self.labels.iter().filter(|c| c.is_ev()).count()
    }

    pub fn ice_count(&self) -> usize {
        self.len() - self.ev_count()
    }

    /// EV share actually realised by the draw
    pub fn realized_share(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        self.ev_count() as f64 / self.len() as f64
    }
}

/// Label `n` vehicles with EV probability `share`
pub fn label_fleet<R: Rng + ?Sized>(
    n: usize,
    share: f64,
    policy: LabelingPolicy,
    rng: &mut R,
) -> Result<Vec<VehicleClass>, ModelError> {
    if !share.is_finite() || !(0.0..=1.0).contains(&share) {
        return Err(ModelError::invalid(
            "ev_share",
            share,
            "must be a probability in [0, 1]",
        ));
    }

    let labels = match policy {
        LabelingPolicy::Bernoulli => (0..n)
            .map(|_| {
                if rng.gen::<f64>() < share {
                    VehicleClass::Ev
                } else {
                    VehicleClass::Ice
                }
            })
            .collect(),
        LabelingPolicy::Exact => {
            let ev_total = ((n as f64 * share).round() as usize).min(n);
            let mut labels = vec![VehicleClass::Ice; n];
            for idx in rand::seq::index::sample(rng, n, ev_total).iter() {
                labels[idx] = VehicleClass::Ev;
            }
            labels
        }
    };

    Ok(labels)
}

/// Compute the scenario's share and label its `n` vehicles
pub fn label_scenario<R: Rng + ?Sized>(
    params: &AdoptionModelParameters,
    scenario: &TollScenario,
    n: usize,
    policy: LabelingPolicy,
    rng: &mut R,
) -> Result<FleetLabels, ModelError> {
    let share = ev_share(scenario.toll_price(), params);
    let labels = label_fleet(n, share, policy, rng)?;

    let fleet = FleetLabels {
        toll_price: scenario.toll_price(),
        ev_share: share,
        policy,
        labels,
    };
    debug!(
        toll = fleet.toll_price,
        target_share = share,
        realized_share = fleet.realized_share(),
        vehicles = n,
        "Labeled fleet"
    );
    Ok(fleet)
}

/// Random stream for one scenario, derived from the study seed and the toll
///
/// Independent of the order scenarios are processed in.
pub fn scenario_rng(study_seed: u64, scenario: &TollScenario) -> StdRng {
    let toll_bits = scenario.toll_price().to_bits().rotate_left(29);
    StdRng::seed_from_u64(study_seed ^ toll_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn test_same_seed_same_labels() {
        for policy in [LabelingPolicy::Bernoulli, LabelingPolicy::Exact] {
            let a = label_fleet(500, 0.3, policy, &mut rng(7)).unwrap();
            let b = label_fleet(500, 0.3, policy, &mut rng(7)).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_different_seed_changes_labels() {
        let a = label_fleet(500, 0.5, LabelingPolicy::Bernoulli, &mut rng(1)).unwrap();
        let b = label_fleet(500, 0.5, LabelingPolicy::Bernoulli, &mut rng(2)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_exact_policy_count() {
        let labels = label_fleet(10, 0.4, LabelingPolicy::Exact, &mut rng(3)).unwrap();
        assert_eq!(labels.iter().filter(|c| c.is_ev()).count(), 4);

        let labels = label_fleet(7, 0.5, LabelingPolicy::Exact, &mut rng(3)).unwrap();
        // round(3.5) = 4
        assert_eq!(labels.iter().filter(|c| c.is_ev()).count(), 4);
    }

    #[test]
    fn test_bernoulli_converges() {
        let labels = label_fleet(20_000, 0.25, LabelingPolicy::Bernoulli, &mut rng(11)).unwrap();
        let share = labels.iter().filter(|c| c.is_ev()).count() as f64 / 20_000.0;
        assert!((share - 0.25).abs() < 0.02);
    }

    #[test]
    fn test_extreme_shares() {
        for policy in [LabelingPolicy::Bernoulli, LabelingPolicy::Exact] {
            let all_ice = label_fleet(50, 0.0, policy, &mut rng(5)).unwrap();
            assert!(all_ice.iter().all(|c| *c == VehicleClass::Ice));
            let all_ev = label_fleet(50, 1.0, policy, &mut rng(5)).unwrap();
            assert!(all_ev.iter().all(|c| *c == VehicleClass::Ev));
        }
    }

    #[test]
    fn test_rejects_invalid_share() {
        assert!(label_fleet(5, 1.5, LabelingPolicy::Bernoulli, &mut rng(0)).is_err());
        assert!(label_fleet(5, f64::NAN, LabelingPolicy::Exact, &mut rng(0)).is_err());
    }

    #[test]
    fn test_empty_fleet() {
        let labels = label_fleet(0, 0.5, LabelingPolicy::Exact, &mut rng(0)).unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn test_label_scenario_carries_share() {
        let params = AdoptionModelParameters::default();
        let scenario = TollScenario::new(2.5).unwrap();
        let fleet = label_scenario(
            &params,
            &scenario,
            1000,
            LabelingPolicy::Exact,
            &mut scenario_rng(42, &scenario),
        )
        .unwrap();

        assert_eq!(fleet.len(), 1000);
        assert!((fleet.ev_share - 0.525).abs() < 1e-12);
        // round(525.0)
        assert_eq!(fleet.ev_count(), 525);
        assert_eq!(fleet.ice_count(), 475);
    }

    #[test]
    fn test_scenario_rng_depends_on_toll() {
        let a = TollScenario::new(1.0).unwrap();
        let b = TollScenario::new(1.5).unwrap();
        let draw_a: u64 = scenario_rng(42, &a).gen();
        let draw_a2: u64 = scenario_rng(42, &a).gen();
        let draw_b: u64 = scenario_rng(42, &b).gen();
        assert_eq!(draw_a, draw_a2);
        assert_ne!(draw_a, draw_b);
    }

    #[test]
    fn test_both_zero_tolls_share_a_stream() {
        let zero = TollScenario::new(0.0).unwrap();
        let neg_zero = TollScenario::new(-0.0).unwrap();
        let a: u64 = scenario_rng(42, &zero).gen();
        let b: u64 = scenario_rng(42, &neg_zero).gen();
        assert_eq!(a, b);
    }
}
