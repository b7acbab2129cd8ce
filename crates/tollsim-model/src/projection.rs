//! Analytic outcome projection
//!
//! Simulator-free estimate of a scenario: ICE share stands in for normalised
//! CO2 (1.0 = all ICE) and revenue is the toll times the expected ICE count.

use crate::adoption::ev_share;
use serde::Serialize;
use tollsim_common::AdoptionModelParameters;

/// Expected outcome at one toll price
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectedOutcome {
    pub toll_price: f64,
    pub ev_share: f64,
    pub ice_share: f64,
    /// Normalised CO2, 1.0 = all ICE
    pub co2_factor: f64,
    /// Expected toll revenue for the fleet (EUR)
    pub expected_revenue: f64,
}

pub fn project(toll: f64, params: &AdoptionModelParameters, fleet_size: u64) -> ProjectedOutcome {
    let ev = ev_share(toll, params);
    let ice = 1.0 - ev;
    ProjectedOutcome {
        toll_price: toll,
        ev_share: ev,
        ice_share: ice,
        co2_factor: ice,
        expected_revenue: toll * ice * fleet_size as f64,
    }
}

/// Toll price with the highest expected revenue among `tolls`
pub fn revenue_maximizing_toll(
    tolls: &[f64],
    params: &AdoptionModelParameters,
    fleet_size: u64,
) -> Option<ProjectedOutcome> {
    tolls
        .iter()
        .map(|&t| project(t, params, fleet_size))
        .max_by(|a, b| a.expected_revenue.total_cmp(&b.expected_revenue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollsim_common::DEFAULT_FLEET_SIZE;

    #[test]
    fn test_project_at_midpoint() {
        let p = AdoptionModelParameters::default();
        let out = project(2.5, &p, 1000);
        assert!((out.ev_share - 0.525).abs() < 1e-12);
        assert!((out.ice_share - 0.475).abs() < 1e-12);
        assert_eq!(out.co2_factor, out.ice_share);
        assert!((out.expected_revenue - 2.5 * 475.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_toll_has_no_revenue() {
        let p = AdoptionModelParameters::default();
        assert_eq!(project(0.0, &p, DEFAULT_FLEET_SIZE).expected_revenue, 0.0);
    }

    #[test]
    fn test_revenue_maximizing_toll() {
        let p = AdoptionModelParameters::default();
        let tolls = tollsim_common::SENSITIVITY_TOLL_PRICES;
        let best = revenue_maximizing_toll(&tolls, &p, DEFAULT_FLEET_SIZE).unwrap();
        for t in tolls {
            assert!(project(t, &p, DEFAULT_FLEET_SIZE).expected_revenue <= best.expected_revenue);
        }
        assert!(revenue_maximizing_toll(&[], &p, 10).is_none());
    }
}
