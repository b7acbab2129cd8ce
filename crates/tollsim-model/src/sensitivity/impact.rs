//! Impact scoring and parameter ranking

use super::sweep::{sweep, SensitivitySweepPoint};
use crate::adoption::AdoptionModel;
use serde::Serialize;
use tollsim_common::{AdoptionModelParameters, ModelError, SweepTarget};
use tracing::debug;

/// Perturbation values to try for one parameter
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    pub target: SweepTarget,
    pub values: Vec<f64>,
}

impl SweepPlan {
    pub fn new(target: SweepTarget, values: impl Into<Vec<f64>>) -> Self {
        Self {
            target,
            values: values.into(),
        }
    }
}

/// How strongly one parameter moves the share curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactSummary {
    pub parameter: SweepTarget,
    /// Largest absolute share change seen anywhere in the sweep
    pub sensitivity_score: f64,
}

/// Largest |perturbed − base| share difference over all points and tolls
pub fn max_share_delta(base_curve: &[f64], points: &[SensitivitySweepPoint]) -> f64 {
    points
        .iter()
        .flat_map(|point| {
            point
                .share_curve
                .iter()
                .zip(base_curve)
                .map(|(perturbed, base)| (perturbed.ev_share - base).abs())
        })
        .fold(0.0, f64::max)
}

/// Sensitivity score of `target` over `tolls`; 0 for empty inputs
pub fn sensitivity_score(
    base: &AdoptionModelParameters,
    target: SweepTarget,
    perturbations: &[f64],
    tolls: &[f64],
) -> Result<f64, ModelError> {
    let base_curve: Vec<f64> = AdoptionModel::new(*base)
        .curve(tolls)
        .into_iter()
        .map(|r| r.ev_share)
        .collect();
    let points = sweep(base, target, perturbations, tolls)?;
    Ok(max_share_delta(&base_curve, &points))
}

/// Score every plan and rank descending; ties keep plan order
pub fn rank_impacts(
    base: &AdoptionModelParameters,
    plans: &[SweepPlan],
    tolls: &[f64],
) -> Result<Vec<ImpactSummary>, ModelError> {
    let mut ranking = plans
        .iter()
        .map(|plan| {
            let score = sensitivity_score(base, plan.target, &plan.values, tolls)?;
            debug!(parameter = %plan.target, score, "Scored parameter");
            Ok(ImpactSummary {
                parameter: plan.target,
                sensitivity_score: score,
            })
        })
        .collect::<Result<Vec<_>, ModelError>>()?;

    ranking.sort_by(|a, b| b.sensitivity_score.total_cmp(&a.sensitivity_score));
    Ok(ranking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensitivity::Perturbation;
    use tollsim_common::SENSITIVITY_TOLL_PRICES;

    #[test]
    fn test_unperturbed_score_is_zero() {
        let base = AdoptionModelParameters::default();
        let score =
            sensitivity_score(&base, SweepTarget::Midpoint, &[2.5], &SENSITIVITY_TOLL_PRICES)
                .unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        let base = AdoptionModelParameters::default();
        assert_eq!(
            sensitivity_score(&base, SweepTarget::Baseline, &[], &SENSITIVITY_TOLL_PRICES)
                .unwrap(),
            0.0
        );
        assert_eq!(
            sensitivity_score(&base, SweepTarget::Baseline, &[0.2], &[]).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_baseline_score_is_analytic() {
        // d(share)/d(baseline) = 1 - σ, largest at toll 0
        let base = AdoptionModelParameters::default();
        let score = sensitivity_score(
            &base,
            SweepTarget::Baseline,
            &[0.05, 0.25],
            &SENSITIVITY_TOLL_PRICES,
        )
        .unwrap();
        assert!((score - 0.1 * (1.0 - 0.222_700)).abs() < 1e-5);
    }

    #[test]
    fn test_midpoint_dominates_baseline_relative() {
        let base = AdoptionModelParameters::default();
        let plans: Vec<SweepPlan> = [SweepTarget::Baseline, SweepTarget::Steepness, SweepTarget::Midpoint]
            .into_iter()
            .map(|t| SweepPlan::new(t, Perturbation::Relative(0.2).values_for(&base, t)))
            .collect();

        let ranking = rank_impacts(&base, &plans, &SENSITIVITY_TOLL_PRICES).unwrap();
        let order: Vec<SweepTarget> = ranking.iter().map(|r| r.parameter).collect();
        assert_eq!(
            order,
            vec![SweepTarget::Midpoint, SweepTarget::Steepness, SweepTarget::Baseline]
        );
        assert!(ranking.windows(2).all(|w| w[0].sensitivity_score >= w[1].sensitivity_score));
    }

    #[test]
    fn test_ranking_ties_keep_plan_order() {
        let base = AdoptionModelParameters::default();
        let plans = vec![
            SweepPlan::new(SweepTarget::Steepness, vec![0.5]),
            SweepPlan::new(SweepTarget::Midpoint, vec![2.5]),
        ];
        let ranking = rank_impacts(&base, &plans, &SENSITIVITY_TOLL_PRICES).unwrap();
        assert_eq!(ranking[0].parameter, SweepTarget::Steepness);
        assert_eq!(ranking[1].parameter, SweepTarget::Midpoint);
    }

    #[test]
    fn test_rank_propagates_invalid_plan() {
        let base = AdoptionModelParameters::default();
        let plans = vec![SweepPlan::new(SweepTarget::MaxShare, vec![1.08])];
        assert!(rank_impacts(&base, &plans, &SENSITIVITY_TOLL_PRICES).is_err());
    }
}
