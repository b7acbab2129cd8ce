//! Sensitivity analysis report
//!
//! Sweeps each adoption parameter over the study's value grid, ranks the
//! parameters by how far an equal ±20% change moves the share curve, and
//! builds the tornado bars at a reference toll in that ranking order.
//! Written out as
//!
//! ```text
//! sensitivity_<parameter>.csv   share curve per swept value
//! impact_ranking.csv
//! tornado.csv
//! sensitivity_report.md
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tollsim_common::{AdoptionModelParameters, Result, SweepTarget, TollsimError};
use tollsim_model::{
    rank_impacts, sweep, tornado, AdoptionModel, ImpactSummary, Perturbation,
    SensitivitySweepPoint, SweepPlan, TornadoBar, TornadoInput,
};
use tracing::{debug, info, instrument};

/// Relative change applied to every parameter for the ranking
pub const RANKING_PERTURBATION: Perturbation = Perturbation::Relative(0.2);

/// Toll the tornado bars are evaluated at (EUR)
pub const DEFAULT_REFERENCE_TOLL: f64 = 2.5;

/// Values each parameter is swept over for the curve files
pub fn study_grid(target: SweepTarget) -> Vec<f64> {
    match target {
        SweepTarget::Midpoint => vec![1.0, 1.5, 2.0, 2.5, 3.0, 3.5],
        SweepTarget::Steepness => vec![0.2, 0.3, 0.5, 0.7, 1.0, 1.5],
        SweepTarget::Baseline => vec![0.0, 0.05, 0.10, 0.15, 0.20, 0.25],
        SweepTarget::MaxShare => vec![0.70, 0.80, 0.90, 1.0],
    }
}

/// Sweep curves for one parameter
#[derive(Debug, Clone, Serialize)]
pub struct ParameterCurves {
    pub parameter: SweepTarget,
    pub points: Vec<SensitivitySweepPoint>,
}

/// Everything the sensitivity report contains
#[derive(Debug, Clone, Serialize)]
pub struct SensitivityReport {
    pub base: AdoptionModelParameters,
    pub tolls: Vec<f64>,
    pub reference_toll: f64,
    /// Slope of the base curve at its midpoint (share per EUR)
    pub transition_rate: f64,
    pub curves: Vec<ParameterCurves>,
    /// Most sensitive first
    pub ranking: Vec<ImpactSummary>,
    /// Same order as `ranking`
    pub tornado: Vec<TornadoBar>,
}

impl SensitivityReport {
    /// Run every analysis for `targets`; repeated targets are analyzed once
    #[instrument(skip(base, tolls), fields(tolls = tolls.len()))]
    pub fn build(
        base: &AdoptionModelParameters,
        targets: &[SweepTarget],
        tolls: &[f64],
        reference_toll: f64,
    ) -> Result<Self> {
        let mut unique: Vec<SweepTarget> = Vec::with_capacity(targets.len());
        for &target in targets {
            if !unique.contains(&target) {
                unique.push(target);
            }
        }
        let targets = unique.as_slice();

        let curves = targets
            .iter()
            .map(|&target| {
                let values = valid_values(base, target, &study_grid(target));
                Ok(ParameterCurves {
                    parameter: target,
                    points: sweep(base, target, &values, tolls)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let plans: Vec<SweepPlan> = targets
            .iter()
            .map(|&target| {
                let values = RANKING_PERTURBATION.values_for(base, target);
                SweepPlan::new(target, valid_values(base, target, &values))
            })
            .collect();
        let ranking = rank_impacts(base, &plans, tolls)?;

        let inputs: Vec<TornadoInput> = TornadoInput::standard_set()
            .into_iter()
            .filter(|input| targets.contains(&input.target))
            .filter(|input| {
                base.with_value(input.target, input.low).is_ok()
                    && base.with_value(input.target, input.high).is_ok()
            })
            .collect();
        let mut bars = tornado(base, reference_toll, &inputs)?;
        bars.sort_by_key(|bar| {
            ranking
                .iter()
                .position(|r| r.parameter == bar.parameter)
                .unwrap_or(usize::MAX)
        });

        info!(
            top = ?ranking.first().map(|r| r.parameter),
            "Sensitivity analysis complete"
        );

        Ok(Self {
            base: *base,
            tolls: tolls.to_vec(),
            reference_toll,
            transition_rate: AdoptionModel::new(*base).transition_rate(),
            curves,
            ranking,
            tornado: bars,
        })
    }

    /// Parameter with the highest sensitivity score
    pub fn most_sensitive(&self) -> Option<&ImpactSummary> {
        self.ranking.first()
    }

    /// Write all report files into `dir`; returns the paths written
    pub fn write(&self, dir: &Path, generated_at: DateTime<Utc>) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        for curves in &self.curves {
            let path = dir.join(format!("sensitivity_{}.csv", curves.parameter.name()));
            write_curves(&path, curves)?;
            written.push(path);
        }

        let path = dir.join("impact_ranking.csv");
        write_rows(
            &path,
            self.ranking.iter().enumerate().map(|(i, r)| RankingRow {
                rank: i + 1,
                parameter: r.parameter.label(),
                sensitivity_score: r.sensitivity_score,
            }),
        )?;
        written.push(path);

        let path = dir.join("tornado.csv");
        write_rows(
            &path,
            self.tornado.iter().map(|bar| TornadoRow {
                parameter: bar.parameter.label(),
                low_value: bar.low_value,
                high_value: bar.high_value,
                low_delta: bar.low_delta,
                high_delta: bar.high_delta,
                impact: bar.impact,
            }),
        )?;
        written.push(path);

        let path = dir.join("sensitivity_report.md");
        fs::write(&path, self.to_markdown(generated_at))?;
        written.push(path);

        info!(dir = %dir.display(), files = written.len(), "Wrote sensitivity report");
        Ok(written)
    }

    pub fn to_markdown(&self, generated_at: DateTime<Utc>) -> String {
        let mut md = String::from("# Sensitivity Analysis Report\n\n");
        let _ = writeln!(
            md,
            "Generated {}\n",
            generated_at.format("%Y-%m-%d %H:%M UTC")
        );

        md.push_str("## Base Parameters\n\n");
        let _ = writeln!(md, "- **Baseline EV Share**: {:.0}%", self.base.baseline() * 100.0);
        let _ = writeln!(md, "- **Maximum EV Share**: {:.0}%", self.base.max_share() * 100.0);
        let _ = writeln!(md, "- **Sigmoid Midpoint**: {:.2} EUR", self.base.midpoint());
        let _ = writeln!(md, "- **Steepness (k)**: {}", self.base.steepness());
        let _ = writeln!(
            md,
            "- **Transition rate at midpoint**: {:.2} percentage points per EUR\n",
            self.transition_rate * 100.0
        );

        md.push_str("## Parameter Ranking\n\n");
        md.push_str("Largest EV share change over the toll range for a ±20% parameter change.\n\n");
        md.push_str("| Rank | Parameter | Max EV Share Change |\n|---:|---|---:|\n");
        for (i, r) in self.ranking.iter().enumerate() {
            let _ = writeln!(
                md,
                "| {} | {} | {:.2} pp |",
                i + 1,
                r.parameter.label(),
                r.sensitivity_score * 100.0
            );
        }

        let _ = writeln!(
            md,
            "\n## Tornado (toll {:.2} EUR)\n",
            self.reference_toll
        );
        md.push_str("| Parameter | Low | High | Low Δ | High Δ | Impact |\n|---|---:|---:|---:|---:|---:|\n");
        for bar in &self.tornado {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {:+.2} pp | {:+.2} pp | {:.2} pp |",
                bar.parameter.label(),
                bar.low_value,
                bar.high_value,
                bar.low_delta * 100.0,
                bar.high_delta * 100.0,
                bar.impact * 100.0
            );
        }

        md.push_str("\n## Finding\n\n");
        match self.most_sensitive() {
            Some(top) => {
                let _ = writeln!(
                    md,
                    "The model is most sensitive to **{}** (up to {:.2} pp of EV share). \
                     It should be calibrated first against observed toll / EV adoption data.",
                    top.parameter.label(),
                    top.sensitivity_score * 100.0
                );
            }
            None => md.push_str("No parameters were analyzed.\n"),
        }

        md.push_str("\n## Curve Files\n\n");
        for curves in &self.curves {
            let _ = writeln!(md, "- `sensitivity_{}.csv`", curves.parameter.name());
        }
        md
    }
}

/// Values of `candidates` that keep `base` valid when substituted for `target`
fn valid_values(base: &AdoptionModelParameters, target: SweepTarget, candidates: &[f64]) -> Vec<f64> {
    candidates
        .iter()
        .copied()
        .filter(|&v| {
            let ok = base.with_value(target, v).is_ok();
            if !ok {
                debug!(parameter = %target, value = v, "Dropping value outside the valid range");
            }
            ok
        })
        .collect()
}

#[derive(Serialize)]
struct CurveRow {
    #[serde(rename = "Parameter")]
    parameter: &'static str,
    #[serde(rename = "Value")]
    value: f64,
    #[serde(rename = "Toll Price (EUR)")]
    toll_price: f64,
    #[serde(rename = "EV Share")]
    ev_share: f64,
    #[serde(rename = "ICE Share")]
    ice_share: f64,
}

#[derive(Serialize)]
struct RankingRow {
    #[serde(rename = "Rank")]
    rank: usize,
    #[serde(rename = "Parameter")]
    parameter: &'static str,
    #[serde(rename = "Sensitivity Score")]
    sensitivity_score: f64,
}

#[derive(Serialize)]
struct TornadoRow {
    #[serde(rename = "Parameter")]
    parameter: &'static str,
    #[serde(rename = "Low Value")]
    low_value: f64,
    #[serde(rename = "High Value")]
    high_value: f64,
    #[serde(rename = "Low Delta")]
    low_delta: f64,
    #[serde(rename = "High Delta")]
    high_delta: f64,
    #[serde(rename = "Impact")]
    impact: f64,
}

fn write_curves(path: &Path, curves: &ParameterCurves) -> Result<()> {
    let rows = curves.points.iter().flat_map(|point| {
        point.share_curve.iter().map(move |r| CurveRow {
            parameter: point.parameter.label(),
            value: point.perturbed_value,
            toll_price: r.toll_price,
            ev_share: r.ev_share,
            ice_share: 1.0 - r.ev_share,
        })
    });
    write_rows(path, rows)
}

fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    let csv_error = |e: csv::Error| TollsimError::Storage(format!("{}: {}", path.display(), e));
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tollsim_common::SENSITIVITY_TOLL_PRICES;

    fn report() -> SensitivityReport {
        SensitivityReport::build(
            &AdoptionModelParameters::default(),
            &SweepTarget::ALL,
            &SENSITIVITY_TOLL_PRICES,
            DEFAULT_REFERENCE_TOLL,
        )
        .unwrap()
    }

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_ranking_for_default_parameters() {
        let report = report();
        let order: Vec<SweepTarget> = report.ranking.iter().map(|r| r.parameter).collect();
        // Max share only has its -20% value (1.08 is not a probability)
        assert_eq!(
            order,
            vec![
                SweepTarget::MaxShare,
                SweepTarget::Midpoint,
                SweepTarget::Steepness,
                SweepTarget::Baseline
            ]
        );
        assert_eq!(report.most_sensitive().unwrap().parameter, SweepTarget::MaxShare);
    }

    #[test]
    fn test_tornado_follows_ranking() {
        let report = report();
        let ranked: Vec<SweepTarget> = report.ranking.iter().map(|r| r.parameter).collect();
        let bars: Vec<SweepTarget> = report.tornado.iter().map(|b| b.parameter).collect();
        assert_eq!(bars, ranked);

        let md = report.to_markdown(timestamp());
        let tornado = &md[md.find("## Tornado").unwrap()..];
        let steepness = tornado.find("| Steepness (k) |").unwrap();
        let baseline = tornado.find("| Baseline Share |").unwrap();
        assert!(steepness < baseline);
    }

    #[test]
    fn test_repeated_targets_are_analyzed_once() {
        let report = SensitivityReport::build(
            &AdoptionModelParameters::default(),
            &[SweepTarget::Midpoint, SweepTarget::Midpoint, SweepTarget::Baseline],
            &SENSITIVITY_TOLL_PRICES,
            DEFAULT_REFERENCE_TOLL,
        )
        .unwrap();
        assert_eq!(report.curves.len(), 2);
        assert_eq!(report.ranking.len(), 2);
        assert_eq!(report.tornado.len(), 2);

        let dir = tempfile::tempdir().unwrap();
        let written = report.write(dir.path(), timestamp()).unwrap();
        assert_eq!(written.len(), 2 + 3);
    }

    #[test]
    fn test_curves_follow_study_grid() {
        let report = report();
        let midpoint = report
            .curves
            .iter()
            .find(|c| c.parameter == SweepTarget::Midpoint)
            .unwrap();
        assert_eq!(midpoint.points.len(), 6);
        assert_eq!(midpoint.points[0].share_curve.len(), SENSITIVITY_TOLL_PRICES.len());
    }

    #[test]
    fn test_invalid_grid_values_are_dropped() {
        // max_share 0.2 rules out the 0.25 baseline
        let base = AdoptionModelParameters::new(0.15, 0.2, 2.5, 0.5).unwrap();
        let report =
            SensitivityReport::build(&base, &SweepTarget::ALL, &[0.0, 2.5, 5.0], 2.5).unwrap();
        let baseline = report
            .curves
            .iter()
            .find(|c| c.parameter == SweepTarget::Baseline)
            .unwrap();
        let values: Vec<f64> = baseline.points.iter().map(|p| p.perturbed_value).collect();
        assert_eq!(values, vec![0.0, 0.05, 0.10, 0.15, 0.20]);
    }

    #[test]
    fn test_single_parameter() {
        let report = SensitivityReport::build(
            &AdoptionModelParameters::default(),
            &[SweepTarget::Steepness],
            &SENSITIVITY_TOLL_PRICES,
            DEFAULT_REFERENCE_TOLL,
        )
        .unwrap();
        assert_eq!(report.curves.len(), 1);
        assert_eq!(report.ranking.len(), 1);
        assert_eq!(report.tornado.len(), 1);
    }

    #[test]
    fn test_markdown_names_top_parameter() {
        let md = report().to_markdown(timestamp());
        assert!(md.starts_with("# Sensitivity Analysis Report"));
        assert!(md.contains("Generated 2025-01-15 09:30 UTC"));
        assert!(md.contains("most sensitive to **Max Share**"));
        assert!(md.contains("| 2 | Midpoint |"));
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let written = report().write(dir.path(), timestamp()).unwrap();
        assert_eq!(written.len(), 4 + 3);

        let ranking = fs::read_to_string(dir.path().join("impact_ranking.csv")).unwrap();
        let mut lines = ranking.lines();
        assert_eq!(lines.next().unwrap(), "Rank,Parameter,Sensitivity Score");
        assert!(lines.next().unwrap().starts_with("1,Max Share,"));

        let curves = fs::read_to_string(dir.path().join("sensitivity_midpoint.csv")).unwrap();
        // header + 6 values × 11 tolls
        assert_eq!(curves.lines().count(), 1 + 6 * 11);

        let tornado = fs::read_to_string(dir.path().join("tornado.csv")).unwrap();
        assert!(tornado.starts_with("Parameter,Low Value,High Value,Low Delta,High Delta,Impact"));
    }
}
