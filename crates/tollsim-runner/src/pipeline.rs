//! Study pipeline: generate → simulate → analyze

use crate::scenario::{parse_tripinfo_file_name, GeneratedScenario, ScenarioGenerator};
use crate::simulator::{SimulationEngine, SimulationRun};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tollsim_common::{
    AdoptionModelParameters, Result, StudyConfig, TollScenario, TollsimError,
};
use tollsim_kpi::{aggregate_file, ResultsTable};
use tracing::{debug, info, instrument, warn};

pub const RESULTS_CSV: &str = "simulation_results.csv";
pub const RESULTS_REPORT: &str = "simulation_report.md";

/// A generated scenario and its completed simulation
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioRun {
    pub scenario: GeneratedScenario,
    pub simulation: SimulationRun,
}

/// One configured study
#[derive(Debug, Clone)]
pub struct Study {
    config: StudyConfig,
    params: AdoptionModelParameters,
}

impl Study {
    pub fn new(config: StudyConfig) -> Result<Self> {
        config.validate()?;
        let params = config.adoption.params()?;
        Ok(Self { config, params })
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub fn params(&self) -> &AdoptionModelParameters {
        &self.params
    }

    pub fn generator(&self) -> ScenarioGenerator {
        ScenarioGenerator::new(self.params, self.config.scenario.clone())
    }

    pub fn generate(&self, scenario: &TollScenario) -> Result<GeneratedScenario> {
        self.generator().generate(scenario)
    }

    /// Generate and simulate every scenario, `jobs` simulations at a time
    ///
    /// Stops at the first failure. Runs come back sorted by toll price.
    #[instrument(skip(self, engine, scenarios), fields(scenarios = scenarios.len()))]
    pub async fn run_all<E>(&self, engine: &E, scenarios: &[TollScenario]) -> Result<Vec<ScenarioRun>>
    where
        E: SimulationEngine + ?Sized,
    {
        let generator = self.generator();
        let generated = scenarios
            .iter()
            .map(|s| generator.generate(s))
            .collect::<Result<Vec<_>>>()?;

        let jobs = self.config.simulator.jobs.max(1);
        info!(jobs, "Running simulations");

        let mut runs: Vec<ScenarioRun> = stream::iter(generated)
            .map(|scenario| async move {
                let simulation = engine.run(&scenario.config_file).await?;
                debug!(scenario = %scenario.name, elapsed_ms = simulation.elapsed_ms, "Scenario simulated");
                Ok::<_, TollsimError>(ScenarioRun {
                    scenario,
                    simulation,
                })
            })
            .buffer_unordered(jobs)
            .try_collect()
            .await?;

        runs.sort_by(|a, b| a.scenario.toll_price.total_cmp(&b.scenario.toll_price));
        info!(completed = runs.len(), "All scenarios simulated");
        Ok(runs)
    }

    /// Aggregate every `tripinfo_toll_<x>.xml` in the scenario directory
    ///
    /// A log that cannot be read to the end (missing, broken or truncated XML)
    /// drops its whole scenario from the table, including any records before
    /// the damage.
    #[instrument(skip(self), fields(dir = %self.config.scenario.output_dir.display()))]
    pub fn analyze(&self) -> Result<ResultsTable> {
        let dir = &self.config.scenario.output_dir;
        let entries = fs::read_dir(dir).map_err(|e| {
            TollsimError::Storage(format!("cannot read {}: {}", dir.display(), e))
        })?;

        let mut logs: Vec<(TollScenario, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            if let Some(scenario) = file_name.to_str().and_then(parse_tripinfo_file_name) {
                logs.push((scenario, entry.path()));
            }
        }
        logs.sort_by(|a, b| a.0.toll_price().total_cmp(&b.0.toll_price()));

        let mut table = ResultsTable::new();
        for (scenario, path) in logs {
            info!(scenario = %scenario.name(), "Analyzing scenario");
            match aggregate_file(&path, scenario.toll_price(), &self.config.kpi) {
                Ok(kpis) => table.insert(kpis),
                Err(err) => warn!(
                    scenario = %scenario.name(),
                    path = %path.display(),
                    error = %err,
                    "Trip log unreadable; scenario dropped from results"
                ),
            }
        }
        Ok(table)
    }
}

/// Write the results table as CSV and Markdown into `dir`
pub fn write_results(table: &ResultsTable, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)?;
    let csv_path = dir.join(RESULTS_CSV);
    table.write_csv(&csv_path)?;
    let report_path = dir.join(RESULTS_REPORT);
    fs::write(&report_path, table.to_markdown())?;
    Ok((csv_path, report_path))
}
