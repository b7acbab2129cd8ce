//! Study configuration
//!
//! Every computation receives its configuration by value; nothing here is
//! global. Values come from defaults, an optional JSON file, and `TOLLSIM_*`
//! environment variables (a `.env` file is honoured).

use crate::error::{ModelError, Result, TollsimError};
use crate::types::adoption::{AdoptionModelParameters, AdoptionPreset};
use crate::types::scenario::TollScenario;
use crate::types::vehicle::LabelingPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Complete study configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Adoption curve settings
    pub adoption: AdoptionSettings,
    /// KPI conversion settings
    pub kpi: KpiConfig,
    /// Scenario generation settings
    pub scenario: ScenarioSettings,
    /// External simulator settings
    pub simulator: SimulatorSettings,
}

impl StudyConfig {
    /// Load configuration from `.env` and the process environment
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a JSON config file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let content = std::fs::read_to_string(path).map_err(|e| {
            TollsimError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut cfg: Self = serde_json::from_str(&content).map_err(|e| {
            TollsimError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `TOLLSIM_*` overrides from a key lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Adoption settings
        override_from(&lookup, "TOLLSIM_PRESET", &mut self.adoption.preset);
        override_opt(&lookup, "TOLLSIM_BASELINE", &mut self.adoption.baseline);
        override_opt(&lookup, "TOLLSIM_MAX_SHARE", &mut self.adoption.max_share);
        override_opt(&lookup, "TOLLSIM_MIDPOINT", &mut self.adoption.midpoint);
        override_opt(&lookup, "TOLLSIM_STEEPNESS", &mut self.adoption.steepness);

        // KPI settings
        override_from(
            &lookup,
            "TOLLSIM_GRID_COST_PER_KWH",
            &mut self.kpi.grid_cost_per_kwh,
        );

        // Scenario settings
        if let Some(val) = lookup("TOLLSIM_ROUTES_FILE") {
            self.scenario.base_routes_file = PathBuf::from(val);
        }
        if let Some(val) = lookup("TOLLSIM_NET_FILE") {
            self.scenario.net_file = PathBuf::from(val);
        }
        if let Some(val) = lookup("TOLLSIM_SCENARIOS_DIR") {
            self.scenario.output_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("TOLLSIM_TOLL_PRICES") {
            match parse_price_list(&val) {
                Some(prices) => self.scenario.toll_prices = prices,
                None => warn!(value = %val, "Ignoring unparseable TOLLSIM_TOLL_PRICES"),
            }
        }
        override_from(&lookup, "TOLLSIM_SEED", &mut self.scenario.seed);
        override_from(&lookup, "TOLLSIM_LABELING", &mut self.scenario.labeling);

        // Simulator settings
        if let Some(val) = lookup("TOLLSIM_SUMO_BIN") {
            self.simulator.binary = val;
        }
        override_from(
            &lookup,
            "TOLLSIM_SIM_TIMEOUT_SECS",
            &mut self.simulator.timeout_secs,
        );
        override_from(&lookup, "TOLLSIM_JOBS", &mut self.simulator.jobs);
    }

    /// Check every setting up front
    pub fn validate(&self) -> Result<()> {
        self.adoption.params()?;

        if !self.kpi.grid_cost_per_kwh.is_finite() || self.kpi.grid_cost_per_kwh < 0.0 {
            return Err(TollsimError::Config(format!(
                "grid_cost_per_kwh must be non-negative, got {}",
                self.kpi.grid_cost_per_kwh
            )));
        }
        for price in &self.scenario.toll_prices {
            TollScenario::new(*price)?;
        }
        if self.scenario.begin >= self.scenario.end {
            return Err(TollsimError::Config(format!(
                "simulation window is empty: begin {} >= end {}",
                self.scenario.begin, self.scenario.end
            )));
        }
        if self.scenario.step_length.is_nan() || self.scenario.step_length <= 0.0 {
            return Err(TollsimError::Config(format!(
                "step_length must be positive, got {}",
                self.scenario.step_length
            )));
        }
        if self.simulator.jobs == 0 {
            return Err(TollsimError::Config("jobs must be at least 1".into()));
        }
        Ok(())
    }

    /// Validated toll scenarios in configured order
    pub fn scenarios(&self) -> Result<Vec<TollScenario>> {
        self.scenario
            .toll_prices
            .iter()
            .map(|p| TollScenario::new(*p).map_err(TollsimError::from))
            .collect()
    }
}

/// Adoption curve settings: a preset plus optional per-parameter overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdoptionSettings {
    /// Named parameter set the overrides apply to
    pub preset: AdoptionPreset,
    pub baseline: Option<f64>,
    pub max_share: Option<f64>,
    pub midpoint: Option<f64>,
    pub steepness: Option<f64>,
}

impl AdoptionSettings {
    /// Resolve the preset and overrides into validated parameters
    pub fn params(&self) -> std::result::Result<AdoptionModelParameters, ModelError> {
        let base = self.preset.params();
        AdoptionModelParameters::new(
            self.baseline.unwrap_or(base.baseline()),
            self.max_share.unwrap_or(base.max_share()),
            self.midpoint.unwrap_or(base.midpoint()),
            self.steepness.unwrap_or(base.steepness()),
        )
    }
}

/// KPI conversion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiConfig {
    /// Grid electricity price (EUR per kWh)
    pub grid_cost_per_kwh: f64,
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self {
            grid_cost_per_kwh: crate::DEFAULT_GRID_COST_PER_KWH,
        }
    }
}

/// Scenario generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSettings {
    /// Route file with untyped vehicles
    pub base_routes_file: PathBuf,
    /// Network file referenced by generated configs
    pub net_file: PathBuf,
    /// Directory for generated routes, configs and tripinfo output
    pub output_dir: PathBuf,
    /// Simulation begin (seconds of day)
    pub begin: u32,
    /// Simulation end (seconds of day)
    pub end: u32,
    /// Simulation step length (seconds)
    pub step_length: f64,
    /// Toll prices to evaluate (EUR)
    pub toll_prices: Vec<f64>,
    /// Study seed; each scenario derives its own stream from it
    pub seed: u64,
    /// Vehicle labeling policy
    pub labeling: LabelingPolicy,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            base_routes_file: PathBuf::from("routes_vci_generated.xml"),
            net_file: PathBuf::from("vci.net.xml"),
            output_dir: PathBuf::from("scenarios"),
            begin: crate::DEFAULT_SIM_BEGIN,
            end: crate::DEFAULT_SIM_END,
            step_length: 1.0,
            toll_prices: crate::DEFAULT_TOLL_PRICES.to_vec(),
            seed: crate::DEFAULT_SEED,
            labeling: LabelingPolicy::default(),
        }
    }
}

/// External simulator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Simulator executable
    pub binary: String,
    /// Per-run timeout in seconds
    pub timeout_secs: u64,
    /// Scenarios simulated concurrently
    pub jobs: usize,
    /// Extra arguments appended to every invocation
    pub extra_args: Vec<String>,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            binary: "sumo".to_string(),
            timeout_secs: 3600,
            jobs: 1,
            extra_args: Vec::new(),
        }
    }
}

fn override_from<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(val) = lookup(key) {
        match val.parse() {
            Ok(v) => *slot = v,
            Err(_) => warn!(key, value = %val, "Ignoring unparseable override"),
        }
    }
}

fn override_opt<F>(lookup: &F, key: &str, slot: &mut Option<f64>)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(key) {
        match val.parse() {
            Ok(v) => *slot = Some(v),
            Err(_) => warn!(key, value = %val, "Ignoring unparseable override"),
        }
    }
}

fn parse_price_list(raw: &str) -> Option<Vec<f64>> {
    raw.split(',')
        .map(|p| p.trim().parse::<f64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = StudyConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.kpi.grid_cost_per_kwh, 0.20);
        assert_eq!(cfg.adoption.params().unwrap(), AdoptionModelParameters::default());
        assert_eq!(cfg.scenario.toll_prices.len(), 7);
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = StudyConfig::default();
        cfg.apply_env(lookup_from(&[
            ("TOLLSIM_PRESET", "zero_baseline"),
            ("TOLLSIM_STEEPNESS", "0.8"),
            ("TOLLSIM_GRID_COST_PER_KWH", "0.35"),
            ("TOLLSIM_TOLL_PRICES", "0, 1.5,3"),
            ("TOLLSIM_LABELING", "exact"),
            ("TOLLSIM_JOBS", "4"),
        ]));

        let params = cfg.adoption.params().unwrap();
        assert_eq!(params.baseline(), 0.0);
        assert_eq!(params.midpoint(), 1.5);
        assert_eq!(params.steepness(), 0.8);
        assert_eq!(cfg.kpi.grid_cost_per_kwh, 0.35);
        assert_eq!(cfg.scenario.toll_prices, vec![0.0, 1.5, 3.0]);
        assert_eq!(cfg.scenario.labeling, LabelingPolicy::Exact);
        assert_eq!(cfg.simulator.jobs, 4);
    }

    #[test]
    fn test_unparseable_override_is_ignored() {
        let mut cfg = StudyConfig::default();
        cfg.apply_env(lookup_from(&[("TOLLSIM_SEED", "lots"), ("TOLLSIM_TOLL_PRICES", "1,x")]));
        assert_eq!(cfg.scenario.seed, crate::DEFAULT_SEED);
        assert_eq!(cfg.scenario.toll_prices, crate::DEFAULT_TOLL_PRICES.to_vec());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = StudyConfig::default();
        cfg.adoption.baseline = Some(0.95);
        assert!(matches!(cfg.validate(), Err(TollsimError::Model(_))));

        let mut cfg = StudyConfig::default();
        cfg.scenario.toll_prices = vec![1.0, -2.0];
        assert!(cfg.validate().is_err());

        let mut cfg = StudyConfig::default();
        cfg.simulator.jobs = 0;
        assert!(matches!(cfg.validate(), Err(TollsimError::Config(_))));
    }

    #[test]
    fn test_from_file_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.json");
        std::fs::write(
            &path,
            r#"{"adoption":{"midpoint":3.0},"scenario":{"toll_prices":[1.0,2.0]}}"#,
        )
        .unwrap();

        let cfg = StudyConfig::from_file(&path).unwrap();
        assert_eq!(cfg.adoption.params().unwrap().midpoint(), 3.0);
        assert_eq!(cfg.kpi.grid_cost_per_kwh, 0.20);
        assert_eq!(cfg.scenarios().unwrap().len(), 2);
    }
}
