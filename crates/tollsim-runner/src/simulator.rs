//! External traffic simulator invocation
//!
//! The study only needs "run this config to completion"; everything else
//! about the simulator stays behind [`SimulationEngine`].

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tollsim_common::{Result, SimulationError, SimulatorSettings};
use tracing::{debug, info, instrument, warn};

/// Lines of simulator stderr kept in a failure report
const STDERR_TAIL_LINES: usize = 20;

/// Outcome of one completed simulator run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRun {
    pub config_file: PathBuf,
    pub elapsed_ms: u64,
}

/// Runs one scenario config to completion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SimulationEngine: Send + Sync {
    async fn run(&self, config_file: &Path) -> Result<SimulationRun>;
}

/// SUMO command-line simulator
#[derive(Debug, Clone)]
pub struct SumoEngine {
    binary: String,
    timeout: Duration,
    extra_args: Vec<String>,
}

impl SumoEngine {
    pub fn new(settings: &SimulatorSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            extra_args: settings.extra_args.clone(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn command(&self, config_file: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-c")
            .arg(config_file)
            .args(["--xml-validation", "never"])
            .args(&self.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl SimulationEngine for SumoEngine {
    #[instrument(skip(self), fields(binary = %self.binary))]
    async fn run(&self, config_file: &Path) -> Result<SimulationRun> {
        if !config_file.is_file() {
            return Err(SimulationError::MissingConfig(config_file.to_path_buf()).into());
        }

        let started = Instant::now();
        let child = self.command(config_file).spawn().map_err(|e| SimulationError::Spawn {
            binary: self.binary.clone(),
            reason: e.to_string(),
        })?;
        debug!(pid = ?child.id(), "Simulator started");

        // Dropping the wait future on timeout kills the child
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| SimulationError::Failed {
                code: None,
                stderr: e.to_string(),
            })?,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Simulator timed out");
                return Err(SimulationError::Timeout {
                    secs: self.timeout.as_secs(),
                }
                .into());
            }
        };

        if !output.status.success() {
            return Err(SimulationError::Failed {
                code: output.status.code(),
                stderr: stderr_tail(&output.stderr),
            }
            .into());
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(elapsed_ms, "Simulation finished");
        Ok(SimulationRun {
            config_file: config_file.to_path_buf(),
            elapsed_ms,
        })
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollsim_common::TollsimError;

    fn engine(binary: &str, timeout_secs: u64) -> SumoEngine {
        SumoEngine::new(&SimulatorSettings {
            binary: binary.to_string(),
            timeout_secs,
            ..Default::default()
        })
    }

    fn config_in(dir: &Path) -> PathBuf {
        let path = dir.join("config_toll_1_0.sumo.cfg");
        std::fs::write(&path, "<configuration/>").unwrap();
        path
    }

    #[test]
    fn test_command_line() {
        let cmd = engine("sumo", 10).command(Path::new("scenarios/config_toll_1_0.sumo.cfg"));
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "sumo");
        let args: Vec<_> = std_cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "-c",
                "scenarios/config_toll_1_0.sumo.cfg",
                "--xml-validation",
                "never"
            ]
        );
    }

    #[test]
    fn test_stderr_tail() {
        let stderr: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(stderr.as_bytes());
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
    }

    #[tokio::test]
    async fn test_missing_config() {
        let err = engine("sumo", 10)
            .run(Path::new("/nonexistent/config_toll_0_0.sumo.cfg"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TollsimError::Simulation(SimulationError::MissingConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = engine("/nonexistent/bin/sumo", 10)
            .run(&config_in(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TollsimError::Simulation(SimulationError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_and_failure_exit() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let run = engine("true", 10).run(&config).await.unwrap();
        assert_eq!(run.config_file, config);

        let err = engine("false", 10).run(&config).await.unwrap_err();
        assert!(matches!(
            err,
            TollsimError::Simulation(SimulationError::Failed { code: Some(1), .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-sumo");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let slow = SumoEngine {
            binary: script.to_string_lossy().into_owned(),
            timeout: Duration::from_millis(200),
            extra_args: Vec::new(),
        };
        let err = slow.run(&config_in(dir.path())).await.unwrap_err();
        assert!(matches!(
            err,
            TollsimError::Simulation(SimulationError::Timeout { .. })
        ));
    }
}
