//! tollsim - toll pricing / EV adoption study runner

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tollsim_common::{StudyConfig, SweepTarget, TollScenario, DEFAULT_FLEET_SIZE, VERSION};
use tollsim_model::{project, revenue_maximizing_toll, AdoptionModel};
use tollsim_runner::{
    sensitivity_report::DEFAULT_REFERENCE_TOLL, write_results, SensitivityReport, Study,
    SumoEngine,
};

#[derive(Parser, Debug)]
#[command(name = "tollsim", version, about = "Toll pricing / EV adoption study")]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[arg(long, global = true, help = "JSON study configuration file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Expected EV share at one or more toll prices
    Share {
        #[arg(long, required = true, num_args = 1.., allow_negative_numbers = true)]
        toll: Vec<f64>,
    },
    /// Simulator-free CO2 and revenue projection
    Project {
        #[arg(long, required = true, num_args = 1.., allow_negative_numbers = true)]
        toll: Vec<f64>,
        #[arg(long, default_value_t = DEFAULT_FLEET_SIZE)]
        fleet: u64,
    },
    /// Write the route file and simulator config for one toll price
    Generate {
        #[arg(long, allow_negative_numbers = true)]
        toll: f64,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Generate and simulate scenarios (all configured tolls by default)
    Run {
        #[arg(long, num_args = 1.., allow_negative_numbers = true)]
        toll: Vec<f64>,
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Aggregate trip logs in the scenario directory into the results table
    Analyze {
        #[arg(long, default_value = ".")]
        results_dir: PathBuf,
    },
    /// Sweep adoption parameters and write the sensitivity report
    Sensitivity {
        #[arg(long, default_value = "sensitivity_results")]
        output_dir: PathBuf,
        #[arg(long = "parameter", help = "Restrict to these parameters (repeatable)")]
        parameters: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_REFERENCE_TOLL)]
        reference_toll: f64,
    },
}

#[derive(Serialize)]
struct JsonOut<T: Serialize> {
    ok: bool,
    data: T,
}

fn print_out<T: Serialize>(json: bool, data: &[T], row: impl Fn(&T) -> String) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        for d in data {
            println!("{}", row(d));
        }
    }
    Ok(())
}

fn print_one<T: Serialize>(json: bool, data: T, row: impl Fn(&T) -> String) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

fn scenarios_from(tolls: &[f64]) -> Result<Vec<TollScenario>> {
    tolls
        .iter()
        .map(|&t| TollScenario::new(t).map_err(anyhow::Error::from))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => StudyConfig::from_file(path)?,
        None => StudyConfig::load()?,
    };
    info!("tollsim v{}", VERSION);

    match cli.command {
        Commands::Share { toll } => {
            let model = AdoptionModel::new(config.adoption.params()?);
            let results: Vec<_> = scenarios_from(&toll)?
                .iter()
                .map(|s| model.evaluate_scenario(s))
                .collect();
            print_out(cli.json, &results, |r| {
                format!(
                    "{:>6.2} EUR  EV share {:>6.2}%",
                    r.toll_price,
                    r.ev_share * 100.0
                )
            })?;
        }
        Commands::Project { toll, fleet } => {
            let params = config.adoption.params()?;
            let tolls: Vec<f64> = scenarios_from(&toll)?
                .iter()
                .map(|s| s.toll_price())
                .collect();
            let outcomes: Vec<_> = tolls.iter().map(|&t| project(t, &params, fleet)).collect();
            print_out(cli.json, &outcomes, |o| {
                format!(
                    "{:>6.2} EUR  EV {:>6.2}%  CO2 factor {:.3}  revenue {:>10.2} EUR",
                    o.toll_price,
                    o.ev_share * 100.0,
                    o.co2_factor,
                    o.expected_revenue
                )
            })?;
            if !cli.json {
                if let Some(best) = revenue_maximizing_toll(&tolls, &params, fleet) {
                    println!("Revenue peaks at {:.2} EUR", best.toll_price);
                }
            }
        }
        Commands::Generate { toll, seed } => {
            if let Some(seed) = seed {
                config.scenario.seed = seed;
            }
            let study = Study::new(config)?;
            let generated = study.generate(&TollScenario::new(toll)?)?;
            print_one(cli.json, generated, |g| {
                format!(
                    "{}: EV share {:.2}%, {} of {} vehicles EV\n  routes: {}\n  config: {}",
                    g.name,
                    g.ev_share * 100.0,
                    g.ev_count,
                    g.vehicles,
                    g.routes_file.display(),
                    g.config_file.display()
                )
            })?;
        }
        Commands::Run { toll, jobs } => {
            if let Some(jobs) = jobs {
                config.simulator.jobs = jobs;
            }
            let study = Study::new(config)?;
            let scenarios = if toll.is_empty() {
                study.config().scenarios()?
            } else {
                scenarios_from(&toll)?
            };
            let engine = SumoEngine::new(&study.config().simulator);
            let runs = study.run_all(&engine, &scenarios).await?;
            print_out(cli.json, &runs, |r| {
                format!(
                    "{}: done in {:.1}s -> {}",
                    r.scenario.name,
                    r.simulation.elapsed_ms as f64 / 1000.0,
                    r.scenario.tripinfo_file.display()
                )
            })?;
        }
        Commands::Analyze { results_dir } => {
            let study = Study::new(config)?;
            let table = study.analyze()?;
            let saved = if table.is_empty() {
                None
            } else {
                Some(write_results(&table, &results_dir)?)
            };

            if cli.json {
                print_out(true, table.rows(), |_| String::new())?;
            } else if let Some((csv, report)) = saved {
                print!("{}", table.to_markdown());
                println!("\nResults saved to {}", csv.display());
                println!("Report saved to {}", report.display());
            } else {
                println!("No results found.");
            }
        }
        Commands::Sensitivity {
            output_dir,
            parameters,
            reference_toll,
        } => {
            let targets: Vec<SweepTarget> = if parameters.is_empty() {
                SweepTarget::ALL.to_vec()
            } else {
                parameters
                    .iter()
                    .map(|p| p.parse::<SweepTarget>())
                    .collect::<std::result::Result<_, _>>()?
            };
            TollScenario::new(reference_toll)?;

            let params = config.adoption.params()?;
            let report = SensitivityReport::build(
                &params,
                &targets,
                &tollsim_common::SENSITIVITY_TOLL_PRICES,
                reference_toll,
            )?;
            let written = report.write(&output_dir, chrono::Utc::now())?;

            if cli.json {
                print_one(cli.json, &report, |_| String::new())?;
            } else {
                println!("Sensitivity ranking (most to least impactful):");
                for (i, r) in report.ranking.iter().enumerate() {
                    println!(
                        "  {}. {:<14} {:.2} pp",
                        i + 1,
                        r.parameter.label(),
                        r.sensitivity_score * 100.0
                    );
                }
                for path in written {
                    println!("Saved: {}", path.display());
                }
            }
        }
    }

    Ok(())
}
