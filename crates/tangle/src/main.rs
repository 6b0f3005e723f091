use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::debug;

use tangle_core::config::{Config, JobSpec};
use tangle_core::logging::{self, LogLevel};
use tangle_core::{run_all, ExportFormat, Language};

const CONFIG_FILE: &str = "tangle.toml";

#[derive(Parser)]
#[command(name = "tangle")]
#[command(about = "Build dependency graphs of a code base and measure its modularity")]
#[command(version)]
struct Cli {
    /// error, warn, info, debug or trace. Overrides the config's loglevel.
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every analysis of a config file
    Run {
        /// Path to tangle.toml
        config: PathBuf,
    },
    /// File scan of one directory with every metric enabled
    Scan {
        /// Directory to analyze
        path: PathBuf,
        /// Restrict to these languages (repeatable)
        #[arg(short, long)]
        language: Vec<Language>,
        /// Output formats, comma separated
        #[arg(
            short,
            long,
            value_delimiter = ',',
            default_value = "tabular_console_overall"
        )]
        format: Vec<ExportFormat>,
        /// Directory for file exports
        #[arg(short, long, default_value = "tangle-out")]
        output: PathBuf,
    },
    /// Create a default tangle.toml in the current directory
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Whether every job and export of a command succeeded.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Success,
    Failed,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config } => cmd_run(&config, cli.log_level),
        Commands::Scan {
            path,
            language,
            format,
            output,
        } => cmd_scan(&path, language, format, output, cli.log_level),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::Failed) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn cmd_run(config_path: &Path, log_level: Option<LogLevel>) -> Result<Outcome> {
    let config = Config::load(config_path)?;
    logging::init(log_level.unwrap_or(config.loglevel));

    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let jobs = config
        .validate(base_dir)
        .with_context(|| format!("invalid configuration in {}", config_path.display()))?;
    debug!(config = %config_path.display(), jobs = jobs.len(), "configuration validated");
    Ok(execute(&jobs))
}

fn cmd_scan(
    path: &Path,
    languages: Vec<Language>,
    formats: Vec<ExportFormat>,
    output: PathBuf,
    log_level: Option<LogLevel>,
) -> Result<Outcome> {
    logging::init(log_level.unwrap_or_default());
    let languages: BTreeSet<Language> = languages.into_iter().collect();
    let job = JobSpec::for_directory(path, languages, output, formats)?;
    Ok(execute(std::slice::from_ref(&job)))
}

fn cmd_init(force: bool) -> Result<Outcome> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())
        .with_context(|| format!("failed to write {CONFIG_FILE}"))?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(Outcome::Success)
}

/// Run jobs concurrently, then export their snapshots in job order.
fn execute(jobs: &[JobSpec]) -> Outcome {
    let mut outcome = Outcome::Success;
    let stdout = io::stdout();
    let mut console = stdout.lock();

    for (job, result) in jobs.iter().zip(run_all(jobs)) {
        let snapshots = match result {
            Ok(snapshots) => snapshots,
            Err(e) => {
                eprintln!(
                    "{} analysis '{}' failed: {:#}",
                    "Error:".red().bold(),
                    job.analysis_name,
                    anyhow::Error::from(e)
                );
                outcome = Outcome::Failed;
                continue;
            }
        };
        for snapshot in &snapshots {
            let exports = tangle_export::write_all(
                snapshot,
                &job.export_formats,
                &job.export_directory,
                &mut console,
            );
            for export in exports {
                if let Err(e) = export.result {
                    eprintln!("{} {e}", "Error:".red().bold());
                    outcome = Outcome::Failed;
                }
            }
        }
    }
    outcome
}
