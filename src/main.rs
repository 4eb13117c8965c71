use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, trace};

use patternflow::config::{ConfigLoader, EngineConfig};
use patternflow::core::{parse_constraint_string, Constraint, MetaFile};
use patternflow::dataset::{DataSet, PatternDataSet};
use patternflow::patterns::PatternGenerator;
use patternflow::pipeline::{PipelineDefinition, PipelineRunner};
use patternflow::subprocess::SubprocessManager;

/// Build batch scripts from file-pattern pipelines
#[derive(Parser)]
#[command(name = "patternflow")]
#[command(about = "Match files by pattern and generate the commands that process them", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute every step of a pipeline definition
    Run {
        /// Pipeline definition (YAML)
        pipeline: PathBuf,

        /// Log the generated scripts instead of running them
        #[arg(long)]
        simulate: bool,
    },
    /// Summarise the files and attribute values matching a pattern
    Scan {
        /// Path template, e.g. /data/%model%/%variable%.nc
        pattern: String,

        /// Restrictions such as "model = ACCESS1-0, MIROC5; variable = pr"
        #[arg(long)]
        constraint: Option<String>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the output template for a destination and layout
    Pattern {
        #[arg(long)]
        destination: String,

        #[arg(long, default_value = "default")]
        layout: String,
    },
}

#[derive(Serialize)]
struct ScanSummary {
    pattern: String,
    constraints: Vec<Constraint>,
    files: Vec<MetaFile>,
}

fn main() {
    let cli = Cli::parse();

    let config = ConfigLoader::new();
    let config = match &cli.config {
        Some(path) => config.with_path(path),
        None => config,
    }
    .load();

    let log_level = match (cli.verbose, &config) {
        (0, Ok(EngineConfig { log_level: Some(level), .. })) => level.clone(),
        (0, _) => "info".to_string(),
        (1, _) => "debug".to_string(),
        (2, _) => "trace".to_string(),
        _ => "trace,globset=debug".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .with_line_number(cli.verbose >= 3)
        .init();

    debug!("patternflow started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = config
        .context("failed to load configuration")
        .and_then(|config| run_command(cli.command, config));

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run_command(command: Commands, config: EngineConfig) -> anyhow::Result<()> {
    match command {
        Commands::Run { pipeline, simulate } => run_pipeline(pipeline, simulate, config),
        Commands::Scan {
            pattern,
            constraint,
            json,
        } => run_scan(&pattern, constraint.as_deref(), json),
        Commands::Pattern {
            destination,
            layout,
        } => {
            let generator = PatternGenerator::from_names(&destination, &layout, &config)?;
            println!("{}", generator.pattern());
            Ok(())
        }
    }
}

fn run_pipeline(path: PathBuf, simulate: bool, config: EngineConfig) -> anyhow::Result<()> {
    let definition = PipelineDefinition::from_path(&path)
        .with_context(|| format!("failed to load pipeline {}", path.display()))?;

    let config = if simulate { config.with_simulate(true) } else { config };
    let runner = PipelineRunner::new(config, SubprocessManager::production());
    let report = runner.run(&definition)?;

    for step in &report.steps {
        println!(
            "{}: {} commands, {} outputs{}",
            step.name,
            step.commands,
            step.outputs,
            if step.simulated { " (simulated)" } else { "" }
        );
    }
    Ok(())
}

fn run_scan(pattern: &str, constraint: Option<&str>, json: bool) -> anyhow::Result<()> {
    let restrictions = match constraint {
        Some(text) => parse_constraint_string(text)?,
        None => Vec::new(),
    };
    let dataset = PatternDataSet::new(pattern, restrictions)?;

    let summary = ScanSummary {
        pattern: pattern.to_string(),
        constraints: dataset.constraints().into_iter().collect(),
        files: dataset.files(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Pattern: {}", summary.pattern);
    println!("Constraints:");
    for constraint in &summary.constraints {
        println!(
            "  {}: {}",
            constraint.key(),
            constraint.values().iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    println!("Files ({}):", summary.files.len());
    for file in &summary.files {
        println!("  {}", file.path_string());
    }
    Ok(())
}
