//! is-healthy
//!
//! Reads a Kubernetes object or cloud resource document (YAML or JSON) from
//! stdin and prints its health verdict.
//!
//! Exit codes: 0 healthy or undecided, 1 unhealthy, 2 warning, 3 processing error.

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use health_lib::{EngineMetrics, Health, HealthEvaluator, Resource, Settings, StructuredLogger};
use serde_json::Value;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXIT_UNHEALTHY: u8 = 1;
const EXIT_WARNING: u8 = 2;
const EXIT_ERROR: u8 = 3;

/// Health verdicts for Kubernetes and cloud resources
#[derive(Parser)]
#[command(name = "is-healthy")]
#[command(author, version, about = "Health verdicts for Kubernetes and cloud resources", long_about = None)]
pub struct Cli {
    /// Print the verdict as JSON
    #[arg(long, short = 'j')]
    pub json: bool,

    /// Config type of the document (e.g. AWS::EC2::Instance); Kubernetes objects need none
    #[arg(long)]
    pub config_type: Option<String>,

    /// State reported for the resource, used with --config-type
    #[arg(long = "state")]
    pub states: Vec<String>,

    /// Settings file; HEALTH_* environment variables take precedence
    #[arg(long, env = "IS_HEALTHY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print Prometheus metrics to stderr after the verdict
    #[arg(long)]
    pub metrics: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the resource types with a built-in check or a status map
    SupportedTypes,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(io::stderr)).init();
    }
}

fn exit_code(health: Health) -> ExitCode {
    if health.is_worse_than(Health::Unhealthy) {
        ExitCode::from(EXIT_UNHEALTHY)
    } else if health.is_worse_than(Health::Warning) {
        ExitCode::from(EXIT_WARNING)
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let settings = Settings::load_from(cli.config.as_deref()).context("failed to load settings")?;
    let metrics = EngineMetrics::new();
    let evaluator = HealthEvaluator::new(settings)?.with_metrics(metrics.clone());

    if let Some(Commands::SupportedTypes) = cli.command {
        output::print_supported_types(&evaluator.supported_types(), cli.json)?;
        return Ok(ExitCode::SUCCESS);
    }

    let logger = StructuredLogger::new("cli");
    logger.log_startup(env!("CARGO_PKG_VERSION"), evaluator.status_maps().len());

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;

    let verdict = match &cli.config_type {
        Some(config_type) => {
            let document: Value =
                serde_yaml::from_str(&input).context("failed to parse document")?;
            let states: Vec<&str> = cli.states.iter().map(String::as_str).collect();
            info!(config_type = %config_type, "Evaluating config item");
            evaluator.evaluate_config_type(config_type, &document, &states)
        }
        None => {
            let resource = Resource::from_yaml(&input).context("failed to parse document")?;
            let assessment = evaluator.evaluate(&resource, None);
            logger.log_evaluation(
                resource.kind(),
                resource.name(),
                resource.namespace(),
                &assessment.health,
            );
            if let Some(error) = assessment.error {
                logger.log_error(resource.kind(), resource.name(), &error);
                return Err(error.into());
            }
            assessment.health
        }
    };

    output::print_verdict(&verdict, cli.json)?;
    if cli.metrics {
        eprint!("{}", metrics.render());
    }
    Ok(exit_code(verdict.health))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            output::print_error(&format!("{e:#}"), cli.json);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
