//! TCO Estimator
//!
//! Command-line front end for the estimator engine. Reads an estimate
//! request as JSON, sizes and prices it, and prints the report on stdout.
//! Logs go to stderr.

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_estimator::{EstimateRequest, EstimatorService, PricingTables};
use eyre::{Result, WrapErr};
use serde::de::DeserializeOwned;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

mod config;
mod output;

use config::{Config, OutputFormat};
use output::{Envelope, render_sizing, render_summary, to_json};

#[derive(Parser)]
#[command(name = "tco-estimator")]
#[command(about = "Size, price and project Kubernetes / VM / low-code platform deployments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Size, price and project an estimate request
    Estimate {
        /// Request JSON file, or `-` for stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Pricing tables JSON. Defaults to ESTIMATOR_PRICING_TABLES or the built-in tables.
        #[arg(short, long)]
        tables: Option<PathBuf>,

        /// Output format. Defaults to ESTIMATOR_OUTPUT or json.
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Single-line JSON output
        #[arg(long)]
        compact: bool,
    },

    /// Size a request without pricing it
    Size {
        /// Request JSON file, or `-` for stdin
        #[arg(short, long)]
        input: PathBuf,

        /// Output format. Defaults to ESTIMATOR_OUTPUT or json.
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Single-line JSON output
        #[arg(long)]
        compact: bool,
    },

    /// Print an editable template
    Defaults {
        #[arg(value_enum)]
        template: Template,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Template {
    /// An estimate request with every default filled in
    Request,
    /// The built-in pricing tables
    Tables,
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .wrap_err("Failed to read stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = read_source(path)?;
    serde_json::from_str(&raw).wrap_err_with(|| format!("Failed to parse {}", path.display()))
}

fn load_tables(path: Option<&Path>) -> Result<PricingTables> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading pricing tables");
            read_json(path)
        }
        None => Ok(PricingTables::standard()),
    }
}

fn emit(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{text}").wrap_err("Failed to write output")?;
    Ok(())
}

fn main() -> Result<()> {
    install_color_eyre();

    let environment = Environment::from_env();
    init_tracing(&environment);

    let config = Config::from_env()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Estimate {
            input,
            tables,
            format,
            compact,
        } => {
            let config = config.with_overrides(tables, format, compact);
            debug!(?config, "Resolved configuration");

            let service = EstimatorService::new(load_tables(config.pricing_tables.as_deref())?)?;
            let request: EstimateRequest = read_json(&input)?;
            let report = service.estimate(&request)?;

            info!(
                net = %report.pricing.totals.net,
                warnings = report.warnings.len(),
                "Estimate complete"
            );

            let generated_at = Utc::now();
            let text = match config.output {
                OutputFormat::Json => to_json(&Envelope::new(&report, generated_at), config.pretty)?,
                OutputFormat::Summary => render_summary(&report, generated_at),
            };
            emit(&text)?;
        }

        Commands::Size {
            input,
            format,
            compact,
        } => {
            let config = config.with_overrides(None, format, compact);
            let service = EstimatorService::new(PricingTables::standard())?;
            let request: EstimateRequest = read_json(&input)?;
            let sizing = service.size(&request)?;

            let generated_at = Utc::now();
            let text = match config.output {
                OutputFormat::Json => to_json(&Envelope::new(&sizing, generated_at), config.pretty)?,
                OutputFormat::Summary => render_sizing(&sizing, generated_at),
            };
            emit(&text)?;
        }

        Commands::Defaults { template } => {
            let text = match template {
                Template::Request => to_json(&EstimateRequest::default(), config.pretty)?,
                Template::Tables => to_json(&PricingTables::standard(), config.pretty)?,
            };
            emit(&text)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_estimate_flags() {
        let cli = Cli::try_parse_from([
            "tco-estimator",
            "estimate",
            "--input",
            "request.json",
            "--format",
            "summary",
            "--compact",
        ])
        .unwrap();

        match cli.command {
            Commands::Estimate {
                input,
                tables,
                format,
                compact,
            } => {
                assert_eq!(input, PathBuf::from("request.json"));
                assert!(tables.is_none());
                assert_eq!(format, Some(OutputFormat::Summary));
                assert!(compact);
            }
            _ => panic!("expected estimate"),
        }
    }

    #[test]
    fn test_estimate_requires_input() {
        assert!(Cli::try_parse_from(["tco-estimator", "estimate"]).is_err());
    }

    #[test]
    fn test_default_request_template_round_trips() {
        let json = to_json(&EstimateRequest::default(), true).unwrap();
        let parsed: EstimateRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, EstimateRequest::default());
    }

    #[test]
    fn test_load_tables_defaults_to_standard() {
        assert_eq!(load_tables(None).unwrap(), PricingTables::standard());
    }

    #[test]
    fn test_read_json_reports_path() {
        let err = read_json::<EstimateRequest>(Path::new("/nonexistent/request.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/request.json"));
    }
}
