//! Configuration for the estimator CLI

use core_config::{ConfigError, FromEnv, env_optional, env_parse};
use std::path::PathBuf;
use strum::{Display, EnumString};

/// How `estimate` prints its report
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, clap::ValueEnum,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OutputFormat {
    /// Full report as JSON
    #[default]
    Json,
    /// Human-readable overview
    Summary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Pricing tables JSON; the built-in tables are used when unset
    pub pricing_tables: Option<PathBuf>,
    pub output: OutputFormat,
    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pricing_tables: None,
            output: OutputFormat::Json,
            pretty: true,
        }
    }
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            pricing_tables: env_optional("ESTIMATOR_PRICING_TABLES").map(PathBuf::from),
            output: env_parse("ESTIMATOR_OUTPUT", OutputFormat::default())?,
            pretty: env_parse("ESTIMATOR_PRETTY", true)?,
        })
    }
}

impl Config {
    /// Apply command-line overrides on top of the environment
    pub fn with_overrides(
        mut self,
        tables: Option<PathBuf>,
        format: Option<OutputFormat>,
        compact: bool,
    ) -> Self {
        if tables.is_some() {
            self.pricing_tables = tables;
        }
        if let Some(format) = format {
            self.output = format;
        }
        if compact {
            self.pretty = false;
        }
        self
    }
}
