//! CLI command implementations.

pub mod auth;
pub mod storage;
pub mod tables;
pub mod tags;

use clap::ValueEnum;
use hostlink_core::{
    BackendFacade, ConfigError, FacadeConfig, Filter, Row, ENV_PUBLIC_KEY, ENV_SESSION_FILE,
    ENV_URL,
};
use hostlink_http::{HttpBackend, ReqwestClient};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

/// Result of running a command.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// The facade used by commands.
pub type Facade = BackendFacade<HttpBackend<ReqwestClient>>;

/// Errors in command arguments.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    /// `--eq` argument without `=`.
    #[error("filter must be column=value, got {0:?}")]
    InvalidFilter(String),

    /// `--meta` argument without `=`.
    #[error("metadata must be key=value, got {0:?}")]
    InvalidMetadata(String),

    /// Row argument that is not a JSON object or array of objects.
    #[error("invalid row JSON: {0}")]
    InvalidRow(String),
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// One compact JSON value per line.
    Text,
    /// Pretty-printed JSON document.
    Json,
}

/// Connection settings from the command line, falling back to the
/// environment.
#[derive(Debug, Default)]
pub struct Connection {
    /// Base URL flag.
    pub url: Option<String>,
    /// Public key flag.
    pub key: Option<String>,
    /// Session file flag.
    pub session_file: Option<PathBuf>,
}

impl Connection {
    /// Resolves the facade configuration.
    pub fn config(&self) -> Result<FacadeConfig, ConfigError> {
        self.config_with(|name| std::env::var(name).ok())
    }

    fn config_with<F>(&self, env: F) -> Result<FacadeConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = FacadeConfig::from_lookup(|name| match name {
            ENV_URL => self.url.clone().or_else(|| env(name)),
            ENV_PUBLIC_KEY => self.key.clone().or_else(|| env(name)),
            ENV_SESSION_FILE => self
                .session_file
                .as_ref()
                .map(|p| p.display().to_string())
                .or_else(|| env(name)),
            _ => env(name),
        })?;

        Ok(match (&config.session_path, default_session_path(&env)) {
            (None, Some(path)) => config.with_session_path(path),
            _ => config,
        })
    }

    /// Builds a facade speaking HTTP to the configured backend.
    pub fn facade(&self) -> Result<Facade, Box<dyn std::error::Error>> {
        let config = self.config()?;
        let client = ReqwestClient::new()?;
        let backend = HttpBackend::from_config(&config, client);
        Ok(BackendFacade::new(config, backend))
    }
}

fn default_session_path<F>(env: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    env("HOME").map(|home| PathBuf::from(home).join(".hostlink").join("session.json"))
}

/// Parses `column=value`. The value is read as JSON when it parses,
/// otherwise as a string.
pub fn parse_filter(arg: &str) -> Result<Filter, CliError> {
    match arg.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok(Filter::eq(column.trim(), parse_value(value)))
        }
        _ => Err(CliError::InvalidFilter(arg.to_string())),
    }
}

/// Parses every `--eq` argument.
pub fn parse_filters(args: &[String]) -> Result<Vec<Filter>, CliError> {
    args.iter().map(|arg| parse_filter(arg)).collect()
}

/// Parses `key=value` metadata entries into a JSON object.
pub fn parse_metadata(args: &[String]) -> Result<Row, CliError> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), parse_value(value)))
            }
            _ => Err(CliError::InvalidMetadata(arg.clone())),
        })
        .collect()
}

/// Reads a value as JSON, falling back to a plain string.
pub fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Parses a JSON object or array of objects.
pub fn parse_rows(json: &str) -> Result<Vec<Row>, CliError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| CliError::InvalidRow(e.to_string()))?;
    match value {
        Value::Object(row) => Ok(vec![row]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(CliError::InvalidRow(format!("expected object, got {other}"))),
            })
            .collect(),
        other => Err(CliError::InvalidRow(format!(
            "expected object or array, got {other}"
        ))),
    }
}

/// Writes rows in `format`.
pub fn print_rows(out: &mut impl Write, rows: &[Row], format: Format) -> CommandResult {
    match format {
        Format::Text => {
            for row in rows {
                writeln!(out, "{}", serde_json::to_string(row)?)?;
            }
        }
        Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(rows)?)?,
    }
    Ok(())
}
