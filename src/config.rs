//! Configuration file management for revocheck.
//!
//! Settings come from three places, later ones overriding earlier ones:
//!
//! 1. Default values
//! 2. Configuration file (`revocheck.toml` or specified with `--config`)
//! 3. Command-line arguments
//!
//! # Example Configuration File
//!
//! ```toml
//! output = "text"
//! log_level = "info"
//!
//! [oracle]
//! binding = "detail"
//! program = "/usr/local/bin/revocation-check"
//! timeout_secs = 10
//! stdout = "inherit"
//! stderr = "/var/log/revocation-check.log"
//!
//! [prometheus]
//! enabled = true
//! address = "http://localhost:9091"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::oracle::process::DEFAULT_PROGRAM;
use crate::oracle::{OracleBinding, OracleCommand, StreamTarget};

/// Main configuration structure.
///
/// All fields are optional so partial configurations can be merged.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Output format: text, json
    pub output: Option<String>,
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: Option<String>,
    /// Revocation oracle settings
    pub oracle: Option<OracleConfig>,
    /// Prometheus configuration
    pub prometheus: Option<PrometheusConfig>,
}

/// How to reach the revocation oracle.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OracleConfig {
    /// Binding: ffi, detail, high
    pub binding: Option<String>,
    /// Oracle executable for the subprocess bindings
    pub program: Option<String>,
    /// Extra arguments placed before the mode argument
    pub args: Option<Vec<String>>,
    /// Kill the oracle process after this many seconds
    pub timeout_secs: Option<u64>,
    /// "inherit", "null" or a file path
    pub stdout: Option<String>,
    /// "inherit", "null" or a file path
    pub stderr: Option<String>,
}

/// Prometheus integration configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PrometheusConfig {
    /// Enable prometheus metrics pushing
    pub enabled: Option<bool>,
    /// Prometheus push gateway address (e.g., "http://localhost:9091")
    pub address: Option<String>,
}

impl Default for Config {
    /// - `output`: "text"
    /// - `log_level`: "info"
    /// - `oracle.binding`: "detail"
    /// - `oracle.program`: "revocation-check"
    /// - `oracle.stdout` / `oracle.stderr`: "inherit"
    /// - `prometheus.enabled`: false
    /// - `prometheus.address`: "http://localhost:9091"
    fn default() -> Self {
        Config {
            output: Some("text".to_string()),
            log_level: Some("info".to_string()),
            oracle: Some(OracleConfig {
                binding: Some(OracleBinding::Detail.to_string()),
                program: Some(DEFAULT_PROGRAM.to_string()),
                args: None,
                timeout_secs: None,
                stdout: Some("inherit".to_string()),
                stderr: Some("inherit".to_string()),
            }),
            prometheus: Some(PrometheusConfig {
                enabled: Some(false),
                address: Some("http://localhost:9091".to_string()),
            }),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// ```no_run
    /// # use revocheck::config::Config;
    /// let config = Config::from_file("revocheck.toml")?;
    /// # Ok::<(), revocheck::config::ConfigError>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }

    /// Merges this configuration with another, prioritizing the other's values.
    ///
    /// ```
    /// # use revocheck::config::Config;
    /// let defaults = Config::default();
    /// let file_config = Config::from_file("revocheck.toml").unwrap_or_default();
    /// let merged = defaults.merge_with(file_config);
    /// ```
    pub fn merge_with(mut self, other: Config) -> Self {
        if other.output.is_some() {
            self.output = other.output;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if let Some(other_oracle) = other.oracle {
            if let Some(ref mut self_oracle) = self.oracle {
                if other_oracle.binding.is_some() {
                    self_oracle.binding = other_oracle.binding;
                }
                if other_oracle.program.is_some() {
                    self_oracle.program = other_oracle.program;
                }
                if other_oracle.args.is_some() {
                    self_oracle.args = other_oracle.args;
                }
                if other_oracle.timeout_secs.is_some() {
                    self_oracle.timeout_secs = other_oracle.timeout_secs;
                }
                if other_oracle.stdout.is_some() {
                    self_oracle.stdout = other_oracle.stdout;
                }
                if other_oracle.stderr.is_some() {
                    self_oracle.stderr = other_oracle.stderr;
                }
            } else {
                self.oracle = Some(other_oracle);
            }
        }
        if let Some(other_prom) = other.prometheus {
            if let Some(ref mut self_prom) = self.prometheus {
                if other_prom.enabled.is_some() {
                    self_prom.enabled = other_prom.enabled;
                }
                if other_prom.address.is_some() {
                    self_prom.address = other_prom.address;
                }
            } else {
                self.prometheus = Some(other_prom);
            }
        }
        self
    }

    /// Creates a Config holding only the values given on the command line.
    #[allow(clippy::too_many_arguments)]
    pub fn from_cli_args(
        binding: Option<String>,
        program: Option<String>,
        timeout_secs: Option<u64>,
        output: Option<String>,
        log_level: Option<String>,
        prometheus: Option<bool>,
        prometheus_address: Option<String>,
    ) -> Self {
        Config {
            output,
            log_level,
            oracle: Some(OracleConfig {
                binding,
                program,
                args: None,
                timeout_secs,
                stdout: None,
                stderr: None,
            }),
            prometheus: Some(PrometheusConfig {
                enabled: prometheus,
                address: prometheus_address,
            }),
        }
    }

    /// Checks every value that has a restricted set of forms.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(output) = &self.output {
            if output != "text" && output != "json" {
                return Err(ConfigError::Validation(format!(
                    "output must be 'text' or 'json', got '{}'",
                    output
                )));
            }
        }
        self.binding()?;
        self.oracle_command()?;
        Ok(())
    }

    /// The configured oracle binding, `detail` if unset.
    pub fn binding(&self) -> Result<OracleBinding, ConfigError> {
        match self.oracle.as_ref().and_then(|o| o.binding.as_deref()) {
            Some(name) => OracleBinding::from_str(name).map_err(|_| {
                ConfigError::Validation(format!(
                    "unknown oracle binding '{}', expected ffi, detail or high",
                    name
                ))
            }),
            None => Ok(OracleBinding::Detail),
        }
    }

    /// Launch settings for the subprocess bindings.
    pub fn oracle_command(&self) -> Result<OracleCommand, ConfigError> {
        let mut command = OracleCommand::default();
        if let Some(oracle) = &self.oracle {
            if let Some(program) = &oracle.program {
                if program.is_empty() {
                    return Err(ConfigError::Validation(
                        "oracle program cannot be empty".to_string(),
                    ));
                }
                command.program = PathBuf::from(program);
            }
            command.leading_args = oracle.args.clone().unwrap_or_default();
            command.timeout = oracle.timeout_secs.map(Duration::from_secs);
            if let Some(stdout) = &oracle.stdout {
                command.stdout = stream_target(stdout)?;
            }
            if let Some(stderr) = &oracle.stderr {
                command.stderr = stream_target(stderr)?;
            }
        }
        if command.timeout == Some(Duration::ZERO) {
            return Err(ConfigError::Validation(
                "oracle timeout must be at least one second".to_string(),
            ));
        }
        Ok(command)
    }

    pub fn json_output(&self) -> bool {
        self.output.as_deref() == Some("json")
    }

    /// Push gateway address when pushing is enabled.
    pub fn prometheus_address(&self) -> Option<&str> {
        self.prometheus
            .as_ref()
            .filter(|p| p.enabled.unwrap_or(false))
            .and_then(|p| p.address.as_deref())
    }

    /// Generates an example configuration file in TOML format.
    pub fn example_toml() -> String {
        let example = Config {
            output: Some("text".to_string()),
            log_level: Some("info".to_string()),
            oracle: Some(OracleConfig {
                binding: Some("detail".to_string()),
                program: Some("/usr/local/bin/revocation-check".to_string()),
                args: None,
                timeout_secs: Some(10),
                stdout: Some("inherit".to_string()),
                stderr: Some("/var/log/revocation-check.log".to_string()),
            }),
            prometheus: Some(PrometheusConfig {
                enabled: Some(true),
                address: Some("http://localhost:9091".to_string()),
            }),
        };

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# Error generating example".to_string())
    }
}

fn stream_target(value: &str) -> Result<StreamTarget, ConfigError> {
    match value {
        "inherit" => Ok(StreamTarget::Inherit),
        "null" => Ok(StreamTarget::Null),
        "" => Err(ConfigError::Validation(
            "oracle stream target cannot be empty".to_string(),
        )),
        path => Ok(StreamTarget::File(PathBuf::from(path))),
    }
}

/// Errors that can occur during configuration loading and parsing.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error (file not found, permission denied, etc.)
    Io(String),
    /// TOML parsing error (invalid syntax, type mismatch, etc.)
    Parse(String),
    /// Validation error (unknown binding, invalid values, etc.)
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "IO Error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse Error: {}", msg),
            ConfigError::Validation(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
