//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `RIDEALLOC_CONFIG`
//! environment variable. A missing file is not an error: every field has a default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `RIDEALLOC_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `RIDEALLOC_APPROVAL__PERCENT=60` sets the `approval.percent` field.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use ridealloc::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//!
//! println!("Server will bind to {}:{}", config.host, config.port);
//! # Ok(())
//! # }
//! ```
//!
//! ## Example
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 3001
//! output_filename: approved_rides.csv
//! limits:
//!   max_file_size: 10485760
//! approval:
//!   type: http
//!   url: https://approvals.example.com/v1/rides
//!   api_key: sk-example
//!   timeout: 10s
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

/// CLI args - config file location plus the one-shot file mode
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "RIDEALLOC_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,

    /// Allocate rides for this request file and exit instead of starting the server.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Where to write the allocation file in one-shot mode.
    #[arg(long, default_value = "approved_rides.csv", requires = "input")]
    pub output: PathBuf,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
    /// Filename offered for the allocation file download
    pub output_filename: String,
    /// Resource limits for protecting the server
    pub limits: LimitsConfig,
    /// Where approved totals come from
    pub approval: ApprovalConfig,
}

/// Upload limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum size in bytes of an uploaded request file.
    /// Default: 10MB
    pub max_file_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Approval provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApprovalConfig {
    /// Approve a fixed percentage of every destination's requested total
    /// Set configuration via:
    /// - `RIDEALLOC_APPROVAL__TYPE=fixed_ratio`
    /// - `RIDEALLOC_APPROVAL__PERCENT` - Percentage to approve (defaults to 70)
    FixedRatio(FixedRatioConfig),
    /// Ask a remote approval service
    /// Set configuration via:
    /// - `RIDEALLOC_APPROVAL__TYPE=http`
    /// - `RIDEALLOC_APPROVAL__URL` - Endpoint receiving the requested totals
    /// - `RIDEALLOC_APPROVAL__API_KEY` - Optional bearer token
    /// - `RIDEALLOC_APPROVAL__TIMEOUT` - Request timeout (defaults to 10s)
    Http(HttpApprovalConfig),
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self::FixedRatio(FixedRatioConfig::default())
    }
}

/// Fixed-ratio approval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FixedRatioConfig {
    /// Percentage of each requested total to approve (0-100)
    #[serde(default = "FixedRatioConfig::default_percent")]
    pub percent: u64,
}

impl FixedRatioConfig {
    fn default_percent() -> u64 {
        70
    }
}

impl Default for FixedRatioConfig {
    fn default() -> Self {
        Self {
            percent: Self::default_percent(),
        }
    }
}

/// Remote approval service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpApprovalConfig {
    /// Endpoint receiving the requested totals
    pub url: Url,
    /// Optional bearer token sent with each approval request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout
    #[serde(default = "HttpApprovalConfig::default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl HttpApprovalConfig {
    fn default_timeout() -> Duration {
        Duration::from_secs(10)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            enable_otel_export: false,
            output_filename: "approved_rides.csv".to_string(),
            limits: LimitsConfig::default(),
            approval: ApprovalConfig::default(),
        }
    }
}

/// Configuration that loaded but does not make sense.
#[derive(Debug, thiserror::Error)]
#[error("Config validation: {0}")]
pub struct ConfigError(String);

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_file_size == 0 {
            return Err(ConfigError("max_file_size cannot be 0. Set a positive number of bytes.".to_string()));
        }

        if self.output_filename.trim().is_empty() {
            return Err(ConfigError("output_filename cannot be empty.".to_string()));
        }

        // The filename ends up inside a Content-Disposition header
        if self.output_filename.contains(['"', '\\', '\r', '\n']) {
            return Err(ConfigError(format!(
                "output_filename '{}' contains characters that cannot appear in a download filename.",
                self.output_filename
            )));
        }

        match &self.approval {
            ApprovalConfig::FixedRatio(fixed) if fixed.percent > 100 => {
                return Err(ConfigError(format!(
                    "approval percent ({}) cannot be greater than 100",
                    fixed.percent
                )));
            }
            ApprovalConfig::Http(http) if http.timeout.is_zero() => {
                return Err(ConfigError("approval timeout must be greater than zero.".to_string()));
            }
            _ => {}
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            // RIDEALLOC_CONFIG names the file itself and is not a config key
            .merge(Env::prefixed("RIDEALLOC_").ignore(&["config"]).split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
