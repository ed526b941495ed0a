//! Shared configuration for the driver runner.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file, then `DRIVER_RUNNER_*` environment variables, then
//! command-line flags. The runner itself only consumes the resolved
//! [`Config`]; how it was assembled is not its concern.

mod defaults;
mod logging;

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_BOOT_SCHEME, DEFAULT_DRIVER_HOST_URL, DEFAULT_LOG_FILTER, default_boot_scheme,
    default_driver_host_url, default_log_filter, default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved runner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "DRIVER_RUNNER")]
pub struct Config {
    /// `tracing` filter expression applied to the global subscriber.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Output format of the global subscriber.
    #[serde(default)]
    pub log_format: LogFormat,
    /// URL prefix marking a driver as part of the boot image.
    #[serde(default = "defaults::default_boot_scheme")]
    pub boot_scheme: String,
    /// Component URL of the driver host binary.
    #[serde(default = "defaults::default_driver_host_url")]
    pub driver_host_url: String,
    /// Driver bound to the root node at startup, if any.
    #[serde(default)]
    pub root_driver_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            boot_scheme: default_boot_scheme(),
            driver_host_url: default_driver_host_url(),
            root_driver_url: None,
        }
    }
}

impl Config {
    /// Loads and validates the configuration from every layer.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any layer fails to parse.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load().map_err(ConfigError::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for the telemetry subscriber.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// URL prefix identifying boot-image drivers.
    #[must_use]
    pub fn boot_scheme(&self) -> &str {
        self.boot_scheme.as_str()
    }

    /// Component URL launched for new driver hosts.
    #[must_use]
    pub fn driver_host_url(&self) -> &str {
        self.driver_host_url.as_str()
    }

    /// Driver started on the root node, when configured.
    #[must_use]
    pub fn root_driver_url(&self) -> Option<&str> {
        self.root_driver_url.as_deref()
    }

    /// Checks values the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBootScheme`] when the boot scheme is not
    /// of the form `<scheme>://`, or [`ConfigError::EmptyDriverHostUrl`] when
    /// no driver host URL is configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scheme = self.boot_scheme.trim();
        let valid_scheme = scheme
            .strip_suffix("://")
            .is_some_and(|name| !name.is_empty() && !name.contains(':'));
        if !valid_scheme {
            return Err(ConfigError::InvalidBootScheme {
                value: self.boot_scheme.clone(),
            });
        }
        if self.driver_host_url.trim().is_empty() {
            return Err(ConfigError::EmptyDriverHostUrl);
        }
        Ok(())
    }
}

/// Errors raised while resolving the runner configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One of the configuration layers failed to load.
    #[error("failed to load configuration: {0}")]
    Load(#[source] Arc<OrthoError>),
    /// The boot scheme is not a bare `<scheme>://` prefix.
    #[error("boot scheme '{value}' must look like '<scheme>://'")]
    InvalidBootScheme {
        /// Offending value.
        value: String,
    },
    /// The driver host URL was blank.
    #[error("driver host URL must not be empty")]
    EmptyDriverHostUrl,
}
