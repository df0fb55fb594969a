//! Layered configuration for analysis runs.
//!
//! Precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (`DECAP_*`)
//! 3. Project config (`decap.toml`)
//! 4. Defaults
//!
//! Every resolved value remembers its [`ConfigSource`] so callers can report
//! where a setting came from.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DecapError, DecapResult};

/// Project config file name looked up in the workspace root.
pub const CONFIG_FILE_NAME: &str = "decap.toml";

pub const ENV_IGNORE_CONSTANTS: &str = "DECAP_IGNORE_CONSTANTS";
pub const ENV_INCLUDE_CLEAN: &str = "DECAP_INCLUDE_CLEAN";
pub const ENV_FORMAT: &str = "DECAP_FORMAT";
pub const ENV_RESOLVERS: &str = "DECAP_RESOLVERS";

/// Resolver precedence used when nothing is configured.
pub const DEFAULT_RESOLVERS: &[&str] = &["java"];

// ============================================================================
// Configuration Sources
// ============================================================================

/// Configuration value source (for precedence tracking).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Built-in default value.
    Default = 0,
    /// From `decap.toml`.
    ProjectConfig = 1,
    /// From environment variable.
    EnvVar = 2,
    /// From CLI flag (highest precedence).
    CliFlag = 3,
}

/// A configuration value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValue<T> {
    /// The actual value.
    pub value: T,
    /// Where the value came from.
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    /// Create a new config value with the given source.
    pub fn new(value: T, source: ConfigSource) -> Self {
        ConfigValue { value, source }
    }

    /// Merge with another value, preferring higher precedence.
    pub fn merge(self, other: Self) -> Self {
        if other.source >= self.source {
            other
        } else {
            self
        }
    }
}

fn layer<T: Clone>(slot: &mut ConfigValue<T>, value: T, source: ConfigSource) {
    *slot = slot.clone().merge(ConfigValue::new(value, source));
}

// ============================================================================
// Output Format
// ============================================================================

/// Report rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
    /// Events grouped by the field's parent container.
    Grouped,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" => Ok(OutputFormat::Text),
            "grouped" => Ok(OutputFormat::Grouped),
            other => Err(format!(
                "unknown format '{}', expected 'json', 'text' or 'grouped'",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Grouped => f.write_str("grouped"),
        }
    }
}

// ============================================================================
// Project Config File
// ============================================================================

/// Contents of `decap.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub ignore_constants: Option<bool>,
    pub include_clean: Option<bool>,
    pub format: Option<OutputFormat>,
    pub resolvers: Option<Vec<String>>,
}

impl ProjectConfig {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> DecapResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => DecapError::file_not_found(path.display().to_string()),
            _ => DecapError::from(err),
        })?;
        Self::parse(&content).map_err(|message| DecapError::InvalidConfig {
            path: path.display().to_string(),
            message,
        })
    }

    /// Parse config text.
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|err| err.message().to_string())
    }
}

// ============================================================================
// Configuration Resolution
// ============================================================================

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--config` flag.
    pub config_path: Option<PathBuf>,
    /// `--ignore-constants` flag.
    pub ignore_constants: Option<bool>,
    /// `--include-clean` flag.
    pub include_clean: Option<bool>,
    /// `--format` flag.
    pub format: Option<OutputFormat>,
}

/// Resolved configuration with precedence information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Leave constant fields out of the report.
    pub ignore_constants: ConfigValue<bool>,
    /// Keep fields without events in the report.
    pub include_clean: ConfigValue<bool>,
    /// Report rendering.
    pub format: ConfigValue<OutputFormat>,
    /// Resolver names in precedence order.
    pub resolvers: ConfigValue<Vec<String>>,
    /// Config file that was applied, if any.
    pub config_file: Option<PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ResolvedConfig {
            ignore_constants: ConfigValue::new(false, ConfigSource::Default),
            include_clean: ConfigValue::new(false, ConfigSource::Default),
            format: ConfigValue::new(OutputFormat::Json, ConfigSource::Default),
            resolvers: ConfigValue::new(
                DEFAULT_RESOLVERS.iter().map(|name| name.to_string()).collect(),
                ConfigSource::Default,
            ),
            config_file: None,
        }
    }
}

impl ResolvedConfig {
    /// Resolve configuration from all sources, reading the process environment.
    pub fn resolve(workspace_root: &Path, cli: &CliOverrides) -> DecapResult<Self> {
        Self::resolve_with_env(workspace_root, cli, |key| std::env::var(key).ok())
    }

    /// Resolve configuration with an explicit environment lookup.
    ///
    /// An explicit `--config` path must exist; otherwise `decap.toml` in
    /// `workspace_root` is used when present.
    pub fn resolve_with_env<F>(
        workspace_root: &Path,
        cli: &CliOverrides,
        env: F,
    ) -> DecapResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ResolvedConfig::default();

        let project_path = match &cli.config_path {
            Some(path) => Some(path.clone()),
            None => {
                let candidate = workspace_root.join(CONFIG_FILE_NAME);
                candidate.is_file().then_some(candidate)
            }
        };
        if let Some(path) = project_path {
            let project = ProjectConfig::load(&path)?;
            tracing::debug!("applying config file {}", path.display());
            config.apply_project_config(&project);
            config.config_file = Some(path);
        }

        config.apply_env_vars(env)?;
        config.apply_cli_overrides(cli);
        Ok(config)
    }

    fn apply_project_config(&mut self, project: &ProjectConfig) {
        let source = ConfigSource::ProjectConfig;
        if let Some(value) = project.ignore_constants {
            layer(&mut self.ignore_constants, value, source);
        }
        if let Some(value) = project.include_clean {
            layer(&mut self.include_clean, value, source);
        }
        if let Some(value) = project.format {
            layer(&mut self.format, value, source);
        }
        if let Some(value) = &project.resolvers {
            layer(&mut self.resolvers, value.clone(), source);
        }
    }

    fn apply_env_vars<F>(&mut self, env: F) -> DecapResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = ConfigSource::EnvVar;
        if let Some(raw) = env(ENV_IGNORE_CONSTANTS) {
            layer(&mut self.ignore_constants, parse_env_bool(ENV_IGNORE_CONSTANTS, &raw)?, source);
        }
        if let Some(raw) = env(ENV_INCLUDE_CLEAN) {
            layer(&mut self.include_clean, parse_env_bool(ENV_INCLUDE_CLEAN, &raw)?, source);
        }
        if let Some(raw) = env(ENV_FORMAT) {
            let format = raw.parse().map_err(|message| DecapError::InvalidConfig {
                path: ENV_FORMAT.to_string(),
                message,
            })?;
            layer(&mut self.format, format, source);
        }
        if let Some(raw) = env(ENV_RESOLVERS) {
            let names: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
            layer(&mut self.resolvers, names, source);
        }
        Ok(())
    }

    fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        let source = ConfigSource::CliFlag;
        if let Some(value) = overrides.ignore_constants {
            layer(&mut self.ignore_constants, value, source);
        }
        if let Some(value) = overrides.include_clean {
            layer(&mut self.include_clean, value, source);
        }
        if let Some(value) = overrides.format {
            layer(&mut self.format, value, source);
        }
    }
}

fn parse_env_bool(key: &str, raw: &str) -> DecapResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(DecapError::InvalidConfig {
            path: key.to_string(),
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}
