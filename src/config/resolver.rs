//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Session config.kdl (`<data-dir>/config.kdl`)
//! 3. System config.kdl (`~/.config/healthdash/config.kdl`)
//! 4. Built-in defaults
//!
//! The log filter additionally honours `HDASH_LOG`, which beats every file.

use serde::Serialize;

use crate::Result;
use crate::config::schema::{DEFAULT_LOG_LEVEL, DEFAULT_STORAGE_QUOTA, HealthConfig, OutputFormat};
use crate::storage::{self, Storage};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "HDASH_LOG";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from session-level config
    Session,
    /// Value from system-level config
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Session => write!(f, "session"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedConfig {
    pub output_format: Resolved<OutputFormat>,
    pub log_level: Resolved<String>,
    pub storage_quota: Resolved<u64>,
    pub auto_daily_reset: Resolved<bool>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            log_level: Resolved::new(DEFAULT_LOG_LEVEL.to_string(), ValueSource::Default),
            storage_quota: Resolved::new(DEFAULT_STORAGE_QUOTA, ValueSource::Default),
            auto_daily_reset: Resolved::new(true, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    pub fn log_level(&self) -> &str {
        &self.log_level.value
    }

    pub fn storage_quota(&self) -> u64 {
        self.storage_quota.value
    }

    pub fn auto_daily_reset(&self) -> bool {
        self.auto_daily_reset.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_format: Option<OutputFormat>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }
}

fn pick<T>(
    cli: Option<T>,
    session: Option<T>,
    system: Option<T>,
    default: Resolved<T>,
) -> Resolved<T> {
    if let Some(value) = cli {
        Resolved::new(value, ValueSource::CliFlag)
    } else if let Some(value) = session {
        Resolved::new(value, ValueSource::Session)
    } else if let Some(value) = system {
        Resolved::new(value, ValueSource::System)
    } else {
        default
    }
}

/// Resolve from already-loaded config layers.
pub fn resolve_layers(
    system: Option<&HealthConfig>,
    session: Option<&HealthConfig>,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    ResolvedConfig {
        output_format: pick(
            overrides.output_format,
            session.and_then(|c| c.output_format),
            system.and_then(|c| c.output_format),
            defaults.output_format,
        ),
        log_level: pick(
            overrides.log_level.clone(),
            session.and_then(|c| c.log_level.clone()),
            system.and_then(|c| c.log_level.clone()),
            defaults.log_level,
        ),
        storage_quota: pick(
            None,
            session.and_then(|c| c.storage_quota),
            system.and_then(|c| c.storage_quota),
            defaults.storage_quota,
        ),
        auto_daily_reset: pick(
            None,
            session.and_then(|c| c.auto_daily_reset),
            system.and_then(|c| c.auto_daily_reset),
            defaults.auto_daily_reset,
        ),
    }
}

/// Resolve configuration with the full precedence chain.
///
/// `storage` is `None` before `system init`; only the system layer applies
/// then.
pub fn resolve_config(
    storage: Option<&Storage>,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig> {
    let system = storage::read_system_config()?;
    let session = match storage {
        Some(storage) => storage.read_config()?,
        None => None,
    };
    Ok(resolve_layers(system.as_ref(), session.as_ref(), overrides))
}

/// Log filter: `HDASH_LOG` if set, otherwise the resolved `log-level`.
pub fn resolve_log_filter(config: &ResolvedConfig) -> Resolved<String> {
    match std::env::var(LOG_ENV) {
        Ok(filter) if !filter.trim().is_empty() => {
            Resolved::new(filter, ValueSource::EnvVar(LOG_ENV.to_string()))
        }
        _ => config.log_level.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_value_source_display() {
        assert_eq!(format!("{}", ValueSource::EnvVar("FOO".to_string())), "env:FOO");
        assert_eq!(format!("{}", ValueSource::Session), "session");
        assert_eq!(format!("{}", ValueSource::System), "system");
        assert_eq!(format!("{}", ValueSource::CliFlag), "cli");
        assert_eq!(format!("{}", ValueSource::Default), "default");
    }

    #[test]
    fn test_resolve_defaults() {
        let config = resolve_layers(None, None, &ConfigOverrides::default());

        assert_eq!(config.output_format(), OutputFormat::Json);
        assert_eq!(config.output_format.source, ValueSource::Default);
        assert_eq!(config.log_level(), "warn");
        assert_eq!(config.storage_quota(), 5 * 1024 * 1024);
        assert!(config.auto_daily_reset());
    }

    #[test]
    fn test_session_overrides_system() {
        let system = HealthConfig {
            output_format: Some(OutputFormat::Human),
            storage_quota: Some(100),
            auto_daily_reset: Some(false),
            ..Default::default()
        };
        let session = HealthConfig {
            storage_quota: Some(200),
            ..Default::default()
        };

        let config = resolve_layers(Some(&system), Some(&session), &ConfigOverrides::default());

        assert_eq!(config.output_format(), OutputFormat::Human);
        assert_eq!(config.output_format.source, ValueSource::System);
        assert_eq!(config.storage_quota(), 200);
        assert_eq!(config.storage_quota.source, ValueSource::Session);
        assert!(!config.auto_daily_reset());
    }

    #[test]
    fn test_cli_overrides_session() {
        let session = HealthConfig {
            output_format: Some(OutputFormat::Json),
            log_level: Some("info".to_string()),
            ..Default::default()
        };
        let overrides = ConfigOverrides::new()
            .with_output_format(OutputFormat::Human)
            .with_log_level("debug");

        let config = resolve_layers(None, Some(&session), &overrides);

        assert_eq!(config.output_format(), OutputFormat::Human);
        assert_eq!(config.output_format.source, ValueSource::CliFlag);
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn test_resolve_config_reads_session_file() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        storage
            .write_config(&HealthConfig {
                auto_daily_reset: Some(false),
                ..Default::default()
            })
            .unwrap();

        let config = resolve_config(Some(&storage), &ConfigOverrides::default()).unwrap();
        assert!(!config.auto_daily_reset());
        assert_eq!(config.auto_daily_reset.source, ValueSource::Session);
    }

    #[test]
    fn test_resolved_config_serializes_sources() {
        let config = resolve_layers(None, None, &ConfigOverrides::new().with_log_level("info"));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["log-level"]["value"], "info");
        assert_eq!(json["log-level"]["source"], "cli");
        assert_eq!(json["storage-quota"]["source"], "default");
    }
}
