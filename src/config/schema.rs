//! KDL schema for config.kdl.
//!
//! ```kdl
//! output-format "human"      // or "json"
//! log-level "info"
//! storage-quota 5242880      // bytes
//! auto-daily-reset #true
//! ```

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default storage quota: 5 MiB.
pub const DEFAULT_STORAGE_QUOTA: u64 = 5 * 1024 * 1024;

/// Default log filter when neither config nor environment sets one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Keys understood by `config set`.
pub const CONFIG_KEYS: [&str; 4] = ["output-format", "log-level", "storage-quota", "auto-daily-reset"];

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Preferences stored in config.kdl. Unset values fall through to the next
/// config layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Log filter used when `HDASH_LOG` is unset (e.g. "info")
    pub log_level: Option<String>,

    /// Byte quota reported by `system usage`
    pub storage_quota: Option<u64>,

    /// Reset daily goals on the first run of a new day
    pub auto_daily_reset: Option<bool>,
}

fn first_entry<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

fn push_node(doc: &mut KdlDocument, name: &str, value: KdlValue) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}

impl HealthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(ref level) = self.log_level {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(format!(
                    "log-level must be one of {}, got {}",
                    LOG_LEVELS.join(", "),
                    level
                ));
            }
        }
        if self.storage_quota == Some(0) {
            return Err("storage-quota must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Parse config from a KDL document. Unknown nodes are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = first_entry(doc, "output-format").and_then(|v| v.as_string()) {
            config.output_format = OutputFormat::parse(s);
        }

        if let Some(s) = first_entry(doc, "log-level").and_then(|v| v.as_string()) {
            config.log_level = Some(s.to_string());
        }

        if let Some(i) = first_entry(doc, "storage-quota").and_then(|v| v.as_integer()) {
            if i > 0 {
                config.storage_quota = u64::try_from(i).ok();
            }
        }

        if let Some(b) = first_entry(doc, "auto-daily-reset").and_then(|v| v.as_bool()) {
            config.auto_daily_reset = Some(b);
        }

        config
    }

    /// Parse and validate config file content.
    pub fn from_kdl_str(content: &str) -> Result<Self> {
        let doc: KdlDocument = content
            .parse()
            .map_err(|e| Error::Config(format!("Invalid config.kdl: {}", e)))?;
        let config = Self::from_kdl(&doc);
        config.validate().map_err(Error::Config)?;
        Ok(config)
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(format) = self.output_format {
            push_node(&mut doc, "output-format", KdlValue::String(format.as_str().to_string()));
        }
        if let Some(ref level) = self.log_level {
            push_node(&mut doc, "log-level", KdlValue::String(level.clone()));
        }
        if let Some(quota) = self.storage_quota {
            push_node(&mut doc, "storage-quota", KdlValue::Integer(quota as i128));
        }
        if let Some(reset) = self.auto_daily_reset {
            push_node(&mut doc, "auto-daily-reset", KdlValue::Bool(reset));
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &HealthConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level.clone();
        }
        if other.storage_quota.is_some() {
            self.storage_quota = other.storage_quota;
        }
        if other.auto_daily_reset.is_some() {
            self.auto_daily_reset = other.auto_daily_reset;
        }
    }

    /// Set one key from its command-line string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "output-format" => {
                let format = OutputFormat::parse(value).ok_or_else(|| {
                    Error::Config(format!("output-format must be json or human, got {}", value))
                })?;
                self.output_format = Some(format);
            }
            "log-level" => self.log_level = Some(value.to_lowercase()),
            "storage-quota" => {
                let quota = value.parse::<u64>().map_err(|_| {
                    Error::Config(format!("storage-quota must be a byte count, got {}", value))
                })?;
                self.storage_quota = Some(quota);
            }
            "auto-daily-reset" => {
                let reset = match value.to_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => true,
                    "false" | "no" | "off" | "0" => false,
                    _ => {
                        return Err(Error::Config(format!(
                            "auto-daily-reset must be true or false, got {}",
                            value
                        )));
                    }
                };
                self.auto_daily_reset = Some(reset);
            }
            _ => {
                return Err(Error::Config(format!(
                    "Unknown config key '{}' (expected one of: {})",
                    key,
                    CONFIG_KEYS.join(", ")
                )));
            }
        }
        self.validate().map_err(Error::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("human"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }

    #[test]
    fn test_config_from_kdl_empty() {
        let config = HealthConfig::from_kdl(&KdlDocument::new());
        assert_eq!(config, HealthConfig::default());
    }

    #[test]
    fn test_config_from_kdl_full() {
        let kdl = r#"
            output-format "human"
            log-level "debug"
            storage-quota 1048576
            auto-daily-reset #false
        "#;
        let config = HealthConfig::from_kdl_str(kdl).unwrap();

        assert_eq!(config.output_format, Some(OutputFormat::Human));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.storage_quota, Some(1048576));
        assert_eq!(config.auto_daily_reset, Some(false));
    }

    #[test]
    fn test_config_to_kdl_roundtrip() {
        let config = HealthConfig {
            output_format: Some(OutputFormat::Json),
            log_level: Some("info".to_string()),
            storage_quota: Some(2048),
            auto_daily_reset: Some(true),
        };
        let parsed = HealthConfig::from_kdl(&config.to_kdl());
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_merge() {
        let mut base = HealthConfig {
            output_format: Some(OutputFormat::Json),
            storage_quota: Some(100),
            ..Default::default()
        };
        base.merge(&HealthConfig {
            output_format: Some(OutputFormat::Human),
            ..Default::default()
        });

        assert_eq!(base.output_format, Some(OutputFormat::Human));
        assert_eq!(base.storage_quota, Some(100));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        assert!(HealthConfig::from_kdl_str("log-level \"loud\"").is_err());
        let mut config = HealthConfig::new();
        assert!(config.set("log-level", "loud").is_err());
    }

    #[test]
    fn test_set_keys() {
        let mut config = HealthConfig::new();
        config.set("output-format", "human").unwrap();
        config.set("storage-quota", "4096").unwrap();
        config.set("auto-daily-reset", "off").unwrap();

        assert_eq!(config.output_format, Some(OutputFormat::Human));
        assert_eq!(config.storage_quota, Some(4096));
        assert_eq!(config.auto_daily_reset, Some(false));

        assert!(config.set("storage-quota", "lots").is_err());
        assert!(config.set("storage-quota", "0").is_err());
        assert!(config.set("editor", "vim").is_err());
    }

    #[test]
    fn test_malformed_kdl_is_config_error() {
        assert!(matches!(
            HealthConfig::from_kdl_str("output-format \"json"),
            Err(Error::Config(_))
        ));
    }
}
