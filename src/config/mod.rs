//! Configuration for healthdash.
//!
//! ## config.kdl - User preferences
//!
//! Located at:
//! - System: `~/.config/healthdash/config.kdl`
//! - Session: `<data-dir>/config.kdl`
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `log-level` - tracing filter used when `HDASH_LOG` is unset
//! - `storage-quota` - byte quota reported by `system usage`
//! - `auto-daily-reset` - reset daily goals on the first run of a new day
//!
//! ## Precedence
//!
//! CLI flag > session config > system config > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, LOG_ENV, Resolved, ResolvedConfig, ValueSource, resolve_config,
    resolve_layers, resolve_log_filter,
};
pub use schema::{
    CONFIG_KEYS, DEFAULT_LOG_LEVEL, DEFAULT_STORAGE_QUOTA, HealthConfig, OutputFormat,
};
