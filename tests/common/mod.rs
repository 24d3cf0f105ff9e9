//! Common test utilities for healthdash integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's `~/.local/share/healthdash/` directory or system config.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
pub use tempfile::TempDir;

/// A test environment with isolated data and config directories.
///
/// The `hdash()` method returns a `Command` that sets `HDASH_DATA_DIR` and
/// `XDG_CONFIG_HOME` per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_home: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_home: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and run `hdash system init`.
    pub fn init() -> Self {
        let env = Self::new();
        env.hdash().args(["system", "init"]).assert().success();
        env
    }

    /// Get a Command for the hdash binary with isolated directories.
    pub fn hdash(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_hdash"));
        cmd.current_dir(self.data_dir.path());
        cmd.env("HDASH_DATA_DIR", self.data_dir.path());
        cmd.env("XDG_CONFIG_HOME", self.config_home.path());
        cmd.env_remove("HDASH_LOG");
        cmd
    }

    /// Run `hdash <args>`, assert success and parse stdout as JSON.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.hdash().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "hdash {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
            panic!(
                "hdash {:?} printed invalid JSON ({}): {}",
                args,
                e,
                String::from_utf8_lossy(&output.stdout)
            )
        })
    }

    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Today's date as the binary sees it.
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}
