//! Runtime configuration: interval/threshold plus peer-binary path resolution.
//!
//! There is deliberately no persistent config *store* here (spec.md §1 names
//! one as out of scope) — only the layered resolution a process needs at
//! startup, the way the teacher's `core::config` resolves paths and knobs
//! before ever touching a TOML file.

#![allow(missing_docs)]

use std::env;
use std::path::{Path, PathBuf};

use crate::core::errors::{Result, WatchdogError};

/// Env var consulted before falling back to a sibling-of-`current_exe` default.
pub const ENV_SENTINEL_BIN: &str = "TWINWATCH_SENTINEL_BIN";
/// Env var consulted before falling back to a sibling-of-`current_exe` default.
pub const ENV_APP_BIN: &str = "TWINWATCH_APP_BIN";

/// Filename of the reference sentinel binary, resolved relative to the
/// application's own executable directory when no override is given.
const DEFAULT_SENTINEL_BIN_NAME: &str = "twinwatch-sentinel";

/// Parameters shared by both roles.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// Heartbeat period, in whole seconds. Must be `> 0`.
    pub interval_secs: u64,
    /// Miss-counter threshold above which the peer is declared dead.
    pub threshold: u64,
    /// Resolved path to the sentinel binary, used by the application when it
    /// needs to (re-)launch a sentinel.
    pub sentinel_binary: PathBuf,
    /// Default command vector used to respawn the application when argv
    /// reconstruction fails or was never captured (spec.md §4.2 step 3).
    pub default_app_command: Vec<String>,
    /// Name of the host-wide named readiness semaphore.
    pub readiness_semaphore_name: String,
}

impl WatchdogConfig {
    /// Build a config for the given interval/threshold, resolving the sentinel
    /// binary path via `TWINWATCH_SENTINEL_BIN` or a sibling of `current_exe`.
    ///
    /// `default_app_command` is what a sentinel falls back to if it cannot
    /// reconstruct the application's original argv during revival.
    pub fn new(interval_secs: u64, threshold: u64) -> Result<Self> {
        if interval_secs == 0 {
            return Err(WatchdogError::InvalidConfig {
                details: "interval_secs must be > 0".into(),
            });
        }

        let sentinel_binary = resolve_sentinel_binary()?;
        let default_app_command = vec![
            env::current_exe()
                .ok()
                .and_then(|p| p.to_str().map(str::to_owned))
                .unwrap_or_else(|| "app".to_owned()),
        ];

        Ok(Self {
            interval_secs,
            threshold,
            sentinel_binary,
            default_app_command,
            readiness_semaphore_name: "/twinwatch_ready".to_owned(),
        })
    }

    /// Override the default command vector used as a fallback on argv
    /// reconstruction failure.
    #[must_use]
    pub fn with_default_app_command(mut self, command: Vec<String>) -> Self {
        self.default_app_command = command;
        self
    }
}

/// Resolve the sentinel binary path: explicit env override, else a sibling of
/// the current executable named [`DEFAULT_SENTINEL_BIN_NAME`].
fn resolve_sentinel_binary() -> Result<PathBuf> {
    if let Ok(path) = env::var(ENV_SENTINEL_BIN) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let exe = env::current_exe().map_err(|e| WatchdogError::InvalidConfig {
        details: format!("could not resolve current_exe: {e}"),
    })?;
    let dir = exe.parent().unwrap_or_else(|| Path::new("."));
    Ok(dir.join(DEFAULT_SENTINEL_BIN_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_interval() {
        let err = WatchdogConfig::new(0, 3).unwrap_err();
        assert_eq!(err.code(), "WD-1001");
    }

    #[test]
    fn accepts_valid_interval_and_threshold() {
        let cfg = WatchdogConfig::new(1, 3).unwrap();
        assert_eq!(cfg.interval_secs, 1);
        assert_eq!(cfg.threshold, 3);
        assert_eq!(cfg.readiness_semaphore_name, "/twinwatch_ready");
    }

    #[test]
    fn default_app_command_overridable() {
        let cfg = WatchdogConfig::new(1, 3)
            .unwrap()
            .with_default_app_command(vec!["/usr/local/bin/app".into(), "--flag".into()]);
        assert_eq!(cfg.default_app_command, vec!["/usr/local/bin/app", "--flag"]);
    }
}
