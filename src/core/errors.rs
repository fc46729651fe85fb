//! WD-prefixed error types with structured error codes.

#![allow(missing_docs)]

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, WatchdogError>;

/// Top-level error type for twinwatch.
#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error("[WD-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[WD-1002] begin() called while already monitoring")]
    AlreadyMonitoring,

    #[error("[WD-1003] end() called without an active begin()")]
    NotMonitoring,

    #[error("[WD-2001] missing required peer identifier: {key}")]
    MissingPeerIdentifier { key: &'static str },

    #[error("[WD-2002] failed to spawn peer process {binary}: {details}")]
    SpawnFailed { binary: String, details: String },

    #[error("[WD-2003] failed to send signal to pid {pid}: {details}")]
    SignalSendFailed { pid: i32, details: String },

    #[error("[WD-2101] named readiness primitive failure for {name}: {details}")]
    ReadinessPrimitive { name: String, details: String },

    #[error("[WD-3001] resource allocation failed: {details}")]
    Allocation { details: String },

    #[error("[WD-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl WatchdogError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "WD-1001",
            Self::AlreadyMonitoring => "WD-1002",
            Self::NotMonitoring => "WD-1003",
            Self::MissingPeerIdentifier { .. } => "WD-2001",
            Self::SpawnFailed { .. } => "WD-2002",
            Self::SignalSendFailed { .. } => "WD-2003",
            Self::ReadinessPrimitive { .. } => "WD-2101",
            Self::Allocation { .. } => "WD-3001",
            Self::Runtime { .. } => "WD-3900",
        }
    }

    /// Whether a revival tick may simply retry rather than treat this as fatal.
    ///
    /// Matches spec.md §7: fork/exec failure leaves `miss_counter` high and the
    /// next scheduler tick retries; readiness-primitive failure aborts bootstrap
    /// but a revival still proceeds without the explicit handshake.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SpawnFailed { .. } | Self::ReadinessPrimitive { .. } | Self::Runtime { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::WatchdogError;

    #[test]
    fn codes_are_stable() {
        assert_eq!(WatchdogError::AlreadyMonitoring.code(), "WD-1002");
        assert_eq!(
            WatchdogError::MissingPeerIdentifier { key: "APP_PID" }.code(),
            "WD-2001"
        );
    }

    #[test]
    fn spawn_failure_is_retryable_readiness_failure_is_not_fatal_to_loop() {
        let spawn = WatchdogError::SpawnFailed {
            binary: "sentinel".into(),
            details: "ENOENT".into(),
        };
        assert!(spawn.is_retryable());

        let missing = WatchdogError::MissingPeerIdentifier { key: "APP_PID" };
        assert!(!missing.is_retryable());
    }
}
