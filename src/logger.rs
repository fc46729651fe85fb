//! Bracketed `eprintln!`-style diagnostics (SPEC_FULL.md §9.7), matching the
//! ambient daemon's own `[SBH-DAEMON]`-style logging rather than pulling in a
//! structured logging framework this crate has no sink configuration for.

/// Informational progress, always printed.
macro_rules! info {
    ($($arg:tt)*) => {
        eprintln!("[TWINWATCH-INFO] {}", format_args!($($arg)*))
    };
}

/// A condition worth a user's attention but not fatal to the process.
macro_rules! warn {
    ($($arg:tt)*) => {
        eprintln!("[TWINWATCH-WARN] {}", format_args!($($arg)*))
    };
}

/// A failure the caller is about to propagate or act on.
macro_rules! error {
    ($($arg:tt)*) => {
        eprintln!("[TWINWATCH-ERROR] {}", format_args!($($arg)*))
    };
}

/// Debug-build-only chatter, compiled out of release binaries entirely.
macro_rules! trace {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) {
            eprintln!("[TWINWATCH-TRACE] {}", format_args!($($arg)*))
        }
    };
}

pub(crate) use error;
pub(crate) use info;
pub(crate) use trace;
pub(crate) use warn;
