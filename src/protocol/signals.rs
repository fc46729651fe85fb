//! `SIG_PING` (`SIGUSR1`) and `SIG_DIE` (`SIGUSR2`) registration (spec.md §4.2,
//! §5, §9 "async-signal safety"): each handler does nothing but an atomic
//! store — no allocation, no formatting, no logging on the hot path — so it
//! stays async-signal-safe.
//!
//! `signal_hook::low_level::register` is `unsafe` precisely because the
//! compiler cannot check that property; it is the caller's obligation. This
//! is the crate's other narrow exception to `#![deny(unsafe_code)]`, beside
//! [`crate::ipc::named_semaphore`].

#![allow(unsafe_code)]

use signal_hook::consts::{SIGUSR1, SIGUSR2};

use crate::core::errors::{Result, WatchdogError};
use crate::protocol::context::PeerContext;

/// Register both signals against a peer's context. The returned ids are not
/// needed again — handlers live for the process's lifetime, same as the
/// teacher's own `SIGTERM`/`SIGHUP` registrations.
pub fn register(ctx: &PeerContext) -> Result<()> {
    let ping_ctx = ctx.clone();
    // SAFETY: the closure only performs an atomic store through
    // `PeerContext::reset_miss_counter`, no allocation or locking.
    unsafe {
        signal_hook::low_level::register(SIGUSR1, move || ping_ctx.reset_miss_counter())
    }
    .map_err(|e| WatchdogError::Runtime {
        details: format!("failed to register SIG_PING (SIGUSR1): {e}"),
    })?;

    let die_ctx = ctx.clone();
    // SAFETY: as above, via `PeerContext::request_stop`.
    unsafe { signal_hook::low_level::register(SIGUSR2, move || die_ctx.request_stop()) }.map_err(
        |e| WatchdogError::Runtime {
            details: format!("failed to register SIG_DIE (SIGUSR2): {e}"),
        },
    )?;

    Ok(())
}
