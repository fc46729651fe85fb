//! The three scheduled tasks registered at `begin()`/`run_sentinel()`
//! (spec.md §4.2): the heartbeat, the revival check, and the
//! do-not-resuscitate observer. Kept as three distinct `Scheduler` entries
//! rather than merged into one (SPEC_FULL.md §9.5, spec.md §9's open
//! question on fused vs. split heartbeat/revive) so each keeps its own
//! cadence.
//!
//! Resetting `miss_counter` on an inbound ping, and setting `stop_flag` on
//! `SIG_DIE`, both happen directly in the signal handlers
//! ([`super::signals::register`]) — these tasks never touch the signals
//! themselves, only the atomics the handlers already mutated.

use std::sync::Arc;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::logger;
use crate::protocol::context::{PeerContext, Role};
use crate::protocol::revival::{self, ProcessSpawner};
use crate::scheduler::Scheduler;

/// Every tick: unless stopping, ping the peer and count it as an outstanding
/// miss (reset only happens asynchronously, via the `SIG_PING` handler).
/// Always reschedules — cessation is the scheduler-wide `Stop` the
/// DNR-observer task issues, not a per-task removal.
pub fn heartbeat_task(ctx: PeerContext) -> impl FnMut() -> i64 {
    move || {
        if !ctx.is_stopping() {
            let peer = ctx.peer_pid();
            if peer > 0 {
                if let Err(e) = signal::kill(Pid::from_raw(peer), Signal::SIGUSR1) {
                    logger::warn!("heartbeat: failed to ping peer {peer}: {e}");
                }
            }
            ctx.increment_miss_counter();
        }
        i64::try_from(ctx.interval()).unwrap_or(i64::MAX).max(1)
    }
}

/// Every tick: unless stopping, revive the peer once `miss_counter` exceeds
/// `threshold`.
pub fn revival_check_task(
    ctx: PeerContext,
    spawner: Arc<dyn ProcessSpawner>,
) -> impl FnMut() -> i64 {
    move || {
        if !ctx.is_stopping() && ctx.miss_counter() > ctx.threshold() {
            logger::warn!(
                "revival: peer pid {} missed {} consecutive pings, reviving",
                ctx.peer_pid(),
                ctx.miss_counter()
            );
            match revival::revive_peer(&ctx, spawner.as_ref()) {
                Ok(new_pid) => {
                    ctx.reset_miss_counter();
                    logger::info!("revival: new peer pid {new_pid}");
                }
                Err(e) if e.is_retryable() => {
                    logger::warn!("revival: attempt failed, will retry next tick: {e}");
                }
                Err(e) => {
                    logger::error!("revival: unrecoverable failure: {e}");
                }
            }
        }
        i64::try_from(ctx.interval()).unwrap_or(i64::MAX).max(1)
    }
}

/// Fixed 1-second cadence (spec.md §4.2), independent of the heartbeat
/// interval. Once `stop_flag` is observed, stops the whole scheduler and —
/// only for the application role — posts the failed-pings latch exactly
/// once so a blocked `end()` caller can unblock.
pub fn dnr_observer_task(ctx: PeerContext, scheduler: Scheduler) -> impl FnMut() -> i64 {
    let mut already_posted = false;
    move || {
        if ctx.is_stopping() {
            scheduler.stop();
            if !already_posted && ctx.role() == Role::App {
                ctx.failed_pings_latch().post();
                already_posted = true;
            }
        }
        1
    }
}
