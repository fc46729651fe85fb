//! The three public entry points (spec.md §4.3): [`begin`] and [`end`], called
//! from application code, and [`run_sentinel`], called from the sentinel
//! binary's `main`. A single process-wide slot holds the active context so
//! the signal handlers and the scheduler thread can all reach it without
//! every call site threading a handle through.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;

use crate::core::config::WatchdogConfig;
use crate::core::env_registry;
use crate::core::errors::{Result, WatchdogError};
use crate::ipc::readiness;
use crate::logger;
use crate::protocol::context::{PeerContext, Role};
use crate::protocol::revival::{ProcessSpawner, StdProcessSpawner};
use crate::protocol::signals;
use crate::protocol::tasks::{dnr_observer_task, heartbeat_task, revival_check_task};
use crate::scheduler::{Scheduler, now_secs};

/// Fixed cadence of the DNR-observer task (spec.md §4.2), independent of the
/// heartbeat interval.
const DNR_OBSERVER_PERIOD_SECS: u64 = 1;

struct Active {
    ctx: PeerContext,
    scheduler: Scheduler,
    thread: Option<JoinHandle<()>>,
}

static ACTIVE: Mutex<Option<Active>> = Mutex::new(None);

/// Send `SIG_DIE` (`SIGUSR2`) to `pid`, spec.md §4.3 "Shutdown" step 2. A pid
/// of 0 or a peer that is already gone (`ESRCH`) is not an error, same as
/// `revival::force_kill_peer`'s tolerance of an already-dead target.
fn send_sig_die(pid: i32) -> Result<()> {
    if pid <= 0 {
        return Ok(());
    }
    match signal::kill(Pid::from_raw(pid), Signal::SIGUSR2) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(WatchdogError::SignalSendFailed {
            pid,
            details: e.to_string(),
        }),
    }
}

fn register_tasks(ctx: &PeerContext, spawner: Arc<dyn ProcessSpawner>) -> Scheduler {
    let scheduler = Scheduler::create();
    let start = now_secs() + ctx.interval();

    scheduler.add_task(
        start,
        heartbeat_task(ctx.clone()),
        None::<Box<dyn FnOnce() + Send>>,
        ctx.interval(),
    );
    scheduler.add_task(
        start,
        revival_check_task(ctx.clone(), spawner),
        None::<Box<dyn FnOnce() + Send>>,
        ctx.interval(),
    );
    scheduler.add_task(
        now_secs() + DNR_OBSERVER_PERIOD_SECS,
        dnr_observer_task(ctx.clone(), scheduler.clone()),
        None::<Box<dyn FnOnce() + Send>>,
        DNR_OBSERVER_PERIOD_SECS,
    );

    scheduler
}

/// Begin mutual monitoring from the application side (spec.md §4.3 "begin").
///
/// Spawns a sentinel if none is already running for this pair (detected via
/// `SENTINEL_PID` in the environment), waits for its readiness signal, then
/// starts the scheduler on a dedicated background thread so the caller's own
/// main thread is free to continue.
pub fn begin(interval_secs: u64, threshold: u64, argv: &[String]) -> Result<()> {
    let mut guard = ACTIVE.lock();
    if guard.is_some() {
        return Err(WatchdogError::AlreadyMonitoring);
    }

    let config = WatchdogConfig::new(interval_secs, threshold)?;
    let captured_argv_env = env_registry::capture_argv_env(argv).unwrap_or_else(|| {
        logger::warn!("begin: argv too long to capture, revival will use the default command");
        Vec::new()
    });
    let ctx = PeerContext::with_captured_argv_env(Role::App, config, captured_argv_env);
    signals::register(&ctx)?;
    let spawner: Arc<dyn ProcessSpawner> = Arc::new(StdProcessSpawner);

    match env_registry::read_peer_pid(env_registry::KEY_SENTINEL_PID) {
        Some(pid) => {
            logger::info!("begin: adopting already-running sentinel pid {pid}");
            ctx.set_peer_pid(pid);
        }
        None => {
            let sem_name = ctx.config().readiness_semaphore_name.clone();
            let mut env = vec![(
                env_registry::KEY_APP_PID.to_owned(),
                std::process::id().to_string(),
            )];
            env.extend(ctx.captured_argv_env().iter().cloned());

            let pid = spawner.spawn(&ctx.config().sentinel_binary.clone(), &[], &env)?;
            ctx.set_peer_pid(pid);
            logger::info!("begin: spawned sentinel pid {pid}, awaiting readiness");

            readiness::app_await_ready(&sem_name)?;
            readiness::app_unlink(&sem_name)?;
        }
    }

    let scheduler = register_tasks(&ctx, spawner);
    let scheduler_for_thread = scheduler.clone();
    let thread = thread::Builder::new()
        .name("twinwatch-app-loop".to_owned())
        .spawn(move || scheduler_for_thread.start())
        .map_err(|e| WatchdogError::Runtime {
            details: format!("failed to spawn scheduler thread: {e}"),
        })?;

    *guard = Some(Active {
        ctx,
        scheduler,
        thread: Some(thread),
    });
    Ok(())
}

/// End mutual monitoring (spec.md §4.3 "end"), idempotent per scenario S5:
/// the first call tears everything down; a second call without an
/// intervening `begin()` returns [`WatchdogError::NotMonitoring`] rather than
/// panicking or blocking forever.
pub fn end() -> Result<()> {
    let active = {
        let mut guard = ACTIVE.lock();
        guard.take()
    }
    .ok_or(WatchdogError::NotMonitoring)?;

    active.ctx.request_stop();

    // spec.md §4.3 "Shutdown" step 2: tell the sentinel to stop too, so its
    // own DNR observer stops its scheduler instead of heartbeating and
    // eventually reviving an application that is shutting down on purpose.
    if let Err(e) = send_sig_die(active.ctx.peer_pid()) {
        logger::warn!("end: failed to send SIG_DIE to peer: {e}");
    }

    // Guaranteed to be posted by the DNR observer on its next tick, at most
    // `interval_secs` away.
    active.ctx.failed_pings_latch().wait();
    active.scheduler.stop();

    if let Some(thread) = active.thread {
        let _ = thread.join();
    }

    // `start()` has returned by now (the thread we just joined ran it to
    // completion), so `destroy()`'s precondition holds; this runs cleanup on
    // any entries still queued rather than leaking them (spec.md §4.1
    // `Destroy`).
    active.scheduler.destroy();

    logger::info!("end: monitoring stopped cleanly");
    Ok(())
}

/// Entry point for the sentinel binary's `main` (spec.md §4.3 "run_sentinel").
/// Blocks on the scheduler loop until `SIG_DIE` or a fatal revival failure.
pub fn run_sentinel(interval_secs: u64, threshold: u64) -> Result<()> {
    let config = WatchdogConfig::new(interval_secs, threshold)?;
    let app_pid = env_registry::read_peer_pid(env_registry::KEY_APP_PID).ok_or(
        WatchdogError::MissingPeerIdentifier {
            key: env_registry::KEY_APP_PID,
        },
    )?;

    let ctx = PeerContext::new(Role::Sentinel, config);
    ctx.set_peer_pid(app_pid);
    signals::register(&ctx)?;
    let spawner: Arc<dyn ProcessSpawner> = Arc::new(StdProcessSpawner);

    // spec.md §4.2 revival step 5: register this peer's own tasks *before*
    // posting readiness, so a waiting application can never observe the post
    // and find an empty task queue.
    let scheduler = register_tasks(&ctx, spawner);

    readiness::sentinel_signal_ready(&ctx.config().readiness_semaphore_name.clone())?;
    logger::info!("run_sentinel: watching app pid {app_pid}, interval={interval_secs}s threshold={threshold}");

    scheduler.start();
    scheduler.destroy();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_without_begin_fails_closed() {
        // Guards against the static slot leaking state across tests in this
        // module by making sure it starts empty here.
        let mut guard = ACTIVE.lock();
        *guard = None;
        drop(guard);

        let err = end().unwrap_err();
        assert_eq!(err.code(), "WD-1003");
    }

    #[test]
    fn send_sig_die_of_pid_zero_is_a_no_op() {
        send_sig_die(0).expect("pid 0 means nothing to signal");
    }

    #[test]
    fn send_sig_die_of_an_already_dead_pid_is_not_an_error() {
        send_sig_die(i32::MAX - 1).expect("ESRCH should be swallowed");
    }

    #[test]
    fn send_sig_die_reaches_a_real_process() {
        // A real child process that traps SIGUSR2 itself, since this crate's
        // own handler installation is process-wide and would otherwise
        // interfere with the rest of this process's signal state.
        let mut child = std::process::Command::new("/bin/sh")
            .args(["-c", "trap 'exit 42' USR2; sleep 5 & wait"])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .expect("spawn trap-and-wait shell");

        let pid = i32::try_from(child.id()).expect("pid fits in i32");
        send_sig_die(pid).expect("SIGUSR2 send should succeed");

        let status = child.wait().expect("wait for child");
        assert_eq!(status.code(), Some(42), "child should have trapped SIGUSR2 and exited via it");
    }
}
