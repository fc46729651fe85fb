//! Per-process peer state (spec.md §3 "Peer context"), shared between the
//! scheduler thread and the signal handlers via atomics.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};

use crate::core::config::WatchdogConfig;
use crate::core::env_registry;
use crate::ipc::latch::CountingLatch;

pub use crate::core::env_registry::Role;

/// Shared, process-wide peer state. Cheap to clone (an `Arc` wrapper) so the
/// signal handlers, the scheduled tasks, and the `begin`/`end` entry points
/// can all hold a handle to the same atomics.
///
/// This is the "single process-wide context initialized at `begin` and torn
/// down at `end`" spec.md §9 calls for — the only structural alternative
/// given signal handlers have no user-parameter channel of their own.
#[derive(Clone)]
pub struct PeerContext {
    inner: Arc<Inner>,
}

struct Inner {
    role: Role,
    peer_pid: AtomicI32,
    miss_counter: AtomicU64,
    threshold: u64,
    interval: u64,
    stop_flag: AtomicBool,
    failed_pings: CountingLatch,
    config: WatchdogConfig,
    /// `APP_ARG_COUNT`/`APP_ARG_<i>` pairs captured from this process's own
    /// argv at `begin()` (empty for the sentinel role). Carried in `Inner`
    /// rather than recomputed per-spawn so that every sentinel this
    /// application ever spawns — the first one *and* any later revival of a
    /// dead sentinel — inherits the same capture, letting a freshly spawned
    /// sentinel still reconstruct the application's argv on its own first
    /// revival attempt.
    captured_argv_env: Vec<(String, String)>,
}

impl PeerContext {
    #[must_use]
    pub fn new(role: Role, config: WatchdogConfig) -> Self {
        Self::with_captured_argv_env(role, config, Vec::new())
    }

    /// Like [`Self::new`], additionally recording the `(key, value)` env
    /// pairs (spec.md §3 "Argv capture") that must accompany *every* spawn of
    /// a new sentinel by the application, not just the first.
    #[must_use]
    pub fn with_captured_argv_env(
        role: Role,
        config: WatchdogConfig,
        captured_argv_env: Vec<(String, String)>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                role,
                peer_pid: AtomicI32::new(0),
                miss_counter: AtomicU64::new(0),
                threshold: config.threshold,
                interval: config.interval_secs,
                stop_flag: AtomicBool::new(false),
                failed_pings: CountingLatch::new(),
                config,
                captured_argv_env,
            }),
        }
    }

    /// The application's captured-argv env pairs, to be merged into the
    /// environment of every sentinel this process spawns. Empty for the
    /// sentinel role, which never needs to forward its own argv this way.
    #[must_use]
    pub fn captured_argv_env(&self) -> &[(String, String)] {
        &self.inner.captured_argv_env
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.inner.role
    }

    #[must_use]
    pub fn config(&self) -> &WatchdogConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn threshold(&self) -> u64 {
        self.inner.threshold
    }

    #[must_use]
    pub fn interval(&self) -> u64 {
        self.inner.interval
    }

    #[must_use]
    pub fn peer_pid(&self) -> i32 {
        self.inner.peer_pid.load(Ordering::SeqCst)
    }

    pub fn set_peer_pid(&self, pid: i32) {
        self.inner.peer_pid.store(pid, Ordering::SeqCst);
    }

    #[must_use]
    pub fn miss_counter(&self) -> u64 {
        self.inner.miss_counter.load(Ordering::SeqCst)
    }

    /// Atomically increment the miss counter and return the new value. Called
    /// by the heartbeat task, never by a signal handler.
    pub fn increment_miss_counter(&self) -> u64 {
        self.inner.miss_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Reset the miss counter to 0. Async-signal-safe: this is the only
    /// operation `SIG_PING`'s handler performs.
    pub fn reset_miss_counter(&self) {
        self.inner.miss_counter.store(0, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.inner.stop_flag.load(Ordering::SeqCst)
    }

    /// Set the stop flag. Monotonic: once true, spec.md §5 guarantees no task
    /// ever observes it flip back to false — this type never offers a way to
    /// clear it.
    pub fn request_stop(&self) {
        self.inner.stop_flag.store(true, Ordering::SeqCst);
    }

    /// The DNR-observer's exactly-once completion signal for `end()`. Only
    /// meaningful for [`Role::App`].
    pub fn failed_pings_latch(&self) -> &CountingLatch {
        &self.inner.failed_pings
    }

    /// This role's own pid env key, used when announcing itself to a freshly
    /// spawned peer (spec.md §4.2 revival step 2).
    #[must_use]
    pub fn own_pid_env_key(&self) -> &'static str {
        match self.inner.role {
            Role::App => env_registry::KEY_APP_PID,
            Role::Sentinel => env_registry::KEY_SENTINEL_PID,
        }
    }

    /// The peer's pid env key, read at bootstrap to learn an already-running
    /// peer's pid.
    #[must_use]
    pub fn peer_pid_env_key(&self) -> &'static str {
        match self.inner.role {
            Role::App => env_registry::KEY_SENTINEL_PID,
            Role::Sentinel => env_registry::KEY_APP_PID,
        }
    }
}
