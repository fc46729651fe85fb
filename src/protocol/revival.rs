//! The revival handshake (spec.md §4.2 step "peer presumed dead"): force-kill
//! whatever might still be left of the old peer, spawn its replacement, and
//! perform the readiness handshake for the sentinel-spawns-sentinel case.
//!
//! Spawning is behind a [`ProcessSpawner`] trait, the same seam the ambient
//! daemon's `platform::pal::ServiceManager` trait gives its own service
//! lifecycle calls, so the handshake logic can be exercised with a fake in
//! tests instead of actually forking a binary.

use std::path::{Path, PathBuf};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::core::env_registry;
use crate::core::errors::{Result, WatchdogError};
use crate::ipc::readiness;
use crate::protocol::context::{PeerContext, Role};

/// Starts a new OS process and reports back its pid. Abstracts over
/// `std::process::Command` so revival logic is testable without actually
/// spawning binaries.
pub trait ProcessSpawner: Send + Sync {
    fn spawn(&self, binary: &Path, args: &[String], env: &[(String, String)]) -> Result<i32>;
}

/// The real spawner, backed by `std::process::Command::spawn`.
pub struct StdProcessSpawner;

impl ProcessSpawner for StdProcessSpawner {
    fn spawn(&self, binary: &Path, args: &[String], env: &[(String, String)]) -> Result<i32> {
        let mut cmd = std::process::Command::new(binary);
        cmd.args(args);
        for (k, v) in env {
            cmd.env(k, v);
        }
        let child = cmd.spawn().map_err(|e| WatchdogError::SpawnFailed {
            binary: binary.display().to_string(),
            details: e.to_string(),
        })?;
        Ok(i32::try_from(child.id()).unwrap_or(i32::MAX))
    }
}

/// Send `SIGKILL` to a pid that is presumed unresponsive. A pid of 0 or a
/// peer that is already gone (`ESRCH`) is not an error — there was nothing to
/// kill.
pub fn force_kill_peer(pid: i32) -> Result<()> {
    if pid <= 0 {
        return Ok(());
    }
    match signal::kill(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(WatchdogError::SignalSendFailed {
            pid,
            details: e.to_string(),
        }),
    }
}

/// What to exec and with what arguments to bring a dead peer back.
fn peer_command(ctx: &PeerContext) -> Result<(PathBuf, Vec<String>)> {
    match ctx.role() {
        // The application revives a dead sentinel: always the configured
        // sentinel binary, no arguments of its own.
        Role::App => Ok((ctx.config().sentinel_binary.clone(), Vec::new())),
        // The sentinel revives a dead application: reconstruct the original
        // command line the application captured into the environment at its
        // own `begin()`, falling back to the configured default. An empty
        // reconstructed argv (`APP_ARG_COUNT == 0`, e.g. `begin(..., &[])`)
        // is a valid "nothing to preserve" state, not usable as a binary
        // path — treat it the same as a reconstruction miss.
        Role::Sentinel => {
            if let Some(mut argv) = env_registry::reconstruct_argv().filter(|a| !a.is_empty()) {
                let binary = PathBuf::from(argv.remove(0));
                Ok((binary, argv))
            } else if let Some((first, rest)) = ctx.config().default_app_command.split_first() {
                Ok((PathBuf::from(first), rest.to_vec()))
            } else {
                Err(WatchdogError::MissingPeerIdentifier {
                    key: env_registry::KEY_APP_ARG_COUNT,
                })
            }
        }
    }
}

/// Kill whatever is left of the old peer, spawn its replacement, and (only
/// for the application-revives-sentinel direction) wait for the new
/// sentinel's readiness signal before returning.
pub fn revive_peer(ctx: &PeerContext, spawner: &dyn ProcessSpawner) -> Result<i32> {
    force_kill_peer(ctx.peer_pid())?;

    let (binary, args) = peer_command(ctx)?;
    let mut env = vec![(
        ctx.own_pid_env_key().to_owned(),
        std::process::id().to_string(),
    )];
    // The application forwards its own captured-argv env pairs to *every*
    // sentinel it spawns, not just the first — otherwise a sentinel revived
    // by the application would lack `APP_ARG_*` and fall back to the default
    // command on its own first revival attempt (spec.md property 5).
    if ctx.role() == Role::App {
        env.extend(ctx.captured_argv_env().iter().cloned());
    }

    let new_pid = spawner.spawn(&binary, &args, &env)?;
    ctx.set_peer_pid(new_pid);

    if ctx.role() == Role::App {
        readiness::app_await_ready(&ctx.config().readiness_semaphore_name)?;
    }

    Ok(new_pid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::WatchdogConfig;
    use std::sync::Mutex;

    struct RecordingSpawner {
        calls: Mutex<Vec<(PathBuf, Vec<String>, Vec<(String, String)>)>>,
        next_pid: i32,
    }

    impl RecordingSpawner {
        fn new(next_pid: i32) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                next_pid,
            }
        }
    }

    impl ProcessSpawner for RecordingSpawner {
        fn spawn(&self, binary: &Path, args: &[String], env: &[(String, String)]) -> Result<i32> {
            self.calls
                .lock()
                .unwrap()
                .push((binary.to_path_buf(), args.to_vec(), env.to_vec()));
            Ok(self.next_pid)
        }
    }

    #[test]
    fn app_reviving_sentinel_uses_the_configured_sentinel_binary() {
        let cfg = WatchdogConfig::new(1, 3).unwrap();
        let sentinel_bin = cfg.sentinel_binary.clone();
        let ctx = PeerContext::new(Role::App, cfg);
        ctx.set_peer_pid(9999);

        let (binary, args) = peer_command(&ctx).unwrap();
        assert_eq!(binary, sentinel_bin);
        assert!(args.is_empty());
    }

    #[test]
    fn sentinel_reviving_app_falls_back_to_default_command() {
        let cfg = WatchdogConfig::new(1, 3)
            .unwrap()
            .with_default_app_command(vec!["/usr/bin/myapp".to_owned(), "--flag".to_owned()]);
        let ctx = PeerContext::new(Role::Sentinel, cfg);

        let (binary, args) = peer_command(&ctx).unwrap();
        assert_eq!(binary, PathBuf::from("/usr/bin/myapp"));
        assert_eq!(args, vec!["--flag".to_owned()]);
    }

    #[test]
    fn revive_peer_records_own_pid_under_the_peers_expected_key() {
        let cfg = WatchdogConfig::new(1, 3)
            .unwrap()
            .with_default_app_command(vec!["/bin/true".to_owned()]);
        let ctx = PeerContext::new(Role::Sentinel, cfg);
        let spawner = RecordingSpawner::new(4242);

        let pid = revive_peer(&ctx, &spawner).unwrap();
        assert_eq!(pid, 4242);
        assert_eq!(ctx.peer_pid(), 4242);

        let calls = spawner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (_, _, env) = &calls[0];
        assert!(env.contains(&(
            env_registry::KEY_SENTINEL_PID.to_owned(),
            std::process::id().to_string()
        )));
    }

    #[test]
    fn revive_peer_forwards_captured_argv_env_when_app_spawns_a_new_sentinel() {
        // Regression: a sentinel that the application revives must still be
        // able to reconstruct the application's argv on its own first
        // revival attempt, so the application's captured `APP_ARG_*` pairs
        // have to ride along on every sentinel spawn, not just the first.
        let cfg = WatchdogConfig::new(1, 3).unwrap();
        let captured = vec![
            (env_registry::KEY_APP_ARG_COUNT.to_owned(), "1".to_owned()),
            (env_registry::app_arg_key(0), "my-app".to_owned()),
        ];
        let ctx = PeerContext::with_captured_argv_env(Role::App, cfg, captured.clone());
        let spawner = RecordingSpawner::new(777);

        revive_peer(&ctx, &spawner).unwrap();

        let calls = spawner.calls.lock().unwrap();
        let (_, _, env) = &calls[0];
        for pair in &captured {
            assert!(env.contains(pair), "missing forwarded pair {pair:?}");
        }
    }

    #[test]
    fn revive_peer_does_not_forward_argv_env_when_sentinel_spawns_app() {
        // The sentinel passes reconstructed argv as command *args*, not env
        // vars — forwarding the application's capture pairs here would be a
        // stale, pointless no-op since the new application process doesn't
        // consume them.
        let cfg = WatchdogConfig::new(1, 3)
            .unwrap()
            .with_default_app_command(vec!["/bin/true".to_owned()]);
        let ctx = PeerContext::with_captured_argv_env(
            Role::Sentinel,
            cfg,
            vec![(env_registry::KEY_APP_ARG_COUNT.to_owned(), "1".to_owned())],
        );
        let spawner = RecordingSpawner::new(778);

        revive_peer(&ctx, &spawner).unwrap();

        let calls = spawner.calls.lock().unwrap();
        let (_, _, env) = &calls[0];
        assert!(!env.contains(&(env_registry::KEY_APP_ARG_COUNT.to_owned(), "1".to_owned())));
    }

    #[test]
    fn force_kill_of_pid_zero_is_a_no_op() {
        force_kill_peer(0).expect("pid 0 means nothing to kill");
    }

    #[test]
    fn force_kill_of_an_already_dead_pid_is_not_an_error() {
        // A pid this large is essentially guaranteed not to exist.
        force_kill_peer(i32::MAX - 1).expect("ESRCH should be swallowed");
    }
}
