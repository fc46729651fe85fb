//! The readiness-semaphore rule (SPEC_FULL.md §9.4): the sentinel always
//! posts, the application always awaits, and only the application unlinks —
//! and only once, right after its own initial wait.

use crate::core::errors::Result;
use crate::ipc::named_semaphore::NamedSemaphore;

/// Sentinel side: create-or-open the named semaphore and post it. Called once
/// the sentinel's own tasks are registered (normal bootstrap) and again every
/// time it spawns a new application instance via revival.
pub fn sentinel_signal_ready(name: &str) -> Result<()> {
    let sem = NamedSemaphore::create_or_open(name)?;
    sem.post()
}

/// Application side: create-or-open the named semaphore and block until the
/// sentinel posts it. Called at initial `begin()` only when a brand-new
/// sentinel was just spawned, and whenever the application revives a dead
/// sentinel.
pub fn app_await_ready(name: &str) -> Result<()> {
    let sem = NamedSemaphore::create_or_open(name)?;
    sem.wait()
}

/// Application side: remove the semaphore's name. Called exactly once, after
/// the application's own initial wait succeeds (spec.md §6: "unlinked by the
/// application after bootstrap").
pub fn app_unlink(name: &str) -> Result<()> {
    NamedSemaphore::unlink(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn test_name(label: &str) -> String {
        format!("/twinwatch_readiness_test_{label}_{}", std::process::id())
    }

    #[test]
    fn app_await_unblocks_after_sentinel_signals() {
        let name = Arc::new(test_name("handshake"));
        let name2 = Arc::clone(&name);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            sentinel_signal_ready(&name2).expect("sentinel posts");
        });

        app_await_ready(&name).expect("app awaits and unblocks");
        handle.join().unwrap();
        app_unlink(&name).expect("app unlinks once");
    }
}
