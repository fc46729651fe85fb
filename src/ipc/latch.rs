//! Intra-process counting latch — the `failed_pings_sem` of spec.md §3.
//!
//! Only the application's own DNR-observer task and its `end()` caller ever
//! touch this, both in the same process, so a `parking_lot` `Mutex` + `Condvar`
//! counter stands in for the named/counting OS semaphore the original source
//! used here. `parking_lot` is already part of the teacher's dependency stack
//! (`daemon/loop_main.rs` uses its `Mutex`/`RwLock` throughout).

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A counting latch: `post` increments, `wait` blocks until the count is
/// positive then decrements it.
pub struct CountingLatch {
    count: Mutex<u64>,
    cond: Condvar,
}

impl CountingLatch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    /// Increment the count and wake one waiter.
    pub fn post(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.cond.notify_one();
    }

    /// Block until the count is positive, then decrement it.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.cond.wait(&mut count);
        }
        *count -= 1;
    }

    /// Block until the count is positive or `timeout` elapses. Returns `true`
    /// if it was decremented, `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut count = self.count.lock();
        if *count == 0 {
            let result = self.cond.wait_for(&mut count, timeout);
            if result.timed_out() && *count == 0 {
                return false;
            }
        }
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }
}

impl Default for CountingLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::CountingLatch;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn post_then_wait_does_not_block() {
        let latch = CountingLatch::new();
        latch.post();
        latch.wait();
    }

    #[test]
    fn wait_blocks_until_posted_from_another_thread() {
        let latch = Arc::new(CountingLatch::new());
        let latch2 = Arc::clone(&latch);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            latch2.post();
        });

        latch.wait();
        handle.join().unwrap();
    }

    #[test]
    fn multiple_posts_are_not_collapsed() {
        let latch = CountingLatch::new();
        latch.post();
        latch.post();
        latch.wait();
        latch.wait();
        assert!(!latch.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn wait_timeout_returns_false_when_never_posted() {
        let latch = CountingLatch::new();
        assert!(!latch.wait_timeout(Duration::from_millis(10)));
    }
}
