//! A minimal cooperative periodic-task runner for a single thread (spec.md
//! §4.1). `Scheduler::start` is a blocking call — the caller is expected to
//! run it on a dedicated worker thread (that's `protocol::bootstrap`'s job),
//! the same relationship the teacher's `daemon/loop_main.rs` has with the
//! monitor thread it spawns.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

/// Opaque handle to a scheduled task. The scheduler owns task entries;
/// callers never dereference this, they just hold it for symmetry with
/// spec.md's `AddTask` returning a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

/// Scheduler run state (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
    StopRequested,
}

type Action = Box<dyn FnMut() -> i64 + Send>;
type Cleanup = Box<dyn FnOnce() + Send>;

struct TaskEntry {
    next_run_time: u64,
    seq: u64,
    interval: u64,
    action: Action,
    cleanup: Option<Cleanup>,
}

impl TaskEntry {
    fn run_cleanup(mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

// `BinaryHeap` is a max-heap; reversing the comparison on `(next_run_time,
// seq)` turns it into the min-heap spec.md §4.1 wants (smallest
// `next_run_time` first, FIFO insertion order as the tie-break).
impl PartialEq for TaskEntry {
    fn eq(&self, other: &Self) -> bool {
        self.next_run_time == other.next_run_time && self.seq == other.seq
    }
}
impl Eq for TaskEntry {}
impl PartialOrd for TaskEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for TaskEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.next_run_time, self.seq)
            .cmp(&(other.next_run_time, other.seq))
            .reverse()
    }
}

/// Current wall-clock time in whole seconds since the epoch. Scheduling is
/// coarse by design (spec.md §4.1 edge cases) — it matches the heartbeat
/// granularity.
#[must_use]
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A cooperative, single-threaded periodic-task scheduler.
///
/// Cheap to clone: internally an `Arc`-backed handle, so a task's action may
/// add further tasks to the same scheduler it is running on (spec.md §9:
/// "the task receives only a non-owning handle").
#[derive(Clone)]
pub struct Scheduler {
    queue: std::sync::Arc<Mutex<BinaryHeap<TaskEntry>>>,
    state: std::sync::Arc<Mutex<State>>,
    next_id: std::sync::Arc<AtomicU64>,
    next_seq: std::sync::Arc<AtomicU64>,
}

impl Scheduler {
    /// Create an empty scheduler in [`State::Idle`].
    #[must_use]
    pub fn create() -> Self {
        Self {
            queue: std::sync::Arc::new(Mutex::new(BinaryHeap::new())),
            state: std::sync::Arc::new(Mutex::new(State::Idle)),
            next_id: std::sync::Arc::new(AtomicU64::new(1)),
            next_seq: std::sync::Arc::new(AtomicU64::new(0)),
        }
    }

    /// Current scheduler state.
    #[must_use]
    pub fn state(&self) -> State {
        *self.state.lock()
    }

    /// Insert a new task entry.
    ///
    /// `interval == 0` means one-shot. `action` is invoked with the queue
    /// lock released; its return value controls rescheduling (spec.md
    /// §4.1): `> 0` reschedules at `now + return_value`; `== 0` reschedules
    /// at `now + interval` if `interval > 0`, else removes the task; `< 0`
    /// removes the task immediately. `cleanup`, if present, runs exactly
    /// once, either when the task is finally removed or at teardown.
    pub fn add_task<A, C>(&self, first_run_time: u64, action: A, cleanup: Option<C>, interval: u64) -> TaskHandle
    where
        A: FnMut() -> i64 + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        let entry = TaskEntry {
            next_run_time: first_run_time,
            seq,
            interval,
            action: Box::new(action),
            cleanup: cleanup.map(|c| Box::new(c) as Cleanup),
        };
        self.queue.lock().push(entry);
        TaskHandle(id)
    }

    /// Request that the scheduler stop. The in-flight action (if any)
    /// finishes, then the loop exits before the next dequeue (spec.md
    /// §4.1 edge cases).
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if *state == State::Running {
            *state = State::StopRequested;
        }
    }

    /// Run the scheduler loop. Blocking — call this on a dedicated thread.
    ///
    /// Peeks the queue head, sleeps until its `next_run_time`, dequeues,
    /// invokes its action, then reschedules or removes it per the action's
    /// return value. Exits when the queue empties or `stop()` was called.
    pub fn start(&self) {
        {
            let mut state = self.state.lock();
            *state = State::Running;
        }

        loop {
            if *self.state.lock() == State::StopRequested {
                break;
            }

            let Some(next_run_time) = self.queue.lock().peek().map(|e| e.next_run_time) else {
                break;
            };

            let now = now_secs();
            if next_run_time > now {
                std::thread::sleep(Duration::from_secs(next_run_time - now));
            }

            if *self.state.lock() == State::StopRequested {
                break;
            }

            let Some(mut entry) = self.queue.lock().pop() else {
                break;
            };

            let outcome = (entry.action)();
            let now = now_secs();

            match outcome.cmp(&0) {
                Ordering::Greater => {
                    // Safe: `outcome > 0` here, representable as u64.
                    #[allow(clippy::cast_sign_loss)]
                    let delay = outcome as u64;
                    entry.next_run_time = now + delay;
                    self.queue.lock().push(entry);
                }
                Ordering::Equal if entry.interval > 0 => {
                    entry.next_run_time = now + entry.interval;
                    self.queue.lock().push(entry);
                }
                _ => entry.run_cleanup(),
            }
        }

        {
            let mut state = self.state.lock();
            if *state != State::Idle {
                *state = State::Idle;
            }
        }
    }

    /// Run any remaining cleanups and drop the queue. Must be called only
    /// after `start()` has returned (spec.md §4.1 `Destroy`).
    pub fn destroy(self) {
        let mut queue = self.queue.lock();
        while let Some(entry) = queue.pop() {
            entry.run_cleanup();
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::create()
    }
}
