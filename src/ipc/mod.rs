//! Inter-process and intra-process synchronization primitives.
//!
//! [`latch`] is the in-process counting latch standing in for
//! `failed_pings_sem` (spec.md §3); [`named_semaphore`] and [`readiness`] are
//! the cross-process named semaphore standing in for `wd_ready_sem`.

pub mod latch;
pub mod named_semaphore;
pub mod readiness;
