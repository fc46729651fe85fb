//! twinwatch — mutual-liveness watchdog for a user process ("the application").
//!
//! A companion process ("the sentinel") is launched alongside the application;
//! each peer periodically proves liveness to the other over a pair of Unix
//! signals, and either peer revives the other (kill + re-exec) when it stops
//! responding. The contract to the application is two calls:
//!
//! ```no_run
//! let argv: Vec<String> = std::env::args().collect();
//! twinwatch::begin(1, 3, &argv).unwrap();
//! // ... application work ...
//! twinwatch::end().unwrap();
//! ```
//!
//! See [`core`] for configuration/errors, [`scheduler`] for the periodic-task
//! runner, and [`protocol`] for the heartbeat/revival state machine.

#![deny(unsafe_code)]

pub mod core;
pub mod ipc;
pub mod logger;
pub mod protocol;
pub mod scheduler;

pub mod prelude;

pub use crate::core::errors::{Result, WatchdogError};
pub use crate::protocol::bootstrap::{begin, end};
