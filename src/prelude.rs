//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use twinwatch::prelude::*;
//! ```

// Core
pub use crate::core::config::WatchdogConfig;
pub use crate::core::errors::{Result, WatchdogError};

// Protocol
pub use crate::protocol::bootstrap::{begin, end, run_sentinel};
pub use crate::protocol::{PeerContext, Role};

// Scheduler
pub use crate::scheduler::{Scheduler, State as SchedulerState, TaskHandle};
