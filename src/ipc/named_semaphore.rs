//! A POSIX named semaphore — the cross-process `wd_ready_sem` of spec.md §3.
//!
//! This is the one genuinely cross-*process* primitive in the system (the
//! application and the sentinel are different OS processes, so only a kernel
//! object reachable by name works), so unlike [`super::latch`] it cannot be
//! built from safe-Rust synchronization types. The crate denies `unsafe_code`
//! everywhere else; this module is the single, narrow exception.

#![allow(unsafe_code)]

use std::ffi::CString;
use std::io;

use crate::core::errors::{Result, WatchdogError};

/// An open handle to a named semaphore.
pub struct NamedSemaphore {
    handle: *mut libc::sem_t,
    name: String,
}

// SAFETY: `sem_t*` returned by `sem_open` is a stable kernel-object handle;
// POSIX guarantees `sem_post`/`sem_wait` are safe to call concurrently from
// multiple threads on the same handle.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Open the named semaphore, creating it with an initial count of 0 and
    /// permissive (0o666) access if it does not already exist.
    pub fn create_or_open(name: &str) -> Result<Self> {
        let cname = CString::new(name).map_err(|e| WatchdogError::ReadinessPrimitive {
            name: name.to_owned(),
            details: format!("invalid semaphore name: {e}"),
        })?;

        // SAFETY: `cname` is a valid, NUL-terminated C string that outlives
        // this call; `sem_open` with `O_CREAT` takes the two trailing
        // variadic args (mode, initial value) we supply.
        let handle = unsafe { libc::sem_open(cname.as_ptr(), libc::O_CREAT, 0o666u32, 0u32) };

        if handle.is_null() || handle == libc::SEM_FAILED {
            return Err(WatchdogError::ReadinessPrimitive {
                name: name.to_owned(),
                details: io::Error::last_os_error().to_string(),
            });
        }

        Ok(Self {
            handle,
            name: name.to_owned(),
        })
    }

    /// Increment the semaphore, waking one waiter.
    pub fn post(&self) -> Result<()> {
        // SAFETY: `self.handle` is a valid, open semaphore for the lifetime
        // of `self`.
        let rc = unsafe { libc::sem_post(self.handle) };
        if rc != 0 {
            return Err(WatchdogError::ReadinessPrimitive {
                name: self.name.clone(),
                details: io::Error::last_os_error().to_string(),
            });
        }
        Ok(())
    }

    /// Block until the semaphore is positive, then decrement it. Retries
    /// transparently on `EINTR`, matching the original `while(sem_wait(...))`
    /// retry loop.
    pub fn wait(&self) -> Result<()> {
        loop {
            // SAFETY: as above.
            let rc = unsafe { libc::sem_wait(self.handle) };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(WatchdogError::ReadinessPrimitive {
                name: self.name.clone(),
                details: err.to_string(),
            });
        }
    }

    /// Remove the semaphore's name from the filesystem namespace. Existing
    /// open handles (including `self`) remain valid until closed.
    pub fn unlink(name: &str) -> Result<()> {
        let cname = CString::new(name).map_err(|e| WatchdogError::ReadinessPrimitive {
            name: name.to_owned(),
            details: format!("invalid semaphore name: {e}"),
        })?;
        // SAFETY: `cname` is a valid, NUL-terminated C string for the call.
        let rc = unsafe { libc::sem_unlink(cname.as_ptr()) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            // ENOENT is fine: nothing to unlink, not a failure the caller
            // needs to react to.
            if err.kind() != io::ErrorKind::NotFound {
                return Err(WatchdogError::ReadinessPrimitive {
                    name: name.to_owned(),
                    details: err.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: `self.handle` was returned by a successful `sem_open` and
        // is closed at most once, here.
        unsafe {
            libc::sem_close(self.handle);
        }
    }
}
