//! Optional realtime scheduling for the worker thread.
//!
//! With the `rt` feature the worker thread locks its pages and switches to
//! SCHED_FIFO so the 50 ms tick keeps its deadline under memory pressure.
//! Without the feature every call is a no-op, the default for development
//! and for head units that do not grant RT credentials.

use thiserror::Error;

/// RT setup failed; the caller decides whether to continue degraded.
#[derive(Debug, Error)]
#[error("rt setup failed: {0}")]
pub struct RtError(pub String);

/// Lock current and future pages into memory.
#[cfg(feature = "rt")]
fn lock_memory() -> Result<(), RtError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| RtError(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn lock_memory() -> Result<(), RtError> {
    Ok(())
}

/// Switch the current thread to SCHED_FIFO at the given priority.
#[cfg(feature = "rt")]
fn set_fifo_priority(priority: i32) -> Result<(), RtError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(RtError(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn set_fifo_priority(_priority: i32) -> Result<(), RtError> {
    Ok(())
}

/// Configure the calling thread for realtime operation.
///
/// Call from the worker thread itself, before entering the event loop.
pub fn configure_current_thread(priority: i32) -> Result<(), RtError> {
    lock_memory()?;
    set_fifo_priority(priority)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn without_rt_feature_setup_is_noop() {
        #[cfg(not(feature = "rt"))]
        assert!(configure_current_thread(20).is_ok());
    }
}
