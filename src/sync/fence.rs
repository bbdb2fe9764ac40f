use crate::errors::{DriverError, DriverResult};

use ::std::{
    fmt,
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

/// One point on a queue's execution timeline, waitable from the CPU.
///
/// A fence is re-armed every time a signal operation referencing it is
/// encoded (into a command buffer or directly on a queue); it returns to
/// the signaled state when the GPU executes that point. A fence whose
/// owning queue enters the error state is poisoned: the signal will never
/// arrive and waits report `Fail`.
///
/// Cheap to clone; all clones observe the same timeline point.
#[derive(Clone)]
pub struct Fence {
    state: Arc<FenceState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Signaled,
    Pending,
    Poisoned,
}

struct FenceState {
    status: Mutex<Status>,
    cond: Condvar,
}

impl Fence {
    /// A new fence in the "already complete" state.
    pub fn new() -> Self {
        Self {
            state: Arc::new(FenceState {
                status: Mutex::new(Status::Signaled),
                cond: Condvar::new(),
            }),
        }
    }

    /// Block the calling thread until the fence signals.
    ///
    /// `timeout_ns` bounds the wait in nanoseconds; a negative value waits
    /// indefinitely and zero polls without blocking. Returns `Timeout` if
    /// the deadline elapsed first and `Fail` if the fence was poisoned by
    /// its queue entering the error state.
    pub fn wait(&self, timeout_ns: i64) -> DriverResult<()> {
        let mut status = self
            .state
            .status
            .lock()
            .expect("fence state lock poisoned");

        if timeout_ns < 0 {
            while *status == Status::Pending {
                status = self
                    .state
                    .cond
                    .wait(status)
                    .expect("fence state lock poisoned");
            }
        } else {
            let deadline = Instant::now() + Duration::from_nanos(timeout_ns as u64);
            while *status == Status::Pending {
                let now = Instant::now();
                if now >= deadline {
                    return Err(DriverError::Timeout);
                }
                let (guard, _) = self
                    .state
                    .cond
                    .wait_timeout(status, deadline - now)
                    .expect("fence state lock poisoned");
                status = guard;
            }
        }

        match *status {
            Status::Signaled => Ok(()),
            Status::Poisoned => Err(DriverError::Fail),
            Status::Pending => unreachable!("wait loop exited while pending"),
        }
    }

    /// True once the fence has signaled (non-blocking probe).
    pub fn is_signaled(&self) -> bool {
        *self.state.status.lock().expect("fence state lock poisoned") == Status::Signaled
    }

    /// Return the fence to the unsignaled state. Called when a signal
    /// operation referencing it is encoded.
    pub(crate) fn arm(&self) {
        let mut status = self
            .state
            .status
            .lock()
            .expect("fence state lock poisoned");
        *status = Status::Pending;
    }

    /// Deliver the signal. Called by the queue worker when execution
    /// reaches the encoded signal point.
    pub(crate) fn signal(&self) {
        let mut status = self
            .state
            .status
            .lock()
            .expect("fence state lock poisoned");
        *status = Status::Signaled;
        self.state.cond.notify_all();
    }

    /// Mark a pending signal as undeliverable. Fences that already
    /// signaled are left alone.
    pub(crate) fn poison(&self) {
        let mut status = self
            .state
            .status
            .lock()
            .expect("fence state lock poisoned");
        if *status == Status::Pending {
            *status = Status::Poisoned;
            self.state.cond.notify_all();
        }
    }

    /// GPU-side wait used by the queue worker: block until the fence
    /// resolves, returning false if it was poisoned.
    ///
    /// There is no timeout here on purpose: an encoded wait on a fence
    /// that never signals is a GPU hang, exactly as on hardware.
    pub(crate) fn wait_gpu(&self) -> bool {
        let mut status = self
            .state
            .status
            .lock()
            .expect("fence state lock poisoned");
        while *status == Status::Pending {
            status = self
                .state
                .cond
                .wait(status)
                .expect("fence state lock poisoned");
        }
        *status == Status::Signaled
    }

    /// True when both handles refer to the same timeline point.
    pub fn is_same(&self, other: &Fence) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl Default for Fence {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Fence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = *self.state.status.lock().expect("fence state lock poisoned");
        f.debug_struct("Fence").field("status", &status).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::std::thread;

    #[test]
    fn default_fence_is_already_complete() {
        let fence = Fence::new();
        assert!(fence.is_signaled());
        assert_eq!(fence.wait(0), Ok(()));
        assert_eq!(fence.wait(-1), Ok(()));
    }

    #[test]
    fn zero_timeout_wait_on_armed_fence_reports_timeout() {
        let fence = Fence::new();
        fence.arm();
        assert_eq!(fence.wait(0), Err(DriverError::Timeout));
        // A short bounded wait times out too, without hanging.
        assert_eq!(fence.wait(1_000_000), Err(DriverError::Timeout));
    }

    #[test]
    fn signal_wakes_a_blocked_waiter() {
        let fence = Fence::new();
        fence.arm();
        let waiter = {
            let fence = fence.clone();
            thread::spawn(move || fence.wait(-1))
        };
        thread::sleep(Duration::from_millis(10));
        fence.signal();
        assert_eq!(waiter.join().unwrap(), Ok(()));
    }

    #[test]
    fn poisoned_fence_reports_fail() {
        let fence = Fence::new();
        fence.arm();
        fence.poison();
        assert_eq!(fence.wait(-1), Err(DriverError::Fail));
        assert_eq!(fence.wait(0), Err(DriverError::Fail));
    }

    #[test]
    fn poison_does_not_revoke_a_delivered_signal() {
        let fence = Fence::new();
        fence.arm();
        fence.signal();
        fence.poison();
        assert_eq!(fence.wait(0), Ok(()));
    }

    #[test]
    fn rearming_returns_the_fence_to_pending() {
        let fence = Fence::new();
        fence.arm();
        fence.signal();
        assert!(fence.is_signaled());
        fence.arm();
        assert!(!fence.is_signaled());
        assert_eq!(fence.wait(0), Err(DriverError::Timeout));
    }
}
