// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Execution contexts and the kernel hooks they rely on.
//!
//! A call into the Secure partition must not be interrupted by a context
//! switch on the Non-Secure side, or the banked stack state of the
//! security-state transition gets corrupted. From a thread that means
//! suspending the scheduler around each crossing. From an interrupt handler
//! the scheduler can't run anyway, and the kernel may not support being
//! asked to suspend it, so nothing is done.
//!
//! Which of the two applies is decided by the caller's [`Context`]
//! capability rather than by asking the hardware, so both paths can be
//! exercised off target.

use crate::signal::Signal;

/// What the dispatcher needs from the Non-Secure kernel.
pub trait Kernel {
    type Signal: Signal;

    /// Prevents the scheduler from switching threads until the matching
    /// call to `resume_scheduler`. Calls nest.
    fn suspend_scheduler(&self);

    fn resume_scheduler(&self);

    /// Makes a new, lowered, completion signal.
    fn new_signal(&self) -> Self::Signal;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Thread {}
    impl Sealed for super::Interrupt {}
}

/// The context a dispatcher operation is running in.
pub trait Context: sealed::Sealed {
    /// Runs `f`, which crosses into the Secure partition, with whatever
    /// protection this context needs.
    fn cross<K: Kernel, R, F: FnOnce() -> R>(&self, kernel: &K, f: F) -> R;

    /// Whether the caller may block on a completion signal.
    fn may_block(&self) -> bool;
}

/// Ordinary thread context.
#[derive(Copy, Clone, Debug, Default)]
pub struct Thread;

impl Context for Thread {
    fn cross<K: Kernel, R, F: FnOnce() -> R>(&self, kernel: &K, f: F) -> R {
        let _lock = SchedulerLock::new(kernel);
        f()
    }

    fn may_block(&self) -> bool {
        true
    }
}

/// Interrupt context. Only obtainable by promising that's where we are.
#[derive(Debug)]
pub struct Interrupt {
    _private: (),
}

impl Interrupt {
    /// # Safety
    ///
    /// The caller must be executing in an exception handler (or, off target,
    /// in code standing in for one), and must not let the value escape it.
    pub unsafe fn assume() -> Self {
        Interrupt { _private: () }
    }
}

impl Context for Interrupt {
    fn cross<K: Kernel, R, F: FnOnce() -> R>(&self, _kernel: &K, f: F) -> R {
        f()
    }

    fn may_block(&self) -> bool {
        false
    }
}

/// Holds the scheduler suspended; resumes it on drop, including during
/// unwinding on the host.
struct SchedulerLock<'a, K: Kernel> {
    kernel: &'a K,
}

impl<'a, K: Kernel> SchedulerLock<'a, K> {
    fn new(kernel: &'a K) -> Self {
        kernel.suspend_scheduler();
        Self { kernel }
    }
}

impl<K: Kernel> Drop for SchedulerLock<'_, K> {
    fn drop(&mut self) {
        self.kernel.resume_scheduler();
    }
}
