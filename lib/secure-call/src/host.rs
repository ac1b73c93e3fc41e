// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A [`Kernel`] for running the dispatcher on a hosted OS.
//!
//! There's no scheduler to suspend from user space, so suspension is only
//! counted; tests use the counts to check that interrupt-context calls never
//! ask for it and that every suspension is matched by a resume.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use crate::context::Kernel;
use crate::signal::{Signal, WaitFailed};

#[derive(Default)]
pub struct HostKernel {
    depth: AtomicUsize,
    suspensions: AtomicUsize,
    waits: Arc<AtomicUsize>,
}

impl HostKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the scheduler has been suspended, in total.
    pub fn suspensions(&self) -> usize {
        self.suspensions.load(Ordering::SeqCst)
    }

    /// Current suspension nesting depth, summed over all threads.
    pub fn suspended(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// How many times a thread has blocked on any of this kernel's signals.
    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

impl Kernel for HostKernel {
    type Signal = StdSignal;

    fn suspend_scheduler(&self) {
        self.depth.fetch_add(1, Ordering::SeqCst);
        self.suspensions.fetch_add(1, Ordering::SeqCst);
    }

    fn resume_scheduler(&self) {
        let prev = self.depth.fetch_sub(1, Ordering::SeqCst);
        assert!(prev > 0, "scheduler resumed without being suspended");
    }

    fn new_signal(&self) -> StdSignal {
        StdSignal {
            available: Mutex::new(false),
            cond: Condvar::new(),
            waits: self.waits.clone(),
        }
    }
}

/// A binary semaphore built from a mutex and a condition variable.
pub struct StdSignal {
    available: Mutex<bool>,
    cond: Condvar,
    waits: Arc<AtomicUsize>,
}

impl Signal for StdSignal {
    fn raise(&self) {
        let mut available =
            self.available.lock().unwrap_or_else(PoisonError::into_inner);
        *available = true;
        self.cond.notify_one();
    }

    fn try_take(&self) -> bool {
        let mut available =
            self.available.lock().unwrap_or_else(PoisonError::into_inner);
        core::mem::replace(&mut *available, false)
    }

    fn wait(&self) -> Result<(), WaitFailed> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        let mut available =
            self.available.lock().unwrap_or_else(PoisonError::into_inner);
        while !*available {
            available = self
                .cond
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available = false;
        Ok(())
    }
}
