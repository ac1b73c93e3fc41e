// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A [`Kernel`] for firmware with no RTOS underneath.
//!
//! With a single thread there is no scheduler to suspend, and a waiting
//! caller just sleeps until the EGU interrupt raises its signal.

use core::sync::atomic::{AtomicBool, Ordering};

use secure_call::{Kernel, Signal, WaitFailed};

#[derive(Copy, Clone, Debug, Default)]
pub struct BareMetal;

impl Kernel for BareMetal {
    type Signal = WfeSignal;

    fn suspend_scheduler(&self) {}

    fn resume_scheduler(&self) {}

    fn new_signal(&self) -> WfeSignal {
        WfeSignal::new()
    }
}

/// A flag raised from interrupt context, waited on with `WFE`.
#[derive(Debug, Default)]
pub struct WfeSignal {
    raised: AtomicBool,
}

impl WfeSignal {
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }
}

fn sleep() {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "none")] {
            cortex_m::asm::wfe();
        } else {
            std::thread::yield_now();
        }
    }
}

fn wake() {
    #[cfg(target_os = "none")]
    cortex_m::asm::sev();
}

impl Signal for WfeSignal {
    fn raise(&self) {
        self.raised.store(true, Ordering::Release);
        wake();
    }

    fn try_take(&self) -> bool {
        self.raised.swap(false, Ordering::Acquire)
    }

    fn wait(&self) -> Result<(), WaitFailed> {
        // An interrupt between the check and WFE sets the event register,
        // so the WFE returns at once.
        while !self.try_take() {
            sleep();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use secure_call::fake::{FakeSecure, Reply};
    use secure_call::{Dispatcher, Interrupt, Parameters, Service, Thread};

    #[test]
    fn signal_is_binary() {
        let s = WfeSignal::new();
        assert!(!s.try_take());
        s.raise();
        s.raise();
        assert!(s.try_take());
        assert!(!s.try_take());
    }

    #[test]
    fn wait_returns_once_raised_elsewhere() {
        let s = Arc::new(WfeSignal::new());
        let raiser = {
            let s = Arc::clone(&s);
            std::thread::spawn(move || s.raise())
        };
        assert_eq!(s.wait(), Ok(()));
        raiser.join().unwrap();
        assert!(!s.try_take());
    }

    #[test]
    fn dispatcher_round_trip() {
        let fake = FakeSecure::new(2);
        let d = Arc::new(Dispatcher::<_, _, 2>::new(BareMetal, fake.clone()));
        let weak = Arc::downgrade(&d);
        fake.on_event(move || {
            if let Some(d) = weak.upgrade() {
                let irq = unsafe { Interrupt::assume() };
                d.handle_interrupt(&irq, d.transport());
            }
        });
        fake.set_responder(|_, block| {
            block[0] = 0xaa;
            Reply::Respond(7)
        });

        let mut block = [0u8; 4];
        let parameters = Parameters::from(&mut block[..]);
        assert_eq!(d.call(&Thread, Service::Net, 0, parameters), Ok(7));
        assert_eq!(block[0], 0xaa);
        assert_eq!(d.channels_in_use(), 0);
    }
}
