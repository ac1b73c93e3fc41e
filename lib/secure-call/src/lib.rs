// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Calls from Non-Secure code into the Secure service partition.
//!
//! The Secure partition exposes two entry points: one to submit a request and
//! one to retrieve its response. Requests travel on a small, fixed set of
//! channels; when the Secure side has finished with one it triggers the
//! matching sub-channel of an event generator (EGU), whose interrupt we turn
//! into a completion signal for the thread waiting on that channel. One more
//! sub-channel carries asynchronous records (URCs from the modem), which a
//! dedicated monitor thread drains and hands to a subscriber.
//!
//! The moving parts, leaf first:
//!
//! - [`channel::ChannelAllocator`] hands out channels, one per call in
//!   flight.
//! - [`signal::SignalBank`] holds a binary completion signal per channel,
//!   plus one for the asynchronous channel.
//! - [`transport::Transport`] is the pair of boundary entry points, and
//!   [`transport::EventSource`] the EGU's "triggered" events.
//! - [`Dispatcher::call`] is the synchronous entry point; a few requests are
//!   answered locally without crossing the boundary (see [`Parameters`]).
//! - [`Dispatcher::run_async_monitor`] is the body of the monitor thread.
//! - [`Dispatcher::handle_interrupt`] is the body of the EGU interrupt
//!   handler.
//!
//! Whether an operation runs in a thread or in an interrupt handler is part
//! of its signature (see [`context`]), because the two need different
//! protection around boundary crossings.
//!
//! Off target, [`host::HostKernel`] and [`fake::FakeSecure`] stand in for the
//! RTOS and the Secure partition.

#![cfg_attr(target_os = "none", no_std)]

pub mod channel;
pub mod context;
pub mod signal;
pub mod transport;

mod bridge;
mod dispatch;
mod local;
mod monitor;

cfg_if::cfg_if! {
    if #[cfg(not(target_os = "none"))] {
        pub mod fake;
        pub mod host;
    }
}

pub use context::{Context, Interrupt, Kernel, Thread};
pub use dispatch::Dispatcher;
pub use local::Parameters;
pub use secure_services_abi::at::UrcCallback;
pub use secure_services_abi::{
    CallError, RequestId, Service, ServiceApi, Submission, CHANNEL_COUNT,
};
pub use signal::{Signal, WaitFailed};
pub use transport::{EventSource, Transport};

#[cfg(test)]
mod tests {
    use super::fake::{FakeSecure, Reply};
    use super::host::HostKernel;
    use super::*;
    use secure_services_abi::kernel::{ErrnoParameters, KernelApi};

    fn interrupt() -> Interrupt {
        // Tests stand in for the EGU handler.
        unsafe { Interrupt::assume() }
    }

    #[test]
    fn immediate_completion_skips_the_wait() {
        let fake = FakeSecure::new(2);
        fake.set_responder(|_, block| {
            block.copy_from_slice(&9i32.to_le_bytes());
            Reply::Immediate
        });
        let d = Dispatcher::<_, _, 2>::new(HostKernel::new(), fake.clone());

        let mut p = ErrnoParameters::default();
        let r = d.call_api(&Thread, KernelApi::Errno, Parameters::of(&mut p));

        assert_eq!(r, Ok(0));
        assert_eq!(p.errno_value, 9);
        assert_eq!(d.channels_in_use(), 0);
        assert_eq!(d.kernel().waits(), 0);
        assert!(fake.retrieved().is_empty());
        assert_eq!(d.kernel().suspensions(), 1);
        assert_eq!(d.kernel().suspended(), 0);
    }

    #[test]
    fn submit_errors_release_the_channel() {
        let fake = FakeSecure::new(2);
        fake.set_responder(|_, _| Reply::Reject(-16));
        let d = Dispatcher::<_, _, 2>::new(HostKernel::new(), fake);

        let r = d.call(&Thread, Service::Net, 0, Parameters::empty());
        assert_eq!(r, Err(CallError::Busy));
        assert!(r.unwrap_err().is_retryable());
        assert_eq!(d.channels_in_use(), 0);
        assert_eq!(d.kernel().waits(), 0);
    }

    #[test]
    fn stale_signal_is_drained_before_use() {
        let fake = FakeSecure::new(1);
        fake.set_responder(|_, _| Reply::Hold(4));
        let d = std::sync::Arc::new(Dispatcher::<_, _, 1>::new(
            HostKernel::new(),
            fake.clone(),
        ));

        // A spurious event for channel 0 leaves its signal raised.
        fake.raise_event(0);
        d.handle_interrupt(&interrupt(), &fake);

        let caller = {
            let d = d.clone();
            std::thread::spawn(move || {
                d.call(&Thread, Service::App, 0, Parameters::empty())
            })
        };

        // If the stale unit had been left in place, the caller would have
        // retrieved before completion and the fake would have panicked.
        while fake.held().is_empty() {
            std::thread::yield_now();
        }
        fake.complete(0);
        d.handle_interrupt(&interrupt(), &fake);

        assert_eq!(caller.join().unwrap(), Ok(4));
        assert_eq!(d.channels_in_use(), 0);
    }

    #[test]
    fn queued_call_from_interrupt_cannot_wait() {
        let fake = FakeSecure::new(2);
        fake.set_responder(|_, _| Reply::Hold(0));
        let d = Dispatcher::<_, _, 2>::new(HostKernel::new(), fake.clone());

        let r = d.call(&interrupt(), Service::Kernel, 4, Parameters::empty());
        assert_eq!(r, Err(CallError::WaitFailed));
        assert_eq!(d.channels_in_use(), 0);
        assert_eq!(d.kernel().suspensions(), 0);
        assert_eq!(d.kernel().waits(), 0);
    }

    #[test]
    fn immediate_call_from_interrupt_succeeds_without_suspension() {
        let fake = FakeSecure::new(2);
        fake.set_responder(|_, _| Reply::Immediate);
        let d = Dispatcher::<_, _, 2>::new(HostKernel::new(), fake);

        let r = d.call(&interrupt(), Service::Kernel, 2, Parameters::empty());
        assert_eq!(r, Ok(0));
        assert_eq!(d.kernel().suspensions(), 0);
    }

    #[test]
    fn raw_entry_point_packs_results() {
        let fake = FakeSecure::new(2);
        fake.set_responder(|id, _| match id.api() {
            1 => Reply::Reject(-5),
            _ => Reply::Immediate,
        });
        let d = Dispatcher::<_, _, 2>::new(HostKernel::new(), fake);

        // With no interrupt hook wired to the dispatcher, only calls that
        // don't wait can be made here.
        assert_eq!(d.call_raw(&Thread, 3, 1, &mut []), -5);
        assert_eq!(d.call_raw(&Thread, 3, 2, &mut []), 0);
        assert_eq!(d.call_raw(&Thread, 42, 0, &mut []), -22);
        assert_eq!(d.channels_in_use(), 0);
    }

    #[test]
    fn raw_entry_point_refuses_subscription() {
        fn subscriber(_: &[u8]) {}

        let fake = FakeSecure::new(2);
        let d = Dispatcher::<_, _, 2>::new(HostKernel::new(), fake.clone());

        // A block the size of a function pointer still can't subscribe.
        let mut block = [0u8; 4];
        assert_eq!(d.call_raw(&Thread, 1, 1, &mut block), -12);
        assert!(fake.submitted().is_empty());
        assert_eq!(d.subscribe_urcs(&Thread, subscriber), Ok(()));
    }

    #[test]
    fn context_switch_request_uses_channel_zero_without_reserving() {
        let fake = FakeSecure::new(2);
        fake.set_responder(|_, _| Reply::Immediate);
        let d = Dispatcher::<_, _, 2>::new(HostKernel::new(), fake.clone());

        let held = d.channels().reserve().unwrap();
        d.request_context_switch();

        assert_eq!(
            fake.submitted(),
            vec![RequestId::new(0, Service::Kernel, 0)]
        );
        assert_eq!(d.channels_in_use(), 1 << held.index());
        assert_eq!(d.kernel().suspensions(), 0);
    }
}
