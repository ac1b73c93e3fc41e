// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The asynchronous channel.
//!
//! The Secure partition queues asynchronous records (today, only URC lines)
//! and raises the asynchronous signal once for a whole batch. The monitor
//! therefore drains the channel completely before going back to sleep, or
//! records queued behind the first one would sit there until the next
//! signal.

use ringbuf::{ringbuf, ringbuf_entry};
use secure_services_abi::event::{AsyncEvent, AsyncRecord};
use secure_services_abi::{CallError, RequestId};
use zerocopy::IntoBytes;

use crate::context::{Context, Kernel, Thread};
use crate::dispatch::Dispatcher;
use crate::signal::Signal;
use crate::transport::Transport;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Delivered(usize),
    Dropped(usize),
    UnknownEvent(u32),
    Drained(u32),
    RetrieveFailed(CallError),
    WaitFailed,
}

ringbuf!(Trace, 32, Trace::None);

impl<K: Kernel, T: Transport, const N: usize> Dispatcher<K, T, N> {
    /// Retrieves and delivers asynchronous records until the Secure
    /// partition reports none left. Returns how many were retrieved.
    ///
    /// Each record is handed to the URC subscriber registered at the time it
    /// is decoded; with no subscriber it is dropped.
    pub fn drain_async<C: Context>(
        &self,
        ctx: &C,
        record: &mut AsyncRecord,
    ) -> usize {
        let id = RequestId::asynchronous(N as u8);
        let mut count = 0;

        loop {
            let status = ctx.cross(self.kernel(), || {
                self.transport().retrieve(id, record.as_mut_bytes())
            });
            match status {
                Ok(0) => (),
                Ok(status) => {
                    ringbuf_entry!(Trace::Drained(status));
                    break;
                }
                Err(e) => {
                    ringbuf_entry!(Trace::RetrieveFailed(e));
                    break;
                }
            }

            count += 1;
            self.deliver(record);
        }

        count
    }

    fn deliver(&self, record: &AsyncRecord) {
        match record.kind() {
            Some(AsyncEvent::AtUrc) => {
                let payload = record.payload();
                match self.local.urc_subscriber() {
                    Some(callback) => {
                        ringbuf_entry!(Trace::Delivered(payload.len()));
                        callback(payload);
                    }
                    None => ringbuf_entry!(Trace::Dropped(payload.len())),
                }
            }
            None => ringbuf_entry!(Trace::UnknownEvent(record.event)),
        }
    }

    /// One turn of the monitor: drain, then sleep until the asynchronous
    /// signal is raised. Returns the number of records drained before
    /// sleeping.
    pub fn monitor_cycle(
        &self,
        ctx: &Thread,
        record: &mut AsyncRecord,
    ) -> Result<usize, CallError> {
        let count = self.drain_async(ctx, record);
        if self.signals.asynchronous().wait().is_err() {
            ringbuf_entry!(Trace::WaitFailed);
            return Err(CallError::WaitFailed);
        }
        Ok(count)
    }

    /// Body of the dedicated monitor thread.
    pub fn run_async_monitor(&self) -> ! {
        let mut record = AsyncRecord::new();
        loop {
            // Failures are already traced, and there's nobody to report
            // them to.
            let _ = self.monitor_cycle(&Thread, &mut record);
        }
    }
}
