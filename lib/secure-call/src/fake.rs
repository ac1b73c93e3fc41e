// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An in-memory Secure partition, for exercising the dispatcher off target.
//!
//! Each submitted request is passed to a scripted responder, which sees a
//! copy of the parameter block, may write its response into that copy, and
//! decides how the request completes (see [`Reply`]). Responses are staged
//! and only written into the caller's block on retrieval, the way the real
//! partition does it.
//!
//! Completion is announced by setting the request's event bit and then
//! running the hook installed with [`FakeSecure::on_event`], which normally
//! calls `Dispatcher::handle_interrupt`. The hook runs with no locks held.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use secure_services_abi::errno;
use secure_services_abi::event::AsyncRecord;
use secure_services_abi::{status_from_raw, CallError, RequestId, Submission};
use zerocopy::IntoBytes;

use crate::transport::{EventSource, Transport};

/// How the fake completes one request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Reply {
    /// Serviced during submission; the response is written back right away
    /// and no event follows.
    Immediate,
    /// Refused at submission with this (negative) code.
    Reject(i32),
    /// Queued, then completed at once with this retrieval status.
    Respond(i32),
    /// Queued, and left pending until [`FakeSecure::complete`].
    Hold(i32),
}

type Responder = Box<dyn FnMut(RequestId, &mut [u8]) -> Reply + Send>;
type Hook = Arc<dyn Fn() + Send + Sync>;

struct Pending {
    id: RequestId,
    response: Vec<u8>,
    status: i32,
}

struct State {
    responder: Responder,
    ready: BTreeMap<u8, Pending>,
    held: BTreeMap<u8, Pending>,
    asynchronous: VecDeque<AsyncRecord>,
    events: u64,
    submitted: Vec<RequestId>,
    retrieved: Vec<RequestId>,
    abandoned: usize,
}

struct Inner {
    async_channel: u8,
    state: Mutex<State>,
    hook: Mutex<Option<Hook>>,
}

/// Cheap to clone; clones share one partition.
#[derive(Clone)]
pub struct FakeSecure {
    inner: Arc<Inner>,
}

impl FakeSecure {
    /// A partition serving `channel_count` synchronous channels, whose
    /// default responder completes every request at once with status 0.
    pub fn new(channel_count: usize) -> Self {
        assert!(channel_count < 64, "too many channels for the event word");
        Self {
            inner: Arc::new(Inner {
                async_channel: channel_count as u8,
                state: Mutex::new(State {
                    responder: Box::new(|_, _| Reply::Respond(0)),
                    ready: BTreeMap::new(),
                    held: BTreeMap::new(),
                    asynchronous: VecDeque::new(),
                    events: 0,
                    submitted: Vec::new(),
                    retrieved: Vec::new(),
                    abandoned: 0,
                }),
                hook: Mutex::new(None),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self) {
        let hook = self
            .inner
            .hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    pub fn set_responder(
        &self,
        responder: impl FnMut(RequestId, &mut [u8]) -> Reply + Send + 'static,
    ) {
        self.state().responder = Box::new(responder);
    }

    /// Installs the stand-in for the EGU interrupt.
    pub fn on_event(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.inner.hook.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::new(hook));
    }

    /// Completes the request held on `channel` and announces it.
    ///
    /// # Panics
    ///
    /// If nothing is held on `channel`.
    pub fn complete(&self, channel: u8) -> RequestId {
        let id = {
            let mut state = self.state();
            let Some(pending) = state.held.remove(&channel) else {
                panic!("nothing held on channel {channel}");
            };
            let id = pending.id;
            state.ready.insert(channel, pending);
            state.events |= 1 << channel;
            id
        };
        self.fire();
        id
    }

    /// Channels with a held request, in order.
    pub fn held(&self) -> Vec<u8> {
        self.state().held.keys().copied().collect()
    }

    /// Queues an asynchronous record without announcing it.
    pub fn push_async(&self, record: AsyncRecord) {
        self.state().asynchronous.push_back(record);
    }

    pub fn push_urc(&self, line: &[u8]) {
        self.push_async(AsyncRecord::urc(line));
    }

    /// Announces whatever is queued on the asynchronous channel.
    pub fn notify_async(&self) {
        let channel = self.inner.async_channel;
        self.raise_event(channel);
    }

    /// Sets the event bit for `channel` and runs the hook, whether or not
    /// anything completed.
    pub fn raise_event(&self, channel: u8) {
        self.state().events |= 1 << channel;
        self.fire();
    }

    pub fn pending_async(&self) -> usize {
        self.state().asynchronous.len()
    }

    /// Every request submitted so far, in order.
    pub fn submitted(&self) -> Vec<RequestId> {
        self.state().submitted.clone()
    }

    /// Every retrieval so far, in order, asynchronous ones included.
    pub fn retrieved(&self) -> Vec<RequestId> {
        self.state().retrieved.clone()
    }

    /// Completed responses that were replaced by a newer request on the same
    /// channel before anyone retrieved them.
    pub fn abandoned(&self) -> usize {
        self.state().abandoned
    }
}

impl Transport for FakeSecure {
    fn submit(
        &self,
        id: RequestId,
        parameters: &mut [u8],
    ) -> Result<Submission, CallError> {
        let channel = id.channel();
        assert!(
            channel < self.inner.async_channel,
            "submit on channel {channel}"
        );

        let queued = {
            let mut state = self.state();
            state.submitted.push(id);

            let mut response = parameters.to_vec();
            let reply = (state.responder)(id, &mut response);
            let (status, ready) = match reply {
                Reply::Immediate => {
                    parameters.copy_from_slice(&response);
                    return Ok(Submission::Complete);
                }
                Reply::Reject(code) => return Err(CallError::from_code(code)),
                Reply::Respond(status) => (status, true),
                Reply::Hold(status) => (status, false),
            };

            let pending = Pending {
                id,
                response,
                status,
            };
            let stale = if ready {
                state.events |= 1 << channel;
                state.ready.insert(channel, pending)
            } else {
                state.held.insert(channel, pending)
            };
            if stale.is_some() {
                state.abandoned += 1;
            }
            ready
        };

        if queued {
            self.fire();
        }
        Ok(Submission::Queued)
    }

    fn retrieve(
        &self,
        id: RequestId,
        parameters: &mut [u8],
    ) -> Result<u32, CallError> {
        let mut state = self.state();
        state.retrieved.push(id);

        let channel = id.channel();
        if channel == self.inner.async_channel {
            return match state.asynchronous.pop_front() {
                Some(record) => {
                    let bytes = record.as_bytes();
                    let n = bytes.len().min(parameters.len());
                    parameters[..n].copy_from_slice(&bytes[..n]);
                    Ok(0)
                }
                None => Err(CallError::from_code(-errno::ENOMSG)),
            };
        }

        let Some(pending) = state.ready.remove(&channel) else {
            panic!("retrieve on channel {channel} with nothing completed");
        };
        assert_eq!(pending.id, id, "response for a different request");

        let n = pending.response.len().min(parameters.len());
        parameters[..n].copy_from_slice(&pending.response[..n]);
        status_from_raw(pending.status)
    }
}

impl EventSource for FakeSecure {
    fn take_event(&self, channel: u8) -> bool {
        let mut state = self.state();
        let bit = 1u64 << channel;
        let fired = state.events & bit != 0;
        state.events &= !bit;
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secure_services_abi::Service;

    #[test]
    fn responses_are_staged_until_retrieval() {
        let fake = FakeSecure::new(2);
        fake.set_responder(|_, block| {
            block[0] = 0xAA;
            Reply::Respond(3)
        });

        let id = RequestId::new(1, Service::Net, 9);
        let mut block = [0u8; 2];
        assert_eq!(fake.submit(id, &mut block), Ok(Submission::Queued));
        assert_eq!(block, [0, 0]);
        assert!(fake.take_event(1));
        assert!(!fake.take_event(1));

        assert_eq!(fake.retrieve(id, &mut block), Ok(3));
        assert_eq!(block, [0xAA, 0]);
    }

    #[test]
    fn immediate_replies_write_in_place() {
        let fake = FakeSecure::new(1);
        fake.set_responder(|_, block| {
            block.fill(7);
            Reply::Immediate
        });
        let mut block = [0u8; 4];
        let id = RequestId::new(0, Service::Kernel, 3);
        assert_eq!(fake.submit(id, &mut block), Ok(Submission::Complete));
        assert_eq!(block, [7; 4]);
        assert!(!fake.take_event(0));
    }

    #[test]
    fn held_requests_complete_on_demand() {
        let fake = FakeSecure::new(3);
        fake.set_responder(|_, _| Reply::Hold(0));
        let mut block: [u8; 0] = [];
        for ch in 0..3 {
            let id = RequestId::new(ch, Service::App, 0);
            fake.submit(id, &mut block).unwrap();
        }
        assert_eq!(fake.held(), vec![0, 1, 2]);

        assert_eq!(fake.complete(2).channel(), 2);
        assert!(fake.take_event(2));
        assert!(!fake.take_event(0));
        assert_eq!(fake.held(), vec![0, 1]);
    }

    #[test]
    fn empty_async_queue_reports_no_message() {
        let fake = FakeSecure::new(2);
        fake.push_urc(b"+CEREG: 1");
        let id = RequestId::asynchronous(2);

        let mut record = AsyncRecord::new();
        assert_eq!(fake.retrieve(id, record.as_mut_bytes()), Ok(0));
        assert_eq!(record.payload(), b"+CEREG: 1");
        assert!(fake.retrieve(id, record.as_mut_bytes()).is_err());
    }

    #[test]
    #[should_panic]
    fn retrieve_without_completion_panics() {
        let fake = FakeSecure::new(1);
        let _ = fake.retrieve(RequestId::new(0, Service::At, 0), &mut []);
    }
}
