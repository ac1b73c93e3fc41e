// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Requests answered on the Non-Secure side without crossing the boundary.
//!
//! The table is closed: today it holds only the AT URC subscription, which
//! has to live here because the callback it installs runs on the
//! Non-Secure side.

use core::cell::Cell;

use critical_section::Mutex;
use num_traits::FromPrimitive;
use ringbuf::{ringbuf, ringbuf_entry};
use secure_services_abi::at::{AtApi, UrcCallback};
use secure_services_abi::{CallError, Service};
use zerocopy::{FromBytes, IntoBytes};

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Subscribed,
    SubscriptionRefused,
    MalformedSubscription,
    CallbackForRemoteApi(Service, u16),
}

ringbuf!(Trace, 8, Trace::None);

/// The parameters of one call.
pub enum Parameters<'a> {
    /// A parameter block, laid out as the API's wire structure. Responses
    /// are written back into it.
    Block(&'a mut [u8]),
    /// A URC subscriber, for `AtApi::SubscribeUrcs`.
    Subscribe(UrcCallback),
}

impl<'a> Parameters<'a> {
    /// An empty block, for APIs that take no parameters.
    pub fn empty() -> Self {
        Parameters::Block(&mut [])
    }

    /// The block backing one of the wire parameter structures.
    pub fn of<T: IntoBytes + FromBytes>(p: &'a mut T) -> Self {
        Parameters::Block(p.as_mut_bytes())
    }
}

impl<'a> From<&'a mut [u8]> for Parameters<'a> {
    fn from(block: &'a mut [u8]) -> Self {
        Parameters::Block(block)
    }
}

pub(crate) enum Dispatch<'a> {
    Handled(Result<u32, CallError>),
    Forward(&'a mut [u8]),
}

pub(crate) struct LocalServices {
    urc_subscriber: Mutex<Cell<Option<UrcCallback>>>,
}

impl LocalServices {
    pub(crate) const fn new() -> Self {
        Self {
            urc_subscriber: Mutex::new(Cell::new(None)),
        }
    }

    /// Handles the request if it's one of ours; otherwise hands back the
    /// block to send across.
    pub(crate) fn try_handle<'a>(
        &self,
        service: Service,
        api: u16,
        parameters: Parameters<'a>,
    ) -> Dispatch<'a> {
        let local = service == Service::At
            && AtApi::from_u16(api) == Some(AtApi::SubscribeUrcs);

        match (local, parameters) {
            (true, Parameters::Subscribe(callback)) => {
                Dispatch::Handled(self.subscribe(callback))
            }
            (true, Parameters::Block(_)) => {
                ringbuf_entry!(Trace::MalformedSubscription);
                Dispatch::Handled(Err(CallError::SubscriptionRefused))
            }
            (false, Parameters::Block(block)) => Dispatch::Forward(block),
            (false, Parameters::Subscribe(_)) => {
                ringbuf_entry!(Trace::CallbackForRemoteApi(service, api));
                Dispatch::Handled(Err(CallError::InvalidParameters))
            }
        }
    }

    fn subscribe(&self, callback: UrcCallback) -> Result<u32, CallError> {
        let installed = critical_section::with(|cs| {
            let slot = self.urc_subscriber.borrow(cs);
            if slot.get().is_some() {
                false
            } else {
                slot.set(Some(callback));
                true
            }
        });

        if installed {
            ringbuf_entry!(Trace::Subscribed);
            Ok(0)
        } else {
            ringbuf_entry!(Trace::SubscriptionRefused);
            Err(CallError::SubscriptionRefused)
        }
    }

    pub(crate) fn urc_subscriber(&self) -> Option<UrcCallback> {
        critical_section::with(|cs| self.urc_subscriber.borrow(cs).get())
    }
}
