// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Secure service ABI definitions, shared between the Non-Secure runtime,
//! its clients, and (in spirit) the Secure partition on the other side of
//! the boundary.
//!
//! Everything in here is part of the wire contract: the packing of request
//! identifiers, the numbering of services and APIs, the byte layout of each
//! API's parameter block, and the status codes the two boundary entry points
//! return. Changing any of it means changing the Secure firmware too.

#![cfg_attr(not(test), no_std)]

use num_derive::FromPrimitive;

pub mod app;
pub mod at;
pub mod event;
pub mod kernel;
pub mod net;

include!(concat!(env!("OUT_DIR"), "/config.rs"));

/// The asynchronous channel shares the request encoding with the
/// bidirectional channels and takes the index right after the last of them.
pub const ASYNC_CHANNEL: u8 = CHANNEL_COUNT as u8;

/// Capacity of the data buffer in an [`event::AsyncRecord`].
pub const ASYNC_BUFFER_SIZE: usize = 1024;

static_assertions::const_assert!(CHANNEL_COUNT >= 1);
static_assertions::const_assert!(CHANNEL_COUNT < 16);

/// errno values as the Secure partition reports them (newlib numbering).
pub mod errno {
    pub const EAGAIN: i32 = 11;
    pub const ENOMEM: i32 = 12;
    pub const EBUSY: i32 = 16;
    pub const EINVAL: i32 = 22;
    pub const ENOMSG: i32 = 35;
    pub const ETIMEDOUT: i32 = 116;
}

/// A Non-Secure address as the Secure partition sees it. The target is a
/// 32-bit core; on a 64-bit host the conversion in [`address_of`] truncates,
/// which is fine for the fakes that never dereference these.
pub type Address = u32;

pub fn address_of<T: ?Sized>(p: *const T) -> Address {
    p as *const u8 as usize as Address
}

/// The available secure services.
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u8)]
pub enum Service {
    Kernel = 0,
    At = 1,
    App = 2,
    Net = 3,
}

/// Implemented by each service's API enumeration, so that callers can name
/// an operation without repeating which service it belongs to.
pub trait ServiceApi: Copy {
    const SERVICE: Service;

    fn id(self) -> u16;
}

/// Names one request on one channel.
///
/// The channel index lives in the top byte, the service in the next byte and
/// the service-local API number in the bottom half:
///
/// ```text
///  31      24 23      16 15                0
/// +----------+----------+-------------------+
/// | channel  | service  |        api        |
/// +----------+----------+-------------------+
/// ```
///
/// The asynchronous channel uses the same layout, so one decoder serves both.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct RequestId(pub u32);

impl RequestId {
    const CHANNEL_SHIFT: u32 = 24;
    const SERVICE_SHIFT: u32 = 16;
    const API_MASK: u32 = 0xFFFF;

    pub const fn new(channel: u8, service: Service, api: u16) -> Self {
        Self::from_parts(channel, service as u8, api)
    }

    pub const fn from_parts(channel: u8, service: u8, api: u16) -> Self {
        RequestId(
            (channel as u32) << Self::CHANNEL_SHIFT
                | (service as u32) << Self::SERVICE_SHIFT
                | api as u32,
        )
    }

    /// The identifier used to pull records off the asynchronous channel.
    pub const fn asynchronous(async_channel: u8) -> Self {
        Self::new(async_channel, Service::Kernel, 0)
    }

    pub const fn channel(self) -> u8 {
        (self.0 >> Self::CHANNEL_SHIFT) as u8
    }

    pub const fn service_raw(self) -> u8 {
        (self.0 >> Self::SERVICE_SHIFT) as u8
    }

    pub fn service(self) -> Option<Service> {
        num_traits::FromPrimitive::from_u8(self.service_raw())
    }

    pub const fn api(self) -> u16 {
        (self.0 & Self::API_MASK) as u16
    }
}

/// Default identifier for this build's asynchronous channel.
pub const ASYNC_REQUEST: RequestId = RequestId::asynchronous(ASYNC_CHANNEL);

/// How the Secure partition accepted a request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Submission {
    /// Accepted; an EGU event will signal that the response is ready.
    Queued,
    /// Fully serviced during the submit call. No event will follow and there
    /// is no response to retrieve.
    Complete,
}

impl Submission {
    /// Decodes the status returned by the submit entry point.
    ///
    /// Anything above 1 is outside the boundary contract and panics.
    pub fn from_raw(raw: i32) -> Result<Self, CallError> {
        match raw {
            0 => Ok(Submission::Queued),
            1 => Ok(Submission::Complete),
            r if r < 0 => Err(CallError::from_code(r)),
            _ => panic!("submit returned status {raw}"),
        }
    }
}

/// Transport and infrastructure failures, i.e. everything a call can report
/// with a negative status.
///
/// Service-level results are not errors at this layer: they come back as
/// `Ok(status)` and are passed through to the client untouched.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CallError {
    /// Every channel is in use. Retry later.
    NoChannel,
    /// A URC subscriber is already registered, or the subscription request
    /// was malformed.
    SubscriptionRefused,
    /// The boundary transport is saturated. Retry later.
    Busy,
    /// The Secure service infrastructure is not initialized yet. Retry
    /// later.
    NotReady,
    /// The call was queued but the caller can't wait for it (interrupt
    /// context).
    WaitFailed,
    /// The parameter block doesn't fit the requested API.
    InvalidParameters,
    /// Any other negative status from submit or retrieve.
    Boundary(i32),
}

impl CallError {
    /// Classifies a negative status from one of the boundary entry points.
    pub fn from_code(code: i32) -> Self {
        match code.wrapping_neg() {
            errno::EBUSY => CallError::Busy,
            errno::EAGAIN => CallError::NotReady,
            _ => CallError::Boundary(code),
        }
    }

    /// The negative errno-style code for this error, as the C ABI reports
    /// it.
    pub fn code(self) -> i32 {
        match self {
            CallError::NoChannel | CallError::WaitFailed => -errno::ETIMEDOUT,
            CallError::SubscriptionRefused => -errno::ENOMEM,
            CallError::Busy => -errno::EBUSY,
            CallError::NotReady => -errno::EAGAIN,
            CallError::InvalidParameters => -errno::EINVAL,
            CallError::Boundary(code) => code,
        }
    }

    /// Whether the same call may succeed if simply tried again later.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            CallError::NoChannel
                | CallError::SubscriptionRefused
                | CallError::Busy
                | CallError::NotReady
        )
    }
}

/// Decodes the status returned by the retrieve entry point (or by a whole
/// call, at the C ABI).
pub fn status_from_raw(raw: i32) -> Result<u32, CallError> {
    if raw >= 0 {
        Ok(raw as u32)
    } else {
        Err(CallError::from_code(raw))
    }
}

/// Packs a call outcome into the C ABI's sign convention: negative for
/// transport failures, otherwise the service's own status.
pub fn status_into_raw(status: Result<u32, CallError>) -> i32 {
    match status {
        Ok(v) => i32::try_from(v).unwrap_or(i32::MAX),
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_layout() {
        let id = RequestId::new(2, Service::Net, 13);
        assert_eq!(id.0, 0x0203_000d);
        assert_eq!(id.channel(), 2);
        assert_eq!(id.service(), Some(Service::Net));
        assert_eq!(id.api(), 13);
    }

    #[test]
    fn request_id_decodes_every_channel() {
        let services =
            [Service::Kernel, Service::At, Service::App, Service::Net];
        for channel in 0..=ASYNC_CHANNEL {
            for service in services {
                for api in [0u16, 1, 0x7fff, 0xffff] {
                    let id = RequestId::new(channel, service, api);
                    assert_eq!(id.channel(), channel);
                    assert_eq!(id.service(), Some(service));
                    assert_eq!(id.api(), api);
                }
            }
        }
    }

    #[test]
    fn async_request_is_on_async_channel() {
        assert_eq!(ASYNC_REQUEST.channel(), ASYNC_CHANNEL);
        assert_eq!(ASYNC_REQUEST.service(), Some(Service::Kernel));
        assert_eq!(ASYNC_REQUEST.api(), 0);
        assert_eq!(usize::from(ASYNC_CHANNEL), CHANNEL_COUNT);
    }

    #[test]
    fn unknown_service_is_none() {
        let id = RequestId::from_parts(0, 9, 0);
        assert_eq!(id.service_raw(), 9);
        assert_eq!(id.service(), None);
    }

    #[test]
    fn submission_statuses() {
        assert_eq!(Submission::from_raw(0), Ok(Submission::Queued));
        assert_eq!(Submission::from_raw(1), Ok(Submission::Complete));
        assert_eq!(Submission::from_raw(-errno::EBUSY), Err(CallError::Busy));
        assert_eq!(
            Submission::from_raw(-errno::EAGAIN),
            Err(CallError::NotReady)
        );
        assert_eq!(Submission::from_raw(-5), Err(CallError::Boundary(-5)));
    }

    #[test]
    #[should_panic]
    fn submission_status_out_of_contract() {
        let _ = Submission::from_raw(2);
    }

    #[test]
    fn error_codes() {
        assert_eq!(CallError::NoChannel.code(), -116);
        assert_eq!(CallError::SubscriptionRefused.code(), -12);
        assert_eq!(CallError::Boundary(-77).code(), -77);
        assert!(CallError::NoChannel.is_retryable());
        assert!(!CallError::WaitFailed.is_retryable());
        assert!(!CallError::Boundary(-5).is_retryable());
    }

    #[test]
    fn raw_status_round_trip() {
        assert_eq!(status_from_raw(0), Ok(0));
        assert_eq!(status_from_raw(42), Ok(42));
        assert_eq!(status_from_raw(-16), Err(CallError::Busy));
        assert_eq!(status_into_raw(Ok(42)), 42);
        assert_eq!(status_into_raw(Err(CallError::NoChannel)), -116);
        assert_eq!(status_into_raw(Ok(u32::MAX)), i32::MAX);
    }
}
