// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client API for the secure services.
//!
//! Each helper builds the wire parameter structure for one API, makes the
//! call through a [`Dispatcher`], and decodes what the Secure partition wrote
//! back. No policy lives here: nothing is retried, and service statuses are
//! reported as they came.

#![cfg_attr(target_os = "none", no_std)]

use core::num::NonZeroU32;

use secure_call::{
    CallError, Context, Dispatcher, Kernel, Parameters, ServiceApi, Transport,
    CHANNEL_COUNT,
};

mod app;
mod at;
mod kernel;
mod net;

pub use at::AtError;

/// Why a Kernel or App request failed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ServiceError {
    /// The call never got a response.
    Call(CallError),
    /// The service answered with a nonzero status.
    Status(NonZeroU32),
}

impl From<CallError> for ServiceError {
    fn from(e: CallError) -> Self {
        ServiceError::Call(e)
    }
}

/// Treats any nonzero service status as a failure.
fn check(status: Result<u32, CallError>) -> Result<(), ServiceError> {
    match NonZeroU32::new(status?) {
        None => Ok(()),
        Some(code) => Err(ServiceError::Status(code)),
    }
}

/// Makes service calls from one execution context.
pub struct Client<
    'a,
    K: Kernel,
    T: Transport,
    C: Context,
    const N: usize = CHANNEL_COUNT,
> {
    dispatcher: &'a Dispatcher<K, T, N>,
    ctx: &'a C,
}

impl<'a, K: Kernel, T: Transport, C: Context, const N: usize>
    Client<'a, K, T, C, N>
{
    pub fn new(dispatcher: &'a Dispatcher<K, T, N>, ctx: &'a C) -> Self {
        Self { dispatcher, ctx }
    }

    fn call<A: ServiceApi>(
        &self,
        api: A,
        parameters: Parameters<'_>,
    ) -> Result<u32, CallError> {
        self.dispatcher.call_api(self.ctx, api, parameters)
    }
}
