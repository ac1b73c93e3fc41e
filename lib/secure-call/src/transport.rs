// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The seams to the hardware: the two boundary entry points, and the event
//! generator whose interrupt announces completions.

use secure_services_abi::{CallError, RequestId, Submission};

/// The two operations that cross into the Secure partition.
///
/// Callers are responsible for scheduler suspension; implementations only
/// make the call.
pub trait Transport {
    /// Hands the Secure partition the parameter block for request `id`.
    fn submit(
        &self,
        id: RequestId,
        parameters: &mut [u8],
    ) -> Result<Submission, CallError>;

    /// Fetches the response for `id` into `parameters`, which must be the
    /// same block given to `submit`. For a synchronous channel this may only
    /// be called after that channel's completion signal was raised.
    fn retrieve(
        &self,
        id: RequestId,
        parameters: &mut [u8],
    ) -> Result<u32, CallError>;
}

/// The "triggered" events of the event generator, one per channel in the
/// EGU numbering (the asynchronous channel at index `N`).
pub trait EventSource {
    /// Checks whether the event for `channel` fired and clears it if so.
    fn take_event(&self, channel: u8) -> bool;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn submit(
        &self,
        id: RequestId,
        parameters: &mut [u8],
    ) -> Result<Submission, CallError> {
        (**self).submit(id, parameters)
    }

    fn retrieve(
        &self,
        id: RequestId,
        parameters: &mut [u8],
    ) -> Result<u32, CallError> {
        (**self).retrieve(id, parameters)
    }
}
