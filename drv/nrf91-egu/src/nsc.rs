// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Secure partition's Non-Secure-Callable entry points.

use secure_call::Transport;
use secure_services_abi::{
    status_from_raw, CallError, RequestId, Submission,
};

extern "C" {
    fn __PutSecureServiceRequest(
        request: u32,
        parameters: *mut u8,
        size: u32,
    ) -> i32;

    fn __GetSecureServiceResponse(
        request: u32,
        parameters: *mut u8,
        size: u32,
    ) -> i32;
}

/// Calls through the veneers the Secure image exports.
#[derive(Copy, Clone, Debug, Default)]
pub struct NscTransport;

/// The Secure side expects a null pointer for an empty block.
fn block(parameters: &mut [u8]) -> (*mut u8, u32) {
    if parameters.is_empty() {
        (core::ptr::null_mut(), 0)
    } else {
        (parameters.as_mut_ptr(), parameters.len() as u32)
    }
}

impl Transport for NscTransport {
    fn submit(
        &self,
        id: RequestId,
        parameters: &mut [u8],
    ) -> Result<Submission, CallError> {
        let (ptr, len) = block(parameters);
        // Safety: the Secure side reads at most `len` bytes at `ptr`, and
        // the dispatcher keeps the block alive until the response is in.
        let rc = unsafe { __PutSecureServiceRequest(id.0, ptr, len) };
        Submission::from_raw(rc)
    }

    fn retrieve(
        &self,
        id: RequestId,
        parameters: &mut [u8],
    ) -> Result<u32, CallError> {
        let (ptr, len) = block(parameters);
        // Safety: the Secure side writes at most `len` bytes at `ptr`.
        let rc = unsafe { __GetSecureServiceResponse(id.0, ptr, len) };
        status_from_raw(rc)
    }
}
