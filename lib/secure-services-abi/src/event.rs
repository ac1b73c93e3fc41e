// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Records pulled off the asynchronous channel.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use crate::ASYNC_BUFFER_SIZE;

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u32)]
pub enum AsyncEvent {
    /// An unsolicited result code from the modem; the buffer holds the line
    /// as a NUL-terminated string.
    AtUrc = 0,
}

/// Filled in by the Secure side on each successful retrieve from the
/// asynchronous channel.
#[derive(Clone, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct AsyncRecord {
    pub event: u32,
    pub buffer: [u8; ASYNC_BUFFER_SIZE],
}

static_assertions::const_assert_eq!(
    core::mem::size_of::<AsyncRecord>(),
    4 + ASYNC_BUFFER_SIZE
);

impl AsyncRecord {
    pub fn new() -> Self {
        Self::new_zeroed()
    }

    /// Builds a URC record, truncating `line` so that the terminator always
    /// fits.
    pub fn urc(line: &[u8]) -> Self {
        let mut r = Self::new();
        r.event = AsyncEvent::AtUrc as u32;
        let n = line.len().min(ASYNC_BUFFER_SIZE - 1);
        r.buffer[..n].copy_from_slice(&line[..n]);
        r
    }

    pub fn kind(&self) -> Option<AsyncEvent> {
        AsyncEvent::from_u32(self.event)
    }

    /// The buffer contents up to the first NUL. A buffer with no NUL at all
    /// is returned whole.
    pub fn payload(&self) -> &[u8] {
        let end = self
            .buffer
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(ASYNC_BUFFER_SIZE);
        &self.buffer[..end]
    }
}

impl Default for AsyncRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for AsyncRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AsyncRecord")
            .field("event", &self.event)
            .field("payload_len", &self.payload().len())
            .finish()
    }
}
