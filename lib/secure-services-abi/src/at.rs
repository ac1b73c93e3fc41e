// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AT service: modem command execution and unsolicited result codes.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{Address, Service, ServiceApi};

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u16)]
pub enum AtApi {
    RunCommand = 0,
    /// Register the URC subscriber. Handled on the Non-Secure side and never
    /// sent across the boundary.
    SubscribeUrcs = 1,
}

impl ServiceApi for AtApi {
    const SERVICE: Service = Service::At;

    fn id(self) -> u16 {
        self as u16
    }
}

/// Discriminant of the error field in [`RunCommandParameters`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u32)]
pub enum AtResult {
    Success = 0,
    Cme = 1,
    Cms = 2,
    ExtendedCme = 3,
}

/// How the modem finished an AT command. On the wire this is a result tag
/// plus a 32-bit error value whose meaning depends on the tag.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AtOutcome {
    Success,
    Cme(i32),
    Cms(i32),
    ExtendedCme(i32),
}

impl AtOutcome {
    /// Splits the outcome into its wire tag and error value.
    pub fn to_wire(self) -> (u32, i32) {
        match self {
            AtOutcome::Success => (AtResult::Success as u32, 0),
            AtOutcome::Cme(e) => (AtResult::Cme as u32, e),
            AtOutcome::Cms(e) => (AtResult::Cms as u32, e),
            AtOutcome::ExtendedCme(e) => (AtResult::ExtendedCme as u32, e),
        }
    }

    pub fn from_wire(result: u32, error: i32) -> Option<Self> {
        Some(match AtResult::from_u32(result)? {
            AtResult::Success => AtOutcome::Success,
            AtResult::Cme => AtOutcome::Cme(error),
            AtResult::Cms => AtOutcome::Cms(error),
            AtResult::ExtendedCme => AtOutcome::ExtendedCme(error),
        })
    }
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct RunCommandParameters {
    pub command: Address,
    pub command_length: u32,
    pub response: Address,
    /// Response capacity, including the NUL terminator.
    pub max_length: u32,
    /// Written by the Secure side.
    pub response_length: u32,
    /// Written by the Secure side; an [`AtResult`].
    pub result: u32,
    /// Written by the Secure side; interpreted according to `result`.
    pub error: i32,
}

impl RunCommandParameters {
    pub fn new(command: &[u8], response: &mut [u8]) -> Self {
        Self {
            command: crate::address_of(command.as_ptr()),
            command_length: command.len() as u32,
            response: crate::address_of(response.as_ptr()),
            max_length: response.len() as u32,
            ..Default::default()
        }
    }

    /// Decodes the result tag and error value. `None` means the tag is not
    /// one this ABI knows about.
    pub fn outcome(&self) -> Option<AtOutcome> {
        AtOutcome::from_wire(self.result, self.error)
    }
}

/// Receives each URC line, without its NUL terminator.
pub type UrcCallback = fn(&[u8]);

const_assert_eq!(core::mem::size_of::<RunCommandParameters>(), 28);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_wire_round_trip() {
        for o in [
            AtOutcome::Success,
            AtOutcome::Cme(10),
            AtOutcome::Cms(301),
            AtOutcome::ExtendedCme(-2),
        ] {
            let (r, e) = o.to_wire();
            assert_eq!(AtOutcome::from_wire(r, e), Some(o));
        }
    }

    #[test]
    fn unknown_result_tag() {
        let mut p = RunCommandParameters::default();
        p.result = 7;
        assert_eq!(p.outcome(), None);
    }

    #[test]
    fn parameters_describe_buffers() {
        let cmd = b"AT+CFUN?";
        let mut rsp = [0u8; 64];
        let p = RunCommandParameters::new(cmd, &mut rsp);
        assert_eq!(p.command_length, 8);
        assert_eq!(p.max_length, 64);
        assert_eq!(p.outcome(), Some(AtOutcome::Success));
    }
}
