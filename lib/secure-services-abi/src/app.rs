// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! App service: application key management.

use num_derive::FromPrimitive;
use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{Address, Service, ServiceApi};

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u16)]
pub enum AppApi {
    /// Write a new signing/encryption key.
    AddKey = 0,
}

impl ServiceApi for AppApi {
    const SERVICE: Service = Service::App;

    fn id(self) -> u16 {
        self as u16
    }
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct AddKeyParameters {
    pub key: Address,
    /// Key length in bytes.
    pub length: u32,
}

impl AddKeyParameters {
    pub fn new(key: &[u8]) -> Self {
        Self {
            key: crate::address_of(key.as_ptr()),
            length: key.len() as u32,
        }
    }
}

const_assert_eq!(core::mem::size_of::<AddKeyParameters>(), 8);
