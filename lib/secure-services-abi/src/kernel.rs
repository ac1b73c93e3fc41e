// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel service: control requests about the Non-Secure image itself.

use num_derive::FromPrimitive;
use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{Address, Service, ServiceApi};

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u16)]
pub enum KernelApi {
    /// Ask the Secure side to pend the Non-Secure PendSV exception.
    PendSv = 0,
    /// Request Non-Secure access to a peripheral.
    PeripheralAccess = 1,
    /// Mark the running Non-Secure image as valid.
    MarkImageValid = 2,
    /// Fetch the Secure side's current errno value.
    Errno = 3,
    Reset = 4,
}

impl ServiceApi for KernelApi {
    const SERVICE: Service = Service::Kernel;

    fn id(self) -> u16 {
        self as u16
    }
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct PeripheralAccessParameters {
    /// Base address of the peripheral's register block.
    pub peripheral: Address,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct ErrnoParameters {
    pub errno_value: i32,
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct ResetFlags: u32 {
        /// Stay in the bootloader instead of launching the application.
        const SKIP_LAUNCH = 1 << 0;
    }
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct ResetParameters {
    pub flags: u32,
}

impl ResetParameters {
    pub fn new(flags: ResetFlags) -> Self {
        Self { flags: flags.bits() }
    }
}

const_assert_eq!(core::mem::size_of::<PeripheralAccessParameters>(), 4);
const_assert_eq!(core::mem::size_of::<ErrnoParameters>(), 4);
const_assert_eq!(core::mem::size_of::<ResetParameters>(), 4);
