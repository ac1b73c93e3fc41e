// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Net service: BSD-style sockets on the modem's network stack.
//!
//! Every call's status is the socket API's own return value: a descriptor, a
//! byte count or zero. A failed socket operation returns -1, which the
//! dispatcher's sign convention reports as `CallError::Boundary(-1)`; the
//! reason can then be fetched with `KernelApi::Errno`.

use num_derive::FromPrimitive;
use static_assertions::const_assert_eq;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{Address, Service, ServiceApi};

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
#[repr(u16)]
pub enum NetApi {
    Socket = 0,
    Close = 1,
    Accept = 2,
    Bind = 3,
    Listen = 4,
    Connect = 5,
    Poll = 6,
    SetSockOpt = 7,
    GetSockOpt = 8,
    Recv = 9,
    RecvFrom = 10,
    Send = 11,
    SendTo = 12,
    GetAddrInfo = 13,
    FreeAddrInfo = 14,
    Fcntl = 15,
}

impl ServiceApi for NetApi {
    const SERVICE: Service = Service::Net;

    fn id(self) -> u16 {
        self as u16
    }
}

/// Maximum canonical name length returned in an address info entry.
pub const CANONNAME_MAX_LENGTH: usize = 20;

/// Raw status of a failed socket operation.
pub const FAILED: i32 = -1;

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct SocketParameters {
    pub family: i32,
    pub kind: i32,
    pub protocol: i32,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct CloseParameters {
    pub fd: i32,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct AcceptParameters {
    pub fd: i32,
    pub addr: Address,
    /// Address of a `u32` holding the capacity of `addr`, updated with the
    /// length actually written.
    pub addrlen: Address,
}

/// Shared by `Bind` and `Connect`.
#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct AddressParameters {
    pub fd: i32,
    pub addr: Address,
    pub addrlen: u32,
}

pub type BindParameters = AddressParameters;
pub type ConnectParameters = AddressParameters;

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct ListenParameters {
    pub fd: i32,
    pub backlog: i32,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct PollParameters {
    pub fds: Address,
    pub nfds: i32,
    /// Milliseconds; negative waits forever.
    pub timeout: i32,
}

/// One entry of the array `PollParameters::fds` points at.
#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct PollFd {
    pub fd: i32,
    pub events: i16,
    pub revents: i16,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct SetSockOptParameters {
    pub fd: i32,
    pub level: i32,
    pub optname: i32,
    pub optval: Address,
    pub optlen: u32,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct GetSockOptParameters {
    pub fd: i32,
    pub level: i32,
    pub optname: i32,
    pub optval: Address,
    /// Address of a `u32` holding the capacity of `optval`.
    pub optlen: Address,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct RecvParameters {
    pub fd: i32,
    pub buf: Address,
    pub max_len: u32,
    pub flags: i32,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct RecvFromParameters {
    pub fd: i32,
    pub buf: Address,
    pub len: i16,
    pub flags: i16,
    pub from: Address,
    pub fromlen: Address,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct SendParameters {
    pub fd: i32,
    pub buf: Address,
    pub len: u32,
    pub flags: i32,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct SendToParameters {
    pub fd: i32,
    pub buf: Address,
    pub len: u32,
    pub flags: i32,
    pub to: Address,
    pub tolen: u32,
}

/// One entry of the result list built by `GetAddrInfo`.
#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct AddrInfo {
    pub ai_flags: i32,
    pub ai_family: i32,
    pub ai_socktype: i32,
    pub ai_protocol: i32,
    pub ai_addrlen: u32,
    pub ai_addr: Address,
    pub ai_canonname: Address,
    pub ai_next: Address,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct GetAddrInfoParameters {
    /// NUL-terminated host name, or zero.
    pub node: Address,
    /// NUL-terminated service name, or zero.
    pub service: Address,
    /// An [`AddrInfo`] of hints, or zero.
    pub hints: Address,
    /// Capacity of the buffer at `res`, in bytes.
    pub reslen: u32,
    pub res: Address,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct FreeAddrInfoParameters {
    pub root: Address,
}

#[derive(
    Copy, Clone, Debug, Default, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct FcntlParameters {
    pub fd: i32,
    pub cmd: i32,
    pub args: i32,
}

const_assert_eq!(core::mem::size_of::<SocketParameters>(), 12);
const_assert_eq!(core::mem::size_of::<CloseParameters>(), 4);
const_assert_eq!(core::mem::size_of::<AcceptParameters>(), 12);
const_assert_eq!(core::mem::size_of::<AddressParameters>(), 12);
const_assert_eq!(core::mem::size_of::<ListenParameters>(), 8);
const_assert_eq!(core::mem::size_of::<PollParameters>(), 12);
const_assert_eq!(core::mem::size_of::<PollFd>(), 8);
const_assert_eq!(core::mem::size_of::<SetSockOptParameters>(), 20);
const_assert_eq!(core::mem::size_of::<GetSockOptParameters>(), 20);
const_assert_eq!(core::mem::size_of::<RecvParameters>(), 16);
const_assert_eq!(core::mem::size_of::<RecvFromParameters>(), 20);
const_assert_eq!(core::mem::size_of::<SendParameters>(), 16);
const_assert_eq!(core::mem::size_of::<SendToParameters>(), 24);
const_assert_eq!(core::mem::size_of::<AddrInfo>(), 32);
const_assert_eq!(core::mem::size_of::<GetAddrInfoParameters>(), 20);
const_assert_eq!(core::mem::size_of::<FreeAddrInfoParameters>(), 4);
const_assert_eq!(core::mem::size_of::<FcntlParameters>(), 12);
