// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sockets. Every helper returns the socket call's own result (a
//! descriptor, a byte count, or zero) untouched. A failed socket operation
//! shows up as `CallError::Boundary(net::FAILED)`, and `Client::errno` then
//! has the reason.

use core::ffi::CStr;

use secure_call::{CallError, Context, Kernel, Parameters, Transport};
use secure_services_abi::address_of;
use secure_services_abi::net::*;

use crate::Client;

fn opt_addr<T: ?Sized>(p: Option<&T>) -> u32 {
    p.map_or(0, |p| address_of(p))
}

impl<K: Kernel, T: Transport, C: Context, const N: usize>
    Client<'_, K, T, C, N>
{
    pub fn socket(
        &self,
        family: i32,
        kind: i32,
        protocol: i32,
    ) -> Result<u32, CallError> {
        let mut p = SocketParameters {
            family,
            kind,
            protocol,
        };
        self.call(NetApi::Socket, Parameters::of(&mut p))
    }

    pub fn close(&self, fd: i32) -> Result<u32, CallError> {
        let mut p = CloseParameters { fd };
        self.call(NetApi::Close, Parameters::of(&mut p))
    }

    /// `addrlen` holds the capacity of `addr` on entry and the length of
    /// the peer address on return.
    pub fn accept(
        &self,
        fd: i32,
        addr: &mut [u8],
        addrlen: &mut u32,
    ) -> Result<u32, CallError> {
        *addrlen = (*addrlen).min(addr.len() as u32);
        let mut p = AcceptParameters {
            fd,
            addr: address_of(addr.as_ptr()),
            addrlen: address_of(addrlen as *const u32),
        };
        self.call(NetApi::Accept, Parameters::of(&mut p))
    }

    pub fn bind(&self, fd: i32, addr: &[u8]) -> Result<u32, CallError> {
        let mut p = AddressParameters {
            fd,
            addr: address_of(addr.as_ptr()),
            addrlen: addr.len() as u32,
        };
        self.call(NetApi::Bind, Parameters::of(&mut p))
    }

    pub fn listen(&self, fd: i32, backlog: i32) -> Result<u32, CallError> {
        let mut p = ListenParameters { fd, backlog };
        self.call(NetApi::Listen, Parameters::of(&mut p))
    }

    pub fn connect(&self, fd: i32, addr: &[u8]) -> Result<u32, CallError> {
        let mut p = AddressParameters {
            fd,
            addr: address_of(addr.as_ptr()),
            addrlen: addr.len() as u32,
        };
        self.call(NetApi::Connect, Parameters::of(&mut p))
    }

    /// Returns the number of entries in `fds` with events.
    pub fn poll(
        &self,
        fds: &mut [PollFd],
        timeout_ms: i32,
    ) -> Result<u32, CallError> {
        let mut p = PollParameters {
            fds: address_of(fds.as_ptr()),
            nfds: fds.len() as i32,
            timeout: timeout_ms,
        };
        self.call(NetApi::Poll, Parameters::of(&mut p))
    }

    pub fn set_sock_opt(
        &self,
        fd: i32,
        level: i32,
        optname: i32,
        optval: &[u8],
    ) -> Result<u32, CallError> {
        let mut p = SetSockOptParameters {
            fd,
            level,
            optname,
            optval: address_of(optval.as_ptr()),
            optlen: optval.len() as u32,
        };
        self.call(NetApi::SetSockOpt, Parameters::of(&mut p))
    }

    pub fn get_sock_opt(
        &self,
        fd: i32,
        level: i32,
        optname: i32,
        optval: &mut [u8],
        optlen: &mut u32,
    ) -> Result<u32, CallError> {
        *optlen = (*optlen).min(optval.len() as u32);
        let mut p = GetSockOptParameters {
            fd,
            level,
            optname,
            optval: address_of(optval.as_ptr()),
            optlen: address_of(optlen as *const u32),
        };
        self.call(NetApi::GetSockOpt, Parameters::of(&mut p))
    }

    pub fn recv(
        &self,
        fd: i32,
        buf: &mut [u8],
        flags: i32,
    ) -> Result<u32, CallError> {
        let mut p = RecvParameters {
            fd,
            buf: address_of(buf.as_ptr()),
            max_len: buf.len() as u32,
            flags,
        };
        self.call(NetApi::Recv, Parameters::of(&mut p))
    }

    /// The wire format only carries a 16-bit length, so at most
    /// `i16::MAX` bytes are received.
    pub fn recv_from(
        &self,
        fd: i32,
        buf: &mut [u8],
        flags: i16,
        from: &mut [u8],
        fromlen: &mut u32,
    ) -> Result<u32, CallError> {
        *fromlen = (*fromlen).min(from.len() as u32);
        let mut p = RecvFromParameters {
            fd,
            buf: address_of(buf.as_ptr()),
            len: buf.len().min(i16::MAX as usize) as i16,
            flags,
            from: address_of(from.as_ptr()),
            fromlen: address_of(fromlen as *const u32),
        };
        self.call(NetApi::RecvFrom, Parameters::of(&mut p))
    }

    pub fn send(
        &self,
        fd: i32,
        buf: &[u8],
        flags: i32,
    ) -> Result<u32, CallError> {
        let mut p = SendParameters {
            fd,
            buf: address_of(buf.as_ptr()),
            len: buf.len() as u32,
            flags,
        };
        self.call(NetApi::Send, Parameters::of(&mut p))
    }

    pub fn send_to(
        &self,
        fd: i32,
        buf: &[u8],
        flags: i32,
        to: &[u8],
    ) -> Result<u32, CallError> {
        let mut p = SendToParameters {
            fd,
            buf: address_of(buf.as_ptr()),
            len: buf.len() as u32,
            flags,
            to: address_of(to.as_ptr()),
            tolen: to.len() as u32,
        };
        self.call(NetApi::SendTo, Parameters::of(&mut p))
    }

    /// Resolves `node`/`service`. The Secure side builds the list of
    /// [`AddrInfo`] entries (and their addresses and canonical names) inside
    /// `res`; release it with [`Client::free_addr_info`].
    pub fn get_addr_info(
        &self,
        node: Option<&CStr>,
        service: Option<&CStr>,
        hints: Option<&AddrInfo>,
        res: &mut [u8],
    ) -> Result<u32, CallError> {
        let mut p = GetAddrInfoParameters {
            node: opt_addr(node.map(|s| s.to_bytes_with_nul())),
            service: opt_addr(service.map(|s| s.to_bytes_with_nul())),
            hints: opt_addr(hints),
            reslen: res.len() as u32,
            res: address_of(res.as_ptr()),
        };
        self.call(NetApi::GetAddrInfo, Parameters::of(&mut p))
    }

    pub fn free_addr_info(&self, res: &[u8]) -> Result<u32, CallError> {
        let mut p = FreeAddrInfoParameters {
            root: address_of(res.as_ptr()),
        };
        self.call(NetApi::FreeAddrInfo, Parameters::of(&mut p))
    }

    pub fn fcntl(
        &self,
        fd: i32,
        cmd: i32,
        args: i32,
    ) -> Result<u32, CallError> {
        let mut p = FcntlParameters { fd, cmd, args };
        self.call(NetApi::Fcntl, Parameters::of(&mut p))
    }
}
