// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The synchronous call path.

use num_traits::FromPrimitive;
use ringbuf::{ringbuf, ringbuf_entry};
use secure_services_abi::at::{AtApi, UrcCallback};
use secure_services_abi::kernel::KernelApi;
use secure_services_abi::{
    status_into_raw, CallError, RequestId, Service, ServiceApi, Submission,
    CHANNEL_COUNT,
};

use crate::channel::ChannelAllocator;
use crate::context::{Context, Kernel};
use crate::local::{Dispatch, LocalServices, Parameters};
use crate::signal::{Signal, SignalBank};
use crate::transport::Transport;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    NoChannel(Service, u16),
    StaleSignal(u8),
    Submitted(RequestId, Result<Submission, CallError>),
    CannotWait(RequestId),
    WaitFailed(RequestId),
    Retrieved(RequestId, Result<u32, CallError>),
    UnknownService(u8),
    PendSv(Result<Submission, CallError>),
}

ringbuf!(Trace, 64, Trace::None);

/// Multiplexes calls from any number of threads (and interrupt handlers)
/// onto `N` channels into the Secure partition.
///
/// One dispatcher exists per system. It is built once during startup, before
/// the EGU interrupt is unmasked, and lives forever; share it by reference.
pub struct Dispatcher<K: Kernel, T: Transport, const N: usize = CHANNEL_COUNT>
{
    kernel: K,
    transport: T,
    channels: ChannelAllocator<N>,
    pub(crate) signals: SignalBank<K::Signal, N>,
    pub(crate) local: LocalServices,
}

impl<K: Kernel, T: Transport, const N: usize> Dispatcher<K, T, N> {
    // The allocator is one word wide, and the asynchronous channel number
    // has to fit the request encoding.
    const VALID: () = assert!(N >= 1 && N <= 32);

    pub fn new(kernel: K, transport: T) -> Self {
        let () = Self::VALID;
        let signals = SignalBank::new(|| kernel.new_signal());
        Self {
            kernel,
            transport,
            channels: ChannelAllocator::new(),
            signals,
            local: LocalServices::new(),
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn channels(&self) -> &ChannelAllocator<N> {
        &self.channels
    }

    /// Bitmask of the channels held by calls in flight.
    pub fn channels_in_use(&self) -> u32 {
        self.channels.in_use()
    }

    /// Calls `api` on `service` and waits for the result.
    ///
    /// `Ok` carries the service's own status, zero for success and a
    /// service-defined code otherwise; it is never interpreted here. A call
    /// that the Secure partition completes during submission returns
    /// `Ok(0)`.
    ///
    /// Once submitted a call can't be cancelled, and the wait for its
    /// completion has no timeout. From interrupt context a call can only
    /// succeed if it completes during submission; a queued call fails with
    /// [`CallError::WaitFailed`].
    pub fn call<C: Context>(
        &self,
        ctx: &C,
        service: Service,
        api: u16,
        parameters: Parameters<'_>,
    ) -> Result<u32, CallError> {
        let block = match self.local.try_handle(service, api, parameters) {
            Dispatch::Handled(result) => return result,
            Dispatch::Forward(block) => block,
        };

        let Some(channel) = self.channels.reserve() else {
            ringbuf_entry!(Trace::NoChannel(service, api));
            return Err(CallError::NoChannel);
        };

        // `channel` is released when it goes out of scope, whichever way
        // the round trip ends.
        self.round_trip(ctx, channel.index(), service, api, block)
    }

    /// [`Dispatcher::call`], with the service implied by the API type.
    pub fn call_api<C: Context, A: ServiceApi>(
        &self,
        ctx: &C,
        api: A,
        parameters: Parameters<'_>,
    ) -> Result<u32, CallError> {
        self.call(ctx, A::SERVICE, api.id(), parameters)
    }

    /// The call as seen from C: raw service number, and the result packed
    /// into one `i32` (negative for transport failures).
    ///
    /// A URC subscription can't be carried in a byte block, so
    /// `At/SubscribeUrcs` is refused here with `-ENOMEM` whatever its size.
    /// Use [`Dispatcher::subscribe_urcs`] instead.
    pub fn call_raw<C: Context>(
        &self,
        ctx: &C,
        service: u8,
        api: u16,
        parameters: &mut [u8],
    ) -> i32 {
        let Some(service) = Service::from_u8(service) else {
            ringbuf_entry!(Trace::UnknownService(service));
            return CallError::InvalidParameters.code();
        };
        status_into_raw(self.call(ctx, service, api, parameters.into()))
    }

    /// Registers the one URC subscriber. Fails with
    /// [`CallError::SubscriptionRefused`] if there already is one.
    pub fn subscribe_urcs<C: Context>(
        &self,
        ctx: &C,
        callback: UrcCallback,
    ) -> Result<(), CallError> {
        let parameters = Parameters::Subscribe(callback);
        self.call_api(ctx, AtApi::SubscribeUrcs, parameters).map(|_| ())
    }

    fn round_trip<C: Context>(
        &self,
        ctx: &C,
        channel: u8,
        service: Service,
        api: u16,
        block: &mut [u8],
    ) -> Result<u32, CallError> {
        let signal = self.signals.channel(channel);
        if signal.try_take() {
            ringbuf_entry!(Trace::StaleSignal(channel));
        }

        let id = RequestId::new(channel, service, api);
        let submitted = ctx
            .cross(&self.kernel, || self.transport.submit(id, &mut *block));
        ringbuf_entry!(Trace::Submitted(id, submitted));

        match submitted? {
            Submission::Complete => return Ok(0),
            Submission::Queued => (),
        }

        if !ctx.may_block() {
            ringbuf_entry!(Trace::CannotWait(id));
            return Err(CallError::WaitFailed);
        }
        if signal.wait().is_err() {
            ringbuf_entry!(Trace::WaitFailed(id));
            return Err(CallError::WaitFailed);
        }

        let retrieved = ctx
            .cross(&self.kernel, || self.transport.retrieve(id, &mut *block));
        ringbuf_entry!(Trace::Retrieved(id, retrieved));
        retrieved
    }

    /// Asks the Secure partition to pend the Non-Secure PendSV exception.
    ///
    /// This is the kernel's context switch hook, so it can't go through the
    /// channel pool or wait: the request goes out on channel 0 with
    /// interrupts masked and its status is only traced.
    pub fn request_context_switch(&self) {
        let id = RequestId::new(0, Service::Kernel, KernelApi::PendSv.id());
        let r = critical_section::with(|_| self.transport.submit(id, &mut []));
        ringbuf_entry!(Trace::PendSv(r));
    }
}
