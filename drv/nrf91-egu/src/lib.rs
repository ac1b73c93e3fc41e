// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver for the nRF91 event generator unit (EGU) used by the Secure
//! partition to announce completed requests.
//!
//! EGU2 is shared with the Secure side. Sub-channel `i` is tied to DPPI
//! channel `i`: the Secure partition triggers the DPPI channel when it has
//! a response on request channel `i`, the EGU's TRIGGERED event fires, and
//! the EGU interrupt hands it to the dispatcher. The asynchronous channel
//! uses the sub-channel right after the last request channel.
//!
//! On target, the EGU2 interrupt handler is expected to look like
//!
//! ```ignore
//! fn egu2() {
//!     let irq = unsafe { Interrupt::assume() };
//!     DISPATCHER.handle_interrupt(&irq, unsafe { &Egu::egu2() });
//! }
//! ```

#![cfg_attr(target_os = "none", no_std)]

use core::mem::offset_of;

use ringbuf::*;
use secure_call::EventSource;
use static_assertions::const_assert_eq;
use vcell::VolatileCell;

mod bare;

pub use bare::{BareMetal, WfeSignal};

cfg_if::cfg_if! {
    if #[cfg(target_os = "none")] {
        mod nsc;

        pub use nsc::NscTransport;
    }
}

/// Number of sub-channels in one EGU instance.
pub const CHANNELS: usize = 16;

/// EGU2, Non-Secure alias.
pub const EGU2_NS_BASE: usize = 0x4001_D000;

/// EGU2's interrupt number.
pub const EGU2_IRQ: u16 = 29;

/// Lowest application priority. The nRF91 implements 3 priority bits, in
/// the top of the byte.
pub const EGU2_PRIORITY: u8 = 6 << 5;

/// Enable bit of a SUBSCRIBE or PUBLISH register.
const DPPI_ENABLE: u32 = 1 << 31;

/// TRIGGERED interrupt enables for all sub-channels.
const INT_ALL: u32 = (1 << CHANNELS) - 1;

#[derive(Copy, Clone, PartialEq)]
#[cfg_attr(not(target_os = "none"), allow(dead_code))]
enum Trace {
    None,
    Configured { channels: u8 },
    Unmasked,
}

ringbuf!(Trace, 4, Trace::None);

#[repr(C)]
pub struct RegisterBlock {
    pub tasks_trigger: [VolatileCell<u32>; CHANNELS],
    _reserved0: [u32; 16],
    pub subscribe_trigger: [VolatileCell<u32>; CHANNELS],
    _reserved1: [u32; 16],
    pub events_triggered: [VolatileCell<u32>; CHANNELS],
    _reserved2: [u32; 16],
    pub publish_triggered: [VolatileCell<u32>; CHANNELS],
    _reserved3: [u32; 80],
    pub inten: VolatileCell<u32>,
    pub intenset: VolatileCell<u32>,
    pub intenclr: VolatileCell<u32>,
}

const_assert_eq!(offset_of!(RegisterBlock, tasks_trigger), 0x000);
const_assert_eq!(offset_of!(RegisterBlock, subscribe_trigger), 0x080);
const_assert_eq!(offset_of!(RegisterBlock, events_triggered), 0x100);
const_assert_eq!(offset_of!(RegisterBlock, publish_triggered), 0x180);
const_assert_eq!(offset_of!(RegisterBlock, inten), 0x300);
const_assert_eq!(offset_of!(RegisterBlock, intenset), 0x304);
const_assert_eq!(offset_of!(RegisterBlock, intenclr), 0x308);

/// Handle on one EGU instance.
pub struct Egu<'a> {
    regs: &'a RegisterBlock,
}

impl Egu<'static> {
    /// # Safety
    ///
    /// The caller must have Non-Secure access to EGU2, and nothing else on
    /// this side may be driving it.
    pub unsafe fn egu2() -> Self {
        // Safety: EGU2_NS_BASE is the peripheral's Non-Secure alias, which
        // the caller vouches we can reach.
        Self {
            regs: unsafe { &*(EGU2_NS_BASE as *const RegisterBlock) },
        }
    }
}

impl<'a> Egu<'a> {
    pub fn new(regs: &'a RegisterBlock) -> Self {
        Self { regs }
    }

    /// Ties sub-channel `channel`'s TRIGGER task and TRIGGERED event to the
    /// DPPI channel of the same number.
    pub fn connect_channel(&self, channel: usize) {
        assert!(channel < CHANNELS);
        let ch = channel as u32 | DPPI_ENABLE;
        self.regs.subscribe_trigger[channel].set(ch);
        self.regs.publish_triggered[channel].set(ch);
    }

    /// Connects the `channel_count` request channels and the asynchronous
    /// channel after them, then enables every TRIGGERED interrupt.
    pub fn configure(&self, channel_count: usize) {
        assert!(channel_count < CHANNELS);
        for ch in 0..=channel_count {
            self.connect_channel(ch);
        }
        self.regs.intenset.set(INT_ALL);
        ringbuf_entry!(Trace::Configured {
            channels: channel_count as u8
        });
    }

    pub fn trigger(&self, channel: usize) {
        assert!(channel < CHANNELS);
        self.regs.tasks_trigger[channel].set(1);
    }
}

impl EventSource for Egu<'_> {
    fn take_event(&self, channel: u8) -> bool {
        let Some(event) = self.regs.events_triggered.get(channel as usize)
        else {
            return false;
        };
        if event.get() == 0 {
            return false;
        }
        event.set(0);
        // Read back so the clear lands before the interrupt returns and the
        // event doesn't fire again.
        let _ = event.get();
        true
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "none")] {
        #[derive(Copy, Clone, Debug)]
        struct Egu2Irq;

        // Safety: 29 is EGU2's position in the nRF91 vector table.
        unsafe impl cortex_m::interrupt::InterruptNumber for Egu2Irq {
            fn number(self) -> u16 {
                EGU2_IRQ
            }
        }

        /// Sets EGU2 up for the secure service dispatcher: connects the
        /// request and asynchronous channels, enables their interrupts,
        /// and unmasks EGU2 at [`EGU2_PRIORITY`].
        ///
        /// Run once, before the scheduler starts and before the first call.
        ///
        /// # Safety
        ///
        /// Same as [`Egu::egu2`]. The EGU2 handler must be installed,
        /// since it can fire as soon as this returns.
        pub unsafe fn setup() {
            // Safety: passed on to our caller.
            let egu = unsafe { Egu::egu2() };
            egu.configure(secure_services_abi::CHANNEL_COUNT);

            // Safety: only the NVIC is touched, and only for EGU2, which
            // nobody else owns.
            unsafe {
                let mut p = cortex_m::Peripherals::steal();
                p.NVIC.set_priority(Egu2Irq, EGU2_PRIORITY);
                cortex_m::peripheral::NVIC::unmask(Egu2Irq);
            }
            ringbuf_entry!(Trace::Unmasked);
        }
    }
}
