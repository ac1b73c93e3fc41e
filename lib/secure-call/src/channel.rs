// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The channel pool.
//!
//! Each in-flight synchronous call owns one channel for its whole round trip.
//! Ownership is a bit in a single word, flipped inside a critical section;
//! the section only covers a scan of that word, so it's safe to enter from
//! interrupt context too.

use core::cell::Cell;

use critical_section::Mutex;
use ringbuf::{ringbuf, ringbuf_entry};

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Reserved(u8),
    Exhausted,
    Freed(u8),
    FreeOutOfRange(u8),
}

ringbuf!(Trace, 32, Trace::None);

pub struct ChannelAllocator<const N: usize> {
    in_use: Mutex<Cell<u32>>,
}

impl<const N: usize> ChannelAllocator<N> {
    const ALL: u32 = if N >= 32 { u32::MAX } else { (1 << N) - 1 };

    pub const fn new() -> Self {
        Self {
            in_use: Mutex::new(Cell::new(0)),
        }
    }

    /// Claims the lowest free channel, or returns `None` right away if every
    /// channel is taken. The channel is released when the returned
    /// reservation is dropped.
    pub fn reserve(&self) -> Option<Reservation<'_, N>> {
        let index = critical_section::with(|cs| {
            let cell = self.in_use.borrow(cs);
            let bits = cell.get();
            let free = !bits & Self::ALL;
            if free == 0 {
                return None;
            }
            let index = free.trailing_zeros();
            cell.set(bits | 1 << index);
            Some(index as u8)
        });

        match index {
            Some(index) => {
                ringbuf_entry!(Trace::Reserved(index));
                Some(Reservation { pool: self, index })
            }
            None => {
                ringbuf_entry!(Trace::Exhausted);
                None
            }
        }
    }

    /// Releases `index`. Releasing a channel that isn't reserved, or one
    /// that doesn't exist, does nothing.
    pub fn free(&self, index: u8) {
        if usize::from(index) >= N {
            ringbuf_entry!(Trace::FreeOutOfRange(index));
            return;
        }
        critical_section::with(|cs| {
            let cell = self.in_use.borrow(cs);
            cell.set(cell.get() & !(1 << index));
        });
        ringbuf_entry!(Trace::Freed(index));
    }

    /// Bitmask of the channels currently reserved.
    pub fn in_use(&self) -> u32 {
        critical_section::with(|cs| self.in_use.borrow(cs).get())
    }
}

impl<const N: usize> Default for ChannelAllocator<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive ownership of one channel.
#[must_use]
pub struct Reservation<'a, const N: usize> {
    pool: &'a ChannelAllocator<N>,
    index: u8,
}

impl<const N: usize> Reservation<'_, N> {
    pub fn index(&self) -> u8 {
        self.index
    }
}

impl<const N: usize> Drop for Reservation<'_, N> {
    fn drop(&mut self) {
        self.pool.free(self.index);
    }
}
