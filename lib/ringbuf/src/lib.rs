// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Trace ring buffers shared between threads and interrupt handlers
//!
//! The secure service runtime has no console to speak of, so its modules
//! record interesting events into small static ring buffers that can be read
//! back with a debugger (or, on the host, through [`Ringbuf::snapshot`]).
//!
//! The dispatcher records from caller threads, from its async monitor thread
//! and from the EGU interrupt handler, all of which may preempt one another.
//! Every access to a ring buffer therefore happens inside a
//! `critical_section::with` section; recording an entry is a handful of
//! stores, so the section stays short.
//!
//! Entry types must be `Copy + PartialEq`. A module gets one unnamed buffer;
//! any further ones need names.
//!
//! ```ignore
//! #[derive(Copy, Clone, PartialEq)]
//! enum Trace {
//!     None,
//!     Reserved(u8),
//! }
//!
//! ringbuf!(Trace, 16, Trace::None);
//!
//! ringbuf_entry!(Trace::Reserved(3));
//! ```
//!
//! A second buffer in the same module needs a name:
//!
//! ```ignore
//! ringbuf!(IRQ_RINGBUF, u32, 16, 0);
//!
//! ringbuf_entry!(IRQ_RINGBUF, bits);
//! ```
//!
//! Recording the same payload from the same line twice in a row does not use
//! a new slot; the `count` of the existing entry goes up instead.

#![cfg_attr(not(test), no_std)]

use core::cell::RefCell;

#[doc(hidden)]
pub use critical_section;

/// Declares a static trace buffer.
///
/// `ringbuf!(NAME, Type, N, init)` declares `NAME` with `N` slots of `Type`,
/// each starting out as `init`. Without a name the static is `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[used]
        static $name: $crate::Ringbuf<$t, $n> = $crate::Ringbuf::new($init);
    };
    ($t:ty, $n:expr, $init:expr) => {
        $crate::ringbuf!(__RINGBUF, $t, $n, $init);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
    ($t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
}

/// Records `payload` in the buffer `NAME` (default `__RINGBUF`), tagged with
/// the calling line.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        // Evaluate both buf and payload before taking the critical section,
        // so that the payload expression never runs with interrupts masked.
        let (p, buf) = ($payload, &$buf);
        $crate::Ringbuf::entry(buf, line!() as u16, p);
    }};
    ($payload:expr) => {
        $crate::ringbuf_entry!(__RINGBUF, $payload);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        let _ = &$payload;
    }};
    ($payload:expr) => {{
        let _ = &$payload;
    }};
}

/// A single slot. `generation` counts how many times this slot has been
/// (re)used; zero means it has never been written.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RingbufEntry<T: Copy + PartialEq> {
    pub line: u16,
    pub generation: u16,
    pub count: u32,
    pub payload: T,
}

/// The contents of a ring buffer at one instant, copied out of the critical
/// section.
#[derive(Debug, Copy, Clone)]
pub struct Snapshot<T: Copy + PartialEq, const N: usize> {
    pub last: Option<usize>,
    pub buffer: [RingbufEntry<T>; N],
}

impl<T: Copy + PartialEq, const N: usize> Snapshot<T, N> {
    /// The most recently written entry, if any.
    pub fn latest(&self) -> Option<&RingbufEntry<T>> {
        self.last.and_then(|i| self.buffer.get(i))
    }

    /// Walks the written entries from newest to oldest.
    pub fn recent(&self) -> impl Iterator<Item = &RingbufEntry<T>> + '_ {
        let start = self.last.map_or(0, |l| l + 1);
        (0..N)
            .map(move |i| &self.buffer[(start + N - 1 - i) % N])
            .filter(|e| e.generation != 0)
    }
}

struct Slots<T: Copy + PartialEq, const N: usize> {
    last: Option<usize>,
    buffer: [RingbufEntry<T>; N],
}

impl<T: Copy + PartialEq, const N: usize> Slots<T, N> {
    fn record(&mut self, line: u16, payload: T) {
        if let Some(ent) = self.last.and_then(|l| self.buffer.get_mut(l)) {
            if ent.line == line && ent.payload == payload {
                if let Some(count) = ent.count.checked_add(1) {
                    ent.count = count;
                    return;
                }
            }
        }

        // A corrupt `last` restarts at slot zero instead of panicking.
        let ndx = match self.last {
            Some(l) if l + 1 < N => l + 1,
            _ => 0,
        };

        let ent = &mut self.buffer[ndx];
        *ent = RingbufEntry {
            line,
            generation: ent.generation.wrapping_add(1),
            count: 1,
            payload,
        };
        self.last = Some(ndx);
    }
}

/// A ring buffer of parametrized type and size. Declare these with the
/// [`ringbuf!`] macro rather than by hand.
pub struct Ringbuf<T: Copy + PartialEq, const N: usize> {
    slots: critical_section::Mutex<RefCell<Slots<T, N>>>,
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, N> {
    pub const fn new(init: T) -> Self {
        let blank = RingbufEntry {
            line: 0,
            generation: 0,
            count: 0,
            payload: init,
        };
        Self {
            slots: critical_section::Mutex::new(RefCell::new(Slots {
                last: None,
                buffer: [blank; N],
            })),
        }
    }

    pub fn entry(&self, line: u16, payload: T) {
        critical_section::with(|cs| {
            self.slots.borrow_ref_mut(cs).record(line, payload)
        });
    }

    pub fn snapshot(&self) -> Snapshot<T, N> {
        critical_section::with(|cs| {
            let slots = self.slots.borrow_ref(cs);
            Snapshot {
                last: slots.last,
                buffer: slots.buffer,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq)]
    enum Trace {
        None,
        Tick(u32),
    }

    #[test]
    fn first_entry_lands_in_slot_zero() {
        let rb: Ringbuf<Trace, 4> = Ringbuf::new(Trace::None);
        rb.entry(10, Trace::Tick(1));

        let snap = rb.snapshot();
        assert_eq!(snap.last, Some(0));
        let e = snap.latest().unwrap();
        assert_eq!(e.payload, Trace::Tick(1));
        assert_eq!(e.line, 10);
        assert_eq!(e.count, 1);
        assert_eq!(e.generation, 1);
    }

    #[test]
    fn repeats_are_coalesced() {
        let rb: Ringbuf<Trace, 4> = Ringbuf::new(Trace::None);
        for _ in 0..5 {
            rb.entry(10, Trace::Tick(1));
        }
        // Same payload from a different line is a new entry.
        rb.entry(11, Trace::Tick(1));

        let snap = rb.snapshot();
        let counts: Vec<_> =
            snap.recent().map(|e| (e.line, e.count)).collect();
        assert_eq!(counts, vec![(11, 1), (10, 5)]);
    }

    #[test]
    fn wraps_and_bumps_generation() {
        let rb: Ringbuf<Trace, 3> = Ringbuf::new(Trace::None);
        for i in 0..7 {
            rb.entry(1, Trace::Tick(i));
        }

        let snap = rb.snapshot();
        assert_eq!(snap.last, Some(0));
        let recent: Vec<_> = snap.recent().map(|e| e.payload).collect();
        assert_eq!(
            recent,
            vec![Trace::Tick(6), Trace::Tick(5), Trace::Tick(4)]
        );
        assert_eq!(snap.buffer[0].generation, 3);
        assert_eq!(snap.buffer[2].generation, 2);
    }

    #[test]
    fn concurrent_writers_do_not_lose_counts() {
        static RB: Ringbuf<Trace, 8> = Ringbuf::new(Trace::None);

        let threads: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    for _ in 0..1000 {
                        RB.entry(7, Trace::Tick(0));
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let snap = RB.snapshot();
        let total: u32 = snap.recent().map(|e| e.count).sum();
        assert_eq!(total, 4000);
    }

    #[test]
    fn macros_declare_and_record() {
        ringbuf!(Trace, 4, Trace::None);
        ringbuf_entry!(Trace::Tick(9));

        let snap = __RINGBUF.snapshot();
        assert_eq!(snap.latest().map(|e| e.payload), Some(Trace::Tick(9)));
    }
}
