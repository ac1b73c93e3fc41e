// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Completion signals.

/// A binary completion signal, raised from interrupt context and consumed
/// by one waiting thread.
///
/// Signals start lowered. Raising an already raised signal changes nothing.
pub trait Signal {
    /// Makes one unit available. Must be callable from interrupt context.
    fn raise(&self);

    /// Consumes the pending unit, if there is one, without blocking.
    fn try_take(&self) -> bool;

    /// Blocks until a unit is available and consumes it. There is no
    /// timeout.
    fn wait(&self) -> Result<(), WaitFailed>;
}

/// The kernel refused to block the caller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WaitFailed;

/// One signal per synchronous channel, plus one for the asynchronous
/// channel, which sits at index `N`.
pub struct SignalBank<S, const N: usize> {
    channels: [S; N],
    asynchronous: S,
}

impl<S: Signal, const N: usize> SignalBank<S, N> {
    pub fn new(mut make: impl FnMut() -> S) -> Self {
        Self {
            channels: core::array::from_fn(|_| make()),
            asynchronous: make(),
        }
    }

    pub fn channel(&self, index: u8) -> &S {
        &self.channels[usize::from(index)]
    }

    pub fn asynchronous(&self) -> &S {
        &self.asynchronous
    }

    /// Looks up a signal by its index in the EGU numbering.
    pub fn get(&self, index: usize) -> Option<&S> {
        if index == N {
            Some(&self.asynchronous)
        } else {
            self.channels.get(index)
        }
    }
}
