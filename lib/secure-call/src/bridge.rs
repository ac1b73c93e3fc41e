// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! From event generator interrupts to completion signals.

use ringbuf::{ringbuf, ringbuf_entry};

use crate::context::{Interrupt, Kernel};
use crate::dispatch::Dispatcher;
use crate::signal::Signal;
use crate::transport::{EventSource, Transport};

ringbuf!(u64, 16, 0);

impl<K: Kernel, T: Transport, const N: usize> Dispatcher<K, T, N> {
    /// Services one event generator interrupt.
    ///
    /// Any subset of the sub-channels may have fired since the last entry,
    /// so all `N + 1` of them are checked. Each one that fired is cleared and
    /// its signal raised once.
    pub fn handle_interrupt(
        &self,
        _ctx: &Interrupt,
        events: &impl EventSource,
    ) {
        let mut fired = 0u64;
        for channel in 0..=N {
            if !events.take_event(channel as u8) {
                continue;
            }
            fired |= 1 << channel;
            if let Some(signal) = self.signals.get(channel) {
                signal.raise();
            }
        }
        ringbuf_entry!(fired);
    }
}

#[cfg(test)]
mod tests {
    use crate::fake::FakeSecure;
    use crate::host::HostKernel;
    use crate::signal::Signal;
    use crate::transport::EventSource;
    use crate::{Dispatcher, Interrupt};

    #[test]
    fn one_entry_services_every_fired_channel() {
        // No hook: events pile up until the handler runs by hand.
        let fake = FakeSecure::new(3);
        let d = Dispatcher::<_, _, 3>::new(HostKernel::new(), fake.clone());
        fake.raise_event(0);
        fake.raise_event(2);
        fake.notify_async();

        let irq = unsafe { Interrupt::assume() };
        d.handle_interrupt(&irq, &fake);

        for channel in 0..=3 {
            assert!(!fake.take_event(channel), "event {channel} left set");
        }
        for channel in [0, 2] {
            assert!(d.signals.channel(channel).try_take(), "{channel}");
            assert!(!d.signals.channel(channel).try_take(), "{channel}");
        }
        assert!(!d.signals.channel(1).try_take());
        assert!(d.signals.asynchronous().try_take());
        assert!(!d.signals.asynchronous().try_take());
    }
}
