// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use secure_call::fake::FakeSecure;
use secure_call::host::HostKernel;
use secure_call::{Dispatcher, Interrupt};

pub type TestDispatcher<const N: usize> = Dispatcher<HostKernel, FakeSecure, N>;

/// A dispatcher over a fake partition whose completions are delivered
/// through `handle_interrupt`, as the EGU interrupt would.
pub fn wired<const N: usize>() -> (Arc<TestDispatcher<N>>, FakeSecure) {
    let fake = FakeSecure::new(N);
    let d = Arc::new(Dispatcher::new(HostKernel::new(), fake.clone()));

    let weak = Arc::downgrade(&d);
    fake.on_event(move || {
        if let Some(d) = weak.upgrade() {
            // Stands in for the EGU handler.
            let irq = unsafe { Interrupt::assume() };
            d.handle_interrupt(&irq, d.transport());
        }
    });

    (d, fake)
}

/// Spins until `cond` holds, failing the test after a few seconds.
pub fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(1));
    }
}
