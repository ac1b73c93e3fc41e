// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Every way out of a call gives its channel back.

mod common;

use common::wired;
use proptest::prelude::*;
use secure_call::fake::Reply;
use secure_call::{CallError, Interrupt, Parameters, Service, Thread};

#[derive(Copy, Clone, Debug)]
enum Step {
    Subscribe,
    Immediate,
    Reject(i32),
    Respond(i32),
    NoChannel,
    QueuedFromInterrupt,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Subscribe),
        Just(Step::Immediate),
        (-200i32..0).prop_map(Step::Reject),
        (-200i32..1000).prop_map(Step::Respond),
        Just(Step::NoChannel),
        Just(Step::QueuedFromInterrupt),
    ]
}

fn subscriber(_: &[u8]) {}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10_000))]

    #[test]
    fn channels_are_always_released(
        steps in prop::collection::vec(step(), 1..12),
    ) {
        let (d, fake) = wired::<3>();
        let mut subscribed = false;

        for step in steps {
            let before = d.channels_in_use();
            let mut block = [0u8; 12];

            match step {
                Step::Subscribe => {
                    let r = d.subscribe_urcs(&Thread, subscriber);
                    if subscribed {
                        prop_assert_eq!(r, Err(CallError::SubscriptionRefused));
                    } else {
                        prop_assert_eq!(r, Ok(()));
                    }
                    subscribed = true;
                }
                Step::Immediate => {
                    fake.set_responder(|_, _| Reply::Immediate);
                    let p = Parameters::from(&mut block[..]);
                    let r = d.call(&Thread, Service::Kernel, 3, p);
                    prop_assert_eq!(r, Ok(0));
                }
                Step::Reject(code) => {
                    fake.set_responder(move |_, _| Reply::Reject(code));
                    let p = Parameters::from(&mut block[..]);
                    let r = d.call(&Thread, Service::Net, 0, p);
                    prop_assert_eq!(r, Err(CallError::from_code(code)));
                }
                Step::Respond(status) => {
                    fake.set_responder(move |_, _| Reply::Respond(status));
                    let p = Parameters::from(&mut block[..]);
                    let r = d.call(&Thread, Service::At, 0, p);
                    prop_assert_eq!(
                        r,
                        secure_services_abi::status_from_raw(status)
                    );
                }
                Step::NoChannel => {
                    let held: Vec<_> = (0..3)
                        .map(|_| d.channels().reserve())
                        .collect();
                    prop_assert!(held.iter().all(Option::is_some));
                    let p = Parameters::from(&mut block[..]);
                    let r = d.call(&Thread, Service::App, 0, p);
                    prop_assert_eq!(r, Err(CallError::NoChannel));
                    drop(held);
                }
                Step::QueuedFromInterrupt => {
                    fake.set_responder(|_, _| Reply::Hold(0));
                    // The request stays with the Secure side; the next one
                    // on that channel replaces it.
                    let stale = fake.held().contains(&0);
                    let abandoned = fake.abandoned();
                    let irq = unsafe { Interrupt::assume() };
                    let p = Parameters::from(&mut block[..]);
                    let r = d.call(&irq, Service::Kernel, 4, p);
                    prop_assert_eq!(r, Err(CallError::WaitFailed));
                    prop_assert_eq!(fake.held(), vec![0]);
                    prop_assert_eq!(
                        fake.abandoned(),
                        abandoned + usize::from(stale)
                    );
                }
            }

            prop_assert_eq!(d.channels_in_use(), before);
        }

        prop_assert_eq!(d.channels_in_use(), 0);
        prop_assert_eq!(d.kernel().suspended(), 0);
    }
}
