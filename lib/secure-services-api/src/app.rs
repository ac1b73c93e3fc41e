// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use secure_call::{Context, Kernel, Parameters, Transport};
use secure_services_abi::app::{AddKeyParameters, AppApi};

use crate::{check, Client, ServiceError};

impl<K: Kernel, T: Transport, C: Context, const N: usize>
    Client<'_, K, T, C, N>
{
    /// Hands a new key to the Secure side, which copies it out before
    /// completing.
    pub fn add_key(&self, key: &[u8]) -> Result<(), ServiceError> {
        let mut p = AddKeyParameters::new(key);
        check(self.call(AppApi::AddKey, Parameters::of(&mut p)))
    }
}
