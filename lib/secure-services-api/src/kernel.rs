// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use secure_call::{Context, Kernel, Parameters, Transport};
use secure_services_abi::kernel::{
    ErrnoParameters, KernelApi, PeripheralAccessParameters, ResetFlags,
    ResetParameters,
};
use secure_services_abi::Address;

use crate::{check, Client, ServiceError};

impl<K: Kernel, T: Transport, C: Context, const N: usize>
    Client<'_, K, T, C, N>
{
    /// Asks the Secure side to pend PendSV. Prefer
    /// `Dispatcher::request_context_switch` from the kernel's own hook.
    pub fn pend_sv(&self) -> Result<(), ServiceError> {
        check(self.call(KernelApi::PendSv, Parameters::empty()))
    }

    /// Requests Non-Secure access to the peripheral at `address`.
    pub fn peripheral_access(
        &self,
        address: Address,
    ) -> Result<(), ServiceError> {
        let mut p = PeripheralAccessParameters {
            peripheral: address,
        };
        check(self.call(KernelApi::PeripheralAccess, Parameters::of(&mut p)))
    }

    pub fn mark_image_valid(&self) -> Result<(), ServiceError> {
        check(self.call(KernelApi::MarkImageValid, Parameters::empty()))
    }

    /// The Secure side's errno, as left by the last failed Net call.
    pub fn errno(&self) -> Result<i32, ServiceError> {
        let mut p = ErrnoParameters::default();
        check(self.call(KernelApi::Errno, Parameters::of(&mut p)))?;
        Ok(p.errno_value)
    }

    /// Resets the device. Only returns if the request failed.
    pub fn reset(&self, flags: ResetFlags) -> Result<(), ServiceError> {
        let mut p = ResetParameters::new(flags);
        check(self.call(KernelApi::Reset, Parameters::of(&mut p)))
    }
}
