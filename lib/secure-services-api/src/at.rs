// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use core::num::NonZeroU32;

use secure_call::{
    CallError, Context, Kernel, Parameters, Transport, UrcCallback,
};
use secure_services_abi::at::{AtApi, AtOutcome, RunCommandParameters};

use crate::Client;

/// Why an AT command failed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AtError {
    Call(CallError),
    /// The AT service itself failed, before the modem answered.
    Status(NonZeroU32),
    /// The modem answered `+CME ERROR`.
    Cme(i32),
    /// The modem answered `+CMS ERROR`.
    Cms(i32),
    /// The modem answered with an extended CME error.
    ExtendedCme(i32),
    /// The result tag is not one we know.
    UnknownResult(u32),
}

impl From<CallError> for AtError {
    fn from(e: CallError) -> Self {
        AtError::Call(e)
    }
}

impl<K: Kernel, T: Transport, C: Context, const N: usize>
    Client<'_, K, T, C, N>
{
    /// Runs one AT command. The modem's response text is written to
    /// `response` (NUL-terminated if it fits) and its length returned.
    pub fn run_command(
        &self,
        command: &[u8],
        response: &mut [u8],
    ) -> Result<usize, AtError> {
        let mut p = RunCommandParameters::new(command, response);
        let status = self.call(AtApi::RunCommand, Parameters::of(&mut p))?;
        if let Some(code) = NonZeroU32::new(status) {
            return Err(AtError::Status(code));
        }

        match p.outcome() {
            Some(AtOutcome::Success) => {
                Ok((p.response_length as usize).min(response.len()))
            }
            Some(AtOutcome::Cme(e)) => Err(AtError::Cme(e)),
            Some(AtOutcome::Cms(e)) => Err(AtError::Cms(e)),
            Some(AtOutcome::ExtendedCme(e)) => Err(AtError::ExtendedCme(e)),
            None => Err(AtError::UnknownResult(p.result)),
        }
    }

    /// Registers the one URC subscriber. It is called from the async
    /// monitor thread with each URC line.
    pub fn subscribe_urcs(
        &self,
        callback: UrcCallback,
    ) -> Result<(), CallError> {
        let parameters = Parameters::Subscribe(callback);
        self.call(AtApi::SubscribeUrcs, parameters).map(|_| ())
    }
}
