// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};

/// Channel count used when the environment doesn't say otherwise.
const DEFAULT_CHANNEL_COUNT: usize = 4;

/// The EGU has sixteen sub-channels and the asynchronous channel sits right
/// after the last synchronous one.
const MAX_CHANNEL_COUNT: usize = 15;

fn main() -> anyhow::Result<()> {
    println!("cargo:rerun-if-env-changed=SECURE_SERVICE_CHANNEL_COUNT");

    let count = match env::var("SECURE_SERVICE_CHANNEL_COUNT") {
        Ok(s) => s.trim().parse::<usize>().with_context(|| {
            format!("SECURE_SERVICE_CHANNEL_COUNT is not a number: {s:?}")
        })?,
        Err(env::VarError::NotPresent) => DEFAULT_CHANNEL_COUNT,
        Err(e) => bail!("reading SECURE_SERVICE_CHANNEL_COUNT: {e}"),
    };

    if count == 0 || count > MAX_CHANNEL_COUNT {
        bail!(
            "SECURE_SERVICE_CHANNEL_COUNT must be in 1..={MAX_CHANNEL_COUNT}, \
             got {count}"
        );
    }

    let out = PathBuf::from(
        env::var_os("OUT_DIR").context("OUT_DIR not set by cargo")?,
    );
    let mut file = File::create(out.join("config.rs"))?;
    writeln!(
        file,
        "/// Number of bidirectional secure service channels.\n\
         pub const CHANNEL_COUNT: usize = {count};"
    )?;

    Ok(())
}
