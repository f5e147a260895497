// This file is part of Azure IoT Device Rust.
//
// Copyright 2026 SECO Mind Srl
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! Wall clock used for the SAS token expiration and the provisioning throttling.

use std::time::{SystemTime, UNIX_EPOCH};

use azure_iot_protocol::Error;
use azure_iot_protocol::error::ErrorKind;
use tracing::error;

/// 13 Nov 2017, any time before this means the clock was never synchronized.
pub const MIN_VALID_UNIX_TIME: u64 = 1_510_592_825;

/// Source of the current time.
pub trait Clock {
    /// Seconds since the UNIX epoch.
    fn now(&self) -> Result<u64, Error>;
}

/// Clock of the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<u64, Error> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|time| time.as_secs())
            .map_err(|err| {
                error!(error = %err, "system time before unix epoch");

                Error::new(ErrorKind::Clock, "system time")
            })
    }
}

/// Reads the clock and checks it was synchronized.
pub(crate) fn valid_now<K>(clock: &K) -> Result<u64, Error>
where
    K: Clock,
{
    let now = clock.now()?;

    if now < MIN_VALID_UNIX_TIME {
        error!(now, "clock not synchronized");

        return Err(Error::new(ErrorKind::Clock, "clock not synchronized"));
    }

    Ok(now)
}
