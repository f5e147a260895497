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

//! Shared Access Signature tokens signed with the device key.

use std::fmt::Debug;

use azure_iot_protocol::Error;
use azure_iot_protocol::error::ErrorKind;
use azure_iot_protocol::sas::SasResource;
use tracing::{debug, error, instrument};
use zeroize::Zeroizing;

use crate::crypto::Crypto;
use crate::time::{Clock, valid_now};

/// Maximum length of the string to sign.
pub const SIGNABLE_SIZE: usize = 256;
/// Maximum length of the decoded device key.
pub const DECODED_KEY_SIZE: usize = 64;
/// Maximum length of the base64 signature.
pub const SIGNATURE_SIZE: usize = 64;
/// Maximum length of the MQTT password.
pub const PASSWORD_SIZE: usize = 512;

/// Generated token.
#[derive(Clone)]
pub struct SasToken {
    password: Zeroizing<String>,
    expiration: u64,
}

impl SasToken {
    /// MQTT password.
    pub fn password(&self) -> &Zeroizing<String> {
        &self.password
    }

    /// Expiration in seconds since the UNIX epoch.
    pub fn expiration(&self) -> u64 {
        self.expiration
    }
}

impl Debug for SasToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SasToken")
            .field("password", &"REDACTED")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Generates a token for the resource valid for the given minutes.
#[instrument(skip_all, fields(%resource, lifetime_minutes))]
pub fn generate<C, K>(
    crypto: &mut C,
    clock: &K,
    resource: &SasResource<'_>,
    device_key: &str,
    lifetime_minutes: u32,
) -> Result<SasToken, Error>
where
    C: Crypto,
    K: Clock,
{
    let now = valid_now(clock)?;
    let expiration = now + u64::from(lifetime_minutes) * 60;

    let signable = resource.signable(expiration);
    if signable.len() > SIGNABLE_SIZE {
        error!(len = signable.len(), "signable string too long");

        return Err(Error::new(ErrorKind::InsufficientBuffer, "sas signable"));
    }

    let mut key = Zeroizing::new([0u8; DECODED_KEY_SIZE]);
    let key_len = crypto.base64_decode(device_key, key.as_mut_slice())?;

    let hmac = Zeroizing::new(crypto.hmac_sha256(&key[..key_len], signable.as_bytes())?);

    let signature = crypto.base64_encode(hmac.as_slice())?;
    if signature.len() > SIGNATURE_SIZE {
        error!(len = signature.len(), "signature too long");

        return Err(Error::new(ErrorKind::InsufficientBuffer, "sas signature"));
    }

    let password = Zeroizing::new(resource.password(&signature, expiration));
    if password.len() > PASSWORD_SIZE {
        error!(len = password.len(), "password too long");

        return Err(Error::new(ErrorKind::InsufficientBuffer, "sas password"));
    }

    debug!(expiration, "sas token generated");

    Ok(SasToken {
        password,
        expiration,
    })
}
