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

//! Software based crypto operations.

use azure_iot_protocol::Error;
use azure_iot_protocol::utils::{BASE64_STANDARD, decode_into};
use base64::Engine;

use super::{Crypto, SHA256_LEN};

/// Crypto backed by `aws_lc_rs` and the `base64` engines.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareCrypto;

impl SoftwareCrypto {
    /// Creates the software crypto.
    pub fn new() -> Self {
        Self
    }
}

impl Crypto for SoftwareCrypto {
    fn base64_decode(&mut self, input: &str, output: &mut [u8]) -> Result<usize, Error> {
        decode_into(&BASE64_STANDARD, input, output, "base64 value")
    }

    fn base64_encode(&mut self, input: &[u8]) -> Result<String, Error> {
        Ok(BASE64_STANDARD.encode(input))
    }

    fn hmac_sha256(&mut self, key: &[u8], payload: &[u8]) -> Result<[u8; SHA256_LEN], Error> {
        let key = aws_lc_rs::hmac::Key::new(aws_lc_rs::hmac::HMAC_SHA256, key);

        let tag = aws_lc_rs::hmac::sign(&key, payload);

        let mut out = [0; SHA256_LEN];
        out.copy_from_slice(tag.as_ref());

        Ok(out)
    }
}
