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

//! Crypto operations like hashing, signature verification and HMAC.

use azure_iot_protocol::Error;
use azure_iot_protocol::error::ErrorKind;
use tracing::{debug, error};

pub mod software;

/// Size of a SHA-256 digest and of an HMAC-SHA256 tag.
pub const SHA256_LEN: usize = 32;

/// Cryptographic and encoding primitives used by the device.
///
/// The connection state machine only uses the methods taking `self`, so a device can provide
/// them from a secure element. Digests and signature verification default to `aws_lc_rs`.
pub trait Crypto {
    /// Decodes standard base64 into the buffer, returning the decoded length.
    fn base64_decode(&mut self, input: &str, output: &mut [u8]) -> Result<usize, Error>;

    /// Encodes the bytes in standard base64 with padding.
    fn base64_encode(&mut self, input: &[u8]) -> Result<String, Error>;

    /// Computes the HMAC-SHA256 of the payload with the key.
    fn hmac_sha256(&mut self, key: &[u8], payload: &[u8]) -> Result<[u8; SHA256_LEN], Error>;

    /// Computes a SHA-256 digest.
    fn sha256(data: &[u8]) -> [u8; SHA256_LEN] {
        let digest = aws_lc_rs::digest::digest(&aws_lc_rs::digest::SHA256, data);

        let mut out = [0; SHA256_LEN];
        out.copy_from_slice(digest.as_ref());

        out
    }

    /// Verifies an RSASSA-PKCS1-v1_5 SHA-256 signature with the modulus and exponent.
    ///
    /// The DigestInfo prefix of the decrypted block is checked together with the digest that
    /// follows it.
    fn verify_rs256(n: &[u8], e: &[u8], message: &[u8], signature: &[u8]) -> Result<(), Error> {
        debug!(
            modulus_len = n.len(),
            signature_len = signature.len(),
            "verifying rs256 signature"
        );

        let key = aws_lc_rs::signature::RsaPublicKeyComponents { n, e };

        key.verify(
            &aws_lc_rs::signature::RSA_PKCS1_2048_8192_SHA256,
            message,
            signature,
        )
        .map_err(|err| {
            error!(error = %err, "couldn't verify rs256 signature");

            Error::new(ErrorKind::SignatureInvalid, "rs256 signature")
        })
    }
}
