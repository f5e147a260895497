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

//! Encoding helpers shared by the wire formats.

use std::fmt::{Debug, Display};

use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{DecodeSliceError, Engine, alphabet};

use crate::Error;
use crate::error::ErrorKind;

/// Base64 with the URL safe alphabet, used by the JWS segments.
///
/// Encodes without padding and decodes both padded and unpadded input.
pub const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Base64 with the standard alphabet, used by keys, digests and SAS signatures.
pub const BASE64_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes the base64 `input` into the `output` buffer and returns the decoded length.
///
/// The `ctx` names the buffer in the returned error.
pub fn decode_into(
    engine: &GeneralPurpose,
    input: &str,
    output: &mut [u8],
    ctx: &'static str,
) -> Result<usize, Error> {
    engine.decode_slice(input, output).map_err(|err| match err {
        DecodeSliceError::OutputSliceTooSmall => {
            #[cfg(feature = "tracing")]
            tracing::error!(size = output.len(), ctx, "decode buffer too small");

            Error::new(ErrorKind::InsufficientBuffer, ctx)
        }
        DecodeSliceError::DecodeError(err) => {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %err, ctx, "couldn't decode base64");

            Error::new(ErrorKind::MalformedInput, ctx)
        }
    })
}

/// URL encodes a value for a SAS resource, a signature or a query parameter.
pub fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Returns the value of a parameter in a topic query string (`a=1&b=2`).
pub(crate) fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find_map(|(key, value)| (key == name).then_some(value))
}

/// New type to debug print a byte slice as hex.
pub struct Hex<'a>(&'a [u8]);

impl<'a> Hex<'a> {
    /// Create a new instance for the slice.
    pub fn new(items: &'a [u8]) -> Self {
        Self(items)
    }
}

impl Debug for Hex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self, f)
    }
}

impl Display for Hex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }

        Ok(())
    }
}
