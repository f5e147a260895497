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

//! Compact JSON Web Signature objects.
//!
//! A compact JWS is `base64url(header).base64url(payload).base64url(signature)`. The update
//! manifest signature nests a second JWS, the signed signing key, in the `sjwk` header claim.

use std::fmt::Formatter;

use serde::Deserializer as _;
use serde::de::{DeserializeSeed, IgnoredAny, MapAccess, Visitor};

use crate::Error;
use crate::error::ErrorKind;

/// Algorithm identifier of RSASSA-PKCS1-v1_5 with SHA-256.
pub const ALG_RS256: &str = "RS256";

/// Claim in the outer header carrying the signed signing key.
pub const CLAIM_SJWK: &str = "sjwk";
/// Claim in the key header with the root key id.
pub const CLAIM_KID: &str = "kid";
/// Claim with the algorithm.
pub const CLAIM_ALG: &str = "alg";
/// Claim with the RSA modulus.
pub const CLAIM_N: &str = "n";
/// Claim with the RSA public exponent.
pub const CLAIM_E: &str = "e";
/// Claim in the outer payload with the manifest digest.
pub const CLAIM_SHA256: &str = "sha256";

/// The three base64url segments of a compact JWS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactJws<'a> {
    signing_input: &'a str,
    header: &'a str,
    payload: &'a str,
    signature: &'a str,
}

impl<'a> CompactJws<'a> {
    /// Splits the JWS on exactly two dots.
    ///
    /// The signature segment must not be empty.
    pub fn split(jws: &'a str) -> Result<Self, Error> {
        let mut dots = jws.match_indices('.').map(|(idx, _)| idx);

        let (Some(first), Some(second), None) = (dots.next(), dots.next(), dots.next()) else {
            #[cfg(feature = "tracing")]
            tracing::error!("jws must have exactly three segments");

            return Err(Error::new(ErrorKind::MalformedInput, "jws segments"));
        };

        if second + 1 == jws.len() {
            #[cfg(feature = "tracing")]
            tracing::error!("jws signature is empty");

            return Err(Error::new(ErrorKind::MalformedInput, "jws empty signature"));
        }

        Ok(Self {
            signing_input: &jws[..second],
            header: &jws[..first],
            payload: &jws[first + 1..second],
            signature: &jws[second + 1..],
        })
    }

    /// The encoded header and payload joined by the dot, as signed.
    pub fn signing_input(&self) -> &'a str {
        self.signing_input
    }

    /// The base64url encoded header.
    pub fn header(&self) -> &'a str {
        self.header
    }

    /// The base64url encoded payload.
    pub fn payload(&self) -> &'a str {
        self.payload
    }

    /// The base64url encoded signature.
    pub fn signature(&self) -> &'a str {
        self.signature
    }
}

/// Finds the string values of the `names` keys in a JSON object.
///
/// Only the top level of the object is inspected. Values of other keys, nested objects
/// included, are skipped. When a key is repeated the first occurrence wins. The values borrow
/// from the input, so they must not contain escape sequences.
pub fn find_claims<'de, const N: usize>(
    json: &'de [u8],
    names: [&str; N],
) -> Result<[Option<&'de str>; N], Error> {
    let mut de = serde_json::Deserializer::from_slice(json);

    let claims = (&mut de)
        .deserialize_map(ClaimsVisitor { names: &names })
        .and_then(|claims| de.end().map(|()| claims))
        .map_err(|err| {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %err, "couldn't scan json claims");

            Error::new(ErrorKind::MalformedInput, "json claims")
        })?;

    Ok(claims)
}

struct ClaimsVisitor<'n, const N: usize> {
    names: &'n [&'n str; N],
}

impl<'de, const N: usize> Visitor<'de> for ClaimsVisitor<'_, N> {
    type Value = [Option<&'de str>; N];

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a JSON object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut found = [None; N];

        while let Some(idx) = map.next_key_seed(KeyIndex { names: self.names })? {
            match idx {
                Some(idx) if found[idx].is_none() => {
                    found[idx] = Some(map.next_value::<&'de str>()?);
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        Ok(found)
    }
}

/// Maps a key to its position in the searched names without allocating it.
struct KeyIndex<'n> {
    names: &'n [&'n str],
}

impl<'de> DeserializeSeed<'de> for KeyIndex<'_> {
    type Value = Option<usize>;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(self)
    }
}

impl<'de> Visitor<'de> for KeyIndex<'_> {
    type Value = Option<usize>;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("an object key")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(self.names.iter().position(|name| *name == v))
    }
}
