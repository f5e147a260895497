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

//! Device Update (ADU) manifest authentication.
//!
//! The update manifest is signed with a compact JWS. Its header carries, in the `sjwk` claim, a
//! second JWS signed by a root key whose payload is the RSA key that signed the manifest. The
//! manifest is authentic only if:
//!
//! 1. the nested key is signed by one of the trusted root keys,
//! 2. the manifest JWS is signed by the nested key,
//! 3. the `sha256` claim of the manifest JWS matches the digest of the manifest bytes.
//!
//! All the decoding happens in a single scratch buffer of [`SCRATCH_BUFFER_SIZE`] bytes. The
//! working set of the nested key check is released before the manifest JWS is decoded.

use azure_iot_protocol::Error;
use azure_iot_protocol::error::ErrorKind;
use azure_iot_protocol::jws::{
    ALG_RS256, CLAIM_ALG, CLAIM_E, CLAIM_KID, CLAIM_N, CLAIM_SHA256, CLAIM_SJWK, CompactJws,
    find_claims,
};
use azure_iot_protocol::utils::{BASE64_STANDARD, BASE64_URL, decode_into};
use base64::engine::GeneralPurpose;
use tracing::{debug, error, info, instrument};

use crate::crypto::{Crypto, SHA256_LEN};
use crate::scratch::Arena;

pub mod update;

/// Largest RSA modulus supported, 3072 bits.
pub const RSA_MAX_SIZE: usize = 384;
/// Decoded manifest JWS header, containing the nested key JWS.
pub const JWS_HEADER_SIZE: usize = 1400;
/// Decoded manifest JWS payload.
pub const JWS_PAYLOAD_SIZE: usize = 60;
/// Decoded nested key JWS header.
pub const JWK_HEADER_SIZE: usize = 48;
/// Decoded nested key JWS payload.
pub const JWK_PAYLOAD_SIZE: usize = 700;
/// Decoded RSA signature.
pub const SIGNATURE_SIZE: usize = 400;
/// Decoded RSA exponent.
pub const RSA_EXPONENT_SIZE: usize = 10;
/// Decoded `sha256` claim, larger than a digest to report wrong lengths as malformed.
pub const SHA256_CLAIM_SIZE: usize = 48;

const PERSISTENT_SIZE: usize = JWS_HEADER_SIZE + JWK_PAYLOAD_SIZE;
const JWK_PHASE_SIZE: usize = JWK_HEADER_SIZE + SIGNATURE_SIZE;
const JWS_PHASE_SIZE: usize =
    JWS_PAYLOAD_SIZE + SIGNATURE_SIZE + RSA_MAX_SIZE + RSA_EXPONENT_SIZE + SHA256_CLAIM_SIZE;

/// Size of the scratch buffer needed by [`authenticate`].
pub const SCRATCH_BUFFER_SIZE: usize = PERSISTENT_SIZE + max(JWK_PHASE_SIZE, JWS_PHASE_SIZE);

const fn max(a: usize, b: usize) -> usize {
    if a > b { a } else { b }
}

/// Trusted root key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootKey<'a> {
    /// Key id, matched exactly against the `kid` of the nested key.
    pub kid: &'a str,
    /// Big endian modulus.
    pub n: &'a [u8],
    /// Big endian public exponent.
    pub e: &'a [u8],
}

impl<'a> RootKey<'a> {
    /// Creates a root key.
    pub const fn new(kid: &'a str, n: &'a [u8], e: &'a [u8]) -> Self {
        Self { kid, n, e }
    }
}

/// Authenticates the manifest bytes with its JWS signature.
///
/// The scratch buffer must be at least [`SCRATCH_BUFFER_SIZE`] bytes. It only holds decoded
/// values for the duration of the call and can be reused right after.
#[instrument(skip_all, fields(manifest_len = manifest.len(), root_keys = root_keys.len()))]
pub fn authenticate<C>(
    manifest: &[u8],
    jws: &str,
    root_keys: &[RootKey<'_>],
    scratch: &mut [u8],
) -> Result<(), Error>
where
    C: Crypto,
{
    let mut arena = Arena::new(scratch);

    let jws = CompactJws::split(jws)?;

    let header = decode_region(
        &mut arena,
        &BASE64_URL,
        jws.header(),
        JWS_HEADER_SIZE,
        "jws header",
    )?;

    let [sjwk] = find_claims(header, [CLAIM_SJWK])?;
    let sjwk = sjwk.ok_or(Error::new(ErrorKind::MalformedInput, "jws header sjwk claim"))?;

    let jwk = CompactJws::split(sjwk)?;

    let jwk_payload = decode_region(
        &mut arena,
        &BASE64_URL,
        jwk.payload(),
        JWK_PAYLOAD_SIZE,
        "jwk payload",
    )?;

    verify_signing_key::<C>(&mut arena.phase(), &jwk, root_keys)?;

    let [n, e, alg] = find_claims(jwk_payload, [CLAIM_N, CLAIM_E, CLAIM_ALG])?;

    let alg = alg.ok_or(Error::new(ErrorKind::MalformedInput, "jwk payload alg claim"))?;
    if alg != ALG_RS256 {
        error!(alg, "signing key algorithm not supported");

        return Err(Error::new(ErrorKind::UnsupportedAlgorithm, "jwk payload alg"));
    }

    let n = n.ok_or(Error::new(ErrorKind::MalformedInput, "jwk payload n claim"))?;
    let e = e.ok_or(Error::new(ErrorKind::MalformedInput, "jwk payload e claim"))?;

    let mut phase = arena.phase();

    let payload = decode_region(
        &mut phase,
        &BASE64_URL,
        jws.payload(),
        JWS_PAYLOAD_SIZE,
        "jws payload",
    )?;
    let signature = decode_region(
        &mut phase,
        &BASE64_URL,
        jws.signature(),
        SIGNATURE_SIZE,
        "jws signature",
    )?;
    let n = decode_region(&mut phase, &BASE64_STANDARD, n, RSA_MAX_SIZE, "signing key n")?;
    let e = decode_region(
        &mut phase,
        &BASE64_STANDARD,
        e,
        RSA_EXPONENT_SIZE,
        "signing key e",
    )?;

    C::verify_rs256(n, e, jws.signing_input().as_bytes(), signature)?;

    debug!("manifest signature verified");

    let [sha] = find_claims(payload, [CLAIM_SHA256])?;
    let sha = sha.ok_or(Error::new(ErrorKind::MalformedInput, "jws payload sha256 claim"))?;

    let expected = decode_region(
        &mut phase,
        &BASE64_STANDARD,
        sha,
        SHA256_CLAIM_SIZE,
        "jws payload sha256",
    )?;

    if expected.len() != SHA256_LEN {
        error!(len = expected.len(), "sha256 claim has the wrong size");

        return Err(Error::new(ErrorKind::MalformedInput, "jws payload sha256 size"));
    }

    let digest = C::sha256(manifest);

    aws_lc_rs::constant_time::verify_slices_are_equal(&digest, expected).map_err(|_| {
        error!("manifest digest doesn't match the signed one");

        Error::new(ErrorKind::ContentMismatch, "manifest sha256")
    })?;

    info!("manifest authenticated");

    Ok(())
}

/// Checks the nested key JWS against the root keys.
fn verify_signing_key<C>(
    phase: &mut Arena<'_>,
    jwk: &CompactJws<'_>,
    root_keys: &[RootKey<'_>],
) -> Result<(), Error>
where
    C: Crypto,
{
    let header = decode_region(
        phase,
        &BASE64_URL,
        jwk.header(),
        JWK_HEADER_SIZE,
        "jwk header",
    )?;
    let signature = decode_region(
        phase,
        &BASE64_URL,
        jwk.signature(),
        SIGNATURE_SIZE,
        "jwk signature",
    )?;

    let [kid] = find_claims(header, [CLAIM_KID])?;
    let kid = kid.ok_or(Error::new(ErrorKind::MalformedInput, "jwk header kid claim"))?;

    let root = root_keys.iter().find(|key| key.kid == kid).ok_or_else(|| {
        error!(kid, "root key not trusted");

        Error::new(ErrorKind::UntrustedKey, "jwk header kid")
    })?;

    debug!(kid, "verifying signing key with root key");

    C::verify_rs256(root.n, root.e, jwk.signing_input().as_bytes(), signature)
}

fn decode_region<'a>(
    arena: &mut Arena<'a>,
    engine: &GeneralPurpose,
    input: &str,
    size: usize,
    name: &'static str,
) -> Result<&'a [u8], Error> {
    let region = arena.region(name, size)?;

    let len = decode_into(engine, input, region, name)?;

    Ok(&region[..len])
}
