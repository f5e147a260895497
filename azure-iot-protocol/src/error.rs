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

//! Error returned by the library.

use std::fmt::Display;

/// Error for the protocol and the device client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    ctx: &'static str,
}

impl Error {
    /// Create a new error with the given context.
    pub const fn new(kind: ErrorKind, ctx: &'static str) -> Self {
        Self { kind, ctx }
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the context of the error.
    pub fn ctx(&self) -> &'static str {
        self.ctx
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.ctx)
    }
}

impl std::error::Error for Error {}

/// Category of the [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Structurally invalid JWS, JSON, topic or base64 value.
    MalformedInput,
    /// The key id is not in the trusted root keys.
    UntrustedKey,
    /// Cryptographic verification failed.
    SignatureInvalid,
    /// The signing algorithm is not `RS256`.
    UnsupportedAlgorithm,
    /// The digest of the content doesn't match the signed one.
    ContentMismatch,
    /// A buffer or named region is too small.
    InsufficientBuffer,
    /// The MQTT transport failed an operation.
    TransportFailure,
    /// A network event was delivered in a state that doesn't expect it.
    UnexpectedEvent,
    /// The configuration is not valid.
    InvalidConfig,
    /// Operation not permitted in the current state.
    InvalidState,
    /// The clock is not set or not valid.
    Clock,
    /// Couldn't complete crypto operation.
    Crypto,
    /// The provisioning service refused the device.
    ProvisioningFailed,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::MalformedInput => write!(f, "malformed input"),
            ErrorKind::UntrustedKey => write!(f, "untrusted key"),
            ErrorKind::SignatureInvalid => write!(f, "invalid signature"),
            ErrorKind::UnsupportedAlgorithm => write!(f, "unsupported algorithm"),
            ErrorKind::ContentMismatch => write!(f, "content mismatch"),
            ErrorKind::InsufficientBuffer => write!(f, "insufficient buffer for"),
            ErrorKind::TransportFailure => write!(f, "couldn't complete transport operation"),
            ErrorKind::UnexpectedEvent => write!(f, "unexpected event"),
            ErrorKind::InvalidConfig => write!(f, "invalid configuration"),
            ErrorKind::InvalidState => write!(f, "invalid state"),
            ErrorKind::Clock => write!(f, "couldn't get a valid time"),
            ErrorKind::Crypto => write!(f, "couldn't complete crypto operation"),
            ErrorKind::ProvisioningFailed => write!(f, "provisioning failed"),
        }
    }
}
