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

//! Arena carving named regions out of a caller supplied buffer.
//!
//! Regions taken from the [`Arena`] live as long as the buffer. A [`Arena::phase`] borrows the
//! free space for a shorter time: its regions are reclaimed when the phase is dropped, and the
//! borrow checker rejects any use of them after that point.

use azure_iot_protocol::Error;
use azure_iot_protocol::error::ErrorKind;
use tracing::{error, trace};

/// Bump allocator over a byte buffer.
#[derive(Debug)]
pub struct Arena<'a> {
    rest: &'a mut [u8],
}

impl<'a> Arena<'a> {
    /// Creates the arena over the whole buffer.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { rest: buf }
    }

    /// Free space left.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }

    /// Takes a zeroed region of `len` bytes.
    ///
    /// The name is reported in the error if the space is not enough.
    pub fn region(&mut self, name: &'static str, len: usize) -> Result<&'a mut [u8], Error> {
        let rest = std::mem::take(&mut self.rest);

        if rest.len() < len {
            error!(region = name, len, remaining = rest.len(), "scratch buffer too small");

            self.rest = rest;

            return Err(Error::new(ErrorKind::InsufficientBuffer, name));
        }

        let (region, rest) = rest.split_at_mut(len);
        self.rest = rest;

        region.fill(0);

        trace!(region = name, len, remaining = self.rest.len(), "region taken");

        Ok(region)
    }

    /// Starts a phase over the free space.
    ///
    /// Nothing taken from the phase outlives it, the space is available again afterwards.
    pub fn phase(&mut self) -> Arena<'_> {
        Arena {
            rest: &mut *self.rest,
        }
    }
}
