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

//! Fixed capacity buffer shared by the provisioning data.
//!
//! While provisioning it holds the DPS operation id, once assigned the same space holds the hub
//! host name and the device id. Only one of the two is stored at any time.

use azure_iot_protocol::Error;
use azure_iot_protocol::error::ErrorKind;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    Free,
    OperationId { len: usize },
    Assignment { hub_len: usize, device_len: usize },
}

/// Buffer for the provisioning data.
#[derive(Debug)]
pub(crate) struct DataBuffer {
    buf: String,
    capacity: usize,
    claim: Claim,
}

impl DataBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
            capacity,
            claim: Claim::Free,
        }
    }

    /// Releases any stored data.
    pub(crate) fn reset(&mut self) {
        self.buf.clear();
        self.claim = Claim::Free;
    }

    fn check_capacity(&self, len: usize, ctx: &'static str) -> Result<(), Error> {
        if len > self.capacity {
            error!(len, capacity = self.capacity, ctx, "data buffer too small");

            return Err(Error::new(ErrorKind::InsufficientBuffer, ctx));
        }

        Ok(())
    }

    /// Stores the operation id of the running registration.
    pub(crate) fn store_operation_id(&mut self, operation_id: &str) -> Result<(), Error> {
        if self.claim != Claim::Free {
            error!(claim = ?self.claim, "data buffer already in use");

            return Err(Error::new(ErrorKind::InvalidState, "data buffer in use"));
        }

        if operation_id.is_empty() {
            return Err(Error::new(ErrorKind::MalformedInput, "empty operation id"));
        }

        self.check_capacity(operation_id.len(), "operation id")?;

        self.buf.push_str(operation_id);
        self.claim = Claim::OperationId {
            len: operation_id.len(),
        };

        debug!(operation_id, "operation id stored");

        Ok(())
    }

    pub(crate) fn operation_id(&self) -> Option<&str> {
        match self.claim {
            Claim::OperationId { len } => Some(&self.buf[..len]),
            Claim::Free | Claim::Assignment { .. } => None,
        }
    }

    /// Stores the assigned hub and device id, reclaiming the operation id.
    pub(crate) fn store_assignment(&mut self, hub_fqdn: &str, device_id: &str) -> Result<(), Error> {
        if hub_fqdn.is_empty() || device_id.is_empty() {
            error!(hub_fqdn, device_id, "empty assignment");

            return Err(Error::new(ErrorKind::MalformedInput, "empty assignment"));
        }

        self.check_capacity(hub_fqdn.len() + device_id.len(), "assignment")?;

        self.reset();

        self.buf.push_str(hub_fqdn);
        self.buf.push_str(device_id);
        self.claim = Claim::Assignment {
            hub_len: hub_fqdn.len(),
            device_len: device_id.len(),
        };

        Ok(())
    }

    /// Returns the assigned hub and device id.
    pub(crate) fn assignment(&self) -> Option<(&str, &str)> {
        match self.claim {
            Claim::Assignment {
                hub_len,
                device_len,
            } => Some((
                &self.buf[..hub_len],
                &self.buf[hub_len..hub_len + device_len],
            )),
            Claim::Free | Claim::OperationId { .. } => None,
        }
    }
}
