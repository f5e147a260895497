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

//! Shared Access Signature strings.
//!
//! The device signs `url_encode(resource) + "\n" + expiry` with HMAC-SHA256 and the decoded
//! device key, then sends the token as the MQTT password:
//!
//! ```text
//! SharedAccessSignature sr=<resource>&sig=<signature>&se=<expiry>
//! ```

use std::fmt::Display;

use crate::utils::url_encode;

/// Resource the SAS token grants access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SasResource<'a> {
    /// Registration on the Device Provisioning Service.
    Dps {
        /// ID scope of the DPS instance.
        id_scope: &'a str,
        /// Registration id of the device.
        registration_id: &'a str,
    },
    /// Device on an IoT Hub.
    Hub {
        /// Host name of the hub.
        hub_fqdn: &'a str,
        /// Id of the device.
        device_id: &'a str,
    },
}

impl SasResource<'_> {
    /// URL encoded resource URI.
    pub fn resource_uri(&self) -> String {
        match self {
            SasResource::Dps {
                id_scope,
                registration_id,
            } => format!(
                "{}%2Fregistrations%2F{}",
                url_encode(id_scope),
                url_encode(registration_id)
            ),
            SasResource::Hub {
                hub_fqdn,
                device_id,
            } => format!(
                "{}%2Fdevices%2F{}",
                url_encode(hub_fqdn),
                url_encode(device_id)
            ),
        }
    }

    /// String to sign with the device key.
    pub fn signable(&self, expiry: u64) -> String {
        format!("{}\n{expiry}", self.resource_uri())
    }

    /// Composes the MQTT password from the base64 signature.
    pub fn password(&self, signature: &str, expiry: u64) -> String {
        format!(
            "SharedAccessSignature sr={}&sig={}&se={expiry}",
            self.resource_uri(),
            url_encode(signature)
        )
    }
}

impl Display for SasResource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SasResource::Dps {
                id_scope,
                registration_id,
            } => write!(f, "{id_scope}/registrations/{registration_id}"),
            SasResource::Hub {
                hub_fqdn,
                device_id,
            } => write!(f, "{hub_fqdn}/devices/{device_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const HUB: SasResource<'static> = SasResource::Hub {
        hub_fqdn: "myhub.azure-devices.net",
        device_id: "dev-1",
    };

    const DPS: SasResource<'static> = SasResource::Dps {
        id_scope: "0ne00000A0A",
        registration_id: "dev-1",
    };

    #[test]
    fn signable_strings() {
        insta::assert_snapshot!(HUB.signable(1700000000), @r"
        myhub.azure-devices.net%2Fdevices%2Fdev-1
        1700000000
        ");
        insta::assert_snapshot!(DPS.signable(42), @r"
        0ne00000A0A%2Fregistrations%2Fdev-1
        42
        ");
    }

    #[test]
    fn password_encodes_signature() {
        let password = HUB.password("ab+c/d=", 1700000000);

        assert_eq!(
            password,
            "SharedAccessSignature sr=myhub.azure-devices.net%2Fdevices%2Fdev-1&sig=ab%2Bc%2Fd%3D&se=1700000000"
        );
    }

    #[test]
    fn display_resource() {
        assert_eq!(HUB.to_string(), "myhub.azure-devices.net/devices/dev-1");
        assert_eq!(DPS.to_string(), "0ne00000A0A/registrations/dev-1");
    }
}
