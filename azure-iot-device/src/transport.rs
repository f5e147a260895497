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

//! MQTT transport the state machine drives.
//!
//! The transport owns the TLS connection. Every operation only starts the request: the outcome
//! is reported back through the events of [`AzureIot`](crate::client::AzureIot).

use std::fmt::Debug;

use azure_iot_protocol::Error;
use azure_iot_protocol::mqtt::{MqttMessage, Qos};
use zeroize::Zeroizing;

/// Credentials to authenticate the MQTT connection.
#[derive(Clone)]
pub enum MqttAuth {
    /// SAS token sent as the password.
    SasToken(Zeroizing<String>),
    /// X.509 client certificate for the TLS handshake.
    Certificate {
        /// PEM encoded certificate chain.
        certificate: String,
        /// PEM encoded private key.
        private_key: Zeroizing<String>,
    },
}

impl Debug for MqttAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SasToken(_) => f.debug_tuple("SasToken").field(&"REDACTED").finish(),
            Self::Certificate { certificate, .. } => f
                .debug_struct("Certificate")
                .field("certificate", certificate)
                .field("private_key", &"REDACTED")
                .finish(),
        }
    }
}

/// Configuration to create an MQTT client.
#[derive(Debug, Clone)]
pub struct MqttClientConfig {
    /// Host name of the broker.
    pub address: String,
    /// TLS port of the broker.
    pub port: u16,
    /// MQTT client id.
    pub client_id: String,
    /// MQTT username.
    pub username: String,
    /// Credentials.
    pub auth: MqttAuth,
}

impl MqttClientConfig {
    /// Returns the SAS token password, if any.
    pub fn password(&self) -> Option<&str> {
        match &self.auth {
            MqttAuth::SasToken(token) => Some(token.as_str()),
            MqttAuth::Certificate { .. } => None,
        }
    }
}

/// MQTT client operations.
pub trait MqttTransport {
    /// Handle of a created client.
    type Handle;

    /// Creates the client and starts the connection.
    fn init(&mut self, config: &MqttClientConfig) -> Result<Self::Handle, Error>;

    /// Disconnects and destroys the client.
    fn deinit(&mut self, handle: Self::Handle) -> Result<(), Error>;

    /// Subscribes to the topic filter, returning the packet id.
    fn subscribe(&mut self, handle: &mut Self::Handle, topic: &str, qos: Qos)
    -> Result<u16, Error>;

    /// Publishes the message, returning the packet id.
    fn publish(&mut self, handle: &mut Self::Handle, message: &MqttMessage<'_>)
    -> Result<u16, Error>;
}
