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

//! MQTT values exchanged with the transport.

use std::fmt::Debug;

use crate::utils::Hex;

/// TLS port of both the hub and the provisioning service.
pub const MQTT_TLS_PORT: u16 = 8883;

/// Quality of service of a publish or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Qos {
    /// Fire and forget.
    AtMostOnce = 0,
    /// Acknowledged delivery.
    AtLeastOnce = 1,
}

impl From<Qos> for u8 {
    fn from(value: Qos) -> Self {
        value as u8
    }
}

/// A message to publish or a received one.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MqttMessage<'a> {
    /// Topic of the message.
    pub topic: &'a str,
    /// Payload of the message.
    pub payload: &'a [u8],
    /// Quality of service.
    pub qos: Qos,
}

impl<'a> MqttMessage<'a> {
    /// Creates a message published at most once.
    pub fn new(topic: &'a str, payload: &'a [u8]) -> Self {
        Self {
            topic,
            payload,
            qos: Qos::AtMostOnce,
        }
    }
}

impl Debug for MqttMessage<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut dbg = f.debug_struct("MqttMessage");

        dbg.field("topic", &self.topic);

        match std::str::from_utf8(self.payload) {
            Ok(payload) => dbg.field("payload", &payload),
            Err(_) => dbg.field("payload", &Hex::new(self.payload)),
        };

        dbg.field("qos", &self.qos).finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn debug_payload() {
        let text = MqttMessage::new("a/b", b"{}");
        let binary = MqttMessage::new("a/b", &[0xff, 0x00]);

        insta::assert_snapshot!(format!("{text:?}"), @r#"MqttMessage { topic: "a/b", payload: "{}", qos: AtMostOnce }"#);
        insta::assert_snapshot!(format!("{binary:?}"), @r#"MqttMessage { topic: "a/b", payload: ff00, qos: AtMostOnce }"#);
    }

    #[test]
    fn qos_value() {
        assert_eq!(u8::from(Qos::AtMostOnce), 0);
        assert_eq!(u8::from(Qos::AtLeastOnce), 1);
    }
}
