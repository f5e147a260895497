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

//! Plug and Play template for the ESP32 Azure IoT Kit model.
//!
//! The template handles the hub messages through [`Callbacks`]. Since the responses can't be
//! sent while the client is dispatching, they are queued and sent with [`PnpTemplate::flush`].

use std::collections::VecDeque;

use azure_iot_protocol::Error;
use azure_iot_protocol::error::ErrorKind;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::client::{AzureIot, Callbacks, CommandRequest};
use crate::crypto::Crypto;
use crate::time::Clock;
use crate::transport::MqttTransport;

/// Model implemented by the template.
pub const MODEL_ID: &str = "dtmi:azureiot:devkit:freertos:Esp32AzureIotKit;1";

/// Telemetry period until the service sets one.
pub const DEFAULT_TELEMETRY_FREQUENCY_SECS: u64 = 10;

/// Writable property with the telemetry period.
pub const TELEMETRY_FREQUENCY_PROPERTY: &str = "telemetryFrequencySecs";

const STATUS_ACCEPTED: u16 = 202;
const STATUS_REJECTED: u16 = 404;
const STATUS_OK: u16 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    CommandResponse { request_id: String, status: u16 },
    PropertiesUpdate(String),
}

/// Simulated device of the template.
#[derive(Debug)]
pub struct PnpTemplate {
    telemetry_frequency_secs: u64,
    last_telemetry: Option<u64>,
    led1_on: bool,
    led2_on: bool,
    display_text: Option<String>,
    next_request_id: u32,
    pending: VecDeque<Pending>,
}

impl PnpTemplate {
    /// Creates the template with the default telemetry period.
    pub fn new() -> Self {
        Self {
            telemetry_frequency_secs: DEFAULT_TELEMETRY_FREQUENCY_SECS,
            last_telemetry: None,
            led1_on: false,
            led2_on: false,
            display_text: None,
            next_request_id: 0,
            pending: VecDeque::new(),
        }
    }

    /// Seconds between telemetry messages.
    pub fn telemetry_frequency_secs(&self) -> u64 {
        self.telemetry_frequency_secs
    }

    /// State of the two LEDs.
    pub fn leds(&self) -> (bool, bool) {
        (self.led1_on, self.led2_on)
    }

    /// Last text shown on the display.
    pub fn display_text(&self) -> Option<&str> {
        self.display_text.as_deref()
    }

    /// Number of responses waiting for [`PnpTemplate::flush`].
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn request_id(&mut self) -> u32 {
        let id = self.next_request_id;

        self.next_request_id = self.next_request_id.wrapping_add(1);

        id
    }

    /// Sends the device information reported properties.
    pub fn send_device_info<C, T, K>(&mut self, client: &mut AzureIot<C, T, K>) -> Result<u16, Error>
    where
        C: Crypto,
        T: MqttTransport,
        K: Clock,
    {
        let payload = device_info()?;
        let request_id = self.request_id();

        client.send_properties_update(request_id, payload.as_bytes())
    }

    /// Sends the telemetry if the period elapsed, returns whether it was sent.
    pub fn send_telemetry<C, T, K>(
        &mut self,
        client: &mut AzureIot<C, T, K>,
        now: u64,
    ) -> Result<bool, Error>
    where
        C: Crypto,
        T: MqttTransport,
        K: Clock,
    {
        let due = self
            .last_telemetry
            .is_none_or(|last| now.saturating_sub(last) >= self.telemetry_frequency_secs);

        if !due {
            return Ok(false);
        }

        self.last_telemetry = Some(now);

        let payload = telemetry()?;
        client.send_telemetry(payload.as_bytes())?;

        Ok(true)
    }

    /// Sends the queued responses in order.
    ///
    /// On failure the response is kept in the queue.
    pub fn flush<C, T, K>(&mut self, client: &mut AzureIot<C, T, K>) -> Result<usize, Error>
    where
        C: Crypto,
        T: MqttTransport,
        K: Clock,
    {
        let mut sent = 0;

        while let Some(pending) = self.pending.pop_front() {
            let res = match &pending {
                Pending::CommandResponse { request_id, status } => {
                    client.send_command_response(request_id, *status, b"{}")
                }
                // the id is taken once the update is sent, a retry reuses it
                Pending::PropertiesUpdate(payload) => {
                    client.send_properties_update(self.next_request_id, payload.as_bytes())
                }
            };

            if let Err(err) = res {
                error!(error = %err, "couldn't send pending response");

                self.pending.push_front(pending);

                return Err(err);
            }

            if matches!(pending, Pending::PropertiesUpdate(_)) {
                self.request_id();
            }

            sent += 1;
        }

        Ok(sent)
    }

    fn writable_properties(&mut self, payload: &[u8]) -> Result<(), Error> {
        let value: Value = serde_json::from_slice(payload).map_err(|err| {
            error!(error = %err, "couldn't decode properties");

            Error::new(ErrorKind::MalformedInput, "properties json")
        })?;

        // full documents wrap the writable properties
        let desired = value.get("desired").unwrap_or(&value);

        let Some(properties) = desired.as_object() else {
            error!("properties are not an object");

            return Err(Error::new(ErrorKind::MalformedInput, "properties json"));
        };

        let version = properties
            .get("$version")
            .and_then(Value::as_u64)
            .unwrap_or_default();

        for (name, value) in properties {
            if name.starts_with('$') {
                continue;
            }

            if name != TELEMETRY_FREQUENCY_PROPERTY {
                warn!(name = name.as_str(), "unexpected property received");

                continue;
            }

            let Some(frequency) = value.as_u64().filter(|secs| *secs > 0) else {
                error!(%value, "invalid telemetry frequency");

                continue;
            };

            self.telemetry_frequency_secs = frequency;

            info!(frequency, "telemetry frequency set");

            let ack = serde_json::json!({
                TELEMETRY_FREQUENCY_PROPERTY: {
                    "ac": STATUS_OK,
                    "av": version,
                    "ad": "success",
                    "value": frequency,
                }
            });

            self.pending
                .push_back(Pending::PropertiesUpdate(ack.to_string()));
        }

        Ok(())
    }
}

impl Default for PnpTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl Callbacks for PnpTemplate {
    fn on_properties_update_completed(&mut self, request_id: u32, status: u16) {
        debug!(request_id, status, "properties update completed");
    }

    fn on_properties_received(&mut self, payload: &[u8]) {
        if let Err(err) = self.writable_properties(payload) {
            error!(error = %err, "couldn't handle properties");
        }
    }

    fn on_command_request_received(&mut self, request: CommandRequest<'_>) {
        let status = match request.command_name {
            "ToggleLed1" => {
                self.led1_on = !self.led1_on;

                info!(on = self.led1_on, "LED 1 toggled");

                STATUS_ACCEPTED
            }
            "ToggleLed2" => {
                self.led2_on = !self.led2_on;

                info!(on = self.led2_on, "LED 2 toggled");

                STATUS_ACCEPTED
            }
            "DisplayText" => {
                let text = String::from_utf8_lossy(request.payload);
                let text = text.trim_matches('"');

                info!(text, "OLED display");

                self.display_text = Some(text.to_string());

                STATUS_ACCEPTED
            }
            command => {
                error!(command, "command not recognized");

                STATUS_REJECTED
            }
        };

        self.pending.push_back(Pending::CommandResponse {
            request_id: request.request_id.to_string(),
            status,
        });
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Telemetry {
    temperature: f32,
    humidity: f32,
    light: f32,
    pressure: f32,
    altitude: f32,
    magnetometer_x: i32,
    magnetometer_y: i32,
    magnetometer_z: i32,
    pitch: i32,
    roll: i32,
    accelerometer_x: i32,
    accelerometer_y: i32,
    accelerometer_z: i32,
}

/// Telemetry with the simulated sensor readings.
pub fn telemetry() -> Result<String, Error> {
    let telemetry = Telemetry {
        temperature: 21.0,
        humidity: 88.0,
        light: 700.0,
        pressure: 55.0,
        altitude: 700.0,
        magnetometer_x: 2000,
        magnetometer_y: 3000,
        magnetometer_z: 4000,
        pitch: 30,
        roll: 90,
        accelerometer_x: 33,
        accelerometer_y: 44,
        accelerometer_z: 55,
    };

    to_json(&telemetry, "telemetry")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceInformationProperty {
    device_information: DeviceInformation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeviceInformation {
    #[serde(rename = "__t")]
    marker: &'static str,
    manufacturer: &'static str,
    model: &'static str,
    sw_version: &'static str,
    os_name: &'static str,
    processor_architecture: &'static str,
    processor_manufacturer: &'static str,
    /// Kilobytes.
    total_storage: f64,
    /// Kilobytes.
    total_memory: f64,
}

/// Reported properties of the device information component.
pub fn device_info() -> Result<String, Error> {
    let info = DeviceInformation {
        marker: "c",
        manufacturer: "ESPRESSIF",
        model: "ESP32 Azure IoT Kit",
        sw_version: "1.0.0",
        os_name: "FreeRTOS",
        processor_architecture: "ESP32 WROVER-B",
        processor_manufacturer: "ESPRESSIF",
        total_storage: 4096.0,
        total_memory: 8192.0,
    };

    to_json(
        &DeviceInformationProperty {
            device_information: info,
        },
        "device information",
    )
}

fn to_json<T>(value: &T, ctx: &'static str) -> Result<String, Error>
where
    T: Serialize,
{
    serde_json::to_string(value).map_err(|err| {
        error!(error = %err, ctx, "couldn't encode json");

        Error::new(ErrorKind::MalformedInput, ctx)
    })
}

#[cfg(test)]
mod tests {
    use azure_iot_protocol::mqtt::MqttMessage;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::client::State;
    use crate::client::tests::{client, connect_hub, hub_config};
    use crate::time::tests::ManualClock;

    #[test]
    fn telemetry_payload() {
        insta::assert_snapshot!(
            telemetry().unwrap(),
            @r#"{"temperature":21.0,"humidity":88.0,"light":700.0,"pressure":55.0,"altitude":700.0,"magnetometerX":2000,"magnetometerY":3000,"magnetometerZ":4000,"pitch":30,"roll":90,"accelerometerX":33,"accelerometerY":44,"accelerometerZ":55}"#
        );
    }

    #[test]
    fn device_info_payload() {
        insta::assert_snapshot!(
            device_info().unwrap(),
            @r#"{"deviceInformation":{"__t":"c","manufacturer":"ESPRESSIF","model":"ESP32 Azure IoT Kit","swVersion":"1.0.0","osName":"FreeRTOS","processorArchitecture":"ESP32 WROVER-B","processorManufacturer":"ESPRESSIF","totalStorage":4096.0,"totalMemory":8192.0}}"#
        );
    }

    #[test]
    fn commands_are_answered() {
        let clock = ManualClock::new();
        let mut client = client(hub_config(), &clock);
        client.start().unwrap();
        connect_hub(&mut client);

        let mut pnp = PnpTemplate::new();

        let messages = [
            MqttMessage::new("$iothub/methods/POST/ToggleLed1/?$rid=1", b"{}"),
            MqttMessage::new("$iothub/methods/POST/ToggleLed2/?$rid=2", b"{}"),
            MqttMessage::new("$iothub/methods/POST/DisplayText/?$rid=3", br#""hello world""#),
            MqttMessage::new("$iothub/methods/POST/Reboot/?$rid=4", b"{}"),
        ];

        for message in &messages {
            client.message_received(message, &mut pnp).unwrap();
        }

        assert_eq!(pnp.leds(), (true, true));
        assert_eq!(pnp.display_text(), Some("hello world"));
        assert_eq!(pnp.pending(), 4);

        assert_eq!(pnp.flush(&mut client).unwrap(), 4);
        assert_eq!(pnp.pending(), 0);

        let topics: Vec<&str> = client
            .transport()
            .publishes()
            .into_iter()
            .map(|(topic, _)| topic)
            .collect();
        assert_eq!(
            topics,
            [
                "$iothub/methods/res/202/?$rid=1",
                "$iothub/methods/res/202/?$rid=2",
                "$iothub/methods/res/202/?$rid=3",
                "$iothub/methods/res/404/?$rid=4",
            ]
        );
    }

    #[test]
    fn telemetry_frequency_property() {
        let clock = ManualClock::new();
        let mut client = client(hub_config(), &clock);
        client.start().unwrap();
        connect_hub(&mut client);

        let mut pnp = PnpTemplate::new();

        let patch = MqttMessage::new(
            "$iothub/twin/PATCH/properties/desired/?$version=4",
            br#"{"telemetryFrequencySecs":5,"unknown":1,"$version":4}"#,
        );
        client.message_received(&patch, &mut pnp).unwrap();

        assert_eq!(pnp.telemetry_frequency_secs(), 5);
        assert_eq!(pnp.flush(&mut client).unwrap(), 1);

        let publishes = client.transport().publishes();
        let (topic, payload) = publishes[0];
        assert_eq!(topic, "$iothub/twin/PATCH/properties/reported/?$rid=0");
        insta::assert_snapshot!(
            String::from_utf8_lossy(payload),
            @r#"{"telemetryFrequencySecs":{"ac":200,"ad":"success","av":4,"value":5}}"#
        );

        // the full document carries the same property
        let document = MqttMessage::new(
            "$iothub/twin/res/200/?$rid=9",
            br#"{"desired":{"telemetryFrequencySecs":7,"$version":5},"reported":{"$version":2}}"#,
        );
        client.message_received(&document, &mut pnp).unwrap();

        assert_eq!(pnp.telemetry_frequency_secs(), 7);
        assert_eq!(pnp.pending(), 1);
    }

    #[test]
    fn invalid_properties_ignored() {
        let mut pnp = PnpTemplate::new();

        pnp.on_properties_received(b"not json");
        pnp.on_properties_received(br#"{"telemetryFrequencySecs":"fast","$version":2}"#);
        pnp.on_properties_received(br#"{"telemetryFrequencySecs":0,"$version":3}"#);

        assert_eq!(
            pnp.telemetry_frequency_secs(),
            DEFAULT_TELEMETRY_FREQUENCY_SECS
        );
        assert_eq!(pnp.pending(), 0);
    }

    #[test]
    fn telemetry_period() {
        let clock = ManualClock::new();
        let mut client = client(hub_config(), &clock);
        client.start().unwrap();
        connect_hub(&mut client);

        let mut pnp = PnpTemplate::new();
        let now = ManualClock::START;

        assert!(pnp.send_telemetry(&mut client, now).unwrap());
        assert!(!pnp.send_telemetry(&mut client, now + 9).unwrap());
        assert!(pnp.send_telemetry(&mut client, now + 10).unwrap());

        pnp.send_device_info(&mut client).unwrap();

        let topics: Vec<&str> = client
            .transport()
            .publishes()
            .into_iter()
            .map(|(topic, _)| topic)
            .collect();
        assert_eq!(
            topics,
            [
                "devices/dev-1/messages/events/",
                "devices/dev-1/messages/events/",
                "$iothub/twin/PATCH/properties/reported/?$rid=0",
            ]
        );
    }

    #[test]
    fn failed_flush_keeps_response() {
        let clock = ManualClock::new();
        let mut client = client(hub_config(), &clock);
        client.start().unwrap();
        connect_hub(&mut client);

        let mut pnp = PnpTemplate::new();
        let message = MqttMessage::new("$iothub/methods/POST/ToggleLed1/?$rid=1", b"{}");
        client.message_received(&message, &mut pnp).unwrap();

        client.transport_mut().fail_next = true;
        let err = pnp.flush(&mut client).unwrap_err();

        assert_eq!(*err.kind(), ErrorKind::TransportFailure);
        assert_eq!(pnp.pending(), 1);
        assert_eq!(client.state(), State::Error);
    }

    #[test]
    fn failed_properties_update_keeps_request_id() {
        let clock = ManualClock::new();
        let mut client = client(hub_config(), &clock);
        client.start().unwrap();
        connect_hub(&mut client);

        let mut pnp = PnpTemplate::new();
        pnp.on_properties_received(br#"{"telemetryFrequencySecs":20,"$version":3}"#);

        client.transport_mut().fail_next = true;
        let err = pnp.flush(&mut client).unwrap_err();

        assert_eq!(*err.kind(), ErrorKind::TransportFailure);
        assert_eq!(pnp.pending(), 1);
        assert_eq!(client.state(), State::Ready);

        assert_eq!(pnp.flush(&mut client).unwrap(), 1);
        pnp.send_device_info(&mut client).unwrap();

        let topics: Vec<&str> = client
            .transport()
            .publishes()
            .into_iter()
            .map(|(topic, _)| topic)
            .collect();
        assert_eq!(
            topics,
            [
                "$iothub/twin/PATCH/properties/reported/?$rid=0",
                "$iothub/twin/PATCH/properties/reported/?$rid=1",
            ]
        );
    }
}
