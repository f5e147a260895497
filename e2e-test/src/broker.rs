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

//! In-process broker answering like DPS and IoT Hub.

use std::cell::Cell;
use std::collections::VecDeque;

use azure_iot_device::azure_iot_protocol::Error;
use azure_iot_device::azure_iot_protocol::dps;
use azure_iot_device::azure_iot_protocol::error::ErrorKind;
use azure_iot_device::azure_iot_protocol::mqtt::{MqttMessage, Qos};
use azure_iot_device::time::Clock;
use azure_iot_device::transport::{MqttClientConfig, MqttTransport};
use tracing::{debug, info, warn};

const OPERATION_ID: &str = "4.d1b4ba8f3e2c1a07.0f2b3c4d";

/// Event to deliver to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connected,
    Disconnected,
    Suback(u16),
    Message { topic: String, payload: Vec<u8> },
}

/// Counters of what the broker received.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stats {
    pub connections: usize,
    pub telemetry: usize,
    pub reported_properties: usize,
    pub command_responses: usize,
}

#[derive(Debug)]
pub struct SimulatedBroker {
    hub_fqdn: String,
    device_id: String,
    live: Option<u32>,
    next_handle: u32,
    next_packet: u16,
    properties_version: u64,
    events: VecDeque<Event>,
    stats: Stats,
}

impl SimulatedBroker {
    pub fn new(hub_fqdn: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            hub_fqdn: hub_fqdn.into(),
            device_id: device_id.into(),
            live: None,
            next_handle: 0,
            next_packet: 0,
            properties_version: 1,
            events: VecDeque::new(),
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Next event, dropping the disconnection of a client replaced by a new one.
    pub fn next_event(&mut self) -> Option<Event> {
        loop {
            let event = self.events.pop_front()?;

            if event == Event::Disconnected && self.live.is_some() {
                debug!("dropping disconnection of a replaced client");

                continue;
            }

            return Some(event);
        }
    }

    /// Sends a message from the service to the device.
    pub fn inject(&mut self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.events.push_back(Event::Message {
            topic: topic.into(),
            payload: payload.into(),
        });
    }

    /// Writable properties patch from the service.
    pub fn update_desired(&mut self, patch: &serde_json::Value) {
        self.properties_version += 1;

        let mut patch = patch.clone();
        if let Some(object) = patch.as_object_mut() {
            object.insert("$version".to_string(), self.properties_version.into());
        }

        let topic = format!(
            "$iothub/twin/PATCH/properties/desired/?$version={}",
            self.properties_version
        );

        self.inject(topic, patch.to_string());
    }

    fn packet(&mut self) -> u16 {
        self.next_packet = self.next_packet.wrapping_add(1).max(1);

        self.next_packet
    }

    fn check_handle(&self, handle: u32) -> Result<(), Error> {
        if self.live != Some(handle) {
            warn!(handle, live = ?self.live, "operation on a destroyed client");

            return Err(Error::new(ErrorKind::TransportFailure, "client destroyed"));
        }

        Ok(())
    }

    fn respond(&mut self, topic: &str) {
        if topic == dps::REGISTER_PUBLISH_TOPIC {
            self.inject(
                "$dps/registrations/res/202/?$rid=1&retry-after=1",
                serde_json::json!({"operationId": OPERATION_ID, "status": "assigning"}).to_string(),
            );
        } else if topic.starts_with("$dps/registrations/GET/iotdps-get-operationstatus/") {
            self.inject(
                "$dps/registrations/res/200/?$rid=1",
                serde_json::json!({
                    "operationId": OPERATION_ID,
                    "status": "assigned",
                    "registrationState": {
                        "assignedHub": self.hub_fqdn,
                        "deviceId": self.device_id,
                    }
                })
                .to_string(),
            );
        } else if let Some(rid) = topic.strip_prefix("$iothub/twin/PATCH/properties/reported/?$rid=") {
            self.stats.reported_properties += 1;

            let topic = format!("$iothub/twin/res/204/?$rid={rid}&$version={}", self.properties_version);
            self.inject(topic, Vec::new());
        } else if let Some(rid) = topic.strip_prefix("$iothub/twin/GET/?$rid=") {
            let document = serde_json::json!({
                "desired": {
                    "telemetryFrequencySecs": 60,
                    "deviceUpdate": {
                        "__t": "c",
                        "service": {"workflow": {"action": 255, "id": "nodeployment"}},
                    },
                    "$version": self.properties_version,
                },
                "reported": {"$version": 1},
            });

            self.inject(format!("$iothub/twin/res/200/?$rid={rid}"), document.to_string());
        } else if topic.starts_with("$iothub/methods/res/") {
            self.stats.command_responses += 1;
        } else if topic == format!("devices/{}/messages/events/", self.device_id) {
            self.stats.telemetry += 1;
        } else {
            warn!(topic, "publish to unknown topic");
        }
    }
}

impl MqttTransport for SimulatedBroker {
    type Handle = u32;

    fn init(&mut self, config: &MqttClientConfig) -> Result<Self::Handle, Error> {
        if self.live.is_some() {
            return Err(Error::new(ErrorKind::TransportFailure, "client already connected"));
        }

        if config.password().is_none() {
            return Err(Error::new(ErrorKind::TransportFailure, "missing sas token"));
        }

        self.next_handle += 1;
        self.live = Some(self.next_handle);
        self.stats.connections += 1;

        info!(address = %config.address, client_id = %config.client_id, "client connected");

        self.events.push_back(Event::Connected);

        Ok(self.next_handle)
    }

    fn deinit(&mut self, handle: Self::Handle) -> Result<(), Error> {
        self.check_handle(handle)?;

        self.live = None;
        self.events.push_back(Event::Disconnected);

        Ok(())
    }

    fn subscribe(&mut self, handle: &mut Self::Handle, topic: &str, qos: Qos) -> Result<u16, Error> {
        self.check_handle(*handle)?;

        debug!(topic, ?qos, "subscribed");

        let packet = self.packet();
        self.events.push_back(Event::Suback(packet));

        Ok(packet)
    }

    fn publish(&mut self, handle: &mut Self::Handle, message: &MqttMessage<'_>) -> Result<u16, Error> {
        self.check_handle(*handle)?;

        debug!(topic = message.topic, len = message.payload.len(), "received publish");

        self.respond(message.topic);

        Ok(self.packet())
    }
}

/// Clock moved forward by the simulation.
#[derive(Debug)]
pub struct SimulatedClock(Cell<u64>);

impl SimulatedClock {
    pub fn new(start: u64) -> Self {
        Self(Cell::new(start))
    }

    pub fn advance(&self, secs: u64) {
        self.0.set(self.0.get() + secs);
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

impl Clock for &SimulatedClock {
    fn now(&self) -> Result<u64, Error> {
        Ok(self.0.get())
    }
}
