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

//! IoT Hub topics for telemetry, Plug and Play commands and properties.

use crate::Error;
use crate::error::ErrorKind;
use crate::utils::{query_param, url_encode};

/// Service API version sent in the username.
pub const API_VERSION: &str = "2020-09-30";

/// Topic filter for the command requests.
pub const COMMANDS_SUBSCRIBE_TOPIC: &str = "$iothub/methods/POST/#";
/// Topic filter for the responses to property requests.
pub const PROPERTIES_MESSAGE_SUBSCRIBE_TOPIC: &str = "$iothub/twin/res/#";
/// Topic filter for the writable property updates.
pub const PROPERTIES_WRITABLE_UPDATES_SUBSCRIBE_TOPIC: &str =
    "$iothub/twin/PATCH/properties/desired/#";

const COMMANDS_PREFIX: &str = "$iothub/methods/POST/";
const PROPERTIES_RESPONSE_PREFIX: &str = "$iothub/twin/res/";
const PROPERTIES_DESIRED_PREFIX: &str = "$iothub/twin/PATCH/properties/desired/";
const COMPONENT_SEPARATOR: char = '*';

/// MQTT client id for the device.
pub fn client_id(device_id: &str) -> &str {
    device_id
}

/// MQTT username for the device.
pub fn username(hub_fqdn: &str, device_id: &str, user_agent: &str, model_id: &str) -> String {
    let mut username = format!("{hub_fqdn}/{device_id}/?api-version={API_VERSION}");

    if !user_agent.is_empty() {
        username.push_str("&DeviceClientType=");
        username.push_str(user_agent);
    }

    if !model_id.is_empty() {
        username.push_str("&model-id=");
        username.push_str(&url_encode(model_id));
    }

    username
}

/// Topic to send telemetry on.
pub fn telemetry_topic(device_id: &str) -> String {
    format!("devices/{device_id}/messages/events/")
}

/// Topic to update the reported properties.
pub fn reported_properties_topic(request_id: u32) -> String {
    format!("$iothub/twin/PATCH/properties/reported/?$rid={request_id}")
}

/// Topic to request the full properties document.
pub fn get_properties_topic(request_id: u32) -> String {
    format!("$iothub/twin/GET/?$rid={request_id}")
}

/// Topic to respond to a command.
pub fn command_response_topic(request_id: &str, status: u16) -> String {
    format!("$iothub/methods/res/{status}/?$rid={request_id}")
}

/// Kind of a message received on the properties topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertiesMessageType {
    /// Response to a get request, the payload is the properties document.
    GetResponse,
    /// Update to the writable properties, the payload is the patch.
    WritableUpdated,
    /// Acknowledgement of a reported properties update.
    Acknowledgement,
    /// The service failed a request.
    Error,
}

/// A message received on the properties topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertiesMessage<'a> {
    /// Kind of the message.
    pub message_type: PropertiesMessageType,
    /// Status code, 200 for the writable updates.
    pub status: u16,
    /// Request id of a response.
    pub request_id: Option<&'a str>,
    /// Version of the properties.
    pub version: Option<&'a str>,
}

impl<'a> PropertiesMessage<'a> {
    /// Parses a properties topic.
    ///
    /// ```text
    /// $iothub/twin/res/{status}/?$rid={rid}[&$version={version}]
    /// $iothub/twin/PATCH/properties/desired/?$version={version}
    /// ```
    pub fn parse(topic: &'a str) -> Result<Self, Error> {
        if let Some(rest) = topic.strip_prefix(PROPERTIES_DESIRED_PREFIX) {
            let query = rest.strip_prefix('?').unwrap_or(rest);

            return Ok(Self {
                message_type: PropertiesMessageType::WritableUpdated,
                status: 200,
                request_id: None,
                version: query_param(query, "$version"),
            });
        }

        let (status, query) = topic
            .strip_prefix(PROPERTIES_RESPONSE_PREFIX)
            .and_then(|rest| rest.split_once("/?"))
            .ok_or(Error::new(ErrorKind::MalformedInput, "properties topic"))?;

        let status: u16 = status
            .parse()
            .map_err(|_| Error::new(ErrorKind::MalformedInput, "properties status code"))?;

        let message_type = match status {
            200 => PropertiesMessageType::GetResponse,
            204 => PropertiesMessageType::Acknowledgement,
            _ => PropertiesMessageType::Error,
        };

        Ok(Self {
            message_type,
            status,
            request_id: query_param(query, "$rid"),
            version: query_param(query, "$version"),
        })
    }
}

/// Command request parsed from the topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTopic<'a> {
    /// Request id to use in the response.
    pub request_id: &'a str,
    /// Component of the command, if any.
    pub component_name: Option<&'a str>,
    /// Name of the command.
    pub command_name: &'a str,
}

impl<'a> CommandTopic<'a> {
    /// Parses a command topic.
    ///
    /// ```text
    /// $iothub/methods/POST/[{component}*]{command}/?$rid={rid}
    /// ```
    pub fn parse(topic: &'a str) -> Result<Self, Error> {
        let (name, query) = topic
            .strip_prefix(COMMANDS_PREFIX)
            .and_then(|rest| rest.split_once("/?"))
            .ok_or(Error::new(ErrorKind::MalformedInput, "command topic"))?;

        let request_id = query_param(query, "$rid")
            .filter(|rid| !rid.is_empty())
            .ok_or(Error::new(ErrorKind::MalformedInput, "command request id"))?;

        let (component_name, command_name) = match name.split_once(COMPONENT_SEPARATOR) {
            Some((component, command)) => (Some(component), command),
            None => (None, name),
        };

        if command_name.is_empty() {
            return Err(Error::new(ErrorKind::MalformedInput, "command name"));
        }

        Ok(Self {
            request_id,
            component_name,
            command_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn hub_username() {
        insta::assert_snapshot!(
            username(
                "myhub.azure-devices.net",
                "dev-1",
                "c%2F1.0.0",
                "dtmi:azureiot:devkit:freertos:Esp32AzureIotKit;1"
            ),
            @"myhub.azure-devices.net/dev-1/?api-version=2020-09-30&DeviceClientType=c%2F1.0.0&model-id=dtmi%3Aazureiot%3Adevkit%3Afreertos%3AEsp32AzureIotKit%3B1"
        );
        insta::assert_snapshot!(
            username("myhub.azure-devices.net", "dev-1", "", ""),
            @"myhub.azure-devices.net/dev-1/?api-version=2020-09-30"
        );
    }

    #[test]
    fn publish_topics() {
        assert_eq!(telemetry_topic("dev-1"), "devices/dev-1/messages/events/");
        assert_eq!(
            reported_properties_topic(7),
            "$iothub/twin/PATCH/properties/reported/?$rid=7"
        );
        assert_eq!(get_properties_topic(8), "$iothub/twin/GET/?$rid=8");
        assert_eq!(
            command_response_topic("1", 202),
            "$iothub/methods/res/202/?$rid=1"
        );
    }

    #[test]
    fn parse_properties() {
        let cases = [
            (
                "$iothub/twin/res/200/?$rid=1",
                PropertiesMessage {
                    message_type: PropertiesMessageType::GetResponse,
                    status: 200,
                    request_id: Some("1"),
                    version: None,
                },
            ),
            (
                "$iothub/twin/res/204/?$rid=12&$version=4",
                PropertiesMessage {
                    message_type: PropertiesMessageType::Acknowledgement,
                    status: 204,
                    request_id: Some("12"),
                    version: Some("4"),
                },
            ),
            (
                "$iothub/twin/res/400/?$rid=3",
                PropertiesMessage {
                    message_type: PropertiesMessageType::Error,
                    status: 400,
                    request_id: Some("3"),
                    version: None,
                },
            ),
            (
                "$iothub/twin/PATCH/properties/desired/?$version=9",
                PropertiesMessage {
                    message_type: PropertiesMessageType::WritableUpdated,
                    status: 200,
                    request_id: None,
                    version: Some("9"),
                },
            ),
        ];

        for (topic, exp) in cases {
            let msg = PropertiesMessage::parse(topic).unwrap();

            assert_eq!(msg, exp, "{topic}");
        }
    }

    #[test]
    fn parse_properties_invalid() {
        let cases = [
            "$iothub/methods/POST/cmd/?$rid=1",
            "$iothub/twin/res/abc/?$rid=1",
            "devices/dev-1/messages/events/",
        ];

        for topic in cases {
            assert!(PropertiesMessage::parse(topic).is_err(), "{topic}");
        }
    }

    #[test]
    fn parse_command() {
        let cases = [
            (
                "$iothub/methods/POST/ToggleLed1/?$rid=1",
                CommandTopic {
                    request_id: "1",
                    component_name: None,
                    command_name: "ToggleLed1",
                },
            ),
            (
                "$iothub/methods/POST/display*DisplayText/?$rid=a2",
                CommandTopic {
                    request_id: "a2",
                    component_name: Some("display"),
                    command_name: "DisplayText",
                },
            ),
        ];

        for (topic, exp) in cases {
            let cmd = CommandTopic::parse(topic).unwrap();

            assert_eq!(cmd, exp, "{topic}");
        }
    }

    #[test]
    fn parse_command_invalid() {
        let cases = [
            "$iothub/twin/res/200/?$rid=1",
            "$iothub/methods/POST/ToggleLed1/?$rid=",
            "$iothub/methods/POST//?$rid=1",
            "$iothub/methods/POST/comp*/?$rid=1",
        ];

        for topic in cases {
            let err = CommandTopic::parse(topic).unwrap_err();

            assert_eq!(*err.kind(), ErrorKind::MalformedInput, "{topic}");
        }
    }
}
