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

//! Device Provisioning Service (DPS) over MQTT.
//!
//! The device subscribes to the response topic, publishes a registration request and then polls
//! the operation status until the service assigns it to a hub.

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::error::ErrorKind;
use crate::utils::query_param;

/// Host name of the global provisioning endpoint.
pub const GLOBAL_ENDPOINT_FQDN: &str = "global.azure-devices-provisioning.net";

/// Service API version sent in the username.
pub const API_VERSION: &str = "2019-03-31";

/// Topic filter for the registration responses.
pub const REGISTER_SUBSCRIBE_TOPIC: &str = "$dps/registrations/res/#";

/// Topic for the registration request.
pub const REGISTER_PUBLISH_TOPIC: &str = "$dps/registrations/PUT/iotdps-register/?$rid=1";

/// Seconds to wait between status queries when the service doesn't say otherwise.
pub const DEFAULT_RETRY_AFTER_SECS: u32 = 3;

const RESPONSE_TOPIC_PREFIX: &str = "$dps/registrations/res/";

/// MQTT client id for the registration.
pub fn client_id(registration_id: &str) -> &str {
    registration_id
}

/// MQTT username for the registration.
pub fn username(id_scope: &str, registration_id: &str, user_agent: &str) -> String {
    let mut username = format!("{id_scope}/registrations/{registration_id}/api-version={API_VERSION}");

    if !user_agent.is_empty() {
        username.push_str("&ClientVersion=");
        username.push_str(user_agent);
    }

    username
}

/// Topic to query the status of a running registration.
pub fn query_status_topic(operation_id: &str) -> String {
    format!("$dps/registrations/GET/iotdps-get-operationstatus/?$rid=1&operationId={operation_id}")
}

/// Custom payload carrying the Plug and Play model id.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelIdPayload<'a> {
    /// Model id of the device.
    pub model_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    registration_id: &'a str,
    payload: ModelIdPayload<'a>,
}

/// Body of the registration request.
///
/// ```json
/// {"registrationId":"<id>","payload":{"modelId":"<model-id>"}}
/// ```
pub fn register_payload(registration_id: &str, model_id: &str) -> Result<String, Error> {
    let request = RegisterRequest {
        registration_id,
        payload: ModelIdPayload { model_id },
    };

    serde_json::to_string(&request).map_err(|err| {
        #[cfg(feature = "tracing")]
        tracing::error!(error = %err, "couldn't encode register request");

        Error::new(ErrorKind::MalformedInput, "register request")
    })
}

/// Status of the registration operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Not yet processed.
    Unassigned,
    /// Being processed.
    Assigning,
    /// Device assigned to a hub.
    Assigned,
    /// The registration failed.
    Failed,
    /// The enrollment is disabled.
    Disabled,
}

impl OperationStatus {
    /// Returns true if the operation reached a terminal status.
    pub fn is_complete(&self) -> bool {
        match self {
            OperationStatus::Unassigned | OperationStatus::Assigning => false,
            OperationStatus::Assigned | OperationStatus::Failed | OperationStatus::Disabled => {
                true
            }
        }
    }
}

/// Result of the registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationState {
    /// Host name of the assigned hub.
    #[serde(default)]
    pub assigned_hub: String,
    /// Device id on the assigned hub.
    #[serde(default)]
    pub device_id: String,
    /// Error code on failure.
    pub error_code: Option<u64>,
    /// Error message on failure.
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseBody {
    #[serde(default)]
    operation_id: String,
    status: Option<OperationStatus>,
    registration_state: Option<RegistrationState>,
    error_code: Option<u64>,
    message: Option<String>,
}

/// Registration response or operation status received from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterResponse {
    /// Status code in the topic.
    pub status_code: u16,
    /// Seconds to wait before querying again.
    pub retry_after: u32,
    /// Id to query the operation status.
    pub operation_id: String,
    /// Status of the operation.
    pub status: OperationStatus,
    /// Registration result.
    pub registration_state: RegistrationState,
}

impl RegisterResponse {
    /// Parses the response topic and JSON payload.
    ///
    /// ```text
    /// $dps/registrations/res/{status}/?$rid={rid}&retry-after={secs}
    /// ```
    ///
    /// Error responses (status 300 and above) are reported as a failed operation.
    pub fn parse(topic: &str, payload: &[u8]) -> Result<Self, Error> {
        let (status, query) = topic
            .strip_prefix(RESPONSE_TOPIC_PREFIX)
            .and_then(|rest| rest.split_once("/?"))
            .ok_or(Error::new(ErrorKind::MalformedInput, "dps response topic"))?;

        let status_code: u16 = status.parse().map_err(|err| {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %err, status, "couldn't parse dps status code");

            Error::new(ErrorKind::MalformedInput, "dps response status code")
        })?;

        let retry_after = query_param(query, "retry-after")
            .and_then(|value| value.parse().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

        let body: ResponseBody = serde_json::from_slice(payload).map_err(|err| {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %err, "couldn't decode dps response");

            Error::new(ErrorKind::MalformedInput, "dps response payload")
        })?;

        if status_code >= 300 {
            #[cfg(feature = "tracing")]
            tracing::warn!(status_code, error_code = ?body.error_code, message = ?body.message, "dps error response");

            return Ok(Self {
                status_code,
                retry_after,
                operation_id: body.operation_id,
                status: OperationStatus::Failed,
                registration_state: RegistrationState {
                    error_code: body.error_code,
                    error_message: body.message,
                    ..Default::default()
                },
            });
        }

        let status = body
            .status
            .ok_or(Error::new(ErrorKind::MalformedInput, "dps response status"))?;

        Ok(Self {
            status_code,
            retry_after,
            operation_id: body.operation_id,
            status,
            registration_state: body.registration_state.unwrap_or_default(),
        })
    }
}
