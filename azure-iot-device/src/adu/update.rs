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

//! Device Update component properties.
//!
//! The service writes the `deviceUpdate.service` desired property with the deployment, the
//! device reports its progress in `deviceUpdate.agent`.

use std::collections::BTreeMap;

use azure_iot_protocol::Error;
use azure_iot_protocol::error::ErrorKind;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::RootKey;
use crate::crypto::Crypto;

/// Name of the Device Update component.
pub const COMPONENT_NAME: &str = "deviceUpdate";

/// Model of the Device Update interface.
pub const INTERFACE_ID: &str = "dtmi:azure:iot:deviceUpdateContractModel;2";

/// Version of the agent sent in the device properties.
pub const AGENT_VERSION: &str = "DU;agent/1.0.0";

const COMPONENT_MARKER: &str = "c";

/// Action requested by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum WorkflowAction {
    /// Download and install the update.
    ApplyDeployment,
    /// Cancel the running deployment.
    Cancel,
    /// Action not known by the agent.
    Unknown(u32),
}

impl From<u32> for WorkflowAction {
    fn from(value: u32) -> Self {
        match value {
            3 => WorkflowAction::ApplyDeployment,
            255 => WorkflowAction::Cancel,
            other => WorkflowAction::Unknown(other),
        }
    }
}

impl From<WorkflowAction> for u32 {
    fn from(value: WorkflowAction) -> Self {
        match value {
            WorkflowAction::ApplyDeployment => 3,
            WorkflowAction::Cancel => 255,
            WorkflowAction::Unknown(other) => other,
        }
    }
}

/// Deployment workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Requested action.
    pub action: WorkflowAction,
    /// Id of the deployment.
    pub id: String,
    /// Set when the service retries a deployment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_timestamp: Option<String>,
}

/// Deployment request written by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// Requested workflow.
    pub workflow: Workflow,
    /// Manifest as a JSON string, empty on cancel.
    #[serde(default)]
    pub update_manifest: String,
    /// Compact JWS signing the manifest.
    #[serde(default)]
    pub update_manifest_signature: String,
    /// Download URL of each file in the manifest.
    #[serde(default)]
    pub file_urls: BTreeMap<String, String>,
    /// Version of the desired properties carrying the request.
    #[serde(skip)]
    pub version: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DesiredProperties {
    #[serde(rename = "deviceUpdate")]
    device_update: Option<ServiceComponent>,
    #[serde(rename = "$version")]
    version: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PropertiesDocument {
    desired: Option<DesiredProperties>,
    #[serde(flatten)]
    patch: DesiredProperties,
}

#[derive(Debug, Deserialize)]
struct ServiceComponent {
    service: Option<UpdateRequest>,
}

impl UpdateRequest {
    /// Reads the request from a properties payload.
    ///
    /// Accepts both the full document, with the `desired` section, and a writable properties
    /// patch. Returns [`None`] if the payload has no Device Update request.
    pub fn from_properties(payload: &[u8]) -> Result<Option<Self>, Error> {
        let document: PropertiesDocument = serde_json::from_slice(payload).map_err(|err| {
            error!(error = %err, "couldn't decode properties");

            Error::new(ErrorKind::MalformedInput, "properties document")
        })?;

        let desired = document.desired.unwrap_or(document.patch);

        let request = desired
            .device_update
            .and_then(|component| component.service)
            .map(|mut request| {
                request.version = desired.version;

                request
            });

        if let Some(request) = &request {
            debug!(id = %request.workflow.id, action = ?request.workflow.action, "update request");
        }

        Ok(request)
    }

    /// Authenticates the manifest and decodes it.
    ///
    /// The scratch buffer must be at least [`SCRATCH_BUFFER_SIZE`](super::SCRATCH_BUFFER_SIZE).
    pub fn authenticate<C>(
        &self,
        root_keys: &[RootKey<'_>],
        scratch: &mut [u8],
    ) -> Result<UpdateManifest, Error>
    where
        C: Crypto,
    {
        super::authenticate::<C>(
            self.update_manifest.as_bytes(),
            &self.update_manifest_signature,
            root_keys,
            scratch,
        )?;

        serde_json::from_str(&self.update_manifest).map_err(|err| {
            error!(error = %err, "couldn't decode update manifest");

            Error::new(ErrorKind::MalformedInput, "update manifest")
        })
    }

    /// Acknowledges the request to the service.
    pub fn service_ack(&self, status: u16, description: &str) -> Result<String, Error> {
        let ack = ComponentProperty {
            device_update: Component {
                marker: COMPONENT_MARKER,
                inner: ServiceAck {
                    service: WritableAck {
                        ac: status,
                        av: self.version.unwrap_or_default(),
                        ad: description,
                        value: self,
                    },
                },
            },
        };

        to_json(&ack, "service ack")
    }
}

/// Identity of an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateId {
    /// Publisher of the update.
    pub provider: String,
    /// Name of the update.
    pub name: String,
    /// Version of the update.
    pub version: String,
}

/// Step of the installation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Handler installing the files.
    #[serde(default)]
    pub handler: Option<String>,
    /// Files installed by the step.
    #[serde(default)]
    pub files: Vec<String>,
    /// Properties for the handler.
    #[serde(default)]
    pub handler_properties: BTreeMap<String, String>,
}

/// Installation instructions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Instructions {
    /// Steps to run in order.
    pub steps: Vec<Step>,
}

/// File of the update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFile {
    /// Name of the file.
    pub file_name: String,
    /// Size of the file.
    pub size_in_bytes: u64,
    /// Base64 digests keyed by algorithm.
    pub hashes: BTreeMap<String, String>,
}

/// Decoded update manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateManifest {
    /// Version of the manifest schema.
    pub manifest_version: String,
    /// Update to install.
    pub update_id: UpdateId,
    /// Device properties the update is compatible with.
    #[serde(default)]
    pub compatibility: Vec<BTreeMap<String, String>>,
    /// How to install the update.
    pub instructions: Instructions,
    /// Files by id.
    #[serde(default)]
    pub files: BTreeMap<String, UpdateFile>,
    /// Creation time.
    #[serde(default)]
    pub created_date_time: String,
}

/// State of the agent reported to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum AgentState {
    /// Nothing to do.
    Idle,
    /// Deployment running.
    InProgress,
    /// Last deployment failed.
    Failed,
}

impl From<AgentState> for u8 {
    fn from(value: AgentState) -> Self {
        match value {
            AgentState::Idle => 0,
            AgentState::InProgress => 6,
            AgentState::Failed => 255,
        }
    }
}

/// Device identity reported by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProperties<'a> {
    /// Manufacturer, matched against the compatibility.
    pub manufacturer: &'a str,
    /// Model, matched against the compatibility.
    pub model: &'a str,
    /// Device Update interface.
    pub interface_id: &'a str,
    /// Agent version.
    pub adu_ver: &'a str,
}

impl<'a> DeviceProperties<'a> {
    /// Creates the properties with the default interface and agent version.
    pub fn new(manufacturer: &'a str, model: &'a str) -> Self {
        Self {
            manufacturer,
            model,
            interface_id: INTERFACE_ID,
            adu_ver: AGENT_VERSION,
        }
    }
}

/// Result of an installation step or of the whole installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Result code, 700 is success.
    pub result_code: u32,
    /// Implementation specific code.
    pub extended_result_code: u32,
    /// Details of the result.
    pub result_details: String,
}

/// Result of the last installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallResult {
    /// Overall result.
    #[serde(flatten)]
    pub result: StepResult,
    /// Result of each step, keyed as `step_{idx}`.
    pub step_results: BTreeMap<String, StepResult>,
}

/// Reported state of the agent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReport<'a> {
    /// Identity of the device.
    pub device_properties: DeviceProperties<'a>,
    /// Device properties matched against the compatibility.
    pub compat_property_names: &'a str,
    /// State of the agent.
    pub state: AgentState,
    /// Workflow being processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow: Option<&'a Workflow>,
    /// JSON string of the installed [`UpdateId`].
    pub installed_update_id: String,
    /// Result of the last installation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_install_result: Option<&'a InstallResult>,
}

impl<'a> AgentReport<'a> {
    /// Creates the report for the installed update.
    pub fn new(
        device_properties: DeviceProperties<'a>,
        state: AgentState,
        installed: &UpdateId,
    ) -> Result<Self, Error> {
        let installed_update_id = to_json(installed, "installed update id")?;

        Ok(Self {
            device_properties,
            compat_property_names: "manufacturer,model",
            state,
            workflow: None,
            installed_update_id,
            last_install_result: None,
        })
    }

    /// Payload for the reported properties update.
    pub fn to_reported_properties(&self) -> Result<String, Error> {
        let reported = ComponentProperty {
            device_update: Component {
                marker: COMPONENT_MARKER,
                inner: AgentProperty { agent: self },
            },
        };

        to_json(&reported, "agent reported properties")
    }
}

#[derive(Serialize)]
struct ComponentProperty<T> {
    #[serde(rename = "deviceUpdate")]
    device_update: Component<T>,
}

#[derive(Serialize)]
struct Component<T> {
    #[serde(rename = "__t")]
    marker: &'static str,
    #[serde(flatten)]
    inner: T,
}

#[derive(Serialize)]
struct AgentProperty<'a> {
    agent: &'a AgentReport<'a>,
}

#[derive(Serialize)]
struct ServiceAck<'a> {
    service: WritableAck<'a>,
}

#[derive(Serialize)]
struct WritableAck<'a> {
    ac: u16,
    av: u64,
    ad: &'a str,
    value: &'a UpdateRequest,
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
