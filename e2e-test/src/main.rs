// This file is part of Azure IoT Device Rust.
//
// Copyright 2025, 2026 SECO Mind Srl
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

use std::path::PathBuf;
use std::time::Duration;

use azure_iot_device::adu::update::{
    AgentReport, AgentState, DeviceProperties, UpdateId, UpdateRequest,
};
use azure_iot_device::adu::{RootKey, SCRATCH_BUFFER_SIZE};
use azure_iot_device::azure_iot_protocol::mqtt::MqttMessage;
use azure_iot_device::azure_iot_protocol::sas::SasResource;
use azure_iot_device::azure_iot_protocol::utils::BASE64_STANDARD;
use azure_iot_device::client::CommandRequest;
use azure_iot_device::crypto::software::SoftwareCrypto;
use azure_iot_device::pnp::{self, PnpTemplate};
use azure_iot_device::time::SystemClock;
use azure_iot_device::{AzureIot, Callbacks, Clock, ConfigBuilder, State, sas};
use base64::Engine;
use clap::{Parser, Subcommand};
use eyre::{WrapErr, bail, eyre};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use self::broker::{Event, SimulatedBroker, SimulatedClock};

mod broker;

const HUB_FQDN: &str = "sim-hub.azure-devices.net";
const DEVICE_ID: &str = "esp32-sim";
const ID_SCOPE: &str = "0ne00000A0A";
/// Base64 of "simulated device key for e2e".
const DEVICE_KEY: &str = "c2ltdWxhdGVkIGRldmljZSBrZXkgZm9yIGUyZQ==";

const MANUFACTURER: &str = "ESPRESSIF";
const MODEL: &str = "ESP32-Azure-IoT-Kit";

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Authenticates the Device Update manifest in a properties document.
    VerifyManifest {
        /// Twin document or writable properties patch
        #[arg(long)]
        properties: PathBuf,

        /// JSON array of `{"kid", "n", "e"}` with the base64 modulus and exponent
        #[arg(long)]
        root_keys: PathBuf,
    },
    /// Prints a SAS token for the resource.
    SasToken {
        /// Base64 device key
        #[arg(long)]
        key: String,

        /// Lifetime of the token in minutes
        #[arg(long, default_value_t = 60)]
        lifetime: u32,

        #[command(subcommand)]
        resource: Resource,
    },
    /// Runs the client against an in-process broker.
    Simulate {
        /// Provision the device through DPS first
        #[arg(long)]
        provisioning: bool,

        /// Number of iterations
        #[arg(long, default_value_t = 400)]
        ticks: u32,

        /// Simulated seconds per iteration
        #[arg(long, default_value_t = 15)]
        tick_secs: u64,

        /// Real delay between iterations
        #[arg(long, default_value_t = 5)]
        delay_ms: u64,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum Resource {
    Hub {
        #[arg(long)]
        fqdn: String,

        #[arg(long)]
        device_id: String,
    },
    Dps {
        #[arg(long)]
        id_scope: String,

        #[arg(long)]
        registration_id: String,
    },
}

#[derive(Debug, Deserialize)]
struct RootKeyFile {
    kid: String,
    n: String,
    e: String,
}

async fn verify_manifest(properties: PathBuf, root_keys: PathBuf) -> eyre::Result<()> {
    let document = tokio::fs::read(&properties)
        .await
        .wrap_err_with(|| format!("couldn't read {}", properties.display()))?;

    let Some(request) = UpdateRequest::from_properties(&document)? else {
        bail!("no Device Update request in the properties");
    };

    let keys = tokio::fs::read(&root_keys)
        .await
        .wrap_err_with(|| format!("couldn't read {}", root_keys.display()))?;
    let keys: Vec<RootKeyFile> = serde_json::from_slice(&keys)?;

    let decoded = keys
        .iter()
        .map(|key| -> eyre::Result<_> {
            let n = BASE64_STANDARD.decode(&key.n)?;
            let e = BASE64_STANDARD.decode(&key.e)?;

            Ok((key.kid.as_str(), n, e))
        })
        .collect::<eyre::Result<Vec<_>>>()?;

    let root_keys: Vec<RootKey> = decoded
        .iter()
        .map(|(kid, n, e)| RootKey::new(kid, n, e))
        .collect();

    let mut scratch = vec![0u8; SCRATCH_BUFFER_SIZE];

    let manifest = request.authenticate::<SoftwareCrypto>(&root_keys, &mut scratch)?;

    info!(
        workflow = %request.workflow.id,
        provider = %manifest.update_id.provider,
        name = %manifest.update_id.name,
        version = %manifest.update_id.version,
        files = manifest.files.len(),
        "manifest authenticated"
    );

    for (id, file) in &manifest.files {
        let url = request.file_urls.get(id);

        info!(%id, name = %file.file_name, size = file.size_in_bytes, ?url, "update file");
    }

    Ok(())
}

fn sas_token(key: &str, lifetime: u32, resource: &Resource) -> eyre::Result<()> {
    let resource = match resource {
        Resource::Hub { fqdn, device_id } => SasResource::Hub {
            hub_fqdn: fqdn,
            device_id,
        },
        Resource::Dps {
            id_scope,
            registration_id,
        } => SasResource::Dps {
            id_scope,
            registration_id,
        },
    };

    let token = sas::generate(
        &mut SoftwareCrypto::new(),
        &SystemClock,
        &resource,
        key,
        lifetime,
    )?;

    info!(expiration = token.expiration(), "token generated");

    println!("{}", token.password().as_str());

    Ok(())
}

/// Simulated device: the Plug and Play template plus the Device Update requests.
#[derive(Debug, Default)]
struct Device {
    pnp: PnpTemplate,
    update_requests: Vec<UpdateRequest>,
}

impl Device {
    fn check_update(&mut self, payload: &[u8]) {
        match UpdateRequest::from_properties(payload) {
            Ok(Some(request)) => self.update_requests.push(request),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "couldn't read update request"),
        }
    }
}

impl Callbacks for Device {
    fn on_properties_update_completed(&mut self, request_id: u32, status: u16) {
        self.pnp.on_properties_update_completed(request_id, status);
    }

    fn on_properties_received(&mut self, payload: &[u8]) {
        self.check_update(payload);
        self.pnp.on_properties_received(payload);
    }

    fn on_command_request_received(&mut self, request: CommandRequest<'_>) {
        self.pnp.on_command_request_received(request);
    }
}

type SimClient<'a> = AzureIot<SoftwareCrypto, SimulatedBroker, &'a SimulatedClock>;

fn deliver(client: &mut SimClient<'_>, device: &mut Device) -> eyre::Result<()> {
    while let Some(event) = client.transport_mut().next_event() {
        match event {
            Event::Connected => client.connected()?,
            Event::Disconnected => client.disconnected()?,
            Event::Suback(packet_id) => client.subscribe_completed(packet_id)?,
            Event::Message { topic, payload } => {
                client.message_received(&MqttMessage::new(&topic, &payload), device)?
            }
        }
    }

    Ok(())
}

fn answer_updates(client: &mut SimClient<'_>, device: &mut Device) -> eyre::Result<()> {
    let installed = UpdateId {
        provider: MANUFACTURER.to_string(),
        name: MODEL.to_string(),
        version: "1.0".to_string(),
    };

    for request in std::mem::take(&mut device.update_requests) {
        info!(workflow = %request.workflow.id, action = ?request.workflow.action, "update request");

        let ack = request.service_ack(200, "")?;
        client.send_properties_update(0, ack.as_bytes())?;

        let mut report = AgentReport::new(
            DeviceProperties::new(MANUFACTURER, MODEL),
            AgentState::Idle,
            &installed,
        )?;
        report.workflow = Some(&request.workflow);

        client.send_properties_update(0, report.to_reported_properties()?.as_bytes())?;
    }

    Ok(())
}

async fn simulate(provisioning: bool, ticks: u32, tick_secs: u64, delay_ms: u64) -> eyre::Result<()> {
    let clock = SimulatedClock::new(SystemClock.now()?);

    let config = if provisioning {
        ConfigBuilder::new().provisioning(ID_SCOPE, DEVICE_ID)
    } else {
        ConfigBuilder::new().iot_hub(HUB_FQDN, DEVICE_ID)
    }
    .device_key(DEVICE_KEY)
    .model_id(pnp::MODEL_ID)
    .user_agent("e2e-test/0.1.0")
    .build();

    let broker = SimulatedBroker::new(HUB_FQDN, DEVICE_ID);
    let mut client = AzureIot::new(config, SoftwareCrypto::new(), broker, &clock)?;
    let mut device = Device::default();

    client.start()?;

    let mut was_ready = false;
    let mut refreshes = 0;

    for tick in 0..ticks {
        client.do_work()?;

        if client.state() == State::RefreshingSas {
            refreshes += 1;
        }

        deliver(&mut client, &mut device)?;

        if client.state() != State::Ready {
            was_ready = false;
        } else {
            if !was_ready {
                info!(tick, hub = ?client.hub_fqdn(), "device ready");

                device.pnp.send_device_info(&mut client)?;
                client.request_properties(1)?;
                was_ready = true;
            }

            match tick % 40 {
                10 => client
                    .transport_mut()
                    .inject("$iothub/methods/POST/ToggleLed1/?$rid=1", "{}"),
                20 => client
                    .transport_mut()
                    .inject("$iothub/methods/POST/DisplayText/?$rid=2", "\"hello\""),
                30 => client
                    .transport_mut()
                    .update_desired(&serde_json::json!({"telemetryFrequencySecs": 30})),
                _ => {}
            }

            deliver(&mut client, &mut device)?;
            answer_updates(&mut client, &mut device)?;
            device.pnp.flush(&mut client)?;
            device.pnp.send_telemetry(&mut client, clock.get())?;
        }

        clock.advance(tick_secs);

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    let stats = client.transport().stats();

    info!(
        state = ?client.state(),
        connections = stats.connections,
        refreshes,
        telemetry = stats.telemetry,
        reported_properties = stats.reported_properties,
        command_responses = stats.command_responses,
        leds = ?device.pnp.leds(),
        display = ?device.pnp.display_text(),
        telemetry_frequency_secs = device.pnp.telemetry_frequency_secs(),
        "simulation completed"
    );

    if client.state() != State::Ready {
        return Err(eyre!("simulation ended in state {:?}", client.state()));
    }

    client.stop()?;

    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive("info".parse()?)
                .from_env_lossy(),
        )
        .try_init()?;

    match cli.command {
        Command::VerifyManifest {
            properties,
            root_keys,
        } => verify_manifest(properties, root_keys).await?,
        Command::SasToken {
            key,
            lifetime,
            resource,
        } => sas_token(&key, lifetime, &resource)?,
        Command::Simulate {
            provisioning,
            ticks,
            tick_secs,
            delay_ms,
        } => simulate(provisioning, ticks, tick_secs, delay_ms).await?,
    }

    Ok(())
}
