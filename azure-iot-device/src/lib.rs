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

#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

//! Azure IoT device client
//!
//! A poll driven connection state machine for IoT Hub with optional Device Provisioning, and the
//! verification of the signed Device Update manifests. The MQTT transport, the crypto primitives
//! and the clock are provided by the caller.

pub mod adu;
pub mod client;
pub mod crypto;
pub mod pnp;
pub mod sas;
pub mod scratch;
pub mod time;
pub mod transport;

pub use azure_iot_protocol;

pub use self::client::{AzureIot, Callbacks, Config, ConfigBuilder, State, Status};
pub use self::crypto::Crypto;
pub use self::time::Clock;
pub use self::transport::MqttTransport;
