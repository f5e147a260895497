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

//! Wire formats used by a device talking to Azure IoT over MQTT.
//!
//! This crate only formats and parses: topics, payloads, SAS token strings and compact JWS
//! objects. It never performs I/O.

pub mod dps;
pub mod error;
pub mod hub;
pub mod jws;
pub mod mqtt;
pub mod sas;
pub mod utils;

pub use self::error::Error;
