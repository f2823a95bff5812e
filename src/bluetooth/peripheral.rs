// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Peripheral identity and the write contract between BlueZ and the dispatcher.

use uuid::Uuid;

use super::ble_constants::{COMMAND_UUID, LOCAL_NAME, SERVICE_UUID};

/// What a central sees when it discovers this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralIdentity {
    pub service_uuid: Uuid,
    pub characteristic_uuid: Uuid,
    pub local_name: String,
    /// Controller address, known once the adapter has been queried.
    pub address: Option<String>,
}

impl PeripheralIdentity {
    pub fn new(address: Option<String>) -> Self {
        Self {
            service_uuid: SERVICE_UUID,
            characteristic_uuid: COMMAND_UUID,
            local_name: LOCAL_NAME.to_string(),
            address,
        }
    }

    /// Whether a write is addressed to the registered characteristic.
    pub fn accepts(&self, request: &WriteRequest) -> bool {
        request.characteristic_uuid == self.characteristic_uuid && request.write_permitted
    }
}

impl Default for PeripheralIdentity {
    fn default() -> Self {
        Self::new(None)
    }
}

/// A single characteristic write from a central.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub characteristic_uuid: Uuid,
    pub payload: Vec<u8>,
    /// Whether the target characteristic declares the write property.
    pub write_permitted: bool,
}

impl WriteRequest {
    pub fn new(characteristic_uuid: Uuid, payload: Vec<u8>, write_permitted: bool) -> Self {
        Self {
            characteristic_uuid,
            payload,
            write_permitted,
        }
    }

    /// A write to the command characteristic.
    #[cfg(test)]
    pub fn command(payload: Vec<u8>) -> Self {
        Self::new(COMMAND_UUID, payload, true)
    }
}

/// Result reported back to the central for every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Success,
    WriteNotPermitted,
}

/// What the peripheral must do when the adapter power state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    /// Register the service and start advertising.
    Start,
    /// Stop advertising and remove all services.
    Stop,
    Nothing,
}

impl PowerAction {
    /// Decide the transition for a power report.
    ///
    /// Stopping is requested whenever the adapter is not powered, even if
    /// nothing is registered; the stop path tolerates that.
    pub fn plan(powered: bool, serving: bool) -> Self {
        match (powered, serving) {
            (true, false) => PowerAction::Start,
            (true, true) => PowerAction::Nothing,
            (false, _) => PowerAction::Stop,
        }
    }
}

/// Render a controller address the way the provisioning payload expects it.
pub fn format_address(address: &str) -> String {
    address.replace(':', "-").to_uppercase()
}
