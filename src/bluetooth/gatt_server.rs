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

//! BLE GATT server implementation for AirUnlock.

use anyhow::{Context, Result};
use bluer::adv::{Advertisement, AdvertisementHandle};
use bluer::gatt::local::{
    Application, ApplicationHandle, Characteristic, CharacteristicWrite, CharacteristicWriteMethod,
    CharacteristicWriteRequest, ReqError, Service,
};
use bluer::{Adapter, AdapterEvent, AdapterProperty};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::peripheral::{
    format_address, PeripheralIdentity, PowerAction, WriteOutcome, WriteRequest,
};
use crate::commands::{provisioning_payload, KeywordSource};
use crate::events::PeripheralWrite;
use crate::prompt::UserPrompt;
use crate::state::{AppState, PeripheralStatus};
use crate::storage::SettingsStore;

/// GATT server for AirUnlock.
///
/// Follows the adapter power state: the service is registered and advertised
/// while the adapter is powered, and torn down otherwise.
pub struct GattServer {
    adapter: Adapter,
    identity: PeripheralIdentity,
    write_tx: mpsc::Sender<PeripheralWrite>,
    settings: Arc<SettingsStore>,
    state: Arc<AppState>,
    adv_handle: Option<AdvertisementHandle>,
    app_handle: Option<ApplicationHandle>,
}

impl GattServer {
    /// Create a new GATT server on the named adapter, or the default one.
    pub async fn new(
        adapter_name: Option<&str>,
        write_tx: mpsc::Sender<PeripheralWrite>,
        settings: Arc<SettingsStore>,
        state: Arc<AppState>,
    ) -> Result<Self> {
        info!("Initializing BLE GATT server...");

        let session = bluer::Session::new()
            .await
            .context("Failed to create BlueZ session")?;
        debug!("BlueZ session created");

        let adapter = match adapter_name {
            Some(name) => session.adapter(name)?,
            None => session.default_adapter().await?,
        };
        info!("Using Bluetooth adapter: {}", adapter.name());

        Ok(Self {
            adapter,
            identity: PeripheralIdentity::default(),
            write_tx,
            settings,
            state,
            adv_handle: None,
            app_handle: None,
        })
    }

    pub fn identity(&self) -> &PeripheralIdentity {
        &self.identity
    }

    /// Follow the adapter power state until the event stream ends.
    ///
    /// If the adapter is off at startup the user is offered, once, to turn
    /// it on.
    pub async fn run(&mut self, prompt: &dyn UserPrompt) -> Result<()> {
        let adapter = self.adapter.clone();
        let events = adapter.events().await?;
        futures::pin_mut!(events);

        if adapter.is_powered().await? {
            self.on_power_state(true).await;
        } else {
            self.on_power_state(false).await;
            if prompt.offer_bluetooth_power_on() {
                info!("Powering on Bluetooth adapter...");
                if let Err(e) = adapter.set_powered(true).await {
                    warn!("Failed to power on Bluetooth adapter: {}", e);
                }
            }
        }

        while let Some(event) = events.next().await {
            if let AdapterEvent::PropertyChanged(AdapterProperty::Powered(powered)) = event {
                info!("Bluetooth adapter powered: {}", powered);
                self.on_power_state(powered).await;
            }
        }

        warn!("Bluetooth adapter event stream ended");
        self.stop();
        Ok(())
    }

    async fn on_power_state(&mut self, powered: bool) {
        match PowerAction::plan(powered, self.app_handle.is_some()) {
            PowerAction::Start => {
                if let Err(e) = self.start().await {
                    error!("Failed to start BLE peripheral: {:#}", e);
                    self.stop();
                    self.state.set_status(PeripheralStatus::Error);
                }
            }
            PowerAction::Stop => self.stop(),
            PowerAction::Nothing => debug!("Peripheral already serving"),
        }
    }

    /// Register the service and start advertising.
    async fn start(&mut self) -> Result<()> {
        let address = format_address(&self.adapter.address().await?.to_string());
        info!("Bluetooth address: {}", address);
        if let Err(e) = self.settings.set_address(&address) {
            warn!("Failed to save adapter address: {:#}", e);
        }

        let keywords = self.settings.keywords();
        self.state.set_pairing_payload(provisioning_payload(&address, &keywords));
        self.identity.address = Some(address);

        self.register_gatt_service().await?;
        self.start_advertising().await?;

        self.state.set_status(PeripheralStatus::Advertising);
        info!("GATT server started successfully");
        Ok(())
    }

    /// Stop advertising and remove all services. Safe to call when nothing
    /// is registered.
    fn stop(&mut self) {
        let had_adv = self.adv_handle.take().is_some();
        let had_app = self.app_handle.take().is_some();
        if had_adv || had_app {
            info!("BLE advertising stopped and services removed");
        }
        self.state.set_status(PeripheralStatus::PoweredOff);
    }

    /// Register the GATT service with BlueZ.
    async fn register_gatt_service(&mut self) -> Result<()> {
        let write_tx = self.write_tx.clone();
        let char_uuid = self.identity.characteristic_uuid;
        let write_permitted = true;

        debug!("Registering command characteristic: {}", char_uuid);

        let command_char = Characteristic {
            uuid: char_uuid,
            write: Some(CharacteristicWrite {
                write: write_permitted,
                method: CharacteristicWriteMethod::Fun(Box::new(
                    move |data: Vec<u8>, req: CharacteristicWriteRequest| {
                        let write_tx = write_tx.clone();
                        let request = WriteRequest::new(char_uuid, data, write_permitted);
                        Box::pin(async move {
                            Self::handle_command_write(request, req, write_tx).await
                        })
                    },
                )),
                ..Default::default()
            }),
            ..Default::default()
        };

        let service = Service {
            uuid: self.identity.service_uuid,
            primary: true,
            characteristics: vec![command_char],
            ..Default::default()
        };

        let app = Application {
            services: vec![service],
            ..Default::default()
        };

        self.app_handle = Some(self.adapter.serve_gatt_application(app).await?);

        info!("GATT service registered: {}", self.identity.service_uuid);
        Ok(())
    }

    /// Hand a write to the processor and answer with its outcome.
    async fn handle_command_write(
        request: WriteRequest,
        req: CharacteristicWriteRequest,
        write_tx: mpsc::Sender<PeripheralWrite>,
    ) -> Result<(), ReqError> {
        debug!(
            "BLE write received: {} bytes on {}, MTU={}, offset={}",
            request.payload.len(),
            request.characteristic_uuid,
            req.mtu,
            req.offset
        );
        forward_write(request, &write_tx).await
    }

    /// Start BLE advertising.
    async fn start_advertising(&mut self) -> Result<()> {
        let adv = Advertisement {
            service_uuids: vec![self.identity.service_uuid].into_iter().collect(),
            discoverable: Some(true),
            local_name: Some(self.identity.local_name.clone()),
            ..Default::default()
        };

        let handle = self.adapter.advertise(adv).await?;
        self.adv_handle = Some(handle);

        info!("BLE advertising started as '{}'", self.identity.local_name);
        Ok(())
    }
}

/// Adapter address as the provisioning payload shows it.
pub async fn adapter_address(adapter_name: Option<&str>) -> Result<String> {
    let session = bluer::Session::new().await?;
    let adapter = match adapter_name {
        Some(name) => session.adapter(name)?,
        None => session.default_adapter().await?,
    };
    Ok(format_address(&adapter.address().await?.to_string()))
}

/// Queue a write for the processor and map its outcome to a GATT response.
async fn forward_write(
    request: WriteRequest,
    write_tx: &mpsc::Sender<PeripheralWrite>,
) -> Result<(), ReqError> {
    let (reply, response) = oneshot::channel();
    let write = PeripheralWrite { request, reply };
    if write_tx.send(write).await.is_err() {
        error!("Write processor is gone");
        return Err(ReqError::Failed);
    }

    match response.await {
        Ok(WriteOutcome::Success) => Ok(()),
        Ok(WriteOutcome::WriteNotPermitted) => Err(ReqError::NotPermitted),
        Err(_) => {
            error!("Write processor dropped the request");
            Err(ReqError::Failed)
        }
    }
}
