// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generic device controller shared by every family adapter.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::try_join_all;
use parking_lot::{Mutex, RwLock};

use super::{DeviceInfo, DeviceType, Snapshot, is_truthy};
use crate::accessory::{Characteristic, HapStatus, PlatformAccessory, ServiceKey, ServiceType};
use crate::command::{CommandQueue, Field, PayloadCommand, PendingCommand};
use crate::error::{Error, ProtocolError, Result};
use crate::platform::CowayConfig;
use crate::protocol::{AccessToken, ApiResponse, CloudClient, Endpoint, Payload};

/// Manufacturer reported in the accessory information service.
const MANUFACTURER: &str = "Coway Co.,Ltd.";

/// Clears the characteristics-refreshing flag when a push ends, even by
/// unwinding.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Account configuration and access token lent to controllers.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account configuration.
    pub config: Arc<CowayConfig>,
    /// Bearer token for cloud requests.
    pub token: AccessToken,
}

impl Credentials {
    /// Bundles a configuration with its access token.
    #[must_use]
    pub fn new(config: Arc<CowayConfig>, token: AccessToken) -> Self {
        Self { config, token }
    }
}

/// Builds the request payload of an endpoint.
///
/// Family adapters implement this for their own endpoints and fall back to
/// [`DeviceController::create_payload`] for shared ones.
pub trait PayloadFactory {
    /// Returns the payload for `endpoint`, or `None` if the endpoint is not
    /// supported.
    fn create_payload(&self, endpoint: Endpoint) -> Option<Payload>;
}

/// State and behavior shared by every device family.
///
/// The controller owns the ordered endpoint set, the connectivity flag and
/// command dispatch. Family adapters wrap it and add parsing and
/// characteristic handlers.
pub struct DeviceController<C> {
    client: Arc<C>,
    accessory: Arc<PlatformAccessory>,
    device_type: DeviceType,
    device_info: RwLock<DeviceInfo>,
    endpoints: Vec<Endpoint>,
    credentials: RwLock<Option<Arc<Credentials>>>,
    connected: AtomicBool,
    characteristic_refreshing: AtomicBool,
    request_timeout: Duration,
    pending: Mutex<CommandQueue>,
}

impl<C: CloudClient> DeviceController<C> {
    /// Creates a controller polling `endpoints` in the given order.
    ///
    /// The endpoint set is fixed for the lifetime of the controller.
    pub fn new(
        client: Arc<C>,
        accessory: Arc<PlatformAccessory>,
        device_info: DeviceInfo,
        endpoints: impl IntoIterator<Item = Endpoint>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            client,
            accessory,
            device_type: device_info.device_type(),
            device_info: RwLock::new(device_info),
            endpoints: endpoints.into_iter().collect(),
            credentials: RwLock::new(None),
            connected: AtomicBool::new(false),
            characteristic_refreshing: AtomicBool::new(false),
            request_timeout,
            pending: Mutex::new(CommandQueue::new()),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Stores the credentials used by subsequent requests.
    pub fn configure_credentials(&self, credentials: Arc<Credentials>) {
        *self.credentials.write() = Some(credentials);
    }

    /// Returns the fixed endpoint set.
    #[must_use]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Returns the host accessory.
    #[must_use]
    pub fn accessory(&self) -> &Arc<PlatformAccessory> {
        &self.accessory
    }

    /// Returns the device type.
    #[must_use]
    pub fn device_type(&self) -> &DeviceType {
        &self.device_type
    }

    /// Returns a copy of the device identity.
    #[must_use]
    pub fn device_info(&self) -> DeviceInfo {
        self.device_info.read().clone()
    }

    /// Replaces the device identity with a fresher discovery record.
    pub fn set_device_info(&self, device_info: DeviceInfo) {
        *self.device_info.write() = device_info;
    }

    /// Returns the device barcode.
    #[must_use]
    pub fn device_id(&self) -> String {
        self.device_info.read().barcode.clone()
    }

    /// Returns the connectivity flag.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Returns `true` while characteristics are being pushed.
    #[must_use]
    pub fn is_refreshing_characteristics(&self) -> bool {
        self.characteristic_refreshing.load(Ordering::Acquire)
    }

    /// Returns the number of commands waiting for a retry.
    #[must_use]
    pub fn pending_command_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn credentials(&self) -> Result<Arc<Credentials>> {
        self.credentials.read().clone().ok_or(Error::MissingCredentials)
    }

    async fn timed<T>(
        &self,
        request: impl Future<Output = std::result::Result<T, ProtocolError>>,
    ) -> std::result::Result<T, ProtocolError> {
        if let Ok(result) = tokio::time::timeout(self.request_timeout, request).await {
            result
        } else {
            let millis = u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX);
            Err(ProtocolError::Timeout(millis))
        }
    }

    // =========================================================================
    // Polling
    // =========================================================================

    /// Builds the control status payload shared by every family.
    #[must_use]
    pub fn create_payload(&self, endpoint: Endpoint) -> Option<Payload> {
        match endpoint {
            Endpoint::DevicesControl => {
                let info = self.device_info.read();
                Some(
                    Payload::new()
                        .with("devId", info.barcode.as_str())
                        .with("mqttDevice", "true")
                        .with("dvcBrandCd", info.brand_code.as_str())
                        .with("dvcTypeCd", info.type_code.as_str())
                        .with("prodName", info.product_name.as_str()),
                )
            }
            Endpoint::AirDevicesHome | Endpoint::AirDevicesFilterInfo => None,
        }
    }

    /// Fetches one endpoint, building its payload with `factory`.
    ///
    /// Returns `Ok(None)` without a request when the factory does not
    /// support the endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if credentials are missing, the request fails or it
    /// times out.
    pub async fn retrieve_device_state<F>(
        &self,
        factory: &F,
        endpoint: Endpoint,
    ) -> Result<Option<ApiResponse>>
    where
        F: PayloadFactory + Sync + ?Sized,
    {
        let Some(payload) = factory.create_payload(endpoint) else {
            tracing::debug!(endpoint = %endpoint, "No payload for endpoint, skipping");
            return Ok(None);
        };
        let credentials = self.credentials()?;
        let path = endpoint.path(&self.device_id());

        tracing::debug!(path = %path, "Retrieving device state");

        let response = self
            .timed(self.client.get_payload(&path, &payload, &credentials.token))
            .await?;
        Ok(Some(response))
    }

    /// Pairs responses with the endpoint set by position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndpointMismatch`] if the lengths differ.
    pub fn zip_endpoint_responses(&self, responses: Vec<Option<ApiResponse>>) -> Result<Snapshot> {
        Snapshot::zip(&self.endpoints, responses)
    }

    /// Fetches every endpoint concurrently and zips the responses.
    ///
    /// # Errors
    ///
    /// Fails as a whole if any single request fails.
    pub async fn refresh_device<F>(&self, factory: &F) -> Result<Snapshot>
    where
        F: PayloadFactory + Sync + ?Sized,
    {
        let responses = try_join_all(
            self.endpoints
                .iter()
                .map(|&endpoint| self.retrieve_device_state(factory, endpoint)),
        )
        .await?;
        self.zip_endpoint_responses(responses)
    }

    /// Updates the connectivity flag from the control endpoint.
    ///
    /// Does nothing if the control endpoint is not part of the snapshot.
    /// A missing response or a falsy `netStatus` marks the device offline.
    /// Returns `true` if connectivity changed.
    pub fn refresh(&self, snapshot: &Snapshot) -> bool {
        if !snapshot.contains(Endpoint::DevicesControl) {
            return false;
        }
        let connected = snapshot
            .get(Endpoint::DevicesControl)
            .and_then(|control| control.get("netStatus"))
            .is_some_and(is_truthy);

        let was_connected = self.connected.swap(connected, Ordering::AcqRel);
        if was_connected != connected {
            if connected {
                tracing::info!(uuid = %self.accessory.uuid(), "Device is online");
            } else {
                tracing::warn!(uuid = %self.accessory.uuid(), "Device is offline");
            }
        }
        was_connected != connected
    }

    /// Runs `push` if the device is online, flagging the refresh meanwhile.
    ///
    /// Returns `true` if `push` ran. A call made while another refresh of the
    /// same controller is in flight is skipped.
    pub fn refresh_characteristics<F>(&self, push: F) -> bool
    where
        F: FnOnce(),
    {
        if self
            .characteristic_refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(uuid = %self.accessory.uuid(), "Characteristics already refreshing");
            return false;
        }

        let _guard = RefreshGuard(&self.characteristic_refreshing);

        if !self.is_connected() {
            return false;
        }
        push();
        true
    }

    /// Ensures the accessory information service is populated.
    pub fn configure(&self) {
        let info = self.device_info();
        let service = self.accessory.ensure_service(
            ServiceKey::new(ServiceType::AccessoryInformation),
            self.accessory.display_name(),
        );
        self.accessory
            .update_value(&service, Characteristic::Manufacturer, MANUFACTURER);
        self.accessory
            .update_value(&service, Characteristic::Model, info.model);
        self.accessory
            .update_value(&service, Characteristic::SerialNumber, info.barcode);
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Sends a batch of commands to the device.
    ///
    /// Returns `Ok(None)` without a request while the device is offline.
    /// Commands that fail at the transport level while online are parked for
    /// a retry after the next reconcile.
    ///
    /// # Errors
    ///
    /// Returns error if credentials are missing or the request fails.
    pub async fn execute_set_payloads(
        &self,
        commands: &[PayloadCommand],
    ) -> Result<Option<ApiResponse>> {
        if !self.is_connected() {
            tracing::debug!(uuid = %self.accessory.uuid(), "Device offline, dropping commands");
            return Ok(None);
        }
        let credentials = self.credentials()?;
        let info = self.device_info();

        match self
            .timed(self.client.send_control(&info, commands, &credentials.token))
            .await
        {
            Ok(response) => {
                self.pending.lock().discard(commands);
                Ok(Some(response))
            }
            Err(e) => {
                tracing::warn!(uuid = %self.accessory.uuid(), error = %e, "Command dispatch failed");
                self.pending.lock().park(commands);
                Err(e.into())
            }
        }
    }

    /// Sends a single command.
    ///
    /// # Errors
    ///
    /// Returns error if credentials are missing or the request fails.
    pub async fn execute_set_payload(
        &self,
        field: Field,
        value: impl Into<String>,
    ) -> Result<Option<ApiResponse>> {
        self.execute_set_payloads(&[PayloadCommand::new(field, value)])
            .await
    }

    /// Forgets the parked command for `field`.
    ///
    /// Called when the host writes `field` again, so a stale retry never
    /// overrides the newer request, including writes that need no dispatch.
    pub fn discard_pending(&self, field: Field) {
        if self.pending.lock().forget(field.code()) {
            tracing::debug!(uuid = %self.accessory.uuid(), field = %field, "Discarding parked command");
        }
    }

    /// Retries parked commands, dropping those over their skip budget.
    ///
    /// Commands for which `applied` returns `true` are already reflected by
    /// the device and are forgotten without a request. Returns the commands
    /// the cloud accepted. Does nothing while offline.
    pub async fn flush_pending_commands<F>(&self, applied: F) -> Vec<PayloadCommand>
    where
        F: Fn(&PayloadCommand) -> bool,
    {
        if !self.is_connected() {
            return Vec::new();
        }
        let batch: Vec<PendingCommand> = self
            .pending
            .lock()
            .take()
            .into_iter()
            .filter(|pending| {
                let done = applied(pending.command());
                if done {
                    tracing::debug!(
                        uuid = %self.accessory.uuid(),
                        command = %pending.command(),
                        "Parked command already applied"
                    );
                }
                !done
            })
            .collect();
        if batch.is_empty() {
            return Vec::new();
        }
        let Ok(credentials) = self.credentials() else {
            self.pending.lock().defer(batch);
            return Vec::new();
        };

        let commands: Vec<PayloadCommand> = batch.iter().map(|p| p.command().clone()).collect();
        let info = self.device_info();
        tracing::debug!(uuid = %self.accessory.uuid(), commands = commands.len(), "Retrying parked commands");

        match self
            .timed(self.client.send_control(&info, &commands, &credentials.token))
            .await
        {
            Ok(_) => commands,
            Err(e) => {
                let dropped = self.pending.lock().defer(batch);
                for command in dropped {
                    tracing::warn!(
                        uuid = %self.accessory.uuid(),
                        command = %command,
                        error = %e,
                        "Dropping parked command"
                    );
                }
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Handler wrappers
    // =========================================================================

    /// Runs a characteristic read handler unless the device is offline.
    ///
    /// # Errors
    ///
    /// Returns [`HapStatus::ServiceCommunicationFailure`] while offline,
    /// otherwise whatever the handler returns.
    pub fn wrap_get<T, F>(&self, handler: F) -> std::result::Result<T, HapStatus>
    where
        F: FnOnce() -> std::result::Result<T, HapStatus>,
    {
        if !self.is_connected() {
            return Err(HapStatus::ServiceCommunicationFailure);
        }
        handler()
    }

    /// Runs a characteristic write handler unless the device is offline.
    ///
    /// # Errors
    ///
    /// Returns [`HapStatus::ServiceCommunicationFailure`] while offline,
    /// otherwise whatever the handler returns.
    pub async fn wrap_set<F, Fut>(&self, handler: F) -> std::result::Result<(), HapStatus>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<(), HapStatus>>,
    {
        if !self.is_connected() {
            return Err(HapStatus::ServiceCommunicationFailure);
        }
        handler().await
    }

    #[cfg(test)]
    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }
}

impl<C: CloudClient> PayloadFactory for DeviceController<C> {
    fn create_payload(&self, endpoint: Endpoint) -> Option<Payload> {
        DeviceController::create_payload(self, endpoint)
    }
}

impl<C> std::fmt::Debug for DeviceController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceController")
            .field("uuid", &self.accessory.uuid())
            .field("endpoints", &self.endpoints)
            .field("connected", &self.connected.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
