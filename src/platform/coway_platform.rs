// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Platform orchestrating discovery, restore and polling.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use super::{CowayConfig, DeviceAccessory, PlatformSettings};
use crate::accessory::{AccessoryContext, AccessoryHost, PlatformAccessory};
use crate::device::{Credentials, DeviceInfo, SpecificDeviceType, is_truthy};
use crate::error::{Error, ParseError, ProtocolError, Result};
use crate::event::{EventBus, PlatformEvent};
use crate::protocol::{AccessToken, AccountEndpoint, ApiResponse, CloudClient, Payload};

/// Clears the single-flight flag when a poll cycle ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Orchestrator of every accessory of one account.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use coway_bridge::accessory::MemoryHost;
/// use coway_bridge::platform::{CowayPlatform, PlatformSettings};
/// use coway_bridge::protocol::{AccessToken, HttpClient};
/// use serde_json::json;
///
/// # async fn example() -> coway_bridge::Result<()> {
/// let platform = CowayPlatform::new(
///     Arc::new(HttpClient::new()?),
///     Arc::new(MemoryHost::new()),
///     &json!({"username": "user@example.com", "password": "secret"}),
///     PlatformSettings::new(),
/// );
///
/// let mut events = platform.subscribe();
/// tokio::spawn(async move {
///     while let Ok(event) = events.recv().await {
///         println!("{event:?}");
///     }
/// });
///
/// platform.restore_cached();
/// platform
///     .run(
///         AccessToken::new("token"),
///         tokio::time::sleep(std::time::Duration::from_secs(3600)),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct CowayPlatform<C, H> {
    client: Arc<C>,
    host: Arc<H>,
    config: Option<Arc<CowayConfig>>,
    settings: PlatformSettings,
    accessories: RwLock<Vec<Arc<DeviceAccessory<C>>>>,
    credentials: RwLock<Option<Arc<Credentials>>>,
    cycle_running: AtomicBool,
    event_bus: EventBus,
}

impl<C: CloudClient, H: AccessoryHost> CowayPlatform<C, H> {
    /// Creates the platform from the host's platform block.
    ///
    /// An incomplete block leaves the platform unconfigured: it can still
    /// restore cached accessories but [`launch`](Self::launch) fails.
    pub fn new(client: Arc<C>, host: Arc<H>, config: &Value, settings: PlatformSettings) -> Self {
        let config = CowayConfig::parse(config).map(Arc::new);
        if config.is_none() {
            tracing::warn!("The coway config is not yet configured");
        }
        Self {
            client,
            host,
            config,
            settings,
            accessories: RwLock::new(Vec::new()),
            credentials: RwLock::new(None),
            cycle_running: AtomicBool::new(false),
            event_bus: EventBus::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Subscribes to platform events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.event_bus.subscribe()
    }

    /// Returns the account configuration, if complete.
    #[must_use]
    pub fn config(&self) -> Option<&CowayConfig> {
        self.config.as_deref()
    }

    /// Returns the engine settings.
    #[must_use]
    pub fn settings(&self) -> &PlatformSettings {
        &self.settings
    }

    /// Returns the managed accessories.
    #[must_use]
    pub fn accessories(&self) -> Vec<Arc<DeviceAccessory<C>>> {
        self.accessories.read().clone()
    }

    /// Returns the accessory with the given UUID.
    #[must_use]
    pub fn accessory(&self, uuid: Uuid) -> Option<Arc<DeviceAccessory<C>>> {
        self.accessories
            .read()
            .iter()
            .find(|a| a.accessory().uuid() == uuid)
            .cloned()
    }

    /// Returns `true` while a poll cycle is running.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.cycle_running.load(Ordering::Acquire)
    }

    fn credentials(&self) -> Result<Arc<Credentials>> {
        self.credentials
            .read()
            .clone()
            .ok_or(Error::MissingCredentials)
    }

    async fn account_request(&self, endpoint: AccountEndpoint, payload: &Payload) -> Result<ApiResponse> {
        let credentials = self.credentials()?;
        let timeout = self.settings.request_timeout();
        let request = self
            .client
            .get_payload(endpoint.path(), payload, &credentials.token);
        match tokio::time::timeout(timeout, request).await {
            Ok(response) => Ok(response?),
            Err(_) => {
                let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                Err(ProtocolError::Timeout(millis).into())
            }
        }
    }

    // =========================================================================
    // Restore
    // =========================================================================

    /// Rebuilds the adapters of every accessory the host restored.
    ///
    /// Returns the number of accessories restored.
    pub fn restore_cached(&self) -> usize {
        self.host
            .cached()
            .into_iter()
            .filter(|accessory| self.configure_accessory(accessory.clone()))
            .count()
    }

    /// Rebuilds the adapter of one cached accessory from its context.
    ///
    /// The accessory is marked unconfirmed until the next discovery sees
    /// its device. Returns `false` if the context does not describe a
    /// supported device.
    pub fn configure_accessory(&self, accessory: Arc<PlatformAccessory>) -> bool {
        let context = accessory.context();
        let Some(device_info) = context.device_info else {
            tracing::warn!(name = %accessory.display_name(), "Failed to reconfigure accessory without device info");
            return false;
        };
        let device_type = context
            .device_type
            .unwrap_or_else(|| device_info.device_type());
        let kind = match SpecificDeviceType::resolve(&device_type, &device_info.product_name) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(name = %accessory.display_name(), error = %e, "Failed to reconfigure accessory");
                return false;
            }
        };

        let uuid = accessory.uuid();
        let adapter = Arc::new(DeviceAccessory::create(
            kind,
            self.client.clone(),
            accessory.clone(),
            device_info,
            &self.settings,
        ));
        {
            let mut accessories = self.accessories.write();
            accessories.retain(|a| a.accessory().uuid() != uuid);
            accessories.push(adapter);
        }

        accessory.update_context(|context| context.configured = false);
        tracing::info!(name = %accessory.display_name(), "Configuring cached accessory");
        self.host.update(&[accessory]);
        self.event_bus
            .publish(PlatformEvent::AccessoryRestored { uuid });
        true
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Stores the access token, discovers devices and runs a first poll.
    ///
    /// Discovery is retried according to the settings' retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredentials`] if the configuration is
    /// incomplete, or the last discovery error once retries are exhausted.
    pub async fn launch(&self, token: AccessToken) -> Result<()> {
        let config = self.config.clone().ok_or(Error::MissingCredentials)?;
        *self.credentials.write() = Some(Arc::new(Credentials::new(config, token)));

        let policy = self.settings.retry_policy();
        let mut attempt = 0;
        loop {
            match self.configure_devices().await {
                Ok(()) => break,
                Err(e) if policy.should_retry(attempt) => {
                    let delay = policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Device discovery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Device discovery failed");
                    return Err(e);
                }
            }
        }

        self.refresh_devices_parallel().await;
        Ok(())
    }

    /// Discovers the account's devices and reconciles the accessory set.
    ///
    /// New devices get an accessory, known ones are refreshed with their
    /// latest identity, and accessories whose device is gone are removed.
    ///
    /// # Errors
    ///
    /// Returns error if the listing request fails, the service answers
    /// without a device list, or the account has no devices.
    pub async fn configure_devices(&self) -> Result<()> {
        let payload = Payload::new()
            .with("pageIndex", "0")
            .with("pageSize", self.settings.page_size().to_string());
        let response = self
            .account_request(AccountEndpoint::UserDevices, &payload)
            .await?;
        let listing = response
            .data()
            .and_then(|data| data.get("deviceInfos"))
            .ok_or_else(|| Error::Discovery("Coway service is offline".to_string()))?;
        let mut devices: Vec<DeviceInfo> =
            serde_json::from_value(listing.clone()).map_err(ParseError::from)?;

        if devices.is_empty() {
            tracing::warn!("No Coway devices in the account");
            return Err(Error::NoDevices);
        }

        self.check_devices_online(&mut devices).await?;
        for device in devices {
            self.add_accessory(device).await;
        }
        self.remove_unconfirmed();
        Ok(())
    }

    async fn check_devices_online(&self, devices: &mut [DeviceInfo]) -> Result<()> {
        let ids: Vec<&str> = devices.iter().map(|d| d.barcode.as_str()).collect();
        let payload = Payload::new().with("devIds", ids.join(","));
        let response = self
            .account_request(AccountEndpoint::DeviceConnections, &payload)
            .await?;

        let Some(statuses) = response.data().and_then(Value::as_array) else {
            tracing::debug!("Connectivity check returned no device list");
            return Ok(());
        };
        for status in statuses {
            let Some(id) = status.get("devId").and_then(Value::as_str) else {
                continue;
            };
            let online = status.get("netStatus").is_some_and(is_truthy);
            for device in devices.iter_mut().filter(|d| d.barcode == id) {
                device.net_status = Some(online);
            }
        }
        Ok(())
    }

    async fn add_accessory(&self, device_info: DeviceInfo) {
        let Ok(credentials) = self.credentials() else {
            return;
        };
        let uuid = PlatformAccessory::uuid_for(&device_info.barcode);

        if let Some(existing) = self.accessory(uuid) {
            tracing::info!(
                name = %device_info.display_name(),
                product = %device_info.product_name,
                "Restoring existing accessory"
            );
            existing.configure_credentials(credentials);
            existing.set_device_info(device_info.clone());
            if let Err(e) = existing.configure().await {
                tracing::warn!(uuid = %uuid, error = %e, "Failed to configure accessory");
            }

            let accessory = existing.accessory().clone();
            accessory.update_context(|context| {
                context.init = false;
                context.device_type = Some(device_info.device_type());
                context.device_info = Some(device_info);
                context.configured = true;
            });
            self.host.update(&[accessory]);
            return;
        }

        let kind = match SpecificDeviceType::for_device(&device_info) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(barcode = %device_info.barcode, error = %e, "Skipping unsupported device");
                return;
            }
        };
        tracing::info!(
            name = %device_info.display_name(),
            product = %device_info.product_name,
            online = ?device_info.net_status,
            "Adding new accessory"
        );

        let barcode = device_info.barcode.clone();
        let accessory = Arc::new(PlatformAccessory::new(uuid, device_info.display_name()));
        accessory.set_context(AccessoryContext::for_device(device_info.clone()));
        let adapter = Arc::new(DeviceAccessory::create(
            kind,
            self.client.clone(),
            accessory.clone(),
            device_info,
            &self.settings,
        ));
        adapter.configure_credentials(credentials);
        self.accessories.write().push(adapter.clone());

        if let Err(e) = adapter.configure().await {
            tracing::warn!(uuid = %uuid, error = %e, "Failed to configure accessory");
        }
        accessory.update_context(|context| context.configured = true);

        self.host.register(&[accessory.clone()]);
        self.host.update(&[accessory]);
        self.event_bus
            .publish(PlatformEvent::AccessoryAdded { uuid, barcode });
    }

    fn remove_unconfirmed(&self) {
        let removed: Vec<Arc<DeviceAccessory<C>>> = {
            let mut accessories = self.accessories.write();
            let (kept, removed): (Vec<_>, Vec<_>) = accessories
                .drain(..)
                .partition(|a| a.accessory().context().configured);
            *accessories = kept;
            removed
        };
        if removed.is_empty() {
            return;
        }

        let platform_accessories: Vec<Arc<PlatformAccessory>> =
            removed.iter().map(|a| a.accessory().clone()).collect();
        for accessory in &platform_accessories {
            tracing::info!(name = %accessory.display_name(), "Removing accessory");
            self.event_bus.publish(PlatformEvent::AccessoryRemoved {
                uuid: accessory.uuid(),
            });
        }
        self.host.unregister(&platform_accessories);
    }

    // =========================================================================
    // Polling
    // =========================================================================

    /// Polls every endpoint of every accessory in one concurrent batch, then
    /// reconciles each accessory with its own responses.
    ///
    /// A failed request fails only its device's cycle. Returns `false`
    /// without polling if a previous cycle is still running.
    pub async fn refresh_devices_parallel(&self) -> bool {
        if self
            .cycle_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Previous poll cycle still running, skipping");
            return false;
        }
        let _guard = CycleGuard(&self.cycle_running);

        let accessories = self.accessories();
        let requests = accessories.iter().flat_map(|accessory| {
            accessory
                .endpoints()
                .iter()
                .map(move |&endpoint| accessory.retrieve_device_state(endpoint))
        });
        let mut responses = join_all(requests).await.into_iter();

        for accessory in &accessories {
            let batch: Vec<_> = responses
                .by_ref()
                .take(accessory.endpoints().len())
                .collect();
            let uuid = accessory.accessory().uuid();

            match Self::reconcile(accessory, batch).await {
                Ok(changed) => {
                    if changed {
                        self.event_bus.publish(PlatformEvent::ConnectivityChanged {
                            uuid,
                            connected: accessory.is_connected(),
                        });
                    }
                    self.event_bus.publish(PlatformEvent::Refreshed { uuid });
                }
                Err(e) => {
                    tracing::warn!(uuid = %uuid, error = %e, "Poll cycle failed");
                    self.event_bus
                        .publish(PlatformEvent::refresh_failed(uuid, e.to_string()));
                }
            }
        }
        true
    }

    async fn reconcile(
        accessory: &DeviceAccessory<C>,
        batch: Vec<Result<Option<ApiResponse>>>,
    ) -> Result<bool> {
        let responses = batch.into_iter().collect::<Result<Vec<_>>>()?;
        let snapshot = accessory.zip_endpoint_responses(responses)?;
        accessory.refresh(&snapshot).await
    }

    /// Launches the platform and polls on the configured interval until
    /// `shutdown` resolves.
    ///
    /// Cycles never overlap: a tick that fires while a cycle is running is
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns error if [`launch`](Self::launch) fails.
    pub async fn run<S>(&self, token: AccessToken, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        self.launch(token).await?;

        let period = self.settings.poll_interval();
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Stopping device polling");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.refresh_devices_parallel().await;
                }
            }
        }
    }
}

impl<C, H> std::fmt::Debug for CowayPlatform<C, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CowayPlatform")
            .field("config", &self.config)
            .field("settings", &self.settings)
            .field("accessories", &self.accessories.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::accessory::MemoryHost;
    use crate::platform::RetryPolicy;
    use crate::protocol::scripted::ScriptedClient;
    use serde_json::json;

    type TestPlatform = CowayPlatform<ScriptedClient, MemoryHost>;

    fn device(barcode: &str, nick: &str) -> Value {
        json!({
            "barcode": barcode,
            "dvcBrandCd": "MG",
            "dvcTypeCd": "004",
            "dvcModel": "AP-1512HH",
            "prodName": "AIRMEGA",
            "dvcNick": nick
        })
    }

    fn script_device(client: &ScriptedClient, barcode: &str) {
        client.respond(
            format!("devices/{barcode}/control"),
            json!({"netStatus": true, "controlStatus": {"0001": "1", "0003": "1"}}),
        );
        client.respond(
            format!("air/devices/{barcode}/home"),
            json!({"IAQ": {"dustpm10": "8"}}),
        );
        client.respond(
            format!("air/devices/{barcode}/filter-info"),
            json!({"filterList": []}),
        );
    }

    fn account(client: &ScriptedClient, devices: Vec<Value>) {
        client.respond("com/user-devices", json!({"deviceInfos": devices}));
        client.respond(
            "com/devices-conn",
            json!([{"devId": "AP-01", "netStatus": true}, {"devId": "AP-02", "netStatus": false}]),
        );
    }

    fn settings() -> PlatformSettings {
        PlatformSettings::new().with_retry_policy(RetryPolicy::disabled())
    }

    fn platform(client: Arc<ScriptedClient>, host: Arc<MemoryHost>) -> TestPlatform {
        CowayPlatform::new(
            client,
            host,
            &json!({"platform": "CowayPlatform", "username": "u", "password": "p"}),
            settings(),
        )
    }

    fn drain(rx: &mut broadcast::Receiver<PlatformEvent>) -> Vec<PlatformEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn launch_without_config_fails() {
        let platform = CowayPlatform::new(
            Arc::new(ScriptedClient::new()),
            Arc::new(MemoryHost::new()),
            &json!({"username": "", "password": "p"}),
            settings(),
        );
        assert!(platform.config().is_none());
        assert!(matches!(
            platform.launch(AccessToken::new("t")).await,
            Err(Error::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn discovery_adds_supported_devices() {
        let client = Arc::new(ScriptedClient::new());
        account(
            &client,
            vec![
                device("AP-01", "Bedroom"),
                json!({"barcode": "WP-01", "dvcTypeCd": "001", "prodName": "CHP-264L"}),
            ],
        );
        script_device(&client, "AP-01");
        let host = Arc::new(MemoryHost::new());
        let platform = platform(client.clone(), host.clone());
        let mut rx = platform.subscribe();

        platform.launch(AccessToken::new("t")).await.unwrap();

        let accessories = platform.accessories();
        assert_eq!(accessories.len(), 1);
        let accessory = accessories[0].accessory();
        assert_eq!(accessory.display_name(), "Bedroom");
        assert!(host.is_registered(&accessory.uuid()));
        assert!(accessory.context().configured);
        assert!(accessories[0].is_connected());

        let listing = client
            .requests()
            .into_iter()
            .find(|(path, _)| path == "com/user-devices")
            .unwrap()
            .1;
        assert_eq!(listing.get("pageIndex"), Some("0"));
        assert_eq!(listing.get("pageSize"), Some("100"));
        let connections = client
            .requests()
            .into_iter()
            .find(|(path, _)| path == "com/devices-conn")
            .unwrap()
            .1;
        assert_eq!(connections.get("devIds"), Some("AP-01,WP-01"));

        let events = drain(&mut rx);
        assert!(events.contains(&PlatformEvent::AccessoryAdded {
            uuid: accessory.uuid(),
            barcode: "AP-01".to_string()
        }));
        assert!(events.contains(&PlatformEvent::Refreshed {
            uuid: accessory.uuid()
        }));
    }

    #[tokio::test]
    async fn empty_account_is_a_discovery_error() {
        let client = Arc::new(ScriptedClient::new());
        account(&client, vec![]);
        let platform = platform(client, Arc::new(MemoryHost::new()));

        assert!(matches!(
            platform.launch(AccessToken::new("t")).await,
            Err(Error::NoDevices)
        ));
    }

    #[tokio::test]
    async fn listing_without_devices_field_is_offline() {
        let client = Arc::new(ScriptedClient::new());
        client.respond("com/user-devices", json!({"message": "maintenance"}));
        let platform = platform(client, Arc::new(MemoryHost::new()));

        assert!(matches!(
            platform.launch(AccessToken::new("t")).await,
            Err(Error::Discovery(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_is_retried_with_backoff() {
        let client = Arc::new(ScriptedClient::new());
        client.fail("com/user-devices");
        let settings = PlatformSettings::new().with_retry_policy(
            RetryPolicy::new()
                .with_max_retries(2)
                .with_initial_delay(Duration::from_secs(1)),
        );
        let platform = CowayPlatform::new(
            client.clone(),
            Arc::new(MemoryHost::new()),
            &json!({"username": "u", "password": "p"}),
            settings,
        );

        let started = Instant::now();
        assert!(platform.launch(AccessToken::new("t")).await.is_err());
        assert_eq!(client.request_count("com/user-devices"), 3);
        // 1s then 2s of backoff
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn cached_accessories_are_restored_and_confirmed() {
        let client = Arc::new(ScriptedClient::new());
        account(&client, vec![device("AP-01", "Bedroom")]);
        script_device(&client, "AP-01");

        let cached = Arc::new(PlatformAccessory::for_barcode("AP-01", "Bedroom"));
        let info: DeviceInfo = serde_json::from_value(device("AP-01", "Bedroom")).unwrap();
        cached.set_context(AccessoryContext::for_device(info));
        let gone = Arc::new(PlatformAccessory::for_barcode("AP-09", "Attic"));
        let info: DeviceInfo = serde_json::from_value(device("AP-09", "Attic")).unwrap();
        gone.set_context(AccessoryContext::for_device(info));

        let seed = MemoryHost::new();
        seed.register(&[cached.clone(), gone.clone()]);
        let host = Arc::new(MemoryHost::from_json(&seed.export_json().unwrap()).unwrap());
        let platform = platform(client, host.clone());
        let mut rx = platform.subscribe();

        assert_eq!(platform.restore_cached(), 2);
        assert!(
            platform
                .accessories()
                .iter()
                .all(|a| !a.accessory().context().configured)
        );

        platform.launch(AccessToken::new("t")).await.unwrap();

        let accessories = platform.accessories();
        assert_eq!(accessories.len(), 1);
        assert_eq!(accessories[0].accessory().uuid(), cached.uuid());
        assert!(accessories[0].accessory().context().configured);
        assert!(!host.is_registered(&gone.uuid()));

        let events = drain(&mut rx);
        assert!(events.contains(&PlatformEvent::AccessoryRestored { uuid: cached.uuid() }));
        assert!(events.contains(&PlatformEvent::AccessoryRemoved { uuid: gone.uuid() }));
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, PlatformEvent::AccessoryAdded { .. }))
        );
    }

    #[test]
    fn restore_skips_unusable_context() {
        let host = Arc::new(MemoryHost::new());
        let platform = platform(Arc::new(ScriptedClient::new()), host);

        let bare = Arc::new(PlatformAccessory::for_barcode("X", "Bare"));
        assert!(!platform.configure_accessory(bare));

        let water = Arc::new(PlatformAccessory::for_barcode("WP-01", "Kitchen"));
        water.set_context(AccessoryContext::for_device(DeviceInfo {
            barcode: "WP-01".to_string(),
            type_code: "001".to_string(),
            product_name: "CHP-264L".to_string(),
            ..DeviceInfo::default()
        }));
        assert!(!platform.configure_accessory(water));
        assert!(platform.accessories().is_empty());
    }

    #[tokio::test]
    async fn one_failing_device_does_not_fail_the_others() {
        let client = Arc::new(ScriptedClient::new());
        account(
            &client,
            vec![device("AP-01", "Bedroom"), device("AP-02", "Office")],
        );
        script_device(&client, "AP-01");
        script_device(&client, "AP-02");
        let platform = platform(client.clone(), Arc::new(MemoryHost::new()));
        platform.launch(AccessToken::new("t")).await.unwrap();

        client.fail("air/devices/AP-02/home");
        let mut rx = platform.subscribe();
        assert!(platform.refresh_devices_parallel().await);

        let first = PlatformAccessory::uuid_for("AP-01");
        let second = PlatformAccessory::uuid_for("AP-02");
        let events = drain(&mut rx);
        assert!(events.contains(&PlatformEvent::Refreshed { uuid: first }));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, PlatformEvent::RefreshFailed { uuid, .. } if *uuid == second))
        );
        assert!(!events.contains(&PlatformEvent::Refreshed { uuid: second }));
    }

    #[tokio::test]
    async fn connectivity_changes_are_published() {
        let client = Arc::new(ScriptedClient::new());
        account(&client, vec![device("AP-01", "Bedroom")]);
        script_device(&client, "AP-01");
        let platform = platform(client.clone(), Arc::new(MemoryHost::new()));
        platform.launch(AccessToken::new("t")).await.unwrap();

        client.respond("devices/AP-01/control", json!({"netStatus": false}));
        let mut rx = platform.subscribe();
        platform.refresh_devices_parallel().await;

        let uuid = PlatformAccessory::uuid_for("AP-01");
        assert!(drain(&mut rx).contains(&PlatformEvent::disconnected(uuid)));
        assert!(!platform.accessory(uuid).unwrap().is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_cycles_are_skipped() {
        let client = Arc::new(ScriptedClient::new());
        account(&client, vec![device("AP-01", "Bedroom")]);
        script_device(&client, "AP-01");
        let platform = platform(client.clone(), Arc::new(MemoryHost::new()));
        platform.launch(AccessToken::new("t")).await.unwrap();

        client.set_delay(Duration::from_secs(1));
        let (first, second) = tokio::join!(
            platform.refresh_devices_parallel(),
            platform.refresh_devices_parallel()
        );
        assert!(first);
        assert!(!second);
        assert!(!platform.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn run_polls_until_shutdown() {
        let client = Arc::new(ScriptedClient::new());
        account(&client, vec![device("AP-01", "Bedroom")]);
        script_device(&client, "AP-01");
        let platform = platform(client.clone(), Arc::new(MemoryHost::new()));

        platform
            .run(
                AccessToken::new("t"),
                tokio::time::sleep(Duration::from_secs(65)),
            )
            .await
            .unwrap();

        // configure, first poll, then ticks at 30s and 60s
        assert_eq!(client.request_count("devices/AP-01/control"), 4);
    }
}
