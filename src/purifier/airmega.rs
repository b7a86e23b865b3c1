// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Airmega air purifier adapter.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

use super::{AirmegaControlInfo, AirmegaFilter, AirmegaState};
use crate::accessory::{
    Characteristic, CharacteristicValue, FamilyState, HapStatus, PlatformAccessory, ServiceKey,
    ServiceType, active, target_air_purifier_state,
};
use crate::command::{Field, PayloadCommand};
use crate::device::{Credentials, DeviceController, DeviceInfo, PayloadFactory, Snapshot};
use crate::error::Result;
use crate::platform::PlatformSettings;
use crate::protocol::{CloudClient, Endpoint, Payload};
use crate::types::{FanSpeed, Light, Mode, Power, percentage_from_step, step_from_percentage};

/// Endpoints polled for every Airmega purifier, in request order.
pub const AIRMEGA_ENDPOINTS: [Endpoint; 3] = [
    Endpoint::DevicesControl,
    Endpoint::AirDevicesHome,
    Endpoint::AirDevicesFilterInfo,
];

/// Reconciled state plus the instant of the last optimistic write.
#[derive(Debug, Default)]
struct Reconciled {
    state: AirmegaState,
    written_at: Option<Instant>,
}

/// Adapter exposing an Airmega purifier as purifier, air quality sensor,
/// light and filter maintenance services.
///
/// Reads are answered from the last fully reconciled [`AirmegaState`].
/// Writes are serialized per device and applied optimistically once the
/// cloud accepted them.
pub struct AirmegaAirPurifier<C> {
    controller: DeviceController<C>,
    inner: RwLock<Reconciled>,
    writes: tokio::sync::Mutex<()>,
    optimistic_hold: Duration,
    purifier_service: ServiceKey,
    air_quality_service: ServiceKey,
    light_service: ServiceKey,
}

impl<C: CloudClient> AirmegaAirPurifier<C> {
    /// Creates the adapter.
    ///
    /// Control state is seeded from the family state cached in the
    /// accessory context, if any.
    pub fn new(
        client: Arc<C>,
        accessory: Arc<PlatformAccessory>,
        device_info: DeviceInfo,
        settings: &PlatformSettings,
    ) -> Self {
        let state = match accessory.context().family_state {
            Some(FamilyState::AirmegaAirPurifier(state)) => state,
            None => AirmegaState::default(),
        };
        let controller = DeviceController::new(
            client,
            accessory,
            device_info,
            AIRMEGA_ENDPOINTS,
            settings.request_timeout(),
        );

        Self {
            controller,
            inner: RwLock::new(Reconciled {
                state,
                written_at: None,
            }),
            writes: tokio::sync::Mutex::new(()),
            optimistic_hold: settings.optimistic_hold(),
            purifier_service: ServiceKey::new(ServiceType::AirPurifier),
            air_quality_service: ServiceKey::new(ServiceType::AirQualitySensor),
            light_service: ServiceKey::new(ServiceType::Lightbulb),
        }
    }

    /// Returns the shared controller.
    #[must_use]
    pub fn controller(&self) -> &DeviceController<C> {
        &self.controller
    }

    /// Returns a copy of the reconciled state.
    #[must_use]
    pub fn state(&self) -> AirmegaState {
        self.inner.read().state.clone()
    }

    /// Stores the credentials used by subsequent requests.
    pub fn configure_credentials(&self, credentials: Arc<Credentials>) {
        self.controller.configure_credentials(credentials);
    }

    fn accessory(&self) -> &Arc<PlatformAccessory> {
        self.controller.accessory()
    }

    fn filter_service(filter: AirmegaFilter) -> ServiceKey {
        ServiceKey::with_subtype(ServiceType::FilterMaintenance, filter.code())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Registers the services and runs a first reconciliation.
    ///
    /// # Errors
    ///
    /// Returns error if the first poll fails. The services stay registered.
    pub async fn configure(&self) -> Result<()> {
        self.controller.configure();

        let accessory = self.accessory();
        let name = accessory.display_name().to_string();
        accessory.ensure_service(self.purifier_service.clone(), format!("{name} Purifier"));
        accessory.ensure_service(
            self.air_quality_service.clone(),
            format!("{name} Air Quality Sensor"),
        );
        accessory.ensure_service(self.light_service.clone(), format!("{name} Light"));
        for filter in AirmegaFilter::ALL {
            accessory.ensure_service(Self::filter_service(filter), filter.display_name());
        }

        let info = self.controller.device_info();
        accessory.update_context(|context| {
            context.device_type = Some(info.device_type());
            context.device_info = Some(info);
            context.init = false;
        });

        let snapshot = self.controller.refresh_device(self).await?;
        self.refresh(&snapshot).await?;
        Ok(())
    }

    /// Reconciles one poll cycle.
    ///
    /// Parsing only happens while the device is online. A write younger than
    /// the hold window keeps its control fields; air quality and filters
    /// always follow the poll. Parked commands the poll does not show yet
    /// are then resent. Returns `true` if connectivity changed.
    ///
    /// # Errors
    ///
    /// Returns error if an online device sent a malformed response. The
    /// previous state is kept in that case.
    pub async fn refresh(&self, snapshot: &Snapshot) -> Result<bool> {
        let changed = self.controller.refresh(snapshot);
        if !self.controller.is_connected() {
            tracing::debug!(
                uuid = %self.accessory().uuid(),
                "Device offline, skipping reconciliation"
            );
            return Ok(changed);
        }

        let mut polled = AirmegaState::from_snapshot(snapshot)?;
        let reported = polled.control.clone();
        let state = {
            let mut inner = self.inner.write();
            if let Some(written_at) = inner.written_at {
                if written_at.elapsed() < self.optimistic_hold {
                    tracing::debug!(
                        uuid = %self.accessory().uuid(),
                        "Keeping recently written control state"
                    );
                    polled.control = inner.state.control.clone();
                } else {
                    inner.written_at = None;
                }
            }
            inner.state = polled;
            inner.state.clone()
        };

        self.persist(&state);
        self.controller.refresh_characteristics(|| self.push_all(&state));
        self.retry_parked(&reported).await;
        Ok(changed)
    }

    /// Resends parked commands the poll does not show yet and applies the
    /// accepted ones.
    async fn retry_parked(&self, reported: &AirmegaControlInfo) {
        let _serialized = self.writes.lock().await;
        let resent = self
            .controller
            .flush_pending_commands(|command| reported.shows(command))
            .await;
        if resent.is_empty() {
            return;
        }

        let state = self.apply(true, |control| {
            for command in &resent {
                control.apply_command(command);
            }
        });
        self.controller.refresh_characteristics(|| self.push_all(&state));
    }

    fn persist(&self, state: &AirmegaState) {
        self.accessory().update_context(|context| {
            context.family_state = Some(FamilyState::AirmegaAirPurifier(state.clone()));
        });
    }

    fn push_all(&self, state: &AirmegaState) {
        let accessory = self.accessory();

        let purifier = &self.purifier_service;
        accessory.update_value(purifier, Characteristic::Active, state.active());
        accessory.update_value(
            purifier,
            Characteristic::CurrentAirPurifierState,
            state.current_air_purifier_state(),
        );
        accessory.update_value(
            purifier,
            Characteristic::TargetAirPurifierState,
            state.target_air_purifier_state(),
        );
        accessory.update_value(purifier, Characteristic::RotationSpeed, state.rotation_speed());

        accessory.update_value(&self.light_service, Characteristic::On, state.light_on());

        let sensor = &self.air_quality_service;
        accessory.update_value(sensor, Characteristic::AirQuality, state.air_quality().hap_value());
        accessory.update_value(sensor, Characteristic::Pm10Density, state.pm10_density());

        for filter in AirmegaFilter::ALL {
            let key = Self::filter_service(filter);
            accessory.update_value(
                &key,
                Characteristic::FilterChangeIndication,
                state.filter_change_indication(filter.code()).hap_value(),
            );
            accessory.update_value(
                &key,
                Characteristic::FilterLifeLevel,
                state.filter_percentage(filter.code()),
            );
        }
    }

    // =========================================================================
    // Characteristic handlers
    // =========================================================================

    /// Answers a host read.
    ///
    /// # Errors
    ///
    /// Returns [`HapStatus::ServiceCommunicationFailure`] while offline and
    /// [`HapStatus::ResourceDoesNotExist`] for characteristics this
    /// accessory does not serve.
    pub fn handle_get(
        &self,
        service: &ServiceKey,
        characteristic: Characteristic,
    ) -> std::result::Result<CharacteristicValue, HapStatus> {
        self.controller.wrap_get(|| {
            let inner = self.inner.read();
            Self::read_value(&inner.state, service, characteristic)
                .ok_or(HapStatus::ResourceDoesNotExist)
        })
    }

    fn read_value(
        state: &AirmegaState,
        service: &ServiceKey,
        characteristic: Characteristic,
    ) -> Option<CharacteristicValue> {
        let value = match (service.service_type, characteristic) {
            (ServiceType::AirPurifier, Characteristic::Active) => state.active().into(),
            (ServiceType::AirPurifier, Characteristic::CurrentAirPurifierState) => {
                state.current_air_purifier_state().into()
            }
            (ServiceType::AirPurifier, Characteristic::TargetAirPurifierState) => {
                state.target_air_purifier_state().into()
            }
            (ServiceType::AirPurifier, Characteristic::RotationSpeed) => {
                state.rotation_speed().into()
            }
            (ServiceType::Lightbulb, Characteristic::On) => state.light_on().into(),
            (ServiceType::AirQualitySensor, Characteristic::AirQuality) => {
                state.air_quality().hap_value().into()
            }
            (ServiceType::AirQualitySensor, Characteristic::Pm10Density) => {
                state.pm10_density().into()
            }
            (ServiceType::FilterMaintenance, Characteristic::FilterChangeIndication) => state
                .filter_change_indication(service.subtype.as_deref()?)
                .hap_value()
                .into(),
            (ServiceType::FilterMaintenance, Characteristic::FilterLifeLevel) => {
                state.filter_percentage(service.subtype.as_deref()?).into()
            }
            _ => return None,
        };
        Some(value)
    }

    /// Answers a host write.
    ///
    /// Writes to the same device run one at a time.
    ///
    /// # Errors
    ///
    /// Returns [`HapStatus::ServiceCommunicationFailure`] while offline or
    /// when the cloud rejects the write, [`HapStatus::InvalidValueInRequest`]
    /// for values of the wrong type or range, and
    /// [`HapStatus::ReadOnlyCharacteristic`] for read-only characteristics.
    pub async fn handle_set(
        &self,
        service: &ServiceKey,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> std::result::Result<(), HapStatus> {
        self.controller
            .wrap_set(|| self.write(service, characteristic, value))
            .await
    }

    async fn write(
        &self,
        service: &ServiceKey,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> std::result::Result<(), HapStatus> {
        let _serialized = self.writes.lock().await;
        match (service.service_type, characteristic) {
            (ServiceType::AirPurifier, Characteristic::Active) => {
                let value = value.as_u8().ok_or(HapStatus::InvalidValueInRequest)?;
                self.set_active(value != active::INACTIVE).await
            }
            (ServiceType::AirPurifier, Characteristic::TargetAirPurifierState) => {
                let value = value.as_u8().ok_or(HapStatus::InvalidValueInRequest)?;
                self.set_target_state(value == target_air_purifier_state::AUTO)
                    .await
            }
            (ServiceType::AirPurifier, Characteristic::RotationSpeed) => {
                let percentage = value
                    .as_f64()
                    .filter(|p| (0.0..=100.0).contains(p))
                    .ok_or(HapStatus::InvalidValueInRequest)?;
                self.set_rotation_speed(percentage).await
            }
            (ServiceType::Lightbulb, Characteristic::On) => {
                let on = value.as_bool().ok_or(HapStatus::InvalidValueInRequest)?;
                self.set_light(on).await
            }
            _ => {
                if Self::read_value(&self.inner.read().state, service, characteristic).is_some() {
                    Err(HapStatus::ReadOnlyCharacteristic)
                } else {
                    Err(HapStatus::ResourceDoesNotExist)
                }
            }
        }
    }

    async fn set_active(&self, on: bool) -> std::result::Result<(), HapStatus> {
        self.controller.discard_pending(Field::Power);
        if !on {
            self.controller.discard_pending(Field::Light);
        }
        if self.inner.read().state.control.on == on {
            return Ok(());
        }
        self.dispatch(&[PayloadCommand::new(Field::Power, Power::from(on).as_code())])
            .await?;

        let state = self.apply(true, |control| {
            control.on = on;
            if !on {
                control.lightbulb = false;
            }
        });
        let accessory = self.accessory();
        accessory.update_value(&self.purifier_service, Characteristic::Active, state.active());
        accessory.update_value(
            &self.purifier_service,
            Characteristic::CurrentAirPurifierState,
            state.current_air_purifier_state(),
        );
        if !on {
            accessory.update_value(&self.light_service, Characteristic::On, false);
        }
        Ok(())
    }

    async fn set_target_state(&self, auto: bool) -> std::result::Result<(), HapStatus> {
        self.controller.discard_pending(Field::Mode);
        self.controller.discard_pending(Field::FanSpeed);
        let control = self.inner.read().state.control.clone();
        if control.mode.is_auto() == auto {
            return Ok(());
        }

        let command = if auto {
            PayloadCommand::new(Field::Mode, Mode::Auto.as_code())
        } else {
            // Keep the speed the unit was running at in automatic mode
            let speed = control.fan_speed.unwrap_or(FanSpeed::Low);
            PayloadCommand::new(Field::FanSpeed, speed.as_code())
        };
        self.dispatch(&[command]).await?;

        let state = self.apply(true, |control| {
            control.mode = if auto { Mode::Auto } else { Mode::Manual };
        });
        self.accessory().update_value(
            &self.purifier_service,
            Characteristic::TargetAirPurifierState,
            state.target_air_purifier_state(),
        );
        Ok(())
    }

    async fn set_rotation_speed(&self, percentage: f64) -> std::result::Result<(), HapStatus> {
        let step = step_from_percentage(percentage);
        self.controller.discard_pending(Field::FanSpeed);
        self.controller.discard_pending(Field::Mode);
        if step > 0 {
            self.controller.discard_pending(Field::Power);
        }
        let current = self.state();
        if current.rotation_step() == step {
            return Ok(());
        }

        let was_on = current.control.on;
        if was_on && step == 0 {
            // Idle is local only, the cloud has no fan speed 0
            self.accessory().update_value(
                &self.purifier_service,
                Characteristic::RotationSpeed,
                percentage_from_step(0),
            );
            return Ok(());
        }
        let speed = FanSpeed::from_step(step).ok_or(HapStatus::InvalidValueInRequest)?;

        let mut commands = Vec::with_capacity(2);
        if !was_on {
            commands.push(PayloadCommand::new(Field::Power, Power::On.as_code()));
            self.apply(false, |control| control.on = true);
        }
        commands.push(PayloadCommand::new(Field::FanSpeed, speed.as_code()));

        if let Err(status) = self.dispatch(&commands).await {
            if !was_on {
                self.apply(false, |control| control.on = false);
            }
            return Err(status);
        }

        let state = self.apply(true, |control| {
            control.on = true;
            control.fan_speed = Some(speed);
        });
        let accessory = self.accessory();
        if !was_on {
            accessory.update_value(&self.purifier_service, Characteristic::Active, state.active());
        }
        accessory.update_value(
            &self.purifier_service,
            Characteristic::RotationSpeed,
            state.rotation_speed(),
        );
        Ok(())
    }

    async fn set_light(&self, on: bool) -> std::result::Result<(), HapStatus> {
        self.controller.discard_pending(Field::Light);
        let control = self.inner.read().state.control.clone();
        if control.lightbulb == on {
            return Ok(());
        }
        if !control.on {
            // The light cannot run while the unit is off
            self.apply(false, |control| control.lightbulb = false);
            self.accessory()
                .update_value(&self.light_service, Characteristic::On, false);
            return Ok(());
        }

        self.dispatch(&[PayloadCommand::new(Field::Light, Light::from(on).as_code())])
            .await?;
        self.apply(true, |control| control.lightbulb = on);
        self.accessory()
            .update_value(&self.light_service, Characteristic::On, on);
        Ok(())
    }

    async fn dispatch(&self, commands: &[PayloadCommand]) -> std::result::Result<(), HapStatus> {
        match self.controller.execute_set_payloads(commands).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(HapStatus::ServiceCommunicationFailure),
            Err(e) => {
                tracing::warn!(uuid = %self.accessory().uuid(), error = %e, "Write failed");
                Err(HapStatus::ServiceCommunicationFailure)
            }
        }
    }

    /// Mutates the control state, stamping it as written if `stamp` is set,
    /// and persists the result.
    fn apply<F>(&self, stamp: bool, update: F) -> AirmegaState
    where
        F: FnOnce(&mut AirmegaControlInfo),
    {
        let state = {
            let mut inner = self.inner.write();
            update(&mut inner.state.control);
            if stamp {
                inner.written_at = Some(Instant::now());
            }
            inner.state.clone()
        };
        self.persist(&state);
        state
    }
}

impl<C: CloudClient> PayloadFactory for AirmegaAirPurifier<C> {
    fn create_payload(&self, endpoint: Endpoint) -> Option<Payload> {
        let info = self.controller.device_info();
        match endpoint {
            Endpoint::AirDevicesHome => Some(
                Payload::new()
                    .with("admdongCd", info.admdong_code.as_str())
                    .with("barcode", info.barcode.as_str())
                    .with("dvcBrandCd", info.brand_code.as_str())
                    .with("prodName", info.product_name.as_str())
                    .with("stationCd", info.station_code.as_str())
                    .with("zipCode", "")
                    .with("resetDttm", info.reset_date.as_str())
                    .with("deviceType", self.controller.device_type().code())
                    .with("mqttDevice", "true")
                    .with("orderNo", info.order_no.as_str())
                    .with("membershipYn", info.membership.as_str())
                    .with("selfYn", info.self_manage.as_str()),
            ),
            Endpoint::AirDevicesFilterInfo => Some(
                Payload::new()
                    .with("devId", info.barcode.as_str())
                    .with("orderNo", info.order_no.as_str())
                    .with("sellTypeCd", info.sell_type_code.as_str())
                    .with("prodName", info.product_name.as_str())
                    .with("membershipYn", info.membership.as_str())
                    .with("mqttDevice", "true")
                    .with("selfYn", info.self_manage.as_str()),
            ),
            Endpoint::DevicesControl => self.controller.create_payload(endpoint),
        }
    }
}

impl<C> std::fmt::Debug for AirmegaAirPurifier<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirmegaAirPurifier")
            .field("controller", &self.controller)
            .field("state", &self.inner.read().state)
            .finish_non_exhaustive()
    }
}
