// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed set of family adapters managed by the platform.

use std::sync::Arc;

use super::PlatformSettings;
use crate::accessory::{
    Characteristic, CharacteristicValue, HapStatus, PlatformAccessory, ServiceKey,
};
use crate::device::{Credentials, DeviceInfo, Snapshot, SpecificDeviceType};
use crate::error::Result;
use crate::protocol::{ApiResponse, CloudClient, Endpoint};
use crate::purifier::AirmegaAirPurifier;

/// A device adapter of any supported family.
#[derive(Debug)]
pub enum DeviceAccessory<C> {
    /// Airmega air purifier.
    AirmegaAirPurifier(AirmegaAirPurifier<C>),
}

impl<C: CloudClient> DeviceAccessory<C> {
    /// Builds the adapter of a family.
    pub fn create(
        kind: SpecificDeviceType,
        client: Arc<C>,
        accessory: Arc<PlatformAccessory>,
        device_info: DeviceInfo,
        settings: &PlatformSettings,
    ) -> Self {
        match kind {
            SpecificDeviceType::AirmegaAirPurifier => Self::AirmegaAirPurifier(
                AirmegaAirPurifier::new(client, accessory, device_info, settings),
            ),
        }
    }

    /// Returns the adapter family.
    #[must_use]
    pub fn kind(&self) -> SpecificDeviceType {
        match self {
            Self::AirmegaAirPurifier(_) => SpecificDeviceType::AirmegaAirPurifier,
        }
    }

    /// Returns the Airmega adapter, if this is one.
    #[must_use]
    pub fn as_airmega(&self) -> Option<&AirmegaAirPurifier<C>> {
        match self {
            Self::AirmegaAirPurifier(purifier) => Some(purifier),
        }
    }

    /// Returns the host accessory.
    #[must_use]
    pub fn accessory(&self) -> &Arc<PlatformAccessory> {
        match self {
            Self::AirmegaAirPurifier(purifier) => purifier.controller().accessory(),
        }
    }

    /// Returns the fixed endpoint set.
    #[must_use]
    pub fn endpoints(&self) -> &[Endpoint] {
        match self {
            Self::AirmegaAirPurifier(purifier) => purifier.controller().endpoints(),
        }
    }

    /// Returns the connectivity flag.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        match self {
            Self::AirmegaAirPurifier(purifier) => purifier.controller().is_connected(),
        }
    }

    /// Stores the credentials used by subsequent requests.
    pub fn configure_credentials(&self, credentials: Arc<Credentials>) {
        match self {
            Self::AirmegaAirPurifier(purifier) => purifier.configure_credentials(credentials),
        }
    }

    /// Replaces the device identity with a fresher discovery record.
    pub fn set_device_info(&self, device_info: DeviceInfo) {
        match self {
            Self::AirmegaAirPurifier(purifier) => purifier.controller().set_device_info(device_info),
        }
    }

    /// Fetches one endpoint with the family payload.
    ///
    /// # Errors
    ///
    /// Returns error if credentials are missing or the request fails.
    pub async fn retrieve_device_state(&self, endpoint: Endpoint) -> Result<Option<ApiResponse>> {
        match self {
            Self::AirmegaAirPurifier(purifier) => {
                purifier
                    .controller()
                    .retrieve_device_state(purifier, endpoint)
                    .await
            }
        }
    }

    /// Pairs responses with the endpoint set by position.
    ///
    /// # Errors
    ///
    /// Returns error if the lengths differ.
    pub fn zip_endpoint_responses(&self, responses: Vec<Option<ApiResponse>>) -> Result<Snapshot> {
        match self {
            Self::AirmegaAirPurifier(purifier) => {
                purifier.controller().zip_endpoint_responses(responses)
            }
        }
    }

    /// Registers services and runs a first reconciliation.
    ///
    /// # Errors
    ///
    /// Returns error if the first poll fails.
    pub async fn configure(&self) -> Result<()> {
        match self {
            Self::AirmegaAirPurifier(purifier) => purifier.configure().await,
        }
    }

    /// Reconciles one poll cycle. Returns `true` if connectivity changed.
    ///
    /// # Errors
    ///
    /// Returns error if an online device sent a malformed response.
    pub async fn refresh(&self, snapshot: &Snapshot) -> Result<bool> {
        match self {
            Self::AirmegaAirPurifier(purifier) => purifier.refresh(snapshot).await,
        }
    }

    /// Answers a host read.
    ///
    /// # Errors
    ///
    /// Returns a [`HapStatus`] if the read cannot be served.
    pub fn handle_get(
        &self,
        service: &ServiceKey,
        characteristic: Characteristic,
    ) -> std::result::Result<CharacteristicValue, HapStatus> {
        match self {
            Self::AirmegaAirPurifier(purifier) => purifier.handle_get(service, characteristic),
        }
    }

    /// Answers a host write.
    ///
    /// # Errors
    ///
    /// Returns a [`HapStatus`] if the write cannot be served.
    pub async fn handle_set(
        &self,
        service: &ServiceKey,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> std::result::Result<(), HapStatus> {
        match self {
            Self::AirmegaAirPurifier(purifier) => {
                purifier.handle_set(service, characteristic, value).await
            }
        }
    }
}
