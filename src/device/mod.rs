// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identity and the shared device controller.
//!
//! Every appliance is described by a [`DeviceInfo`] record returned by the
//! discovery endpoint. Its cloud type code and product name resolve to a
//! [`SpecificDeviceType`], which selects the family adapter built on top of
//! the generic [`DeviceController`].
//!
//! The controller owns what every family shares:
//!
//! - the fixed, ordered endpoint set polled each cycle
//! - the connectivity flag derived from the control endpoint
//! - command dispatch with the offline gate
//! - the get/set wrappers that answer `ServiceCommunicationFailure` while
//!   the device is offline

mod controller;
mod info;
mod snapshot;

pub use controller::{Credentials, DeviceController, PayloadFactory};
pub use info::DeviceInfo;
pub use snapshot::Snapshot;
pub(crate) use snapshot::is_truthy;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// Cloud device category.
///
/// Serialized as the remote type code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    /// Water purifiers (`001`).
    WaterPurifier,
    /// Air purifiers (`004`).
    AirPurifier,
    /// Any other type code.
    Other(String),
}

impl DeviceType {
    /// Decodes a remote type code.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "001" => Self::WaterPurifier,
            "004" => Self::AirPurifier,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the remote type code.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::WaterPurifier => "001",
            Self::AirPurifier => "004",
            Self::Other(code) => code,
        }
    }
}

impl From<String> for DeviceType {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl From<DeviceType> for String {
    fn from(device_type: DeviceType) -> Self {
        device_type.code().to_string()
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Device family with a dedicated adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecificDeviceType {
    /// Airmega air purifiers.
    AirmegaAirPurifier,
}

impl SpecificDeviceType {
    /// Product name reported for Airmega purifiers.
    pub const AIRMEGA_PRODUCT: &'static str = "AIRMEGA";

    /// Resolves the adapter family for a device type and product name.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Unsupported`] for combinations without an
    /// adapter.
    ///
    /// # Examples
    ///
    /// ```
    /// use coway_bridge::device::{DeviceType, SpecificDeviceType};
    ///
    /// let kind = SpecificDeviceType::resolve(&DeviceType::AirPurifier, "AIRMEGA").unwrap();
    /// assert_eq!(kind, SpecificDeviceType::AirmegaAirPurifier);
    ///
    /// assert!(SpecificDeviceType::resolve(&DeviceType::WaterPurifier, "AIRMEGA").is_err());
    /// ```
    pub fn resolve(device_type: &DeviceType, product_name: &str) -> Result<Self, DeviceError> {
        match (device_type, product_name) {
            (DeviceType::AirPurifier, Self::AIRMEGA_PRODUCT) => Ok(Self::AirmegaAirPurifier),
            _ => Err(DeviceError::Unsupported {
                device_type: device_type.code().to_string(),
                product: product_name.to_string(),
            }),
        }
    }

    /// Resolves the adapter family of a discovered device.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Unsupported`] for devices without an adapter.
    pub fn for_device(info: &DeviceInfo) -> Result<Self, DeviceError> {
        Self::resolve(&info.device_type(), &info.product_name)
    }
}
