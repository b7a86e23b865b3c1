// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persisted accessory context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::{DeviceInfo, DeviceType};
use crate::error::ParseError;
use crate::purifier::AirmegaState;

/// Current version of the persisted context layout.
pub const CONTEXT_VERSION: u32 = 1;

/// Cached state of a device family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "state", rename_all = "snake_case")]
pub enum FamilyState {
    /// Airmega purifier control, filter and air quality cache.
    AirmegaAirPurifier(AirmegaState),
}

/// Context blob the host persists for each accessory.
///
/// This is the only input needed to rebuild a family adapter after a
/// restart.
///
/// # Examples
///
/// ```
/// use coway_bridge::accessory::{AccessoryContext, CONTEXT_VERSION};
///
/// let context = AccessoryContext::from_json(r#"{"configured": true}"#).unwrap();
/// assert_eq!(context.version, CONTEXT_VERSION);
/// assert!(context.configured);
/// assert!(context.device_info.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryContext {
    /// Layout version.
    #[serde(default = "current_version")]
    pub version: u32,
    /// Cloud device type.
    #[serde(default)]
    pub device_type: Option<DeviceType>,
    /// Device identity.
    #[serde(default)]
    pub device_info: Option<DeviceInfo>,
    /// `true` until the accessory has been seen by discovery once.
    #[serde(default)]
    pub init: bool,
    /// `true` once the latest discovery confirmed the device.
    #[serde(default)]
    pub configured: bool,
    /// Cached family state.
    #[serde(default)]
    pub family_state: Option<FamilyState>,
    /// Last time the context changed.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn current_version() -> u32 {
    CONTEXT_VERSION
}

impl Default for AccessoryContext {
    fn default() -> Self {
        Self {
            version: CONTEXT_VERSION,
            device_type: None,
            device_info: None,
            init: false,
            configured: false,
            family_state: None,
            updated_at: None,
        }
    }
}

impl AccessoryContext {
    /// Creates a fresh context for a newly discovered device.
    #[must_use]
    pub fn for_device(device_info: DeviceInfo) -> Self {
        Self {
            device_type: Some(device_info.device_type()),
            device_info: Some(device_info),
            init: true,
            ..Self::default()
        }
    }

    /// Parses a persisted context.
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or was written by a newer
    /// layout version.
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        let context: Self = serde_json::from_str(json)?;
        context.check_version()?;
        Ok(context)
    }

    /// Serializes the context.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String, ParseError> {
        serde_json::to_string(self).map_err(Into::into)
    }

    pub(crate) fn check_version(&self) -> Result<(), ParseError> {
        if self.version > CONTEXT_VERSION {
            return Err(ParseError::UnexpectedFormat(format!(
                "context version {} is newer than {CONTEXT_VERSION}",
                self.version
            )));
        }
        Ok(())
    }

    /// Stamps the context as changed now.
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceInfo {
        DeviceInfo {
            barcode: "AP-01".to_string(),
            type_code: "004".to_string(),
            product_name: "AIRMEGA".to_string(),
            ..DeviceInfo::default()
        }
    }

    #[test]
    fn for_device_sets_identity() {
        let context = AccessoryContext::for_device(device());
        assert!(context.init);
        assert!(!context.configured);
        assert_eq!(context.device_type, Some(DeviceType::AirPurifier));
    }

    #[test]
    fn json_roundtrip_keeps_family_state() {
        let mut context = AccessoryContext::for_device(device());
        context.family_state = Some(FamilyState::AirmegaAirPurifier(AirmegaState::default()));
        context.touch();

        let parsed = AccessoryContext::from_json(&context.to_json().unwrap()).unwrap();
        assert_eq!(parsed, context);
    }

    #[test]
    fn newer_version_is_rejected() {
        let result = AccessoryContext::from_json(r#"{"version": 99}"#);
        assert!(matches!(result, Err(ParseError::UnexpectedFormat(_))));
    }
}
