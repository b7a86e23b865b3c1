// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Services, characteristics and their values.

use std::fmt;

use thiserror::Error;

/// Kind of a host-side service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceType {
    /// Manufacturer, model and serial number.
    AccessoryInformation,
    /// Air purifier controls.
    AirPurifier,
    /// Air quality sensor.
    AirQualitySensor,
    /// Mood light.
    Lightbulb,
    /// Filter maintenance, one per filter.
    FilterMaintenance,
}

/// Identifies one service of an accessory.
///
/// The subtype tells apart several services of the same type, such as one
/// filter maintenance service per filter code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceKey {
    /// Service type.
    pub service_type: ServiceType,
    /// Optional subtype.
    pub subtype: Option<String>,
}

impl ServiceKey {
    /// Creates a key without subtype.
    #[must_use]
    pub const fn new(service_type: ServiceType) -> Self {
        Self {
            service_type,
            subtype: None,
        }
    }

    /// Creates a key with a subtype.
    #[must_use]
    pub fn with_subtype(service_type: ServiceType, subtype: impl Into<String>) -> Self {
        Self {
            service_type,
            subtype: Some(subtype.into()),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subtype {
            Some(subtype) => write!(f, "{:?}({subtype})", self.service_type),
            None => write!(f, "{:?}", self.service_type),
        }
    }
}

/// A typed host-exposed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Characteristic {
    /// Display name of a service.
    Name,
    /// Manufacturer.
    Manufacturer,
    /// Model.
    Model,
    /// Serial number.
    SerialNumber,
    /// Active state, see [`active`].
    Active,
    /// Current purifier state, see [`current_air_purifier_state`].
    CurrentAirPurifierState,
    /// Target purifier state, see [`target_air_purifier_state`].
    TargetAirPurifierState,
    /// Fan speed in percent.
    RotationSpeed,
    /// Light switch.
    On,
    /// Air quality category (0-5).
    AirQuality,
    /// PM10 density in µg/m³.
    Pm10Density,
    /// Filter change indication (0 ok, 1 change).
    FilterChangeIndication,
    /// Remaining filter life in percent.
    FilterLifeLevel,
}

/// Values of [`Characteristic::Active`].
pub mod active {
    /// Inactive.
    pub const INACTIVE: u8 = 0;
    /// Active.
    pub const ACTIVE: u8 = 1;
}

/// Values of [`Characteristic::CurrentAirPurifierState`].
pub mod current_air_purifier_state {
    /// Inactive.
    pub const INACTIVE: u8 = 0;
    /// Idle.
    pub const IDLE: u8 = 1;
    /// Purifying air.
    pub const PURIFYING_AIR: u8 = 2;
}

/// Values of [`Characteristic::TargetAirPurifierState`].
pub mod target_air_purifier_state {
    /// Manual.
    pub const MANUAL: u8 = 0;
    /// Automatic.
    pub const AUTO: u8 = 1;
}

/// A characteristic value.
#[derive(Debug, Clone, PartialEq)]
pub enum CharacteristicValue {
    /// Boolean value.
    Bool(bool),
    /// Small unsigned integer, used for enumerated characteristics.
    UInt8(u8),
    /// Floating point value.
    Float(f64),
    /// Text value.
    String(String),
}

impl CharacteristicValue {
    /// Interprets the value as a boolean.
    ///
    /// Numbers are `true` when non-zero. Text never converts.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::UInt8(n) => Some(*n != 0),
            Self::Float(f) => Some(*f != 0.0),
            Self::String(_) => None,
        }
    }

    /// Interprets the value as a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::UInt8(n) => Some(f64::from(*n)),
            Self::Float(f) if f.is_finite() => Some(*f),
            Self::Float(_) | Self::String(_) => None,
        }
    }

    /// Interprets the value as a small unsigned integer.
    #[must_use]
    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Self::Bool(b) => Some(u8::from(*b)),
            Self::UInt8(n) => Some(*n),
            Self::Float(f) if f.is_finite() && *f >= 0.0 && *f <= f64::from(u8::MAX) => {
                // Safe: range checked above
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let n = f.round() as u8;
                Some(n)
            }
            Self::Float(_) | Self::String(_) => None,
        }
    }

    /// Returns the text, if this is a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for CharacteristicValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u8> for CharacteristicValue {
    fn from(value: u8) -> Self {
        Self::UInt8(value)
    }
}

impl From<f64> for CharacteristicValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for CharacteristicValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for CharacteristicValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Status answered by characteristic handlers when a request cannot be
/// served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum HapStatus {
    /// The device cannot be reached, or the cloud rejected the write.
    #[error("service communication failure")]
    ServiceCommunicationFailure,
    /// The resource is busy.
    #[error("resource busy")]
    ResourceBusy,
    /// The characteristic cannot be written.
    #[error("read-only characteristic")]
    ReadOnlyCharacteristic,
    /// The characteristic is not served by this accessory.
    #[error("resource does not exist")]
    ResourceDoesNotExist,
    /// The written value is not acceptable.
    #[error("invalid value in request")]
    InvalidValueInRequest,
}

impl HapStatus {
    /// Returns the numeric status code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ServiceCommunicationFailure => -70402,
            Self::ResourceBusy => -70403,
            Self::ReadOnlyCharacteristic => -70404,
            Self::ResourceDoesNotExist => -70409,
            Self::InvalidValueInRequest => -70410,
        }
    }
}

/// A value pushed to the host for one characteristic.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicUpdate {
    /// Service holding the characteristic.
    pub service: ServiceKey,
    /// Updated characteristic.
    pub characteristic: Characteristic,
    /// New value.
    pub value: CharacteristicValue,
}
