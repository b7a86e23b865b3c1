// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Air quality categories and filter indications.

/// Air quality category as exposed to the accessory host.
///
/// The numeric values match the host's `AirQuality` characteristic.
///
/// # Examples
///
/// ```
/// use coway_bridge::types::AirQuality;
///
/// assert_eq!(AirQuality::from_pm10(10.0), AirQuality::Excellent);
/// assert_eq!(AirQuality::from_pm10(45.0), AirQuality::Fair);
/// assert_eq!(AirQuality::from_pm10(-1.0), AirQuality::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AirQuality {
    /// No reading available.
    #[default]
    Unknown,
    /// PM10 at most 10.
    Excellent,
    /// PM10 at most 30.
    Good,
    /// PM10 at most 80.
    Fair,
    /// PM10 at most 150.
    Inferior,
    /// PM10 above 150.
    Poor,
}

impl AirQuality {
    /// Classifies a PM10 density reading.
    ///
    /// Negative and non-finite readings are unknown.
    #[must_use]
    pub fn from_pm10(pm10: f64) -> Self {
        if !pm10.is_finite() || pm10 < 0.0 {
            Self::Unknown
        } else if pm10 <= 10.0 {
            Self::Excellent
        } else if pm10 <= 30.0 {
            Self::Good
        } else if pm10 <= 80.0 {
            Self::Fair
        } else if pm10 <= 150.0 {
            Self::Inferior
        } else {
            Self::Poor
        }
    }

    /// Returns the host characteristic value.
    #[must_use]
    pub const fn hap_value(&self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Excellent => 1,
            Self::Good => 2,
            Self::Fair => 3,
            Self::Inferior => 4,
            Self::Poor => 5,
        }
    }
}

/// Percentage at or below which a filter must be changed.
pub const FILTER_CHANGE_THRESHOLD: u8 = 20;

/// Filter change indication as exposed to the accessory host.
///
/// # Examples
///
/// ```
/// use coway_bridge::types::FilterChangeIndication;
///
/// assert_eq!(FilterChangeIndication::from_percentage(20), FilterChangeIndication::ChangeFilter);
/// assert_eq!(FilterChangeIndication::from_percentage(21), FilterChangeIndication::FilterOk);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterChangeIndication {
    /// The filter has enough life left.
    FilterOk,
    /// The filter should be replaced.
    ChangeFilter,
}

impl FilterChangeIndication {
    /// Derives the indication from a remaining-life percentage.
    #[must_use]
    pub const fn from_percentage(percentage: u8) -> Self {
        if percentage <= FILTER_CHANGE_THRESHOLD {
            Self::ChangeFilter
        } else {
            Self::FilterOk
        }
    }

    /// Returns the host characteristic value.
    #[must_use]
    pub const fn hap_value(&self) -> u8 {
        match self {
            Self::FilterOk => 0,
            Self::ChangeFilter => 1,
        }
    }
}
