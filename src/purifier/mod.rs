// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Airmega air purifier family.
//!
//! An Airmega purifier is polled on three endpoints: the generic control
//! status, the home snapshot carrying indoor air quality, and the filter
//! list. [`AirmegaState`] is the reconciled interpretation of those
//! responses and [`AirmegaAirPurifier`] exposes it to the accessory host.
//!
//! | Service | Characteristics |
//! |---------|-----------------|
//! | `<name> Purifier` | Active, CurrentAirPurifierState, TargetAirPurifierState, RotationSpeed |
//! | `<name> Air Quality Sensor` | AirQuality, PM10Density |
//! | `<name> Light` | On |
//! | `Pre Filter`, `Max Filter` | FilterChangeIndication, FilterLifeLevel |

mod airmega;
mod state;

pub use airmega::{AIRMEGA_ENDPOINTS, AirmegaAirPurifier};
pub use state::{
    AirmegaControlInfo, AirmegaFilter, AirmegaIndoorAirQuality, AirmegaState,
    DEFAULT_FILTER_PERCENTAGE, FilterInfo,
};
