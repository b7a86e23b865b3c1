// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for appliance control.
//!
//! This module provides type-safe representations of the coded values used
//! by the cloud API and of the categories exposed to the accessory host.
//!
//! # Types
//!
//! - [`Power`] - On/Off power switch (`"1"` sentinel)
//! - [`Light`] - On/Off mood light (`"2"` sentinel)
//! - [`Mode`] - Automatic or manual driving mode
//! - [`FanSpeed`] - Discrete fan speed steps (1-3)
//! - [`AirQuality`] - PM10-derived air quality category
//! - [`FilterChangeIndication`] - Filter replacement indication

mod air_quality;
mod fan_speed;
mod mode;
mod power;

pub use air_quality::{AirQuality, FILTER_CHANGE_THRESHOLD, FilterChangeIndication};
pub use fan_speed::{FanSpeed, ROTATION_SPEED_UNIT, percentage_from_step, step_from_percentage};
pub use mode::Mode;
pub use power::{Light, Power};
