// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Control commands sent to the cloud API.
//!
//! A control write is a list of `(field, value)` pairs. Fields are
//! identified by short numeric codes, and the same codes key the
//! `controlStatus` object returned when polling a device.
//!
//! | Field | Code | Values |
//! |-------|------|--------|
//! | [`Field::Power`] | `0001` | `"0"` off, `"1"` on |
//! | [`Field::Mode`] | `0002` | `"0"` manual, `"1"` auto |
//! | [`Field::FanSpeed`] | `0003` | `"1"` to `"3"` |
//! | [`Field::Light`] | `0007` | `"0"` off, `"2"` on |
//!
//! # Examples
//!
//! ```
//! use coway_bridge::command::{Field, PayloadCommand};
//! use coway_bridge::types::Power;
//!
//! let cmd = PayloadCommand::new(Field::Power, Power::On.as_code());
//! assert_eq!(cmd.key(), "0001");
//! assert_eq!(cmd.value(), "1");
//! ```

mod queue;

pub use queue::{COMMAND_MAXIMUM_SKIPS, CommandQueue, PendingCommand};

use std::fmt;

use serde::Serialize;

use crate::device::DeviceInfo;

/// A remotely controllable field of an appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Main power switch.
    Power,
    /// Automatic or manual driving mode.
    Mode,
    /// Fan speed step.
    FanSpeed,
    /// Mood light.
    Light,
}

impl Field {
    /// Every controllable field.
    pub const ALL: [Self; 4] = [Self::Power, Self::Mode, Self::FanSpeed, Self::Light];

    /// Decodes a remote field code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.code() == code)
    }

    /// Returns the remote field code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Power => "0001",
            Self::Mode => "0002",
            Self::FanSpeed => "0003",
            Self::Light => "0007",
        }
    }

    /// Returns the descriptive key some firmwares use in `controlStatus`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Mode => "mode",
            Self::FanSpeed => "fanSpeed",
            Self::Light => "light",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single field write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PayloadCommand {
    key: String,
    value: String,
}

impl PayloadCommand {
    /// Creates a command writing `value` to `field`.
    #[must_use]
    pub fn new(field: Field, value: impl Into<String>) -> Self {
        Self {
            key: field.code().to_string(),
            value: value.into(),
        }
    }

    /// Creates a command for a raw field code.
    #[must_use]
    pub fn raw(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns the field code.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the field written, if the code is a known one.
    #[must_use]
    pub fn field(&self) -> Option<Field> {
        Field::from_code(&self.key)
    }

    /// Returns the value written.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for PayloadCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

// ============================================================================
// Wire body
// ============================================================================

/// Body of a control request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRequest {
    dev_id: String,
    dvc_brand_cd: String,
    dvc_type_cd: String,
    prod_name: String,
    mqtt_device: String,
    is_multi_control: bool,
    func_list: Vec<ControlFunction>,
}

/// One entry of a control request's function list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlFunction {
    func_id: String,
    comd_val: String,
}

impl ControlRequest {
    /// Builds the control body for a device.
    #[must_use]
    pub fn new(device: &DeviceInfo, commands: &[PayloadCommand]) -> Self {
        Self {
            dev_id: device.barcode.clone(),
            dvc_brand_cd: device.brand_code.clone(),
            dvc_type_cd: device.type_code.clone(),
            prod_name: device.product_name.clone(),
            mqtt_device: "true".to_string(),
            is_multi_control: commands.len() > 1,
            func_list: commands
                .iter()
                .map(|c| ControlFunction {
                    func_id: c.key.clone(),
                    comd_val: c.value.clone(),
                })
                .collect(),
        }
    }
}
