// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driving mode of an air purifier.

use std::fmt;

/// Driving mode of an air purifier.
///
/// The mode is binary: the `"1"` sentinel means automatic, every other value
/// (including `"0"` and an absent field) means manual.
///
/// # Examples
///
/// ```
/// use coway_bridge::types::Mode;
///
/// assert_eq!(Mode::from_code(Some("1")), Mode::Auto);
/// assert_eq!(Mode::from_code(Some("0")), Mode::Manual);
/// assert_eq!(Mode::from_code(None), Mode::Manual);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The appliance picks its own fan speed.
    Auto,
    /// The fan speed is set by the user.
    #[default]
    Manual,
}

impl Mode {
    /// Decodes a remote mode code.
    #[must_use]
    pub fn from_code(code: Option<&str>) -> Self {
        if code == Some("1") {
            Self::Auto
        } else {
            Self::Manual
        }
    }

    /// Returns the remote code for this mode.
    #[must_use]
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::Auto => "1",
            Self::Manual => "0",
        }
    }

    /// Returns `true` for automatic mode.
    #[must_use]
    pub const fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Manual => write!(f, "manual"),
        }
    }
}
