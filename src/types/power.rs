// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power and light switch codes.
//!
//! The cloud API encodes switches as short numeric strings rather than
//! booleans, and the power and light switches do not share an encoding.
//! Decoding is therefore an exact sentinel match: anything other than the
//! "on" sentinel is treated as off.

use std::fmt;

/// Power state of an appliance.
///
/// # Examples
///
/// ```
/// use coway_bridge::types::Power;
///
/// assert_eq!(Power::from_code("1"), Power::On);
/// assert_eq!(Power::from_code("0"), Power::Off);
/// // Only the exact sentinel means "on"
/// assert_eq!(Power::from_code("2"), Power::Off);
/// assert_eq!(Power::On.as_code(), "1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Power {
    /// Appliance is off.
    #[default]
    Off,
    /// Appliance is on.
    On,
}

impl Power {
    /// Decodes a remote power code.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        if code == "1" { Self::On } else { Self::Off }
    }

    /// Returns the remote code for this state.
    #[must_use]
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::Off => "0",
            Self::On => "1",
        }
    }

    /// Returns `true` if the appliance is on.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for Power {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// Mood light state of an appliance.
///
/// The light uses its own "on" sentinel (`"2"`), independent of [`Power`].
///
/// # Examples
///
/// ```
/// use coway_bridge::types::Light;
///
/// assert_eq!(Light::from_code("2"), Light::On);
/// assert_eq!(Light::from_code("1"), Light::Off);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Light {
    /// Light is off.
    #[default]
    Off,
    /// Light is on.
    On,
}

impl Light {
    /// Decodes a remote light code.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        if code == "2" { Self::On } else { Self::Off }
    }

    /// Returns the remote code for this state.
    #[must_use]
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::Off => "0",
            Self::On => "2",
        }
    }

    /// Returns `true` if the light is on.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for Light {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}
