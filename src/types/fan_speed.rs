// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fan speed steps and their rotation-speed percentages.
//!
//! Appliances expose a small number of discrete fan steps while the accessory
//! host works with a 0-100 rotation-speed percentage. One step is worth
//! [`ROTATION_SPEED_UNIT`] percent; step 0 is the local idle state and never
//! maps to a remote fan speed.

use std::fmt;

/// Percentage worth of one fan speed step.
pub const ROTATION_SPEED_UNIT: f64 = 100.0 / FanSpeed::STEPS as f64;

/// Discrete fan speed of an air purifier.
///
/// # Examples
///
/// ```
/// use coway_bridge::types::FanSpeed;
///
/// let speed = FanSpeed::from_code("2").unwrap();
/// assert_eq!(speed, FanSpeed::Medium);
/// assert_eq!(speed.step(), 2);
/// assert_eq!(speed.as_code(), "2");
///
/// // Unknown codes are rejected
/// assert!(FanSpeed::from_code("7").is_none());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum FanSpeed {
    /// Lowest speed (step 1).
    #[serde(rename = "1")]
    Low,
    /// Medium speed (step 2).
    #[serde(rename = "2")]
    Medium,
    /// Highest speed (step 3).
    #[serde(rename = "3")]
    High,
}

impl FanSpeed {
    /// Number of discrete speed steps.
    pub const STEPS: u8 = 3;

    /// Decodes a remote fan speed code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        code.trim().parse::<u8>().ok().and_then(Self::from_step)
    }

    /// Converts a step (1-3) into a fan speed.
    ///
    /// Step 0 is the idle state and has no fan speed.
    #[must_use]
    pub const fn from_step(step: u8) -> Option<Self> {
        match step {
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }

    /// Returns the step number (1-3).
    #[must_use]
    pub const fn step(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Returns the remote code for this speed.
    #[must_use]
    pub const fn as_code(&self) -> &'static str {
        match self {
            Self::Low => "1",
            Self::Medium => "2",
            Self::High => "3",
        }
    }

    /// Returns the rotation-speed percentage for this speed.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        percentage_from_step(self.step())
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.step())
    }
}

/// Converts a rotation-speed percentage into the nearest speed step (0-3).
///
/// # Examples
///
/// ```
/// use coway_bridge::types::step_from_percentage;
///
/// assert_eq!(step_from_percentage(0.0), 0);
/// assert_eq!(step_from_percentage(66.0), 2);
/// assert_eq!(step_from_percentage(100.0), 3);
/// ```
#[must_use]
pub fn step_from_percentage(percentage: f64) -> u8 {
    if !percentage.is_finite() {
        return 0;
    }
    let step = (percentage / ROTATION_SPEED_UNIT)
        .round()
        .clamp(0.0, f64::from(FanSpeed::STEPS));
    // Safe: clamped to [0, STEPS]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let step = step as u8;
    step
}

/// Converts a speed step into a rotation-speed percentage.
#[must_use]
pub fn percentage_from_step(step: u8) -> f64 {
    f64::from(step) * ROTATION_SPEED_UNIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_speed_codes() {
        assert_eq!(FanSpeed::from_code("1"), Some(FanSpeed::Low));
        assert_eq!(FanSpeed::from_code("2"), Some(FanSpeed::Medium));
        assert_eq!(FanSpeed::from_code("3"), Some(FanSpeed::High));
        assert_eq!(FanSpeed::from_code("0"), None);
        assert_eq!(FanSpeed::from_code("4"), None);
        assert_eq!(FanSpeed::from_code("fast"), None);
    }

    #[test]
    fn each_step_maps_to_its_own_speed() {
        assert_eq!(FanSpeed::from_step(1), Some(FanSpeed::Low));
        assert_eq!(FanSpeed::from_step(2), Some(FanSpeed::Medium));
        assert_eq!(FanSpeed::from_step(3), Some(FanSpeed::High));
        assert_eq!(FanSpeed::from_step(0), None);
    }

    #[test]
    fn percentage_rounds_to_nearest_step() {
        assert_eq!(step_from_percentage(0.0), 0);
        assert_eq!(step_from_percentage(16.0), 0);
        assert_eq!(step_from_percentage(17.0), 1);
        assert_eq!(step_from_percentage(33.3), 1);
        assert_eq!(step_from_percentage(50.0), 2);
        assert_eq!(step_from_percentage(66.0), 2);
        assert_eq!(step_from_percentage(84.0), 3);
        assert_eq!(step_from_percentage(100.0), 3);
    }

    #[test]
    fn percentage_out_of_range_is_clamped() {
        assert_eq!(step_from_percentage(-10.0), 0);
        assert_eq!(step_from_percentage(250.0), 3);
        assert_eq!(step_from_percentage(f64::NAN), 0);
    }

    #[test]
    fn step_percentages() {
        assert!((FanSpeed::Medium.percentage() - 66.666).abs() < 0.01);
        assert!((FanSpeed::High.percentage() - 100.0).abs() < f64::EPSILON);
        assert!(percentage_from_step(0).abs() < f64::EPSILON);
    }

    #[test]
    fn serde_uses_remote_codes() {
        let json = serde_json::to_string(&FanSpeed::High).unwrap();
        assert_eq!(json, "\"3\"");
        let speed: FanSpeed = serde_json::from_str("\"1\"").unwrap();
        assert_eq!(speed, FanSpeed::Low);
    }
}
