// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Airmega control state and its derivation from polled responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::accessory::{active, current_air_purifier_state, target_air_purifier_state};
use crate::command::{Field, PayloadCommand};
use crate::device::Snapshot;
use crate::error::ParseError;
use crate::protocol::Endpoint;
use crate::types::{
    AirQuality, FanSpeed, FilterChangeIndication, Light, Mode, Power, percentage_from_step,
};

/// Remaining life reported for a filter with no record.
pub const DEFAULT_FILTER_PERCENTAGE: u8 = 100;

// ============================================================================
// Filters
// ============================================================================

/// Filters exposed as maintenance services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AirmegaFilter {
    /// Washable pre-filter.
    Pre,
    /// Combined HEPA and carbon filter.
    Max,
}

impl AirmegaFilter {
    /// Every exposed filter, in service order.
    pub const ALL: [Self; 2] = [Self::Pre, Self::Max];

    /// Returns the remote filter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Pre => "3121332",
            Self::Max => "3111735",
        }
    }

    /// Returns the service display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Pre => "Pre Filter",
            Self::Max => "Max Filter",
        }
    }
}

/// Remaining life of one filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterInfo {
    /// Localized filter name.
    pub filter_name: String,
    /// Remote filter code.
    pub filter_code: String,
    /// Remaining life in percent (0-100).
    pub filter_percentage: u8,
}

impl FilterInfo {
    /// Parses a `filterList` array.
    ///
    /// A missing list yields no filters.
    ///
    /// # Errors
    ///
    /// Returns error if the list is not an array, or a record lacks its code
    /// or carries an unreadable percentage.
    pub fn parse_list(body: &Value) -> Result<Vec<Self>, ParseError> {
        let Some(list) = body.get("filterList") else {
            return Ok(Vec::new());
        };
        let records = list
            .as_array()
            .ok_or_else(|| ParseError::UnexpectedFormat("filterList is not an array".to_string()))?;
        records.iter().map(Self::parse).collect()
    }

    fn parse(record: &Value) -> Result<Self, ParseError> {
        let filter_code = record
            .get("filterCode")
            .and_then(code_of)
            .ok_or_else(|| ParseError::MissingField("filterCode".to_string()))?;
        let filter_name = record
            .get("filterName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let percentage = record
            .get("filterPer")
            .and_then(number_of)
            .ok_or_else(|| ParseError::InvalidValue {
                field: "filterPer".to_string(),
                message: format!("unreadable percentage for filter {filter_code}"),
            })?;

        // Safe: clamped to [0, 100]
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let filter_percentage = percentage.round().clamp(0.0, 100.0) as u8;

        Ok(Self {
            filter_name,
            filter_code,
            filter_percentage,
        })
    }
}

// ============================================================================
// Control and air quality
// ============================================================================

/// Power, light, fan and mode as last reported or written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirmegaControlInfo {
    /// Main power.
    pub on: bool,
    /// Mood light.
    pub lightbulb: bool,
    /// Last known fan speed.
    pub fan_speed: Option<FanSpeed>,
    /// Driving mode.
    pub mode: Mode,
}

impl AirmegaControlInfo {
    /// Parses the `controlStatus` object of a control response.
    ///
    /// Fields are looked up by code first, then by descriptive name.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingField`] if `controlStatus` is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use coway_bridge::purifier::AirmegaControlInfo;
    /// use coway_bridge::types::{FanSpeed, Mode};
    /// use serde_json::json;
    ///
    /// let info = AirmegaControlInfo::parse(&json!({
    ///     "controlStatus": {"0001": "1", "0002": "0", "0003": "3", "0007": "2"}
    /// })).unwrap();
    /// assert!(info.on && info.lightbulb);
    /// assert_eq!(info.fan_speed, Some(FanSpeed::High));
    /// assert_eq!(info.mode, Mode::Manual);
    /// ```
    pub fn parse(control: &Value) -> Result<Self, ParseError> {
        let status = control
            .get("controlStatus")
            .filter(|s| s.is_object())
            .ok_or_else(|| ParseError::MissingField("controlStatus".to_string()))?;
        let field = |f: Field| {
            status
                .get(f.code())
                .or_else(|| status.get(f.name()))
                .and_then(code_of)
        };

        Ok(Self {
            on: field(Field::Power).is_some_and(|c| Power::from_code(&c).is_on()),
            lightbulb: field(Field::Light).is_some_and(|c| Light::from_code(&c).is_on()),
            fan_speed: field(Field::FanSpeed).and_then(|c| FanSpeed::from_code(&c)),
            mode: Mode::from_code(field(Field::Mode).as_deref()),
        })
    }

    /// Returns `true` if this state already reflects `command`.
    ///
    /// A fan speed only counts once the unit left automatic mode, since
    /// sending it is what switches to manual.
    #[must_use]
    pub fn shows(&self, command: &PayloadCommand) -> bool {
        let value = command.value();
        match command.field() {
            Some(Field::Power) => Power::from(self.on).as_code() == value,
            Some(Field::Light) => Light::from(self.lightbulb).as_code() == value,
            Some(Field::Mode) => self.mode.as_code() == value,
            Some(Field::FanSpeed) => {
                !self.mode.is_auto() && self.fan_speed.map(|s| s.as_code()) == Some(value)
            }
            None => false,
        }
    }

    /// Updates the fields `command` sets, as the unit would once it runs it.
    pub fn apply_command(&mut self, command: &PayloadCommand) {
        let value = command.value();
        match command.field() {
            Some(Field::Power) => {
                self.on = Power::from_code(value).is_on();
                if !self.on {
                    self.lightbulb = false;
                }
            }
            Some(Field::Light) => self.lightbulb = Light::from_code(value).is_on(),
            Some(Field::Mode) => self.mode = Mode::from_code(Some(value)),
            Some(Field::FanSpeed) => {
                if let Some(speed) = FanSpeed::from_code(value) {
                    self.fan_speed = Some(speed);
                    self.mode = Mode::Manual;
                }
            }
            None => {}
        }
    }
}

/// Indoor air quality readings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirmegaIndoorAirQuality {
    /// PM10 density in µg/m³, if reported.
    pub pm10_density: Option<f64>,
}

impl AirmegaIndoorAirQuality {
    /// Reads `IAQ.dustpm10` from a home response.
    ///
    /// The reading may be a number or a numeric string. Anything else is
    /// treated as not reported.
    #[must_use]
    pub fn parse(home: &Value) -> Self {
        Self {
            pm10_density: home
                .get("IAQ")
                .and_then(|iaq| iaq.get("dustpm10"))
                .and_then(number_of),
        }
    }
}

// ============================================================================
// AirmegaState
// ============================================================================

/// Reconciled state of an Airmega purifier.
///
/// Every characteristic read is answered from this value.
///
/// # Examples
///
/// ```
/// use coway_bridge::purifier::{AirmegaControlInfo, AirmegaState};
/// use coway_bridge::types::{AirQuality, FanSpeed};
///
/// let mut state = AirmegaState::default();
/// state.control.fan_speed = Some(FanSpeed::Medium);
/// state.indoor_air_quality.pm10_density = Some(5.0);
///
/// // Nothing runs while the unit is off
/// assert_eq!(state.rotation_step(), 0);
/// assert_eq!(state.air_quality(), AirQuality::Unknown);
///
/// state.control.on = true;
/// assert_eq!(state.rotation_step(), 2);
/// assert_eq!(state.air_quality(), AirQuality::Excellent);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirmegaState {
    /// Control fields.
    pub control: AirmegaControlInfo,
    /// Air quality readings.
    pub indoor_air_quality: AirmegaIndoorAirQuality,
    /// Filter records.
    pub filter_infos: Vec<FilterInfo>,
}

impl AirmegaState {
    /// Derives the state from one poll cycle.
    ///
    /// Filters come from the filter endpoint, or from the home response when
    /// the filter endpoint carries no list.
    ///
    /// # Errors
    ///
    /// Returns error if the control response is absent or malformed, or a
    /// filter record is unreadable.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self, ParseError> {
        let control = snapshot
            .get(Endpoint::DevicesControl)
            .ok_or_else(|| ParseError::MissingField("controlStatus".to_string()))?;
        let home = snapshot.get(Endpoint::AirDevicesHome);

        let filter_source = snapshot
            .get(Endpoint::AirDevicesFilterInfo)
            .filter(|body| body.get("filterList").is_some())
            .or(home);
        let filter_infos = match filter_source {
            Some(body) => FilterInfo::parse_list(body)?,
            None => Vec::new(),
        };

        Ok(Self {
            control: AirmegaControlInfo::parse(control)?,
            indoor_air_quality: home.map(AirmegaIndoorAirQuality::parse).unwrap_or_default(),
            filter_infos,
        })
    }

    /// Returns the Active characteristic value.
    #[must_use]
    pub fn active(&self) -> u8 {
        if self.control.on {
            active::ACTIVE
        } else {
            active::INACTIVE
        }
    }

    /// Returns the CurrentAirPurifierState characteristic value.
    #[must_use]
    pub fn current_air_purifier_state(&self) -> u8 {
        if self.control.on {
            current_air_purifier_state::PURIFYING_AIR
        } else {
            current_air_purifier_state::INACTIVE
        }
    }

    /// Returns the TargetAirPurifierState characteristic value.
    #[must_use]
    pub fn target_air_purifier_state(&self) -> u8 {
        if self.control.mode.is_auto() {
            target_air_purifier_state::AUTO
        } else {
            target_air_purifier_state::MANUAL
        }
    }

    /// Returns the running fan step, 0 while off.
    #[must_use]
    pub fn rotation_step(&self) -> u8 {
        if !self.control.on {
            return 0;
        }
        self.control.fan_speed.map_or(0, |s| s.step())
    }

    /// Returns the RotationSpeed characteristic value.
    #[must_use]
    pub fn rotation_speed(&self) -> f64 {
        percentage_from_step(self.rotation_step())
    }

    /// Returns the light state shown to the host.
    #[must_use]
    pub fn light_on(&self) -> bool {
        self.control.on && self.control.lightbulb
    }

    /// Returns the air quality category, unknown while off.
    #[must_use]
    pub fn air_quality(&self) -> AirQuality {
        if !self.control.on {
            return AirQuality::Unknown;
        }
        self.indoor_air_quality
            .pm10_density
            .map_or(AirQuality::Unknown, AirQuality::from_pm10)
    }

    /// Returns the PM10 density, 0 when not reported.
    #[must_use]
    pub fn pm10_density(&self) -> f64 {
        self.indoor_air_quality.pm10_density.unwrap_or(0.0)
    }

    /// Returns the remaining life of a filter.
    #[must_use]
    pub fn filter_percentage(&self, filter_code: &str) -> u8 {
        self.filter_infos
            .iter()
            .find(|f| f.filter_code == filter_code)
            .map_or(DEFAULT_FILTER_PERCENTAGE, |f| f.filter_percentage)
    }

    /// Returns the change indication of a filter.
    #[must_use]
    pub fn filter_change_indication(&self, filter_code: &str) -> FilterChangeIndication {
        FilterChangeIndication::from_percentage(self.filter_percentage(filter_code))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn code_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiResponse;
    use serde_json::json;

    fn snapshot(control: Value, home: Value, filters: Value) -> Snapshot {
        Snapshot::zip(
            &[
                Endpoint::DevicesControl,
                Endpoint::AirDevicesHome,
                Endpoint::AirDevicesFilterInfo,
            ],
            vec![
                Some(ApiResponse::with_data(control)),
                Some(ApiResponse::with_data(home)),
                Some(ApiResponse::with_data(filters)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn control_shows_matching_commands() {
        let control = AirmegaControlInfo {
            on: true,
            lightbulb: false,
            fan_speed: Some(FanSpeed::Medium),
            mode: Mode::Manual,
        };

        assert!(control.shows(&PayloadCommand::new(Field::Power, "1")));
        assert!(!control.shows(&PayloadCommand::new(Field::Power, "0")));
        assert!(control.shows(&PayloadCommand::new(Field::Light, "0")));
        assert!(!control.shows(&PayloadCommand::new(Field::Light, "2")));
        assert!(control.shows(&PayloadCommand::new(Field::FanSpeed, "2")));
        assert!(!control.shows(&PayloadCommand::new(Field::Mode, "1")));
        assert!(!control.shows(&PayloadCommand::raw("9999", "1")));

        let auto = AirmegaControlInfo {
            mode: Mode::Auto,
            ..control
        };
        assert!(!auto.shows(&PayloadCommand::new(Field::FanSpeed, "2")));
    }

    #[test]
    fn applied_commands_update_control() {
        let mut control = AirmegaControlInfo {
            on: true,
            lightbulb: true,
            fan_speed: None,
            mode: Mode::Auto,
        };

        control.apply_command(&PayloadCommand::new(Field::FanSpeed, "3"));
        assert_eq!(control.fan_speed, Some(FanSpeed::High));
        assert_eq!(control.mode, Mode::Manual);

        control.apply_command(&PayloadCommand::new(Field::Mode, "1"));
        assert!(control.mode.is_auto());

        control.apply_command(&PayloadCommand::new(Field::Power, "0"));
        assert!(!control.on);
        assert!(!control.lightbulb);
    }

    #[test]
    fn reconciles_named_control_fields() {
        let state = AirmegaState::from_snapshot(&snapshot(
            json!({
                "netStatus": true,
                "controlStatus": {"power": "1", "light": "0", "fanSpeed": "2", "mode": "0"}
            }),
            json!({"IAQ": {"dustpm10": "45"}}),
            json!({"filterList": [{"filterCode": "00", "filterPer": 15}]}),
        ))
        .unwrap();

        assert!(state.control.on);
        assert!(!state.control.lightbulb);
        assert_eq!(state.control.fan_speed, Some(FanSpeed::Medium));
        assert_eq!(state.control.mode, Mode::Manual);
        assert_eq!(state.air_quality(), AirQuality::Fair);
        assert_eq!(
            state.filter_change_indication("00"),
            FilterChangeIndication::ChangeFilter
        );
    }

    #[test]
    fn code_keys_win_over_names() {
        let info = AirmegaControlInfo::parse(&json!({
            "controlStatus": {"0001": "0", "power": "1"}
        }))
        .unwrap();
        assert!(!info.on);
    }

    #[test]
    fn numeric_codes_are_accepted() {
        let info = AirmegaControlInfo::parse(&json!({
            "controlStatus": {"0001": 1, "0002": 1, "0003": 3, "0007": 2}
        }))
        .unwrap();
        assert!(info.on);
        assert!(info.lightbulb);
        assert_eq!(info.mode, Mode::Auto);
        assert_eq!(info.fan_speed, Some(FanSpeed::High));
    }

    #[test]
    fn sentinels_are_exact() {
        // "2" turns the light on but not the power
        let info = AirmegaControlInfo::parse(&json!({
            "controlStatus": {"0001": "2", "0007": "1"}
        }))
        .unwrap();
        assert!(!info.on);
        assert!(!info.lightbulb);
        assert_eq!(info.mode, Mode::Manual);
        assert_eq!(info.fan_speed, None);
    }

    #[test]
    fn missing_control_status_is_an_error() {
        assert!(matches!(
            AirmegaControlInfo::parse(&json!({"netStatus": true})),
            Err(ParseError::MissingField(_))
        ));
    }

    #[test]
    fn pm10_reading_forms() {
        let parse = |home: Value| AirmegaIndoorAirQuality::parse(&home).pm10_density;
        assert_eq!(parse(json!({"IAQ": {"dustpm10": "12"}})), Some(12.0));
        assert_eq!(parse(json!({"IAQ": {"dustpm10": 7}})), Some(7.0));
        assert_eq!(parse(json!({"IAQ": {"dustpm10": "n/a"}})), None);
        assert_eq!(parse(json!({})), None);
    }

    #[test]
    fn filter_list_parsing() {
        let filters = FilterInfo::parse_list(&json!({
            "filterList": [
                {"filterName": "Pre", "filterCode": "3121332", "filterPer": "40"},
                {"filterCode": "3111735", "filterPer": 140}
            ]
        }))
        .unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].filter_name, "Pre");
        assert_eq!(filters[0].filter_percentage, 40);
        assert_eq!(filters[1].filter_name, "");
        assert_eq!(filters[1].filter_percentage, 100);

        assert!(FilterInfo::parse_list(&json!({})).unwrap().is_empty());
        assert!(FilterInfo::parse_list(&json!({"filterList": {}})).is_err());
        assert!(FilterInfo::parse_list(&json!({"filterList": [{"filterPer": 3}]})).is_err());
        assert!(
            FilterInfo::parse_list(&json!({"filterList": [{"filterCode": "x"}]})).is_err()
        );
    }

    #[test]
    fn filters_fall_back_to_home_response() {
        let state = AirmegaState::from_snapshot(&snapshot(
            json!({"controlStatus": {}}),
            json!({"filterList": [{"filterCode": "3121332", "filterPer": 60}]}),
            json!({}),
        ))
        .unwrap();
        assert_eq!(state.filter_percentage(AirmegaFilter::Pre.code()), 60);
    }

    #[test]
    fn filter_defaults_and_boundaries() {
        let mut state = AirmegaState::default();
        assert_eq!(state.filter_percentage("missing"), 100);
        assert_eq!(
            state.filter_change_indication("missing"),
            FilterChangeIndication::FilterOk
        );

        state.filter_infos.push(FilterInfo {
            filter_name: String::new(),
            filter_code: "a".to_string(),
            filter_percentage: 20,
        });
        state.filter_infos.push(FilterInfo {
            filter_name: String::new(),
            filter_code: "b".to_string(),
            filter_percentage: 21,
        });
        assert_eq!(
            state.filter_change_indication("a"),
            FilterChangeIndication::ChangeFilter
        );
        assert_eq!(
            state.filter_change_indication("b"),
            FilterChangeIndication::FilterOk
        );
    }

    #[test]
    fn characteristic_values_follow_control() {
        let mut state = AirmegaState::default();
        state.control.lightbulb = true;
        state.control.mode = Mode::Auto;
        assert_eq!(state.active(), active::INACTIVE);
        assert_eq!(
            state.current_air_purifier_state(),
            current_air_purifier_state::INACTIVE
        );
        assert!(!state.light_on());

        state.control.on = true;
        state.control.fan_speed = Some(FanSpeed::High);
        assert_eq!(state.active(), active::ACTIVE);
        assert_eq!(
            state.current_air_purifier_state(),
            current_air_purifier_state::PURIFYING_AIR
        );
        assert_eq!(
            state.target_air_purifier_state(),
            target_air_purifier_state::AUTO
        );
        assert!(state.light_on());
        assert!((state.rotation_speed() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn serde_layout_is_stable() {
        let mut state = AirmegaState::default();
        state.control.fan_speed = Some(FanSpeed::Low);
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["control"]["fan_speed"], json!("1"));
        assert_eq!(value["control"]["mode"], json!("manual"));

        let back: AirmegaState = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }
}
