// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identity as reported by the discovery endpoint.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{DeviceType, is_truthy};

/// One device record of the account's device listing.
///
/// Field names follow the remote JSON keys. Every field except the barcode
/// defaults to an empty string when absent.
///
/// # Examples
///
/// ```
/// use coway_bridge::device::{DeviceInfo, DeviceType};
///
/// let info: DeviceInfo = serde_json::from_value(serde_json::json!({
///     "barcode": "AP-01",
///     "dvcTypeCd": "004",
///     "prodName": "AIRMEGA",
///     "dvcNick": "Bedroom"
/// })).unwrap();
///
/// assert_eq!(info.device_type(), DeviceType::AirPurifier);
/// assert_eq!(info.display_name(), "Bedroom");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Immutable serial of the unit.
    pub barcode: String,
    /// Brand code.
    #[serde(rename = "dvcBrandCd", default)]
    pub brand_code: String,
    /// Cloud device type code.
    #[serde(rename = "dvcTypeCd", default)]
    pub type_code: String,
    /// Model name.
    #[serde(rename = "dvcModel", default)]
    pub model: String,
    /// Product name.
    #[serde(rename = "prodName", default)]
    pub product_name: String,
    /// User-assigned nickname.
    #[serde(rename = "dvcNick", default)]
    pub nickname: String,
    /// Administrative district code.
    #[serde(rename = "admdongCd", default)]
    pub admdong_code: String,
    /// Air monitoring station code.
    #[serde(rename = "stationCd", default)]
    pub station_code: String,
    /// Last filter reset date.
    #[serde(rename = "resetDttm", default)]
    pub reset_date: String,
    /// Order number.
    #[serde(rename = "ordNo", default)]
    pub order_no: String,
    /// Membership flag.
    #[serde(rename = "membershipYn", default)]
    pub membership: String,
    /// Self-management flag.
    #[serde(rename = "selfManageYn", default)]
    pub self_manage: String,
    /// Sale type code.
    #[serde(rename = "sellTypeCd", default)]
    pub sell_type_code: String,
    /// Online flag merged from the connectivity check.
    #[serde(
        rename = "netStatus",
        default,
        deserialize_with = "deserialize_net_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub net_status: Option<bool>,
}

impl DeviceInfo {
    /// Returns the device type.
    #[must_use]
    pub fn device_type(&self) -> DeviceType {
        DeviceType::from_code(&self.type_code)
    }

    /// Returns the name shown to the user: the nickname, or the product
    /// name when no nickname is set.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.product_name
        } else {
            &self.nickname
        }
    }
}

fn deserialize_net_status<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|v| is_truthy(&v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialize_remote_record() {
        let info: DeviceInfo = serde_json::from_value(json!({
            "barcode": "BC",
            "dvcBrandCd": "MG",
            "dvcTypeCd": "004",
            "dvcModel": "AP-1512HH",
            "prodName": "AIRMEGA",
            "dvcNick": "Living room",
            "ordNo": "ORD1",
            "selfManageYn": "N",
            "unknownField": 42
        }))
        .unwrap();

        assert_eq!(info.brand_code, "MG");
        assert_eq!(info.model, "AP-1512HH");
        assert_eq!(info.order_no, "ORD1");
        assert_eq!(info.self_manage, "N");
        assert_eq!(info.station_code, "");
        assert_eq!(info.net_status, None);
    }

    #[test]
    fn net_status_accepts_loose_values() {
        let online: DeviceInfo =
            serde_json::from_value(json!({"barcode": "A", "netStatus": true})).unwrap();
        let offline: DeviceInfo =
            serde_json::from_value(json!({"barcode": "A", "netStatus": 0})).unwrap();
        assert_eq!(online.net_status, Some(true));
        assert_eq!(offline.net_status, Some(false));
    }

    #[test]
    fn display_name_falls_back_to_product() {
        let info = DeviceInfo {
            barcode: "A".to_string(),
            product_name: "AIRMEGA".to_string(),
            ..DeviceInfo::default()
        };
        assert_eq!(info.display_name(), "AIRMEGA");
    }

    #[test]
    fn missing_barcode_is_rejected() {
        let result = serde_json::from_value::<DeviceInfo>(json!({"prodName": "AIRMEGA"}));
        assert!(result.is_err());
    }
}
