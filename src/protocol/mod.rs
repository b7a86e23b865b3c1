// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cloud API protocol for communicating with the Coway `IoCare` service.
//!
//! The synchronization engine never talks HTTP directly. It goes through
//! the [`CloudClient`] trait, which offers exactly two operations: a
//! payload-carrying GET against a path, and a control write for one device.
//!
//! # Clients
//!
//! - [`HttpClient`]: the `reqwest` based client for the real cloud API
//!   (requires the `http` feature)
//!
//! # Endpoints
//!
//! Per-device state is read from the [`Endpoint`] set, while account level
//! requests (discovery and connectivity) use an [`AccountEndpoint`].

#[cfg(feature = "http")]
mod http;
#[cfg(test)]
pub(crate) mod scripted;

#[cfg(feature = "http")]
pub use http::{HttpClient, HttpConfig};

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::PayloadCommand;
use crate::device::DeviceInfo;
use crate::error::ProtocolError;

// ============================================================================
// AccessToken
// ============================================================================

/// Bearer token used to authenticate every cloud request.
///
/// The token is acquired by the host before the platform launches. Its
/// `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Creates a token from its raw value.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

// ============================================================================
// Payload
// ============================================================================

/// Query parameters attached to a cloud GET request.
///
/// Keys are kept sorted so that requests are deterministic.
///
/// # Examples
///
/// ```
/// use coway_bridge::protocol::Payload;
///
/// let payload = Payload::new().with("pageIndex", "0").with("pageSize", "100");
/// assert_eq!(payload.get("pageSize"), Some("100"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, String>);

impl Payload {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any previous value for the key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns the value of a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the payload carries no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ============================================================================
// ApiResponse
// ============================================================================

/// Envelope returned by every cloud API call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Response header as sent by the cloud.
    #[serde(default)]
    pub header: Option<Value>,
    /// Response body.
    #[serde(default)]
    pub data: Option<Value>,
}

impl ApiResponse {
    /// Creates a response carrying only a data body.
    #[must_use]
    pub fn with_data(data: Value) -> Self {
        Self {
            header: None,
            data: Some(data),
        }
    }

    /// Returns the data body, if any.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Consumes the response and returns its data body.
    #[must_use]
    pub fn into_data(self) -> Option<Value> {
        self.data
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// Per-device state endpoint.
///
/// Each path template contains a `{deviceId}` placeholder that is replaced
/// with the URL-encoded device barcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Endpoint {
    /// Connectivity and control status.
    DevicesControl,
    /// Home view with indoor air quality.
    AirDevicesHome,
    /// Filter life information.
    AirDevicesFilterInfo,
}

impl Endpoint {
    /// Placeholder substituted with the device id.
    pub const DEVICE_ID_PLACEHOLDER: &'static str = "{deviceId}";

    /// Returns the path template of this endpoint.
    #[must_use]
    pub const fn template(self) -> &'static str {
        match self {
            Self::DevicesControl => "devices/{deviceId}/control",
            Self::AirDevicesHome => "air/devices/{deviceId}/home",
            Self::AirDevicesFilterInfo => "air/devices/{deviceId}/filter-info",
        }
    }

    /// Returns the request path for a device.
    ///
    /// # Examples
    ///
    /// ```
    /// use coway_bridge::protocol::Endpoint;
    ///
    /// assert_eq!(
    ///     Endpoint::AirDevicesHome.path("12345"),
    ///     "air/devices/12345/home"
    /// );
    /// ```
    #[must_use]
    pub fn path(self, device_id: &str) -> String {
        self.template()
            .replace(Self::DEVICE_ID_PLACEHOLDER, &urlencoding::encode(device_id))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template())
    }
}

/// Account-level endpoint, not bound to a single device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountEndpoint {
    /// Lists the devices registered to the account.
    UserDevices,
    /// Reports connectivity of a set of devices.
    DeviceConnections,
}

impl AccountEndpoint {
    /// Returns the request path.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::UserDevices => "com/user-devices",
            Self::DeviceConnections => "com/devices-conn",
        }
    }
}

// ============================================================================
// CloudClient
// ============================================================================

/// Transport used by the engine to reach the cloud API.
///
/// Implementations only move bytes. Timeouts are enforced by the caller,
/// and connectivity is derived from response contents, not from transport
/// success.
pub trait CloudClient: Send + Sync {
    /// Performs an authenticated GET against `path` with `payload` as query
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the request fails or the response cannot
    /// be decoded.
    fn get_payload(
        &self,
        path: &str,
        payload: &Payload,
        token: &AccessToken,
    ) -> impl Future<Output = Result<ApiResponse, ProtocolError>> + Send;

    /// Sends a batch of control commands to one device.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the request fails or is rejected.
    fn send_control(
        &self,
        device: &DeviceInfo,
        commands: &[PayloadCommand],
        token: &AccessToken,
    ) -> impl Future<Output = Result<ApiResponse, ProtocolError>> + Send;
}
