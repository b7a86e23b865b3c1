// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `coway_bridge` library.
//!
//! This module provides the error hierarchy used across the crate: remote
//! protocol failures, JSON parsing of cloud responses, device-level problems,
//! and the local invariants of the synchronization engine.
//!
//! Characteristic handlers exposed to the accessory host do not use these
//! types. They answer with a [`HapStatus`](crate::accessory::HapStatus) so
//! that an offline device never surfaces as a failure of the host itself.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during communication with the cloud API.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a cloud response.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error occurred during device operations.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// The number of endpoint responses does not match the endpoint set.
    ///
    /// This is a local programming error, never a remote condition.
    #[error("length between responses and endpoints must be same ({responses} != {endpoints})")]
    EndpointMismatch {
        /// Number of responses received.
        responses: usize,
        /// Number of endpoints the controller polls.
        endpoints: usize,
    },

    /// A request was attempted before credentials were configured.
    #[error("credentials are not configured")]
    MissingCredentials,

    /// Device discovery failed.
    #[error("device discovery failed: {0}")]
    Discovery(String),

    /// The account has no registered devices.
    #[error("no devices registered in the account")]
    NoDevices,
}

/// Errors related to communication with the cloud API.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The cloud API answered with an unexpected status.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The access token was rejected.
    #[error("authentication failed")]
    AuthenticationFailed,
}

/// Errors related to parsing cloud responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Unexpected response format.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// Errors related to device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No adapter exists for the device type and product.
    #[error("unsupported device {device_type}+{product}")]
    Unsupported {
        /// The cloud device type code.
        device_type: String,
        /// The product name reported by the cloud.
        product: String,
    },

    /// The persisted accessory context cannot be used to restore an adapter.
    #[error("invalid accessory context: {0}")]
    InvalidContext(String),

    /// Command was rejected by the cloud API.
    #[error("command rejected: {0}")]
    CommandRejected(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_mismatch_display() {
        let err = Error::EndpointMismatch {
            responses: 2,
            endpoints: 3,
        };
        assert_eq!(
            err.to_string(),
            "length between responses and endpoints must be same (2 != 3)"
        );
    }

    #[test]
    fn error_from_protocol_error() {
        let err: Error = ProtocolError::Timeout(500).into();
        assert!(matches!(err, Error::Protocol(ProtocolError::Timeout(500))));
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::MissingField("controlStatus".to_string());
        assert_eq!(err.to_string(), "missing field in response: controlStatus");
    }

    #[test]
    fn device_error_display() {
        let err = DeviceError::Unsupported {
            device_type: "004".to_string(),
            product: "MARVEL".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported device 004+MARVEL");
    }
}
