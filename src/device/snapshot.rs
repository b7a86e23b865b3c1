// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-cycle endpoint snapshot.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::{ApiResponse, Endpoint};

/// Responses of one poll cycle, keyed by endpoint.
///
/// An endpoint maps to `None` when its request was skipped or its response
/// carried no data body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: HashMap<Endpoint, Option<Value>>,
}

impl Snapshot {
    /// Pairs responses with endpoints by position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndpointMismatch`] if the lengths differ. No partial
    /// snapshot is produced in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use coway_bridge::device::Snapshot;
    /// use coway_bridge::protocol::{ApiResponse, Endpoint};
    /// use serde_json::json;
    ///
    /// let snapshot = Snapshot::zip(
    ///     &[Endpoint::DevicesControl],
    ///     vec![Some(ApiResponse::with_data(json!({"netStatus": true})))],
    /// ).unwrap();
    /// assert_eq!(snapshot.get(Endpoint::DevicesControl), Some(&json!({"netStatus": true})));
    ///
    /// assert!(Snapshot::zip(&[Endpoint::DevicesControl], vec![]).is_err());
    /// ```
    pub fn zip(endpoints: &[Endpoint], responses: Vec<Option<ApiResponse>>) -> Result<Self> {
        if endpoints.len() != responses.len() {
            return Err(Error::EndpointMismatch {
                responses: responses.len(),
                endpoints: endpoints.len(),
            });
        }

        let entries = endpoints
            .iter()
            .copied()
            .zip(responses)
            .map(|(endpoint, response)| (endpoint, response.and_then(ApiResponse::into_data)))
            .collect();
        Ok(Self { entries })
    }

    /// Returns `true` if the endpoint was part of this cycle.
    #[must_use]
    pub fn contains(&self, endpoint: Endpoint) -> bool {
        self.entries.contains_key(&endpoint)
    }

    /// Returns the data body of an endpoint's response.
    #[must_use]
    pub fn get(&self, endpoint: Endpoint) -> Option<&Value> {
        self.entries.get(&endpoint).and_then(Option::as_ref)
    }

    /// Returns the number of endpoints in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Loose truthiness of a remote JSON flag.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
