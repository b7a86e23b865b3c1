// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted in-memory cloud client for unit tests.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use crate::command::PayloadCommand;
use crate::device::DeviceInfo;
use crate::error::ProtocolError;
use crate::protocol::{AccessToken, ApiResponse, CloudClient, Payload};

#[derive(Debug, Clone)]
enum Reply {
    Data(Value),
    Fail,
}

/// Answers GET requests from a per-path script and records every call.
#[derive(Debug, Default)]
pub(crate) struct ScriptedClient {
    routes: Mutex<HashMap<String, Reply>>,
    fail_controls: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
    control_delay: Mutex<Option<Duration>>,
    requests: Mutex<Vec<(String, Payload)>>,
    controls: Mutex<Vec<(String, Vec<PayloadCommand>)>>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answers `path` with `data` as the response body.
    pub(crate) fn respond(&self, path: impl Into<String>, data: Value) {
        self.routes.lock().insert(path.into(), Reply::Data(data));
    }

    /// Makes `path` fail at the transport level.
    pub(crate) fn fail(&self, path: impl Into<String>) {
        self.routes.lock().insert(path.into(), Reply::Fail);
    }

    pub(crate) fn fail_controls(&self, fail: bool) {
        *self.fail_controls.lock() = fail;
    }

    /// Delays every GET by `delay`.
    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Delays every control request by `delay`.
    pub(crate) fn set_control_delay(&self, delay: Duration) {
        *self.control_delay.lock() = Some(delay);
    }

    pub(crate) fn requests(&self) -> Vec<(String, Payload)> {
        self.requests.lock().clone()
    }

    pub(crate) fn request_count(&self, path: &str) -> usize {
        self.requests.lock().iter().filter(|(p, _)| p == path).count()
    }

    pub(crate) fn controls(&self) -> Vec<(String, Vec<PayloadCommand>)> {
        self.controls.lock().clone()
    }

    pub(crate) fn clear_controls(&self) {
        self.controls.lock().clear();
    }
}

impl CloudClient for ScriptedClient {
    async fn get_payload(
        &self,
        path: &str,
        payload: &Payload,
        _token: &AccessToken,
    ) -> Result<ApiResponse, ProtocolError> {
        self.requests
            .lock()
            .push((path.to_string(), payload.clone()));
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.routes.lock().get(path).cloned();
        match reply {
            Some(Reply::Data(data)) => Ok(ApiResponse::with_data(data)),
            Some(Reply::Fail) => Err(ProtocolError::ConnectionFailed(format!("{path} failed"))),
            None => Err(ProtocolError::ConnectionFailed(format!("no route for {path}"))),
        }
    }

    async fn send_control(
        &self,
        device: &DeviceInfo,
        commands: &[PayloadCommand],
        _token: &AccessToken,
    ) -> Result<ApiResponse, ProtocolError> {
        self.controls
            .lock()
            .push((device.barcode.clone(), commands.to_vec()));
        let delay = *self.control_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_controls.lock() {
            return Err(ProtocolError::ConnectionFailed("control failed".to_string()));
        }
        Ok(ApiResponse::default())
    }
}
