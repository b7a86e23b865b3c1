// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration types for the platform.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::device::is_truthy;

// ============================================================================
// CowayConfig
// ============================================================================

/// Account configuration supplied by the host's platform block.
///
/// # Examples
///
/// ```
/// use coway_bridge::platform::CowayConfig;
/// use serde_json::json;
///
/// let config = CowayConfig::parse(&json!({
///     "platform": "CowayPlatform",
///     "username": "user@example.com",
///     "password": "secret"
/// })).unwrap();
/// assert_eq!(config.username, "user@example.com");
///
/// // Any empty value means the platform is not configured yet
/// assert!(CowayConfig::parse(&json!({"username": "", "password": "x"})).is_none());
/// ```
#[derive(Clone, Deserialize)]
pub struct CowayConfig {
    /// Account user name.
    pub username: String,
    /// Account password.
    pub password: String,
    /// Any other key of the platform block.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CowayConfig {
    /// Parses the platform block.
    ///
    /// Returns `None` if the block is not an object, if any of its values is
    /// empty, `false`, zero or null, or if the account fields are missing.
    #[must_use]
    pub fn parse(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        if let Some((key, _)) = object.iter().find(|(_, v)| !is_truthy(v)) {
            tracing::debug!(key = %key, "Platform configuration value is empty");
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

impl fmt::Debug for CowayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CowayConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("extra", &self.extra)
            .finish()
    }
}

// ============================================================================
// RetryPolicy
// ============================================================================

/// Retry policy for device discovery.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use coway_bridge::platform::RetryPolicy;
///
/// let policy = RetryPolicy::new()
///     .with_max_retries(5)
///     .with_initial_delay(Duration::from_millis(500))
///     .with_max_delay(Duration::from_secs(30));
///
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
/// assert!(!policy.should_retry(5));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Whether failed discovery is retried at all.
    pub enabled: bool,
    /// Maximum number of retries before giving up (None = infinite).
    pub max_retries: Option<u32>,
    /// Initial delay between retry attempts.
    pub initial_delay: Duration,
    /// Maximum delay between retry attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f32,
}

impl RetryPolicy {
    /// Creates a new retry policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy that never retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets infinite retries.
    #[must_use]
    pub fn with_infinite_retries(mut self) -> Self {
        self.max_retries = None;
        self
    }

    /// Sets the initial delay between retry attempts.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay between retry attempts.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculates the delay before a given retry attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        let multiplier = self
            .backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));

        // Safe: initial_delay is seconds or minutes, far from f32 limits
        #[allow(clippy::cast_precision_loss)]
        let delay_ms = self.initial_delay.as_millis() as f32 * multiplier;

        // Safe: delay_ms is positive and clamped by max_delay below
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_delay)
    }

    /// Returns true if another attempt should be made after `attempt`
    /// failures.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enabled && self.max_retries.is_none_or(|max| attempt < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: Some(10),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

// ============================================================================
// PlatformSettings
// ============================================================================

/// Tuning of the polling engine.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use coway_bridge::platform::PlatformSettings;
///
/// let settings = PlatformSettings::new().with_poll_interval(Duration::from_secs(60));
///
/// // The optimistic hold window follows the poll interval unless set
/// assert_eq!(settings.optimistic_hold(), Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct PlatformSettings {
    poll_interval: Duration,
    request_timeout: Duration,
    page_size: u32,
    optimistic_hold: Option<Duration>,
    retry: RetryPolicy,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformSettings {
    /// Default interval between poll cycles.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
    /// Default per-request timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default discovery page size.
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    /// Creates settings with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            page_size: Self::DEFAULT_PAGE_SIZE,
            optimistic_hold: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the discovery page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets how long an optimistic write wins over polled state.
    #[must_use]
    pub fn with_optimistic_hold(mut self, hold: Duration) -> Self {
        self.optimistic_hold = Some(hold);
        self
    }

    /// Sets the discovery retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the discovery page size.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Returns the optimistic hold window.
    #[must_use]
    pub fn optimistic_hold(&self) -> Duration {
        self.optimistic_hold.unwrap_or(self.poll_interval)
    }

    /// Returns the discovery retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_parse_keeps_extra_keys() {
        let config = CowayConfig::parse(&json!({
            "platform": "CowayPlatform",
            "username": "u",
            "password": "p"
        }))
        .unwrap();
        assert_eq!(config.extra.get("platform"), Some(&json!("CowayPlatform")));
    }

    #[test]
    fn config_parse_rejects_falsy_values() {
        assert!(CowayConfig::parse(&json!({"username": "u", "password": "p", "x": false})).is_none());
        assert!(CowayConfig::parse(&json!({"username": "u", "password": null})).is_none());
        assert!(CowayConfig::parse(&json!({"username": "u"})).is_none());
        assert!(CowayConfig::parse(&json!("u")).is_none());
    }

    #[test]
    fn config_debug_redacts_password() {
        let config = CowayConfig::parse(&json!({"username": "u", "password": "hunter2"})).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn retry_policy_default() {
        let policy = RetryPolicy::default();

        assert!(policy.enabled);
        assert_eq!(policy.max_retries, Some(10));
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
    }

    #[test]
    fn retry_policy_disabled() {
        assert!(!RetryPolicy::disabled().should_retry(0));
    }

    #[test]
    fn retry_delay_calculation() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_secs(1))
            .with_backoff_multiplier(2.0)
            .with_max_delay(Duration::from_secs(10));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(10));
    }

    #[test]
    fn retry_policy_infinite() {
        let policy = RetryPolicy::new().with_infinite_retries();
        assert!(policy.should_retry(10_000));
    }

    #[test]
    fn settings_defaults() {
        let settings = PlatformSettings::default();
        assert_eq!(settings.poll_interval(), Duration::from_secs(30));
        assert_eq!(settings.request_timeout(), Duration::from_secs(10));
        assert_eq!(settings.page_size(), 100);
        assert_eq!(settings.optimistic_hold(), Duration::from_secs(30));
    }

    #[test]
    fn settings_explicit_hold() {
        let settings = PlatformSettings::new().with_optimistic_hold(Duration::from_secs(5));
        assert_eq!(settings.optimistic_hold(), Duration::from_secs(5));
    }
}
