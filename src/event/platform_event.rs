// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Platform event types.

use uuid::Uuid;

/// Events emitted by the platform.
///
/// Every event names the accessory it concerns by UUID.
///
/// # Examples
///
/// ```
/// use coway_bridge::accessory::PlatformAccessory;
/// use coway_bridge::event::PlatformEvent;
///
/// let uuid = PlatformAccessory::uuid_for("AP-01");
///
/// let added = PlatformEvent::AccessoryAdded { uuid, barcode: "AP-01".to_string() };
/// assert!(added.is_lifecycle());
///
/// let offline = PlatformEvent::disconnected(uuid);
/// assert_eq!(offline.uuid(), uuid);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// An accessory was created for a newly discovered device.
    AccessoryAdded {
        /// Accessory UUID.
        uuid: Uuid,
        /// Device barcode.
        barcode: String,
    },

    /// A cached accessory was rebuilt from its persisted context.
    AccessoryRestored {
        /// Accessory UUID.
        uuid: Uuid,
    },

    /// An accessory was removed because its device left the account.
    AccessoryRemoved {
        /// Accessory UUID.
        uuid: Uuid,
    },

    /// A device went online or offline.
    ConnectivityChanged {
        /// Accessory UUID.
        uuid: Uuid,
        /// Whether the device is now online.
        connected: bool,
    },

    /// A poll cycle was reconciled.
    Refreshed {
        /// Accessory UUID.
        uuid: Uuid,
    },

    /// A poll cycle failed for one device.
    RefreshFailed {
        /// Accessory UUID.
        uuid: Uuid,
        /// Failure description.
        error: String,
    },
}

impl PlatformEvent {
    /// Returns the accessory UUID associated with this event.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        match self {
            Self::AccessoryAdded { uuid, .. }
            | Self::AccessoryRestored { uuid }
            | Self::AccessoryRemoved { uuid }
            | Self::ConnectivityChanged { uuid, .. }
            | Self::Refreshed { uuid }
            | Self::RefreshFailed { uuid, .. } => *uuid,
        }
    }

    /// Returns `true` for accessory lifecycle events.
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::AccessoryAdded { .. }
                | Self::AccessoryRestored { .. }
                | Self::AccessoryRemoved { .. }
        )
    }

    /// Returns `true` for connectivity events.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::ConnectivityChanged { .. })
    }

    /// Creates a connectivity event for a device that came online.
    #[must_use]
    pub fn connected(uuid: Uuid) -> Self {
        Self::ConnectivityChanged {
            uuid,
            connected: true,
        }
    }

    /// Creates a connectivity event for a device that went offline.
    #[must_use]
    pub fn disconnected(uuid: Uuid) -> Self {
        Self::ConnectivityChanged {
            uuid,
            connected: false,
        }
    }

    /// Creates a refresh failure event.
    #[must_use]
    pub fn refresh_failed(uuid: Uuid, error: impl Into<String>) -> Self {
        Self::RefreshFailed {
            uuid,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_extraction() {
        let uuid = Uuid::nil();

        assert_eq!(PlatformEvent::AccessoryRestored { uuid }.uuid(), uuid);
        assert_eq!(PlatformEvent::connected(uuid).uuid(), uuid);
        assert_eq!(PlatformEvent::refresh_failed(uuid, "boom").uuid(), uuid);
    }

    #[test]
    fn event_kinds() {
        let uuid = Uuid::nil();

        assert!(PlatformEvent::AccessoryRemoved { uuid }.is_lifecycle());
        assert!(!PlatformEvent::Refreshed { uuid }.is_lifecycle());
        assert!(PlatformEvent::disconnected(uuid).is_connectivity());
        assert!(!PlatformEvent::Refreshed { uuid }.is_connectivity());
    }

    #[test]
    fn refresh_failed_keeps_message() {
        let event = PlatformEvent::refresh_failed(Uuid::nil(), "timeout");
        assert_eq!(
            event,
            PlatformEvent::RefreshFailed {
                uuid: Uuid::nil(),
                error: "timeout".to_string()
            }
        );
    }
}
