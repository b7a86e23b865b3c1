// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Accessory host seam and an in-memory host.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccessoryContext, PlatformAccessory};
use crate::error::ParseError;

/// Registry of accessories owned by the home-automation host.
pub trait AccessoryHost: Send + Sync {
    /// Registers newly created accessories.
    fn register(&self, accessories: &[Arc<PlatformAccessory>]);

    /// Notifies the host that accessories changed and should be persisted.
    fn update(&self, accessories: &[Arc<PlatformAccessory>]);

    /// Removes accessories.
    fn unregister(&self, accessories: &[Arc<PlatformAccessory>]);

    /// Returns the accessories restored from persistence.
    fn cached(&self) -> Vec<Arc<PlatformAccessory>>;
}

/// Persisted form of one accessory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedAccessory {
    /// Accessory UUID.
    pub uuid: Uuid,
    /// Display name.
    pub display_name: String,
    /// Persisted context.
    pub context: AccessoryContext,
}

/// In-memory [`AccessoryHost`] that can export and import its accessories
/// as JSON.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use coway_bridge::accessory::{AccessoryHost, MemoryHost, PlatformAccessory};
///
/// let host = MemoryHost::new();
/// host.register(&[Arc::new(PlatformAccessory::for_barcode("AP-01", "Bedroom"))]);
///
/// let json = host.export_json().unwrap();
/// let restored = MemoryHost::from_json(&json).unwrap();
/// assert_eq!(restored.cached().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryHost {
    accessories: Mutex<BTreeMap<Uuid, Arc<PlatformAccessory>>>,
    cached: Mutex<Vec<Arc<PlatformAccessory>>>,
    updates: AtomicUsize,
}

impl MemoryHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a host from an export.
    ///
    /// Restored accessories are both registered and reported by
    /// [`cached`](AccessoryHost::cached).
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or a context has an
    /// unsupported version.
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        let persisted: Vec<PersistedAccessory> = serde_json::from_str(json)?;
        let host = Self::new();
        {
            let mut accessories = host.accessories.lock();
            let mut cached = host.cached.lock();
            for entry in persisted {
                entry.context.check_version()?;
                let accessory = Arc::new(PlatformAccessory::new(entry.uuid, entry.display_name));
                accessory.set_context(entry.context);
                accessories.insert(entry.uuid, accessory.clone());
                cached.push(accessory);
            }
        }
        Ok(host)
    }

    /// Exports every registered accessory.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn export_json(&self) -> Result<String, ParseError> {
        let persisted: Vec<PersistedAccessory> = self
            .accessories
            .lock()
            .values()
            .map(|a| PersistedAccessory {
                uuid: a.uuid(),
                display_name: a.display_name().to_string(),
                context: a.context(),
            })
            .collect();
        serde_json::to_string(&persisted).map_err(Into::into)
    }

    /// Returns the registered accessories.
    #[must_use]
    pub fn accessories(&self) -> Vec<Arc<PlatformAccessory>> {
        self.accessories.lock().values().cloned().collect()
    }

    /// Returns `true` if an accessory is registered.
    #[must_use]
    pub fn is_registered(&self, uuid: &Uuid) -> bool {
        self.accessories.lock().contains_key(uuid)
    }

    /// Returns how many accessory updates the host received.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::Relaxed)
    }
}

impl AccessoryHost for MemoryHost {
    fn register(&self, accessories: &[Arc<PlatformAccessory>]) {
        let mut registered = self.accessories.lock();
        for accessory in accessories {
            registered.insert(accessory.uuid(), accessory.clone());
        }
    }

    fn update(&self, accessories: &[Arc<PlatformAccessory>]) {
        self.updates.fetch_add(accessories.len(), Ordering::Relaxed);
    }

    fn unregister(&self, accessories: &[Arc<PlatformAccessory>]) {
        let mut registered = self.accessories.lock();
        for accessory in accessories {
            registered.remove(&accessory.uuid());
        }
    }

    fn cached(&self) -> Vec<Arc<PlatformAccessory>> {
        self.cached.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceInfo;

    #[test]
    fn register_and_unregister() {
        let host = MemoryHost::new();
        let accessory = Arc::new(PlatformAccessory::for_barcode("A", "Room"));
        host.register(&[accessory.clone()]);
        assert!(host.is_registered(&accessory.uuid()));

        host.unregister(&[accessory.clone()]);
        assert!(!host.is_registered(&accessory.uuid()));
    }

    #[test]
    fn export_import_keeps_context() {
        let host = MemoryHost::new();
        let accessory = Arc::new(PlatformAccessory::for_barcode("A", "Room"));
        accessory.set_context(AccessoryContext::for_device(DeviceInfo {
            barcode: "A".to_string(),
            ..DeviceInfo::default()
        }));
        host.register(&[accessory.clone()]);

        let restored = MemoryHost::from_json(&host.export_json().unwrap()).unwrap();
        let cached = restored.cached();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].uuid(), accessory.uuid());
        assert_eq!(cached[0].display_name(), "Room");
        assert_eq!(cached[0].context(), accessory.context());
    }

    #[test]
    fn update_is_counted() {
        let host = MemoryHost::new();
        let accessory = Arc::new(PlatformAccessory::for_barcode("A", "Room"));
        host.update(&[accessory]);
        assert_eq!(host.update_count(), 1);
    }

    #[test]
    fn malformed_export_is_rejected() {
        assert!(MemoryHost::from_json("{").is_err());
    }
}
