// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-side accessory.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use uuid::Uuid;

use super::{
    AccessoryContext, Characteristic, CharacteristicUpdate, CharacteristicValue, ServiceKey,
    ServiceType,
};
use crate::subscription::{CallbackRegistry, Subscribable, SubscriptionId};

/// Namespace of accessory UUIDs derived from barcodes.
const ACCESSORY_NAMESPACE: Uuid = Uuid::from_u128(0x5c1d_27a0_8f3e_4b6a_9d2c_0e71_a4b3_c9f2);

/// One service of an accessory with its characteristic values.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    display_name: String,
    values: BTreeMap<Characteristic, CharacteristicValue>,
}

impl Service {
    /// Returns the service display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the current value of a characteristic.
    #[must_use]
    pub fn value(&self, characteristic: Characteristic) -> Option<&CharacteristicValue> {
        self.values.get(&characteristic)
    }
}

/// An accessory as registered with the host.
///
/// Holds the stable identity, the services with their last pushed values,
/// and the persisted [`AccessoryContext`]. Every push made with
/// [`update_value`](Self::update_value) is dispatched to subscribers.
pub struct PlatformAccessory {
    uuid: Uuid,
    display_name: String,
    services: Mutex<BTreeMap<ServiceKey, Service>>,
    context: Mutex<AccessoryContext>,
    callbacks: CallbackRegistry,
}

impl PlatformAccessory {
    /// Creates an accessory with an explicit UUID.
    #[must_use]
    pub fn new(uuid: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            uuid,
            display_name: display_name.into(),
            services: Mutex::new(BTreeMap::new()),
            context: Mutex::new(AccessoryContext::default()),
            callbacks: CallbackRegistry::new(),
        }
    }

    /// Creates an accessory whose UUID is derived from a device barcode.
    #[must_use]
    pub fn for_barcode(barcode: &str, display_name: impl Into<String>) -> Self {
        Self::new(Self::uuid_for(barcode), display_name)
    }

    /// Derives the stable accessory UUID of a barcode.
    ///
    /// # Examples
    ///
    /// ```
    /// use coway_bridge::accessory::PlatformAccessory;
    ///
    /// assert_eq!(
    ///     PlatformAccessory::uuid_for("AP-01"),
    ///     PlatformAccessory::uuid_for("AP-01")
    /// );
    /// assert_ne!(
    ///     PlatformAccessory::uuid_for("AP-01"),
    ///     PlatformAccessory::uuid_for("AP-02")
    /// );
    /// ```
    #[must_use]
    pub fn uuid_for(barcode: &str) -> Uuid {
        Uuid::new_v5(&ACCESSORY_NAMESPACE, barcode.as_bytes())
    }

    /// Returns the accessory UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// Returns the service key, adding the service if it does not exist.
    pub fn ensure_service(&self, key: ServiceKey, display_name: impl Into<String>) -> ServiceKey {
        let display_name = display_name.into();
        self.services
            .lock()
            .entry(key.clone())
            .or_insert_with(|| {
                tracing::debug!(uuid = %self.uuid, service = %key, "Adding service");
                let mut values = BTreeMap::new();
                values.insert(
                    Characteristic::Name,
                    CharacteristicValue::String(display_name.clone()),
                );
                Service {
                    display_name,
                    values,
                }
            });
        key
    }

    /// Returns `true` if the service exists.
    #[must_use]
    pub fn has_service(&self, key: &ServiceKey) -> bool {
        self.services.lock().contains_key(key)
    }

    /// Returns a copy of a service.
    #[must_use]
    pub fn service(&self, key: &ServiceKey) -> Option<Service> {
        self.services.lock().get(key).cloned()
    }

    /// Returns the keys of all services.
    #[must_use]
    pub fn service_keys(&self) -> Vec<ServiceKey> {
        self.services.lock().keys().cloned().collect()
    }

    /// Returns the keys of all services of a type.
    #[must_use]
    pub fn services_of_type(&self, service_type: ServiceType) -> Vec<ServiceKey> {
        self.services
            .lock()
            .keys()
            .filter(|k| k.service_type == service_type)
            .cloned()
            .collect()
    }

    /// Removes a service.
    pub fn remove_service(&self, key: &ServiceKey) -> bool {
        self.services.lock().remove(key).is_some()
    }

    /// Returns the last pushed value of a characteristic.
    #[must_use]
    pub fn value(
        &self,
        key: &ServiceKey,
        characteristic: Characteristic,
    ) -> Option<CharacteristicValue> {
        self.services
            .lock()
            .get(key)
            .and_then(|s| s.value(characteristic).cloned())
    }

    /// Stores a characteristic value and notifies subscribers.
    ///
    /// Returns `false` without notifying if the service does not exist.
    pub fn update_value(
        &self,
        key: &ServiceKey,
        characteristic: Characteristic,
        value: impl Into<CharacteristicValue>,
    ) -> bool {
        let value = value.into();
        {
            let mut services = self.services.lock();
            let Some(service) = services.get_mut(key) else {
                return false;
            };
            service.values.insert(characteristic, value.clone());
        }

        self.callbacks.dispatch(&CharacteristicUpdate {
            service: key.clone(),
            characteristic,
            value,
        });
        true
    }

    // =========================================================================
    // Context
    // =========================================================================

    /// Returns a copy of the persisted context.
    #[must_use]
    pub fn context(&self) -> AccessoryContext {
        self.context.lock().clone()
    }

    /// Replaces the persisted context.
    pub fn set_context(&self, context: AccessoryContext) {
        *self.context.lock() = context.clone();
        self.callbacks.dispatch_context(&context);
    }

    /// Mutates the persisted context in place and stamps it.
    pub fn update_context<F>(&self, update: F)
    where
        F: FnOnce(&mut AccessoryContext),
    {
        let snapshot = {
            let mut context = self.context.lock();
            update(&mut context);
            context.touch();
            context.clone()
        };
        self.callbacks.dispatch_context(&snapshot);
    }
}

impl Subscribable for PlatformAccessory {
    fn on_characteristic_updated<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CharacteristicUpdate) + Send + Sync + 'static,
    {
        self.callbacks.on_characteristic_updated(callback)
    }

    fn on_context_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&AccessoryContext) + Send + Sync + 'static,
    {
        self.callbacks.on_context_changed(callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.unsubscribe(id)
    }
}

impl std::fmt::Debug for PlatformAccessory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformAccessory")
            .field("uuid", &self.uuid)
            .field("display_name", &self.display_name)
            .field("services", &self.services.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn ensure_service_is_idempotent() {
        let accessory = PlatformAccessory::for_barcode("A", "Room");
        let key = ServiceKey::new(ServiceType::Lightbulb);
        accessory.ensure_service(key.clone(), "Room Light");
        accessory.update_value(&key, Characteristic::On, true);
        accessory.ensure_service(key.clone(), "Other");

        let service = accessory.service(&key).unwrap();
        assert_eq!(service.display_name(), "Room Light");
        assert_eq!(
            service.value(Characteristic::On),
            Some(&CharacteristicValue::Bool(true))
        );
        assert_eq!(accessory.service_keys().len(), 1);
    }

    #[test]
    fn update_value_notifies_subscribers() {
        let accessory = PlatformAccessory::for_barcode("A", "Room");
        let key = accessory.ensure_service(ServiceKey::new(ServiceType::AirPurifier), "Room");
        let pushes = Arc::new(AtomicU32::new(0));
        let pushes_clone = pushes.clone();
        accessory.on_characteristic_updated(move |_| {
            pushes_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(accessory.update_value(&key, Characteristic::Active, 1u8));
        assert_eq!(pushes.load(Ordering::SeqCst), 1);
        assert_eq!(
            accessory.value(&key, Characteristic::Active),
            Some(CharacteristicValue::UInt8(1))
        );
    }

    #[test]
    fn update_value_on_missing_service_is_ignored() {
        let accessory = PlatformAccessory::for_barcode("A", "Room");
        let pushes = Arc::new(AtomicU32::new(0));
        let pushes_clone = pushes.clone();
        accessory.on_characteristic_updated(move |_| {
            pushes_clone.fetch_add(1, Ordering::SeqCst);
        });

        let key = ServiceKey::new(ServiceType::Lightbulb);
        assert!(!accessory.update_value(&key, Characteristic::On, true));
        assert_eq!(pushes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn update_context_stamps_and_notifies() {
        let accessory = PlatformAccessory::for_barcode("A", "Room");
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = seen.clone();
        accessory.on_context_changed(move |context| {
            assert!(context.configured);
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        accessory.update_context(|context| context.configured = true);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(accessory.context().updated_at.is_some());
    }

    #[test]
    fn services_of_type_filters_by_type() {
        let accessory = PlatformAccessory::for_barcode("A", "Room");
        accessory.ensure_service(
            ServiceKey::with_subtype(ServiceType::FilterMaintenance, "1"),
            "Pre Filter",
        );
        accessory.ensure_service(
            ServiceKey::with_subtype(ServiceType::FilterMaintenance, "2"),
            "Max Filter",
        );
        accessory.ensure_service(ServiceKey::new(ServiceType::Lightbulb), "Light");

        assert_eq!(
            accessory.services_of_type(ServiceType::FilterMaintenance).len(),
            2
        );
    }
}
