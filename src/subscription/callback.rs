// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Listener storage behind [`Subscribable`](super::Subscribable).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::accessory::{AccessoryContext, CharacteristicUpdate};

/// Handle returned by a subscription, used to unsubscribe.
///
/// Handles are never reused by the registry that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

#[derive(Clone)]
enum Listener {
    Characteristic(Arc<dyn Fn(&CharacteristicUpdate) + Send + Sync>),
    Context(Arc<dyn Fn(&AccessoryContext) + Send + Sync>),
}

/// Listeners of one accessory.
///
/// Listeners run synchronously on the pushing task, in no particular
/// order. The lock is released before they are called, so a listener may
/// subscribe or unsubscribe.
#[derive(Default)]
pub struct CallbackRegistry {
    next_id: AtomicU64,
    listeners: RwLock<HashMap<SubscriptionId, Listener>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().insert(id, listener);
        id
    }

    fn snapshot(&self) -> Vec<Listener> {
        self.listeners.read().values().cloned().collect()
    }

    /// Registers a listener for characteristic pushes.
    pub fn on_characteristic_updated<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CharacteristicUpdate) + Send + Sync + 'static,
    {
        self.insert(Listener::Characteristic(Arc::new(callback)))
    }

    /// Registers a listener for persisted context changes.
    pub fn on_context_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&AccessoryContext) + Send + Sync + 'static,
    {
        self.insert(Listener::Context(Arc::new(callback)))
    }

    /// Removes a listener. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.write().remove(&id).is_some()
    }

    /// Calls every characteristic listener.
    pub fn dispatch(&self, update: &CharacteristicUpdate) {
        for listener in self.snapshot() {
            if let Listener::Characteristic(callback) = listener {
                callback(update);
            }
        }
    }

    /// Calls every context listener.
    pub fn dispatch_context(&self, context: &AccessoryContext) {
        for listener in self.snapshot() {
            if let Listener::Context(callback) = listener {
                callback(context);
            }
        }
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns `true` if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callback_count", &self.callback_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::{Characteristic, ServiceKey, ServiceType};
    use std::sync::atomic::AtomicU32;

    fn update() -> CharacteristicUpdate {
        CharacteristicUpdate {
            service: ServiceKey::new(ServiceType::Lightbulb),
            characteristic: Characteristic::On,
            value: true.into(),
        }
    }

    fn counter() -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        let counter = Arc::new(AtomicU32::new(0));
        (counter.clone(), counter)
    }

    #[test]
    fn subscription_id_display() {
        assert_eq!(SubscriptionId(42).to_string(), "Sub(42)");
    }

    #[test]
    fn characteristic_listener_until_unsubscribed() {
        let registry = CallbackRegistry::new();
        let (seen, counter) = counter();

        let id = registry.on_characteristic_updated(move |update| {
            assert_eq!(update.characteristic, Characteristic::On);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(&update());
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        assert!(registry.unsubscribe(id));
        assert!(registry.is_empty());

        registry.dispatch(&update());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listeners_only_see_their_kind() {
        let registry = CallbackRegistry::new();
        let (characteristic_seen, characteristic) = counter();
        let (context_seen, context) = counter();

        registry.on_characteristic_updated(move |_| {
            characteristic.fetch_add(1, Ordering::SeqCst);
        });
        registry.on_context_changed(move |ctx| {
            assert!(ctx.configured);
            context.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch_context(&AccessoryContext {
            configured: true,
            ..AccessoryContext::default()
        });
        assert_eq!(characteristic_seen.load(Ordering::SeqCst), 0);
        assert_eq!(context_seen.load(Ordering::SeqCst), 1);

        registry.dispatch(&update());
        assert_eq!(characteristic_seen.load(Ordering::SeqCst), 1);
        assert_eq!(context_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ids_are_unique_across_kinds() {
        let registry = CallbackRegistry::new();
        let first = registry.on_characteristic_updated(|_| {});
        let second = registry.on_context_changed(|_| {});

        assert_ne!(first, second);
        assert_eq!(registry.callback_count(), 2);
        assert!(!registry.unsubscribe(SubscriptionId(999)));
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let registry = Arc::new(CallbackRegistry::new());
        let inner = registry.clone();
        let id = Arc::new(parking_lot::Mutex::new(None));
        let own_id = id.clone();

        *id.lock() = Some(registry.on_characteristic_updated(move |_| {
            if let Some(id) = own_id.lock().take() {
                inner.unsubscribe(id);
            }
        }));

        registry.dispatch(&update());
        assert!(registry.is_empty());
    }
}
