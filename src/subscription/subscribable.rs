// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for accessories.

use crate::accessory::{AccessoryContext, CharacteristicUpdate};
use crate::subscription::SubscriptionId;

/// Trait for types that publish accessory events.
///
/// # Examples
///
/// ```
/// use coway_bridge::accessory::PlatformAccessory;
/// use coway_bridge::subscription::Subscribable;
///
/// let accessory = PlatformAccessory::for_barcode("AP-01", "Bedroom");
/// let sub_id = accessory.on_characteristic_updated(|update| {
///     println!("{} {:?} = {:?}", update.service, update.characteristic, update.value);
/// });
/// accessory.unsubscribe(sub_id);
/// ```
pub trait Subscribable {
    /// Subscribes to characteristic value pushes.
    fn on_characteristic_updated<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CharacteristicUpdate) + Send + Sync + 'static;

    /// Subscribes to changes of the persisted context.
    fn on_context_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&AccessoryContext) + Send + Sync + 'static;

    /// Removes a subscription.
    ///
    /// Returns `true` if the subscription existed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
