// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Accessory host binding.
//!
//! The home-automation host owns accessories. Each [`PlatformAccessory`]
//! exposes services made of typed characteristics, and carries an
//! [`AccessoryContext`] the host persists across restarts. The engine
//! pushes values with [`PlatformAccessory::update_value`] and answers host
//! reads and writes through characteristic handlers that fail with a
//! [`HapStatus`].
//!
//! [`AccessoryHost`] is the registry seam. [`MemoryHost`] is a complete
//! in-memory implementation with JSON export and import.

mod characteristic;
mod context;
mod host;
mod platform_accessory;

pub use characteristic::{
    Characteristic, CharacteristicUpdate, CharacteristicValue, HapStatus, ServiceKey, ServiceType,
    active, current_air_purifier_state, target_air_purifier_state,
};
pub use context::{AccessoryContext, CONTEXT_VERSION, FamilyState};
pub use host::{AccessoryHost, MemoryHost, PersistedAccessory};
pub use platform_accessory::{PlatformAccessory, Service};
