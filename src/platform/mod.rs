// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Orchestration of every device of an account.
//!
//! [`CowayPlatform`] discovers the account's devices, builds one
//! [`DeviceAccessory`] per supported device, restores cached accessories
//! from their persisted context and polls all of them on a fixed interval.
//!
//! # Lifecycle
//!
//! 1. [`CowayPlatform::restore_cached`] rebuilds adapters for accessories
//!    the host persisted. They stay unconfirmed until discovery sees them.
//! 2. [`CowayPlatform::launch`] discovers devices, retrying per
//!    [`RetryPolicy`], adds new accessories, removes unconfirmed ones and
//!    runs a first poll.
//! 3. [`CowayPlatform::run`] keeps polling until shutdown.

mod config;
mod coway_platform;
mod device_accessory;

pub use config::{CowayConfig, PlatformSettings, RetryPolicy};
pub use coway_platform::CowayPlatform;
pub use device_accessory::DeviceAccessory;
