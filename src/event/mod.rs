// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for platform activity.
//!
//! The [`EventBus`] uses tokio's broadcast channel to let several
//! subscribers follow accessory lifecycle, connectivity and poll results.
//!
//! # Examples
//!
//! ```
//! use coway_bridge::event::{EventBus, PlatformEvent};
//! use uuid::Uuid;
//!
//! let bus = EventBus::new();
//!
//! // Subscribe to events
//! let mut rx = bus.subscribe();
//!
//! // Publish an event
//! bus.publish(PlatformEvent::Refreshed { uuid: Uuid::nil() });
//! ```

mod event_bus;
mod platform_event;

pub use event_bus::EventBus;
pub use platform_event::PlatformEvent;
