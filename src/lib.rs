// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coway Bridge - expose Coway `IoCare` appliances as home-automation
//! accessories.
//!
//! This library polls the Coway cloud for the state of every appliance of
//! an account and mirrors it into accessories a home-automation host can
//! persist and present. Writes from the host are translated back into
//! cloud control commands.
//!
//! # Supported Devices
//!
//! - **Airmega air purifiers**: power, auto/manual mode, three fan speeds,
//!   indicator light, PM10 air quality and filter life
//!
//! # Architecture
//!
//! - [`protocol`]: the [`CloudClient`](protocol::CloudClient) seam and its
//!   HTTP implementation
//! - [`device`]: device identity, poll snapshots and the shared
//!   [`DeviceController`](device::DeviceController)
//! - [`purifier`]: the Airmega adapter and its reconciled state
//! - [`accessory`]: accessories, services and characteristics as seen by
//!   the host
//! - [`platform`]: discovery, restore and the polling loop
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use coway_bridge::accessory::MemoryHost;
//! use coway_bridge::platform::{CowayPlatform, PlatformSettings};
//! use coway_bridge::protocol::{AccessToken, HttpClient};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> coway_bridge::Result<()> {
//!     let host = Arc::new(MemoryHost::new());
//!     let platform = CowayPlatform::new(
//!         Arc::new(HttpClient::new()?),
//!         host.clone(),
//!         &json!({"platform": "CowayPlatform", "username": "user", "password": "secret"}),
//!         PlatformSettings::new().with_poll_interval(Duration::from_secs(60)),
//!     );
//!
//!     platform.restore_cached();
//!     platform.launch(AccessToken::new("token")).await?;
//!
//!     for accessory in platform.accessories() {
//!         println!("{}", accessory.accessory().display_name());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Host Callbacks
//!
//! Accessories notify subscribers whenever a characteristic is pushed:
//!
//! ```
//! use coway_bridge::accessory::PlatformAccessory;
//! use coway_bridge::subscription::Subscribable;
//!
//! let accessory = PlatformAccessory::for_barcode("AP-01", "Bedroom");
//! let _subscription = accessory.on_characteristic_updated(|update| {
//!     println!("{:?} = {:?}", update.characteristic, update.value);
//! });
//! ```

pub mod accessory;
pub mod command;
pub mod device;
pub mod error;
pub mod event;
pub mod platform;
pub mod protocol;
pub mod purifier;
pub mod subscription;
pub mod types;

pub use error::{DeviceError, Error, ParseError, ProtocolError, Result};
pub use event::{EventBus, PlatformEvent};
pub use platform::{CowayPlatform, PlatformSettings};
