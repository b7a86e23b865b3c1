// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast channel carrying [`PlatformEvent`]s.

use tokio::sync::broadcast;

use super::PlatformEvent;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Fan-out of platform events to any number of listeners.
///
/// A listener that falls more than the channel capacity behind loses the
/// oldest events and sees `RecvError::Lagged` on its next receive. Clones
/// share the same channel.
///
/// # Examples
///
/// ```
/// use coway_bridge::event::{EventBus, PlatformEvent};
/// use uuid::Uuid;
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
///
/// assert_eq!(bus.publish(PlatformEvent::AccessoryRemoved { uuid: Uuid::nil() }), 1);
/// assert!(rx.try_recv().unwrap().is_lifecycle());
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to 256 events per listener.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus buffering up to `capacity` events per listener.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Registers a listener for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of live listeners.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Sends an event to every listener and returns how many received it.
    ///
    /// Without listeners the event is dropped.
    pub fn publish(&self, event: PlatformEvent) -> usize {
        tracing::trace!(uuid = %event.uuid(), event = ?event, "Publishing platform event");
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn uuid() -> Uuid {
        Uuid::from_u128(7)
    }

    #[test]
    fn listeners_are_counted_until_dropped() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(rx1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn every_listener_receives_the_event() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.publish(PlatformEvent::connected(uuid())), 2);

        assert_eq!(rx1.recv().await.unwrap(), PlatformEvent::connected(uuid()));
        assert_eq!(rx2.recv().await.unwrap().uuid(), uuid());
    }

    #[test]
    fn publishing_without_listeners_drops_the_event() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(PlatformEvent::Refreshed { uuid: uuid() }), 0);

        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn slow_listener_lags() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();
        for _ in 0..3 {
            bus.publish(PlatformEvent::Refreshed { uuid: uuid() });
        }

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(1))
        ));
    }

    #[test]
    fn clones_share_the_channel() {
        let bus = EventBus::with_capacity(16);
        let clone = bus.clone();

        let _rx = bus.subscribe();
        assert_eq!(clone.subscriber_count(), 1);
    }
}
