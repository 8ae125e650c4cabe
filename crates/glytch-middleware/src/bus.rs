//! Topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels so every subscriber sees every
//! message and a slow dashboard never blocks the ingestion pipeline.
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Telemetry`] | classified gestures and emotion samples |
//! | [`Topic::Intents`] | resolved, non-empty intent results |
//! | [`Topic::SystemAlerts`] | emergencies and device connection changes |

use glytch_types::{Event, GlytchError};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (events buffered before slow subscribers lag).
const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Telemetry,
    Intents,
    SystemAlerts,
}

/// Shared event bus.  Clones share the same channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    telemetry: broadcast::Sender<Event>,
    intents: broadcast::Sender<Event>,
    system_alerts: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus whose topic channels each hold `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (telemetry, _) = broadcast::channel(capacity);
        let (intents, _) = broadcast::channel(capacity);
        let (system_alerts, _) = broadcast::channel(capacity);
        Self {
            telemetry,
            intents,
            system_alerts,
        }
    }

    /// Publish `event` on `topic`.
    ///
    /// Returns the number of subscribers handed the event; `Ok(0)` when
    /// nobody is listening.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, GlytchError> {
        let sender = self.topic_sender(topic);
        if sender.receiver_count() == 0 {
            return Ok(0);
        }
        sender
            .send(event)
            .map_err(|e| GlytchError::Channel(format!("send on {topic:?} failed: {e}")))
    }

    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Telemetry => &self.telemetry,
            Topic::Intents => &self.intents,
            Topic::SystemAlerts => &self.system_alerts,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to one [`Topic`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event, skipping over any lag.
    ///
    /// Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "bus subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive; `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "bus subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glytch_types::{ConnectionState, EventPayload, GestureEvent, GestureType};
    use std::time::Duration;

    fn gesture_event() -> Event {
        Event::new(
            "glytch-middleware::test",
            EventPayload::Gesture(GestureEvent::new(GestureType::Yes, "GESTURE:YES")),
        )
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::default();
        assert_eq!(bus.publish_to(Topic::Telemetry, gesture_event()).unwrap(), 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_event() {
        let bus = EventBus::default();
        let mut first = bus.subscribe_to(Topic::Telemetry);
        let mut second = bus.subscribe_to(Topic::Telemetry);

        let event = gesture_event();
        assert_eq!(bus.publish_to(Topic::Telemetry, event.clone()).unwrap(), 2);

        assert_eq!(first.recv().await.unwrap().id, event.id);
        assert_eq!(second.recv().await.unwrap().id, event.id);
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = EventBus::default();
        let mut alerts = bus.subscribe_to(Topic::SystemAlerts);
        let _telemetry = bus.subscribe_to(Topic::Telemetry);

        bus.publish_to(Topic::Telemetry, gesture_event()).unwrap();

        let result = tokio::time::timeout(Duration::from_millis(50), alerts.recv()).await;
        assert!(result.is_err(), "SystemAlerts must not see Telemetry traffic");
        assert_eq!(alerts.topic(), Topic::SystemAlerts);
    }

    #[test]
    fn try_recv_skips_lag_and_drains() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe_to(Topic::SystemAlerts);
        for _ in 0..5 {
            bus.publish_to(
                Topic::SystemAlerts,
                Event::new("test", EventPayload::Connection(ConnectionState::Connected)),
            )
            .unwrap();
        }
        assert!(rx.try_recv().is_some());
        assert!(rx.try_recv().is_some());
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn recv_returns_none_when_bus_dropped() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Intents);
        drop(bus);
        assert!(rx.recv().await.is_none());
    }
}
