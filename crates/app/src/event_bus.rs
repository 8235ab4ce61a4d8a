//! Hands hub notifications to the dispatcher without leaving the process.

use std::future::Future;

use tokio::sync::broadcast;

use thingbridge_domain::error::BridgeError;
use thingbridge_domain::notification::StateChanged;

use crate::ports::NotificationPublisher;

/// Fan-out of [`StateChanged`] notifications from the hub to every dispatcher.
///
/// Each receiver keeps at most `capacity` pending notifications. A slow
/// receiver loses the oldest ones and sees a lag error instead. With no
/// receiver attached, notifications are discarded.
pub struct InProcessEventBus {
    sender: broadcast::Sender<StateChanged>,
}

impl InProcessEventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Attach a dispatcher. There is no replay of earlier notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChanged> {
        self.sender.subscribe()
    }
}

impl NotificationPublisher for InProcessEventBus {
    fn publish(
        &self,
        notification: StateChanged,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        // Err means no receiver
        let _ = self.sender.send(notification);
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thingbridge_domain::snapshot::StateSnapshot;

    fn notification(entity_id: &str) -> StateChanged {
        StateChanged::updated(
            entity_id,
            StateSnapshot::new("1", "2024-01-01T00:00:00Z".parse().unwrap()),
        )
    }

    #[tokio::test]
    async fn should_hand_notification_to_subscriber() {
        let bus = InProcessEventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(notification("sensor.a")).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.entity_id, "sensor.a");
    }

    #[tokio::test]
    async fn should_fan_out_to_every_subscriber() {
        let bus = InProcessEventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(notification("sensor.b")).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap().entity_id, "sensor.b");
        assert_eq!(rx2.recv().await.unwrap().entity_id, "sensor.b");
    }

    #[tokio::test]
    async fn should_discard_notification_without_subscriber() {
        let bus = InProcessEventBus::new(16);
        assert!(bus.publish(notification("sensor.c")).await.is_ok());
    }

    #[tokio::test]
    async fn should_report_lag_when_receiver_falls_behind() {
        let bus = InProcessEventBus::new(2);
        let mut rx = bus.subscribe();

        for entity_id in ["sensor.a", "sensor.b", "sensor.c"] {
            bus.publish(notification(entity_id)).await.unwrap();
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.unwrap().entity_id, "sensor.b");
    }

    #[tokio::test]
    async fn should_start_new_subscriber_at_next_notification() {
        let bus = InProcessEventBus::new(16);
        bus.publish(notification("sensor.early")).await.unwrap();

        let mut rx = bus.subscribe();
        bus.publish(notification("sensor.late")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().entity_id, "sensor.late");
    }
}
