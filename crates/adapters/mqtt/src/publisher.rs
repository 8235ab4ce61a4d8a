//! Gateway publisher backed by a rumqttc event loop.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;

use thingbridge_app::ports::{GatewayPublisher, QoS};
use thingbridge_domain::error::BridgeError;
use thingbridge_domain::payload::Topic;

use crate::acks::AckTracker;
use crate::config::MqttConfig;
use crate::error::MqttError;

/// How long [`MqttPublisher::disconnect`] lets the event loop flush.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Publishes gateway payloads over a single MQTT session.
///
/// The session is driven by a background task that reconnects with
/// exponential backoff. Publishes issued while disconnected are queued by
/// the client and sent once the session is back.
pub struct MqttPublisher {
    client: AsyncClient,
    acks: Arc<AckTracker>,
    /// Keeps "record in tracker" and "hand to client" atomic across callers.
    order: AsyncMutex<()>,
    ack_timeout: Duration,
    connected: watch::Receiver<bool>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl MqttPublisher {
    /// Create the client and spawn the event-loop driver.
    ///
    /// Returns immediately; the connection is established in the background.
    #[must_use]
    pub fn connect(config: &MqttConfig) -> Self {
        let (client, eventloop) = AsyncClient::new(config.mqtt_options(), config.request_capacity);
        let acks = Arc::new(AckTracker::default());
        let (connected_tx, connected) = watch::channel(false);
        let backoff = Backoff::new(
            Duration::from_secs(config.reconnect_min_delay_secs),
            Duration::from_secs(config.reconnect_max_delay_secs),
        );

        tracing::info!(
            host = %config.host,
            port = config.port,
            tls = config.tls,
            client_id = %config.client_id,
            "connecting to MQTT broker"
        );
        let driver = tokio::spawn(drive(eventloop, Arc::clone(&acks), connected_tx, backoff));

        Self {
            client,
            acks,
            order: AsyncMutex::new(()),
            ack_timeout: config.ack_timeout(),
            connected,
            driver: Mutex::new(Some(driver)),
        }
    }

    /// Whether the broker accepted the current session.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Wait until the session is up, at most `timeout`.
    pub async fn wait_connected(&self, timeout: Duration) -> bool {
        let mut connected = self.connected.clone();
        tokio::time::timeout(timeout, connected.wait_for(|up| *up))
            .await
            .is_ok_and(|res| res.is_ok())
    }

    /// Publishes handed to the client and not yet acknowledged.
    #[must_use]
    pub fn pending_acks(&self) -> usize {
        self.acks.pending()
    }

    /// Publish `payload` on `topic`.
    ///
    /// # Errors
    ///
    /// [`MqttError::Client`] when the request cannot be queued,
    /// [`MqttError::AckTimeout`] / [`MqttError::NotConnected`] when a
    /// blocking publish is not acknowledged.
    pub async fn publish_message(
        &self,
        topic: Topic,
        payload: Vec<u8>,
        qos: QoS,
        wait_for_ack: bool,
    ) -> Result<(), MqttError> {
        let qos = match qos {
            QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
            QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        };

        let ack = {
            let _order = self.order.lock().await;
            let ack = self.acks.enqueue(qos, wait_for_ack);
            let queued = self
                .client
                .publish(topic.as_str(), qos, false, payload)
                .await;
            if let Err(err) = queued {
                self.acks.cancel_last();
                return Err(MqttError::Client(err));
            }
            ack
        };

        let Some(ack) = ack else {
            return Ok(());
        };
        match tokio::time::timeout(self.ack_timeout, ack).await {
            Ok(Ok(())) => {
                tracing::trace!(%topic, "publish acknowledged");
                Ok(())
            }
            Ok(Err(_)) => Err(MqttError::NotConnected),
            Err(_) => Err(MqttError::AckTimeout(self.ack_timeout)),
        }
    }

    /// Close the session gracefully.
    ///
    /// Sends DISCONNECT and gives the event loop a short grace period to
    /// flush in-flight publishes before stopping it.
    pub async fn disconnect(&self) {
        if let Err(err) = self.client.disconnect().await {
            tracing::debug!(error = %err, "MQTT disconnect request not queued");
        }
        let driver = self
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut driver) = driver {
            let flushed = tokio::time::timeout(DISCONNECT_GRACE, &mut driver).await;
            if flushed.is_err() {
                driver.abort();
                tracing::debug!("MQTT event loop aborted");
            }
        }
        tracing::info!(
            unacknowledged = self.acks.pending(),
            "MQTT publisher stopped"
        );
    }
}

impl GatewayPublisher for MqttPublisher {
    async fn publish(
        &self,
        topic: Topic,
        payload: Vec<u8>,
        qos: QoS,
        wait_for_ack: bool,
    ) -> Result<(), BridgeError> {
        self.publish_message(topic, payload, qos, wait_for_ack)
            .await
            .map_err(MqttError::into_domain)
    }
}

async fn drive(
    mut eventloop: EventLoop,
    acks: Arc<AckTracker>,
    connected: watch::Sender<bool>,
    mut backoff: Backoff,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                backoff.reset();
                connected.send_replace(true);
                tracing::info!(
                    session_present = ack.session_present,
                    "connected to MQTT broker"
                );
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => acks.on_puback(ack.pkid),
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => acks.on_outgoing_publish(pkid),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                connected.send_replace(false);
                tracing::debug!("MQTT disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(err) => {
                let was_connected = connected.send_replace(false);
                let delay = backoff.next_delay();
                if was_connected {
                    tracing::warn!(error = %err, retry_in = ?delay, "MQTT connection lost");
                } else {
                    tracing::warn!(error = %err, retry_in = ?delay, "MQTT connection failed");
                }
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Exponential reconnect backoff.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub(crate) fn new(min: Duration, max: Duration) -> Self {
        let min = min.max(Duration::from_millis(100));
        let max = max.max(min);
        Self {
            min,
            max,
            current: min,
        }
    }

    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.current = self.min;
    }
}
