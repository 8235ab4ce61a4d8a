//! Event dispatcher: turns hub notifications into gateway publishes.
//!
//! Every logical device is either *unregistered* or *registered*. The first
//! relevant notification for an unregistered device runs the full sequence:
//!
//! 1. connect (QoS 1, blocks until the broker acknowledged it),
//! 2. attributes (QoS 1),
//! 3. mark the device registered.
//!
//! Telemetry (QoS 1) follows for every notification carrying a measurement.
//! The platform rejects writes for a device key it has not seen a connect
//! for, hence the acknowledged connect. A removal notification evicts the
//! device so it is announced again if it reappears.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use thingbridge_domain::device_class::DeviceClass;
use thingbridge_domain::error::BridgeError;
use thingbridge_domain::filter::RelevanceFilter;
use thingbridge_domain::identity::{DeviceIdentity, DeviceKey};
use thingbridge_domain::notification::{Change, StateChanged};
use thingbridge_domain::payload::{GatewayMessage, build_attributes, build_connect, build_telemetry};
use thingbridge_domain::snapshot::StateSnapshot;

use crate::identity_resolver::IdentityResolver;
use crate::ports::{DeviceRegistry, GatewayPublisher, QoS};
use crate::registration_cache::RegistrationCache;

/// Static settings read at dispatcher construction.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Which entities are forwarded.
    pub filter: RelevanceFilter,
    /// Base URL of the thing-model repository.
    pub thing_model_url: String,
}

/// What handling a notification did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No entity reference or no state at all.
    Ignored,
    /// The entity is on no allow-list.
    Filtered,
    /// The entity was removed from the hub and its registration forgotten.
    Evicted,
    /// The notification was forwarded.
    Forwarded {
        /// Connect and attributes were published for this notification.
        announced: bool,
        /// A telemetry reading was published.
        telemetry: bool,
    },
}

/// Drives identity resolution, registration and publishing.
pub struct EventDispatcher<P, R> {
    publisher: P,
    resolver: IdentityResolver<R>,
    cache: RegistrationCache,
    config: DispatcherConfig,
}

impl<P, R> EventDispatcher<P, R>
where
    P: GatewayPublisher,
    R: DeviceRegistry,
{
    pub fn new(
        publisher: P,
        registry: R,
        cache: RegistrationCache,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            publisher,
            resolver: IdentityResolver::new(registry),
            cache,
            config,
        }
    }

    /// The session's registration cache.
    pub fn cache(&self) -> &RegistrationCache {
        &self.cache
    }

    /// Handle a single notification.
    ///
    /// # Errors
    ///
    /// Propagates publish failures. A failed connect or attributes publish
    /// leaves the device unregistered so the next notification retries the
    /// whole sequence.
    pub async fn handle(
        &self,
        notification: &StateChanged,
    ) -> Result<DispatchOutcome, BridgeError> {
        let entity_id = notification.entity_id.as_str();
        let snapshot = match notification.change() {
            Change::Updated(snapshot) => snapshot,
            Change::Removed => {
                let key = DeviceKey::for_entity(entity_id)?;
                self.cache.evict(&key).await;
                tracing::debug!(%entity_id, device = %key, "entity removed, registration evicted");
                return Ok(DispatchOutcome::Evicted);
            }
            Change::Ignored => return Ok(DispatchOutcome::Ignored),
        };

        if !self.config.filter.is_relevant(entity_id, snapshot) {
            return Ok(DispatchOutcome::Filtered);
        }

        let identity = self.resolver.resolve(entity_id).await?;
        let class = snapshot.device_class();

        let announced = self
            .ensure_registered(entity_id, &identity, snapshot, &class)
            .await?;

        let telemetry = match build_telemetry(&identity.key, snapshot, &class) {
            Some(message) => {
                self.send(&message, false).await?;
                true
            }
            None => {
                tracing::trace!(
                    %entity_id,
                    state = %snapshot.state,
                    "no measurement, telemetry skipped"
                );
                false
            }
        };

        Ok(DispatchOutcome::Forwarded {
            announced,
            telemetry,
        })
    }

    async fn ensure_registered(
        &self,
        entity_id: &str,
        identity: &DeviceIdentity,
        snapshot: &StateSnapshot,
        class: &DeviceClass,
    ) -> Result<bool, BridgeError> {
        if self.cache.has(&identity.key) {
            return Ok(false);
        }

        let _guard = self.cache.registration_lock(&identity.key).await;
        if self.cache.has(&identity.key) {
            return Ok(false);
        }

        self.send(&build_connect(&identity.key, class), true).await?;
        let attributes = build_attributes(identity, snapshot, class, &self.config.thing_model_url);
        self.send(&attributes, false).await?;
        self.cache.mark_registered(identity.key.clone());

        tracing::info!(
            %entity_id,
            device = %identity.key,
            device_class = %class,
            parent = ?identity.parent_uuid(),
            "device announced"
        );
        Ok(true)
    }

    async fn send(&self, message: &GatewayMessage, wait_for_ack: bool) -> Result<(), BridgeError> {
        let payload = message.to_bytes()?;
        tracing::trace!(topic = %message.topic, bytes = payload.len(), wait_for_ack, "publishing");
        self.publisher
            .publish(message.topic, payload, QoS::AtLeastOnce, wait_for_ack)
            .await
    }

    /// Consume notifications until the channel closes.
    ///
    /// A failing notification is logged and does not stop the loop.
    pub async fn run(&self, receiver: broadcast::Receiver<StateChanged>) {
        let mut stream = BroadcastStream::new(receiver);
        while let Some(item) = stream.next().await {
            match item {
                Ok(notification) => self.process(&notification).await,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "dispatcher lagged, notifications were dropped");
                }
            }
        }
        tracing::debug!("notification stream closed");
    }

    async fn process(&self, notification: &StateChanged) {
        match self.handle(notification).await {
            Ok(outcome) => {
                tracing::trace!(
                    entity_id = %notification.entity_id,
                    ?outcome,
                    "notification handled"
                );
            }
            Err(err) => {
                tracing::warn!(
                    entity_id = %notification.entity_id,
                    error = %err,
                    "failed to forward notification"
                );
            }
        }
    }
}

impl<P, R> EventDispatcher<P, R>
where
    P: GatewayPublisher + Send + Sync + 'static,
    R: DeviceRegistry + Send + Sync + 'static,
{
    /// Run the dispatcher on its own task.
    ///
    /// The returned [`Subscription`] cancels the task.
    pub fn spawn(self: Arc<Self>, receiver: broadcast::Receiver<StateChanged>) -> Subscription {
        let handle = tokio::spawn(async move { self.run(receiver).await });
        Subscription { handle }
    }
}

/// Handle to a running dispatcher task.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Stop consuming notifications. In-flight publishes are abandoned.
    pub fn cancel(self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to end on its own (the bus was dropped).
    pub async fn closed(self) {
        if let Err(err) = self.handle.await
            && err.is_panic()
        {
            tracing::error!(error = %err, "dispatcher task panicked");
        }
    }
}
