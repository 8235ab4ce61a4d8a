//! # thingbridge-adapter-virtual
//!
//! Simulated hub that feeds state changes into the bridge without a real
//! home-automation installation.
//!
//! ## Provided entities
//!
//! | Entity ID | Device | Device class |
//! |-----------|--------|--------------|
//! | `sensor.outside_temperature` | weather station | `temperature` |
//! | `sensor.outside_humidity` | weather station | `humidity` |
//! | `sensor.washing_machine_power` | none | `power` (drops out every 10th tick) |
//! | `sensor.air_quality_index` | air purifier | none |
//!
//! ## Dependency rule
//!
//! Depends on `thingbridge-app` (port traits) and `thingbridge-domain` only.

mod devices;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use thingbridge_app::ports::{DeviceRegistry, NotificationPublisher};
use thingbridge_domain::error::BridgeError;
use thingbridge_domain::notification::StateChanged;
use thingbridge_domain::snapshot::StateSnapshot;
use thingbridge_domain::time;

pub use devices::{AIR_PURIFIER, VirtualSensor, WEATHER_STATION, Waveform};

#[derive(Default)]
struct HubState {
    tick: u32,
    last: HashMap<&'static str, StateSnapshot>,
    retired: HashSet<&'static str>,
}

/// Virtual hub with a fixed sensor catalog.
pub struct VirtualHub {
    sensors: Vec<VirtualSensor>,
    state: Mutex<HubState>,
    emitter: Mutex<Option<JoinHandle<()>>>,
}

impl Default for VirtualHub {
    fn default() -> Self {
        Self::with_sensors(devices::catalog())
    }
}

impl VirtualHub {
    #[must_use]
    pub fn with_sensors(sensors: Vec<VirtualSensor>) -> Self {
        Self {
            sensors,
            state: Mutex::new(HubState::default()),
            emitter: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active<'a>(&'a self, state: &'a HubState) -> impl Iterator<Item = &'a VirtualSensor> {
        self.sensors
            .iter()
            .filter(|sensor| !state.retired.contains(sensor.entity_id))
    }

    /// Entity ids still present on the hub.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<&'static str> {
        let state = self.state();
        self.active(&state).map(|sensor| sensor.entity_id).collect()
    }

    /// Publish one reading per active sensor and advance the simulation.
    ///
    /// Each notification carries the previous reading as `old_state`.
    /// Returns how many notifications were published.
    pub async fn emit_round<P>(&self, publisher: &P) -> usize
    where
        P: NotificationPublisher + Sync,
    {
        let notifications: Vec<StateChanged> = {
            let mut state = self.state();
            let tick = state.tick;
            state.tick = state.tick.wrapping_add(1);
            let at = time::now();

            let readings: Vec<_> = self
                .active(&state)
                .map(|sensor| (sensor.entity_id, sensor.snapshot(tick, at)))
                .collect();
            readings
                .into_iter()
                .map(|(entity_id, snapshot)| {
                    let old_state = state.last.insert(entity_id, snapshot.clone());
                    StateChanged {
                        entity_id: entity_id.to_string(),
                        new_state: Some(snapshot),
                        old_state,
                    }
                })
                .collect()
        };

        let mut published = 0;
        for notification in notifications {
            let entity_id = notification.entity_id.clone();
            match publisher.publish(notification).await {
                Ok(()) => published += 1,
                Err(err) => {
                    tracing::warn!(%entity_id, error = %err, "failed to publish state change");
                }
            }
        }
        tracing::trace!(published, "virtual hub round emitted");
        published
    }

    /// Remove an entity from the hub and announce it with an old-state-only
    /// notification.
    ///
    /// Returns `Ok(false)` when the entity is unknown or already removed.
    ///
    /// # Errors
    ///
    /// Propagates the publisher's error.
    pub async fn retire<P>(&self, publisher: &P, entity_id: &str) -> Result<bool, BridgeError>
    where
        P: NotificationPublisher + Sync,
    {
        let notification = {
            let mut state = self.state();
            let Some(sensor) = self
                .active(&state)
                .find(|sensor| sensor.entity_id == entity_id)
                .cloned()
            else {
                return Ok(false);
            };
            state.retired.insert(sensor.entity_id);
            let tick = state.tick;
            let old_state = state
                .last
                .remove(sensor.entity_id)
                .unwrap_or_else(|| sensor.snapshot(tick, time::now()));
            StateChanged::removed(sensor.entity_id, old_state)
        };

        publisher.publish(notification).await?;
        tracing::info!(%entity_id, "virtual entity removed");
        Ok(true)
    }

    /// Start emitting a round every `interval` on a background task.
    ///
    /// A running emitter is replaced.
    pub fn start<P>(self: &Arc<Self>, publisher: P, interval: Duration)
    where
        P: NotificationPublisher + Send + Sync + 'static,
    {
        let hub = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                hub.emit_round(&publisher).await;
            }
        });

        let previous = self
            .emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        tracing::info!(sensors = self.sensors.len(), ?interval, "virtual hub started");
    }

    /// Stop the background emitter, if any.
    pub fn stop(&self) {
        let handle = self
            .emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::info!("virtual hub stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.emitter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl DeviceRegistry for VirtualHub {
    fn device_id_for(
        &self,
        entity_id: &str,
    ) -> impl Future<Output = Result<Option<String>, BridgeError>> + Send {
        let device_id = {
            let state = self.state();
            self.active(&state)
                .find(|sensor| sensor.entity_id == entity_id)
                .and_then(|sensor| sensor.device_id)
                .map(str::to_string)
        };
        async move { Ok(device_id) }
    }

    fn device_classes(&self) -> impl Future<Output = Result<Vec<String>, BridgeError>> + Send {
        let classes: std::collections::BTreeSet<&str> = {
            let state = self.state();
            self.active(&state)
                .filter_map(|sensor| sensor.device_class)
                .collect()
        };
        let classes = classes.into_iter().map(str::to_string).collect();
        async move { Ok(classes) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thingbridge_app::event_bus::InProcessEventBus;
    use thingbridge_domain::notification::Change;
    use thingbridge_domain::snapshot::STATE_UNAVAILABLE;

    struct FailingPublisher;

    impl NotificationPublisher for FailingPublisher {
        async fn publish(&self, _notification: StateChanged) -> Result<(), BridgeError> {
            let err = std::io::Error::other("bus closed");
            Err(BridgeError::Transport(Box::new(err)))
        }
    }

    #[tokio::test]
    async fn should_resolve_grouped_entities_to_their_device() {
        let hub = VirtualHub::default();
        for (entity_id, device) in [
            ("sensor.outside_temperature", WEATHER_STATION),
            ("sensor.outside_humidity", WEATHER_STATION),
            ("sensor.air_quality_index", AIR_PURIFIER),
        ] {
            let found = hub.device_id_for(entity_id).await.unwrap();
            assert_eq!(found.as_deref(), Some(device), "{entity_id}");
        }
    }

    #[tokio::test]
    async fn should_return_none_for_ungrouped_or_unknown_entities() {
        let hub = VirtualHub::default();
        let ungrouped = hub.device_id_for("sensor.washing_machine_power").await;
        assert_eq!(ungrouped.unwrap(), None);
        assert_eq!(hub.device_id_for("sensor.nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn should_list_sorted_unique_device_classes() {
        let hub = VirtualHub::default();
        assert_eq!(
            hub.device_classes().await.unwrap(),
            vec!["humidity", "power", "temperature"]
        );
    }

    #[tokio::test]
    async fn should_emit_one_notification_per_sensor() {
        let hub = VirtualHub::default();
        let bus = InProcessEventBus::new(16);
        let mut rx = bus.subscribe();

        assert_eq!(hub.emit_round(&bus).await, 4);

        let mut seen = Vec::new();
        for _ in 0..4 {
            let notification = rx.recv().await.unwrap();
            assert!(notification.old_state.is_none());
            assert!(matches!(notification.change(), Change::Updated(_)));
            seen.push(notification.entity_id);
        }
        seen.sort();
        assert_eq!(
            seen,
            vec![
                "sensor.air_quality_index",
                "sensor.outside_humidity",
                "sensor.outside_temperature",
                "sensor.washing_machine_power",
            ]
        );
    }

    #[tokio::test]
    async fn should_carry_previous_reading_as_old_state() {
        let hub = VirtualHub::default();
        let bus = InProcessEventBus::new(16);
        hub.emit_round(&bus).await;
        let mut rx = bus.subscribe();
        hub.emit_round(&bus).await;

        let notification = rx.recv().await.unwrap();
        assert!(notification.old_state.is_some());
        assert_ne!(notification.old_state, notification.new_state);
    }

    #[tokio::test]
    async fn should_report_power_sensor_unavailable_on_tenth_round() {
        let hub = VirtualHub::default();
        let bus = InProcessEventBus::new(64);
        for _ in 0..9 {
            hub.emit_round(&bus).await;
        }
        let mut rx = bus.subscribe();
        hub.emit_round(&bus).await;

        let mut power = None;
        for _ in 0..4 {
            let notification = rx.recv().await.unwrap();
            if notification.entity_id == "sensor.washing_machine_power" {
                power = notification.new_state;
            }
        }
        assert_eq!(power.unwrap().state, STATE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn should_count_only_successful_publishes() {
        let hub = VirtualHub::default();
        assert_eq!(hub.emit_round(&FailingPublisher).await, 0);
    }

    #[tokio::test]
    async fn should_announce_removal_with_last_state() {
        let hub = VirtualHub::default();
        let bus = InProcessEventBus::new(16);
        hub.emit_round(&bus).await;
        let mut rx = bus.subscribe();

        assert!(hub.retire(&bus, "sensor.outside_humidity").await.unwrap());

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.entity_id, "sensor.outside_humidity");
        assert_eq!(notification.change(), Change::Removed);
        assert_eq!(
            hub.device_id_for("sensor.outside_humidity").await.unwrap(),
            None
        );
        assert_eq!(hub.entity_ids().len(), 3);
        assert_eq!(hub.emit_round(&bus).await, 3);
    }

    #[tokio::test]
    async fn should_not_retire_unknown_or_removed_entity() {
        let hub = VirtualHub::default();
        let bus = InProcessEventBus::new(16);
        assert!(!hub.retire(&bus, "sensor.nope").await.unwrap());
        assert!(hub.retire(&bus, "sensor.air_quality_index").await.unwrap());
        assert!(!hub.retire(&bus, "sensor.air_quality_index").await.unwrap());
        assert_eq!(
            hub.device_classes().await.unwrap(),
            vec!["humidity", "power", "temperature"]
        );
    }

    #[tokio::test]
    async fn should_emit_in_background_until_stopped() {
        let hub = Arc::new(VirtualHub::default());
        let bus = Arc::new(InProcessEventBus::new(64));
        let mut rx = bus.subscribe();

        hub.start(Arc::clone(&bus), Duration::from_millis(10));
        assert!(hub.is_running());

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(first.new_state.is_some());

        hub.stop();
        assert!(!hub.is_running());
    }
}
