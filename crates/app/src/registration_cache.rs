//! Registration cache: which devices were announced this session.
//!
//! Membership is session-scoped: nothing is persisted, and a reconnecting
//! process announces every device again. The cache also hands out per-key
//! registration locks so that two notifications for the same unannounced
//! device cannot both publish a connect message.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use thingbridge_domain::identity::DeviceKey;

/// Exclusive right to run the registration sequence for one device key.
pub type RegistrationGuard = OwnedMutexGuard<()>;

#[derive(Default)]
struct Inner {
    registered: HashSet<DeviceKey>,
    locks: HashMap<DeviceKey, Arc<AsyncMutex<()>>>,
}

/// Session-scoped set of announced device keys.
#[derive(Default)]
pub struct RegistrationCache {
    inner: Mutex<Inner>,
}

impl RegistrationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        // the set stays consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn has(&self, key: &DeviceKey) -> bool {
        self.inner().registered.contains(key)
    }

    pub fn mark_registered(&self, key: DeviceKey) {
        self.inner().registered.insert(key);
    }

    /// Forget a device so its next event announces it again.
    ///
    /// Waits for a registration of `key` that is in flight, so the removal
    /// always lands after it. Evicting an unknown key is a no-op. The key's
    /// lock entry is kept: a task may still be queued on it.
    pub async fn evict(&self, key: &DeviceKey) {
        let _guard = self.registration_lock(key).await;
        self.inner().registered.remove(key);
    }

    /// Wait for the registration lock of `key`.
    ///
    /// Check [`has`](Self::has) again once the guard is held: another task
    /// may have completed the registration meanwhile.
    pub async fn registration_lock(&self, key: &DeviceKey) -> RegistrationGuard {
        let lock = {
            let mut inner = self.inner();
            Arc::clone(inner.locks.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of announced devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner().registered.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn key(entity_id: &str) -> DeviceKey {
        DeviceKey::for_entity(entity_id).unwrap()
    }

    #[test]
    fn should_start_empty() {
        let cache = RegistrationCache::new();
        assert!(cache.is_empty());
        assert!(!cache.has(&key("sensor.a")));
    }

    #[test]
    fn should_report_registered_key() {
        let cache = RegistrationCache::new();
        cache.mark_registered(key("sensor.a"));
        assert!(cache.has(&key("sensor.a")));
        assert!(!cache.has(&key("sensor.b")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn should_be_idempotent_when_marking_twice() {
        let cache = RegistrationCache::new();
        cache.mark_registered(key("sensor.a"));
        cache.mark_registered(key("sensor.a"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn should_forget_key_when_evicted() {
        let cache = RegistrationCache::new();
        cache.mark_registered(key("sensor.a"));
        cache.evict(&key("sensor.a")).await;
        assert!(!cache.has(&key("sensor.a")));
    }

    #[tokio::test]
    async fn should_ignore_eviction_of_unknown_key() {
        let cache = RegistrationCache::new();
        cache.mark_registered(key("sensor.a"));
        cache.evict(&key("sensor.never_seen")).await;
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn should_evict_after_registration_in_flight_completes() {
        let cache = Arc::new(RegistrationCache::new());
        let guard = cache.registration_lock(&key("sensor.a")).await;

        let eviction = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.evict(&key("sensor.a")).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!eviction.is_finished());

        cache.mark_registered(key("sensor.a"));
        drop(guard);
        eviction.await.unwrap();

        assert!(!cache.has(&key("sensor.a")));
    }

    #[tokio::test]
    async fn should_keep_serializing_registrations_across_eviction() {
        let cache = Arc::new(RegistrationCache::new());
        cache.mark_registered(key("sensor.a"));
        cache.evict(&key("sensor.a")).await;

        let guard = cache.registration_lock(&key("sensor.a")).await;
        let contender = tokio::time::timeout(
            Duration::from_millis(20),
            cache.registration_lock(&key("sensor.a")),
        )
        .await;
        assert!(contender.is_err());
        drop(guard);
    }

    #[tokio::test]
    async fn should_serialize_registration_for_same_key() {
        let cache = Arc::new(RegistrationCache::new());
        let guard = cache.registration_lock(&key("sensor.a")).await;

        let contender = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let _guard = cache.registration_lock(&key("sensor.a")).await;
                cache.has(&key("sensor.a"))
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        cache.mark_registered(key("sensor.a"));
        drop(guard);

        assert!(contender.await.unwrap());
    }

    #[tokio::test]
    async fn should_not_block_registration_of_other_keys() {
        let cache = RegistrationCache::new();
        let _a = cache.registration_lock(&key("sensor.a")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(100),
            cache.registration_lock(&key("sensor.b")),
        )
        .await;
        assert!(b.is_ok());
    }
}
