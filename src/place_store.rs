//! The active place list of a session, mirrored to durable storage
//!
//! The store holds one value: the current list of places, or nothing. Every
//! `replace` writes through to durable storage while holding the slot lock,
//! so the in-memory value and the persisted value change together. Storage
//! failures are logged and never block the in-memory update.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::models::{CoordinateKey, Place};
use crate::storage::DurableStorage;

/// Durable key of the serialized place list
pub const PLACES_KEY: &str = "places";

/// Outer `None`: nothing loaded from durable storage yet
type Slot = Option<Option<Vec<Place>>>;

pub struct PlaceStore {
    storage: Arc<dyn DurableStorage>,
    slot: Mutex<Slot>,
}

impl PlaceStore {
    #[must_use]
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            storage,
            slot: Mutex::new(None),
        }
    }

    /// Current value. The first read loads whatever a previous session persisted.
    pub async fn read(&self) -> Option<Vec<Place>> {
        let mut slot = self.slot.lock().await;
        self.loaded(&mut slot).await.clone()
    }

    /// Whole-value assignment. `None` removes the durable key, any list
    /// (including an empty one) is written.
    #[instrument(skip(self, value), fields(count = value.as_ref().map(Vec::len)))]
    pub async fn replace(&self, value: Option<Vec<Place>>) {
        let mut slot = self.slot.lock().await;

        let persisted = match &value {
            Some(places) => match serde_json::to_vec(places) {
                Ok(bytes) => self.storage.store(PLACES_KEY, bytes).await,
                Err(e) => Err(e.into()),
            },
            None => self.storage.remove(PLACES_KEY).await,
        };
        if let Err(e) = persisted {
            warn!("Failed to persist places: {:#}", e);
        }

        *slot = Some(value);
    }

    /// First place whose coordinates equal the key
    pub async fn find_by_coordinates(&self, key: &CoordinateKey) -> Option<Place> {
        let mut slot = self.slot.lock().await;
        self.loaded(&mut slot)
            .await
            .as_ref()?
            .iter()
            .find(|place| key.matches(&place.coordinates))
            .cloned()
    }

    /// Drops the list from memory and from durable storage
    pub async fn clear(&self) {
        self.replace(None).await;
    }

    async fn loaded<'a>(&self, slot: &'a mut Slot) -> &'a Option<Vec<Place>> {
        if slot.is_none() {
            *slot = Some(self.load_persisted().await);
        }
        slot.get_or_insert(None)
    }

    async fn load_persisted(&self) -> Option<Vec<Place>> {
        let bytes = match self.storage.load(PLACES_KEY).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                warn!("Failed to read persisted places: {:#}", e);
                return None;
            }
        };

        match serde_json::from_slice::<Vec<Place>>(&bytes) {
            Ok(places) => {
                debug!("Loaded {} persisted places", places.len());
                Some(places.into_iter().map(Place::normalized).collect())
            }
            Err(e) => {
                warn!("Ignoring unreadable persisted places: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;
    use crate::storage::MemoryStorage;
    use anyhow::anyhow;
    use async_trait::async_trait;

    fn place(name: &str, lat: f64, lng: f64) -> Place {
        Place::new(name, Coordinates::new(lat, lng))
    }

    struct BrokenStorage;

    #[async_trait]
    impl DurableStorage for BrokenStorage {
        async fn load(&self, _key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            Err(anyhow!("disk unplugged"))
        }
        async fn store(&self, _key: &str, _bytes: Vec<u8>) -> anyhow::Result<()> {
            Err(anyhow!("disk unplugged"))
        }
        async fn remove(&self, _key: &str) -> anyhow::Result<()> {
            Err(anyhow!("disk unplugged"))
        }
    }

    #[tokio::test]
    async fn test_replace_then_read_returns_same_value() {
        let storage = Arc::new(MemoryStorage::new());
        let store = PlaceStore::new(storage.clone());

        let places = vec![place("A", 1.0, 1.0), place("B", 2.0, 2.0)];
        store.replace(Some(places.clone())).await;
        assert_eq!(store.read().await, Some(places));

        store.replace(None).await;
        assert_eq!(store.read().await, None);
        assert!(!storage.contains(PLACES_KEY).await);
    }

    #[tokio::test]
    async fn test_empty_list_is_a_value() {
        let storage = Arc::new(MemoryStorage::new());
        let store = PlaceStore::new(storage.clone());

        store.replace(Some(Vec::new())).await;
        assert_eq!(store.read().await, Some(Vec::new()));
        assert!(storage.contains(PLACES_KEY).await);
    }

    #[tokio::test]
    async fn test_first_read_loads_previous_session() {
        let storage = Arc::new(MemoryStorage::new());
        let places = vec![place("Louvre", 48.8606, 2.3376)];
        PlaceStore::new(storage.clone())
            .replace(Some(places.clone()))
            .await;

        let next_session = PlaceStore::new(storage);
        assert_eq!(next_session.read().await, Some(places));
    }

    #[tokio::test]
    async fn test_unreadable_persisted_value_reads_as_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .store(PLACES_KEY, b"{not json".to_vec())
            .await
            .unwrap();
        let store = PlaceStore::new(storage);
        assert_eq!(store.read().await, None);
    }

    #[tokio::test]
    async fn test_persisted_blank_optionals_are_normalized() {
        let storage = Arc::new(MemoryStorage::new());
        let raw = br#"[{"name":"Pantheon","coordinates":{"lat":48.8462,"lng":2.3464},"websiteUri":"","translated_description":""}]"#;
        storage.store(PLACES_KEY, raw.to_vec()).await.unwrap();

        let places = PlaceStore::new(storage).read().await.unwrap();
        assert_eq!(places.len(), 1);
        assert!(places[0].website_uri.is_none());
        assert!(places[0].translated_description.is_none());
    }

    #[tokio::test]
    async fn test_storage_failures_do_not_block_memory() {
        let store = PlaceStore::new(Arc::new(BrokenStorage));
        assert_eq!(store.read().await, None);

        let places = vec![place("A", 1.0, 1.0)];
        store.replace(Some(places.clone())).await;
        assert_eq!(store.read().await, Some(places));
    }

    #[tokio::test]
    async fn test_find_by_coordinates() {
        let store = PlaceStore::new(Arc::new(MemoryStorage::new()));
        assert!(
            store
                .find_by_coordinates(&CoordinateKey { lat: 1.0, lng: 1.0 })
                .await
                .is_none()
        );

        store
            .replace(Some(vec![
                place("Eiffel Tower", 48.8584, 2.2945),
                place("Louvre", 48.8606, 2.3376),
            ]))
            .await;

        let key: CoordinateKey = "48.8606,2.3376".parse().unwrap();
        let found = store.find_by_coordinates(&key).await.unwrap();
        assert_eq!(found.name, "Louvre");

        let missing: CoordinateKey = "48.8606,2.3".parse().unwrap();
        assert!(store.find_by_coordinates(&missing).await.is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_durable_key() {
        let storage = Arc::new(MemoryStorage::new());
        let store = PlaceStore::new(storage.clone());
        store.replace(Some(vec![place("A", 1.0, 1.0)])).await;
        store.clear().await;
        assert_eq!(store.read().await, None);
        assert!(!storage.contains(PLACES_KEY).await);
    }
}
