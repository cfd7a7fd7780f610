//! Durable set of places the user saved for later planning

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::models::Place;
use crate::storage::DurableStorage;
use crate::{Result, WanderlensError};

/// Durable key of the saved set
pub const SAVED_PLACES_KEY: &str = "saved_places";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPlace {
    pub place: Place,
    pub saved_at: DateTime<Utc>,
}

/// Saved places keyed by name. Unlike the place store, failures here surface.
pub struct SavedPlaces {
    storage: Arc<dyn DurableStorage>,
    // serialises read-modify-write cycles
    lock: Mutex<()>,
}

impl SavedPlaces {
    #[must_use]
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    /// Saves a place; returns `false` when a place with that name was already saved
    #[instrument(skip(self, place), fields(name = %place.name))]
    pub async fn save(&self, place: Place) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        if entries.iter().any(|e| e.place.name == place.name) {
            return Ok(false);
        }
        entries.push(SavedPlace {
            place,
            saved_at: Utc::now(),
        });
        self.write(&entries).await?;
        info!("Saved place, {} in set", entries.len());
        Ok(true)
    }

    /// Removes a place by name; returns `false` when it was not saved
    #[instrument(skip(self))]
    pub async fn unsave(&self, name: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        let before = entries.len();
        entries.retain(|e| e.place.name != name);
        if entries.len() == before {
            return Ok(false);
        }
        self.write(&entries).await?;
        Ok(true)
    }

    pub async fn is_saved(&self, name: &str) -> Result<bool> {
        Ok(self.load().await?.iter().any(|e| e.place.name == name))
    }

    /// Most recently saved first
    pub async fn list(&self) -> Result<Vec<SavedPlace>> {
        let mut entries = self.load().await?;
        entries.reverse();
        Ok(entries)
    }

    /// Places in the order they were saved
    pub async fn places(&self) -> Result<Vec<Place>> {
        Ok(self.load().await?.into_iter().map(|e| e.place).collect())
    }

    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.storage
            .remove(SAVED_PLACES_KEY)
            .await
            .map_err(|e| WanderlensError::storage(format!("Failed to clear saved places: {e:#}")))
    }

    async fn load(&self) -> Result<Vec<SavedPlace>> {
        let bytes = self
            .storage
            .load(SAVED_PLACES_KEY)
            .await
            .map_err(|e| WanderlensError::storage(format!("Failed to read saved places: {e:#}")))?;
        match bytes {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                WanderlensError::storage(format!("Saved places are unreadable: {e}"))
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn write(&self, entries: &[SavedPlace]) -> Result<()> {
        let bytes = serde_json::to_vec(entries)
            .map_err(|e| WanderlensError::storage(format!("Failed to encode saved places: {e}")))?;
        self.storage
            .store(SAVED_PLACES_KEY, bytes)
            .await
            .map_err(|e| WanderlensError::storage(format!("Failed to write saved places: {e:#}")))
    }
}
