//! Session context: everything one user session needs, built once from config
//!
//! A session owns the upstream clients, the active place list, the saved set
//! and the itinerary repository, all sharing one durable storage. Consumers
//! receive the session explicitly; `teardown` ends it and clears the active
//! place list from memory and from storage.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::accessibility::AccessibilityClassifier;
use crate::config::WanderlensConfig;
use crate::dispatcher::{Query, QueryDispatcher};
use crate::enricher::DetailEnricher;
use crate::itinerary::{ItineraryComposer, ItineraryRepository};
use crate::models::{CoordinateKey, Itinerary, Place};
use crate::pipeline::RecommendationPipeline;
use crate::place_store::PlaceStore;
use crate::saved::SavedPlaces;
use crate::storage::{DurableStorage, FjallStorage, MemoryStorage};
use crate::{Result, WanderlensError};

/// Result of planning from the saved set. The itinerary is stored even when
/// clearing the saved set afterwards failed.
#[derive(Debug)]
pub struct PlanOutcome {
    pub itinerary: Itinerary,
    pub clear_error: Option<WanderlensError>,
}

pub struct Session {
    pipeline: RecommendationPipeline,
    composer: ItineraryComposer,
    places: Arc<PlaceStore>,
    saved: SavedPlaces,
}

impl Session {
    /// Session persisted in the configured storage directory
    pub fn open(config: &WanderlensConfig) -> Result<Self> {
        let path = config.storage_path();
        let storage = FjallStorage::open(&path).map_err(|e| {
            WanderlensError::storage(format!(
                "Failed to open storage at {}: {e:#}",
                path.display()
            ))
        })?;
        info!("Opened storage at {}", path.display());
        Self::with_storage(config, Arc::new(storage))
    }

    /// Session whose state lives only as long as the process
    pub fn in_memory(config: &WanderlensConfig) -> Result<Self> {
        Self::with_storage(config, Arc::new(MemoryStorage::new()))
    }

    pub fn with_storage(
        config: &WanderlensConfig,
        storage: Arc<dyn DurableStorage>,
    ) -> Result<Self> {
        let places = Arc::new(PlaceStore::new(storage.clone()));
        let pipeline = RecommendationPipeline::new(
            QueryDispatcher::new(&config.services)?,
            DetailEnricher::new(&config.services)?,
            AccessibilityClassifier::new(&config.accessibility, config.services.max_retries)?,
            places.clone(),
        );
        let repository = Arc::new(ItineraryRepository::new(storage.clone()));
        let composer = ItineraryComposer::new(&config.services, repository)?;

        Ok(Self {
            pipeline,
            composer,
            places,
            saved: SavedPlaces::new(storage),
        })
    }

    #[must_use]
    pub fn pipeline(&self) -> &RecommendationPipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn composer(&self) -> &ItineraryComposer {
        &self.composer
    }

    #[must_use]
    pub fn places(&self) -> &PlaceStore {
        &self.places
    }

    #[must_use]
    pub fn saved(&self) -> &SavedPlaces {
        &self.saved
    }

    #[must_use]
    pub fn itineraries(&self) -> &ItineraryRepository {
        self.composer.repository()
    }

    /// Runs the recommendation flow; the result becomes the active place list
    pub async fn recommend(&self, query: Query) -> Result<Vec<Place>> {
        self.pipeline.run(query).await
    }

    /// Saves a place of the active list. `None` when no active place has those
    /// coordinates, otherwise whether the place was newly saved.
    pub async fn save_from_active(&self, key: &CoordinateKey) -> Result<Option<(Place, bool)>> {
        let Some(place) = self.places.find_by_coordinates(key).await else {
            return Ok(None);
        };
        let added = self.saved.save(place.clone()).await?;
        Ok(Some((place, added)))
    }

    /// Composes an itinerary from the saved set, stores it, then clears the set.
    /// Insert and clear are not transactional: a failed clear is reported in
    /// the outcome and the stored itinerary stays.
    #[instrument(skip(self))]
    pub async fn plan_itinerary(&self) -> Result<PlanOutcome> {
        let places = self.saved.places().await?;
        let itinerary = self.composer.compose(&places).await?;

        let clear_error = match self.saved.clear().await {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    "Itinerary {} stored but the saved places were not cleared: {}",
                    itinerary.id, e
                );
                Some(e)
            }
        };

        info!("Planned itinerary {}", itinerary.id);
        Ok(PlanOutcome {
            itinerary,
            clear_error,
        })
    }

    /// Ends the session, dropping the active place list everywhere
    pub async fn teardown(&self) {
        self.places.clear().await;
        info!("Session ended");
    }
}
