//! Itinerary generation and the immutable itinerary repository
//!
//! `ItineraryComposer` turns an ordered list of place names into a stop
//! sequence through the itinerary service. `ItineraryRepository` keeps every
//! generated itinerary as a postcard record plus an id index, newest first.

use chrono::Utc;
use rand::RngExt;
use reqwest_middleware::ClientWithMiddleware;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::ServicesConfig;
use crate::error::Service;
use crate::models::{Itinerary, ItineraryStop, Place};
use crate::storage::DurableStorage;
use crate::upstream::{self, endpoint};
use crate::{Result, WanderlensError};

/// Durable key of the id index
pub const ITINERARY_INDEX_KEY: &str = "itineraries";

fn record_key(id: &str) -> String {
    format!("itinerary:{id}")
}

#[derive(Debug, Serialize)]
struct ItineraryRequest<'a> {
    places: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ItineraryResponse {
    #[serde(default)]
    title: Option<String>,
    itinerary: Vec<WireStop>,
}

#[derive(Debug, Deserialize)]
struct WireStop {
    #[serde(rename = "Description", alias = "description", default)]
    description: String,
    #[serde(rename = "Timestamp", alias = "timestamp", default)]
    timestamp: String,
    #[serde(default, deserialize_with = "transit_flag")]
    transit: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TransitFlag {
    Bool(bool),
    Text(String),
}

/// `"True"`/`"False"` in any case, or a JSON bool
fn transit_flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    match TransitFlag::deserialize(deserializer)? {
        TransitFlag::Bool(flag) => Ok(flag),
        TransitFlag::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(D::Error::custom(format!("invalid transit flag '{other}'"))),
        },
    }
}

impl From<WireStop> for ItineraryStop {
    fn from(stop: WireStop) -> Self {
        Self {
            description: stop.description,
            timestamp: stop.timestamp,
            is_transit: stop.transit,
        }
    }
}

/// What the itinerary service produced for one name list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedItinerary {
    pub title: Option<String>,
    pub stops: Vec<ItineraryStop>,
}

/// Client for the itinerary service; persists what it composes
pub struct ItineraryComposer {
    client: ClientWithMiddleware,
    url: String,
    repository: Arc<ItineraryRepository>,
}

impl ItineraryComposer {
    pub fn new(config: &ServicesConfig, repository: Arc<ItineraryRepository>) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_seconds.into());
        let client = upstream::build_json_client(timeout, config.max_retries)?;
        Ok(Self::with_client(client, &config.base_url, repository))
    }

    #[must_use]
    pub fn with_client(
        client: ClientWithMiddleware,
        base_url: &str,
        repository: Arc<ItineraryRepository>,
    ) -> Self {
        Self {
            client,
            url: endpoint(base_url, "get_itinerary"),
            repository,
        }
    }

    #[must_use]
    pub fn repository(&self) -> &ItineraryRepository {
        &self.repository
    }

    /// Asks the itinerary service for stops. An empty list fails before any request.
    #[instrument(skip(self))]
    pub async fn request_stops(&self, names: &[String]) -> Result<GeneratedItinerary> {
        let names: Vec<String> = names
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            return Err(WanderlensError::validation(
                "Please select at least one place for the itinerary",
            ));
        }

        let start_time = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .json(&ItineraryRequest { places: &names })
            .send()
            .await
            .map_err(|e| upstream::middleware_error(Service::Itinerary, e))?;

        let response = upstream::ensure_success(Service::Itinerary, response).await?;
        let body: ItineraryResponse = upstream::read_json(Service::Itinerary, response).await?;

        let generated = GeneratedItinerary {
            title: body
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            stops: body.itinerary.into_iter().map(ItineraryStop::from).collect(),
        };
        info!(
            "Itinerary with {} stops for {} places in {:.3}s",
            generated.stops.len(),
            names.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(generated)
    }

    /// Generates stops for the places, snapshots them and inserts the record
    #[instrument(skip(self, places), fields(count = places.len()))]
    pub async fn compose(&self, places: &[Place]) -> Result<Itinerary> {
        let names: Vec<String> = places.iter().map(|p| p.name.clone()).collect();
        let generated = self.request_stops(&names).await?;

        let itinerary = Itinerary {
            id: new_itinerary_id(),
            created_at: Utc::now(),
            title: generated.title,
            places: places.to_vec(),
            stops: generated.stops,
        };
        self.repository.insert(&itinerary).await?;
        Ok(itinerary)
    }
}

/// Sortable timestamp plus random suffix, e.g. `20250114093015123-3fa2c1`
fn new_itinerary_id() -> String {
    let suffix: u32 = rand::rng().random_range(0..0x100_0000);
    format!("{}-{:06x}", Utc::now().format("%Y%m%d%H%M%S%3f"), suffix)
}

/// Immutable itinerary records, newest first
pub struct ItineraryRepository {
    storage: Arc<dyn DurableStorage>,
    index_lock: Mutex<()>,
}

impl ItineraryRepository {
    #[must_use]
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            storage,
            index_lock: Mutex::new(()),
        }
    }

    #[instrument(skip(self, itinerary), fields(id = %itinerary.id))]
    pub async fn insert(&self, itinerary: &Itinerary) -> Result<()> {
        let _guard = self.index_lock.lock().await;
        let mut index = self.index().await?;
        if index.contains(&itinerary.id) {
            return Err(WanderlensError::storage(format!(
                "Itinerary {} already exists",
                itinerary.id
            )));
        }

        let bytes = postcard::to_stdvec(itinerary)
            .map_err(|e| WanderlensError::storage(format!("Failed to encode itinerary: {e}")))?;
        self.storage
            .store(&record_key(&itinerary.id), bytes)
            .await
            .map_err(|e| WanderlensError::storage(format!("Failed to write itinerary: {e:#}")))?;

        index.insert(0, itinerary.id.clone());
        self.write_index(&index).await?;
        debug!("Stored itinerary, {} in repository", index.len());
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Itinerary>> {
        let bytes = self
            .storage
            .load(&record_key(id))
            .await
            .map_err(|e| WanderlensError::storage(format!("Failed to read itinerary: {e:#}")))?;
        bytes
            .map(|bytes| {
                postcard::from_bytes(&bytes).map_err(|e| {
                    WanderlensError::storage(format!("Itinerary {id} is unreadable: {e}"))
                })
            })
            .transpose()
    }

    /// Newest first. Index entries without a readable record are skipped.
    pub async fn list(&self) -> Result<Vec<Itinerary>> {
        let index = self.index().await?;
        let mut itineraries = Vec::with_capacity(index.len());
        for id in &index {
            match self.get(id).await {
                Ok(Some(itinerary)) => itineraries.push(itinerary),
                Ok(None) => warn!("Itinerary {} is indexed but missing", id),
                Err(e) => warn!("Skipping itinerary {}: {}", id, e),
            }
        }
        Ok(itineraries)
    }

    /// Returns `false` when no itinerary has that id
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.index_lock.lock().await;
        let mut index = self.index().await?;
        let before = index.len();
        index.retain(|known| known != id);
        if index.len() == before {
            return Ok(false);
        }

        // a failed remove must leave the itinerary listed
        self.storage
            .remove(&record_key(id))
            .await
            .map_err(|e| WanderlensError::storage(format!("Failed to remove itinerary: {e:#}")))?;
        self.write_index(&index).await?;
        Ok(true)
    }

    async fn index(&self) -> Result<Vec<String>> {
        let bytes = self
            .storage
            .load(ITINERARY_INDEX_KEY)
            .await
            .map_err(|e| WanderlensError::storage(format!("Failed to read itinerary index: {e:#}")))?;
        match bytes {
            Some(bytes) => postcard::from_bytes(&bytes).map_err(|e| {
                WanderlensError::storage(format!("Itinerary index is unreadable: {e}"))
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn write_index(&self, index: &[String]) -> Result<()> {
        let bytes = postcard::to_stdvec(index)
            .map_err(|e| WanderlensError::storage(format!("Failed to encode itinerary index: {e}")))?;
        self.storage
            .store(ITINERARY_INDEX_KEY, bytes)
            .await
            .map_err(|e| WanderlensError::storage(format!("Failed to write itinerary index: {e:#}")))
    }
}
