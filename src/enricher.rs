//! Per-place detail enrichment
//!
//! Fans out one detail lookup per place name, waits for every lookup to
//! settle and merges the translated description and review summary into the
//! matching place. Merging is keyed by place name, so the order in which the
//! lookups complete has no influence on which place receives which details.

use futures::future::join_all;
use reqwest::Client;
use reqwest::multipart::Form;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::config::ServicesConfig;
use crate::error::Service;
use crate::models::{Place, PlaceDetails};
use crate::upstream::{self, endpoint};

/// Client for the detail lookup service
pub struct DetailEnricher {
    client: Client,
    url: String,
}

impl DetailEnricher {
    pub fn new(config: &ServicesConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_seconds.into());
        let client = upstream::build_client(timeout)?;
        Ok(Self::with_client(client, &config.base_url))
    }

    #[must_use]
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            url: endpoint(base_url, "get_detail"),
        }
    }

    /// Looks up the translated description and review summary of one place
    #[instrument(skip(self))]
    pub async fn fetch(&self, name: &str) -> Result<PlaceDetails> {
        let form = Form::new().text("place", name.to_string());
        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| upstream::transport_error(Service::Detail, &e))?;

        let response = upstream::ensure_success(Service::Detail, response).await?;
        upstream::read_json(Service::Detail, response).await
    }

    /// Enriches every place that has a successful lookup. The result always has
    /// the same places, in the same order, as the input.
    #[instrument(skip(self, places), fields(count = places.len()))]
    pub async fn enrich(&self, mut places: Vec<Place>) -> Vec<Place> {
        let start_time = Instant::now();

        let mut names: Vec<String> = Vec::with_capacity(places.len());
        for place in &places {
            if !names.contains(&place.name) {
                names.push(place.name.clone());
            }
        }

        let lookups = join_all(
            names
                .iter()
                .map(|name| async move { (name.as_str(), self.fetch(name).await) }),
        )
        .await;

        let mut details: HashMap<String, PlaceDetails> = HashMap::with_capacity(lookups.len());
        for (name, result) in lookups {
            match result {
                Ok(found) => {
                    debug!("Details received for {}", name);
                    details.insert(name.to_string(), found);
                }
                Err(err) => warn!("Failed to get details for {}: {}", name, err),
            }
        }

        for place in &mut places {
            if let Some(found) = details.get(&place.name) {
                place.apply_details(found.clone());
            }
        }

        info!(
            "Enriched {}/{} places in {:.3}s",
            details.len(),
            names.len(),
            start_time.elapsed().as_secs_f64()
        );
        places
    }
}
