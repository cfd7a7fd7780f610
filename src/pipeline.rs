//! The recommendation flow: dispatch, enrich, classify, store

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use crate::Result;
use crate::accessibility::AccessibilityClassifier;
use crate::dispatcher::{Query, QueryDispatcher};
use crate::enricher::DetailEnricher;
use crate::models::Place;
use crate::place_store::PlaceStore;

pub struct RecommendationPipeline {
    dispatcher: QueryDispatcher,
    enricher: DetailEnricher,
    classifier: AccessibilityClassifier,
    store: Arc<PlaceStore>,
}

impl RecommendationPipeline {
    #[must_use]
    pub fn new(
        dispatcher: QueryDispatcher,
        enricher: DetailEnricher,
        classifier: AccessibilityClassifier,
        store: Arc<PlaceStore>,
    ) -> Self {
        Self {
            dispatcher,
            enricher,
            classifier,
            store,
        }
    }

    #[must_use]
    pub fn enricher(&self) -> &DetailEnricher {
        &self.enricher
    }

    #[must_use]
    pub fn classifier(&self) -> &AccessibilityClassifier {
        &self.classifier
    }

    /// Runs the whole flow and makes the result the active place list.
    /// Only a failed dispatch is an error; the store is left untouched then.
    #[instrument(skip(self, query))]
    pub async fn run(&self, query: Query) -> Result<Vec<Place>> {
        let start_time = Instant::now();

        let places = self.dispatcher.dispatch(query).await?;
        let places = self.enricher.enrich(places).await;
        let places = self.classifier.classify_all(places).await;

        self.store.replace(Some(places.clone())).await;
        info!(
            "Recommended {} places in {:.3}s",
            places.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(places)
    }
}
