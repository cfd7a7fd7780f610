//! Itinerary models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Place;

/// One step of a day plan. Order in the sequence is the only structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryStop {
    /// Free text, may mention place names
    pub description: String,
    /// Time of day as emitted by the itinerary service, usually `HH:MM`
    pub timestamp: String,
    pub is_transit: bool,
}

/// A persisted itinerary. Never mutated after insertion, only deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub title: Option<String>,
    /// Snapshot of the places the itinerary was generated from
    pub places: Vec<Place>,
    pub stops: Vec<ItineraryStop>,
}

impl Itinerary {
    /// Stops where the traveller stays at a place
    pub fn visits(&self) -> impl Iterator<Item = &ItineraryStop> {
        self.stops.iter().filter(|stop| !stop.is_transit)
    }
}
