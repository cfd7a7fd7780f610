//! `Wanderlens` - place recommendations from a photo or a free-text prompt
//!
//! This library turns a query into a list of places, enriches each place with
//! translated details and an accessibility record, keeps the result as the
//! session's active place list and plans itineraries from saved places.

pub mod accessibility;
pub mod api;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod enricher;
pub mod error;
pub mod itinerary;
pub mod models;
pub mod pipeline;
pub mod place_store;
pub mod saved;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod upstream;
pub mod web;

// Re-export core types for public API
pub use accessibility::{AccessibilityClassifier, ClassifyError};
pub use config::WanderlensConfig;
pub use dispatcher::{ImageUpload, Query, QueryDispatcher};
pub use enricher::DetailEnricher;
pub use error::{Service, UpstreamFailure, WanderlensError};
pub use itinerary::{GeneratedItinerary, ItineraryComposer, ItineraryRepository};
pub use models::{AccessibilityInfo, CoordinateKey, Coordinates, Itinerary, ItineraryStop, Place};
pub use pipeline::RecommendationPipeline;
pub use place_store::PlaceStore;
pub use saved::{SavedPlace, SavedPlaces};
pub use session::{PlanOutcome, Session};
pub use storage::{DurableStorage, FjallStorage, MemoryStorage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WanderlensError>;
