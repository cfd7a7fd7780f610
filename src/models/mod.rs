//! Data models for the Wanderlens pipeline
//!
//! This module contains the core domain models organized by concern:
//! - Place: recommended locations, coordinates and detail enrichment
//! - Accessibility: the four-flag accessibility record
//! - Itinerary: generated stop sequences and their persisted snapshots

pub mod accessibility;
pub mod itinerary;
pub mod place;

// Re-export all public types for convenient access
pub use accessibility::AccessibilityInfo;
pub use itinerary::{Itinerary, ItineraryStop};
pub use place::{CoordinateKey, Coordinates, Place, PlaceDetails, RawPlaceRecord};
