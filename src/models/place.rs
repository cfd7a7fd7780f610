//! Place model for recommended locations and their coordinates

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::AccessibilityInfo;
use crate::WanderlensError;

/// Location coordinates
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    #[serde(alias = "latitude")]
    pub lat: f64,
    /// Longitude in decimal degrees
    #[serde(alias = "longitude")]
    pub lng: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Routing key, `"lat,lng"` with shortest round-trip formatting
    #[must_use]
    pub fn key(&self) -> CoordinateKey {
        CoordinateKey {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// Identity key of a place within one result list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateKey {
    pub lat: f64,
    pub lng: f64,
}

impl CoordinateKey {
    #[must_use]
    pub fn matches(&self, coordinates: &Coordinates) -> bool {
        self.lat == coordinates.lat && self.lng == coordinates.lng
    }
}

impl fmt::Display for CoordinateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl FromStr for CoordinateKey {
    type Err = WanderlensError;

    /// Accepts `"48.8584,2.2945"` as well as its percent-encoded form.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let decoded = urlencoding::decode(raw)
            .map_err(|_| WanderlensError::validation(format!("Malformed coordinates '{raw}'")))?;
        let (lat, lng) = decoded.split_once(',').ok_or_else(|| {
            WanderlensError::validation(format!("Coordinates must look like 'lat,lng', got '{raw}'"))
        })?;

        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| {
                    WanderlensError::validation(format!("Invalid coordinate value '{}'", part.trim()))
                })
        };

        Ok(Self {
            lat: parse(lat)?,
            lng: parse(lng)?,
        })
    }
}

/// One recommended location with display and enrichment data
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub name: String,
    #[serde(default, alias = "image")]
    pub image_uri: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub long_description: String,
    /// Rating between 0 and 5
    #[serde(default)]
    pub rating: f64,
    #[serde(default, alias = "reviews")]
    pub review_count: u64,
    #[serde(default)]
    pub address: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub website_uri: Option<String>,
    /// Description translated into the language of the query
    #[serde(default, rename = "translated_description")]
    pub translated_description: Option<String>,
    #[serde(default, rename = "translated_review_summary")]
    pub translated_review_summary: Option<String>,
    #[serde(default)]
    pub accessibility: Option<AccessibilityInfo>,
}

impl Place {
    #[must_use]
    pub fn new(name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            name: name.into(),
            image_uri: String::new(),
            short_description: String::new(),
            long_description: String::new(),
            rating: 0.0,
            review_count: 0,
            address: String::new(),
            coordinates,
            website_uri: None,
            translated_description: None,
            translated_review_summary: None,
            accessibility: None,
        }
    }

    #[must_use]
    pub fn key(&self) -> CoordinateKey {
        self.coordinates.key()
    }

    /// Blank optional fields become `None` and the rating is clamped into range.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.website_uri = non_blank(self.website_uri);
        self.translated_description = non_blank(self.translated_description);
        self.translated_review_summary = non_blank(self.translated_review_summary);
        self.rating = clamp_rating(self.rating);
        self
    }

    /// Attach translated detail fields; absent fields leave the originals untouched.
    pub fn apply_details(&mut self, details: PlaceDetails) {
        if let Some(description) = non_blank(details.description) {
            self.translated_description = Some(description);
        }
        if let Some(summary) = non_blank(details.review_summary) {
            self.translated_review_summary = Some(summary);
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn clamp_rating(rating: f64) -> f64 {
    if rating.is_nan() {
        0.0
    } else {
        rating.clamp(0.0, 5.0)
    }
}

/// Response of the detail lookup service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub review_summary: Option<String>,
}

/// One record of the ideas service, parsed leniently
///
/// Only a missing name or missing coordinates make a record unusable; nulls
/// and loosely typed values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPlaceRecord {
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(alias = "googleMapPhotoUri", alias = "imageUri", deserialize_with = "lenient_text")]
    pub image: Option<String>,
    #[serde(alias = "short_description", deserialize_with = "lenient_text")]
    pub short_description: Option<String>,
    #[serde(alias = "long_description", deserialize_with = "lenient_text")]
    pub long_description: Option<String>,
    #[serde(alias = "globalRating", deserialize_with = "lenient_number")]
    pub rating: Option<f64>,
    /// Either a review count or the list of review texts
    pub reviews: Option<Value>,
    #[serde(alias = "review_count", deserialize_with = "lenient_count")]
    pub review_count: Option<u64>,
    #[serde(deserialize_with = "lenient_text")]
    pub address: Option<String>,
    #[serde(alias = "location", deserialize_with = "lenient_coordinates")]
    pub coordinates: Option<Coordinates>,
    #[serde(deserialize_with = "lenient_text")]
    pub website_uri: Option<String>,
}

/// Strings as is, numbers and booleans as their text, anything else absent
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn number_of(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn count_of(value: &Value) -> Option<u64> {
    number_of(value).filter(|n| *n >= 0.0).map(|n| n.round() as u64)
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(number_of(&Value::deserialize(deserializer)?))
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(count_of(&Value::deserialize(deserializer)?))
}

fn lenient_coordinates<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Coordinates>, D::Error> {
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

impl RawPlaceRecord {
    /// Converts into a `Place`; `None` when the record has no name or coordinates.
    #[must_use]
    pub fn into_place(self) -> Option<Place> {
        let name = self.name.unwrap_or_default().trim().to_string();
        if name.is_empty() {
            return None;
        }
        let coordinates = self.coordinates?;

        let review_count = self.review_count.unwrap_or_else(|| match &self.reviews {
            Some(Value::Array(texts)) => texts.len() as u64,
            Some(other) => count_of(other).unwrap_or(0),
            None => 0,
        });

        let place = Place {
            name,
            image_uri: self.image.unwrap_or_default(),
            short_description: self.short_description.unwrap_or_default(),
            long_description: self.long_description.unwrap_or_default(),
            rating: self.rating.unwrap_or(0.0),
            review_count,
            address: self.address.unwrap_or_default(),
            coordinates,
            website_uri: self.website_uri,
            translated_description: None,
            translated_review_summary: None,
            accessibility: None,
        };
        Some(place.normalized())
    }
}
