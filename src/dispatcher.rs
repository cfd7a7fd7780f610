//! Query dispatch to the idea generation service
//!
//! Turns a photo and/or a free-text prompt into the raw list of candidate
//! places. The call is made once, never retried, and given a multi-minute
//! timeout because the service runs heavy inference before it answers.

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::ServicesConfig;
use crate::error::Service;
use crate::models::{Place, RawPlaceRecord};
use crate::upstream::{self, endpoint};
use crate::{Result, WanderlensError};

/// Largest accepted image, 4.5 MB
pub const MAX_IMAGE_BYTES: usize = 4_718_592;

/// An image attached to a query
#[derive(Debug, Clone)]
pub struct ImageUpload {
    bytes: Vec<u8>,
    mime: String,
    file_name: String,
}

impl ImageUpload {
    /// Validates MIME type and size; nothing is sent yet.
    pub fn new(
        bytes: Vec<u8>,
        mime: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Result<Self> {
        let mime = mime.into();
        if !mime.starts_with("image/") {
            return Err(WanderlensError::validation(format!(
                "Please upload an image file (got '{mime}')"
            )));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(WanderlensError::validation(format!(
                "Image size must be less than 4.5MB (got {} bytes)",
                bytes.len()
            )));
        }
        let file_name = file_name.into();
        let file_name = if file_name.trim().is_empty() {
            "image".to_string()
        } else {
            file_name
        };
        Ok(Self {
            bytes,
            mime,
            file_name,
        })
    }

    /// Reads an image from disk, inferring the MIME type from the extension
    pub async fn from_path(path: &Path) -> Result<Self> {
        let mime = mime_from_extension(path).ok_or_else(|| {
            WanderlensError::validation(format!(
                "Unsupported image extension: {}",
                path.display()
            ))
        })?;
        let metadata = tokio::fs::metadata(path).await?;
        if metadata.len() > MAX_IMAGE_BYTES as u64 {
            return Err(WanderlensError::validation(format!(
                "Image size must be less than 4.5MB (got {} bytes)",
                metadata.len()
            )));
        }
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(bytes, mime, file_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_string_lossy().to_ascii_lowercase();
    let mime = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime)
}

/// A validated user query: a prompt, an image, or both
#[derive(Debug, Clone)]
pub struct Query {
    prompt: Option<String>,
    image: Option<ImageUpload>,
}

impl Query {
    /// Blank prompts count as absent. Fails when neither prompt nor image remains.
    pub fn new(prompt: Option<String>, image: Option<ImageUpload>) -> Result<Self> {
        let prompt = prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        if prompt.is_none() && image.is_none() {
            return Err(WanderlensError::validation(
                "Please provide either an image or a prompt",
            ));
        }

        Ok(Self { prompt, image })
    }

    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    #[must_use]
    pub fn image(&self) -> Option<&ImageUpload> {
        self.image.as_ref()
    }

    fn into_form(self) -> Result<Form> {
        let mut form = Form::new();
        if let Some(image) = self.image {
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.mime)
                .map_err(|e| WanderlensError::validation(format!("Invalid image type: {e}")))?;
            form = form.part("image", part);
        }
        if let Some(prompt) = self.prompt {
            form = form.text("prompt", prompt);
        }
        Ok(form)
    }
}

#[derive(Debug, Deserialize)]
struct IdeasResponse {
    #[serde(default)]
    place_details: Option<Map<String, Value>>,
}

/// Client for the idea generation service
pub struct QueryDispatcher {
    client: Client,
    url: String,
}

impl QueryDispatcher {
    pub fn new(config: &ServicesConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.ideas_timeout_seconds.into());
        let client = upstream::build_client(timeout)?;
        Ok(Self::with_client(client, &config.base_url))
    }

    #[must_use]
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            url: endpoint(base_url, "get_ideas"),
        }
    }

    /// Sends the query and returns the candidate places in the order the service listed them
    #[instrument(skip(self, query), fields(has_prompt = query.prompt.is_some(), has_image = query.image.is_some()))]
    pub async fn dispatch(&self, query: Query) -> Result<Vec<Place>> {
        info!("Requesting ideas");
        let start_time = Instant::now();

        let form = query.into_form()?;
        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| upstream::transport_error(Service::Ideas, &e))?;

        let response = upstream::ensure_success(Service::Ideas, response).await?;
        let ideas: IdeasResponse = upstream::read_json(Service::Ideas, response).await?;
        let places = collect_places(ideas.place_details.unwrap_or_default());

        info!(
            "Received {} places in {:.3}s",
            places.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(places)
    }
}

/// Converts the keyed records, keeping their order and the coordinate uniqueness invariant
fn collect_places(records: Map<String, Value>) -> Vec<Place> {
    let mut places: Vec<Place> = Vec::with_capacity(records.len());

    for (key, value) in records {
        let mut raw: RawPlaceRecord = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Skipping malformed place record '{}': {}", key, e);
                continue;
            }
        };
        if raw.name.as_deref().is_none_or(|name| name.trim().is_empty()) {
            raw.name = Some(key.clone());
        }

        let Some(place) = raw.into_place() else {
            warn!("Skipping place record '{}' without name or coordinates", key);
            continue;
        };

        if places.iter().any(|p| p.coordinates == place.coordinates) {
            warn!(
                "Skipping '{}', coordinates {} already used by another place",
                place.name,
                place.key()
            );
            continue;
        }

        debug!("Candidate place: {} at {}", place.name, place.key());
        places.push(place);
    }

    places
}
