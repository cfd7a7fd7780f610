//! Recommendation, enrichment and place routes

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::WanderlensError;
use crate::dispatcher::{ImageUpload, Query};
use crate::models::{AccessibilityInfo, CoordinateKey, Place, PlaceDetails};
use crate::saved::SavedPlace;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceNameRequest {
    #[serde(default)]
    pub place_name: String,
}

impl PlaceNameRequest {
    fn name(&self) -> Result<&str, WanderlensError> {
        let name = self.place_name.trim();
        if name.is_empty() {
            return Err(WanderlensError::validation("Place name is required"));
        }
        Ok(name)
    }
}

fn bad_multipart(err: MultipartError) -> WanderlensError {
    WanderlensError::validation(format!("Malformed upload: {}", err.body_text()))
}

pub async fn post_ideas(
    State(session): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<Place>>, ApiError> {
    let mut prompt = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "prompt" => prompt = Some(field.text().await.map_err(bad_multipart)?),
            "image" => {
                let mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                if !bytes.is_empty() {
                    image = Some(ImageUpload::new(bytes.to_vec(), mime, file_name)?);
                }
            }
            other => tracing::debug!("Ignoring upload field '{}'", other),
        }
    }

    let query = Query::new(prompt, image)?;
    Ok(Json(session.recommend(query).await?))
}

pub async fn post_details(
    State(session): State<AppState>,
    Json(request): Json<PlaceNameRequest>,
) -> Result<Json<PlaceDetails>, ApiError> {
    let details = session.pipeline().enricher().fetch(request.name()?).await?;
    Ok(Json(details))
}

pub async fn post_accessibility(
    State(session): State<AppState>,
    Json(request): Json<PlaceNameRequest>,
) -> Result<Json<AccessibilityInfo>, ApiError> {
    let info = session
        .pipeline()
        .classifier()
        .classify(request.name()?)
        .await;
    Ok(Json(info))
}

pub async fn get_places(State(session): State<AppState>) -> Json<Option<Vec<Place>>> {
    Json(session.places().read().await)
}

pub async fn get_place(
    State(session): State<AppState>,
    Path(coordinates): Path<String>,
) -> Result<Json<Place>, ApiError> {
    let key: CoordinateKey = coordinates.parse()?;
    session
        .places()
        .find_by_coordinates(&key)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Place at {key}")))
}

pub async fn delete_places(State(session): State<AppState>) -> StatusCode {
    session.places().clear().await;
    StatusCode::NO_CONTENT
}

pub async fn get_saved(
    State(session): State<AppState>,
) -> Result<Json<Vec<SavedPlace>>, ApiError> {
    Ok(Json(session.saved().list().await?))
}

pub async fn post_saved(
    State(session): State<AppState>,
    Json(place): Json<Place>,
) -> Result<(StatusCode, Json<Place>), ApiError> {
    let place = place.normalized();
    if place.name.trim().is_empty() {
        return Err(WanderlensError::validation("Place name is required").into());
    }
    let added = session.saved().save(place.clone()).await?;
    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(place)))
}

pub async fn delete_saved(
    State(session): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    if session.saved().unsave(&name).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Saved place '{name}'")))
    }
}
