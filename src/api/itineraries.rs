//! Itinerary routes

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::itinerary::GeneratedItinerary;
use crate::models::Itinerary;

#[derive(Debug, Deserialize)]
pub struct StopsRequest {
    #[serde(default)]
    pub places: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub itinerary: Itinerary,
    /// Set when the itinerary was stored but the saved places could not be cleared
    pub clear_error: Option<String>,
}

/// Stateless stop generation for an explicit name list
pub async fn post_itinerary(
    State(session): State<AppState>,
    Json(request): Json<StopsRequest>,
) -> Result<Json<GeneratedItinerary>, ApiError> {
    let generated = session.composer().request_stops(&request.places).await?;
    Ok(Json(generated))
}

pub async fn plan_itinerary(
    State(session): State<AppState>,
) -> Result<(StatusCode, Json<PlanResponse>), ApiError> {
    let outcome = session.plan_itinerary().await?;
    let response = PlanResponse {
        itinerary: outcome.itinerary,
        clear_error: outcome.clear_error.map(|e| e.to_string()),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_itineraries(
    State(session): State<AppState>,
) -> Result<Json<Vec<Itinerary>>, ApiError> {
    Ok(Json(session.itineraries().list().await?))
}

pub async fn get_itinerary(
    State(session): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Itinerary>, ApiError> {
    session
        .itineraries()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Itinerary {id}")))
}

pub async fn delete_itinerary(
    State(session): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if session.itineraries().delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Itinerary {id}")))
    }
}
