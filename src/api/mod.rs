use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::session::Session;

mod error;
mod itineraries;
mod places;

pub use error::ApiError;
pub use itineraries::PlanResponse;
pub use places::PlaceNameRequest;

pub type AppState = Arc<Session>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ideas", post(places::post_ideas))
        .route("/details", post(places::post_details))
        .route("/accessibility", post(places::post_accessibility))
        .route("/itinerary", post(itineraries::post_itinerary))
        .route(
            "/places",
            get(places::get_places).delete(places::delete_places),
        )
        .route("/places/{coordinates}", get(places::get_place))
        .route("/saved", get(places::get_saved).post(places::post_saved))
        .route("/saved/{name}", delete(places::delete_saved))
        .route(
            "/itineraries",
            get(itineraries::list_itineraries).post(itineraries::plan_itinerary),
        )
        .route(
            "/itineraries/{id}",
            get(itineraries::get_itinerary).delete(itineraries::delete_itinerary),
        )
}
