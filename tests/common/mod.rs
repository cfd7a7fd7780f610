//! In-process stand-ins for the upstream services
//!
//! One axum server answers the ideas, detail, itinerary and chat completion
//! endpoints from canned data and counts every request it receives.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use wanderlens::WanderlensConfig;

#[derive(Default)]
pub struct Hits {
    pub ideas: AtomicUsize,
    pub detail: AtomicUsize,
    pub chat: AtomicUsize,
    pub itinerary: AtomicUsize,
}

impl Hits {
    pub fn ideas(&self) -> usize {
        self.ideas.load(Ordering::SeqCst)
    }
    pub fn detail(&self) -> usize {
        self.detail.load(Ordering::SeqCst)
    }
    pub fn chat(&self) -> usize {
        self.chat.load(Ordering::SeqCst)
    }
    pub fn itinerary(&self) -> usize {
        self.itinerary.load(Ordering::SeqCst)
    }
}

/// Canned answers. Anything without an answer gets HTTP 500.
#[derive(Default)]
pub struct Upstream {
    /// Body of the ideas service
    pub ideas: Option<Value>,
    /// Detail body per place name
    pub details: HashMap<String, Value>,
    /// Chat completion message content per place name
    pub chat: HashMap<String, String>,
    /// Whole chat completion body per place name, sent verbatim with HTTP 200
    pub chat_bodies: HashMap<String, String>,
    /// Pause before every chat completion answer
    pub chat_delay: Option<Duration>,
    /// Body of the itinerary service
    pub itinerary: Option<Value>,
    pub hits: Hits,
    pub prompts: Mutex<Vec<String>>,
    pub images: Mutex<Vec<ReceivedImage>>,
    pub itinerary_requests: Mutex<Vec<Value>>,
}

/// Image part as the ideas service received it
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedImage {
    pub size: usize,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

pub struct MockServer {
    pub base_url: String,
    pub upstream: Arc<Upstream>,
}

impl MockServer {
    pub async fn start(upstream: Upstream) -> Self {
        let upstream = Arc::new(upstream);
        let app = Router::new()
            .route("/get_ideas", post(ideas))
            .route("/get_detail", post(detail))
            .route("/get_itinerary", post(itinerary))
            .route("/chat/completions", post(chat))
            .layer(DefaultBodyLimit::disable())
            .with_state(upstream.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            upstream,
        }
    }

    pub fn hits(&self) -> &Hits {
        &self.upstream.hits
    }

    /// Config pointing every upstream at this server
    pub fn config(&self) -> WanderlensConfig {
        let mut config = WanderlensConfig::default();
        config.services.base_url = self.base_url.clone();
        config.accessibility.base_url = self.base_url.clone();
        config.accessibility.api_key = Some("test-key".to_string());
        config
    }
}

/// Base URL of a port nothing listens on
pub async fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn failure() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response()
}

async fn ideas(State(upstream): State<Arc<Upstream>>, mut multipart: Multipart) -> Response {
    upstream.hits.ideas.fetch_add(1, Ordering::SeqCst);
    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name() {
            Some("prompt") => {
                let prompt = field.text().await.unwrap_or_default();
                upstream.prompts.lock().await.push(prompt);
            }
            Some("image") => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let size = field.bytes().await.map(|b| b.len()).unwrap_or_default();
                upstream.images.lock().await.push(ReceivedImage {
                    size,
                    content_type,
                    file_name,
                });
            }
            _ => {}
        }
    }
    match &upstream.ideas {
        Some(body) => Json(body.clone()).into_response(),
        None => failure(),
    }
}

async fn detail(State(upstream): State<Arc<Upstream>>, mut multipart: Multipart) -> Response {
    upstream.hits.detail.fetch_add(1, Ordering::SeqCst);
    let mut place = String::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("place") {
            place = field.text().await.unwrap_or_default();
        }
    }
    match upstream.details.get(&place) {
        Some(body) => Json(body.clone()).into_response(),
        None => failure(),
    }
}

async fn itinerary(State(upstream): State<Arc<Upstream>>, Json(body): Json<Value>) -> Response {
    upstream.hits.itinerary.fetch_add(1, Ordering::SeqCst);
    upstream.itinerary_requests.lock().await.push(body);
    match &upstream.itinerary {
        Some(body) => Json(body.clone()).into_response(),
        None => failure(),
    }
}

async fn chat(State(upstream): State<Arc<Upstream>>, Json(body): Json<Value>) -> Response {
    upstream.hits.chat.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = upstream.chat_delay {
        tokio::time::sleep(delay).await;
    }
    let prompt = body["messages"][1]["content"].as_str().unwrap_or_default();
    if let Some((_, raw)) = upstream
        .chat_bodies
        .iter()
        .find(|(name, _)| prompt.contains(name.as_str()))
    {
        return ([(header::CONTENT_TYPE, "application/json")], raw.clone()).into_response();
    }
    let content = upstream
        .chat
        .iter()
        .find(|(name, _)| prompt.contains(name.as_str()))
        .map(|(_, content)| content.clone());
    match content {
        Some(content) => Json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        }))
        .into_response(),
        None => failure(),
    }
}

pub fn place_record(name: &str, lat: f64, lng: f64) -> Value {
    json!({
        "name": name,
        "googleMapPhotoUri": format!("https://photos.example/{}.jpg", name.replace(' ', "_")),
        "short_description": format!("{name} in short"),
        "longDescription": format!("{name} at length"),
        "globalRating": 4.6,
        "reviews": ["Great", "Crowded"],
        "address": "Paris, France",
        "location": {"latitude": lat, "longitude": lng},
        "websiteUri": "https://example.org"
    })
}

/// Canned all-true accessibility answer wrapped in chatter
pub fn accessible_answer() -> String {
    "Here is the information:\n{\"Physical Accessibility\": true, \"Sensory Accessibility\": true, \
     \"Cognitive Accessibility\": false, \"Inclusive Amenities\": true}"
        .to_string()
}
