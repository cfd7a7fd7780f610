//! Accessibility classification through a chat completion service
//!
//! The completion model is asked for a JSON object with exactly four boolean
//! keys. Its free-text answer is searched for the first balanced `{...}`
//! substring, which is then validated strictly. Classification is total: any
//! failure along the way yields `AccessibilityInfo::none()`.

use futures::future::join_all;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::config::AccessibilityConfig;
use crate::models::{AccessibilityInfo, Place};
use crate::upstream::{self, endpoint};

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that provides accessibility information in JSON format.";

/// Why a classification fell back to the all-false record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("place name is empty")]
    EmptyName,
    #[error("no API key configured")]
    MissingApiKey,
    #[error("service unreachable: {0}")]
    Unreachable(String),
    #[error("service answered status {0}")]
    Status(u16),
    #[error("response is not a chat completion: {0}")]
    InvalidEnvelope(String),
    #[error("response has no message content")]
    MissingContent,
    #[error("no JSON object in response text")]
    NoJsonObject,
    #[error("JSON object does not match the accessibility schema: {0}")]
    Schema(String),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

fn user_prompt(place_name: &str) -> String {
    format!(
        "Provide accessibility information for {place_name}. Include details on physical, sensory, \
         cognitive accessibility, and inclusive amenities. Output the information in JSON format \
         with only the following keys: {}. Set the values to true or false based on the \
         availability of these features.",
        AccessibilityInfo::KEYS.join(", ")
    )
}

/// Returns the first balanced `{...}` substring, ignoring braces inside string literals.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parses free-form completion text into a strictly validated record
pub fn parse_accessibility(text: &str) -> std::result::Result<AccessibilityInfo, ClassifyError> {
    let object = extract_json_object(text).ok_or(ClassifyError::NoJsonObject)?;
    serde_json::from_str(object).map_err(|e| ClassifyError::Schema(e.to_string()))
}

/// Classifies places by name
pub struct AccessibilityClassifier {
    client: ClientWithMiddleware,
    url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    concurrent: bool,
}

impl AccessibilityClassifier {
    pub fn new(config: &AccessibilityConfig, max_retries: u32) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds.into());
        let client = upstream::build_json_client(timeout, max_retries)?;
        Ok(Self::with_client(client, config))
    }

    #[must_use]
    pub fn with_client(client: ClientWithMiddleware, config: &AccessibilityConfig) -> Self {
        if config.api_key.is_none() {
            warn!("No accessibility API key configured, places will carry no accessibility info");
        }
        Self {
            client,
            url: endpoint(&config.base_url, "chat/completions"),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            concurrent: config.concurrent,
        }
    }

    /// Never fails: every error is logged and replaced by the all-false record
    #[instrument(skip(self))]
    pub async fn classify(&self, place_name: &str) -> AccessibilityInfo {
        match self.try_classify(place_name).await {
            Ok(info) => {
                debug!("Accessibility for {}: {:?}", place_name, info.supported());
                info
            }
            Err(err) => {
                warn!("Accessibility classification failed for {}: {}", place_name, err);
                AccessibilityInfo::none()
            }
        }
    }

    /// Classification with the failure reason kept
    pub async fn try_classify(
        &self,
        place_name: &str,
    ) -> std::result::Result<AccessibilityInfo, ClassifyError> {
        let place_name = place_name.trim();
        if place_name.is_empty() {
            return Err(ClassifyError::EmptyName);
        }
        let api_key = self.api_key.as_deref().ok_or(ClassifyError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(place_name),
                },
            ],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifyError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ClassifyError::Unreachable(e.to_string()))?;
        let envelope: ChatResponse = serde_json::from_slice(&body)
            .map_err(|e| ClassifyError::InvalidEnvelope(e.to_string()))?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or(ClassifyError::MissingContent)?;

        parse_accessibility(&content)
    }

    /// Attaches an accessibility record to every place, one by one unless
    /// concurrent classification is configured.
    #[instrument(skip(self, places), fields(count = places.len(), concurrent = self.concurrent))]
    pub async fn classify_all(&self, mut places: Vec<Place>) -> Vec<Place> {
        if self.concurrent {
            let results = join_all(places.iter().map(|place| self.classify(&place.name))).await;
            for (place, info) in places.iter_mut().zip(results) {
                place.accessibility = Some(info);
            }
        } else {
            for place in &mut places {
                place.accessibility = Some(self.classify(&place.name).await);
            }
        }

        let classified = places
            .iter()
            .filter(|p| p.accessibility.is_some_and(|a| a.has_any()))
            .count();
        info!(
            "{} of {} places report accessibility support",
            classified,
            places.len()
        );
        places
    }
}
