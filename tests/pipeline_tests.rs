//! Recommendation flow against in-process upstream services

mod common;

use std::collections::HashMap;
use std::time::Duration;

use serde_json::json;

use common::{
    MockServer, ReceivedImage, Upstream, accessible_answer, closed_base_url, place_record,
};
use wanderlens::upstream::{build_client, build_json_client};
use wanderlens::{
    AccessibilityClassifier, AccessibilityInfo, ClassifyError, DetailEnricher, ImageUpload, Query,
    QueryDispatcher, Service, Session, UpstreamFailure, WanderlensError,
};

fn paris_ideas() -> serde_json::Value {
    json!({
        "place_details": {
            "Louvre Museum": place_record("Louvre Museum", 48.8606, 2.3376),
            "Musee d'Orsay": place_record("Musee d'Orsay", 48.86, 2.3266),
            "Centre Pompidou": place_record("Centre Pompidou", 48.8607, 2.3522)
        }
    })
}

fn prompt(text: &str) -> Query {
    Query::new(Some(text.to_string()), None).unwrap()
}

#[tokio::test]
async fn test_paris_museums_with_one_failed_detail_lookup() {
    let mut details = HashMap::new();
    details.insert(
        "Louvre Museum".to_string(),
        json!({"description": "Le plus grand musée", "review_summary": "Immense et superbe"}),
    );
    details.insert(
        "Centre Pompidou".to_string(),
        json!({"description": "Art moderne", "review_summary": "Architecture audacieuse"}),
    );
    let server = MockServer::start(Upstream {
        ideas: Some(paris_ideas()),
        details,
        ..Upstream::default()
    })
    .await;

    let session = Session::in_memory(&server.config()).unwrap();
    let places = session.recommend(prompt("Paris museums")).await.unwrap();

    let names: Vec<_> = places.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Louvre Museum", "Musee d'Orsay", "Centre Pompidou"]);

    assert_eq!(
        places[0].translated_description.as_deref(),
        Some("Le plus grand musée")
    );
    assert_eq!(
        places[2].translated_review_summary.as_deref(),
        Some("Architecture audacieuse")
    );
    assert!(places[1].translated_description.is_none());
    assert!(places[1].translated_review_summary.is_none());
    assert_eq!(places[1].long_description, "Musee d'Orsay at length");
    assert_eq!(places[1].review_count, 2);

    // no chat answers configured, so every place falls back to all-false
    for place in &places {
        assert_eq!(place.accessibility, Some(AccessibilityInfo::none()));
    }

    assert_eq!(server.hits().ideas(), 1);
    assert_eq!(server.hits().detail(), 3);
    assert_eq!(server.hits().chat(), 3);
    assert_eq!(
        server.upstream.prompts.lock().await.as_slice(),
        ["Paris museums".to_string()]
    );

    assert_eq!(session.places().read().await, Some(places));
}

#[tokio::test]
async fn test_enrichment_keeps_length_when_every_lookup_fails() {
    let server = MockServer::start(Upstream {
        ideas: Some(paris_ideas()),
        ..Upstream::default()
    })
    .await;
    let dispatcher =
        QueryDispatcher::with_client(build_client(Duration::from_secs(10)).unwrap(), &server.base_url);
    let enricher =
        DetailEnricher::with_client(build_client(Duration::from_secs(10)).unwrap(), &server.base_url);

    let places = dispatcher.dispatch(prompt("museums")).await.unwrap();
    let enriched = enricher.enrich(places.clone()).await;

    assert_eq!(enriched, places);
    assert_eq!(server.hits().detail(), 3);
}

#[tokio::test]
async fn test_image_only_query_forwards_the_image_part() {
    let server = MockServer::start(Upstream {
        ideas: Some(paris_ideas()),
        ..Upstream::default()
    })
    .await;
    let dispatcher =
        QueryDispatcher::with_client(build_client(Duration::from_secs(10)).unwrap(), &server.base_url);

    let image = ImageUpload::new(vec![0x89; 2048], "image/png", "skyline.png").unwrap();
    let places = dispatcher
        .dispatch(Query::new(None, Some(image)).unwrap())
        .await
        .unwrap();

    assert_eq!(places.len(), 3);
    assert!(server.upstream.prompts.lock().await.is_empty());
    assert_eq!(
        server.upstream.images.lock().await.as_slice(),
        [ReceivedImage {
            size: 2048,
            content_type: Some("image/png".to_string()),
            file_name: Some("skyline.png".to_string()),
        }]
    );
}

#[tokio::test]
async fn test_ideas_failure_is_an_upstream_error_and_keeps_the_store() {
    let server = MockServer::start(Upstream::default()).await;
    let session = Session::in_memory(&server.config()).unwrap();

    let err = session.recommend(prompt("Rome")).await.unwrap_err();
    assert!(matches!(
        err,
        WanderlensError::Upstream {
            service: Service::Ideas,
            failure: UpstreamFailure::Status(500)
        }
    ));
    assert_eq!(server.hits().detail(), 0);
    assert_eq!(session.places().read().await, None);
}

#[tokio::test]
async fn test_unreachable_ideas_service() {
    let base_url = closed_base_url().await;
    let dispatcher =
        QueryDispatcher::with_client(build_client(Duration::from_secs(5)).unwrap(), &base_url);

    let err = dispatcher.dispatch(prompt("Rome")).await.unwrap_err();
    assert!(matches!(
        err,
        WanderlensError::Upstream {
            service: Service::Ideas,
            failure: UpstreamFailure::Unreachable(_)
        }
    ));
}

#[tokio::test]
async fn test_ideas_body_without_place_details_is_an_empty_list() {
    let server = MockServer::start(Upstream {
        ideas: Some(json!({"status": "ok"})),
        ..Upstream::default()
    })
    .await;
    let session = Session::in_memory(&server.config()).unwrap();

    let places = session.recommend(prompt("nothing")).await.unwrap();
    assert!(places.is_empty());
    assert_eq!(session.places().read().await, Some(Vec::new()));
}

#[tokio::test]
async fn test_ideas_body_of_the_wrong_shape_is_an_invalid_response() {
    let server = MockServer::start(Upstream {
        ideas: Some(json!({"place_details": ["not", "a", "map"]})),
        ..Upstream::default()
    })
    .await;
    let session = Session::in_memory(&server.config()).unwrap();

    let err = session.recommend(prompt("anything")).await.unwrap_err();
    assert!(matches!(
        err,
        WanderlensError::InvalidResponse {
            service: Service::Ideas,
            ..
        }
    ));
}

#[tokio::test]
async fn test_accessibility_http_500_falls_back_to_all_false() {
    let server = MockServer::start(Upstream::default()).await;
    let config = server.config();
    let classifier = AccessibilityClassifier::with_client(
        build_json_client(Duration::from_secs(5), 0).unwrap(),
        &config.accessibility,
    );

    let info = classifier.classify("Eiffel Tower").await;
    assert_eq!(info, AccessibilityInfo::none());
    assert_eq!(server.hits().chat(), 1);
}

#[tokio::test]
async fn test_accessibility_answers() {
    let mut chat = HashMap::new();
    chat.insert("Eiffel Tower".to_string(), accessible_answer());
    chat.insert(
        "Catacombs".to_string(),
        "I am not sure about this place.".to_string(),
    );
    chat.insert(
        "Sainte-Chapelle".to_string(),
        "{\"Physical Accessibility\": true, \"Wheelchair\": true}".to_string(),
    );
    let server = MockServer::start(Upstream {
        chat,
        ..Upstream::default()
    })
    .await;
    let config = server.config();
    let classifier = AccessibilityClassifier::with_client(
        build_json_client(Duration::from_secs(5), 0).unwrap(),
        &config.accessibility,
    );

    let tower = classifier.classify("Eiffel Tower").await;
    assert!(tower.physical && tower.sensory && tower.inclusive_amenities);
    assert!(!tower.cognitive);

    assert_eq!(
        classifier.classify("Catacombs").await,
        AccessibilityInfo::none()
    );
    assert_eq!(
        classifier.classify("Sainte-Chapelle").await,
        AccessibilityInfo::none()
    );
}

#[tokio::test]
async fn test_accessibility_without_api_key_makes_no_request() {
    let server = MockServer::start(Upstream::default()).await;
    let mut config = server.config();
    config.accessibility.api_key = None;
    let classifier = AccessibilityClassifier::with_client(
        build_json_client(Duration::from_secs(5), 0).unwrap(),
        &config.accessibility,
    );

    assert_eq!(
        classifier.classify("Eiffel Tower").await,
        AccessibilityInfo::none()
    );
    assert_eq!(server.hits().chat(), 0);
}

#[tokio::test]
async fn test_concurrent_classification_attaches_every_result() {
    let mut chat = HashMap::new();
    chat.insert("Louvre Museum".to_string(), accessible_answer());
    let server = MockServer::start(Upstream {
        ideas: Some(paris_ideas()),
        chat,
        ..Upstream::default()
    })
    .await;
    let mut config = server.config();
    config.accessibility.concurrent = true;
    let session = Session::in_memory(&config).unwrap();

    let places = session.recommend(prompt("Paris museums")).await.unwrap();
    assert!(places[0].accessibility.is_some_and(|a| a.has_any()));
    assert_eq!(places[1].accessibility, Some(AccessibilityInfo::none()));
    assert_eq!(places[2].accessibility, Some(AccessibilityInfo::none()));
    assert_eq!(server.hits().chat(), 3);
}

#[tokio::test]
async fn test_accessibility_unreachable_service_falls_back_to_all_false() {
    let server = MockServer::start(Upstream::default()).await;
    let mut config = server.config();
    config.accessibility.base_url = closed_base_url().await;
    let classifier = AccessibilityClassifier::with_client(
        build_json_client(Duration::from_secs(5), 0).unwrap(),
        &config.accessibility,
    );

    assert!(matches!(
        classifier.try_classify("Eiffel Tower").await,
        Err(ClassifyError::Unreachable(_))
    ));
    assert_eq!(
        classifier.classify("Eiffel Tower").await,
        AccessibilityInfo::none()
    );
}

#[tokio::test]
async fn test_accessibility_timeout_falls_back_to_all_false() {
    let mut chat = HashMap::new();
    chat.insert("Eiffel Tower".to_string(), accessible_answer());
    let server = MockServer::start(Upstream {
        chat,
        chat_delay: Some(Duration::from_secs(5)),
        ..Upstream::default()
    })
    .await;
    let config = server.config();
    let classifier = AccessibilityClassifier::with_client(
        build_json_client(Duration::from_millis(300), 0).unwrap(),
        &config.accessibility,
    );

    assert!(matches!(
        classifier.try_classify("Eiffel Tower").await,
        Err(ClassifyError::Unreachable(_))
    ));
    assert_eq!(
        classifier.classify("Eiffel Tower").await,
        AccessibilityInfo::none()
    );
}

#[tokio::test]
async fn test_accessibility_malformed_envelopes_fall_back_to_all_false() {
    let mut chat_bodies = HashMap::new();
    chat_bodies.insert("Catacombs".to_string(), r#"{"choices": []}"#.to_string());
    chat_bodies.insert(
        "Sainte-Chapelle".to_string(),
        r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": null}}]}"#
            .to_string(),
    );
    chat_bodies.insert("Pantheon".to_string(), "<html>gateway</html>".to_string());
    let server = MockServer::start(Upstream {
        chat_bodies,
        ..Upstream::default()
    })
    .await;
    let config = server.config();
    let classifier = AccessibilityClassifier::with_client(
        build_json_client(Duration::from_secs(5), 0).unwrap(),
        &config.accessibility,
    );

    assert_eq!(
        classifier.try_classify("Catacombs").await,
        Err(ClassifyError::MissingContent)
    );
    assert_eq!(
        classifier.try_classify("Sainte-Chapelle").await,
        Err(ClassifyError::MissingContent)
    );
    assert!(matches!(
        classifier.try_classify("Pantheon").await,
        Err(ClassifyError::InvalidEnvelope(_))
    ));

    for name in ["Catacombs", "Sainte-Chapelle", "Pantheon"] {
        assert_eq!(classifier.classify(name).await, AccessibilityInfo::none());
    }
}
