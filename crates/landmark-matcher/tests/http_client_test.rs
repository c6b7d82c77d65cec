//! Wire contract tests for the HTTP matcher client.

use std::time::Duration;

use landmark_core::{Error, ErrorKind, Match, MatchClient, TreeId};
use landmark_matcher::{HttpMatchClient, MatcherConfig};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpMatchClient {
    HttpMatchClient::new(MatcherConfig::new(server.uri())).expect("client")
}

#[tokio::test]
async fn test_register_posts_filename_and_point() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/process"))
        .and(body_json(json!({"filename": "1-2.jpg", "x": 12.5, "y": 40.0})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"keypointId": "kp-1", "treeId": "t-9"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let reg = client_for(&server)
        .register("1-2.jpg", 12.5, 40.0)
        .await
        .unwrap();
    assert_eq!(reg.keypoint_id.as_str(), "kp-1");
    assert_eq!(reg.tree_id, Some(TreeId::new("t-9")));
}

#[tokio::test]
async fn test_register_numeric_ids_and_null_tree() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"keypointId": 1017, "treeId": null})),
        )
        .mount(&server)
        .await;

    let reg = client_for(&server).register("a.jpg", 0.0, 0.0).await.unwrap();
    assert_eq!(reg.keypoint_id.as_str(), "1017");
    assert!(reg.tree_id.is_none());
}

#[tokio::test]
async fn test_query_sends_tree_ids_and_keeps_rank_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_json(json!({"filename": "q.jpg", "tree_ids": ["t-1", "7"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                {"id": "kp-3", "score": 0.2},
                {"id": 11, "score": 0.95}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let matches = client_for(&server)
        .query("q.jpg", &[TreeId::new("t-1"), TreeId::new("7")])
        .await
        .unwrap();
    assert_eq!(matches, vec![Match::new("kp-3", 0.2), Match::new("11", 0.95)]);
}

#[tokio::test]
async fn test_query_accepts_legacy_keypoint_ids() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keypointIds": [4, 2]})))
        .mount(&server)
        .await;

    let matches = client_for(&server)
        .query("q.jpg", &[TreeId::new("t")])
        .await
        .unwrap();
    assert_eq!(matches, vec![Match::new("4", 0.0), Match::new("2", 0.0)]);
}

#[tokio::test]
async fn test_query_null_matches_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"matches": null})))
        .mount(&server)
        .await;

    let matches = client_for(&server)
        .query("q.jpg", &[TreeId::new("t")])
        .await
        .unwrap();
    assert!(matches.is_empty());
}

#[tokio::test]
async fn test_non_success_status_is_matcher_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("index corrupted"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .query("q.jpg", &[TreeId::new("t")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Matcher(_)));
    assert!(err.to_string().contains("500"));
    assert_eq!(err.kind(), ErrorKind::DelegatedServiceFailure);
}

#[tokio::test]
async fn test_slow_matcher_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/process"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"keypointId": "kp-1"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = HttpMatchClient::new(
        MatcherConfig::new(server.uri()).with_timeout(Duration::from_millis(200)),
    )
    .unwrap();
    let err = client.register("a.jpg", 0.0, 0.0).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "got {:?}", err);
    assert_eq!(err.kind(), ErrorKind::DelegatedServiceFailure);
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(client_for(&server).health_check().await.unwrap());
}

#[tokio::test]
async fn test_health_check_unhealthy_on_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(!client_for(&server).health_check().await.unwrap());
}
