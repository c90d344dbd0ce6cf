//! HttpGateway and HttpStatusRecorder against a fake gateway server

mod common;

use axum::http::StatusCode;
use serde_json::json;
use wapair_core::{
    GatewayClient, GatewayConfig, GatewayError, HttpGateway, HttpStatusRecorder, RecordError,
    SessionId, StatusRecorder,
};

fn gateway() -> HttpGateway {
    HttpGateway::new(&GatewayConfig::default()).unwrap()
}

// ==================== Create Tests ====================

#[tokio::test]
async fn create_instance_sends_instance_name() {
    let fake = common::spawn_fake_gateway().await;
    fake.state.reply_to_create(
        StatusCode::OK,
        json!({ "data": { "id": 7, "status": "created", "api": "x" } }),
    );

    let created = gateway().create_instance(&fake.url(), "shop1").await.unwrap();

    assert_eq!(created.id, SessionId::new(7));
    assert_eq!(created.status, "created");
    assert_eq!(fake.state.created_names(), vec!["shop1"]);
}

#[tokio::test]
async fn create_instance_data_zero_is_unexpected() {
    let fake = common::spawn_fake_gateway().await;
    fake.state.reply_to_create(StatusCode::OK, json!({ "data": 0 }));

    let result = gateway().create_instance(&fake.url(), "shop1").await;

    assert!(matches!(result, Err(GatewayError::UnexpectedResponse(_))));
}

#[tokio::test]
async fn create_instance_non_ok_status_is_unexpected() {
    let fake = common::spawn_fake_gateway().await;
    fake.state
        .reply_to_create(StatusCode::BAD_GATEWAY, json!({ "error": "upstream" }));

    let result = gateway().create_instance(&fake.url(), "shop1").await;

    assert!(matches!(result, Err(GatewayError::UnexpectedResponse(_))));
}

// ==================== Pairing Tests ====================

#[tokio::test]
async fn request_pairing_returns_artifact() {
    let fake = common::spawn_fake_gateway().await;

    let artifact = gateway()
        .request_pairing(&fake.url(), SessionId::new(7))
        .await
        .unwrap();

    assert_eq!(artifact.as_str(), common::PNG_ARTIFACT);
    let png = artifact.decode_image().unwrap();
    assert_eq!(&png[1..4], b"PNG");
}

#[tokio::test]
async fn request_pairing_refusals_are_pairing_unavailable() {
    let fake = common::spawn_fake_gateway().await;
    let gateway = gateway();
    let replies = [
        (StatusCode::OK, json!({ "data": 0 })),
        (StatusCode::OK, json!({ "base64": "" })),
        (StatusCode::OK, json!({})),
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "base64": "AAA" })),
    ];

    for (status, body) in replies {
        fake.state.reply_to_connect(status, body.clone());
        let result = gateway.request_pairing(&fake.url(), SessionId::new(7)).await;
        assert!(
            matches!(result, Err(GatewayError::PairingUnavailable(_))),
            "reply {status} {body}"
        );
    }
}

// ==================== Poll Tests ====================

#[tokio::test]
async fn poll_state_returns_literal_token() {
    let fake = common::spawn_fake_gateway().await;
    fake.state.queue_states(&["connecting", "open"]);
    let gateway = gateway();

    let first = gateway.poll_state(&fake.url(), SessionId::new(7)).await.unwrap();
    let second = gateway.poll_state(&fake.url(), SessionId::new(7)).await.unwrap();

    assert_eq!(first, "connecting");
    assert_eq!(second, "open");
}

#[tokio::test]
async fn poll_state_server_error_is_poll_error() {
    let fake = common::spawn_fake_gateway().await;
    fake.state.queue_poll_failures(1);

    let result = gateway().poll_state(&fake.url(), SessionId::new(7)).await;

    assert!(matches!(result, Err(GatewayError::Poll(_))));
}

// ==================== Recorder Tests ====================

#[tokio::test]
async fn recorder_posts_open_status() {
    let fake = common::spawn_fake_gateway().await;
    let recorder = HttpStatusRecorder::new(fake.url(), &GatewayConfig::default()).unwrap();

    recorder
        .record_open(SessionId::new(7), "http://h1", "open")
        .await
        .unwrap();

    assert_eq!(
        fake.state.records(),
        vec![json!({ "nome": 7, "status": "open", "host": "http://h1" })]
    );
}

#[tokio::test]
async fn recorder_posts_the_given_status_token() {
    let fake = common::spawn_fake_gateway().await;
    let recorder = HttpStatusRecorder::new(fake.url(), &GatewayConfig::default()).unwrap();

    recorder
        .record_open(SessionId::new(7), "http://h1", "CONNECTED")
        .await
        .unwrap();

    assert_eq!(
        fake.state.records(),
        vec![json!({ "nome": 7, "status": "CONNECTED", "host": "http://h1" })]
    );
}

#[tokio::test]
async fn recorder_non_ok_is_rejected() {
    let fake = common::spawn_fake_gateway().await;
    fake.state.reject_records(StatusCode::INTERNAL_SERVER_ERROR);
    let recorder = HttpStatusRecorder::new(fake.url(), &GatewayConfig::default()).unwrap();

    let result = recorder
        .record_open(SessionId::new(7), "http://h1", "open")
        .await;

    assert_eq!(result, Err(RecordError::Rejected(500)));
}
