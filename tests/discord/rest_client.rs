use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::discord_harness::client;

#[tokio::test]
async fn requests_carry_bot_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway/bot"))
        .and(header("Authorization", "Bot test-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "url": "wss://gateway.example" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let url = client(&server).gateway_url().await.unwrap();

    assert_eq!(url, "wss://gateway.example");
    server.verify().await;
}

#[tokio::test]
async fn rate_limited_request_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/channels/10/messages/1"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/channels/10/messages/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).delete_message("10", "1").await.unwrap();

    server.verify().await;
}

#[tokio::test]
async fn rate_limit_wait_can_come_from_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/channels/10/messages/1"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({ "retry_after": 0.0, "global": false })),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/channels/10/messages/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).delete_message("10", "1").await.unwrap();

    server.verify().await;
}

#[tokio::test]
async fn persistent_rate_limit_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/channels/10/messages/1"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(4)
        .mount(&server)
        .await;

    let err = client(&server)
        .delete_message("10", "1")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("still rate limited"));
    server.verify().await;
}

#[tokio::test]
async fn failed_request_reports_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/channels/10/messages/1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Unknown Message"))
        .mount(&server)
        .await;

    let err = client(&server)
        .delete_message("10", "1")
        .await
        .unwrap_err();

    let text = format!("{err:#}");
    assert!(text.contains("404"));
    assert!(text.contains("Unknown Message"));
}

#[tokio::test]
async fn guild_command_registration_overwrites_in_bulk() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/applications/55/guilds/66/commands"))
        .and(body_json(json!([{ "name": "gallery-channels" }])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .register_commands("55", Some("66"), &[json!({ "name": "gallery-channels" })])
        .await
        .unwrap();

    server.verify().await;
}
