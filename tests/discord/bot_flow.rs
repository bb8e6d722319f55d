use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gallerist::Config;
use gallerist::app::services::{GalleryServices, discord_source};
use gallerist::gallery::{MessageOutcome, warning_text};
use gallerist::store::{ConfigStore, InMemoryConfigStore};
use gallerist::transport::discord::source::parse_message;
use gallerist::transport::discord::{GalleryBot, Interaction};

use crate::discord_harness::{TOKEN, client, raw_message};

async fn bot(server: &MockServer, galleries: &str) -> (GalleryBot, Arc<dyn ConfigStore>) {
    let mut config = Config::default();
    config.discord.bot_token = TOKEN.into();
    config.discord.application_id = Some("55".into());
    config.gallery.warning_delete_after_secs = 0;

    let store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
    if !galleries.is_empty() {
        store.upsert("gallery_channels", galleries).await.unwrap();
    }

    let http = client(server);
    let services = GalleryServices::assemble(&config, Arc::clone(&store), discord_source(&http));
    let bot = GalleryBot::new(
        config.discord.clone(),
        http,
        services.enforcer,
        services.router,
    );
    (bot, store)
}

fn interaction(data: serde_json::Value) -> Interaction {
    Interaction {
        id: "77".into(),
        token: "itok".into(),
        application_id: None,
        user_id: "7".into(),
        data,
    }
}

#[tokio::test]
async fn gallery_text_is_warned_deleted_and_warning_removed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/channels/10/messages"))
        .and(body_partial_json(json!({ "content": warning_text("7") })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(raw_message(900, "10", "bot", "warning")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/channels/10/messages/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/channels/10/messages/900"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (bot, _) = bot(&server, "10").await;
    let message = parse_message(&raw_message(1, "10", "7", "hello")).unwrap();

    let Some(MessageOutcome::Remediated(remediation)) = bot.handle_message(&message).await else {
        panic!("expected remediation");
    };
    assert!(remediation.original_deleted);
    remediation.cleanup.finished().await;

    server.verify().await;
}

#[tokio::test]
async fn add_interaction_is_deferred_then_answered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions/77/itok/callback"))
        .and(body_json(json!({ "type": 5 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/webhooks/55/itok/messages/@original"))
        .and(body_json(json!({ "content": "✅ Gallery successfully added." })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "901" })))
        .expect(1)
        .mount(&server)
        .await;

    let (bot, store) = bot(&server, "").await;
    bot.handle_interaction(&interaction(json!({
        "name": "gallery-channels",
        "options": [{
            "name": "add",
            "type": 1,
            "options": [{ "name": "channel", "type": 7, "value": "10" }],
        }],
        "resolved": { "channels": { "10": { "id": "10", "type": 0 } } },
    })))
    .await;

    assert_eq!(store.get("gallery_channels").await.unwrap().unwrap().value, "10");
    server.verify().await;
}

#[tokio::test]
async fn malformed_interaction_gets_failure_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/interactions/77/itok/callback"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/webhooks/55/itok/messages/@original"))
        .and(body_json(json!({ "content": "❌ Something went wrong." })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "901" })))
        .expect(1)
        .mount(&server)
        .await;

    let (bot, _) = bot(&server, "").await;
    bot.handle_interaction(&interaction(json!({
        "name": "gallery-channels",
        "options": [{ "name": "rename", "type": 1 }],
    })))
    .await;

    server.verify().await;
}

/// Gateway that says hello, reports the identify payload, then reports when
/// the client side of the socket goes away.
async fn one_shot_gateway() -> (String, oneshot::Receiver<Value>, oneshot::Receiver<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (identified_tx, identified_rx) = oneshot::channel();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let hello = json!({ "op": 10, "d": { "heartbeat_interval": 60_000 } });
        ws.send(Message::text(hello.to_string())).await.unwrap();

        let identify = ws.next().await.unwrap().unwrap();
        let identify: Value = serde_json::from_str(identify.to_text().unwrap()).unwrap();
        let _ = identified_tx.send(identify);

        while let Some(Ok(_)) = ws.next().await {}
        let _ = closed_tx.send(());
    });

    (url, identified_rx, closed_rx)
}

#[tokio::test]
async fn dropping_listen_closes_the_gateway_socket() {
    let (gateway, identified, closed) = one_shot_gateway().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway/bot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "url": gateway })))
        .mount(&server)
        .await;

    let (bot, _) = bot(&server, "").await;
    let bot = Arc::new(bot);
    let listening = tokio::spawn(async move { bot.listen().await });

    let identify = tokio::time::timeout(Duration::from_secs(5), identified)
        .await
        .expect("bot never identified")
        .unwrap();
    assert_eq!(identify["op"], 2);
    assert_eq!(identify["d"]["token"], TOKEN);

    listening.abort();
    tokio::time::timeout(Duration::from_secs(5), closed)
        .await
        .expect("gateway socket outlived listen")
        .unwrap();
}
