//! Gateway connection for the gallery bot.
//!
//! Every connection identifies from scratch; the bot keeps no state worth
//! resuming, so a reconnect request or an invalid session just ends the
//! connection and the supervisor opens a new one.

use anyhow::{Context, Result};
use futures_util::{SinkExt, Stream, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_tungstenite::tungstenite::{self, Message};

use super::Interaction;
use super::source::parse_message;
use super::types::{GATEWAY_QUERY, INTERACTION_APPLICATION_COMMAND, Opcode};
use crate::gallery::GalleryMessage;

/// Discord asks for a 1-5 second pause before identifying again.
const INVALID_SESSION_PAUSE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Ready { user_id: String },
    Message(GalleryMessage),
    Command(Interaction),
}

#[derive(Debug, PartialEq)]
enum Frame {
    Hello { heartbeat_ms: u64 },
    Dispatch {
        sequence: Option<i64>,
        event: Option<GatewayEvent>,
    },
    HeartbeatRequest,
    HeartbeatAck,
    Reconnect,
    InvalidSession,
    Ignored,
}

fn decode_frame(raw: &str) -> Result<Frame> {
    let payload: Value = serde_json::from_str(raw).context("parse Discord gateway payload")?;
    let op = payload
        .get("op")
        .and_then(Value::as_u64)
        .and_then(Opcode::from_code);

    Ok(match op {
        Some(Opcode::Hello) => Frame::Hello {
            heartbeat_ms: payload
                .pointer("/d/heartbeat_interval")
                .and_then(Value::as_u64)
                .context("Hello without heartbeat_interval")?,
        },
        Some(Opcode::Dispatch) => Frame::Dispatch {
            sequence: payload.get("s").and_then(Value::as_i64),
            event: payload
                .get("t")
                .and_then(Value::as_str)
                .zip(payload.get("d"))
                .and_then(|(name, data)| decode_event(name, data)),
        },
        Some(Opcode::Heartbeat) => Frame::HeartbeatRequest,
        Some(Opcode::HeartbeatAck) => Frame::HeartbeatAck,
        Some(Opcode::Reconnect) => Frame::Reconnect,
        Some(Opcode::InvalidSession) => Frame::InvalidSession,
        Some(Opcode::Identify) | None => Frame::Ignored,
    })
}

/// The dispatch events the bot acts on; everything else is dropped.
pub fn decode_event(name: &str, data: &Value) -> Option<GatewayEvent> {
    match name {
        "READY" => data
            .pointer("/user/id")
            .and_then(Value::as_str)
            .map(|id| GatewayEvent::Ready {
                user_id: id.to_string(),
            }),
        "MESSAGE_CREATE" => parse_message(data).map(GatewayEvent::Message),
        "INTERACTION_CREATE" => parse_command_interaction(data).map(GatewayEvent::Command),
        _ => None,
    }
}

/// Slash-command interactions only; components, autocomplete and pings are
/// not used by the bot.
fn parse_command_interaction(d: &Value) -> Option<Interaction> {
    if d.get("type").and_then(Value::as_u64) != Some(INTERACTION_APPLICATION_COMMAND) {
        return None;
    }
    // Guild interactions carry the user under `member`, DMs at the top level.
    let user_id = d
        .pointer("/member/user/id")
        .or_else(|| d.pointer("/user/id"))
        .and_then(Value::as_str)?;

    Some(Interaction {
        id: d.get("id")?.as_str()?.to_string(),
        token: d.get("token")?.as_str()?.to_string(),
        application_id: d
            .get("application_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        user_id: user_id.to_string(),
        data: d.get("data").cloned().unwrap_or(Value::Null),
    })
}

/// Heartbeat bookkeeping for one connection. A beat that is still
/// unacknowledged when the next one is due marks the connection dead.
#[derive(Debug, Default)]
struct Heartbeat {
    sequence: Option<i64>,
    awaiting_ack: bool,
}

impl Heartbeat {
    fn frame(&self) -> Message {
        text_frame(&json!({ "op": Opcode::Heartbeat.code(), "d": self.sequence }))
    }
}

fn text_frame(payload: &Value) -> Message {
    Message::Text(payload.to_string().into())
}

pub struct GatewaySession {
    bot_token: String,
    intents: u64,
    presence: Option<Value>,
}

impl GatewaySession {
    pub fn new(bot_token: String, intents: u64, presence: Option<Value>) -> Self {
        Self {
            bot_token,
            intents,
            presence,
        }
    }

    fn identify_frame(&self) -> Message {
        let mut data = json!({
            "token": self.bot_token,
            "intents": self.intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "gallerist",
                "device": "gallerist",
            },
        });
        if let Some(presence) = &self.presence {
            data["presence"] = presence.clone();
        }
        text_frame(&json!({ "op": Opcode::Identify.code(), "d": data }))
    }

    /// Run one connection, forwarding events to `events`.
    ///
    /// `Ok(())` means Discord ended the session normally and the caller
    /// should connect again.
    pub async fn run(&self, gateway_url: &str, events: &mpsc::Sender<GatewayEvent>) -> Result<()> {
        let url = format!("{}/?{GATEWAY_QUERY}", gateway_url.trim_end_matches('/'));
        let (socket, _) = tokio_tungstenite::connect_async(&url)
            .await
            .with_context(|| format!("connect Discord gateway {url}"))?;
        let (mut sink, mut stream) = socket.split();

        let heartbeat_ms = loop {
            match next_frame(&mut stream).await? {
                Some(Frame::Hello { heartbeat_ms }) => break heartbeat_ms,
                Some(_) => {}
                None => anyhow::bail!("Discord gateway closed before Hello"),
            }
        };
        sink.send(self.identify_frame())
            .await
            .context("send Discord identify")?;

        let mut ticker = interval(Duration::from_millis(heartbeat_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        let mut heartbeat = Heartbeat::default();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if heartbeat.awaiting_ack {
                        tracing::warn!("Discord heartbeat not acknowledged; reconnecting");
                        return Ok(());
                    }
                    sink.send(heartbeat.frame()).await.context("send Discord heartbeat")?;
                    heartbeat.awaiting_ack = true;
                }
                frame = next_frame(&mut stream) => {
                    let Some(frame) = frame? else {
                        tracing::warn!("Discord gateway closed; reconnecting");
                        return Ok(());
                    };
                    match frame {
                        Frame::Dispatch { sequence, event } => {
                            if sequence.is_some() {
                                heartbeat.sequence = sequence;
                            }
                            if let Some(event) = event {
                                events.send(event).await.context("forward Discord event")?;
                            }
                        }
                        Frame::HeartbeatRequest => {
                            sink.send(heartbeat.frame()).await.context("send Discord heartbeat")?;
                        }
                        Frame::HeartbeatAck => heartbeat.awaiting_ack = false,
                        Frame::Reconnect => {
                            tracing::info!("Discord requested a reconnect");
                            return Ok(());
                        }
                        Frame::InvalidSession => {
                            tracing::warn!("Discord invalidated the session; identifying again");
                            tokio::time::sleep(INVALID_SESSION_PAUSE).await;
                            return Ok(());
                        }
                        Frame::Hello { .. } | Frame::Ignored => {}
                    }
                }
            }
        }
    }
}

/// Next decodable frame, or `None` once the socket is closed.
async fn next_frame<S>(stream: &mut S) -> Result<Option<Frame>>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(message) = stream.next().await {
        let raw = match message.context("read Discord gateway frame")? {
            Message::Text(text) => text.to_string(),
            Message::Binary(bytes) => {
                String::from_utf8(bytes.to_vec()).context("gateway frame is not UTF-8")?
            }
            Message::Close(_) => return Ok(None),
            _ => continue,
        };
        return decode_frame(&raw).map(Some);
    }
    Ok(None)
}
