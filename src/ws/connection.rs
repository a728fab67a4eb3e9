//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered events.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::api::dto::SessionResponse;
use crate::domain::{SessionEvent, SessionId};
use crate::service::SessionService;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards events of subscribed sessions from the [`broadcast::Receiver`].
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<SessionEvent>,
    session_service: Arc<SessionService>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs, &session_service).await;
                        if let Some(resp_json) = encode(&response)
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(session_event) => {
                        if subs.matches(&session_event) {
                            let msg = WsMessage::new(
                                uuid::Uuid::new_v4().to_string(),
                                WsMessageType::Event,
                                serde_json::to_value(&session_event).unwrap_or_default(),
                            );
                            if let Some(json) = encode(&msg)
                                && ws_tx.send(Message::text(json)).await.is_err() {
                                    break;
                                }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

fn encode(msg: &WsMessage) -> Option<String> {
    serde_json::to_string(msg).ok()
}

/// Handles a text message from the client and builds the reply.
async fn handle_text_message(
    text: &str,
    subs: &mut SubscriptionManager,
    session_service: &SessionService,
) -> WsMessage {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return WsMessage::error("", 400, "malformed JSON");
    };
    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return WsMessage::error(msg.id, 404, "unknown command");
    };

    match command {
        WsCommand::Subscribe {
            session_ids,
            event_types,
        } => {
            if let Some(kinds) = &event_types
                && let Err(e) = subs.set_event_types(kinds)
            {
                return WsMessage::error(msg.id, 400, e.to_string());
            }
            let (ids, wildcard) = parse_ids(&session_ids);
            subs.subscribe(&ids, wildcard);
            WsMessage::new(
                msg.id,
                WsMessageType::Response,
                serde_json::json!({
                    "subscribed": ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                    "event_types": subs.event_types(),
                }),
            )
        }
        WsCommand::Unsubscribe { session_ids } => {
            let (ids, wildcard) = parse_ids(&session_ids);
            subs.unsubscribe(&ids, wildcard);
            WsMessage::new(
                msg.id,
                WsMessageType::Response,
                serde_json::json!({
                    "unsubscribed": ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "remaining_count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::GetSession { session_id } => {
            let Ok(uuid) = session_id.parse::<uuid::Uuid>() else {
                return WsMessage::error(msg.id, 400, "invalid session_id");
            };
            match session_service
                .get_session(SessionId::from_uuid(uuid))
                .await
            {
                Ok(session) => WsMessage::new(
                    msg.id,
                    WsMessageType::Response,
                    serde_json::to_value(SessionResponse::from(&session)).unwrap_or_default(),
                ),
                Err(e) => WsMessage::error(msg.id, e.status_code().as_u16(), e.to_string()),
            }
        }
    }
}

/// Splits raw ids into parsed session ids and the wildcard flag.
/// Unparseable entries are ignored.
fn parse_ids(raw: &[String]) -> (Vec<SessionId>, bool) {
    let mut ids = Vec::new();
    let mut wildcard = false;
    for s in raw {
        if s == "*" {
            wildcard = true;
        } else if let Ok(uuid) = s.parse::<uuid::Uuid>() {
            ids.push(SessionId::from_uuid(uuid));
        }
    }
    (ids, wildcard)
}
