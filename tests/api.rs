//! End-to-end HTTP and WebSocket scenarios against a server bound to an
//! ephemeral port.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

use tab_settle::api;
use tab_settle::app_state::AppState;
use tab_settle::domain::{EventBus, SeatStore, SessionRepository};
use tab_settle::service::{SeatService, SessionService};

struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let seats = Arc::new(SeatStore::new());
        let session_service = Arc::new(SessionService::new(
            Arc::new(SessionRepository::new()),
            Arc::clone(&seats),
            EventBus::new(256),
            None,
        ));
        let seat_service = Arc::new(SeatService::new(seats, None));
        let app = api::build_app(
            AppState::new(session_service, seat_service),
            Duration::from_secs(10),
        );

        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let Ok(resp) = self.client.post(self.url(path)).json(&body).send().await else {
            panic!("POST {path} failed");
        };
        let status = resp.status();
        let Ok(body) = resp.json::<Value>().await else {
            panic!("POST {path} returned no JSON");
        };
        (status, body)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let Ok(resp) = self.client.get(self.url(path)).send().await else {
            panic!("GET {path} failed");
        };
        let status = resp.status();
        let Ok(body) = resp.json::<Value>().await else {
            panic!("GET {path} returned no JSON");
        };
        (status, body)
    }

    async fn open_session(&self, order_id: &str, total: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/sessions",
                json!({ "order_id": order_id, "total_amount": total }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let Some(id) = body["id"].as_str() else {
            panic!("session without id: {body}");
        };
        id.to_string()
    }
}

fn part_ids(split: &Value) -> Vec<String> {
    let Some(parts) = split["parts"].as_array() else {
        panic!("split without parts: {split}");
    };
    parts
        .iter()
        .filter_map(|p| p["id"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn equal_split_settles_the_bill() {
    let server = TestServer::start().await;
    let session_id = server.open_session("order-100", "100.00").await;

    let (status, again) = server
        .post(
            "/api/v1/sessions",
            json!({ "order_id": "order-100", "total_amount": 100 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["id"], session_id.as_str());

    let (status, split) = server
        .post(
            &format!("/api/v1/sessions/{session_id}/splits"),
            json!({ "strategy": "equal", "number_of_parts": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let amounts: Vec<&str> = split["parts"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|p| p["amount"].as_str())
        .collect();
    assert_eq!(amounts, ["33.34", "33.33", "33.33"]);
    assert_eq!(split["parts"][0]["name"], "Pessoa 1");

    let parts = part_ids(&split);
    for (i, part_id) in parts.iter().enumerate() {
        let (status, paid) = server
            .post(
                &format!("/api/v1/parts/{part_id}/pay"),
                json!({ "method": "card" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let expected = if i + 1 == parts.len() { "completed" } else { "open" };
        assert_eq!(paid["session"]["status"], expected);
    }

    let (_, session) = server.get(&format!("/api/v1/sessions/{session_id}")).await;
    assert_eq!(session["paid_amount"], "100.00");
    assert_eq!(session["remaining_amount"], "0.00");
    assert_eq!(session["active_split"]["is_settled"], true);

    let Some(first) = parts.first() else {
        panic!("no parts");
    };
    let (status, err) = server
        .post(
            &format!("/api/v1/parts/{first}/pay"),
            json!({ "method": "card" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], 4005);
}

#[tokio::test]
async fn overpayment_is_rejected_with_details() {
    let server = TestServer::start().await;
    let session_id = server.open_session("order-50", "50.00").await;
    let path = format!("/api/v1/sessions/{session_id}/payments");

    let (status, first) = server
        .post(&path, json!({ "method": "cash", "amount": "30.00" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["session"]["remaining_amount"], "20.00");

    let (status, err) = server
        .post(&path, json!({ "method": "cash", "amount": "30.00" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"]["code"], 4001);
    assert_eq!(err["error"]["details"]["remaining"], "20.00");

    let (status, list) = server.get(&path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn malformed_amounts_are_invalid_amount() {
    let server = TestServer::start().await;
    let (status, err) = server
        .post(
            "/api/v1/sessions",
            json!({ "order_id": "order-x", "total_amount": "10.005" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["code"], 1002);

    let session_id = server.open_session("order-y", "10.00").await;
    let (status, err) = server
        .post(
            &format!("/api/v1/sessions/{session_id}/payments"),
            json!({ "method": "cash", "amount": "ten" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["code"], 1002);
}

#[tokio::test]
async fn custom_split_must_reconcile() {
    let server = TestServer::start().await;
    let session_id = server.open_session("order-custom", "100.00").await;

    let (status, err) = server
        .post(
            &format!("/api/v1/sessions/{session_id}/splits"),
            json!({ "strategy": "custom", "parts": [
                { "name": "Ana", "amount": "40.00" },
                { "name": "Bia", "amount": "40.00" },
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"]["code"], 4002);
    assert_eq!(err["error"]["details"]["delta"], "20.00");

    let (status, _) = server
        .get(&format!("/api/v1/sessions/{session_id}/split"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn seat_split_prices_each_seat() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post(
            "/api/v1/sessions",
            json!({
                "order_id": "order-seats",
                "total_amount": "70.00",
                "items": [
                    { "id": "burger", "name": "Burger", "unit_price": "25.00", "quantity": 2 },
                    { "id": "fries", "name": "Fries", "unit_price": "20.00", "quantity": 1 },
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let Some(session_id) = body["id"].as_str() else {
        panic!("no session id");
    };

    let mut seat_ids = Vec::new();
    for number in [1, 2] {
        let (status, seat) = server
            .post("/api/v1/tables/t9/seats", json!({ "number": number }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let Some(id) = seat["seat"]["id"].as_str() else {
            panic!("no seat id");
        };
        seat_ids.push(id.to_string());
        let (status, _) = server
            .post(
                &format!("/api/v1/seats/{id}/items"),
                json!({ "order_item_id": "burger" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, conflict) = server
        .post("/api/v1/tables/t9/seats", json!({ "number": 1 }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict["error"]["code"], 2006);

    let (status, split) = server
        .post(
            &format!("/api/v1/sessions/{session_id}/splits"),
            json!({ "strategy": "seat", "seat_ids": seat_ids }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{split}");
    let amounts: Vec<&str> = split["parts"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|p| p["amount"].as_str())
        .collect();
    assert_eq!(amounts, ["35.00", "35.00"]);
    assert_eq!(split["parts"][0]["name"], "Seat 1");

    let (_, seats) = server.get("/api/v1/tables/t9/seats").await;
    assert_eq!(seats["data"][0]["seat"]["status"], "occupied");
}

#[tokio::test]
async fn websocket_streams_session_events() {
    let server = TestServer::start().await;
    let session_id = server.open_session("order-ws", "20.00").await;

    let Ok((mut ws, _)) = tokio_tungstenite::connect_async(format!("ws://{}/ws", server.addr)).await
    else {
        panic!("ws connect failed");
    };
    let subscribe = json!({
        "id": "sub-1",
        "type": "command",
        "timestamp": chrono::Utc::now(),
        "payload": { "command": "subscribe", "session_ids": [session_id] },
    });
    let Ok(()) = ws.send(Message::text(subscribe.to_string())).await else {
        panic!("ws send failed");
    };
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "response");
    assert_eq!(reply["id"], "sub-1");

    let (status, _) = server
        .post(
            &format!("/api/v1/sessions/{session_id}/payments"),
            json!({ "method": "pix", "amount": "20.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let recorded = next_json(&mut ws).await;
    assert_eq!(recorded["type"], "event");
    assert_eq!(recorded["payload"]["event_type"], "payment_recorded");
    let completed = next_json(&mut ws).await;
    assert_eq!(completed["payload"]["event_type"], "session_completed");
    assert_eq!(completed["payload"]["paid_amount"], "20.00");
}

async fn next_json<S>(ws: &mut S) -> Value
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), ws.next()).await;
        let Ok(Some(Ok(msg))) = next else {
            panic!("no ws message");
        };
        if let Message::Text(text) = msg {
            let Ok(value) = serde_json::from_str::<Value>(&text) else {
                panic!("ws message is not JSON");
            };
            return value;
        }
    }
}

#[tokio::test]
async fn health_and_catalogs() {
    let server = TestServer::start().await;
    let (status, health) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");

    let (status, strategies) = server.get("/config/split-strategies").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(strategies.as_array().map(Vec::len), Some(3));

    let (status, doc) = server.get("/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/v1/sessions"].is_object());
}
