//! End-to-end test over real sockets: the full router bound to an ephemeral
//! port with in-memory backends and JWT-authenticated agents.

#![allow(clippy::panic)]

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use common::{AGENT_1, CONVERSATION, CUSTOMER, FakeDomain, ORG};
use parley_gateway::app_state::AppState;
use parley_gateway::build_app;
use parley_gateway::bus::MemoryBus;
use parley_gateway::config::GatewayConfig;
use parley_gateway::persistence::MemoryStore;
use parley_gateway::service::JwtVerifier;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SECRET: &str = "e2e-secret";

async fn serve() -> SocketAddr {
    let state = AppState::new(
        GatewayConfig::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryBus::new(256)),
        Arc::new(FakeDomain::default()),
        Arc::new(JwtVerifier::new(SECRET)),
    );
    let Ok(_dispatch) = state.start_dispatch().await else {
        panic!("bus subscription failed");
    };
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, build_app(state)).await;
    });
    addr
}

fn agent_token(user_id: i64) -> String {
    let claims = json!({
        "sub": user_id,
        "organization_id": ORG,
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    let Ok(token) = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    ) else {
        panic!("token encoding failed");
    };
    token
}

async fn open(addr: SocketAddr, path_and_query: &str) -> Socket {
    let Ok((socket, _)) = connect_async(format!("ws://{addr}{path_and_query}")).await else {
        panic!("upgrade of {path_and_query} failed");
    };
    socket
}

/// Next JSON text frame, or `None` on close or two seconds of silence.
async fn next_frame(socket: &mut Socket) -> Option<Value> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), socket.next())
            .await
            .ok()??
            .ok()?;
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            Message::Close(_) => return None,
            _ => {}
        }
    }
}

async fn expect_event(socket: &mut Socket, name: &str) -> Value {
    while let Some(frame) = next_frame(socket).await {
        if frame["payload"]["event"] == json!(name) {
            return frame;
        }
    }
    panic!("{name} never arrived");
}

#[tokio::test]
async fn chat_round_trip_over_websockets() {
    let addr = serve().await;
    let http = reqwest::Client::new();

    let Ok(health) = http.get(format!("http://{addr}/health")).send().await else {
        panic!("health request failed");
    };
    assert_eq!(health.status(), StatusCode::OK);

    let mut agent = open(addr, &format!("/ws/agent?token={}", agent_token(AGENT_1))).await;
    let connected = expect_event(&mut agent, "connected").await;
    assert_eq!(connected["type"], json!("response"));
    assert_eq!(connected["payload"]["data"]["actor_id"], json!(AGENT_1));

    let mut customer = open(
        addr,
        &format!(
            "/ws/customer?customer_id={CUSTOMER}&organization_id={ORG}&conversation_id={CONVERSATION}"
        ),
    )
    .await;
    let connected = expect_event(&mut customer, "connected").await;
    let Some(customer_sid) = connected["payload"]["data"]["sid"].as_str().map(str::to_string)
    else {
        panic!("connected frame without sid");
    };

    let landed = expect_event(&mut agent, "customer_land").await;
    assert_eq!(landed["type"], json!("event"));
    assert_eq!(landed["payload"]["data"]["customer_id"], json!(CUSTOMER));

    let Ok(accepted) = http
        .post(format!("http://{addr}/api/v1/events/message"))
        .json(&json!({
            "event": "receive_message",
            "organization_id": ORG,
            "conversation_id": CONVERSATION,
            "is_customer": false,
            "message": {"id": 501, "body": "how can I help?"},
        }))
        .send()
        .await
    else {
        panic!("publish request failed");
    };
    assert_eq!(accepted.status(), StatusCode::ACCEPTED);

    let reply = expect_event(&mut customer, "receive_message").await;
    assert_eq!(
        reply["payload"]["data"]["message"]["body"],
        json!("how can I help?")
    );
    expect_event(&mut agent, "receive_message").await;

    let Ok(()) = customer.send(Message::text(r#"{"event":"ping"}"#)).await else {
        panic!("ping send failed");
    };
    let pong = expect_event(&mut customer, "pong").await;
    assert_eq!(pong["type"], json!("response"));

    let Ok(members) = http
        .get(format!(
            "http://{addr}/api/v1/conversations/{CONVERSATION}/members"
        ))
        .send()
        .await
    else {
        panic!("members request failed");
    };
    let Ok(members) = members.json::<Value>().await else {
        panic!("members body is not json");
    };
    assert_eq!(members["members"], json!([customer_sid]));

    let Ok(()) = customer.close(None).await else {
        panic!("close failed");
    };
    let offline = expect_event(&mut agent, "customer_disconnected").await;
    assert_eq!(offline["payload"]["data"]["mode"], json!("offline"));
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let addr = serve().await;
    let http = reqwest::Client::new();

    let mut forged = open(addr, "/ws/agent?token=not-a-jwt").await;
    let Some(frame) = next_frame(&mut forged).await else {
        panic!("no rejection frame");
    };
    assert_eq!(frame["type"], json!("error"));
    assert_eq!(frame["payload"]["event"], json!("connect_error"));
    assert!(next_frame(&mut forged).await.is_none());

    let Ok(unknown) = http
        .post(format!("http://{addr}/api/v1/events/bogus"))
        .json(&json!({"event": "x", "organization_id": ORG}))
        .send()
        .await
    else {
        panic!("request failed");
    };
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let Ok(malformed) = http
        .post(format!("http://{addr}/api/v1/events/message"))
        .json(&json!({"event": "receive_message", "organization_id": ORG}))
        .send()
        .await
    else {
        panic!("request failed");
    };
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    let Ok(body) = malformed.json::<Value>().await else {
        panic!("error body is not json");
    };
    assert_eq!(body["error"]["code"], json!(1002));

    let Ok(stats) = http.get(format!("http://{addr}/stats")).send().await else {
        panic!("stats request failed");
    };
    let Ok(stats) = stats.json::<Value>().await else {
        panic!("stats body is not json");
    };
    assert_eq!(stats["connections"][0]["connections"], json!(0));
}
