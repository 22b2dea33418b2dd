use std::sync::Arc;

use axum::{
    body::Body,
    http::{self, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::create_app;
use crate::payout::SimulatedPayout;
use crate::state::{AppState, SharedState};
use crate::store::{MemoryStore, Store};

pub const OWNER: &str = "0x52908400098527886e0f7030069857d2e4169ee7";
pub const OTHER_OWNER: &str = "0x00000000219ab540356cbb839cbe05303d7705fa";
pub const WALLET: &str = "0x8ba1f109551bd432803012645ac136ddd64dba72";
pub const OTHER_WALLET: &str = "0xab5801a7d398351b8be11c439e05c5b3259aec9b";
pub const SESSION_KEY: &str =
    "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

pub fn test_app() -> (Router, SharedState) {
    test_app_with_payout_delay(std::time::Duration::ZERO)
}

/// In-memory store, no cache, payouts confirming after `delay`.
pub fn test_app_with_payout_delay(delay: std::time::Duration) -> (Router, SharedState) {
    let state = Arc::new(AppState {
        store: Store::Memory(MemoryStore::new()),
        cache: None,
        payout: SimulatedPayout::new(delay),
    });
    (create_app(state.clone()), state)
}

pub async fn paid_rewards(state: &SharedState, campaign_id: &str) -> usize {
    state
        .store
        .list_participants(campaign_id)
        .await
        .unwrap()
        .iter()
        .filter(|p| p.reward_paid)
        .count()
}

/// Sends one request and decodes the body as JSON (or a JSON string for
/// plain-text rejections).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri).method(method);

    let body = match body {
        Some(json) => {
            request = request.header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
            Body::from(serde_json::to_string(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    (status, body)
}

/// Window running from `start_hours` to `end_hours` relative to now.
pub fn window(start_hours: i64, end_hours: i64) -> (String, String) {
    let now = Utc::now();
    (
        (now + Duration::hours(start_hours)).to_rfc3339(),
        (now + Duration::hours(end_hours)).to_rfc3339(),
    )
}

pub fn instant_campaign(title: &str, number_of_winners: u32) -> Value {
    let (start, end) = window(-1, 24 * 7 - 1);
    json!({
        "owner": OWNER,
        "title": title,
        "description": "Follow and join to get paid",
        "startDate": start,
        "endDate": end,
        "rewardType": "instant",
        "instantReward": { "amountPerWinner": "0.1", "numberOfWinners": number_of_winners },
        "tasks": [
            { "type": "x-follow", "url": "https://twitter.com/touzi" },
            { "type": "tg-join", "label": "Say hi on Telegram", "url": "https://t.me/touzi" }
        ],
        "sessionPrivateKey": SESSION_KEY
    })
}

pub fn giveaway_campaign(title: &str) -> Value {
    let (start, end) = window(-1, 23);
    json!({
        "owner": OWNER,
        "title": title,
        "startDate": start,
        "endDate": end,
        "rewardType": "giveaway",
        "prizeTiers": [
            { "name": "1st place", "amount": "0.5", "winners": 1 },
            { "name": "", "amount": "0.1", "winners": 5 }
        ],
        "tasks": [{ "type": "discord-join", "url": "https://discord.gg/touzi" }]
    })
}

/// Creates the campaign and returns its view, panicking on anything but 201.
pub async fn create(app: &Router, payload: Value) -> Value {
    let (status, body) = send(app, Method::POST, "/campaign", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body
}

pub async fn join(app: &Router, campaign_id: &str, wallet: &str, extra: Value) -> (StatusCode, Value) {
    let mut payload = json!({ "walletAddress": wallet });
    if let (Some(target), Value::Object(extra)) = (payload.as_object_mut(), extra) {
        target.extend(extra);
    }

    send(
        app,
        Method::POST,
        &format!("/campaign/{}/participants", campaign_id),
        Some(payload),
    )
    .await
}
