#![allow(dead_code)]

use std::env;
use std::sync::{Arc, Once};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value as JsonValue;
use tower::ServiceExt;
use uuid::Uuid;

use exam_backend::middleware::auth::Claims;
use exam_backend::middleware::rate_limit::RateLimiter;
use exam_backend::store::MemoryStore;
use exam_backend::AppState;

static INIT: Once = Once::new();

pub fn init_test_config() {
    INIT.call_once(|| {
        env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
        env::set_var("JWT_SECRET", "test_secret_key");
        env::set_var("STORAGE_BACKEND", "memory");
        env::set_var("API_RPS", "1000");
        exam_backend::config::init_config().expect("init config");
    });
}

pub fn memory_state() -> AppState {
    AppState::from_store(Arc::new(MemoryStore::new()))
}

pub fn test_app() -> Router {
    init_test_config();
    exam_backend::routes::create_router(memory_state(), RateLimiter::per_second(1000))
}

pub fn bearer(user_id: Uuid, role: Option<&str>) -> String {
    let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
    let token = encode(
        &Header::default(),
        &Claims {
            sub: user_id.to_string(),
            exp,
            role: role.map(str::to_string),
        },
        &EncodingKey::from_secret(
            exam_backend::config::get_config().jwt_secret.as_bytes(),
        ),
    )
    .expect("sign token");
    format!("Bearer {}", token)
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
