//! Axum-based mock identity issuer
//!
//! Each test starts its own issuer on an ephemeral port so that responses and
//! request counters never leak between tests. The issuer serves a token
//! endpoint, a JWKS endpoint and a userinfo endpoint, all answering with
//! whatever the test configured last.

use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What the issuer answers, and what it has seen
#[derive(Clone)]
pub struct MockIssuerState {
    token_status: Arc<Mutex<StatusCode>>,
    token_body: Arc<Mutex<Value>>,
    jwks_body: Arc<Mutex<Value>>,
    userinfo_body: Arc<Mutex<Value>>,

    token_requests: Arc<AtomicUsize>,
    jwks_requests: Arc<AtomicUsize>,
    userinfo_requests: Arc<AtomicUsize>,

    last_token_form: Arc<Mutex<HashMap<String, String>>>,
    last_token_authorization: Arc<Mutex<Option<String>>>,
    last_userinfo_authorization: Arc<Mutex<Option<String>>>,
}

impl Default for MockIssuerState {
    fn default() -> Self {
        Self {
            token_status: Arc::new(Mutex::new(StatusCode::OK)),
            token_body: Arc::new(Mutex::new(json!({}))),
            jwks_body: Arc::new(Mutex::new(json!({ "keys": [] }))),
            userinfo_body: Arc::new(Mutex::new(json!({}))),
            token_requests: Arc::default(),
            jwks_requests: Arc::default(),
            userinfo_requests: Arc::default(),
            last_token_form: Arc::default(),
            last_token_authorization: Arc::default(),
            last_userinfo_authorization: Arc::default(),
        }
    }
}

pub struct MockIssuer {
    pub base_url: String,
    state: MockIssuerState,
}

impl MockIssuer {
    pub async fn start() -> Self {
        let state = MockIssuerState::default();

        let app = Router::new()
            .route("/token", post(token))
            .route("/jwks", get(jwks))
            .route("/userinfo", get(userinfo))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock issuer");
        let addr = listener.local_addr().expect("mock issuer address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock issuer");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn set_token_response(&self, status: StatusCode, body: Value) {
        *self.state.token_status.lock().unwrap() = status;
        *self.state.token_body.lock().unwrap() = body;
    }

    pub fn set_id_token(&self, id_token: &str) {
        self.set_token_response(
            StatusCode::OK,
            json!({
                "access_token": "mock-access-token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "id_token": id_token,
            }),
        );
    }

    pub fn set_jwks(&self, body: Value) {
        *self.state.jwks_body.lock().unwrap() = body;
    }

    pub fn set_userinfo(&self, body: Value) {
        *self.state.userinfo_body.lock().unwrap() = body;
    }

    pub fn token_requests(&self) -> usize {
        self.state.token_requests.load(Ordering::SeqCst)
    }

    pub fn jwks_requests(&self) -> usize {
        self.state.jwks_requests.load(Ordering::SeqCst)
    }

    pub fn userinfo_requests(&self) -> usize {
        self.state.userinfo_requests.load(Ordering::SeqCst)
    }

    pub fn total_requests(&self) -> usize {
        self.token_requests() + self.jwks_requests() + self.userinfo_requests()
    }

    pub fn last_token_form(&self) -> HashMap<String, String> {
        self.state.last_token_form.lock().unwrap().clone()
    }

    pub fn last_token_authorization(&self) -> Option<String> {
        self.state.last_token_authorization.lock().unwrap().clone()
    }

    pub fn last_userinfo_authorization(&self) -> Option<String> {
        self.state.last_userinfo_authorization.lock().unwrap().clone()
    }
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn token(
    State(state): State<MockIssuerState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    state.token_requests.fetch_add(1, Ordering::SeqCst);
    *state.last_token_form.lock().unwrap() = form;
    *state.last_token_authorization.lock().unwrap() = authorization(&headers);

    let status = *state.token_status.lock().unwrap();
    let body = state.token_body.lock().unwrap().clone();
    (status, Json(body))
}

async fn jwks(State(state): State<MockIssuerState>) -> Json<Value> {
    state.jwks_requests.fetch_add(1, Ordering::SeqCst);
    Json(state.jwks_body.lock().unwrap().clone())
}

async fn userinfo(State(state): State<MockIssuerState>, headers: HeaderMap) -> Json<Value> {
    state.userinfo_requests.fetch_add(1, Ordering::SeqCst);
    *state.last_userinfo_authorization.lock().unwrap() = authorization(&headers);
    Json(state.userinfo_body.lock().unwrap().clone())
}
