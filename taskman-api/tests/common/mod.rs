//! Common test utilities for integration tests
//!
//! The router runs over an in-memory store with cheap password hashing, so
//! these tests need no database.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use taskman_api::app::{build_router, AppState};
use taskman_api::config::Config;
use taskman_shared::auth::jwt::{create_token, Claims};
use taskman_shared::models::user::{Registration, Role, User};
use taskman_shared::store::MemoryStore;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const PASSWORD: &str = "secret1";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: MemoryStore,
    pub state: AppState,
    pub app: Router,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Context whose config also reads `extra`
    pub fn with_env(extra: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "postgresql://localhost/unused"),
            ("JWT_SECRET", JWT_SECRET),
            ("PASSWORD_HASH_MEMORY_KIB", "8"),
            ("PASSWORD_HASH_ITERATIONS", "1"),
            ("PASSWORD_HASH_LANES", "1"),
        ]);
        vars.extend(extra.iter().copied());
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
            .expect("test config should load");

        let store = MemoryStore::new();
        let state = AppState::new(Arc::new(store.clone()), config);
        let app = build_router(state.clone());

        Self { store, state, app }
    }

    /// Registers a user directly through the account service
    pub async fn register(&self, email: &str, role: Role) -> User {
        self.state
            .accounts
            .register(Registration {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                password_confirmation: PASSWORD.to_string(),
                role: Some(role.as_str().to_string()),
            })
            .await
            .expect("registration should succeed")
    }

    /// Registers a user and returns it with a bearer token
    pub async fn signed_in(&self, email: &str, role: Role) -> (User, String) {
        let user = self.register(email, role).await;
        let token = create_token(&Claims::new(user.id), JWT_SECRET).expect("token");
        (user, token)
    }

    /// Sends a request through the router and returns status and JSON body
    ///
    /// An empty body comes back as `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        let response = self.app.clone().oneshot(request).await.expect("infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("expected JSON, got {}", String::from_utf8_lossy(&bytes))
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Creates a task through the API and returns its id
    pub async fn create_task(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .post("/v1/tasks", Some(token), serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["id"].as_str().expect("task id").to_string()
    }
}

/// Field names listed in a 422 response
pub fn error_fields(body: &Value) -> Vec<String> {
    body["details"]
        .as_array()
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
