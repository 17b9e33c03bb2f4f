//! Integration test harness for Readieg.
//!
//! Builds the real application router over the in-memory store and drives it
//! with `tower::ServiceExt::oneshot`, so no database or socket is needed:
//!
//! ```bash
//! cargo test -p readieg-integration-tests
//! ```
//!
//! [`TestApp`] keeps the session cookie between requests like a browser would.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::Value;
use tower::ServiceExt;

use readieg_core::{Book, BookDraft, BookPayload};
use readieg_server::config::ServerConfig;
use readieg_server::db::{BookRepository, InMemoryStore};
use readieg_server::middleware::SESSION_COOKIE_NAME;
use readieg_server::state::AppState;

/// The sample catalog the CLI seeds into a fresh database.
pub const SAMPLE_CATALOG: &str = include_str!("../../cli/data/books.yaml");

/// A response with its body decoded.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON, or `Value::Null` for an empty or non-JSON body.
    pub body: Value,
    pub text: String,
}

impl TestResponse {
    /// The `error` message of a failure body.
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

/// One client talking to one application instance.
pub struct TestApp {
    router: Router,
    store: Arc<InMemoryStore>,
    cookie: Option<String>,
}

impl TestApp {
    /// A fresh application with an empty catalog.
    pub fn new() -> Self {
        Self::with_sessions(tower_sessions::MemoryStore::default())
    }

    /// A fresh application with its own data but the given session store.
    ///
    /// Two apps sharing sessions but not data model a session that outlives
    /// its account.
    pub fn with_sessions(sessions: tower_sessions::MemoryStore) -> Self {
        let config = ServerConfig::from_lookup(|key| {
            (key == "READIEG_STORE").then(|| "memory".to_owned())
        })
        .expect("memory config");

        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(config, Arc::clone(&store) as Arc<dyn readieg_server::db::Store>);
        let router = readieg_server::app(state, sessions);

        Self {
            router,
            store,
            cookie: None,
        }
    }

    /// An application holding the sample catalog.
    pub async fn seeded() -> Self {
        let app = Self::new();
        for draft in sample_drafts() {
            app.store.insert_book(draft).await.expect("seed book");
        }
        app
    }

    /// Insert a book directly, bypassing the API.
    pub async fn insert_book(&self, payload: Value) -> Book {
        let payload: BookPayload = serde_json::from_value(payload).expect("book payload");
        let draft = BookDraft::try_from(payload).expect("valid book");
        self.store.insert_book(draft).await.expect("insert book")
    }

    /// A second client against the same application, without a session.
    #[must_use]
    pub fn other_client(&self) -> Self {
        Self {
            router: self.router.clone(),
            store: Arc::clone(&self.store),
            cookie: None,
        }
    }

    /// Whether the client currently holds a session cookie.
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    /// The session cookie as sent on requests.
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Replace the session cookie, as a client tampering with it would.
    pub fn set_cookie(&mut self, cookie: &str) {
        self.cookie = Some(cookie.to_owned());
    }

    /// Send a request, carrying and updating the session cookie.
    pub async fn request(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("infallible");
        self.store_cookie(response.headers());

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn post_empty(&mut self, uri: &str) -> TestResponse {
        self.request(Method::POST, uri, None).await
    }

    pub async fn put(&mut self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None).await
    }

    /// Sign up and keep the resulting session.
    pub async fn signup(&mut self, name: &str, email: &str, password: &str) -> TestResponse {
        self.post(
            "/api/auth/signup",
            serde_json::json!({ "name": name, "email": email, "password": password }),
        )
        .await
    }

    /// Log in and keep the resulting session.
    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.post(
            "/api/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Sign up a throwaway reader and return their id.
    pub async fn sign_in_reader(&mut self) -> String {
        let response = self.signup("Reader", "reader@example.com", "secret1").await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        response.body["user"]["id"].as_str().unwrap().to_owned()
    }

    /// Find a book in a listing by title.
    pub async fn book_id(&mut self, title: &str) -> String {
        let listing = self.get("/api/books?limit=200").await;
        listing
            .body
            .as_array()
            .unwrap()
            .iter()
            .find(|b| b["title"] == title)
            .and_then(|b| b["id"].as_str())
            .unwrap_or_else(|| panic!("no book titled {title:?}"))
            .to_owned()
    }

    fn store_cookie(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let Some(pair) = raw.split(';').next() else { continue };
            let Some((name, value)) = pair.split_once('=') else { continue };
            if name.trim() != SESSION_COOKIE_NAME {
                continue;
            }

            let expired = raw.to_ascii_lowercase().contains("max-age=0");
            self.cookie = if value.is_empty() || expired {
                None
            } else {
                Some(pair.trim().to_owned())
            };
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// The sample catalog as validated drafts.
pub fn sample_drafts() -> Vec<BookDraft> {
    let payloads: Vec<BookPayload> = serde_yaml::from_str(SAMPLE_CATALOG).expect("catalog yaml");
    payloads
        .into_iter()
        .map(|p| BookDraft::try_from(p).expect("valid sample book"))
        .collect()
}
