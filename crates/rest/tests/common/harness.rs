//! REST API test harness.
//!
//! Serves configured endpoints over an in-memory SQLite backend.

use axum::http::{HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};
use pidrest_persistence::backends::sqlite::SqliteBackend;
use pidrest_persistence::core::TransactionProvider;
use pidrest_persistence::types::{PersistentIdentifier, PidRef};
use pidrest_rest::{ComponentRegistry, ServerConfig, build_endpoints, create_app_with_config};
use serde_json::{Map, Value};

use super::fixtures::{FilmFixture, films};

/// Header carrying the caller's user id.
pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

/// Header carrying the caller's roles.
pub const X_USER_ROLES: HeaderName = HeaderName::from_static("x-user-roles");

/// Test harness for REST API testing.
///
/// # Example
///
/// ```rust,ignore
/// let harness = RestTestHarness::new();
/// let id = harness.create(json!({"title": "Back to the Future"})).await;
/// harness.server.get(&format!("/records/{id}")).await.assert_status_ok();
/// ```
pub struct RestTestHarness {
    /// The test server instance.
    pub server: TestServer,
    /// The storage backend, sharing the server's connection pool.
    pub backend: SqliteBackend,
}

impl RestTestHarness {
    /// Serves the built-in `recid` endpoint.
    pub fn new() -> Self {
        Self::with_endpoints(pidrest_rest::default_endpoints())
    }

    /// Serves the given raw endpoint definitions.
    pub fn with_endpoints(raw: Map<String, Value>) -> Self {
        Self::with_registry(raw, &ComponentRegistry::with_defaults())
    }

    /// Serves the given raw endpoint definitions, resolving names in `registry`.
    pub fn with_registry(raw: Map<String, Value>, registry: &ComponentRegistry) -> Self {
        let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
        backend.init_schema().expect("Failed to init schema");

        let endpoints = build_endpoints(&raw, registry)
            .expect("Failed to build endpoints");
        let app = create_app_with_config(backend.clone(), endpoints, ServerConfig::for_testing())
            .expect("Failed to create app");
        let server = TestServer::new(app).expect("Failed to create test server");

        Self { server, backend }
    }

    /// Creates a record as an authenticated admin and returns its PID value.
    pub async fn create(&self, body: Value) -> String {
        let response = as_admin(self.server.post("/records/")).json(&body).await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let created: Value = response.json();
        created["id"]
            .as_str()
            .expect("created record has an id")
            .to_string()
    }

    /// Creates the given films in order and returns their PID values.
    pub async fn seed(&self, fixtures: &[FilmFixture]) -> Vec<String> {
        let mut ids = Vec::with_capacity(fixtures.len());
        for film in fixtures {
            ids.push(self.create(film.to_json()).await);
        }
        ids
    }

    /// Creates the standard films.
    pub async fn seed_films(&self) -> Vec<String> {
        self.seed(&films()).await
    }

    /// Points one `recid` at another, bypassing the HTTP API.
    pub async fn redirect(&self, from: &str, to: &str) {
        let mut tx = self.backend.begin_transaction().await.unwrap();
        tx.redirect_pid(&PidRef::new("recid", from), &PidRef::new("recid", to))
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    /// Reserves a `recid` without binding it to a record.
    pub async fn reserve(&self, value: &str) {
        let mut tx = self.backend.begin_transaction().await.unwrap();
        tx.create_pid(&PersistentIdentifier::reserved("recid", value))
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }
}

/// Sends the request as user `1` holding the `admin` role.
pub fn as_admin(request: TestRequest) -> TestRequest {
    as_user(request, "1").add_header(X_USER_ROLES, HeaderValue::from_static("admin"))
}

/// Sends the request as the given user.
pub fn as_user(request: TestRequest, user_id: &str) -> TestRequest {
    request.add_header(X_USER_ID, HeaderValue::from_str(user_id).unwrap())
}
