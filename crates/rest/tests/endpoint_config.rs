//! Integration tests for endpoint configuration.
//!
//! Covers the options view, completion suggestions, additional links,
//! multiple endpoints, redirects between identifier types, unknown routes
//! and configuration errors.

mod common;

use pidrest_persistence::backends::sqlite::SqliteBackend;
use pidrest_persistence::core::TransactionProvider;
use pidrest_persistence::types::{PersistentIdentifier, PidRef};
use pidrest_rest::{
    ComponentRegistry, ConfigError, ServerConfig, build_endpoints, create_app, create_app_with_config,
    default_endpoints,
};
use pidrest_persistence::core::{RecidFetcher, RecidMinter};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use common::assertions::{
    assert_error, assert_header, assert_json_path, assert_status, link_relations, select,
};
use common::fixtures::{film_search_settings, recid_endpoint_with};
use common::harness::{RestTestHarness, as_admin};

// =============================================================================
// Options
// =============================================================================

mod options {
    use super::*;

    #[tokio::test]
    async fn test_options_view() {
        let harness = RestTestHarness::with_endpoints(recid_endpoint_with(film_search_settings()));

        let response = harness.server.get("/records/_options").await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "max_result_window": 10000,
            "default_media_type": "application/json",
            "item_media_types": ["application/json"],
            "search_media_types": ["application/json"],
            "sort_fields": [
                {"title": {"title": "Title", "default_order": "asc"}},
                {"year": {"title": "Year", "default_order": "desc"}},
            ],
        }));
    }

    #[tokio::test]
    async fn test_options_without_sort_options() {
        let harness = RestTestHarness::new();

        let body: Value = harness.server.get("/records/_options").await.json();

        assert_eq!(body["sort_fields"], json!([]));
        assert_eq!(body["max_result_window"], 10000);
    }

    #[tokio::test]
    async fn test_disabled_options_view() {
        let harness = RestTestHarness::with_endpoints(recid_endpoint_with(json!({
            "use_options_view": false,
        })));

        let response = harness.server.get("/records/_options").await;

        // Falls through to the item route
        assert_error(&response, 404, "PID does not exist.");
    }
}

// =============================================================================
// Suggest
// =============================================================================

mod suggest {
    use super::*;

    async fn harness() -> RestTestHarness {
        let harness = RestTestHarness::with_endpoints(recid_endpoint_with(film_search_settings()));
        harness.seed_films().await;
        harness
    }

    #[tokio::test]
    async fn test_suggest_prefix() {
        let harness = harness().await;

        let response = harness
            .server
            .get("/records/_suggest")
            .add_query_param("title", "back")
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["title"][0]["text"], "back");
        assert_eq!(body["title"][0]["offset"], 0);
        assert_eq!(body["title"][0]["length"], 4);
        assert_json_path(
            &body,
            "$.title[0].options[*].text",
            &[json!("Back to the Future"), json!("Back to the Past")],
        );
        assert_json_path(
            &body,
            "$.title[0].options[*]._source.control_number",
            &[json!("1"), json!("2")],
        );
    }

    #[tokio::test]
    async fn test_suggest_size() {
        let harness = harness().await;

        let body: Value = harness
            .server
            .get("/records/_suggest")
            .add_query_param("title", "back")
            .add_query_param("size", "1")
            .await
            .json();

        assert_eq!(select(&body, "$.title[0].options[*].text").len(), 1);
    }

    #[tokio::test]
    async fn test_suggest_with_context() {
        let harness = harness().await;

        let body: Value = harness
            .server
            .get("/records/_suggest")
            .add_query_param("title_by_year", "back")
            .add_query_param("year", "2042")
            .await
            .json();

        assert_json_path(
            &body,
            "$.title_by_year[0].options[*].text",
            &[json!("Back to the Past")],
        );
        assert!(body.get("title").is_none());
    }

    #[tokio::test]
    async fn test_suggest_missing_context() {
        let harness = harness().await;

        let response = harness
            .server
            .get("/records/_suggest")
            .add_query_param("title_by_year", "back")
            .await;

        assert_error(&response, 400, "Missing \"year\" context");
    }

    #[tokio::test]
    async fn test_suggest_nothing_requested() {
        let harness = harness().await;

        let response = harness
            .server
            .get("/records/_suggest")
            .add_query_param("q", "back")
            .await;

        assert_error(
            &response,
            400,
            "No completions requested. (options: title, title_by_year)",
        );
    }
}

// =============================================================================
// Links and routing
// =============================================================================

mod routing {
    use super::*;

    #[tokio::test]
    async fn test_additional_links() {
        let harness = RestTestHarness::with_endpoints(recid_endpoint_with(json!({
            "additional_links": {"html": "{scheme}://{host}/films/{pid_value}"},
        })));
        harness.seed_films().await;

        let response = harness.server.get("/records/3").await;

        let body: Value = response.json();
        assert_eq!(body["links"]["html"], "http://localhost/films/3");
        assert_eq!(body["links"]["self"], "http://localhost/records/3");
        let relations = link_relations(&response);
        assert!(relations.contains(&("html".to_string(), "http://localhost/films/3".to_string())));
        assert!(relations.contains(&("self".to_string(), "http://localhost/records/3".to_string())));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let harness = RestTestHarness::new();

        let response = harness.server.get("/unknown").await;

        assert_error(&response, 404, "The requested URL was not found on the server.");
    }

    fn authors_harness() -> RestTestHarness {
        let registry = ComponentRegistry::with_defaults()
            .with_minter("authid", Arc::new(RecidMinter::new("authid", "control_number")))
            .with_fetcher("authid", Arc::new(RecidFetcher::new("authid", "control_number")));
        let mut endpoints = default_endpoints();
        endpoints.insert(
            "authors".to_string(),
            json!({
                "pid_type": "authid",
                "pid_minter": "authid",
                "pid_fetcher": "authid",
                "search_index": "authors",
                "list_route": "/authors/",
                "item_route": "/authors/{pid_value}",
                "record_serializers": {"application/json": "json_v1"},
                "search_serializers": {"application/json": "json_v1"},
            }),
        );
        RestTestHarness::with_registry(endpoints, &registry)
    }

    #[tokio::test]
    async fn test_second_endpoint() {
        let harness = authors_harness();
        harness.seed_films().await;

        let body: Value = harness.server.get("/authors/").await.json();
        assert_eq!(body["hits"]["total"], 0);
        assert_eq!(body["links"]["self"], "http://localhost/authors/?page=1&size=10");

        // Records of one index stay out of the other
        let body: Value = harness.server.get("/records/").await.json();
        assert_eq!(body["hits"]["total"], 4);
    }

    #[tokio::test]
    async fn test_second_endpoint_serves_its_own_records() {
        let harness = authors_harness();
        harness.seed_films().await;

        let response = as_admin(harness.server.post("/authors/"))
            .json(&json!({"name": "Douglas Adams"}))
            .await;

        assert_status(&response, 201);
        assert_header(&response, "location", "http://localhost/authors/1");
        let created: Value = response.json();
        assert_eq!(created["links"]["self"], "http://localhost/authors/1");

        let response = harness.server.get("/authors/1").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["metadata"]["name"], "Douglas Adams");
        assert_eq!(body["metadata"]["control_number"], "1");

        let body: Value = harness.server.get("/authors/").await.json();
        assert_json_path(&body, "$.hits.hits[*].id", &[json!("1")]);

        // The film minted under the same number is untouched
        let body: Value = harness.server.get("/records/1").await.json();
        assert_eq!(body["metadata"]["title"], "Back to the Future");
    }

    #[tokio::test]
    async fn test_redirect_to_unserved_pid_type() {
        let harness = RestTestHarness::new();
        harness.seed_films().await;

        let mut tx = harness.backend.begin_transaction().await.unwrap();
        tx.create_pid(&PersistentIdentifier::registered(
            "doi",
            "10.1234/film",
            Uuid::new_v4(),
        ))
        .await
        .unwrap();
        tx.redirect_pid(&PidRef::new("recid", "1"), &PidRef::new("doi", "10.1234/film"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let response = harness.server.get("/records/1").await;

        assert_error(
            &response,
            500,
            "Invalid redirect - pid_type \"doi\" endpoint missing.",
        );
    }
}

// =============================================================================
// Configuration errors
// =============================================================================

mod configuration {
    use super::*;

    fn backend() -> SqliteBackend {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.init_schema().unwrap();
        backend
    }

    #[test]
    fn test_default_app_builds() {
        assert_ok!(create_app(backend()));
    }

    #[test]
    fn test_invalid_base_url() {
        let endpoints = build_endpoints(&default_endpoints(), &ComponentRegistry::with_defaults())
            .unwrap();
        let config = ServerConfig {
            base_url: "localhost without scheme".to_string(),
            ..ServerConfig::for_testing()
        };

        let err = assert_err!(create_app_with_config(backend(), endpoints, config));
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let raw = recid_endpoint_with(json!({"list_route": "records"}));

        let err = assert_err!(build_endpoints(&raw, &ComponentRegistry::with_defaults()));
        match err {
            ConfigError::InvalidEndpointConfig { endpoint, key, .. } => {
                assert_eq!(endpoint, "recid");
                assert_eq!(key, "list_route");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_serializer_is_rejected() {
        let raw = recid_endpoint_with(json!({
            "record_serializers": {"application/xml": "xml_v1"},
        }));

        let err = assert_err!(build_endpoints(&raw, &ComponentRegistry::with_defaults()));
        assert!(err.to_string().contains("record_serializers"));
    }

    #[tokio::test]
    async fn test_empty_endpoints_serve_nothing() {
        let app = assert_ok!(create_app_with_config(
            backend(),
            Vec::new(),
            ServerConfig::for_testing()
        ));
        let server = axum_test::TestServer::new(app).unwrap();

        assert_status(&server.get("/records/").await, 404);
    }
}
