// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Integration tests for the REST client against a mock control plane.
//!
//! Tests cover:
//! - Password login and persisted session
//! - Resource create/update/get/list/merge pipelines
//! - Reactive refresh on 401 and single-flight refresh
//! - Re-authentication required paths
//! - Auxiliary endpoints (password, metrics, roles, ping)

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use vamp_cli_config::{ClientConfig, ConfigStore};
use vamp_cli_credentials::{now_unix, MemoryTokenStore, TokenStore};
use vamp_client::{
	ClientError, Format, ResourceDocument, ResourceKind, RestClient, ScopeParams, SecretString, VampApi,
	OAUTH_TOKEN_PATH,
};
use wiremock::matchers::{body_json, body_string, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
	client: RestClient,
	tokens: Arc<MemoryTokenStore>,
	store: ConfigStore,
	_dir: TempDir,
}

/// Client wired to `server` with a temp config file and in-memory token cache.
fn setup(server: &MockServer, config: ClientConfig) -> Harness {
	let dir = tempfile::tempdir().unwrap();
	let store = ConfigStore::new(dir.path().join("config.yaml"));
	let tokens = Arc::new(MemoryTokenStore::new());
	let token_store: Arc<dyn TokenStore> = tokens.clone();
	let config = ClientConfig {
		url: server.uri(),
		..config
	};
	let client = RestClient::from_config(config, Some(store.clone()), token_store).unwrap();
	Harness {
		client,
		tokens,
		store,
		_dir: dir,
	}
}

fn logged_in(access_token: &str) -> ClientConfig {
	ClientConfig {
		username: "admin".to_string(),
		access_token: access_token.to_string(),
		refresh_token: "rt_1".to_string(),
		expiration_time: now_unix() + 3600,
		..ClientConfig::default()
	}
}

fn expired() -> ClientConfig {
	ClientConfig {
		username: "admin".to_string(),
		refresh_token: "rt_1".to_string(),
		..ClientConfig::default()
	}
}

fn token_response(access: &str, refresh: &str) -> ResponseTemplate {
	ResponseTemplate::new(200).set_body_json(json!({
		"access_token": access,
		"refresh_token": refresh,
		"expires_in": 3600,
		"token_type": "bearer"
	}))
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn login_persists_session_with_expiry_slack() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path(OAUTH_TOKEN_PATH))
		.and(header("content-type", "application/x-www-form-urlencoded"))
		.and(body_string_contains("username=admin"))
		.and(body_string_contains("password=s3cret"))
		.and(body_string_contains("grant_type=password"))
		.respond_with(token_response("A", "R"))
		.expect(1)
		.mount(&server)
		.await;

	let h = setup(&server, ClientConfig::default());
	let before = now_unix();
	h.client
		.login("admin", SecretString::from("s3cret"))
		.await
		.unwrap();

	let persisted = h.store.read().await.unwrap();
	assert_eq!(persisted.access_token, "A");
	assert_eq!(persisted.refresh_token, "R");
	assert_eq!(persisted.username, "admin");
	assert!((before + 3570..=now_unix() + 3570).contains(&persisted.expiration_time));
	assert!(h.tokens.get("R").await.is_some());

	let on_disk = tokio::fs::read_to_string(h.store.path()).await.unwrap();
	assert!(!on_disk.contains("s3cret"));
}

#[tokio::test]
async fn login_with_bad_password_leaves_config_untouched() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path(OAUTH_TOKEN_PATH))
		.respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
		.mount(&server)
		.await;

	let h = setup(&server, ClientConfig::default());
	let err = h
		.client
		.login("admin", SecretString::from("nope"))
		.await
		.unwrap_err();
	assert!(matches!(err, ClientError::AuthDenied));
	assert_eq!(err.to_string(), "authentication failed");
	assert!(!h.store.path().exists());
}

// ============================================================================
// Resource operations
// ============================================================================

#[tokio::test]
async fn create_project_posts_json() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/api/v1/projects"))
		.and(header("content-type", "application/json"))
		.and(header("authorization", "Bearer at_1"))
		.and(body_string(r#"{"name":"p1"}"#))
		.respond_with(ResponseTemplate::new(201))
		.expect(1)
		.mount(&server)
		.await;

	let h = setup(&server, logged_in("at_1"));
	h.client
		.create(
			ResourceKind::Project,
			"p1",
			&ResourceDocument::yaml("name: p1\n"),
			&ScopeParams::default(),
		)
		.await
		.unwrap();
}

#[tokio::test]
async fn update_sends_scope_and_vamp_service_hosts() {
	let server = MockServer::start().await;
	Mock::given(method("PUT"))
		.and(path("/api/v1/vamp_services/shop"))
		.and(query_param("project", "p1"))
		.and(query_param("cluster", "c1"))
		.and(query_param("virtual_cluster", "vc1"))
		.and(body_json(json!({
			"gateways": ["gw"],
			"hosts": ["shop.example.com", "extra.example.com"]
		})))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&server)
		.await;

	let h = setup(&server, logged_in("at_1"));
	let scope = ScopeParams::default()
		.with_project("p1")
		.with_cluster("c1")
		.with_virtual_cluster("vc1");
	let doc = ResourceDocument::yaml("gateways:\n- gw\nhosts:\n- shop.example.com\n").with_hosts(["extra.example.com"]);
	h.client
		.update(ResourceKind::VampService, "shop", &doc, &scope)
		.await
		.unwrap();
}

#[tokio::test]
async fn get_converts_to_requested_format() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/api/v1/projects/p1"))
		.respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name":"p1","description":"demo"}"#))
		.mount(&server)
		.await;

	let h = setup(&server, logged_in("at_1"));
	let yaml = h
		.client
		.get(ResourceKind::Project, "p1", Format::Yaml, &ScopeParams::default())
		.await
		.unwrap();
	assert_eq!(String::from_utf8(yaml).unwrap(), "name: p1\ndescription: demo\n");

	let json = h
		.client
		.get(ResourceKind::Project, "p1", Format::Json, &ScopeParams::default())
		.await
		.unwrap();
	assert_eq!(json, br#"{"name":"p1","description":"demo"}"#);
}

#[tokio::test]
async fn list_sends_simple_flag() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/api/v1/virtual_clusters"))
		.and(query_param("simple", "true"))
		.respond_with(ResponseTemplate::new(200).set_body_string(r#"["vc1","vc2"]"#))
		.expect(1)
		.mount(&server)
		.await;

	let h = setup(&server, logged_in("at_1"));
	let listed = h
		.client
		.list(ResourceKind::VirtualCluster, Format::Yaml, &ScopeParams::default(), true)
		.await
		.unwrap();
	assert_eq!(String::from_utf8(listed).unwrap(), "- vc1\n- vc2\n");
}

#[tokio::test]
async fn merge_patches_current_spec() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/api/v1/applications/app/spec"))
		.respond_with(ResponseTemplate::new(200).set_body_string(r#"{"metadata":{"a":1,"b":2}}"#))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("PUT"))
		.and(path("/api/v1/applications/app"))
		.and(body_string(r#"{"metadata":{"a":1,"b":3,"c":4}}"#))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&server)
		.await;

	let h = setup(&server, logged_in("at_1"));
	h.client
		.merge(
			ResourceKind::Application,
			"app",
			&ResourceDocument::yaml("metadata:\n  b: 3\n  c: 4\n"),
			&ScopeParams::default(),
		)
		.await
		.unwrap();
}

#[tokio::test]
async fn server_errors_surface_status_and_body() {
	let server = MockServer::start().await;
	Mock::given(method("DELETE"))
		.and(path("/api/v1/gateways/gw"))
		.respond_with(ResponseTemplate::new(409).set_body_string("gateway in use"))
		.mount(&server)
		.await;

	let h = setup(&server, logged_in("at_1"));
	let err = h
		.client
		.delete(ResourceKind::Gateway, "gw", &ScopeParams::default())
		.await
		.unwrap_err();
	match err {
		ClientError::HttpStatus { status, body } => {
			assert_eq!(status, 409);
			assert_eq!(body, "gateway in use");
		}
		other => panic!("unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn invalid_document_fails_before_any_request() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(201))
		.expect(0)
		.mount(&server)
		.await;

	let h = setup(&server, logged_in("at_1"));
	let err = h
		.client
		.create(
			ResourceKind::Project,
			"p1",
			&ResourceDocument::json("{broken"),
			&ScopeParams::default(),
		)
		.await
		.unwrap_err();
	assert!(matches!(err, ClientError::Serialize(_)));
}

// ============================================================================
// Token refresh
// ============================================================================

#[tokio::test]
async fn unauthorized_request_refreshes_and_retries_once() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/api/v1/projects"))
		.and(header("authorization", "Bearer at_revoked"))
		.respond_with(ResponseTemplate::new(401))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("POST"))
		.and(path(OAUTH_TOKEN_PATH))
		.and(body_string_contains("grant_type=refresh_token"))
		.and(body_string_contains("refresh_token=rt_1"))
		.respond_with(token_response("at_2", "rt_2"))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/api/v1/projects"))
		.and(header("authorization", "Bearer at_2"))
		.respond_with(ResponseTemplate::new(200).set_body_string("[]"))
		.expect(1)
		.mount(&server)
		.await;

	let h = setup(&server, logged_in("at_revoked"));
	let listed = h
		.client
		.list(ResourceKind::Project, Format::Json, &ScopeParams::default(), false)
		.await
		.unwrap();
	assert_eq!(listed, b"[]");

	let persisted = h.store.read().await.unwrap();
	assert_eq!(persisted.access_token, "at_2");
	assert_eq!(persisted.refresh_token, "rt_2");
}

#[tokio::test]
async fn token_rejected_right_after_proactive_refresh_is_refreshed_again() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path(OAUTH_TOKEN_PATH))
		.and(body_string_contains("refresh_token=rt_1"))
		.respond_with(token_response("at_2", "rt_2"))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("POST"))
		.and(path(OAUTH_TOKEN_PATH))
		.and(body_string_contains("refresh_token=rt_2"))
		.respond_with(token_response("at_3", "rt_3"))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/api/v1/projects"))
		.and(header("authorization", "Bearer at_2"))
		.respond_with(ResponseTemplate::new(401))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/api/v1/projects"))
		.and(header("authorization", "Bearer at_3"))
		.respond_with(ResponseTemplate::new(200).set_body_string("[]"))
		.expect(1)
		.mount(&server)
		.await;

	let h = setup(&server, expired());
	let listed = h
		.client
		.list(ResourceKind::Project, Format::Json, &ScopeParams::default(), false)
		.await
		.unwrap();
	assert_eq!(listed, b"[]");
	assert_eq!(h.store.read().await.unwrap().access_token, "at_3");
}

#[tokio::test]
async fn second_unauthorized_is_surfaced() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/api/v1/projects/p1"))
		.respond_with(ResponseTemplate::new(401).set_body_string("forbidden"))
		.expect(2)
		.mount(&server)
		.await;
	Mock::given(method("POST"))
		.and(path(OAUTH_TOKEN_PATH))
		.respond_with(token_response("at_2", "rt_2"))
		.expect(1)
		.mount(&server)
		.await;

	let h = setup(&server, logged_in("at_1"));
	let err = h
		.client
		.get(ResourceKind::Project, "p1", Format::Json, &ScopeParams::default())
		.await
		.unwrap_err();
	assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn concurrent_requests_share_one_refresh() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path(OAUTH_TOKEN_PATH))
		.respond_with(token_response("at_fresh", "rt_2").set_delay(Duration::from_millis(200)))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/api/v1/clusters"))
		.and(header("authorization", "Bearer at_fresh"))
		.respond_with(ResponseTemplate::new(200).set_body_string("[]"))
		.expect(10)
		.mount(&server)
		.await;

	let h = setup(&server, expired());
	let handles: Vec<_> = (0..10)
		.map(|_| {
			let client = h.client.clone();
			tokio::spawn(async move {
				client
					.list(ResourceKind::Cluster, Format::Json, &ScopeParams::default(), false)
					.await
			})
		})
		.collect();
	for handle in handles {
		handle.await.unwrap().unwrap();
	}
	assert!(h.tokens.get("rt_2").await.is_some());
	assert!(h.tokens.get("rt_1").await.is_none());
}

#[tokio::test]
async fn rejected_refresh_requires_login() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path(OAUTH_TOKEN_PATH))
		.respond_with(ResponseTemplate::new(401))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.respond_with(ResponseTemplate::new(200))
		.expect(0)
		.mount(&server)
		.await;

	let h = setup(&server, expired());
	let err = h
		.client
		.get(ResourceKind::Project, "p1", Format::Yaml, &ScopeParams::default())
		.await
		.unwrap_err();
	assert!(matches!(err, ClientError::ReauthRequired));
	assert_eq!(err.to_string(), "session expired; please login");

	let persisted = h.store.read().await.unwrap();
	assert!(persisted.access_token.is_empty());
	assert_eq!(persisted.refresh_token, "rt_1");
}

#[tokio::test]
async fn no_session_is_not_authenticated() {
	let server = MockServer::start().await;
	let h = setup(&server, ClientConfig::default());
	let err = h
		.client
		.list(ResourceKind::Project, Format::Yaml, &ScopeParams::default(), false)
		.await
		.unwrap_err();
	assert!(matches!(err, ClientError::NotAuthenticated));
}

// ============================================================================
// Auxiliary endpoints
// ============================================================================

#[tokio::test]
async fn update_password_sends_user_and_password() {
	let server = MockServer::start().await;
	Mock::given(method("PUT"))
		.and(path("/api/v1/users/alice/password"))
		.and(body_json(json!({"userName": "alice", "password": "n3w"})))
		.respond_with(ResponseTemplate::new(204))
		.expect(1)
		.mount(&server)
		.await;

	let h = setup(&server, logged_in("at_1"));
	h.client
		.update_password("alice", SecretString::from("n3w"), &ScopeParams::default())
		.await
		.unwrap();
}

#[tokio::test]
async fn push_metric_value_posts_to_values() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/api/v1/metrics/latency/values"))
		.and(query_param("application", "shop"))
		.and(body_json(json!({"value": 12.5})))
		.respond_with(ResponseTemplate::new(201))
		.expect(1)
		.mount(&server)
		.await;

	let h = setup(&server, logged_in("at_1"));
	h.client
		.push_metric_value(
			"latency",
			&ResourceDocument::yaml("value: 12.5\n"),
			&ScopeParams::default().with_application("shop"),
		)
		.await
		.unwrap();
}

#[tokio::test]
async fn roles_are_granted_and_revoked() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/api/v1/users/alice/roles/admin"))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&server)
		.await;
	Mock::given(method("DELETE"))
		.and(path("/api/v1/users/alice/roles/admin"))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&server)
		.await;

	let h = setup(&server, logged_in("at_1"));
	let scope = ScopeParams::default();
	h.client.add_role_to_user("alice", "admin", &scope).await.unwrap();
	h.client
		.remove_role_from_user("alice", "admin", &scope)
		.await
		.unwrap();
}

#[tokio::test]
async fn ping_uses_configured_api_version() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/api/v2/ping"))
		.respond_with(ResponseTemplate::new(200))
		.expect(1)
		.mount(&server)
		.await;

	let h = setup(
		&server,
		ClientConfig {
			api_version: "v2".to_string(),
			..ClientConfig::default()
		},
	);
	h.client.ping().await.unwrap();
}

#[tokio::test]
async fn with_timeout_bounds_each_request() {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/api/v1/projects"))
		.respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
		.mount(&server)
		.await;

	let h = setup(&server, logged_in("at_1"));
	let err = h
		.client
		.with_timeout(Duration::from_millis(50))
		.list(ResourceKind::Project, Format::Json, &ScopeParams::default(), false)
		.await
		.unwrap_err();
	assert!(matches!(err, ClientError::Transport(ref e) if e.is_timeout()));
}
