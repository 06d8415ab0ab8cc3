// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One HTTPS request per call against the control plane.
//!
//! The transport attaches the bearer header and scope query, enforces the
//! per-request deadline and decodes non-2xx responses into
//! [`ClientError::HttpStatus`]. It never refreshes tokens; that is the
//! [`AuthCoordinator`](crate::AuthCoordinator)'s job.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use vamp_cli_config::ClientConfig;
use vamp_common_http::TlsError;
use vamp_common_secret::{Secret, SecretString};

use crate::error::{ClientError, Result};
use crate::scope::ScopeParams;

const APPLICATION_JSON: &str = "application/json";

/// Request payload.
#[derive(Debug, Clone)]
pub enum RequestBody {
	/// Pre-encoded JSON bytes, sent as `application/json`.
	Json(Vec<u8>),
	/// JSON carrying a credential; redacted in `Debug` and zeroized on drop.
	SecretJson(Secret<Vec<u8>>),
	/// URL-encoded form. Values are secrets so passwords stay wrapped until
	/// the body is encoded.
	Form(Vec<(&'static str, SecretString)>),
}

/// A single request description. Cloneable so it can be replayed after a
/// token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
	method: Method,
	path: String,
	query: Vec<(String, String)>,
	body: Option<RequestBody>,
	bearer: Option<SecretString>,
	accept: &'static str,
	timeout: Option<Duration>,
	no_deadline: bool,
}

impl ApiRequest {
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			body: None,
			bearer: None,
			accept: APPLICATION_JSON,
			timeout: None,
			no_deadline: false,
		}
	}

	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	pub fn method(&self) -> &Method {
		&self.method
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn scope(mut self, scope: &ScopeParams) -> Self {
		self.query
			.extend(scope.to_query().into_iter().map(|(k, v)| (k.to_string(), v)));
		self
	}

	pub fn query_pair(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));
		self
	}

	pub fn json(mut self, body: Vec<u8>) -> Self {
		self.body = Some(RequestBody::Json(body));
		self
	}

	pub fn secret_json(mut self, body: Secret<Vec<u8>>) -> Self {
		self.body = Some(RequestBody::SecretJson(body));
		self
	}

	pub fn form(mut self, fields: Vec<(&'static str, SecretString)>) -> Self {
		self.body = Some(RequestBody::Form(fields));
		self
	}

	pub fn bearer(mut self, token: SecretString) -> Self {
		self.bearer = Some(token);
		self
	}

	pub fn accept(mut self, accept: &'static str) -> Self {
		self.accept = accept;
		self
	}

	/// Override the transport's default deadline.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	/// No overall deadline, for long-lived streaming responses.
	pub fn without_deadline(mut self) -> Self {
		self.no_deadline = true;
		self
	}

	/// Query pairs in the order they go on the wire: sorted by key.
	fn sorted_query(&self) -> Vec<(String, String)> {
		let mut query = self.query.clone();
		query.sort_by(|a, b| a.0.cmp(&b.0));
		query
	}
}

/// A buffered 2xx response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl ApiResponse {
	pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
		serde_json::from_slice(&self.body).map_err(|e| ClientError::Decode(e.to_string()))
	}
}

/// HTTPS transport bound to one control-plane base URL.
#[derive(Debug, Clone)]
pub struct Transport {
	http: Client,
	base_url: Url,
	timeout: Duration,
}

impl Transport {
	/// Build a transport from the stored URL and pinned CA.
	///
	/// An empty certificate means system roots; otherwise only the pinned
	/// authority is trusted.
	pub fn new(config: &ClientConfig, timeout: Duration) -> Result<Self> {
		if config.url.trim().is_empty() {
			return Err(ClientError::Input(
				"no control plane URL configured; run login with --url".to_string(),
			));
		}
		let base_url = Url::parse(config.url.trim())
			.map_err(|e| ClientError::Input(format!("invalid url {:?}: {e}", config.url)))?;
		if !matches!(base_url.scheme(), "http" | "https") {
			return Err(ClientError::Input(format!(
				"unsupported url scheme: {}",
				base_url.scheme()
			)));
		}

		let http = vamp_common_http::builder_with_pinned_ca(&config.pinned_ca_certificate)
			.map_err(|e| match e {
				TlsError::NoCertificate => ClientError::Input(e.to_string()),
				TlsError::Invalid(source) => ClientError::Transport(source),
			})?
			.build()
			.map_err(ClientError::Transport)?;

		Ok(Self::from_parts(http, base_url, timeout))
	}

	pub fn from_parts(http: Client, base_url: Url, timeout: Duration) -> Self {
		Self {
			http,
			base_url,
			timeout,
		}
	}

	/// The underlying client, trusting the same CA as API calls.
	pub fn http(&self) -> &Client {
		&self.http
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	/// Absolute URL for `path` under the base URL, keeping any base path
	/// prefix.
	pub fn url_for(&self, request: &ApiRequest) -> Result<Url> {
		let base = self.base_url.as_str().trim_end_matches('/');
		let mut url = Url::parse(&format!("{base}{}", request.path))
			.map_err(|e| ClientError::Input(format!("invalid request path {:?}: {e}", request.path)))?;
		let query = request.sorted_query();
		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}
		Ok(url)
	}

	fn build(&self, request: &ApiRequest) -> Result<reqwest::RequestBuilder> {
		let url = self.url_for(request)?;
		let mut builder = self
			.http
			.request(request.method.clone(), url)
			.header(ACCEPT, request.accept);

		if !request.no_deadline {
			builder = builder.timeout(request.timeout.unwrap_or(self.timeout));
		}
		if let Some(token) = &request.bearer {
			builder = builder.bearer_auth(token.expose());
		}
		match &request.body {
			Some(RequestBody::Json(bytes)) => {
				builder = builder.header(CONTENT_TYPE, APPLICATION_JSON).body(bytes.clone());
			}
			Some(RequestBody::SecretJson(bytes)) => {
				builder = builder
					.header(CONTENT_TYPE, APPLICATION_JSON)
					.body(bytes.expose().clone());
			}
			Some(RequestBody::Form(fields)) => {
				let exposed: Vec<(&str, &str)> = fields
					.iter()
					.map(|(key, value)| (*key, value.expose().as_str()))
					.collect();
				builder = builder.form(&exposed);
			}
			None => {}
		}
		Ok(builder)
	}

	/// Send `request` and open the response without buffering the body.
	///
	/// Non-2xx responses are drained and returned as
	/// [`ClientError::HttpStatus`].
	#[instrument(skip_all, fields(method = %request.method, path = %request.path))]
	pub async fn open(&self, request: ApiRequest) -> Result<reqwest::Response> {
		let response = self.build(&request)?.send().await.map_err(ClientError::Transport)?;
		let status = response.status();
		debug!(status = status.as_u16(), "response received");

		if status.is_success() {
			return Ok(response);
		}
		let body = response.text().await.unwrap_or_default();
		Err(ClientError::HttpStatus {
			status: status.as_u16(),
			body,
		})
	}

	/// Send `request` and buffer the whole 2xx body.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		let response = self.open(request).await?;
		let status = response.status();
		let headers = response.headers().clone();
		let body = response.bytes().await.map_err(ClientError::Transport)?;
		Ok(ApiResponse {
			status,
			headers,
			body,
		})
	}
}
