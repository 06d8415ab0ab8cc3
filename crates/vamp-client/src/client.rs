// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! REST implementation of [`VampApi`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use vamp_cli_config::{ClientConfig, ConfigStore};
use vamp_cli_credentials::TokenStore;
use vamp_common_secret::{Secret, SecretString};
use vamp_common_serialize::{convert, emit, merge_values, parse, Format};

use crate::api::VampApi;
use crate::auth::{AuthCoordinator, TokenPair};
use crate::document::{DocumentSource, ResourceDocument};
use crate::error::{ClientError, Result};
use crate::notifications::{self, Notification, NotificationStream, StreamSettings, StreamStats};
use crate::resource::ResourceKind;
use crate::scope::ScopeParams;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Per-request deadline unless overridden with [`RestClient::with_timeout`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the control-plane REST API.
///
/// Cheap to clone; clones share one session.
///
/// # Example
///
/// ```ignore
/// use vamp_client::{ResourceDocument, ResourceKind, ScopeParams, VampApi};
///
/// let doc = ResourceDocument::yaml("name: p1\n");
/// client.create(ResourceKind::Project, "p1", &doc, &ScopeParams::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RestClient {
	auth: Arc<AuthCoordinator>,
	timeout: Duration,
	stream_settings: StreamSettings,
}

impl RestClient {
	pub fn new(auth: AuthCoordinator) -> Self {
		Self {
			auth: Arc::new(auth),
			timeout: DEFAULT_REQUEST_TIMEOUT,
			stream_settings: StreamSettings::default(),
		}
	}

	/// Build the transport and session from a loaded config.
	pub fn from_config(
		config: ClientConfig,
		config_store: Option<ConfigStore>,
		token_store: Arc<dyn TokenStore>,
	) -> Result<Self> {
		let transport = Transport::new(&config, DEFAULT_REQUEST_TIMEOUT)?;
		let mut auth = AuthCoordinator::new(transport, config, token_store);
		if let Some(store) = config_store {
			auth = auth.with_config_store(store);
		}
		Ok(Self::new(auth))
	}

	/// A handle sharing this session with a different per-request deadline.
	pub fn with_timeout(&self, timeout: Duration) -> Self {
		Self {
			timeout,
			..self.clone()
		}
	}

	pub fn with_stream_settings(mut self, settings: StreamSettings) -> Self {
		self.stream_settings = settings;
		self
	}

	pub fn auth(&self) -> &AuthCoordinator {
		&self.auth
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Read a document, downloading URLs with the pinned-CA client.
	pub async fn load_document(&self, source: &DocumentSource, format: Option<Format>) -> Result<ResourceDocument> {
		source.load(self.auth.transport().http(), format).await
	}

	/// Start a background reader and return it as a lazy sequence.
	pub fn notifications(&self, scope: ScopeParams, cancel: CancellationToken) -> NotificationStream {
		NotificationStream::spawn(self.clone(), scope, self.stream_settings.clone(), cancel)
	}

	/// `/api/<version>/<segments...>`
	pub(crate) async fn api_path(&self, segments: &[&str]) -> String {
		let mut path = format!("/api/{}", self.auth.config().await.api_version());
		for segment in segments {
			path.push('/');
			path.push_str(segment);
		}
		path
	}

	/// Send with a fresh bearer token; on 401 refresh once and replay.
	async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
		let request = request.timeout(self.timeout);
		let (token, seen) = self.auth.ensure_fresh().await?;

		match self.auth.transport().send(request.clone().bearer(token)).await {
			Err(e) if e.is_unauthorized() => {
				debug!(path = request.path(), "access token rejected; refreshing");
				let token = self.auth.force_refresh(seen).await?;
				self.auth.transport().send(request.bearer(token)).await
			}
			other => other,
		}
	}

	async fn fetch_as(&self, request: ApiRequest, output: Format) -> Result<Vec<u8>> {
		let response = self.execute(request).await?;
		Ok(convert(Format::Json, output, &response.body)?)
	}
}

#[derive(Serialize)]
struct PasswordChange<'a> {
	#[serde(rename = "userName")]
	user_name: &'a str,
	password: &'a str,
}

/// Encode a password change into a buffer that is zeroized on drop.
///
/// The buffer is sized for the worst-case escaping up front so it is never
/// reallocated, which would leave a copy of the password behind.
fn password_change_body(user: &str, password: &SecretString) -> Result<Secret<Vec<u8>>> {
	let capacity = 64 + 6 * (user.len() + password.expose().len());
	let mut body = Secret::new(Vec::with_capacity(capacity));
	let change = PasswordChange {
		user_name: user,
		password: password.expose(),
	};
	serde_json::to_writer(body.expose_mut(), &change).map_err(|e| ClientError::Input(e.to_string()))?;
	Ok(body)
}

/// A name that is safe to place in a single path segment.
fn segment<'a>(value: &'a str, what: &str) -> Result<&'a str> {
	let value = value.trim();
	if value.is_empty() {
		return Err(ClientError::Input(format!("{what} must not be empty")));
	}
	if value.contains(&['/', '?', '#'][..]) {
		return Err(ClientError::Input(format!("invalid {what}: {value:?}")));
	}
	Ok(value)
}

#[async_trait]
impl VampApi for RestClient {
	async fn login(&self, username: &str, password: SecretString) -> Result<TokenPair> {
		self.auth.login(username, password).await
	}

	async fn refresh(&self) -> Result<TokenPair> {
		self.auth.refresh().await
	}

	async fn logout(&self) -> Result<()> {
		self.auth.logout().await
	}

	#[instrument(skip_all, fields(kind = %kind, name = %name))]
	async fn create(
		&self,
		kind: ResourceKind,
		name: &str,
		document: &ResourceDocument,
		scope: &ScopeParams,
	) -> Result<()> {
		let body = document.to_api_json(kind)?;
		let path = self.api_path(&[kind.path()]).await;
		self.execute(ApiRequest::post(path).scope(scope).json(body))
			.await?;
		info!("resource created");
		Ok(())
	}

	#[instrument(skip_all, fields(kind = %kind, name = %name))]
	async fn update(
		&self,
		kind: ResourceKind,
		name: &str,
		document: &ResourceDocument,
		scope: &ScopeParams,
	) -> Result<()> {
		let name = segment(name, "name")?;
		let body = document.to_api_json(kind)?;
		let path = self.api_path(&[kind.path(), name]).await;
		self.execute(ApiRequest::put(path).scope(scope).json(body))
			.await?;
		info!("resource updated");
		Ok(())
	}

	#[instrument(skip_all, fields(kind = %kind, name = %name))]
	async fn delete(&self, kind: ResourceKind, name: &str, scope: &ScopeParams) -> Result<()> {
		let name = segment(name, "name")?;
		let path = self.api_path(&[kind.path(), name]).await;
		self.execute(ApiRequest::delete(path).scope(scope)).await?;
		info!("resource deleted");
		Ok(())
	}

	#[instrument(skip_all, fields(kind = %kind, name = %name))]
	async fn get(&self, kind: ResourceKind, name: &str, output: Format, scope: &ScopeParams) -> Result<Vec<u8>> {
		let name = segment(name, "name")?;
		let path = self.api_path(&[kind.path(), name]).await;
		self.fetch_as(ApiRequest::get(path).scope(scope), output).await
	}

	#[instrument(skip_all, fields(kind = %kind, name = %name))]
	async fn get_spec(&self, kind: ResourceKind, name: &str, output: Format, scope: &ScopeParams) -> Result<Vec<u8>> {
		let name = segment(name, "name")?;
		let path = self.api_path(&[kind.path(), name, "spec"]).await;
		self.fetch_as(ApiRequest::get(path).scope(scope), output).await
	}

	#[instrument(skip_all, fields(kind = %kind, simple = simple))]
	async fn list(&self, kind: ResourceKind, output: Format, scope: &ScopeParams, simple: bool) -> Result<Vec<u8>> {
		let path = self.api_path(&[kind.path()]).await;
		let request = ApiRequest::get(path)
			.scope(scope)
			.query_pair("simple", simple.to_string());
		self.fetch_as(request, output).await
	}

	#[instrument(skip_all, fields(kind = %kind, name = %name))]
	async fn merge(
		&self,
		kind: ResourceKind,
		name: &str,
		patch: &ResourceDocument,
		scope: &ScopeParams,
	) -> Result<()> {
		let current = self.get_spec(kind, name, Format::Json, scope).await?;
		let mut merged = parse(Format::Json, &current)?;
		merge_values(&mut merged, parse(patch.format, &patch.body)?);
		debug!("patch merged into current spec");

		let document = ResourceDocument::json(emit(Format::Json, &merged)?).with_hosts(patch.hosts.clone());
		self.update(kind, name, &document, scope).await
	}

	#[instrument(skip_all, fields(username = %username))]
	async fn update_password(&self, username: &str, password: SecretString, scope: &ScopeParams) -> Result<()> {
		let user = segment(username, "username")?;
		let body = password_change_body(user, &password)?;
		drop(password);

		let path = self.api_path(&[ResourceKind::User.path(), user, "password"]).await;
		self.execute(ApiRequest::put(path).scope(scope).secret_json(body))
			.await?;
		info!("password updated");
		Ok(())
	}

	#[instrument(skip_all, fields(metric = %name))]
	async fn push_metric_value(&self, name: &str, document: &ResourceDocument, scope: &ScopeParams) -> Result<()> {
		let name = segment(name, "metric name")?;
		let body = document.to_api_json(ResourceKind::Metric)?;
		let path = self.api_path(&[ResourceKind::Metric.path(), name, "values"]).await;
		self.execute(ApiRequest::post(path).scope(scope).json(body))
			.await?;
		debug!("metric value pushed");
		Ok(())
	}

	#[instrument(skip_all, fields(username = %username, role = %role))]
	async fn add_role_to_user(&self, username: &str, role: &str, scope: &ScopeParams) -> Result<()> {
		let user = segment(username, "username")?;
		let role = segment(role, "role")?;
		let path = self
			.api_path(&[ResourceKind::User.path(), user, ResourceKind::Role.path(), role])
			.await;
		self.execute(ApiRequest::post(path).scope(scope)).await?;
		info!("role granted");
		Ok(())
	}

	#[instrument(skip_all, fields(username = %username, role = %role))]
	async fn remove_role_from_user(&self, username: &str, role: &str, scope: &ScopeParams) -> Result<()> {
		let user = segment(username, "username")?;
		let role = segment(role, "role")?;
		let path = self
			.api_path(&[ResourceKind::User.path(), user, ResourceKind::Role.path(), role])
			.await;
		self.execute(ApiRequest::delete(path).scope(scope)).await?;
		info!("role revoked");
		Ok(())
	}

	/// Reachability check. Sends the current token when one is valid but
	/// never refreshes.
	async fn ping(&self) -> Result<()> {
		let mut request = ApiRequest::get(self.api_path(&["ping"]).await).timeout(self.timeout);
		if let Some(token) = self.auth.current_bearer().await {
			request = request.bearer(token);
		}
		self.auth.transport().send(request).await?;
		Ok(())
	}

	async fn read_notifications(
		&self,
		sink: mpsc::Sender<Notification>,
		scope: &ScopeParams,
		cancel: CancellationToken,
	) -> Result<()> {
		let stats = StreamStats::default();
		notifications::run(self, sink, scope, &self.stream_settings, &cancel, &stats).await
	}
}
