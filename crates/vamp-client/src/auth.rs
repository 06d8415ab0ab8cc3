// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OAuth2 session management.
//!
//! The coordinator owns the in-memory [`ClientConfig`], exchanges the
//! password or refresh token at the token endpoint, persists rotated tokens
//! and makes sure that at most one refresh is in flight at a time.
//!
//! # Single-flight refresh
//!
//! Every completed refresh bumps an epoch counter and leaves its outcome in
//! the gate. [`AuthCoordinator::ensure_fresh`] hands out a token together
//! with the epoch it was issued in. When the server rejects that token the
//! caller passes the epoch back; if the epoch has moved by the time it holds
//! the gate, someone else already did the work and the stored outcome is
//! returned without another request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use vamp_cli_config::{ClientConfig, ConfigStore};
use vamp_cli_credentials::{now_unix, TokenStore};
use vamp_common_secret::SecretString;

use crate::error::{ClientError, Result};
use crate::transport::{ApiRequest, Transport};

/// Token endpoint, relative to the base URL.
pub const OAUTH_TOKEN_PATH: &str = "/oauth/access_token";

/// OAuth client id the control plane issues CLI tokens for.
pub const OAUTH_CLIENT_ID: &str = "frontend";

/// Session timing knobs.
#[derive(Debug, Clone)]
pub struct AuthSettings {
	/// Subtracted from `expires_in` so a token is refreshed before the server
	/// starts rejecting it.
	pub expiry_slack: Duration,
	/// How long a refresh token is kept in the token cache.
	pub refresh_token_ttl: Duration,
}

impl Default for AuthSettings {
	fn default() -> Self {
		Self {
			expiry_slack: Duration::from_secs(30),
			refresh_token_ttl: Duration::from_secs(30 * 24 * 60 * 60),
		}
	}
}

/// The credentials of an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
	pub access_token: SecretString,
	pub refresh_token: SecretString,
	/// Unix seconds after which the access token is no longer presented.
	pub expiration_time: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: SecretString,
	#[serde(default)]
	refresh_token: Option<SecretString>,
	expires_in: i64,
}

/// Cloneable record of a failed refresh, replayed to callers that joined it.
#[derive(Debug, Clone)]
enum RefreshFailure {
	ReauthRequired,
	NotAuthenticated,
	AuthTransport(String),
	HttpStatus { status: u16, body: String },
	Decode(String),
	Other(String),
}

impl From<&ClientError> for RefreshFailure {
	fn from(err: &ClientError) -> Self {
		match err {
			ClientError::ReauthRequired => Self::ReauthRequired,
			ClientError::NotAuthenticated => Self::NotAuthenticated,
			ClientError::AuthTransport(message) => Self::AuthTransport(message.clone()),
			ClientError::HttpStatus { status, body } => Self::HttpStatus {
				status: *status,
				body: body.clone(),
			},
			ClientError::Decode(message) => Self::Decode(message.clone()),
			other => Self::Other(other.to_string()),
		}
	}
}

impl From<RefreshFailure> for ClientError {
	fn from(failure: RefreshFailure) -> Self {
		match failure {
			RefreshFailure::ReauthRequired => ClientError::ReauthRequired,
			RefreshFailure::NotAuthenticated => ClientError::NotAuthenticated,
			RefreshFailure::AuthTransport(message) => ClientError::AuthTransport(message),
			RefreshFailure::HttpStatus { status, body } => ClientError::HttpStatus { status, body },
			RefreshFailure::Decode(message) => ClientError::Decode(message),
			RefreshFailure::Other(message) => ClientError::Io(message),
		}
	}
}

type RefreshOutcome = std::result::Result<TokenPair, RefreshFailure>;

/// Owns the session credentials and every transition between them.
#[derive(Debug)]
pub struct AuthCoordinator {
	transport: Transport,
	config: RwLock<ClientConfig>,
	config_store: Option<ConfigStore>,
	token_store: Arc<dyn TokenStore>,
	settings: AuthSettings,
	epoch: AtomicU64,
	gate: Mutex<Option<RefreshOutcome>>,
}

impl AuthCoordinator {
	pub fn new(transport: Transport, config: ClientConfig, token_store: Arc<dyn TokenStore>) -> Self {
		Self {
			transport,
			config: RwLock::new(config),
			config_store: None,
			token_store,
			settings: AuthSettings::default(),
			epoch: AtomicU64::new(0),
			gate: Mutex::new(None),
		}
	}

	/// Persist every credential change to `store`.
	pub fn with_config_store(mut self, store: ConfigStore) -> Self {
		self.config_store = Some(store);
		self
	}

	pub fn with_settings(mut self, settings: AuthSettings) -> Self {
		self.settings = settings;
		self
	}

	pub fn transport(&self) -> &Transport {
		&self.transport
	}

	pub fn token_store(&self) -> &Arc<dyn TokenStore> {
		&self.token_store
	}

	/// Snapshot of the current configuration.
	pub async fn config(&self) -> ClientConfig {
		self.config.read().await.clone()
	}

	/// Number of refreshes (and logins) completed so far.
	pub fn refresh_epoch(&self) -> u64 {
		self.epoch.load(Ordering::SeqCst)
	}

	/// The access token, if it may still be presented.
	pub async fn current_bearer(&self) -> Option<SecretString> {
		self.current_pair().await.map(|pair| pair.access_token)
	}

	async fn current_pair(&self) -> Option<TokenPair> {
		let config = self.config.read().await;
		if !config.has_valid_access_token(now_unix()) {
			return None;
		}
		Some(TokenPair {
			access_token: config.bearer()?,
			refresh_token: config.refresh_credential().unwrap_or_else(|| SecretString::from("")),
			expiration_time: config.expiration_time,
		})
	}

	/// Exchange a username and password for a session.
	///
	/// The password is consumed and zeroized once the request is sent.
	#[instrument(skip_all, fields(username = %username))]
	pub async fn login(&self, username: &str, password: SecretString) -> Result<TokenPair> {
		let mut gate = self.gate.lock().await;

		let form = vec![
			("username", SecretString::from(username)),
			("password", password),
			("client_id", SecretString::from(OAUTH_CLIENT_ID)),
			("grant_type", SecretString::from("password")),
		];
		let response = self
			.transport
			.send(ApiRequest::post(OAUTH_TOKEN_PATH).form(form))
			.await
			.map_err(|e| match e {
				ClientError::HttpStatus { status, .. } if (400..500).contains(&status) => {
					warn!(status, "login rejected");
					ClientError::AuthDenied
				}
				ClientError::HttpStatus { status, body } => {
					ClientError::AuthTransport(format!("token endpoint returned {status}: {body}"))
				}
				ClientError::Transport(e) => ClientError::AuthTransport(e.to_string()),
				other => other,
			})?;

		let tokens: TokenResponse = response.json()?;
		let pair = self.apply_tokens(tokens, Some(username)).await?;

		*gate = Some(Ok(pair.clone()));
		self.epoch.fetch_add(1, Ordering::SeqCst);
		info!("login succeeded");
		Ok(pair)
	}

	/// Rotate the refresh token now, joining a refresh already in flight.
	pub async fn refresh(&self) -> Result<TokenPair> {
		let seen = self.refresh_epoch();
		self.refresh_once(seen, false).await
	}

	/// A bearer token that is valid right now, refreshing first if needed,
	/// together with the refresh epoch that token belongs to.
	///
	/// Pass the epoch to [`force_refresh`](Self::force_refresh) when the
	/// server rejects the token.
	pub async fn ensure_fresh(&self) -> Result<(SecretString, u64)> {
		let mut gate = self.gate.lock().await;
		let seen = self.refresh_epoch();
		if let Some(token) = self.current_bearer().await {
			return Ok((token, seen));
		}
		let pair = self.refresh_locked(&mut gate, seen, true).await?;
		Ok((pair.access_token, self.refresh_epoch()))
	}

	/// Refresh after the server rejected a token issued at `seen_epoch`.
	///
	/// When a refresh already completed since then, its outcome is reused.
	pub async fn force_refresh(&self, seen_epoch: u64) -> Result<SecretString> {
		self.refresh_once(seen_epoch, false)
			.await
			.map(|pair| pair.access_token)
	}

	/// Forget the session locally and clear the token cache.
	#[instrument(skip_all)]
	pub async fn logout(&self) -> Result<()> {
		let mut gate = self.gate.lock().await;
		let snapshot = {
			let mut config = self.config.write().await;
			config.clear_credentials();
			config.clone()
		};
		self.persist(&snapshot).await?;
		self.token_store.clean().await?;

		*gate = Some(Err(RefreshFailure::NotAuthenticated));
		self.epoch.fetch_add(1, Ordering::SeqCst);
		info!("logged out");
		Ok(())
	}

	async fn refresh_once(&self, seen: u64, reuse_valid: bool) -> Result<TokenPair> {
		let mut gate = self.gate.lock().await;
		self.refresh_locked(&mut gate, seen, reuse_valid).await
	}

	/// Refresh while holding the gate. Every credential change happens under
	/// the gate, so the epoch read here matches the config.
	async fn refresh_locked(
		&self,
		gate: &mut Option<RefreshOutcome>,
		seen: u64,
		reuse_valid: bool,
	) -> Result<TokenPair> {
		if self.epoch.load(Ordering::SeqCst) != seen {
			if let Some(outcome) = gate.as_ref() {
				debug!("reusing outcome of a concurrent refresh");
				return outcome.clone().map_err(ClientError::from);
			}
		}
		if reuse_valid {
			if let Some(pair) = self.current_pair().await {
				return Ok(pair);
			}
		}

		let outcome = self.perform_refresh().await;
		*gate = Some(match &outcome {
			Ok(pair) => Ok(pair.clone()),
			Err(e) => Err(RefreshFailure::from(e)),
		});
		self.epoch.fetch_add(1, Ordering::SeqCst);
		outcome
	}

	#[instrument(skip_all)]
	async fn perform_refresh(&self) -> Result<TokenPair> {
		let refresh_token = self
			.config
			.read()
			.await
			.refresh_credential()
			.ok_or(ClientError::NotAuthenticated)?;

		let now = now_unix();
		if let Some(expiry) = self.token_store.get(refresh_token.expose()).await {
			if expiry <= now {
				warn!(expiry, now, "cached refresh token has expired");
				self.expire_access_token().await;
				return Err(ClientError::ReauthRequired);
			}
		}
		if let Err(e) = self.token_store.remove_expired_at(now).await {
			warn!(error = %e, "failed to sweep token cache");
		}

		let form = vec![
			("refresh_token", refresh_token),
			("grant_type", SecretString::from("refresh_token")),
			("client_id", SecretString::from(OAUTH_CLIENT_ID)),
		];
		let response = match self
			.transport
			.send(ApiRequest::post(OAUTH_TOKEN_PATH).form(form))
			.await
		{
			Ok(response) => response,
			Err(ClientError::HttpStatus { status, body })
				if status == 401 || (status == 400 && body.contains("invalid_grant")) =>
			{
				warn!(status, "refresh token rejected");
				self.expire_access_token().await;
				return Err(ClientError::ReauthRequired);
			}
			Err(ClientError::HttpStatus { status, body }) if status >= 500 => {
				return Err(ClientError::AuthTransport(format!(
					"token endpoint returned {status}: {body}"
				)));
			}
			Err(ClientError::Transport(e)) => return Err(ClientError::AuthTransport(e.to_string())),
			Err(e) => return Err(e),
		};

		let tokens: TokenResponse = response.json()?;
		let pair = self.apply_tokens(tokens, None).await?;
		info!(expiration_time = pair.expiration_time, "access token refreshed");
		Ok(pair)
	}

	/// Install a token response: update and persist the config, then record
	/// the refresh token in the cache and drop the one it replaced.
	async fn apply_tokens(&self, tokens: TokenResponse, username: Option<&str>) -> Result<TokenPair> {
		let now = now_unix();
		let slack = self.settings.expiry_slack.as_secs() as i64;
		let expiration_time = now.saturating_add(tokens.expires_in.saturating_sub(slack).max(1));

		let (pair, previous, snapshot) = {
			let mut config = self.config.write().await;
			let previous = config.refresh_credential();
			let refresh_token = match tokens.refresh_token.filter(|t| !t.is_empty()) {
				Some(token) => token,
				// Login starts a new session; a refresh keeps the old token.
				None if username.is_some() => SecretString::from(""),
				None => previous.clone().unwrap_or_else(|| SecretString::from("")),
			};

			config.access_token = tokens.access_token.expose().clone();
			config.refresh_token = refresh_token.expose().clone();
			config.expiration_time = expiration_time;
			if let Some(username) = username {
				config.username = username.to_string();
			}

			let pair = TokenPair {
				access_token: tokens.access_token,
				refresh_token,
				expiration_time,
			};
			(pair, previous, config.clone())
		};

		self.persist(&snapshot).await?;
		self.remember_refresh_token(&pair.refresh_token, previous.as_ref(), now)
			.await;
		Ok(pair)
	}

	async fn remember_refresh_token(&self, current: &SecretString, previous: Option<&SecretString>, now: i64) {
		if !current.is_empty() {
			let expiry = now.saturating_add(self.settings.refresh_token_ttl.as_secs() as i64);
			if let Err(e) = self.token_store.store(current.expose(), expiry).await {
				warn!(error = %e, "failed to cache refresh token");
			}
		}
		if let Some(previous) = previous.filter(|previous| *previous != current) {
			if let Err(e) = self.token_store.remove(previous.expose()).await {
				warn!(error = %e, "failed to drop rotated refresh token");
			}
		}
	}

	/// Drop the access token but keep the refresh token for the next login hint.
	async fn expire_access_token(&self) {
		let snapshot = {
			let mut config = self.config.write().await;
			config.clear_access_token();
			config.clone()
		};
		if let Err(e) = self.persist(&snapshot).await {
			warn!(error = %e, "failed to persist expired session");
		}
	}

	async fn persist(&self, config: &ClientConfig) -> Result<()> {
		if let Some(store) = &self.config_store {
			store.write(config).await?;
		}
		Ok(())
	}
}
