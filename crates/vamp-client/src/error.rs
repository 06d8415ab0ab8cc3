// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the vamp client.

use std::time::Duration;

use thiserror::Error;
use vamp_cli_config::ConfigError;
use vamp_cli_credentials::TokenStoreError;
use vamp_common_serialize::SerializeError;

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
	/// Bad arguments, unsupported format, malformed URL.
	#[error("invalid input: {0}")]
	Input(String),

	/// Resource kind missing from the kind table.
	#[error("unknown resource type: {0}")]
	UnknownResource(String),

	/// Local file read/write or document download failure.
	#[error("I/O error: {0}")]
	Io(String),

	/// YAML/JSON conversion or merge failure.
	#[error(transparent)]
	Serialize(#[from] SerializeError),

	/// Network layer failure, including TLS and timeouts.
	#[error("{0}")]
	Transport(#[source] reqwest::Error),

	/// No bytes arrived on a long-lived response within the watchdog window.
	#[error("no data received for {0:?}")]
	IdleTimeout(Duration),

	/// Non-2xx response from the backend.
	#[error("server returned {status}: {body}")]
	HttpStatus { status: u16, body: String },

	/// Credentials rejected at login.
	#[error("authentication failed")]
	AuthDenied,

	/// The token endpoint could not be reached or failed server-side.
	#[error("authentication service unavailable: {0}")]
	AuthTransport(String),

	/// Refresh token rejected; the operator has to log in again.
	#[error("session expired; please login")]
	ReauthRequired,

	/// No usable access token and no refresh token.
	#[error("not logged in; please login")]
	NotAuthenticated,

	/// A 2xx body that could not be decoded.
	#[error("invalid response from server: {0}")]
	Decode(String),

	#[error(transparent)]
	TokenStore(#[from] TokenStoreError),

	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The operation was cancelled before it completed.
	#[error("operation cancelled")]
	Cancelled,
}

impl ClientError {
	/// HTTP status carried by the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			ClientError::HttpStatus { status, .. } => Some(*status),
			ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
			_ => None,
		}
	}

	pub fn is_unauthorized(&self) -> bool {
		self.status() == Some(401)
	}

	/// True for failures a reconnect loop should ride out.
	pub fn is_transient(&self) -> bool {
		match self {
			ClientError::Transport(_) | ClientError::IdleTimeout(_) | ClientError::AuthTransport(_) => true,
			ClientError::HttpStatus { status, .. } => matches!(*status, 408 | 429 | 500..=599),
			_ => false,
		}
	}
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
