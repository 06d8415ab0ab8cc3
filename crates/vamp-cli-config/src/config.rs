// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The client configuration document.

use std::fmt;

use serde::{Deserialize, Serialize};
use vamp_common_secret::{SecretString, REDACTED};

use crate::ConfigError;

pub const DEFAULT_API_VERSION: &str = "v1";

/// Client configuration, persisted as YAML.
///
/// Invariant: a non-empty `access_token` has a positive `expiration_time`.
/// [`ClientConfig::normalize`] drops an access token that has expired.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	pub url: String,
	/// PEM CA bundle the server certificate must chain to.
	#[serde(rename = "cert")]
	pub pinned_ca_certificate: String,
	pub username: String,
	pub refresh_token: String,
	pub access_token: String,
	/// Unix seconds after which `access_token` must not be presented.
	pub expiration_time: i64,
	pub project: String,
	pub cluster: String,
	#[serde(rename = "virtualcluster")]
	pub virtual_cluster: String,
	#[serde(rename = "apiversion")]
	pub api_version: String,
}

impl ClientConfig {
	/// API version segment, defaulting to `v1`.
	pub fn api_version(&self) -> &str {
		if self.api_version.is_empty() {
			DEFAULT_API_VERSION
		} else {
			&self.api_version
		}
	}

	/// True when the access token may be presented at `now`.
	pub fn has_valid_access_token(&self, now: i64) -> bool {
		!self.access_token.is_empty() && now < self.expiration_time
	}

	/// The access token as a bearer credential, if one is present.
	pub fn bearer(&self) -> Option<SecretString> {
		(!self.access_token.is_empty()).then(|| SecretString::new(self.access_token.clone()))
	}

	/// The refresh token, if one is present.
	pub fn refresh_credential(&self) -> Option<SecretString> {
		(!self.refresh_token.is_empty()).then(|| SecretString::new(self.refresh_token.clone()))
	}

	/// Enforce the access-token invariant at `now`.
	pub fn normalize(&mut self, now: i64) {
		if !self.access_token.is_empty() && self.expiration_time <= now {
			tracing::debug!(expiration_time = self.expiration_time, now, "dropping expired access token");
			self.clear_access_token();
		}
		if self.access_token.is_empty() {
			self.expiration_time = 0;
		}
	}

	pub fn clear_access_token(&mut self) {
		self.access_token.clear();
		self.expiration_time = 0;
	}

	/// Forget every credential (logout).
	pub fn clear_credentials(&mut self) {
		self.clear_access_token();
		self.refresh_token.clear();
		self.username.clear();
	}

	/// Set a user-editable key by its on-disk name.
	pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
		let value = value.trim().to_string();
		match key {
			"url" => {
				if !value.is_empty() && !(value.starts_with("https://") || value.starts_with("http://")) {
					return Err(ConfigError::invalid_value("url", "must start with https:// or http://"));
				}
				self.url = value.trim_end_matches('/').to_string();
			}
			"cert" => self.pinned_ca_certificate = value,
			"username" => self.username = value,
			"project" => self.project = value,
			"cluster" => self.cluster = value,
			"virtualcluster" | "virtual_cluster" => self.virtual_cluster = value,
			"apiversion" | "api_version" => self.api_version = value,
			other => return Err(ConfigError::UnknownKey(other.to_string())),
		}
		Ok(())
	}
}

fn redact(value: &str) -> &str {
	if value.is_empty() {
		""
	} else {
		REDACTED
	}
}

impl fmt::Debug for ClientConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientConfig")
			.field("url", &self.url)
			.field("pinned_ca_certificate", &!self.pinned_ca_certificate.is_empty())
			.field("username", &self.username)
			.field("refresh_token", &redact(&self.refresh_token))
			.field("access_token", &redact(&self.access_token))
			.field("expiration_time", &self.expiration_time)
			.field("project", &self.project)
			.field("cluster", &self.cluster)
			.field("virtual_cluster", &self.virtual_cluster)
			.field("api_version", &self.api_version)
			.finish()
	}
}
