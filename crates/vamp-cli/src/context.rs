// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-invocation state: where the config lives, what it says, and how to
//! build a client from it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;
use vamp_cli_config::{ClientConfig, ConfigStore};
use vamp_cli_credentials::{FileTokenStore, TokenStore};
use vamp_client::{RestClient, ScopeParams};

use crate::cli::Cli;

/// Token cache file, kept next to the config file.
pub const TOKEN_CACHE_FILE: &str = "tokens.yaml";

pub struct AppContext {
	pub app_name: String,
	pub config_store: ConfigStore,
	pub config: ClientConfig,
	/// Stored defaults overlaid with the scope flags.
	pub scope: ScopeParams,
	token_store: Arc<FileTokenStore>,
}

impl AppContext {
	pub async fn load(cli: &Cli, app_name: String) -> Result<Self> {
		let config_store = ConfigStore::resolve(cli.config.as_deref(), &app_name)
			.context("failed to locate configuration")?;
		let config = config_store.read().await?;
		debug!(path = %config_store.path().display(), "configuration loaded");

		let scope = ScopeParams::from_config(&config).overlay(&cli.scope.to_scope());
		let token_store = Arc::new(FileTokenStore::new(token_cache_path(&config_store)));

		Ok(Self {
			app_name,
			config_store,
			config,
			scope,
			token_store,
		})
	}

	/// A client over the loaded configuration.
	pub fn client(&self) -> Result<RestClient> {
		self.client_with(self.config.clone())
	}

	/// A client over `config`, persisting session changes to this context's file.
	pub fn client_with(&self, config: ClientConfig) -> Result<RestClient> {
		let token_store: Arc<dyn TokenStore> = self.token_store.clone();
		Ok(RestClient::from_config(
			config,
			Some(self.config_store.clone()),
			token_store,
		)?)
	}
}

fn token_cache_path(config_store: &ConfigStore) -> PathBuf {
	config_store.path().with_file_name(TOKEN_CACHE_FILE)
}
