// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loading and saving the client configuration file.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::{paths, ClientConfig, ConfigError};

/// Reads and atomically rewrites one config file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
	path: PathBuf,
}

impl ConfigStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Resolve the config path for `app_name` and make sure its directory exists.
	pub fn resolve(explicit: Option<&Path>, app_name: &str) -> Result<Self, ConfigError> {
		let path = paths::resolve_config_path(explicit, app_name)?;
		if let Some(parent) = path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent)?;
			}
		}
		Ok(Self::new(path))
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Load the config. A missing file yields the defaults.
	pub async fn read(&self) -> Result<ClientConfig, ConfigError> {
		let contents = match fs::read_to_string(&self.path).await {
			Ok(contents) => contents,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				debug!(path = %self.path.display(), "no config file, using defaults");
				return Ok(ClientConfig::default());
			}
			Err(e) => return Err(e.into()),
		};

		let mut config: ClientConfig = if contents.trim().is_empty() {
			ClientConfig::default()
		} else {
			serde_yaml::from_str(&contents).map_err(|source| ConfigError::YamlParse {
				path: self.path.clone(),
				source,
			})?
		};
		config.normalize(chrono::Utc::now().timestamp());
		Ok(config)
	}

	/// Write the config through a temporary file and a rename.
	pub async fn write(&self, config: &ClientConfig) -> Result<(), ConfigError> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent).await?;
			}
		}

		let contents = serde_yaml::to_string(config).map_err(ConfigError::YamlWrite)?;

		let temp_path = self.path.with_extension("yaml.tmp");
		if let Err(e) = replace_file(&temp_path, &self.path, contents.as_bytes()).await {
			if let Err(cleanup) = fs::remove_file(&temp_path).await {
				debug!(path = ?temp_path, error = %cleanup, "temporary file not removed");
			}
			return Err(e.into());
		}
		debug!(path = %self.path.display(), "config written");
		Ok(())
	}
}

/// Write `contents` to `temp_path`, then rename it over `path`.
async fn replace_file(temp_path: &Path, path: &Path, contents: &[u8]) -> std::io::Result<()> {
	let mut file = fs::File::create(temp_path).await?;
	file.write_all(contents).await?;
	file.sync_all().await?;
	drop(file);

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		let perms = std::fs::Permissions::from_mode(0o644);
		if let Err(e) = fs::set_permissions(temp_path, perms).await {
			warn!(path = ?temp_path, error = %e, "failed to set config file permissions");
		}
	}

	fs::rename(temp_path, path).await
}
