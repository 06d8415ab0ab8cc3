// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Config file path resolution.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::ConfigError;

/// Environment variable holding an explicit config file path.
pub const CONFIG_ENV_VAR: &str = "CONFIG";

/// Resolve the config file path.
///
/// Order: explicit path, `$CONFIG`, then `$HOME/.<app_name>/config.yaml`.
pub fn resolve_config_path(explicit: Option<&Path>, app_name: &str) -> Result<PathBuf, ConfigError> {
	resolve_from(
		explicit,
		std::env::var_os(CONFIG_ENV_VAR),
		dirs::home_dir(),
		app_name,
	)
}

fn resolve_from(
	explicit: Option<&Path>,
	env_config: Option<OsString>,
	home: Option<PathBuf>,
	app_name: &str,
) -> Result<PathBuf, ConfigError> {
	if let Some(path) = explicit {
		return Ok(path.to_path_buf());
	}
	if let Some(path) = env_config.filter(|p| !p.is_empty()) {
		return Ok(PathBuf::from(path));
	}
	let home = home.ok_or(ConfigError::HomeDirNotFound)?;
	let path = home.join(format!(".{app_name}")).join("config.yaml");

	tracing::debug!(path = %path.display(), "resolved default config path");
	Ok(path)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn explicit_path_wins() {
		let path = resolve_from(
			Some(Path::new("/etc/vamp.yaml")),
			Some(OsString::from("/tmp/env.yaml")),
			Some(PathBuf::from("/home/op")),
			"vamp",
		)
		.unwrap();
		assert_eq!(path, PathBuf::from("/etc/vamp.yaml"));
	}

	#[test]
	fn env_variable_beats_home() {
		let path = resolve_from(
			None,
			Some(OsString::from("/tmp/env.yaml")),
			Some(PathBuf::from("/home/op")),
			"vamp",
		)
		.unwrap();
		assert_eq!(path, PathBuf::from("/tmp/env.yaml"));
	}

	#[test]
	fn empty_env_variable_is_ignored() {
		let path = resolve_from(None, Some(OsString::new()), Some(PathBuf::from("/home/op")), "vamp").unwrap();
		assert_eq!(path, PathBuf::from("/home/op/.vamp/config.yaml"));
	}

	#[test]
	fn default_path_uses_app_name() {
		let path = resolve_from(None, None, Some(PathBuf::from("/home/op")), "meshctl").unwrap();
		assert_eq!(path, PathBuf::from("/home/op/.meshctl/config.yaml"));
	}

	#[test]
	fn missing_home_is_an_error() {
		let err = resolve_from(None, None, None, "vamp").unwrap_err();
		assert!(matches!(err, ConfigError::HomeDirNotFound));
	}
}
