// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration error types.

use std::path::PathBuf;

/// Errors that can occur while locating, loading or saving the client config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// I/O error reading or writing the config file
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// YAML parsing error
	#[error("YAML parse error in {path}: {source}")]
	YamlParse {
		path: PathBuf,
		#[source]
		source: serde_yaml::Error,
	},

	/// YAML serialization error
	#[error("failed to serialize config: {0}")]
	YamlWrite(#[source] serde_yaml::Error),

	/// Unknown key passed to `config set`
	#[error("unknown config key: {0}")]
	UnknownKey(String),

	/// Invalid value
	#[error("invalid value for {field}: {message}")]
	InvalidValue { field: String, message: String },

	/// Home directory not found
	#[error("could not determine home directory")]
	HomeDirNotFound,
}

impl ConfigError {
	/// Create an invalid value error
	pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidValue {
			field: field.into(),
			message: message.into(),
		}
	}
}
