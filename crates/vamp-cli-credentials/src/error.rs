// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token cache error types.

/// Errors surfaced by mutating token-store operations.
#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
	#[error("token cache I/O error: {0}")]
	Io(String),

	#[error("token cache serialization error: {0}")]
	Serde(String),
}

impl From<std::io::Error> for TokenStoreError {
	fn from(err: std::io::Error) -> Self {
		TokenStoreError::Io(err.to_string())
	}
}

impl From<serde_yaml::Error> for TokenStoreError {
	fn from(err: serde_yaml::Error) -> Self {
		TokenStoreError::Serde(err.to_string())
	}
}
