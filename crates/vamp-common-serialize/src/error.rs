// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::Format;

/// Errors raised while converting or merging documents.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
	#[error("unsupported format: {0} (expected yaml or json)")]
	UnsupportedFormat(String),

	#[error("invalid {format} document: {message}")]
	Parse { format: Format, message: String },

	#[error("failed to write {format} document: {message}")]
	Emit { format: Format, message: String },
}

pub type Result<T> = std::result::Result<T, SerializeError>;
