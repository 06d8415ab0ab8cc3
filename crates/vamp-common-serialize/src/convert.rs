// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde_json::Value;
use tracing::debug;

use crate::{Format, Result, SerializeError};

/// Parse a document into the normalized tree.
///
/// Mapping keys are kept in document order; integers stay integers and
/// floats stay floats.
pub fn parse(format: Format, bytes: &[u8]) -> Result<Value> {
	match format {
		Format::Json => serde_json::from_slice(bytes).map_err(|e| SerializeError::Parse {
			format,
			message: e.to_string(),
		}),
		Format::Yaml => serde_yaml::from_slice(bytes).map_err(|e| SerializeError::Parse {
			format,
			message: e.to_string(),
		}),
	}
}

/// Serialize a tree. JSON output is compact, which is what the API receives.
pub fn emit(format: Format, value: &Value) -> Result<Vec<u8>> {
	match format {
		Format::Json => serde_json::to_vec(value).map_err(|e| SerializeError::Emit {
			format,
			message: e.to_string(),
		}),
		Format::Yaml => serde_yaml::to_string(value)
			.map(String::into_bytes)
			.map_err(|e| SerializeError::Emit {
				format,
				message: e.to_string(),
			}),
	}
}

/// Convert `bytes` from `input` to `output`. Matching formats pass through untouched.
pub fn convert(input: Format, output: Format, bytes: &[u8]) -> Result<Vec<u8>> {
	if input == output {
		return Ok(bytes.to_vec());
	}
	debug!(%input, %output, len = bytes.len(), "converting document");
	let value = parse(input, bytes)?;
	emit(output, &value)
}
