// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::SerializeError;

/// Declared format of a resource document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
	#[default]
	Yaml,
	Json,
}

impl Format {
	pub fn as_str(&self) -> &'static str {
		match self {
			Format::Yaml => "yaml",
			Format::Json => "json",
		}
	}

	/// Guess the format from a file name or URL path extension.
	pub fn from_extension(path: impl AsRef<Path>) -> Option<Format> {
		let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
		match ext.as_str() {
			"yaml" | "yml" => Some(Format::Yaml),
			"json" => Some(Format::Json),
			_ => None,
		}
	}
}

impl fmt::Display for Format {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Format {
	type Err = SerializeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"yaml" | "yml" => Ok(Format::Yaml),
			"json" => Ok(Format::Json),
			_ => Err(SerializeError::UnsupportedFormat(s.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_known_names_case_insensitively() {
		assert_eq!("YAML".parse::<Format>().unwrap(), Format::Yaml);
		assert_eq!("yml".parse::<Format>().unwrap(), Format::Yaml);
		assert_eq!(" json ".parse::<Format>().unwrap(), Format::Json);
	}

	#[test]
	fn rejects_unknown_names() {
		let err = "toml".parse::<Format>().unwrap_err();
		assert!(matches!(err, SerializeError::UnsupportedFormat(ref f) if f == "toml"));
	}

	#[test]
	fn infers_from_extension() {
		assert_eq!(Format::from_extension("project.yml"), Some(Format::Yaml));
		assert_eq!(Format::from_extension("/tmp/service.JSON"), Some(Format::Json));
		assert_eq!(Format::from_extension("README"), None);
		assert_eq!(Format::from_extension("notes.txt"), None);
	}
}
