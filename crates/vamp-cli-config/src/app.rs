// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application name handling.
//!
//! The binary may be installed under another name (a vendor rebrand, a
//! symlink), so the name is taken from `argv[0]` once at start-up and passed
//! around explicitly.

use std::path::Path;

pub const DEFAULT_APP_NAME: &str = "vamp";

/// Literal placeholder replaced in help text.
pub const APP_NAME_PLACEHOLDER: &str = "$AppName";

/// Derive the application name from the invocation path.
pub fn app_name_from_argv0(argv0: Option<&str>) -> String {
	argv0
		.and_then(|arg| Path::new(arg).file_stem())
		.and_then(|stem| stem.to_str())
		.map(str::trim)
		.filter(|name| !name.is_empty())
		.map(str::to_string)
		.unwrap_or_else(|| DEFAULT_APP_NAME.to_string())
}

/// Replace every `$AppName` in `text` with `app_name`.
pub fn substitute_app_name(text: &str, app_name: &str) -> String {
	text.replace(APP_NAME_PLACEHOLDER, app_name)
}
