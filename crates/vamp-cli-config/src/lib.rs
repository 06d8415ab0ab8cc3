// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for the vamp CLI.
//!
//! This crate provides:
//! - Config path resolution (`--config`, `$CONFIG`, `~/.<appname>/config.yaml`)
//! - The [`ClientConfig`] document and its access-token expiry invariant
//! - Atomic YAML persistence through [`ConfigStore`]
//! - Application name derivation and `$AppName` help-text substitution

pub mod app;
pub mod config;
pub mod error;
pub mod paths;
pub mod store;

pub use app::{app_name_from_argv0, substitute_app_name, APP_NAME_PLACEHOLDER, DEFAULT_APP_NAME};
pub use config::{ClientConfig, DEFAULT_API_VERSION};
pub use error::ConfigError;
pub use paths::{resolve_config_path, CONFIG_ENV_VAR};
pub use store::ConfigStore;
