// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authenticated REST client for the vamp service-mesh control plane.
//!
//! # Layers
//!
//! - [`Transport`]: one HTTPS request per call, pinned-CA TLS, bearer header,
//!   typed error decoding. Never refreshes tokens.
//! - [`AuthCoordinator`]: OAuth2 password login, refresh-token rotation,
//!   single-flight refresh, token-cache integration.
//! - [`RestClient`]: the [`VampApi`] capability set over typed
//!   [`ResourceKind`]s with [`ScopeParams`].
//! - [`NotificationStream`]: long-lived notification feed with reconnection.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vamp_client::{RestClient, ResourceKind, ScopeParams, VampApi};
//! use vamp_cli_credentials::MemoryTokenStore;
//! use vamp_common_serialize::Format;
//!
//! let client = RestClient::from_config(config, Some(config_store), Arc::new(MemoryTokenStore::new()))?;
//! let projects = client.list(ResourceKind::Project, Format::Yaml, &ScopeParams::default(), true).await?;
//! ```

mod api;
mod auth;
mod client;
mod document;
mod error;
mod notifications;
mod resource;
mod scope;
mod transport;

pub use api::VampApi;
pub use auth::{AuthCoordinator, AuthSettings, TokenPair, OAUTH_CLIENT_ID, OAUTH_TOKEN_PATH};
pub use client::{RestClient, DEFAULT_REQUEST_TIMEOUT};
pub use document::{DocumentSource, ResourceDocument};
pub use error::{ClientError, Result};
pub use notifications::{Notification, NotificationStream, StreamSettings, StreamStats};
pub use resource::ResourceKind;
pub use scope::ScopeParams;
pub use transport::{ApiRequest, ApiResponse, RequestBody, Transport};

pub use tokio_util::sync::CancellationToken;
pub use vamp_common_secret::SecretString;
pub use vamp_common_serialize::Format;
