// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The capability set exposed to the command layer.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use vamp_common_secret::SecretString;
use vamp_common_serialize::Format;

use crate::auth::TokenPair;
use crate::document::ResourceDocument;
use crate::error::Result;
use crate::notifications::Notification;
use crate::resource::ResourceKind;
use crate::scope::ScopeParams;

/// Everything an operator can ask of the control plane.
///
/// Implemented by [`RestClient`](crate::RestClient); command handlers take
/// `&dyn VampApi` so they can run against a fake.
#[async_trait]
pub trait VampApi: Send + Sync {
	async fn login(&self, username: &str, password: SecretString) -> Result<TokenPair>;

	async fn refresh(&self) -> Result<TokenPair>;

	async fn logout(&self) -> Result<()>;

	async fn create(
		&self,
		kind: ResourceKind,
		name: &str,
		document: &ResourceDocument,
		scope: &ScopeParams,
	) -> Result<()>;

	async fn update(
		&self,
		kind: ResourceKind,
		name: &str,
		document: &ResourceDocument,
		scope: &ScopeParams,
	) -> Result<()>;

	async fn delete(&self, kind: ResourceKind, name: &str, scope: &ScopeParams) -> Result<()>;

	/// The resource rendered in `output` format.
	async fn get(&self, kind: ResourceKind, name: &str, output: Format, scope: &ScopeParams) -> Result<Vec<u8>>;

	/// The stored spec of the resource, rendered in `output` format.
	async fn get_spec(&self, kind: ResourceKind, name: &str, output: Format, scope: &ScopeParams) -> Result<Vec<u8>>;

	async fn list(&self, kind: ResourceKind, output: Format, scope: &ScopeParams, simple: bool) -> Result<Vec<u8>>;

	/// Deep-merge `patch` into the stored spec and write it back.
	async fn merge(
		&self,
		kind: ResourceKind,
		name: &str,
		patch: &ResourceDocument,
		scope: &ScopeParams,
	) -> Result<()>;

	async fn update_password(&self, username: &str, password: SecretString, scope: &ScopeParams) -> Result<()>;

	async fn push_metric_value(&self, name: &str, document: &ResourceDocument, scope: &ScopeParams) -> Result<()>;

	async fn add_role_to_user(&self, username: &str, role: &str, scope: &ScopeParams) -> Result<()>;

	async fn remove_role_from_user(&self, username: &str, role: &str, scope: &ScopeParams) -> Result<()>;

	async fn ping(&self) -> Result<()>;

	/// Deliver notifications to `sink` until `cancel` fires, the receiver is
	/// dropped, or a non-recoverable error occurs.
	async fn read_notifications(
		&self,
		sink: mpsc::Sender<Notification>,
		scope: &ScopeParams,
		cancel: CancellationToken,
	) -> Result<()>;
}
