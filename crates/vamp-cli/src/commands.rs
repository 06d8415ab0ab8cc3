// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command handlers.
//!
//! Handlers work against `&dyn VampApi` and return what should be printed,
//! so they can be exercised with a fake client.

use std::future::Future;
use std::io::Write;

use anyhow::{Context, Result};
use futures::StreamExt;
use tracing::debug;
use vamp_cli_config::{ClientConfig, ConfigStore};
use vamp_client::{
	DocumentSource, Format, Notification, NotificationStream, ResourceDocument, ResourceKind, RestClient,
	ScopeParams, SecretString, VampApi,
};
use vamp_common_secret::REDACTED;
use vamp_common_serialize::emit;

use crate::cli::SourceArgs;

pub async fn login(api: &dyn VampApi, username: &str, password: SecretString) -> Result<String> {
	api.login(username, password).await?;
	Ok(format!("logged in as {username}"))
}

pub async fn logout(api: &dyn VampApi) -> Result<String> {
	api.logout().await?;
	Ok("logged out".to_string())
}

pub async fn refresh(api: &dyn VampApi) -> Result<String> {
	api.refresh().await?;
	Ok("session refreshed".to_string())
}

pub async fn create(
	api: &dyn VampApi,
	kind: ResourceKind,
	name: &str,
	document: &ResourceDocument,
	scope: &ScopeParams,
) -> Result<String> {
	api.create(kind, name, document, scope).await?;
	Ok(format!("{kind} {name} is created"))
}

pub async fn update(
	api: &dyn VampApi,
	kind: ResourceKind,
	name: &str,
	document: &ResourceDocument,
	scope: &ScopeParams,
) -> Result<String> {
	api.update(kind, name, document, scope).await?;
	Ok(format!("{kind} {name} is updated"))
}

pub async fn merge(
	api: &dyn VampApi,
	kind: ResourceKind,
	name: &str,
	patch: &ResourceDocument,
	scope: &ScopeParams,
) -> Result<String> {
	api.merge(kind, name, patch, scope).await?;
	Ok(format!("{kind} {name} is updated"))
}

pub async fn delete(api: &dyn VampApi, kind: ResourceKind, name: &str, scope: &ScopeParams) -> Result<String> {
	api.delete(kind, name, scope).await?;
	Ok(format!("{kind} {name} is deleted"))
}

pub async fn get(
	api: &dyn VampApi,
	kind: ResourceKind,
	name: &str,
	output: Format,
	scope: &ScopeParams,
) -> Result<String> {
	let body = api.get(kind, name, output, scope).await?;
	text(body)
}

pub async fn spec(
	api: &dyn VampApi,
	kind: ResourceKind,
	name: &str,
	output: Format,
	scope: &ScopeParams,
) -> Result<String> {
	let body = api.get_spec(kind, name, output, scope).await?;
	text(body)
}

pub async fn list(
	api: &dyn VampApi,
	kind: ResourceKind,
	output: Format,
	scope: &ScopeParams,
	simple: bool,
) -> Result<String> {
	let body = api.list(kind, output, scope, simple).await?;
	text(body)
}

pub async fn passwd(api: &dyn VampApi, username: &str, password: SecretString, scope: &ScopeParams) -> Result<String> {
	api.update_password(username, password, scope).await?;
	Ok(format!("password of user {username} is updated"))
}

pub async fn push_metric(
	api: &dyn VampApi,
	name: &str,
	document: &ResourceDocument,
	scope: &ScopeParams,
) -> Result<String> {
	api.push_metric_value(name, document, scope).await?;
	Ok(format!("value of metric {name} is pushed"))
}

pub async fn add_role(api: &dyn VampApi, username: &str, role: &str, scope: &ScopeParams) -> Result<String> {
	api.add_role_to_user(username, role, scope).await?;
	Ok(format!("role {role} is added to user {username}"))
}

pub async fn remove_role(api: &dyn VampApi, username: &str, role: &str, scope: &ScopeParams) -> Result<String> {
	api.remove_role_from_user(username, role, scope).await?;
	Ok(format!("role {role} is removed from user {username}"))
}

pub async fn ping(api: &dyn VampApi) -> Result<String> {
	api.ping().await?;
	Ok("pong".to_string())
}

fn text(body: Vec<u8>) -> Result<String> {
	String::from_utf8(body).context("server returned a document that is not valid UTF-8")
}

/// Resolve `--file` / `--spec` into a document, downloading URLs with the
/// client's pinned CA.
pub async fn load_document(client: &RestClient, source: &SourceArgs) -> Result<ResourceDocument> {
	let location = match (&source.file, &source.spec) {
		(Some(file), _) => DocumentSource::from_location(file)?,
		(None, Some(spec)) => DocumentSource::Inline(spec.clone()),
		(None, None) => anyhow::bail!("either --file or --spec is required"),
	};
	let document = client.load_document(&location, source.format).await?;
	debug!(format = %document.format, bytes = document.body.len(), "document loaded");
	Ok(document.with_hosts(source.hosts.iter().cloned()))
}

/// One notification as printed: a line by default, or a yaml/json record.
pub fn render_notification(notification: &Notification, output: Option<Format>) -> Result<String> {
	let Some(format) = output else {
		let when = notification
			.timestamp
			.map(|ts| ts.to_rfc3339())
			.unwrap_or_default();
		let severity = if notification.severity.is_empty() {
			"info"
		} else {
			notification.severity.as_str()
		};
		let line = [when.as_str(), severity, notification.text.as_str()]
			.into_iter()
			.filter(|part| !part.is_empty())
			.collect::<Vec<_>>()
			.join(" ");
		return Ok(line);
	};

	let value = serde_json::to_value(notification)?;
	let body = String::from_utf8(emit(format, &value)?)?;
	Ok(match format {
		Format::Json => body,
		Format::Yaml => format!("---\n{}", body.trim_end()),
	})
}

/// Print notifications until `shutdown` resolves or the stream ends.
pub async fn follow_notifications<W, F>(
	mut stream: NotificationStream,
	output: Option<Format>,
	out: &mut W,
	shutdown: F,
) -> Result<()>
where
	W: Write,
	F: Future<Output = ()>,
{
	tokio::pin!(shutdown);
	loop {
		tokio::select! {
			_ = &mut shutdown => {
				debug!("interrupted; closing notification stream");
				stream.cancel();
				break;
			}
			next = stream.next() => match next {
				Some(notification) => {
					writeln!(out, "{}", render_notification(&notification, output)?)?;
					out.flush()?;
				}
				None => break,
			},
		}
	}
	stream.close().await?;
	Ok(())
}

/// The stored configuration as YAML with credentials masked.
pub fn show_config(config: &ClientConfig) -> Result<String> {
	let mut shown = config.clone();
	for secret in [&mut shown.access_token, &mut shown.refresh_token] {
		if !secret.is_empty() {
			*secret = REDACTED.to_string();
		}
	}
	if !shown.pinned_ca_certificate.is_empty() {
		shown.pinned_ca_certificate = "<pinned>".to_string();
	}
	let value = serde_json::to_value(&shown)?;
	Ok(String::from_utf8(emit(Format::Yaml, &value)?)?)
}

/// Set one key and persist. `cert` takes a PEM file path.
pub async fn set_config(store: &ConfigStore, mut config: ClientConfig, key: &str, value: &str) -> Result<String> {
	let value = if key == "cert" && !value.trim().is_empty() {
		tokio::fs::read_to_string(value.trim())
			.await
			.with_context(|| format!("failed to read certificate {value}"))?
	} else {
		value.to_string()
	};
	config.set(key, &value)?;
	store.write(&config).await?;
	Ok(format!("{key} is set"))
}
