// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource documents and where they come from.

use std::path::PathBuf;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;
use vamp_common_serialize::{emit, parse, Format};

use crate::error::{ClientError, Result};
use crate::resource::ResourceKind;

/// A resource body in a declared format, plus the host names to attach to a
/// vamp service.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDocument {
	pub body: Vec<u8>,
	pub format: Format,
	pub hosts: Vec<String>,
}

impl ResourceDocument {
	pub fn new(body: impl Into<Vec<u8>>, format: Format) -> Self {
		Self {
			body: body.into(),
			format,
			hosts: Vec::new(),
		}
	}

	pub fn yaml(body: impl Into<Vec<u8>>) -> Self {
		Self::new(body, Format::Yaml)
	}

	pub fn json(body: impl Into<Vec<u8>>) -> Self {
		Self::new(body, Format::Json)
	}

	pub fn with_hosts(mut self, hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.hosts = hosts.into_iter().map(Into::into).collect();
		self
	}

	/// The body as the compact JSON the API expects for `kind`.
	///
	/// For [`ResourceKind::VampService`] the extra hosts are appended to the
	/// document's `hosts` array, creating it when absent.
	pub fn to_api_json(&self, kind: ResourceKind) -> Result<Vec<u8>> {
		let mut value = parse(self.format, &self.body)?;
		if kind == ResourceKind::VampService && !self.hosts.is_empty() {
			append_hosts(&mut value, &self.hosts)?;
		}
		Ok(emit(Format::Json, &value)?)
	}
}

fn append_hosts(value: &mut Value, extra: &[String]) -> Result<()> {
	let object = value
		.as_object_mut()
		.ok_or_else(|| ClientError::Input("vamp service document must be a mapping".to_string()))?;
	let hosts = object
		.entry("hosts")
		.or_insert_with(|| Value::Array(Vec::new()));
	if hosts.is_null() {
		*hosts = Value::Array(Vec::new());
	}
	hosts
		.as_array_mut()
		.ok_or_else(|| ClientError::Input("vamp service `hosts` must be a list".to_string()))?
		.extend(extra.iter().cloned().map(Value::String));
	Ok(())
}

/// Where a resource document is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
	Inline(String),
	File(PathBuf),
	Url(Url),
}

impl DocumentSource {
	/// `http(s)://` locations are downloaded, anything else is a file path.
	pub fn from_location(location: &str) -> Result<Self> {
		let location = location.trim();
		if location.is_empty() {
			return Err(ClientError::Input("empty document location".to_string()));
		}
		if location.starts_with("http://") || location.starts_with("https://") {
			let url = Url::parse(location)
				.map_err(|e| ClientError::Input(format!("invalid document url {location:?}: {e}")))?;
			return Ok(Self::Url(url));
		}
		Ok(Self::File(PathBuf::from(location)))
	}

	/// Format implied by the file or URL path extension.
	pub fn format_hint(&self) -> Option<Format> {
		match self {
			Self::Inline(_) => None,
			Self::File(path) => Format::from_extension(path),
			Self::Url(url) => Format::from_extension(url.path()),
		}
	}

	/// Read the raw bytes. URL downloads go through `http` so they trust the
	/// same pinned CA as API calls.
	#[instrument(skip_all, fields(source = ?self))]
	pub async fn read(&self, http: &Client) -> Result<Vec<u8>> {
		match self {
			Self::Inline(text) => Ok(text.clone().into_bytes()),
			Self::File(path) => tokio::fs::read(path)
				.await
				.map_err(|e| ClientError::Io(format!("cannot read {}: {e}", path.display()))),
			Self::Url(url) => {
				let response = http
					.get(url.clone())
					.send()
					.await
					.map_err(|e| ClientError::Io(format!("cannot download {url}: {e}")))?;
				let status = response.status();
				if !status.is_success() {
					return Err(ClientError::Io(format!("cannot download {url}: server returned {status}")));
				}
				let body = response
					.bytes()
					.await
					.map_err(|e| ClientError::Io(format!("cannot download {url}: {e}")))?;
				debug!(bytes = body.len(), "document downloaded");
				Ok(body.to_vec())
			}
		}
	}

	/// Read the document, using `format` when given and the extension hint
	/// otherwise, falling back to YAML.
	pub async fn load(&self, http: &Client, format: Option<Format>) -> Result<ResourceDocument> {
		let format = format.or_else(|| self.format_hint()).unwrap_or_default();
		let body = self.read(http).await?;
		Ok(ResourceDocument::new(body, format))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	#[test]
	fn plain_kinds_convert_to_json() {
		let doc = ResourceDocument::yaml("name: p1\n").with_hosts(["ignored.example.com"]);
		assert_eq!(doc.to_api_json(ResourceKind::Project).unwrap(), br#"{"name":"p1"}"#);
	}

	#[test]
	fn vamp_service_hosts_are_appended() {
		let doc = ResourceDocument::yaml("hosts:\n- a.example.com\nroutes: []\n")
			.with_hosts(["b.example.com", "c.example.com"]);
		let body = doc.to_api_json(ResourceKind::VampService).unwrap();
		let value: Value = serde_json::from_slice(&body).unwrap();
		assert_eq!(
			value["hosts"],
			serde_json::json!(["a.example.com", "b.example.com", "c.example.com"])
		);
	}

	#[test]
	fn vamp_service_hosts_array_is_created() {
		let doc = ResourceDocument::json(r#"{"gateways":["g"]}"#).with_hosts(["h.example.com"]);
		let body = doc.to_api_json(ResourceKind::VampService).unwrap();
		assert_eq!(body, br#"{"gateways":["g"],"hosts":["h.example.com"]}"#);
	}

	#[test]
	fn json_input_is_validated_and_compacted() {
		let doc = ResourceDocument::json("{ \"name\": \"p1\" }");
		assert_eq!(doc.to_api_json(ResourceKind::Project).unwrap(), br#"{"name":"p1"}"#);
		assert!(matches!(
			ResourceDocument::json("{broken").to_api_json(ResourceKind::Project),
			Err(ClientError::Serialize(_))
		));
	}

	#[test]
	fn vamp_service_rejects_scalar_hosts() {
		let doc = ResourceDocument::yaml("hosts: one\n").with_hosts(["h"]);
		assert!(matches!(
			doc.to_api_json(ResourceKind::VampService),
			Err(ClientError::Input(_))
		));
	}

	#[test]
	fn location_parsing() {
		assert!(matches!(
			DocumentSource::from_location("https://example.com/p.json").unwrap(),
			DocumentSource::Url(_)
		));
		assert_eq!(
			DocumentSource::from_location("./p.yml").unwrap(),
			DocumentSource::File(PathBuf::from("./p.yml"))
		);
		assert!(DocumentSource::from_location("  ").is_err());
	}

	#[test]
	fn format_hint_follows_extension() {
		let url = DocumentSource::from_location("https://example.com/specs/p.json").unwrap();
		assert_eq!(url.format_hint(), Some(Format::Json));
		let file = DocumentSource::File(PathBuf::from("p.yaml"));
		assert_eq!(file.format_hint(), Some(Format::Yaml));
		assert_eq!(DocumentSource::Inline("x".to_string()).format_hint(), None);
	}

	#[tokio::test]
	async fn file_source_reads_bytes() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("project.json");
		tokio::fs::write(&file, r#"{"name":"p1"}"#).await.unwrap();

		let doc = DocumentSource::File(file)
			.load(&Client::new(), None)
			.await
			.unwrap();
		assert_eq!(doc.format, Format::Json);
		assert_eq!(doc.body, br#"{"name":"p1"}"#);
	}

	#[tokio::test]
	async fn missing_file_is_io_error() {
		let dir = tempfile::tempdir().unwrap();
		let source = DocumentSource::File(dir.path().join("absent.yaml"));
		assert!(matches!(source.read(&Client::new()).await, Err(ClientError::Io(_))));
	}

	#[tokio::test]
	async fn url_source_downloads_and_maps_failures_to_io() {
		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.and(path("/specs/p.yaml"))
			.respond_with(ResponseTemplate::new(200).set_body_string("name: p1\n"))
			.mount(&server)
			.await;

		let ok = DocumentSource::from_location(&format!("{}/specs/p.yaml", server.uri())).unwrap();
		let doc = ok.load(&Client::new(), None).await.unwrap();
		assert_eq!(doc.format, Format::Yaml);
		assert_eq!(doc.body, b"name: p1\n");

		let missing = DocumentSource::from_location(&format!("{}/specs/nope.yaml", server.uri())).unwrap();
		assert!(matches!(
			missing.read(&Client::new()).await,
			Err(ClientError::Io(_))
		));
	}
}
