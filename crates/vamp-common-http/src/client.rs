// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP client construction.

use reqwest::{Certificate, Client, ClientBuilder};
use tracing::debug;

const PEM_CERTIFICATE_MARKER: &str = "-----BEGIN CERTIFICATE-----";

/// Errors raised while preparing TLS settings.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
	#[error("pinned CA certificate contains no PEM certificate")]
	NoCertificate,

	#[error("invalid pinned CA certificate: {0}")]
	Invalid(#[source] reqwest::Error),
}

/// Creates a new HTTP client builder with the standard vamp User-Agent header.
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a builder that trusts only `pem`, or the system roots when `pem` is empty.
///
/// With a pinned CA the built-in root store is disabled, so a server whose
/// chain is not anchored at that CA fails the handshake. Hostname
/// verification stays on in both cases.
pub fn builder_with_pinned_ca(pem: &str) -> Result<ClientBuilder, TlsError> {
	let pem = pem.trim();
	if pem.is_empty() {
		return Ok(builder());
	}
	if !pem.contains(PEM_CERTIFICATE_MARKER) {
		return Err(TlsError::NoCertificate);
	}

	let mut builder = builder().tls_built_in_root_certs(false);
	let mut pinned = 0usize;
	for block in pem_blocks(pem) {
		let certificate = Certificate::from_pem(block.as_bytes()).map_err(TlsError::Invalid)?;
		builder = builder.add_root_certificate(certificate);
		pinned += 1;
	}
	if pinned == 0 {
		return Err(TlsError::NoCertificate);
	}
	debug!(certificates = pinned, "pinned CA certificates installed");
	Ok(builder)
}

/// Split a PEM bundle into its certificate blocks.
fn pem_blocks(pem: &str) -> Vec<String> {
	const END: &str = "-----END CERTIFICATE-----";
	pem.split_inclusive(END)
		.filter_map(|chunk| chunk.find(PEM_CERTIFICATE_MARKER).map(|start| &chunk[start..]))
		.filter(|block| block.ends_with(END))
		.map(|block| format!("{block}\n"))
		.collect()
}

/// Returns the standard vamp User-Agent string.
///
/// Format: `vamp/{version} ({os}-{arch})`
pub fn user_agent() -> String {
	format!(
		"vamp/{} ({}-{})",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}
