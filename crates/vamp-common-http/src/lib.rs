// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for the vamp client.
//!
//! This crate provides:
//! - A pre-configured HTTP client builder with a consistent User-Agent header
//!   and optional CA pinning
//! - Exponential back-off with full jitter for reconnect loops

mod backoff;
mod client;

pub use backoff::Backoff;
pub use client::{builder, builder_with_pinned_ca, user_agent, TlsError};
