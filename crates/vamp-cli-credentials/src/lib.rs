// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Refresh-token cache for the vamp CLI.
//!
//! The cache maps a refresh token to the unix time (seconds) after which it
//! is no longer worth presenting to the backend.
//!
//! - **TokenStore trait**: the capability set shared by every backend
//! - **FileTokenStore**: YAML file, atomic rewrite on every mutation
//! - **MemoryTokenStore**: process-local map
//!
//! Reads never fail: a missing or corrupt cache looks empty, so a broken
//! cache can never block a fresh login.
//!
//! ```
//! use vamp_cli_credentials::{MemoryTokenStore, TokenStore};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryTokenStore::new();
//! store.store("rt_abc", 10).await.unwrap();
//! assert_eq!(store.get("rt_abc").await, Some(10));
//!
//! store.remove_expired_at(10).await.unwrap();
//! assert_eq!(store.get("rt_abc").await, None);
//! # });
//! ```

mod error;
mod store;

pub use error::TokenStoreError;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Current unix time in seconds.
pub fn now_unix() -> i64 {
	chrono::Utc::now().timestamp()
}
