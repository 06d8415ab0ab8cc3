// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token store backends.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::TokenStoreError;
use crate::now_unix;

/// On-disk format: `{ <refresh-token>: <expiry unix seconds> }`.
type PersistedTokens = BTreeMap<String, i64>;

/// Capability set of a refresh-token cache.
#[async_trait]
pub trait TokenStore: Send + Sync + std::fmt::Debug {
	/// Record `token` as usable until `expiry` (unix seconds).
	async fn store(&self, token: &str, expiry: i64) -> Result<(), TokenStoreError>;

	/// Expiry recorded for `token`, if any.
	async fn get(&self, token: &str) -> Option<i64>;

	/// Snapshot of every cached entry.
	async fn tokens(&self) -> HashMap<String, i64>;

	/// Forget one token.
	async fn remove(&self, token: &str) -> Result<(), TokenStoreError>;

	/// Drop every entry whose expiry is `<= now`.
	async fn remove_expired_at(&self, now: i64) -> Result<(), TokenStoreError>;

	/// Drop every entry.
	async fn clean(&self) -> Result<(), TokenStoreError>;

	async fn remove_expired(&self) -> Result<(), TokenStoreError> {
		self.remove_expired_at(now_unix()).await
	}
}

/// YAML file-backed token store.
///
/// Every mutation is a read-modify-write under an internal mutex, and the
/// new file is written to a temporary sibling and renamed into place, so a
/// reader never observes a partial file. Writers in other processes are not
/// coordinated with and may clobber each other.
#[derive(Debug)]
pub struct FileTokenStore {
	path: PathBuf,
	lock: Mutex<()>,
}

impl FileTokenStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			lock: Mutex::new(()),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Read the cache, treating a missing or malformed file as empty.
	async fn read_tokens(&self) -> PersistedTokens {
		let contents = match fs::read(&self.path).await {
			Ok(contents) => contents,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return PersistedTokens::new(),
			Err(e) => {
				warn!(path = ?self.path, error = %e, "failed to read token cache, treating as empty");
				return PersistedTokens::new();
			}
		};
		if contents.iter().all(u8::is_ascii_whitespace) {
			return PersistedTokens::new();
		}
		match serde_yaml::from_slice(&contents) {
			Ok(tokens) => tokens,
			Err(e) => {
				warn!(path = ?self.path, error = %e, "token cache is malformed, treating as empty");
				PersistedTokens::new()
			}
		}
	}

	async fn write_tokens(&self, tokens: &PersistedTokens) -> Result<(), TokenStoreError> {
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent).await?;
			}
		}

		let contents = serde_yaml::to_string(tokens)?;

		let temp_path = self.path.with_extension("tmp");
		if let Err(e) = replace_file(&temp_path, &self.path, contents.as_bytes()).await {
			if let Err(cleanup) = fs::remove_file(&temp_path).await {
				debug!(path = ?temp_path, error = %cleanup, "temporary file not removed");
			}
			return Err(e.into());
		}

		debug!(path = ?self.path, entries = tokens.len(), "token cache written");
		Ok(())
	}
}

#[async_trait]
impl TokenStore for FileTokenStore {
	async fn store(&self, token: &str, expiry: i64) -> Result<(), TokenStoreError> {
		let _guard = self.lock.lock().await;
		let mut tokens = self.read_tokens().await;
		tokens.insert(token.to_string(), expiry);
		self.write_tokens(&tokens).await
	}

	async fn get(&self, token: &str) -> Option<i64> {
		let _guard = self.lock.lock().await;
		self.read_tokens().await.get(token).copied()
	}

	async fn tokens(&self) -> HashMap<String, i64> {
		let _guard = self.lock.lock().await;
		self.read_tokens().await.into_iter().collect()
	}

	async fn remove(&self, token: &str) -> Result<(), TokenStoreError> {
		let _guard = self.lock.lock().await;
		let mut tokens = self.read_tokens().await;
		if tokens.remove(token).is_none() {
			return Ok(());
		}
		self.write_tokens(&tokens).await
	}

	async fn remove_expired_at(&self, now: i64) -> Result<(), TokenStoreError> {
		let _guard = self.lock.lock().await;
		let mut tokens = self.read_tokens().await;
		let before = tokens.len();
		tokens.retain(|_, expiry| *expiry > now);
		debug!(removed = before - tokens.len(), "swept expired refresh tokens");
		self.write_tokens(&tokens).await
	}

	async fn clean(&self) -> Result<(), TokenStoreError> {
		let _guard = self.lock.lock().await;
		self.write_tokens(&PersistedTokens::new()).await
	}
}

/// In-memory token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
	tokens: RwLock<HashMap<String, i64>>,
}

impl MemoryTokenStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
	async fn store(&self, token: &str, expiry: i64) -> Result<(), TokenStoreError> {
		self.tokens.write().await.insert(token.to_string(), expiry);
		Ok(())
	}

	async fn get(&self, token: &str) -> Option<i64> {
		self.tokens.read().await.get(token).copied()
	}

	async fn tokens(&self) -> HashMap<String, i64> {
		self.tokens.read().await.clone()
	}

	async fn remove(&self, token: &str) -> Result<(), TokenStoreError> {
		self.tokens.write().await.remove(token);
		Ok(())
	}

	async fn remove_expired_at(&self, now: i64) -> Result<(), TokenStoreError> {
		self.tokens.write().await.retain(|_, expiry| *expiry > now);
		Ok(())
	}

	async fn clean(&self) -> Result<(), TokenStoreError> {
		self.tokens.write().await.clear();
		Ok(())
	}
}

/// Write `contents` to `temp_path`, then rename it over `path`.
async fn replace_file(temp_path: &Path, path: &Path, contents: &[u8]) -> std::io::Result<()> {
	let mut file = fs::File::create(temp_path).await?;
	file.write_all(contents).await?;
	file.sync_all().await?;
	drop(file);

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		let perms = std::fs::Permissions::from_mode(0o600);
		if let Err(e) = fs::set_permissions(temp_path, perms).await {
			warn!(path = ?temp_path, error = %e, "failed to set token cache permissions");
		}
	}

	fs::rename(temp_path, path).await
}
