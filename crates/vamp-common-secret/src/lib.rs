// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential wrapper for the vamp client.
//!
//! Passwords and bearer tokens move through the client as [`SecretString`]:
//!
//! - `Debug`, `Display` and `Serialize` all render [`REDACTED`], so a secret
//!   that reaches a `tracing` field or a config dump never leaks
//! - the buffer is zeroized when the wrapper is dropped, which is how a login
//!   password is wiped once the token request has been sent
//! - the inner value is only reachable through [`Secret::expose`]
//!
//! ```
//! use vamp_common_secret::SecretString;
//!
//! let password = SecretString::new("hunter2".to_string());
//! assert_eq!(format!("{password}"), "[REDACTED]");
//! assert_eq!(password.expose(), "hunter2");
//! ```

use std::fmt;

use zeroize::Zeroize;

/// Placeholder printed instead of a secret value.
pub const REDACTED: &str = "[REDACTED]";

/// A value that must never be printed, logged, or serialized in clear.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// The common case: a secret string such as a password or a token.
pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Borrow the secret value. Call sites opt in explicitly.
	pub fn expose(&self) -> &T {
		&self.inner
	}

	/// Mutable access, for filling a buffer in place.
	pub fn expose_mut(&mut self) -> &mut T {
		&mut self.inner
	}
}

impl SecretString {
	/// True when the wrapped string is empty.
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl From<&str> for SecretString {
	fn from(value: &str) -> Self {
		Self::new(value.to_string())
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

#[cfg(feature = "serde")]
mod serde_impl {
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	use super::{Secret, REDACTED};

	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn debug_and_display_hide_the_password() {
		let password = SecretString::new("correct-horse".to_string());
		assert_eq!(format!("{password}"), REDACTED);
		assert!(!format!("{password:?}").contains("correct-horse"));
		assert!(!format!("{:?}", Some(password)).contains("correct-horse"));
	}

	#[test]
	fn expose_returns_the_token() {
		let token = SecretString::from("at_123");
		assert_eq!(token.expose(), "at_123");
		assert!(!token.is_empty());
		assert!(SecretString::from("").is_empty());
	}

	#[test]
	fn buffer_is_filled_in_place() {
		let mut body: Secret<Vec<u8>> = Secret::new(Vec::with_capacity(8));
		body.expose_mut().extend_from_slice(b"pw");
		assert_eq!(body.expose(), b"pw");
		assert!(!format!("{body:?}").contains("pw"));
	}

	#[test]
	fn serialize_is_redacted_but_deserialize_keeps_value() {
		let token = SecretString::from("rt_abc");
		let json = serde_json::to_string(&token).unwrap();
		assert_eq!(json, format!("\"{REDACTED}\""));

		let back: SecretString = serde_json::from_str("\"rt_abc\"").unwrap();
		assert_eq!(back, token);
	}

	proptest! {
		#[test]
		fn formatting_never_leaks(inner in "[a-zA-Z0-9_.:/-]{4,40}") {
			prop_assume!(!REDACTED.contains(&inner) && !"Secret".contains(&inner));
			let secret = SecretString::new(inner.clone());
			let displayed = format!("{}", secret);
			let debugged = format!("{:?}", secret);
			prop_assert!(!displayed.contains(&inner));
			prop_assert!(!debugged.contains(&inner));
		}
	}
}
