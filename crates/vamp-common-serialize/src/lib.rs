// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource document serialization for the vamp client.
//!
//! The backend speaks JSON while operators usually write YAML. This crate
//! provides:
//! - [`convert`]: YAML ⇄ JSON conversion that keeps key order and the
//!   integer/float distinction
//! - [`merge`]: a recursive deep merge of two documents of the same format
//! - [`parse`] / [`emit`]: the normalized tree both of them work on

mod convert;
mod error;
mod format;
mod merge;

pub use convert::{convert, emit, parse};
pub use error::{Result, SerializeError};
pub use format::Format;
pub use merge::{merge, merge_values};

pub use serde_json::Value;
