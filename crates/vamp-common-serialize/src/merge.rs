// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde_json::Value;

use crate::{emit, parse, Format, Result};

/// Deep-merge `source` into `destination` in place.
///
/// Mappings merge key by key; every other value in `source` replaces the
/// destination value whole, sequences included. Existing keys keep their
/// position and new keys are appended in source order.
pub fn merge_values(destination: &mut Value, source: Value) {
	match (destination, source) {
		(Value::Object(dest), Value::Object(src)) => {
			for (key, value) in src {
				let nested = value.is_object() && dest.get(&key).is_some_and(Value::is_object);
				if let Some(existing) = dest.get_mut(&key).filter(|_| nested) {
					merge_values(existing, value);
				} else {
					dest.insert(key, value);
				}
			}
		}
		(dest, src) => *dest = src,
	}
}

/// Merge two serialized documents of the same format and re-serialize the result.
pub fn merge(destination: &[u8], source: &[u8], format: Format) -> Result<Vec<u8>> {
	let mut merged = parse(format, destination)?;
	merge_values(&mut merged, parse(format, source)?);
	emit(format, &merged)
}
