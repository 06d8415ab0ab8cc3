// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Exponential back-off with full jitter for reconnect loops.

use std::time::Duration;

/// Reconnect delay schedule: `base * 2^attempt`, capped at `max`.
///
/// With jitter on, the actual delay is drawn uniformly from `[0, ceiling]`.
#[derive(Debug, Clone)]
pub struct Backoff {
	base: Duration,
	max: Duration,
	jitter: bool,
	attempt: u32,
}

impl Default for Backoff {
	fn default() -> Self {
		Self::new(Duration::from_millis(250), Duration::from_secs(30))
	}
}

impl Backoff {
	pub fn new(base: Duration, max: Duration) -> Self {
		Self {
			base,
			max,
			jitter: true,
			attempt: 0,
		}
	}

	/// Use the ceiling itself as the delay.
	pub fn without_jitter(mut self) -> Self {
		self.jitter = false;
		self
	}

	/// Number of delays handed out since the last reset.
	pub fn attempt(&self) -> u32 {
		self.attempt
	}

	/// Upper bound of the delay for `attempt`.
	pub fn ceiling(&self, attempt: u32) -> Duration {
		let factor = 2u32.saturating_pow(attempt.min(20));
		self.base.saturating_mul(factor).min(self.max)
	}

	/// Delay before the next reconnect; advances the schedule.
	pub fn next_delay(&mut self) -> Duration {
		let ceiling = self.ceiling(self.attempt);
		self.attempt = self.attempt.saturating_add(1);
		if self.jitter {
			ceiling.mul_f64(fastrand::f64())
		} else {
			ceiling
		}
	}

	pub fn reset(&mut self) {
		self.attempt = 0;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_schedule_doubles_from_250ms() {
		let backoff = Backoff::default();
		assert_eq!(backoff.ceiling(0), Duration::from_millis(250));
		assert_eq!(backoff.ceiling(1), Duration::from_millis(500));
		assert_eq!(backoff.ceiling(3), Duration::from_secs(2));
	}

	#[test]
	fn ceiling_is_capped() {
		let backoff = Backoff::default();
		assert_eq!(backoff.ceiling(7), Duration::from_secs(30));
		assert_eq!(backoff.ceiling(u32::MAX), Duration::from_secs(30));
	}

	#[test]
	fn jittered_delay_stays_under_ceiling() {
		let mut backoff = Backoff::default();
		for attempt in 0..12 {
			let ceiling = backoff.ceiling(attempt);
			let delay = backoff.next_delay();
			assert!(delay <= ceiling, "attempt {attempt}: {delay:?} > {ceiling:?}");
		}
		assert_eq!(backoff.attempt(), 12);
	}

	#[test]
	fn reset_restarts_schedule() {
		let mut backoff = Backoff::default().without_jitter();
		assert_eq!(backoff.next_delay(), Duration::from_millis(250));
		assert_eq!(backoff.next_delay(), Duration::from_millis(500));
		backoff.reset();
		assert_eq!(backoff.attempt(), 0);
		assert_eq!(backoff.next_delay(), Duration::from_millis(250));
	}
}
