// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Long-lived notification feed.
//!
//! The feed is a GET on `/api/<v>/notifications` that the server keeps open,
//! writing one record per notification. Records are framed either as
//! server-sent events or as newline-delimited JSON, chosen from the response
//! `Content-Type`.
//!
//! # Reconnection
//!
//! - transport errors, 5xx responses and a silent connection (read-idle
//!   watchdog) reconnect with exponential back-off and full jitter
//! - a 401 triggers one forced token refresh and an immediate reconnect; a
//!   second consecutive 401 is surfaced
//! - a clean close reconnects as a long-poll unless
//!   [`StreamSettings::reconnect_on_close`] is off
//! - any other 4xx ends the stream with the error
//!
//! The back-off resets once a connection has stayed up for
//! [`StreamSettings::stable_after`].

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, instrument, warn};
use vamp_common_http::Backoff;

use crate::client::RestClient;
use crate::error::{ClientError, Result};
use crate::scope::ScopeParams;
use crate::transport::ApiRequest;

const STREAM_ACCEPT: &str = "text/event-stream, application/x-ndjson, application/json";

/// A backend-originated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
	#[serde(default)]
	pub text: String,
	#[serde(default, alias = "level")]
	pub severity: String,
	#[serde(default, with = "timestamp", skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<DateTime<Utc>>,
	#[serde(default, alias = "type")]
	pub kind: String,
	#[serde(default, alias = "payload_blob", skip_serializing_if = "Value::is_null")]
	pub payload: Value,
}

/// Accepts RFC 3339 strings and unix seconds or milliseconds.
mod timestamp {
	use chrono::{DateTime, TimeZone, Utc};
	use serde::{Deserialize, Deserializer, Serializer};

	const MILLIS_THRESHOLD: u64 = 100_000_000_000;

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Unix(i64),
		Text(String),
	}

	pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
	where
		D: Deserializer<'de>,
	{
		Ok(match Option::<Raw>::deserialize(deserializer)? {
			None => None,
			Some(Raw::Unix(value)) if value.unsigned_abs() >= MILLIS_THRESHOLD => Utc.timestamp_millis_opt(value).single(),
			Some(Raw::Unix(value)) => Utc.timestamp_opt(value, 0).single(),
			Some(Raw::Text(text)) => DateTime::parse_from_rfc3339(&text)
				.ok()
				.map(|ts| ts.with_timezone(&Utc)),
		})
	}
}

/// Reconnect and watchdog knobs.
#[derive(Debug, Clone)]
pub struct StreamSettings {
	pub backoff: Backoff,
	/// Reconnect when no bytes arrive for this long.
	pub idle_timeout: Duration,
	/// A connection that stays up this long resets the back-off.
	pub stable_after: Duration,
	/// Reconnect after the server ends the response cleanly.
	pub reconnect_on_close: bool,
	/// Capacity of the channel behind [`NotificationStream`].
	pub buffer: usize,
}

impl Default for StreamSettings {
	fn default() -> Self {
		Self {
			backoff: Backoff::default(),
			idle_timeout: Duration::from_secs(60),
			stable_after: Duration::from_secs(60),
			reconnect_on_close: true,
			buffer: 64,
		}
	}
}

/// Counters for one stream.
#[derive(Debug, Default)]
pub struct StreamStats {
	connected: AtomicBool,
	connections: AtomicU64,
	reconnects: AtomicU64,
	delivered: AtomicU64,
}

impl StreamStats {
	pub fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	/// Successful (2xx) connections opened.
	pub fn connections(&self) -> u64 {
		self.connections.load(Ordering::SeqCst)
	}

	pub fn reconnects(&self) -> u64 {
		self.reconnects.load(Ordering::SeqCst)
	}

	/// Notifications handed to the sink.
	pub fn delivered(&self) -> u64 {
		self.delivered.load(Ordering::SeqCst)
	}
}

/// A lazy, cancellable sequence of notifications.
///
/// Dropping the stream cancels the background reader. After the sequence
/// ends, [`close`](Self::close) reports why.
pub struct NotificationStream {
	receiver: mpsc::Receiver<Notification>,
	task: JoinHandle<Result<()>>,
	stats: Arc<StreamStats>,
	cancel: CancellationToken,
	_guard: DropGuard,
}

impl NotificationStream {
	pub(crate) fn spawn(
		client: RestClient,
		scope: ScopeParams,
		settings: StreamSettings,
		cancel: CancellationToken,
	) -> Self {
		let (sender, receiver) = mpsc::channel(settings.buffer.max(1));
		let stats = Arc::new(StreamStats::default());

		let task = tokio::spawn({
			let stats = Arc::clone(&stats);
			let cancel = cancel.clone();
			async move { run(&client, sender, &scope, &settings, &cancel, &stats).await }
		});

		Self {
			receiver,
			task,
			stats,
			_guard: cancel.clone().drop_guard(),
			cancel,
		}
	}

	/// Next notification, or `None` once the reader has stopped.
	pub async fn next_notification(&mut self) -> Option<Notification> {
		self.receiver.recv().await
	}

	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	pub fn stats(&self) -> &StreamStats {
		&self.stats
	}

	/// Stop the reader and return how it ended.
	pub async fn close(self) -> Result<()> {
		self.cancel.cancel();
		let Self { task, .. } = self;
		task.await.map_err(|_| ClientError::Cancelled)?
	}
}

impl Stream for NotificationStream {
	type Item = Notification;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.receiver.poll_recv(cx)
	}
}

enum ConnectionEnd {
	Closed,
	SinkClosed,
}

enum StreamFailure {
	Unauthorized { epoch: u64, error: ClientError },
	Retryable(ClientError),
	Fatal(ClientError),
}

impl StreamFailure {
	fn classify(error: ClientError, epoch: u64) -> Self {
		if error.is_unauthorized() {
			Self::Unauthorized { epoch, error }
		} else if error.is_transient() {
			Self::Retryable(error)
		} else {
			Self::Fatal(error)
		}
	}
}

/// Reader loop behind both [`NotificationStream`] and
/// `VampApi::read_notifications`.
#[instrument(skip_all)]
pub(crate) async fn run(
	client: &RestClient,
	sink: mpsc::Sender<Notification>,
	scope: &ScopeParams,
	settings: &StreamSettings,
	cancel: &CancellationToken,
	stats: &StreamStats,
) -> Result<()> {
	let mut backoff = settings.backoff.clone();
	let mut reauthenticated = false;
	let mut first = true;

	loop {
		if !first {
			stats.reconnects.fetch_add(1, Ordering::SeqCst);
		}
		first = false;

		let started = Instant::now();
		let outcome = tokio::select! {
			_ = cancel.cancelled() => return Ok(()),
			outcome = connect_and_read(client, &sink, scope, settings, stats) => outcome,
		};
		let was_connected = stats.connected.swap(false, Ordering::SeqCst);
		if was_connected && started.elapsed() >= settings.stable_after {
			backoff.reset();
		}

		match outcome {
			Ok(ConnectionEnd::SinkClosed) => {
				debug!("notification receiver dropped");
				return Ok(());
			}
			Ok(ConnectionEnd::Closed) => {
				reauthenticated = false;
				if !settings.reconnect_on_close {
					info!("server closed notification stream");
					return Ok(());
				}
				if was_connected {
					backoff.reset();
				}
				debug!("server closed notification stream; reconnecting");
			}
			Err(StreamFailure::Unauthorized { epoch, error }) => {
				if reauthenticated {
					return Err(error);
				}
				reauthenticated = true;
				debug!("notification stream token rejected; refreshing");
				let refreshed = tokio::select! {
					_ = cancel.cancelled() => return Ok(()),
					refreshed = client.auth().force_refresh(epoch) => refreshed,
				};
				match refreshed {
					Ok(_) => continue,
					Err(e) if e.is_transient() => {
						reauthenticated = false;
						warn!(error = %e, "token refresh failed; backing off");
					}
					Err(e) => return Err(e),
				}
			}
			Err(StreamFailure::Retryable(error)) => {
				reauthenticated = false;
				warn!(error = %error, "notification stream interrupted");
			}
			Err(StreamFailure::Fatal(error)) => return Err(error),
		}

		let delay = backoff.next_delay();
		debug!(
			delay_ms = delay.as_millis() as u64,
			attempt = backoff.attempt(),
			"reconnecting notification stream"
		);
		tokio::select! {
			_ = cancel.cancelled() => return Ok(()),
			_ = tokio::time::sleep(delay) => {}
		}
	}
}

async fn connect_and_read(
	client: &RestClient,
	sink: &mpsc::Sender<Notification>,
	scope: &ScopeParams,
	settings: &StreamSettings,
	stats: &StreamStats,
) -> std::result::Result<ConnectionEnd, StreamFailure> {
	let auth = client.auth();
	let (token, epoch) = auth
		.ensure_fresh()
		.await
		.map_err(|e| StreamFailure::classify(e, auth.refresh_epoch()))?;

	let request = ApiRequest::get(client.api_path(&["notifications"]).await)
		.scope(scope)
		.bearer(token)
		.accept(STREAM_ACCEPT)
		.without_deadline();
	let response = auth
		.transport()
		.open(request)
		.await
		.map_err(|e| StreamFailure::classify(e, epoch))?;

	stats.connected.store(true, Ordering::SeqCst);
	stats.connections.fetch_add(1, Ordering::SeqCst);

	let sse = response
		.headers()
		.get(CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.is_some_and(|value| value.starts_with("text/event-stream"));
	debug!(sse, "notification stream connected");

	if sse {
		read_events(response, sink, settings.idle_timeout, stats).await
	} else {
		read_lines(response, sink, settings.idle_timeout, stats).await
	}
}

async fn read_events(
	response: reqwest::Response,
	sink: &mpsc::Sender<Notification>,
	idle_timeout: Duration,
	stats: &StreamStats,
) -> std::result::Result<ConnectionEnd, StreamFailure> {
	let mut events = response.bytes_stream().eventsource();
	loop {
		let event = match tokio::time::timeout(idle_timeout, events.next()).await {
			Err(_) => return Err(StreamFailure::Retryable(ClientError::IdleTimeout(idle_timeout))),
			Ok(None) => return Ok(ConnectionEnd::Closed),
			Ok(Some(Err(EventStreamError::Transport(e)))) => {
				return Err(StreamFailure::Retryable(ClientError::Transport(e)));
			}
			Ok(Some(Err(e))) => return Err(StreamFailure::Retryable(ClientError::Decode(e.to_string()))),
			Ok(Some(Ok(event))) => event,
		};
		if !deliver(event.data.as_bytes(), sink, stats).await {
			return Ok(ConnectionEnd::SinkClosed);
		}
	}
}

async fn read_lines(
	response: reqwest::Response,
	sink: &mpsc::Sender<Notification>,
	idle_timeout: Duration,
	stats: &StreamStats,
) -> std::result::Result<ConnectionEnd, StreamFailure> {
	let mut body = response.bytes_stream();
	let mut buffer: Vec<u8> = Vec::new();
	loop {
		let chunk = match tokio::time::timeout(idle_timeout, body.next()).await {
			Err(_) => return Err(StreamFailure::Retryable(ClientError::IdleTimeout(idle_timeout))),
			Ok(None) => break,
			Ok(Some(Err(e))) => return Err(StreamFailure::Retryable(ClientError::Transport(e))),
			Ok(Some(Ok(chunk))) => chunk,
		};
		buffer.extend_from_slice(&chunk);
		while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
			let line: Vec<u8> = buffer.drain(..=newline).collect();
			if !deliver(&line, sink, stats).await {
				return Ok(ConnectionEnd::SinkClosed);
			}
		}
	}

	// Final record without a trailing newline.
	if !deliver(&buffer, sink, stats).await {
		return Ok(ConnectionEnd::SinkClosed);
	}
	Ok(ConnectionEnd::Closed)
}

/// Parse one record and hand it to the sink. Returns false once the
/// receiver is gone. Blank and malformed records are skipped.
async fn deliver(record: &[u8], sink: &mpsc::Sender<Notification>, stats: &StreamStats) -> bool {
	let text = String::from_utf8_lossy(record);
	let text = text.trim();
	if text.is_empty() {
		return true;
	}

	let notifications = if text.starts_with('[') {
		serde_json::from_str::<Vec<Notification>>(text)
	} else {
		serde_json::from_str::<Notification>(text).map(|n| vec![n])
	};
	let notifications = match notifications {
		Ok(notifications) => notifications,
		Err(e) => {
			warn!(error = %e, "skipping malformed notification");
			return true;
		}
	};

	for notification in notifications {
		if sink.send(notification).await.is_err() {
			return false;
		}
		stats.delivered.fetch_add(1, Ordering::SeqCst);
	}
	true
}
