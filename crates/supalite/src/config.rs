// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

use std::time::Duration;

/// Connection settings shared by the REST, auth and realtime layers.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// Backend base URL, e.g. `https://example.supabase.co`.
	pub host: String,
	/// The project API key (anon or service role).
	pub key: String,
	/// Skip TLS certificate verification.
	///
	/// Mirrors the insecure mode used on devices without a CA bundle.
	/// Applies to both the REST layer and the realtime socket.
	pub insecure_tls: bool,
}

impl ClientConfig {
	pub fn new(host: impl Into<String>, key: impl Into<String>) -> Self {
		let mut host = host.into();
		while host.ends_with('/') {
			host.pop();
		}
		Self {
			host,
			key: key.into(),
			insecure_tls: false,
		}
	}

	pub fn insecure_tls(mut self, insecure: bool) -> Self {
		self.insecure_tls = insecure;
		self
	}
}

/// Settings for the realtime channel.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
	/// Keep-alive period. The backend drops idle sockets, so this should
	/// stay well below the server-side idle timeout.
	pub heartbeat_interval: Duration,
	/// Bound on the blocking part of a connect attempt (TCP + TLS).
	pub connect_timeout: Duration,
}

impl Default for RealtimeConfig {
	fn default() -> Self {
		Self {
			heartbeat_interval: Duration::from_secs(30),
			connect_timeout: Duration::from_secs(10),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn trailing_slashes_are_trimmed() {
		let config = ClientConfig::new("https://example.supabase.co/", "key");
		assert_eq!(config.host, "https://example.supabase.co");
	}

	#[test]
	fn default_heartbeat_period_is_thirty_seconds() {
		let config = RealtimeConfig::default();
		assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
	}
}
