// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

//! The realtime channel state machine.
//!
//! ```text
//! Unconfigured --configure()--> Configured
//! Configured --subscribe()--> Connecting --(open)--> Connected
//! Connected --(close | unsubscribe())--> Disconnected
//! Disconnected --subscribe()--> Connecting
//! ```
//!
//! The channel owns its socket and heartbeat timer exclusively. It has no
//! retry policy: the host's connectivity observer calls [`subscribe`] on
//! link-up and [`unsubscribe`] on link-down, and the application pumps
//! [`poll`] from its main loop.
//!
//! [`subscribe`]: RealtimeChannel::subscribe
//! [`unsubscribe`]: RealtimeChannel::unsubscribe
//! [`poll`]: RealtimeChannel::poll

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::{
	FrameSink,
	heartbeat::{HeartbeatTimer, SharedTransport},
	protocol::{self, SubscriptionDescriptor},
	socket::{Connector, SocketEvent},
};
use crate::RealtimeConfig;

/// Lifecycle state of a [`RealtimeChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
	/// No subscription descriptor yet; `subscribe` is refused.
	Unconfigured,
	/// Descriptor and payloads are in place; no socket yet.
	Configured,
	/// A connect attempt was issued; waiting for the open event.
	Connecting,
	/// Socket open, join sent, heartbeat armed.
	Connected,
	/// The socket is gone, deliberately or not. `subscribe` again to rejoin.
	Disconnected,
}

/// A persistent subscription to backend change notifications.
pub struct RealtimeChannel {
	host: String,
	key: String,
	config: RealtimeConfig,
	connector: Box<dyn Connector>,
	state: ChannelState,
	descriptor: Option<SubscriptionDescriptor>,
	port: u16,
	join_payload: String,
	heartbeat_payload: String,
	transport: Option<SharedTransport>,
	heartbeat: Option<HeartbeatTimer>,
	sink: Option<Box<dyn FrameSink>>,
}

impl RealtimeChannel {
	/// Create an unconfigured channel for the given backend host and key.
	pub fn new(
		host: impl Into<String>,
		key: impl Into<String>,
		config: RealtimeConfig,
		connector: Box<dyn Connector>,
	) -> Self {
		Self {
			host: host.into(),
			key: key.into(),
			config,
			connector,
			state: ChannelState::Unconfigured,
			descriptor: None,
			port: 0,
			join_payload: String::new(),
			heartbeat_payload: String::new(),
			transport: None,
			heartbeat: None,
			sink: None,
		}
	}

	pub fn state(&self) -> ChannelState {
		self.state
	}

	pub fn is_configured(&self) -> bool {
		self.descriptor.is_some()
	}

	pub fn is_connected(&self) -> bool {
		self.state == ChannelState::Connected
	}

	/// Whether the heartbeat timer is currently armed. Holds exactly while
	/// the channel is connected.
	pub fn heartbeat_armed(&self) -> bool {
		self.heartbeat.is_some()
	}

	/// The join frame that will be (or was) sent on connect, if configured.
	pub fn join_payload(&self) -> Option<&str> {
		self.descriptor.as_ref().map(|_| self.join_payload.as_str())
	}

	/// Set the subscription: stream changes for the row `id=eq.<row_id>` of
	/// `table`, connecting on `port`.
	///
	/// Valid in any state and overwrites any previous configuration. Has no
	/// network effect of its own; notably, reconfiguring a connected channel
	/// does not touch the live subscription — `unsubscribe` and `subscribe`
	/// again to apply the new descriptor.
	pub fn configure(&mut self, port: u16, table: &str, row_id: &str) {
		let descriptor = SubscriptionDescriptor::new(table, row_id);
		self.join_payload = descriptor.join_message();
		self.heartbeat_payload = protocol::heartbeat_message();
		self.descriptor = Some(descriptor);
		self.port = port;
		if self.state == ChannelState::Unconfigured {
			self.state = ChannelState::Configured;
		}
		debug!("realtime configured for table {table}, row {row_id}");
	}

	/// Open the socket and start the join handshake.
	///
	/// Refused (with a log line, not an error) when no subscription has been
	/// configured. When already subscribed, the existing socket and timer are
	/// torn down and a fresh connect attempt is issued. A connect attempt
	/// that fails at the transport layer leaves the channel in `Connecting`
	/// with nothing to poll; the link observer is expected to retry by
	/// calling this again.
	pub fn subscribe(&mut self) {
		if self.descriptor.is_none() {
			warn!("realtime not configured, call configure first");
			return;
		}

		self.teardown();

		let host = protocol::strip_scheme(&self.host).to_owned();
		let path = protocol::endpoint_path(&self.key);
		debug!("opening realtime socket to {host}:{}", self.port);
		match self.connector.connect(&host, self.port, &path) {
			Ok(transport) => {
				self.transport = Some(Arc::new(Mutex::new(transport)));
			}
			Err(e) => {
				warn!("realtime connect failed: {e}");
			}
		}
		self.state = ChannelState::Connecting;
	}

	/// Close the socket and release the heartbeat timer.
	///
	/// Safe from any state, repeatedly. A channel that was never configured
	/// stays `Unconfigured`; otherwise the channel ends `Disconnected` and
	/// can be re-subscribed.
	pub fn unsubscribe(&mut self) {
		self.teardown();
		if self.state != ChannelState::Unconfigured {
			self.state = ChannelState::Disconnected;
		}
	}

	/// Pump socket I/O and dispatch pending events, in arrival order.
	///
	/// Must be called at a bounded interval from the host's main loop; each
	/// call performs only non-blocking reads. No-op unless a connect attempt
	/// is in flight or established.
	pub fn poll(&mut self) {
		if !matches!(self.state, ChannelState::Connecting | ChannelState::Connected) {
			return;
		}
		let Some(transport) = self.transport.clone() else {
			return;
		};

		loop {
			// The lock is released before dispatching so the sink never
			// stalls the heartbeat context.
			let polled = transport.lock().poll_event();
			match polled {
				Ok(Some(SocketEvent::Open)) => self.on_open(&transport),
				Ok(Some(SocketEvent::Text(payload))) => self.dispatch(payload),
				Ok(Some(SocketEvent::Closed)) => {
					self.on_close();
					break;
				}
				Ok(None) => break,
				Err(e) => {
					warn!("realtime socket error: {e}");
					self.on_close();
					break;
				}
			}
		}
	}

	/// Install the inbound frame sink. At most one is held; installing a new
	/// one replaces the previous. Install it before subscribing — frames
	/// arriving without a sink are dropped.
	pub fn set_sink(&mut self, sink: Box<dyn FrameSink>) {
		self.sink = Some(sink);
	}

	fn on_open(&mut self, transport: &SharedTransport) {
		debug!("realtime socket open, joining {}", protocol::REALTIME_TOPIC);
		self.state = ChannelState::Connected;
		self.heartbeat = Some(HeartbeatTimer::start(
			transport.clone(),
			self.heartbeat_payload.clone(),
			self.config.heartbeat_interval,
		));
		if let Err(e) = transport.lock().send_text(&self.join_payload) {
			warn!("join send failed: {e}");
		}
	}

	fn on_close(&mut self) {
		debug!("realtime socket closed");
		self.heartbeat = None;
		self.transport = None;
		self.state = ChannelState::Disconnected;
	}

	fn dispatch(&mut self, payload: Vec<u8>) {
		match &mut self.sink {
			Some(sink) => sink.on_frame(&payload),
			None => trace!("dropping {} byte frame, no sink registered", payload.len()),
		}
	}

	/// Release the timer and the socket. The timer goes first: its thread
	/// may be blocked on the transport lock.
	fn teardown(&mut self) {
		self.heartbeat = None;
		if let Some(transport) = self.transport.take() {
			transport.lock().close();
		}
	}
}

impl Drop for RealtimeChannel {
	fn drop(&mut self) {
		self.teardown();
	}
}
