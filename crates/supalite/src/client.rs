// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

//! Unified client: blocking REST and auth plus the realtime channel.

use tracing::debug;

use crate::{
	ClientConfig, Error, Query, RealtimeConfig, Result,
	auth::{LoginMethod, Session},
	http::RestClient,
	realtime::{ChannelState, FrameSink, RealtimeChannel, WsConnector},
};

/// Client for a single backend project.
///
/// REST and auth calls block; the realtime channel is pumped by calling
/// [`Client::poll_realtime`] from the application's main loop. Connectivity
/// transitions are reported by the host through [`Client::link_up`] and
/// [`Client::link_down`], which keep the realtime subscription aligned with
/// the actual link.
pub struct Client {
	rest: RestClient,
	session: Option<Session>,
	realtime: RealtimeChannel,
	link_is_up: bool,
}

impl Client {
	/// Create a client for `host` using the project API `key`.
	pub fn new(host: impl Into<String>, key: impl Into<String>) -> Result<Self> {
		Self::with_config(ClientConfig::new(host, key), RealtimeConfig::default())
	}

	pub fn with_config(config: ClientConfig, realtime: RealtimeConfig) -> Result<Self> {
		if config.host.is_empty() {
			return Err(Error::Config("host must not be empty".into()));
		}
		if config.key.is_empty() {
			return Err(Error::Config("api key must not be empty".into()));
		}

		let rest = RestClient::new(&config)?;
		let connector = WsConnector::new(config.insecure_tls, realtime.connect_timeout);
		let channel = RealtimeChannel::new(
			config.host.clone(),
			config.key.clone(),
			realtime,
			Box::new(connector),
		);

		Ok(Self {
			rest,
			session: None,
			realtime: channel,
			link_is_up: false,
		})
	}

	// ── Auth ─────────────────────────────────────────────────────────────

	/// Log in with an email address. Later REST calls carry the bearer
	/// token, refreshing it on expiry.
	pub fn login_email(&mut self, email: &str, password: &str) -> Result<()> {
		self.session = Some(Session::login(&self.rest, LoginMethod::Email, email, password)?);
		Ok(())
	}

	/// Log in with a phone number.
	pub fn login_phone(&mut self, phone: &str, password: &str) -> Result<()> {
		self.session = Some(Session::login(&self.rest, LoginMethod::Phone, phone, password)?);
		Ok(())
	}

	pub fn is_authenticated(&self) -> bool {
		self.session.is_some()
	}

	// ── REST ─────────────────────────────────────────────────────────────

	/// Execute a select, returning the raw JSON body.
	pub fn select(&mut self, query: &Query) -> Result<String> {
		let bearer = self.bearer()?;
		self.rest.select(query, bearer.as_deref())
	}

	/// Insert rows into `table`; `json` is a JSON object or array of
	/// objects. Returns the HTTP status code.
	pub fn insert(&mut self, table: &str, json: &str, upsert: bool) -> Result<u16> {
		let bearer = self.bearer()?;
		self.rest.insert(table, json, upsert, bearer.as_deref())
	}

	/// Patch the rows matched by `query` with `json`. Returns the HTTP
	/// status code.
	pub fn update(&mut self, query: &Query, json: &str) -> Result<u16> {
		let bearer = self.bearer()?;
		self.rest.update(query, json, bearer.as_deref())
	}

	/// Call a database function with a JSON parameter object.
	pub fn rpc(&mut self, function: &str, params: &str) -> Result<String> {
		let bearer = self.bearer()?;
		self.rest.rpc(function, params, bearer.as_deref())
	}

	// ── Realtime ─────────────────────────────────────────────────────────

	/// Configure the realtime subscription. If the link is already up, the
	/// channel is subscribed immediately.
	pub fn configure_realtime(&mut self, port: u16, table: &str, row_id: &str) {
		self.realtime.configure(port, table, row_id);
		if self.link_is_up {
			self.realtime.subscribe();
		}
	}

	/// Install the single inbound frame sink.
	pub fn set_frame_sink(&mut self, sink: impl FrameSink + 'static) {
		self.realtime.set_sink(Box::new(sink));
	}

	pub fn subscribe_realtime(&mut self) {
		self.realtime.subscribe();
	}

	pub fn unsubscribe_realtime(&mut self) {
		self.realtime.unsubscribe();
	}

	/// Pump realtime socket I/O. Call at a bounded interval from the main
	/// loop.
	pub fn poll_realtime(&mut self) {
		self.realtime.poll();
	}

	pub fn realtime_state(&self) -> ChannelState {
		self.realtime.state()
	}

	pub fn realtime(&self) -> &RealtimeChannel {
		&self.realtime
	}

	pub fn realtime_mut(&mut self) -> &mut RealtimeChannel {
		&mut self.realtime
	}

	// ── Link-state coupling ──────────────────────────────────────────────

	/// Notify the client that connectivity was (re)established. Subscribes
	/// the realtime channel when one is configured.
	pub fn link_up(&mut self) {
		debug!("link up");
		self.link_is_up = true;
		if self.realtime.is_configured() {
			self.realtime.subscribe();
		}
	}

	/// Notify the client that connectivity was lost. Tears the realtime
	/// socket and heartbeat down so nothing leaks across link flaps.
	pub fn link_down(&mut self) {
		debug!("link down");
		self.link_is_up = false;
		self.realtime.unsubscribe();
	}

	fn bearer(&mut self) -> Result<Option<String>> {
		let Self { rest, session, .. } = self;
		match session {
			Some(session) => Ok(Some(session.bearer(rest)?.to_owned())),
			None => Ok(None),
		}
	}
}
