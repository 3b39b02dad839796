// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

//! Scripted transport for driving the realtime channel without a network.

use std::{
	collections::VecDeque,
	sync::{
		Arc, Mutex,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	thread,
	time::{Duration, Instant},
};

use supalite::{
	Error, RealtimeConfig, Result,
	realtime::{Connector, RealtimeChannel, SocketEvent, Transport},
};

/// Connector whose transports replay a scripted event sequence and record
/// everything sent through them.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
	pub script: Arc<Mutex<VecDeque<SocketEvent>>>,
	pub sent: Arc<Mutex<Vec<String>>>,
	pub closed: Arc<AtomicBool>,
	pub connects: Arc<AtomicUsize>,
	pub fail_connect: Arc<AtomicBool>,
}

impl ScriptedConnector {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push_event(&self, event: SocketEvent) {
		self.script.lock().unwrap().push_back(event);
	}

	pub fn sent_frames(&self) -> Vec<String> {
		self.sent.lock().unwrap().clone()
	}

	pub fn connect_attempts(&self) -> usize {
		self.connects.load(Ordering::SeqCst)
	}

	pub fn was_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	pub fn fail_next_connects(&self, fail: bool) {
		self.fail_connect.store(fail, Ordering::SeqCst);
	}
}

impl Connector for ScriptedConnector {
	fn connect(&self, _host: &str, _port: u16, _path: &str) -> Result<Box<dyn Transport>> {
		self.connects.fetch_add(1, Ordering::SeqCst);
		if self.fail_connect.load(Ordering::SeqCst) {
			return Err(Error::NotConnected);
		}
		Ok(Box::new(ScriptedTransport {
			script: self.script.clone(),
			sent: self.sent.clone(),
			closed: self.closed.clone(),
		}))
	}
}

struct ScriptedTransport {
	script: Arc<Mutex<VecDeque<SocketEvent>>>,
	sent: Arc<Mutex<Vec<String>>>,
	closed: Arc<AtomicBool>,
}

impl Transport for ScriptedTransport {
	fn poll_event(&mut self) -> Result<Option<SocketEvent>> {
		Ok(self.script.lock().unwrap().pop_front())
	}

	fn send_text(&mut self, payload: &str) -> Result<()> {
		self.sent.lock().unwrap().push(payload.to_owned());
		Ok(())
	}

	fn close(&mut self) {
		self.closed.store(true, Ordering::SeqCst);
	}
}

/// A channel wired to a scripted connector with a fast heartbeat.
pub fn scripted_channel(heartbeat: Duration) -> (RealtimeChannel, ScriptedConnector) {
	let connector = ScriptedConnector::new();
	let config = RealtimeConfig {
		heartbeat_interval: heartbeat,
		..RealtimeConfig::default()
	};
	let channel = RealtimeChannel::new(
		"https://example.supabase.co",
		"anon-key",
		config,
		Box::new(connector.clone()),
	);
	(channel, connector)
}

/// Poll `cond` until it holds or a generous deadline passes.
pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
	let deadline = Instant::now() + Duration::from_secs(2);
	while Instant::now() < deadline {
		if cond() {
			return true;
		}
		thread::sleep(Duration::from_millis(5));
	}
	false
}
