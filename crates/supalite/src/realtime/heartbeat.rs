// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

//! Periodic keep-alive emission.
//!
//! The heartbeat runs on its own thread — a separate execution context from
//! the channel's `poll()` loop. Both contexts write to the same socket; the
//! shared lock around the transport serializes them.

use std::{sync::Arc, thread, time::Duration};

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use tracing::{trace, warn};

use super::socket::Transport;

pub(crate) type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// Handle to the running heartbeat thread.
///
/// Exists exactly while the channel is connected. Dropping it stops the
/// thread; the drop is idempotent with respect to a thread that already
/// exited on its own.
pub(crate) struct HeartbeatTimer {
	shutdown: Sender<()>,
	handle: Option<thread::JoinHandle<()>>,
}

impl HeartbeatTimer {
	pub(crate) fn start(transport: SharedTransport, payload: String, period: Duration) -> Self {
		let (shutdown, ticks) = bounded::<()>(1);
		let handle = thread::Builder::new()
			.name("realtime-heartbeat".into())
			.spawn(move || {
				loop {
					match ticks.recv_timeout(period) {
						Err(RecvTimeoutError::Timeout) => emit(&transport, &payload),
						Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
					}
				}
			})
			// Inability to spawn a thread leaves the connection without a
			// keep-alive; nothing useful can continue from here.
			.expect("heartbeat timer thread");
		Self {
			shutdown,
			handle: Some(handle),
		}
	}
}

impl Drop for HeartbeatTimer {
	fn drop(&mut self) {
		let _ = self.shutdown.try_send(());
		if let Some(handle) = self.handle.take() {
			let _ = handle.join();
		}
	}
}

fn emit(transport: &SharedTransport, payload: &str) {
	match transport.lock().send_text(payload) {
		Ok(()) => trace!("heartbeat sent"),
		Err(e) => warn!("heartbeat send failed: {e}"),
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use parking_lot::Mutex;

	use super::*;
	use crate::{Result, realtime::socket::SocketEvent};

	struct RecordingTransport {
		sent: Arc<Mutex<Vec<String>>>,
	}

	impl Transport for RecordingTransport {
		fn poll_event(&mut self) -> Result<Option<SocketEvent>> {
			Ok(None)
		}

		fn send_text(&mut self, payload: &str) -> Result<()> {
			self.sent.lock().push(payload.to_owned());
			Ok(())
		}

		fn close(&mut self) {}
	}

	fn recording_transport() -> (SharedTransport, Arc<Mutex<Vec<String>>>) {
		let sent = Arc::new(Mutex::new(Vec::new()));
		let transport: SharedTransport = Arc::new(Mutex::new(Box::new(RecordingTransport {
			sent: sent.clone(),
		})));
		(transport, sent)
	}

	#[test]
	fn emit_sends_the_payload_verbatim_once_per_call() {
		let (transport, sent) = recording_transport();
		emit(&transport, "{\"event\":\"heartbeat\"}");
		emit(&transport, "{\"event\":\"heartbeat\"}");
		let sent = sent.lock();
		assert_eq!(sent.len(), 2);
		assert_eq!(sent[0], "{\"event\":\"heartbeat\"}");
		assert_eq!(sent[0], sent[1]);
	}

	#[test]
	fn timer_emits_periodically_until_dropped() {
		let (transport, sent) = recording_transport();
		let timer = HeartbeatTimer::start(
			transport,
			"beat".into(),
			Duration::from_millis(10),
		);
		while sent.lock().len() < 2 {
			thread::sleep(Duration::from_millis(5));
		}
		drop(timer);

		let count = sent.lock().len();
		assert!(count >= 2);
		// The thread is joined, so no further emissions can appear.
		thread::sleep(Duration::from_millis(40));
		assert_eq!(sent.lock().len(), count);
		assert!(sent.lock().iter().all(|beat| beat == "beat"));
	}

	#[test]
	fn dropping_before_first_period_emits_nothing() {
		let (transport, sent) = recording_transport();
		let timer = HeartbeatTimer::start(
			transport,
			"beat".into(),
			Duration::from_secs(3600),
		);
		drop(timer);
		assert!(sent.lock().is_empty());
	}
}
