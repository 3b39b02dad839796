// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

//! Realtime change-notification channel.

mod channel;
mod heartbeat;
mod protocol;
mod socket;

pub use channel::{ChannelState, RealtimeChannel};
pub use protocol::{SubscriptionDescriptor, heartbeat_message};
pub use socket::{Connector, SocketEvent, Transport, WsConnector};

/// Receiver for inbound notification frames.
///
/// Invoked synchronously on the dispatch path with the raw frame bytes, so
/// implementations must not block or perform long-running work. The channel
/// holds at most one sink; closures taking `&[u8]` implement it directly.
pub trait FrameSink: Send {
	fn on_frame(&mut self, payload: &[u8]);
}

impl<F> FrameSink for F
where
	F: FnMut(&[u8]) + Send,
{
	fn on_frame(&mut self, payload: &[u8]) {
		self(payload)
	}
}
