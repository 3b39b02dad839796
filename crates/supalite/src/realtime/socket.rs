// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

//! Polling WebSocket transport over TLS.
//!
//! The realtime channel is pumped cooperatively, so the transport never
//! blocks: the TCP and TLS handshakes complete while the stream is still
//! blocking, the HTTP upgrade request is written, and the socket is then
//! switched to non-blocking. From that point [`Transport::poll_event`] reads
//! whatever bytes are available and surfaces at most one event per call —
//! the upgrade completion first, then parsed frames in arrival order.

use std::{
	io::{self, Read, Write},
	net::{TcpStream, ToSocketAddrs},
	thread,
	time::{Duration, Instant},
};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use native_tls::{TlsConnector, TlsStream};
use sha1::{Digest, Sha1};
use tracing::{trace, warn};

use crate::{Error, Result};

const OP_CONTINUATION: u8 = 0x0;
const OP_TEXT: u8 = 0x1;
const OP_BINARY: u8 = 0x2;
const OP_CLOSE: u8 = 0x8;
const OP_PING: u8 = 0x9;
const OP_PONG: u8 = 0xA;

/// An event surfaced by [`Transport::poll_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
	/// The connection handshake completed; the socket is usable.
	Open,
	/// A text (or binary) frame arrived.
	Text(Vec<u8>),
	/// The connection is gone: closed by the peer, failed mid-handshake, or
	/// broken at the transport layer.
	Closed,
}

/// A pumpable bidirectional socket owned by the realtime channel.
///
/// The send path must tolerate calls from both the polling context and the
/// heartbeat timer context; the channel guarantees mutual exclusion by
/// wrapping every transport in a lock.
pub trait Transport: Send {
	/// Pump pending inbound I/O. Returns `Ok(None)` when no complete event
	/// is available; never blocks beyond bounded non-blocking reads.
	fn poll_event(&mut self) -> Result<Option<SocketEvent>>;

	/// Send one text frame.
	fn send_text(&mut self, payload: &str) -> Result<()>;

	/// Release the connection. Idempotent, best effort.
	fn close(&mut self);
}

/// Opens a [`Transport`] to a realtime endpoint.
pub trait Connector: Send {
	fn connect(&self, host: &str, port: u16, path: &str) -> Result<Box<dyn Transport>>;
}

/// Production connector: TCP, then TLS, then the WebSocket upgrade.
pub struct WsConnector {
	insecure: bool,
	connect_timeout: Duration,
}

impl WsConnector {
	pub fn new(insecure: bool, connect_timeout: Duration) -> Self {
		Self {
			insecure,
			connect_timeout,
		}
	}
}

impl Connector for WsConnector {
	fn connect(&self, host: &str, port: u16, path: &str) -> Result<Box<dyn Transport>> {
		let addr = (host, port)
			.to_socket_addrs()?
			.next()
			.ok_or_else(|| Error::Config(format!("cannot resolve host {host}")))?;
		let tcp = TcpStream::connect_timeout(&addr, self.connect_timeout)?;
		tcp.set_read_timeout(Some(self.connect_timeout))?;
		tcp.set_write_timeout(Some(self.connect_timeout))?;

		let tls = TlsConnector::builder()
			.danger_accept_invalid_certs(self.insecure)
			.build()?;
		let mut stream = tls
			.connect(host, tcp)
			.map_err(|e| Error::Handshake(e.to_string()))?;

		// Upgrade request goes out while the stream still blocks; the
		// response is consumed by poll_event once non-blocking.
		let key = generate_key();
		let request = format!(
			"GET {path} HTTP/1.1\r\n\
			 Host: {host}\r\n\
			 Upgrade: websocket\r\n\
			 Connection: Upgrade\r\n\
			 Sec-WebSocket-Key: {key}\r\n\
			 Sec-WebSocket-Version: 13\r\n\
			 \r\n"
		);
		stream.write_all(request.as_bytes())?;
		stream.flush()?;
		stream.get_ref().set_nonblocking(true)?;

		Ok(Box::new(WsTransport {
			stream,
			read_buffer: Vec::with_capacity(4096),
			phase: Phase::Handshaking {
				accept: expected_accept(&key),
			},
		}))
	}
}

enum Phase {
	Handshaking { accept: String },
	Open,
	Closed,
}

pub(crate) struct WsTransport {
	stream: TlsStream<TcpStream>,
	read_buffer: Vec<u8>,
	phase: Phase,
}

impl Transport for WsTransport {
	fn poll_event(&mut self) -> Result<Option<SocketEvent>> {
		if matches!(self.phase, Phase::Closed) {
			return Ok(None);
		}

		if let Some(event) = self.fill_buffer() {
			return Ok(Some(event));
		}

		if let Phase::Handshaking { accept } = &self.phase {
			let Some(end) = find_header_end(&self.read_buffer) else {
				return Ok(None);
			};
			let response = String::from_utf8_lossy(&self.read_buffer[..end]).into_owned();
			let accepted = response.contains("HTTP/1.1 101")
				&& response.contains(&format!("Sec-WebSocket-Accept: {accept}"));
			self.read_buffer.drain(..end);
			if !accepted {
				warn!("websocket upgrade rejected: {}", response.lines().next().unwrap_or(""));
				self.shutdown();
				return Ok(Some(SocketEvent::Closed));
			}
			self.phase = Phase::Open;
			return Ok(Some(SocketEvent::Open));
		}

		while let Some((opcode, payload, consumed)) = parse_frame(&self.read_buffer) {
			self.read_buffer.drain(..consumed);
			match opcode {
				OP_TEXT | OP_BINARY | OP_CONTINUATION => {
					return Ok(Some(SocketEvent::Text(payload)));
				}
				OP_CLOSE => {
					self.shutdown();
					return Ok(Some(SocketEvent::Closed));
				}
				OP_PING => {
					let pong = build_frame(OP_PONG, &payload, true);
					if self.write_fully(&pong).is_err() {
						self.shutdown();
						return Ok(Some(SocketEvent::Closed));
					}
				}
				OP_PONG => {}
				other => {
					trace!("ignoring frame with opcode {other:#x}");
				}
			}
		}

		Ok(None)
	}

	fn send_text(&mut self, payload: &str) -> Result<()> {
		if !matches!(self.phase, Phase::Open) {
			return Err(Error::NotConnected);
		}
		let frame = build_frame(OP_TEXT, payload.as_bytes(), true);
		self.write_fully(&frame)
	}

	fn close(&mut self) {
		if matches!(self.phase, Phase::Open) {
			let frame = build_frame(OP_CLOSE, &[], true);
			let _ = self.write_fully(&frame);
		}
		self.shutdown();
	}
}

impl WsTransport {
	/// Read whatever is available without blocking. Returns the terminal
	/// event if the connection turns out to be gone.
	fn fill_buffer(&mut self) -> Option<SocketEvent> {
		let mut chunk = [0u8; 4096];
		loop {
			match self.stream.read(&mut chunk) {
				Ok(0) => {
					self.shutdown();
					return Some(SocketEvent::Closed);
				}
				Ok(n) => self.read_buffer.extend_from_slice(&chunk[..n]),
				Err(e) if e.kind() == io::ErrorKind::WouldBlock => return None,
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(e) => {
					warn!("socket read failed: {e}");
					self.shutdown();
					return Some(SocketEvent::Closed);
				}
			}
		}
	}

	/// Complete a short write on the non-blocking stream. Frames here are a
	/// few hundred bytes, so retries only happen with a saturated send
	/// buffer.
	fn write_fully(&mut self, bytes: &[u8]) -> Result<()> {
		let deadline = Instant::now() + Duration::from_secs(5);
		let mut written = 0;
		while written < bytes.len() {
			match self.stream.write(&bytes[written..]) {
				Ok(n) => written += n,
				Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
					if Instant::now() >= deadline {
						return Err(io::Error::new(
							io::ErrorKind::TimedOut,
							"send buffer saturated",
						)
						.into());
					}
					thread::sleep(Duration::from_millis(1));
				}
				Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
				Err(e) => return Err(e.into()),
			}
		}
		let _ = self.stream.flush();
		Ok(())
	}

	fn shutdown(&mut self) {
		self.phase = Phase::Closed;
		let _ = self.stream.get_ref().shutdown(std::net::Shutdown::Both);
	}
}

/// Find the end of the HTTP response headers (double CRLF).
fn find_header_end(data: &[u8]) -> Option<usize> {
	data.windows(4).position(|window| window == b"\r\n\r\n").map(|pos| pos + 4)
}

/// Random nonce for the `Sec-WebSocket-Key` header.
fn generate_key() -> String {
	let nonce: [u8; 16] = rand::random();
	BASE64.encode(nonce)
}

/// The `Sec-WebSocket-Accept` value the server must echo for `key`.
fn expected_accept(key: &str) -> String {
	const MAGIC: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
	let mut hasher = Sha1::new();
	hasher.update(key.as_bytes());
	hasher.update(MAGIC.as_bytes());
	BASE64.encode(hasher.finalize())
}

/// Parse one frame from the front of `data`.
///
/// Returns the opcode, unmasked payload and the number of bytes consumed, or
/// `None` while the frame is still incomplete. Fragmented messages are passed
/// through per-frame; the realtime backend sends unfragmented text frames.
fn parse_frame(data: &[u8]) -> Option<(u8, Vec<u8>, usize)> {
	if data.len() < 2 {
		return None;
	}

	let opcode = data[0] & 0x0F;
	let masked = (data[1] & 0x80) != 0;
	let mut payload_len = (data[1] & 0x7F) as usize;
	let mut pos = 2;

	if payload_len == 126 {
		if data.len() < pos + 2 {
			return None;
		}
		payload_len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
		pos += 2;
	} else if payload_len == 127 {
		if data.len() < pos + 8 {
			return None;
		}
		let mut raw = [0u8; 8];
		raw.copy_from_slice(&data[pos..pos + 8]);
		payload_len = u64::from_be_bytes(raw) as usize;
		pos += 8;
	}

	let mask = if masked {
		if data.len() < pos + 4 {
			return None;
		}
		let key = [data[pos], data[pos + 1], data[pos + 2], data[pos + 3]];
		pos += 4;
		Some(key)
	} else {
		None
	};

	if data.len() < pos + payload_len {
		return None;
	}

	let mut payload = data[pos..pos + payload_len].to_vec();
	if let Some(mask) = mask {
		for (i, byte) in payload.iter_mut().enumerate() {
			*byte ^= mask[i % 4];
		}
	}

	Some((opcode, payload, pos + payload_len))
}

/// Build a frame. Client-to-server frames must be masked.
fn build_frame(opcode: u8, payload: &[u8], mask: bool) -> Vec<u8> {
	let mut frame = Vec::with_capacity(payload.len() + 14);
	frame.push(0x80 | opcode);

	let mask_bit = if mask { 0x80 } else { 0x00 };
	if payload.len() < 126 {
		frame.push(mask_bit | payload.len() as u8);
	} else if payload.len() < 65536 {
		frame.push(mask_bit | 126);
		frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
	} else {
		frame.push(mask_bit | 127);
		frame.extend_from_slice(&(payload.len() as u64).to_be_bytes());
	}

	if mask {
		let key: [u8; 4] = rand::random();
		frame.extend_from_slice(&key);
		frame.extend(payload.iter().enumerate().map(|(i, &b)| b ^ key[i % 4]));
	} else {
		frame.extend_from_slice(payload);
	}

	frame
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generated_keys_are_distinct_base64_nonces() {
		let first = generate_key();
		let second = generate_key();
		assert_ne!(first, second);
		// 16 bytes base64-encoded.
		assert_eq!(first.len(), 24);
	}

	#[test]
	fn accept_key_matches_rfc_6455_example() {
		assert_eq!(
			expected_accept("dGhlIHNhbXBsZSBub25jZQ=="),
			"s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
		);
	}

	#[test]
	fn header_end_is_found_after_double_crlf() {
		let data = b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\n\r\nrest";
		let end = find_header_end(data).unwrap();
		assert_eq!(&data[end..], b"rest");
		assert_eq!(find_header_end(b"HTTP/1.1 101\r\n"), None);
	}

	#[test]
	fn unmasked_frame_roundtrip() {
		let payload = b"{\"event\":\"heartbeat\"}";
		let frame = build_frame(OP_TEXT, payload, false);
		let (opcode, parsed, consumed) = parse_frame(&frame).unwrap();
		assert_eq!(opcode, OP_TEXT);
		assert_eq!(parsed, payload);
		assert_eq!(consumed, frame.len());
	}

	#[test]
	fn masked_frame_roundtrip_unmasks_payload() {
		let payload = b"hello, websocket";
		let frame = build_frame(OP_TEXT, payload, true);
		let (opcode, parsed, consumed) = parse_frame(&frame).unwrap();
		assert_eq!(opcode, OP_TEXT);
		assert_eq!(parsed, payload);
		assert_eq!(consumed, frame.len());
	}

	#[test]
	fn extended_length_frames_roundtrip() {
		let payload = vec![0x42u8; 70_000];
		let frame = build_frame(OP_BINARY, &payload, false);
		let (opcode, parsed, consumed) = parse_frame(&frame).unwrap();
		assert_eq!(opcode, OP_BINARY);
		assert_eq!(parsed.len(), payload.len());
		assert_eq!(consumed, frame.len());
	}

	#[test]
	fn incomplete_frames_are_left_in_place() {
		let payload = b"truncated payload";
		let frame = build_frame(OP_TEXT, payload, true);
		assert!(parse_frame(&frame[..1]).is_none());
		assert!(parse_frame(&frame[..frame.len() - 1]).is_none());
	}

	#[test]
	fn consecutive_frames_parse_one_at_a_time() {
		let mut buffer = build_frame(OP_TEXT, b"first", false);
		buffer.extend(build_frame(OP_TEXT, b"second", false));

		let (_, first, consumed) = parse_frame(&buffer).unwrap();
		assert_eq!(first, b"first");
		buffer.drain(..consumed);

		let (_, second, consumed) = parse_frame(&buffer).unwrap();
		assert_eq!(second, b"second");
		assert_eq!(consumed, buffer.len());
	}
}
