// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the client.
///
/// The realtime channel itself never returns these from its lifecycle
/// operations; connect failures there are observable only as the absence of a
/// connected state. REST and auth calls propagate them.
#[derive(Debug, Error)]
pub enum Error {
	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("http request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("authentication rejected with status {status}")]
	AuthRejected { status: u16 },

	#[error("login response carried no access token")]
	MissingAccessToken,

	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),

	#[error("tls error: {0}")]
	Tls(#[from] native_tls::Error),

	#[error("websocket handshake failed: {0}")]
	Handshake(String),

	#[error("socket is not connected")]
	NotConnected,

	#[error("malformed json payload: {0}")]
	Json(#[from] serde_json::Error),
}
