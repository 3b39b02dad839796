// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

//! Lightweight synchronous Supabase client for resource-constrained hosts.
//!
//! The crate is built around three pieces:
//!
//! - [`Query`] accumulates a PostgREST URL query string.
//! - [`Client`] performs blocking REST and auth calls and owns the realtime
//!   channel.
//! - [`RealtimeChannel`] maintains the persistent change-notification socket:
//!   a cooperative [`RealtimeChannel::poll`] pump, a background heartbeat
//!   timer while connected, and a single registered [`FrameSink`] receiving
//!   inbound frames.
//!
//! There is no async runtime anywhere: REST calls block, the realtime socket
//! is pumped by polling, and the only background execution context is the
//! heartbeat timer thread.

mod auth;
mod client;
mod config;
mod error;
mod http;
mod query;
pub mod realtime;

pub use client::Client;
pub use config::{ClientConfig, RealtimeConfig};
pub use error::{Error, Result};
pub use query::{Nulls, Order, Query};
pub use realtime::{ChannelState, FrameSink, RealtimeChannel};
