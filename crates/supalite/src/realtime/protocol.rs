// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

//! Wire messages for the realtime endpoint.
//!
//! The backend matches these payloads textually, so field order and spacing
//! matter: the structs below declare fields in wire order and are serialized
//! compactly, which reproduces the expected bytes exactly. Tests pin the full
//! strings.

use serde::Serialize;

/// Topic announced in the join message.
pub(crate) const REALTIME_TOPIC: &str = "realtime:[channel-name]";

/// Identifies the row changes a channel streams: one table in the `public`
/// schema, filtered to a single row id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDescriptor {
	pub schema: String,
	pub table: String,
	pub filter: String,
	pub topic: String,
}

impl SubscriptionDescriptor {
	pub fn new(table: impl Into<String>, row_id: &str) -> Self {
		Self {
			schema: "public".into(),
			table: table.into(),
			filter: format!("id=eq.{row_id}"),
			topic: REALTIME_TOPIC.into(),
		}
	}

	/// The join frame announcing this subscription, sent once per connect.
	pub fn join_message(&self) -> String {
		render(&JoinMessage {
			event: "phx_join",
			topic: &self.topic,
			payload: JoinPayload {
				config: JoinConfig {
					broadcast: BroadcastConfig { echo: false },
					presence: PresenceConfig { key: "" },
					postgres_changes: [PostgresChange {
						event: "*",
						schema: &self.schema,
						table: &self.table,
						filter: &self.filter,
					}],
				},
			},
			reference: "sentRef",
		})
	}
}

/// The fixed keep-alive frame; independent of any subscription.
pub fn heartbeat_message() -> String {
	render(&HeartbeatMessage {
		event: "heartbeat",
		topic: "phoenix",
		payload: EmptyPayload {},
		reference: "",
	})
}

/// Path and query of the realtime WebSocket endpoint.
pub(crate) fn endpoint_path(key: &str) -> String {
	format!("/realtime/v1/websocket?apikey={key}&vsn=1.0.0")
}

/// The realtime endpoint is addressed by bare hostname.
pub(crate) fn strip_scheme(host: &str) -> &str {
	host.strip_prefix("https://")
		.or_else(|| host.strip_prefix("http://"))
		.unwrap_or(host)
}

fn render<T: Serialize>(message: &T) -> String {
	// String-keyed, string-valued messages cannot fail to serialize.
	serde_json::to_string(message).unwrap_or_default()
}

#[derive(Serialize)]
struct JoinMessage<'a> {
	event: &'static str,
	topic: &'a str,
	payload: JoinPayload<'a>,
	#[serde(rename = "ref")]
	reference: &'static str,
}

#[derive(Serialize)]
struct JoinPayload<'a> {
	config: JoinConfig<'a>,
}

#[derive(Serialize)]
struct JoinConfig<'a> {
	broadcast: BroadcastConfig,
	presence: PresenceConfig<'a>,
	postgres_changes: [PostgresChange<'a>; 1],
}

#[derive(Serialize)]
struct BroadcastConfig {
	#[serde(rename = "self")]
	echo: bool,
}

#[derive(Serialize)]
struct PresenceConfig<'a> {
	key: &'a str,
}

#[derive(Serialize)]
struct PostgresChange<'a> {
	event: &'a str,
	schema: &'a str,
	table: &'a str,
	filter: &'a str,
}

#[derive(Serialize)]
struct HeartbeatMessage {
	event: &'static str,
	topic: &'static str,
	payload: EmptyPayload,
	#[serde(rename = "ref")]
	reference: &'static str,
}

#[derive(Serialize)]
struct EmptyPayload {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn join_message_matches_wire_template_exactly() {
		let descriptor = SubscriptionDescriptor::new("orders", "42");
		assert_eq!(
			descriptor.join_message(),
			"{\"event\":\"phx_join\",\"topic\":\"realtime:[channel-name]\",\
			 \"payload\":{\"config\":{\"broadcast\":{\"self\":false},\
			 \"presence\":{\"key\":\"\"},\"postgres_changes\":[{\"event\":\"*\",\
			 \"schema\":\"public\",\"table\":\"orders\",\"filter\":\"id=eq.42\"}]}},\
			 \"ref\":\"sentRef\"}"
		);
	}

	#[test]
	fn join_message_embeds_table_and_row_filter() {
		let descriptor = SubscriptionDescriptor::new("sensors", "esp-7");
		let message = descriptor.join_message();
		assert!(message.contains("\"table\":\"sensors\""));
		assert!(message.contains("\"filter\":\"id=eq.esp-7\""));
	}

	#[test]
	fn heartbeat_message_matches_wire_template_exactly() {
		assert_eq!(
			heartbeat_message(),
			"{\"event\":\"heartbeat\",\"topic\":\"phoenix\",\"payload\":{},\"ref\":\"\"}"
		);
	}

	#[test]
	fn endpoint_path_carries_key_and_protocol_version() {
		assert_eq!(
			endpoint_path("anon-key"),
			"/realtime/v1/websocket?apikey=anon-key&vsn=1.0.0"
		);
	}

	#[test]
	fn scheme_prefixes_are_stripped_from_the_host() {
		assert_eq!(strip_scheme("https://example.supabase.co"), "example.supabase.co");
		assert_eq!(strip_scheme("http://localhost"), "localhost");
		assert_eq!(strip_scheme("example.supabase.co"), "example.supabase.co");
	}
}
