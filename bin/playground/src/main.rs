// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

//! Subscribes to a single row and prints every change frame.
//!
//! Configuration comes from the environment:
//!
//! ```text
//! SUPALITE_URL=https://example.supabase.co \
//! SUPALITE_KEY=anon-key \
//! SUPALITE_TABLE=orders \
//! SUPALITE_ROW=42 \
//! cargo run -p playground
//! ```

use std::{env, thread::sleep, time::Duration};

use supalite::{Client, Query};
use tracing::info;

fn required(name: &str) -> String {
	env::var(name).unwrap_or_else(|_| panic!("{name} must be set"))
}

fn main() -> supalite::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "supalite=debug".into()),
		)
		.init();

	let url = required("SUPALITE_URL");
	let key = required("SUPALITE_KEY");
	let table = env::var("SUPALITE_TABLE").unwrap_or_else(|_| "orders".into());
	let row = env::var("SUPALITE_ROW").unwrap_or_else(|_| "42".into());

	let mut client = Client::new(url, key)?;

	let rows = client.select(&Query::from(table.as_str()).select("*").eq("id", &row))?;
	info!("current row state: {rows}");

	client.set_frame_sink(|payload: &[u8]| {
		info!("change frame: {}", String::from_utf8_lossy(payload));
	});
	client.configure_realtime(443, &table, &row);
	client.link_up();

	info!("polling for changes on {table} (id={row})");
	loop {
		client.poll_realtime();
		sleep(Duration::from_millis(100));
	}
}
