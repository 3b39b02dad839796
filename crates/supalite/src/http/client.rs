// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

//! Blocking PostgREST calls.
//!
//! Every request carries the project `apikey` header and a JSON content type;
//! a bearer token is attached when the caller holds an authenticated session.

use reqwest::{
	blocking::{Client as HttpClient, RequestBuilder},
	header::CONTENT_TYPE,
};
use tracing::debug;

use crate::{ClientConfig, Query, Result};

pub(crate) struct RestClient {
	pub(crate) http: HttpClient,
	pub(crate) host: String,
	pub(crate) key: String,
}

impl RestClient {
	pub(crate) fn new(config: &ClientConfig) -> Result<Self> {
		let http = HttpClient::builder()
			.danger_accept_invalid_certs(config.insecure_tls)
			.build()?;
		Ok(Self {
			http,
			host: config.host.clone(),
			key: config.key.clone(),
		})
	}

	/// GET the rows matched by `query`, returning the raw JSON body.
	pub(crate) fn select(&self, query: &Query, bearer: Option<&str>) -> Result<String> {
		let url = format!("{}/rest/v1/{}", self.host, query.path());
		debug!("GET {url}");
		let response = self
			.authorize(self.http.get(&url), bearer)
			.send()?
			.error_for_status()?;
		Ok(response.text()?)
	}

	/// POST one or more rows into `table`. Returns the HTTP status code, as
	/// the backend uses it to distinguish created/conflict outcomes.
	pub(crate) fn insert(
		&self,
		table: &str,
		json: &str,
		upsert: bool,
		bearer: Option<&str>,
	) -> Result<u16> {
		let url = format!("{}/rest/v1/{table}", self.host);
		let mut prefer = String::from("return=representation");
		if upsert {
			prefer.push_str(",resolution=merge-duplicates");
		}
		debug!("POST {url}");
		let response = self
			.authorize(self.http.post(&url), bearer)
			.header("Prefer", prefer)
			.body(json.to_owned())
			.send()?;
		Ok(response.status().as_u16())
	}

	/// PATCH the rows matched by `query`. Returns the HTTP status code.
	pub(crate) fn update(&self, query: &Query, json: &str, bearer: Option<&str>) -> Result<u16> {
		let url = format!("{}/rest/v1/{}", self.host, query.path());
		debug!("PATCH {url}");
		let response = self
			.authorize(self.http.patch(&url), bearer)
			.body(json.to_owned())
			.send()?;
		Ok(response.status().as_u16())
	}

	/// Invoke a database function, returning the raw JSON body.
	pub(crate) fn rpc(&self, function: &str, params: &str, bearer: Option<&str>) -> Result<String> {
		let url = format!("{}/rest/v1/rpc/{function}", self.host);
		debug!("POST {url}");
		let response = self
			.authorize(self.http.post(&url), bearer)
			.body(params.to_owned())
			.send()?
			.error_for_status()?;
		Ok(response.text()?)
	}

	fn authorize(&self, request: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
		let request = request
			.header("apikey", &self.key)
			.header(CONTENT_TYPE, "application/json");
		match bearer {
			Some(token) => request.bearer_auth(token),
			None => request,
		}
	}
}
