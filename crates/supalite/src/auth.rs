// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

//! Password-grant sessions against the GoTrue auth endpoint.
//!
//! A session stores the credentials it was opened with so the bearer token
//! can be refreshed in place once it expires; the expiry check runs before
//! every authorized REST call.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result, http::RestClient};

#[derive(Debug, Clone, Copy)]
pub(crate) enum LoginMethod {
	Email,
	Phone,
}

pub(crate) struct Session {
	method: LoginMethod,
	identity: String,
	password: String,
	token: String,
	issued_at: Instant,
	expires_in: Duration,
}

impl Session {
	/// Open a session by exchanging credentials for an access token.
	pub(crate) fn login(
		rest: &RestClient,
		method: LoginMethod,
		identity: impl Into<String>,
		password: impl Into<String>,
	) -> Result<Self> {
		let identity = identity.into();
		let password = password.into();
		let grant = request_token(rest, method, &identity, &password)?;
		debug!("login succeeded, token valid for {}s", grant.expires_in);
		Ok(Self {
			method,
			identity,
			password,
			token: grant.access_token,
			issued_at: Instant::now(),
			expires_in: Duration::from_secs(grant.expires_in),
		})
	}

	/// The current bearer token, re-logging in first if it has expired.
	pub(crate) fn bearer(&mut self, rest: &RestClient) -> Result<&str> {
		if self.expired() {
			debug!("access token expired, refreshing");
			let grant =
				request_token(rest, self.method, &self.identity, &self.password)?;
			self.token = grant.access_token;
			self.issued_at = Instant::now();
			self.expires_in = Duration::from_secs(grant.expires_in);
		}
		Ok(&self.token)
	}

	fn expired(&self) -> bool {
		self.issued_at.elapsed() >= self.expires_in
	}
}

#[derive(Serialize)]
struct PasswordGrantRequest<'a> {
	#[serde(skip_serializing_if = "Option::is_none")]
	email: Option<&'a str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	phone: Option<&'a str>,
	password: &'a str,
}

#[derive(Deserialize)]
struct PasswordGrant {
	access_token: String,
	expires_in: u64,
}

fn request_token(
	rest: &RestClient,
	method: LoginMethod,
	identity: &str,
	password: &str,
) -> Result<PasswordGrant> {
	let url = format!("{}/auth/v1/token?grant_type=password", rest.host);
	let body = match method {
		LoginMethod::Email => PasswordGrantRequest {
			email: Some(identity),
			phone: None,
			password,
		},
		LoginMethod::Phone => PasswordGrantRequest {
			email: None,
			phone: Some(identity),
			password,
		},
	};

	let response = rest
		.http
		.post(&url)
		.header("apikey", &rest.key)
		.json(&body)
		.send()?;

	let status = response.status();
	if !status.is_success() {
		warn!("login rejected with status {status}");
		return Err(Error::AuthRejected {
			status: status.as_u16(),
		});
	}

	let grant: PasswordGrant = response.json()?;
	if grant.access_token.is_empty() {
		return Err(Error::MissingAccessToken);
	}
	Ok(grant)
}
