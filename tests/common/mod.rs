//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::{env, path::PathBuf, process, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use pim_session::{
	auth::Credentials,
	config::SessionConfig,
	error::Error,
	http::RetryPolicy,
	rate_limit::RateLimit,
	reqwest::Client as ReqwestClient,
	session::Session,
	url::Url,
};

/// Client identifier used by test credentials.
pub const TEST_CLIENT_ID: &str = "client-test";
/// Client secret used by test credentials.
pub const TEST_CLIENT_SECRET: &str = "secret-test";
/// Username used by test credentials.
pub const TEST_USERNAME: &str = "admin";
/// Password used by test credentials.
pub const TEST_PASSWORD: &str = "admin-password";
/// `Authorization` header of the token endpoint for the test credentials.
pub const TEST_BASIC_AUTHORIZATION: &str = "Basic Y2xpZW50LXRlc3Q6c2VjcmV0LXRlc3Q=";
/// Token endpoint path.
pub const TOKEN_PATH: &str = "/api/oauth/v1/token";

/// Credentials matching the `TEST_*` constants.
pub fn test_credentials() -> Credentials {
	Credentials::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET, TEST_USERNAME, TEST_PASSWORD)
		.expect("Test credentials should be valid.")
}

/// Session configuration tuned for tests: fast pacing and millisecond retry waits.
pub fn test_config(base_url: &str) -> SessionConfig {
	SessionConfig::builder(Url::parse(base_url).expect("Failed to parse test base URL."))
		.rate_limit(RateLimit::new(1_000, StdDuration::from_secs(1)))
		.retry(RetryPolicy {
			max_retries: 3,
			min_wait: StdDuration::from_millis(1),
			max_wait: StdDuration::from_millis(5),
		})
		.timeout(StdDuration::from_secs(5))
		.build()
		.expect("Test session configuration should be valid.")
}

/// Builds a reqwest client that accepts the self-signed certificates produced by `httpmock`.
pub fn test_reqwest_client() -> ReqwestClient {
	ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure reqwest client for tests.")
}

/// Unauthenticated session for `config` over the insecure test client.
pub fn build_session(config: SessionConfig) -> Session {
	Session::with_http_client(config, test_credentials(), test_reqwest_client())
		.expect("Test session should build.")
}

/// Unauthenticated session against `server`.
pub fn build_test_session(server: &MockServer) -> Session {
	build_session(test_config(&server.base_url()))
}

/// Session against `server` that has already completed the password grant.
pub async fn connect_test_session(server: &MockServer) -> Result<Session, Error> {
	let session = build_test_session(server);

	session.tokens().ensure_valid().await?;

	Ok(session)
}

/// Grant response body issuing `access` with a `<access>-refresh` refresh token.
pub fn grant_body(access: &str, expires_in: i64) -> serde_json::Value {
	json!({
		"access_token": access,
		"refresh_token": format!("{access}-refresh"),
		"expires_in": expires_in,
		"token_type": "bearer",
		"scope": null
	})
}

/// Mocks a successful password grant.
pub async fn mock_password_grant<'a>(
	server: &'a MockServer,
	access: &str,
	expires_in: i64,
) -> httpmock::Mock<'a> {
	let body = grant_body(access, expires_in);

	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("authorization", TEST_BASIC_AUTHORIZATION)
				.header("content-type", "application/json")
				.json_body(json!({
					"grant_type": "password",
					"username": TEST_USERNAME,
					"password": TEST_PASSWORD
				}));
			then.status(200).header("content-type", "application/json").json_body(body);
		})
		.await
}

/// Mocks a successful refresh grant exchanging `refresh_token`.
pub async fn mock_refresh_grant<'a>(
	server: &'a MockServer,
	refresh_token: &str,
	access: &str,
	expires_in: i64,
) -> httpmock::Mock<'a> {
	let body = grant_body(access, expires_in);

	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.header("authorization", TEST_BASIC_AUTHORIZATION)
				.json_body(json!({
					"grant_type": "refresh_token",
					"refresh_token": refresh_token
				}));
			then.status(200).header("content-type", "application/json").json_body(body);
		})
		.await
}

/// Unique scratch directory below the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
	env::temp_dir().join(format!(
		"pim_session_it_{label}_{}_{}",
		process::id(),
		std::time::SystemTime::now()
			.duration_since(std::time::UNIX_EPOCH)
			.map(|elapsed| elapsed.as_nanos())
			.unwrap_or_default(),
	))
}
