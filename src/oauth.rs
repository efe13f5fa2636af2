//! Token endpoint exchanges for the password and refresh token grants.
//!
//! Both grants authenticate the API connection with HTTP basic credentials and send a JSON
//! body. Responses must carry an access token, a refresh token, and a positive lifetime;
//! anything less is reported as an [`AuthError`] instead of producing a half-usable session.

// crates.io
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	auth::{Credentials, TokenRecord},
	error::AuthError,
	http::{HttpClient, JSON_CONTENT_TYPE},
	obs::{self, OpKind},
};

/// Token endpoint path relative to the base URL.
pub const TOKEN_PATH: &str = "api/oauth/v1/token";

/// Grants supported by the token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GrantType {
	/// Resource owner password grant.
	Password,
	/// Refresh token grant.
	RefreshToken,
}
impl GrantType {
	/// Returns the wire value of `grant_type`.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::Password => "password",
			GrantType::RefreshToken => "refresh_token",
		}
	}

	/// Operation kind used for spans and counters.
	pub const fn op_kind(self) -> OpKind {
		match self {
			GrantType::Password => OpKind::PasswordGrant,
			GrantType::RefreshToken => OpKind::RefreshGrant,
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Body of one grant request.
#[derive(Clone, Copy)]
pub(crate) enum GrantRequest<'a> {
	Password { username: &'a str, password: &'a str },
	RefreshToken { refresh_token: &'a str },
}
impl GrantRequest<'_> {
	pub(crate) fn grant_type(&self) -> GrantType {
		match self {
			Self::Password { .. } => GrantType::Password,
			Self::RefreshToken { .. } => GrantType::RefreshToken,
		}
	}

	fn body(&self) -> JsonValue {
		match *self {
			Self::Password { username, password } => serde_json::json!({
				"grant_type": GrantType::Password.as_str(),
				"username": username,
				"password": password,
			}),
			Self::RefreshToken { refresh_token } => serde_json::json!({
				"grant_type": GrantType::RefreshToken.as_str(),
				"refresh_token": refresh_token,
			}),
		}
	}
}
impl Debug for GrantRequest<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GrantRequest").field("grant_type", &self.grant_type()).finish()
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GrantResponse {
	access_token: Option<String>,
	refresh_token: Option<String>,
	expires_in: Option<i64>,
}
impl GrantResponse {
	fn into_record(self, issued_at: OffsetDateTime) -> Result<TokenRecord, AuthError> {
		let access_token = self
			.access_token
			.filter(|token| !token.is_empty())
			.ok_or(AuthError::IncompleteResponse { field: "access_token" })?;
		let refresh_token = self
			.refresh_token
			.filter(|token| !token.is_empty())
			.ok_or(AuthError::IncompleteResponse { field: "refresh_token" })?;
		let expires_in =
			self.expires_in.ok_or(AuthError::IncompleteResponse { field: "expires_in" })?;

		if expires_in <= 0 {
			return Err(AuthError::NonPositiveExpiresIn);
		}

		Ok(TokenRecord::new(access_token, refresh_token, issued_at, Duration::seconds(expires_in)))
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GrantErrorBody {
	message: Option<String>,
	error: Option<String>,
	error_description: Option<String>,
}

/// Performs one grant against `endpoint` and returns the issued token pair.
///
/// Expiry is measured from the instant the request was started so clock time spent on the
/// wire only shortens the perceived lifetime.
pub(crate) async fn exchange(
	http: &HttpClient,
	endpoint: &Url,
	credentials: &Credentials,
	request: GrantRequest<'_>,
) -> Result<TokenRecord, AuthError> {
	let kind = request.grant_type().op_kind();

	obs::observe(kind, "exchange", async move {
		let authorization = credentials.basic_authorization();
		let body = request.body().to_string();
		let started = OffsetDateTime::now_utc();
		let raw = http
			.dispatch(kind, |client| {
				client
					.post(endpoint.clone())
					.header(AUTHORIZATION, &authorization)
					.header(ACCEPT, JSON_CONTENT_TYPE)
					.header(CONTENT_TYPE, JSON_CONTENT_TYPE)
					.body(body.clone())
			})
			.await?;

		if !raw.metadata.is_success() {
			return Err(rejected(raw.metadata.status, &raw.body));
		}

		let mut de = serde_json::Deserializer::from_slice(&raw.body);
		let response: GrantResponse =
			serde_path_to_error::deserialize(&mut de).map_err(|e| AuthError::MalformedResponse {
				path: e.path().to_string(),
				message: e.inner().to_string(),
			})?;

		response.into_record(started)
	})
	.await
}

fn rejected(status: u16, body: &[u8]) -> AuthError {
	let parsed = serde_json::from_slice::<GrantErrorBody>(body).unwrap_or_default();
	let message = parsed
		.message
		.or(parsed.error_description)
		.or(parsed.error)
		.filter(|message| !message.is_empty())
		.unwrap_or_else(|| {
			StatusCode::from_u16(status)
				.ok()
				.and_then(|status| status.canonical_reason())
				.unwrap_or("Unknown status")
				.to_owned()
		});

	AuthError::Rejected { status, message }
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn response(
		access: Option<&str>,
		refresh: Option<&str>,
		expires_in: Option<i64>,
	) -> GrantResponse {
		GrantResponse {
			access_token: access.map(Into::into),
			refresh_token: refresh.map(Into::into),
			expires_in,
		}
	}

	#[test]
	fn grant_bodies_carry_the_grant_type() {
		let password = GrantRequest::Password { username: "admin", password: "pw" }.body();
		let refresh = GrantRequest::RefreshToken { refresh_token: "r-1" }.body();

		assert_eq!(
			password,
			serde_json::json!({"grant_type": "password", "username": "admin", "password": "pw"})
		);
		assert_eq!(
			refresh,
			serde_json::json!({"grant_type": "refresh_token", "refresh_token": "r-1"})
		);
	}

	#[test]
	fn complete_responses_become_records() {
		let issued_at = datetime!(2025-01-01 00:00 UTC);
		let record = response(Some("a"), Some("r"), Some(3600))
			.into_record(issued_at)
			.expect("Complete response should convert.");

		assert_eq!(record.access_token.expose(), "a");
		assert_eq!(record.expires_at, datetime!(2025-01-01 01:00 UTC));
	}

	#[test]
	fn incomplete_responses_are_rejected() {
		let issued_at = datetime!(2025-01-01 00:00 UTC);

		assert!(matches!(
			response(None, Some("r"), Some(60)).into_record(issued_at),
			Err(AuthError::IncompleteResponse { field: "access_token" })
		));
		assert!(matches!(
			response(Some("a"), Some(""), Some(60)).into_record(issued_at),
			Err(AuthError::IncompleteResponse { field: "refresh_token" })
		));
		assert!(matches!(
			response(Some("a"), Some("r"), None).into_record(issued_at),
			Err(AuthError::IncompleteResponse { field: "expires_in" })
		));
		assert!(matches!(
			response(Some("a"), Some("r"), Some(0)).into_record(issued_at),
			Err(AuthError::NonPositiveExpiresIn)
		));
	}

	#[test]
	fn rejections_prefer_upstream_messages() {
		let err = rejected(422, br#"{"code":422,"message":"Invalid credentials."}"#);

		assert!(matches!(
			err,
			AuthError::Rejected { status: 422, ref message } if message == "Invalid credentials."
		));

		let err = rejected(400, br#"{"error":"invalid_grant","error_description":"Expired."}"#);

		assert!(matches!(err, AuthError::Rejected { ref message, .. } if message == "Expired."));

		let err = rejected(401, b"");

		assert!(matches!(
			err,
			AuthError::Rejected { ref message, .. } if message == "Unauthorized"
		));
	}
}
