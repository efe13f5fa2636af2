//! Connection credentials consumed by the password grant.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::{_prelude::*, auth::Secret, error::ConfigError};

/// API connection credentials, immutable for the lifetime of a session.
///
/// Field names follow the connection export format (`client_id`, `secret`, `username`,
/// `password`) so host programs can deserialize them straight from their own config files.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	/// OAuth client identifier of the API connection.
	pub client_id: String,
	/// OAuth client secret of the API connection.
	#[serde(rename = "secret")]
	pub client_secret: Secret,
	/// API user name.
	pub username: String,
	/// API user password.
	pub password: Secret,
}
impl Credentials {
	/// Creates validated credentials.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<Secret>,
		username: impl Into<String>,
		password: impl Into<Secret>,
	) -> Result<Self, ConfigError> {
		let credentials = Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			username: username.into(),
			password: password.into(),
		};

		credentials.validate()?;

		Ok(credentials)
	}

	/// Ensures no field is empty.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let field = if self.client_id.is_empty() {
			"client_id"
		} else if self.client_secret.is_empty() {
			"secret"
		} else if self.username.is_empty() {
			"username"
		} else if self.password.is_empty() {
			"password"
		} else {
			return Ok(());
		};

		Err(ConfigError::MissingCredential { field })
	}

	/// Value of the `Authorization` header used for client authentication on the token
	/// endpoint.
	pub(crate) fn basic_authorization(&self) -> String {
		let pair = format!("{}:{}", self.client_id, self.client_secret.expose());

		format!("Basic {}", STANDARD.encode(pair))
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}
