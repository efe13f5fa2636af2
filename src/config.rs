//! Session configuration: upstream location, version selector, pacing, retries, and timeout.

mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError, http::RetryPolicy, oauth, rate_limit::RateLimit};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Upstream service generation a session talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PimVersion {
	/// 5.0 line.
	#[serde(rename = "5.0")]
	V5,
	/// 6.0 line.
	#[default]
	#[serde(rename = "6.0")]
	V6,
	/// 7.0 line.
	#[serde(rename = "7.0")]
	V7,
}
impl PimVersion {
	/// Returns the version label.
	pub const fn as_str(self) -> &'static str {
		match self {
			PimVersion::V5 => "5.0",
			PimVersion::V6 => "6.0",
			PimVersion::V7 => "7.0",
		}
	}
}
impl Display for PimVersion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Validated configuration consumed by [`crate::session::Session`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
	/// Base URL, always ending with `/`, that API paths are resolved against.
	pub base_url: Url,
	/// Upstream version selector.
	pub version: PimVersion,
	/// Pacing of request starts.
	pub rate_limit: RateLimit,
	/// 429 retry policy.
	pub retry: RetryPolicy,
	/// Per-request timeout.
	pub timeout: StdDuration,
	/// `User-Agent` header value.
	pub user_agent: String,
}
impl SessionConfig {
	/// Returns a builder seeded with defaults for `base_url`.
	pub fn builder(base_url: Url) -> SessionConfigBuilder {
		SessionConfigBuilder::new(base_url)
	}

	/// Resolves an API path (or an absolute URL such as a pagination link) against the base URL.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}

	/// Absolute URL of the token endpoint.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		self.resolve(oauth::TOKEN_PATH)
	}
}
