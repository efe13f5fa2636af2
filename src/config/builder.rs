// crates.io
use reqwest::header::HeaderValue;
// self
use crate::{
	_prelude::*,
	config::{DEFAULT_TIMEOUT, PimVersion, SessionConfig},
	error::ConfigError,
	http::{DEFAULT_USER_AGENT, RetryPolicy},
	rate_limit::RateLimit,
};

/// Builder for [`SessionConfig`] values.
#[derive(Debug)]
pub struct SessionConfigBuilder {
	/// Base URL of the upstream installation.
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
impl SessionConfigBuilder {
	/// Creates a new builder seeded with defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			version: PimVersion::default(),
			rate_limit: RateLimit::default(),
			retry: RetryPolicy::default(),
			timeout: DEFAULT_TIMEOUT,
			user_agent: DEFAULT_USER_AGENT.into(),
		}
	}

	/// Sets the upstream version.
	pub fn version(mut self, version: PimVersion) -> Self {
		self.version = version;

		self
	}

	/// Overrides the pacing of request starts.
	pub fn rate_limit(mut self, rate_limit: RateLimit) -> Self {
		self.rate_limit = rate_limit;

		self
	}

	/// Replaces the whole retry policy.
	pub fn retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Sets how many times a 429 response is retried.
	pub fn retry_count(mut self, max_retries: u32) -> Self {
		self.retry.max_retries = max_retries;

		self
	}

	/// Sets the wait bounds between retries.
	pub fn retry_wait(mut self, min: StdDuration, max: StdDuration) -> Self {
		self.retry.min_wait = min;
		self.retry.max_wait = max;

		self
	}

	/// Overrides the per-request timeout.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the `User-Agent` header.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<SessionConfig, ConfigError> {
		let base_url = normalize_base_url(self.base_url)?;

		self.rate_limit.validate()?;
		self.retry.validate()?;

		if self.timeout.is_zero() {
			return Err(ConfigError::ZeroTimeout);
		}
		if HeaderValue::from_str(&self.user_agent).is_err() {
			return Err(ConfigError::InvalidUserAgent { user_agent: self.user_agent });
		}

		Ok(SessionConfig {
			base_url,
			version: self.version,
			rate_limit: self.rate_limit,
			retry: self.retry,
			timeout: self.timeout,
			user_agent: self.user_agent,
		})
	}
}

fn normalize_base_url(mut url: Url) -> Result<Url, ConfigError> {
	if !matches!(url.scheme(), "http" | "https") {
		return Err(ConfigError::InvalidBaseUrl {
			url: url.to_string(),
			reason: "the scheme must be http or https",
		});
	}
	if url.cannot_be_a_base() {
		return Err(ConfigError::InvalidBaseUrl {
			url: url.to_string(),
			reason: "the URL cannot anchor relative paths",
		});
	}

	url.set_query(None);
	url.set_fragment(None);

	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	Ok(url)
}
