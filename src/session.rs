//! Session composition root.
//!
//! A [`Session`] ties one configuration, one set of credentials, one [`RateLimiter`], and one
//! [`TokenManager`] together. It is cheap to clone and every clone shares the same token
//! state and limiter, so a session can be handed to many tokio tasks at once.

mod execute;
mod transfer;

pub use execute::*;
pub use transfer::*;

// crates.io
use reqwest::header::HeaderValue;
// self
use crate::{
	_prelude::*,
	auth::{Credentials, TokenManager},
	config::{PimVersion, SessionConfig},
	error::ConfigError,
	http::HttpClient,
	rate_limit::RateLimiter,
};

/// Authenticated, paced access to one PIM installation.
#[derive(Clone, Debug)]
pub struct Session {
	config: Arc<SessionConfig>,
	http: HttpClient,
	tokens: Arc<TokenManager>,
}
impl Session {
	/// Builds a session with a default reqwest client; the first call authenticates.
	pub fn new(config: SessionConfig, credentials: Credentials) -> Result<Self> {
		let client =
			ReqwestClient::builder().timeout(config.timeout).build().map_err(ConfigError::from)?;

		Self::with_http_client(config, credentials, client)
	}

	/// Builds a session around a caller-provided reqwest client.
	pub fn with_http_client(
		config: SessionConfig,
		credentials: Credentials,
		client: ReqwestClient,
	) -> Result<Self> {
		credentials.validate()?;

		let user_agent = HeaderValue::from_str(&config.user_agent)
			.map_err(|_| ConfigError::InvalidUserAgent { user_agent: config.user_agent.clone() })?;
		let limiter = Arc::new(RateLimiter::new(config.rate_limit));
		let http = HttpClient::new(client, limiter, config.retry, config.timeout, user_agent);
		let endpoint = config.token_endpoint()?;
		let tokens = Arc::new(TokenManager::new(http.clone(), credentials, endpoint));

		Ok(Self { config: Arc::new(config), http, tokens })
	}

	/// Builds a session and performs the password grant before returning it.
	pub async fn connect(config: SessionConfig, credentials: Credentials) -> Result<Self> {
		let session = Self::new(config, credentials)?;

		session.tokens.ensure_valid().await?;

		Ok(session)
	}

	/// Configuration the session was built with.
	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Upstream version selector.
	pub fn version(&self) -> PimVersion {
		self.config.version
	}

	/// Token manager shared by every clone of the session.
	pub fn tokens(&self) -> &Arc<TokenManager> {
		&self.tokens
	}

	/// Rate limiter shared by every clone of the session.
	pub fn limiter(&self) -> &Arc<RateLimiter> {
		self.http.limiter()
	}

	/// Paced HTTP client used for every call.
	pub fn http_client(&self) -> &HttpClient {
		&self.http
	}
}
