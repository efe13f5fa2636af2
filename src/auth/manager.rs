//! Token lifecycle management with a single-flight renewal section.
//!
//! [`TokenManager::ensure_valid`] is the only entry point request paths use. The freshness
//! check, the upstream exchange, and the state update all run under one async mutex, so a
//! burst of callers holding a stale session triggers exactly one exchange. Callers that
//! queued behind that exchange compare a renewal epoch captured before waiting: if a renewal
//! completed in the meantime they adopt its outcome, success or failure, instead of sending
//! another grant.

mod metrics;

pub use metrics::{GrantCounts, GrantMetrics};

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Secret, TokenRecord},
	error::AuthError,
	http::HttpClient,
	obs,
	oauth::{self, GrantRequest},
};

/// Owns the session's token pair and serializes every grant.
#[derive(Debug)]
pub struct TokenManager {
	http: HttpClient,
	credentials: Credentials,
	endpoint: Url,
	state: RwLock<Option<TokenRecord>>,
	guard: AsyncMutex<()>,
	epoch: AtomicU64,
	last_failure: Mutex<Option<AuthError>>,
	metrics: GrantMetrics,
}
impl TokenManager {
	/// Creates an unauthenticated manager that exchanges grants at `endpoint`.
	pub fn new(http: HttpClient, credentials: Credentials, endpoint: Url) -> Self {
		Self {
			http,
			credentials,
			endpoint,
			state: RwLock::new(None),
			guard: AsyncMutex::new(()),
			epoch: AtomicU64::new(0),
			last_failure: Mutex::new(None),
			metrics: GrantMetrics::default(),
		}
	}

	/// Token endpoint the manager talks to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Exchange counters.
	pub fn metrics(&self) -> &GrantMetrics {
		&self.metrics
	}

	/// Returns a copy of the current token pair, if any.
	pub fn snapshot(&self) -> Option<TokenRecord> {
		self.state.read().clone()
	}

	/// Returns `true` once a grant succeeded.
	pub fn is_authenticated(&self) -> bool {
		self.state.read().is_some()
	}

	/// Returns `true` when the session is unauthenticated or within the refresh margin.
	pub fn needs_refresh(&self) -> bool {
		self.needs_refresh_at(OffsetDateTime::now_utc())
	}

	/// Same as [`Self::needs_refresh`] for an explicit instant.
	pub fn needs_refresh_at(&self, instant: OffsetDateTime) -> bool {
		self.state.read().as_ref().is_none_or(|record| record.needs_refresh_at(instant))
	}

	/// Performs the password grant and replaces the current token pair.
	pub async fn grant_by_credentials(&self) -> Result<TokenRecord, AuthError> {
		let _singleflight = self.guard.lock().await;
		let result = self.password_grant().await;

		self.settle(result)
	}

	/// Exchanges the held refresh token for a new pair.
	pub async fn grant_by_refresh_token(&self) -> Result<TokenRecord, AuthError> {
		let _singleflight = self.guard.lock().await;
		let Some(current) = self.snapshot() else {
			return Err(AuthError::MissingRefreshToken);
		};
		let result = self.refresh_grant(&current).await;

		self.settle(result)
	}

	/// Returns an access token that is outside the refresh margin, renewing it if needed.
	///
	/// Unauthenticated sessions perform the password grant. Stale sessions try the refresh
	/// grant first and fall back to one password grant when it fails.
	pub async fn ensure_valid(&self) -> Result<Secret, AuthError> {
		let observed = self.epoch.load(Ordering::Acquire);

		if let Some(token) = self.fresh_token() {
			return Ok(token);
		}

		let _singleflight = self.guard.lock().await;

		if let Some(token) = self.fresh_token() {
			return Ok(token);
		}
		if self.epoch.load(Ordering::Acquire) != observed {
			if let Some(err) = self.last_failure.lock().clone() {
				return Err(err);
			}
			if let Some(token) = self.unexpired_token() {
				return Ok(token);
			}
		}

		let result = match self.snapshot() {
			Some(current) => match self.refresh_grant(&current).await {
				Ok(record) => Ok(record),
				Err(err) => {
					obs::warn_refresh_fallback(&err);
					self.metrics.record_fallback();

					self.password_grant().await
				},
			},
			None => self.password_grant().await,
		};

		self.settle(result).map(|record| record.access_token)
	}

	fn fresh_token(&self) -> Option<Secret> {
		let now = OffsetDateTime::now_utc();

		self.state
			.read()
			.as_ref()
			.filter(|record| !record.needs_refresh_at(now))
			.map(|record| record.access_token.clone())
	}

	fn unexpired_token(&self) -> Option<Secret> {
		let now = OffsetDateTime::now_utc();

		self.state
			.read()
			.as_ref()
			.filter(|record| !record.is_expired_at(now))
			.map(|record| record.access_token.clone())
	}

	async fn password_grant(&self) -> Result<TokenRecord, AuthError> {
		let request = GrantRequest::Password {
			username: &self.credentials.username,
			password: self.credentials.password.expose(),
		};

		self.exchange(request).await
	}

	async fn refresh_grant(&self, current: &TokenRecord) -> Result<TokenRecord, AuthError> {
		let request = GrantRequest::RefreshToken { refresh_token: current.refresh_token.expose() };

		self.exchange(request).await
	}

	async fn exchange(&self, request: GrantRequest<'_>) -> Result<TokenRecord, AuthError> {
		let grant = request.grant_type();

		self.metrics.record_attempt(grant);

		let result = oauth::exchange(&self.http, &self.endpoint, &self.credentials, request).await;

		match &result {
			Ok(_) => self.metrics.record_success(grant),
			Err(_) => self.metrics.record_failure(grant),
		}

		result
	}

	// Must run while holding `guard`.
	fn settle(&self, result: Result<TokenRecord, AuthError>) -> Result<TokenRecord, AuthError> {
		match &result {
			Ok(record) => {
				*self.state.write() = Some(record.clone());
				*self.last_failure.lock() = None;
			},
			Err(err) => *self.last_failure.lock() = Some(err.clone()),
		}

		self.epoch.fetch_add(1, Ordering::AcqRel);

		result
	}
}
