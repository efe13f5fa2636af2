//! Transport primitives shared by token grants and API calls.
//!
//! [`HttpClient`] wraps a [`ReqwestClient`] with the session's pacing and 429 policy: every
//! physical attempt first acquires the [`RateLimiter`], carries the session timeout and user
//! agent, and is repeated only when upstream answers `429 Too Many Requests` and the
//! [`RetryPolicy`] budget allows it. Responses are handed back with their [`ResponseMetadata`]
//! so callers decide how to interpret success and failure bodies.

// crates.io
use rand::Rng;
use reqwest::{
	RequestBuilder,
	header::{HeaderMap, HeaderValue, LOCATION, RETRY_AFTER, USER_AGENT},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	obs::{self, OpKind},
	rate_limit::RateLimiter,
};

/// Media type used for JSON negotiation.
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// User agent sent when the configuration does not override it.
pub const DEFAULT_USER_AGENT: &str = concat!("pim-session/", env!("CARGO_PKG_VERSION"));

/// Status, headers, and retry bookkeeping of the final attempt of a call.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code of the final attempt.
	pub status: u16,
	/// Response headers of the final attempt.
	pub headers: HeaderMap,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<StdDuration>,
	/// Physical attempts performed, retries included.
	pub attempts: u32,
}
impl ResponseMetadata {
	/// Returns a header value when present and valid UTF-8.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name)?.to_str().ok()
	}

	/// Returns the `Location` header, which carries the address of created resources.
	pub fn location(&self) -> Option<&str> {
		self.headers.get(LOCATION)?.to_str().ok()
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Retry budget and wait bounds for rate-limited (429) responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
	/// Retries allowed after the first attempt.
	pub max_retries: u32,
	/// Lower bound of every wait.
	pub min_wait: StdDuration,
	/// Upper bound of every wait.
	pub max_wait: StdDuration,
}
impl RetryPolicy {
	/// Fails when the wait bounds are inverted.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.min_wait > self.max_wait {
			return Err(ConfigError::InvalidRetryWait { min: self.min_wait, max: self.max_wait });
		}

		Ok(())
	}

	/// Wait before retry number `retry` (zero-based).
	///
	/// A server hint is clamped into `[min_wait, max_wait]`. Without a hint the ceiling doubles
	/// per retry starting at `min_wait` and the wait is drawn from its upper half.
	pub fn backoff(&self, retry: u32, hint: Option<StdDuration>) -> StdDuration {
		if let Some(hint) = hint {
			return hint.max(self.min_wait).min(self.max_wait);
		}

		let ceiling = self.min_wait.saturating_mul(1 << retry.min(16)).min(self.max_wait);
		let half = ceiling / 2;
		let spread = u64::try_from(half.as_nanos()).unwrap_or(u64::MAX);
		let jitter = StdDuration::from_nanos(rand::rng().random_range(0..=spread));

		(half + jitter).max(self.min_wait).min(self.max_wait)
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			min_wait: StdDuration::from_millis(100),
			max_wait: StdDuration::from_secs(2),
		}
	}
}

/// Final response of a dispatched call.
#[derive(Clone, Debug)]
pub(crate) struct RawResponse {
	pub(crate) metadata: ResponseMetadata,
	pub(crate) body: Vec<u8>,
}

/// Paced, 429-aware wrapper around [`ReqwestClient`].
///
/// Redirects are left to the wrapped client's policy; [`crate::session::Session::new`]
/// builds a client with reqwest's defaults plus the session timeout.
#[derive(Clone, Debug)]
pub struct HttpClient {
	client: ReqwestClient,
	limiter: Arc<RateLimiter>,
	retry: RetryPolicy,
	timeout: StdDuration,
	user_agent: HeaderValue,
}
impl HttpClient {
	/// Combines a reqwest client with the session's limiter and policies.
	pub fn new(
		client: ReqwestClient,
		limiter: Arc<RateLimiter>,
		retry: RetryPolicy,
		timeout: StdDuration,
		user_agent: HeaderValue,
	) -> Self {
		Self { client, limiter, retry, timeout, user_agent }
	}

	/// Underlying reqwest client.
	pub fn client(&self) -> &ReqwestClient {
		&self.client
	}

	/// Limiter consulted before every attempt.
	pub fn limiter(&self) -> &Arc<RateLimiter> {
		&self.limiter
	}

	/// Retry policy applied to 429 responses.
	pub fn retry_policy(&self) -> RetryPolicy {
		self.retry
	}

	/// Sends the request produced by `build`, rebuilding it for every retry.
	pub(crate) async fn dispatch<F>(
		&self,
		op: OpKind,
		build: F,
	) -> Result<RawResponse, TransportError>
	where
		F: Fn(&ReqwestClient) -> RequestBuilder,
	{
		let mut retries = 0;

		loop {
			self.limiter.acquire().await;

			let response = build(&self.client)
				.header(USER_AGENT, self.user_agent.clone())
				.timeout(self.timeout)
				.send()
				.await?;
			let status = response.status();
			let retry_after = parse_retry_after(response.headers());

			if status == StatusCode::TOO_MANY_REQUESTS && retries < self.retry.max_retries {
				let wait = self.retry.backoff(retries, retry_after);

				retries += 1;

				obs::record_retry(op);
				obs::warn_retry(op, retries, wait);

				drop(response);
				tokio::time::sleep(wait).await;

				continue;
			}

			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			return Ok(RawResponse {
				metadata: ResponseMetadata {
					status: status.as_u16(),
					headers,
					retry_after,
					attempts: retries + 1,
				},
				body,
			});
		}
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<StdDuration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(StdDuration::from_secs(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return StdDuration::try_from(delta).ok();
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn policy() -> RetryPolicy {
		RetryPolicy {
			max_retries: 5,
			min_wait: StdDuration::from_millis(100),
			max_wait: StdDuration::from_secs(1),
		}
	}

	#[test]
	fn backoff_stays_within_bounds() {
		let policy = policy();

		for retry in 0..40 {
			let wait = policy.backoff(retry, None);

			assert!(wait >= policy.min_wait, "retry {retry} waited {wait:?}");
			assert!(wait <= policy.max_wait, "retry {retry} waited {wait:?}");
		}
	}

	#[test]
	fn backoff_ceiling_grows_per_retry() {
		let policy = policy();

		// Retry 3 has a ceiling of 800ms, so the wait is drawn from [400ms, 800ms].
		for _ in 0..20 {
			let wait = policy.backoff(3, None);

			assert!(wait >= StdDuration::from_millis(400));
			assert!(wait <= StdDuration::from_millis(800));
		}
	}

	#[test]
	fn retry_after_hint_is_clamped() {
		let policy = policy();

		assert_eq!(policy.backoff(0, Some(StdDuration::from_secs(30))), policy.max_wait);
		assert_eq!(policy.backoff(0, Some(StdDuration::ZERO)), policy.min_wait);
		assert_eq!(
			policy.backoff(0, Some(StdDuration::from_millis(250))),
			StdDuration::from_millis(250)
		);
	}

	#[test]
	fn inverted_wait_bounds_are_rejected() {
		let policy = RetryPolicy {
			max_retries: 1,
			min_wait: StdDuration::from_secs(2),
			max_wait: StdDuration::from_secs(1),
		};

		assert!(matches!(policy.validate(), Err(ConfigError::InvalidRetryWait { .. })));
		assert!(RetryPolicy::default().validate().is_ok());
	}

	#[test]
	fn retry_after_parses_seconds_and_ignores_garbage() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));

		assert_eq!(parse_retry_after(&headers), Some(StdDuration::from_secs(7)));

		headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));

		assert_eq!(parse_retry_after(&headers), None);
	}

	#[test]
	fn metadata_exposes_location() {
		let mut headers = HeaderMap::new();

		headers.insert(
			LOCATION,
			HeaderValue::from_static("https://pim.test/api/rest/v1/media-files/a"),
		);

		let metadata = ResponseMetadata { status: 201, headers, retry_after: None, attempts: 1 };

		assert!(metadata.is_success());
		assert_eq!(metadata.location(), Some("https://pim.test/api/rest/v1/media-files/a"));
		assert_eq!(metadata.header("location"), metadata.location());
	}
}
