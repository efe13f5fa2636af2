//! Session token state and freshness checks.

// self
use crate::{_prelude::*, auth::Secret};

/// Safety margin subtracted from the expiry instant when deciding whether a token is stale.
pub const REFRESH_MARGIN: Duration = Duration::minutes(5);

/// Access and refresh token pair issued by the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRecord {
	/// Bearer token attached to API calls; callers must avoid logging it.
	pub access_token: Secret,
	/// Refresh token exchanged for the next pair.
	pub refresh_token: Secret,
	/// Instant the grant completed.
	pub issued_at: OffsetDateTime,
	/// `issued_at` plus the server-reported lifetime.
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Creates a record whose expiry is `issued_at + expires_in`.
	pub fn new(
		access_token: impl Into<Secret>,
		refresh_token: impl Into<Secret>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Self {
		Self {
			access_token: access_token.into(),
			refresh_token: refresh_token.into(),
			issued_at,
			expires_at: issued_at + expires_in,
		}
	}

	/// Returns `true` when `instant + REFRESH_MARGIN` reaches the expiry.
	pub fn needs_refresh_at(&self, instant: OffsetDateTime) -> bool {
		instant + REFRESH_MARGIN >= self.expires_at
	}

	/// Checks [`Self::needs_refresh_at`] against the current UTC instant.
	pub fn needs_refresh(&self) -> bool {
		self.needs_refresh_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the access token is past its expiry at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Remaining lifetime at the provided instant, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		(self.expires_at - instant).max(Duration::ZERO)
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
