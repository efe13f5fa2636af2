//! Token endpoint counters kept by every [`super::TokenManager`].
//!
//! One exchange is one logical grant request. The 429 retries inside an exchange are
//! counted by the request layer, not here.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::oauth::GrantType;

/// Point-in-time counts for one grant type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GrantCounts {
	/// Exchanges sent to the token endpoint.
	pub attempts: u64,
	/// Exchanges that produced a complete token pair.
	pub successes: u64,
	/// Exchanges rejected upstream, malformed, or lost in transport.
	pub failures: u64,
}

#[derive(Debug, Default)]
struct GrantCounters {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
}
impl GrantCounters {
	fn snapshot(&self) -> GrantCounts {
		GrantCounts {
			attempts: self.attempts.load(Ordering::Relaxed),
			successes: self.successes.load(Ordering::Relaxed),
			failures: self.failures.load(Ordering::Relaxed),
		}
	}
}

/// Grant exchange counters, split by grant type.
///
/// A stale session whose refresh is rejected performs two exchanges: the failed refresh
/// and the password grant that replaces it. Both count as attempts, and the replacement is
/// also counted in [`GrantMetrics::fallbacks`].
#[derive(Debug, Default)]
pub struct GrantMetrics {
	password: GrantCounters,
	refresh: GrantCounters,
	fallbacks: AtomicU64,
}
impl GrantMetrics {
	/// Exchanges of either grant type, fallback password grants included.
	pub fn attempts(&self) -> u64 {
		self.password().attempts + self.refresh().attempts
	}

	/// Exchanges of either grant type that stored a new token pair.
	pub fn successes(&self) -> u64 {
		self.password().successes + self.refresh().successes
	}

	/// Failed exchanges of either grant type, including refreshes later rescued by a fallback.
	pub fn failures(&self) -> u64 {
		self.password().failures + self.refresh().failures
	}

	/// Password grant counts, initial logins and fallbacks alike.
	pub fn password(&self) -> GrantCounts {
		self.password.snapshot()
	}

	/// Refresh grant counts.
	pub fn refresh(&self) -> GrantCounts {
		self.refresh.snapshot()
	}

	/// Failed refreshes that were followed by a password grant.
	pub fn fallbacks(&self) -> u64 {
		self.fallbacks.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self, grant: GrantType) {
		self.counters(grant).attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self, grant: GrantType) {
		self.counters(grant).successes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self, grant: GrantType) {
		self.counters(grant).failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fallback(&self) {
		self.fallbacks.fetch_add(1, Ordering::Relaxed);
	}

	fn counters(&self, grant: GrantType) -> &GrantCounters {
		match grant {
			GrantType::Password => &self.password,
			GrantType::RefreshToken => &self.refresh,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn totals_sum_both_grant_types() {
		let metrics = GrantMetrics::default();

		metrics.record_attempt(GrantType::Password);
		metrics.record_success(GrantType::Password);
		metrics.record_attempt(GrantType::RefreshToken);
		metrics.record_failure(GrantType::RefreshToken);
		metrics.record_fallback();
		metrics.record_attempt(GrantType::Password);
		metrics.record_success(GrantType::Password);

		assert_eq!(metrics.attempts(), 3);
		assert_eq!(metrics.successes(), 2);
		assert_eq!(metrics.failures(), 1);
		assert_eq!(metrics.fallbacks(), 1);
		assert_eq!(metrics.password(), GrantCounts { attempts: 2, successes: 2, failures: 0 });
		assert_eq!(metrics.refresh(), GrantCounts { attempts: 1, successes: 0, failures: 1 });
	}
}
