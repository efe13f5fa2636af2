//! Evenly spaced request gate shared by every call of a session.
//!
//! The limiter hands out dispatch slots `period / events` apart. Slots are reserved under a
//! short lock in arrival order and awaited outside of it, so idle time never turns into
//! burst credit.

// crates.io
use tokio::time::{self, Instant};
// self
use crate::{_prelude::*, error::ConfigError};

/// Number of request starts permitted per period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
	/// Events allowed per `period`.
	pub events: u32,
	/// Window the events are spread across.
	pub period: StdDuration,
}
impl RateLimit {
	/// Creates a new rate of `events` per `period`.
	pub const fn new(events: u32, period: StdDuration) -> Self {
		Self { events, period }
	}

	/// Fails when the rate allows nothing or uses a zero period.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.events == 0 || self.period.is_zero() {
			return Err(ConfigError::InvalidRateLimit);
		}

		Ok(())
	}

	/// Minimum spacing between two consecutive slots.
	pub fn interval(&self) -> StdDuration {
		self.period.checked_div(self.events).unwrap_or(self.period)
	}
}
impl Default for RateLimit {
	fn default() -> Self {
		Self::new(5, StdDuration::from_secs(1))
	}
}

/// Gate that spaces request starts evenly.
#[derive(Debug)]
pub struct RateLimiter {
	interval: StdDuration,
	next_slot: Mutex<Option<Instant>>,
}
impl RateLimiter {
	/// Creates a limiter for the provided rate.
	pub fn new(rate: RateLimit) -> Self {
		Self { interval: rate.interval(), next_slot: Mutex::new(None) }
	}

	/// Spacing enforced between slots.
	pub fn interval(&self) -> StdDuration {
		self.interval
	}

	/// Waits until the next permitted slot.
	pub async fn acquire(&self) {
		let slot = self.reserve();

		if slot > Instant::now() {
			time::sleep_until(slot).await;
		}
	}

	fn reserve(&self) -> Instant {
		let mut next = self.next_slot.lock();
		let now = Instant::now();
		let slot = match *next {
			Some(at) if at > now => at,
			_ => now,
		};

		*next = Some(slot + self.interval);

		slot
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn interval_splits_period_evenly() {
		assert_eq!(RateLimit::default().interval(), StdDuration::from_millis(200));
		assert_eq!(
			RateLimit::new(4, StdDuration::from_secs(2)).interval(),
			StdDuration::from_millis(500)
		);
	}

	#[test]
	fn empty_rates_are_rejected() {
		assert!(RateLimit::new(0, StdDuration::from_secs(1)).validate().is_err());
		assert!(RateLimit::new(1, StdDuration::ZERO).validate().is_err());
		assert!(RateLimit::default().validate().is_ok());
	}

	#[tokio::test(start_paused = true)]
	async fn sequential_acquires_are_spaced() {
		let limiter = RateLimiter::new(RateLimit::default());
		let started = Instant::now();

		for _ in 0..6 {
			limiter.acquire().await;
		}

		assert!(started.elapsed() >= StdDuration::from_secs(1));
	}

	#[tokio::test(start_paused = true)]
	async fn concurrent_acquires_receive_distinct_slots() {
		let limiter = Arc::new(RateLimiter::new(RateLimit::new(10, StdDuration::from_secs(1))));
		let started = Instant::now();
		let tasks = (0..5)
			.map(|_| {
				let limiter = limiter.clone();

				tokio::spawn(async move {
					limiter.acquire().await;

					Instant::now()
				})
			})
			.collect::<Vec<_>>();
		let mut finished = Vec::new();

		for task in tasks {
			finished.push(task.await.expect("Acquire task should not panic."));
		}

		finished.sort();

		for pair in finished.windows(2) {
			assert!(pair[1] - pair[0] >= StdDuration::from_millis(100));
		}
		assert!(started.elapsed() >= StdDuration::from_millis(400));
	}

	#[tokio::test(start_paused = true)]
	async fn idle_time_grants_no_burst() {
		let limiter = RateLimiter::new(RateLimit::default());

		limiter.acquire().await;
		time::sleep(StdDuration::from_secs(10)).await;

		let started = Instant::now();

		limiter.acquire().await;
		limiter.acquire().await;

		assert!(started.elapsed() >= StdDuration::from_millis(200));
	}
}
