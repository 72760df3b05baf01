//! Rate-limit-aware request execution shared by every document operation.
//!
//! The upstream service caps throughput at 5 requests per second per app and
//! signals the overflow with vendor code `99991400` riding on an HTTP 400, not a
//! 429. [`RateLimitedTransport`] recognizes the code, sleeps through a jittered
//! exponential backoff, and retries the identical request up to the policy bound.
//! Every other failure passes through untouched; callers decide what is safe to
//! retry. Backoff state is local to each call, so concurrent operations never
//! contend on a shared limiter.

// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	http::{ApiRequest, ApiResponse, ApiTransport},
};

/// Vendor error code signaling the per-app rate limit was exceeded.
pub const RATE_LIMIT_CODE: i64 = 99991400;

/// Returns `true` when the response carries the vendor rate-limit code.
///
/// The HTTP status alone is not consulted: ordinary validation failures share the
/// 400 status with the throttling signal.
pub fn is_rate_limited(response: &ApiResponse) -> bool {
	if response.is_success() {
		return false;
	}

	crate::http::probe_vendor_code(response) == Some(RATE_LIMIT_CODE)
}

/// Bounded exponential backoff configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// First delay; doubles on every subsequent attempt.
	pub base_delay: Duration,
	/// Cap applied to the exponential component.
	pub max_delay: Duration,
	/// Maximum number of retries after the initial attempt.
	pub max_retries: u32,
}
impl RetryPolicy {
	/// Computes the delay before retry number `attempt` (zero-based).
	///
	/// The exponential component is capped at `max_delay`; the added jitter stays
	/// below `base_delay` so consecutive delays never decrease until the cap.
	pub fn delay_for(&self, attempt: u32, rng: &mut impl Rng) -> Duration {
		let exponential = self
			.base_delay
			.checked_mul(2_i32.saturating_pow(attempt.min(16)))
			.unwrap_or(self.max_delay)
			.min(self.max_delay);
		let jitter_cap = self.base_delay.whole_milliseconds().max(1) as u64;
		let jitter = Duration::milliseconds(rng.random_range(0..jitter_cap) as i64);

		exponential + jitter
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			base_delay: Duration::milliseconds(200),
			max_delay: Duration::seconds(5),
			max_retries: 5,
		}
	}
}

/// Transport decorator that absorbs the upstream rate limit.
#[derive(Clone)]
pub struct RateLimitedTransport {
	inner: Arc<dyn ApiTransport>,
	policy: RetryPolicy,
}
impl RateLimitedTransport {
	/// Wraps a raw transport with the provided retry policy.
	pub fn new(inner: Arc<dyn ApiTransport>, policy: RetryPolicy) -> Self {
		Self { inner, policy }
	}

	/// Returns the wrapped raw transport.
	pub fn inner(&self) -> &Arc<dyn ApiTransport> {
		&self.inner
	}

	/// Returns the active retry policy.
	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	/// Executes the request, retrying through the backoff schedule while the
	/// upstream reports the rate-limit code.
	///
	/// Exhausting the schedule surfaces [`Error::RateLimitExceeded`] with the retry
	/// count and the final response body. Non-throttled responses are returned as-is
	/// regardless of status; callers classify them.
	pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
		let mut attempt = 0_u32;

		loop {
			let response = self.inner.execute(request.clone()).await?;

			if !is_rate_limited(&response) {
				return Ok(response);
			}
			if attempt >= self.policy.max_retries {
				return Err(Error::RateLimitExceeded {
					retries: attempt,
					last_body: response.body_preview(),
				});
			}

			let delay = self.policy.delay_for(attempt, &mut rand::rng());

			tokio::time::sleep(std::time::Duration::from_millis(
				delay.whole_milliseconds().max(0) as u64,
			))
			.await;

			attempt += 1;
		}
	}
}
impl Debug for RateLimitedTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimitedTransport").field("policy", &self.policy).finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use rand::{SeedableRng, rngs::StdRng};
	// self
	use super::*;

	#[test]
	fn detection_requires_the_vendor_code() {
		let throttled = ApiResponse {
			status: 400,
			body: br#"{"code":99991400,"msg":"too many requests"}"#.to_vec(),
		};
		let validation =
			ApiResponse { status: 400, body: br#"{"code":1254005,"msg":"bad id"}"#.to_vec() };
		let success = ApiResponse { status: 200, body: br#"{"code":0,"msg":"ok"}"#.to_vec() };
		let garbage = ApiResponse { status: 400, body: b"not json".to_vec() };

		assert!(is_rate_limited(&throttled));
		assert!(!is_rate_limited(&validation));
		assert!(!is_rate_limited(&success));
		assert!(!is_rate_limited(&garbage));
	}

	#[test]
	fn delays_never_decrease_below_the_cap() {
		let policy = RetryPolicy::default();
		let mut rng = StdRng::seed_from_u64(7);
		let delays: Vec<Duration> =
			(0..policy.max_retries).map(|attempt| policy.delay_for(attempt, &mut rng)).collect();

		for pair in delays.windows(2) {
			assert!(pair[1] >= pair[0], "Backoff schedule regressed: {delays:?}.");
		}
	}

	#[test]
	fn exponential_component_is_capped() {
		let policy = RetryPolicy {
			base_delay: Duration::milliseconds(200),
			max_delay: Duration::seconds(1),
			max_retries: 8,
		};
		let mut rng = StdRng::seed_from_u64(42);
		let delay = policy.delay_for(30, &mut rng);

		assert!(delay <= policy.max_delay + policy.base_delay);
	}
}
