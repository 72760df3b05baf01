// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for credential lifecycle outcomes.
#[derive(Debug, Default)]
pub struct AuthorityMetrics {
	cache_hits: AtomicU64,
	refreshes: AtomicU64,
	exchanges: AtomicU64,
	failures: AtomicU64,
}
impl AuthorityMetrics {
	/// Returns how many token requests were served from the cached credential.
	pub fn cache_hits(&self) -> u64 {
		self.cache_hits.load(Ordering::Relaxed)
	}

	/// Returns the number of completed refresh exchanges.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	/// Returns the number of completed code/app-token exchanges.
	pub fn exchanges(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	/// Returns the number of failed lifecycle operations.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_cache_hit(&self) {
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_refresh(&self) {
		self.refreshes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_exchange(&self) {
		self.exchanges.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
