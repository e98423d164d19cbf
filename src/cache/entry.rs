//! Cached payload with expiry bookkeeping.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::_prelude::*;

/// One cached response body, owned exclusively by the cache.
#[derive(Debug)]
pub struct CacheEntry {
	payload: Arc<[u8]>,
	/// Instant the entry was written.
	pub created_at: OffsetDateTime,
	/// Instant after which the entry counts as a miss.
	pub expires_at: OffsetDateTime,
	access_count: AtomicU64,
}
impl CacheEntry {
	/// Copies `bytes` into a fresh entry living for `ttl` from `now`.
	pub fn new(bytes: &[u8], ttl: Duration, now: OffsetDateTime) -> Self {
		Self {
			payload: Arc::from(bytes),
			created_at: now,
			expires_at: now.saturating_add(ttl),
			access_count: AtomicU64::new(0),
		}
	}

	/// Shared handle to the stored payload.
	pub fn payload(&self) -> Arc<[u8]> {
		self.payload.clone()
	}

	/// Payload size in bytes.
	pub fn len(&self) -> usize {
		self.payload.len()
	}

	/// Whether the payload is empty.
	pub fn is_empty(&self) -> bool {
		self.payload.is_empty()
	}

	/// Whether the entry has expired at `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at
	}

	/// Number of cache hits served from this entry.
	pub fn access_count(&self) -> u64 {
		self.access_count.load(Ordering::Relaxed)
	}

	// Hits only hold the shared lock, so the counter is atomic.
	pub(crate) fn record_hit(&self) {
		self.access_count.fetch_add(1, Ordering::Relaxed);
	}
}
