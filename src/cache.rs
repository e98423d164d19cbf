//! Bounded, TTL-expiring response cache keyed by endpoint + sorted query parameters.
//!
//! Reads take the shared side of the lock and never block each other; writes, evictions,
//! and cleanup take the exclusive side. Expired entries are treated as misses by reads but
//! only removed by [`ResponseCache::cleanup`], which the embedding application schedules.
//!
//! When full, the cache evicts the entry with the lowest access count (first found on
//! ties). This favors entries that were never re-read; it is not recency-based LRU.

pub mod entry;

pub use entry::CacheEntry;

// self
use crate::{_prelude::*, error::ErrorCode, oauth::percent_encode};

/// Cache settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
	/// Whether GET responses are cached at all.
	pub enabled: bool,
	/// Maximum number of entries.
	pub max_size: usize,
	/// TTL applied by [`ResponseCache::put`], in seconds.
	pub default_ttl_secs: u64,
}
impl Default for CacheConfig {
	fn default() -> Self {
		Self { enabled: true, max_size: 1_000, default_ttl_secs: 300 }
	}
}

/// Error raised when a payload cannot be stored.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CacheError {
	/// Capacity leaves no room, even after eviction.
	#[error("Cache cannot hold any entry (max_size = {max_size}).")]
	Full {
		/// Configured capacity.
		max_size: usize,
	},
}
impl CacheError {
	/// Machine code for this failure.
	pub fn code(&self) -> ErrorCode {
		match self {
			Self::Full { .. } => ErrorCode::CacheFull,
		}
	}
}

/// Point-in-time cache statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
	/// Entries currently stored, expired or not.
	pub total_entries: usize,
	/// Stored entries whose TTL has elapsed.
	pub expired_entries: usize,
	/// Sum of payload sizes.
	pub total_bytes: usize,
	/// Sum of access counters.
	pub total_access_count: u64,
}

/// Thread-safe TTL cache for response bodies.
#[derive(Debug)]
pub struct ResponseCache {
	max_size: usize,
	default_ttl: Duration,
	entries: RwLock<HashMap<String, CacheEntry>>,
}
impl ResponseCache {
	/// Creates an empty cache.
	pub fn new(max_size: usize, default_ttl: Duration) -> Self {
		Self { max_size, default_ttl, entries: Default::default() }
	}

	/// Creates an empty cache from [`CacheConfig`].
	pub fn from_config(config: &CacheConfig) -> Self {
		let ttl = Duration::seconds(i64::try_from(config.default_ttl_secs).unwrap_or(i64::MAX));

		Self::new(config.max_size, ttl)
	}

	/// Maximum number of entries.
	pub fn max_size(&self) -> usize {
		self.max_size
	}

	/// TTL applied by [`ResponseCache::put`].
	pub fn default_ttl(&self) -> Duration {
		self.default_ttl
	}

	/// Stores a copy of `bytes` under `key` with the default TTL.
	pub fn put(&self, key: impl Into<String>, bytes: &[u8]) -> Result<(), CacheError> {
		self.put_at(key, bytes, self.default_ttl, OffsetDateTime::now_utc())
	}

	/// Stores a copy of `bytes` under `key` with an explicit TTL.
	pub fn put_with_ttl(
		&self,
		key: impl Into<String>,
		bytes: &[u8],
		ttl: Duration,
	) -> Result<(), CacheError> {
		self.put_at(key, bytes, ttl, OffsetDateTime::now_utc())
	}

	/// Stores a copy of `bytes` as written at `now`.
	///
	/// An existing entry under `key` is replaced. Otherwise, a full cache evicts one entry
	/// before inserting.
	pub fn put_at(
		&self,
		key: impl Into<String>,
		bytes: &[u8],
		ttl: Duration,
		now: OffsetDateTime,
	) -> Result<(), CacheError> {
		if self.max_size == 0 {
			return Err(CacheError::Full { max_size: 0 });
		}

		let key = key.into();
		let entry = CacheEntry::new(bytes, ttl, now);
		let mut entries = self.entries.write();

		if entries.remove(&key).is_none() && entries.len() >= self.max_size {
			evict_one(&mut entries);
		}

		entries.insert(key, entry);

		Ok(())
	}

	/// Returns the payload under `key` if present and unexpired, counting the hit.
	pub fn get(&self, key: &str) -> Option<Arc<[u8]>> {
		self.get_at(key, OffsetDateTime::now_utc())
	}

	/// [`ResponseCache::get`] observed at `now`.
	pub fn get_at(&self, key: &str, now: OffsetDateTime) -> Option<Arc<[u8]>> {
		let entries = self.entries.read();
		let entry = entries.get(key).filter(|entry| !entry.is_expired_at(now))?;

		entry.record_hit();

		Some(entry.payload())
	}

	/// Removes `key`; returns whether it was present.
	pub fn remove(&self, key: &str) -> bool {
		self.entries.write().remove(key).is_some()
	}

	/// Removes every entry.
	pub fn clear(&self) {
		self.entries.write().clear();
	}

	/// Number of stored entries, including expired ones awaiting cleanup.
	pub fn size(&self) -> usize {
		self.entries.read().len()
	}

	/// Whether the cache holds no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Removes every expired entry and returns how many were removed.
	pub fn cleanup(&self) -> usize {
		self.cleanup_at(OffsetDateTime::now_utc())
	}

	/// [`ResponseCache::cleanup`] observed at `now`.
	pub fn cleanup_at(&self, now: OffsetDateTime) -> usize {
		let mut entries = self.entries.write();
		let before = entries.len();

		entries.retain(|_, entry| !entry.is_expired_at(now));

		before - entries.len()
	}

	/// Current statistics.
	pub fn stats(&self) -> CacheStats {
		self.stats_at(OffsetDateTime::now_utc())
	}

	/// [`ResponseCache::stats`] observed at `now`.
	pub fn stats_at(&self, now: OffsetDateTime) -> CacheStats {
		let entries = self.entries.read();

		entries.values().fold(
			CacheStats { total_entries: entries.len(), ..Default::default() },
			|mut stats, entry| {
				if entry.is_expired_at(now) {
					stats.expired_entries += 1;
				}

				stats.total_bytes += entry.len();
				stats.total_access_count += entry.access_count();

				stats
			},
		)
	}
}

/// Builds the cache key: `endpoint` followed by `&key=value` for each parameter, sorted by
/// key then value so insertion order never matters.
///
/// Keys and values are percent-encoded (RFC 3986) so a value containing `&` or `=` cannot
/// alias a different parameter set.
pub fn cache_key(endpoint: &str, params: &[(String, String)]) -> String {
	let mut encoded =
		params.iter().map(|(k, v)| (percent_encode(k), percent_encode(v))).collect::<Vec<_>>();

	encoded.sort();

	let mut key = endpoint.to_owned();

	for (k, v) in encoded {
		key.push('&');
		key.push_str(&k);
		key.push('=');
		key.push_str(&v);
	}

	key
}

fn evict_one(entries: &mut HashMap<String, CacheEntry>) {
	let victim = entries
		.iter()
		.min_by_key(|(_, entry)| entry.access_count())
		.map(|(key, _)| key.clone());

	if let Some(key) = victim {
		entries.remove(&key);
	}
}
