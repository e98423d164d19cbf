//! Token-bucket rate limiting, one bucket per endpoint class.
//!
//! Buckets hold a fractional token count that refills continuously from elapsed wall-clock
//! time; there is no background ticker. Each operation that observes the bucket refills it
//! first, under the same lock that guards consumption, so `0 <= tokens <= capacity` holds at
//! every observation point. Every time-dependent method has an `*_at` twin taking an explicit
//! [`Instant`] so callers (and tests) can simulate elapsed time.

// std
use std::time::{Duration as StdDuration, Instant};
// self
use crate::{
	_prelude::*,
	error::{ApiError, ConfigError, ErrorCode},
};

/// Poll interval used while waiting for a token.
pub const POLL_INTERVAL: StdDuration = StdDuration::from_millis(100);

/// Logical endpoint classes with independent budgets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointClass {
	/// Main API surface.
	Api,
	/// OAuth token endpoint.
	Auth,
	/// Low-traffic metadata endpoints.
	Metadata,
}
impl EndpointClass {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Api => "api",
			Self::Auth => "auth",
			Self::Metadata => "metadata",
		}
	}
}
impl Display for EndpointClass {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Capacity and refill rate for a single bucket.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BucketConfig {
	/// Maximum number of tokens the bucket holds.
	pub capacity: f64,
	/// Tokens added per second.
	pub refill_per_sec: f64,
}
impl BucketConfig {
	/// Creates a bucket configuration.
	pub const fn new(capacity: f64, refill_per_sec: f64) -> Self {
		Self { capacity, refill_per_sec }
	}

	fn validate(self, class: EndpointClass) -> Result<Self, ConfigError> {
		let positive = |v: f64| v.is_finite() && v > 0.;

		// A bucket capped below one whole token could never grant a call.
		if positive(self.capacity) && self.capacity >= 1. && positive(self.refill_per_sec) {
			Ok(self)
		} else {
			Err(ConfigError::InvalidBucket { class: class.as_str() })
		}
	}
}

#[derive(Debug)]
struct BucketState {
	tokens: f64,
	last_refill: Instant,
}
impl BucketState {
	fn refill(&mut self, config: &BucketConfig, now: Instant) {
		if now <= self.last_refill {
			return;
		}

		let elapsed = now.duration_since(self.last_refill).as_secs_f64();

		self.tokens = (self.tokens + elapsed * config.refill_per_sec).min(config.capacity);
		self.last_refill = now;
	}
}

/// Continuously refilled token bucket with fractional tokens.
#[derive(Debug)]
pub struct TokenBucket {
	config: BucketConfig,
	state: Mutex<BucketState>,
}
impl TokenBucket {
	/// Creates a full bucket. Capacity and refill rate must be positive and finite.
	pub fn new(config: BucketConfig) -> Result<Self, ConfigError> {
		Self::for_class(EndpointClass::Api, config)
	}

	fn for_class(class: EndpointClass, config: BucketConfig) -> Result<Self, ConfigError> {
		let config = config.validate(class)?;
		let state = BucketState { tokens: config.capacity, last_refill: Instant::now() };

		Ok(Self { config, state: Mutex::new(state) })
	}

	/// Bucket configuration.
	pub fn config(&self) -> BucketConfig {
		self.config
	}

	/// Takes one token if available.
	pub fn try_acquire(&self) -> bool {
		self.try_acquire_at(Instant::now())
	}

	/// [`TokenBucket::try_acquire`] observed at `now`.
	pub fn try_acquire_at(&self, now: Instant) -> bool {
		let mut state = self.state.lock();

		state.refill(&self.config, now);

		if state.tokens >= 1. {
			state.tokens -= 1.;

			true
		} else {
			false
		}
	}

	/// Time until one whole token is available, rounded up to the millisecond.
	pub fn time_until_next_token(&self) -> StdDuration {
		self.time_until_next_token_at(Instant::now())
	}

	/// [`TokenBucket::time_until_next_token`] observed at `now`.
	pub fn time_until_next_token_at(&self, now: Instant) -> StdDuration {
		let mut state = self.state.lock();

		state.refill(&self.config, now);

		if state.tokens >= 1. {
			return StdDuration::ZERO;
		}

		// Round to whole microseconds first so float noise cannot bump the ceiling.
		let micros = ((1. - state.tokens) / self.config.refill_per_sec * 1_000_000.).round();

		StdDuration::from_millis((micros / 1_000.).ceil() as u64)
	}

	/// Waits, polling every [`POLL_INTERVAL`] at most, until a token is taken.
	pub async fn acquire(&self) {
		loop {
			if self.try_acquire() {
				return;
			}

			let wait = self.time_until_next_token().clamp(StdDuration::from_millis(1), POLL_INTERVAL);

			tokio::time::sleep(wait).await;
		}
	}

	/// Refills the bucket to capacity.
	pub fn reset(&self) {
		self.reset_at(Instant::now());
	}

	/// [`TokenBucket::reset`] observed at `now`.
	pub fn reset_at(&self, now: Instant) {
		let mut state = self.state.lock();

		state.tokens = self.config.capacity;
		state.last_refill = now;
	}

	/// Tokens currently available (fractional).
	pub fn available(&self) -> f64 {
		self.available_at(Instant::now())
	}

	/// [`TokenBucket::available`] observed at `now`.
	pub fn available_at(&self, now: Instant) -> f64 {
		let mut state = self.state.lock();

		state.refill(&self.config, now);

		state.tokens
	}
}

/// Routes endpoints whose path starts with `prefix` to `class`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
	/// Endpoint path prefix, e.g. `/oauth`.
	pub prefix: String,
	/// Class the matching endpoints belong to.
	pub class: EndpointClass,
}
impl RouteRule {
	/// Creates a routing rule.
	pub fn new(prefix: impl Into<String>, class: EndpointClass) -> Self {
		Self { prefix: prefix.into(), class }
	}
}

/// Budgets for every endpoint class plus the prefix routes selecting between them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
	/// Ordered routes; the first matching prefix wins, unmatched paths use [`EndpointClass::Api`].
	pub routes: Vec<RouteRule>,
	/// Main API bucket.
	pub api: BucketConfig,
	/// OAuth token endpoint bucket.
	pub auth: BucketConfig,
	/// Metadata endpoint bucket.
	pub metadata: BucketConfig,
}
impl Default for RateLimitConfig {
	fn default() -> Self {
		Self {
			routes: vec![
				RouteRule::new("/oauth", EndpointClass::Auth),
				RouteRule::new("/game", EndpointClass::Metadata),
			],
			api: BucketConfig::new(60., 1.),
			auth: BucketConfig::new(5., 1. / 12.),
			metadata: BucketConfig::new(10., 0.5),
		}
	}
}

/// Result of [`RateLimiter::check`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// A token is available now.
	Allow,
	/// The call should wait.
	Delay(RetryDirective),
}

/// Advises callers when to retry after a [`RateLimitDecision::Delay`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Class whose bucket is empty.
	pub class: EndpointClass,
	/// Instant when it is safe to retry.
	pub earliest_retry_at: OffsetDateTime,
	/// Suggested backoff duration.
	pub recommended_backoff: Duration,
}

/// Registry of per-class buckets selected by endpoint prefix.
#[derive(Debug)]
pub struct RateLimiter {
	routes: Vec<RouteRule>,
	api: TokenBucket,
	auth: TokenBucket,
	metadata: TokenBucket,
}
impl RateLimiter {
	/// Builds full buckets for every class.
	pub fn new(config: &RateLimitConfig) -> Result<Self, ConfigError> {
		Ok(Self {
			routes: config.routes.clone(),
			api: TokenBucket::for_class(EndpointClass::Api, config.api)?,
			auth: TokenBucket::for_class(EndpointClass::Auth, config.auth)?,
			metadata: TokenBucket::for_class(EndpointClass::Metadata, config.metadata)?,
		})
	}

	/// Class for `endpoint`: first matching prefix, else [`EndpointClass::Api`].
	pub fn classify(&self, endpoint: &str) -> EndpointClass {
		self.routes
			.iter()
			.find(|rule| endpoint.starts_with(&rule.prefix))
			.map_or(EndpointClass::Api, |rule| rule.class)
	}

	/// Bucket owned by `class`.
	pub fn bucket(&self, class: EndpointClass) -> &TokenBucket {
		match class {
			EndpointClass::Api => &self.api,
			EndpointClass::Auth => &self.auth,
			EndpointClass::Metadata => &self.metadata,
		}
	}

	/// Bucket guarding `endpoint`.
	pub fn bucket_for(&self, endpoint: &str) -> &TokenBucket {
		self.bucket(self.classify(endpoint))
	}

	/// Reports whether `endpoint` could proceed now, without consuming a token.
	pub fn check(&self, endpoint: &str) -> RateLimitDecision {
		let class = self.classify(endpoint);
		let wait = self.bucket(class).time_until_next_token();

		if wait.is_zero() {
			return RateLimitDecision::Allow;
		}

		let backoff = to_time_duration(wait);

		RateLimitDecision::Delay(RetryDirective {
			class,
			earliest_retry_at: OffsetDateTime::now_utc() + backoff,
			recommended_backoff: backoff,
		})
	}

	/// Takes a token for `class`, waiting when the projected wait fits within `max_wait`.
	///
	/// Fails fast with [`ErrorCode::RateLimited`] (carrying the projected wait as
	/// `retry_after`) when the bucket would need longer than `max_wait` to refill.
	pub async fn acquire(&self, class: EndpointClass, max_wait: StdDuration) -> Result<(), ApiError> {
		let bucket = self.bucket(class);

		if bucket.try_acquire() {
			return Ok(());
		}

		let wait = bucket.time_until_next_token();

		if wait > max_wait {
			return Err(ApiError::new(
				ErrorCode::RateLimited,
				format!("Local `{class}` rate limit exhausted."),
			)
			.with_details(format!("Next token in {} ms.", wait.as_millis()))
			.with_retry_after(to_time_duration(wait)));
		}

		#[cfg(feature = "tracing")]
		tracing::debug!(class = class.as_str(), wait_ms = wait.as_millis() as u64, "waiting for rate limit token");

		bucket.acquire().await;

		Ok(())
	}

	/// Refills every bucket.
	pub fn reset_all(&self) {
		self.api.reset();
		self.auth.reset();
		self.metadata.reset();
	}
}

fn to_time_duration(d: StdDuration) -> Duration {
	Duration::try_from(d).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn bucket(capacity: f64, refill_per_sec: f64) -> TokenBucket {
		TokenBucket::new(BucketConfig::new(capacity, refill_per_sec))
			.expect("Bucket fixture should be valid.")
	}

	#[test]
	fn capacity_two_bucket_refills_after_one_second() {
		let bucket = bucket(2., 1.);
		let start = Instant::now();

		bucket.reset_at(start);

		assert!(bucket.try_acquire_at(start));
		assert!(bucket.try_acquire_at(start));
		assert!(!bucket.try_acquire_at(start));
		assert!(bucket.try_acquire_at(start + StdDuration::from_secs(1)));
	}

	#[test]
	fn n_successes_consume_exactly_n_tokens() {
		let bucket = bucket(10., 1.);
		let start = Instant::now();

		bucket.reset_at(start);

		for _ in 0..7 {
			assert!(bucket.try_acquire_at(start));
		}

		assert_eq!(bucket.available_at(start), 3.);
	}

	#[test]
	fn tokens_stay_within_bounds() {
		let bucket = bucket(3., 2.);
		let start = Instant::now();

		bucket.reset_at(start);

		for step in 0..20_u64 {
			let now = start + StdDuration::from_millis(step * 150);

			bucket.try_acquire_at(now);
			bucket.try_acquire_at(now);

			let tokens = bucket.available_at(now);

			assert!((0. ..=3.).contains(&tokens), "tokens out of bounds: {tokens}");
		}

		assert_eq!(bucket.available_at(start + StdDuration::from_secs(3_600)), 3.);
	}

	#[test]
	fn reset_restores_capacity() {
		let bucket = bucket(4., 0.1);
		let start = Instant::now();

		bucket.reset_at(start);

		while bucket.try_acquire_at(start) {}

		bucket.reset_at(start);

		assert_eq!(bucket.available_at(start), 4.);
	}

	#[test]
	fn time_until_next_token_reports_fractional_deficit() {
		let bucket = bucket(1., 2.);
		let start = Instant::now();

		bucket.reset_at(start);

		assert_eq!(bucket.time_until_next_token_at(start), StdDuration::ZERO);
		assert!(bucket.try_acquire_at(start));
		assert_eq!(bucket.time_until_next_token_at(start), StdDuration::from_millis(500));
		assert_eq!(
			bucket.time_until_next_token_at(start + StdDuration::from_millis(200)),
			StdDuration::from_millis(300)
		);
	}

	#[test]
	fn invalid_bucket_configs_are_rejected() {
		for config in [
			BucketConfig::new(0., 1.),
			BucketConfig::new(0.5, 1.),
			BucketConfig::new(1., 0.),
			BucketConfig::new(f64::NAN, 1.),
			BucketConfig::new(1., f64::INFINITY),
		] {
			assert!(matches!(TokenBucket::new(config), Err(ConfigError::InvalidBucket { .. })));
		}
	}

	#[test]
	fn routes_select_first_matching_prefix() {
		let config = RateLimitConfig {
			routes: vec![
				RouteRule::new("/oauth", EndpointClass::Auth),
				RouteRule::new("/oauth/v2", EndpointClass::Metadata),
				RouteRule::new("/game", EndpointClass::Metadata),
			],
			..RateLimitConfig::default()
		};
		let limiter = RateLimiter::new(&config).expect("Limiter fixture should be valid.");

		assert_eq!(limiter.classify("/oauth/v2/get_token"), EndpointClass::Auth);
		assert_eq!(limiter.classify("/game/nfl"), EndpointClass::Metadata);
		assert_eq!(limiter.classify("/league/423.l.1/standings"), EndpointClass::Api);
	}

	#[test]
	fn classes_own_independent_buckets() {
		let limiter =
			RateLimiter::new(&RateLimitConfig::default()).expect("Limiter fixture should be valid.");

		while limiter.bucket(EndpointClass::Auth).try_acquire() {}

		assert!(matches!(limiter.check("/oauth/v2/get_token"), RateLimitDecision::Delay(_)));
		assert_eq!(limiter.check("/league/1"), RateLimitDecision::Allow);
	}

	#[tokio::test]
	async fn acquire_fails_fast_when_wait_exceeds_ceiling() {
		let config = RateLimitConfig { api: BucketConfig::new(1., 0.01), ..RateLimitConfig::default() };
		let limiter = RateLimiter::new(&config).expect("Limiter fixture should be valid.");

		limiter
			.acquire(EndpointClass::Api, StdDuration::from_secs(5))
			.await
			.expect("First token should be available.");

		let err = limiter
			.acquire(EndpointClass::Api, StdDuration::from_secs(5))
			.await
			.expect_err("Second token needs ~100 s and should fail fast.");

		assert_eq!(err.code, ErrorCode::RateLimited);
		assert!(err.is_retryable());
		assert!(err.retry_after.is_some_and(|d| d > Duration::seconds(5)));
	}

	#[tokio::test]
	async fn acquire_waits_when_within_ceiling() {
		let config = RateLimitConfig { api: BucketConfig::new(1., 20.), ..RateLimitConfig::default() };
		let limiter = RateLimiter::new(&config).expect("Limiter fixture should be valid.");
		let started = Instant::now();

		for _ in 0..3 {
			limiter
				.acquire(EndpointClass::Api, StdDuration::from_secs(1))
				.await
				.expect("Short waits should be absorbed locally.");
		}

		assert!(started.elapsed() >= StdDuration::from_millis(90));
	}
}
