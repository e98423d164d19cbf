//! Optional observability helpers for the request pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `fantasy_sports_sdk.request` with the
//!   `method`, `endpoint`, and `class` fields, plus events for cache hits, rate-limit waits,
//!   and swallowed cache-write failures.
//! - Enable `metrics` to increment the `fantasy_sports_sdk_request_total` counter for every
//!   attempt/cache hit/success/failure, labeled by `class` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Entry to the executor.
	Attempt,
	/// Served from the response cache.
	CacheHit,
	/// Upstream answered with a non-error status.
	Success,
	/// Error propagated back to the caller.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::CacheHit => "cache_hit",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
