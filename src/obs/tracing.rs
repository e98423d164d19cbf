// self
use crate::{
	_prelude::*,
	cache::CacheError,
	error::ApiError,
	http::HttpMethod,
	rate_limit::EndpointClass,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// Span wrapping one executor call.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a span tagged with the method, endpoint, and endpoint class.
	pub fn new(method: HttpMethod, endpoint: &str, class: EndpointClass) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"fantasy_sports_sdk.request",
				method = method.as_str(),
				endpoint,
				class = class.as_str()
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, endpoint, class);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Notes a response served from the cache.
pub fn log_cache_hit(key: &str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(key, "response served from cache");
	#[cfg(not(feature = "tracing"))]
	let _ = key;
}

/// Notes a cache write that failed and was swallowed.
pub fn log_cache_write_failure(key: &str, error: &CacheError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(key, error = %error, "failed to cache response");
	#[cfg(not(feature = "tracing"))]
	let _ = (key, error);
}

/// Notes a classified failure about to be returned to the caller.
pub fn log_api_error(error: &ApiError) {
	#[cfg(feature = "tracing")]
	tracing::debug!(
		code = error.code.as_str(),
		status = error.status,
		retryable = error.is_retryable(),
		message = %error.message,
		"request failed"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}
