//! Explicit client configuration; nothing here reads the environment.

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, cache::CacheConfig, rate_limit::RateLimitConfig};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://fantasysports.yahooapis.com/fantasy/v2";
/// Default base URL for the OAuth token endpoint.
pub const DEFAULT_AUTH_BASE_URL: &str = "https://api.login.yahoo.com";
/// Token endpoint path, relative to the auth base URL.
pub const TOKEN_ENDPOINT: &str = "/oauth/v2/get_token";
/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("fantasy-sports-sdk/", env!("CARGO_PKG_VERSION"));

/// Client settings. Every field has a default, so partial documents deserialize.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	/// Base URL every endpoint path is appended to.
	pub base_url: String,
	/// Base URL of the OAuth token endpoint.
	pub auth_base_url: String,
	/// `User-Agent` header value.
	pub user_agent: String,
	/// Longest local wait for a rate-limit token before failing with `RATE_LIMITED`.
	pub max_rate_limit_wait_ms: u64,
	/// Accept plain `http://` base URLs (local mocks only).
	pub allow_insecure: bool,
	/// Response cache settings.
	pub cache: CacheConfig,
	/// Per-class rate limits and routes.
	pub rate_limits: RateLimitConfig,
}
impl ClientConfig {
	/// Maximum local rate-limit wait as a duration.
	pub fn max_rate_limit_wait(&self) -> StdDuration {
		StdDuration::from_millis(self.max_rate_limit_wait_ms)
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			base_url: DEFAULT_BASE_URL.into(),
			auth_base_url: DEFAULT_AUTH_BASE_URL.into(),
			user_agent: DEFAULT_USER_AGENT.into(),
			max_rate_limit_wait_ms: 5_000,
			allow_insecure: false,
			cache: CacheConfig::default(),
			rate_limits: RateLimitConfig::default(),
		}
	}
}
