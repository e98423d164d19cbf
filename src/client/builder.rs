//! Validating builder for [`Client`].

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::Credentials,
	cache::{CacheConfig, ResponseCache},
	client::{Client, ClientConfig},
	error::ConfigError,
	http::ApiHttpClient,
	oauth::OAuthSigner,
	rate_limit::{RateLimitConfig, RateLimiter},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Builder for [`Client`] values; all validation happens in `build`.
#[derive(Debug)]
pub struct ClientBuilder {
	/// Credentials every request is signed with.
	pub credentials: Credentials,
	/// Client settings.
	pub config: ClientConfig,
}
impl ClientBuilder {
	/// Creates a builder seeded with default settings.
	pub fn new(credentials: Credentials) -> Self {
		Self { credentials, config: ClientConfig::default() }
	}

	/// Replaces the whole configuration.
	pub fn config(mut self, config: ClientConfig) -> Self {
		self.config = config;

		self
	}

	/// Overrides the API base URL.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.config.base_url = url.into();

		self
	}

	/// Overrides the OAuth token endpoint base URL.
	pub fn auth_base_url(mut self, url: impl Into<String>) -> Self {
		self.config.auth_base_url = url.into();

		self
	}

	/// Overrides the `User-Agent` header.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.config.user_agent = user_agent.into();

		self
	}

	/// Overrides the cache settings.
	pub fn cache(mut self, cache: CacheConfig) -> Self {
		self.config.cache = cache;

		self
	}

	/// Overrides the rate-limit settings.
	pub fn rate_limits(mut self, rate_limits: RateLimitConfig) -> Self {
		self.config.rate_limits = rate_limits;

		self
	}

	/// Overrides the longest local rate-limit wait.
	pub fn max_rate_limit_wait(mut self, wait: StdDuration) -> Self {
		self.config.max_rate_limit_wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);

		self
	}

	/// Accepts plain `http://` base URLs. Meant for local mock servers.
	pub fn allow_insecure(mut self, allow: bool) -> Self {
		self.config.allow_insecure = allow;

		self
	}

	/// Builds a client on top of the caller-provided transport.
	pub fn build_with_http_client<C>(self, http_client: impl Into<Arc<C>>) -> Result<Client<C>>
	where
		C: ?Sized + ApiHttpClient,
	{
		let base_url = parse_base_url("api", &self.config.base_url, self.config.allow_insecure)?;
		let auth_base_url =
			parse_base_url("auth", &self.config.auth_base_url, self.config.allow_insecure)?;
		let rate_limiter = RateLimiter::new(&self.config.rate_limits)?;
		let cache = ResponseCache::from_config(&self.config.cache);

		Ok(Client {
			http_client: http_client.into(),
			base_url,
			auth_base_url,
			user_agent: self.config.user_agent.clone(),
			credentials: RwLock::new(Arc::new(self.credentials)),
			signer: OAuthSigner,
			rate_limiter: Arc::new(rate_limiter),
			cache: Arc::new(cache),
			cache_enabled: self.config.cache.enabled,
			max_rate_limit_wait: self.config.max_rate_limit_wait(),
		})
	}

	/// Builds a client backed by a fresh reqwest transport.
	#[cfg(feature = "reqwest")]
	pub fn build(self) -> Result<Client<ReqwestHttpClient>> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(ConfigError::from)?;

		self.build_with_http_client(ReqwestHttpClient::with_client(client))
	}
}

fn parse_base_url(which: &'static str, raw: &str, allow_insecure: bool) -> Result<Url, ConfigError> {
	let url = Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl { which, source })?;

	match url.scheme() {
		"https" => Ok(url),
		"http" if allow_insecure => Ok(url),
		_ => Err(ConfigError::InsecureBaseUrl { which, url: url.to_string() }),
	}
}
