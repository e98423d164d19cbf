//! Request executor composing the cache, rate limiter, signer, and transport.
//!
//! A GET call with caching enabled walks the full pipeline:
//!
//! 1. build the cache key from the endpoint and sorted query parameters;
//! 2. return a synthesized `200` on a fresh cache hit, skipping everything below;
//! 3. take a token from the endpoint's rate-limit bucket, failing fast with `RATE_LIMITED` when
//!    the projected wait exceeds the configured ceiling;
//! 4. sign the target URL and query parameters;
//! 5. send with `Authorization`, `Accept`, `User-Agent`, and `Content-Type` when a body exists;
//! 6. classify statuses of 400 and above into an [`ApiError`];
//! 7. cache `200` bodies, logging and swallowing any cache-write failure;
//! 8. hand the response back.
//!
//! Other methods skip steps 1, 2, and 7. The executor never retries; callers decide based on
//! [`ApiError::is_retryable`]. Each shared component guards itself with its own lock and no
//! step holds more than one lock at a time.

pub mod builder;
pub mod config;

pub use builder::*;
pub use config::*;

// std
use std::time::Duration as StdDuration;
// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Credentials},
	cache::{ResponseCache, cache_key},
	error::{ApiError, ErrorCode},
	http::{ApiHttpClient, ApiRequest, ApiResponse, HttpMethod},
	oauth::{self, OAuthSigner},
	obs::{self, RequestOutcome, RequestSpan},
	rate_limit::{EndpointClass, RateLimiter},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestSdkClient = Client<ReqwestHttpClient>;

const REQUEST_ID_HEADERS: [&str; 2] = ["x-request-id", "x-yahoo-request-id"];
const MAX_DETAIL_CHARS: usize = 512;

/// Outcome of [`Client::refresh_access_token`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRefresh {
	/// Newly installed `oauth_token`.
	pub token: String,
	/// Session handle to present on the next refresh, when the provider rotated it.
	pub session_handle: Option<String>,
	/// Lifetime of the new token, when reported.
	pub expires_in: Option<Duration>,
}

/// Authenticated, rate-limited, cached API client.
///
/// One instance is meant to be shared (typically behind an [`Arc`]) by every task issuing
/// requests. The credentials, cache, and buckets are the only mutable shared state.
pub struct Client<C>
where
	C: ?Sized + ApiHttpClient,
{
	http_client: Arc<C>,
	base_url: Url,
	auth_base_url: Url,
	user_agent: String,
	credentials: RwLock<Arc<Credentials>>,
	signer: OAuthSigner,
	rate_limiter: Arc<RateLimiter>,
	cache: Arc<ResponseCache>,
	cache_enabled: bool,
	max_rate_limit_wait: StdDuration,
}
impl<C> Client<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Response cache; schedule [`ResponseCache::cleanup`] against it as needed.
	pub fn cache(&self) -> &Arc<ResponseCache> {
		&self.cache
	}

	/// Rate limiter shared by every call.
	pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
		&self.rate_limiter
	}

	/// Drops every cached response.
	pub fn clear_cache(&self) {
		self.cache.clear();
	}

	/// Snapshot of the current credentials.
	pub fn credentials(&self) -> Arc<Credentials> {
		self.credentials.read().clone()
	}

	/// Replaces the access-token pair; the previous pair is discarded.
	pub fn update_access_token(
		&self,
		token: impl Into<String>,
		secret: impl Into<String>,
	) -> Result<()> {
		let access_token = AccessToken::new(token, secret)?;
		let mut guard = self.credentials.write();
		let updated = guard.replacing_access_token(access_token);

		*guard = Arc::new(updated);

		Ok(())
	}

	/// `GET endpoint?params`, served from the cache when possible.
	pub async fn get(&self, endpoint: &str, params: &[(String, String)]) -> Result<ApiResponse> {
		self.execute(HttpMethod::Get, endpoint, params, None).await
	}

	/// `POST endpoint?params` with an optional body.
	pub async fn post(
		&self,
		endpoint: &str,
		params: &[(String, String)],
		body: Option<Vec<u8>>,
	) -> Result<ApiResponse> {
		self.execute(HttpMethod::Post, endpoint, params, body).await
	}

	/// `PUT endpoint?params` with an optional body.
	pub async fn put(
		&self,
		endpoint: &str,
		params: &[(String, String)],
		body: Option<Vec<u8>>,
	) -> Result<ApiResponse> {
		self.execute(HttpMethod::Put, endpoint, params, body).await
	}

	/// `DELETE endpoint?params`.
	pub async fn delete(&self, endpoint: &str, params: &[(String, String)]) -> Result<ApiResponse> {
		self.execute(HttpMethod::Delete, endpoint, params, None).await
	}

	/// `GET` and deserialize the JSON body into `T`.
	///
	/// Decoding failures surface as [`ErrorCode::ParseError`] with the failing JSON path in
	/// `details`.
	pub async fn get_json<T>(&self, endpoint: &str, params: &[(String, String)]) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.get(endpoint, params).await?;
		let mut de = serde_json::Deserializer::from_slice(&response.body);

		serde_path_to_error::deserialize(&mut de).map_err(|e| {
			let path = e.path().to_string();

			ApiError::new(ErrorCode::ParseError, "Response body is not the expected JSON.")
				.with_details(format!("at `{path}`"))
				.with_source(e.into_inner())
				.into()
		})
	}

	/// Runs one call through the pipeline against the API base URL.
	pub async fn execute(
		&self,
		method: HttpMethod,
		endpoint: &str,
		params: &[(String, String)],
		body: Option<Vec<u8>>,
	) -> Result<ApiResponse> {
		self.execute_against(&self.base_url, method, endpoint, params, body).await
	}

	/// Exchanges the current access token for a fresh one at the OAuth token endpoint.
	///
	/// The call is signed with the current credentials, goes through the auth-class bucket,
	/// and installs the returned pair via [`Client::update_access_token`].
	pub async fn refresh_access_token(&self, session_handle: &str) -> Result<TokenRefresh> {
		let params = vec![("oauth_session_handle".to_owned(), session_handle.to_owned())];
		let response = self
			.execute_against(&self.auth_base_url, HttpMethod::Post, TOKEN_ENDPOINT, &params, None)
			.await?;
		let fields = url::form_urlencoded::parse(&response.body)
			.into_owned()
			.collect::<HashMap<String, String>>();
		let missing = |name: &str| {
			ApiError::new(ErrorCode::ParseError, format!("Token response is missing `{name}`."))
				.with_status(response.status)
		};
		let token = fields.get("oauth_token").ok_or_else(|| missing("oauth_token"))?;
		let secret =
			fields.get("oauth_token_secret").ok_or_else(|| missing("oauth_token_secret"))?;

		self.update_access_token(token.clone(), secret.clone())?;

		Ok(TokenRefresh {
			token: token.clone(),
			session_handle: fields.get("oauth_session_handle").cloned(),
			expires_in: fields
				.get("oauth_expires_in")
				.and_then(|v| v.parse::<i64>().ok())
				.map(Duration::seconds),
		})
	}

	async fn execute_against(
		&self,
		base: &Url,
		method: HttpMethod,
		endpoint: &str,
		params: &[(String, String)],
		body: Option<Vec<u8>>,
	) -> Result<ApiResponse> {
		let class = self.rate_limiter.classify(endpoint);
		let span = RequestSpan::new(method, endpoint, class);

		obs::record_request_outcome(class, RequestOutcome::Attempt);

		let result = span
			.instrument(self.run(base, method, endpoint, class, params, body))
			.await;

		match &result {
			Ok(response) if response.from_cache =>
				obs::record_request_outcome(class, RequestOutcome::CacheHit),
			Ok(_) => obs::record_request_outcome(class, RequestOutcome::Success),
			Err(e) => {
				obs::record_request_outcome(class, RequestOutcome::Failure);
				obs::log_api_error(e);
			},
		}

		result.map_err(Error::from)
	}

	async fn run(
		&self,
		base: &Url,
		method: HttpMethod,
		endpoint: &str,
		class: EndpointClass,
		params: &[(String, String)],
		body: Option<Vec<u8>>,
	) -> Result<ApiResponse, ApiError> {
		let key = (self.cache_enabled && method == HttpMethod::Get)
			.then(|| cache_key(endpoint, params));

		if let Some(key) = &key
			&& let Some(cached) = self.cache.get(key)
		{
			obs::log_cache_hit(key);

			return Ok(ApiResponse::cached(cached));
		}

		oauth::check_request_params(params)?;
		self.rate_limiter.acquire(class, self.max_rate_limit_wait).await?;

		let target = endpoint_url(base, endpoint)?;
		let credentials = self.credentials();
		let signed = self.signer.sign(method.as_str(), &target, params, &credentials)?;
		let mut url = target;

		if !params.is_empty() {
			url.query_pairs_mut().extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
		}

		let mut headers = vec![
			("Authorization".to_owned(), signed.authorization),
			("Accept".to_owned(), "application/json".to_owned()),
			("User-Agent".to_owned(), self.user_agent.clone()),
		];

		if body.is_some() {
			headers.push(("Content-Type".to_owned(), "application/json".to_owned()));
		}

		let request = ApiRequest { method, url, headers, body };
		let response = self.http_client.send(request).await.map_err(|e| {
			let code = self.http_client.classify_transport_error(&e);

			ApiError::new(code, format!("Transport failure while calling `{endpoint}`."))
				.with_source(e)
		})?;

		if response.status >= 400 {
			return Err(error_from_response(&response));
		}
		if response.status == 200
			&& let Some(key) = &key
			&& let Err(e) = self.cache.put(key.clone(), &response.body)
		{
			obs::log_cache_write_failure(key, &e);
		}

		Ok(response)
	}
}
impl<C> Debug for Client<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("base_url", &self.base_url.as_str())
			.field("auth_base_url", &self.auth_base_url.as_str())
			.field("user_agent", &self.user_agent)
			.field("cache_enabled", &self.cache_enabled)
			.field("max_rate_limit_wait", &self.max_rate_limit_wait)
			.finish()
	}
}

/// Appends `endpoint` to `base`, keeping the base path.
fn endpoint_url(base: &Url, endpoint: &str) -> Result<Url, ApiError> {
	let raw = format!(
		"{}/{}",
		base.as_str().trim_end_matches('/'),
		endpoint.trim_start_matches('/')
	);

	Url::parse(&raw).map_err(|e| {
		ApiError::new(ErrorCode::InvalidParameter, format!("Endpoint `{endpoint}` is not a valid path."))
			.with_source(e)
	})
}

fn error_from_response(response: &ApiResponse) -> ApiError {
	let code = match response.status {
		429 => ErrorCode::RateLimited,
		401 => ErrorCode::Unauthorized,
		404 => ErrorCode::NotFound,
		status => ErrorCode::from_status(status),
	};
	let message = match code {
		ErrorCode::RateLimited => "Upstream rate limit exceeded.".to_owned(),
		ErrorCode::Unauthorized => "Request was not authorized.".to_owned(),
		ErrorCode::NotFound => "Resource not found.".to_owned(),
		_ => format!("Upstream responded with HTTP {}.", response.status),
	};
	let mut error = ApiError::new(code, message).with_status(response.status);
	let text = response.text();
	let excerpt = text.trim();

	if !excerpt.is_empty() {
		error = error.with_details(excerpt.chars().take(MAX_DETAIL_CHARS).collect::<String>());
	}
	if let Some(id) = REQUEST_ID_HEADERS.iter().find_map(|name| response.header(name)) {
		error = error.with_request_id(id);
	}
	if let Some(retry_after) = response.retry_after() {
		error = error.with_retry_after(retry_after);
	}
	if code == ErrorCode::Unauthorized {
		error.oauth_problem = response
			.header("www-authenticate")
			.and_then(extract_oauth_problem)
			.or_else(|| extract_oauth_problem(&text));
	}

	error
}

fn extract_oauth_problem(haystack: &str) -> Option<String> {
	let start = haystack.find("oauth_problem=")? + "oauth_problem=".len();
	let value = haystack[start..]
		.trim_start_matches('"')
		.split(|c: char| matches!(c, '"' | '&' | ',' | ';') || c.is_whitespace())
		.next()?;

	(!value.is_empty()).then(|| value.to_owned())
}
