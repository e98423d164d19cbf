//! Transport primitives for signed API calls.
//!
//! [`ApiHttpClient`] is the SDK's only dependency on an HTTP stack. The executor hands it a
//! fully built [`ApiRequest`] (URL with query string, `Authorization` and the other standard
//! headers already set) and receives an [`ApiResponse`] for every status code; only
//! transport failures come back as errors, and the same implementation classifies them into
//! network [`ErrorCode`]s.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::Method;
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::ErrorCode};

/// Boxed future returned by [`ApiHttpClient::send`].
pub type HttpFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 'a + Send>>;

/// HTTP methods used by the API surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	/// `GET`; the only cacheable method.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `DELETE`.
	Delete,
}
impl HttpMethod {
	/// Upper-case method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Delete => "DELETE",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outbound request as handed to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: HttpMethod,
	/// Absolute URL including the query string.
	pub url: Url,
	/// Header name/value pairs.
	pub headers: Vec<(String, String)>,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// First header value matching `name`, ignoring ASCII case.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
	}
}

/// Response returned to callers, either from the network or synthesized from the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw body bytes.
	pub body: Arc<[u8]>,
	/// Headers keyed by lower-cased name.
	pub headers: BTreeMap<String, String>,
	/// Whether the response was served from the cache.
	pub from_cache: bool,
}
impl ApiResponse {
	/// Synthesizes the `200` response for a cache hit.
	pub fn cached(body: Arc<[u8]>) -> Self {
		Self { status: 200, body, headers: BTreeMap::new(), from_cache: true }
	}

	/// Header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Whether the status is below 400.
	pub fn is_success(&self) -> bool {
		self.status < 400
	}

	/// Retry-After hint, in delta-seconds or HTTP-date form.
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(self.header("retry-after")?)
	}
}

/// Abstraction over HTTP transports capable of executing signed API calls.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// caller of a [`Client`](crate::client::Client), and the returned futures must be `Send`.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Executes `request`, returning any received response regardless of status.
	fn send(&self, request: ApiRequest) -> HttpFuture<'_, ApiResponse, Self::TransportError>;

	/// Maps a transport failure onto the network error codes.
	fn classify_transport_error(&self, error: &Self::TransportError) -> ErrorCode;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn send(&self, request: ApiRequest) -> HttpFuture<'_, ApiResponse, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				HttpMethod::Get => Method::GET,
				HttpMethod::Post => Method::POST,
				HttpMethod::Put => Method::PUT,
				HttpMethod::Delete => Method::DELETE,
			};
			let mut builder = client.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
				})
				.collect();
			let body = response.bytes().await?;

			Ok(ApiResponse { status, body: Arc::from(&body[..]), headers, from_cache: false })
		})
	}

	fn classify_transport_error(&self, error: &ReqwestError) -> ErrorCode {
		if error.is_timeout() {
			return ErrorCode::Timeout;
		}
		if error.is_decode() || error.is_body() {
			return ErrorCode::ParseError;
		}
		if error.is_builder() {
			return ErrorCode::InvalidParameter;
		}

		let chain = error_chain_text(error);

		if chain.contains("dns") || chain.contains("resolve") || chain.contains("lookup") {
			ErrorCode::DnsResolutionFailed
		} else if chain.contains("certificate")
			|| chain.contains("tls")
			|| chain.contains("ssl")
			|| chain.contains("handshake")
		{
			ErrorCode::SslHandshakeFailed
		} else {
			ErrorCode::ConnectionFailed
		}
	}
}

/// Lower-cased messages of `error` and all of its sources.
pub fn error_chain_text(error: &(dyn StdError + 'static)) -> String {
	let mut text = String::new();
	let mut current = Some(error);

	while let Some(err) = current {
		text.push_str(&err.to_string().to_ascii_lowercase());
		text.push('\n');

		current = err.source();
	}

	text
}

/// Parses a `Retry-After` value (delta-seconds or RFC 2822 date).
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
	let raw = raw.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).ok()?));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
