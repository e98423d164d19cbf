//! SDK-level error types: construction-time configuration failures and classified per-call
//! API errors.

pub mod code;

pub use code::*;

// self
use crate::_prelude::*;

/// SDK-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical SDK error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem detected while building the client.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Classified failure of a single API call.
	#[error(transparent)]
	Api(Box<ApiError>),
}
impl Error {
	/// Returns the machine code describing this failure.
	pub fn code(&self) -> ErrorCode {
		match self {
			Self::Config(_) => ErrorCode::ValidationError,
			Self::Api(e) => e.code,
		}
	}

	/// Whether the caller may retry the failed operation.
	pub fn is_retryable(&self) -> bool {
		self.code().is_retryable()
	}

	/// Borrows the classified API error, if this is one.
	pub fn as_api(&self) -> Option<&ApiError> {
		match self {
			Self::Api(e) => Some(e),
			Self::Config(_) => None,
		}
	}
}
impl From<ApiError> for Error {
	fn from(e: ApiError) -> Self {
		Self::Api(Box::new(e))
	}
}

/// Configuration and validation failures raised while constructing SDK components.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Consumer key is empty.
	#[error("Consumer key is required.")]
	MissingConsumerKey,
	/// Consumer secret is empty.
	#[error("Consumer secret is required.")]
	MissingConsumerSecret,
	/// Only one half of the access-token pair was supplied.
	#[error("Access token and access token secret must be supplied together.")]
	IncompleteAccessToken,
	/// Base URL cannot be parsed.
	#[error("The {which} base URL is invalid.")]
	InvalidBaseUrl {
		/// Which base URL failed to parse.
		which: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL does not use HTTPS.
	#[error("The {which} base URL must use HTTPS: {url}.")]
	InsecureBaseUrl {
		/// Which base URL failed validation.
		which: &'static str,
		/// Offending URL.
		url: String,
	},
	/// Bucket capacity is below one token or the refill rate is not a positive finite number.
	#[error("Rate limit bucket `{class}` needs a capacity of at least one token and a positive refill rate.")]
	InvalidBucket {
		/// Endpoint class label.
		class: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Classified failure of one API call.
///
/// This is the error context handed back to callers: a closed [`ErrorCode`], a human
/// message, the instant the failure was observed, and whatever the upstream response
/// revealed about it. Retry decisions belong to the caller and should be driven by
/// [`ApiError::is_retryable`].
pub struct ApiError {
	/// Machine-readable error code.
	pub code: ErrorCode,
	/// Human-readable summary.
	pub message: String,
	/// Instant the failure was observed.
	pub timestamp: OffsetDateTime,
	/// Upstream request identifier, when the response carried one.
	pub request_id: Option<String>,
	/// Free-form details (response excerpt, JSON path, etc.).
	pub details: Option<String>,
	/// HTTP status code, when a response was received.
	pub status: Option<u16>,
	/// Retry-After hint from upstream or from the local rate limiter.
	pub retry_after: Option<Duration>,
	/// OAuth `oauth_problem` value reported alongside a 401.
	pub oauth_problem: Option<String>,
	source: Option<BoxError>,
}
impl ApiError {
	/// Creates an error stamped with the current instant.
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
			timestamp: OffsetDateTime::now_utc(),
			request_id: None,
			details: None,
			status: None,
			retry_after: None,
			oauth_problem: None,
			source: None,
		}
	}

	/// Attaches free-form details.
	pub fn with_details(mut self, details: impl Into<String>) -> Self {
		self.details = Some(details.into());

		self
	}

	/// Attaches the upstream request identifier.
	pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
		self.request_id = Some(request_id.into());

		self
	}

	/// Records the HTTP status that produced the error.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);

		self
	}

	/// Records a retry hint.
	pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
		self.retry_after = Some(retry_after);

		self
	}

	/// Keeps the underlying cause reachable through [`std::error::Error::source`].
	pub fn with_source(mut self, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		self.source = Some(Box::new(src));

		self
	}

	/// Whether the caller may retry the failed call.
	pub fn is_retryable(&self) -> bool {
		self.code.is_retryable()
	}

	/// Maps the reported `oauth_problem` onto the OAuth error codes, if recognized.
	pub fn oauth_problem_code(&self) -> Option<ErrorCode> {
		self.oauth_problem.as_deref().and_then(ErrorCode::from_oauth_problem)
	}

	/// Renders the wire payload consumed by front ends.
	pub fn payload(&self) -> ErrorPayload {
		ErrorPayload {
			error: self.code,
			message: self.message.clone(),
			timestamp: self.timestamp,
			request_id: self.request_id.clone(),
			details: self.details.clone(),
		}
	}
}
impl Debug for ApiError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiError")
			.field("code", &self.code)
			.field("message", &self.message)
			.field("timestamp", &self.timestamp)
			.field("request_id", &self.request_id)
			.field("details", &self.details)
			.field("status", &self.status)
			.field("retry_after", &self.retry_after)
			.field("oauth_problem", &self.oauth_problem)
			.field("source", &self.source)
			.finish()
	}
}
impl Display for ApiError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}: {}", self.code, self.message)
	}
}
impl StdError for ApiError {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
	}
}

/// Serialized error body: `{error, message, timestamp, request_id?, details?}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
	/// Machine-readable error code.
	pub error: ErrorCode,
	/// Human-readable summary.
	pub message: String,
	/// Instant the failure was observed.
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
	/// Upstream request identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub request_id: Option<String>,
	/// Free-form details.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<String>,
}
