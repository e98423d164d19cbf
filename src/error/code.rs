//! Closed error taxonomy and the HTTP status classifier.

// self
use crate::_prelude::*;

/// Machine code for every failure the SDK can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// TCP connection could not be established or was dropped.
	ConnectionFailed,
	/// Request or gateway timed out.
	Timeout,
	/// Host name could not be resolved.
	DnsResolutionFailed,
	/// TLS negotiation failed.
	SslHandshakeFailed,
	/// HTTP 400 and unrecognized 4xx statuses.
	BadRequest,
	/// HTTP 401.
	Unauthorized,
	/// HTTP 403.
	Forbidden,
	/// HTTP 404.
	NotFound,
	/// HTTP 429 or a local rate-limit refusal.
	RateLimited,
	/// HTTP 500 and unrecognized 5xx statuses.
	InternalServerError,
	/// HTTP 502.
	BadGateway,
	/// HTTP 503.
	ServiceUnavailable,
	/// Access token was rejected.
	InvalidToken,
	/// Access token has expired and must be refreshed.
	TokenExpired,
	/// Request signature did not verify upstream.
	InvalidSignature,
	/// Consumer key is unknown or revoked.
	InvalidConsumerKey,
	/// Cached payload outlived its TTL.
	CacheExpired,
	/// Cached payload could not be decoded.
	CacheCorrupted,
	/// Cache cannot accept another entry.
	CacheFull,
	/// Upstream returned something the SDK cannot act on.
	ApiUnavailable,
	/// Caller supplied an unusable parameter.
	InvalidParameter,
	/// Response body could not be parsed.
	ParseError,
	/// Local validation failed.
	ValidationError,
}
impl ErrorCode {
	/// Alias kept for callers that think in HTTP terms.
	pub const TOO_MANY_REQUESTS: Self = Self::RateLimited;

	/// Returns the stable wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ConnectionFailed => "CONNECTION_FAILED",
			Self::Timeout => "TIMEOUT",
			Self::DnsResolutionFailed => "DNS_RESOLUTION_FAILED",
			Self::SslHandshakeFailed => "SSL_HANDSHAKE_FAILED",
			Self::BadRequest => "BAD_REQUEST",
			Self::Unauthorized => "UNAUTHORIZED",
			Self::Forbidden => "FORBIDDEN",
			Self::NotFound => "NOT_FOUND",
			Self::RateLimited => "RATE_LIMITED",
			Self::InternalServerError => "INTERNAL_SERVER_ERROR",
			Self::BadGateway => "BAD_GATEWAY",
			Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
			Self::InvalidToken => "INVALID_TOKEN",
			Self::TokenExpired => "TOKEN_EXPIRED",
			Self::InvalidSignature => "INVALID_SIGNATURE",
			Self::InvalidConsumerKey => "INVALID_CONSUMER_KEY",
			Self::CacheExpired => "CACHE_EXPIRED",
			Self::CacheCorrupted => "CACHE_CORRUPTED",
			Self::CacheFull => "CACHE_FULL",
			Self::ApiUnavailable => "API_UNAVAILABLE",
			Self::InvalidParameter => "INVALID_PARAMETER",
			Self::ParseError => "PARSE_ERROR",
			Self::ValidationError => "VALIDATION_ERROR",
		}
	}

	/// Whether a failure with this code is worth retrying.
	pub const fn is_retryable(self) -> bool {
		matches!(
			self,
			Self::Timeout
				| Self::ConnectionFailed
				| Self::RateLimited
				| Self::ServiceUnavailable
				| Self::BadGateway
		)
	}

	/// Maps an HTTP error status to its code.
	///
	/// Statuses below 400 are not failures; they map to [`ErrorCode::ApiUnavailable`] so a
	/// caller that classifies them anyway gets a non-retryable answer.
	pub const fn from_status(status: u16) -> Self {
		match status {
			400 => Self::BadRequest,
			401 => Self::Unauthorized,
			403 => Self::Forbidden,
			404 => Self::NotFound,
			408 | 504 => Self::Timeout,
			429 => Self::RateLimited,
			500 => Self::InternalServerError,
			502 => Self::BadGateway,
			503 => Self::ServiceUnavailable,
			405..=499 => Self::BadRequest,
			505..=599 => Self::InternalServerError,
			_ => Self::ApiUnavailable,
		}
	}

	/// Maps an OAuth 1.0a `oauth_problem` value to a code.
	pub fn from_oauth_problem(problem: &str) -> Option<Self> {
		match problem.trim() {
			"token_expired" => Some(Self::TokenExpired),
			"token_rejected" | "token_revoked" | "token_used" | "permission_denied" =>
				Some(Self::InvalidToken),
			"signature_invalid" | "signature_method_rejected" => Some(Self::InvalidSignature),
			"consumer_key_unknown" | "consumer_key_rejected" | "consumer_key_refused" =>
				Some(Self::InvalidConsumerKey),
			"timestamp_refused" | "nonce_used" | "parameter_absent" | "parameter_rejected" =>
				Some(Self::BadRequest),
			_ => None,
		}
	}
}
impl Display for ErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Classifies an HTTP status code.
pub const fn classify(status: u16) -> ErrorCode {
	ErrorCode::from_status(status)
}

/// Whether `code` belongs to the retryable allow-list.
pub const fn is_retryable(code: ErrorCode) -> bool {
	code.is_retryable()
}
