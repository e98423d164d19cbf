//! OAuth 1.0a request signing (HMAC-SHA1).
//!
//! [`OAuthSigner`] turns a method, target URL, request parameters, and [`Credentials`] into
//! the `Authorization` header value. Parameters embedded in the URL's query string take
//! part in the signature alongside the explicit parameter list, so callers may pass either
//! form.

pub mod encode;

pub use encode::*;

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha1::Sha1;
// self
use crate::{
	_prelude::*,
	auth::Credentials,
	error::{ApiError, ErrorCode},
};

/// Signature method advertised in every header.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
/// Protocol version advertised in every header.
pub const OAUTH_VERSION: &str = "1.0";

/// Parameter names reserved by the protocol; request parameters may not reuse them.
pub const PROTOCOL_PARAMS: [&str; 7] = [
	"oauth_consumer_key",
	"oauth_nonce",
	"oauth_signature",
	"oauth_signature_method",
	"oauth_timestamp",
	"oauth_token",
	"oauth_version",
];

const NONCE_BYTES: usize = 16;

/// A request after signing. Built per call and never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedRequest {
	/// Upper-cased HTTP method.
	pub method: String,
	/// Canonical base URL that was signed.
	pub base_url: String,
	/// Request parameters (URL query + explicit), sorted by key then value.
	pub params: Vec<(String, String)>,
	/// OAuth protocol parameters including `oauth_signature`, in header order.
	pub oauth_params: Vec<(String, String)>,
	/// Base64-encoded HMAC-SHA1 digest.
	pub signature: String,
	/// Complete `Authorization` header value.
	pub authorization: String,
}

/// Stateless OAuth 1.0a HMAC-SHA1 signer.
#[derive(Clone, Copy, Debug, Default)]
pub struct OAuthSigner;
impl OAuthSigner {
	/// Signs a request with a fresh nonce and the current Unix timestamp.
	pub fn sign(
		&self,
		method: &str,
		url: &Url,
		params: &[(String, String)],
		credentials: &Credentials,
	) -> Result<SignedRequest, ApiError> {
		let nonce = generate_nonce();
		let timestamp = OffsetDateTime::now_utc().unix_timestamp();

		self.sign_with(method, url, params, credentials, &nonce, timestamp)
	}

	/// Signs a request with a caller-supplied nonce and timestamp.
	///
	/// Deterministic for fixed inputs. A request parameter that reuses an OAuth protocol
	/// key is rejected with [`ErrorCode::InvalidParameter`].
	pub fn sign_with(
		&self,
		method: &str,
		url: &Url,
		params: &[(String, String)],
		credentials: &Credentials,
		nonce: &str,
		timestamp: i64,
	) -> Result<SignedRequest, ApiError> {
		let mut oauth_params = vec![
			("oauth_consumer_key".to_owned(), credentials.consumer_key().to_owned()),
			("oauth_nonce".to_owned(), nonce.to_owned()),
			("oauth_signature_method".to_owned(), SIGNATURE_METHOD.to_owned()),
			("oauth_timestamp".to_owned(), timestamp.to_string()),
			("oauth_version".to_owned(), OAUTH_VERSION.to_owned()),
		];

		if let Some(token) = credentials.access_token() {
			oauth_params.push(("oauth_token".to_owned(), token.token.clone()));
		}

		let mut request_params = url
			.query_pairs()
			.map(|(k, v)| (k.into_owned(), v.into_owned()))
			.chain(params.iter().cloned())
			.collect::<Vec<_>>();

		check_request_params(&request_params)?;

		request_params.sort();

		let normalized = normalize_parameters(
			oauth_params
				.iter()
				.chain(request_params.iter())
				.map(|(k, v)| (k.as_str(), v.as_str())),
		);
		let base_url = encode::base_url(url);
		let base_string = signature_base_string(method, &base_url, &normalized);
		let key = signing_key(
			credentials.consumer_secret().expose(),
			credentials.access_token().map(|t| t.secret.expose()),
		);
		let signature = hmac_sha1_base64(&key, &base_string)?;

		oauth_params.push(("oauth_signature".to_owned(), signature.clone()));
		oauth_params.sort_by(|(a, _), (b, _)| percent_encode(a).cmp(&percent_encode(b)));

		let authorization = render_header(&oauth_params);

		Ok(SignedRequest {
			method: method.to_ascii_uppercase(),
			base_url,
			params: request_params,
			oauth_params,
			signature,
			authorization,
		})
	}
}

/// Rejects request parameters that reuse a [`PROTOCOL_PARAMS`] name.
pub fn check_request_params(params: &[(String, String)]) -> Result<(), ApiError> {
	match params.iter().find(|(key, _)| PROTOCOL_PARAMS.contains(&key.as_str())) {
		Some((key, _)) => Err(ApiError::new(
			ErrorCode::InvalidParameter,
			format!("Request parameter `{key}` collides with an OAuth protocol parameter."),
		)),
		None => Ok(()),
	}
}

/// Computes `base64(HMAC-SHA1(key, message))`.
pub fn hmac_sha1_base64(key: &str, message: &str) -> Result<String, ApiError> {
	let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes()).map_err(|e| {
		ApiError::new(ErrorCode::InvalidSignature, "Signing key was rejected.")
			.with_details(e.to_string())
	})?;

	mac.update(message.as_bytes());

	Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Hex-encoded random nonce from the thread-local CSPRNG.
pub fn generate_nonce() -> String {
	let bytes = rand::random::<[u8; NONCE_BYTES]>();

	bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn render_header(oauth_params: &[(String, String)]) -> String {
	let parts = oauth_params
		.iter()
		.map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
		.collect::<Vec<_>>();

	format!("OAuth {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
	const TIMESTAMP: i64 = 1_318_622_958;

	fn credentials() -> Credentials {
		Credentials::new("xvz1evFS4wEEPTGEFPHBog", "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw")
			.and_then(|c| {
				c.with_access_token(
					"370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
					"LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
				)
			})
			.expect("Credential fixture should be valid.")
	}

	fn params() -> Vec<(String, String)> {
		vec![
			("status".into(), "Hello Ladies + Gentlemen, a signed OAuth request!".into()),
			("include_entities".into(), "true".into()),
		]
	}

	fn url() -> Url {
		Url::parse("https://api.twitter.com/1.1/statuses/update.json")
			.expect("Fixture URL should parse.")
	}

	#[test]
	fn signature_matches_published_vector() {
		let signed = OAuthSigner
			.sign_with("post", &url(), &params(), &credentials(), NONCE, TIMESTAMP)
			.expect("Signing should succeed.");

		assert_eq!(signed.signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
		assert_eq!(signed.method, "POST");
	}

	#[test]
	fn signature_is_recoverable_from_rederived_base_string() {
		let creds = credentials();
		let signed = OAuthSigner
			.sign_with("GET", &url(), &params(), &creds, NONCE, TIMESTAMP)
			.expect("Signing should succeed.");
		let unsigned = signed.oauth_params.iter().filter(|(k, _)| k != "oauth_signature");
		let normalized = normalize_parameters(
			unsigned.chain(signed.params.iter()).map(|(k, v)| (k.as_str(), v.as_str())),
		);
		let base = signature_base_string("GET", &signed.base_url, &normalized);
		let key = signing_key(
			creds.consumer_secret().expose(),
			creds.access_token().map(|t| t.secret.expose()),
		);

		assert!(base.starts_with("GET&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&"));
		assert!(base.contains("%2520Ladies%2520%252B%2520Gentlemen%252C"));
		assert_eq!(hmac_sha1_base64(&key, &base).expect("HMAC should succeed."), signed.signature);
	}

	#[test]
	fn signing_is_deterministic_for_fixed_inputs() {
		let creds = credentials();
		let first = OAuthSigner
			.sign_with("GET", &url(), &params(), &creds, NONCE, TIMESTAMP)
			.expect("Signing should succeed.");
		let second = OAuthSigner
			.sign_with("GET", &url(), &params(), &creds, NONCE, TIMESTAMP)
			.expect("Signing should succeed.");

		assert_eq!(first, second);
	}

	#[test]
	fn header_lists_only_oauth_params_in_normalized_order() {
		let signed = OAuthSigner
			.sign_with("GET", &url(), &params(), &credentials(), NONCE, TIMESTAMP)
			.expect("Signing should succeed.");
		let keys = signed.oauth_params.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>();

		assert_eq!(
			keys,
			[
				"oauth_consumer_key",
				"oauth_nonce",
				"oauth_signature",
				"oauth_signature_method",
				"oauth_timestamp",
				"oauth_token",
				"oauth_version",
			]
		);
		assert!(signed.authorization.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\", "));
		assert!(signed.authorization.contains("oauth_signature_method=\"HMAC-SHA1\""));
		assert!(!signed.authorization.contains("status="));
	}

	#[test]
	fn header_values_are_percent_encoded() {
		let signed = OAuthSigner
			.sign_with("GET", &url(), &[], &credentials(), NONCE, TIMESTAMP)
			.expect("Signing should succeed.");
		let encoded = percent_encode(&signed.signature);

		assert!(signed.authorization.contains(&format!("oauth_signature=\"{encoded}\"")));
	}

	#[test]
	fn consumer_only_credentials_omit_token() {
		let creds = Credentials::new("key", "secret").expect("Credential fixture should be valid.");
		let signed = OAuthSigner
			.sign_with("GET", &url(), &[], &creds, NONCE, TIMESTAMP)
			.expect("Signing should succeed.");

		assert!(signed.oauth_params.iter().all(|(k, _)| k != "oauth_token"));
	}

	#[test]
	fn url_query_takes_part_in_signature() {
		let creds = credentials();
		let with_query = Url::parse("https://api.twitter.com/1.1/statuses/update.json?include_entities=true")
			.expect("Fixture URL should parse.");
		let explicit = vec![("include_entities".to_owned(), "true".to_owned())];
		let from_query = OAuthSigner
			.sign_with("GET", &with_query, &[], &creds, NONCE, TIMESTAMP)
			.expect("Signing should succeed.");
		let from_params = OAuthSigner
			.sign_with("GET", &url(), &explicit, &creds, NONCE, TIMESTAMP)
			.expect("Signing should succeed.");

		assert_eq!(from_query.signature, from_params.signature);
	}

	#[test]
	fn colliding_parameter_is_rejected() {
		let params = vec![("oauth_nonce".to_owned(), "mine".to_owned())];
		let err = OAuthSigner
			.sign_with("GET", &url(), &params, &credentials(), NONCE, TIMESTAMP)
			.expect_err("Colliding parameter should be rejected.");

		assert_eq!(err.code, ErrorCode::InvalidParameter);

		let signature = vec![("oauth_signature".to_owned(), "forged".to_owned())];

		assert!(check_request_params(&signature).is_err());
		assert!(check_request_params(&[("format".to_owned(), "json".to_owned())]).is_ok());
	}

	#[test]
	fn nonce_is_hex_and_unique() {
		let a = generate_nonce();
		let b = generate_nonce();

		assert_eq!(a.len(), NONCE_BYTES * 2);
		assert!(a.bytes().all(|c| c.is_ascii_hexdigit()));
		assert_ne!(a, b);
	}
}
