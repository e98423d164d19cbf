//! RFC 3986 percent-encoding and the OAuth 1.0a canonical strings built from it.

// std
use std::fmt::Write;
// self
use crate::_prelude::*;

/// Percent-encodes `value` per RFC 3986: ASCII letters, digits, and `-._~` pass through,
/// every other byte becomes `%XX` with uppercase hex.
pub fn percent_encode(value: &str) -> String {
	let mut out = String::with_capacity(value.len());

	for byte in value.bytes() {
		if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
			out.push(byte as char);
		} else {
			let _ = write!(out, "%{byte:02X}");
		}
	}

	out
}

/// Encodes every pair, sorts by encoded key then encoded value, and joins them as
/// `key=value` with `&`.
pub fn normalize_parameters<'a, I>(params: I) -> String
where
	I: IntoIterator<Item = (&'a str, &'a str)>,
{
	let mut encoded = params
		.into_iter()
		.map(|(k, v)| (percent_encode(k), percent_encode(v)))
		.collect::<Vec<_>>();

	encoded.sort();

	let mut out = String::new();

	for (idx, (k, v)) in encoded.iter().enumerate() {
		if idx > 0 {
			out.push('&');
		}

		out.push_str(k);
		out.push('=');
		out.push_str(v);
	}

	out
}

/// Canonical base URL: scheme, host, non-default port, and path; no query or fragment.
pub fn base_url(url: &Url) -> String {
	let mut out = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());

	if let Some(port) = url.port() {
		let _ = write!(out, ":{port}");
	}

	out.push_str(url.path());

	out
}

/// `METHOD&enc(base_url)&enc(normalized_params)`, method upper-cased.
pub fn signature_base_string(method: &str, base_url: &str, normalized_params: &str) -> String {
	format!(
		"{}&{}&{}",
		method.to_ascii_uppercase(),
		percent_encode(base_url),
		percent_encode(normalized_params)
	)
}

/// `enc(consumer_secret)&enc(token_secret)`; the token half is empty for two-legged calls.
pub fn signing_key(consumer_secret: &str, token_secret: Option<&str>) -> String {
	format!("{}&{}", percent_encode(consumer_secret), percent_encode(token_secret.unwrap_or("")))
}
