//! Consumer and access-token credentials used to sign every request.

// self
use crate::{_prelude::*, auth::Secret, error::ConfigError};

/// Access token pair issued by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
	/// Public `oauth_token` value.
	pub token: String,
	/// Secret half used in the signing key.
	pub secret: Secret,
}
impl AccessToken {
	/// Validates and wraps a token pair; both halves must be non-blank.
	pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Result<Self, ConfigError> {
		let token = token.into();
		let secret = Secret::new(secret);

		if token.trim().is_empty() || secret.is_blank() {
			return Err(ConfigError::IncompleteAccessToken);
		}

		Ok(Self { token, secret })
	}
}

/// Immutable OAuth 1.0a credentials.
///
/// Validation happens here so the signer never sees a half-built credential set. The
/// access-token pair is optional: two-legged calls sign with the consumer pair only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
	consumer_key: String,
	consumer_secret: Secret,
	access_token: Option<AccessToken>,
}
impl Credentials {
	/// Creates consumer-only credentials.
	pub fn new(
		consumer_key: impl Into<String>,
		consumer_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let consumer_key = consumer_key.into();
		let consumer_secret = Secret::new(consumer_secret);

		if consumer_key.trim().is_empty() {
			return Err(ConfigError::MissingConsumerKey);
		}
		if consumer_secret.is_blank() {
			return Err(ConfigError::MissingConsumerSecret);
		}

		Ok(Self { consumer_key, consumer_secret, access_token: None })
	}

	/// Attaches an access-token pair.
	pub fn with_access_token(
		mut self,
		token: impl Into<String>,
		secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		self.access_token = Some(AccessToken::new(token, secret)?);

		Ok(self)
	}

	/// Returns a copy carrying `access_token` in place of the current pair.
	pub fn replacing_access_token(&self, access_token: AccessToken) -> Self {
		Self {
			consumer_key: self.consumer_key.clone(),
			consumer_secret: self.consumer_secret.clone(),
			access_token: Some(access_token),
		}
	}

	/// Consumer key sent as `oauth_consumer_key`.
	pub fn consumer_key(&self) -> &str {
		&self.consumer_key
	}

	/// Consumer secret, first half of the signing key.
	pub fn consumer_secret(&self) -> &Secret {
		&self.consumer_secret
	}

	/// Current access-token pair, if any.
	pub fn access_token(&self) -> Option<&AccessToken> {
		self.access_token.as_ref()
	}
}
