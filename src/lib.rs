//! Fantasy sports API SDK: OAuth 1.0a request signing, per-endpoint token buckets, and a TTL
//! response cache in front of a typed reqwest client.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod rate_limit;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::Credentials,
		client::{ClientBuilder, ReqwestSdkClient},
		http::ReqwestHttpClient,
	};

	/// Consumer key used by test clients.
	pub const TEST_CONSUMER_KEY: &str = "test-consumer-key";
	/// Consumer secret used by test clients.
	pub const TEST_CONSUMER_SECRET: &str = "test-consumer-secret";
	/// Access token used by test clients.
	pub const TEST_ACCESS_TOKEN: &str = "test-access-token";
	/// Access token secret used by test clients.
	pub const TEST_ACCESS_SECRET: &str = "test-access-secret";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Credentials carrying the fixed test consumer and access-token pairs.
	pub fn test_credentials() -> Credentials {
		Credentials::new(TEST_CONSUMER_KEY, TEST_CONSUMER_SECRET)
			.and_then(|c| c.with_access_token(TEST_ACCESS_TOKEN, TEST_ACCESS_SECRET))
			.expect("Failed to build test credentials.")
	}

	/// Builder pointed at `base_url` for both the API and the token endpoint, with plain HTTP
	/// allowed.
	pub fn test_client_builder(base_url: &str) -> ClientBuilder {
		ClientBuilder::new(test_credentials())
			.base_url(base_url)
			.auth_base_url(base_url)
			.allow_insecure(true)
	}

	/// Builds a reqwest-backed client against a mock server.
	pub fn build_reqwest_test_client(builder: ClientBuilder) -> ReqwestSdkClient {
		builder
			.build_with_http_client(test_reqwest_http_client())
			.expect("Failed to build test client.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
