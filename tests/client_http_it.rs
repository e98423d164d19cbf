// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
// self
use fantasy_sports_sdk::{
	_preludet::*,
	cache::CacheConfig,
	client::{ClientBuilder, ReqwestSdkClient},
	error::ErrorCode,
	rate_limit::{BucketConfig, RateLimitConfig},
};

const STANDINGS: &str = "/league/423.l.1/standings";

fn builder(server: &MockServer) -> ClientBuilder {
	test_client_builder(&server.base_url())
}

fn build(builder: ClientBuilder) -> ReqwestSdkClient {
	build_reqwest_test_client(builder)
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
	pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
}

#[tokio::test]
async fn get_is_served_from_cache_on_second_call() -> Result<()> {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(STANDINGS).query_param("format", "json");
			then.status(200).header("content-type", "application/json").body("{\"ok\":true}");
		})
		.await;
	let client = build(builder(&server));
	let query = params(&[("format", "json")]);
	let first = client.get(STANDINGS, &query).await?;
	let second = client.get(STANDINGS, &query).await?;

	assert!(!first.from_cache);
	assert!(second.from_cache);
	assert_eq!(second.status, 200);
	assert_eq!(second.body, first.body);
	assert_eq!(client.cache().size(), 1);

	mock.assert_calls_async(1).await;

	client.clear_cache();

	let third = client.get(STANDINGS, &query).await?;

	assert!(!third.from_cache);

	mock.assert_calls_async(2).await;

	Ok(())
}

#[tokio::test]
async fn writes_are_never_cached() -> Result<()> {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/league/423.l.1/transactions");
			then.status(201).body("created");
		})
		.await;
	let client = build(builder(&server));

	for _ in 0..2 {
		let response = client
			.post("/league/423.l.1/transactions", &[], Some(b"{\"type\":\"add\"}".to_vec()))
			.await?;

		assert_eq!(response.status, 201);
		assert!(!response.from_cache);
	}

	mock.assert_calls_async(2).await;

	assert!(client.cache().is_empty());

	Ok(())
}

#[tokio::test]
async fn disabled_cache_always_hits_the_network() -> Result<()> {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(STANDINGS);
			then.status(200).body("{}");
		})
		.await;
	let client = build(builder(&server).cache(CacheConfig { enabled: false, ..Default::default() }));

	client.get(STANDINGS, &[]).await?;
	client.get(STANDINGS, &[]).await?;

	mock.assert_calls_async(2).await;

	assert!(client.cache().is_empty());

	Ok(())
}

#[tokio::test]
async fn upstream_throttling_is_retryable_with_hint() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path(STANDINGS);
			then.status(429).header("retry-after", "30").header("x-request-id", "req-42").body("slow down");
		})
		.await;
	let client = build(builder(&server));
	let err = client.get(STANDINGS, &[]).await.expect_err("429 should surface as an error.");

	assert_eq!(err.code(), ErrorCode::RateLimited);
	assert!(err.is_retryable());

	let api = err.as_api().expect("429 should map onto an API error.");

	assert_eq!(api.status, Some(429));
	assert_eq!(api.retry_after, Some(Duration::seconds(30)));
	assert_eq!(api.request_id.as_deref(), Some("req-42"));
	assert_eq!(api.details.as_deref(), Some("slow down"));
	assert!(client.cache().is_empty());
}

#[tokio::test]
async fn unauthorized_carries_oauth_problem() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(GET).path(STANDINGS);
			then.status(401)
				.header("www-authenticate", "OAuth oauth_problem=\"token_expired\"")
				.body("Unauthorized");
		})
		.await;
	let client = build(builder(&server));
	let err = client.get(STANDINGS, &[]).await.expect_err("401 should surface as an error.");

	assert_eq!(err.code(), ErrorCode::Unauthorized);
	assert!(!err.is_retryable());

	let api = err.as_api().expect("401 should map onto an API error.");

	assert_eq!(api.oauth_problem.as_deref(), Some("token_expired"));
	assert_eq!(api.oauth_problem_code(), Some(ErrorCode::TokenExpired));
}

#[tokio::test]
async fn status_codes_map_onto_the_taxonomy() {
	let server = MockServer::start_async().await;
	let _missing = server
		.mock_async(|when, then| {
			when.method(GET).path("/team/missing");
			then.status(404).body("not here");
		})
		.await;
	let _down = server
		.mock_async(|when, then| {
			when.method(GET).path("/team/down");
			then.status(503);
		})
		.await;
	let _teapot = server
		.mock_async(|when, then| {
			when.method(GET).path("/team/teapot");
			then.status(418);
		})
		.await;
	let client = build(builder(&server));
	let cases = [
		("/team/missing", ErrorCode::NotFound, false),
		("/team/down", ErrorCode::ServiceUnavailable, true),
		("/team/teapot", ErrorCode::BadRequest, false),
	];

	for (endpoint, code, retryable) in cases {
		let err = client.get(endpoint, &[]).await.expect_err("Error status should fail.");

		assert_eq!(err.code(), code, "{endpoint} should map to {code}");
		assert_eq!(err.is_retryable(), retryable, "{endpoint} retryability");
	}
}

#[tokio::test]
async fn local_rate_limit_fails_fast_beyond_max_wait() -> Result<()> {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(STANDINGS);
			then.status(200).body("{}");
		})
		.await;
	let rate_limits = RateLimitConfig { api: BucketConfig::new(1., 0.01), ..Default::default() };
	let client = build(
		builder(&server)
			.rate_limits(rate_limits)
			.max_rate_limit_wait(StdDuration::ZERO)
			.cache(CacheConfig { enabled: false, ..Default::default() }),
	);

	client.get(STANDINGS, &[]).await?;

	let err = client.get(STANDINGS, &[]).await.expect_err("Empty bucket should fail fast.");

	assert_eq!(err.code(), ErrorCode::RateLimited);

	let retry_after = err
		.as_api()
		.and_then(|api| api.retry_after)
		.expect("Local rate limit should report a retry hint.");

	assert!(retry_after > Duration::seconds(90));

	mock.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn refresh_installs_the_new_token_pair() -> Result<()> {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/v2/get_token")
				.query_param("oauth_session_handle", "handle-1");
			then.status(200).header("content-type", "application/x-www-form-urlencoded").body(
				"oauth_token=new-token&oauth_token_secret=new-secret&oauth_session_handle=handle-2&oauth_expires_in=3600",
			);
		})
		.await;
	let client = build(builder(&server));
	let refreshed = client.refresh_access_token("handle-1").await?;

	assert_eq!(refreshed.token, "new-token");
	assert_eq!(refreshed.session_handle.as_deref(), Some("handle-2"));
	assert_eq!(refreshed.expires_in, Some(Duration::hours(1)));

	let credentials = client.credentials();
	let access_token = credentials.access_token().expect("Refreshed token should be installed.");

	assert_eq!(access_token.token, "new-token");
	assert_eq!(access_token.secret.expose(), "new-secret");

	mock.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn refresh_without_token_fields_is_a_parse_error() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/v2/get_token");
			then.status(200).body("oauth_problem=nothing_here");
		})
		.await;
	let client = build(builder(&server));
	let err = client
		.refresh_access_token("handle-1")
		.await
		.expect_err("Missing token fields should fail.");

	assert_eq!(err.code(), ErrorCode::ParseError);
	assert_eq!(
		client.credentials().access_token().map(|t| t.token.as_str()),
		Some(TEST_ACCESS_TOKEN)
	);
}

#[derive(Debug, Deserialize)]
struct LeagueEnvelope {
	league: League,
}

#[derive(Debug, Deserialize)]
struct League {
	name: String,
	num_teams: u32,
}

#[tokio::test]
async fn get_json_decodes_and_reports_bad_paths() -> Result<()> {
	let server = MockServer::start_async().await;
	let _good = server
		.mock_async(|when, then| {
			when.method(GET).path("/league/good");
			then.status(200).body("{\"league\":{\"name\":\"Office\",\"num_teams\":12}}");
		})
		.await;
	let _bad = server
		.mock_async(|when, then| {
			when.method(GET).path("/league/bad");
			then.status(200).body("{\"league\":{\"name\":7,\"num_teams\":12}}");
		})
		.await;
	let client = build(builder(&server));
	let envelope = client.get_json::<LeagueEnvelope>("/league/good", &[]).await?;

	assert_eq!(envelope.league.name, "Office");
	assert_eq!(envelope.league.num_teams, 12);

	let err = client
		.get_json::<LeagueEnvelope>("/league/bad", &[])
		.await
		.expect_err("Wrong field type should fail to decode.");

	assert_eq!(err.code(), ErrorCode::ParseError);

	let details = err.as_api().and_then(|api| api.details.clone()).unwrap_or_default();

	assert!(details.contains("league.name"), "details should name the path: {details}");

	Ok(())
}
