#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use feishu_docs_client::{
	_preludet::*,
	auth::Credential,
	error::AuthError,
	service::ServiceDescriptor,
	store::{CredentialStore, MemoryStore},
};

const APP_ID: &str = "cli_lifecycle";
const APP_SECRET: &str = "secret-lifecycle";

fn build_descriptor(server: &MockServer) -> ServiceDescriptor {
	ServiceDescriptor::builder()
		.authorization_endpoint(
			Url::parse(&server.url("/authorize"))
				.expect("Mock authorize endpoint should parse successfully."),
		)
		.token_endpoint(
			Url::parse(&server.url("/oauth/token"))
				.expect("Mock token endpoint should parse successfully."),
		)
		.api_base(
			Url::parse(&server.url("/open-apis/"))
				.expect("Mock API base should parse successfully."),
		)
		.build()
		.expect("Service descriptor should build successfully.")
}

fn build_credential(access: &str, refresh: Option<&str>, expires_in: Duration) -> Credential {
	let issued = OffsetDateTime::now_utc() - Duration::minutes(5);
	let mut builder = Credential::builder()
		.access_token(access)
		.issued_at(issued)
		.expires_at(issued + expires_in);

	if let Some(refresh) = refresh {
		builder = builder.refresh_token(refresh);
	}

	builder.build().expect("Credential fixture should build successfully.")
}

async fn seed_credential(store: &MemoryStore, credential: Credential) {
	let app_id = feishu_docs_client::auth::AppId::new(APP_ID)
		.expect("App identifier fixture should be valid.");

	store.save(app_id, credential).await.expect("Failed to seed credential into the store.");
}

#[tokio::test]
async fn valid_token_refreshes_expired_credential() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (authority, store) = build_test_authority(descriptor, APP_ID, APP_SECRET);

	seed_credential(&store, build_credential("u-stale", Some("r-stale"), Duration::minutes(1)))
		.await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.json_body_includes(r#"{"grant_type":"refresh_token","refresh_token":"r-stale"}"#);
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"code\":0,\"msg\":\"success\",\"access_token\":\"u-fresh\",\"refresh_token\":\"r-fresh\",\"token_type\":\"Bearer\",\"expires_in\":7200}",
				);
		})
		.await;
	let credential =
		authority.valid_token().await.expect("Refresh of an expired credential should succeed.");

	mock.assert_async().await;

	assert!(credential.is_fresh());
	assert_eq!(credential.access_token.expose(), "u-fresh");

	let app_id = feishu_docs_client::auth::AppId::new(APP_ID)
		.expect("App identifier fixture should be valid.");
	let stored = store
		.load(&app_id)
		.await
		.expect("Credential store load should succeed.")
		.expect("Refreshed credential should be persisted.");

	assert_eq!(stored.access_token.expose(), "u-fresh");
	assert_eq!(
		stored.refresh_token.as_ref().map(|secret| secret.expose()),
		Some("r-fresh"),
	);
}

#[tokio::test]
async fn refresh_singleflight_hits_endpoint_once() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (authority, store) = build_test_authority(descriptor, APP_ID, APP_SECRET);

	seed_credential(
		&store,
		build_credential("u-expiring", Some("r-expiring"), Duration::minutes(1)),
	)
	.await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"code\":0,\"msg\":\"success\",\"access_token\":\"u-singleflight\",\"refresh_token\":\"r-singleflight\",\"token_type\":\"Bearer\",\"expires_in\":7200}",
				);
		})
		.await;
	let (first, second, third) = tokio::join!(
		authority.valid_token(),
		authority.valid_token(),
		authority.valid_token(),
	);
	let first = first.expect("First concurrent token request should succeed.");
	let second = second.expect("Second concurrent token request should succeed.");
	let third = third.expect("Third concurrent token request should succeed.");

	assert_eq!(first.access_token.expose(), "u-singleflight");
	assert_eq!(second.access_token.expose(), "u-singleflight");
	assert_eq!(third.access_token.expose(), "u-singleflight");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn fresh_credential_is_served_without_network() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (authority, store) = build_test_authority(descriptor, APP_ID, APP_SECRET);

	seed_credential(&store, build_credential("u-fresh", Some("r-fresh"), Duration::hours(2)))
		.await;

	let credential =
		authority.valid_token().await.expect("Persisted fresh credential should be served.");

	assert_eq!(credential.access_token.expose(), "u-fresh");
	assert!(credential.is_fresh());
	assert_eq!(authority.metrics().refreshes(), 0);
}

#[tokio::test]
async fn expired_credential_without_refresh_token_requires_authorization() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (authority, store) = build_test_authority(descriptor, APP_ID, APP_SECRET);

	seed_credential(&store, build_credential("u-dead", None, Duration::minutes(1))).await;

	let err = authority
		.valid_token()
		.await
		.expect_err("An expired credential without a refresh token cannot be refreshed.");

	assert!(matches!(err, Error::Auth(AuthError::Expired)));
}

#[tokio::test]
async fn rejected_refresh_clears_the_stored_credential() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (authority, store) = build_test_authority(descriptor, APP_ID, APP_SECRET);

	seed_credential(&store, build_credential("u-revoked", Some("r-revoked"), Duration::minutes(1)))
		.await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"code\":20037,\"msg\":\"invalid refresh token\"}");
		})
		.await;
	let err = authority
		.valid_token()
		.await
		.expect_err("A rejected refresh token should surface as terminal.");

	assert!(matches!(err, Error::Auth(AuthError::RefreshRejected)));

	mock.assert_async().await;

	let app_id = feishu_docs_client::auth::AppId::new(APP_ID)
		.expect("App identifier fixture should be valid.");

	assert!(
		store
			.load(&app_id)
			.await
			.expect("Credential store load should succeed.")
			.is_none(),
		"A rejected refresh token must clear the persisted credential.",
	);

	// The next caller must be told to re-authorize instead of retrying the refresh.
	let err = authority.valid_token().await.expect_err("No credential should remain.");

	assert!(matches!(err, Error::Auth(AuthError::Expired)));
	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn unreachable_token_endpoint_is_bounded() {
	let descriptor = ServiceDescriptor::builder()
		.authorization_endpoint(
			Url::parse("https://127.0.0.1:9/authorize").expect("Endpoint should parse."),
		)
		.token_endpoint(
			Url::parse("https://127.0.0.1:9/oauth/token").expect("Endpoint should parse."),
		)
		.api_base(Url::parse("https://127.0.0.1:9/open-apis/").expect("Endpoint should parse."))
		.build()
		.expect("Service descriptor should build successfully.");
	let (authority, store) = build_test_authority(descriptor, APP_ID, APP_SECRET);

	seed_credential(&store, build_credential("u-stale", Some("r-stale"), Duration::minutes(1)))
		.await;

	let err = authority
		.valid_token()
		.await
		.expect_err("An unreachable token endpoint should exhaust its retries.");

	match err {
		Error::Auth(AuthError::Unreachable { attempts }) => assert_eq!(attempts, 3),
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn complete_authorization_exchanges_and_persists() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (authority, store) = build_test_authority(descriptor, APP_ID, APP_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.json_body_includes(
					r#"{"grant_type":"authorization_code","code":"auth-code-1"}"#,
				);
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"code\":0,\"msg\":\"success\",\"access_token\":\"u-initial\",\"refresh_token\":\"r-initial\",\"token_type\":\"Bearer\",\"expires_in\":7200}",
				);
		})
		.await;
	let credential = authority
		.complete_authorization("auth-code-1")
		.await
		.expect("Authorization code exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(credential.access_token.expose(), "u-initial");
	assert!(credential.is_fresh());

	let app_id = feishu_docs_client::auth::AppId::new(APP_ID)
		.expect("App identifier fixture should be valid.");
	let stored = store
		.load(&app_id)
		.await
		.expect("Credential store load should succeed.")
		.expect("Exchanged credential should be persisted.");

	assert_eq!(stored.access_token.expose(), "u-initial");

	// Subsequent token requests reuse the exchanged credential without networking.
	let reused = authority.valid_token().await.expect("Cached credential should be served.");

	assert_eq!(reused.access_token.expose(), "u-initial");
	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn begin_authorization_builds_the_consent_url() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (authority, _store) = build_test_authority(descriptor, APP_ID, APP_SECRET);
	let request =
		authority.begin_authorization().expect("Consent URL construction should succeed.");
	let query: std::collections::HashMap<_, _> = request.url.query_pairs().into_owned().collect();

	assert_eq!(query.get("client_id").map(String::as_str), Some(APP_ID));
	assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
	assert_eq!(
		query.get("scope").map(String::as_str),
		Some("docs:doc drive:drive docx:document"),
	);
	assert_eq!(query.get("state").map(String::as_str), Some(request.state.as_str()));
	assert!(request.url.as_str().starts_with(&server.url("/authorize")));
}

#[tokio::test]
async fn app_access_token_parses_the_envelope() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (authority, _store) = build_test_authority(descriptor, APP_ID, APP_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/open-apis/auth/v3/app_access_token/internal")
				.json_body_includes(format!(r#"{{"app_id":"{APP_ID}"}}"#));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"code\":0,\"msg\":\"ok\",\"app_access_token\":\"a-app\",\"expire\":7200}");
		})
		.await;
	let token =
		authority.app_access_token().await.expect("App access token exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(token.app_access_token.expose(), "a-app");
	assert!(token.expires_at > OffsetDateTime::now_utc());
}
