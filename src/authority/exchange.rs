//! Credential-acquiring exchanges speaking the vendor's JSON token protocol.
//!
//! The token endpoints accept JSON request bodies and answer inside the same
//! `code`/`msg` envelope as every document endpoint, with the token fields inline.
//! Each mapper derives the stored expiry as issued-at plus lifetime minus a safety
//! skew so a credential handed to a caller cannot lapse mid-flight.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
// self
use crate::{
	_prelude::*,
	auth::{AppId, AppIdentity, Credential, TokenSecret},
	error::{ApiError, ConfigError},
	http::{ApiMethod, ApiRequest, ApiResponse, RateLimitedTransport},
	service::ServiceDescriptor,
};

pub(crate) const EXPIRY_SKEW: Duration = Duration::seconds(60);

const APP_TOKEN_PATH: &str = "auth/v3/app_access_token/internal";
const STATE_BYTES: usize = 24;

/// Interactive consent request handed to the hosting system.
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
	/// Fully assembled consent URL to open in the user's browser.
	pub url: Url,
	/// Random state parameter the redirect must echo back.
	pub state: String,
}

/// Short-lived app-level token minted from the app identity.
#[derive(Clone, Debug)]
pub struct AppToken {
	/// App access token secret.
	pub app_access_token: TokenSecret,
	/// Expiry instant, already shortened by the safety skew.
	pub expires_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
	code: i64,
	#[serde(default)]
	msg: String,
	access_token: Option<String>,
	refresh_token: Option<String>,
	token_type: Option<String>,
	expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AppTokenGrant {
	code: i64,
	#[serde(default)]
	msg: String,
	app_access_token: Option<String>,
	expire: Option<i64>,
}

/// Builds the consent URL with client id, redirect, scope, and a random state.
pub(crate) fn build_authorization_request(
	descriptor: &ServiceDescriptor,
	app_id: &AppId,
	redirect_uri: &Url,
	scope: Option<&str>,
) -> AuthorizationRequest {
	let mut state_bytes = [0_u8; STATE_BYTES];

	rand::rng().fill_bytes(&mut state_bytes);

	let state = URL_SAFE_NO_PAD.encode(state_bytes);
	let mut url = descriptor.endpoints.authorization.clone();

	{
		let mut pairs = url.query_pairs_mut();

		pairs
			.append_pair("client_id", app_id.as_ref())
			.append_pair("redirect_uri", redirect_uri.as_str())
			.append_pair("response_type", "code")
			.append_pair("state", &state);

		if let Some(scope) = scope.filter(|value| !value.is_empty()) {
			pairs.append_pair("scope", scope);
		}
	}

	AuthorizationRequest { url, state }
}

/// Exchanges an authorization code for the initial credential.
pub(crate) async fn exchange_authorization_code(
	transport: &RateLimitedTransport,
	descriptor: &ServiceDescriptor,
	identity: &AppIdentity,
	code: &str,
	redirect_uri: &Url,
) -> Result<Credential> {
	let body = serde_json::json!({
		"grant_type": "authorization_code",
		"client_id": identity.app_id.as_ref(),
		"client_secret": identity.app_secret.expose(),
		"code": code,
		"redirect_uri": redirect_uri.as_str(),
	});
	let request =
		ApiRequest::new(ApiMethod::Post, descriptor.endpoints.token.clone()).with_body(body);
	let response = transport.execute(request).await?;

	map_token_grant(&response)
}

/// Exchanges a refresh token for a replacement credential.
pub(crate) async fn refresh_token(
	transport: &RateLimitedTransport,
	descriptor: &ServiceDescriptor,
	identity: &AppIdentity,
	refresh_token: &str,
) -> Result<Credential> {
	let body = serde_json::json!({
		"grant_type": "refresh_token",
		"client_id": identity.app_id.as_ref(),
		"client_secret": identity.app_secret.expose(),
		"refresh_token": refresh_token,
	});
	let request =
		ApiRequest::new(ApiMethod::Post, descriptor.endpoints.token.clone()).with_body(body);
	let response = transport.execute(request).await?;

	map_token_grant(&response)
}

/// Mints an app access token from the long-lived app identity.
pub(crate) async fn app_access_token(
	transport: &RateLimitedTransport,
	descriptor: &ServiceDescriptor,
	identity: &AppIdentity,
) -> Result<AppToken> {
	let url = descriptor.endpoints.api_base.join(APP_TOKEN_PATH).map_err(|source| {
		ConfigError::InvalidApiPath { path: APP_TOKEN_PATH.into(), source }
	})?;
	let body = serde_json::json!({
		"app_id": identity.app_id.as_ref(),
		"app_secret": identity.app_secret.expose(),
	});
	let request = ApiRequest::new(ApiMethod::Post, url).with_body(body);
	let response = transport.execute(request).await?;
	let grant: AppTokenGrant = crate::http::decode_json(&response)?;

	if grant.code != 0 {
		return Err(ApiError { status: response.status, code: grant.code, message: grant.msg }
			.into());
	}

	let secret = grant
		.app_access_token
		.ok_or(ConfigError::MissingTokenField { field: "app_access_token" })?;
	let expire = grant.expire.ok_or(ConfigError::MissingTokenField { field: "expire" })?;

	if expire <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	Ok(AppToken {
		app_access_token: TokenSecret::new(secret),
		expires_at: OffsetDateTime::now_utc() + skewed_lifetime(Duration::seconds(expire)),
	})
}

fn map_token_grant(response: &ApiResponse) -> Result<Credential> {
	let grant: TokenGrant = crate::http::decode_json(response)?;

	if grant.code != 0 {
		return Err(ApiError { status: response.status, code: grant.code, message: grant.msg }
			.into());
	}

	let access_token =
		grant.access_token.ok_or(ConfigError::MissingTokenField { field: "access_token" })?;
	let expires_in =
		grant.expires_in.ok_or(ConfigError::MissingTokenField { field: "expires_in" })?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	let issued_at = OffsetDateTime::now_utc();
	let mut builder = Credential::builder()
		.access_token(access_token)
		.issued_at(issued_at)
		.expires_at(issued_at + skewed_lifetime(Duration::seconds(expires_in)));

	if let Some(refresh) = grant.refresh_token {
		builder = builder.refresh_token(refresh);
	}
	if let Some(token_type) = grant.token_type {
		builder = builder.token_type(token_type);
	}

	builder.build().map_err(|e| ConfigError::from(e).into())
}

/// Shortens a reported lifetime by the safety skew, clamped so very short
/// lifetimes are halved instead of zeroed.
pub(crate) fn skewed_lifetime(lifetime: Duration) -> Duration {
	lifetime - EXPIRY_SKEW.min(lifetime / 2)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn descriptor() -> ServiceDescriptor {
		ServiceDescriptor::feishu()
	}

	fn identity() -> AppIdentity {
		AppIdentity::new("cli_exchange", "secret").expect("Identity fixture should be valid.")
	}

	#[test]
	fn authorization_request_carries_every_parameter() {
		let redirect =
			Url::parse("http://localhost:8089/oauth/callback").expect("Redirect should parse.");
		let request = build_authorization_request(
			&descriptor(),
			&identity().app_id,
			&redirect,
			Some("docs:doc drive:drive"),
		);
		let query: HashMap<_, _> = request.url.query_pairs().into_owned().collect();

		assert_eq!(query.get("client_id").map(String::as_str), Some("cli_exchange"));
		assert_eq!(
			query.get("redirect_uri").map(String::as_str),
			Some("http://localhost:8089/oauth/callback"),
		);
		assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(query.get("scope").map(String::as_str), Some("docs:doc drive:drive"));
		assert_eq!(query.get("state").map(String::as_str), Some(request.state.as_str()));
	}

	#[test]
	fn state_is_unique_per_request() {
		let redirect =
			Url::parse("http://localhost:8089/oauth/callback").expect("Redirect should parse.");
		let first = build_authorization_request(&descriptor(), &identity().app_id, &redirect, None);
		let second =
			build_authorization_request(&descriptor(), &identity().app_id, &redirect, None);

		assert_ne!(first.state, second.state);
	}

	#[test]
	fn empty_scope_is_omitted() {
		let redirect =
			Url::parse("http://localhost:8089/oauth/callback").expect("Redirect should parse.");
		let request =
			build_authorization_request(&descriptor(), &identity().app_id, &redirect, Some(""));

		assert!(request.url.query_pairs().all(|(key, _)| key != "scope"));
	}

	#[test]
	fn token_grant_mapping_applies_the_skew() {
		let response = ApiResponse {
			status: 200,
			body: br#"{"code":0,"msg":"success","access_token":"u-fresh","refresh_token":"r-fresh","token_type":"Bearer","expires_in":7200}"#.to_vec(),
		};
		let credential =
			map_token_grant(&response).expect("Well-formed grant should map to a credential.");
		let lifetime = credential.expires_at - credential.issued_at;

		assert_eq!(credential.access_token.expose(), "u-fresh");
		assert_eq!(
			credential.refresh_token.as_ref().map(TokenSecret::expose),
			Some("r-fresh"),
		);
		assert_eq!(lifetime, Duration::seconds(7200) - EXPIRY_SKEW);
	}

	#[test]
	fn token_grant_vendor_error_preserves_the_code() {
		let response = ApiResponse {
			status: 400,
			body: br#"{"code":20037,"msg":"invalid refresh token"}"#.to_vec(),
		};
		let err = map_token_grant(&response)
			.expect_err("Vendor error envelope should surface as an error.");

		match err {
			Error::Api(api) => {
				assert_eq!(api.code, 20037);
				assert_eq!(api.status, 400);
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn token_grant_rejects_non_positive_lifetimes() {
		let response = ApiResponse {
			status: 200,
			body: br#"{"code":0,"msg":"success","access_token":"u-fresh","expires_in":0}"#
				.to_vec(),
		};

		assert!(matches!(
			map_token_grant(&response),
			Err(Error::Config(ConfigError::NonPositiveExpiresIn)),
		));
	}

	#[test]
	fn short_lifetimes_are_halved_instead_of_zeroed() {
		assert_eq!(skewed_lifetime(Duration::seconds(7200)), Duration::seconds(7140));
		assert_eq!(skewed_lifetime(Duration::seconds(30)), Duration::seconds(15));
	}
}
