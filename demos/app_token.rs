//! Demonstrates minting an app access token against a mock service with the default
//! reqwest transport and in-memory credential store.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use feishu_docs_client::{
	auth::AppIdentity,
	authority::TokenAuthority,
	http::{ApiTransport, ReqwestTransport},
	reqwest::Client,
	service::ServiceDescriptor,
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/open-apis/auth/v3/app_access_token/internal");
			then.status(200).header("content-type", "application/json").body(
				"{\"code\":0,\"msg\":\"ok\",\"app_access_token\":\"demo-app-token\",\"expire\":7200}",
			);
		})
		.await;
	let descriptor = ServiceDescriptor::builder()
		.authorization_endpoint(Url::parse(&server.url("/authorize"))?)
		.token_endpoint(Url::parse(&server.url("/oauth/token"))?)
		.api_base(Url::parse(&server.url("/open-apis/"))?)
		.build()?;
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let transport: Arc<dyn ApiTransport> = Arc::new(ReqwestTransport::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	));
	let identity = AppIdentity::new("cli_demo", "demo-secret")?;
	let authority = TokenAuthority::new(identity, descriptor, store, transport);
	let token = authority.app_access_token().await?;

	println!("App access token: {}.", token.app_access_token.expose());
	println!("Valid until: {}.", token.expires_at);

	token_mock.assert_async().await;

	Ok(())
}
