//! Reads a document through the full stack against a mock service: seeded credential,
//! bearer injection, rate-limited transport, and envelope decoding.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::Duration;
use url::Url;
// self
use feishu_docs_client::{
	auth::{AppId, AppIdentity, Credential},
	authority::TokenAuthority,
	client::DocumentClient,
	http::{ApiTransport, ReqwestTransport},
	reqwest::Client,
	service::ServiceDescriptor,
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/open-apis/docx/v1/documents/doccnDemo");
			then.status(200).header("content-type", "application/json").body(
				"{\"code\":0,\"msg\":\"success\",\"data\":{\"document\":{\"document_id\":\"doccnDemo\",\"revision_id\":3,\"title\":\"Demo Doc\"}}}",
			);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/open-apis/docx/v1/documents/doccnDemo/raw_content");
			then.status(200).header("content-type", "application/json").body(
				"{\"code\":0,\"msg\":\"success\",\"data\":{\"content\":\"Hello from the demo.\"}}",
			);
		})
		.await;

	let descriptor = ServiceDescriptor::builder()
		.authorization_endpoint(Url::parse(&server.url("/authorize"))?)
		.token_endpoint(Url::parse(&server.url("/oauth/token"))?)
		.api_base(Url::parse(&server.url("/open-apis/"))?)
		.build()?;
	let backend = Arc::new(MemoryStore::default());
	let credential = Credential::builder()
		.access_token("demo-user-token")
		.refresh_token("demo-refresh-token")
		.expires_in(Duration::hours(2))
		.build()?;

	backend.save(AppId::new("cli_demo")?, credential).await?;

	let store: Arc<dyn CredentialStore> = backend;
	let transport: Arc<dyn ApiTransport> = Arc::new(ReqwestTransport::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	));
	let identity = AppIdentity::new("cli_demo", "demo-secret")?;
	let authority = Arc::new(TokenAuthority::new(identity, descriptor, store, transport));
	let client = DocumentClient::new(authority);
	let content = client.get_document("doccnDemo", 0).await?;

	println!("{}: {}", content.title, content.raw_content);

	Ok(())
}
