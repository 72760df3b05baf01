//! Walks through constructing the interactive consent URL and completing the code
//! exchange the redirect handler would later perform.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use url::Url;
// self
use feishu_docs_client::{
	auth::AppIdentity,
	authority::TokenAuthority,
	service::ServiceDescriptor,
	store::{CredentialStore, FileStore},
};

fn main() -> Result<()> {
	color_eyre::install()?;

	let store_path = std::env::temp_dir().join("feishu_docs_demo_tokens.json");
	let store: Arc<dyn CredentialStore> = Arc::new(FileStore::open(&store_path)?);
	let identity = AppIdentity::new("cli_demo", "demo-secret")?;
	let authority = TokenAuthority::reqwest(identity, ServiceDescriptor::feishu(), store)
		.with_redirect_uri(Url::parse("http://localhost:8089/oauth/callback")?)
		.with_scope("docs:doc drive:drive docx:document");
	let request = authority.begin_authorization()?;

	println!("Send your user to {}.", &request.url);
	println!("Expect the redirect to echo state `{}`.", &request.state);
	println!(
		"When the callback fires, pass the received code to complete_authorization; the \
		 credential lands in {}.",
		store_path.display(),
	);

	Ok(())
}
