//! Rust’s turnkey Feishu/Lark docs client—single-flight token refresh, rate-limit-aware
//! transport, and cursor pagination in one crate built for production.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod authority;
pub mod client;
pub mod error;
pub mod http;
pub mod obs;
pub mod service;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::AppIdentity,
		authority::TokenAuthority,
		client::DocumentClient,
		http::{ApiTransport, ReqwestTransport},
		service::ServiceDescriptor,
		store::{CredentialStore, MemoryStore},
	};

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Constructs a [`TokenAuthority`] backed by an in-memory store and the insecure reqwest
	/// transport used across integration tests.
	pub fn build_test_authority(
		descriptor: ServiceDescriptor,
		app_id: &str,
		app_secret: &str,
	) -> (Arc<TokenAuthority>, Arc<MemoryStore>) {
		let identity = AppIdentity::new(app_id, app_secret)
			.expect("Failed to build app identity fixture for tests.");
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let transport: Arc<dyn ApiTransport> = Arc::new(test_reqwest_transport());
		let redirect = Url::parse("http://localhost:8089/oauth/callback")
			.expect("Failed to parse test redirect URI.");
		let authority = Arc::new(
			TokenAuthority::new(identity, descriptor, store, transport)
				.with_redirect_uri(redirect)
				.with_scope("docs:doc drive:drive docx:document"),
		);

		(authority, store_backend)
	}

	/// Constructs a [`DocumentClient`] wired to a fresh test authority.
	pub fn build_test_client(
		descriptor: ServiceDescriptor,
		app_id: &str,
		app_secret: &str,
	) -> (DocumentClient, Arc<TokenAuthority>, Arc<MemoryStore>) {
		let (authority, store_backend) = build_test_authority(descriptor, app_id, app_secret);
		let client = DocumentClient::new(authority.clone());

		(client, authority, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
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
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
#[cfg(test)] use feishu_docs_client as _;
