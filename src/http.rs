//! Transport primitives for authenticated service calls.
//!
//! The module exposes [`ApiTransport`] as the client's only dependency on an HTTP
//! stack: implementations execute one [`ApiRequest`] and hand back the raw status
//! and body as an [`ApiResponse`]. Retry behavior lives one layer up in
//! [`RateLimitedTransport`](retry::RateLimitedTransport); transports stay dumb so
//! custom stacks can plug in without re-implementing the rate-limit contract.

pub mod retry;

pub use retry::{RateLimitedTransport, RetryPolicy};

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, auth::TokenSecret, error::TransportError};

/// Boxed future returned by [`ApiTransport::execute`].
pub type TransportFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing service calls.
///
/// Implementations must be `Send + Sync` so one transport can back every concurrent
/// operation; the returned futures own their request data so callers can box and
/// retry them freely.
pub trait ApiTransport
where
	Self: Send + Sync,
{
	/// Executes a single request and returns the raw response.
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_, ApiResponse>;
}

/// HTTP method subset used by the document endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiMethod {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PATCH.
	Patch,
	/// HTTP DELETE.
	Delete,
}
impl ApiMethod {
	/// Returns the method's wire name.
	pub const fn as_str(self) -> &'static str {
		match self {
			ApiMethod::Get => "GET",
			ApiMethod::Post => "POST",
			ApiMethod::Patch => "PATCH",
			ApiMethod::Delete => "DELETE",
		}
	}
}
impl Display for ApiMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One outbound service request.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: ApiMethod,
	/// Fully assembled request URL including query parameters.
	pub url: Url,
	/// Bearer credential attached as the `Authorization` header.
	pub bearer: Option<TokenSecret>,
	/// Optional JSON request body.
	pub body: Option<serde_json::Value>,
}
impl ApiRequest {
	/// Creates a request without credential or body.
	pub fn new(method: ApiMethod, url: Url) -> Self {
		Self { method, url, bearer: None, body: None }
	}

	/// Attaches a bearer credential.
	pub fn with_bearer(mut self, bearer: TokenSecret) -> Self {
		self.bearer = Some(bearer);

		self
	}

	/// Attaches a JSON body.
	pub fn with_body(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}
}

/// Raw response produced by an [`ApiTransport`].
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns the body as lossily-decoded UTF-8 for diagnostics.
	pub fn body_preview(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

#[derive(Debug, Deserialize)]
struct VendorCodeProbe {
	#[serde(default)]
	code: i64,
}

/// Best-effort peek at the vendor code in a response body.
pub(crate) fn probe_vendor_code(response: &ApiResponse) -> Option<i64> {
	serde_json::from_slice::<VendorCodeProbe>(&response.body).ok().map(|probe| probe.code)
}

/// Strictly decodes a JSON response body, reporting the failing path on mismatch.
pub(crate) fn decode_json<T>(response: &ApiResponse) -> Result<T, crate::error::DecodeError>
where
	T: serde::de::DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(&response.body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| crate::error::DecodeError::Envelope { source, status: response.status })
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
/// Configure any custom [`ReqwestClient`] with the timeouts and proxies the deployment
/// needs; the client passes it through untouched.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn execute(&self, request: ApiRequest) -> TransportFuture<'_, ApiResponse> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				ApiMethod::Get => reqwest::Method::GET,
				ApiMethod::Post => reqwest::Method::POST,
				ApiMethod::Patch => reqwest::Method::PATCH,
				ApiMethod::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, request.url.clone());

			if let Some(bearer) = &request.bearer {
				builder = builder.bearer_auth(bearer.expose());
			}
			if let Some(body) = &request.body {
				builder = builder.json(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(ApiResponse { status, body })
		})
	}
}
