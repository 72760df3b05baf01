//! Client-level error types shared across the authority, transport, and document operations.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential persistence failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Authentication lifecycle failure.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Service response could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Service reported a vendor error for the request.
	#[error(transparent)]
	Api(#[from] ApiError),

	/// Upstream throttling persisted through every local retry.
	#[error("Rate limit persisted after {retries} retries.")]
	RateLimitExceeded {
		/// Number of retries performed before giving up.
		retries: u32,
		/// Body of the final throttled response, kept for diagnostics.
		last_body: String,
	},
	/// Pagination drain exceeded the caller-supplied page cap.
	#[error("Pagination exceeded the {max_pages} page cap.")]
	PaginationLimitExceeded {
		/// Page cap that was hit.
		max_pages: u32,
	},
}

/// Authentication lifecycle failures surfaced by the token authority.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// No usable credential exists and no refresh token is available.
	#[error("Credential has expired and no refresh token is available.")]
	Expired,
	/// The service rejected the refresh token; interactive re-authorization is required.
	#[error("Refresh token was rejected; re-run the interactive authorization flow.")]
	RefreshRejected,
	/// The token endpoint stayed unreachable through every bounded retry.
	#[error("Token endpoint was unreachable after {attempts} attempts.")]
	Unreachable {
		/// Number of exchange attempts made before giving up.
		attempts: u32,
	},
}

/// Vendor-reported error response, preserved verbatim for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("Service returned error {code} (HTTP {status}): {message}.")]
pub struct ApiError {
	/// HTTP status code of the response.
	pub status: u16,
	/// Vendor error code embedded in the response envelope.
	pub code: i64,
	/// Vendor-supplied message.
	pub message: String,
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Service descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::service::ServiceDescriptorError),
	/// App identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// Credential builder validation failed.
	#[error("Unable to build credential.")]
	CredentialBuild(#[from] crate::auth::CredentialBuilderError),
	/// No redirect URI was configured for the interactive flow.
	#[error("No redirect URI is configured; call with_redirect_uri before authorizing.")]
	MissingRedirectUri,
	/// Token endpoint returned a non-positive lifetime.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint response omitted a required field.
	#[error("Token endpoint response is missing {field}.")]
	MissingTokenField {
		/// Name of the absent field.
		field: &'static str,
	},
	/// An endpoint path could not be joined onto the API base URL.
	#[error("Failed to join {path} onto the API base URL.")]
	InvalidApiPath {
		/// Relative path that failed to join.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Decoding failures for service responses.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Response body is not the JSON envelope the service documents.
	#[error("Service response contained malformed JSON.")]
	Envelope {
		/// Structured parsing failure with the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Envelope reported success but carried no data payload.
	#[error("Service response envelope is missing the data payload.")]
	MissingData {
		/// HTTP status code of the response.
		status: u16,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request timed out; completion state is unknown and the call is never retried.
	#[error("Request timed out while calling the service.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the service.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}
