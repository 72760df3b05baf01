//! Persistence contracts and built-in stores for the cached credential blob.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{AppId, Credential},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the credential blob.
///
/// The credential is opaque to the store: implementations serialize whatever the
/// authority hands them and return it unchanged, keyed by app id so a blob written
/// by a different app registration is never replayed.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the credential for the provided app.
	fn save(&self, app_id: AppId, credential: Credential) -> StoreFuture<'_, ()>;

	/// Fetches the credential associated with the app, if present.
	fn load<'a>(&'a self, app_id: &'a AppId) -> StoreFuture<'a, Option<Credential>>;

	/// Removes any credential associated with the app.
	fn clear<'a>(&'a self, app_id: &'a AppId) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_serializes_for_diagnostics() {
		let payload = serde_json::to_string(&StoreError::Backend { message: "boom".into() })
			.expect("StoreError should serialize to JSON.");

		assert!(payload.contains("boom"));
	}

	#[test]
	fn store_error_converts_into_client_error() {
		let err: Error = StoreError::Serialization { message: "bad blob".into() }.into();

		assert!(matches!(err, Error::Storage(_)));
	}
}
