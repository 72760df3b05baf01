//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{AppId, Credential},
	store::{CredentialStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<AppId, Credential>>>;

/// Thread-safe storage backend that keeps the credential in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	fn save_now(map: StoreMap, app_id: AppId, credential: Credential) -> Result<(), StoreError> {
		map.write().insert(app_id, credential);

		Ok(())
	}

	fn load_now(map: StoreMap, app_id: AppId) -> Option<Credential> {
		map.read().get(&app_id).cloned()
	}

	fn clear_now(map: StoreMap, app_id: AppId) {
		map.write().remove(&app_id);
	}
}
impl CredentialStore for MemoryStore {
	fn save(&self, app_id: AppId, credential: Credential) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::save_now(map, app_id, credential) })
	}

	fn load<'a>(&'a self, app_id: &'a AppId) -> StoreFuture<'a, Option<Credential>> {
		let map = self.0.clone();
		let app_id = app_id.to_owned();

		Box::pin(async move { Ok(Self::load_now(map, app_id)) })
	}

	fn clear<'a>(&'a self, app_id: &'a AppId) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let app_id = app_id.to_owned();

		Box::pin(async move {
			Self::clear_now(map, app_id);

			Ok(())
		})
	}
}
