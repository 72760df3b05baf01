//! Simple file-backed [`CredentialStore`] for CLIs and bots that survive restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{AppId, Credential},
	store::{CredentialStore, StoreError, StoreFuture},
};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Snapshot {
	app_id: AppId,
	credential: Credential,
}

/// Persists the credential blob to a JSON file after each mutation.
///
/// The snapshot records which app wrote it; loading under a different app id
/// returns nothing instead of replaying a foreign credential.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Option<Snapshot>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { None };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<Option<Snapshot>, StoreError> {
		if !path.exists() {
			return Ok(None);
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let snapshot: Snapshot =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(Some(snapshot))
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize credential snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn remove_file(&self) -> Result<(), StoreError> {
		if self.path.exists() {
			fs::remove_file(&self.path).map_err(|e| StoreError::Backend {
				message: format!("Failed to remove {}: {e}", self.path.display()),
			})?;
		}

		Ok(())
	}
}
impl CredentialStore for FileStore {
	fn save(&self, app_id: AppId, credential: Credential) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let snapshot = Snapshot { app_id, credential };
			let mut guard = self.inner.write();

			self.persist_locked(&snapshot)?;
			*guard = Some(snapshot);

			Ok(())
		})
	}

	fn load<'a>(&'a self, app_id: &'a AppId) -> StoreFuture<'a, Option<Credential>> {
		Box::pin(async move {
			let guard = self.inner.read();

			Ok(guard
				.as_ref()
				.filter(|snapshot| &snapshot.app_id == app_id)
				.map(|snapshot| snapshot.credential.clone()))
		})
	}

	fn clear<'a>(&'a self, app_id: &'a AppId) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if guard.as_ref().is_some_and(|snapshot| &snapshot.app_id == app_id) {
				*guard = None;

				self.remove_file()?;
			}

			Ok(())
		})
	}
}
