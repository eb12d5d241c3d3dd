//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, StoredCredential, TokenSecret},
	store::{CredentialStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<CredentialKey, StoredCredential>>>;

/// Thread-safe storage backend that keeps credentials in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns the raw entry under `key`, ignoring expiry.
	pub fn entry(&self, key: CredentialKey) -> Option<StoredCredential> {
		self.0.read().get(&key).cloned()
	}

	/// Returns `true` when no entries remain.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn get_now(map: StoreMap, key: CredentialKey, now: OffsetDateTime) -> Option<TokenSecret> {
		map.read().get(&key).and_then(|entry| entry.live_at(now).cloned())
	}

	fn set_now(map: StoreMap, key: CredentialKey, entry: StoredCredential) -> Result<(), StoreError> {
		map.write().insert(key, entry);

		Ok(())
	}

	fn delete_now(map: StoreMap, key: CredentialKey) -> Result<(), StoreError> {
		map.write().remove(&key);

		Ok(())
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(map, key, OffsetDateTime::now_utc())) })
	}

	fn set(
		&self,
		key: CredentialKey,
		secret: TokenSecret,
		expires_at: OffsetDateTime,
	) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::set_now(map, key, StoredCredential::new(secret, expires_at)) })
	}

	fn delete(&self, key: CredentialKey) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::delete_now(map, key) })
	}
}
