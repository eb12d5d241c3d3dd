//! Navigation contract, credential persistence, and session teardown.

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, CredentialPair},
	config::SessionConfig,
	store::{CredentialStore, StoreError},
};

/// Side-effecting hook that moves the user agent to another location.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Redirects the user agent to `location`.
	fn redirect(&self, location: &str);
}

/// Navigator backed by a closure.
pub struct FnNavigator<F>(pub F)
where
	F: Fn(&str) + Send + Sync;
impl<F> Navigator for FnNavigator<F>
where
	F: Fn(&str) + Send + Sync,
{
	fn redirect(&self, location: &str) {
		(self.0)(location)
	}
}
impl<F> Debug for FnNavigator<F>
where
	F: Fn(&str) + Send + Sync,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FnNavigator(..)")
	}
}

/// Navigator that records every redirect, for headless hosts and tests that poll for
/// "login required".
#[derive(Clone, Debug, Default)]
pub struct RecordingNavigator(Arc<Mutex<Vec<String>>>);
impl RecordingNavigator {
	/// Returns every location redirected to so far, oldest first.
	pub fn history(&self) -> Vec<String> {
		self.0.lock().clone()
	}

	/// Returns the most recent location, if any.
	pub fn last(&self) -> Option<String> {
		self.0.lock().last().cloned()
	}
}
impl Navigator for RecordingNavigator {
	fn redirect(&self, location: &str) {
		self.0.lock().push(location.to_owned());
	}
}

/// Stores a freshly issued pair with the configured validity horizons.
///
/// The bearer token is written first; the refresh token is only replaced when the server
/// rotated it.
pub(crate) async fn persist(
	store: &dyn CredentialStore,
	config: &SessionConfig,
	pair: &CredentialPair,
) -> Result<(), StoreError> {
	let now = OffsetDateTime::now_utc();

	store.set(CredentialKey::AccessToken, pair.access_token.clone(), now + config.access_ttl).await?;

	if let Some(refresh) = pair.refresh_token.as_ref() {
		store.set(CredentialKey::RefreshToken, refresh.clone(), now + config.refresh_ttl).await?;
	}

	Ok(())
}

/// Clears both credentials, then redirects to `login_path`.
///
/// Best-effort: a failed delete is logged and does not stop the remaining steps.
pub(crate) async fn teardown(
	store: &dyn CredentialStore,
	navigator: &dyn Navigator,
	login_path: &str,
) {
	for key in CredentialKey::ALL {
		if let Err(_e) = store.delete(key).await {
			#[cfg(feature = "tracing")]
			tracing::warn!(key = key.as_str(), error = %_e, "credential could not be deleted");
		}
	}

	#[cfg(feature = "tracing")]
	tracing::info!(location = login_path, "session ended; redirecting");

	navigator.redirect(login_path);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::TokenSecret,
		store::{MemoryStore, StoreError, StoreFuture},
	};

	struct BrokenStore;
	impl CredentialStore for BrokenStore {
		fn get(&self, _key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>> {
			Box::pin(async { Ok(None) })
		}

		fn set(
			&self,
			_key: CredentialKey,
			_secret: TokenSecret,
			_expires_at: OffsetDateTime,
		) -> StoreFuture<'_, ()> {
			Box::pin(async { Ok(()) })
		}

		fn delete(&self, _key: CredentialKey) -> StoreFuture<'_, ()> {
			Box::pin(async { Err(StoreError::Backend { message: "read-only".into() }) })
		}
	}

	#[tokio::test]
	async fn teardown_clears_store_and_redirects() {
		let store = MemoryStore::default();
		let navigator = RecordingNavigator::default();
		let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);

		for key in CredentialKey::ALL {
			store
				.set(key, TokenSecret::new("x"), expires_at)
				.await
				.expect("Seeding credentials should succeed.");
		}

		teardown(&store, &navigator, "/login").await;

		assert!(store.is_empty());
		assert_eq!(navigator.history(), vec!["/login".to_string()]);
	}

	#[tokio::test]
	async fn teardown_redirects_even_when_delete_fails() {
		let navigator = RecordingNavigator::default();

		teardown(&BrokenStore, &navigator, "/login").await;

		assert_eq!(navigator.last().as_deref(), Some("/login"));
	}

	#[tokio::test]
	async fn persist_keeps_refresh_token_when_not_rotated() {
		let store = MemoryStore::default();
		let config = SessionConfig::default();
		let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);

		store
			.set(CredentialKey::RefreshToken, TokenSecret::new("R1"), expires_at)
			.await
			.expect("Seeding the refresh token should succeed.");
		persist(&store, &config, &CredentialPair::new("T2"))
			.await
			.expect("Persisting a bearer-only pair should succeed.");

		let access = store.entry(CredentialKey::AccessToken).expect("Bearer token should be stored.");
		let refresh =
			store.entry(CredentialKey::RefreshToken).expect("Refresh token should be kept.");

		assert_eq!(access.secret.expose(), "T2");
		assert!(access.expires_at > OffsetDateTime::now_utc() + Duration::hours(23));
		assert_eq!(refresh.secret.expose(), "R1");

		persist(&store, &config, &CredentialPair::new("T3").with_refresh_token("R2"))
			.await
			.expect("Persisting a rotated pair should succeed.");

		let refresh =
			store.entry(CredentialKey::RefreshToken).expect("Refresh token should be rotated.");

		assert_eq!(refresh.secret.expose(), "R2");
		assert!(refresh.expires_at > OffsetDateTime::now_utc() + Duration::days(6));
	}

	#[test]
	fn fn_navigator_forwards_location() {
		let seen = Arc::new(Mutex::new(None));
		let sink = seen.clone();
		let navigator = FnNavigator(move |location: &str| *sink.lock() = Some(location.to_owned()));

		navigator.redirect("/login");

		assert_eq!(seen.lock().as_deref(), Some("/login"));
	}
}
