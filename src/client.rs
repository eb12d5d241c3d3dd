//! Public entry point: one generic call surface with transparent credential renewal.

// self
use crate::{
	_prelude::*,
	augment::{OriginResolver, RequestAugmentor},
	auth::CredentialPair,
	config::SessionConfig,
	coordinator::{RefreshCoordinator, RefreshMetrics},
	http::{ApiRequest, ApiResponse, HttpTransport},
	session::{self, Navigator},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Authenticated API client shared by every caller in a session.
///
/// Cloning is cheap and every clone shares one [`RefreshCoordinator`], so concurrent callers
/// across the application coordinate on a single renewal exchange. Independent sessions
/// (for example in tests) use independent clients.
pub struct ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	coordinator: Arc<RefreshCoordinator<T>>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		store: Arc<dyn CredentialStore>,
		origin: Arc<dyn OriginResolver>,
		navigator: Arc<dyn Navigator>,
		config: SessionConfig,
		transport: impl Into<Arc<T>>,
	) -> Self {
		let augmentor = RequestAugmentor::new(store.clone(), origin);
		let coordinator =
			RefreshCoordinator::new(transport.into(), store, navigator, augmentor, config);

		Self { coordinator: Arc::new(coordinator) }
	}

	/// Sends `request`, renewing the bearer token and replaying once if it has gone stale.
	///
	/// Callers only ever see the final response or the final failure.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		self.coordinator.execute(request).await
	}

	/// Sends `request` and decodes a successful JSON body.
	pub async fn send_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: serde::de::DeserializeOwned,
	{
		Ok(self.send(request).await?.json()?)
	}

	/// Stores a credential pair issued by a login, replacing any previous session.
	pub async fn establish_session(&self, pair: CredentialPair) -> Result<()> {
		session::persist(self.coordinator.store().as_ref(), self.coordinator.config(), &pair)
			.await?;

		Ok(())
	}

	/// Ends the session the same way a failed renewal does.
	pub async fn sign_out(&self) {
		self.coordinator.end_session().await;
	}

	/// Returns the shared coordinator.
	pub fn coordinator(&self) -> &RefreshCoordinator<T> {
		&self.coordinator
	}

	/// Returns the renewal counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		self.coordinator.metrics()
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client backed by a default reqwest transport.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		origin: Arc<dyn OriginResolver>,
		navigator: Arc<dyn Navigator>,
		config: SessionConfig,
	) -> Self {
		Self::with_transport(store, origin, navigator, config, ReqwestTransport::default())
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { coordinator: self.coordinator.clone() }
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient").field("coordinator", &self.coordinator).finish()
	}
}
