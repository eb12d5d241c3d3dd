//! Single-flight credential renewal with a waiter queue and bounded replays.
//!
//! Every failed call is handed to [`RefreshCoordinator::on_failure`]. Failures that are not
//! the stale-credential signal (HTTP 401), and 401s on exempt routes, pass through untouched.
//! The first eligible 401 makes its caller the *initiator*: it flips the coordinator into
//! [`RefreshPhase::Refreshing`], exchanges the stored refresh token for a new bearer token,
//! persists it, and then releases every caller that queued up behind it while the exchange was
//! in flight. Each released caller replays its request exactly once with the new token. When
//! the exchange fails, every waiter is rejected with the same [`RenewalError`] and the session
//! is torn down. A 401 for a request sent with a bearer token that has since been replaced is
//! replayed with the stored token directly.
//!
//! The phase check, the transition into `Refreshing`, and the enqueue happen in one critical
//! section, and the queue is drained in the same critical section that returns the phase to
//! `Idle`. No lock is held across an `.await`.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use ::http::{Method, header::AUTHORIZATION};
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	augment::{RequestAugmentor, resolve_url},
	auth::{CredentialKey, CredentialPair, TokenSecret},
	config::SessionConfig,
	error::RenewalError,
	http::{ApiRequest, ApiResponse, HttpTransport, PreparedRequest, bearer_header},
	obs::{self, CallOutcome, CallSpan, CallStage},
	session::{self, Navigator},
	store::CredentialStore,
};

type RenewalOutcome = Result<TokenSecret, RenewalError>;

/// Renewal state of a coordinator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshPhase {
	/// No renewal exchange is in flight.
	#[default]
	Idle,
	/// One caller is renewing; every other stale caller queues.
	Refreshing,
}

/// A caller suspended until the in-flight renewal settles. Resolving hands it the new bearer
/// token to replay with; rejecting hands it the renewal failure.
#[derive(Debug)]
struct PendingCall {
	resume: oneshot::Sender<RenewalOutcome>,
}
impl PendingCall {
	fn resolve(self, token: &TokenSecret) {
		// A dropped receiver means the caller gave up; nothing to deliver.
		let _ = self.resume.send(Ok(token.clone()));
	}

	fn reject(self, error: &RenewalError) {
		let _ = self.resume.send(Err(error.clone()));
	}
}

#[derive(Debug, Default)]
struct RefreshState {
	phase: RefreshPhase,
	queue: Vec<PendingCall>,
}

enum Disposition {
	PassThrough,
	Teardown,
	Renew,
}

enum Admission<'a> {
	Wait(oneshot::Receiver<RenewalOutcome>),
	Initiate(RefreshCycle<'a>),
}

/// Ownership of one renewal cycle. Settling it drains the queue and returns the phase to
/// `Idle` atomically; dropping it unsettled rejects every waiter with
/// [`RenewalError::Interrupted`].
struct RefreshCycle<'a> {
	state: &'a Mutex<RefreshState>,
	settled: bool,
}
impl RefreshCycle<'_> {
	fn resolve(mut self, token: &TokenSecret) {
		for call in self.settle() {
			call.resolve(token);
		}
	}

	fn reject(mut self, error: &RenewalError) {
		for call in self.settle() {
			call.reject(error);
		}
	}

	fn settle(&mut self) -> Vec<PendingCall> {
		let mut state = self.state.lock();

		self.settled = true;
		state.phase = RefreshPhase::Idle;

		std::mem::take(&mut state.queue)
	}
}
impl Drop for RefreshCycle<'_> {
	fn drop(&mut self) {
		if !self.settled {
			for call in self.settle() {
				call.reject(&RenewalError::Interrupted);
			}
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenewalResponse {
	status: bool,
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	refresh_token: Option<String>,
}
impl RenewalResponse {
	fn into_pair(self) -> Result<CredentialPair, RenewalError> {
		if !self.status {
			return Err(RenewalError::Declined);
		}

		let access_token = self
			.access_token
			.filter(|token| !token.trim().is_empty())
			.ok_or_else(|| RenewalError::Malformed { message: "accessToken is missing".into() })?;
		let refresh_token =
			self.refresh_token.filter(|token| !token.trim().is_empty()).map(TokenSecret::new);

		Ok(CredentialPair { access_token: TokenSecret::new(access_token), refresh_token })
	}
}

/// Sole authority for detecting stale credentials and running one renewal at a time.
///
/// The coordinator also owns the plain request pipeline (augment, execute, classify) so
/// replays travel the same path as first attempts, while the renewal exchange itself goes
/// straight to the transport.
pub struct RefreshCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	store: Arc<dyn CredentialStore>,
	navigator: Arc<dyn Navigator>,
	augmentor: RequestAugmentor,
	config: SessionConfig,
	state: Mutex<RefreshState>,
	metrics: Arc<RefreshMetrics>,
}
impl<T> RefreshCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an idle coordinator.
	pub fn new(
		transport: Arc<T>,
		store: Arc<dyn CredentialStore>,
		navigator: Arc<dyn Navigator>,
		augmentor: RequestAugmentor,
		config: SessionConfig,
	) -> Self {
		Self {
			transport,
			store,
			navigator,
			augmentor,
			config,
			state: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Returns the current renewal phase.
	pub fn phase(&self) -> RefreshPhase {
		self.state.lock().phase
	}

	/// Returns how many callers are waiting on the in-flight renewal.
	pub fn pending_len(&self) -> usize {
		self.state.lock().queue.len()
	}

	/// Returns the renewal counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns the session configuration.
	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Returns the credential store.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}

	/// Sends `request` and, on failure, lets the coordinator decide between pass-through,
	/// queueing, and renewal.
	pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		const STAGE: CallStage = CallStage::Request;

		let span = CallSpan::new(STAGE, &request.path);

		obs::record_call_outcome(STAGE, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				match self.dispatch_recorded(&mut request).await {
					Ok(response) => Ok(response),
					Err(failure) => self.on_failure(request, failure).await,
				}
			})
			.await;

		obs::record_call_outcome(STAGE, CallOutcome::of(&result));

		result
	}

	/// Runs one request through the augmentor and transport without any failure handling.
	pub async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let prepared = self.augmentor.augment(request).await?;

		self.send(request, prepared).await
	}

	/// Handles one failed call.
	///
	/// Resolves with the replayed response when a renewal (this caller's or another's)
	/// succeeds, and otherwise with the terminal failure.
	pub async fn on_failure(&self, request: ApiRequest, failure: Error) -> Result<ApiResponse> {
		match self.classify(&request, &failure) {
			Disposition::PassThrough => return Err(failure),
			Disposition::Teardown => {
				#[cfg(feature = "tracing")]
				tracing::warn!(route = %request.path, "replayed request rejected again; ending session");

				self.end_session().await;

				return Err(failure);
			},
			Disposition::Renew => {},
		}

		if let Some(token) = self.superseding_token(&request).await {
			#[cfg(feature = "tracing")]
			tracing::debug!(route = %request.path, "bearer token already renewed; replaying");

			return self.replay(request, &token).await;
		}

		match self.admit(&request) {
			Admission::Wait(resume) => self.wait_and_replay(request, resume).await,
			Admission::Initiate(cycle) => self.renew_and_replay(request, failure, cycle).await,
		}
	}

	/// Ends the session: clears both credentials and redirects to the login route.
	pub async fn end_session(&self) {
		self.metrics.record_teardown();
		session::teardown(self.store.as_ref(), self.navigator.as_ref(), &self.config.login_path)
			.await;
	}

	/// Like [`Self::dispatch`], but remembers which credential the request went out with.
	async fn dispatch_recorded(&self, request: &mut ApiRequest) -> Result<ApiResponse> {
		let prepared = self.augmentor.augment(request).await?;

		request.record_sent(&prepared);

		self.send(request, prepared).await
	}

	async fn send(&self, request: &ApiRequest, prepared: PreparedRequest) -> Result<ApiResponse> {
		let response = self.transport.execute(prepared).await?;

		if response.is_success() {
			Ok(response)
		} else {
			Err(request.status_error(&response).into())
		}
	}

	/// Returns the stored bearer token if it is no longer the one `request` was sent with.
	///
	/// A 401 for a request that left before the last renewal finished is answered with a
	/// replay instead of a second renewal. Caller-pinned credentials are never substituted.
	async fn superseding_token(&self, request: &ApiRequest) -> Option<TokenSecret> {
		if request.headers.contains_key(AUTHORIZATION) {
			return None;
		}

		let sent = request.sent_authorization()?;
		let current = self.store.get(CredentialKey::AccessToken).await.ok().flatten()?;

		if current.is_blank() || bearer_header(&current) == *sent { None } else { Some(current) }
	}

	fn classify(&self, request: &ApiRequest, failure: &Error) -> Disposition {
		if !failure.is_unauthorized() || self.config.is_exempt(&request.path) {
			Disposition::PassThrough
		} else if request.is_retried() {
			Disposition::Teardown
		} else {
			Disposition::Renew
		}
	}

	fn admit(&self, _request: &ApiRequest) -> Admission<'_> {
		let mut state = self.state.lock();

		match state.phase {
			RefreshPhase::Refreshing => {
				let (resume, wait) = oneshot::channel();

				state.queue.push(PendingCall { resume });
				self.metrics.record_queued();

				#[cfg(feature = "tracing")]
				tracing::debug!(route = %_request.path, queued = state.queue.len(), "waiting on renewal");

				Admission::Wait(wait)
			},
			RefreshPhase::Idle => {
				state.phase = RefreshPhase::Refreshing;

				Admission::Initiate(RefreshCycle { state: &self.state, settled: false })
			},
		}
	}

	async fn wait_and_replay(
		&self,
		request: ApiRequest,
		resume: oneshot::Receiver<RenewalOutcome>,
	) -> Result<ApiResponse> {
		match resume.await {
			Ok(Ok(token)) => self.replay(request, &token).await,
			Ok(Err(e)) => Err(e.into()),
			Err(_) => Err(RenewalError::Interrupted.into()),
		}
	}

	async fn renew_and_replay(
		&self,
		request: ApiRequest,
		failure: Error,
		cycle: RefreshCycle<'_>,
	) -> Result<ApiResponse> {
		const STAGE: CallStage = CallStage::Renewal;

		let span = CallSpan::new(STAGE, &self.config.refresh_path);

		obs::record_call_outcome(STAGE, CallOutcome::Attempt);
		self.metrics.record_attempt();

		match span.instrument(self.renew()).await {
			Ok(token) => {
				obs::record_call_outcome(STAGE, CallOutcome::Success);
				self.metrics.record_success();
				cycle.resolve(&token);

				self.replay(request, &token).await
			},
			Err(e) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(error = %e, "credential renewal failed; ending session");

				obs::record_call_outcome(STAGE, CallOutcome::Failure);
				self.metrics.record_failure();
				self.end_session().await;
				cycle.reject(&e);

				match e {
					RenewalError::MissingRefreshToken => Err(failure),
					e => Err(e.into()),
				}
			},
		}
	}

	/// Exchanges the stored refresh token for a new bearer token and persists the result.
	///
	/// Goes straight to the transport: a failing renewal must never re-enter `on_failure`.
	async fn renew(&self) -> RenewalOutcome {
		let refresh_token = self
			.store
			.get(CredentialKey::RefreshToken)
			.await
			.map_err(|e| RenewalError::Storage { message: e.to_string() })?
			.filter(|token| !token.is_blank())
			.ok_or(RenewalError::MissingRefreshToken)?;
		let url = resolve_url(&self.augmentor.origin(), &self.config.refresh_path, &[])
			.map_err(|e| RenewalError::Transport { message: e.to_string() })?;
		let request = PreparedRequest::new(Method::POST, url)
			.with_json(&serde_json::json!({ "refreshToken": refresh_token.expose() }));
		let response = self
			.transport
			.execute(request)
			.await
			.map_err(|e| RenewalError::Transport { message: e.to_string() })?;

		if !response.is_success() {
			return Err(RenewalError::Rejected { status: response.status.as_u16() });
		}

		let pair = response
			.json::<RenewalResponse>()
			.map_err(|e| RenewalError::Malformed { message: e.to_string() })?
			.into_pair()?;

		session::persist(self.store.as_ref(), &self.config, &pair)
			.await
			.map_err(|e| RenewalError::Storage { message: e.to_string() })?;

		#[cfg(feature = "tracing")]
		tracing::info!(rotated = pair.refresh_token.is_some(), "credentials renewed");

		Ok(pair.access_token)
	}

	/// Replays `request` once with `token`. A second 401 ends the session.
	async fn replay(&self, request: ApiRequest, token: &TokenSecret) -> Result<ApiResponse> {
		const STAGE: CallStage = CallStage::Replay;

		let replay = request.replay_with(token);
		let span = CallSpan::new(STAGE, &replay.path);

		self.metrics.record_replay();
		obs::record_call_outcome(STAGE, CallOutcome::Attempt);

		match span.instrument(self.dispatch(&replay)).await {
			Ok(response) => {
				obs::record_call_outcome(STAGE, CallOutcome::Success);

				Ok(response)
			},
			Err(failure) => {
				obs::record_call_outcome(STAGE, CallOutcome::Failure);

				if let Disposition::Teardown = self.classify(&replay, &failure) {
					self.end_session().await;
				}

				Err(failure)
			},
		}
	}
}
impl<T> Debug for RefreshCoordinator<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.lock();

		f.debug_struct("RefreshCoordinator")
			.field("phase", &state.phase)
			.field("pending", &state.queue.len())
			.field("config", &self.config)
			.finish()
	}
}
