//! Outgoing request decoration: destination resolution plus bearer credential injection.

// std
use std::net::IpAddr;
// crates.io
use ::http::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, TokenSecret},
	error::ConfigError,
	http::{ApiRequest, PreparedRequest, bearer_header},
	store::CredentialStore,
};

/// Resolves the API origin for requests that do not pin one.
///
/// Resolution runs on every call, so implementations may consult runtime context that
/// changes over the life of the process.
pub trait OriginResolver
where
	Self: Send + Sync,
{
	/// Returns the origin (scheme, host, optional path prefix) to send requests to.
	fn resolve(&self) -> Url;
}

/// Always resolves to the same origin.
#[derive(Clone, Debug)]
pub struct FixedOrigin(pub Url);
impl OriginResolver for FixedOrigin {
	fn resolve(&self) -> Url {
		self.0.clone()
	}
}

/// Probe returning the host the client currently believes it is reachable at.
pub type HostProbe = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Picks a local API origin when the client runs on a loopback or private address, and the
/// public origin otherwise.
#[derive(Clone)]
pub struct HostAwareOrigin {
	/// Origin used when the probed host is local.
	pub local: Url,
	/// Origin used for every other host, including an unknown one.
	pub public: Url,
	probe: HostProbe,
}
impl HostAwareOrigin {
	/// Creates a resolver that consults `probe` on every call.
	pub fn new(local: Url, public: Url, probe: HostProbe) -> Self {
		Self { local, public, probe }
	}

	fn is_local_host(host: &str) -> bool {
		let host = host.trim_start_matches('[').trim_end_matches(']');

		if host.eq_ignore_ascii_case("localhost") {
			return true;
		}

		match host.parse::<IpAddr>() {
			Ok(IpAddr::V4(ip)) => ip.is_loopback() || ip.is_private() || ip.is_link_local(),
			Ok(IpAddr::V6(ip)) => ip.is_loopback(),
			Err(_) => false,
		}
	}
}
impl OriginResolver for HostAwareOrigin {
	fn resolve(&self) -> Url {
		match (self.probe)() {
			Some(host) if Self::is_local_host(&host) => self.local.clone(),
			_ => self.public.clone(),
		}
	}
}
impl Debug for HostAwareOrigin {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HostAwareOrigin")
			.field("local", &self.local)
			.field("public", &self.public)
			.finish_non_exhaustive()
	}
}

/// Decorates every outgoing request before it reaches the transport.
///
/// The augmentor is stateless: it reads the bearer token from the store on each call and
/// asks the [`OriginResolver`] for a destination only when the request has none.
#[derive(Clone)]
pub struct RequestAugmentor {
	store: Arc<dyn CredentialStore>,
	origin: Arc<dyn OriginResolver>,
}
impl RequestAugmentor {
	/// Creates an augmentor over the provided store and origin resolver.
	pub fn new(store: Arc<dyn CredentialStore>, origin: Arc<dyn OriginResolver>) -> Self {
		Self { store, origin }
	}

	/// Resolves the current API origin.
	pub fn origin(&self) -> Url {
		self.origin.resolve()
	}

	/// Produces the prepared request: absolute URL, serialized body, and bearer credential.
	///
	/// A store read failure leaves the request unauthenticated instead of failing it; only a
	/// path that cannot form a URL is an error.
	pub async fn augment(&self, request: &ApiRequest) -> Result<PreparedRequest, ConfigError> {
		let base = request.base.clone().unwrap_or_else(|| self.origin.resolve());
		let url = resolve_url(&base, &request.path, &request.query)?;
		let mut prepared = PreparedRequest::new(request.method.clone(), url);

		if let Some(body) = request.body.as_ref() {
			prepared = prepared.with_json(body);
		}

		prepared.headers.extend(request.headers.clone());

		let token = if prepared.headers.contains_key(AUTHORIZATION) {
			None
		} else {
			self.current_bearer().await
		};

		if let Some(token) = token {
			prepared.headers.insert(AUTHORIZATION, bearer_header(&token));
		}

		Ok(prepared)
	}

	async fn current_bearer(&self) -> Option<TokenSecret> {
		match self.store.get(CredentialKey::AccessToken).await {
			Ok(token) => token.filter(|token| !token.is_blank()),
			Err(_e) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(error = %_e, "bearer token could not be read; sending unauthenticated");

				None
			},
		}
	}
}
impl Debug for RequestAugmentor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RequestAugmentor(..)")
	}
}

/// Joins `path` onto `base` (keeping any path prefix on the base) and appends `query`.
pub(crate) fn resolve_url(
	base: &Url,
	path: &str,
	query: &[(String, String)],
) -> Result<Url, ConfigError> {
	let mut raw = base.as_str().trim_end_matches('/').to_owned();

	raw.push('/');
	raw.push_str(path.trim_start_matches('/'));

	let mut url = Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { source })?;

	if !query.is_empty() {
		url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
	}

	Ok(url)
}
