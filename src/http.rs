//! Request/response types and the transport contract the client dispatches through.
//!
//! Callers describe calls with [`ApiRequest`] (method, path, query, JSON body, headers).
//! The [`RequestAugmentor`](crate::augment::RequestAugmentor) turns that description into a
//! [`PreparedRequest`] with an absolute URL and credentials, and an [`HttpTransport`]
//! executes it. Transports return every HTTP response as an [`ApiResponse`]; status
//! classification happens in the client so custom transports stay trivial.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{DecodeError, StatusError, TransportError},
};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing prepared requests.
///
/// Implementations must resolve with an [`ApiResponse`] for every HTTP answer, including
/// 4xx/5xx, and reserve [`TransportError`] for failures where no response was received.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes the request and returns the raw response.
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_>;
}

/// Caller-facing description of an API call.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Route path relative to the API origin, e.g. `/orders`.
	pub path: String,
	/// Explicit origin; when absent the augmentor resolves one per call.
	pub base: Option<Url>,
	/// Query parameters appended to the URL.
	pub query: Vec<(String, String)>,
	/// JSON payload.
	pub body: Option<serde_json::Value>,
	/// Extra headers. An explicit `Authorization` header wins over the stored credential.
	pub headers: HeaderMap,
	retried: bool,
	sent_authorization: Option<HeaderValue>,
}
impl ApiRequest {
	/// Creates a request for `method` + `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			base: None,
			query: Vec::new(),
			body: None,
			headers: HeaderMap::new(),
			retried: false,
			sent_authorization: None,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Pins the request to an explicit origin.
	pub fn with_base(mut self, base: Url) -> Self {
		self.base = Some(base);

		self
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.push((key.into(), value.to_string()));

		self
	}

	/// Sets the JSON payload.
	pub fn json(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Returns `true` once the request has been replayed after a renewal.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	/// Marks the request as replayed so it is never renewed for twice.
	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}

	/// Remembers the `Authorization` value the request actually went out with.
	pub(crate) fn record_sent(&mut self, prepared: &PreparedRequest) {
		self.sent_authorization = prepared.headers.get(AUTHORIZATION).cloned();
	}

	/// Returns the `Authorization` value recorded by [`Self::record_sent`].
	pub(crate) fn sent_authorization(&self) -> Option<&HeaderValue> {
		self.sent_authorization.as_ref()
	}

	/// Clones the request for a replay carrying `token`.
	pub(crate) fn replay_with(&self, token: &TokenSecret) -> Self {
		let mut replay = self.clone();

		replay.mark_retried();
		replay.headers.insert(AUTHORIZATION, bearer_header(token));

		replay
	}

	/// Builds the error returned when the server answers with a non-success status.
	pub(crate) fn status_error(&self, response: &ApiResponse) -> StatusError {
		StatusError {
			method: self.method.clone(),
			path: self.path.clone(),
			status: response.status,
			body: response.text(),
		}
	}
}

/// Fully resolved request handed to an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct PreparedRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL, query included.
	pub url: Url,
	/// Final header set.
	pub headers: HeaderMap,
	/// Serialized body bytes.
	pub body: Option<Vec<u8>>,
}
impl PreparedRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None }
	}

	/// Serializes `value` as the JSON body and sets the content type.
	pub fn with_json(mut self, value: &serde_json::Value) -> Self {
		self.body = Some(value.to_string().into_bytes());
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		self
	}

	/// Returns the `Authorization` header value, if any.
	pub fn authorization(&self) -> Option<&str> {
		self.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
	}
}

/// Raw HTTP response.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response with the provided status and body.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns the body as lossy UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T, DecodeError>
	where
		T: DeserializeOwned,
	{
		let mut de = serde_json::Deserializer::from_slice(&self.body);

		Ok(serde_path_to_error::deserialize(&mut de)?)
	}
}

/// Builds a sensitive `Authorization: Bearer …` header value.
pub(crate) fn bearer_header(token: &TokenSecret) -> HeaderValue {
	let mut value = HeaderValue::from_str(&token.bearer())
		.unwrap_or_else(|_| HeaderValue::from_static("Bearer"));

	value.set_sensitive(true);

	value
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client whose requests (renewal exchange included) time out after `timeout`.
	pub fn with_timeout(timeout: Duration) -> Result<Self, crate::error::ConfigError> {
		let timeout = std::time::Duration::try_from(timeout)
			.map_err(|_| crate::error::ConfigError::InvalidTimeout)?;
		let client = ReqwestClient::builder().timeout(timeout).build()?;

		Ok(Self(client))
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
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let PreparedRequest { method, url, headers, body } = request;
			let mut builder = self.0.request(method, url.clone()).headers(headers);

			if let Some(body) = body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(|e| map_reqwest_error(&url, e))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(|e| map_reqwest_error(&url, e))?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(url: &Url, e: ReqwestError) -> TransportError {
	if e.is_timeout() {
		TransportError::Timeout { url: url.to_string() }
	} else {
		TransportError::network(url, e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn replay_marks_request_and_overrides_authorization() {
		let request = ApiRequest::get("/orders")
			.query("page", 2)
			.header(AUTHORIZATION, HeaderValue::from_static("Bearer old"));
		let replay = request.replay_with(&TokenSecret::new("fresh"));

		assert!(!request.is_retried());
		assert!(replay.is_retried());
		assert_eq!(
			replay.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
			Some("Bearer fresh")
		);
		assert_eq!(replay.query, vec![("page".to_string(), "2".to_string())]);
	}

	#[test]
	fn bearer_header_is_redacted_in_debug() {
		let value = bearer_header(&TokenSecret::new("secret"));

		assert!(value.is_sensitive());
		assert!(!format!("{value:?}").contains("secret"));
	}

	#[test]
	fn json_decoding_reports_path() {
		#[derive(Debug, Deserialize)]
		struct Page {
			#[allow(dead_code)]
			items: Vec<u32>,
		}

		let response = ApiResponse::new(StatusCode::OK, "{\"items\":[1,\"x\"]}");
		let err = response.json::<Page>().expect_err("Mixed array should fail to decode.");

		assert_eq!(err.path, "items[1]");
	}
}
