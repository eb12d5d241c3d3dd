//! Client-level error types shared across the augmentor, coordinator, transports, and stores.

// crates.io
use ::http::StatusCode;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error surfaced by [`ApiClient`](crate::client::ApiClient) calls.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Remote API answered with a non-success status.
	#[error(transparent)]
	Status(#[from] StatusError),
	/// Credential renewal failed; the session has been torn down.
	#[error(transparent)]
	Renewal(#[from] RenewalError),
	/// Response body could not be decoded into the requested type.
	#[error(transparent)]
	Decode(#[from] DecodeError),
}
impl Error {
	/// Returns the HTTP status carried by [`Error::Status`], if any.
	pub fn status(&self) -> Option<StatusCode> {
		match self {
			Self::Status(e) => Some(e.status),
			_ => None,
		}
	}

	/// Returns `true` when the failure is the stale-credential signal (HTTP 401).
	pub fn is_unauthorized(&self) -> bool {
		self.status() == Some(StatusCode::UNAUTHORIZED)
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request timeout cannot be represented by the transport.
	#[error("Request timeout must be a non-negative duration.")]
	InvalidTimeout,
	/// Route path does not start with `/`.
	#[error("The {field} path must start with '/': {path}.")]
	InvalidPath {
		/// Which configured path failed validation.
		field: &'static str,
		/// Offending value.
		path: String,
	},
	/// Credential validity horizon is zero or negative.
	#[error("The {field} horizon must be positive.")]
	NonPositiveTtl {
		/// Which horizon failed validation.
		field: &'static str,
	},
	/// Request path and origin cannot form a valid URL.
	#[error("Request URL is invalid.")]
	InvalidUrl {
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

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Request URL that failed.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded the transport timeout.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// Request URL that timed out.
		url: String,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: &Url, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { url: url.to_string(), source: Box::new(src) }
	}
}

/// Non-success HTTP response returned by the remote API.
#[derive(Clone, Debug, ThisError)]
#[error("{method} {path} failed with status {status}.")]
pub struct StatusError {
	/// Method of the failed request.
	pub method: ::http::Method,
	/// Caller-facing path of the failed request.
	pub path: String,
	/// HTTP status returned by the server.
	pub status: StatusCode,
	/// Raw response body, kept so callers can surface server messages.
	pub body: String,
}

/// Renewal exchange failures. Cloned to every caller waiting on the same exchange.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RenewalError {
	/// No renewal token is stored; the session cannot be renewed.
	#[error("No refresh token is available; the session has ended.")]
	MissingRefreshToken,
	/// Renewal endpoint answered with a non-success status.
	#[error("Refresh endpoint rejected the renewal with status {status}.")]
	Rejected {
		/// HTTP status returned by the renewal endpoint.
		status: u16,
	},
	/// Renewal endpoint answered but did not grant a new token.
	#[error("Refresh endpoint declined to issue a new access token.")]
	Declined,
	/// Renewal endpoint answered with a body that does not match the expected shape.
	#[error("Refresh endpoint returned a malformed body: {message}.")]
	Malformed {
		/// Parsing failure summary, including the JSON path when available.
		message: String,
	},
	/// Renewal exchange failed at the transport layer.
	#[error("Refresh request failed: {message}.")]
	Transport {
		/// Transport failure summary.
		message: String,
	},
	/// Fresh credentials could not be persisted.
	#[error("Refreshed credentials could not be stored: {message}.")]
	Storage {
		/// Store failure summary.
		message: String,
	},
	/// The caller driving the renewal was dropped before it finished.
	#[error("Credential renewal was interrupted before completion.")]
	Interrupted,
}

/// Response body decoding failure.
#[derive(Debug, ThisError)]
#[error("Response body could not be decoded at `{path}`.")]
pub struct DecodeError {
	/// JSON path where decoding stopped.
	pub path: String,
	/// Underlying serde failure.
	#[source]
	pub source: serde_json::Error,
}
impl From<serde_path_to_error::Error<serde_json::Error>> for DecodeError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self { path, source: e.into_inner() }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn status_error(status: StatusCode) -> Error {
		StatusError {
			method: ::http::Method::GET,
			path: "/orders".into(),
			status,
			body: String::new(),
		}
		.into()
	}

	#[test]
	fn unauthorized_detection_only_matches_401() {
		assert!(status_error(StatusCode::UNAUTHORIZED).is_unauthorized());
		assert!(!status_error(StatusCode::FORBIDDEN).is_unauthorized());
		assert!(!Error::from(RenewalError::Declined).is_unauthorized());
	}

	#[test]
	fn status_error_message_names_route() {
		let err = status_error(StatusCode::NOT_FOUND);

		assert_eq!(err.to_string(), "GET /orders failed with status 404 Not Found.");
	}

	#[test]
	fn decode_error_keeps_json_path() {
		#[derive(Debug, Deserialize)]
		struct Order {
			#[allow(dead_code)]
			total: u32,
		}

		let mut de = serde_json::Deserializer::from_str("{\"total\":\"ten\"}");
		let err = serde_path_to_error::deserialize::<_, Order>(&mut de)
			.expect_err("A string total should fail to decode.");
		let err = DecodeError::from(err);

		assert_eq!(err.path, "total");
	}
}
