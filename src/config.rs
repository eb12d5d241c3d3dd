//! Session configuration: renewal/login routes, exempt routes, and credential horizons.

// self
use crate::{_prelude::*, error::ConfigError};

/// Route prefixes where a 401 means "bad credentials", not "expired credentials".
pub const DEFAULT_EXEMPT_PREFIXES: [&str; 5] =
	["/login", "/register", "/forget-password", "/reset-password", "/otp-verify"];

/// Validated settings shared by the augmentor and the refresh coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
	/// Renewal endpoint path, joined onto the resolved origin.
	pub refresh_path: String,
	/// Location the navigator is sent to on session teardown.
	pub login_path: String,
	/// Route prefixes that never trigger a renewal.
	pub exempt_prefixes: Vec<String>,
	/// Validity horizon applied to a freshly stored bearer token.
	pub access_ttl: Duration,
	/// Validity horizon applied to a freshly stored refresh token.
	pub refresh_ttl: Duration,
}
impl SessionConfig {
	/// Returns a builder seeded with the storefront defaults.
	pub fn builder() -> SessionConfigBuilder {
		SessionConfigBuilder::default()
	}

	/// Returns `true` if `path` falls under an exempt prefix.
	pub fn is_exempt(&self, path: &str) -> bool {
		let path = path_only(path);

		self.exempt_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
	}

	fn validate(&self) -> Result<(), ConfigError> {
		validate_path("refresh", &self.refresh_path)?;
		validate_path("login", &self.login_path)?;

		for prefix in &self.exempt_prefixes {
			validate_path("exempt", prefix)?;
		}

		validate_ttl("access", self.access_ttl)?;
		validate_ttl("refresh", self.refresh_ttl)?;

		Ok(())
	}
}
impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			refresh_path: "/auth/refresh".into(),
			login_path: "/login".into(),
			exempt_prefixes: DEFAULT_EXEMPT_PREFIXES.iter().map(|p| p.to_string()).collect(),
			access_ttl: Duration::days(1),
			refresh_ttl: Duration::days(7),
		}
	}
}

/// Builder for [`SessionConfig`] values.
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
	config: SessionConfig,
}
impl SessionConfigBuilder {
	/// Overrides the renewal endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.config.refresh_path = path.into();

		self
	}

	/// Overrides the teardown redirect location.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.config.login_path = path.into();

		self
	}

	/// Adds one exempt route prefix.
	pub fn exempt_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.config.exempt_prefixes.push(prefix.into());

		self
	}

	/// Replaces the exempt route prefixes.
	pub fn exempt_prefixes<I, S>(mut self, prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.config.exempt_prefixes = prefixes.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the bearer token horizon.
	pub fn access_ttl(mut self, ttl: Duration) -> Self {
		self.config.access_ttl = ttl;

		self
	}

	/// Overrides the refresh token horizon.
	pub fn refresh_ttl(mut self, ttl: Duration) -> Self {
		self.config.refresh_ttl = ttl;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<SessionConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

fn path_only(path: &str) -> &str {
	path.split(['?', '#']).next().unwrap_or(path)
}

fn validate_path(field: &'static str, path: &str) -> Result<(), ConfigError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ConfigError::InvalidPath { field, path: path.to_owned() })
	}
}

fn validate_ttl(field: &'static str, ttl: Duration) -> Result<(), ConfigError> {
	if ttl.is_positive() { Ok(()) } else { Err(ConfigError::NonPositiveTtl { field }) }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_cover_auth_entry_routes() {
		let config = SessionConfig::builder().build().expect("Defaults should validate.");

		assert!(config.is_exempt("/login"));
		assert!(config.is_exempt("/reset-password/abc?x=1"));
		assert!(config.is_exempt("/otp-verify"));
		assert!(!config.is_exempt("/orders"));
		assert!(!config.is_exempt("/auth/me"));
		assert_eq!(config.refresh_path, "/auth/refresh");
		assert_eq!(config.access_ttl, Duration::days(1));
	}

	#[test]
	fn builder_rejects_relative_paths_and_non_positive_ttls() {
		let err = SessionConfig::builder()
			.refresh_path("auth/refresh")
			.build()
			.expect_err("Relative refresh path should be rejected.");

		assert!(matches!(err, ConfigError::InvalidPath { field: "refresh", .. }));

		let err = SessionConfig::builder()
			.exempt_prefixes(["/login", "signup"])
			.build()
			.expect_err("Relative exempt prefix should be rejected.");

		assert!(matches!(err, ConfigError::InvalidPath { field: "exempt", .. }));

		let err = SessionConfig::builder()
			.access_ttl(Duration::ZERO)
			.build()
			.expect_err("Zero access horizon should be rejected.");

		assert!(matches!(err, ConfigError::NonPositiveTtl { field: "access" }));
	}

	#[test]
	fn custom_prefixes_extend_defaults() {
		let config = SessionConfig::builder()
			.exempt_prefix("/auth/social")
			.build()
			.expect("Custom prefix should validate.");

		assert!(config.is_exempt("/auth/social/google"));
		assert!(config.is_exempt("/register"));
	}
}
