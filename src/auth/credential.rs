//! Storage keys, stored entries, and issued credential pairs.

// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Names the two credentials a session keeps in its store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialKey {
	/// Short-lived bearer token attached to every request.
	AccessToken,
	/// Longer-lived token exchanged for a new bearer token.
	RefreshToken,
}
impl CredentialKey {
	/// Both keys, in teardown order.
	pub const ALL: [CredentialKey; 2] = [CredentialKey::AccessToken, CredentialKey::RefreshToken];

	/// Returns the stable storage name for the key.
	pub const fn as_str(self) -> &'static str {
		match self {
			CredentialKey::AccessToken => "accessToken",
			CredentialKey::RefreshToken => "refreshToken",
		}
	}
}
impl Display for CredentialKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A secret as persisted by a credential store, with its validity horizon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
	/// Stored secret.
	pub secret: TokenSecret,
	/// Instant after which the entry reads as absent.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl StoredCredential {
	/// Creates an entry that expires at the provided instant.
	pub fn new(secret: TokenSecret, expires_at: OffsetDateTime) -> Self {
		Self { secret, expires_at }
	}

	/// Returns `true` if the entry has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns the secret when it is still valid at `instant`.
	pub fn live_at(&self, instant: OffsetDateTime) -> Option<&TokenSecret> {
		if self.is_expired_at(instant) { None } else { Some(&self.secret) }
	}
}

/// Bearer token plus optional rotated refresh token, as issued by a login or renewal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialPair {
	/// New bearer token.
	pub access_token: TokenSecret,
	/// Rotated refresh token, when the server issued one.
	pub refresh_token: Option<TokenSecret>,
}
impl CredentialPair {
	/// Creates a pair with only a bearer token.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self { access_token: TokenSecret::new(access_token), refresh_token: None }
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(refresh_token));

		self
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn stored_credential_expires_at_boundary() {
		let now = OffsetDateTime::now_utc();
		let entry = StoredCredential::new(TokenSecret::new("t"), now + Duration::seconds(30));

		assert!(entry.live_at(now).is_some());
		assert!(entry.is_expired_at(now + Duration::seconds(30)));
		assert!(entry.live_at(now + Duration::minutes(1)).is_none());
	}

	#[test]
	fn keys_use_cookie_names() {
		assert_eq!(CredentialKey::AccessToken.to_string(), "accessToken");
		assert_eq!(CredentialKey::RefreshToken.as_str(), "refreshToken");
	}
}
