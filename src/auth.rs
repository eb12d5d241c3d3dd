//! Credential model: redacted secrets, storage keys, and issued credential pairs.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
