// crates.io
use time::{Duration, OffsetDateTime};
// self
use refresh_gate::{
	auth::{CredentialKey, TokenSecret},
	store::{CredentialStore, MemoryStore},
};

fn in_one_hour() -> OffsetDateTime {
	OffsetDateTime::now_utc() + Duration::hours(1)
}

#[tokio::test]
async fn set_and_get_round_trip() {
	let store = MemoryStore::default();

	store
		.set(CredentialKey::AccessToken, TokenSecret::new("access-1"), in_one_hour())
		.await
		.expect("Saving the bearer token into memory store should succeed.");

	let fetched = store
		.get(CredentialKey::AccessToken)
		.await
		.expect("Fetching the bearer token should succeed.")
		.expect("Stored bearer token should remain present.");

	assert_eq!(fetched.expose(), "access-1");
	assert!(
		store
			.get(CredentialKey::RefreshToken)
			.await
			.expect("Fetching an unset key should succeed.")
			.is_none()
	);
}

#[tokio::test]
async fn expired_entries_read_as_absent() {
	let store = MemoryStore::default();

	store
		.set(
			CredentialKey::RefreshToken,
			TokenSecret::new("refresh-old"),
			OffsetDateTime::now_utc() - Duration::seconds(1),
		)
		.await
		.expect("Saving an already expired entry should succeed.");

	let fetched = store
		.get(CredentialKey::RefreshToken)
		.await
		.expect("Fetching an expired entry should not error.");

	assert!(fetched.is_none());
	assert!(store.entry(CredentialKey::RefreshToken).is_some(), "raw entry stays until replaced");
}

#[tokio::test]
async fn set_overwrites_and_delete_removes() {
	let store = MemoryStore::default();

	for value in ["access-1", "access-2"] {
		store
			.set(CredentialKey::AccessToken, TokenSecret::new(value), in_one_hour())
			.await
			.expect("Saving the bearer token should succeed.");
	}

	let fetched = store
		.get(CredentialKey::AccessToken)
		.await
		.expect("Fetching the bearer token should succeed.")
		.expect("Overwritten bearer token should remain present.");

	assert_eq!(fetched.expose(), "access-2");

	store.delete(CredentialKey::AccessToken).await.expect("Deleting a present key should succeed.");
	store.delete(CredentialKey::AccessToken).await.expect("Deleting an absent key should succeed.");

	assert!(store.is_empty());
}

#[tokio::test]
async fn clones_share_entries_across_tasks() {
	let store = MemoryStore::default();
	let writer_a = store.clone();
	let writer_b = store.clone();
	let task_a = tokio::spawn(async move {
		writer_a
			.set(CredentialKey::AccessToken, TokenSecret::new("access-a"), in_one_hour())
			.await
			.expect("Task A should store its bearer token.")
	});
	let task_b = tokio::spawn(async move {
		writer_b
			.set(CredentialKey::RefreshToken, TokenSecret::new("refresh-b"), in_one_hour())
			.await
			.expect("Task B should store its refresh token.")
	});
	let (outcome_a, outcome_b) = tokio::join!(task_a, task_b);

	outcome_a.expect("Task A should not panic.");
	outcome_b.expect("Task B should not panic.");

	for (key, value) in
		[(CredentialKey::AccessToken, "access-a"), (CredentialKey::RefreshToken, "refresh-b")]
	{
		let fetched = store
			.get(key)
			.await
			.expect("Fetching a shared entry should succeed.")
			.expect("Entries written by clones should be visible.");

		assert_eq!(fetched.expose(), value);
	}
}
