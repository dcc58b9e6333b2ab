// self
use homestead_auth::{
	_preludet::*,
	auth::{Email, Handle, NewPrincipal, PrincipalId, RefreshCredential, TokenSecret},
	store::{CompareAndSwapOutcome, CredentialStore, InsertOutcome, MemoryStore},
};

fn credential(principal: PrincipalId, token: &str) -> RefreshCredential {
	let issued_at = OffsetDateTime::now_utc();

	RefreshCredential::new(
		principal,
		TokenSecret::new(token),
		issued_at,
		issued_at + Duration::days(7),
	)
}

#[tokio::test]
async fn replacing_keeps_one_row_per_principal() {
	let store = MemoryStore::default();
	let principal = seed_principal(&store, "jane", "jane@example.com", None).await;

	let displaced = store
		.replace_credential(credential(principal.id, "first"))
		.await
		.expect("Replace should succeed.");

	assert!(displaced.is_none());

	let displaced = store
		.replace_credential(credential(principal.id, "second"))
		.await
		.expect("Replace should succeed.")
		.expect("The first credential should be displaced.");

	assert_eq!(displaced.token.expose(), "first");
	assert_eq!(store.credential_count(), 1);
	assert!(store.credential("first").await.expect("Lookup should succeed.").is_none());

	let current = store.credential_for(principal.id).await.expect("Lookup should succeed.");

	assert_eq!(current.map(|c| c.token.expose().to_owned()), Some("second".into()));
}

#[tokio::test]
async fn compare_and_swap_admits_one_winner() {
	let store = MemoryStore::default();
	let principal = seed_principal(&store, "jane", "jane@example.com", None).await;

	store
		.replace_credential(credential(principal.id, "shared"))
		.await
		.expect("Replace should succeed.");

	let first = store
		.rotate_credential("shared", credential(principal.id, "device-a"))
		.await
		.expect("Rotation should succeed.");
	let second = store
		.rotate_credential("shared", credential(principal.id, "device-b"))
		.await
		.expect("Rotation should succeed.");

	assert_eq!(first, CompareAndSwapOutcome::Updated);
	assert_eq!(second, CompareAndSwapOutcome::RefreshMismatch);
	assert!(store.credential("device-a").await.expect("Lookup should succeed.").is_some());
	assert!(store.credential("device-b").await.expect("Lookup should succeed.").is_none());

	store.delete_credential_for(principal.id).await.expect("Delete should succeed.");

	let missing = store
		.rotate_credential("device-a", credential(principal.id, "device-c"))
		.await
		.expect("Rotation should succeed.");

	assert_eq!(missing, CompareAndSwapOutcome::Missing);
	assert_eq!(store.credential_count(), 0);
}

#[tokio::test]
async fn inserts_enforce_handle_and_email_uniqueness() {
	let store = MemoryStore::default();

	seed_principal(&store, "jane", "jane@example.com", None).await;

	let handle = Handle::new("jane").expect("Handle fixture should be valid.");
	let email = Email::new("other@example.com").expect("Email fixture should be valid.");
	let outcome = store
		.insert_principal(NewPrincipal::federated(handle, email, "sub-1".into()))
		.await
		.expect("Insert should succeed.");

	assert_eq!(outcome, InsertOutcome::HandleTaken);

	let handle = Handle::new("janet").expect("Handle fixture should be valid.");
	let email = Email::new("JANE@example.com").expect("Email fixture should be valid.");
	let outcome = store
		.insert_principal(NewPrincipal::federated(handle, email, "sub-2".into()))
		.await
		.expect("Insert should succeed.");

	assert_eq!(outcome, InsertOutcome::EmailTaken);
}

#[tokio::test]
async fn revoking_marks_the_row_and_deleting_principals_leaves_credentials() {
	let store = MemoryStore::default();
	let principal = seed_principal(&store, "jane", "jane@example.com", None).await;

	store
		.replace_credential(credential(principal.id, "value"))
		.await
		.expect("Replace should succeed.");

	let revoked = store
		.revoke_credential("value", OffsetDateTime::now_utc())
		.await
		.expect("Revoke should succeed.")
		.expect("The credential should exist.");

	assert!(revoked.revoked_at.is_some());
	assert!(store.delete_principal(principal.id).await.expect("Delete should succeed."));
	assert!(store.principal(principal.id).await.expect("Lookup should succeed.").is_none());
	assert_eq!(store.credential_count(), 1);
	assert!(store.delete_credential("value").await.expect("Delete should succeed."));
	assert!(!store.delete_credential("value").await.expect("Delete should succeed."));
}
