//! Storage contracts for principals and refresh credentials, plus the in-memory backend.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Email, NewPrincipal, Principal, PrincipalId, RefreshCredential},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Record store consulted by every flow.
///
/// Refresh credentials are keyed by owning principal: at most one row per principal exists, and
/// the token value is a secondary unique index.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches a principal by id.
	fn principal(&self, id: PrincipalId) -> StoreFuture<'_, Option<Principal>>;

	/// Fetches a principal by case-folded email.
	fn principal_by_email<'a>(&'a self, email: &'a Email) -> StoreFuture<'a, Option<Principal>>;

	/// Inserts a principal, enforcing handle and email uniqueness atomically.
	fn insert_principal(&self, principal: NewPrincipal) -> StoreFuture<'_, InsertOutcome>;

	/// Overwrites an existing principal; returns `None` if it no longer exists.
	fn update_principal(&self, principal: Principal) -> StoreFuture<'_, Option<Principal>>;

	/// Deletes a principal. Credentials owned by the principal are left untouched.
	fn delete_principal(&self, id: PrincipalId) -> StoreFuture<'_, bool>;

	/// Looks up a credential by exact token value.
	fn credential<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshCredential>>;

	/// Looks up the credential owned by `principal`.
	fn credential_for(&self, principal: PrincipalId) -> StoreFuture<'_, Option<RefreshCredential>>;

	/// Replaces whatever credential the owner holds with `credential` in one atomic step,
	/// returning the displaced row.
	fn replace_credential(
		&self,
		credential: RefreshCredential,
	) -> StoreFuture<'_, Option<RefreshCredential>>;

	/// Swaps the owner's credential for `replacement` only if the current token equals
	/// `expected`.
	fn rotate_credential<'a>(
		&'a self,
		expected: &'a str,
		replacement: RefreshCredential,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;

	/// Marks the credential matching `token` as revoked at `instant`.
	fn revoke_credential<'a>(
		&'a self,
		token: &'a str,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<RefreshCredential>>;

	/// Deletes the credential matching `token`; returns whether a row was removed.
	fn delete_credential<'a>(&'a self, token: &'a str) -> StoreFuture<'a, bool>;

	/// Deletes the credential owned by `principal`; returns whether a row was removed.
	fn delete_credential_for(&self, principal: PrincipalId) -> StoreFuture<'_, bool>;
}

/// Result of a refresh-credential compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The token matched the expected value and the row was replaced.
	Updated,
	/// The owner holds a different token (rotated concurrently).
	RefreshMismatch,
	/// The owner holds no credential (revoked or never issued).
	Missing,
}

/// Result of a principal insertion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
	/// The principal was stored with a fresh id.
	Inserted(Principal),
	/// Another principal already holds the handle.
	HandleTaken,
	/// Another principal already holds the email.
	EmailTaken,
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// The record could not be materialized from its stored shape.
	#[error("Invalid record: {message}.")]
	InvalidRecord {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn compare_and_swap_outcome_serializes_by_name() {
		let payload = serde_json::to_string(&CompareAndSwapOutcome::RefreshMismatch)
			.expect("CompareAndSwapOutcome should serialize to JSON.");

		assert_eq!(payload, "\"RefreshMismatch\"");
	}
}
