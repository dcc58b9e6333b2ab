//! Thread-safe in-memory [`CredentialStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{Email, NewPrincipal, Principal, PrincipalId, RefreshCredential},
	store::{CompareAndSwapOutcome, CredentialStore, InsertOutcome, StoreError, StoreFuture},
};

type StoreTables = Arc<RwLock<Tables>>;

#[derive(Debug, Default)]
struct Tables {
	principals: HashMap<PrincipalId, Principal>,
	credentials: HashMap<PrincipalId, RefreshCredential>,
	by_token: HashMap<String, PrincipalId>,
	last_id: u64,
}
impl Tables {
	fn unlink(&mut self, owner: PrincipalId) -> Option<RefreshCredential> {
		let removed = self.credentials.remove(&owner)?;

		self.by_token.remove(removed.token.expose());

		Some(removed)
	}

	fn link(&mut self, credential: RefreshCredential) {
		self.by_token.insert(credential.token.expose().to_owned(), credential.principal);
		self.credentials.insert(credential.principal, credential);
	}
}

/// Storage backend that keeps principals and credentials in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreTables);
impl MemoryStore {
	/// Number of live credential rows; used by tests to assert the one-row-per-principal rule.
	pub fn credential_count(&self) -> usize {
		self.0.read().credentials.len()
	}

	fn insert_now(tables: StoreTables, new: NewPrincipal) -> Result<InsertOutcome, StoreError> {
		let mut guard = tables.write();

		if new.handle.as_ref().is_some_and(|h| guard.principals.values().any(|p| &p.handle == h)) {
			return Ok(InsertOutcome::HandleTaken);
		}
		if new.email.as_ref().is_some_and(|e| guard.principals.values().any(|p| &p.email == e)) {
			return Ok(InsertOutcome::EmailTaken);
		}

		let id = PrincipalId::new(guard.last_id + 1);
		let principal = new
			.into_principal(id, OffsetDateTime::now_utc())
			.map_err(|e| StoreError::InvalidRecord { message: e.to_string() })?;

		guard.last_id += 1;
		guard.principals.insert(id, principal.clone());

		Ok(InsertOutcome::Inserted(principal))
	}

	fn update_now(tables: StoreTables, mut principal: Principal) -> Option<Principal> {
		let mut guard = tables.write();
		let slot = guard.principals.get_mut(&principal.id)?;

		principal.updated_at = OffsetDateTime::now_utc();
		*slot = principal.clone();

		Some(principal)
	}

	fn replace_now(
		tables: StoreTables,
		credential: RefreshCredential,
	) -> Option<RefreshCredential> {
		let mut guard = tables.write();
		let displaced = guard.unlink(credential.principal);

		guard.link(credential);

		displaced
	}

	fn rotate_now(
		tables: StoreTables,
		expected: &str,
		replacement: RefreshCredential,
	) -> CompareAndSwapOutcome {
		let mut guard = tables.write();
		let outcome = match guard.credentials.get(&replacement.principal) {
			Some(existing) if existing.matches(expected) => CompareAndSwapOutcome::Updated,
			Some(_) => CompareAndSwapOutcome::RefreshMismatch,
			None => CompareAndSwapOutcome::Missing,
		};

		if matches!(outcome, CompareAndSwapOutcome::Updated) {
			guard.unlink(replacement.principal);
			guard.link(replacement);
		}

		outcome
	}

	fn revoke_now(
		tables: StoreTables,
		token: &str,
		instant: OffsetDateTime,
	) -> Option<RefreshCredential> {
		let mut guard = tables.write();
		let owner = *guard.by_token.get(token)?;
		let credential = guard.credentials.get_mut(&owner)?;

		credential.revoke(instant);

		Some(credential.clone())
	}

	fn delete_token_now(tables: StoreTables, token: &str) -> bool {
		let mut guard = tables.write();
		let owner = guard.by_token.get(token).copied();

		match owner {
			Some(owner) => guard.unlink(owner).is_some(),
			None => false,
		}
	}
}
impl CredentialStore for MemoryStore {
	fn principal(&self, id: PrincipalId) -> StoreFuture<'_, Option<Principal>> {
		let tables = self.0.clone();

		Box::pin(async move { Ok(tables.read().principals.get(&id).cloned()) })
	}

	fn principal_by_email<'a>(&'a self, email: &'a Email) -> StoreFuture<'a, Option<Principal>> {
		let tables = self.0.clone();

		Box::pin(async move {
			Ok(tables.read().principals.values().find(|p| &p.email == email).cloned())
		})
	}

	fn insert_principal(&self, principal: NewPrincipal) -> StoreFuture<'_, InsertOutcome> {
		let tables = self.0.clone();

		Box::pin(async move { Self::insert_now(tables, principal) })
	}

	fn update_principal(&self, principal: Principal) -> StoreFuture<'_, Option<Principal>> {
		let tables = self.0.clone();

		Box::pin(async move { Ok(Self::update_now(tables, principal)) })
	}

	fn delete_principal(&self, id: PrincipalId) -> StoreFuture<'_, bool> {
		let tables = self.0.clone();

		Box::pin(async move { Ok(tables.write().principals.remove(&id).is_some()) })
	}

	fn credential<'a>(&'a self, token: &'a str) -> StoreFuture<'a, Option<RefreshCredential>> {
		let tables = self.0.clone();

		Box::pin(async move {
			let guard = tables.read();

			Ok(guard.by_token.get(token).and_then(|owner| guard.credentials.get(owner)).cloned())
		})
	}

	fn credential_for(&self, principal: PrincipalId) -> StoreFuture<'_, Option<RefreshCredential>> {
		let tables = self.0.clone();

		Box::pin(async move { Ok(tables.read().credentials.get(&principal).cloned()) })
	}

	fn replace_credential(
		&self,
		credential: RefreshCredential,
	) -> StoreFuture<'_, Option<RefreshCredential>> {
		let tables = self.0.clone();

		Box::pin(async move { Ok(Self::replace_now(tables, credential)) })
	}

	fn rotate_credential<'a>(
		&'a self,
		expected: &'a str,
		replacement: RefreshCredential,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		let tables = self.0.clone();

		Box::pin(async move { Ok(Self::rotate_now(tables, expected, replacement)) })
	}

	fn revoke_credential<'a>(
		&'a self,
		token: &'a str,
		instant: OffsetDateTime,
	) -> StoreFuture<'a, Option<RefreshCredential>> {
		let tables = self.0.clone();

		Box::pin(async move { Ok(Self::revoke_now(tables, token, instant)) })
	}

	fn delete_credential<'a>(&'a self, token: &'a str) -> StoreFuture<'a, bool> {
		let tables = self.0.clone();

		Box::pin(async move { Ok(Self::delete_token_now(tables, token)) })
	}

	fn delete_credential_for(&self, principal: PrincipalId) -> StoreFuture<'_, bool> {
		let tables = self.0.clone();

		Box::pin(async move { Ok(tables.write().unlink(principal).is_some()) })
	}
}
