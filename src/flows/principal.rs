//! Principal maintenance used by the surrounding application.

// self
use crate::{
	_prelude::*,
	auth::{Principal, PrincipalId, TenantId},
	error::AuthenticationError,
	flows::Authority,
};

impl Authority {
	/// Moves `principal` into `tenant` (or out of any tenant with `None`).
	pub async fn assign_tenant(
		&self,
		principal: PrincipalId,
		tenant: Option<TenantId>,
	) -> Result<Principal> {
		let mut record =
			self.store.principal(principal).await?.ok_or(AuthenticationError::PrincipalNotFound)?;

		record.tenant = tenant;

		let updated = self
			.store
			.update_principal(record)
			.await?
			.ok_or(AuthenticationError::PrincipalNotFound)?;

		Ok(updated)
	}

	/// Deletes a principal.
	///
	/// The principal's refresh credential is not revoked; a later refresh with it fails with
	/// [`AuthenticationError::PrincipalNotFound`] and leaves the row in place. Call
	/// [`Authority::revoke_for_principal`] first to clean it up.
	pub async fn delete_principal(&self, principal: PrincipalId) -> Result<bool> {
		let deleted = self.store.delete_principal(principal).await?;

		if deleted {
			tracing::info!(%principal, "deleted principal");
		}

		Ok(deleted)
	}
}
