//! Credential revocation and logout.

// self
use crate::{
	_prelude::*,
	auth::PrincipalId,
	flows::Authority,
	obs::{self, FlowKind},
};

impl Authority {
	/// Deletes the credential row matching `refresh_token`. Absence is not an error.
	pub async fn revoke(&self, refresh_token: &str) -> Result<bool> {
		Ok(self.store.delete_credential(refresh_token).await?)
	}

	/// Deletes whatever credential row `principal` holds.
	pub async fn revoke_for_principal(&self, principal: PrincipalId) -> Result<bool> {
		Ok(self.store.delete_credential_for(principal).await?)
	}

	/// Best-effort logout.
	///
	/// A presented refresh credential is revoked by value; otherwise a valid bearer token revokes
	/// its principal's credential. Failures are logged and never surfaced, and the return value
	/// only reports whether a row was removed.
	pub async fn logout(&self, access_token: Option<&str>, refresh_token: Option<&str>) -> bool {
		let result = obs::observe(FlowKind::Revocation, "logout", async move {
			if let Some(token) = refresh_token.filter(|token| !token.is_empty()) {
				return self.revoke(token).await;
			}

			match access_token.map(|token| self.validator.validate_access(token)) {
				Some(Ok(claims)) => self.revoke_for_principal(claims.sub).await,
				_ => Ok(false),
			}
		})
		.await;

		match result {
			Ok(revoked) => revoked,
			Err(e) => {
				tracing::warn!(error = %e, "logout revocation failed");

				false
			},
		}
	}
}
