//! Stored refresh-credential rows and their lifecycle.

// self
use crate::{
	_prelude::*,
	auth::{PrincipalId, TokenSecret},
	token::RefreshRejection,
};

/// Lifecycle status of a refresh credential at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// Usable for rotation.
	Active,
	/// Past its absolute expiry.
	Expired,
	/// Explicitly revoked.
	Revoked,
}

/// One long-lived session renewal capability; at most one exists per principal.
#[derive(Clone, Serialize, Deserialize)]
pub struct RefreshCredential {
	/// Owning principal.
	pub principal: PrincipalId,
	/// Signed token value presented by clients.
	pub token: TokenSecret,
	/// Issue instant.
	pub issued_at: OffsetDateTime,
	/// Absolute expiry instant.
	pub expires_at: OffsetDateTime,
	/// Revocation instant, if revoked.
	pub revoked_at: Option<OffsetDateTime>,
}
impl RefreshCredential {
	/// Creates an active credential.
	pub fn new(
		principal: PrincipalId,
		token: TokenSecret,
		issued_at: OffsetDateTime,
		expires_at: OffsetDateTime,
	) -> Self {
		Self { principal, token, issued_at, expires_at, revoked_at: None }
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> CredentialStatus {
		if self.revoked_at.is_some() {
			return CredentialStatus::Revoked;
		}
		if instant >= self.expires_at {
			return CredentialStatus::Expired;
		}

		CredentialStatus::Active
	}

	/// Maps the status at `instant` onto a refresh rejection.
	pub fn check_at(&self, instant: OffsetDateTime) -> Result<(), RefreshRejection> {
		match self.status_at(instant) {
			CredentialStatus::Active => Ok(()),
			CredentialStatus::Expired => Err(RefreshRejection::Expired),
			CredentialStatus::Revoked => Err(RefreshRejection::Revoked),
		}
	}

	/// Returns `true` if the token value equals `presented`.
	pub fn matches(&self, presented: &str) -> bool {
		self.token.expose() == presented
	}

	/// Marks the credential as revoked.
	pub fn revoke(&mut self, instant: OffsetDateTime) {
		self.revoked_at = Some(instant);
	}
}
impl Debug for RefreshCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCredential")
			.field("principal", &self.principal)
			.field("token", &self.token.fingerprint())
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("revoked_at", &self.revoked_at)
			.finish()
	}
}
