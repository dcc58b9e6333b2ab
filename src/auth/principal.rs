//! Principal records and the insertion payload used by registration and federation.

// self
use crate::{
	_prelude::*,
	auth::{Email, Handle, PrincipalId, TenantId},
	error::ValidationError,
};

/// A user identity.
///
/// Serialized without the password hash so it can be returned to clients directly.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
	/// Opaque numeric identifier.
	pub id: PrincipalId,
	/// Globally unique handle.
	pub handle: Handle,
	/// Globally unique, case-folded email.
	pub email: Email,
	/// Argon2 PHC string; absent for federated-only principals.
	#[serde(skip)]
	pub password_hash: Option<String>,
	/// Subject identifier issued by the identity provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub federated_id: Option<String>,
	/// Given name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub first_name: Option<String>,
	/// Family name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_name: Option<String>,
	/// Avatar reference.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub avatar_url: Option<String>,
	/// Tenant (family) the principal belongs to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tenant: Option<TenantId>,
	/// Creation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	/// Last mutation instant.
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl Principal {
	/// Returns `true` when the principal can sign in with a password.
	pub fn has_password(&self) -> bool {
		self.password_hash.is_some()
	}

	/// Returns `true` when the principal is linked to the identity provider.
	pub fn is_federated(&self) -> bool {
		self.federated_id.is_some()
	}

	/// Returns `true` when the principal belongs to `tenant`.
	pub fn belongs_to(&self, tenant: TenantId) -> bool {
		self.tenant == Some(tenant)
	}
}
impl Debug for Principal {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Principal")
			.field("id", &self.id)
			.field("handle", &self.handle)
			.field("email", &self.email)
			.field("password_hash", &self.password_hash.as_ref().map(|_| "<redacted>"))
			.field("federated_id", &self.federated_id)
			.field("tenant", &self.tenant)
			.finish_non_exhaustive()
	}
}

/// Insertion payload; the store assigns the id and timestamps.
#[derive(Clone, Default)]
pub struct NewPrincipal {
	/// Requested handle.
	pub handle: Option<Handle>,
	/// Case-folded email.
	pub email: Option<Email>,
	/// Argon2 PHC string.
	pub password_hash: Option<String>,
	/// Identity-provider subject.
	pub federated_id: Option<String>,
	/// Given name.
	pub first_name: Option<String>,
	/// Family name.
	pub last_name: Option<String>,
	/// Avatar reference.
	pub avatar_url: Option<String>,
	/// Tenant (family) assignment.
	pub tenant: Option<TenantId>,
}
impl NewPrincipal {
	/// Payload for a password-backed principal.
	pub fn with_password(handle: Handle, email: Email, password_hash: String) -> Self {
		Self {
			handle: Some(handle),
			email: Some(email),
			password_hash: Some(password_hash),
			..Default::default()
		}
	}

	/// Payload for a federated-only principal.
	pub fn federated(handle: Handle, email: Email, federated_id: String) -> Self {
		Self {
			handle: Some(handle),
			email: Some(email),
			federated_id: Some(federated_id),
			..Default::default()
		}
	}

	/// Sets the display names.
	pub fn names(mut self, first_name: Option<String>, last_name: Option<String>) -> Self {
		self.first_name = first_name;
		self.last_name = last_name;

		self
	}

	/// Sets the avatar reference.
	pub fn avatar(mut self, avatar_url: Option<String>) -> Self {
		self.avatar_url = avatar_url;

		self
	}

	/// Checks the payload and materializes a [`Principal`] with the store-assigned id.
	pub fn into_principal(
		self,
		id: PrincipalId,
		now: OffsetDateTime,
	) -> Result<Principal, ValidationError> {
		let handle = self.handle.ok_or(ValidationError::MissingField { field: "handle" })?;
		let email = self.email.ok_or(ValidationError::MissingField { field: "email" })?;

		if self.password_hash.is_none() && self.federated_id.is_none() {
			return Err(ValidationError::NoAuthenticationMethod);
		}

		Ok(Principal {
			id,
			handle,
			email,
			password_hash: self.password_hash,
			federated_id: self.federated_id,
			first_name: self.first_name,
			last_name: self.last_name,
			avatar_url: self.avatar_url,
			tenant: self.tenant,
			created_at: now,
			updated_at: now,
		})
	}
}
impl Debug for NewPrincipal {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("NewPrincipal")
			.field("handle", &self.handle)
			.field("email", &self.email)
			.field("password_hash", &self.password_hash.as_ref().map(|_| "<redacted>"))
			.field("federated_id", &self.federated_id)
			.finish_non_exhaustive()
	}
}
