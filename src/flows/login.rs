//! Password sign-in and registration.

// self
use crate::{
	_prelude::*,
	auth::{Email, Handle, NewPrincipal, password},
	error::{AuthenticationError, ConflictError, ValidationError},
	flows::{Authority, SessionGrant},
	obs::{self, FlowKind},
	store::InsertOutcome,
};

/// Registration payload.
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Registration {
	/// Requested handle.
	pub handle: String,
	/// Email address; case-folded before storage.
	pub email: String,
	/// Plain-text password; hashed before storage.
	pub password: String,
	/// Given name.
	pub first_name: Option<String>,
	/// Family name.
	pub last_name: Option<String>,
}
impl Debug for Registration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Registration")
			.field("handle", &self.handle)
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish_non_exhaustive()
	}
}

impl Authority {
	/// Signs a principal in with email and password.
	///
	/// Unknown emails and wrong passwords are indistinguishable to the caller; accounts without a
	/// password are told to use the identity provider. No credential row is written on failure.
	pub async fn login(&self, email: &str, password: &str) -> Result<SessionGrant> {
		obs::observe(FlowKind::Login, "login", async move {
			if email.trim().is_empty() {
				return Err(ValidationError::MissingField { field: "email" }.into());
			}
			if password.is_empty() {
				return Err(ValidationError::MissingField { field: "password" }.into());
			}

			let email = Email::new(email).map_err(|_| AuthenticationError::InvalidCredentials)?;
			let principal = self
				.store
				.principal_by_email(&email)
				.await?
				.ok_or(AuthenticationError::InvalidCredentials)?;
			let Some(hash) = principal.password_hash.as_deref() else {
				return Err(AuthenticationError::FederatedOnly.into());
			};

			if !password::verify_password(password, hash) {
				tracing::debug!(principal = %principal.id, "password mismatch");

				return Err(AuthenticationError::InvalidCredentials.into());
			}

			let tokens = self.issue(principal.id).await?;

			Ok(SessionGrant { principal, tokens, created: false })
		})
		.await
	}

	/// Creates a password-backed principal and signs it in.
	pub async fn register(&self, registration: Registration) -> Result<SessionGrant> {
		obs::observe(FlowKind::Register, "register", async move {
			let Registration { handle, email, password: plain, first_name, last_name } =
				registration;

			for (field, value) in [("handle", &handle), ("email", &email), ("password", &plain)] {
				if value.trim().is_empty() {
					return Err(ValidationError::MissingField { field }.into());
				}
			}

			let handle = Handle::new(handle)?;
			let email = Email::new(email)?;
			let hash = password::hash_password(&plain)?;
			let new = NewPrincipal::with_password(handle.clone(), email.clone(), hash)
				.names(first_name, last_name);
			let principal = match self.store.insert_principal(new).await? {
				InsertOutcome::Inserted(principal) => principal,
				InsertOutcome::HandleTaken =>
					return Err(ConflictError::HandleTaken { handle: handle.into() }.into()),
				InsertOutcome::EmailTaken =>
					return Err(ConflictError::EmailTaken { email: email.into() }.into()),
			};

			tracing::info!(principal = %principal.id, "registered principal");

			let tokens = self.issue(principal.id).await?;

			Ok(SessionGrant { principal, tokens, created: true })
		})
		.await
	}
}
