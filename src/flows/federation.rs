//! Federated sign-in: handshake start, callback completion, ID-token sign-in, and the profile
//! merge that maps provider identities onto local principals.

// self
use crate::{
	_prelude::*,
	auth::{Email, Handle, NewPrincipal, Principal},
	error::{AuthenticationError, ConfigError, ConflictError, ValidationError},
	federation::{FederatedProfile, Handshake, HandshakeOutcome, IdentityProvider, MergeOutcome},
	flows::{Authority, SessionGrant},
	obs::{self, FlowKind},
	store::InsertOutcome,
};

const FALLBACK_HANDLE: &str = "user";
const MAX_HANDLE_SUFFIX: u32 = 10_000;

impl Authority {
	/// Starts a handshake and returns it with the provider URL the browser must visit.
	///
	/// The handshake is already `AwaitingCallback`; persist its nonce and verifier before
	/// redirecting.
	pub fn begin_federation(&self) -> Result<(Handshake, Url)> {
		let federation = self.config.federation.as_ref().ok_or(ConfigError::FederationDisabled)?;

		self.provider()?;

		let mut handshake =
			Handshake::initiate(self.config.handshake_ttl, OffsetDateTime::now_utc());
		let authorize_url = handshake.dispatch(federation);

		tracing::debug!(expires_at = %handshake.expires_at(), "federation handshake dispatched");

		Ok((handshake, authorize_url))
	}

	/// Resolves the provider callback against the pending handshake, exchanges the code, merges
	/// the profile, and issues a pair.
	///
	/// A rejected handshake never reaches the provider.
	pub async fn complete_federation(
		&self,
		handshake: Handshake,
		state: Option<&str>,
		code: Option<&str>,
	) -> Result<SessionGrant> {
		obs::observe(FlowKind::Federation, "callback", async move {
			let completed = match handshake.resolve(state, code, OffsetDateTime::now_utc()) {
				HandshakeOutcome::Completed(completed) => completed,
				HandshakeOutcome::Rejected(rejection) => {
					tracing::warn!(%rejection, "federation handshake rejected");

					return Err(AuthenticationError::HandshakeRejected(rejection).into());
				},
			};
			let profile =
				self.provider()?.exchange_code(completed.code(), completed.pkce_verifier()).await?;

			self.sign_in_federated(&profile).await
		})
		.await
	}

	/// Signs in with a provider-issued ID token (e.g. from a native client).
	pub async fn sign_in_with_id_token(&self, id_token: &str) -> Result<SessionGrant> {
		obs::observe(FlowKind::Federation, "verify_token", async move {
			if id_token.trim().is_empty() {
				return Err(ValidationError::MissingField { field: "idToken" }.into());
			}

			let profile = self.provider()?.verify_id_token(id_token).await?;

			self.sign_in_federated(&profile).await
		})
		.await
	}

	/// Maps a provider profile onto a local principal, creating one when the email is unknown.
	///
	/// Existing principals only gain a missing federated id or avatar; nothing is overwritten.
	/// New principals get a handle derived from the email local part, suffixed `1`, `2`, ... on
	/// collision, and no password. Repeating the call with the same profile is a no-op.
	pub async fn merge_federated_profile(
		&self,
		profile: &FederatedProfile,
	) -> Result<MergeOutcome> {
		let raw_email = profile
			.email
			.as_deref()
			.filter(|email| !email.trim().is_empty())
			.ok_or(ValidationError::MissingProfileEmail)?;
		let email = Email::new(raw_email)?;

		if let Some(existing) = self.store.principal_by_email(&email).await? {
			let principal = self.backfill(existing, profile).await?;

			return Ok(MergeOutcome { principal, created: false });
		}

		let base = match Handle::sanitized(email.local_part()) {
			Some(handle) => handle,
			None => Handle::new(FALLBACK_HANDLE)?,
		};
		let mut candidate = base.clone();
		let mut suffix = 0;

		loop {
			let federated_id = profile.federated_id.clone();
			let new = NewPrincipal::federated(candidate.clone(), email.clone(), federated_id)
				.names(profile.given_name.clone(), profile.family_name.clone())
				.avatar(profile.avatar_url.clone());

			match self.store.insert_principal(new).await? {
				InsertOutcome::Inserted(principal) => {
					tracing::info!(
						principal = %principal.id,
						handle = %principal.handle,
						"created federated principal"
					);

					return Ok(MergeOutcome { principal, created: true });
				},
				InsertOutcome::HandleTaken if suffix < MAX_HANDLE_SUFFIX => {
					suffix += 1;
					candidate = base.with_suffix(suffix);
				},
				InsertOutcome::HandleTaken =>
					return Err(ConflictError::HandleTaken { handle: base.into() }.into()),
				// A concurrent merge created the principal first.
				InsertOutcome::EmailTaken => {
					let existing = self
						.store
						.principal_by_email(&email)
						.await?
						.ok_or(AuthenticationError::PrincipalNotFound)?;
					let principal = self.backfill(existing, profile).await?;

					return Ok(MergeOutcome { principal, created: false });
				},
			}
		}
	}

	async fn sign_in_federated(&self, profile: &FederatedProfile) -> Result<SessionGrant> {
		let MergeOutcome { principal, created } = self.merge_federated_profile(profile).await?;
		let tokens = self.issue(principal.id).await?;

		tracing::info!(principal = %principal.id, created, "federated sign-in");

		Ok(SessionGrant { principal, tokens, created })
	}

	async fn backfill(
		&self,
		mut principal: Principal,
		profile: &FederatedProfile,
	) -> Result<Principal> {
		let mut changed = false;

		if principal.federated_id.is_none() {
			principal.federated_id = Some(profile.federated_id.clone());
			changed = true;
		}
		if principal.avatar_url.is_none() && profile.avatar_url.is_some() {
			principal.avatar_url = profile.avatar_url.clone();
			changed = true;
		}
		if !changed {
			return Ok(principal);
		}

		let updated = self
			.store
			.update_principal(principal)
			.await?
			.ok_or(AuthenticationError::PrincipalNotFound)?;

		tracing::debug!(principal = %updated.id, "backfilled federated attributes");

		Ok(updated)
	}

	fn provider(&self) -> Result<&dyn IdentityProvider, ConfigError> {
		self.identity_provider.as_deref().ok_or(ConfigError::FederationDisabled)
	}
}
