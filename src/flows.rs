//! Server-side flows orchestrated by the [`Authority`] facade.

pub mod common;
pub mod federation;
pub mod login;
pub mod principal;
pub mod refresh;
pub mod revoke;

pub use common::*;
pub use login::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{Principal, PrincipalId, TokenPair},
	broadcast::SessionBroadcaster,
	config::AuthConfig,
	error::{AuthenticationError, ConfigError},
	federation::IdentityProvider,
	store::CredentialStore,
	token::{TokenIssuer, TokenValidator},
};

/// Issues, validates, rotates, and revokes credentials for one deployment.
///
/// The authority owns the record store, the token signer and verifier, the tenant broadcaster,
/// and the optional identity provider so individual flows only carry their own logic. Cloning
/// is cheap and clones share state.
#[derive(Clone)]
pub struct Authority {
	/// Record store holding principals and refresh credentials.
	pub store: Arc<dyn CredentialStore>,
	/// Token signer.
	pub issuer: TokenIssuer,
	/// Token verifier.
	pub validator: TokenValidator,
	/// Tenant fan-out hub notified after every successful rotation.
	pub broadcaster: SessionBroadcaster,
	/// Identity provider used by federated sign-in, if configured.
	pub identity_provider: Option<Arc<dyn IdentityProvider>>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	config: Arc<AuthConfig>,
}
impl Authority {
	/// Creates an authority; fails fast when a signing secret is missing.
	pub fn new(store: Arc<dyn CredentialStore>, config: AuthConfig) -> Result<Self, ConfigError> {
		Ok(Self {
			store,
			issuer: TokenIssuer::new(&config)?,
			validator: TokenValidator::new(&config)?,
			broadcaster: SessionBroadcaster::default(),
			identity_provider: None,
			refresh_metrics: Default::default(),
			config: Arc::new(config),
		})
	}

	/// Shares an existing broadcaster (e.g. with other authorities in the same process).
	pub fn with_broadcaster(mut self, broadcaster: SessionBroadcaster) -> Self {
		self.broadcaster = broadcaster;

		self
	}

	/// Attaches the identity provider used by federated sign-in.
	pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
		self.identity_provider = Some(provider);

		self
	}

	/// Active configuration.
	pub fn config(&self) -> &AuthConfig {
		&self.config
	}

	/// Mints a pair for `principal` and atomically replaces whatever refresh credential it held.
	///
	/// Callers are expected to have checked that the principal exists.
	pub async fn issue(&self, principal: PrincipalId) -> Result<TokenPair> {
		let minted = self.issuer.mint(principal, OffsetDateTime::now_utc()).inspect_err(|e| {
			tracing::error!(error = %e, "token signing failed");
		})?;
		let displaced = self.store.replace_credential(minted.credential).await?;

		tracing::debug!(%principal, replaced = displaced.is_some(), "issued credential pair");

		Ok(minted.pair)
	}

	/// Verifies a bearer access token and loads its principal.
	pub async fn authenticate(&self, access_token: &str) -> Result<Principal> {
		let claims = self.validator.validate_access(access_token).map_err(|rejection| {
			tracing::debug!(%rejection, "access token rejected");

			AuthenticationError::AccessRejected(rejection)
		})?;

		let principal =
			self.store.principal(claims.sub).await?.ok_or(AuthenticationError::PrincipalNotFound)?;

		Ok(principal)
	}
}
impl Debug for Authority {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Authority")
			.field("issuer", &self.issuer)
			.field("broadcaster", &self.broadcaster)
			.field("federation_enabled", &self.identity_provider.is_some())
			.finish()
	}
}
