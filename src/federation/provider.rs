//! Identity-provider contract and the reqwest-backed OAuth implementation.

#[cfg(feature = "reqwest")] mod oauth;

#[cfg(feature = "reqwest")] pub use oauth::OAuthIdentityProvider;

// self
use crate::{_prelude::*, error::UpstreamError, federation::FederatedProfile};

/// Boxed future returned by [`IdentityProvider`] calls.
pub type ProviderFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, UpstreamError>> + 'a + Send>>;

/// External identity provider used by federated sign-in.
///
/// Implementations talk to the provider only; merging the returned profile into local
/// principals is the caller's job.
pub trait IdentityProvider
where
	Self: Send + Sync,
{
	/// Exchanges an authorization code (with its PKCE verifier) for the user's profile.
	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		pkce_verifier: &'a str,
	) -> ProviderFuture<'a, FederatedProfile>;

	/// Verifies a provider-issued ID token and returns the profile it asserts.
	///
	/// Tokens minted for a different client (audience mismatch) are rejected.
	fn verify_id_token<'a>(&'a self, id_token: &'a str) -> ProviderFuture<'a, FederatedProfile>;
}
