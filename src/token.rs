//! Signed token minting and verification.
//!
//! Access tokens are stateless HS256 JWTs checked only by signature and expiry. Refresh
//! credentials are HS256 JWTs signed with a separate secret and carrying a rotation nonce, so
//! each issuance yields a distinct value; their authority comes from the stored row, not the
//! signature alone.

pub mod claims;
pub mod issuer;
pub mod validator;

pub use claims::*;
pub use issuer::*;
pub use validator::*;

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
// self
use crate::{_prelude::*, auth::PrincipalId};

/// Default client-side skew buffer applied before treating an access token as expired.
pub const DEFAULT_SKEW_BUFFER: Duration = Duration::seconds(60);

#[derive(Deserialize)]
struct UnverifiedClaims {
	exp: i64,
	sub: Option<PrincipalId>,
}

/// Reads the `exp` claim without verifying the signature.
///
/// Only for client-side freshness checks; never for authorization decisions.
pub fn peek_expiry(token: &str) -> Option<OffsetDateTime> {
	OffsetDateTime::from_unix_timestamp(peek(token)?.exp).ok()
}

/// Reads the `sub` claim without verifying the signature.
///
/// Lets a client recognize its own principal when it was handed a bare pair.
pub fn peek_subject(token: &str) -> Option<PrincipalId> {
	peek(token)?.sub
}

fn peek(token: &str) -> Option<UnverifiedClaims> {
	let mut validation = Validation::new(Algorithm::HS256);

	validation.insecure_disable_signature_validation();
	validation.validate_exp = false;

	jsonwebtoken::decode::<UnverifiedClaims>(token, &DecodingKey::from_secret(&[]), &validation)
		.ok()
		.map(|data| data.claims)
}

/// Returns `true` if `token` expires within `buffer` of `now`. Undecodable tokens count as
/// expired.
pub fn is_expired_at(token: &str, buffer: Duration, now: OffsetDateTime) -> bool {
	match peek_expiry(token) {
		Some(expires_at) => expires_at - buffer <= now,
		None => true,
	}
}
