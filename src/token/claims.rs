//! JWT claim sets for access tokens and refresh credentials.

// self
use crate::{_prelude::*, auth::PrincipalId};

/// Claims embedded in an access token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
	/// Principal the token was issued to.
	pub sub: PrincipalId,
	/// Issued-at, seconds since the epoch.
	pub iat: i64,
	/// Expiry, seconds since the epoch.
	pub exp: i64,
	/// Unique token id.
	pub jti: String,
}

/// Claims embedded in a refresh credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
	/// Principal the credential belongs to.
	pub sub: PrincipalId,
	/// Rotation nonce; unique per issuance.
	pub nonce: String,
	/// Issued-at, seconds since the epoch.
	pub iat: i64,
	/// Expiry, seconds since the epoch.
	pub exp: i64,
}
