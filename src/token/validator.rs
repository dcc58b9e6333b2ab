//! Access-token and refresh-credential verification.

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
// self
use crate::{
	_prelude::*,
	config::AuthConfig,
	error::ConfigError,
	token::{AccessClaims, RefreshClaims},
};

/// Why an access token was not accepted. All variants surface to callers as 401.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AccessRejection {
	/// The signature did not verify against the access secret.
	#[error("signature mismatch")]
	InvalidSignature,
	/// The token is past its expiry.
	#[error("expired")]
	Expired,
	/// The value is not a decodable token.
	#[error("malformed")]
	Malformed,
}

/// Why a refresh credential was not accepted. All variants surface to callers as 403.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RefreshRejection {
	/// No stored row matches the presented value (never issued, rotated away, or deleted).
	#[error("not found")]
	NotFound,
	/// The stored row is revoked.
	#[error("revoked")]
	Revoked,
	/// The stored row is past its expiry.
	#[error("expired")]
	Expired,
}

/// Verifies token signatures and expiry without touching the store.
#[derive(Clone)]
pub struct TokenValidator {
	access_key: DecodingKey,
	refresh_key: DecodingKey,
	validation: Validation,
}
impl TokenValidator {
	/// Builds a validator, failing fast when either secret is empty.
	pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
		let (access, refresh) = config.signing_secrets()?;
		let mut validation = Validation::new(Algorithm::HS256);

		// Expiry is compared against a caller-supplied instant below.
		validation.validate_exp = false;
		validation.leeway = 0;

		Ok(Self {
			access_key: DecodingKey::from_secret(access.as_bytes()),
			refresh_key: DecodingKey::from_secret(refresh.as_bytes()),
			validation,
		})
	}

	/// Verifies an access token against the current clock.
	pub fn validate_access(&self, token: &str) -> Result<AccessClaims, AccessRejection> {
		self.validate_access_at(token, OffsetDateTime::now_utc())
	}

	/// Verifies an access token against `now`.
	pub fn validate_access_at(
		&self,
		token: &str,
		now: OffsetDateTime,
	) -> Result<AccessClaims, AccessRejection> {
		let claims = jsonwebtoken::decode::<AccessClaims>(token, &self.access_key, &self.validation)
			.map_err(|e| match e.kind() {
				ErrorKind::InvalidSignature => AccessRejection::InvalidSignature,
				_ => AccessRejection::Malformed,
			})?
			.claims;

		if now.unix_timestamp() >= claims.exp {
			return Err(AccessRejection::Expired);
		}

		Ok(claims)
	}

	/// Verifies a refresh credential's signature and embedded expiry against `now`.
	///
	/// A value that fails verification cannot match any stored row, so it is reported as
	/// [`RefreshRejection::NotFound`].
	pub fn decode_refresh_at(
		&self,
		token: &str,
		now: OffsetDateTime,
	) -> Result<RefreshClaims, RefreshRejection> {
		let claims =
			jsonwebtoken::decode::<RefreshClaims>(token, &self.refresh_key, &self.validation)
				.map_err(|_| RefreshRejection::NotFound)?
				.claims;

		if now.unix_timestamp() >= claims.exp {
			return Err(RefreshRejection::Expired);
		}

		Ok(claims)
	}
}
impl Debug for TokenValidator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenValidator").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{TEST_REFRESH_SECRET, test_config},
		auth::PrincipalId,
		token::TokenIssuer,
	};

	fn pair() -> (TokenIssuer, TokenValidator) {
		let config = test_config();

		(
			TokenIssuer::new(&config).expect("Issuer should build."),
			TokenValidator::new(&config).expect("Validator should build."),
		)
	}

	#[test]
	fn access_tokens_round_trip_until_expiry() {
		let (issuer, validator) = pair();
		let now = OffsetDateTime::now_utc();
		let minted = issuer.mint(PrincipalId::new(3), now).expect("Mint should succeed.");
		let token = minted.pair.access_token.expose();
		let claims = validator.validate_access_at(token, now).expect("Fresh token should verify.");

		assert_eq!(claims.sub, PrincipalId::new(3));
		assert_eq!(
			validator.validate_access_at(token, now + Duration::minutes(16)),
			Err(AccessRejection::Expired)
		);
	}

	#[test]
	fn access_rejections_are_classified() {
		let (issuer, validator) = pair();
		let now = OffsetDateTime::now_utc();
		let minted = issuer.mint(PrincipalId::new(3), now).expect("Mint should succeed.");

		// A refresh credential is signed with the other secret.
		assert_eq!(
			validator.validate_access_at(minted.pair.refresh_token.expose(), now),
			Err(AccessRejection::InvalidSignature)
		);
		assert_eq!(validator.validate_access_at("garbage", now), Err(AccessRejection::Malformed));
	}

	#[test]
	fn refresh_signature_failures_read_as_not_found() {
		let (issuer, validator) = pair();
		let now = OffsetDateTime::now_utc();
		let minted = issuer.mint(PrincipalId::new(5), now).expect("Mint should succeed.");
		let claims = validator
			.decode_refresh_at(minted.pair.refresh_token.expose(), now)
			.expect("Refresh credential should verify.");

		assert_eq!(claims.sub, PrincipalId::new(5));
		assert_eq!(
			validator.decode_refresh_at(minted.pair.access_token.expose(), now),
			Err(RefreshRejection::NotFound)
		);

		let forged = test_config().with_refresh_secret(format!("{TEST_REFRESH_SECRET}-other"));
		let forger = TokenIssuer::new(&forged).expect("Forging issuer should build.");
		let forged = forger.mint(PrincipalId::new(5), now).expect("Forged mint should succeed.");

		assert_eq!(
			validator.decode_refresh_at(forged.pair.refresh_token.expose(), now),
			Err(RefreshRejection::NotFound)
		);
	}
}
