//! Token pair minting.

// crates.io
use jsonwebtoken::{EncodingKey, Header};
use uuid::Uuid;
// self
use crate::{
	_prelude::*,
	auth::{PrincipalId, RefreshCredential, TokenPair, TokenSecret},
	config::{self, AuthConfig},
	error::ConfigError,
	token::{AccessClaims, RefreshClaims},
};

/// A freshly minted pair plus the row that must be persisted for it.
#[derive(Clone, Debug)]
pub struct MintedPair {
	/// Tokens handed to the client.
	pub pair: TokenPair,
	/// Credential row backing `pair.refresh_token`.
	pub credential: RefreshCredential,
}

/// Signs access tokens and refresh credentials. Holds no store; persistence is the caller's job.
#[derive(Clone)]
pub struct TokenIssuer {
	access_key: EncodingKey,
	refresh_key: EncodingKey,
	access_ttl: Duration,
	refresh_ttl: Duration,
}
impl TokenIssuer {
	/// Builds an issuer, failing fast when either secret is empty or a lifetime is out of range.
	pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
		let (access, refresh) = config.signing_secrets()?;

		Ok(Self {
			access_key: EncodingKey::from_secret(access.as_bytes()),
			refresh_key: EncodingKey::from_secret(refresh.as_bytes()),
			access_ttl: config::check_ttl("ACCESS_TOKEN_TTL_SECS", config.access_ttl)?,
			refresh_ttl: config::check_ttl("REFRESH_TOKEN_TTL_SECS", config.refresh_ttl)?,
		})
	}

	/// Mints a new access token and refresh credential for `principal`.
	pub fn mint(
		&self,
		principal: PrincipalId,
		now: OffsetDateTime,
	) -> Result<MintedPair, ConfigError> {
		let access_expires_at = expiry("ACCESS_TOKEN_TTL_SECS", now, self.access_ttl)?;
		let refresh_expires_at = expiry("REFRESH_TOKEN_TTL_SECS", now, self.refresh_ttl)?;
		let access_claims = AccessClaims {
			sub: principal,
			iat: now.unix_timestamp(),
			exp: access_expires_at.unix_timestamp(),
			jti: Uuid::new_v4().to_string(),
		};
		let refresh_claims = RefreshClaims {
			sub: principal,
			nonce: Uuid::new_v4().to_string(),
			iat: now.unix_timestamp(),
			exp: refresh_expires_at.unix_timestamp(),
		};
		let access_token = TokenSecret::new(sign(&access_claims, &self.access_key)?);
		let refresh_token = TokenSecret::new(sign(&refresh_claims, &self.refresh_key)?);
		let credential =
			RefreshCredential::new(principal, refresh_token.clone(), now, refresh_expires_at);

		Ok(MintedPair {
			pair: TokenPair { access_token, refresh_token, access_expires_at, refresh_expires_at },
			credential,
		})
	}
}
impl Debug for TokenIssuer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenIssuer")
			.field("access_ttl", &self.access_ttl)
			.field("refresh_ttl", &self.refresh_ttl)
			.finish_non_exhaustive()
	}
}

fn expiry(
	name: &'static str,
	now: OffsetDateTime,
	ttl: Duration,
) -> Result<OffsetDateTime, ConfigError> {
	now.checked_add(ttl).ok_or_else(|| ConfigError::InvalidValue {
		name,
		reason: "lifetime overflows the clock".into(),
	})
}

fn sign<T>(claims: &T, key: &EncodingKey) -> Result<String, ConfigError>
where
	T: Serialize,
{
	jsonwebtoken::encode(&Header::default(), claims, key)
		.map_err(|source| ConfigError::Signing { source })
}
