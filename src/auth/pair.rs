//! Token pair returned to clients by every issuing flow.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access token plus refresh credential handed to a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
	/// Short-lived bearer token.
	pub access_token: TokenSecret,
	/// Long-lived, single-use rotation credential.
	pub refresh_token: TokenSecret,
	/// Expiry of the access token.
	#[serde(with = "time::serde::rfc3339")]
	pub access_expires_at: OffsetDateTime,
	/// Expiry of the refresh credential.
	#[serde(with = "time::serde::rfc3339")]
	pub refresh_expires_at: OffsetDateTime,
}
