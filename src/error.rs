//! Crate-level error taxonomy shared by flows, stores, the federation path, and the HTTP surface.

// self
use crate::{
	_prelude::*,
	auth::IdentifierError,
	federation::HandshakeRejection,
	token::{AccessRejection, RefreshRejection},
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Request input was missing or malformed.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Caller could not be authenticated or presented a rejected credential.
	#[error(transparent)]
	Authentication(#[from] AuthenticationError),
	/// A uniqueness constraint was violated.
	#[error(transparent)]
	Conflict(#[from] ConflictError),
	/// Local configuration problem; fatal and never retried.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identity-provider failure.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
}
impl Error {
	/// HTTP status code associated with this error.
	pub fn status(&self) -> u16 {
		match self {
			Error::Validation(_) => 400,
			Error::Authentication(err) => err.status(),
			Error::Conflict(_) => 409,
			Error::Config(_) | Error::Storage(_) => 500,
			Error::Upstream(err) => err.status(),
		}
	}

	/// Returns the refresh rejection carried by this error, if any.
	pub fn refresh_rejection(&self) -> Option<RefreshRejection> {
		match self {
			Error::Authentication(AuthenticationError::RefreshRejected(rejection)) =>
				Some(*rejection),
			_ => None,
		}
	}

	/// Whether the error stems from local misconfiguration or infrastructure rather than the
	/// caller; such errors are logged and reported to clients with a generic message.
	pub fn is_internal(&self) -> bool {
		matches!(self, Error::Config(_) | Error::Storage(_))
	}
}
impl From<IdentifierError> for Error {
	fn from(e: IdentifierError) -> Self {
		Self::Validation(e.into())
	}
}

/// Input validation failures (400).
#[derive(Debug, ThisError)]
pub enum ValidationError {
	/// A required field was absent or empty.
	#[error("{field} is required.")]
	MissingField {
		/// Wire name of the missing field.
		field: &'static str,
	},
	/// An identifier (handle, email, id) failed validation.
	#[error(transparent)]
	Identifier(#[from] IdentifierError),
	/// A new principal carried neither a password nor a federated identity.
	#[error("A principal needs a password or a federated identity.")]
	NoAuthenticationMethod,
	/// The federated profile did not include an email address.
	#[error("No email in the federated profile.")]
	MissingProfileEmail,
}

/// Authentication failures (401/403).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthenticationError {
	/// Unknown email or wrong password.
	#[error("Invalid credentials.")]
	InvalidCredentials,
	/// The account has no password and must use the identity provider.
	#[error("Invalid credentials. Please sign in with your identity provider.")]
	FederatedOnly,
	/// No bearer token was supplied.
	#[error("No bearer token provided.")]
	MissingBearer,
	/// The access token failed validation; the variant is kept for diagnostics only.
	#[error("Invalid token.")]
	AccessRejected(AccessRejection),
	/// The refresh credential was rejected; the variant is kept for diagnostics only.
	#[error("Invalid or expired refresh token.")]
	RefreshRejected(RefreshRejection),
	/// The token is valid but its principal no longer exists.
	#[error("Principal not found.")]
	PrincipalNotFound,
	/// The principal does not belong to the requested tenant.
	#[error("Principal does not belong to this family.")]
	TenantMismatch,
	/// The federation handshake was rejected before the provider was contacted.
	#[error("Federation handshake rejected: {0}.")]
	HandshakeRejected(HandshakeRejection),
}
impl AuthenticationError {
	/// HTTP status code associated with this error.
	pub fn status(&self) -> u16 {
		match self {
			AuthenticationError::InvalidCredentials
			| AuthenticationError::FederatedOnly
			| AuthenticationError::MissingBearer
			| AuthenticationError::AccessRejected(_)
			| AuthenticationError::PrincipalNotFound
			| AuthenticationError::HandshakeRejected(_) => 401,
			AuthenticationError::RefreshRejected(_) | AuthenticationError::TenantMismatch => 403,
		}
	}
}

/// Uniqueness violations (409).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConflictError {
	/// Another principal already uses the handle.
	#[error("Handle `{handle}` is already taken.")]
	HandleTaken {
		/// Conflicting handle.
		handle: String,
	},
	/// Another principal already uses the email address.
	#[error("Email `{email}` is already registered.")]
	EmailTaken {
		/// Conflicting email.
		email: String,
	},
}

/// Configuration failures (500, never retried).
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A signing secret is missing or empty.
	#[error("Signing secret `{name}` is not configured.")]
	MissingSecret {
		/// Environment or config key of the secret.
		name: &'static str,
	},
	/// A required configuration value is missing.
	#[error("Configuration value `{name}` is missing.")]
	MissingValue {
		/// Environment or config key.
		name: &'static str,
	},
	/// A configuration value could not be parsed.
	#[error("Configuration value `{name}` is invalid: {reason}.")]
	InvalidValue {
		/// Environment or config key.
		name: &'static str,
		/// Parser message.
		reason: String,
	},
	/// A configured URL cannot be parsed.
	#[error("Configured URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Token signing failed; the key material is unusable.
	#[error("Token signing failed.")]
	Signing {
		/// Underlying signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Password hashing failed.
	#[error("Password hashing failed: {message}.")]
	PasswordHash {
		/// Hasher message.
		message: String,
	},
	/// Federated sign-in was requested but no identity provider is configured.
	#[error("Federated sign-in is not configured.")]
	FederationDisabled,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<oauth2::url::ParseError> for ConfigError {
	fn from(source: oauth2::url::ParseError) -> Self {
		Self::InvalidUrl { source }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Identity-provider failures.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// The provider rejected the code or token.
	#[error("Identity provider rejected the request: {reason}.")]
	Rejected {
		/// Provider- or crate-supplied reason.
		reason: String,
	},
	/// The provider answered with an unexpected status.
	#[error("Identity provider returned status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
	},
	/// The provider returned a body that could not be parsed.
	#[error("Identity provider returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Network failure while calling the provider.
	#[error("Network error occurred while calling the identity provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl UpstreamError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// HTTP status code associated with this error.
	pub fn status(&self) -> u16 {
		match self {
			UpstreamError::Rejected { .. } => 401,
			UpstreamError::Status { .. }
			| UpstreamError::Parse { .. }
			| UpstreamError::Network { .. } => 500,
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for UpstreamError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn status_mapping_is_exhaustive_per_variant() {
		assert_eq!(Error::from(ValidationError::MissingField { field: "email" }).status(), 400);
		assert_eq!(Error::from(AuthenticationError::InvalidCredentials).status(), 401);
		assert_eq!(
			Error::from(AuthenticationError::AccessRejected(AccessRejection::Expired)).status(),
			401
		);
		assert_eq!(
			Error::from(AuthenticationError::RefreshRejected(RefreshRejection::Revoked)).status(),
			403
		);
		assert_eq!(Error::from(AuthenticationError::PrincipalNotFound).status(), 401);
		assert_eq!(
			Error::from(ConflictError::HandleTaken { handle: "jane".into() }).status(),
			409
		);
		assert_eq!(
			Error::from(ConfigError::MissingSecret { name: "JWT_ACCESS_SECRET" }).status(),
			500
		);
		assert_eq!(Error::from(UpstreamError::Rejected { reason: "aud".into() }).status(), 401);
		assert_eq!(Error::from(UpstreamError::Status { status: 503 }).status(), 500);
		assert_eq!(Error::from(StoreError::Backend { message: "down".into() }).status(), 500);
	}

	#[test]
	fn refresh_rejections_collapse_to_one_message() {
		let rejections =
			[RefreshRejection::NotFound, RefreshRejection::Revoked, RefreshRejection::Expired];
		let messages = rejections.map(|rejection| {
			Error::from(AuthenticationError::RefreshRejected(rejection)).to_string()
		});

		assert!(messages.iter().all(|message| message == "Invalid or expired refresh token."));
	}

	#[test]
	fn store_error_converts_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(error.is_internal());
		assert!(error.to_string().contains("database unreachable"));

		let source = StdError::source(&error)
			.expect("Crate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
