//! Client-side session handling: token storage, single-flight refresh, broadcast adoption, and
//! logout.

pub mod coordinator;
pub mod session;
pub mod transport;

pub use coordinator::*;
pub use session::*;
pub use transport::*;

// self
use crate::_prelude::*;

/// Failures observed by client sessions and the refresh transport.
///
/// Cloneable so every waiter on a shared refresh receives the same value.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClientError {
	/// The issuer answered with a non-success status.
	#[error("Refresh endpoint rejected the request with status {status}: {message}")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Message returned by the issuer.
		message: String,
	},
	/// The request did not complete in time.
	#[error("Refresh request timed out.")]
	Timeout,
	/// The request failed before a response arrived.
	#[error("Network error while contacting the issuer: {message}")]
	Network {
		/// Transport-specific description.
		message: String,
	},
	/// The issuer answered with something other than the expected JSON.
	#[error("Issuer returned an unexpected response: {message}")]
	Protocol {
		/// Parse or decoding failure.
		message: String,
	},
	/// The session holds no credentials.
	#[error("Session is signed out.")]
	SignedOut,
}
impl ClientError {
	/// Whether the issuer rejected the credential itself (401/403), as opposed to failing to
	/// answer.
	pub fn is_rejection(&self) -> bool {
		matches!(self, ClientError::Rejected { status: 401 | 403, .. })
	}

	/// Whether the issuer refused the refresh credential (403: unknown, revoked, or expired),
	/// the shape a lost rotation race produces.
	pub fn is_credential_rejection(&self) -> bool {
		matches!(self, ClientError::Rejected { status: 403, .. })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn only_auth_statuses_count_as_rejections() {
		assert!(ClientError::Rejected { status: 403, message: "expired".into() }.is_rejection());
		assert!(ClientError::Rejected { status: 401, message: "gone".into() }.is_rejection());
		assert!(!ClientError::Rejected { status: 500, message: "boom".into() }.is_rejection());
		assert!(!ClientError::Timeout.is_rejection());
	}

	#[test]
	fn only_forbidden_counts_as_a_credential_rejection() {
		let forbidden = ClientError::Rejected { status: 403, message: "expired".into() };
		let missing_principal = ClientError::Rejected { status: 401, message: "gone".into() };

		assert!(forbidden.is_credential_rejection());
		assert!(!missing_principal.is_credential_rejection());
		assert!(!ClientError::Timeout.is_credential_rejection());
	}
}
