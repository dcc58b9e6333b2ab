//! Strongly typed identifiers: opaque numeric ids plus validated handles and emails.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_numeric_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(u64);
		impl $name {
			/// Wraps a raw numeric identifier.
			pub const fn new(value: u64) -> Self {
				Self(value)
			}

			/// Returns the raw numeric identifier.
			pub const fn get(self) -> u64 {
				self.0
			}
		}
		impl From<u64> for $name {
			fn from(value: u64) -> Self {
				Self(value)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}", self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				s.parse().map(Self).map_err(|_| IdentifierError::NotNumeric { kind: $kind })
			}
		}
	};
}

macro_rules! def_text_id {
	($name:ident, $doc:literal, $kind:literal, $normalize:path) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new value after normalization and validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				$normalize(value.as_ref()).map(Self)
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

/// Maximum handle length in characters.
pub const HANDLE_MAX_LEN: usize = 50;
/// Maximum email length in characters.
pub const EMAIL_MAX_LEN: usize = 100;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} cannot be empty.")]
	Empty {
		/// Kind of identifier (handle, email, principal, tenant).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier.
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// The value is not a well-formed email address.
	#[error("Email address is malformed.")]
	MalformedEmail,
	/// A numeric identifier could not be parsed.
	#[error("{kind} identifier must be numeric.")]
	NotNumeric {
		/// Kind of identifier.
		kind: &'static str,
	},
}

def_numeric_id! { PrincipalId, "Opaque numeric identifier of a principal.", "Principal" }
def_numeric_id! { TenantId, "Opaque numeric identifier of a tenant (family).", "Tenant" }
def_text_id! { Handle, "Globally unique handle of a principal.", "Handle", normalize_handle }
def_text_id! { Email, "Case-folded, globally unique email address.", "Email", normalize_email }

impl Handle {
	/// Derives a handle from arbitrary text by keeping only the handle alphabet
	/// (ASCII alphanumerics, `.`, `_`, `-`), lowercased and truncated.
	///
	/// Returns `None` when nothing usable remains.
	pub fn sanitized(raw: &str) -> Option<Self> {
		let candidate = raw
			.chars()
			.filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
			.map(|c| c.to_ascii_lowercase())
			.take(HANDLE_MAX_LEN)
			.collect::<String>();

		Self::new(candidate).ok()
	}

	/// Appends a numeric suffix, trimming the base so the result stays within bounds.
	pub fn with_suffix(&self, suffix: u32) -> Self {
		let suffix = suffix.to_string();
		let keep = HANDLE_MAX_LEN.saturating_sub(suffix.len());
		let base = self.0.chars().take(keep).collect::<String>();

		Self(format!("{base}{suffix}"))
	}
}

impl Email {
	/// Returns the part before `@`.
	pub fn local_part(&self) -> &str {
		self.0.split_once('@').map(|(local, _)| local).unwrap_or(&self.0)
	}
}

fn normalize_handle(view: &str) -> Result<String, IdentifierError> {
	const KIND: &str = "Handle";

	if view.is_empty() {
		return Err(IdentifierError::Empty { kind: KIND });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind: KIND });
	}
	if view.chars().count() > HANDLE_MAX_LEN {
		return Err(IdentifierError::TooLong { kind: KIND, max: HANDLE_MAX_LEN });
	}

	Ok(view.to_owned())
}

fn normalize_email(view: &str) -> Result<String, IdentifierError> {
	const KIND: &str = "Email";

	let view = view.trim();

	if view.is_empty() {
		return Err(IdentifierError::Empty { kind: KIND });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind: KIND });
	}
	if view.chars().count() > EMAIL_MAX_LEN {
		return Err(IdentifierError::TooLong { kind: KIND, max: EMAIL_MAX_LEN });
	}

	match view.split_once('@') {
		Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
			Ok(view.to_lowercase()),
		_ => Err(IdentifierError::MalformedEmail),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn emails_are_case_folded_and_validated() {
		let email = Email::new(" Jane.Doe@Example.COM ").expect("Email fixture should be valid.");

		assert_eq!(email.as_ref(), "jane.doe@example.com");
		assert_eq!(email.local_part(), "jane.doe");
		assert_eq!(Email::new("no-at-sign"), Err(IdentifierError::MalformedEmail));
		assert_eq!(Email::new("a@b@c"), Err(IdentifierError::MalformedEmail));
		assert_eq!(Email::new("@example.com"), Err(IdentifierError::MalformedEmail));
		assert!(Email::new("").is_err());
	}

	#[test]
	fn handles_reject_whitespace_and_length() {
		assert!(Handle::new("jane doe").is_err());
		assert!(Handle::new("").is_err());

		let exact = "a".repeat(HANDLE_MAX_LEN);

		Handle::new(&exact).expect("Exact length should succeed.");

		assert!(Handle::new("a".repeat(HANDLE_MAX_LEN + 1)).is_err());
	}

	#[test]
	fn sanitized_handles_keep_the_handle_alphabet() {
		let handle = Handle::sanitized("Jane+Tag").expect("Sanitized handle should remain.");

		assert_eq!(handle.as_ref(), "janetag");
		assert!(Handle::sanitized("+++").is_none());

		let long = Handle::new("b".repeat(HANDLE_MAX_LEN)).expect("Long handle should be valid.");
		let suffixed = long.with_suffix(12);

		assert_eq!(suffixed.len(), HANDLE_MAX_LEN);
		assert!(suffixed.ends_with("12"));
	}

	#[test]
	fn numeric_ids_parse_and_serialize_transparently() {
		let id: PrincipalId = "42".parse().expect("Numeric id should parse.");

		assert_eq!(id.get(), 42);
		assert_eq!(format!("{id:?}"), "Principal(42)");
		assert_eq!(serde_json::to_string(&id).expect("Id should serialize."), "42");
		assert_eq!(
			"x".parse::<TenantId>(),
			Err(IdentifierError::NotNumeric { kind: "Tenant" })
		);
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let email: Email =
			serde_json::from_str("\"JANE@example.com\"").expect("Email should deserialize.");

		assert_eq!(email.as_ref(), "jane@example.com");
		assert!(serde_json::from_str::<Handle>("\"with space\"").is_err());
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<Handle, u8> = HashMap::from_iter([(
			Handle::new("jane").expect("Handle used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("jane"), Some(&7));
	}
}
