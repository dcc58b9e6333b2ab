//! Argon2 password hashing.

// crates.io
use argon2::{
	Argon2,
	password_hash::{
		PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
	},
};
// self
use crate::error::ConfigError;

/// Hashes `password` into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ConfigError> {
	let salt = SaltString::generate(&mut OsRng);

	Argon2::default()
		.hash_password(password.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|e| ConfigError::PasswordHash { message: e.to_string() })
}

/// Checks `password` against a stored PHC string. Unparseable hashes never verify.
pub fn verify_password(password: &str, phc: &str) -> bool {
	let Ok(parsed) = PasswordHash::new(phc) else {
		return false;
	};

	Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn hashes_verify_only_the_original_password() {
		let hash = hash_password("hunter2").expect("Hashing should succeed.");

		assert!(hash.starts_with("$argon2"));
		assert!(verify_password("hunter2", &hash));
		assert!(!verify_password("hunter3", &hash));
		assert!(!verify_password("hunter2", "not-a-phc-string"));
	}
}
