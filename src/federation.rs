//! Third-party identity federation: the CSRF + PKCE handshake, provider profiles, and the
//! provider contract.

pub mod handshake;
pub mod profile;
pub mod provider;

pub use handshake::*;
pub use profile::*;
pub use provider::*;
