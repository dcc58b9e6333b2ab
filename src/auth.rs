//! Auth-domain identifiers, principals, refresh credentials, and token secrets.

pub mod credential;
pub mod id;
pub mod pair;
pub mod password;
pub mod principal;
pub mod secret;

pub use credential::*;
pub use id::*;
pub use pair::*;
pub use principal::*;
pub use secret::*;
