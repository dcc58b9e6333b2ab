//! Session and identity-federation core for multi-tenant household apps: rotating refresh
//! credentials, single-flight client refresh, race-aware proxies, and per-family session fan-out.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod broadcast;
pub mod client;
pub mod config;
pub mod error;
pub mod federation;
pub mod flows;
#[cfg(feature = "reqwest")] pub mod http;
pub mod obs;
pub mod proxy;
pub mod store;
pub mod token;

#[cfg(feature = "server")] pub mod api;

#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and fixtures shared by unit and integration tests.

	pub use crate::_prelude::*;

	// self
	#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
	use crate::{
		auth::{Email, Handle, NewPrincipal, Principal, TenantId, password},
		config::AuthConfig,
		flows::Authority,
		store::{CredentialStore, InsertOutcome, MemoryStore},
	};

	/// Access-token signing secret used by test fixtures.
	pub const TEST_ACCESS_SECRET: &str = "test-access-secret-0123456789abcdef";
	/// Refresh-credential signing secret used by test fixtures.
	pub const TEST_REFRESH_SECRET: &str = "test-refresh-secret-0123456789abcdef";
	/// Password assigned to principals created by [`seed_principal`].
	pub const TEST_PASSWORD: &str = "correct horse battery staple";

	/// Builds a configuration with fixed secrets and a local app URL.
	pub fn test_config() -> AuthConfig {
		let app_url = Url::parse("http://localhost:3000").expect("App URL fixture should parse.");

		AuthConfig::new(TEST_ACCESS_SECRET, TEST_REFRESH_SECRET, app_url)
	}

	/// Constructs an [`Authority`] backed by a fresh in-memory store.
	pub fn build_test_authority() -> (Authority, Arc<MemoryStore>) {
		build_test_authority_with(test_config())
	}

	/// Constructs an [`Authority`] for the provided configuration and a fresh in-memory store.
	pub fn build_test_authority_with(config: AuthConfig) -> (Authority, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let authority =
			Authority::new(store, config).expect("Test configuration should build an authority.");

		(authority, store_backend)
	}

	/// Inserts a password-backed principal directly into the store.
	pub async fn seed_principal(
		store: &MemoryStore,
		handle: &str,
		email: &str,
		tenant: Option<TenantId>,
	) -> Principal {
		let handle = Handle::new(handle).expect("Handle fixture should be valid.");
		let email = Email::new(email).expect("Email fixture should be valid.");
		let hash =
			password::hash_password(TEST_PASSWORD).expect("Password fixture should hash.");
		let mut new = NewPrincipal::with_password(handle, email, hash);

		new.tenant = tenant;

		match store.insert_principal(new).await.expect("Seeding a principal should succeed.") {
			InsertOutcome::Inserted(principal) => principal,
			outcome => panic!("Principal fixture collided with an existing row: {outcome:?}."),
		}
	}

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {http_body_util as _, httpmock as _, tower as _};
#[cfg(feature = "server")] use {color_eyre as _, tracing_subscriber as _};
