//! Standalone issuer: serves the auth router over an in-memory store.

// std
use std::{net::SocketAddr, sync::Arc};
// crates.io
use color_eyre::Result;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
// self
use homestead_auth::{
	api::{self, AppState},
	config::AuthConfig,
	federation::OAuthIdentityProvider,
	flows::Authority,
	store::{CredentialStore, MemoryStore},
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let config = AuthConfig::from_env()?;
	let bind_addr = std::env::var("BIND_ADDR")
		.unwrap_or_else(|_| DEFAULT_BIND_ADDR.into())
		.parse::<SocketAddr>()?;
	let federation = config.federation.clone();
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let mut authority = Authority::new(store, config)?;

	match federation {
		Some(federation) => {
			authority =
				authority.with_identity_provider(Arc::new(OAuthIdentityProvider::new(federation)?));

			tracing::info!("federated sign-in enabled");
		},
		None => tracing::info!("federated sign-in disabled"),
	}

	let listener = TcpListener::bind(bind_addr).await?;

	tracing::info!(%bind_addr, "homestead-authd listening");

	axum::serve(listener, api::router(AppState::new(authority))).await?;

	Ok(())
}
