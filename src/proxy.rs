//! Proxy-side refresh race resolution.
//!
//! Two devices sharing a refresh credential can both try to rotate it; the issuer's
//! compare-and-swap lets exactly one win. [`RaceResolver`] sits in front of the issuer for a
//! proxy and turns the loser's rejection into something actionable: if the presented access
//! token is still genuinely valid the request proceeds with it, otherwise the caller is told to
//! retry with refreshed credentials instead of being logged out.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::{ClientError, RefreshTransport, TokenGrant},
	flows::FlowGuards,
	obs::{self, FlowKind},
	token,
};

/// What a proxy should do with a request whose credentials needed attention.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProxyOutcome {
	/// A rotation succeeded (or was reused); forward with the new access token and hand the pair
	/// back to the client.
	Refreshed(TokenGrant),
	/// The refresh lost a race but the presented access token has not expired; forward with it.
	Proceed {
		/// Access token to forward.
		access_token: TokenSecret,
	},
	/// The refresh lost a race and the access token is expired; the client should pick up the
	/// sibling's pair (or re-authenticate) and retry.
	RetryWithRefreshedCredentials,
}

#[derive(Debug)]
struct RecentRotation {
	grant: TokenGrant,
	at: OffsetDateTime,
}

/// Single-flighted refresh front for a proxy.
pub struct RaceResolver {
	transport: Arc<dyn RefreshTransport>,
	guards: FlowGuards<String>,
	recent: Mutex<HashMap<String, RecentRotation>>,
	reuse_window: Duration,
}
impl RaceResolver {
	/// How long a rotation is reused for parallel requests presenting the same credential.
	pub const DEFAULT_REUSE_WINDOW: Duration = Duration::seconds(10);

	/// Creates a resolver over the issuer transport.
	pub fn new(transport: Arc<dyn RefreshTransport>) -> Self {
		Self {
			transport,
			guards: FlowGuards::default(),
			recent: Default::default(),
			reuse_window: Self::DEFAULT_REUSE_WINDOW,
		}
	}

	/// Overrides the reuse window.
	pub fn with_reuse_window(mut self, reuse_window: Duration) -> Self {
		self.reuse_window = reuse_window;

		self
	}

	/// Resolves against the current clock.
	pub async fn resolve(
		&self,
		access_token: &str,
		refresh_token: &str,
	) -> Result<ProxyOutcome, ClientError> {
		self.resolve_at(access_token, refresh_token, OffsetDateTime::now_utc()).await
	}

	/// Refreshes `refresh_token`, or classifies `access_token` when the credential is rejected
	/// (403) or the refresh times out.
	///
	/// Calls presenting the same refresh credential are serialized, and a successful rotation is
	/// reused by the others for the reuse window. Every other failure is returned as an error,
	/// including a 401 for a principal that no longer exists.
	pub async fn resolve_at(
		&self,
		access_token: &str,
		refresh_token: &str,
		now: OffsetDateTime,
	) -> Result<ProxyOutcome, ClientError> {
		obs::observe(FlowKind::RaceResolution, "resolve", async move {
			if refresh_token.is_empty() {
				return Ok(Self::classify(access_token, now));
			}

			let key = TokenSecret::new(refresh_token).fingerprint();
			let guard = self.guards.guard(key.clone());
			let outcome = {
				let _held = guard.lock().await;

				match self.recent_rotation(&key, now) {
					Some(grant) => {
						tracing::debug!(credential = %key, "reusing recent rotation");

						Ok(ProxyOutcome::Refreshed(grant))
					},
					None => self.refresh(key.clone(), access_token, refresh_token, now).await,
				}
			};

			drop(guard);
			self.guards.prune();

			outcome
		})
		.await
	}

	/// Zero-buffer expiry check of the presented access token.
	pub fn classify(access_token: &str, now: OffsetDateTime) -> ProxyOutcome {
		if token::is_expired_at(access_token, Duration::ZERO, now) {
			ProxyOutcome::RetryWithRefreshedCredentials
		} else {
			ProxyOutcome::Proceed { access_token: TokenSecret::new(access_token) }
		}
	}

	async fn refresh(
		&self,
		key: String,
		access_token: &str,
		refresh_token: &str,
		now: OffsetDateTime,
	) -> Result<ProxyOutcome, ClientError> {
		match self.transport.refresh(refresh_token).await {
			Ok(grant) => {
				self.remember(key, grant.clone(), now);

				Ok(ProxyOutcome::Refreshed(grant))
			},
			Err(e) if e.is_credential_rejection() || matches!(e, ClientError::Timeout) => {
				let outcome = Self::classify(access_token, now);

				tracing::info!(
					credential = %key,
					error = %e,
					proceed = matches!(outcome, ProxyOutcome::Proceed { .. }),
					"refresh lost a race"
				);

				Ok(outcome)
			},
			Err(e) => {
				tracing::warn!(credential = %key, error = %e, "refresh failed");

				Err(e)
			},
		}
	}

	fn recent_rotation(&self, key: &str, now: OffsetDateTime) -> Option<TokenGrant> {
		let recent = self.recent.lock();

		recent
			.get(key)
			.filter(|rotation| now - rotation.at < self.reuse_window)
			.map(|rotation| rotation.grant.clone())
	}

	fn remember(&self, key: String, grant: TokenGrant, now: OffsetDateTime) {
		let mut recent = self.recent.lock();

		recent.retain(|_, rotation| now - rotation.at < self.reuse_window);
		recent.insert(key, RecentRotation { grant, at: now });
	}
}
impl Debug for RaceResolver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RaceResolver")
			.field("in_flight", &self.guards.len())
			.field("reuse_window", &self.reuse_window)
			.finish_non_exhaustive()
	}
}
