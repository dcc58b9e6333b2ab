//! Client session holding one device's credential pair.

// self
use crate::{
	_prelude::*,
	auth::{Principal, TokenSecret},
	broadcast::{self, SessionEvent, SessionReceiver},
	client::{ClientError, RefreshCoordinator, RefreshTransport, TokenGrant},
	obs::{self, FlowKind},
	token::{self, DEFAULT_SKEW_BUFFER},
};

type SessionState = Arc<RwLock<Option<TokenGrant>>>;

/// One device's session: the current pair, its refresh coordinator, and the issuer transport.
///
/// Clones share the pair and the coordinator, so concurrent requests made through any clone
/// trigger at most one refresh.
#[derive(Clone)]
pub struct ClientSession {
	transport: Arc<dyn RefreshTransport>,
	coordinator: RefreshCoordinator,
	state: SessionState,
	skew_buffer: Duration,
}
impl ClientSession {
	/// Creates a signed-out session.
	pub fn new(transport: Arc<dyn RefreshTransport>) -> Self {
		Self {
			transport,
			coordinator: RefreshCoordinator::default(),
			state: Default::default(),
			skew_buffer: DEFAULT_SKEW_BUFFER,
		}
	}

	/// Overrides how long before expiry an access token is refreshed.
	pub fn with_skew_buffer(mut self, skew_buffer: Duration) -> Self {
		self.skew_buffer = skew_buffer;

		self
	}

	/// Stores the pair returned by sign-in.
	pub fn sign_in(&self, grant: TokenGrant) {
		*self.state.write() = Some(grant);
	}

	/// Copy of the current pair, if signed in.
	pub fn snapshot(&self) -> Option<TokenGrant> {
		self.state.read().clone()
	}

	/// Whether the session holds a pair.
	pub fn is_authenticated(&self) -> bool {
		self.state.read().is_some()
	}

	/// Signed-in principal, when known.
	pub fn principal(&self) -> Option<Principal> {
		self.state.read().as_ref().and_then(|grant| grant.principal.clone())
	}

	/// Refresh coordinator owned by this session.
	pub fn coordinator(&self) -> &RefreshCoordinator {
		&self.coordinator
	}

	/// Returns a usable access token, refreshing first when the current one is about to expire.
	pub async fn access_token(&self) -> Result<TokenSecret, ClientError> {
		self.access_token_at(OffsetDateTime::now_utc()).await
	}

	/// Same as [`ClientSession::access_token`] against an explicit clock.
	pub async fn access_token_at(&self, now: OffsetDateTime) -> Result<TokenSecret, ClientError> {
		let access_token = {
			let state = self.state.read();
			let grant = state.as_ref().ok_or(ClientError::SignedOut)?;

			grant.access_token.clone()
		};

		if !token::is_expired_at(access_token.expose(), self.skew_buffer, now) {
			return Ok(access_token);
		}

		let grant = self.refresh().await?;

		Ok(grant.access_token)
	}

	/// `Bearer …` header value for the current (fresh) access token.
	pub async fn authorization_header(&self) -> Result<String, ClientError> {
		let access_token = self.access_token().await?;

		Ok(format!("Bearer {}", access_token.expose()))
	}

	/// Refreshes the pair now, joining any refresh already in flight.
	///
	/// A failed refresh signs the session out, unless the pair changed while the request was in
	/// flight.
	pub async fn refresh(&self) -> Result<TokenGrant, ClientError> {
		let presented = {
			let state = self.state.read();

			state.as_ref().ok_or(ClientError::SignedOut)?.refresh_token.clone()
		};
		let transport = Arc::clone(&self.transport);
		let state = Arc::clone(&self.state);

		obs::observe(
			FlowKind::ClientRefresh,
			"refresh",
			self.coordinator.run(move || async move {
				let result = transport.refresh(presented.expose()).await;

				settle(&state, &presented, &result);

				result
			}),
		)
		.await
	}

	/// Adopts a broadcast pair when it belongs to this session's principal.
	///
	/// Sessions signed in with a bare pair identify their principal by the access token's
	/// subject.
	///
	/// Returns `true` when the pair was adopted.
	pub fn apply_event(&self, event: &SessionEvent) -> bool {
		let mut state = self.state.write();
		let Some(grant) = state.as_mut() else {
			return false;
		};

		let owner = match &grant.principal {
			Some(principal) => Some(principal.id),
			None => token::peek_subject(grant.access_token.expose()),
		};

		if owner != Some(event.principal_id()) {
			return false;
		}

		match event {
			SessionEvent::TokenRefresh(refresh) => {
				grant.access_token = refresh.access_token.clone();
				grant.refresh_token = refresh.refresh_token.clone();
			},
		}

		tracing::debug!(principal = %event.principal_id(), "adopted broadcast pair");

		true
	}

	/// Applies events from a tenant channel until it closes or the session signs out.
	pub async fn follow(&self, mut receiver: SessionReceiver) {
		while let Some(event) = broadcast::next_event(&mut receiver).await {
			if !self.is_authenticated() {
				break;
			}

			self.apply_event(&event);
		}
	}

	/// Asks the issuer to revoke the session, then clears local state whatever the outcome.
	pub async fn logout(&self) {
		let Some(grant) = self.state.write().take() else {
			return;
		};

		if let Err(e) = self
			.transport
			.logout(grant.access_token.expose(), Some(grant.refresh_token.expose()))
			.await
		{
			tracing::warn!(error = %e, "remote logout failed; local session cleared");
		}
	}
}
impl Debug for ClientSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientSession")
			.field("authenticated", &self.is_authenticated())
			.field("coordinator", &self.coordinator)
			.finish_non_exhaustive()
	}
}

fn settle(
	state: &RwLock<Option<TokenGrant>>,
	presented: &TokenSecret,
	result: &Result<TokenGrant, ClientError>,
) {
	let mut state = state.write();
	// A broadcast or sign-in replaced the pair while the request was in flight.
	let Some(current) = state.as_mut().filter(|grant| &grant.refresh_token == presented) else {
		return;
	};

	match result {
		Ok(grant) => {
			current.access_token = grant.access_token.clone();
			current.refresh_token = grant.refresh_token.clone();

			if grant.principal.is_some() {
				current.principal = grant.principal.clone();
			}
		},
		Err(e) => {
			tracing::warn!(error = %e, "refresh failed; signing out");

			*state = None;
		},
	}
}
