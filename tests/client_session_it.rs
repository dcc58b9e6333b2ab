#![cfg(feature = "reqwest")]

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// crates.io
use futures::future;
use httpmock::prelude::*;
use tokio::sync::Notify;
// self
use homestead_auth::{
	_preludet::*,
	auth::{Principal, PrincipalId, TenantId, TokenSecret},
	broadcast::{SessionBroadcaster, SessionEvent, TokenRefreshEvent},
	client::{
		ClientError, ClientSession, HttpRefreshTransport, RefreshTransport, TokenGrant,
		TransportFuture,
	},
	flows::Authority,
};

const FAMILY: TenantId = TenantId::new(3);

/// Forwards to an in-process authority, optionally holding every refresh until released.
struct AuthorityTransport {
	authority: Authority,
	gate: Option<Arc<Notify>>,
	refreshes: AtomicUsize,
	fail_logout: bool,
	logouts: AtomicUsize,
}
impl AuthorityTransport {
	fn new(authority: Authority) -> Self {
		Self {
			authority,
			gate: None,
			refreshes: AtomicUsize::new(0),
			fail_logout: false,
			logouts: AtomicUsize::new(0),
		}
	}

	fn refreshes(&self) -> usize {
		self.refreshes.load(Ordering::SeqCst)
	}
}
impl RefreshTransport for AuthorityTransport {
	fn refresh<'a>(&'a self, refresh_token: &'a str) -> TransportFuture<'a, TokenGrant> {
		Box::pin(async move {
			self.refreshes.fetch_add(1, Ordering::SeqCst);

			if let Some(gate) = &self.gate {
				gate.notified().await;
			}

			let grant = self
				.authority
				.refresh(refresh_token)
				.await
				.map_err(|e| ClientError::Rejected { status: e.status(), message: e.to_string() })?;

			Ok(TokenGrant {
				access_token: grant.tokens.access_token,
				refresh_token: grant.tokens.refresh_token,
				principal: Some(grant.principal),
			})
		})
	}

	fn logout<'a>(
		&'a self,
		access_token: &'a str,
		refresh_token: Option<&'a str>,
	) -> TransportFuture<'a, ()> {
		Box::pin(async move {
			self.logouts.fetch_add(1, Ordering::SeqCst);

			if self.fail_logout {
				return Err(ClientError::Network { message: "connection reset".into() });
			}

			self.authority.logout(Some(access_token), refresh_token).await;

			Ok(())
		})
	}
}

async fn signed_in_grant(authority: &Authority, principal: &Principal) -> TokenGrant {
	let tokens = authority.issue(principal.id).await.expect("Issuance should succeed.");

	TokenGrant {
		access_token: tokens.access_token,
		refresh_token: tokens.refresh_token,
		principal: Some(principal.clone()),
	}
}

#[tokio::test]
async fn concurrent_refreshes_share_one_network_call() {
	let (authority, store) = build_test_authority();
	let principal = seed_principal(&store, "jane", "jane@example.com", None).await;
	let gate = Arc::new(Notify::new());
	let mut transport = AuthorityTransport::new(authority.clone());

	transport.gate = Some(gate.clone());

	let transport = Arc::new(transport);
	let session = ClientSession::new(transport.clone());

	session.sign_in(signed_in_grant(&authority, &principal).await);

	let callers = (0..5).map(|_| {
		let session = session.clone();

		async move { session.refresh().await }
	});
	let (results, ()) = tokio::join!(future::join_all(callers), async {
		tokio::task::yield_now().await;
		gate.notify_one();
	});
	let grants = results
		.into_iter()
		.map(|result| result.expect("Every caller should observe the shared refresh."))
		.collect::<Vec<_>>();

	assert_eq!(transport.refreshes(), 1);
	assert_eq!(session.coordinator().network_calls(), 1);
	assert!(grants.windows(2).all(|pair| pair[0] == pair[1]));
	assert!(!session.coordinator().is_refreshing());

	let stored = session.snapshot().expect("The session should stay signed in.");

	assert_eq!(stored.refresh_token, grants[0].refresh_token);
	assert_eq!(store.credential_count(), 1);
}

#[tokio::test]
async fn access_tokens_are_refreshed_only_near_expiry() {
	let (authority, store) = build_test_authority();
	let principal = seed_principal(&store, "jane", "jane@example.com", None).await;
	let transport = Arc::new(AuthorityTransport::new(authority.clone()));
	let session = ClientSession::new(transport.clone());
	let grant = signed_in_grant(&authority, &principal).await;

	session.sign_in(grant.clone());

	let now = OffsetDateTime::now_utc();
	let fresh = session.access_token_at(now).await.expect("A fresh token should be returned.");

	assert_eq!(fresh, grant.access_token);
	assert_eq!(transport.refreshes(), 0);

	let later = now + Duration::minutes(14) + Duration::seconds(30);
	let renewed =
		session.access_token_at(later).await.expect("A stale token should be refreshed first.");

	assert_ne!(renewed, grant.access_token);
	assert_eq!(transport.refreshes(), 1);
}

#[tokio::test]
async fn failed_refresh_signs_the_session_out() {
	let (authority, store) = build_test_authority();
	let principal = seed_principal(&store, "jane", "jane@example.com", None).await;
	let transport = Arc::new(AuthorityTransport::new(authority.clone()));
	let session = ClientSession::new(transport);
	let grant = signed_in_grant(&authority, &principal).await;

	session.sign_in(grant.clone());
	authority.revoke(grant.refresh_token.expose()).await.expect("Revocation should succeed.");

	let error = session.refresh().await.expect_err("A revoked credential should not refresh.");

	assert!(error.is_rejection());
	assert!(!session.is_authenticated());
	assert_eq!(session.access_token().await, Err(ClientError::SignedOut));
	assert_eq!(session.refresh().await, Err(ClientError::SignedOut));
}

#[tokio::test]
async fn siblings_adopt_broadcast_pairs() {
	let (authority, store) = build_test_authority();
	let principal = seed_principal(&store, "jane", "jane@example.com", Some(FAMILY)).await;
	let grant = signed_in_grant(&authority, &principal).await;
	let phone = ClientSession::new(Arc::new(AuthorityTransport::new(authority.clone())));
	let tablet = ClientSession::new(Arc::new(AuthorityTransport::new(authority.clone())));
	let mut tablet_channel = authority.broadcaster.subscribe(FAMILY);

	phone.sign_in(grant.clone());
	tablet.sign_in(grant);

	let rotated = phone.refresh().await.expect("The phone should refresh.");
	let event = homestead_auth::broadcast::next_event(&mut tablet_channel)
		.await
		.expect("The tablet should receive the rotation.");

	assert!(tablet.apply_event(&event));

	let adopted = tablet.snapshot().expect("The tablet should stay signed in.");

	assert_eq!(adopted.access_token, rotated.access_token);
	assert_eq!(adopted.refresh_token, rotated.refresh_token);

	let foreign = SessionEvent::TokenRefresh(TokenRefreshEvent {
		access_token: TokenSecret::new("someone-else-access"),
		refresh_token: TokenSecret::new("someone-else-refresh"),
		principal_id: (principal.id.get() + 1).into(),
	});

	assert!(!tablet.apply_event(&foreign));
	assert_eq!(tablet.snapshot().map(|grant| grant.refresh_token), Some(rotated.refresh_token));
}

#[tokio::test]
async fn bare_pair_sessions_adopt_their_own_principal_events() {
	let (authority, store) = build_test_authority();
	let principal = seed_principal(&store, "jane", "jane@example.com", Some(FAMILY)).await;
	let mut grant = signed_in_grant(&authority, &principal).await;

	grant.principal = None;

	let session = ClientSession::new(Arc::new(AuthorityTransport::new(authority.clone())));
	let pushed = |principal_id: PrincipalId, refresh: &str| {
		SessionEvent::TokenRefresh(TokenRefreshEvent {
			access_token: TokenSecret::new(format!("{refresh}-access")),
			refresh_token: TokenSecret::new(refresh),
			principal_id,
		})
	};

	session.sign_in(grant);

	assert!(!session.apply_event(&pushed((principal.id.get() + 1).into(), "foreign")));
	assert!(session.apply_event(&pushed(principal.id, "pushed-refresh")));

	let adopted = session.snapshot().expect("The session should stay signed in.");

	assert_eq!(adopted.refresh_token.expose(), "pushed-refresh");
	assert!(adopted.principal.is_none());
}

#[tokio::test]
async fn following_a_channel_applies_events_until_it_closes() {
	let (authority, store) = build_test_authority();
	let principal = seed_principal(&store, "jane", "jane@example.com", Some(FAMILY)).await;
	let session = ClientSession::new(Arc::new(AuthorityTransport::new(authority.clone())));
	let broadcaster = SessionBroadcaster::default();
	let receiver = broadcaster.subscribe(FAMILY);

	session.sign_in(signed_in_grant(&authority, &principal).await);
	broadcaster.publish(
		FAMILY,
		SessionEvent::TokenRefresh(TokenRefreshEvent {
			access_token: TokenSecret::new("pushed-access"),
			refresh_token: TokenSecret::new("pushed-refresh"),
			principal_id: principal.id,
		}),
	);
	drop(broadcaster);
	session.follow(receiver).await;

	let adopted = session.snapshot().expect("The session should stay signed in.");

	assert_eq!(adopted.refresh_token.expose(), "pushed-refresh");
}

#[tokio::test]
async fn logout_clears_state_even_when_the_issuer_fails() {
	let (authority, store) = build_test_authority();
	let principal = seed_principal(&store, "jane", "jane@example.com", None).await;
	let mut transport = AuthorityTransport::new(authority.clone());

	transport.fail_logout = true;

	let transport = Arc::new(transport);
	let session = ClientSession::new(transport.clone());

	session.sign_in(signed_in_grant(&authority, &principal).await);
	session.logout().await;

	assert!(!session.is_authenticated());
	assert_eq!(transport.logouts.load(Ordering::SeqCst), 1);
	assert_eq!(store.credential_count(), 1);

	session.logout().await;

	assert_eq!(transport.logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn http_transport_speaks_the_issuer_endpoints() {
	let server = MockServer::start_async().await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/refresh-token")
				.json_body(serde_json::json!({ "refreshToken": "refresh-1" }));
			then.status(200).json_body(serde_json::json!({
				"accessToken": "access-2",
				"refreshToken": "refresh-2",
			}));
		})
		.await;
	let logout_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/logout").header("authorization", "Bearer access-2");
			then.status(200)
				.json_body(serde_json::json!({ "message": "Logged out successfully." }));
		})
		.await;
	let base_url = Url::parse(&server.base_url()).expect("Mock server URL should parse.");
	let transport = HttpRefreshTransport::with_http_client(base_url, test_reqwest_http_client());
	let grant = transport.refresh("refresh-1").await.expect("Refresh should succeed.");

	assert_eq!(grant.access_token.expose(), "access-2");
	assert_eq!(grant.refresh_token.expose(), "refresh-2");
	assert!(grant.principal.is_none());

	transport.logout("access-2", Some("refresh-2")).await.expect("Logout should succeed.");
	refresh_mock.assert_async().await;
	logout_mock.assert_async().await;
}

#[tokio::test]
async fn http_transport_surfaces_rejections() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/refresh-token");
			then.status(403)
				.json_body(serde_json::json!({ "message": "Invalid or expired refresh token." }));
		})
		.await;

	let base_url = Url::parse(&server.base_url()).expect("Mock server URL should parse.");
	let transport = HttpRefreshTransport::with_http_client(base_url, test_reqwest_http_client());
	let error = transport.refresh("stale").await.expect_err("A 403 should be a rejection.");

	assert_eq!(error, ClientError::Rejected {
		status: 403,
		message: "Invalid or expired refresh token.".into(),
	});
	assert!(error.is_rejection());
}
