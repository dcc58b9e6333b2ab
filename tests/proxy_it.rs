// std
use std::sync::atomic::{AtomicUsize, Ordering};
// self
use homestead_auth::{
	_preludet::*,
	auth::TokenPair,
	client::{ClientError, RefreshTransport, TokenGrant, TransportFuture},
	flows::Authority,
	proxy::{ProxyOutcome, RaceResolver},
};

/// Calls the authority in-process, the way a colocated proxy would.
struct DirectTransport {
	authority: Authority,
	calls: AtomicUsize,
}
impl RefreshTransport for DirectTransport {
	fn refresh<'a>(&'a self, refresh_token: &'a str) -> TransportFuture<'a, TokenGrant> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			match self.authority.refresh(refresh_token).await {
				Ok(grant) => Ok(TokenGrant {
					access_token: grant.tokens.access_token,
					refresh_token: grant.tokens.refresh_token,
					principal: Some(grant.principal),
				}),
				Err(e) => Err(ClientError::Rejected { status: e.status(), message: e.to_string() }),
			}
		})
	}

	fn logout<'a>(
		&'a self,
		access_token: &'a str,
		refresh_token: Option<&'a str>,
	) -> TransportFuture<'a, ()> {
		Box::pin(async move {
			self.authority.logout(Some(access_token), refresh_token).await;

			Ok(())
		})
	}
}

async fn two_devices() -> (Authority, Arc<DirectTransport>, TokenPair) {
	let (authority, store) = build_test_authority();
	let principal = seed_principal(&store, "jane", "jane@example.com", None).await;
	let shared = authority.issue(principal.id).await.expect("Issuance should succeed.");
	let transport =
		Arc::new(DirectTransport { authority: authority.clone(), calls: AtomicUsize::new(0) });

	(authority, transport, shared)
}

#[tokio::test]
async fn losing_device_proceeds_with_a_live_access_token() {
	let (authority, transport, shared) = two_devices().await;

	authority
		.refresh(shared.refresh_token.expose())
		.await
		.expect("The first device should win the rotation.");

	let resolver = RaceResolver::new(transport.clone());
	let outcome = resolver
		.resolve(shared.access_token.expose(), shared.refresh_token.expose())
		.await
		.expect("A lost race should be resolved, not surfaced.");

	assert_eq!(outcome, ProxyOutcome::Proceed { access_token: shared.access_token.clone() });
	assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn losing_device_with_an_expired_access_token_is_asked_to_retry() {
	let (authority, transport, shared) = two_devices().await;

	authority
		.refresh(shared.refresh_token.expose())
		.await
		.expect("The first device should win the rotation.");

	let resolver = RaceResolver::new(transport);
	let later = OffsetDateTime::now_utc() + Duration::hours(1);
	let outcome = resolver
		.resolve_at(shared.access_token.expose(), shared.refresh_token.expose(), later)
		.await
		.expect("A lost race should be resolved, not surfaced.");

	assert_eq!(outcome, ProxyOutcome::RetryWithRefreshedCredentials);
}

#[tokio::test]
async fn parallel_requests_reuse_one_rotation() {
	let (authority, transport, shared) = two_devices().await;
	let resolver = RaceResolver::new(transport.clone());
	let (first, second) = tokio::join!(
		resolver.resolve(shared.access_token.expose(), shared.refresh_token.expose()),
		resolver.resolve(shared.access_token.expose(), shared.refresh_token.expose()),
	);
	let first = first.expect("The first request should refresh.");
	let second = second.expect("The second request should reuse the rotation.");

	assert!(matches!(first, ProxyOutcome::Refreshed(_)));
	assert_eq!(first, second);
	assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
	assert_eq!(authority.refresh_metrics.attempts(), 1);
}

#[tokio::test]
async fn deleted_principals_are_not_mistaken_for_a_lost_race() {
	let (authority, store) = build_test_authority();
	let principal = seed_principal(&store, "jane", "jane@example.com", None).await;
	let shared = authority.issue(principal.id).await.expect("Issuance should succeed.");
	let transport =
		Arc::new(DirectTransport { authority: authority.clone(), calls: AtomicUsize::new(0) });

	authority.delete_principal(principal.id).await.expect("Deletion should succeed.");

	let error = RaceResolver::new(transport)
		.resolve(shared.access_token.expose(), shared.refresh_token.expose())
		.await
		.expect_err("A missing principal should surface as an error.");

	assert!(matches!(error, ClientError::Rejected { status: 401, .. }));
}

#[tokio::test]
async fn missing_refresh_credentials_fall_back_to_classification() {
	let (_authority, transport, shared) = two_devices().await;
	let resolver = RaceResolver::new(transport.clone());
	let outcome = resolver
		.resolve(shared.access_token.expose(), "")
		.await
		.expect("Classification should not fail.");

	assert_eq!(outcome, ProxyOutcome::Proceed { access_token: shared.access_token.clone() });
	assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
	assert_eq!(
		RaceResolver::classify("not-a-token", OffsetDateTime::now_utc()),
		ProxyOutcome::RetryWithRefreshedCredentials
	);
}
