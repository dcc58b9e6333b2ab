//! Refresh-credential validation and rotation.
//!
//! [`Authority::refresh`] verifies the presented credential against the store, mints a new pair,
//! and swaps the stored row with a compare-and-swap keyed by the presented value, so of two
//! devices presenting the same credential exactly one wins. The winner's pair is broadcast on the
//! principal's tenant channel.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::RefreshCredential,
	broadcast::{SessionEvent, TokenRefreshEvent},
	error::{AuthenticationError, ValidationError},
	flows::{Authority, SessionGrant},
	obs::{self, FlowKind},
	store::CompareAndSwapOutcome,
	token::RefreshRejection,
};

impl Authority {
	/// Checks a presented refresh credential against the current clock.
	pub async fn validate_refresh(&self, token: &str) -> Result<RefreshCredential> {
		self.validate_refresh_at(token, OffsetDateTime::now_utc()).await
	}

	/// Checks a presented refresh credential against `now`: the signature must verify, a row with
	/// the exact value must exist, and that row must be neither revoked nor expired.
	pub async fn validate_refresh_at(
		&self,
		token: &str,
		now: OffsetDateTime,
	) -> Result<RefreshCredential> {
		self.validator.decode_refresh_at(token, now).map_err(rejected)?;

		let credential = self
			.store
			.credential(token)
			.await?
			.ok_or_else(|| rejected(RefreshRejection::NotFound))?;

		credential.check_at(now).map_err(rejected)?;

		Ok(credential)
	}

	/// Rotates `refresh_token` into a new pair.
	pub async fn refresh(&self, refresh_token: &str) -> Result<SessionGrant> {
		obs::observe(FlowKind::Refresh, "refresh", async move {
			if refresh_token.is_empty() {
				return Err(ValidationError::MissingField { field: "refreshToken" }.into());
			}

			self.refresh_metrics.record_attempt();

			let result = self.rotate(refresh_token).await;

			match &result {
				Ok(grant) => {
					self.refresh_metrics.record_success();

					tracing::debug!(principal = %grant.principal.id, "refresh credential rotated");
				},
				Err(e) => {
					self.refresh_metrics.record_failure();

					match e.refresh_rejection() {
						Some(rejection) =>
							tracing::warn!(%rejection, "refresh credential rejected"),
						None if e.is_internal() => tracing::error!(error = %e, "refresh failed"),
						None => tracing::warn!(error = %e, "refresh failed"),
					}
				},
			}

			result
		})
		.await
	}

	async fn rotate(&self, presented: &str) -> Result<SessionGrant> {
		let now = OffsetDateTime::now_utc();
		let credential = self.validate_refresh_at(presented, now).await?;
		// The row is intentionally left in place when its principal is gone.
		let principal = self
			.store
			.principal(credential.principal)
			.await?
			.ok_or(AuthenticationError::PrincipalNotFound)?;
		let minted = self.issuer.mint(principal.id, now)?;

		match self.store.rotate_credential(presented, minted.credential).await? {
			CompareAndSwapOutcome::Updated => {},
			CompareAndSwapOutcome::RefreshMismatch | CompareAndSwapOutcome::Missing => {
				self.refresh_metrics.record_lost_race();

				return Err(rejected(RefreshRejection::NotFound));
			},
		}

		if let Some(tenant) = principal.tenant {
			let delivered = self.broadcaster.publish(
				tenant,
				SessionEvent::TokenRefresh(TokenRefreshEvent {
					access_token: minted.pair.access_token.clone(),
					refresh_token: minted.pair.refresh_token.clone(),
					principal_id: principal.id,
				}),
			);

			tracing::debug!(%tenant, delivered, "broadcast rotated pair");
		}

		Ok(SessionGrant { principal, tokens: minted.pair, created: false })
	}
}

fn rejected(rejection: RefreshRejection) -> Error {
	AuthenticationError::RefreshRejected(rejection).into()
}
