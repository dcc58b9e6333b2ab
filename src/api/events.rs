//! Server-sent event stream of a tenant channel.

// crates.io
use axum::{
	extract::{Path, State},
	http::HeaderMap,
	response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};
// self
use crate::{
	_prelude::*,
	api::{AppState, bearer_token},
	auth::TenantId,
	broadcast::SessionEvent,
	error::AuthenticationError,
};

/// `GET /events/:tenant_id`: streams the caller's own `token-refresh` events.
///
/// The bearer principal must belong to the tenant. Events for other principals of the tenant
/// are filtered out; missed events are never replayed.
pub async fn subscribe(
	State(state): State<AppState>,
	Path(tenant): Path<u64>,
	headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
	let tenant = TenantId::new(tenant);
	let token = bearer_token(&headers).ok_or(AuthenticationError::MissingBearer)?;
	let principal = state.authority.authenticate(token).await?;

	if !principal.belongs_to(tenant) {
		tracing::warn!(principal = %principal.id, %tenant, "event subscription outside tenant");

		return Err(AuthenticationError::TenantMismatch.into());
	}

	let receiver = state.authority.broadcaster.subscribe(tenant);
	let principal_id = principal.id;
	let stream = BroadcastStream::new(receiver).filter_map(move |item| match item {
		Ok(event) if event.principal_id() == principal_id => Some(to_sse(&event)),
		Ok(_) => None,
		Err(e) => {
			tracing::debug!(error = %e, "event stream lagged; skipping missed events");

			None
		},
	});

	tracing::debug!(principal = %principal_id, %tenant, "event stream opened");

	Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &SessionEvent) -> Result<Event, axum::Error> {
	let builder = Event::default().event(event.name());

	match event {
		SessionEvent::TokenRefresh(payload) => builder.json_data(payload),
	}
}
