//! axum surface: JSON auth endpoints, the federated redirect flow, and the per-tenant SSE stream.

pub mod auth;
pub mod events;
pub mod federated;

// crates.io
use axum::{
	Json, Router,
	http::{HeaderMap, StatusCode, header},
	response::{IntoResponse, Response},
	routing::{get, post},
};
// self
use crate::{
	_prelude::*,
	auth::Principal,
	flows::{Authority, SessionGrant},
};

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
	/// Flow facade.
	pub authority: Authority,
}
impl AppState {
	/// Wraps an authority.
	pub fn new(authority: Authority) -> Self {
		Self { authority }
	}
}

/// Builds the router with every endpoint mounted.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/auth/register", post(auth::register))
		.route("/auth/login", post(auth::login))
		.route("/auth/refresh-token", post(auth::refresh_token))
		.route("/auth/logout", post(auth::logout))
		.route("/auth/validate", get(auth::validate))
		.route("/auth/federated/start", get(federated::start))
		.route("/auth/federated/callback", get(federated::callback))
		.route("/auth/federated/verify-token", post(federated::verify_token))
		.route("/events/:tenant_id", get(events::subscribe))
		.route("/health", get(health))
		.with_state(state)
}

/// Body returned by every endpoint that signs a principal in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBody {
	/// Signed-in principal.
	pub principal: Principal,
	/// New access token.
	pub access_token: String,
	/// New refresh credential.
	pub refresh_token: String,
}
impl From<SessionGrant> for SessionBody {
	fn from(grant: SessionGrant) -> Self {
		Self {
			principal: grant.principal,
			access_token: grant.tokens.access_token.expose().to_owned(),
			refresh_token: grant.tokens.refresh_token.expose().to_owned(),
		}
	}
}

#[derive(Debug, Serialize)]
struct MessageBody {
	message: String,
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status =
			StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		let message = if self.is_internal() {
			tracing::error!(error = %self, "request failed");

			"Internal server error.".to_owned()
		} else {
			self.to_string()
		};

		(status, Json(MessageBody { message })).into_response()
	}
}

async fn health() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "status": "ok" }))
}

/// Extracts the token from an `Authorization: Bearer …` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
	let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
	let (scheme, token) = value.split_once(' ')?;
	let token = token.trim();

	(scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
	// crates.io
	use axum::http::HeaderValue;
	// self
	use super::*;
	use crate::error::{AuthenticationError, ConfigError};

	#[test]
	fn bearer_parsing_accepts_only_the_bearer_scheme() {
		let mut headers = HeaderMap::new();

		assert_eq!(bearer_token(&headers), None);

		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer abc.def"));

		assert_eq!(bearer_token(&headers), Some("abc.def"));

		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));

		assert_eq!(bearer_token(&headers), None);

		headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));

		assert_eq!(bearer_token(&headers), None);
	}

	#[test]
	fn internal_errors_hide_their_details() {
		let response = Error::from(ConfigError::MissingSecret { name: "JWT_ACCESS_SECRET" })
			.into_response();

		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

		let response = Error::from(AuthenticationError::TenantMismatch).into_response();

		assert_eq!(response.status(), StatusCode::FORBIDDEN);
	}
}
