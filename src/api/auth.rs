//! Password, refresh, logout, and validation endpoints.

// crates.io
use axum::{
	Json,
	extract::State,
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
};
// self
use crate::{
	_prelude::*,
	api::{AppState, SessionBody, bearer_token},
	error::AuthenticationError,
	flows::Registration,
};

/// `POST /auth/login` body.
#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginRequest {
	email: String,
	password: String,
}

/// `POST /auth/refresh-token` and `POST /auth/logout` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshRequest {
	refresh_token: String,
}

/// `POST /auth/register`.
pub async fn register(
	State(state): State<AppState>,
	Json(registration): Json<Registration>,
) -> Result<(StatusCode, Json<SessionBody>)> {
	let grant = state.authority.register(registration).await?;

	Ok((StatusCode::CREATED, Json(grant.into())))
}

/// `POST /auth/login`.
pub async fn login(
	State(state): State<AppState>,
	Json(request): Json<LoginRequest>,
) -> Result<Json<SessionBody>> {
	let grant = state.authority.login(&request.email, &request.password).await?;

	Ok(Json(grant.into()))
}

/// `POST /auth/refresh-token`.
pub async fn refresh_token(
	State(state): State<AppState>,
	Json(request): Json<RefreshRequest>,
) -> Result<Json<SessionBody>> {
	let grant = state.authority.refresh(&request.refresh_token).await?;

	Ok(Json(grant.into()))
}

/// `POST /auth/logout`; always succeeds.
pub async fn logout(
	State(state): State<AppState>,
	headers: HeaderMap,
	request: Option<Json<RefreshRequest>>,
) -> Json<serde_json::Value> {
	let refresh_token = request.as_ref().map(|Json(request)| request.refresh_token.as_str());
	let revoked = state.authority.logout(bearer_token(&headers), refresh_token).await;

	tracing::debug!(revoked, "logout");

	Json(serde_json::json!({ "message": "Logged out successfully." }))
}

/// `GET /auth/validate`.
pub async fn validate(State(state): State<AppState>, headers: HeaderMap) -> Response {
	let result = match bearer_token(&headers) {
		Some(token) => state.authority.authenticate(token).await,
		None => Err(AuthenticationError::MissingBearer.into()),
	};

	match result {
		Ok(principal) =>
			Json(serde_json::json!({ "valid": true, "principal": principal })).into_response(),
		Err(e) if e.is_internal() => e.into_response(),
		Err(e) => (
			StatusCode::UNAUTHORIZED,
			Json(serde_json::json!({ "valid": false, "message": e.to_string() })),
		)
			.into_response(),
	}
}
