//! Federated sign-in endpoints.
//!
//! The handshake nonce and PKCE verifier travel in two http-only cookies scoped to
//! `/auth/federated`; the state cookie also carries the handshake expiry so the callback can
//! enforce the lifetime server-side.

// crates.io
use axum::{
	Json,
	extract::{Query, State},
	http::{StatusCode, header},
	response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
// self
use crate::{
	_prelude::*,
	api::{AppState, SessionBody},
	config::AuthConfig,
	error::AuthenticationError,
	federation::Handshake,
};

/// Cookie holding the CSRF nonce and handshake expiry.
pub const STATE_COOKIE: &str = "oauth_state";
/// Cookie holding the PKCE verifier.
pub const VERIFIER_COOKIE: &str = "oauth_verifier";

const COOKIE_PATH: &str = "/auth/federated";

/// Query parameters of the provider callback.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CallbackQuery {
	code: Option<String>,
	state: Option<String>,
	error: Option<String>,
}

/// `POST /auth/federated/verify-token` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyTokenRequest {
	id_token: String,
}

/// `GET /auth/federated/start`: sets the handshake cookies and redirects to the provider.
pub async fn start(
	State(state): State<AppState>,
	jar: CookieJar,
) -> Result<(CookieJar, Response)> {
	let (handshake, authorize_url) = state.authority.begin_federation()?;
	let config = state.authority.config();
	let jar = jar
		.add(handshake_cookie(
			STATE_COOKIE,
			format!("{}.{}", handshake.nonce(), handshake.expires_at().unix_timestamp()),
			config,
		))
		.add(handshake_cookie(VERIFIER_COOKIE, handshake.pkce_verifier().to_owned(), config));

	Ok((jar, found(authorize_url.as_str())))
}

/// `GET /auth/federated/callback`: completes the handshake and redirects to the front end.
///
/// Every outcome is a redirect; failures land on `/login?error=<reason>`.
pub async fn callback(
	State(state): State<AppState>,
	jar: CookieJar,
	Query(query): Query<CallbackQuery>,
) -> (CookieJar, Response) {
	let config = state.authority.config();
	let handshake = restore_handshake(&jar);
	let jar = jar
		.remove(Cookie::build((STATE_COOKIE, "")).path(COOKIE_PATH))
		.remove(Cookie::build((VERIFIER_COOKIE, "")).path(COOKIE_PATH));

	if let Some(error) = &query.error {
		tracing::info!(%error, "provider returned an error to the callback");
	}

	let Some(handshake) = handshake else {
		tracing::warn!("federation callback without a pending handshake");

		return (jar, login_redirect(config, "invalid_state"));
	};

	match state
		.authority
		.complete_federation(handshake, query.state.as_deref(), query.code.as_deref())
		.await
	{
		Ok(grant) => {
			let location = app_location(config, "/auth/callback", &[
				("accessToken", grant.tokens.access_token.expose()),
				("refreshToken", grant.tokens.refresh_token.expose()),
			]);

			(jar, found(location.as_str()))
		},
		Err(Error::Authentication(AuthenticationError::HandshakeRejected(rejection))) =>
			(jar, login_redirect(config, rejection.reason())),
		Err(e) => {
			if e.is_internal() {
				tracing::error!(error = %e, "federated sign-in failed");
			} else {
				tracing::warn!(error = %e, "federated sign-in failed");
			}

			(jar, login_redirect(config, "oauth_failed"))
		},
	}
}

/// `POST /auth/federated/verify-token`.
pub async fn verify_token(
	State(state): State<AppState>,
	Json(request): Json<VerifyTokenRequest>,
) -> Result<Json<SessionBody>> {
	let grant = state.authority.sign_in_with_id_token(&request.id_token).await?;

	Ok(Json(grant.into()))
}

fn handshake_cookie(name: &'static str, value: String, config: &AuthConfig) -> Cookie<'static> {
	Cookie::build((name, value))
		.path(COOKIE_PATH)
		.http_only(true)
		.secure(config.secure_cookies)
		.same_site(SameSite::Lax)
		.max_age(config.handshake_ttl)
		.build()
}

fn restore_handshake(jar: &CookieJar) -> Option<Handshake> {
	let (nonce, expires_at) = jar.get(STATE_COOKIE)?.value().rsplit_once('.')?;
	let expires_at = OffsetDateTime::from_unix_timestamp(expires_at.parse().ok()?).ok()?;
	let verifier = jar.get(VERIFIER_COOKIE)?.value();

	if nonce.is_empty() || verifier.is_empty() {
		return None;
	}

	Some(Handshake::restore(nonce, verifier, expires_at))
}

fn app_location(config: &AuthConfig, path: &str, params: &[(&str, &str)]) -> Url {
	let mut url = config.app_url.clone();

	url.set_path(&format!("{}{path}", config.app_url.path().trim_end_matches('/')));
	url.set_query(None);

	if !params.is_empty() {
		url.query_pairs_mut().extend_pairs(params);
	}

	url
}

fn login_redirect(config: &AuthConfig, reason: &str) -> Response {
	found(app_location(config, "/login", &[("error", reason)]).as_str())
}

fn found(location: &str) -> Response {
	(StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}
