// crates.io
use oauth2::{
	AuthUrl, AuthorizationCode, ClientId, ClientSecret, HttpClientError, PkceCodeVerifier,
	RedirectUrl, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	config::FederationConfig,
	error::{ConfigError, UpstreamError},
	federation::{FederatedProfile, IdentityProvider, ProviderFuture},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

/// Authorization-code + PKCE provider speaking Google's OAuth and userinfo endpoints.
#[derive(Clone, Debug)]
pub struct OAuthIdentityProvider {
	config: FederationConfig,
	http_client: ReqwestHttpClient,
}
impl OAuthIdentityProvider {
	/// Creates a provider with a redirect-free reqwest client.
	pub fn new(config: FederationConfig) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::no_redirects()?;

		Ok(Self::with_http_client(config, http_client))
	}

	/// Creates a provider over an existing HTTP client.
	pub fn with_http_client(config: FederationConfig, http_client: ReqwestHttpClient) -> Self {
		Self { config, http_client }
	}

	async fn exchange_code_now(
		&self,
		code: &str,
		pkce_verifier: &str,
	) -> Result<FederatedProfile, UpstreamError> {
		let endpoints = &self.config.endpoints;
		let oauth_client = BasicClient::new(ClientId::new(self.config.client_id.clone()))
			.set_client_secret(ClientSecret::new(self.config.client_secret.expose().to_owned()))
			.set_auth_uri(AuthUrl::from_url(endpoints.authorization.clone()))
			.set_token_uri(TokenUrl::from_url(endpoints.token.clone()))
			.set_redirect_uri(RedirectUrl::from_url(self.config.redirect_uri.clone()));
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let response = oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_owned()))
			.request_async(&instrumented)
			.await
			.map_err(|e| map_request_error(meta.take(), e))?;
		let request = self
			.http_client
			.get(endpoints.userinfo.clone())
			.bearer_auth(response.access_token().secret());
		let userinfo = fetch_json::<UserInfo>(request).await?;

		Ok(userinfo.into())
	}

	async fn verify_id_token_now(&self, id_token: &str) -> Result<FederatedProfile, UpstreamError> {
		let request = self
			.http_client
			.get(self.config.endpoints.tokeninfo.clone())
			.query(&[("id_token", id_token)]);
		let info = fetch_json::<TokenInfo>(request).await?;

		if info.aud != self.config.client_id {
			return Err(UpstreamError::Rejected { reason: "ID token audience mismatch".into() });
		}

		Ok(info.into())
	}
}
impl IdentityProvider for OAuthIdentityProvider {
	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		pkce_verifier: &'a str,
	) -> ProviderFuture<'a, FederatedProfile> {
		Box::pin(self.exchange_code_now(code, pkce_verifier))
	}

	fn verify_id_token<'a>(&'a self, id_token: &'a str) -> ProviderFuture<'a, FederatedProfile> {
		Box::pin(self.verify_id_token_now(id_token))
	}
}

#[derive(Debug, Deserialize)]
struct UserInfo {
	#[serde(alias = "sub")]
	id: String,
	email: Option<String>,
	given_name: Option<String>,
	family_name: Option<String>,
	picture: Option<String>,
	name: Option<String>,
}
impl From<UserInfo> for FederatedProfile {
	fn from(info: UserInfo) -> Self {
		Self {
			federated_id: info.id,
			email: info.email,
			given_name: info.given_name,
			family_name: info.family_name,
			avatar_url: info.picture,
			display_name: info.name,
		}
	}
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
	aud: String,
	sub: String,
	email: Option<String>,
	given_name: Option<String>,
	family_name: Option<String>,
	picture: Option<String>,
	name: Option<String>,
}
impl From<TokenInfo> for FederatedProfile {
	fn from(info: TokenInfo) -> Self {
		Self {
			federated_id: info.sub,
			email: info.email,
			given_name: info.given_name,
			family_name: info.family_name,
			avatar_url: info.picture,
			display_name: info.name,
		}
	}
}

async fn fetch_json<T>(request: reqwest::RequestBuilder) -> Result<T, UpstreamError>
where
	T: DeserializeOwned,
{
	let response = request.send().await?;
	let status = response.status();

	if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED {
		return Err(UpstreamError::Rejected { reason: format!("status {}", status.as_u16()) });
	}
	if !status.is_success() {
		return Err(UpstreamError::Status { status: status.as_u16() });
	}

	let body = response.bytes().await?;
	let mut deserializer = serde_json::Deserializer::from_slice(&body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| UpstreamError::Parse { source })
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> UpstreamError {
	match err {
		RequestTokenError::ServerResponse(response) =>
			UpstreamError::Rejected { reason: response.error().as_ref().to_owned() },
		RequestTokenError::Request(e) => UpstreamError::network(e),
		RequestTokenError::Parse(source, _body) => UpstreamError::Parse { source },
		RequestTokenError::Other(message) => {
			tracing::warn!(%message, "token endpoint returned an unexpected response");

			UpstreamError::Status { status: meta.and_then(|meta| meta.status).unwrap_or(500) }
		},
	}
}
