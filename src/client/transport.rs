//! Transport used by client sessions and the proxy race resolver to reach the issuer.

// std
#[cfg(feature = "reqwest")] use std::time::Duration as StdDuration;
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use crate::{
	_prelude::*,
	auth::{Principal, TokenSecret},
	client::ClientError,
};

/// Boxed future returned by [`RefreshTransport`] calls.
pub type TransportFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ClientError>> + 'a + Send>>;

/// Pair returned by a successful refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
	/// New access token.
	pub access_token: TokenSecret,
	/// New refresh credential.
	pub refresh_token: TokenSecret,
	/// Principal the pair belongs to, when the issuer includes it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub principal: Option<Principal>,
}

/// Calls the issuer's refresh and logout endpoints.
pub trait RefreshTransport
where
	Self: Send + Sync,
{
	/// Exchanges a refresh credential for a new pair.
	fn refresh<'a>(&'a self, refresh_token: &'a str) -> TransportFuture<'a, TokenGrant>;

	/// Asks the issuer to revoke the session.
	fn logout<'a>(
		&'a self,
		access_token: &'a str,
		refresh_token: Option<&'a str>,
	) -> TransportFuture<'a, ()>;
}

/// Reqwest transport speaking the issuer's JSON endpoints.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct HttpRefreshTransport {
	base_url: Url,
	http_client: ReqwestHttpClient,
	timeout: StdDuration,
}
#[cfg(feature = "reqwest")]
impl HttpRefreshTransport {
	/// Request timeout applied when none is configured.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(10);

	/// Creates a transport rooted at the issuer's base URL.
	pub fn new(base_url: Url) -> Self {
		Self::with_http_client(base_url, ReqwestHttpClient::default())
	}

	/// Creates a transport over an existing HTTP client.
	pub fn with_http_client(base_url: Url, http_client: ReqwestHttpClient) -> Self {
		Self { base_url, http_client, timeout: Self::DEFAULT_TIMEOUT }
	}

	/// Overrides the per-request timeout.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
		self.base_url.join(path).map_err(|e| ClientError::Protocol { message: e.to_string() })
	}

	async fn refresh_now(&self, refresh_token: &str) -> Result<TokenGrant, ClientError> {
		let response = self
			.http_client
			.post(self.endpoint("/auth/refresh-token")?)
			.timeout(self.timeout)
			.json(&RefreshBody { refresh_token: Some(refresh_token) })
			.send()
			.await
			.map_err(map_reqwest_error)?;
		let response = reject_unsuccessful(response).await?;
		let body = response.bytes().await.map_err(map_reqwest_error)?;
		let mut deserializer = serde_json::Deserializer::from_slice(&body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|e| ClientError::Protocol { message: e.to_string() })
	}

	async fn logout_now(
		&self,
		access_token: &str,
		refresh_token: Option<&str>,
	) -> Result<(), ClientError> {
		let response = self
			.http_client
			.post(self.endpoint("/auth/logout")?)
			.timeout(self.timeout)
			.bearer_auth(access_token)
			.json(&RefreshBody { refresh_token })
			.send()
			.await
			.map_err(map_reqwest_error)?;

		reject_unsuccessful(response).await?;

		Ok(())
	}
}
#[cfg(feature = "reqwest")]
impl RefreshTransport for HttpRefreshTransport {
	fn refresh<'a>(&'a self, refresh_token: &'a str) -> TransportFuture<'a, TokenGrant> {
		Box::pin(self.refresh_now(refresh_token))
	}

	fn logout<'a>(
		&'a self,
		access_token: &'a str,
		refresh_token: Option<&'a str>,
	) -> TransportFuture<'a, ()> {
		Box::pin(self.logout_now(access_token, refresh_token))
	}
}

#[cfg(feature = "reqwest")]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
	#[serde(skip_serializing_if = "Option::is_none")]
	refresh_token: Option<&'a str>,
}

#[cfg(feature = "reqwest")]
#[derive(Deserialize)]
struct ErrorBody {
	message: String,
}

#[cfg(feature = "reqwest")]
async fn reject_unsuccessful(
	response: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
	let status = response.status();

	if status.is_success() {
		return Ok(response);
	}

	let message = match response.json::<ErrorBody>().await {
		Ok(body) => body.message,
		Err(_) => status.canonical_reason().unwrap_or("request failed").to_owned(),
	};

	Err(ClientError::Rejected { status: status.as_u16(), message })
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(e: ReqwestError) -> ClientError {
	if e.is_timeout() {
		ClientError::Timeout
	} else {
		ClientError::Network { message: e.to_string() }
	}
}
