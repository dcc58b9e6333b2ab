//! Runtime configuration: signing secrets, lifetimes, cookie policy, and the federation client.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

const ACCESS_SECRET_VAR: &str = "JWT_ACCESS_SECRET";
const REFRESH_SECRET_VAR: &str = "JWT_REFRESH_SECRET";

/// Settings shared by the issuer, validator, flows, and HTTP surface.
#[derive(Clone, Debug)]
pub struct AuthConfig {
	/// HS256 secret for access tokens.
	pub access_secret: TokenSecret,
	/// HS256 secret for refresh credentials; must differ from the access secret in production.
	pub refresh_secret: TokenSecret,
	/// Access-token lifetime.
	pub access_ttl: Duration,
	/// Refresh-credential lifetime.
	pub refresh_ttl: Duration,
	/// Lifetime of a federation handshake and its cookies.
	pub handshake_ttl: Duration,
	/// Front-end origin that federation callbacks redirect to.
	pub app_url: Url,
	/// Whether handshake cookies carry the `Secure` attribute.
	pub secure_cookies: bool,
	/// Identity-provider client; `None` disables federated sign-in.
	pub federation: Option<FederationConfig>,
}
impl AuthConfig {
	/// Default access-token lifetime.
	pub const DEFAULT_ACCESS_TTL: Duration = Duration::minutes(15);
	/// Default refresh-credential lifetime.
	pub const DEFAULT_REFRESH_TTL: Duration = Duration::days(7);
	/// Default handshake lifetime.
	pub const DEFAULT_HANDSHAKE_TTL: Duration = Duration::minutes(10);
	/// Longest accepted token lifetime.
	pub const MAX_TTL: Duration = Duration::days(3650);

	/// Creates a configuration with default lifetimes and federation disabled.
	pub fn new(
		access_secret: impl Into<String>,
		refresh_secret: impl Into<String>,
		app_url: Url,
	) -> Self {
		Self {
			access_secret: TokenSecret::new(access_secret),
			refresh_secret: TokenSecret::new(refresh_secret),
			access_ttl: Self::DEFAULT_ACCESS_TTL,
			refresh_ttl: Self::DEFAULT_REFRESH_TTL,
			handshake_ttl: Self::DEFAULT_HANDSHAKE_TTL,
			app_url,
			secure_cookies: false,
			federation: None,
		}
	}

	/// Reads the configuration from process environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads the configuration through `lookup`, which maps variable names to values.
	///
	/// `JWT_ACCESS_SECRET` and `JWT_REFRESH_SECRET` are required. Federation is enabled when
	/// `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, and `GOOGLE_CALLBACK_URL` are all present.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
		let access = non_empty(ACCESS_SECRET_VAR)
			.ok_or(ConfigError::MissingSecret { name: ACCESS_SECRET_VAR })?;
		let refresh = non_empty(REFRESH_SECRET_VAR)
			.ok_or(ConfigError::MissingSecret { name: REFRESH_SECRET_VAR })?;
		let app_url = match non_empty("APP_URL") {
			Some(raw) => Url::parse(&raw)?,
			None => Url::parse("http://localhost:3000")?,
		};
		let mut config = Self::new(access, refresh, app_url);

		if let Some(raw) = non_empty("COOKIE_SECURE") {
			config.secure_cookies = parse_flag("COOKIE_SECURE", &raw)?;
		}
		if let Some(raw) = non_empty("ACCESS_TOKEN_TTL_SECS") {
			config.access_ttl = parse_seconds("ACCESS_TOKEN_TTL_SECS", &raw)?;
		}
		if let Some(raw) = non_empty("REFRESH_TOKEN_TTL_SECS") {
			config.refresh_ttl = parse_seconds("REFRESH_TOKEN_TTL_SECS", &raw)?;
		}

		match (
			non_empty("GOOGLE_CLIENT_ID"),
			non_empty("GOOGLE_CLIENT_SECRET"),
			non_empty("GOOGLE_CALLBACK_URL"),
		) {
			(Some(client_id), Some(client_secret), Some(callback)) => {
				let redirect_uri = Url::parse(&callback)?;

				config.federation =
					Some(FederationConfig::google(client_id, client_secret, redirect_uri)?);
			},
			(None, None, None) => {},
			(None, ..) => return Err(ConfigError::MissingValue { name: "GOOGLE_CLIENT_ID" }),
			(_, None, _) => return Err(ConfigError::MissingValue { name: "GOOGLE_CLIENT_SECRET" }),
			(.., None) => return Err(ConfigError::MissingValue { name: "GOOGLE_CALLBACK_URL" }),
		}

		Ok(config)
	}

	/// Replaces the access-token secret.
	pub fn with_access_secret(mut self, secret: impl Into<String>) -> Self {
		self.access_secret = TokenSecret::new(secret);

		self
	}

	/// Replaces the refresh-credential secret.
	pub fn with_refresh_secret(mut self, secret: impl Into<String>) -> Self {
		self.refresh_secret = TokenSecret::new(secret);

		self
	}

	/// Overrides the access-token lifetime.
	pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
		self.access_ttl = ttl;

		self
	}

	/// Overrides the refresh-credential lifetime.
	pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
		self.refresh_ttl = ttl;

		self
	}

	/// Toggles the `Secure` attribute on handshake cookies.
	pub fn with_secure_cookies(mut self, secure: bool) -> Self {
		self.secure_cookies = secure;

		self
	}

	/// Enables federated sign-in.
	pub fn with_federation(mut self, federation: FederationConfig) -> Self {
		self.federation = Some(federation);

		self
	}

	/// Returns both signing secrets, or the name of the first one that is empty.
	pub fn signing_secrets(&self) -> Result<(&str, &str), ConfigError> {
		if self.access_secret.is_empty() {
			return Err(ConfigError::MissingSecret { name: ACCESS_SECRET_VAR });
		}
		if self.refresh_secret.is_empty() {
			return Err(ConfigError::MissingSecret { name: REFRESH_SECRET_VAR });
		}

		Ok((self.access_secret.expose(), self.refresh_secret.expose()))
	}
}

/// OAuth client settings for the single supported identity provider.
#[derive(Clone, Debug)]
pub struct FederationConfig {
	/// OAuth client identifier; ID tokens must carry it as their audience.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Callback URL registered with the provider.
	pub redirect_uri: Url,
	/// Scopes requested at authorization.
	pub scopes: Vec<String>,
	/// Provider endpoints.
	pub endpoints: FederationEndpoints,
}
impl FederationConfig {
	/// Google-shaped configuration.
	pub fn google(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		redirect_uri: Url,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			redirect_uri,
			scopes: vec!["openid".into(), "email".into(), "profile".into()],
			endpoints: FederationEndpoints::google()?,
		})
	}

	/// Replaces the provider endpoints.
	pub fn with_endpoints(mut self, endpoints: FederationEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}
}

/// Endpoints used during federation.
#[derive(Clone, Debug)]
pub struct FederationEndpoints {
	/// Authorization endpoint users are redirected to.
	pub authorization: Url,
	/// Token endpoint for code exchange.
	pub token: Url,
	/// Userinfo endpoint queried with the exchanged access token.
	pub userinfo: Url,
	/// ID-token introspection endpoint.
	pub tokeninfo: Url,
}
impl FederationEndpoints {
	/// Google's public endpoints.
	pub fn google() -> Result<Self, ConfigError> {
		Ok(Self {
			authorization: Url::parse("https://accounts.google.com/o/oauth2/v2/auth")?,
			token: Url::parse("https://oauth2.googleapis.com/token")?,
			userinfo: Url::parse("https://www.googleapis.com/oauth2/v2/userinfo")?,
			tokeninfo: Url::parse("https://oauth2.googleapis.com/tokeninfo")?,
		})
	}

	/// Endpoints rooted at `base`, using Google's paths; used against local mocks.
	pub fn rooted_at(base: &Url) -> Result<Self, ConfigError> {
		Ok(Self {
			authorization: base.join("/o/oauth2/v2/auth")?,
			token: base.join("/token")?,
			userinfo: base.join("/oauth2/v2/userinfo")?,
			tokeninfo: base.join("/tokeninfo")?,
		})
	}
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
	match raw.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		other =>
			Err(ConfigError::InvalidValue { name, reason: format!("`{other}` is not a flag") }),
	}
}

fn parse_seconds(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
	let secs = raw.trim().parse::<i64>().map_err(|_| ConfigError::InvalidValue {
		name,
		reason: "expected a positive number of seconds".into(),
	})?;

	check_ttl(name, Duration::seconds(secs))
}

/// Rejects lifetimes that are not positive or exceed [`AuthConfig::MAX_TTL`].
pub(crate) fn check_ttl(name: &'static str, ttl: Duration) -> Result<Duration, ConfigError> {
	if ttl <= Duration::ZERO || ttl > AuthConfig::MAX_TTL {
		let max = AuthConfig::MAX_TTL.whole_seconds();

		return Err(ConfigError::InvalidValue {
			name,
			reason: format!("expected between 1 and {max} seconds"),
		});
	}

	Ok(ttl)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
		move |name| pairs.iter().find(|(key, _)| *key == name).map(|(_, value)| value.to_string())
	}

	#[test]
	fn missing_secrets_are_fatal() {
		let err = AuthConfig::from_lookup(lookup(&[("JWT_ACCESS_SECRET", "a")]))
			.expect_err("Missing refresh secret should fail.");

		assert!(matches!(err, ConfigError::MissingSecret { name: "JWT_REFRESH_SECRET" }));

		let err = AuthConfig::from_lookup(lookup(&[
			("JWT_ACCESS_SECRET", "  "),
			("JWT_REFRESH_SECRET", "r"),
		]))
		.expect_err("Blank access secret should fail.");

		assert!(matches!(err, ConfigError::MissingSecret { name: "JWT_ACCESS_SECRET" }));
	}

	#[test]
	fn federation_requires_all_three_values() {
		let config = AuthConfig::from_lookup(lookup(&[
			("JWT_ACCESS_SECRET", "a"),
			("JWT_REFRESH_SECRET", "r"),
			("APP_URL", "https://home.example"),
			("COOKIE_SECURE", "true"),
			("GOOGLE_CLIENT_ID", "client"),
			("GOOGLE_CLIENT_SECRET", "secret"),
			("GOOGLE_CALLBACK_URL", "https://api.example/auth/federated/callback"),
		]))
		.expect("Complete environment should parse.");
		let federation = config.federation.expect("Federation should be enabled.");

		assert!(config.secure_cookies);
		assert_eq!(config.app_url.as_str(), "https://home.example/");
		assert_eq!(config.access_ttl, Duration::minutes(15));
		assert_eq!(federation.client_id, "client");
		assert_eq!(federation.endpoints.token.as_str(), "https://oauth2.googleapis.com/token");

		let err = AuthConfig::from_lookup(lookup(&[
			("JWT_ACCESS_SECRET", "a"),
			("JWT_REFRESH_SECRET", "r"),
			("GOOGLE_CLIENT_ID", "client"),
		]))
		.expect_err("Partial federation settings should fail.");

		assert!(matches!(err, ConfigError::MissingValue { name: "GOOGLE_CLIENT_SECRET" }));
	}

	#[test]
	fn lifetimes_must_be_positive_and_bounded() {
		let config = AuthConfig::from_lookup(lookup(&[
			("JWT_ACCESS_SECRET", "a"),
			("JWT_REFRESH_SECRET", "r"),
			("ACCESS_TOKEN_TTL_SECS", "600"),
		]))
		.expect("A short access lifetime should parse.");

		assert_eq!(config.access_ttl, Duration::minutes(10));

		for raw in ["0", "-5", "soon", "9223372036854775807"] {
			let err = AuthConfig::from_lookup(|name| match name {
				"JWT_ACCESS_SECRET" => Some("a".into()),
				"JWT_REFRESH_SECRET" => Some("r".into()),
				"REFRESH_TOKEN_TTL_SECS" => Some(raw.into()),
				_ => None,
			})
			.expect_err("Out-of-range lifetimes should fail.");

			assert!(matches!(
				err,
				ConfigError::InvalidValue { name: "REFRESH_TOKEN_TTL_SECS", .. }
			));
		}
	}
}
