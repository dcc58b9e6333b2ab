//! Authorization handshake state machine.
//!
//! A handshake starts `Initiated` with a fresh CSRF nonce and PKCE verifier, moves to
//! `AwaitingCallback` once the browser is redirected, and is consumed by [`Handshake::resolve`]
//! into either a completed exchange request or a terminal rejection. Because `resolve` takes the
//! handshake by value, a nonce can be checked at most once.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
// self
use crate::{_prelude::*, config::FederationConfig};

const NONCE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Non-terminal handshake stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeStage {
	/// Nonce and verifier generated; the browser has not been redirected yet.
	Initiated,
	/// The redirect was dispatched and the provider callback is pending.
	AwaitingCallback,
}

/// Why a callback was rejected before contacting the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeRejection {
	/// No nonce came back, or no handshake was pending.
	MissingState,
	/// The returned nonce does not match the pending one.
	StateMismatch,
	/// The handshake outlived its lifetime.
	Expired,
	/// The provider returned no authorization code.
	MissingCode,
}
impl HandshakeRejection {
	/// Reason code appended to the front-end login redirect.
	pub const fn reason(self) -> &'static str {
		match self {
			HandshakeRejection::MissingState
			| HandshakeRejection::StateMismatch
			| HandshakeRejection::Expired => "invalid_state",
			HandshakeRejection::MissingCode => "no_code",
		}
	}
}
impl Display for HandshakeRejection {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(match self {
			HandshakeRejection::MissingState => "state missing",
			HandshakeRejection::StateMismatch => "state mismatch",
			HandshakeRejection::Expired => "handshake expired",
			HandshakeRejection::MissingCode => "authorization code missing",
		})
	}
}

/// Terminal result of [`Handshake::resolve`].
#[derive(Debug)]
pub enum HandshakeOutcome {
	/// Nonce matched; the code may be exchanged.
	Completed(CompletedHandshake),
	/// Terminal rejection.
	Rejected(HandshakeRejection),
}

/// Authorization code plus the verifier that must accompany its exchange.
pub struct CompletedHandshake {
	code: String,
	pkce_verifier: String,
}
impl CompletedHandshake {
	/// Authorization code returned by the provider.
	pub fn code(&self) -> &str {
		&self.code
	}

	/// PKCE verifier bound to the handshake.
	pub fn pkce_verifier(&self) -> &str {
		&self.pkce_verifier
	}
}
impl Debug for CompletedHandshake {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CompletedHandshake").finish_non_exhaustive()
	}
}

/// One pending authorization round-trip.
#[derive(Clone)]
pub struct Handshake {
	nonce: String,
	pkce: PkcePair,
	expires_at: OffsetDateTime,
	stage: HandshakeStage,
}
impl Handshake {
	/// Starts a handshake that expires `ttl` after `now`.
	pub fn initiate(ttl: Duration, now: OffsetDateTime) -> Self {
		Self {
			nonce: random_string(NONCE_LEN),
			pkce: PkcePair::generate(),
			expires_at: now + ttl,
			stage: HandshakeStage::Initiated,
		}
	}

	/// Rebuilds a dispatched handshake from the values the initiator persisted (e.g. cookies).
	pub fn restore(
		nonce: impl Into<String>,
		pkce_verifier: impl Into<String>,
		expires_at: OffsetDateTime,
	) -> Self {
		Self {
			nonce: nonce.into(),
			pkce: PkcePair::from_verifier(pkce_verifier.into()),
			expires_at,
			stage: HandshakeStage::AwaitingCallback,
		}
	}

	/// Current stage.
	pub fn stage(&self) -> HandshakeStage {
		self.stage
	}

	/// CSRF nonce that must round-trip as the `state` parameter.
	pub fn nonce(&self) -> &str {
		&self.nonce
	}

	/// PKCE verifier; keep it server-side or in an http-only cookie.
	pub fn pkce_verifier(&self) -> &str {
		&self.pkce.verifier
	}

	/// S256 code challenge derived from the verifier.
	pub fn code_challenge(&self) -> &str {
		&self.pkce.challenge
	}

	/// Expiry instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Builds the provider authorize URL and marks the redirect as dispatched.
	pub fn dispatch(&mut self, config: &FederationConfig) -> Url {
		self.stage = HandshakeStage::AwaitingCallback;

		self.authorize_url(config)
	}

	/// Builds the provider authorize URL for this handshake.
	pub fn authorize_url(&self, config: &FederationConfig) -> Url {
		let mut url = config.endpoints.authorization.clone();
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("response_type", "code");
		pairs.append_pair("client_id", &config.client_id);
		pairs.append_pair("redirect_uri", config.redirect_uri.as_str());

		if !config.scopes.is_empty() {
			pairs.append_pair("scope", &config.scopes.join(" "));
		}

		pairs.append_pair("state", &self.nonce);
		pairs.append_pair("code_challenge", &self.pkce.challenge);
		pairs.append_pair("code_challenge_method", "S256");

		drop(pairs);

		url
	}

	/// Consumes the handshake against the callback parameters.
	pub fn resolve(
		self,
		returned_state: Option<&str>,
		code: Option<&str>,
		now: OffsetDateTime,
	) -> HandshakeOutcome {
		let Some(returned_state) = returned_state.filter(|state| !state.is_empty()) else {
			return HandshakeOutcome::Rejected(HandshakeRejection::MissingState);
		};

		if !bool::from(returned_state.as_bytes().ct_eq(self.nonce.as_bytes())) {
			return HandshakeOutcome::Rejected(HandshakeRejection::StateMismatch);
		}
		if now >= self.expires_at {
			return HandshakeOutcome::Rejected(HandshakeRejection::Expired);
		}

		match code.filter(|code| !code.is_empty()) {
			Some(code) => HandshakeOutcome::Completed(CompletedHandshake {
				code: code.to_owned(),
				pkce_verifier: self.pkce.verifier,
			}),
			None => HandshakeOutcome::Rejected(HandshakeRejection::MissingCode),
		}
	}
}
impl Debug for Handshake {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Handshake")
			.field("stage", &self.stage)
			.field("code_challenge", &self.pkce.challenge)
			.field("expires_at", &self.expires_at)
			.finish_non_exhaustive()
	}
}

#[derive(Clone)]
struct PkcePair {
	verifier: String,
	challenge: String,
}
impl PkcePair {
	fn generate() -> Self {
		Self::from_verifier(random_string(PKCE_VERIFIER_LEN))
	}

	fn from_verifier(verifier: String) -> Self {
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge }
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
