//! Per-tenant session fan-out.
//!
//! When a refresh rotates a principal's credential, the new pair is pushed to every live session
//! subscribed to the principal's tenant channel so siblings can adopt it without refreshing.
//! Delivery is best-effort: there is no replay, and a session that was offline recovers through
//! the proxy-side race resolution path instead.

// crates.io
use tokio::sync::broadcast;
// self
use crate::{
	_prelude::*,
	auth::{PrincipalId, TenantId, TokenSecret},
};

/// Events pushed on a tenant channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum SessionEvent {
	/// A principal's credential pair was rotated.
	TokenRefresh(TokenRefreshEvent),
}
impl SessionEvent {
	/// Wire name of the event (used as the SSE event name).
	pub const fn name(&self) -> &'static str {
		match self {
			SessionEvent::TokenRefresh(_) => "token-refresh",
		}
	}

	/// Principal the event concerns.
	pub fn principal_id(&self) -> PrincipalId {
		match self {
			SessionEvent::TokenRefresh(event) => event.principal_id,
		}
	}

	/// Parses the JSON body of an event frame, reporting the failing path on error.
	pub fn from_json(raw: &str) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		let mut de = serde_json::Deserializer::from_str(raw);

		serde_path_to_error::deserialize(&mut de)
	}
}

/// Payload of [`SessionEvent::TokenRefresh`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefreshEvent {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Newly issued refresh credential.
	pub refresh_token: TokenSecret,
	/// Principal the pair belongs to.
	pub principal_id: PrincipalId,
}

/// Receiving half of a tenant channel.
pub type SessionReceiver = broadcast::Receiver<SessionEvent>;

/// Fan-out hub holding one broadcast channel per tenant.
///
/// Cloning is cheap; clones share the same channels.
#[derive(Clone)]
pub struct SessionBroadcaster {
	channels: Arc<Mutex<HashMap<TenantId, broadcast::Sender<SessionEvent>>>>,
	capacity: usize,
}
impl SessionBroadcaster {
	/// Default per-tenant buffer; slower receivers observe a lag and skip ahead.
	pub const DEFAULT_CAPACITY: usize = 64;

	/// Creates a broadcaster whose channels buffer `capacity` events.
	pub fn with_capacity(capacity: usize) -> Self {
		Self { channels: Default::default(), capacity: capacity.max(1) }
	}

	/// Subscribes to a tenant channel, creating it on demand. Only events published after this
	/// call are observed.
	pub fn subscribe(&self, tenant: TenantId) -> SessionReceiver {
		let mut channels = self.channels.lock();

		channels.entry(tenant).or_insert_with(|| broadcast::channel(self.capacity).0).subscribe()
	}

	/// Publishes `event` to the tenant channel and returns how many subscribers received it.
	///
	/// Publishing to a tenant without subscribers is a no-op; channels whose subscribers have
	/// all gone away are dropped.
	pub fn publish(&self, tenant: TenantId, event: SessionEvent) -> usize {
		let mut channels = self.channels.lock();
		let Some(sender) = channels.get(&tenant) else {
			return 0;
		};

		match sender.send(event) {
			Ok(delivered) => delivered,
			Err(_) => {
				channels.remove(&tenant);

				0
			},
		}
	}

	/// Number of live subscribers on a tenant channel.
	pub fn subscriber_count(&self, tenant: TenantId) -> usize {
		self.channels.lock().get(&tenant).map(broadcast::Sender::receiver_count).unwrap_or(0)
	}
}
impl Default for SessionBroadcaster {
	fn default() -> Self {
		Self::with_capacity(Self::DEFAULT_CAPACITY)
	}
}
impl Debug for SessionBroadcaster {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionBroadcaster")
			.field("tenants", &self.channels.lock().len())
			.field("capacity", &self.capacity)
			.finish()
	}
}

/// Receives the next event, skipping over any events lost to lag. Returns `None` once the
/// channel is closed.
pub async fn next_event(receiver: &mut SessionReceiver) -> Option<SessionEvent> {
	loop {
		match receiver.recv().await {
			Ok(event) => return Some(event),
			Err(broadcast::error::RecvError::Lagged(skipped)) => {
				tracing::debug!(skipped, "session receiver lagged; skipping missed events");
			},
			Err(broadcast::error::RecvError::Closed) => return None,
		}
	}
}
