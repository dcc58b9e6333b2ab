//! Shared flow results and per-key singleflight guards.

// std
use std::hash::Hash;
// self
use crate::{
	_prelude::*,
	auth::{Principal, TokenPair},
};

/// Principal plus the pair issued to it by a sign-in or refresh.
#[derive(Clone, Debug)]
pub struct SessionGrant {
	/// Signed-in principal.
	pub principal: Principal,
	/// Issued tokens.
	pub tokens: TokenPair,
	/// Whether the principal was created by this flow.
	pub created: bool,
}

/// Lazily created async mutexes keyed by `K`, used to serialize work on the same key.
#[derive(Debug)]
pub struct FlowGuards<K>(Mutex<HashMap<K, Arc<AsyncMutex<()>>>>);
impl<K> FlowGuards<K>
where
	K: Eq + Hash,
{
	/// Returns (and creates on demand) the guard for `key`.
	pub fn guard(&self, key: K) -> Arc<AsyncMutex<()>> {
		let mut guards = self.0.lock();

		guards.entry(key).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	/// Drops guards nobody currently holds.
	pub fn prune(&self) {
		self.0.lock().retain(|_, guard| Arc::strong_count(guard) > 1);
	}

	/// Number of tracked keys.
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns `true` when no keys are tracked.
	pub fn is_empty(&self) -> bool {
		self.0.lock().is_empty()
	}
}
impl<K> Default for FlowGuards<K> {
	fn default() -> Self {
		Self(Mutex::new(HashMap::new()))
	}
}
