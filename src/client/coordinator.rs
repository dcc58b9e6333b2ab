//! Single-flight refresh coordination for one client session.
//!
//! The first caller to need a refresh becomes the flight owner: it starts the transport call and
//! parks a shared future in the slot. Every caller that arrives while the slot is occupied awaits
//! the same shared future, so N concurrent triggers cost one transport call and observe one
//! result. The owner clears the slot through a drop guard, which also runs when the owner is
//! cancelled.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	client::{ClientError, TokenGrant},
};

type SharedRefresh = Shared<BoxFuture<'static, Result<TokenGrant, ClientError>>>;

struct Flight {
	generation: u64,
	future: SharedRefresh,
}

/// In-flight refresh slot plus counters.
///
/// Cloning is cheap; clones share the slot.
#[derive(Clone, Default)]
pub struct RefreshCoordinator {
	slot: Arc<Mutex<Option<Flight>>>,
	generation: Arc<AtomicU64>,
	network_calls: Arc<AtomicU64>,
}
impl RefreshCoordinator {
	/// Joins the in-flight refresh, or starts one with `start` when none is running.
	///
	/// `start` is only invoked by the flight owner and must return a future that does no work
	/// until polled.
	pub async fn run<F, Fut>(&self, start: F) -> Result<TokenGrant, ClientError>
	where
		F: FnOnce() -> Fut,
		Fut: 'static + Send + Future<Output = Result<TokenGrant, ClientError>>,
	{
		let (future, owned) = {
			let mut slot = self.slot.lock();

			match slot.as_ref() {
				Some(flight) => (flight.future.clone(), None),
				None => {
					let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
					let network_calls = Arc::clone(&self.network_calls);
					let refresh = start();
					let future = async move {
						network_calls.fetch_add(1, Ordering::Relaxed);

						refresh.await
					}
					.boxed()
					.shared();

					*slot = Some(Flight { generation, future: future.clone() });

					(future, Some(generation))
				},
			}
		};
		let _guard = owned.map(|generation| FlightGuard { slot: &self.slot, generation });

		future.await
	}

	/// Whether a refresh is currently in flight.
	pub fn is_refreshing(&self) -> bool {
		self.slot.lock().is_some()
	}

	/// Number of refreshes that actually reached the transport.
	pub fn network_calls(&self) -> u64 {
		self.network_calls.load(Ordering::Relaxed)
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("is_refreshing", &self.is_refreshing())
			.field("network_calls", &self.network_calls())
			.finish()
	}
}

struct FlightGuard<'a> {
	slot: &'a Mutex<Option<Flight>>,
	generation: u64,
}
impl Drop for FlightGuard<'_> {
	fn drop(&mut self) {
		let mut slot = self.slot.lock();

		if slot.as_ref().is_some_and(|flight| flight.generation == self.generation) {
			*slot = None;
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::AtomicUsize;
	// crates.io
	use tokio::sync::Notify;
	// self
	use super::*;
	use crate::auth::TokenSecret;

	fn grant(value: &str) -> TokenGrant {
		TokenGrant {
			access_token: TokenSecret::new(value),
			refresh_token: TokenSecret::new(format!("{value}-refresh")),
			principal: None,
		}
	}

	#[tokio::test]
	async fn concurrent_callers_share_one_flight() {
		let coordinator = RefreshCoordinator::default();
		let release = Arc::new(Notify::new());
		let starts = Arc::new(AtomicUsize::new(0));
		let call = || {
			let release = Arc::clone(&release);
			let starts = Arc::clone(&starts);

			coordinator.run(move || {
				starts.fetch_add(1, Ordering::SeqCst);

				async move {
					release.notified().await;

					Ok(grant("shared"))
				}
			})
		};
		let first = call();
		let second = call();
		let third = call();
		let releaser = async {
			tokio::task::yield_now().await;

			assert!(coordinator.is_refreshing());

			release.notify_one();
		};
		let (a, b, c, ()) = tokio::join!(first, second, third, releaser);

		assert_eq!(starts.load(Ordering::SeqCst), 1);
		assert_eq!(coordinator.network_calls(), 1);
		assert_eq!(a.expect("Owner should succeed."), grant("shared"));
		assert_eq!(b.expect("Waiter should succeed."), grant("shared"));
		assert_eq!(c.expect("Waiter should succeed."), grant("shared"));
		assert!(!coordinator.is_refreshing());
	}

	#[tokio::test]
	async fn failures_are_shared_and_clear_the_slot() {
		let coordinator = RefreshCoordinator::default();
		let err = coordinator
			.run(|| async { Err(ClientError::Rejected { status: 403, message: "expired".into() }) })
			.await
			.expect_err("Rejected refresh should fail.");

		assert!(err.is_rejection());
		assert!(!coordinator.is_refreshing());

		let next = coordinator
			.run(|| async { Ok(grant("second")) })
			.await
			.expect("A new flight should start after a failure.");

		assert_eq!(next, grant("second"));
		assert_eq!(coordinator.network_calls(), 2);
	}

	#[tokio::test]
	async fn cancelled_owner_releases_the_slot() {
		let coordinator = RefreshCoordinator::default();
		let pending = coordinator.run(futures::future::pending::<Result<TokenGrant, ClientError>>);

		tokio::select! {
			biased;
			_ = pending => panic!("Pending refresh should never resolve."),
			_ = tokio::task::yield_now() => {},
		}

		assert!(!coordinator.is_refreshing());
	}
}
