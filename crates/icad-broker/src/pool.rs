//! Bounded worker pool with backpressure metrics (§4.1, §5). Mirrors
//! `original_source`'s `threadpool_handler.py` `TrackingThreadPoolExecutor`
//! (a lock-guarded pending/running counter around a thread pool); here the
//! pool is a fixed-size `tokio::sync::Semaphore` and the counters are
//! atomics rather than a lock, since there is no dynamic queue to guard.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;

pub struct WorkerPool {
	semaphore: Arc<Semaphore>,
	pending: Arc<AtomicUsize>,
	running: Arc<AtomicUsize>,
}

#[derive(Debug, Clone, Copy)]
pub struct PoolMetrics {
	pub pending: usize,
	pub running: usize,
	pub waiting: usize,
}

impl WorkerPool {
	pub fn new(size: usize) -> Self {
		Self {
			semaphore: Arc::new(Semaphore::new(size)),
			pending: Arc::new(AtomicUsize::new(0)),
			running: Arc::new(AtomicUsize::new(0)),
		}
	}

	pub fn metrics(&self) -> PoolMetrics {
		let pending = self.pending.load(Ordering::Relaxed);
		let running = self.running.load(Ordering::Relaxed);
		PoolMetrics {
			pending,
			running,
			waiting: pending.saturating_sub(running),
		}
	}

	/// Spawns `task` once a pool slot is free; `task` is handed the acquired
	/// permit's lifetime implicitly by holding it until completion.
	pub fn spawn<F>(&self, task: F)
	where
		F: std::future::Future<Output = ()> + Send + 'static,
	{
		self.pending.fetch_add(1, Ordering::Relaxed);
		let semaphore = self.semaphore.clone();
		let pending = self.pending.clone();
		let running = self.running.clone();

		tokio::spawn(async move {
			let permit = semaphore.acquire_owned().await;
			running.fetch_add(1, Ordering::Relaxed);
			task.await;
			running.fetch_sub(1, Ordering::Relaxed);
			pending.fetch_sub(1, Ordering::Relaxed);
			drop(permit);
		});
	}
}
