//! Interval-and-condition poller
//!
//! One poll stream fetches, hands the result to its consumer, and only
//! then sleeps before the next fetch, so requests for the same target
//! never overlap.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// What a poll consumer wants after seeing a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Continue,
    Stop,
}

/// Liveness flag shared between a poll task and its consumer
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn kill(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running poll stream.
///
/// Dropping the handle clears the liveness flag: a response still in
/// flight is discarded when it arrives and nothing further is scheduled.
pub struct PollHandle {
    liveness: Liveness,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Stop applying results and stop scheduling fetches
    pub fn cancel(&self) {
        self.liveness.kill();
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Wait for the stream to end on its own
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.liveness.kill();
    }
}

/// Spawn a poll stream.
///
/// `fetch` is called once immediately and then again `interval` after each
/// result has been handed to `on_result`, for as long as `on_result`
/// answers [`PollControl::Continue`] and the handle is alive.
pub fn spawn_poller<T, F, Fut, H>(interval: Duration, mut fetch: F, mut on_result: H) -> PollHandle
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
    H: FnMut(T) -> PollControl + Send + 'static,
{
    let liveness = Liveness::new();
    let alive = liveness.clone();

    let task = tokio::spawn(async move {
        loop {
            let result = fetch().await;

            if !alive.is_alive() {
                tracing::debug!("Poll consumer gone, discarding late response");
                break;
            }

            if on_result(result) == PollControl::Stop {
                break;
            }

            tokio::time::sleep(interval).await;

            if !alive.is_alive() {
                break;
            }
        }
    });

    PollHandle {
        liveness,
        task: Some(task),
    }
}
