//! Background lease extension for one in-flight delivery.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::QueueResult;
use crate::queue::JobQueue;

/// Bounded wait for the extender task to acknowledge a stop signal.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Something that can re-extend a delivery's lease.
///
/// Implemented by [`JobQueue`]; tests drive the extender with stubs.
pub trait LeaseKeeper {
    fn extend_lease(
        &self,
        receipt_handle: &str,
        timeout: Duration,
    ) -> impl Future<Output = QueueResult<()>> + Send;
}

impl LeaseKeeper for JobQueue {
    fn extend_lease(
        &self,
        receipt_handle: &str,
        timeout: Duration,
    ) -> impl Future<Output = QueueResult<()>> + Send {
        self.extend_visibility(receipt_handle, timeout)
    }
}

/// Background task that keeps one delivery's lease alive while work runs.
///
/// Owned by exactly one processing attempt: spawned right after the job's
/// RUNNING transition and stopped on every exit path before the consumer
/// takes another message. The task shares nothing with the processing path
/// but the opaque receipt handle.
///
/// Extension failures are logged and swallowed; they must never abort the
/// encode they are protecting.
pub struct LeaseExtender {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl LeaseExtender {
    /// Spawn the extension task.
    ///
    /// Every `period`, the lease is reset to the full `ceiling`.
    pub fn spawn<K>(keeper: K, receipt_handle: String, period: Duration, ceiling: Duration) -> Self
    where
        K: LeaseKeeper + Send + Sync + 'static,
    {
        let (stop, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(period) => {
                        match keeper.extend_lease(&receipt_handle, ceiling).await {
                            Ok(()) => {
                                debug!("Extended message lease to {}s", ceiling.as_secs());
                            }
                            Err(e) => {
                                warn!("Lease extension failed: {}", e);
                            }
                        }
                    }
                }
            }
        });

        Self { stop, handle }
    }

    /// Signal the task to stop and wait for it, bounded by [`STOP_TIMEOUT`].
    ///
    /// A task that fails to acknowledge in time is detached rather than
    /// blocking the consumer loop.
    pub async fn stop(self) {
        let _ = self.stop.send(true);

        if tokio::time::timeout(STOP_TIMEOUT, self.handle).await.is_err() {
            warn!(
                "Lease extender did not stop within {}s; detaching",
                STOP_TIMEOUT.as_secs()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::error::QueueError;

    #[derive(Clone)]
    struct StubKeeper {
        extensions: Arc<AtomicUsize>,
        fail: bool,
    }

    impl StubKeeper {
        fn new(fail: bool) -> (Self, Arc<AtomicUsize>) {
            let extensions = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    extensions: Arc::clone(&extensions),
                    fail,
                },
                extensions,
            )
        }
    }

    impl LeaseKeeper for StubKeeper {
        fn extend_lease(
            &self,
            _receipt_handle: &str,
            _timeout: Duration,
        ) -> impl Future<Output = QueueResult<()>> + Send {
            let extensions = Arc::clone(&self.extensions);
            let fail = self.fail;
            async move {
                extensions.fetch_add(1, Ordering::SeqCst);
                if fail {
                    Err(QueueError::extend_failed("stub keeper down"))
                } else {
                    Ok(())
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_extension_fires_during_long_work() {
        let (keeper, extensions) = StubKeeper::new(false);
        let extender = LeaseExtender::spawn(
            keeper,
            "handle-1".to_string(),
            Duration::from_secs(60),
            Duration::from_secs(1800),
        );

        // Simulated encode longer than one extension period
        tokio::time::sleep(Duration::from_secs(185)).await;

        assert!(extensions.load(Ordering::SeqCst) >= 1);
        extender.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_extension_failures_are_swallowed() {
        let (keeper, extensions) = StubKeeper::new(true);
        let extender = LeaseExtender::spawn(
            keeper,
            "handle-2".to_string(),
            Duration::from_secs(60),
            Duration::from_secs(1800),
        );

        tokio::time::sleep(Duration::from_secs(125)).await;

        // Task keeps extending despite errors
        assert!(extensions.load(Ordering::SeqCst) >= 2);
        extender.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_extensions() {
        let (keeper, extensions) = StubKeeper::new(false);
        let extender = LeaseExtender::spawn(
            keeper,
            "handle-3".to_string(),
            Duration::from_secs(60),
            Duration::from_secs(1800),
        );

        tokio::time::sleep(Duration::from_secs(65)).await;
        extender.stop().await;

        let after_stop = extensions.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(extensions.load(Ordering::SeqCst), after_stop);
    }
}
