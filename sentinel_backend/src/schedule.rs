//! Sleeping and stopping, kept behind small seams so loops and retries can be driven in tests.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleep.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Owner side of a stop signal; cloning is cheap and every clone stops the same loop.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

/// Loop side of a stop signal. `None` never fires.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: Option<watch::Receiver<bool>>,
}

pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (
        StopHandle {
            tx: std::sync::Arc::new(tx),
        },
        StopSignal { rx: Some(rx) },
    )
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

impl StopSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_stopped(&self) -> bool {
        self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolve once stop has been requested. Pending forever if every handle is gone.
    pub async fn stopped(&mut self) {
        let Some(rx) = self.rx.as_mut() else {
            return std::future::pending().await;
        };
        loop {
            let stopped = *rx.borrow_and_update();
            if stopped {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_handle_releases_waiting_signal() {
        let (handle, mut signal) = stop_channel();
        assert!(!signal.is_stopped());

        let waiter = tokio::spawn(async move {
            signal.stopped().await;
            signal.is_stopped()
        });
        handle.stop();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn dropped_handle_never_fires() {
        let (handle, mut signal) = stop_channel();
        drop(handle);
        let fired = tokio::time::timeout(Duration::from_millis(50), signal.stopped()).await;
        assert!(fired.is_err());
        assert!(!StopSignal::never().is_stopped());
    }

    #[tokio::test]
    async fn tokio_sleeper_waits_for_duration() {
        let start = std::time::Instant::now();
        TokioSleeper.sleep(Duration::from_millis(20)).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
