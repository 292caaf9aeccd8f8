//! Cancellation and timeouts for resolver and parser calls.
//!
//! A [`CancelToken`] is threaded through every public entry point. It
//! fires when its [`CancelSource`] cancels or when its deadline passes;
//! the pending remote call is then dropped and the operation returns
//! [`Error::Cancelled`]. Writes already committed stay in the store.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{Error, Result};

/// Owner side: cancels every token handed out by [`CancelSource::token`]
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: Some(self.tx.subscribe()),
            deadline: None,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller side: checked before and raced against every remote call
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that never fires
    pub fn none() -> Self {
        Self::default()
    }

    /// Fire after `timeout` has elapsed (in addition to any source)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn is_cancelled(&self) -> bool {
        let signalled = self.rx.as_ref().is_some_and(|rx| *rx.borrow());
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        signalled || expired
    }

    /// Resolves once the token fires; never resolves for [`CancelToken::none`]
    pub async fn cancelled(&self) {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        let signal = async {
            match self.rx.clone() {
                Some(mut rx) => loop {
                    if *rx.borrow_and_update() {
                        break;
                    }
                    // Source dropped without cancelling: it never will
                    if rx.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                },
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = deadline => {}
            _ = signal => {}
        }
    }

    /// Fail fast if the token already fired
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled(operation.to_string()));
        }
        Ok(())
    }

    /// Run `future` unless the token fires first; the future is dropped on cancellation
    pub async fn guard<F: Future>(&self, operation: &str, future: F) -> Result<F::Output> {
        self.check(operation)?;
        tokio::select! {
            biased;
            _ = self.cancelled() => {
                log::info!("Cancelled: {}", operation);
                Err(Error::Cancelled(operation.to_string()))
            }
            output = future => Ok(output),
        }
    }
}
