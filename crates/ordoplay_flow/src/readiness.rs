// SPDX-License-Identifier: MIT OR Apache-2.0
//! One-shot readiness signal with bounded waits.
//!
//! The store flips its signal to ready when the pan/zoom engine attaches and
//! to cancelled on teardown. Async callers wait for it instead of polling.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

/// State of a readiness signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Not ready yet
    Pending,
    /// Ready
    Ready,
    /// Will never become ready
    Cancelled,
}

/// Why a readiness wait ended without the signal becoming ready
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadinessError {
    /// The wait timed out
    #[error("Timed out after {0:?} waiting for readiness")]
    TimedOut(Duration),

    /// The signal was cancelled or dropped
    #[error("Readiness was cancelled")]
    Cancelled,
}

/// Sender side of a readiness signal
#[derive(Debug)]
pub struct Readiness {
    tx: watch::Sender<ReadyState>,
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

impl Readiness {
    /// Create a pending signal
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ReadyState::Pending);
        Self { tx }
    }

    /// Current state
    pub fn state(&self) -> ReadyState {
        *self.tx.borrow()
    }

    /// Whether the signal is ready
    pub fn is_ready(&self) -> bool {
        self.state() == ReadyState::Ready
    }

    /// Mark ready, waking every waiter
    pub fn mark_ready(&self) {
        self.tx.send_replace(ReadyState::Ready);
    }

    /// Mark cancelled, waking every waiter with an error
    pub fn cancel(&self) {
        self.tx.send_replace(ReadyState::Cancelled);
    }

    /// Back to pending
    pub fn reset(&self) {
        self.tx.send_replace(ReadyState::Pending);
    }

    /// Create a waiter that can be moved into another task
    pub fn waiter(&self) -> ReadinessWaiter {
        ReadinessWaiter {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiver side of a readiness signal
#[derive(Debug, Clone)]
pub struct ReadinessWaiter {
    rx: watch::Receiver<ReadyState>,
}

impl ReadinessWaiter {
    /// Wait until ready or cancelled
    pub async fn wait(&mut self) -> Result<(), ReadinessError> {
        let state = *self
            .rx
            .wait_for(|state| *state != ReadyState::Pending)
            .await
            .map_err(|_| ReadinessError::Cancelled)?;
        match state {
            ReadyState::Ready => Ok(()),
            _ => Err(ReadinessError::Cancelled),
        }
    }

    /// Wait at most `timeout`
    pub async fn wait_timeout(&mut self, timeout: Duration) -> Result<(), ReadinessError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ReadinessError::TimedOut(timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_resolves_when_ready() {
        let readiness = Readiness::new();
        let mut waiter = readiness.waiter();
        let task = tokio::spawn(async move { waiter.wait_timeout(Duration::from_secs(5)).await });

        readiness.mark_ready();
        assert_eq!(task.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_already_ready() {
        let readiness = Readiness::new();
        readiness.mark_ready();
        assert_eq!(readiness.waiter().wait().await, Ok(()));
    }

    #[tokio::test]
    async fn test_timeout() {
        let readiness = Readiness::new();
        let result = readiness.waiter().wait_timeout(Duration::from_millis(10)).await;
        assert_eq!(result, Err(ReadinessError::TimedOut(Duration::from_millis(10))));
    }

    #[tokio::test]
    async fn test_reset_back_to_pending() {
        let readiness = Readiness::new();
        readiness.mark_ready();
        readiness.reset();
        assert_eq!(readiness.state(), ReadyState::Pending);
        let result = readiness.waiter().wait_timeout(Duration::from_millis(10)).await;
        assert_eq!(result, Err(ReadinessError::TimedOut(Duration::from_millis(10))));
    }

    #[tokio::test]
    async fn test_cancel_and_drop() {
        let readiness = Readiness::new();
        let mut waiter = readiness.waiter();
        readiness.cancel();
        assert_eq!(waiter.wait().await, Err(ReadinessError::Cancelled));

        let readiness = Readiness::new();
        let mut waiter = readiness.waiter();
        drop(readiness);
        assert_eq!(waiter.wait().await, Err(ReadinessError::Cancelled));
    }
}
