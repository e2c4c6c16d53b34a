//! One-shot readiness handoff between a server and whoever started it.
//!
//! [`Server::run`](crate::Server::run) fires the notifier exactly once: with
//! the endpoint the socket attached to, or with the reason attaching failed.
//! The spawning side awaits the [`ReadyWaiter`] instead of polling or racing
//! for the socket.
//!
//! # Example
//!
//! ```ignore
//! let (notifier, waiter) = ReadyNotifier::channel();
//! tokio::spawn(async move { server.run(notifier).await });
//! let attached = waiter.wait().await?;
//! println!("serving on {}", attached.endpoint);
//! ```

use tokio::sync::oneshot;

use crate::error::AttachError;
use crate::transport::Role;

/// Where a server's socket ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attached {
    /// Resolved endpoint (bind may turn port 0 into a real port).
    pub endpoint: String,
    /// Whether the socket was bound or connected.
    pub role: Role,
}

/// Outcome reported through the notifier.
pub type Readiness = std::result::Result<Attached, AttachError>;

/// Sending half, consumed by [`Server::run`](crate::Server::run).
#[derive(Debug, Default)]
pub struct ReadyNotifier {
    tx: Option<oneshot::Sender<Readiness>>,
}

impl ReadyNotifier {
    /// A connected notifier/waiter pair.
    pub fn channel() -> (Self, ReadyWaiter) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, ReadyWaiter { rx })
    }

    /// A notifier nobody listens to.
    pub fn none() -> Self {
        Self::default()
    }

    /// Report the attach outcome. Consumes the notifier, so it fires once.
    pub(crate) fn notify(mut self, readiness: Readiness) {
        if let Some(tx) = self.tx.take() {
            if tx.send(readiness).is_err() {
                tracing::debug!("Readiness waiter went away before attach completed");
            }
        }
    }
}

/// Receiving half, held by the controller that started the server.
#[derive(Debug)]
pub struct ReadyWaiter {
    rx: oneshot::Receiver<Readiness>,
}

impl ReadyWaiter {
    /// Wait for the server to attach.
    ///
    /// Yields [`AttachError::Abandoned`] if the server was dropped before it
    /// got that far.
    pub async fn wait(self) -> Readiness {
        self.rx.await.unwrap_or(Err(AttachError::Abandoned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_is_delivered() {
        let (notifier, waiter) = ReadyNotifier::channel();
        notifier.notify(Ok(Attached {
            endpoint: "inproc://a".to_string(),
            role: Role::Bind,
        }));

        let attached = waiter.wait().await.unwrap();
        assert_eq!(attached.endpoint, "inproc://a");
    }

    #[tokio::test]
    async fn test_failure_is_delivered() {
        let (notifier, waiter) = ReadyNotifier::channel();
        let failure = AttachError::Refused {
            role: Role::Connect,
            address: "tcp://broker:1".to_string(),
            reason: "refused".to_string(),
        };
        notifier.notify(Err(failure.clone()));

        assert_eq!(waiter.wait().await, Err(failure));
    }

    #[tokio::test]
    async fn test_dropped_notifier_reports_abandoned() {
        let (notifier, waiter) = ReadyNotifier::channel();
        drop(notifier);
        assert_eq!(waiter.wait().await, Err(AttachError::Abandoned));
    }

    #[test]
    fn test_notify_without_waiter_is_harmless() {
        ReadyNotifier::none().notify(Err(AttachError::Abandoned));

        let (notifier, waiter) = ReadyNotifier::channel();
        drop(waiter);
        notifier.notify(Err(AttachError::Abandoned));
    }
}
