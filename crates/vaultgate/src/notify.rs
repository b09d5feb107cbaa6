//! Best-effort notifications.
//!
//! Operations enqueue a [`Notification`] after their records commit. A full
//! or closed queue is logged and dropped; it never fails the operation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use vaultgate_core::{ContentId, GrantId, PrincipalId};

/// Something an owner or recipient may want to hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    GrantIssued {
        content_id: ContentId,
        principal_id: PrincipalId,
        grant_id: GrantId,
        expires_at: Option<i64>,
    },
    GrantRevoked {
        content_id: ContentId,
        principal_id: PrincipalId,
    },
    /// Someone other than the owner opened the content.
    ContentAccessed {
        content_id: ContentId,
        owner: PrincipalId,
        accessed_by: PrincipalId,
    },
}

/// Delivery side (e-mail, webhook, ...), supplied by the embedding app.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Sending half of a bounded notification channel.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<Notification>,
}

impl NotificationQueue {
    /// Create a queue holding at most `capacity` pending notifications.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue without waiting.
    pub fn enqueue(&self, notification: Notification) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(n)) => {
                tracing::warn!(notification = ?n, "notification queue full, dropping");
            }
            Err(mpsc::error::TrySendError::Closed(n)) => {
                tracing::warn!(notification = ?n, "notification queue closed, dropping");
            }
        }
    }
}

/// Drain `rx` into `notifier` until every sender is dropped.
pub async fn dispatch(mut rx: mpsc::Receiver<Notification>, notifier: Arc<dyn Notifier>) {
    while let Some(notification) = rx.recv().await {
        if let Err(e) = notifier.notify(&notification).await {
            tracing::warn!(error = %e, ?notification, "notification delivery failed");
        }
    }
    tracing::debug!("notification dispatcher stopped");
}

/// Spawn [`dispatch`] on the current Tokio runtime.
pub fn spawn_dispatcher(
    rx: mpsc::Receiver<Notification>,
    notifier: Arc<dyn Notifier>,
) -> JoinHandle<()> {
    tokio::spawn(dispatch(rx, notifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    #[async_trait]
    impl Notifier for Recorder {
        async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn notify(&self, _: &Notification) -> anyhow::Result<()> {
            anyhow::bail!("smtp down")
        }
    }

    fn revoked(p: &str) -> Notification {
        Notification::GrantRevoked {
            content_id: "b3-c".into(),
            principal_id: p.into(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers_in_order() {
        let (queue, rx) = NotificationQueue::bounded(8);
        let recorder = Arc::new(Recorder::default());
        let handle = spawn_dispatcher(rx, recorder.clone());

        queue.enqueue(revoked("bob"));
        queue.enqueue(revoked("carol"));
        drop(queue);
        handle.await.unwrap();

        assert_eq!(*recorder.0.lock().unwrap(), vec![revoked("bob"), revoked("carol")]);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (queue, mut rx) = NotificationQueue::bounded(1);
        queue.enqueue(revoked("bob"));
        queue.enqueue(revoked("carol"));

        assert_eq!(rx.recv().await, Some(revoked("bob")));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_queue_is_ignored() {
        let (queue, rx) = NotificationQueue::bounded(4);
        drop(rx);
        queue.enqueue(revoked("bob"));
    }

    #[tokio::test]
    async fn test_delivery_failure_does_not_stop_dispatch() {
        let (queue, rx) = NotificationQueue::bounded(4);
        queue.enqueue(revoked("bob"));
        drop(queue);
        dispatch(rx, Arc::new(Failing)).await;
    }
}
