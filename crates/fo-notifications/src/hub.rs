//! Live delivery
//!
//! Every created notification is published once on a broadcast channel.
//! Each connection subscribes and keeps only its own recipient's messages.

use fo_core::traits::Id;
use fo_models::Notification;
use tokio::sync::broadcast;
use tracing::{debug, warn};

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<Notification>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns the number of subscribers that received it
    pub fn publish(&self, notification: Notification) -> usize {
        match self.sender.send(notification) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No live subscribers for notification");
                0
            }
        }
    }

    pub fn subscribe(&self, recipient_id: Id) -> RecipientStream {
        RecipientStream {
            recipient_id,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// One connection's view of the hub
pub struct RecipientStream {
    recipient_id: Id,
    receiver: broadcast::Receiver<Notification>,
}

impl RecipientStream {
    pub fn recipient_id(&self) -> Id {
        self.recipient_id
    }

    /// Next notification for this recipient; `None` once the hub is gone.
    /// A slow subscriber skips what it missed.
    pub async fn next(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) if notification.recipient_id == self.recipient_id => {
                    return Some(notification)
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(recipient = self.recipient_id, skipped, "Notification subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fo_models::NotificationKind;

    fn notification(id: Id, recipient_id: Id) -> Notification {
        Notification {
            id,
            recipient_id,
            kind: NotificationKind::System,
            title: format!("Notice {id}"),
            message: "Hello".into(),
            link: None,
            read_at: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_stream_filters_by_recipient() {
        let hub = NotificationHub::default();
        let mut stream = hub.subscribe(7);
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(notification(1, 8));
        hub.publish(notification(2, 7));

        let received = stream.next().await.unwrap();
        assert_eq!(received.id, 2);
        assert_eq!(stream.recipient_id(), 7);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let hub = NotificationHub::new(4);
        assert_eq!(hub.publish(notification(1, 1)), 0);
    }

    #[tokio::test]
    async fn test_stream_ends_when_hub_dropped() {
        let hub = NotificationHub::new(4);
        let mut stream = hub.subscribe(1);
        drop(hub);
        assert!(stream.next().await.is_none());
    }
}
