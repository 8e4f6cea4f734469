use tokio::sync::broadcast;

use crate::domain::events::NotificationEvent;

/// Fire-and-forget sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    fn publish(&self, event: NotificationEvent);

    fn message(&self, title: &str, body: &str) {
        self.publish(NotificationEvent::NoDownloadFound {
            title: title.to_string(),
            message: body.to_string(),
        });
    }
}

impl Notifier for broadcast::Sender<NotificationEvent> {
    fn publish(&self, event: NotificationEvent) {
        // No subscribers is not an error.
        let _ = self.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_reaches_subscribers() {
        let (tx, mut rx) = broadcast::channel(4);
        tx.message("No downloads were found", "Couldn't find a download for Show - S01E01");

        match rx.try_recv().unwrap() {
            NotificationEvent::NoDownloadFound { title, message } => {
                assert_eq!(title, "No downloads were found");
                assert!(message.contains("S01E01"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let (tx, rx) = broadcast::channel::<NotificationEvent>(4);
        drop(rx);
        tx.publish(NotificationEvent::Error {
            message: "nobody listens".to_string(),
        });
    }
}
