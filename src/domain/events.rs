//! Domain events for the application.
//!
//! These events are sent over the event bus so that user-facing layers can
//! surface what the background search machinery is doing.

use serde::Serialize;

/// Events published on the notification bus.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    BacklogStarted {
        scope: String,
    },
    BacklogFinished {
        queued: usize,
    },

    SearchQueued {
        show: String,
        kind: String,
    },

    /// User-facing "nothing found" message; only manual searches emit it.
    NoDownloadFound {
        title: String,
        message: String,
    },

    Snatched {
        title: String,
        provider: String,
    },

    RetryStarted {
        show: String,
        count: usize,
    },

    Error {
        message: String,
    },
}
