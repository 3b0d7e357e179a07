use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::capture::FailureReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Destructive,
}

/// A toast shown to the person in front of the interview screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    fn info(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            severity: Severity::Info,
        }
    }

    pub fn access_granted() -> Self {
        Self::info(
            "Camera and microphone access granted",
            "You're ready to start your video interview!",
        )
    }

    pub fn access_failed(reason: FailureReason) -> Self {
        Self {
            title: "Media Access Error".to_string(),
            description: reason.message().to_string(),
            severity: Severity::Destructive,
        }
    }

    pub fn camera(enabled: bool) -> Self {
        if enabled {
            Self::info("Camera enabled", "Your video is now on")
        } else {
            Self::info("Camera disabled", "Your video is now off")
        }
    }

    pub fn microphone(enabled: bool) -> Self {
        if enabled {
            Self::info("Microphone unmuted", "Your audio is now unmuted")
        } else {
            Self::info("Microphone muted", "Your audio is now muted")
        }
    }

    pub fn interview_ended() -> Self {
        Self::info(
            "Interview ended",
            "Thank you for your time. The interview has been terminated.",
        )
    }
}

/// Surfaces session status changes to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes every notice to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Info => info!(title = %notice.title, "{}", notice.description),
            Severity::Destructive => warn!(title = %notice.title, "{}", notice.description),
        }
    }
}

/// Forwards notices to a receiver owned by the UI loop.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        // Receiver gone means the screen is being torn down.
        let _ = self.tx.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_notice_uses_reason_message() {
        let notice = Notice::access_failed(FailureReason::DeviceBusy);
        assert_eq!(notice.severity, Severity::Destructive);
        assert_eq!(notice.title, "Media Access Error");
        assert!(notice.description.contains("already in use"));
    }

    #[test]
    fn toggle_notices_describe_new_state() {
        assert_eq!(Notice::camera(false).title, "Camera disabled");
        assert_eq!(Notice::microphone(true).title, "Microphone unmuted");
    }

    #[tokio::test]
    async fn channel_notifier_delivers_in_order() {
        let (notifier, mut rx) = ChannelNotifier::new();
        notifier.notify(Notice::access_granted());
        notifier.notify(Notice::interview_ended());
        assert_eq!(rx.recv().await, Some(Notice::access_granted()));
        assert_eq!(rx.recv().await, Some(Notice::interview_ended()));
    }

    #[test]
    fn channel_notifier_tolerates_closed_receiver() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify(Notice::camera(true));
    }
}
