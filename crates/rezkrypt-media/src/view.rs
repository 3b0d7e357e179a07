//! What the interview screen should draw for a given session state.

use serde::Serialize;

use crate::capture::FailureReason;
use crate::session::{PermissionStatus, SessionSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    /// A capture request is waiting on the platform.
    Requesting,
    /// Nothing requested yet, or the session was ended.
    AccessRequired,
    Denied,
    Failed { reason: FailureReason },
    /// Render frames from the named video track.
    Live { track: String },
    CameraOff,
}

impl Stage {
    pub fn caption(&self) -> Option<&'static str> {
        match self {
            Stage::Requesting => Some("Requesting camera and microphone access..."),
            Stage::AccessRequired => Some("Camera access required"),
            Stage::Denied => Some("Camera Access Denied"),
            Stage::Failed { reason } => Some(reason.message()),
            Stage::Live { .. } => None,
            Stage::CameraOff => Some("Camera is disabled"),
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Stage::Requesting => Some("Please allow permissions in your browser"),
            Stage::Denied => Some(
                "Please enable camera and microphone permissions for this site in your browser settings, then try again.",
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Control {
    pub available: bool,
    pub on: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub microphone: Control,
    pub camera: Control,
    pub end_call: bool,
    pub retry: bool,
    pub request: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenView {
    #[serde(flatten)]
    pub stage: Stage,
    pub caption: Option<&'static str>,
    pub hint: Option<&'static str>,
    /// Local preview is shown mirrored, like a selfie camera.
    pub mirrored: bool,
    pub controls: Controls,
    pub badge: &'static str,
}

impl From<&SessionSnapshot> for ScreenView {
    fn from(snap: &SessionSnapshot) -> Self {
        let stage = match snap.status {
            PermissionStatus::Pending if snap.requesting => Stage::Requesting,
            PermissionStatus::Pending => Stage::AccessRequired,
            PermissionStatus::Denied => Stage::Denied,
            PermissionStatus::Error => Stage::Failed {
                reason: snap.last_failure.unwrap_or(FailureReason::Unknown),
            },
            PermissionStatus::Granted => match (&snap.video_track, snap.video_enabled) {
                (Some(track), true) => Stage::Live {
                    track: track.clone(),
                },
                _ => Stage::CameraOff,
            },
        };
        let granted = snap.status == PermissionStatus::Granted;
        let failed = matches!(
            snap.status,
            PermissionStatus::Denied | PermissionStatus::Error
        );
        Self {
            caption: stage.caption(),
            hint: stage.hint(),
            mirrored: true,
            controls: Controls {
                microphone: Control {
                    available: granted,
                    on: snap.audio_enabled,
                },
                camera: Control {
                    available: granted,
                    on: snap.video_enabled,
                },
                end_call: snap.holds_tracks,
                retry: failed,
                request: snap.status == PermissionStatus::Pending && !snap.requesting,
            },
            badge: if snap.holds_tracks {
                "Recording"
            } else {
                "Ready to Connect"
            },
            stage,
        }
    }
}
