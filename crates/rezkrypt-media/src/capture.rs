//! Capture platform boundary: constraints, failure taxonomy and the owned track set.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Kind of a local capture track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

/// Which way the camera should face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConstraints {
    #[serde(default)]
    pub facing_mode: FacingMode,
    #[serde(default = "default_ideal_width")]
    pub ideal_width: u32,
    #[serde(default = "default_ideal_height")]
    pub ideal_height: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::User,
            ideal_width: default_ideal_width(),
            ideal_height: default_ideal_height(),
        }
    }
}

fn default_ideal_width() -> u32 {
    1280
}
fn default_ideal_height() -> u32 {
    720
}

/// What a capture request asks the platform for.
///
/// Audio and video are always requested together; the constraints only shape
/// the video track and whether echo-cancelled audio is preferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    #[serde(default)]
    pub video: VideoConstraints,
    #[serde(default = "default_true")]
    pub echo_cancellation: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            video: VideoConstraints::default(),
            echo_cancellation: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Reason code surfaced to callers when acquisition fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    PermissionRefused,
    DeviceNotFound,
    DeviceBusy,
    Unknown,
}

impl FailureReason {
    /// Refusals are the only reasons that map to `Denied`.
    pub fn is_refusal(self) -> bool {
        matches!(self, FailureReason::PermissionRefused)
    }

    /// User-facing description for toasts and the failure overlay.
    pub fn message(self) -> &'static str {
        match self {
            FailureReason::PermissionRefused => {
                "Camera and microphone access was denied. Please allow permissions and refresh the page."
            }
            FailureReason::DeviceNotFound => "No camera or microphone found on this device.",
            FailureReason::DeviceBusy => {
                "Camera or microphone is already in use by another application."
            }
            FailureReason::Unknown => "Failed to access camera and microphone",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureReason::PermissionRefused => "permission refused",
            FailureReason::DeviceNotFound => "device not found",
            FailureReason::DeviceBusy => "device busy",
            FailureReason::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("capture permission refused")]
    PermissionRefused,
    #[error("no {0} capture device found")]
    DeviceNotFound(TrackKind),
    #[error("{0} capture device is in use by another application")]
    DeviceBusy(TrackKind),
    #[error("platform returned {granted} but not {missing}")]
    PartialGrant { granted: TrackKind, missing: TrackKind },
    #[error("capture request timed out after {0:?}")]
    TimedOut(std::time::Duration),
    #[error("capture failed: {0}")]
    Platform(String),
}

impl AcquireError {
    pub fn reason(&self) -> FailureReason {
        match self {
            AcquireError::PermissionRefused => FailureReason::PermissionRefused,
            AcquireError::DeviceNotFound(_) | AcquireError::PartialGrant { .. } => {
                FailureReason::DeviceNotFound
            }
            AcquireError::DeviceBusy(_) => FailureReason::DeviceBusy,
            AcquireError::TimedOut(_) | AcquireError::Platform(_) => FailureReason::Unknown,
        }
    }
}

/// A live handle to a camera or microphone stream.
///
/// `stop` must be idempotent: the track set calls it on release and again
/// nothing happens if the platform already ended the track.
pub trait CaptureTrack: Send {
    fn kind(&self) -> TrackKind;
    fn label(&self) -> &str;
    fn set_enabled(&mut self, enabled: bool);
    fn is_enabled(&self) -> bool;
    fn stop(&mut self);
}

/// The acquired capture resource. Dropping it stops every track.
pub struct CaptureTracks {
    tracks: Vec<Box<dyn CaptureTrack>>,
}

impl CaptureTracks {
    pub fn new(tracks: Vec<Box<dyn CaptureTrack>>) -> Self {
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn has(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind() == kind)
    }

    /// Label of the first track of `kind`, if any.
    pub fn label(&self, kind: TrackKind) -> Option<&str> {
        self.tracks
            .iter()
            .find(|t| t.kind() == kind)
            .map(|t| t.label())
    }

    /// Enable or disable every track of `kind` without releasing it.
    /// Returns false when the set holds no such track.
    pub fn set_enabled(&mut self, kind: TrackKind, enabled: bool) -> bool {
        let mut found = false;
        for track in self.tracks.iter_mut().filter(|t| t.kind() == kind) {
            track.set_enabled(enabled);
            found = true;
        }
        found
    }

    /// Checks that both audio and video came back.
    pub(crate) fn ensure_complete(&self) -> Result<(), AcquireError> {
        match (self.has(TrackKind::Audio), self.has(TrackKind::Video)) {
            (true, true) => Ok(()),
            (true, false) => Err(AcquireError::PartialGrant {
                granted: TrackKind::Audio,
                missing: TrackKind::Video,
            }),
            (false, true) => Err(AcquireError::PartialGrant {
                granted: TrackKind::Video,
                missing: TrackKind::Audio,
            }),
            (false, false) => Err(AcquireError::DeviceNotFound(TrackKind::Video)),
        }
    }

    /// Stop every track now. Equivalent to dropping the set.
    pub fn release(self) {}
}

impl Drop for CaptureTracks {
    fn drop(&mut self) {
        for track in &mut self.tracks {
            debug!(kind = %track.kind(), label = track.label(), "stopping capture track");
            track.stop();
        }
    }
}

impl fmt::Debug for CaptureTracks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.tracks.iter().map(|t| (t.kind(), t.label().to_string())))
            .finish()
    }
}

/// Host capability for combined audio+video capture.
pub trait CapturePlatform: Send + Sync + 'static {
    fn request_capture(
        &self,
        constraints: &CaptureConstraints,
    ) -> impl Future<Output = Result<CaptureTracks, AcquireError>> + Send;
}
