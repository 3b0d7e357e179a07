pub mod capture;
pub mod notify;
pub mod proctor;
pub mod registry;
pub mod session;
pub mod simulated;
pub mod view;

pub use capture::{
    AcquireError, CaptureConstraints, CapturePlatform, CaptureTrack, CaptureTracks, FacingMode,
    FailureReason, TrackKind, VideoConstraints,
};
pub use notify::{ChannelNotifier, Notice, Notifier, Severity, TracingNotifier};
pub use proctor::{
    AlertKey, FaceLandmarks, FrameSample, Point, ProctorConfig, ProctorError, ProctorEvent,
    ProctorHub, ProctorMonitor, ProctorSession, TimedEvent, Zone,
};
pub use registry::{InterviewRegistry, RegistryError};
pub use session::{
    MediaSession, PermissionStatus, RequestOutcome, SessionConfig, SessionError, SessionSnapshot,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use simulated::{SimulatedOutcome, SimulatedPlatform, TrackProbe};
pub use view::{Control, Controls, ScreenView, Stage};
