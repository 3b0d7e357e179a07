use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::capture::{
    AcquireError, CaptureConstraints, CapturePlatform, CaptureTracks, FailureReason, TrackKind,
};
use crate::notify::{Notice, Notifier};
use crate::view::ScreenView;

/// Default upper bound on a single capture request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Pending,
    Granted,
    Denied,
    Error,
}

/// What a call to [`MediaSession::request_access`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Granted,
    Failed(FailureReason),
    /// Another request was already in flight, or access is already granted.
    Ignored,
    /// The session was ended while the request was in flight; anything the
    /// platform returned has been released.
    Superseded,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("capture is not granted (status: {0:?})")]
    NotGranted(PermissionStatus),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub constraints: CaptureConstraints,
    /// `None` waits on the platform indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            constraints: CaptureConstraints::default(),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

/// Point-in-time copy of the session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub status: PermissionStatus,
    pub video_enabled: bool,
    pub audio_enabled: bool,
    pub requesting: bool,
    pub holds_tracks: bool,
    pub last_failure: Option<FailureReason>,
    pub video_track: Option<String>,
}

struct SessionState {
    status: PermissionStatus,
    video_enabled: bool,
    audio_enabled: bool,
    tracks: Option<CaptureTracks>,
    last_failure: Option<FailureReason>,
    /// Bumped by every `end_session`; a request resolving under an older
    /// generation is stale.
    generation: u64,
    /// Generation of the platform call still outstanding, if any. Stays set
    /// after `end_session` until the superseded call settles, so at most one
    /// acquisition ever reaches the platform.
    in_flight: Option<u64>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: PermissionStatus::Pending,
            video_enabled: false,
            audio_enabled: false,
            tracks: None,
            last_failure: None,
            generation: 0,
            in_flight: None,
        }
    }
}

/// Frees the platform slot once the request is over, whether it resolved,
/// was superseded or had its future dropped, and wakes requests queued
/// behind it.
struct InFlight<'a> {
    state: &'a Mutex<SessionState>,
    settled: &'a Notify,
    generation: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.in_flight == Some(self.generation) {
            state.in_flight = None;
        }
        drop(state);
        self.settled.notify_waiters();
    }
}

/// Local capture-device access for one interview screen.
///
/// Invariant: tracks are held if and only if the status is `Granted`.
/// The session may be shared between tasks; its lock is never held across
/// the platform request.
pub struct MediaSession<P> {
    id: Uuid,
    platform: P,
    notifier: Arc<dyn Notifier>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    settled: Notify,
}

impl<P: CapturePlatform> MediaSession<P> {
    pub fn new(platform: P, notifier: Arc<dyn Notifier>, config: SessionConfig) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, "media session created");
        Self {
            id,
            platform,
            notifier,
            config,
            state: Mutex::new(SessionState::default()),
            settled: Notify::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request combined audio+video capture from the platform.
    ///
    /// If an ended session's request is still with the platform, this waits
    /// for it to settle before asking again.
    pub async fn request_access(&self) -> RequestOutcome {
        let generation = loop {
            let settled = self.settled.notified();
            {
                let mut state = self.lock();
                if state.in_flight == Some(state.generation) {
                    debug!(session = %self.id, "capture request already in flight, ignoring");
                    return RequestOutcome::Ignored;
                }
                if state.status == PermissionStatus::Granted {
                    debug!(session = %self.id, "capture already granted, ignoring");
                    return RequestOutcome::Ignored;
                }
                if state.in_flight.is_none() {
                    state.status = PermissionStatus::Pending;
                    state.last_failure = None;
                    state.in_flight = Some(state.generation);
                    break state.generation;
                }
            }
            debug!(session = %self.id, "waiting for superseded capture request to settle");
            settled.await;
        };
        let _flight = InFlight {
            state: &self.state,
            settled: &self.settled,
            generation,
        };

        info!(session = %self.id, "requesting camera and microphone access");
        let result = self.acquire().await;

        let mut stale = None;
        let (outcome, notice) = {
            let mut state = self.lock();
            if state.generation != generation {
                stale = result.ok();
                (RequestOutcome::Superseded, None)
            } else {
                state.in_flight = None;
                match result {
                    Ok(mut tracks) => {
                        tracks.set_enabled(TrackKind::Video, true);
                        tracks.set_enabled(TrackKind::Audio, true);
                        info!(session = %self.id, tracks = tracks.len(), "capture granted");
                        state.tracks = Some(tracks);
                        state.status = PermissionStatus::Granted;
                        state.video_enabled = true;
                        state.audio_enabled = true;
                        (RequestOutcome::Granted, Some(Notice::access_granted()))
                    }
                    Err(e) => {
                        let reason = e.reason();
                        warn!(session = %self.id, error = %e, %reason, "capture request failed");
                        state.status = if reason.is_refusal() {
                            PermissionStatus::Denied
                        } else {
                            PermissionStatus::Error
                        };
                        state.last_failure = Some(reason);
                        (
                            RequestOutcome::Failed(reason),
                            Some(Notice::access_failed(reason)),
                        )
                    }
                }
            }
        };

        if let Some(tracks) = stale {
            debug!(session = %self.id, "session ended during request, releasing late tracks");
            tracks.release();
        }
        if let Some(notice) = notice {
            self.notifier.notify(notice);
        }
        outcome
    }

    async fn acquire(&self) -> Result<CaptureTracks, AcquireError> {
        let request = self.platform.request_capture(&self.config.constraints);
        let tracks = match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| AcquireError::TimedOut(limit))??,
            None => request.await?,
        };
        tracks.ensure_complete()?;
        Ok(tracks)
    }

    /// Flip the camera without releasing it. Returns the new state.
    pub fn toggle_video(&self) -> Result<bool, SessionError> {
        self.toggle(TrackKind::Video)
    }

    /// Flip the microphone without releasing it. Returns the new state.
    pub fn toggle_audio(&self) -> Result<bool, SessionError> {
        self.toggle(TrackKind::Audio)
    }

    fn toggle(&self, kind: TrackKind) -> Result<bool, SessionError> {
        let enabled = {
            let mut state = self.lock();
            if state.status != PermissionStatus::Granted {
                return Err(SessionError::NotGranted(state.status));
            }
            let SessionState {
                tracks,
                video_enabled,
                audio_enabled,
                ..
            } = &mut *state;
            let flag = match kind {
                TrackKind::Video => video_enabled,
                TrackKind::Audio => audio_enabled,
            };
            *flag = !*flag;
            if let Some(tracks) = tracks.as_mut() {
                tracks.set_enabled(kind, *flag);
            }
            *flag
        };
        debug!(session = %self.id, %kind, enabled, "track toggled");
        self.notifier.notify(match kind {
            TrackKind::Video => Notice::camera(enabled),
            TrackKind::Audio => Notice::microphone(enabled),
        });
        Ok(enabled)
    }

    /// Release everything and return to `Pending`.
    ///
    /// Returns false when the session was already idle. Any request still in
    /// flight is superseded.
    pub fn end_session(&self) -> bool {
        let released = {
            let mut state = self.lock();
            let idle = state.status == PermissionStatus::Pending
                && state.tracks.is_none()
                && state.in_flight != Some(state.generation);
            if idle {
                return false;
            }
            let generation = state.generation + 1;
            let in_flight = state.in_flight;
            let tracks = state.tracks.take();
            *state = SessionState {
                generation,
                in_flight,
                ..SessionState::default()
            };
            tracks
        };

        if let Some(tracks) = released {
            info!(session = %self.id, "interview ended, releasing capture tracks");
            tracks.release();
            self.notifier.notify(Notice::interview_ended());
        } else {
            debug!(session = %self.id, "session reset to pending");
        }
        true
    }

    /// End the session and request access again. A request the end
    /// superseded is allowed to settle first.
    pub async fn retry(&self) -> RequestOutcome {
        self.end_session();
        self.request_access().await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            id: self.id,
            status: state.status,
            video_enabled: state.video_enabled,
            audio_enabled: state.audio_enabled,
            requesting: state.in_flight == Some(state.generation),
            holds_tracks: state.tracks.is_some(),
            last_failure: state.last_failure,
            video_track: state
                .tracks
                .as_ref()
                .and_then(|t| t.label(TrackKind::Video))
                .map(str::to_string),
        }
    }

    pub fn status(&self) -> PermissionStatus {
        self.lock().status
    }

    pub fn video_enabled(&self) -> bool {
        self.lock().video_enabled
    }

    pub fn audio_enabled(&self) -> bool {
        self.lock().audio_enabled
    }

    pub fn holds_tracks(&self) -> bool {
        self.lock().tracks.is_some()
    }

    pub fn view(&self) -> ScreenView {
        ScreenView::from(&self.snapshot())
    }
}

impl<P> Drop for MediaSession<P> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(tracks) = state.tracks.take() {
            info!(session = %self.id, "screen torn down, releasing capture tracks");
            tracks.release();
        }
    }
}
