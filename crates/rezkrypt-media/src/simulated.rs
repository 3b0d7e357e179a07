//! In-process capture platform with scripted outcomes.
//!
//! Used by the `rezkrypt interview` command and the test suites. Every track it
//! hands out is paired with a probe so callers can observe enable/stop calls
//! after the track itself has moved into a session.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::capture::{
    AcquireError, CaptureConstraints, CapturePlatform, CaptureTrack, CaptureTracks, TrackKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimulatedOutcome {
    Grant,
    GrantAudioOnly,
    GrantVideoOnly,
    Refuse,
    NotFound,
    Busy,
    Fail,
    /// Never resolves.
    Hang,
}

impl SimulatedOutcome {
    pub const ALL: [SimulatedOutcome; 8] = [
        SimulatedOutcome::Grant,
        SimulatedOutcome::GrantAudioOnly,
        SimulatedOutcome::GrantVideoOnly,
        SimulatedOutcome::Refuse,
        SimulatedOutcome::NotFound,
        SimulatedOutcome::Busy,
        SimulatedOutcome::Fail,
        SimulatedOutcome::Hang,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SimulatedOutcome::Grant => "grant",
            SimulatedOutcome::GrantAudioOnly => "grant-audio-only",
            SimulatedOutcome::GrantVideoOnly => "grant-video-only",
            SimulatedOutcome::Refuse => "refuse",
            SimulatedOutcome::NotFound => "not-found",
            SimulatedOutcome::Busy => "busy",
            SimulatedOutcome::Fail => "fail",
            SimulatedOutcome::Hang => "hang",
        }
    }
}

impl fmt::Display for SimulatedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulatedOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|o| o.as_str() == normalized)
            .ok_or_else(|| format!("unknown simulated outcome '{s}'"))
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    enabled: AtomicBool,
    stopped: AtomicBool,
    stop_calls: AtomicUsize,
}

/// Observer for a track handed out by [`SimulatedPlatform`].
#[derive(Debug, Clone)]
pub struct TrackProbe {
    kind: TrackKind,
    label: String,
    state: Arc<ProbeState>,
}

impl TrackProbe {
    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.state.stop_calls.load(Ordering::SeqCst)
    }
}

struct SimulatedTrack {
    kind: TrackKind,
    label: String,
    state: Arc<ProbeState>,
}

impl CaptureTrack for SimulatedTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn set_enabled(&mut self, enabled: bool) {
        if !self.state.stopped.load(Ordering::SeqCst) {
            self.state.enabled.store(enabled, Ordering::SeqCst);
        }
    }

    fn is_enabled(&self) -> bool {
        self.state.enabled.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        self.state.stop_calls.fetch_add(1, Ordering::SeqCst);
        if !self.state.stopped.swap(true, Ordering::SeqCst) {
            self.state.enabled.store(false, Ordering::SeqCst);
        }
    }
}

struct Inner {
    default: SimulatedOutcome,
    script: Mutex<VecDeque<SimulatedOutcome>>,
    latency: Duration,
    gate: Option<Semaphore>,
    requests: AtomicUsize,
    waiting: AtomicUsize,
    issued: Mutex<Vec<TrackProbe>>,
    last_constraints: Mutex<Option<CaptureConstraints>>,
}

impl Inner {
    fn next_outcome(&self) -> SimulatedOutcome {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(self.default)
    }

    fn issue(&self, kind: TrackKind, request: usize) -> Box<dyn CaptureTrack> {
        let label = match kind {
            TrackKind::Video => format!("Simulated Camera {request}"),
            TrackKind::Audio => format!("Simulated Microphone {request}"),
        };
        let state = Arc::new(ProbeState::default());
        state.enabled.store(true, Ordering::SeqCst);
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TrackProbe {
                kind,
                label: label.clone(),
                state: state.clone(),
            });
        Box::new(SimulatedTrack { kind, label, state })
    }
}

struct Waiting<'a>(&'a AtomicUsize);

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct SimulatedPlatform {
    inner: Arc<Inner>,
}

impl SimulatedPlatform {
    /// Resolve every request immediately with `default`.
    pub fn new(default: SimulatedOutcome) -> Self {
        Self::build(default, Duration::ZERO, false)
    }

    /// Resolve every request with `default` after `latency`.
    pub fn with_latency(default: SimulatedOutcome, latency: Duration) -> Self {
        Self::build(default, latency, false)
    }

    /// Hold every request until [`SimulatedPlatform::open_gate`] lets it through.
    pub fn gated(default: SimulatedOutcome) -> Self {
        Self::build(default, Duration::ZERO, true)
    }

    fn build(default: SimulatedOutcome, latency: Duration, gated: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                default,
                script: Mutex::new(VecDeque::new()),
                latency,
                gate: gated.then(|| Semaphore::new(0)),
                requests: AtomicUsize::new(0),
                waiting: AtomicUsize::new(0),
                issued: Mutex::new(Vec::new()),
                last_constraints: Mutex::new(None),
            }),
        }
    }

    /// Queue outcomes that take precedence over the default, in order.
    pub fn script(&self, outcomes: impl IntoIterator<Item = SimulatedOutcome>) {
        self.inner
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(outcomes);
    }

    /// Let `n` held requests resolve. No effect on an ungated platform.
    pub fn open_gate(&self, n: usize) {
        if let Some(gate) = &self.inner.gate {
            gate.add_permits(n);
        }
    }

    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    /// Requests currently waiting on latency or the gate.
    pub fn waiting(&self) -> usize {
        self.inner.waiting.load(Ordering::SeqCst)
    }

    /// Every track handed out so far, oldest first.
    pub fn issued_tracks(&self) -> Vec<TrackProbe> {
        self.inner
            .issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_constraints(&self) -> Option<CaptureConstraints> {
        self.inner
            .last_constraints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for SimulatedPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedPlatform")
            .field("default", &self.inner.default)
            .field("latency", &self.inner.latency)
            .field("gated", &self.inner.gate.is_some())
            .field("requests", &self.request_count())
            .finish()
    }
}

impl CapturePlatform for SimulatedPlatform {
    fn request_capture(
        &self,
        constraints: &CaptureConstraints,
    ) -> impl Future<Output = Result<CaptureTracks, AcquireError>> + Send {
        let inner = self.inner.clone();
        let constraints = constraints.clone();
        async move {
            let request = inner.requests.fetch_add(1, Ordering::SeqCst) + 1;
            let outcome = inner.next_outcome();
            debug!(request, %outcome, "simulated capture request");
            *inner
                .last_constraints
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(constraints);

            {
                inner.waiting.fetch_add(1, Ordering::SeqCst);
                let _waiting = Waiting(&inner.waiting);
                if let Some(gate) = &inner.gate {
                    if let Ok(permit) = gate.acquire().await {
                        permit.forget();
                    }
                }
                if !inner.latency.is_zero() {
                    tokio::time::sleep(inner.latency).await;
                }
            }

            match outcome {
                SimulatedOutcome::Grant => Ok(CaptureTracks::new(vec![
                    inner.issue(TrackKind::Audio, request),
                    inner.issue(TrackKind::Video, request),
                ])),
                SimulatedOutcome::GrantAudioOnly => Ok(CaptureTracks::new(vec![
                    inner.issue(TrackKind::Audio, request),
                ])),
                SimulatedOutcome::GrantVideoOnly => Ok(CaptureTracks::new(vec![
                    inner.issue(TrackKind::Video, request),
                ])),
                SimulatedOutcome::Refuse => Err(AcquireError::PermissionRefused),
                SimulatedOutcome::NotFound => Err(AcquireError::DeviceNotFound(TrackKind::Video)),
                SimulatedOutcome::Busy => Err(AcquireError::DeviceBusy(TrackKind::Video)),
                SimulatedOutcome::Fail => Err(AcquireError::Platform(
                    "simulated platform failure".to_string(),
                )),
                SimulatedOutcome::Hang => std::future::pending().await,
            }
        }
    }
}
