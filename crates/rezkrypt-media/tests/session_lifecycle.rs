use std::sync::Arc;
use std::time::Duration;

use rezkrypt_media::{
    ChannelNotifier, FailureReason, MediaSession, Notice, PermissionStatus, RequestOutcome,
    SessionConfig, SessionError, Severity, SimulatedOutcome, SimulatedPlatform, Stage, TrackKind,
    TracingNotifier,
};
use tokio::sync::mpsc::UnboundedReceiver;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn session_with(platform: &SimulatedPlatform, config: SessionConfig) -> MediaSession<SimulatedPlatform> {
    MediaSession::new(platform.clone(), Arc::new(TracingNotifier), config)
}

fn session(outcome: SimulatedOutcome) -> (MediaSession<SimulatedPlatform>, SimulatedPlatform) {
    let platform = SimulatedPlatform::new(outcome);
    (session_with(&platform, SessionConfig::default()), platform)
}

fn drain(rx: &mut UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}

async fn wait_until_waiting(platform: &SimulatedPlatform, n: usize) {
    while platform.waiting() < n {
        tokio::task::yield_now().await;
    }
}

// ── Acquisition ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_request_grants_audio_and_video() {
    let (session, platform) = session(SimulatedOutcome::Grant);

    assert_eq!(session.request_access().await, RequestOutcome::Granted);

    let snap = session.snapshot();
    assert_eq!(snap.status, PermissionStatus::Granted);
    assert!(snap.video_enabled);
    assert!(snap.audio_enabled);
    assert!(snap.holds_tracks);
    assert!(!snap.requesting);

    let probes = platform.issued_tracks();
    assert_eq!(probes.len(), 2);
    assert!(probes.iter().all(|p| p.is_enabled() && !p.is_stopped()));
}

#[tokio::test]
async fn refusal_is_denied_and_other_failures_are_errors() {
    let cases = [
        (SimulatedOutcome::Refuse, PermissionStatus::Denied, FailureReason::PermissionRefused),
        (SimulatedOutcome::NotFound, PermissionStatus::Error, FailureReason::DeviceNotFound),
        (SimulatedOutcome::Busy, PermissionStatus::Error, FailureReason::DeviceBusy),
        (SimulatedOutcome::Fail, PermissionStatus::Error, FailureReason::Unknown),
    ];
    for (outcome, status, reason) in cases {
        let (session, _) = session(outcome);
        assert_eq!(
            session.request_access().await,
            RequestOutcome::Failed(reason),
            "outcome {outcome}"
        );
        let snap = session.snapshot();
        assert_eq!(snap.status, status, "outcome {outcome}");
        assert_eq!(snap.last_failure, Some(reason));
        assert!(!snap.holds_tracks);
    }
}

#[tokio::test]
async fn device_busy_leaves_no_resource() {
    let (session, platform) = session(SimulatedOutcome::Busy);
    session.request_access().await;
    assert_eq!(session.status(), PermissionStatus::Error);
    assert!(!session.holds_tracks());
    assert!(platform.issued_tracks().is_empty());
    assert_eq!(
        session.view().stage,
        Stage::Failed {
            reason: FailureReason::DeviceBusy
        }
    );
}

#[tokio::test]
async fn partial_grant_is_a_full_failure() {
    for outcome in [SimulatedOutcome::GrantAudioOnly, SimulatedOutcome::GrantVideoOnly] {
        let (session, platform) = session(outcome);
        assert_eq!(
            session.request_access().await,
            RequestOutcome::Failed(FailureReason::DeviceNotFound)
        );
        assert_eq!(session.status(), PermissionStatus::Error);
        assert!(!session.holds_tracks());
        let probes = platform.issued_tracks();
        assert_eq!(probes.len(), 1);
        assert!(probes[0].is_stopped(), "partial track must be released");
    }
}

#[tokio::test]
async fn request_times_out_into_unknown_error() {
    let platform = SimulatedPlatform::new(SimulatedOutcome::Hang);
    let session = session_with(
        &platform,
        SessionConfig {
            request_timeout: Some(Duration::from_millis(20)),
            ..SessionConfig::default()
        },
    );

    assert_eq!(
        session.request_access().await,
        RequestOutcome::Failed(FailureReason::Unknown)
    );
    assert_eq!(session.status(), PermissionStatus::Error);
    assert!(!session.snapshot().requesting);
}

#[tokio::test]
async fn constraints_reach_the_platform() {
    let platform = SimulatedPlatform::new(SimulatedOutcome::Grant);
    let mut config = SessionConfig::default();
    config.constraints.video.ideal_width = 640;
    config.constraints.video.ideal_height = 480;
    let session = session_with(&platform, config);

    session.request_access().await;
    let seen = platform.last_constraints().expect("constraints recorded");
    assert_eq!((seen.video.ideal_width, seen.video.ideal_height), (640, 480));
}

// ── Toggles ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn video_toggles_alternate_starting_from_enabled() {
    let (session, platform) = session(SimulatedOutcome::Grant);
    session.request_access().await;
    let camera = platform
        .issued_tracks()
        .into_iter()
        .find(|p| p.kind() == TrackKind::Video)
        .expect("video track");

    let mut expected = true;
    for _ in 0..6 {
        assert_eq!(session.video_enabled(), expected);
        assert_eq!(camera.is_enabled(), expected);
        expected = !expected;
        assert_eq!(session.toggle_video().expect("granted"), expected);
    }
    assert!(!camera.is_stopped());
    assert!(session.audio_enabled(), "audio untouched by video toggles");
}

#[tokio::test]
async fn audio_toggled_twice_is_back_on_and_still_held() {
    let (session, platform) = session(SimulatedOutcome::Grant);
    session.request_access().await;
    let mic = platform
        .issued_tracks()
        .into_iter()
        .find(|p| p.kind() == TrackKind::Audio)
        .expect("audio track");

    assert!(!session.toggle_audio().expect("granted"));
    assert!(!mic.is_enabled());
    assert!(session.holds_tracks());
    assert!(!mic.is_stopped());

    assert!(session.toggle_audio().expect("granted"));
    assert!(session.audio_enabled());
    assert!(mic.is_enabled());
    assert!(session.holds_tracks());
    assert_eq!(mic.stop_calls(), 0);
}

#[tokio::test]
async fn toggles_are_rejected_after_denial() {
    let (session, _) = session(SimulatedOutcome::Refuse);
    session.request_access().await;
    assert!(matches!(
        session.toggle_video(),
        Err(SessionError::NotGranted(PermissionStatus::Denied))
    ));
    assert!(!session.video_enabled());
}

// ── Ending and retrying ─────────────────────────────────────────────────────

#[tokio::test]
async fn end_session_releases_tracks_and_disables_toggles() {
    let (session, platform) = session(SimulatedOutcome::Grant);
    session.request_access().await;

    assert!(session.end_session());

    let snap = session.snapshot();
    assert_eq!(snap.status, PermissionStatus::Pending);
    assert!(!snap.holds_tracks);
    assert!(!snap.video_enabled);
    assert!(!snap.audio_enabled);
    assert!(platform.issued_tracks().iter().all(|p| p.is_stopped()));

    assert!(session.toggle_video().is_err());
    assert!(session.toggle_audio().is_err());
    assert_eq!(session.snapshot(), snap, "toggles after end change nothing");

    assert!(!session.end_session(), "second end is a no-op");
    assert!(platform.issued_tracks().iter().all(|p| p.stop_calls() == 1));
}

#[tokio::test]
async fn retry_after_denial_always_reattempts() {
    let platform = SimulatedPlatform::new(SimulatedOutcome::Refuse);
    platform.script([SimulatedOutcome::Refuse, SimulatedOutcome::Refuse]);
    let session = session_with(&platform, SessionConfig::default());

    assert_eq!(
        session.request_access().await,
        RequestOutcome::Failed(FailureReason::PermissionRefused)
    );
    assert_eq!(
        session.retry().await,
        RequestOutcome::Failed(FailureReason::PermissionRefused)
    );
    assert_eq!(platform.request_count(), 2);
    assert_eq!(session.status(), PermissionStatus::Denied);

    platform.script([SimulatedOutcome::Grant]);
    assert_eq!(session.retry().await, RequestOutcome::Granted);
    assert_eq!(platform.request_count(), 3);
    assert_eq!(session.status(), PermissionStatus::Granted);
}

#[tokio::test]
async fn retry_while_granted_swaps_in_fresh_tracks() {
    let (session, platform) = session(SimulatedOutcome::Grant);
    session.request_access().await;
    session.toggle_video().expect("granted");

    assert_eq!(session.retry().await, RequestOutcome::Granted);
    let probes = platform.issued_tracks();
    assert_eq!(probes.len(), 4);
    assert!(probes[..2].iter().all(|p| p.is_stopped()));
    assert!(probes[2..].iter().all(|p| p.is_enabled() && !p.is_stopped()));
    assert!(session.video_enabled());
}

// ── Concurrency and teardown ────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_request_is_ignored() {
    let platform = SimulatedPlatform::gated(SimulatedOutcome::Grant);
    let session = Arc::new(session_with(&platform, SessionConfig::default()));

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.request_access().await })
    };
    wait_until_waiting(&platform, 1).await;

    assert!(session.snapshot().requesting);
    assert_eq!(session.view().stage, Stage::Requesting);
    assert_eq!(session.request_access().await, RequestOutcome::Ignored);
    assert!(session.toggle_video().is_err());

    platform.open_gate(1);
    assert_eq!(first.await.expect("join"), RequestOutcome::Granted);
    assert_eq!(platform.request_count(), 1);
    assert_eq!(platform.issued_tracks().len(), 2);
}

#[tokio::test]
async fn ending_during_request_supersedes_it() {
    let platform = SimulatedPlatform::gated(SimulatedOutcome::Grant);
    let session = Arc::new(session_with(&platform, SessionConfig::default()));

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.request_access().await })
    };
    wait_until_waiting(&platform, 1).await;

    assert!(session.end_session());
    assert!(!session.snapshot().requesting);

    platform.open_gate(1);
    assert_eq!(pending.await.expect("join"), RequestOutcome::Superseded);
    assert_eq!(session.status(), PermissionStatus::Pending);
    assert!(!session.holds_tracks());
    assert!(platform.issued_tracks().iter().all(|p| p.is_stopped()));
}

#[tokio::test]
async fn retry_waits_for_the_superseded_request_to_settle() {
    let platform = SimulatedPlatform::gated(SimulatedOutcome::Grant);
    let session = Arc::new(session_with(&platform, SessionConfig::default()));

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.request_access().await })
    };
    wait_until_waiting(&platform, 1).await;

    let second = {
        let session = session.clone();
        tokio::spawn(async move { session.retry().await })
    };
    for _ in 0..50 {
        tokio::task::yield_now().await;
        assert!(platform.waiting() <= 1, "two acquisitions at the platform");
    }
    assert_eq!(platform.request_count(), 1);

    platform.open_gate(1);
    assert_eq!(first.await.expect("join"), RequestOutcome::Superseded);
    wait_until_waiting(&platform, 1).await;
    assert_eq!(platform.request_count(), 2);
    assert!(
        platform.issued_tracks().iter().all(|p| p.is_stopped()),
        "late tracks are released before the next acquisition"
    );

    platform.open_gate(1);
    assert_eq!(second.await.expect("join"), RequestOutcome::Granted);
    assert_eq!(platform.waiting(), 0);
    let probes = platform.issued_tracks();
    assert_eq!(probes.len(), 4);
    assert!(probes[..2].iter().all(|p| p.is_stopped()));
    assert!(probes[2..].iter().all(|p| p.is_enabled() && !p.is_stopped()));
    assert_eq!(session.status(), PermissionStatus::Granted);
}

#[tokio::test]
async fn second_request_while_draining_is_ignored() {
    let platform = SimulatedPlatform::gated(SimulatedOutcome::Refuse);
    let session = Arc::new(session_with(&platform, SessionConfig::default()));

    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.request_access().await })
    };
    wait_until_waiting(&platform, 1).await;
    assert!(session.end_session());

    let queued = {
        let session = session.clone();
        tokio::spawn(async move { session.request_access().await })
    };
    tokio::task::yield_now().await;

    platform.script([SimulatedOutcome::Grant]);
    platform.open_gate(1);
    assert_eq!(first.await.expect("join"), RequestOutcome::Superseded);
    wait_until_waiting(&platform, 1).await;
    assert_eq!(session.request_access().await, RequestOutcome::Ignored);

    platform.open_gate(1);
    assert_eq!(queued.await.expect("join"), RequestOutcome::Granted);
    assert_eq!(platform.request_count(), 2);
}

#[tokio::test]
async fn dropped_request_does_not_block_the_next_one() {
    let platform = SimulatedPlatform::new(SimulatedOutcome::Grant);
    platform.script([SimulatedOutcome::Hang]);
    let session = session_with(
        &platform,
        SessionConfig {
            request_timeout: None,
            ..SessionConfig::default()
        },
    );

    let abandoned = tokio::time::timeout(Duration::from_millis(20), session.request_access()).await;
    assert!(abandoned.is_err());
    assert!(!session.snapshot().requesting);

    assert_eq!(session.request_access().await, RequestOutcome::Granted);
}

#[tokio::test]
async fn dropping_the_session_releases_tracks() {
    let (session, platform) = session(SimulatedOutcome::Grant);
    session.request_access().await;
    drop(session);
    let probes = platform.issued_tracks();
    assert_eq!(probes.len(), 2);
    assert!(probes.iter().all(|p| p.is_stopped()));
}

// ── Notifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn lifecycle_emits_toasts_in_order() {
    let platform = SimulatedPlatform::new(SimulatedOutcome::Grant);
    platform.script([SimulatedOutcome::Busy]);
    let (notifier, mut rx) = ChannelNotifier::new();
    let session = MediaSession::new(platform, Arc::new(notifier), SessionConfig::default());

    session.request_access().await;
    let failed = drain(&mut rx);
    assert_eq!(failed, vec![Notice::access_failed(FailureReason::DeviceBusy)]);
    assert_eq!(failed[0].severity, Severity::Destructive);

    session.retry().await;
    session.toggle_video().expect("granted");
    session.toggle_audio().expect("granted");
    session.end_session();

    assert_eq!(
        drain(&mut rx),
        vec![
            Notice::access_granted(),
            Notice::camera(false),
            Notice::microphone(false),
            Notice::interview_ended(),
        ]
    );
}

#[tokio::test]
async fn ignored_and_rejected_calls_stay_silent() {
    let (notifier, mut rx) = ChannelNotifier::new();
    let session = MediaSession::new(
        SimulatedPlatform::new(SimulatedOutcome::Grant),
        Arc::new(notifier),
        SessionConfig::default(),
    );

    assert!(session.toggle_audio().is_err());
    assert!(!session.end_session());
    assert!(drain(&mut rx).is_empty());

    session.request_access().await;
    drain(&mut rx);
    assert_eq!(session.request_access().await, RequestOutcome::Ignored);
    assert!(drain(&mut rx).is_empty());
}
