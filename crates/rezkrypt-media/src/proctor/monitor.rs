use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use super::alerts::{AlertDispatcher, AlertKey};
use super::sample::{FrameSample, Px, Zone};
use super::ProctorConfig;

/// Something the rules noticed in a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProctorEvent {
    ReferenceCaptured { face: usize },
    AbsenceTick,
    MultiFace { faces: usize },
    RefDeviation { face: usize, deviation_px: f64 },
    CheekIrisDrift { face: usize, left_px: f64, right_px: f64 },
    DwellWarn { face: usize, zone: Zone, seconds: f64 },
    DwellCritical { face: usize, zone: Zone, seconds: f64 },
    FrequentGlance { face: usize, zone: Zone, count: usize },
    FreezeTick { face: usize },
    TamperDetected { area_ratio: f64 },
    Alert { key: AlertKey, detail: String },
}

impl ProctorEvent {
    pub fn is_alert(&self) -> bool {
        matches!(self, ProctorEvent::Alert { .. })
    }
}

impl fmt::Display for ProctorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProctorEvent::ReferenceCaptured { face } => write!(f, "reference captured for face {face}"),
            ProctorEvent::AbsenceTick => f.write_str("no face detected"),
            ProctorEvent::MultiFace { faces } => write!(f, "{faces} faces detected"),
            ProctorEvent::RefDeviation { face, deviation_px } => {
                write!(f, "face {face} moved {deviation_px:.1}px from its reference")
            }
            ProctorEvent::CheekIrisDrift { face, .. } => {
                write!(f, "face {face} cheek-iris distance drifted")
            }
            ProctorEvent::DwellWarn { face, zone, seconds }
            | ProctorEvent::DwellCritical { face, zone, seconds } => {
                write!(f, "face {face} looking {} for {seconds}s", zone.as_str())
            }
            ProctorEvent::FrequentGlance { face, zone, count } => {
                write!(f, "face {face} glanced {} {count} times", zone.as_str())
            }
            ProctorEvent::FreezeTick { face } => write!(f, "face {face} did not move"),
            ProctorEvent::TamperDetected { area_ratio } => {
                write!(f, "foreground change over {area_ratio} of the frame")
            }
            ProctorEvent::Alert { key, detail } => write!(f, "{key}: {detail}"),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

struct Reference {
    nose: Px,
    forehead: Px,
    cheek_iris: Option<(f64, f64)>,
}

#[derive(Default)]
struct FaceTrack {
    reference: Option<Reference>,
    /// Current coarse zone and when the face entered it.
    zone: Option<(Zone, f64)>,
    glances: HashMap<Zone, VecDeque<f64>>,
    last_points: Option<[Px; 2]>,
    still_frames: u32,
}

impl FaceTrack {
    fn update_zones(
        &mut self,
        face: usize,
        coarse: Zone,
        detailed: Zone,
        ts: f64,
        config: &ProctorConfig,
        events: &mut Vec<ProctorEvent>,
    ) {
        let entered = match self.zone {
            Some((zone, since)) if zone == coarse => since,
            _ => {
                self.zone = Some((coarse, ts));
                ts
            }
        };
        let dwell = ts - entered;
        if coarse != Zone::Center {
            if dwell > config.dwell_critical_s {
                events.push(ProctorEvent::DwellCritical {
                    face,
                    zone: coarse,
                    seconds: round2(dwell),
                });
            } else if dwell > config.dwell_warn_s {
                events.push(ProctorEvent::DwellWarn {
                    face,
                    zone: coarse,
                    seconds: round2(dwell),
                });
            }
        }

        if detailed != Zone::Center {
            let window = self.glances.entry(detailed).or_default();
            let cutoff = ts - config.glance_window_s;
            while window.front().is_some_and(|&t| t < cutoff) {
                window.pop_front();
            }
            window.push_back(ts);
            if window.len() >= config.glance_threshold {
                events.push(ProctorEvent::FrequentGlance {
                    face,
                    zone: detailed,
                    count: window.len(),
                });
            }
        }
    }

    fn check_freeze(
        &mut self,
        face: usize,
        points: [Px; 2],
        config: &ProctorConfig,
        events: &mut Vec<ProctorEvent>,
    ) {
        let Some(previous) = self.last_points.replace(points) else {
            return;
        };
        let moved = previous
            .iter()
            .zip(points.iter())
            .map(|(a, b)| a.distance(*b))
            .fold(0.0, f64::max);
        if moved <= config.freeze_motion_px {
            self.still_frames += 1;
            events.push(ProctorEvent::FreezeTick { face });
        } else {
            self.still_frames = 0;
        }
    }
}

/// Gaze, pose, presence and tamper rules over detector output for one
/// connection. Time is taken from the samples, never the wall clock.
pub struct ProctorMonitor {
    config: ProctorConfig,
    alerts: AlertDispatcher,
    faces: Vec<FaceTrack>,
    absent_since: Option<f64>,
}

impl ProctorMonitor {
    pub fn new(config: ProctorConfig) -> Self {
        Self {
            alerts: AlertDispatcher::new(config.alert_cooldown_s),
            config,
            faces: Vec::new(),
            absent_since: None,
        }
    }

    pub fn config(&self) -> &ProctorConfig {
        &self.config
    }

    pub fn process(&mut self, sample: &FrameSample) -> Vec<ProctorEvent> {
        let mut events = Vec::new();
        let detected = sample.faces_detected();
        match detected {
            0 => events.push(ProctorEvent::AbsenceTick),
            1 => {}
            faces => events.push(ProctorEvent::MultiFace { faces }),
        }

        let config = &self.config;
        let (width, height) = (f64::from(sample.width), f64::from(sample.height));
        for (face, landmarks) in sample.faces.iter().take(config.max_faces).enumerate() {
            if self.faces.len() <= face {
                self.faces.resize_with(face + 1, FaceTrack::default);
            }
            let track = &mut self.faces[face];
            let nose = landmarks.nose.to_px(width, height);
            let forehead = landmarks.forehead.to_px(width, height);
            let cheek_iris = landmarks.cheek_iris_px(width, height);

            if sample.capture_reference {
                track.reference = Some(Reference {
                    nose,
                    forehead,
                    cheek_iris,
                });
                info!(face, "reference pose captured");
                events.push(ProctorEvent::ReferenceCaptured { face });
            }

            if let Some(reference) = &track.reference {
                let deviation = reference
                    .nose
                    .distance(nose)
                    .max(reference.forehead.distance(forehead));
                if deviation > config.reference_deviation_px {
                    events.push(ProctorEvent::RefDeviation {
                        face,
                        deviation_px: round2(deviation),
                    });
                }
                if let (Some((ref_left, ref_right)), Some((left, right))) =
                    (reference.cheek_iris, cheek_iris)
                {
                    if (left - ref_left).abs() > config.cheek_iris_deviation_px
                        || (right - ref_right).abs() > config.cheek_iris_deviation_px
                    {
                        events.push(ProctorEvent::CheekIrisDrift {
                            face,
                            left_px: round2(left),
                            right_px: round2(right),
                        });
                    }
                }
            }

            let coarse = Zone::coarse(landmarks.nose, config.zone_edge_ratio);
            let detailed = Zone::detailed(landmarks.nose, config.zone_edge_ratio);
            track.update_zones(face, coarse, detailed, sample.ts, config, &mut events);
            track.check_freeze(face, [nose, forehead], config, &mut events);
        }

        if let Some(ratio) = sample.foreground_ratio {
            if ratio >= config.tamper_area_ratio {
                events.push(ProctorEvent::TamperDetected {
                    area_ratio: round2(ratio),
                });
            }
        }

        let alerts = self.raise_alerts(sample.ts, detected, &events);
        events.extend(alerts);
        for event in &events {
            debug!(ts = sample.ts, %event, "proctor event");
        }
        events
    }

    fn raise_alerts(&mut self, ts: f64, detected: usize, events: &[ProctorEvent]) -> Vec<ProctorEvent> {
        let mut raised = Vec::new();
        let mut raise = |alerts: &mut AlertDispatcher, key: AlertKey, detail: String| {
            if alerts.fire(key, ts, &detail) {
                raised.push(ProctorEvent::Alert { key, detail });
            }
        };

        if detected == 0 {
            let since = *self.absent_since.get_or_insert(ts);
            if ts - since >= self.config.absence_warn_s {
                raise(&mut self.alerts, AlertKey::Absence, "No face detected".to_string());
            }
        } else {
            self.absent_since = None;
        }

        for event in events {
            let key = match event {
                ProctorEvent::MultiFace { .. } => AlertKey::MultiFace,
                ProctorEvent::DwellCritical { .. } | ProctorEvent::FrequentGlance { .. } => {
                    AlertKey::Gaze
                }
                ProctorEvent::RefDeviation { .. } | ProctorEvent::CheekIrisDrift { .. } => {
                    AlertKey::Pose
                }
                ProctorEvent::TamperDetected { .. } => AlertKey::Tamper,
                _ => continue,
            };
            raise(&mut self.alerts, key, event.to_string());
        }

        let freeze_ticks = self.config.freeze_ticks;
        if self.faces.iter().any(|f| f.still_frames >= freeze_ticks) {
            raise(
                &mut self.alerts,
                AlertKey::Freeze,
                "Low facial motion observed".to_string(),
            );
        }
        raised
    }
}
