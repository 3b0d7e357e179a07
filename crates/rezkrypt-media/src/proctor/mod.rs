//! Interview proctoring over face-detector output.
//!
//! Frames arrive as [`FrameSample`]s, go through a bounded queue to a worker
//! running [`ProctorMonitor`], and come back as [`TimedEvent`]s a few at a
//! time per frame.

pub mod alerts;
pub mod monitor;
pub mod sample;
pub mod stream;

use serde::{Deserialize, Serialize};

pub use alerts::{AlertDispatcher, AlertKey};
pub use monitor::{ProctorEvent, ProctorMonitor};
pub use sample::{FaceLandmarks, FrameSample, Point, Zone};
pub use stream::{ProctorError, ProctorHub, ProctorSession, TimedEvent};

/// Thresholds for the proctoring rules. Times are in seconds of sample time.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProctorConfig {
    pub max_faces: usize,
    /// Width of the edge band, as a share of the frame, that counts as
    /// looking away.
    pub zone_edge_ratio: f64,
    pub dwell_warn_s: f64,
    pub dwell_critical_s: f64,
    pub glance_window_s: f64,
    pub glance_threshold: usize,
    pub reference_deviation_px: f64,
    pub cheek_iris_deviation_px: f64,
    pub absence_warn_s: f64,
    pub tamper_area_ratio: f64,
    pub freeze_motion_px: f64,
    pub freeze_ticks: u32,
    pub alert_cooldown_s: f64,
    /// Frames waiting for the worker. Further frames are dropped.
    pub frame_queue: usize,
    pub max_events_per_frame: usize,
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            max_faces: 2,
            zone_edge_ratio: 0.3,
            dwell_warn_s: 3.0,
            dwell_critical_s: 5.0,
            glance_window_s: 60.0,
            glance_threshold: 5,
            reference_deviation_px: 30.0,
            cheek_iris_deviation_px: 18.0,
            absence_warn_s: 3.0,
            tamper_area_ratio: 0.33,
            freeze_motion_px: 2.0,
            freeze_ticks: 10,
            alert_cooldown_s: 20.0,
            frame_queue: 30,
            max_events_per_frame: 5,
        }
    }
}
