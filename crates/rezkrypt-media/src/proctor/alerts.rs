use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Alert families. Each has its own cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKey {
    Absence,
    MultiFace,
    Gaze,
    Pose,
    Tamper,
    Freeze,
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertKey::Absence => "absence",
            AlertKey::MultiFace => "multi_face",
            AlertKey::Gaze => "gaze",
            AlertKey::Pose => "pose",
            AlertKey::Tamper => "tamper",
            AlertKey::Freeze => "freeze",
        })
    }
}

/// Rate-limits alerts per key on sample time.
#[derive(Debug)]
pub struct AlertDispatcher {
    cooldown_s: f64,
    last: HashMap<AlertKey, f64>,
}

impl AlertDispatcher {
    pub fn new(cooldown_s: f64) -> Self {
        Self {
            cooldown_s,
            last: HashMap::new(),
        }
    }

    /// Returns true if the alert goes out, and starts its cooldown.
    pub fn fire(&mut self, key: AlertKey, at: f64, detail: &str) -> bool {
        if let Some(&last) = self.last.get(&key) {
            if at - last < self.cooldown_s {
                debug!(alert = %key, detail, "alert suppressed by cooldown");
                return false;
            }
        }
        self.last.insert(key, at);
        warn!(alert = %key, detail, "proctoring alert");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_is_per_key() {
        let mut alerts = AlertDispatcher::new(20.0);
        assert!(alerts.fire(AlertKey::Gaze, 0.0, "dwell"));
        assert!(!alerts.fire(AlertKey::Gaze, 19.9, "dwell"));
        assert!(alerts.fire(AlertKey::Pose, 5.0, "drift"));
        assert!(alerts.fire(AlertKey::Gaze, 20.0, "dwell"));
        assert!(!alerts.fire(AlertKey::Gaze, 25.0, "dwell"));
    }

    #[test]
    fn suppressed_alert_does_not_extend_cooldown() {
        let mut alerts = AlertDispatcher::new(10.0);
        assert!(alerts.fire(AlertKey::Tamper, 0.0, "scene"));
        assert!(!alerts.fire(AlertKey::Tamper, 9.0, "scene"));
        assert!(alerts.fire(AlertKey::Tamper, 10.0, "scene"));
    }
}
