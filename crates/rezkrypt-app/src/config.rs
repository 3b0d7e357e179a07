use anyhow::Result;
use rezkrypt_media::{
    CaptureConstraints, FacingMode, ProctorConfig, SessionConfig, SimulatedOutcome,
    SimulatedPlatform, VideoConstraints,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub proctor: ProctorConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::Pretty,
        }
    }
}

/// Capture settings for the interview screen.
#[derive(Debug, Deserialize, Serialize)]
pub struct MediaConfig {
    /// How the simulated capture platform answers requests.
    #[serde(default = "default_outcome")]
    pub outcome: SimulatedOutcome,
    /// Simulated time before the platform answers.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// Upper bound on a capture request (0 = wait indefinitely).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub echo_cancellation: bool,
    #[serde(default)]
    pub video: VideoConstraints,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            outcome: default_outcome(),
            latency_ms: default_latency_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            echo_cancellation: true,
            video: VideoConstraints::default(),
        }
    }
}

impl MediaConfig {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            constraints: CaptureConstraints {
                video: self.video.clone(),
                echo_cancellation: self.echo_cancellation,
            },
            request_timeout: (self.request_timeout_secs > 0)
                .then(|| Duration::from_secs(self.request_timeout_secs)),
        }
    }

    pub fn platform(&self, outcome: Option<SimulatedOutcome>) -> SimulatedPlatform {
        SimulatedPlatform::with_latency(
            outcome.unwrap_or(self.outcome),
            Duration::from_millis(self.latency_ms),
        )
    }
}

fn default_log_filter() -> String {
    "rezkrypt=info".into()
}
fn default_outcome() -> SimulatedOutcome {
    SimulatedOutcome::Grant
}
fn default_latency_ms() -> u64 {
    400
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

fn generate_config_template(config: &Config) -> String {
    let facing_mode = match config.media.video.facing_mode {
        FacingMode::User => "user",
        FacingMode::Environment => "environment",
    };
    let log_format = match config.logging.format {
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    };
    format!(
        r#"# Rezkrypt configuration
# Every value can be overridden with a REZKRYPT_* environment variable.

[logging]
# Used when RUST_LOG is not set.
filter = "{filter}"
# "pretty" or "json"
format = "{log_format}"

[media]
# grant | grant-audio-only | grant-video-only | refuse | not-found | busy | fail | hang
outcome = "{outcome}"
latency_ms = {latency_ms}
# 0 waits on the platform indefinitely.
request_timeout_secs = {request_timeout_secs}
echo_cancellation = {echo_cancellation}

[media.video]
# "user" (front camera) or "environment"
facing_mode = "{facing_mode}"
ideal_width = {ideal_width}
ideal_height = {ideal_height}

[proctor]
max_faces = {max_faces}
# Edge band, as a share of the frame, that counts as looking away.
zone_edge_ratio = {zone_edge_ratio:?}
dwell_warn_s = {dwell_warn_s:?}
dwell_critical_s = {dwell_critical_s:?}
glance_window_s = {glance_window_s:?}
glance_threshold = {glance_threshold}
reference_deviation_px = {reference_deviation_px:?}
cheek_iris_deviation_px = {cheek_iris_deviation_px:?}
absence_warn_s = {absence_warn_s:?}
tamper_area_ratio = {tamper_area_ratio:?}
freeze_motion_px = {freeze_motion_px:?}
freeze_ticks = {freeze_ticks}
alert_cooldown_s = {alert_cooldown_s:?}
# Frames beyond this many waiting for the worker are dropped.
frame_queue = {frame_queue}
max_events_per_frame = {max_events_per_frame}
"#,
        filter = config.logging.filter,
        outcome = config.media.outcome,
        latency_ms = config.media.latency_ms,
        request_timeout_secs = config.media.request_timeout_secs,
        echo_cancellation = config.media.echo_cancellation,
        ideal_width = config.media.video.ideal_width,
        ideal_height = config.media.video.ideal_height,
        max_faces = config.proctor.max_faces,
        zone_edge_ratio = config.proctor.zone_edge_ratio,
        dwell_warn_s = config.proctor.dwell_warn_s,
        dwell_critical_s = config.proctor.dwell_critical_s,
        glance_window_s = config.proctor.glance_window_s,
        glance_threshold = config.proctor.glance_threshold,
        reference_deviation_px = config.proctor.reference_deviation_px,
        cheek_iris_deviation_px = config.proctor.cheek_iris_deviation_px,
        absence_warn_s = config.proctor.absence_warn_s,
        tamper_area_ratio = config.proctor.tamper_area_ratio,
        freeze_motion_px = config.proctor.freeze_motion_px,
        freeze_ticks = config.proctor.freeze_ticks,
        alert_cooldown_s = config.proctor.alert_cooldown_s,
        frame_queue = config.proctor.frame_queue,
        max_events_per_frame = config.proctor.max_events_per_frame,
    )
}

// ── Config Loading ───────────────────────────────────────────────────────────

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if std::path::Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            tracing::info!(
                "Config file not found at '{}', generating defaults...",
                path
            );
            let config = Config::default();

            if let Some(parent) = std::path::Path::new(path).parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(path, generate_config_template(&config))?;
            tracing::info!("Generated default config at '{}'", path);
            config
        };

        // Environment variable overrides
        if let Ok(value) = std::env::var("REZKRYPT_LOG_FILTER") {
            if !value.trim().is_empty() {
                config.logging.filter = value;
            }
        }
        if let Ok(value) = std::env::var("REZKRYPT_LOG_FORMAT") {
            if let Ok(parsed) = value.parse::<LogFormat>() {
                config.logging.format = parsed;
            }
        }
        if let Ok(value) = std::env::var("REZKRYPT_MEDIA_OUTCOME") {
            match value.parse::<SimulatedOutcome>() {
                Ok(parsed) => config.media.outcome = parsed,
                Err(e) => tracing::warn!("ignoring REZKRYPT_MEDIA_OUTCOME: {}", e),
            }
        }
        if let Ok(value) = std::env::var("REZKRYPT_MEDIA_LATENCY_MS") {
            if let Ok(parsed) = value.parse::<u64>() {
                config.media.latency_ms = parsed.min(60_000);
            }
        }
        if let Ok(value) = std::env::var("REZKRYPT_MEDIA_REQUEST_TIMEOUT_SECS") {
            if let Ok(parsed) = value.parse::<u64>() {
                config.media.request_timeout_secs = parsed;
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, LogFormat, MediaConfig};
    use rezkrypt_media::{FacingMode, ProctorConfig, SimulatedOutcome};
    use std::time::Duration;

    #[test]
    fn media_defaults_grant_with_bounded_timeout() {
        let media = MediaConfig::default();
        assert_eq!(media.outcome, SimulatedOutcome::Grant);
        let session = media.session_config();
        assert_eq!(session.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(session.constraints.video.facing_mode, FacingMode::User);
    }

    #[test]
    fn zero_timeout_disables_the_bound() {
        let media = MediaConfig {
            request_timeout_secs: 0,
            ..MediaConfig::default()
        };
        assert_eq!(media.session_config().request_timeout, None);
    }

    #[test]
    fn missing_file_generates_a_loadable_template() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config_path = temp.path().join("nested").join("rezkrypt-test.toml");
        let path = config_path.to_str().expect("config path utf8");

        let generated = Config::load(path).expect("generate config");
        assert!(config_path.exists());
        assert_eq!(generated.logging.format, LogFormat::Pretty);

        let reloaded = Config::load(path).expect("reload config");
        assert_eq!(reloaded.media.latency_ms, generated.media.latency_ms);
        assert_eq!(reloaded.media.video, generated.media.video);
        assert_eq!(reloaded.proctor, ProctorConfig::default());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config_path = temp.path().join("rezkrypt.toml");
        std::fs::write(
            &config_path,
            "[media]\noutcome = \"refuse\"\n\n[media.video]\nfacing_mode = \"environment\"\n",
        )
        .expect("write config");

        let config = Config::load(config_path.to_str().expect("utf8")).expect("load config");
        assert_eq!(config.media.outcome, SimulatedOutcome::Refuse);
        assert_eq!(config.media.video.facing_mode, FacingMode::Environment);
        assert_eq!(config.media.video.ideal_width, 1280);
        assert_eq!(config.media.request_timeout_secs, 30);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.proctor.frame_queue, 30);
    }

    #[test]
    fn proctor_section_overrides_thresholds() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config_path = temp.path().join("rezkrypt-proctor.toml");
        std::fs::write(
            &config_path,
            "[proctor]\nalert_cooldown_s = 5.0\nframe_queue = 8\n",
        )
        .expect("write config");

        let config = Config::load(config_path.to_str().expect("utf8")).expect("load config");
        assert_eq!(config.proctor.alert_cooldown_s, 5.0);
        assert_eq!(config.proctor.frame_queue, 8);
        assert_eq!(config.proctor.dwell_critical_s, 5.0);
        assert_eq!(config.media.latency_ms, 400);
    }

    #[test]
    fn env_override_replaces_log_filter() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config_path = temp.path().join("rezkrypt-env.toml");
        std::env::set_var("REZKRYPT_LOG_FILTER", "rezkrypt=trace");
        let config =
            Config::load(config_path.to_str().expect("config path utf8")).expect("load config");
        std::env::remove_var("REZKRYPT_LOG_FILTER");
        assert_eq!(config.logging.filter, "rezkrypt=trace");
    }
}
