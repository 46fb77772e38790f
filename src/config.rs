use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CamwatchConfig {
    pub source: SourceConfig,
    pub detector: DetectorConfig,
    pub recorder: RecorderConfig,
    pub overlay: OverlayConfig,
    pub monitor: MonitorConfig,
    pub display: DisplayConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    /// Capture resolution requested from USB cameras and used for mock frames
    #[serde(default = "default_source_resolution")]
    pub resolution: (u32, u32),

    /// Capture frame rate requested from USB cameras
    #[serde(default = "default_source_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DetectorConfig {
    /// Minimum region area in pixels for a motion region to be reported
    #[serde(default = "default_motion_threshold")]
    pub motion_threshold: u32,

    /// Per-pixel delta threshold against the background model
    #[serde(default = "default_delta_threshold")]
    pub delta_threshold: u32,

    /// Gaussian blur sigma applied before differencing
    #[serde(default = "default_blur_sigma")]
    pub blur_sigma: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecorderConfig {
    /// Directory recordings are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// File name for motion-triggered recordings
    #[serde(default = "default_motion_filename")]
    pub motion_filename: String,

    /// File name for manually started recordings
    #[serde(default = "default_manual_filename")]
    pub manual_filename: String,

    /// H.264 encoder bitrate in kbit/s
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,

    /// Write a JSON metadata sidecar next to each finished recording
    #[serde(default = "default_save_metadata")]
    pub save_metadata: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OverlayConfig {
    /// Path to TrueType font file for overlay text
    #[serde(default = "default_font_path")]
    pub font_path: String,

    /// Font size for overlay text
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    /// Optional IANA timezone for the timestamp; local time when unset
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MonitorConfig {
    /// Per-iteration input wait in milliseconds; also derives the recording frame rate
    #[serde(default = "default_wait_delay_ms")]
    pub wait_delay_ms: u64,

    /// Seconds without motion before an automatic recording is paused
    #[serde(default = "default_motion_timeout_secs")]
    pub motion_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplayConfig {
    /// Framebuffer device path
    #[serde(default = "default_framebuffer_device")]
    pub framebuffer_device: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl CamwatchConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("camwatch.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            // Start with default values
            .set_default(
                "source.resolution",
                vec![default_source_resolution().0, default_source_resolution().1],
            )?
            .set_default("source.fps", default_source_fps())?
            .set_default("detector.motion_threshold", default_motion_threshold())?
            .set_default("detector.delta_threshold", default_delta_threshold())?
            .set_default("detector.blur_sigma", default_blur_sigma() as f64)?
            .set_default("recorder.output_dir", default_output_dir())?
            .set_default("recorder.motion_filename", default_motion_filename())?
            .set_default("recorder.manual_filename", default_manual_filename())?
            .set_default("recorder.bitrate_kbps", default_bitrate_kbps())?
            .set_default("recorder.save_metadata", default_save_metadata())?
            .set_default("overlay.font_path", default_font_path())?
            .set_default("overlay.font_size", default_font_size() as f64)?
            .set_default("monitor.wait_delay_ms", default_wait_delay_ms())?
            .set_default(
                "monitor.motion_timeout_secs",
                default_motion_timeout_secs(),
            )?
            .set_default("display.framebuffer_device", default_framebuffer_device())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with CAMWATCH_ prefix
            .add_source(Environment::with_prefix("CAMWATCH").separator("_"))
            .build()?;

        let config: CamwatchConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.resolution.0 == 0 || self.source.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Source resolution must be greater than 0".to_string(),
            ));
        }

        if self.source.fps == 0 {
            return Err(ConfigError::Message(
                "Source fps must be greater than 0".to_string(),
            ));
        }

        if self.detector.motion_threshold == 0 {
            return Err(ConfigError::Message(
                "Detector motion_threshold must be greater than 0".to_string(),
            ));
        }

        if self.monitor.wait_delay_ms == 0 || self.monitor.wait_delay_ms > 1000 {
            return Err(ConfigError::Message(
                "Monitor wait_delay_ms must be between 1 and 1000".to_string(),
            ));
        }

        if self.monitor.motion_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Monitor motion_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.recorder.motion_filename == self.recorder.manual_filename {
            return Err(ConfigError::Message(
                "Recorder motion_filename and manual_filename must differ".to_string(),
            ));
        }

        if self.recorder.bitrate_kbps == 0 {
            return Err(ConfigError::Message(
                "Recorder bitrate_kbps must be greater than 0".to_string(),
            ));
        }

        if self.overlay.font_size <= 0.0 {
            return Err(ConfigError::Message(
                "Overlay font_size must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Recording frame rate derived from the iteration pacing budget
    pub fn recording_fps(&self) -> u32 {
        (1000 / self.monitor.wait_delay_ms) as u32
    }
}

impl Default for CamwatchConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                resolution: default_source_resolution(),
                fps: default_source_fps(),
            },
            detector: DetectorConfig {
                motion_threshold: default_motion_threshold(),
                delta_threshold: default_delta_threshold(),
                blur_sigma: default_blur_sigma(),
            },
            recorder: RecorderConfig {
                output_dir: default_output_dir(),
                motion_filename: default_motion_filename(),
                manual_filename: default_manual_filename(),
                bitrate_kbps: default_bitrate_kbps(),
                save_metadata: default_save_metadata(),
            },
            overlay: OverlayConfig {
                font_path: default_font_path(),
                font_size: default_font_size(),
                timezone: None,
            },
            monitor: MonitorConfig {
                wait_delay_ms: default_wait_delay_ms(),
                motion_timeout_secs: default_motion_timeout_secs(),
            },
            display: DisplayConfig {
                framebuffer_device: default_framebuffer_device(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

// Default value functions
fn default_source_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_source_fps() -> u32 {
    30
}

fn default_motion_threshold() -> u32 {
    800
}
fn default_delta_threshold() -> u32 {
    25
}
fn default_blur_sigma() -> f32 {
    2.0
}

fn default_output_dir() -> String {
    "./recordings".to_string()
}
fn default_motion_filename() -> String {
    "ip-camera-motion.mp4".to_string()
}
fn default_manual_filename() -> String {
    "ip-camera-recording.mp4".to_string()
}
fn default_bitrate_kbps() -> u32 {
    10000
}
fn default_save_metadata() -> bool {
    true
}

fn default_font_path() -> String {
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string()
}
fn default_font_size() -> f32 {
    24.0
}

fn default_wait_delay_ms() -> u64 {
    33
}
fn default_motion_timeout_secs() -> u64 {
    10
}

fn default_framebuffer_device() -> String {
    "/dev/fb0".to_string()
}

fn default_event_bus_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CamwatchConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_recording_fps_derivation() {
        let config = CamwatchConfig::default();
        // 1000 / 33 truncates to 30
        assert_eq!(config.recording_fps(), 30);

        let mut config = config;
        config.monitor.wait_delay_ms = 50;
        assert_eq!(config.recording_fps(), 20);
    }

    #[test]
    fn test_config_validation_rejects_zero_wait_delay() {
        let mut config = CamwatchConfig::default();
        config.monitor.wait_delay_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_colliding_targets() {
        let mut config = CamwatchConfig::default();
        config.recorder.manual_filename = config.recorder.motion_filename.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_zero_resolution() {
        let mut config = CamwatchConfig::default();
        config.source.resolution = (0, 480);
        assert!(config.validate().is_err());

        config.source.resolution = (640, 480);
        assert!(config.validate().is_ok());
    }
}
