pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod latest_frame;
pub mod stopwatch;
pub mod source;
pub mod detector;
pub mod recorder;
pub mod monitor;
pub mod display;
pub mod input;

pub use config::CamwatchConfig;
pub use detector::{MotionDetector, MotionRegion};
pub use display::DisplayController;
pub use error::{CamwatchError, Result};
pub use events::{EventBus, MonitorEvent};
pub use frame::Frame;
pub use input::{InputEvent, InputPoller};
pub use latest_frame::{CellStatsSnapshot, LatestFrameCell};
pub use monitor::{LoopControl, MonitorRuntime, MonitorStatus, OverlayRenderer, RecordingMonitor, RecordingState};
pub use recorder::{Mp4Recorder, RecordingTarget, SessionMetadata, SessionTrigger, VideoWriter};
pub use source::{FrameSource, VideoSourceSpec};
pub use stopwatch::Stopwatch;
