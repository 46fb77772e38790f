mod controller;
mod overlay;
mod runtime;
mod state;
#[cfg(test)]
mod tests;

pub use controller::{LoopControl, RecordingMonitor};
pub use overlay::OverlayRenderer;
pub use runtime::MonitorRuntime;
pub use state::{MonitorStatus, RecordingState};
