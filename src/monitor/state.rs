use std::fmt;

/// Recording axis of the monitor state machine.
///
/// Mutated only by the recording monitor; never persisted. Motion state
/// is an independent axis tracked separately, so recording can be active
/// with no motion and motion can be active while idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// No session active
    Idle,
    /// Session active and capturing frames
    Recording,
    /// Session active but paused
    Paused,
}

impl RecordingState {
    /// True while a session exists (recording or paused)
    pub fn is_active(&self) -> bool {
        !matches!(self, RecordingState::Idle)
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
            RecordingState::Paused => "paused",
        };
        write!(f, "{}", name)
    }
}

/// Snapshot of the monitor's observable state
#[derive(Debug, Clone)]
pub struct MonitorStatus {
    pub state: RecordingState,
    pub motion_active: bool,
    pub frame_flash: u64,
    pub session_id: Option<String>,
}
