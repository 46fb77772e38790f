use crate::config::{CamwatchConfig, RecorderConfig};
use crate::detector::MotionRegion;
use crate::events::{EventBus, MonitorEvent};
use crate::frame::Frame;
use crate::input::InputEvent;
use crate::recorder::{RecordingTarget, SessionTrigger, VideoWriter};
use crate::stopwatch::Stopwatch;
use image::RgbImage;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::overlay::OverlayRenderer;
use super::state::{MonitorStatus, RecordingState};

/// Whether the monitor loop should keep running after an input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// The recording monitor: owns the recording/motion state machine,
/// renders overlays and arbitrates automatic vs manual recording.
///
/// All mutable loop state lives here and is driven through one call per
/// frame (`process_frame`) plus one per input event (`handle_input`).
/// Recorder failures are treated as recoverable: the state machine only
/// advances when the recorder call succeeded, except for a stop, which
/// always lands in `Idle`.
pub struct RecordingMonitor<W: VideoWriter> {
    wait_delay: u64,
    motion_timeout_secs: f64,
    recording_fps: u32,
    recorder_config: RecorderConfig,
    recorder: W,
    overlay: Option<OverlayRenderer>,
    events: Arc<EventBus>,
    state: RecordingState,
    motion_active: bool,
    motion_timer: Stopwatch,
    frame_flash: u64,
    session_id: Option<String>,
}

impl<W: VideoWriter> RecordingMonitor<W> {
    /// Create a monitor in the `Idle` state. Passing `None` for the
    /// overlay disables annotation (headless operation and tests).
    pub fn new(
        config: &CamwatchConfig,
        recorder: W,
        overlay: Option<OverlayRenderer>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            wait_delay: config.monitor.wait_delay_ms,
            motion_timeout_secs: config.monitor.motion_timeout_secs as f64,
            recording_fps: config.recording_fps(),
            recorder_config: config.recorder.clone(),
            recorder,
            overlay,
            events,
            state: RecordingState::Idle,
            motion_active: false,
            motion_timer: Stopwatch::new(),
            frame_flash: 0,
            session_id: None,
        }
    }

    /// Process one frame: apply the automatic motion rules, annotate the
    /// canvas, and feed the annotated frame to the recorder when a
    /// session is active.
    ///
    /// The recorder sees the timestamp annotation but not the blink
    /// overlay, which is drawn for the display only.
    pub fn process_frame(&mut self, frame: &Frame, canvas: &mut RgbImage, regions: &[MotionRegion]) {
        self.apply_motion_rules(frame, regions);

        if let Some(overlay) = &self.overlay {
            overlay.draw_timestamp(canvas);
        }

        if self.state.is_active() {
            let annotated = frame.with_data(canvas.as_raw().clone());
            if let Err(e) = self.recorder.add_frame(&annotated) {
                warn!("Failed to record frame {}: {}", frame.id, e);
            }

            if self.is_flash_visible() {
                let label = status_label(self.recorder.is_paused(), self.motion_active);
                if let Some(overlay) = &self.overlay {
                    overlay.draw_status(canvas, &label);
                }
            }

            // count up to the pacing budget and wrap
            if self.frame_flash >= self.wait_delay {
                self.frame_flash = 0;
            } else {
                self.frame_flash += 1;
            }
        }
    }

    /// Apply rules 1 and 2: motion start/resume before timeout pause, so
    /// a frame with fresh motion and a stale timer never spuriously
    /// pauses.
    fn apply_motion_rules(&mut self, frame: &Frame, regions: &[MotionRegion]) {
        if !regions.is_empty() {
            if !self.motion_active {
                self.events.publish(MonitorEvent::MotionDetected {
                    regions: regions.len(),
                    timestamp: frame.timestamp,
                });
            }
            self.motion_active = true;
            self.motion_timer.reset();
            self.motion_timer.start();

            match self.state {
                RecordingState::Idle => {
                    self.start_session(SessionTrigger::Motion, frame.width, frame.height);
                }
                RecordingState::Paused => {
                    self.recorder.resume();
                    self.state = RecordingState::Recording;
                    if let Some(session_id) = &self.session_id {
                        self.events.publish(MonitorEvent::SessionResumed {
                            session_id: session_id.clone(),
                        });
                    }
                }
                RecordingState::Recording => {}
            }
        } else if self.motion_active && self.motion_timer.elapsed_secs() > self.motion_timeout_secs
        {
            if self.state == RecordingState::Recording {
                self.recorder.pause();
                self.state = RecordingState::Paused;
                if let Some(session_id) = &self.session_id {
                    self.events.publish(MonitorEvent::SessionPaused {
                        session_id: session_id.clone(),
                    });
                }
            }

            self.motion_active = false;
            self.motion_timer.stop();
            self.motion_timer.reset();
            self.events.publish(MonitorEvent::MotionCleared {
                timestamp: frame.timestamp,
            });
        }
    }

    /// Apply rules 3 and 4. Evaluated after the automatic rules within an
    /// iteration, so a manual stop kills a session the same frame's
    /// motion just started.
    pub fn handle_input(&mut self, event: InputEvent, frame: Option<&Frame>) -> LoopControl {
        match event {
            InputEvent::ToggleRecord => {
                if self.state.is_active() {
                    self.stop_session();
                } else if let Some(frame) = frame {
                    self.start_session(SessionTrigger::Manual, frame.width, frame.height);
                } else {
                    debug!("Manual toggle ignored; no frame available yet");
                }
                LoopControl::Continue
            }
            InputEvent::Exit => {
                self.events.publish(MonitorEvent::ShutdownRequested {
                    reason: "operator exit".to_string(),
                });
                LoopControl::Exit
            }
        }
    }

    /// Stop any active session on the way out of the loop.
    pub fn shutdown(&mut self) {
        if self.state.is_active() {
            info!("Stopping active recording session before exit");
            self.stop_session();
        }
    }

    fn start_session(&mut self, trigger: SessionTrigger, width: u32, height: u32) {
        let target = RecordingTarget::for_trigger(
            &self.recorder_config,
            trigger,
            self.recording_fps,
            width,
            height,
        );

        match self.recorder.start(&target) {
            Ok(()) => {
                let session_id = Uuid::new_v4().to_string();
                self.state = RecordingState::Recording;
                self.events.publish(MonitorEvent::SessionStarted {
                    session_id: session_id.clone(),
                    trigger,
                    path: target.path,
                });
                self.session_id = Some(session_id);
            }
            Err(e) => {
                warn!("Failed to start {} recording: {}", trigger.label(), e);
            }
        }
    }

    fn stop_session(&mut self) {
        if let Err(e) = self.recorder.stop() {
            warn!("Recorder stop failed: {}", e);
        }

        // a stop always lands in Idle, even over a recorder complaint
        self.state = RecordingState::Idle;
        if let Some(session_id) = self.session_id.take() {
            self.events.publish(MonitorEvent::SessionStopped { session_id });
        }
    }

    /// True for the frames where the blink overlay is shown: the second
    /// half of each `wait_delay`-frame cycle of an active session.
    pub fn is_flash_visible(&self) -> bool {
        self.state.is_active() && self.frame_flash > self.wait_delay / 2
    }

    /// Snapshot of the observable monitor state
    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            state: self.state,
            motion_active: self.motion_active,
            frame_flash: self.frame_flash,
            session_id: self.session_id.clone(),
        }
    }

    /// Shift the motion timer backwards so timeout transitions can be
    /// tested without sleeping.
    #[cfg(test)]
    pub(crate) fn advance_motion_timer(&mut self, by: std::time::Duration) {
        self.motion_timer.advance(by);
    }

    #[cfg(test)]
    pub(crate) fn recorder(&self) -> &W {
        &self.recorder
    }
}

/// Status label for the blink overlay
pub(crate) fn status_label(is_paused: bool, motion_active: bool) -> String {
    let mut label = if is_paused { "PAUSED" } else { "RECORDING" }.to_string();
    if motion_active {
        label.push_str(" [MOTION]");
    }
    label
}

#[cfg(test)]
mod tests {
    use super::status_label;

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label(false, false), "RECORDING");
        assert_eq!(status_label(true, false), "PAUSED");
        assert_eq!(status_label(false, true), "RECORDING [MOTION]");
        assert_eq!(status_label(true, true), "PAUSED [MOTION]");
    }
}
