use super::controller::{status_label, LoopControl, RecordingMonitor};
use super::state::RecordingState;
use crate::config::CamwatchConfig;
use crate::detector::MotionRegion;
use crate::error::{RecorderError, Result};
use crate::events::{EventBus, MonitorEvent};
use crate::frame::Frame;
use crate::input::InputEvent;
use crate::recorder::{RecordingTarget, SessionTrigger, VideoWriter};
use image::RgbImage;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, PartialEq, Eq)]
enum WriterCall {
    Start(RecordingTarget),
    AddFrame(u64),
    Pause,
    Resume,
    Stop,
}

/// Scripted recorder that records the call sequence and enforces the
/// contract the controller must honor.
#[derive(Default)]
struct MockWriter {
    calls: Vec<WriterCall>,
    active: bool,
    paused: bool,
    fail_start: bool,
}

impl VideoWriter for MockWriter {
    fn start(&mut self, target: &RecordingTarget) -> Result<()> {
        if self.fail_start {
            return Err(RecorderError::NotAvailable.into());
        }
        assert!(!self.active, "start issued while a session is active");
        self.active = true;
        self.paused = false;
        self.calls.push(WriterCall::Start(target.clone()));
        Ok(())
    }

    fn add_frame(&mut self, frame: &Frame) -> Result<()> {
        assert!(self.active, "add_frame issued while stopped");
        self.calls.push(WriterCall::AddFrame(frame.id));
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
        self.calls.push(WriterCall::Pause);
    }

    fn resume(&mut self) {
        self.paused = false;
        self.calls.push(WriterCall::Resume);
    }

    fn stop(&mut self) -> Result<()> {
        self.active = false;
        self.calls.push(WriterCall::Stop);
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

impl MockWriter {
    fn starts(&self) -> Vec<&RecordingTarget> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                WriterCall::Start(target) => Some(target),
                _ => None,
            })
            .collect()
    }

    fn count(&self, call: &WriterCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

fn test_monitor() -> (RecordingMonitor<MockWriter>, Arc<EventBus>) {
    let config = CamwatchConfig::default();
    let events = Arc::new(EventBus::new(64));
    let monitor = RecordingMonitor::new(&config, MockWriter::default(), None, Arc::clone(&events));
    (monitor, events)
}

fn frame(id: u64) -> Frame {
    Frame::new(id, SystemTime::now(), vec![0u8; 8 * 8 * 3], 8, 8)
}

fn canvas() -> RgbImage {
    RgbImage::new(8, 8)
}

fn motion() -> Vec<MotionRegion> {
    vec![MotionRegion {
        x: 1,
        y: 1,
        width: 4,
        height: 4,
        area: 16,
    }]
}

fn drain_event_types(rx: &mut tokio::sync::broadcast::Receiver<MonitorEvent>) -> Vec<&'static str> {
    let mut types = Vec::new();
    while let Ok(event) = rx.try_recv() {
        types.push(event.event_type());
    }
    types
}

#[test]
fn test_motion_starts_recording_from_idle() {
    let (mut monitor, _events) = test_monitor();

    monitor.process_frame(&frame(0), &mut canvas(), &motion());

    let status = monitor.status();
    assert_eq!(status.state, RecordingState::Recording);
    assert!(status.motion_active);
    assert!(status.session_id.is_some());

    let starts = monitor.recorder().starts();
    assert_eq!(starts.len(), 1);
    let target = starts[0];
    assert!(target.path.ends_with("ip-camera-motion.mp4"));
    assert_eq!(target.trigger, SessionTrigger::Motion);
    // 1000 / 33 ms pacing budget
    assert_eq!(target.fps, 30);
    assert_eq!((target.width, target.height), (8, 8));

    // The frame that started the session is recorded
    assert_eq!(monitor.recorder().count(&WriterCall::AddFrame(0)), 1);
}

#[test]
fn test_continued_motion_does_not_restart() {
    let (mut monitor, _events) = test_monitor();

    monitor.process_frame(&frame(0), &mut canvas(), &motion());
    monitor.process_frame(&frame(1), &mut canvas(), &motion());
    monitor.process_frame(&frame(2), &mut canvas(), &motion());

    assert_eq!(monitor.recorder().starts().len(), 1);
    assert_eq!(monitor.status().state, RecordingState::Recording);
}

#[test]
fn test_no_pause_within_motion_timeout() {
    let (mut monitor, _events) = test_monitor();

    monitor.process_frame(&frame(0), &mut canvas(), &motion());
    // Quiet frames immediately after motion must not pause
    monitor.process_frame(&frame(1), &mut canvas(), &[]);
    monitor.process_frame(&frame(2), &mut canvas(), &[]);

    let status = monitor.status();
    assert_eq!(status.state, RecordingState::Recording);
    assert!(status.motion_active);
    assert_eq!(monitor.recorder().count(&WriterCall::Pause), 0);
}

#[test]
fn test_pause_after_motion_timeout() {
    let (mut monitor, events) = test_monitor();
    let mut rx = events.subscribe();

    // Motion at t=0 and never again
    monitor.process_frame(&frame(0), &mut canvas(), &motion());
    monitor.process_frame(&frame(1), &mut canvas(), &[]);

    // Just past the 10 s linger window
    monitor.advance_motion_timer(Duration::from_millis(10_050));
    monitor.process_frame(&frame(2), &mut canvas(), &[]);

    let status = monitor.status();
    assert_eq!(status.state, RecordingState::Paused);
    // The motion flag clears at the same instant the pause happens
    assert!(!status.motion_active);
    assert_eq!(monitor.recorder().count(&WriterCall::Pause), 1);

    assert_eq!(
        drain_event_types(&mut rx),
        vec![
            "motion_detected",
            "session_started",
            "session_paused",
            "motion_cleared",
        ]
    );
}

#[test]
fn test_timeout_while_idle_only_clears_motion() {
    let config = CamwatchConfig::default();
    let events = Arc::new(EventBus::new(64));
    let writer = MockWriter {
        fail_start: true,
        ..Default::default()
    };
    let mut monitor = RecordingMonitor::new(&config, writer, None, events);

    // With the recorder refusing to start, motion leaves recording idle
    // but the motion flag set
    monitor.process_frame(&frame(0), &mut canvas(), &motion());
    assert_eq!(monitor.status().state, RecordingState::Idle);
    assert!(monitor.status().motion_active);

    monitor.advance_motion_timer(Duration::from_millis(10_050));
    monitor.process_frame(&frame(1), &mut canvas(), &[]);

    // Flag and timer reset without any recorder call
    assert!(!monitor.status().motion_active);
    assert_eq!(monitor.status().state, RecordingState::Idle);
    assert!(monitor.recorder().calls.is_empty());
}

#[test]
fn test_motion_resumes_paused_session() {
    let (mut monitor, _events) = test_monitor();

    monitor.process_frame(&frame(0), &mut canvas(), &motion());
    monitor.advance_motion_timer(Duration::from_millis(10_050));
    monitor.process_frame(&frame(1), &mut canvas(), &[]);
    assert_eq!(monitor.status().state, RecordingState::Paused);

    monitor.process_frame(&frame(2), &mut canvas(), &motion());

    let status = monitor.status();
    assert_eq!(status.state, RecordingState::Recording);
    assert!(status.motion_active);
    assert_eq!(monitor.recorder().count(&WriterCall::Resume), 1);
    // Resume, not a second start
    assert_eq!(monitor.recorder().starts().len(), 1);
}

#[test]
fn test_manual_start_uses_manual_target() {
    let (mut monitor, _events) = test_monitor();

    let first = frame(0);
    let control = monitor.handle_input(InputEvent::ToggleRecord, Some(&first));
    assert_eq!(control, LoopControl::Continue);

    let status = monitor.status();
    assert_eq!(status.state, RecordingState::Recording);
    assert!(!status.motion_active);

    let starts = monitor.recorder().starts();
    assert_eq!(starts.len(), 1);
    assert!(starts[0].path.ends_with("ip-camera-recording.mp4"));
    assert_eq!(starts[0].trigger, SessionTrigger::Manual);
}

#[test]
fn test_manual_and_motion_targets_never_collide() {
    let (mut monitor, _events) = test_monitor();

    // Motion session, stopped manually, then a manual session
    monitor.process_frame(&frame(0), &mut canvas(), &motion());
    monitor.handle_input(InputEvent::ToggleRecord, Some(&frame(0)));
    monitor.handle_input(InputEvent::ToggleRecord, Some(&frame(1)));

    let starts = monitor.recorder().starts();
    assert_eq!(starts.len(), 2);
    assert_ne!(starts[0].path, starts[1].path);
}

#[test]
fn test_manual_stop_always_idles() {
    let (mut monitor, _events) = test_monitor();

    // From an unpaused session
    monitor.process_frame(&frame(0), &mut canvas(), &motion());
    monitor.handle_input(InputEvent::ToggleRecord, Some(&frame(0)));
    assert_eq!(monitor.status().state, RecordingState::Idle);
    assert_eq!(monitor.recorder().count(&WriterCall::Stop), 1);

    // And from a paused session
    monitor.process_frame(&frame(1), &mut canvas(), &motion());
    monitor.advance_motion_timer(Duration::from_millis(10_050));
    monitor.process_frame(&frame(2), &mut canvas(), &[]);
    assert_eq!(monitor.status().state, RecordingState::Paused);

    monitor.handle_input(InputEvent::ToggleRecord, Some(&frame(2)));
    assert_eq!(monitor.status().state, RecordingState::Idle);
    assert_eq!(monitor.recorder().count(&WriterCall::Stop), 2);
}

#[test]
fn test_manual_stop_kills_session_started_same_frame() {
    let (mut monitor, _events) = test_monitor();

    // Motion starts a session; the operator toggle in the same iteration
    // still stops it
    monitor.process_frame(&frame(0), &mut canvas(), &motion());
    monitor.handle_input(InputEvent::ToggleRecord, Some(&frame(0)));

    assert_eq!(monitor.status().state, RecordingState::Idle);
    assert_eq!(monitor.recorder().starts().len(), 1);
    assert_eq!(monitor.recorder().count(&WriterCall::Stop), 1);
}

#[test]
fn test_idle_toggle_without_frame_is_noop() {
    let (mut monitor, _events) = test_monitor();

    let control = monitor.handle_input(InputEvent::ToggleRecord, None);

    assert_eq!(control, LoopControl::Continue);
    assert_eq!(monitor.status().state, RecordingState::Idle);
    assert!(monitor.recorder().calls.is_empty());
}

#[test]
fn test_manual_session_with_motion_keeps_single_start() {
    let (mut monitor, _events) = test_monitor();

    monitor.handle_input(InputEvent::ToggleRecord, Some(&frame(0)));
    monitor.process_frame(&frame(1), &mut canvas(), &motion());

    let status = monitor.status();
    assert_eq!(status.state, RecordingState::Recording);
    assert!(status.motion_active);
    assert_eq!(monitor.recorder().starts().len(), 1);

    // The overlay label picks up the motion suffix
    let label = status_label(monitor.recorder().is_paused(), status.motion_active);
    assert_eq!(label, "RECORDING [MOTION]");
}

#[test]
fn test_flash_counter_cycles_with_wait_delay() {
    let (mut monitor, _events) = test_monitor();
    let wait_delay = CamwatchConfig::default().monitor.wait_delay_ms;

    // Counter does not advance while idle
    monitor.process_frame(&frame(0), &mut canvas(), &[]);
    assert_eq!(monitor.status().frame_flash, 0);

    monitor.handle_input(InputEvent::ToggleRecord, Some(&frame(0)));

    let mut seen_visible = Vec::new();
    for id in 1..=(wait_delay + 1) {
        monitor.process_frame(&frame(id), &mut canvas(), &[]);
        seen_visible.push(monitor.is_flash_visible());
    }

    // Visible exactly while frame_flash > wait_delay / 2, and the counter
    // wraps after a full cycle
    let half = wait_delay / 2;
    for (i, visible) in seen_visible.iter().enumerate() {
        let flash_after = (i as u64 + 1) % (wait_delay + 1);
        assert_eq!(*visible, flash_after > half, "iteration {}", i);
    }
    assert_eq!(monitor.status().frame_flash, 0);

    // Cosmetic only: still recording the whole time
    assert_eq!(monitor.status().state, RecordingState::Recording);
    assert_eq!(monitor.recorder().count(&WriterCall::Pause), 0);
}

#[test]
fn test_exit_event_requests_shutdown() {
    let (mut monitor, events) = test_monitor();
    let mut rx = events.subscribe();

    let control = monitor.handle_input(InputEvent::Exit, None);
    assert_eq!(control, LoopControl::Exit);
    assert_eq!(drain_event_types(&mut rx), vec!["shutdown_requested"]);
}

#[test]
fn test_shutdown_stops_active_session() {
    let (mut monitor, _events) = test_monitor();

    monitor.process_frame(&frame(0), &mut canvas(), &motion());
    monitor.shutdown();

    assert_eq!(monitor.status().state, RecordingState::Idle);
    assert_eq!(monitor.recorder().count(&WriterCall::Stop), 1);

    // Idempotent when already idle
    monitor.shutdown();
    assert_eq!(monitor.recorder().count(&WriterCall::Stop), 1);
}

#[test]
fn test_session_events_for_manual_lifecycle() {
    let (mut monitor, events) = test_monitor();
    let mut rx = events.subscribe();

    monitor.handle_input(InputEvent::ToggleRecord, Some(&frame(0)));
    monitor.handle_input(InputEvent::ToggleRecord, Some(&frame(1)));

    assert_eq!(
        drain_event_types(&mut rx),
        vec!["session_started", "session_stopped"]
    );
}
