use crate::config::CamwatchConfig;
use crate::detector::MotionDetector;
use crate::display::DisplayController;
use crate::error::{CamwatchError, Result};
use crate::frame::Frame;
use crate::input::InputPoller;
use crate::latest_frame::LatestFrameCell;
use crate::recorder::VideoWriter;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::controller::{LoopControl, RecordingMonitor};

/// Fixed backoff while waiting for the very first frame
const FIRST_FRAME_RETRY: Duration = Duration::from_millis(250);

/// The display/decision loop.
///
/// Runs on a single blocking thread; the bounded input poll is its only
/// suspension point and provides the soft real-time pacing. Per-frame
/// failures are recoverable; only the first-frame wait retries.
pub struct MonitorRuntime<W: VideoWriter> {
    config: CamwatchConfig,
    cell: Arc<LatestFrameCell>,
    monitor: RecordingMonitor<W>,
    display: DisplayController,
    input: InputPoller,
    cancel: CancellationToken,
}

impl<W: VideoWriter> MonitorRuntime<W> {
    pub fn new(
        config: CamwatchConfig,
        cell: Arc<LatestFrameCell>,
        monitor: RecordingMonitor<W>,
        display: DisplayController,
        input: InputPoller,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            cell,
            monitor,
            display,
            input,
            cancel,
        }
    }

    /// Run the loop until the operator exits or cancellation fires.
    /// Blocking; call from `tokio::task::spawn_blocking`.
    pub fn run(mut self) -> Result<()> {
        let first_frame = self.wait_for_first_frame()?;
        info!(
            "First frame received ({}x{})",
            first_frame.width, first_frame.height
        );

        let mut detector = MotionDetector::new(&first_frame, self.config.detector.clone())?;
        let wait_delay = Duration::from_millis(self.config.monitor.wait_delay_ms);
        let mut last_frame: Option<Frame> = None;

        loop {
            if self.cancel.is_cancelled() {
                info!("Cancellation requested; leaving monitor loop");
                break;
            }

            if let Some(frame) = self.cell.latest().filter(|frame| frame.is_valid()) {
                let regions = match detector.detect(&frame) {
                    Ok(regions) => regions,
                    Err(e) => {
                        warn!("Motion detection failed on frame {}: {}", frame.id, e);
                        Vec::new()
                    }
                };

                match frame.to_rgb_image() {
                    Some(mut canvas) => {
                        self.monitor.process_frame(&frame, &mut canvas, &regions);
                        self.display.present(&canvas);
                    }
                    None => warn!("Skipping undecodable frame {}", frame.id),
                }

                last_frame = Some(frame);
            }

            // bounded wait for one operator event; also paces the loop
            match self.input.poll(wait_delay) {
                Ok(Some(event)) => {
                    if self.monitor.handle_input(event, last_frame.as_ref()) == LoopControl::Exit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Input poll failed: {}", e),
            }
        }

        self.monitor.shutdown();
        self.display.close();
        Ok(())
    }

    /// Block until the source has produced a valid frame, retrying with a
    /// fixed backoff. The only retry policy in the system.
    fn wait_for_first_frame(&self) -> Result<Frame> {
        info!("Waiting for first frame from source");

        loop {
            if self.cancel.is_cancelled() {
                return Err(CamwatchError::system(
                    "cancelled while waiting for the first frame",
                ));
            }

            if let Some(frame) = self.cell.latest() {
                if frame.is_valid() {
                    return Ok(frame);
                }
            }

            debug!("No frame yet; retrying in {:?}", FIRST_FRAME_RETRY);
            std::thread::sleep(FIRST_FRAME_RETRY);
        }
    }
}
