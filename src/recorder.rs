use crate::config::RecorderConfig;
use crate::error::{RecorderError, Result};
use crate::frame::Frame;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[cfg(all(target_os = "linux", feature = "video_encoding"))]
use gstreamer::prelude::*;
#[cfg(all(target_os = "linux", feature = "video_encoding"))]
use gstreamer::Pipeline;
#[cfg(all(target_os = "linux", feature = "video_encoding"))]
use gstreamer_app::AppSrc;
#[cfg(all(target_os = "linux", feature = "video_encoding"))]
use uuid::Uuid;

/// What started a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionTrigger {
    /// Started automatically by motion detection
    Motion,
    /// Started by the operator
    Manual,
}

impl SessionTrigger {
    pub fn label(&self) -> &'static str {
        match self {
            SessionTrigger::Motion => "motion",
            SessionTrigger::Manual => "manual",
        }
    }
}

/// Output binding for one recording session, fixed at session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingTarget {
    pub path: PathBuf,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub trigger: SessionTrigger,
}

impl RecordingTarget {
    /// Build the target for a trigger: fixed per-trigger file name under
    /// the output directory, frame rate from the pacing budget, dimensions
    /// from the current frame. Reruns overwrite the previous file; the two
    /// trigger paths are kept distinct by config validation.
    pub fn for_trigger(
        config: &RecorderConfig,
        trigger: SessionTrigger,
        fps: u32,
        width: u32,
        height: u32,
    ) -> Self {
        let filename = match trigger {
            SessionTrigger::Motion => &config.motion_filename,
            SessionTrigger::Manual => &config.manual_filename,
        };
        Self {
            path: PathBuf::from(&config.output_dir).join(filename),
            fps,
            width,
            height,
            trigger,
        }
    }
}

/// Metadata sidecar describing a finished session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub trigger: SessionTrigger,
    pub path: PathBuf,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub frames_written: u64,
}

/// The recorder contract the controller is written against.
///
/// `add_frame` with no active session is a contract violation and returns
/// an error; the controller never issues it. Frames pushed while paused
/// are dropped inside the writer.
pub trait VideoWriter {
    fn start(&mut self, target: &RecordingTarget) -> Result<()>;
    fn add_frame(&mut self, frame: &Frame) -> Result<()>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self) -> Result<()>;
    fn is_paused(&self) -> bool;
}

/// H.264/MP4 recorder over a GStreamer encoding pipeline (Linux).
pub struct Mp4Recorder {
    config: RecorderConfig,
    session: Option<ActiveSession>,
}

struct ActiveSession {
    id: String,
    target: RecordingTarget,
    started_at: DateTime<Utc>,
    frames_written: u64,
    paused: bool,
    #[cfg(all(target_os = "linux", feature = "video_encoding"))]
    pipeline: Pipeline,
    #[cfg(all(target_os = "linux", feature = "video_encoding"))]
    appsrc: AppSrc,
}

impl Mp4Recorder {
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    #[cfg(all(target_os = "linux", feature = "video_encoding"))]
    fn open_session(&self, target: &RecordingTarget) -> Result<ActiveSession> {
        gstreamer::init().map_err(|e| RecorderError::Pipeline {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        if let Some(parent) = target.path.parent() {
            fs::create_dir_all(parent).map_err(|e| RecorderError::Pipeline {
                details: format!("Failed to create output directory: {}", e),
            })?;
        }

        let pipeline_desc = format!(
            "appsrc name=src format=time is-live=true do-timestamp=true \
             caps=video/x-raw,format=RGB,width={},height={},framerate={}/1 ! \
             videoconvert ! video/x-raw,format=I420 ! \
             x264enc speed-preset=ultrafast tune=zerolatency bitrate={} key-int-max={} ! \
             video/x-h264,stream-format=byte-stream,alignment=au ! \
             h264parse config-interval=1 ! \
             mp4mux faststart=true ! \
             filesink location={}",
            target.width,
            target.height,
            target.fps,
            self.config.bitrate_kbps,
            target.fps * 2,
            target.path.to_string_lossy()
        );

        debug!("Creating encoder pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| RecorderError::Pipeline {
                details: format!("Failed to create encoder pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| RecorderError::Pipeline {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| RecorderError::Pipeline {
                details: "Failed to get appsrc element".to_string(),
            })?
            .downcast::<AppSrc>()
            .map_err(|_| RecorderError::Pipeline {
                details: "Failed to downcast to AppSrc".to_string(),
            })?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| RecorderError::Pipeline {
                details: format!("Failed to start encoder pipeline: {}", e),
            })?;

        Ok(ActiveSession {
            id: Uuid::new_v4().to_string(),
            target: target.clone(),
            started_at: Utc::now(),
            frames_written: 0,
            paused: false,
            pipeline,
            appsrc,
        })
    }

    /// Current session id, if a session is active
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.id.as_str())
    }
}

impl VideoWriter for Mp4Recorder {
    fn start(&mut self, target: &RecordingTarget) -> Result<()> {
        if self.session.is_some() {
            return Err(RecorderError::AlreadyActive.into());
        }

        #[cfg(all(target_os = "linux", feature = "video_encoding"))]
        {
            let session = self.open_session(target)?;
            info!(
                "Recording session {} started: {} ({}x{} @ {}fps, {})",
                session.id,
                target.path.display(),
                target.width,
                target.height,
                target.fps,
                target.trigger.label()
            );
            self.session = Some(session);
            Ok(())
        }

        #[cfg(not(all(target_os = "linux", feature = "video_encoding")))]
        {
            warn!(
                "Video encoding unavailable; cannot record to {}",
                target.path.display()
            );
            Err(RecorderError::NotAvailable.into())
        }
    }

    fn add_frame(&mut self, frame: &Frame) -> Result<()> {
        let session = self
            .session
            .as_mut()
            .ok_or(RecorderError::NotActive)?;

        if session.paused {
            debug!("Recorder paused; dropping frame {}", frame.id);
            return Ok(());
        }

        #[cfg(all(target_os = "linux", feature = "video_encoding"))]
        {
            let mut buffer =
                gstreamer::Buffer::with_size(frame.data.len()).map_err(|e| {
                    RecorderError::Pipeline {
                        details: format!("Failed to allocate buffer: {}", e),
                    }
                })?;

            {
                let buffer_ref = buffer.get_mut().ok_or_else(|| RecorderError::Pipeline {
                    details: "Buffer is not writable".to_string(),
                })?;
                let mut map =
                    buffer_ref
                        .map_writable()
                        .map_err(|e| RecorderError::Pipeline {
                            details: format!("Failed to map buffer: {}", e),
                        })?;
                map.copy_from_slice(frame.data.as_ref());
            }

            session
                .appsrc
                .push_buffer(buffer)
                .map_err(|e| RecorderError::Pipeline {
                    details: format!("Failed to push frame to encoder: {:?}", e),
                })?;
        }

        session.frames_written += 1;
        Ok(())
    }

    fn pause(&mut self) {
        match self.session.as_mut() {
            Some(session) if !session.paused => {
                session.paused = true;
                info!("Recording session {} paused", session.id);
            }
            Some(_) => debug!("Recorder already paused"),
            None => warn!("Pause requested with no active session"),
        }
    }

    fn resume(&mut self) {
        match self.session.as_mut() {
            Some(session) if session.paused => {
                session.paused = false;
                info!("Recording session {} resumed", session.id);
            }
            Some(_) => debug!("Recorder already running"),
            None => warn!("Resume requested with no active session"),
        }
    }

    fn stop(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            warn!("Stop requested with no active session");
            return Ok(());
        };

        #[cfg(all(target_os = "linux", feature = "video_encoding"))]
        {
            if let Err(e) = session.appsrc.end_of_stream() {
                warn!("Failed to signal end of stream: {:?}", e);
            }

            // Drain the muxer so the file is finalized before teardown
            if let Some(bus) = session.pipeline.bus() {
                let _ = bus.timed_pop_filtered(
                    gstreamer::ClockTime::from_seconds(10),
                    &[gstreamer::MessageType::Eos, gstreamer::MessageType::Error],
                );
            }

            if let Err(e) = session.pipeline.set_state(gstreamer::State::Null) {
                warn!("Failed to stop encoder pipeline cleanly: {}", e);
            }
        }

        info!(
            "Recording session {} stopped: {} ({} frames)",
            session.id,
            session.target.path.display(),
            session.frames_written
        );

        if self.config.save_metadata {
            let metadata = SessionMetadata {
                session_id: session.id,
                trigger: session.target.trigger,
                path: session.target.path.clone(),
                fps: session.target.fps,
                width: session.target.width,
                height: session.target.height,
                started_at: session.started_at,
                stopped_at: Utc::now(),
                frames_written: session.frames_written,
            };
            write_sidecar(&metadata)?;
        }

        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.session
            .as_ref()
            .map(|session| session.paused)
            .unwrap_or(false)
    }
}

/// Write the metadata sidecar next to the recording (`foo.mp4` -> `foo.json`)
pub(crate) fn write_sidecar(metadata: &SessionMetadata) -> Result<()> {
    let sidecar_path = metadata.path.with_extension("json");

    let json = serde_json::to_string_pretty(metadata).map_err(|e| RecorderError::Metadata {
        details: format!("Failed to serialize metadata: {}", e),
    })?;

    fs::write(&sidecar_path, json).map_err(|e| RecorderError::Metadata {
        details: format!(
            "Failed to write metadata file '{}': {}",
            sidecar_path.display(),
            e
        ),
    })?;

    debug!("Saved session metadata to {}", sidecar_path.display());
    Ok(())
}
