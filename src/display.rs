use crate::config::DisplayConfig;
use crate::error::Result;
use image::RgbImage;
use tracing::{debug, warn};
#[cfg(all(target_os = "linux", feature = "display"))]
use tracing::info;

#[cfg(all(target_os = "linux", feature = "display"))]
use crate::error::DisplayError;
#[cfg(all(target_os = "linux", feature = "display"))]
use gstreamer::prelude::*;
#[cfg(all(target_os = "linux", feature = "display"))]
use gstreamer::Pipeline;
#[cfg(all(target_os = "linux", feature = "display"))]
use gstreamer_app::AppSrc;

/// Presents annotated frames on the framebuffer.
///
/// The output pipeline is built lazily for the first frame's dimensions
/// and rebuilt if the source changes resolution. Presentation failures
/// are recoverable; the monitor loop carries on without display output.
pub struct DisplayController {
    config: DisplayConfig,
    #[cfg(all(target_os = "linux", feature = "display"))]
    pipeline: Option<Pipeline>,
    #[cfg(all(target_os = "linux", feature = "display"))]
    appsrc: Option<AppSrc>,
    #[cfg(all(target_os = "linux", feature = "display"))]
    dims: Option<(u32, u32)>,
    #[cfg(not(all(target_os = "linux", feature = "display")))]
    unavailable_logged: bool,
}

impl DisplayController {
    pub fn new(config: DisplayConfig) -> Result<Self> {
        #[cfg(all(target_os = "linux", feature = "display"))]
        {
            gstreamer::init().map_err(|e| DisplayError::Pipeline {
                details: format!("Failed to initialize GStreamer: {}", e),
            })?;
        }

        Ok(Self {
            config,
            #[cfg(all(target_os = "linux", feature = "display"))]
            pipeline: None,
            #[cfg(all(target_os = "linux", feature = "display"))]
            appsrc: None,
            #[cfg(all(target_os = "linux", feature = "display"))]
            dims: None,
            #[cfg(not(all(target_os = "linux", feature = "display")))]
            unavailable_logged: false,
        })
    }

    /// Present one RGB24 canvas. Errors are logged, not propagated.
    pub fn present(&mut self, canvas: &RgbImage) {
        #[cfg(all(target_os = "linux", feature = "display"))]
        {
            if let Err(e) = self.present_inner(canvas) {
                warn!("Failed to present frame: {}", e);
            }
            return;
        }

        #[cfg(not(all(target_os = "linux", feature = "display")))]
        {
            let _ = canvas;
            if !self.unavailable_logged {
                warn!(
                    "Display output is not available on this platform ({} unused)",
                    self.config.framebuffer_device
                );
                self.unavailable_logged = true;
            }
        }
    }

    #[cfg(all(target_os = "linux", feature = "display"))]
    fn present_inner(&mut self, canvas: &RgbImage) -> Result<()> {
        let dims = canvas.dimensions();
        if self.dims != Some(dims) {
            self.teardown();
            self.build_pipeline(dims.0, dims.1)?;
            self.dims = Some(dims);
        }

        let appsrc = self.appsrc.as_ref().ok_or_else(|| DisplayError::Pipeline {
            details: "Display pipeline not initialized".to_string(),
        })?;

        let mut buffer =
            gstreamer::Buffer::with_size(canvas.as_raw().len()).map_err(|e| {
                DisplayError::Pipeline {
                    details: format!("Failed to allocate buffer: {}", e),
                }
            })?;

        {
            let buffer_ref = buffer.get_mut().ok_or_else(|| DisplayError::Pipeline {
                details: "Buffer is not writable".to_string(),
            })?;
            let mut map = buffer_ref
                .map_writable()
                .map_err(|e| DisplayError::Pipeline {
                    details: format!("Failed to map buffer: {}", e),
                })?;
            map.copy_from_slice(canvas.as_raw());
        }

        appsrc
            .push_buffer(buffer)
            .map_err(|e| DisplayError::Pipeline {
                details: format!("Failed to push frame to display: {:?}", e),
            })?;

        Ok(())
    }

    #[cfg(all(target_os = "linux", feature = "display"))]
    fn build_pipeline(&mut self, width: u32, height: u32) -> Result<()> {
        let pipeline_desc = format!(
            "appsrc name=src format=time is-live=true do-timestamp=true \
             caps=video/x-raw,format=RGB,width={},height={},framerate=0/1 ! \
             queue max-size-buffers=1 leaky=downstream ! \
             videoconvert ! video/x-raw,format=RGB16 ! \
             fbdevsink device={} sync=false async=false",
            width, height, self.config.framebuffer_device
        );

        info!("Creating display pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| DisplayError::Pipeline {
                details: format!("Failed to create display pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| DisplayError::Pipeline {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| DisplayError::Pipeline {
                details: "Failed to get appsrc element".to_string(),
            })?
            .downcast::<AppSrc>()
            .map_err(|_| DisplayError::Pipeline {
                details: "Failed to downcast to AppSrc".to_string(),
            })?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| DisplayError::Pipeline {
                details: format!("Failed to start display pipeline: {}", e),
            })?;

        self.pipeline = Some(pipeline);
        self.appsrc = Some(appsrc);
        Ok(())
    }

    #[cfg(all(target_os = "linux", feature = "display"))]
    fn teardown(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            debug!("Stopping display pipeline");
            if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
                warn!("Failed to stop display pipeline cleanly: {}", e);
            }
        }
        self.appsrc = None;
        self.dims = None;
    }

    /// Release the output pipeline
    pub fn close(&mut self) {
        #[cfg(all(target_os = "linux", feature = "display"))]
        self.teardown();
        debug!("Display controller closed");
    }
}
