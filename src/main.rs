use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use camwatch::{
    CamwatchConfig, DisplayController, EventBus, FrameSource, InputPoller, LatestFrameCell,
    MonitorRuntime, Mp4Recorder, OverlayRenderer, RecordingMonitor, VideoSourceSpec,
};

#[derive(Parser, Debug)]
#[command(name = "camwatch")]
#[command(about = "CCTV camera monitor with motion-triggered recording")]
#[command(version)]
#[command(long_about = "Watches a single camera, video file or network stream, detects \
motion, and records annotated H.264/MP4 clips. Recording starts automatically on motion, \
pauses after a linger timeout, and can be toggled manually with the space bar.")]
struct Args {
    /// Camera index, path to a video file, or stream URI
    source: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "camwatch.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the monitor")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config();
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting Camwatch v{}", env!("CARGO_PKG_VERSION"));

    let config = match CamwatchConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let Some(source_arg) = args.source.as_deref() else {
        print_usage();
        std::process::exit(2);
    };

    let spec = match VideoSourceSpec::parse(source_arg) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Could not open video feed: {}", e);
            std::process::exit(1);
        }
    };

    let cell = Arc::new(LatestFrameCell::new());

    let mut source = match FrameSource::open(spec, config.source.clone(), Arc::clone(&cell)).await
    {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Could not open video feed: {}", e);
            std::process::exit(1);
        }
    };

    let events = Arc::new(EventBus::new(config.system.event_bus_capacity));
    let recorder = Mp4Recorder::new(config.recorder.clone());
    let overlay = OverlayRenderer::new(&config.overlay).map_err(|e| {
        error!("Failed to initialize overlay renderer: {}", e);
        e
    })?;
    let monitor = RecordingMonitor::new(&config, recorder, Some(overlay), Arc::clone(&events));
    let display = DisplayController::new(config.display.clone())?;
    let input = InputPoller::new();

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received; shutting down");
            signal_cancel.cancel();
        }
    });

    let runtime = MonitorRuntime::new(config, cell, monitor, display, input, cancel.clone());
    let loop_result = tokio::task::spawn_blocking(move || runtime.run()).await?;

    source.stop().await;

    loop_result?;
    info!("Camwatch exited cleanly");
    Ok(())
}

/// Usage message when the positional source argument is missing
fn print_usage() {
    eprintln!("Requires camera index or path to file or gstreamer URI");
    eprintln!("\tUSB example: camwatch 0");
    eprintln!("\tFile example: camwatch /home/foo/bar.mp4");
    eprintln!("\tStream example: camwatch \"rtsp://USR:PWD@IP:80/cam/realmonitor?channel=1&subtype=0\"");
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, fmt, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("camwatch={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() {
    println!("# Camwatch Configuration File");
    println!("# This is the default configuration with all available options");
    println!();

    let default_config = r#"[source]
# Capture resolution requested from USB cameras (width, height)
resolution = [640, 480]
# Capture frame rate requested from USB cameras
fps = 30

[detector]
# Minimum region area in pixels for motion to be reported
motion_threshold = 800
# Per-pixel delta threshold against the background model
delta_threshold = 25
# Gaussian blur sigma applied before differencing
blur_sigma = 2.0

[recorder]
# Directory recordings are written to
output_dir = "./recordings"
# File name for motion-triggered recordings
motion_filename = "ip-camera-motion.mp4"
# File name for manually started recordings
manual_filename = "ip-camera-recording.mp4"
# H.264 encoder bitrate in kbit/s
bitrate_kbps = 10000
# Write a JSON metadata sidecar next to each finished recording
save_metadata = true

[overlay]
# Path to TrueType font file for overlay text
font_path = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
# Font size for overlay text
font_size = 24.0
# Optional IANA timezone for the timestamp; local time when unset
# timezone = "Europe/Stockholm"

[monitor]
# Per-iteration input wait in milliseconds; also derives the recording
# frame rate (1000 / wait_delay_ms)
wait_delay_ms = 33
# Seconds without motion before an automatic recording is paused
motion_timeout_secs = 10

[display]
# Framebuffer device path
framebuffer_device = "/dev/fb0"

[system]
# Event bus capacity
event_bus_capacity = 100
"#;

    println!("{}", default_config);
}
