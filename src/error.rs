use thiserror::Error;

#[derive(Error, Debug)]
pub enum CamwatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("Video source error: {0}")]
    Source(#[from] SourceError),

    #[error("Motion detector error: {0}")]
    Detector(#[from] DetectorError),

    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),

    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),

    #[error("Display error: {0}")]
    Display(#[from] DisplayError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("System error: {message}")]
    System { message: String },
}

impl CamwatchError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

/// Errors from the frame source (camera, file or stream ingest)
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Could not open video feed: {details}")]
    Open { details: String },

    #[error("Invalid video source '{spec}': {details}")]
    InvalidSpec { spec: String, details: String },

    #[error("Capture pipeline error: {details}")]
    Pipeline { details: String },

    #[error("Video capture is not available on this platform")]
    NotAvailable,
}

/// Errors from motion analysis
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Frame processing failed: {details}")]
    FrameProcessing { details: String },
}

/// Errors from the video recorder
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("A recording session is already active")]
    AlreadyActive,

    #[error("No recording session is active")]
    NotActive,

    #[error("Encoder pipeline error: {details}")]
    Pipeline { details: String },

    #[error("Failed to write session metadata: {details}")]
    Metadata { details: String },

    #[error("Video encoding is not available on this platform")]
    NotAvailable,
}

/// Errors from overlay rendering
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Failed to load font '{path}': {details}")]
    FontLoad { path: String, details: String },
}

/// Errors from the display output
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Display pipeline error: {details}")]
    Pipeline { details: String },
}

/// Errors from operator input polling
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Keyboard poll failed: {details}")]
    Poll { details: String },
}

pub type Result<T> = std::result::Result<T, CamwatchError>;
