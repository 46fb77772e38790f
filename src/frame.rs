use image::RgbImage;
use std::sync::Arc;
use std::time::SystemTime;

/// A single decoded RGB24 video frame.
///
/// Pixel data is shared so a frame can be handed to the recorder, the
/// display and the detector without copying. An empty frame (zero
/// dimensions or no data) means "no frame yet" from the source.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Unique frame identifier assigned by the source
    pub id: u64,
    /// Timestamp when the frame was captured
    pub timestamp: SystemTime,
    /// Raw RGB24 pixel data
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl Frame {
    pub fn new(id: u64, timestamp: SystemTime, data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
        }
    }

    /// Expected byte length for the frame dimensions (3 bytes per pixel)
    pub fn expected_size(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// A frame is valid when it has non-zero dimensions and a correctly
    /// sized pixel buffer. Invalid frames are skipped by the monitor loop.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.expected_size()
    }

    /// Get frame age in milliseconds
    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Decode the pixel data into an owned image for annotation
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        if !self.is_valid() {
            return None;
        }
        RgbImage::from_raw(self.width, self.height, self.data.as_ref().clone())
    }

    /// A copy of this frame carrying different pixel data (same id,
    /// timestamp and dimensions). Used for annotated frames fed to the
    /// recorder.
    pub fn with_data(&self, data: Vec<u8>) -> Self {
        Self {
            id: self.id,
            timestamp: self.timestamp,
            data: Arc::new(data),
            width: self.width,
            height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_frame(width: u32, height: u32) -> Frame {
        Frame::new(
            1,
            SystemTime::now(),
            vec![0u8; (width * height * 3) as usize],
            width,
            height,
        )
    }

    #[test]
    fn test_frame_validity() {
        assert!(rgb_frame(640, 480).is_valid());

        // Zero dimensions
        let empty = Frame::new(0, SystemTime::now(), Vec::new(), 0, 0);
        assert!(!empty.is_valid());

        // Wrong buffer size
        let truncated = Frame::new(2, SystemTime::now(), vec![0u8; 100], 640, 480);
        assert!(!truncated.is_valid());
    }

    #[test]
    fn test_expected_size() {
        let frame = rgb_frame(640, 480);
        assert_eq!(frame.expected_size(), 640 * 480 * 3);
    }

    #[test]
    fn test_to_rgb_image_roundtrip() {
        let frame = rgb_frame(64, 48);
        let image = frame.to_rgb_image().unwrap();
        assert_eq!(image.dimensions(), (64, 48));

        let invalid = Frame::new(3, SystemTime::now(), vec![0u8; 7], 64, 48);
        assert!(invalid.to_rgb_image().is_none());
    }

    #[test]
    fn test_with_data_preserves_identity() {
        let frame = rgb_frame(64, 48);
        let annotated = frame.with_data(vec![255u8; frame.expected_size()]);
        assert_eq!(annotated.id, frame.id);
        assert_eq!(annotated.width, frame.width);
        assert_eq!(annotated.height, frame.height);
        assert!(annotated.is_valid());
        assert_ne!(annotated.data[0], frame.data[0]);
    }
}
