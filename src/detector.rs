use crate::config::DetectorConfig;
use crate::error::{DetectorError, Result};
use crate::frame::Frame;

use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::{
    contrast::threshold,
    distance_transform::Norm,
    filter::gaussian_blur_f32,
    morphology::{dilate, erode},
    region_labelling::{connected_components, Connectivity},
};
use std::collections::HashMap;
use tracing::{debug, info};

/// A bounding region where motion was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Number of changed pixels inside the region
    pub area: u32,
}

/// Frame-differencing motion detector.
///
/// Compares each frame against a running-average background model and
/// reports the bounding boxes of connected changed areas larger than the
/// configured minimum region area.
pub struct MotionDetector {
    config: DetectorConfig,
    min_region_area: u32,
    background: GrayImage,
}

impl MotionDetector {
    /// Create a detector seeded with the first available frame.
    pub fn new(first_frame: &Frame, config: DetectorConfig) -> Result<Self> {
        let gray = frame_to_gray(first_frame)?;
        let background = gaussian_blur_f32(&gray, config.blur_sigma);

        info!(
            "Motion detector initialized ({}x{}, min region area {})",
            first_frame.width, first_frame.height, config.motion_threshold
        );

        Ok(Self {
            min_region_area: config.motion_threshold,
            config,
            background,
        })
    }

    /// Adjust the minimum region area at runtime
    pub fn set_motion_threshold(&mut self, area: u32) {
        debug!("Motion threshold set to {}", area);
        self.min_region_area = area;
    }

    /// Detect motion regions in a frame. An empty result means no motion
    /// was found this call.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<MotionRegion>> {
        let gray = frame_to_gray(frame)?;
        let blurred = gaussian_blur_f32(&gray, self.config.blur_sigma);

        // Source switched resolution; restart the background model
        if blurred.dimensions() != self.background.dimensions() {
            debug!(
                "Frame dimensions changed {:?} -> {:?}; reseeding background model",
                self.background.dimensions(),
                blurred.dimensions()
            );
            self.background = blurred;
            return Ok(Vec::new());
        }

        let diff = frame_difference(&self.background, &blurred);
        let binary_mask = threshold(&diff, self.config.delta_threshold as u8);

        // Morphological cleanup to drop isolated noise pixels
        let kernel_size = 3u8;
        let cleaned_mask = dilate(
            &erode(&binary_mask, Norm::LInf, kernel_size),
            Norm::LInf,
            kernel_size,
        );

        let components = connected_components(&cleaned_mask, Connectivity::Eight, Luma([0u8]));
        let regions = component_regions(&components, self.min_region_area);

        self.update_background(&blurred);

        if !regions.is_empty() {
            debug!("Found {} motion region(s) in frame {}", regions.len(), frame.id);
        }

        Ok(regions)
    }
}

impl MotionDetector {
    /// Fold the current frame into the background with a running average
    fn update_background(&mut self, current: &GrayImage) {
        let learning_rate = 0.05;

        for (bg_pixel, curr_pixel) in self.background.pixels_mut().zip(current.pixels()) {
            let bg_val = bg_pixel[0] as f32;
            let curr_val = curr_pixel[0] as f32;
            bg_pixel[0] = (bg_val * (1.0 - learning_rate) + curr_val * learning_rate) as u8;
        }
    }
}

/// Convert RGB24 frame data to grayscale
fn frame_to_gray(frame: &Frame) -> Result<GrayImage> {
    let rgb = RgbImage::from_raw(frame.width, frame.height, frame.data.as_ref().clone())
        .ok_or_else(|| DetectorError::FrameProcessing {
            details: format!(
                "Frame {} data does not match {}x{} RGB24",
                frame.id, frame.width, frame.height
            ),
        })?;

    let mut gray = GrayImage::new(frame.width, frame.height);
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let value =
            (0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32) as u8;
        gray.put_pixel(x, y, Luma([value]));
    }

    Ok(gray)
}

/// Absolute per-pixel difference between background and current frame
fn frame_difference(background: &GrayImage, current: &GrayImage) -> GrayImage {
    let (width, height) = background.dimensions();
    let mut diff = GrayImage::new(width, height);

    for (x, y, bg_pixel) in background.enumerate_pixels() {
        let curr_pixel = current.get_pixel(x, y);
        let delta = (bg_pixel[0] as i16 - curr_pixel[0] as i16).unsigned_abs() as u8;
        diff.put_pixel(x, y, Luma([delta]));
    }

    diff
}

/// Bounding boxes of labelled components with at least `min_area` pixels
fn component_regions(
    components: &ImageBuffer<Luma<u32>, Vec<u32>>,
    min_area: u32,
) -> Vec<MotionRegion> {
    struct Bounds {
        min_x: u32,
        min_y: u32,
        max_x: u32,
        max_y: u32,
        area: u32,
    }

    let mut bounds: HashMap<u32, Bounds> = HashMap::new();

    for (x, y, pixel) in components.enumerate_pixels() {
        let label = pixel[0];
        if label == 0 {
            continue;
        }

        bounds
            .entry(label)
            .and_modify(|b| {
                b.min_x = b.min_x.min(x);
                b.min_y = b.min_y.min(y);
                b.max_x = b.max_x.max(x);
                b.max_y = b.max_y.max(y);
                b.area += 1;
            })
            .or_insert(Bounds {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
                area: 1,
            });
    }

    let mut regions: Vec<MotionRegion> = bounds
        .into_values()
        .filter(|b| b.area >= min_area)
        .map(|b| MotionRegion {
            x: b.min_x,
            y: b.min_y,
            width: b.max_x - b.min_x + 1,
            height: b.max_y - b.min_y + 1,
            area: b.area,
        })
        .collect();

    regions.sort_by(|a, b| b.area.cmp(&a.area));
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn uniform_frame(id: u64, width: u32, height: u32, value: u8) -> Frame {
        Frame::new(
            id,
            SystemTime::now(),
            vec![value; (width * height * 3) as usize],
            width,
            height,
        )
    }

    fn frame_with_square(id: u64, width: u32, height: u32, x0: u32, y0: u32, size: u32) -> Frame {
        let mut data = vec![64u8; (width * height * 3) as usize];
        for y in y0..(y0 + size).min(height) {
            for x in x0..(x0 + size).min(width) {
                let idx = ((y * width + x) * 3) as usize;
                data[idx] = 255;
                data[idx + 1] = 255;
                data[idx + 2] = 255;
            }
        }
        Frame::new(id, SystemTime::now(), data, width, height)
    }

    fn test_config(min_area: u32) -> DetectorConfig {
        DetectorConfig {
            motion_threshold: min_area,
            delta_threshold: 25,
            blur_sigma: 2.0,
        }
    }

    #[test]
    fn test_static_scene_reports_no_motion() {
        let seed = uniform_frame(0, 64, 48, 64);
        let mut detector = MotionDetector::new(&seed, test_config(20)).unwrap();

        let same = uniform_frame(1, 64, 48, 64);
        let regions = detector.detect(&same).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_moving_square_is_detected() {
        let seed = uniform_frame(0, 64, 48, 64);
        let mut detector = MotionDetector::new(&seed, test_config(20)).unwrap();

        let moved = frame_with_square(1, 64, 48, 20, 10, 16);
        let regions = detector.detect(&moved).unwrap();
        assert_eq!(regions.len(), 1);

        let region = &regions[0];
        assert!(region.area >= 20);
        // Bounding box overlaps the drawn square, allowing for blur spread
        assert!(region.x <= 24 && region.x + region.width >= 32);
        assert!(region.y <= 14 && region.y + region.height >= 22);
    }

    #[test]
    fn test_threshold_filters_small_regions() {
        let seed = uniform_frame(0, 64, 48, 64);
        let mut detector = MotionDetector::new(&seed, test_config(20)).unwrap();
        detector.set_motion_threshold(10_000);

        let moved = frame_with_square(1, 64, 48, 20, 10, 16);
        let regions = detector.detect(&moved).unwrap();
        assert!(regions.is_empty());
    }

    #[test]
    fn test_resolution_change_reseeds_background() {
        let seed = uniform_frame(0, 64, 48, 64);
        let mut detector = MotionDetector::new(&seed, test_config(20)).unwrap();

        // A differently sized bright frame must not report motion
        let resized = uniform_frame(1, 32, 24, 255);
        let regions = detector.detect(&resized).unwrap();
        assert!(regions.is_empty());

        // And the next identical frame is quiet against the new background
        let same = uniform_frame(2, 32, 24, 255);
        let regions = detector.detect(&same).unwrap();
        assert!(regions.is_empty());
    }
}
