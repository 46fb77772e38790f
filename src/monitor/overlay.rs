use crate::config::OverlayConfig;
use crate::error::{OverlayError, Result};
use chrono::{Local, Utc};
use chrono_tz::Tz;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_text_mut};
use rusttype::{Font, Scale};
use std::fs;
use tracing::{debug, warn};

const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Renders the timestamp and blinking status overlay onto display frames.
pub struct OverlayRenderer {
    font: Font<'static>,
    font_size: f32,
    timezone: Option<Tz>,
}

impl OverlayRenderer {
    pub fn new(config: &OverlayConfig) -> Result<Self> {
        let font_data = fs::read(&config.font_path).map_err(|e| OverlayError::FontLoad {
            path: config.font_path.clone(),
            details: e.to_string(),
        })?;

        let font = Font::try_from_vec(font_data).ok_or_else(|| OverlayError::FontLoad {
            path: config.font_path.clone(),
            details: "not a parsable TrueType font".to_string(),
        })?;

        debug!(
            "Overlay renderer ready (font: {}, size: {})",
            config.font_path, config.font_size
        );

        Ok(Self {
            font,
            font_size: config.font_size,
            timezone: resolve_timezone(config.timezone.as_deref()),
        })
    }

    /// Draw the wall-clock timestamp at the bottom-left corner.
    pub fn draw_timestamp(&self, canvas: &mut RgbImage) {
        let text = format_timestamp(self.timezone);
        let scale = Scale::uniform(self.font_size);
        let y = canvas.height().saturating_sub(10 + self.font_size as u32);

        draw_text_mut(canvas, OVERLAY_COLOR, 5, y as i32, scale, &self.font, &text);
    }

    /// Draw the blinking recording indicator: a filled marker circle plus
    /// the status label.
    pub fn draw_status(&self, canvas: &mut RgbImage, label: &str) {
        draw_filled_circle_mut(canvas, (28, 28), 20, OVERLAY_COLOR);

        let scale = Scale::uniform(self.font_size * 1.25);
        let y = 28 - (scale.y / 2.0) as i32;
        draw_text_mut(canvas, OVERLAY_COLOR, 65, y.max(0), scale, &self.font, label);
    }
}

/// Parse the configured timezone, falling back to local time on errors
fn resolve_timezone(tz_name: Option<&str>) -> Option<Tz> {
    let tz_name = tz_name?;
    match tz_name.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(_) => {
            warn!("Invalid overlay timezone '{}', using local time", tz_name);
            None
        }
    }
}

/// Zero-padded `YYYY-MM-DD HH:MM:SS` wall-clock timestamp
pub(crate) fn format_timestamp(timezone: Option<Tz>) -> String {
    match timezone {
        Some(tz) => Utc::now()
            .with_timezone(&tz)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}
