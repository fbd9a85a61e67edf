use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Local};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

use crate::utils::{PlayerError, PlayerResult};

/// A decoded frame as captured from the element, tightly packed RGBA8.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// PNG-encoded frame ready to be offered as a download.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub file_name: String,
    pub png: Vec<u8>,
}

impl Snapshot {
    pub fn encode(frame: Frame, taken_at: DateTime<Local>) -> PlayerResult<Self> {
        let (width, height) = (frame.width, frame.height);
        let image = RgbaImage::from_raw(width, height, frame.rgba).ok_or_else(|| {
            PlayerError::Snapshot(format!("frame buffer does not match {width}x{height}"))
        })?;

        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;

        Ok(Self {
            file_name: format!("snapshot-{}.png", taken_at.format("%Y%m%d-%H%M%S")),
            png: png.into_inner(),
        })
    }

    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}
