use std::time::Duration;
use tracing::trace;

use super::snapshot::Frame;
use super::traits::MediaElement;
use crate::models::PlaybackStats;
use crate::utils::{PlayerError, PlayerResult};

/// Element with no output. Keeps the state a real one would, which is
/// enough to drive a session from scripts or to smoke-test a host.
#[derive(Debug, Clone)]
pub struct HeadlessElement {
    src: Option<String>,
    playing: bool,
    position: Duration,
    volume: f64,
    muted: bool,
    rate: f64,
    fullscreen: bool,
    picture_in_picture: bool,
    native_manifest: bool,
    frame_size: (u32, u32),
}

impl HeadlessElement {
    pub fn new(native_manifest: bool) -> Self {
        Self {
            src: None,
            playing: false,
            position: Duration::ZERO,
            volume: 1.0,
            muted: false,
            rate: 1.0,
            fullscreen: false,
            picture_in_picture: false,
            native_manifest,
            frame_size: (64, 36),
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.src.as_deref()
    }

    pub fn position(&self) -> Duration {
        self.position
    }
}

impl MediaElement for HeadlessElement {
    fn set_source(&mut self, url: &str) {
        trace!("headless: src = {}", url);
        self.src = Some(url.to_string());
        self.position = Duration::ZERO;
    }

    fn clear_source(&mut self) {
        self.src = None;
        self.playing = false;
    }

    fn supports_native_manifest(&self) -> bool {
        self.native_manifest
    }

    fn play(&mut self) -> PlayerResult<()> {
        if self.src.is_none() {
            return Err(PlayerError::Element("no source loaded".to_string()));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, position: Duration) {
        self.position = position;
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> PlayerResult<()> {
        self.fullscreen = fullscreen;
        Ok(())
    }

    fn set_picture_in_picture(&mut self, enabled: bool) -> PlayerResult<()> {
        // There is no window to float
        if enabled {
            return Err(PlayerError::Element(
                "picture-in-picture is not available headless".to_string(),
            ));
        }
        self.picture_in_picture = false;
        Ok(())
    }

    fn capture_frame(&self) -> Option<Frame> {
        self.src.as_ref()?;
        let (width, height) = self.frame_size;
        Some(Frame {
            width,
            height,
            rgba: vec![0; (width * height * 4) as usize],
        })
    }

    fn stats(&self) -> PlaybackStats {
        PlaybackStats {
            buffered_secs: if self.src.is_some() { 30.0 } else { 0.0 },
            ..PlaybackStats::default()
        }
    }
}
