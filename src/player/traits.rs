use std::fmt::Debug;
use std::time::Duration;
use tokio::sync::mpsc;

use super::snapshot::Frame;
use crate::models::{PlaybackStats, QualitySelection, Rendition};
use crate::utils::PlayerResult;

/// The element that actually decodes and renders media.
///
/// Every call is a synchronous imperative action. Requests the runtime may
/// refuse (fullscreen, picture-in-picture, starting playback) return an error
/// that the controller logs and swallows.
pub trait MediaElement: Send + Debug {
    fn set_source(&mut self, url: &str);
    fn clear_source(&mut self);
    /// Whether the runtime can play an adaptive manifest without an engine
    fn supports_native_manifest(&self) -> bool;
    fn play(&mut self) -> PlayerResult<()>;
    fn pause(&mut self);
    fn seek(&mut self, position: Duration);
    fn set_volume(&mut self, volume: f64);
    fn set_muted(&mut self, muted: bool);
    fn set_playback_rate(&mut self, rate: f64);
    fn set_fullscreen(&mut self, fullscreen: bool) -> PlayerResult<()>;
    fn set_picture_in_picture(&mut self, enabled: bool) -> PlayerResult<()>;
    fn capture_frame(&self) -> Option<Frame>;

    fn stats(&self) -> PlaybackStats {
        PlaybackStats::default()
    }
}

/// Notifications an adaptive client pushes back to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ManifestParsed { renditions: Vec<Rendition> },
    /// The element should load this stream (master or pinned variant)
    MediaAttached { url: String },
    LevelSwitched { level: usize },
    Error { fatal: bool, message: String },
}

pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Factory for adaptive-bitrate clients.
pub trait AdaptiveEngine: Send + Sync + Debug {
    fn is_supported(&self) -> bool;

    fn create_client(
        &self,
        manifest_url: &str,
        events: EngineEventSender,
    ) -> PlayerResult<Box<dyn AdaptiveClient>>;
}

/// One live binding between a manifest and the engine.
pub trait AdaptiveClient: Send + Debug {
    fn set_level(&mut self, selection: QualitySelection);
    fn destroy(&mut self);
    fn is_destroyed(&self) -> bool;
}

/// Gain stage inserted between the element and the audio output.
pub trait AudioGraph: Send + Debug {
    fn set_gain(&mut self, gain: f64);
    fn release(&mut self);
}

pub trait AudioGraphFactory: Send + Sync + Debug {
    fn create_graph(&self) -> PlayerResult<Box<dyn AudioGraph>>;
}
