pub mod attach;
pub mod comments;
pub mod controller;
pub mod controls;
pub mod headless;
pub mod hls;
pub mod keyboard;
pub mod progress;
pub mod quality;
pub mod session;
pub mod skip;
pub mod snapshot;
pub mod timers;
pub mod traits;

pub use attach::Attachment;
pub use controller::{Diagnostics, PlayerBackends, PlayerController, PlayerHandle, SessionEvent};
pub use controls::{FilterAdjustment, ZoomMode};
pub use headless::HeadlessElement;
pub use hls::HlsEngine;
pub use keyboard::{Key, KeyEvent};
pub use progress::{LogProgressSink, ProgressSink};
pub use session::SessionView;
pub use snapshot::{Frame, Snapshot};
pub use traits::{
    AdaptiveClient, AdaptiveEngine, AudioGraph, AudioGraphFactory, EngineEvent, EngineEventSender,
    MediaElement,
};
