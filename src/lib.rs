//! Playback session controller for episodic streaming.
//!
//! The crate owns one playback session at a time: it attaches the episode's
//! first source to a media element, tracks skippable intervals, reports
//! completion once, and drives the optional overlays. Hosts talk to it
//! through a [`PlayerHandle`] and listen for [`SessionEvent`]s.

pub mod config;
pub mod models;
pub mod player;
pub mod providers;
pub mod utils;

pub use config::Config;
pub use models::{Episode, EpisodeKey, SkipInterval, SkipKind, Source, SourceKind};
pub use player::{PlayerBackends, PlayerController, PlayerHandle, SessionEvent, SessionView};
pub use utils::{PlayerError, PlayerResult};
