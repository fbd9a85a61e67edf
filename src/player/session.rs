use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use super::attach::Attachment;
use super::comments::CommentOverlay;
use super::controls::Presentation;
use super::progress::ProgressLatch;
use super::quality::QualityLadder;
use super::skip::{SkipTracker, SkipTransition};
use crate::config::Config;
use crate::models::{
    Episode, EpisodeKey, ProgressEvent, QualityLevel, QualitySelection, SkipInterval, Source,
};

/// What one position update changed
#[derive(Debug, Clone, PartialEq)]
pub struct TimeUpdate {
    pub skip: SkipTransition,
    pub progress: Option<ProgressEvent>,
}

/// Mutable state of one episode view. Never persisted; dropped whole when
/// the episode changes.
#[derive(Debug)]
pub struct PlaybackSession {
    id: Uuid,
    episode: EpisodeKey,
    sources: Vec<Source>,
    attachment: Attachment,
    media_url: Option<String>,
    position: Duration,
    duration: Duration,
    is_playing: bool,
    is_muted: bool,
    volume: f64,
    playback_rate: f64,
    ladder: QualityLadder,
    current_level: Option<usize>,
    skip: SkipTracker,
    progress: ProgressLatch,
    presentation: Presentation,
    comments: CommentOverlay,
}

impl PlaybackSession {
    pub fn new(episode: Episode, config: &Config) -> Self {
        Self {
            id: Uuid::new_v4(),
            episode: episode.key,
            sources: episode.sources,
            attachment: Attachment::Empty,
            media_url: None,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            is_playing: false,
            is_muted: false,
            volume: config.playback.initial_volume(),
            playback_rate: 1.0,
            ladder: QualityLadder::default(),
            current_level: None,
            skip: SkipTracker::new(episode.skip_intervals, config.skip.minimum_interval()),
            progress: ProgressLatch::new(config.playback.progress_threshold()),
            presentation: Presentation::default(),
            comments: CommentOverlay::new(&config.overlay),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn episode(&self) -> &EpisodeKey {
        &self.episode
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    pub fn set_attachment(&mut self, attachment: Attachment) {
        self.attachment = attachment;
        self.media_url = None;
    }

    /// Record the stream the adaptive client wants the element to load
    pub fn set_media_url(&mut self, url: String) {
        self.media_url = Some(url);
    }

    /// URL the element should currently have loaded
    pub fn element_source(&self) -> Option<&str> {
        match &self.attachment {
            Attachment::Adaptive { .. } => self.media_url.as_deref(),
            attachment => attachment.element_url(),
        }
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    /// Feed a position report from the element. Skip scan first, then the
    /// progress latch, in delivery order.
    pub fn on_time_update(&mut self, position: Duration, duration: Option<Duration>) -> TimeUpdate {
        if let Some(duration) = duration {
            self.duration = duration;
        }
        self.position = position;

        TimeUpdate {
            skip: self.skip.update(position),
            progress: self.progress.observe(position, self.duration),
        }
    }

    /// Jump past the active interval. `None` and no position change when
    /// nothing is active.
    pub fn perform_skip(&mut self) -> Option<Duration> {
        let target = self.skip.perform_skip()?;
        self.position = target;
        Some(target)
    }

    pub fn active_skip(&self) -> Option<&SkipInterval> {
        self.skip.active()
    }

    /// Target of a relative seek, kept inside the known bounds. `None` when
    /// the offset is not a finite number of seconds.
    pub fn seek_target(&self, offset_secs: f64) -> Option<Duration> {
        if !offset_secs.is_finite() {
            return None;
        }
        let mut target = (self.position.as_secs_f64() + offset_secs).max(0.0);
        if !self.duration.is_zero() {
            target = target.min(self.duration.as_secs_f64());
        }
        Duration::try_from_secs_f64(target).ok()
    }

    /// Positions past the end are pulled back once the duration is known
    pub fn clamp_position(&self, position: Duration) -> Duration {
        if self.duration.is_zero() {
            position
        } else {
            position.min(self.duration)
        }
    }

    pub fn has_reported_progress(&self) -> bool {
        self.progress.has_reported()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.is_muted = muted;
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Clamp into `[0, 1]`; dragging to zero mutes, anything above unmutes
    pub fn set_volume(&mut self, volume: f64) -> f64 {
        if !volume.is_finite() {
            return self.volume;
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.is_muted = self.volume == 0.0;
        self.volume
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn set_playback_rate(&mut self, rate: f64) {
        self.playback_rate = rate;
    }

    pub fn ladder_mut(&mut self) -> &mut QualityLadder {
        &mut self.ladder
    }

    pub fn set_ladder(&mut self, ladder: QualityLadder) {
        self.ladder = ladder;
    }

    pub fn current_level(&self) -> Option<usize> {
        self.current_level
    }

    pub fn set_current_level(&mut self, level: Option<usize>) {
        self.current_level = level;
    }

    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut Presentation {
        &mut self.presentation
    }

    pub fn comments_mut(&mut self) -> &mut CommentOverlay {
        &mut self.comments
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id,
            episode: self.episode.clone(),
            attachment: self.attachment.clone(),
            source_count: self.sources.len(),
            selected_source: self.sources.first().map(|s| s.name.clone()),
            position: self.position,
            duration: self.duration,
            is_playing: self.is_playing,
            is_muted: self.is_muted,
            volume: self.volume,
            playback_rate: self.playback_rate,
            quality_levels: self.ladder.levels().to_vec(),
            quality: self.ladder.selection(),
            active_skip: self.skip.active().cloned(),
            has_reported_progress: self.progress.has_reported(),
            presentation: self.presentation.clone(),
        }
    }
}

/// Read-only snapshot handed to the host for rendering controls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub episode: EpisodeKey,
    pub attachment: Attachment,
    pub source_count: usize,
    pub selected_source: Option<String>,
    #[serde(with = "crate::models::duration_secs")]
    pub position: Duration,
    #[serde(with = "crate::models::duration_secs")]
    pub duration: Duration,
    pub is_playing: bool,
    pub is_muted: bool,
    pub volume: f64,
    pub playback_rate: f64,
    pub quality_levels: Vec<QualityLevel>,
    pub quality: QualitySelection,
    pub active_skip: Option<SkipInterval>,
    pub has_reported_progress: bool,
    pub presentation: Presentation,
}

impl SessionView {
    /// True when the episode had nothing to play
    pub fn is_empty(&self) -> bool {
        self.attachment == Attachment::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SkipKind, SourceKind};

    fn create_test_episode() -> Episode {
        Episode {
            key: EpisodeKey::new("154587", 3),
            sources: vec![Source::new(
                "Default",
                "https://cdn.example/x.m3u8",
                SourceKind::AdaptiveManifest,
            )],
            skip_intervals: vec![SkipInterval::new(
                Duration::ZERO,
                Duration::from_secs(5),
                SkipKind::Opening,
            )],
        }
    }

    #[test]
    fn test_example_scenario() {
        let mut session = PlaybackSession::new(create_test_episode(), &Config::default());
        let duration = Some(Duration::from_secs(100));

        let update = session.on_time_update(Duration::from_secs(2), duration);
        assert!(matches!(update.skip, SkipTransition::Entered(ref i) if i.kind == SkipKind::Opening));
        assert_eq!(session.active_skip().unwrap().kind, SkipKind::Opening);

        assert_eq!(session.perform_skip(), Some(Duration::from_secs(5)));
        assert_eq!(session.position(), Duration::from_secs(5));
        assert!(session.active_skip().is_none());

        let update = session.on_time_update(Duration::from_secs(81), duration);
        let event = update.progress.unwrap();
        assert!((event.percent - 81.0).abs() < 1e-9);

        let update = session.on_time_update(Duration::from_secs(95), duration);
        assert!(update.progress.is_none());
        assert!(session.has_reported_progress());
    }

    #[test]
    fn test_skip_without_active_keeps_position() {
        let mut session = PlaybackSession::new(create_test_episode(), &Config::default());
        session.on_time_update(Duration::from_secs(42), Some(Duration::from_secs(100)));
        assert_eq!(session.perform_skip(), None);
        assert_eq!(session.position(), Duration::from_secs(42));
    }

    #[test]
    fn test_seek_target_is_bounded() {
        let mut session = PlaybackSession::new(create_test_episode(), &Config::default());
        session.on_time_update(Duration::from_secs(3), Some(Duration::from_secs(100)));
        assert_eq!(session.seek_target(-5.0), Some(Duration::ZERO));
        assert_eq!(session.seek_target(5.0), Some(Duration::from_secs(8)));

        session.on_time_update(Duration::from_secs(98), None);
        assert_eq!(session.seek_target(5.0), Some(Duration::from_secs(100)));
        assert_eq!(session.seek_target(1e30), Some(Duration::from_secs(100)));
        assert_eq!(session.seek_target(-1e30), Some(Duration::ZERO));
        assert_eq!(session.seek_target(f64::INFINITY), None);
        assert_eq!(session.seek_target(f64::NAN), None);
    }

    #[test]
    fn test_seek_target_without_duration() {
        let session = PlaybackSession::new(create_test_episode(), &Config::default());
        assert_eq!(session.seek_target(30.0), Some(Duration::from_secs(30)));
        assert_eq!(session.seek_target(1e30), None);
    }

    #[test]
    fn test_adaptive_media_url_follows_attachment() {
        let mut session = PlaybackSession::new(create_test_episode(), &Config::default());
        session.set_attachment(Attachment::Adaptive {
            url: "https://cdn.example/x.m3u8".to_string(),
        });
        assert_eq!(session.element_source(), None);

        session.set_media_url("https://cdn.example/720p/index.m3u8".to_string());
        assert_eq!(session.element_source(), Some("https://cdn.example/720p/index.m3u8"));

        session.set_attachment(Attachment::NativeManifest {
            url: "https://cdn.example/x.m3u8".to_string(),
        });
        assert_eq!(session.element_source(), Some("https://cdn.example/x.m3u8"));
    }

    #[test]
    fn test_unusable_volume_config_falls_back() {
        let mut config = Config::default();
        config.playback.default_volume = f64::NAN;
        let mut session = PlaybackSession::new(create_test_episode(), &config);
        assert_eq!(session.volume(), 1.0);
        assert_eq!(session.set_volume(f64::NAN), 1.0);
        assert!(!session.is_muted());
    }

    #[test]
    fn test_volume_zero_mutes() {
        let mut session = PlaybackSession::new(create_test_episode(), &Config::default());
        assert_eq!(session.set_volume(1.7), 1.0);
        assert!(!session.is_muted());
        assert_eq!(session.set_volume(0.0), 0.0);
        assert!(session.is_muted());
    }

    #[test]
    fn test_view_reflects_state() {
        let session = PlaybackSession::new(create_test_episode(), &Config::default());
        let view = session.view();
        assert_eq!(view.source_count, 1);
        assert_eq!(view.selected_source.as_deref(), Some("Default"));
        assert_eq!(view.quality, QualitySelection::Auto);
        assert!(!view.has_reported_progress);
        assert!(view.presentation.filters.is_neutral());

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["attachment"]["state"], "empty");
    }
}
