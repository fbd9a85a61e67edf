#![allow(dead_code)]

pub mod mocks;

use aniplay::models::{Episode, EpisodeKey, SkipInterval, SkipKind, Source, SourceKind};
use aniplay::{Config, PlayerBackends, PlayerController, PlayerHandle, SessionView};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mocks::{Journal, MockAudioFactory, MockEngine, RecordingElement, RecordingSink};

/// A spawned controller with every collaborator mocked out
pub struct TestPlayer {
    pub handle: PlayerHandle,
    pub journal: Journal,
    pub engine: MockEngine,
    pub element: RecordingElement,
    pub sink: RecordingSink,
}

impl TestPlayer {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, RecordingElement::new)
    }

    pub fn with_element(build: impl FnOnce(Journal) -> RecordingElement) -> Self {
        Self::build(Config::default(), build)
    }

    fn build(config: Config, element: impl FnOnce(Journal) -> RecordingElement) -> Self {
        let journal = Journal::default();
        let engine = MockEngine::new(journal.clone());
        let element = element(journal.clone());
        let sink = RecordingSink::default();

        let backends = PlayerBackends::new(Arc::new(engine.clone()), Arc::new(sink.clone()))
            .with_audio(Arc::new(MockAudioFactory::new(journal.clone())));
        let handle = PlayerController::spawn(config, backends);
        handle
            .bind_element(Box::new(element.clone()))
            .expect("controller is running");

        Self {
            handle,
            journal,
            engine,
            element,
            sink,
        }
    }

    /// Open `episode` and wait until the element has a stream loaded
    pub async fn open_loaded(&self, episode: Episode) -> SessionView {
        let view = self
            .handle
            .open_episode(episode)
            .await
            .expect("controller is running")
            .expect("a session was opened");
        let element = self.element.clone();
        assert!(
            wait_until(|| element.snapshot().src.is_some()).await,
            "element never received a stream"
        );
        view
    }
}

pub fn adaptive_episode(id: &str, episode: u32) -> Episode {
    Episode {
        key: EpisodeKey::new(id, episode),
        sources: vec![Source::new(
            "Default",
            format!("https://cdn.example/{id}/{episode}/x.m3u8"),
            SourceKind::AdaptiveManifest,
        )],
        skip_intervals: vec![SkipInterval::new(
            Duration::ZERO,
            Duration::from_secs(5),
            SkipKind::Opening,
        )],
    }
}

pub fn empty_episode(id: &str, episode: u32) -> Episode {
    Episode {
        key: EpisodeKey::new(id, episode),
        sources: vec![],
        skip_intervals: vec![],
    }
}

/// Poll `check` until it holds or a second has passed
pub async fn wait_for<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Synchronous flavour of [`wait_for`] for checks on shared counters
pub async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    wait_for(|| std::future::ready(check())).await
}
