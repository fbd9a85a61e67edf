use aniplay::models::{EpisodeKey, ProgressEvent, QualitySelection};
use aniplay::player::snapshot::Frame;
use aniplay::player::{
    AdaptiveClient, AdaptiveEngine, AudioGraph, AudioGraphFactory, EngineEvent,
    EngineEventSender, MediaElement, ProgressSink,
};
use aniplay::{PlayerError, PlayerResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ordered log of resource calls shared by all mocks of one player
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ElementState {
    pub src: Option<String>,
    pub playing: bool,
    pub position: Duration,
    pub volume: f64,
    pub muted: bool,
    pub rate: f64,
    pub fullscreen: bool,
}

#[derive(Debug, Clone)]
pub struct RecordingElement {
    pub state: Arc<Mutex<ElementState>>,
    journal: Journal,
    native_manifest: bool,
    reject_picture_in_picture: bool,
}

impl RecordingElement {
    pub fn new(journal: Journal) -> Self {
        Self {
            state: Arc::new(Mutex::new(ElementState {
                volume: 1.0,
                rate: 1.0,
                ..ElementState::default()
            })),
            journal,
            native_manifest: false,
            reject_picture_in_picture: false,
        }
    }

    pub fn native(journal: Journal) -> Self {
        Self {
            native_manifest: true,
            ..Self::new(journal)
        }
    }

    pub fn rejecting_picture_in_picture(journal: Journal) -> Self {
        Self {
            reject_picture_in_picture: true,
            ..Self::new(journal)
        }
    }

    pub fn snapshot(&self) -> ElementState {
        self.state.lock().unwrap().clone()
    }
}

impl MediaElement for RecordingElement {
    fn set_source(&mut self, url: &str) {
        self.journal.record(format!("element.set_source {url}"));
        self.state.lock().unwrap().src = Some(url.to_string());
    }

    fn clear_source(&mut self) {
        self.journal.record("element.clear_source");
        let mut state = self.state.lock().unwrap();
        state.src = None;
        state.playing = false;
    }

    fn supports_native_manifest(&self) -> bool {
        self.native_manifest
    }

    fn play(&mut self) -> PlayerResult<()> {
        self.state.lock().unwrap().playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
    }

    fn seek(&mut self, position: Duration) {
        self.state.lock().unwrap().position = position;
    }

    fn set_volume(&mut self, volume: f64) {
        self.state.lock().unwrap().volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.lock().unwrap().muted = muted;
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.state.lock().unwrap().rate = rate;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> PlayerResult<()> {
        self.state.lock().unwrap().fullscreen = fullscreen;
        Ok(())
    }

    fn set_picture_in_picture(&mut self, _enabled: bool) -> PlayerResult<()> {
        if self.reject_picture_in_picture {
            return Err(PlayerError::Element("not allowed".to_string()));
        }
        Ok(())
    }

    fn capture_frame(&self) -> Option<Frame> {
        self.state.lock().unwrap().src.as_ref()?;
        Some(Frame {
            width: 4,
            height: 2,
            rgba: vec![255; 4 * 2 * 4],
        })
    }
}

/// Engine that counts live clients and hands out its event senders.
/// Each new client immediately asks the element to load the manifest.
#[derive(Debug, Clone)]
pub struct MockEngine {
    pub supported: bool,
    pub live: Arc<AtomicUsize>,
    pub created: Arc<AtomicUsize>,
    pub senders: Arc<Mutex<Vec<EngineEventSender>>>,
    pub levels: Arc<Mutex<Vec<QualitySelection>>>,
    journal: Journal,
}

impl MockEngine {
    pub fn new(journal: Journal) -> Self {
        Self {
            supported: true,
            live: Arc::new(AtomicUsize::new(0)),
            created: Arc::new(AtomicUsize::new(0)),
            senders: Arc::new(Mutex::new(Vec::new())),
            levels: Arc::new(Mutex::new(Vec::new())),
            journal,
        }
    }

    /// An engine the runtime cannot host
    pub fn unsupported(journal: Journal) -> Self {
        Self {
            supported: false,
            ..Self::new(journal)
        }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn sender(&self, index: usize) -> EngineEventSender {
        self.senders.lock().unwrap()[index].clone()
    }

    pub fn latest_sender(&self) -> EngineEventSender {
        self.senders.lock().unwrap().last().cloned().expect("a client was created")
    }
}

impl AdaptiveEngine for MockEngine {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create_client(
        &self,
        manifest_url: &str,
        events: EngineEventSender,
    ) -> PlayerResult<Box<dyn AdaptiveClient>> {
        self.journal.record(format!("client.create {manifest_url}"));
        self.live.fetch_add(1, Ordering::SeqCst);
        self.created.fetch_add(1, Ordering::SeqCst);
        let _ = events.send(EngineEvent::MediaAttached {
            url: manifest_url.to_string(),
        });
        self.senders.lock().unwrap().push(events);
        Ok(Box::new(MockClient {
            live: self.live.clone(),
            levels: self.levels.clone(),
            journal: self.journal.clone(),
            destroyed: false,
        }))
    }
}

#[derive(Debug)]
pub struct MockClient {
    live: Arc<AtomicUsize>,
    levels: Arc<Mutex<Vec<QualitySelection>>>,
    journal: Journal,
    destroyed: bool,
}

impl AdaptiveClient for MockClient {
    fn set_level(&mut self, selection: QualitySelection) {
        self.levels.lock().unwrap().push(selection);
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
            self.journal.record("client.destroy");
        }
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Drop for MockClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[derive(Debug, Clone)]
pub struct MockAudioFactory {
    journal: Journal,
}

impl MockAudioFactory {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl AudioGraphFactory for MockAudioFactory {
    fn create_graph(&self) -> PlayerResult<Box<dyn AudioGraph>> {
        self.journal.record("audio.create");
        Ok(Box::new(MockAudioGraph {
            journal: self.journal.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct MockAudioGraph {
    journal: Journal,
}

impl AudioGraph for MockAudioGraph {
    fn set_gain(&mut self, gain: f64) {
        self.journal.record(format!("audio.gain {gain}"));
    }

    fn release(&mut self) {
        self.journal.record("audio.release");
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub reports: Arc<Mutex<Vec<(EpisodeKey, ProgressEvent)>>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn report(&self, episode: &EpisodeKey, event: ProgressEvent) -> PlayerResult<()> {
        self.reports.lock().unwrap().push((episode.clone(), event));
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FailingSink {
    pub attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl ProgressSink for FailingSink {
    async fn report(&self, _episode: &EpisodeKey, _event: ProgressEvent) -> PlayerResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PlayerError::Provider("progress endpoint unavailable".to_string()))
    }
}
