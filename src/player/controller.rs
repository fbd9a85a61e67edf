use chrono::Local;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::attach::{self, Attachment};
use super::comments::CommentItem;
use super::controls::{FilterAdjustment, Presentation, ZoomMode};
use super::keyboard::{KeyCommand, KeyEvent, map_key};
use super::progress::ProgressSink;
use super::quality::QualityLadder;
use super::session::{PlaybackSession, SessionView};
use super::skip::{SkipTracker, SkipTransition};
use super::snapshot::Snapshot;
use super::timers::{TimerKind, TimerSet};
use super::traits::{
    AdaptiveClient, AdaptiveEngine, AudioGraph, AudioGraphFactory, EngineEvent, MediaElement,
};
use crate::config::Config;
use crate::models::{
    Episode, EpisodeKey, PlaybackStats, ProgressEvent, QualityLevel, QualitySelection,
    SkipInterval,
};
use crate::utils::{PlayerError, PlayerResult};

const EVENT_CAPACITY: usize = 256;

/// Collaborators the controller drives but does not own the lifetime of
#[derive(Clone)]
pub struct PlayerBackends {
    pub engine: Arc<dyn AdaptiveEngine>,
    pub audio: Option<Arc<dyn AudioGraphFactory>>,
    pub progress_sink: Arc<dyn ProgressSink>,
}

impl PlayerBackends {
    pub fn new(engine: Arc<dyn AdaptiveEngine>, progress_sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            engine,
            audio: None,
            progress_sink,
        }
    }

    pub fn with_audio(mut self, audio: Arc<dyn AudioGraphFactory>) -> Self {
        self.audio = Some(audio);
        self
    }
}

/// Notifications broadcast to the host UI
#[derive(Debug, Clone)]
pub enum SessionEvent {
    SessionStarted { session_id: Uuid, episode: EpisodeKey },
    NoSources { episode: EpisodeKey },
    Attached { attachment: Attachment },
    /// The adaptive client handed the element a playlist to load
    StreamLoaded { url: String },
    QualityLadder { levels: Vec<QualityLevel> },
    QualityChanged { selection: QualitySelection },
    /// `label` is the button text for the interval's kind
    SkipAvailable {
        interval: SkipInterval,
        label: &'static str,
    },
    SkipCleared,
    Skipped { to: Duration },
    ProgressReported { percent: f64 },
    Comment(CommentItem),
    Stats(PlaybackStats),
    SnapshotReady(Snapshot),
    SessionClosed { session_id: Uuid },
}

/// Resource accounting, mostly for tests and debugging overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    pub has_session: bool,
    pub element_bound: bool,
    pub adaptive_client_alive: bool,
    pub active_timers: usize,
    pub audio_graph_attached: bool,
}

/// Commands that can be sent to the player controller
#[derive(Debug)]
pub enum PlayerCommand {
    /// Hand the controller the element to drive
    BindElement { element: Box<dyn MediaElement> },
    /// The element is going away (view unmounted)
    UnbindElement,
    /// Tear down the current session and start one for this episode
    OpenEpisode {
        episode: Episode,
        respond_to: oneshot::Sender<Option<SessionView>>,
    },
    CloseSession { respond_to: oneshot::Sender<()> },
    /// Position report from the element
    TimeUpdate {
        position: Duration,
        duration: Option<Duration>,
    },
    Play,
    Pause,
    TogglePlay,
    SeekBy { offset_secs: f64 },
    SeekTo { position: Duration },
    SetVolume { volume: f64 },
    ToggleMute,
    SetPlaybackRate { rate: f64 },
    /// `-1` selects automatic bitrate
    SetQuality {
        index: i32,
        respond_to: oneshot::Sender<bool>,
    },
    PerformSkip {
        respond_to: oneshot::Sender<Option<Duration>>,
    },
    ToggleFullscreen,
    TogglePictureInPicture,
    ToggleLightsOff,
    AdjustFilter { adjustment: FilterAdjustment },
    ResetFilters,
    SetZoom { zoom: ZoomMode },
    ZoomIn,
    ZoomOut,
    SetAudioBoost { gain: f64 },
    ToggleComments,
    ToggleStats,
    TakeSnapshot {
        respond_to: oneshot::Sender<Option<Snapshot>>,
    },
    Key { event: KeyEvent },
    GetView {
        respond_to: oneshot::Sender<Option<SessionView>>,
    },
    GetDiagnostics {
        respond_to: oneshot::Sender<Diagnostics>,
    },
    Shutdown,
}

/// Owns the session, the element binding and every resource attached to
/// them. Processes commands, engine events and timer ticks one at a time.
pub struct PlayerController {
    config: Config,
    backends: PlayerBackends,
    receiver: mpsc::UnboundedReceiver<PlayerCommand>,
    events: broadcast::Sender<SessionEvent>,

    element: Option<Box<dyn MediaElement>>,
    client: Option<Box<dyn AdaptiveClient>>,
    engine_rx: Option<mpsc::UnboundedReceiver<EngineEvent>>,
    audio_graph: Option<Box<dyn AudioGraph>>,

    timers: TimerSet,
    tick_tx: mpsc::UnboundedSender<TimerKind>,
    tick_rx: mpsc::UnboundedReceiver<TimerKind>,
    rng: StdRng,

    session: Option<PlaybackSession>,
}

impl PlayerController {
    pub fn new(config: Config, backends: PlayerBackends) -> (PlayerHandle, PlayerController) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();

        let controller = PlayerController {
            config,
            backends,
            receiver,
            events: events.clone(),
            element: None,
            client: None,
            engine_rx: None,
            audio_graph: None,
            timers: TimerSet::new(),
            tick_tx,
            tick_rx,
            rng: StdRng::from_os_rng(),
            session: None,
        };
        let handle = PlayerHandle { sender, events };

        (handle, controller)
    }

    /// Create a controller and run it on the current tokio runtime
    pub fn spawn(config: Config, backends: PlayerBackends) -> PlayerHandle {
        let (handle, controller) = Self::new(config, backends);
        tokio::spawn(controller.run());
        handle
    }

    /// Run the controller event loop
    pub async fn run(mut self) {
        debug!("PlayerController event loop started");

        loop {
            tokio::select! {
                command = self.receiver.recv() => match command {
                    Some(PlayerCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(event) = next_engine_event(&mut self.engine_rx) => {
                    self.handle_engine_event(event);
                }
                Some(kind) = self.tick_rx.recv() => {
                    self.handle_tick(kind);
                }
            }
        }

        self.teardown();
        debug!("PlayerController event loop terminated");
    }

    fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::BindElement { element } => self.bind_element(element),
            PlayerCommand::UnbindElement => self.unbind_element(),
            PlayerCommand::OpenEpisode {
                episode,
                respond_to,
            } => {
                let view = self.open_episode(episode);
                let _ = respond_to.send(view);
            }
            PlayerCommand::CloseSession { respond_to } => {
                self.teardown();
                let _ = respond_to.send(());
            }
            PlayerCommand::TimeUpdate { position, duration } => {
                self.on_time_update(position, duration)
            }
            PlayerCommand::Play => self.play(),
            PlayerCommand::Pause => self.pause(),
            PlayerCommand::TogglePlay => self.toggle_play(),
            PlayerCommand::SeekBy { offset_secs } => self.seek_by(offset_secs),
            PlayerCommand::SeekTo { position } => self.seek_to(position),
            PlayerCommand::SetVolume { volume } => self.set_volume(volume),
            PlayerCommand::ToggleMute => self.toggle_mute(),
            PlayerCommand::SetPlaybackRate { rate } => self.set_playback_rate(rate),
            PlayerCommand::SetQuality { index, respond_to } => {
                let _ = respond_to.send(self.set_quality(index));
            }
            PlayerCommand::PerformSkip { respond_to } => {
                let _ = respond_to.send(self.perform_skip());
            }
            PlayerCommand::ToggleFullscreen => self.toggle_fullscreen(),
            PlayerCommand::TogglePictureInPicture => self.toggle_picture_in_picture(),
            PlayerCommand::ToggleLightsOff => {
                self.with_presentation(|p| p.lights_off = !p.lights_off)
            }
            PlayerCommand::AdjustFilter { adjustment } => {
                self.with_presentation(|p| p.filters.apply(adjustment))
            }
            PlayerCommand::ResetFilters => self.with_presentation(|p| p.filters.reset()),
            PlayerCommand::SetZoom { zoom } => self.with_presentation(|p| p.zoom = zoom.clamped()),
            PlayerCommand::ZoomIn => self.with_presentation(|p| p.zoom = p.zoom.zoom_in()),
            PlayerCommand::ZoomOut => self.with_presentation(|p| p.zoom = p.zoom.zoom_out()),
            PlayerCommand::SetAudioBoost { gain } => self.set_audio_boost(gain),
            PlayerCommand::ToggleComments => self.toggle_comments(),
            PlayerCommand::ToggleStats => self.toggle_stats(),
            PlayerCommand::TakeSnapshot { respond_to } => {
                let _ = respond_to.send(self.take_snapshot());
            }
            PlayerCommand::Key { event } => self.handle_key(event),
            PlayerCommand::GetView { respond_to } => {
                let _ = respond_to.send(self.view());
            }
            PlayerCommand::GetDiagnostics { respond_to } => {
                let _ = respond_to.send(self.diagnostics());
            }
            // Intercepted by the run loop
            PlayerCommand::Shutdown => {}
        }
    }

    fn emit(&self, event: SessionEvent) {
        trace!("Emitting {:?}", event);
        let _ = self.events.send(event);
    }

    fn view(&self) -> Option<SessionView> {
        self.session.as_ref().map(PlaybackSession::view)
    }

    fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            has_session: self.session.is_some(),
            element_bound: self.element.is_some(),
            adaptive_client_alive: self.client.as_ref().is_some_and(|c| !c.is_destroyed()),
            active_timers: self.timers.active(),
            audio_graph_attached: self.audio_graph.is_some(),
        }
    }

    fn native_manifest_supported(&self) -> bool {
        self.element
            .as_ref()
            .is_some_and(|e| e.supports_native_manifest())
    }

    // Element binding

    fn bind_element(&mut self, mut element: Box<dyn MediaElement>) {
        if let Some(mut previous) = self.element.take() {
            previous.clear_source();
        }

        let mut recovered = None;
        if let Some(session) = self.session.as_ref() {
            element.set_volume(session.volume());
            element.set_muted(session.is_muted());
            element.set_playback_rate(session.playback_rate());

            match session.attachment() {
                Attachment::Unplayable { url } if element.supports_native_manifest() => {
                    recovered = Some(Attachment::NativeManifest { url: url.clone() });
                }
                _ => {
                    if let Some(url) = session.element_source() {
                        element.set_source(url);
                    }
                }
            }
        }

        debug!("Playback element bound");
        self.element = Some(element);

        if let Some(attachment) = recovered {
            self.apply_element_attachment(attachment);
        }
    }

    fn unbind_element(&mut self) {
        if let Some(mut element) = self.element.take() {
            element.clear_source();
            debug!("Playback element unbound");
        }
        if let Some(session) = self.session.as_mut() {
            session.set_playing(false);
            let presentation = session.presentation_mut();
            presentation.fullscreen = false;
            presentation.picture_in_picture = false;
        }
    }

    // Session lifecycle

    fn open_episode(&mut self, episode: Episode) -> Option<SessionView> {
        self.teardown();

        let session = PlaybackSession::new(episode, &self.config);
        info!(
            session = %session.id(),
            episode = %session.episode(),
            sources = session.sources().len(),
            "Opening playback session"
        );
        self.emit(SessionEvent::SessionStarted {
            session_id: session.id(),
            episode: session.episode().clone(),
        });

        if let Some(element) = self.element.as_mut() {
            element.set_volume(session.volume());
            element.set_muted(session.is_muted());
            element.set_playback_rate(session.playback_rate());
        }

        self.session = Some(session);
        self.attach_selected_source();
        self.view()
    }

    /// Release everything the current session holds, in order: adaptive
    /// client, timers, audio graph, then the session state itself.
    fn teardown(&mut self) {
        self.destroy_client();

        let cancelled = self.timers.cancel_all();
        if cancelled > 0 {
            trace!("Cancelled {} timers", cancelled);
        }

        if let Some(mut graph) = self.audio_graph.take() {
            graph.release();
            debug!("Audio graph released");
        }

        if let Some(session) = self.session.take() {
            if let Some(element) = self.element.as_mut() {
                element.clear_source();
            }
            info!(session = %session.id(), episode = %session.episode(), "Playback session closed");
            self.emit(SessionEvent::SessionClosed {
                session_id: session.id(),
            });
        }
    }

    fn destroy_client(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.destroy();
            debug!("Adaptive client destroyed");
        }
        // Anything the old client still had in flight is dropped with the channel
        self.engine_rx = None;
    }

    // Source attachment

    fn attach_selected_source(&mut self) {
        self.destroy_client();

        let Some(session) = self.session.as_ref() else {
            return;
        };
        let native = self.native_manifest_supported();
        let planned = attach::plan(
            attach::select_source(session.sources()),
            self.backends.engine.is_supported(),
            native,
        );

        let attachment = match planned {
            Attachment::Adaptive { url } => self.attach_adaptive(url, native),
            other => other,
        };

        match &attachment {
            Attachment::Empty => {
                if let Some(session) = self.session.as_ref() {
                    info!("Episode {} has no sources", session.episode());
                    self.emit(SessionEvent::NoSources {
                        episode: session.episode().clone(),
                    });
                }
            }
            Attachment::Embed { url } => debug!("Rendering embedded player for {}", url),
            Attachment::Unplayable { url } => {
                warn!("Nothing can play {}; player stays stalled", url)
            }
            _ => {}
        }

        self.apply_element_attachment(attachment);
    }

    fn attach_adaptive(&mut self, url: String, native: bool) -> Attachment {
        let (tx, rx) = mpsc::unbounded_channel();
        match self.backends.engine.create_client(&url, tx) {
            Ok(client) => {
                debug!("Adaptive client attached to {}", url);
                self.client = Some(client);
                self.engine_rx = Some(rx);
                Attachment::Adaptive { url }
            }
            Err(e) => {
                warn!("Adaptive engine rejected {}: {}", url, e);
                attach::manifest_fallback(url, native)
            }
        }
    }

    fn apply_element_attachment(&mut self, attachment: Attachment) {
        if let Some(url) = attachment.element_url() {
            match self.element.as_mut() {
                Some(element) => element.set_source(url),
                None => debug!("No element bound yet; {} loads on bind", url),
            }
        }

        if let Some(session) = self.session.as_mut() {
            session.set_attachment(attachment.clone());
        }
        self.emit(SessionEvent::Attached { attachment });
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match event {
            EngineEvent::ManifestParsed { renditions } => {
                let ladder = QualityLadder::from_renditions(&renditions);
                let levels = ladder.levels().to_vec();
                session.set_ladder(ladder);
                self.emit(SessionEvent::QualityLadder { levels });
            }
            EngineEvent::MediaAttached { url } => {
                if !session.attachment().is_adaptive() {
                    return;
                }
                debug!("Adaptive client loaded {}", url);
                session.set_media_url(url.clone());

                match self.element.as_mut() {
                    Some(element) => {
                        element.set_source(&url);
                        if !session.position().is_zero() {
                            element.seek(session.position());
                        }
                        if session.is_playing() {
                            if let Err(e) = element.play() {
                                warn!("Playback request rejected after stream switch: {}", e);
                                session.set_playing(false);
                            }
                        }
                    }
                    None => debug!("No element bound yet; {} loads on bind", url),
                }
                self.emit(SessionEvent::StreamLoaded { url });
            }
            EngineEvent::LevelSwitched { level } => {
                trace!("Engine switched to level {}", level);
                session.set_current_level(Some(level));
            }
            EngineEvent::Error {
                fatal: false,
                message,
            } => warn!("Adaptive engine error: {}", message),
            EngineEvent::Error {
                fatal: true,
                message,
            } => {
                error!("Adaptive engine failed: {}", message);
                self.degrade_to_native();
            }
        }
    }

    /// The engine gave up on the manifest; let the element try it directly.
    fn degrade_to_native(&mut self) {
        let url = match self.session.as_ref().map(PlaybackSession::attachment) {
            Some(Attachment::Adaptive { url }) => url.clone(),
            _ => return,
        };

        self.destroy_client();
        if let Some(session) = self.session.as_mut() {
            session.ladder_mut().reset();
            session.set_current_level(None);
        }

        let attachment = attach::manifest_fallback(url, self.native_manifest_supported());
        self.apply_element_attachment(attachment);
    }

    // Position tracking

    fn on_time_update(&mut self, position: Duration, duration: Option<Duration>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let update = session.on_time_update(position, duration);

        match update.skip {
            SkipTransition::Entered(interval) => {
                let auto = self.config.skip.auto_skip
                    && SkipTracker::should_auto_skip(&interval, position);
                let label = interval.kind.label();
                self.emit(SessionEvent::SkipAvailable { interval, label });
                if auto {
                    debug!("Auto-skipping interval at {:?}", position);
                    self.perform_skip();
                }
            }
            SkipTransition::Exited => self.emit(SessionEvent::SkipCleared),
            SkipTransition::Unchanged => {}
        }

        if let Some(event) = update.progress {
            self.report_progress(event);
        }
    }

    /// Best effort: the sink runs detached and its failure is only logged.
    fn report_progress(&self, event: ProgressEvent) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let episode = session.episode().clone();
        info!(
            session = %session.id(),
            "Episode {} passed {:.1}%, reporting progress",
            episode,
            event.percent
        );
        self.emit(SessionEvent::ProgressReported {
            percent: event.percent,
        });

        let sink = Arc::clone(&self.backends.progress_sink);
        tokio::spawn(async move {
            if let Err(e) = sink.report(&episode, event).await {
                warn!("Progress sink failed for {}: {}", episode, e);
            }
        });
    }

    fn perform_skip(&mut self) -> Option<Duration> {
        let target = self.session.as_mut()?.perform_skip()?;
        if let Some(element) = self.element.as_mut() {
            element.seek(target);
        }
        info!("Skipped to {:?}", target);
        self.emit(SessionEvent::Skipped { to: target });
        Some(target)
    }

    // Transport

    fn play(&mut self) {
        let (Some(session), Some(element)) = (self.session.as_mut(), self.element.as_mut()) else {
            trace!("Play ignored: no session or element");
            return;
        };
        match element.play() {
            Ok(()) => session.set_playing(true),
            Err(e) => warn!("Playback request rejected: {}", e),
        }
    }

    fn pause(&mut self) {
        let (Some(session), Some(element)) = (self.session.as_mut(), self.element.as_mut()) else {
            return;
        };
        element.pause();
        session.set_playing(false);
    }

    fn toggle_play(&mut self) {
        match self.session.as_ref().map(PlaybackSession::is_playing) {
            Some(true) => self.pause(),
            Some(false) => self.play(),
            None => {}
        }
    }

    fn seek_by(&mut self, offset_secs: f64) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        match session.seek_target(offset_secs) {
            Some(target) => self.seek_to(target),
            None => warn!("Ignoring seek by {} seconds", offset_secs),
        }
    }

    fn seek_to(&mut self, position: Duration) {
        let (Some(session), Some(element)) = (self.session.as_ref(), self.element.as_mut()) else {
            return;
        };
        let position = session.clamp_position(position);
        trace!("Seeking to {:?}", position);
        element.seek(position);
        self.on_time_update(position, None);
    }

    fn set_volume(&mut self, volume: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let volume = session.set_volume(volume);
        if let Some(element) = self.element.as_mut() {
            element.set_volume(volume);
            element.set_muted(session.is_muted());
        }
    }

    fn toggle_mute(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let muted = !session.is_muted();
        session.set_muted(muted);
        if let Some(element) = self.element.as_mut() {
            element.set_muted(muted);
        }
    }

    fn set_playback_rate(&mut self, rate: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let rate = self.config.playback.clamp_rate(rate);
        session.set_playback_rate(rate);
        if let Some(element) = self.element.as_mut() {
            element.set_playback_rate(rate);
        }
    }

    fn set_quality(&mut self, index: i32) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let Some(selection) = session.ladder_mut().select(index) else {
            return false;
        };

        if let Some(client) = self.client.as_mut() {
            client.set_level(selection);
        }
        self.emit(SessionEvent::QualityChanged { selection });
        true
    }

    // Presentation

    fn with_presentation(&mut self, update: impl FnOnce(&mut Presentation)) {
        if let Some(session) = self.session.as_mut() {
            update(session.presentation_mut());
        }
    }

    fn toggle_fullscreen(&mut self) {
        let (Some(session), Some(element)) = (self.session.as_mut(), self.element.as_mut()) else {
            return;
        };
        let desired = !session.presentation().fullscreen;
        match element.set_fullscreen(desired) {
            Ok(()) => session.presentation_mut().fullscreen = desired,
            Err(e) => warn!("Fullscreen request rejected: {}", e),
        }
    }

    fn toggle_picture_in_picture(&mut self) {
        let (Some(session), Some(element)) = (self.session.as_mut(), self.element.as_mut()) else {
            return;
        };
        let desired = !session.presentation().picture_in_picture;
        match element.set_picture_in_picture(desired) {
            Ok(()) => session.presentation_mut().picture_in_picture = desired,
            Err(e) => warn!("Picture-in-picture request rejected: {}", e),
        }
    }

    fn set_audio_boost(&mut self, gain: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(gain) = self.config.audio.clamp_gain(gain) else {
            warn!("Ignoring audio boost of {}", gain);
            return;
        };

        if self.audio_graph.is_none() && gain > 1.0 {
            let Some(factory) = self.backends.audio.as_ref() else {
                warn!("Audio boost requested but no audio backend is available");
                return;
            };
            match factory.create_graph() {
                Ok(graph) => self.audio_graph = Some(graph),
                Err(e) => {
                    warn!("Failed to build audio graph: {}", e);
                    return;
                }
            }
        }

        if let Some(graph) = self.audio_graph.as_mut() {
            graph.set_gain(gain);
        }
        session.presentation_mut().audio_boost = gain;
    }

    fn toggle_comments(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let enabled = !session.presentation().comments_enabled;
        session.presentation_mut().comments_enabled = enabled;

        if enabled {
            self.timers.start(
                TimerKind::Comments,
                self.config.overlay.comment_period(),
                self.tick_tx.clone(),
            );
        } else {
            self.timers.stop(TimerKind::Comments);
            session.comments_mut().clear();
        }
    }

    fn toggle_stats(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let visible = !session.presentation().stats_visible;
        session.presentation_mut().stats_visible = visible;

        if visible {
            self.timers.start(
                TimerKind::Stats,
                self.config.playback.stats_poll_interval(),
                self.tick_tx.clone(),
            );
        } else {
            self.timers.stop(TimerKind::Stats);
        }
    }

    fn handle_tick(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Comments => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                if !session.presentation().comments_enabled {
                    return;
                }
                if let Some(item) = session.comments_mut().spawn(Instant::now(), &mut self.rng) {
                    self.emit(SessionEvent::Comment(item));
                }
            }
            TimerKind::Stats => {
                let (Some(session), Some(element)) = (self.session.as_ref(), self.element.as_ref())
                else {
                    return;
                };
                if !session.presentation().stats_visible {
                    return;
                }
                let mut stats = element.stats();
                stats.current_level = stats.current_level.or(session.current_level());
                self.emit(SessionEvent::Stats(stats));
            }
        }
    }

    fn take_snapshot(&mut self) -> Option<Snapshot> {
        self.session.as_ref()?;
        let frame = self.element.as_ref()?.capture_frame()?;

        match Snapshot::encode(frame, Local::now()) {
            Ok(snapshot) => {
                info!("Captured {}", snapshot.file_name);
                self.emit(SessionEvent::SnapshotReady(snapshot.clone()));
                Some(snapshot)
            }
            Err(e) => {
                warn!("Snapshot failed: {}", e);
                None
            }
        }
    }

    fn handle_key(&mut self, event: KeyEvent) {
        let Some(command) = map_key(&event) else {
            return;
        };
        trace!("Key {:?} mapped to {:?}", event.key, command);

        let step = self.config.playback.seek_step().as_secs_f64();
        match command {
            KeyCommand::TogglePlay => self.toggle_play(),
            KeyCommand::SeekBackward => self.seek_by(-step),
            KeyCommand::SeekForward => self.seek_by(step),
            KeyCommand::ToggleFullscreen => self.toggle_fullscreen(),
            KeyCommand::ToggleMute => self.toggle_mute(),
            KeyCommand::ToggleComments => self.toggle_comments(),
        }
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn next_engine_event(
    receiver: &mut Option<mpsc::UnboundedReceiver<EngineEvent>>,
) -> Option<EngineEvent> {
    let Some(rx) = receiver.as_mut() else {
        return std::future::pending().await;
    };
    match rx.recv().await {
        Some(event) => Some(event),
        None => {
            // Engine side hung up; stop polling until the next attachment
            *receiver = None;
            std::future::pending().await
        }
    }
}

/// Handle to send commands to the player controller
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    sender: mpsc::UnboundedSender<PlayerCommand>,
    events: broadcast::Sender<SessionEvent>,
}

impl PlayerHandle {
    /// Receive session events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn send(&self, command: PlayerCommand) -> PlayerResult<()> {
        self.sender
            .send(command)
            .map_err(|_| PlayerError::ControllerDisconnected)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> PlayerCommand,
    ) -> PlayerResult<T> {
        let (respond_to, response) = oneshot::channel();
        self.send(command(respond_to))?;
        response.await.map_err(|_| PlayerError::NoResponse)
    }

    pub fn bind_element(&self, element: Box<dyn MediaElement>) -> PlayerResult<()> {
        self.send(PlayerCommand::BindElement { element })
    }

    pub fn unbind_element(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::UnbindElement)
    }

    /// Open a session for `episode`, replacing the current one
    pub async fn open_episode(&self, episode: Episode) -> PlayerResult<Option<SessionView>> {
        self.request(|respond_to| PlayerCommand::OpenEpisode {
            episode,
            respond_to,
        })
        .await
    }

    pub async fn close_session(&self) -> PlayerResult<()> {
        self.request(|respond_to| PlayerCommand::CloseSession { respond_to })
            .await
    }

    /// Forward a position report from the element
    pub fn time_update(&self, position: Duration, duration: Option<Duration>) -> PlayerResult<()> {
        self.send(PlayerCommand::TimeUpdate { position, duration })
    }

    pub fn play(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::Play)
    }

    pub fn pause(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::Pause)
    }

    pub fn toggle_play(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::TogglePlay)
    }

    pub fn seek_by(&self, offset_secs: f64) -> PlayerResult<()> {
        self.send(PlayerCommand::SeekBy { offset_secs })
    }

    pub fn seek_to(&self, position: Duration) -> PlayerResult<()> {
        self.send(PlayerCommand::SeekTo { position })
    }

    pub fn set_volume(&self, volume: f64) -> PlayerResult<()> {
        self.send(PlayerCommand::SetVolume { volume })
    }

    pub fn toggle_mute(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::ToggleMute)
    }

    pub fn set_playback_rate(&self, rate: f64) -> PlayerResult<()> {
        self.send(PlayerCommand::SetPlaybackRate { rate })
    }

    /// Pin a quality rung, or `-1` for automatic. `false` if the index is not on the ladder.
    pub async fn set_quality(&self, index: i32) -> PlayerResult<bool> {
        self.request(|respond_to| PlayerCommand::SetQuality { index, respond_to })
            .await
    }

    /// Skip the active interval; returns the new position if one was active
    pub async fn perform_skip(&self) -> PlayerResult<Option<Duration>> {
        self.request(|respond_to| PlayerCommand::PerformSkip { respond_to })
            .await
    }

    pub fn toggle_fullscreen(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::ToggleFullscreen)
    }

    pub fn toggle_picture_in_picture(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::TogglePictureInPicture)
    }

    pub fn toggle_lights_off(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::ToggleLightsOff)
    }

    pub fn adjust_filter(&self, adjustment: FilterAdjustment) -> PlayerResult<()> {
        self.send(PlayerCommand::AdjustFilter { adjustment })
    }

    pub fn reset_filters(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::ResetFilters)
    }

    pub fn set_zoom(&self, zoom: ZoomMode) -> PlayerResult<()> {
        self.send(PlayerCommand::SetZoom { zoom })
    }

    pub fn zoom_in(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::ZoomIn)
    }

    pub fn zoom_out(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::ZoomOut)
    }

    pub fn set_audio_boost(&self, gain: f64) -> PlayerResult<()> {
        self.send(PlayerCommand::SetAudioBoost { gain })
    }

    pub fn toggle_comments(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::ToggleComments)
    }

    pub fn toggle_stats(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::ToggleStats)
    }

    pub async fn take_snapshot(&self) -> PlayerResult<Option<Snapshot>> {
        self.request(|respond_to| PlayerCommand::TakeSnapshot { respond_to })
            .await
    }

    pub fn key(&self, event: KeyEvent) -> PlayerResult<()> {
        self.send(PlayerCommand::Key { event })
    }

    /// Current session state, `None` when no episode is open
    pub async fn view(&self) -> PlayerResult<Option<SessionView>> {
        self.request(|respond_to| PlayerCommand::GetView { respond_to })
            .await
    }

    pub async fn diagnostics(&self) -> PlayerResult<Diagnostics> {
        self.request(|respond_to| PlayerCommand::GetDiagnostics { respond_to })
            .await
    }

    /// Stop the controller after tearing down the session
    pub fn shutdown(&self) -> PlayerResult<()> {
        self.send(PlayerCommand::Shutdown)
    }
}
