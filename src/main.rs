use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use aniplay::player::{HeadlessElement, HlsEngine, LogProgressSink};
use aniplay::providers::{AniSkipProvider, EpisodeLoader, SkipIntervalProvider, StaticCatalog};
use aniplay::{Config, EpisodeKey, PlayerBackends, PlayerController, SessionEvent, SkipInterval, Source};

/// A scripted viewing of one episode
#[derive(Debug, Deserialize)]
struct Script {
    episode: EpisodeKey,
    #[serde(default)]
    sources: Vec<Source>,
    /// When absent, skip times are fetched from the configured provider
    skip_intervals: Option<Vec<SkipInterval>>,
    duration_secs: u64,
    #[serde(default = "default_step")]
    step_secs: u64,
    /// Wall-clock pause between position reports
    #[serde(default = "default_tick_ms")]
    tick_ms: u64,
    #[serde(default)]
    native_manifest: bool,
}

fn default_step() -> u64 {
    1
}

fn default_tick_ms() -> u64 {
    10
}

/// Wait until the element has something to play. Adaptive attachments only
/// get a stream once the client has parsed the manifest.
async fn wait_for_stream(events: &mut broadcast::Receiver<SessionEvent>, limit: Duration) -> bool {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(SessionEvent::StreamLoaded { .. }) => return true,
                Ok(SessionEvent::Attached { attachment }) if !attachment.is_adaptive() => {
                    return attachment.element_url().is_some();
                }
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return false,
            }
        }
    };
    tokio::time::timeout(limit, wait).await.unwrap_or(false)
}

fn load_script(path: &Path) -> Result<Script> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid script {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aniplay=debug")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let script_path = PathBuf::from(
        args.next()
            .context("usage: aniplay <script.json> [config.toml]")?,
    );
    let config = match args.next() {
        Some(path) => Config::load_from(Path::new(&path))?,
        None => Config::load()?,
    };
    let script = load_script(&script_path)?;

    info!("Starting aniplay for {}", script.episode);

    let catalog = Arc::new(StaticCatalog::new(
        script.sources.clone(),
        script.skip_intervals.clone().unwrap_or_default(),
    ));
    let skip_provider: Arc<dyn SkipIntervalProvider> = match script.skip_intervals {
        Some(_) => catalog.clone(),
        None => Arc::new(AniSkipProvider::from_config(&config)?),
    };
    let episode = EpisodeLoader::new(catalog, skip_provider)
        .load(script.episode.clone())
        .await;

    let backends = PlayerBackends::new(
        Arc::new(HlsEngine::new(&config.network)?),
        Arc::new(LogProgressSink),
    );
    let stream_timeout = config.network.timeout();
    let handle = PlayerController::spawn(config, backends);

    let mut events = handle.subscribe();
    let logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Comment(item)) => info!("comment: {}", item.text),
                Ok(event) => info!("event: {:?}", event),
                Err(RecvError::Lagged(missed)) => warn!("Event log lagged by {} events", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut sweep_events = handle.subscribe();
    handle.bind_element(Box::new(HeadlessElement::new(script.native_manifest)))?;
    let Some(view) = handle.open_episode(episode).await? else {
        anyhow::bail!("controller did not open a session");
    };
    if view.is_empty() {
        info!("{} has nothing to play", script.episode);
    } else {
        let loaded = view.attachment.element_url().is_some()
            || wait_for_stream(&mut sweep_events, stream_timeout).await;
        if loaded {
            handle.play()?;
        } else {
            warn!("No stream reached the element, sweeping without playback");
        }

        let duration = Duration::from_secs(script.duration_secs);
        let tick = Duration::from_millis(script.tick_ms);
        let mut position = 0;
        while position <= script.duration_secs {
            handle.time_update(Duration::from_secs(position), Some(duration))?;
            tokio::time::sleep(tick).await;

            let mut skipped = None;
            loop {
                match sweep_events.try_recv() {
                    Ok(SessionEvent::SkipAvailable { label, .. }) => {
                        info!("{} at {}s", label, position);
                        skipped = handle.perform_skip().await?;
                    }
                    Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
            position = match skipped {
                Some(to) => to.as_secs().max(position + 1),
                None => position + script.step_secs.max(1),
            };
        }

        if let Some(snapshot) = handle.take_snapshot().await? {
            info!("Snapshot {} ({} bytes)", snapshot.file_name, snapshot.png.len());
        }
    }

    if let Some(view) = handle.view().await? {
        info!("Final state: {}", serde_json::to_string(&view)?);
    }

    handle.close_session().await?;
    handle.shutdown()?;
    drop(handle);
    let _ = logger.await;

    Ok(())
}
