//! Built-in adaptive engine for HLS manifests.
//!
//! The engine fetches the master playlist, reports its variants as
//! renditions and tells the controller which playlist the element should
//! load: the master while on automatic, the variant's own playlist once a
//! level is pinned. Segment download and decoding are the element's concern.

use m3u8_rs::Playlist;
use reqwest::Client;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::traits::{AdaptiveClient, AdaptiveEngine, EngineEvent, EngineEventSender};
use crate::config::NetworkConfig;
use crate::models::{QualitySelection, Rendition};
use crate::utils::{PlayerError, PlayerResult};

#[derive(Debug, Clone)]
pub struct HlsEngine {
    client: Client,
}

impl HlsEngine {
    pub fn new(network: &NetworkConfig) -> PlayerResult<Self> {
        let client = Client::builder().timeout(network.timeout()).build()?;
        Ok(Self { client })
    }
}

impl AdaptiveEngine for HlsEngine {
    fn is_supported(&self) -> bool {
        true
    }

    fn create_client(
        &self,
        manifest_url: &str,
        events: EngineEventSender,
    ) -> PlayerResult<Box<dyn AdaptiveClient>> {
        let manifest = Url::parse(manifest_url)
            .map_err(|e| PlayerError::Manifest(format!("invalid manifest URL {manifest_url}: {e}")))?;
        let runtime = Handle::try_current().map_err(|e| PlayerError::Engine(e.to_string()))?;

        let (streams_tx, streams_rx) = watch::channel(Vec::new());
        let client = self.client.clone();
        let url = manifest.clone();
        let task_events = events.clone();
        let task = runtime.spawn(async move {
            match fetch_variants(&client, url.clone()).await {
                Ok(variants) => {
                    info!("Manifest {} parsed with {} renditions", url, variants.len());
                    let streams = variants.iter().map(|v| v.resolve(&url)).collect();
                    let _ = streams_tx.send(streams);

                    let renditions = variants.into_iter().map(|v| v.rendition).collect();
                    let _ = task_events.send(EngineEvent::ManifestParsed { renditions });
                    let _ = task_events.send(EngineEvent::MediaAttached {
                        url: url.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to load manifest {}: {}", url, e);
                    let _ = task_events.send(EngineEvent::Error {
                        fatal: true,
                        message: e.to_string(),
                    });
                }
            }
        });

        Ok(Box::new(HlsClient {
            manifest,
            events,
            streams: streams_rx,
            task: Some(task),
            selection: QualitySelection::Auto,
        }))
    }
}

#[derive(Debug)]
pub struct HlsClient {
    manifest: Url,
    events: EngineEventSender,
    /// Playlist URL per level, filled once the manifest is parsed
    streams: watch::Receiver<Vec<Option<Url>>>,
    task: Option<JoinHandle<()>>,
    selection: QualitySelection,
}

impl AdaptiveClient for HlsClient {
    fn set_level(&mut self, selection: QualitySelection) {
        if self.is_destroyed() || selection == self.selection {
            return;
        }

        let stream = match selection {
            QualitySelection::Auto => Some(self.manifest.clone()),
            QualitySelection::Level(level) => self.streams.borrow().get(level).cloned().flatten(),
        };
        let Some(stream) = stream else {
            warn!("No playlist known for {:?} yet", selection);
            return;
        };

        debug!("HLS level set to {:?}, loading {}", selection, stream);
        self.selection = selection;
        if let QualitySelection::Level(level) = selection {
            let _ = self.events.send(EngineEvent::LevelSwitched { level });
        }
        let _ = self.events.send(EngineEvent::MediaAttached {
            url: stream.to_string(),
        });
    }

    fn destroy(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("HLS client destroyed");
        }
    }

    fn is_destroyed(&self) -> bool {
        self.task.is_none()
    }
}

impl Drop for HlsClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// One playable entry of a manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub rendition: Rendition,
    /// Playlist URI relative to the manifest; `None` when the manifest is
    /// itself the media playlist
    pub uri: Option<String>,
}

impl Variant {
    fn resolve(&self, manifest: &Url) -> Option<Url> {
        match &self.uri {
            None => Some(manifest.clone()),
            Some(uri) => manifest
                .join(uri)
                .inspect_err(|e| warn!("Unusable variant URI {}: {}", uri, e))
                .ok(),
        }
    }
}

pub async fn fetch_variants(client: &Client, url: Url) -> PlayerResult<Vec<Variant>> {
    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    parse_variants(&bytes)
}

/// Variants of a master playlist in listing order. A media playlist is a
/// single variant of unknown height.
pub fn parse_variants(content: &[u8]) -> PlayerResult<Vec<Variant>> {
    match m3u8_rs::parse_playlist_res(content) {
        Ok(Playlist::MasterPlaylist(master)) => Ok(master
            .variants
            .iter()
            .filter(|v| !v.is_i_frame)
            .map(|v| Variant {
                rendition: Rendition {
                    height: v.resolution.as_ref().map(|r| r.height as u32),
                    bandwidth: v.bandwidth,
                },
                uri: Some(v.uri.clone()),
            })
            .collect()),
        Ok(Playlist::MediaPlaylist(_)) => Ok(vec![Variant {
            rendition: Rendition {
                height: None,
                bandwidth: 0,
            },
            uri: None,
        }]),
        Err(_) => Err(PlayerError::Manifest(format!(
            "unparseable playlist: {}",
            String::from_utf8_lossy(&content[..content.len().min(64)])
        ))),
    }
}
