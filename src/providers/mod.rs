pub mod aniskip;

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, warn};

pub use aniskip::AniSkipProvider;

use crate::models::{Episode, EpisodeKey, SkipInterval, Source};
use crate::utils::PlayerResult;

/// Supplies the ordered list of playable sources for an episode.
#[async_trait]
pub trait StreamResolver: Send + Sync + Debug {
    async fn resolve(&self, episode: &EpisodeKey) -> PlayerResult<Vec<Source>>;
}

/// Supplies the skippable intervals for an episode.
#[async_trait]
pub trait SkipIntervalProvider: Send + Sync + Debug {
    async fn skip_intervals(&self, episode: &EpisodeKey) -> PlayerResult<Vec<SkipInterval>>;
}

/// Fixed sources and intervals, for scripted sessions and tests
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    sources: Vec<Source>,
    skip_intervals: Vec<SkipInterval>,
}

impl StaticCatalog {
    pub fn new(sources: Vec<Source>, skip_intervals: Vec<SkipInterval>) -> Self {
        Self {
            sources,
            skip_intervals,
        }
    }
}

#[async_trait]
impl StreamResolver for StaticCatalog {
    async fn resolve(&self, _episode: &EpisodeKey) -> PlayerResult<Vec<Source>> {
        Ok(self.sources.clone())
    }
}

#[async_trait]
impl SkipIntervalProvider for StaticCatalog {
    async fn skip_intervals(&self, _episode: &EpisodeKey) -> PlayerResult<Vec<SkipInterval>> {
        Ok(self.skip_intervals.clone())
    }
}

/// Assembles an `Episode` from its two providers.
///
/// Neither lookup can fail the load: a resolver error leaves the episode
/// without sources (the empty state) and a skip provider error leaves it
/// without intervals.
#[derive(Debug, Clone)]
pub struct EpisodeLoader {
    resolver: Arc<dyn StreamResolver>,
    skip_provider: Arc<dyn SkipIntervalProvider>,
}

impl EpisodeLoader {
    pub fn new(resolver: Arc<dyn StreamResolver>, skip_provider: Arc<dyn SkipIntervalProvider>) -> Self {
        Self {
            resolver,
            skip_provider,
        }
    }

    pub async fn load(&self, key: EpisodeKey) -> Episode {
        let (sources, skip_intervals) = tokio::join!(
            self.resolver.resolve(&key),
            self.skip_provider.skip_intervals(&key)
        );

        let sources = sources.unwrap_or_else(|e| {
            warn!("Failed to resolve sources for {}: {}", key, e);
            Vec::new()
        });
        let skip_intervals = skip_intervals.unwrap_or_else(|e| {
            warn!("Failed to fetch skip intervals for {}: {}", key, e);
            Vec::new()
        });

        debug!(
            "Loaded {} with {} sources and {} skip intervals",
            key,
            sources.len(),
            skip_intervals.len()
        );

        Episode {
            key,
            sources,
            skip_intervals,
        }
    }
}
