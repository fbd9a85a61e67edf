use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::{EpisodeKey, ProgressEvent};
use crate::utils::PlayerResult;

/// Receives the "watched" signal used for watch history.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, episode: &EpisodeKey, event: ProgressEvent) -> PlayerResult<()>;
}

/// Sink that only logs; used when the host does not track history.
#[derive(Debug, Default)]
pub struct LogProgressSink;

#[async_trait]
impl ProgressSink for LogProgressSink {
    async fn report(&self, episode: &EpisodeKey, event: ProgressEvent) -> PlayerResult<()> {
        info!("Episode {} watched ({:.1}%)", episode, event.percent);
        Ok(())
    }
}

/// Latch that lets exactly one progress event through per session.
#[derive(Debug, Clone)]
pub struct ProgressLatch {
    threshold_percent: f64,
    reported: bool,
}

impl ProgressLatch {
    pub fn new(threshold_percent: f64) -> Self {
        Self {
            threshold_percent,
            reported: false,
        }
    }

    /// Returns the event on the first update strictly above the threshold.
    pub fn observe(&mut self, position: Duration, duration: Duration) -> Option<ProgressEvent> {
        if self.reported || duration.is_zero() {
            return None;
        }

        let percent = position.as_secs_f64() / duration.as_secs_f64() * 100.0;
        if percent <= self.threshold_percent {
            return None;
        }

        debug!("Progress threshold crossed at {:.1}%", percent);
        self.reported = true;
        Some(ProgressEvent { percent })
    }

    pub fn has_reported(&self) -> bool {
        self.reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_exactly_once_over_a_sweep() {
        let mut latch = ProgressLatch::new(80.0);
        let duration = Duration::from_secs(100);

        let fired: Vec<ProgressEvent> = (0..=100)
            .filter_map(|s| latch.observe(Duration::from_secs(s), duration))
            .collect();

        assert_eq!(fired.len(), 1);
        assert!((fired[0].percent - 81.0).abs() < 1e-9);
        assert!(latch.has_reported());
    }

    #[test]
    fn test_exactly_threshold_does_not_fire() {
        let mut latch = ProgressLatch::new(80.0);
        assert_eq!(latch.observe(Duration::from_secs(80), Duration::from_secs(100)), None);
        assert!(!latch.has_reported());
    }

    #[test]
    fn test_unknown_duration_never_fires() {
        let mut latch = ProgressLatch::new(80.0);
        assert_eq!(latch.observe(Duration::from_secs(500), Duration::ZERO), None);
    }

    #[test]
    fn test_seek_back_after_report_stays_latched() {
        let mut latch = ProgressLatch::new(80.0);
        let duration = Duration::from_secs(1440);
        assert!(latch.observe(Duration::from_secs(1200), duration).is_some());
        assert!(latch.observe(Duration::from_secs(10), duration).is_none());
        assert!(latch.observe(Duration::from_secs(1300), duration).is_none());
    }
}
