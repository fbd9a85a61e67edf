use std::time::Duration;
use tracing::debug;

use crate::models::SkipInterval;

/// Window after an interval's start in which auto-skip still fires.
/// Past it the user has seeked into the interval on purpose.
const AUTO_SKIP_WINDOW: Duration = Duration::from_secs(1);

/// Result of feeding one position update to the tracker
#[derive(Debug, Clone, PartialEq)]
pub enum SkipTransition {
    Entered(SkipInterval),
    Exited,
    Unchanged,
}

/// Tracks which skip interval, if any, contains the playback position.
///
/// The interval list is scanned on every update rather than scheduled, so
/// arbitrary seeks and rate changes are handled without bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct SkipTracker {
    intervals: Vec<SkipInterval>,
    active: Option<usize>,
    minimum_length: Duration,
}

impl SkipTracker {
    pub fn new(intervals: Vec<SkipInterval>, minimum_length: Duration) -> Self {
        Self {
            intervals,
            active: None,
            minimum_length,
        }
    }

    pub fn active(&self) -> Option<&SkipInterval> {
        self.active.map(|i| &self.intervals[i])
    }

    /// First interval in provider order containing `position`
    pub fn find(&self, position: Duration) -> Option<usize> {
        self.intervals
            .iter()
            .position(|i| i.length() >= self.minimum_length && i.contains(position))
    }

    pub fn update(&mut self, position: Duration) -> SkipTransition {
        let found = self.find(position);
        if found == self.active {
            return SkipTransition::Unchanged;
        }

        self.active = found;
        match found {
            Some(index) => {
                let interval = self.intervals[index].clone();
                debug!(
                    "Entered {:?} interval {:?}-{:?}",
                    interval.kind, interval.start_time, interval.end_time
                );
                SkipTransition::Entered(interval)
            }
            None => {
                debug!("Left skip interval at {:?}", position);
                SkipTransition::Exited
            }
        }
    }

    /// Consume the active interval and return where playback should jump.
    /// No-op returning `None` when nothing is active.
    pub fn perform_skip(&mut self) -> Option<Duration> {
        let index = self.active.take()?;
        Some(self.intervals[index].end_time)
    }

    /// Whether an interval just entered at `position` should be skipped without asking
    pub fn should_auto_skip(interval: &SkipInterval, position: Duration) -> bool {
        position < interval.start_time + AUTO_SKIP_WINDOW
    }
}
