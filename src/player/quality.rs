use tracing::{debug, info, warn};

use crate::models::{QualityLevel, QualitySelection, Rendition};

/// Mode for adaptive quality control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveMode {
    /// The engine picks the bitrate
    Auto,
    /// Pinned to one rung by the user
    Manual,
}

/// Discrete resolution choices derived from a parsed manifest.
#[derive(Debug, Clone, Default)]
pub struct QualityLadder {
    levels: Vec<QualityLevel>,
    selection: QualitySelection,
}

impl QualityLadder {
    /// Build the ladder from the engine's renditions: one rung per distinct
    /// height, tallest first. When several renditions share a height the one
    /// the engine listed first keeps its level index.
    pub fn from_renditions(renditions: &[Rendition]) -> Self {
        let mut levels: Vec<QualityLevel> = Vec::new();

        for (level_index, rendition) in renditions.iter().enumerate() {
            let Some(height) = rendition.height else {
                continue;
            };
            if levels.iter().any(|l| l.vertical_resolution == height) {
                continue;
            }
            levels.push(QualityLevel {
                vertical_resolution: height,
                level_index,
            });
        }

        levels.sort_by(|a, b| b.vertical_resolution.cmp(&a.vertical_resolution));
        debug!(
            "Quality ladder derived from {} renditions: {:?}",
            renditions.len(),
            levels.iter().map(|l| l.vertical_resolution).collect::<Vec<_>>()
        );

        Self {
            levels,
            selection: QualitySelection::Auto,
        }
    }

    pub fn levels(&self) -> &[QualityLevel] {
        &self.levels
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn selection(&self) -> QualitySelection {
        self.selection
    }

    pub fn mode(&self) -> AdaptiveMode {
        match self.selection {
            QualitySelection::Auto => AdaptiveMode::Auto,
            QualitySelection::Level(_) => AdaptiveMode::Manual,
        }
    }

    /// Apply a host-facing index (`-1` for auto). Returns the new selection,
    /// or `None` when the index names no rung, in which case nothing changes.
    pub fn select(&mut self, index: i32) -> Option<QualitySelection> {
        let selection = match QualitySelection::from_index(index) {
            Some(QualitySelection::Auto) => QualitySelection::Auto,
            Some(QualitySelection::Level(level)) if self.level(level).is_some() => {
                QualitySelection::Level(level)
            }
            _ => {
                warn!("Ignoring invalid quality index {}", index);
                return None;
            }
        };

        info!("Quality selection changed to {}", self.label_for(selection));
        self.selection = selection;
        Some(selection)
    }

    /// Resolution playback is pinned to; `None` while in auto mode
    pub fn pinned_resolution(&self) -> Option<u32> {
        match self.selection {
            QualitySelection::Auto => None,
            QualitySelection::Level(level) => self.level(level).map(|l| l.vertical_resolution),
        }
    }

    pub fn label(&self) -> String {
        self.label_for(self.selection)
    }

    pub fn reset(&mut self) {
        self.levels.clear();
        self.selection = QualitySelection::Auto;
    }

    fn level(&self, level_index: usize) -> Option<&QualityLevel> {
        self.levels.iter().find(|l| l.level_index == level_index)
    }

    fn label_for(&self, selection: QualitySelection) -> String {
        match selection {
            QualitySelection::Auto => "Auto".to_string(),
            QualitySelection::Level(level) => self
                .level(level)
                .map(|l| l.label())
                .unwrap_or_else(|| format!("level {level}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendition(height: Option<u32>, bandwidth: u64) -> Rendition {
        Rendition { height, bandwidth }
    }

    fn create_test_renditions() -> Vec<Rendition> {
        vec![
            rendition(Some(360), 800_000),
            rendition(Some(720), 2_800_000),
            rendition(Some(1080), 5_000_000),
            rendition(Some(720), 3_200_000),
            rendition(None, 64_000),
        ]
    }

    #[test]
    fn test_ladder_is_deduplicated_and_descending() {
        let ladder = QualityLadder::from_renditions(&create_test_renditions());
        let heights: Vec<u32> = ladder.levels().iter().map(|l| l.vertical_resolution).collect();
        assert_eq!(heights, vec![1080, 720, 360]);

        // The first 720p rendition keeps its engine index
        assert_eq!(ladder.levels()[1].level_index, 1);
        assert_eq!(ladder.selection(), QualitySelection::Auto);
    }

    #[test]
    fn test_auto_always_succeeds() {
        let mut empty = QualityLadder::default();
        assert_eq!(empty.select(-1), Some(QualitySelection::Auto));
        assert_eq!(empty.mode(), AdaptiveMode::Auto);
        assert_eq!(empty.pinned_resolution(), None);
    }

    #[test]
    fn test_valid_index_pins_resolution() {
        let mut ladder = QualityLadder::from_renditions(&create_test_renditions());
        assert_eq!(ladder.select(2), Some(QualitySelection::Level(2)));
        assert_eq!(ladder.pinned_resolution(), Some(1080));
        assert_eq!(ladder.mode(), AdaptiveMode::Manual);
        assert_eq!(ladder.label(), "1080p");

        assert_eq!(ladder.select(-1), Some(QualitySelection::Auto));
        assert_eq!(ladder.pinned_resolution(), None);
    }

    #[test]
    fn test_invalid_index_is_noop() {
        let mut ladder = QualityLadder::from_renditions(&create_test_renditions());
        ladder.select(0);

        // Index 3 was deduplicated away, 4 has no height, 9 never existed
        for index in [3, 4, 9, -5] {
            assert_eq!(ladder.select(index), None);
            assert_eq!(ladder.selection(), QualitySelection::Level(0));
        }
    }

    #[test]
    fn test_reset_clears_ladder() {
        let mut ladder = QualityLadder::from_renditions(&create_test_renditions());
        ladder.select(1);
        ladder.reset();
        assert!(ladder.is_empty());
        assert_eq!(ladder.selection(), QualitySelection::Auto);
    }
}
