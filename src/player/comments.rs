//! Scrolling comment overlay. Decorative only: nothing here feeds back into
//! skip, progress or quality handling.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::OverlayConfig;

const COLORS: &[&str] = &[
    "#ffffff", "#fe0302", "#ff7204", "#ffaa02", "#ffd302", "#00cd00", "#4266be", "#89d5ff",
    "#cc0273",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStyle {
    Normal,
    Bold,
    Outline,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentItem {
    pub id: u64,
    pub text: String,
    pub color: &'static str,
    pub style: CommentStyle,
    /// Vertical placement as a percentage of the overlay height
    pub top_percent: f64,
    /// Time to cross the screen
    pub travel: Duration,
    #[serde(skip)]
    pub created_at: Instant,
}

#[derive(Debug, Clone)]
pub struct CommentOverlay {
    items: VecDeque<CommentItem>,
    next_id: u64,
    phrases: Vec<String>,
    min_travel: Duration,
    max_travel: Duration,
    max_age: Duration,
}

impl CommentOverlay {
    pub fn new(config: &OverlayConfig) -> Self {
        let min_travel = Duration::from_secs(config.min_travel_secs);
        Self {
            items: VecDeque::new(),
            next_id: 0,
            phrases: config.phrases.clone(),
            min_travel,
            max_travel: Duration::from_secs(config.max_travel_secs).max(min_travel),
            max_age: Duration::from_secs(config.max_age_secs),
        }
    }

    /// Inject one randomly styled comment, pruning anything older than the
    /// maximum age first. Returns `None` if there is nothing to say.
    pub fn spawn<R: Rng + ?Sized>(&mut self, now: Instant, rng: &mut R) -> Option<CommentItem> {
        self.prune(now);

        let text = self.phrases.choose(rng)?.clone();
        let travel = Duration::from_secs_f64(
            rng.random_range(self.min_travel.as_secs_f64()..=self.max_travel.as_secs_f64()),
        );
        let style = match rng.random_range(0..3) {
            0 => CommentStyle::Normal,
            1 => CommentStyle::Bold,
            _ => CommentStyle::Outline,
        };

        let item = CommentItem {
            id: self.next_id,
            text,
            color: COLORS.choose(rng).copied().unwrap_or("#ffffff"),
            style,
            top_percent: rng.random_range(0.0..90.0),
            travel,
            created_at: now,
        };
        self.next_id += 1;
        self.items.push_back(item.clone());
        Some(item)
    }

    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.items.front() {
            if now.saturating_duration_since(front.created_at) > self.max_age {
                self.items.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &CommentItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
