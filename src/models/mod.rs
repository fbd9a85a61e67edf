use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Catalog identifier of a show (e.g. an AniList or MAL id).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one episode of one show. Skip intervals and progress are keyed by this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeKey {
    pub content_id: ContentId,
    pub episode: u32,
}

impl EpisodeKey {
    pub fn new(content_id: impl Into<String>, episode: u32) -> Self {
        Self {
            content_id: ContentId::new(content_id),
            episode,
        }
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.content_id, self.episode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    DirectVideo,
    AdaptiveManifest,
    Embed,
}

/// One playable candidate for an episode, as handed over by the stream resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
    /// Sub/dub tag. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_track: Option<String>,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind,
            audio_track: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipKind {
    Opening,
    Ending,
    Recap,
    MixedOpening,
    MixedEnding,
}

impl SkipKind {
    /// Button label shown while the interval is active
    pub fn label(&self) -> &'static str {
        match self {
            SkipKind::Opening | SkipKind::MixedOpening => "Skip Intro",
            SkipKind::Ending | SkipKind::MixedEnding => "Skip Outro",
            SkipKind::Recap => "Skip Recap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipInterval {
    #[serde(with = "duration_secs")]
    pub start_time: Duration,
    #[serde(with = "duration_secs")]
    pub end_time: Duration,
    pub kind: SkipKind,
}

impl SkipInterval {
    pub fn new(start_time: Duration, end_time: Duration, kind: SkipKind) -> Self {
        Self {
            start_time,
            end_time,
            kind,
        }
    }

    /// Half-open: the end instant belongs to whatever follows the interval.
    pub fn contains(&self, position: Duration) -> bool {
        self.start_time <= position && position < self.end_time
    }

    pub fn length(&self) -> Duration {
        self.end_time.saturating_sub(self.start_time)
    }
}

/// Everything the controller needs to open a session for one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub key: EpisodeKey,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub skip_intervals: Vec<SkipInterval>,
}

/// A variant as reported by the adaptive engine. Its position in the
/// reported list is the engine's level index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    pub height: Option<u32>,
    pub bandwidth: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualityLevel {
    pub vertical_resolution: u32,
    pub level_index: usize,
}

impl QualityLevel {
    pub fn label(&self) -> String {
        format!("{}p", self.vertical_resolution)
    }
}

/// Which rung of the ladder playback is pinned to, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QualitySelection {
    #[default]
    Auto,
    Level(usize),
}

impl QualitySelection {
    pub const AUTO_INDEX: i32 = -1;

    /// Maps the host-facing index (`-1` for auto) onto a selection.
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            Self::AUTO_INDEX => Some(QualitySelection::Auto),
            i if i >= 0 => Some(QualitySelection::Level(i as usize)),
            _ => None,
        }
    }

    pub fn index(&self) -> i32 {
        match self {
            QualitySelection::Auto => Self::AUTO_INDEX,
            QualitySelection::Level(i) => *i as i32,
        }
    }
}

/// Fired once per session when the completion threshold is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub percent: f64,
}

/// Counters read off the playback element for the stats overlay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStats {
    pub buffered_secs: f64,
    pub dropped_frames: u64,
    pub decoded_frames: u64,
    pub bandwidth_estimate_bps: Option<u64>,
    pub current_level: Option<usize>,
}

/// Serde helper storing a `Duration` as fractional seconds.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
