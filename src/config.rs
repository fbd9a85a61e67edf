use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub skip: SkipConfig,

    #[serde(default)]
    pub overlay: OverlayConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_seek_step")]
    pub seek_step_secs: u64,

    #[serde(default = "default_progress_threshold")]
    pub progress_threshold_percent: f64,

    #[serde(default = "default_volume")]
    pub default_volume: f64,

    #[serde(default = "default_min_rate")]
    pub min_playback_rate: f64,

    #[serde(default = "default_max_rate")]
    pub max_playback_rate: f64,

    #[serde(default = "default_stats_poll")]
    pub stats_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkipConfig {
    /// Jump over an interval as soon as playback enters it
    #[serde(default)]
    pub auto_skip: bool,

    /// Intervals shorter than this are not offered at all
    #[serde(default)]
    pub minimum_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_comment_period")]
    pub comment_period_ms: u64,

    #[serde(default = "default_min_travel")]
    pub min_travel_secs: u64,

    #[serde(default = "default_max_travel")]
    pub max_travel_secs: u64,

    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,

    #[serde(default = "default_phrases")]
    pub phrases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_max_boost")]
    pub max_boost_gain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_skip_times_url")]
    pub skip_times_base_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config file found, using defaults");
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path).context("Failed to read config file")?;
        let mut config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        config.sanitize();
        info!("Config loaded successfully");
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents).context("Failed to write config file")?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    /// Replace values the player cannot work with by their defaults
    pub fn sanitize(&mut self) {
        let playback = &mut self.playback;

        let threshold = playback.progress_threshold_percent;
        if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
            warn!("Invalid progress threshold {}, using default", threshold);
            playback.progress_threshold_percent = default_progress_threshold();
        }

        if !playback.default_volume.is_finite() {
            warn!("Invalid default volume {}, using default", playback.default_volume);
            playback.default_volume = default_volume();
        }

        let bounds = playback.rate_bounds();
        if bounds != (playback.min_playback_rate, playback.max_playback_rate) {
            warn!(
                "Invalid playback rate bounds {}..{}, using {}..{}",
                playback.min_playback_rate, playback.max_playback_rate, bounds.0, bounds.1
            );
            (playback.min_playback_rate, playback.max_playback_rate) = bounds;
        }

        let gain = self.audio.max_boost_gain;
        if !gain.is_finite() || gain < 1.0 {
            warn!("Invalid maximum audio boost {}, using default", gain);
            self.audio.max_boost_gain = default_max_boost();
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("aniplay").join("config.toml"))
    }
}

impl PlaybackConfig {
    pub fn seek_step(&self) -> Duration {
        Duration::from_secs(self.seek_step_secs)
    }

    pub fn stats_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stats_poll_interval_ms.max(1))
    }

    /// Rate bounds ordered low to high; the defaults when either is unusable
    pub fn rate_bounds(&self) -> (f64, f64) {
        let (min, max) = (self.min_playback_rate, self.max_playback_rate);
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || max <= 0.0 {
            return (default_min_rate(), default_max_rate());
        }
        if min > max { (max, min) } else { (min, max) }
    }

    /// Non-finite requests fall back to normal speed
    pub fn clamp_rate(&self, rate: f64) -> f64 {
        let (min, max) = self.rate_bounds();
        let rate = if rate.is_finite() { rate } else { 1.0 };
        rate.clamp(min, max)
    }

    pub fn initial_volume(&self) -> f64 {
        if self.default_volume.is_finite() {
            self.default_volume.clamp(0.0, 1.0)
        } else {
            default_volume()
        }
    }

    pub fn progress_threshold(&self) -> f64 {
        let threshold = self.progress_threshold_percent;
        if threshold.is_finite() && (0.0..=100.0).contains(&threshold) {
            threshold
        } else {
            default_progress_threshold()
        }
    }
}

impl AudioConfig {
    pub fn max_gain(&self) -> f64 {
        if self.max_boost_gain.is_finite() {
            self.max_boost_gain.max(1.0)
        } else {
            default_max_boost()
        }
    }

    /// Gain kept inside `[1.0, max_gain]`; `None` for a non-finite request
    pub fn clamp_gain(&self, gain: f64) -> Option<f64> {
        gain.is_finite().then(|| gain.clamp(1.0, self.max_gain()))
    }
}

impl SkipConfig {
    pub fn minimum_interval(&self) -> Duration {
        Duration::from_secs(self.minimum_interval_secs)
    }
}

impl OverlayConfig {
    pub fn comment_period(&self) -> Duration {
        Duration::from_millis(self.comment_period_ms.max(1))
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            seek_step_secs: default_seek_step(),
            progress_threshold_percent: default_progress_threshold(),
            default_volume: default_volume(),
            min_playback_rate: default_min_rate(),
            max_playback_rate: default_max_rate(),
            stats_poll_interval_ms: default_stats_poll(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            comment_period_ms: default_comment_period(),
            min_travel_secs: default_min_travel(),
            max_travel_secs: default_max_travel(),
            max_age_secs: default_max_age(),
            phrases: default_phrases(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            max_boost_gain: default_max_boost(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connection_timeout: default_timeout(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            skip_times_base_url: default_skip_times_url(),
        }
    }
}

// Default value functions
fn default_seek_step() -> u64 { 5 }
fn default_progress_threshold() -> f64 { 80.0 }
fn default_volume() -> f64 { 1.0 }
fn default_min_rate() -> f64 { 0.5 }
fn default_max_rate() -> f64 { 2.0 }
fn default_stats_poll() -> u64 { 1000 }
fn default_comment_period() -> u64 { 800 }
fn default_min_travel() -> u64 { 5 }
fn default_max_travel() -> u64 { 10 }
fn default_max_age() -> u64 { 15 }
fn default_max_boost() -> f64 { 3.0 }
fn default_timeout() -> u64 { 30 }
fn default_skip_times_url() -> String { "https://api.aniskip.com".to_string() }

fn default_phrases() -> Vec<String> {
    [
        "SUGOI!", "Best episode so far", "OP never skip", "peak fiction",
        "the animation here", "wwwww", "rewatching this again", "goosebumps",
        "ara ara", "this OST though", "plot twist incoming", "nakama power",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
