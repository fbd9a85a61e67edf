use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Player controller disconnected")]
    ControllerDisconnected,

    #[error("Failed to receive response from player controller")]
    NoResponse,

    #[error("Playback element error: {0}")]
    Element(String),

    #[error("Adaptive engine error: {0}")]
    Engine(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type PlayerResult<T> = Result<T, PlayerError>;

impl From<image::ImageError> for PlayerError {
    fn from(err: image::ImageError) -> Self {
        PlayerError::Snapshot(err.to_string())
    }
}
