/// Result alias that carries the custom [`PlayerError`] type.
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Common error type for the core crate.
///
/// Only library operations, configuration loading and snapshot writing
/// return errors. Playback and enrichment faults are reported through
/// [`crate::PlayerEvent`] instead.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Configuration value outside of its accepted range.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Caller supplied an argument the engine cannot act on.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The backend rejected a library operation.
    #[error("library error: {0}")]
    Library(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl PlayerError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }
}

impl From<&str> for PlayerError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for PlayerError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
