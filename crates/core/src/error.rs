/// Result alias that carries the custom [`SculptError`] type.
pub type Result<T> = std::result::Result<T, SculptError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum SculptError {
    /// Free-form message for failures that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// A caller handed in a value outside the accepted domain.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    /// A persisted world could be read but did not describe a valid world.
    #[error("malformed world snapshot: {0}")]
    MalformedSnapshot(String),
    /// The remote world service rejected or failed a request.
    #[error("remote world service: {0}")]
    Remote(String),
}

impl SculptError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for SculptError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SculptError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
