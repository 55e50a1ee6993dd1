use thiserror::Error;

/// Errors surfaced by manifest decoding, parsing and fetching.
///
/// Field-level and codec-level problems never appear here: they degrade to
/// absent values inside the model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MssError {
    /// Bytes are invalid for the declared character encoding
    #[error("Decode error: {0}")]
    Decode(String),

    /// The decoded text is not well-formed markup
    #[error("Markup error: {0}")]
    Markup(String),

    /// The markup tree does not have the SmoothStreamingMedia shape
    #[error("Structure error: {0}")]
    Structure(String),

    /// The accumulator was driven out of order (e.g. a write after end)
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid manifest URL: {0}")]
    InvalidUrl(String),

    #[error("Manifest fetch failed: {0}")]
    Fetch(String),
}

pub type Result<T> = std::result::Result<T, MssError>;
