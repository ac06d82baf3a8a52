//! Errors that cross component boundaries.
//!
//! [`MediaError`] is carried inside [`ScreenEvent`](crate::event::ScreenEvent)s,
//! so it stores rendered messages rather than the source errors and stays `Clone`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// No usable audio output device, or the stream could not be built.
    #[error("audio output unavailable: {0}")]
    Output(String),
    /// The remote source could not be fetched.
    #[error("network request failed: {0}")]
    Network(String),
    /// The container or codec is not supported.
    #[error("unsupported media: {0}")]
    Format(String),
    /// Decoding failed after the stream was opened.
    #[error("decode failed: {0}")]
    Decode(String),
    /// The source URI could not be parsed.
    #[error("invalid source uri '{uri}': {reason}")]
    InvalidSource { uri: String, reason: String },
    /// The asset could not be read.
    #[error("asset unavailable: {0}")]
    Asset(String),
    /// A command reached a handle that was already released.
    #[error("handle already released")]
    Released,
}

impl MediaError {
    /// Maps a plumbing error from the decode path onto the decode variant,
    /// keeping the full context chain in the message.
    pub fn decode(err: anyhow::Error) -> Self {
        Self::Decode(format!("{err:#}"))
    }
}
