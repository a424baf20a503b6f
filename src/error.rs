//! Crate-wide error types.
//!
//! # Design
//!
//! - [`Error`]: top-level error enum aggregating player and pattern failures
//! - All errors implement `std::error::Error` via `thiserror`
//! - The realtime audio callback never returns a `Result` — per §7 of the
//!   design it writes silence and logs instead; `Error` is only seen by
//!   the non-realtime control surface and the decoder thread.

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level crate error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error opening or reading a source file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file could not be opened or probed as an audio source.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Symphonia could not find or decode an audio track.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// A decode error from symphonia mid-stream.
    #[error("decode error: {0}")]
    Decode(String),

    /// Resampler construction or processing failure.
    #[error("resampler error: {0}")]
    Resample(String),

    /// Audio-graph client registration/activation failure.
    #[error("audio graph init failed: {0}")]
    AudioInit(String),

    /// No free player slot in the registry.
    #[error("no free player slot (max {0} players)")]
    NoFreeSlot(usize),

    /// Operation referenced a player handle that doesn't exist.
    #[error("unknown player handle: {0:?}")]
    BadHandle(crate::player::PlayerHandle),

    /// Control-surface command channel to the decoder/audio thread closed.
    #[error("player command channel closed")]
    ChannelClosed,

    /// Configuration file could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Pattern edit rejected for an out-of-range argument.
    #[error("invalid pattern argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = Error::FileNotFound("/tmp/missing.wav".to_string());
        assert!(err.to_string().contains("missing.wav"));
    }

    #[test]
    fn no_free_slot_includes_capacity() {
        let err = Error::NoFreeSlot(16);
        assert!(err.to_string().contains("16"));
    }
}
