use thiserror::Error;

/// Failures that can occur while fetching, decoding, chunking or addressing
/// spectrogram data. None of these are fatal to the process: fetch and decode
/// failures are retried on the next poll, the rest are caller contract
/// violations surfaced as `Result`s.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The discovery service or the recording download failed.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The downloaded bytes could not be decoded as audio.
    #[error("decode failure: {0}")]
    DecodeFailure(String),

    /// A caller passed an empty buffer or a non-positive duration.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A frame-store index outside `[0, len)`. Callers are expected to clamp
    /// before indexing; hitting this is a programming error, not a condition
    /// to recover from.
    #[error("index {index} out of range (store has {len} frames)")]
    OutOfRange { index: usize, len: usize },
}

impl From<reqwest::Error> for SpecError {
    fn from(err: reqwest::Error) -> Self {
        SpecError::NetworkFailure(err.to_string())
    }
}

impl From<hound::Error> for SpecError {
    fn from(err: hound::Error) -> Self {
        SpecError::DecodeFailure(err.to_string())
    }
}
