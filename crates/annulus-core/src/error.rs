//! Error types for the annulus engine

use thiserror_no_std::Error;

/// Errors raised while decoding a snapshot delivered by the paired device
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The weather payload could not be decoded
    #[error("Weather snapshot decode failed: {0}")]
    Weather(postcard::Error),

    /// The calendar payload could not be decoded
    #[error("Calendar snapshot decode failed: {0}")]
    Calendar(postcard::Error),

    /// The payload was empty
    #[error("Empty snapshot payload")]
    Empty,
}

/// Result type for snapshot decoding
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors raised while loading the runtime configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration blob could not be decoded
    #[error("Config decode failed: {0}")]
    Decode(postcard::Error),

    /// The configuration could not be encoded
    #[error("Config encode failed: {0}")]
    Encode(postcard::Error),

    /// The configured UTC offset is outside +/- 24 hours
    #[error("Invalid UTC offset: {seconds}s")]
    InvalidUtcOffset {
        /// The rejected offset in seconds
        seconds: i32,
    },
}

/// Errors reported by the transport collaborator when sending a request
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// No paired device is currently reachable
    #[error("No reachable paired device")]
    Unreachable,

    /// The link refused the message
    #[error("Link rejected the request")]
    Rejected,
}
